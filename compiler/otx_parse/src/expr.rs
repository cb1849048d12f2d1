//! Expression and data-path syntax.
//!
//! Marker operands are parsed into a small owned AST first; the compiler then
//! lowers it against the template's slot map and constant table, choosing the
//! cheapest `ValueSource` for each operand.

use otx_ir::{BinaryOp, UnaryOp, Value};

#[derive(Clone, Debug, PartialEq)]
enum Tok {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Punct(&'static str),
}

/// Longest first, so `<=` wins over `<`.
const PUNCTS: &[&str] = &[
    "==", "!=", "<=", ">=", "&&", "||", ".", ",", "[", "]", "(", ")", "!", "-", "+", "*", "/", "%",
    "<", ">",
];

/// Parsed operand, before name resolution.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Ast {
    Const(Value),
    Path { head: PathHead, steps: Vec<AstStep> },
    Unary(UnaryOp, Box<Ast>),
    Binary(BinaryOp, Box<Ast>, Box<Ast>),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum PathHead {
    Name(String),
    This,
    Literal(Value),
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum AstStep {
    Field(String),
    Index(i64),
    Key(String),
    Call { name: String, args: Vec<Ast> },
}

/// Parse a complete operand.
pub(crate) fn parse_expr(text: &str) -> Result<Ast, String> {
    let tokens = tokenize(text)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser { tokens, pos: 0 };
    let ast = parser.or()?;
    match parser.peek() {
        None => Ok(ast),
        Some(tok) => Err(format!("unexpected {}", describe(tok))),
    }
}

/// Whether `name` is usable as a variable name.
pub(crate) fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
        && !matches!(name, "true" | "false" | "null" | "this")
}

/// Split on top-level commas (outside quotes and brackets).
pub(crate) fn split_top_level(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;
    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&text[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&text[start..]);
    parts
}

fn describe(tok: &Tok) -> String {
    match tok {
        Tok::Ident(name) => format!("`{name}`"),
        Tok::Int(n) => format!("`{n}`"),
        Tok::Float(x) => format!("`{x}`"),
        Tok::Str(s) => format!("{s:?}"),
        Tok::Punct(p) => format!("`{p}`"),
    }
}

fn tokenize(text: &str) -> Result<Vec<Tok>, String> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c.is_ascii_digit() {
            let mut end = i;
            let mut is_float = false;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_ascii_digit() {
                    end = j + 1;
                    chars.next();
                } else if d == '.' && !is_float && text[j + 1..].starts_with(|n: char| n.is_ascii_digit()) {
                    is_float = true;
                    end = j + 1;
                    chars.next();
                } else {
                    break;
                }
            }
            let lit = &text[i..end];
            tokens.push(if is_float {
                Tok::Float(lit.parse().map_err(|_| format!("invalid number `{lit}`"))?)
            } else {
                Tok::Int(lit.parse().map_err(|_| format!("invalid number `{lit}`"))?)
            });
        } else if c.is_alphabetic() || c == '_' {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_alphanumeric() || d == '_' {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            tokens.push(Tok::Ident(text[i..end].to_string()));
        } else if c == '"' || c == '\'' {
            chars.next();
            let mut s = String::new();
            let mut closed = false;
            while let Some((_, d)) = chars.next() {
                match d {
                    '\\' => match chars.next() {
                        Some((_, 'n')) => s.push('\n'),
                        Some((_, 't')) => s.push('\t'),
                        Some((_, 'r')) => s.push('\r'),
                        Some((_, e)) => s.push(e),
                        None => break,
                    },
                    d if d == c => {
                        closed = true;
                        break;
                    }
                    d => s.push(d),
                }
            }
            if !closed {
                return Err("unterminated string".to_string());
            }
            tokens.push(Tok::Str(s));
        } else {
            let rest = &text[i..];
            let Some(p) = PUNCTS.iter().find(|p| rest.starts_with(**p)) else {
                return Err(format!("unexpected character `{c}`"));
            };
            for _ in 0..p.len() {
                chars.next();
            }
            tokens.push(Tok::Punct(*p));
        }
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Tok>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Tok> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Tok> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn eat(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(Tok::Punct(p)) if *p == punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Result<(), String> {
        if self.eat(punct) {
            return Ok(());
        }
        match self.peek() {
            Some(tok) => Err(format!("expected `{punct}`, found {}", describe(tok))),
            None => Err(format!("expected `{punct}`, found end of expression")),
        }
    }

    /// Binary levels, loosest first.
    fn binary_level(&mut self, level: usize) -> Result<Ast, String> {
        const LEVELS: &[&[(&str, BinaryOp)]] = &[
            &[("||", BinaryOp::Or)],
            &[("&&", BinaryOp::And)],
            &[("==", BinaryOp::Eq), ("!=", BinaryOp::NotEq)],
            &[
                ("<=", BinaryOp::LtEq),
                (">=", BinaryOp::GtEq),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Mod)],
        ];
        let Some(ops) = LEVELS.get(level) else {
            return self.unary();
        };
        let mut lhs = self.binary_level(level + 1)?;
        'outer: loop {
            for (sym, op) in *ops {
                if self.eat(sym) {
                    let rhs = self.binary_level(level + 1)?;
                    lhs = Ast::Binary(*op, Box::new(lhs), Box::new(rhs));
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn or(&mut self) -> Result<Ast, String> {
        self.binary_level(0)
    }

    fn unary(&mut self) -> Result<Ast, String> {
        if self.eat("!") {
            return Ok(Ast::Unary(UnaryOp::Not, Box::new(self.unary()?)));
        }
        if self.eat("-") {
            return Ok(match self.unary()? {
                Ast::Const(Value::Int(n)) => Ast::Const(Value::Int(n.wrapping_neg())),
                Ast::Const(Value::Float(x)) => Ast::Const(Value::Float(-x)),
                operand => Ast::Unary(UnaryOp::Neg, Box::new(operand)),
            });
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Ast, String> {
        let head = match self.bump() {
            Some(Tok::Int(n)) => PathHead::Literal(Value::Int(n)),
            Some(Tok::Float(x)) => PathHead::Literal(Value::Float(x)),
            Some(Tok::Str(s)) => PathHead::Literal(Value::from(s)),
            Some(Tok::Ident(name)) => match name.as_str() {
                "true" => PathHead::Literal(Value::Bool(true)),
                "false" => PathHead::Literal(Value::Bool(false)),
                "null" => PathHead::Literal(Value::Null),
                "this" => PathHead::This,
                _ => PathHead::Name(name),
            },
            Some(Tok::Punct("(")) => {
                let inner = self.or()?;
                self.expect(")")?;
                return Ok(inner);
            }
            Some(tok) => return Err(format!("unexpected {}", describe(&tok))),
            None => return Err("unexpected end of expression".to_string()),
        };
        let steps = self.steps()?;
        Ok(match (head, steps.is_empty()) {
            (PathHead::Literal(v), true) => Ast::Const(v),
            (head, _) => Ast::Path { head, steps },
        })
    }

    fn steps(&mut self) -> Result<Vec<AstStep>, String> {
        let mut steps = Vec::new();
        loop {
            if self.eat(".") {
                let name = match self.bump() {
                    Some(Tok::Ident(name)) => name,
                    Some(tok) => return Err(format!("expected field name, found {}", describe(&tok))),
                    None => return Err("expected field name after `.`".to_string()),
                };
                if self.eat("(") {
                    let mut args = Vec::new();
                    if !self.eat(")") {
                        loop {
                            args.push(self.or()?);
                            if self.eat(")") {
                                break;
                            }
                            self.expect(",")?;
                        }
                    }
                    steps.push(AstStep::Call { name, args });
                } else {
                    steps.push(AstStep::Field(name));
                }
            } else if self.eat("[") {
                let negative = self.eat("-");
                let step = match self.bump() {
                    Some(Tok::Int(n)) => AstStep::Index(if negative { -n } else { n }),
                    Some(Tok::Str(key)) if !negative => AstStep::Key(key),
                    _ => return Err("index must be an integer or string literal".to_string()),
                };
                self.expect("]")?;
                steps.push(step);
            } else {
                return Ok(steps);
            }
        }
    }
}
