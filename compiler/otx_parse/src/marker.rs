//! Marker grammar.
//!
//! A marker body is everything between the opener byte and the closing `>`.
//! Each form has a unique fixed prefix, so the grammar is tried in a fixed
//! order and the first match wins.

use crate::scanner::Opener;

/// One parsed marker. Borrowed parts are untrimmed slices of the body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Marker<'a> {
    /// `<&path>`
    Variable(&'a str),
    /// `<:if:cond>`
    If(&'a str),
    /// `<:elsif:cond>`
    Elsif(&'a str),
    /// `<:else>`
    Else,
    /// `<:for:var:container>`
    For { var: &'a str, container: &'a str },
    /// `<:set:var=expr>`
    Set { var: &'a str, value: &'a str },
    /// `<:call:name>` / `<:call:name:a=x,b=y>`
    Call { name: &'a str, args: Option<&'a str> },
    /// `<:exec:op>` / `<:exec:op:expr>`
    Exec { op: &'a str, arg: Option<&'a str> },
    /// `<:debug>` / `<:debug:var>` / `<:debug:var:cmp>`
    Debug {
        value: Option<&'a str>,
        compare: Option<&'a str>,
    },
    /// `<: >`
    SkipSpace,
    /// `<:?nl>`
    SkipNewline,
    /// `<:? >`
    SkipBlanks,
    /// `<:n>`, `<:r>`, `<:t>`, `<:s>`
    Escape(char),
    /// `<:xHHHH>` (hex digits, unvalidated)
    CodePoint(&'a str),
    /// `<:--...>`
    Comment,
    /// `<.if>`
    EndIf,
    /// `<.for>`
    EndFor,
}

/// Classify a marker body. `None` means no form matched.
pub(crate) fn parse_marker(opener: Opener, body: &str) -> Option<Marker<'_>> {
    match opener {
        Opener::Variable => Some(Marker::Variable(body)),
        Opener::Closer => match body.trim() {
            "if" => Some(Marker::EndIf),
            "for" => Some(Marker::EndFor),
            _ => None,
        },
        Opener::Directive => parse_directive(body),
    }
}

fn parse_directive(body: &str) -> Option<Marker<'_>> {
    if let Some(cond) = body.strip_prefix("if:") {
        return Some(Marker::If(cond));
    }
    if let Some(cond) = body.strip_prefix("elsif:") {
        return Some(Marker::Elsif(cond));
    }
    if body.trim_end() == "else" {
        return Some(Marker::Else);
    }
    if let Some(rest) = body.strip_prefix("for:") {
        let (var, container) = rest.split_once(':')?;
        return Some(Marker::For { var, container });
    }
    if let Some(rest) = body.strip_prefix("set:") {
        let (var, value) = rest.split_once('=')?;
        return Some(Marker::Set { var, value });
    }
    if let Some(rest) = body.strip_prefix("call:") {
        return Some(match rest.split_once(':') {
            Some((name, args)) => Marker::Call {
                name,
                args: Some(args),
            },
            None => Marker::Call {
                name: rest,
                args: None,
            },
        });
    }
    if let Some(rest) = body.strip_prefix("exec:") {
        return Some(match rest.split_once(':') {
            Some((op, arg)) => Marker::Exec { op, arg: Some(arg) },
            None => Marker::Exec { op: rest, arg: None },
        });
    }
    if let Some(rest) = body.strip_prefix("debug") {
        if rest.is_empty() {
            return Some(Marker::Debug {
                value: None,
                compare: None,
            });
        }
        let rest = rest.strip_prefix(':')?;
        return Some(match rest.split_once(':') {
            Some((value, compare)) => Marker::Debug {
                value: Some(value),
                compare: Some(compare),
            },
            None => Marker::Debug {
                value: Some(rest),
                compare: None,
            },
        });
    }
    match body {
        " " => return Some(Marker::SkipSpace),
        "?nl" => return Some(Marker::SkipNewline),
        "? " => return Some(Marker::SkipBlanks),
        "n" => return Some(Marker::Escape('\n')),
        "r" => return Some(Marker::Escape('\r')),
        "t" => return Some(Marker::Escape('\t')),
        "s" => return Some(Marker::Escape(' ')),
        _ => {}
    }
    if body.starts_with("--") {
        return Some(Marker::Comment);
    }
    if let Some(hex) = body.strip_prefix('x') {
        return Some(Marker::CodePoint(hex));
    }
    None
}

/// Decode the hex digits of a `<:xHHHH>` escape.
pub(crate) fn decode_code_point(hex: &str) -> Option<char> {
    if hex.is_empty() || hex.len() > 6 {
        return None;
    }
    u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn directive(body: &str) -> Option<Marker<'_>> {
        parse_marker(Opener::Directive, body)
    }

    #[test]
    fn block_markers() {
        assert_eq!(directive("if:x"), Some(Marker::If("x")));
        assert_eq!(directive("elsif: y > 1"), Some(Marker::Elsif(" y > 1")));
        assert_eq!(directive("else"), Some(Marker::Else));
        assert_eq!(
            directive("for:e:list"),
            Some(Marker::For {
                var: "e",
                container: "list"
            })
        );
        assert_eq!(parse_marker(Opener::Closer, "if"), Some(Marker::EndIf));
        assert_eq!(parse_marker(Opener::Closer, "for"), Some(Marker::EndFor));
        assert_eq!(parse_marker(Opener::Closer, "while"), None);
    }

    #[test]
    fn for_requires_container() {
        assert_eq!(directive("for:e"), None);
    }

    #[test]
    fn set_splits_at_first_equals() {
        assert_eq!(
            directive("set:x=a == b"),
            Some(Marker::Set {
                var: "x",
                value: "a == b"
            })
        );
    }

    #[test]
    fn call_and_exec_forms() {
        assert_eq!(
            directive("call:sub:a=1,b=2"),
            Some(Marker::Call {
                name: "sub",
                args: Some("a=1,b=2")
            })
        );
        assert_eq!(directive("call:sub"), Some(Marker::Call { name: "sub", args: None }));
        assert_eq!(directive("exec:flush"), Some(Marker::Exec { op: "flush", arg: None }));
        assert_eq!(
            directive("exec:put:x.y"),
            Some(Marker::Exec {
                op: "put",
                arg: Some("x.y")
            })
        );
    }

    #[test]
    fn debug_forms() {
        assert_eq!(
            directive("debug"),
            Some(Marker::Debug {
                value: None,
                compare: None
            })
        );
        assert_eq!(
            directive("debug:x"),
            Some(Marker::Debug {
                value: Some("x"),
                compare: None
            })
        );
        assert_eq!(
            directive("debug:x:42"),
            Some(Marker::Debug {
                value: Some("x"),
                compare: Some("42")
            })
        );
        assert_eq!(directive("debugger"), None);
    }

    #[test]
    fn whitespace_and_escapes() {
        assert_eq!(directive(" "), Some(Marker::SkipSpace));
        assert_eq!(directive("?nl"), Some(Marker::SkipNewline));
        assert_eq!(directive("? "), Some(Marker::SkipBlanks));
        assert_eq!(directive("n"), Some(Marker::Escape('\n')));
        assert_eq!(directive("s"), Some(Marker::Escape(' ')));
        assert_eq!(directive("x263A"), Some(Marker::CodePoint("263A")));
        assert_eq!(directive("-- note"), Some(Marker::Comment));
        assert_eq!(directive("bogus"), None);
    }

    #[test]
    fn code_points() {
        assert_eq!(decode_code_point("41"), Some('A'));
        assert_eq!(decode_code_point("263a"), Some('\u{263a}'));
        assert_eq!(decode_code_point(""), None);
        assert_eq!(decode_code_point("D800"), None);
        assert_eq!(decode_code_point("zz"), None);
        assert_eq!(decode_code_point("1234567"), None);
    }
}
