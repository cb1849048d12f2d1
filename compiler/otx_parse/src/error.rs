//! Compile-time errors.
//!
//! Only structural problems abort compilation. Unknown names are not errors:
//! the compiler renders them as inline placeholders instead.

use std::fmt;

/// Byte range in template source.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        Span { start, end }
    }

    #[must_use]
    pub const fn shifted(self, offset: usize) -> Self {
        Span {
            start: self.start + offset,
            end: self.end + offset,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// 1-based line and column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (u32, u32) {
    let offset = offset.min(source.len());
    let before = source.get(..offset).unwrap_or(source);
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (
        u32::try_from(line).unwrap_or(u32::MAX),
        u32::try_from(column).unwrap_or(u32::MAX),
    )
}

/// What is structurally wrong with a template.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MalformedKind {
    #[error("marker is never closed with `>`")]
    UnterminatedMarker,
    #[error("unknown marker `<{0}>`")]
    UnknownMarker(String),
    #[error("`<.{0}>` does not close any block")]
    UnmatchedCloser(&'static str),
    #[error("`<.{found}>` cannot close the open `{expected}` block")]
    MismatchedCloser {
        expected: &'static str,
        found: &'static str,
    },
    /// Raised with the opening marker's span, so `line` and `column` always
    /// match the enclosing error's position.
    #[error("unclosed `{construct}` block opened at {line}:{column}")]
    UnclosedBlock {
        construct: &'static str,
        line: u32,
        column: u32,
    },
    #[error("`<:{0}>` outside of an `if` block")]
    BranchOutsideIf(&'static str),
    #[error("`<:{0}>` after `<:else>`")]
    BranchAfterElse(&'static str),
    #[error("invalid expression `{text}`: {reason}")]
    InvalidExpression { text: String, reason: String },
    #[error("invalid variable name `{0}`")]
    InvalidName(String),
    #[error("invalid code point `{0}`")]
    InvalidCodePoint(String),
    #[error("unknown call target `{0}`")]
    UnknownCallTarget(String),
    #[error("template `{template}` has no parameter `{param}`")]
    UnknownCallParameter { template: String, param: String },
    #[error("`exec` used without an operation provider")]
    NoOperationProvider,
    #[error("unknown operation `{0}`")]
    UnknownOperation(String),
    #[error("operation `{name}` {requirement}")]
    OperationArity {
        name: String,
        requirement: &'static str,
    },
    #[error("duplicate parameter `{0}`")]
    DuplicateParameter(String),
    #[error("template segment is never closed with `<.otx>`")]
    UnterminatedSegment,
    #[error("template segment opened inside segment `{0}`")]
    NestedSegment(String),
    #[error("`<.otx>` does not close any segment")]
    StraySegmentCloser,
    #[error("duplicate template `{0}`")]
    DuplicateTemplate(String),
    #[error("invalid segment header: {0}")]
    InvalidSegmentHeader(String),
}

/// A structural compile-time failure. Fatal to the template being built.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{template}:{line}:{column}: {kind}")]
pub struct MalformedTemplate {
    pub template: String,
    pub span: Span,
    pub line: u32,
    pub column: u32,
    pub kind: MalformedKind,
}

impl MalformedTemplate {
    pub fn new(template: &str, source: &str, span: Span, kind: MalformedKind) -> Self {
        let (line, column) = line_col(source, span.start);
        MalformedTemplate {
            template: template.to_string(),
            span,
            line,
            column,
            kind,
        }
    }

    /// Re-anchor an error from a sub-slice onto the full source it came from.
    #[must_use]
    pub fn rebase(self, offset: usize, full_source: &str) -> Self {
        let span = self.span.shifted(offset);
        let (line, column) = line_col(full_source, span.start);
        let kind = match self.kind {
            MalformedKind::UnclosedBlock { construct, .. } => MalformedKind::UnclosedBlock {
                construct,
                line,
                column,
            },
            kind => kind,
        };
        MalformedTemplate {
            template: self.template,
            span,
            line,
            column,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_col_counts_from_one() {
        let src = "ab\ncd\nef";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 1), (1, 2));
        assert_eq!(line_col(src, 3), (2, 1));
        assert_eq!(line_col(src, 7), (3, 2));
        assert_eq!(line_col(src, 100), (3, 3));
    }

    #[test]
    fn display_includes_position() {
        let err = MalformedTemplate::new(
            "page",
            "x\n<.if>",
            Span::new(2, 7),
            MalformedKind::UnmatchedCloser("if"),
        );
        assert_eq!(err.to_string(), "page:2:1: `<.if>` does not close any block");
    }

    #[test]
    fn rebase_moves_span_and_position() {
        let full = "header\nbody <.for>";
        let body = "body <.for>";
        let err = MalformedTemplate::new("t", body, Span::new(5, 11), MalformedKind::UnmatchedCloser("for"))
            .rebase(7, full);
        assert_eq!(err.span, Span::new(12, 18));
        assert_eq!((err.line, err.column), (2, 6));
    }

    #[test]
    fn rebase_moves_unclosed_block_position() {
        let full = "<:otx:t>\nbody\n <:for:x:xs>";
        let body = "body\n <:for:x:xs>";
        let err = MalformedTemplate::new(
            "t",
            body,
            Span::new(6, 17),
            MalformedKind::UnclosedBlock {
                construct: "for",
                line: 2,
                column: 2,
            },
        )
        .rebase(9, full);
        assert_eq!((err.line, err.column), (3, 2));
        assert_eq!(err.to_string(), "t:3:2: unclosed `for` block opened at 3:2");
    }

    #[test]
    fn arity_message() {
        let kind = MalformedKind::OperationArity {
            name: "greet".to_string(),
            requirement: "requires an argument",
        };
        assert_eq!(kind.to_string(), "operation `greet` requires an argument");
    }
}
