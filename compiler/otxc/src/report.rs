//! Source-snippet reports for compile errors.

use std::ops::Range;

use ariadne::{Config, Label, Report, ReportKind, Source};
use otx_parse::MalformedTemplate;

/// Render `error` against the file it came from.
///
/// `source` must be the full text the error's span points into (errors from
/// `read_templates` are already rebased onto the whole file).
pub fn render_malformed(path: &str, source: &str, error: &MalformedTemplate, color: bool) -> String {
    let span = char_span(source, error.span.start, error.span.end);
    let report = Report::build(ReportKind::Error, (), span.start)
        .with_config(Config::default().with_color(color))
        .with_message(format!("malformed template `{}`", error.template))
        .with_label(Label::new(span).with_message(error.kind.to_string()))
        .with_note(format!("at {path}:{}:{}", error.line, error.column))
        .finish();

    let mut buf = Vec::new();
    match report.write(Source::from(source), &mut buf) {
        Ok(()) => String::from_utf8_lossy(&buf).into_owned(),
        Err(_) => format!("{path}: {error}\n"),
    }
}

/// Ariadne counts characters; spans count bytes. Never empty, so the label
/// always points at something.
fn char_span(source: &str, start: usize, end: usize) -> Range<usize> {
    let chars_before = |offset: usize| {
        let offset = offset.min(source.len());
        source
            .char_indices()
            .take_while(|&(i, _)| i < offset)
            .count()
    };
    let start = chars_before(start);
    let end = chars_before(end).max(start + 1);
    start..end
}
