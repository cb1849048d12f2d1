//! Multi-template sources.
//!
//! A source file holds any number of segments:
//!
//! ```text
//! <:otx: row : item >
//! <td><&item.name></td>
//! <.otx>
//! ```
//!
//! Reading is two-pass. The first pass extracts every segment's name,
//! parameters and body; the second compiles each body with every name already
//! visible, so a segment may call one defined further down the file.

use std::sync::{Arc, Weak};

use memchr::memmem;
use otx_ir::{OperationTable, TemplateRegistry, Value};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{MalformedKind, MalformedTemplate, Span};
use crate::expr::is_identifier;
use crate::{compile, CompileOptions};

const SEGMENT_OPEN: &str = "<:otx:";
const SEGMENT_CLOSE: &str = "<.otx>";

/// One raw template segment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment<'a> {
    pub name: &'a str,
    pub params: Vec<&'a str>,
    pub body: &'a str,
    /// Byte offset of `body` within the whole source.
    pub body_offset: usize,
}

/// Options shared by every segment of a source.
#[derive(Clone, Debug, Default)]
pub struct ReaderOptions {
    constants: FxHashMap<String, Value>,
    operations: Option<Arc<OperationTable>>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn constant(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.constants.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn operations(mut self, operations: Arc<OperationTable>) -> Self {
        self.operations = Some(operations);
        self
    }
}

/// First pass: split `source` into its named segments.
///
/// Text outside segments is ignored. A single newline directly after a
/// segment header and directly before its `<.otx>` is not part of the body.
pub fn split_segments<'a>(
    source_name: &str,
    source: &'a str,
) -> Result<Vec<Segment<'a>>, MalformedTemplate> {
    let err = |span: Span, kind| MalformedTemplate::new(source_name, source, span, kind);
    let mut segments: Vec<Segment<'a>> = Vec::new();
    let mut seen = FxHashSet::default();
    let mut pos = 0;

    loop {
        let open = memmem::find(&source.as_bytes()[pos..], SEGMENT_OPEN.as_bytes()).map(|o| o + pos);
        let close = memmem::find(&source.as_bytes()[pos..], SEGMENT_CLOSE.as_bytes()).map(|o| o + pos);
        let open = match (open, close) {
            (None, None) => break,
            (Some(open), Some(close)) if open < close => open,
            (Some(open), None) => open,
            (_, Some(close)) => {
                return Err(err(
                    Span::new(close, close + SEGMENT_CLOSE.len()),
                    MalformedKind::StraySegmentCloser,
                ))
            }
        };

        let header_start = open + SEGMENT_OPEN.len();
        let Some(header_end) = source[header_start..].find('>').map(|o| o + header_start) else {
            return Err(err(Span::new(open, source.len()), MalformedKind::UnterminatedMarker));
        };
        let header_span = Span::new(open, header_end + 1);
        let (name, params) = parse_header(&source[header_start..header_end])
            .map_err(|reason| err(header_span, MalformedKind::InvalidSegmentHeader(reason)))?;
        if !seen.insert(name) {
            return Err(err(header_span, MalformedKind::DuplicateTemplate(name.to_string())));
        }

        let mut body_start = header_end + 1;
        if source[body_start..].starts_with("\r\n") {
            body_start += 2;
        } else if source[body_start..].starts_with('\n') {
            body_start += 1;
        }
        let Some(close) = source[body_start..].find(SEGMENT_CLOSE).map(|o| o + body_start) else {
            return Err(err(header_span, MalformedKind::UnterminatedSegment));
        };
        if let Some(nested) = source[body_start..close].find(SEGMENT_OPEN) {
            let at = body_start + nested;
            return Err(err(
                Span::new(at, at + SEGMENT_OPEN.len()),
                MalformedKind::NestedSegment(name.to_string()),
            ));
        }
        let mut body = &source[body_start..close];
        body = body
            .strip_suffix("\r\n")
            .or_else(|| body.strip_suffix('\n'))
            .unwrap_or(body);

        segments.push(Segment {
            name,
            params,
            body,
            body_offset: body_start,
        });
        pos = close + SEGMENT_CLOSE.len();
    }
    Ok(segments)
}

/// `name : p1, p2` or just `name`.
fn parse_header(header: &str) -> Result<(&str, Vec<&str>), String> {
    let (name, params) = match header.split_once(':') {
        Some((name, params)) => (name.trim(), params),
        None => (header.trim(), ""),
    };
    if !is_identifier(name) {
        return Err(format!("invalid template name `{name}`"));
    }
    let mut out = Vec::new();
    for param in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if !is_identifier(param) {
            return Err(format!("invalid parameter name `{param}`"));
        }
        out.push(param);
    }
    Ok((name, out))
}

/// Second pass: compile every segment of `source` into one registry.
///
/// Segments are compiled in file order. Calls to earlier segments bind
/// statically; calls to later ones (or to the segment itself) resolve by name
/// through the returned registry at run time. The caller owns the registry;
/// templates only hold weak references back to it.
#[tracing::instrument(level = "debug", skip_all, fields(source = source_name))]
pub fn read_templates(
    source_name: &str,
    source: &str,
    options: &ReaderOptions,
) -> Result<Arc<TemplateRegistry>, MalformedTemplate> {
    let segments = split_segments(source_name, source)?;
    let names: Vec<String> = segments.iter().map(|s| s.name.to_string()).collect();
    tracing::debug!(count = segments.len(), "read template segments");

    let mut failure = None;
    let registry = Arc::new_cyclic(|weak: &Weak<TemplateRegistry>| {
        let mut registry = TemplateRegistry::new();
        for segment in &segments {
            let compiled = {
                let mut compile_options = CompileOptions::new()
                    .params(segment.params.iter().copied())
                    .constants(options.constants.clone())
                    .registry(&registry)
                    .runtime_registry(weak.clone())
                    .forward_names(names.iter().cloned());
                if let Some(ops) = &options.operations {
                    compile_options = compile_options.operations(Arc::clone(ops));
                }
                compile(segment.name, segment.body, &compile_options)
            };
            match compiled {
                Ok(template) => registry.register(segment.name, Arc::new(template)),
                Err(e) => {
                    failure = Some(e.rebase(segment.body_offset, source));
                    break;
                }
            }
        }
        registry
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(registry),
    }
}
