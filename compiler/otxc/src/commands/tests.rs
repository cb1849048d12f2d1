use std::io::Write as _;

use otx_ir::Value;
use pretty_assertions::assert_eq;

use super::*;

fn temp_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|e| panic!("temp file: {e}"));
    file.write_all(contents.as_bytes())
        .unwrap_or_else(|e| panic!("write temp file: {e}"));
    file
}

fn path_of(file: &tempfile::NamedTempFile) -> String {
    file.path().to_string_lossy().into_owned()
}

#[test]
fn param_values_are_typed() {
    assert_eq!(parse_param_value("42"), Value::Int(42));
    assert_eq!(parse_param_value("-7"), Value::Int(-7));
    assert_eq!(parse_param_value("2.5"), Value::Float(2.5));
    assert_eq!(parse_param_value("true"), Value::Bool(true));
    assert_eq!(parse_param_value("false"), Value::Bool(false));
    assert_eq!(parse_param_value("null"), Value::Null);
    assert_eq!(parse_param_value("\"42\""), Value::from("42"));
    assert_eq!(parse_param_value("'a b'"), Value::from("a b"));
    assert_eq!(parse_param_value("hello"), Value::from("hello"));
    assert_eq!(parse_param_value(""), Value::from(""));
}

#[test]
fn float_words_stay_strings() {
    assert_eq!(parse_param_value("inf"), Value::from("inf"));
    assert_eq!(parse_param_value("NaN"), Value::from("NaN"));
}

#[test]
fn binding_splits_on_first_equals() {
    let (name, value) = parse_binding("expr=a=b").unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(name, "expr");
    assert_eq!(value, Value::from("a=b"));
}

#[test]
fn binding_needs_a_name() {
    assert!(matches!(parse_binding("novalue"), Err(CliError::InvalidBinding(_))));
    assert!(matches!(parse_binding("=1"), Err(CliError::InvalidBinding(_))));
}

#[test]
fn missing_file_is_reported_by_path() {
    let err = check_file("/definitely/not/here.otx").err();
    assert!(matches!(err, Some(CliError::NotFound { .. })));
    assert_eq!(
        err.map(|e| e.report(false)),
        Some("error: cannot find file '/definitely/not/here.otx'\n".to_string())
    );
}

#[test]
fn malformed_file_reports_snippet() {
    let file = temp_file("<:otx:page>\nhi <.for>\n<.otx>\n");
    let err = check_file(&path_of(&file)).err();
    assert!(matches!(err, Some(CliError::Malformed { .. })), "{err:?}");
    let report = err.map(|e| e.report(false)).unwrap_or_default();
    assert!(report.contains("`<.for>` does not close any block"), "{report}");
}

#[test]
fn render_binds_parameters() {
    let file = temp_file("<:otx:greet:name,count,loud>\n<&name> x<&count><:if:loud>!<.if>\n<.otx>\n");
    let mut out = String::new();
    let bindings = vec![
        "name='big world'".to_string(),
        "count=3".to_string(),
        "loud=true".to_string(),
    ];
    render_file(&path_of(&file), "greet", &bindings, &mut out).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(out, "big world x3!");
}

#[test]
fn render_rejects_unknown_parameter() {
    let file = temp_file("<:otx:page:title>\n<&title>\n<.otx>\n");
    let mut out = String::new();
    let err = render_file(&path_of(&file), "page", &["nope=1".to_string()], &mut out).err();
    assert!(matches!(err, Some(CliError::Bind(_))), "{err:?}");
}

#[test]
fn render_rejects_unknown_template() {
    let file = temp_file("<:otx:page>\nx\n<.otx>\n");
    let mut out = String::new();
    let err = render_file(&path_of(&file), "other", &[], &mut out).err();
    assert!(matches!(err, Some(CliError::UnknownTemplate { .. })), "{err:?}");
}

#[test]
fn dump_lists_templates_in_name_order() {
    let file = temp_file("<:otx:b>\ny\n<.otx>\n<:otx:a>\nx\n<.otx>\n");
    let listing = dump_file(&path_of(&file), None).unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(
        listing,
        "template a (0 params: [], 0 slots, 0 call sites)\n\
         0000 literal  \"x\"\n\
         \n\
         template b (0 params: [], 0 slots, 0 call sites)\n\
         0000 literal  \"y\"\n"
    );
}
