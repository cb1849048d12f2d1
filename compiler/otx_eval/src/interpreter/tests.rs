use std::collections::BTreeMap;
use std::sync::Arc;

use otx_ir::{Arity, OperationTable, Structural, TemplateRegistry};
use otx_parse::{compile, read_templates, CompileOptions, ReaderOptions};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::*;
use crate::DebugTrigger;

fn template_with(source: &str, options: &CompileOptions<'_>) -> Template {
    compile("t", source, options).unwrap_or_else(|e| panic!("{e}"))
}

fn template(source: &str, params: &[&str]) -> Template {
    template_with(source, &CompileOptions::new().params(params.iter().copied()))
}

fn render_with(interpreter: &Interpreter, t: &Template, bind: &[(&str, Value)]) -> String {
    let mut ctx = Context::new(t);
    for (name, value) in bind {
        assert_eq!(ctx.set(name, value.clone()), Ok(()));
    }
    interpreter.render(t, &mut ctx).unwrap_or_else(|e| panic!("{e}"))
}

fn render(t: &Template, bind: &[(&str, Value)]) -> String {
    render_with(&Interpreter::new(), t, bind)
}

fn ints(values: &[i64]) -> Value {
    Value::from(values.iter().map(|&n| Value::Int(n)).collect::<Vec<_>>())
}

fn registry(source: &str) -> Arc<TemplateRegistry> {
    read_templates("test.otx", source, &ReaderOptions::new()).unwrap_or_else(|e| panic!("{e}"))
}

fn render_named(registry: &TemplateRegistry, name: &str, bind: &[(&str, Value)]) -> Result<String, RunError> {
    let t = registry
        .resolve(name)
        .unwrap_or_else(|| panic!("no template `{name}`"));
    let mut ctx = Context::new(&t);
    for (param, value) in bind {
        assert_eq!(ctx.set(param, value.clone()), Ok(()));
    }
    Interpreter::builder().max_call_depth(16).build().render(&t, &mut ctx)
}

// Basic rendering

#[test]
fn hello_world() {
    let t = template("Hello <&name>!", &["name"]);
    assert_eq!(render(&t, &[("name", Value::from("World"))]), "Hello World!");
}

#[test]
fn absent_value_renders_placeholder_and_continues() {
    let t = template("[<&name>]after", &["name"]);
    assert_eq!(render(&t, &[]), "[[?name: no value]]after");
    assert_eq!(render(&t, &[("name", Value::Null)]), "[[?name: no value]]after");
    assert_eq!(render(&t, &[("name", Value::from(""))]), "[]after");
}

#[test]
fn absent_field_renders_placeholder() {
    let mut map = BTreeMap::new();
    map.insert("gone".to_string(), Value::Null);
    let t = template("<&m.gone>.", &["m"]);
    assert_eq!(render(&t, &[("m", Value::from(map))]), "[?m.gone: no value].");
}

#[test]
fn absent_value_is_silent_without_placeholders() {
    let quiet = Interpreter::builder().placeholders(false).build();
    let t = template("[<&name>]", &["name"]);
    assert_eq!(render_with(&quiet, &t, &[]), "[]");
}

#[test]
fn if_else_follows_truthiness() {
    let t = template("<:if:x>yes<:else>no<.if>", &["x"]);
    assert_eq!(render(&t, &[("x", Value::Int(0))]), "no");
    assert_eq!(render(&t, &[("x", Value::Int(1))]), "yes");
    assert_eq!(render(&t, &[("x", Value::from(""))]), "yes");
    assert_eq!(render(&t, &[]), "no");
}

#[test]
fn elsif_chain_takes_at_most_one_branch() {
    let t = template("<:if:a>A<:elsif:b>B<:elsif:c>C<.if>.", &["a", "b", "c"]);
    let on = Value::Bool(true);
    assert_eq!(render(&t, &[("a", on.clone()), ("b", on.clone())]), "A.");
    assert_eq!(render(&t, &[("b", on.clone()), ("c", on.clone())]), "B.");
    assert_eq!(render(&t, &[("c", on)]), "C.");
    assert_eq!(render(&t, &[]), ".");
}

#[test]
fn else_runs_only_when_every_link_fails() {
    let t = template("<:if:a>A<:elsif:b>B<:else>E<.if>", &["a", "b"]);
    assert_eq!(render(&t, &[("b", Value::Int(2))]), "B");
    assert_eq!(render(&t, &[]), "E");
}

#[test]
fn nested_blocks() {
    let t = template(
        "<:for:row:rows><:for:cell:row><:if:cell><&cell><:else>-<.if><.for>;<.for>",
        &["rows"],
    );
    let rows = Value::from(vec![ints(&[1, 0]), ints(&[]), ints(&[3])]);
    assert_eq!(render(&t, &[("rows", rows)]), "1-;;3;");
}

// Loops

#[test]
fn for_with_separator() {
    let t = template("<:for:e:list><&e><:if:e_next>, <.if><.for>", &["list"]);
    assert_eq!(render(&t, &[("list", ints(&[1, 2, 3]))]), "1, 2, 3");
    assert_eq!(render(&t, &[("list", ints(&[7]))]), "7");
    assert_eq!(render(&t, &[("list", ints(&[]))]), "");
}

#[test]
fn lookahead_slot_is_null_on_last_pass() {
    let t = template("<:for:e:xs><&e>:<&e_next>;<.for>", &["xs"]);
    assert_eq!(render(&t, &[("xs", ints(&[1, 2]))]), "1:2;2:[?e_next: no value];");
}

#[test]
fn for_over_map_values_in_key_order() {
    let mut map = BTreeMap::new();
    map.insert("b".to_string(), Value::from("second"));
    map.insert("a".to_string(), Value::from("first"));
    let t = template("<:for:v:m><&v> <.for>", &["m"]);
    assert_eq!(render(&t, &[("m", Value::from(map))]), "first second ");
}

#[derive(Debug)]
struct Countdown(i64);

impl Structural for Countdown {
    fn type_name(&self) -> &str {
        "countdown"
    }

    fn field(&self, name: &str) -> Option<Value> {
        (name == "from").then_some(Value::Int(self.0))
    }

    fn elements(&self) -> Option<Box<dyn Iterator<Item = Value> + '_>> {
        Some(Box::new((1..=self.0).rev().map(Value::Int)))
    }
}

#[test]
fn for_over_host_sequence() {
    let t = template("<:for:n:c><&n><.for>", &["c"]);
    assert_eq!(render(&t, &[("c", Value::object(Countdown(3)))]), "321");
}

#[test]
fn for_over_non_container_renders_placeholder_and_skips_body() {
    let t = template("<:for:e:n>body<.for>after", &["n"]);
    assert_eq!(render(&t, &[("n", Value::Int(4))]), "[?n: cannot iterate over int]after");
    let plain = template("<:for:e:p>body<.for>", &["p"]);
    assert_eq!(
        render(&plain, &[("p", Value::object(Point))]),
        "[?p: cannot iterate over point]"
    );
}

#[test]
fn absent_container_iterates_zero_times() {
    let t = template("<:for:e:n>body<.for>after", &["n"]);
    assert_eq!(render(&t, &[]), "after");
    let unknown = template("<:for:e:ghost>body<.for>after", &[]);
    assert_eq!(render(&unknown, &[]), "[?ghost: unknown variable]after");
}

#[derive(Debug)]
struct Point;

impl Structural for Point {
    fn type_name(&self) -> &str {
        "point"
    }

    fn field(&self, _name: &str) -> Option<Value> {
        None
    }
}

#[test]
fn set_accumulates_across_iterations() {
    let t = template("<:set:total=0><:for:x:xs><:set:total=total + x><.for><&total>", &["xs"]);
    assert_eq!(render(&t, &[("xs", ints(&[1, 2, 3]))]), "6");
}

// Data failures

#[test]
fn missing_field_renders_placeholder_and_continues() {
    let mut map = BTreeMap::new();
    map.insert("other".to_string(), Value::Int(1));
    let t = template("<&data.field> and more", &["data"]);
    assert_eq!(
        render(&t, &[("data", Value::from(map))]),
        "[?data.field: no field `field` on map] and more"
    );
}

#[test]
fn failed_condition_is_false() {
    let t = template("<:if:(a / b)>yes<:else>no<.if>", &["a", "b"]);
    assert_eq!(
        render(&t, &[("a", Value::Int(1)), ("b", Value::Int(0))]),
        "[?a / b: division by zero]no"
    );
}

#[test]
fn placeholders_can_be_disabled() {
    let quiet = Interpreter::builder().placeholders(false).build();
    let t = template("a<&x.y>b", &["x"]);
    assert_eq!(render_with(&quiet, &t, &[("x", Value::Int(1))]), "ab");
}

// Calls

#[test]
fn static_call_binds_by_slot() {
    let sub = compile("sub", "<&a>-<&b>", &CompileOptions::new().params(["a", "b"]))
        .map(Arc::new)
        .unwrap_or_else(|e| panic!("{e}"));
    let mut reg = TemplateRegistry::new();
    reg.register("sub", sub);
    let caller = template_with(
        "<:call:sub:a=1,b=2>",
        &CompileOptions::new().params(["a", "b"]).registry(&reg),
    );
    assert_eq!(
        render(&caller, &[("a", Value::from("x")), ("b", Value::from("y"))]),
        "1-2"
    );
}

#[test]
fn arguments_are_bound_at_call_time() {
    let reg = registry(
        "<:otx:show:v>(<&v>)<.otx>\
         <:otx:main><:set:a=1><:call:show:v=a><:set:a=2><&a><.otx>",
    );
    assert_eq!(render_named(&reg, "main", &[]).ok(), Some("(1)2".to_string()));
}

#[test]
fn callee_state_does_not_survive_between_calls() {
    let reg = registry(
        "<:otx:mark:v,seen>[<&seen>]<:set:seen=v><.otx>\
         <:otx:main:xs><:for:x:xs><:call:mark:v=x><.for><.otx>",
    );
    assert_eq!(
        render_named(&reg, "main", &[("xs", ints(&[1, 2]))]).ok(),
        Some("[[?seen: no value]][[?seen: no value]]".to_string())
    );
}

#[test]
fn forward_reference_and_self_recursion() {
    let reg = registry(
        "<:otx:main:n>(<:call:down:n=n>)<.otx>\
         <:otx:down:n><&n><:if:n><:call:down:n=n - 1><.if><.otx>",
    );
    assert_eq!(render_named(&reg, "main", &[("n", Value::Int(3))]).ok(), Some("(3210)".to_string()));
}

#[test]
fn runaway_recursion_is_fatal() {
    let reg = registry("<:otx:a><:call:b><.otx><:otx:b><:call:a><.otx>");
    match render_named(&reg, "a", &[]) {
        Err(RunError::RecursionLimitExceeded { limit, chain }) => {
            assert_eq!(limit, 16);
            assert_eq!(chain.len(), 18);
            assert_eq!(&chain[..4], &["a", "b", "a", "b"]);
        }
        other => panic!("expected recursion error, got {other:?}"),
    }
}

#[test]
fn default_depth_limit() {
    assert_eq!(Interpreter::new().max_call_depth(), DEFAULT_MAX_CALL_DEPTH);
}

#[test]
fn dynamic_call_through_slot() {
    let part = compile("part", "<&v>!", &CompileOptions::new().params(["v"]))
        .map(Arc::new)
        .unwrap_or_else(|e| panic!("{e}"));
    let other = compile("other", "<&v>?", &CompileOptions::new().params(["v"]))
        .map(Arc::new)
        .unwrap_or_else(|e| panic!("{e}"));
    let t = template("<:call:part:v=1>", &["part"]);
    assert_eq!(render(&t, &[("part", Value::template(part))]), "1!");
    assert_eq!(render(&t, &[("part", Value::template(other))]), "1?");
    assert_eq!(
        render(&t, &[("part", Value::Int(3))]),
        "[?part: expected a template, found int]"
    );
}

#[test]
fn named_argument_must_exist_on_callee() {
    let part = compile("part", "x", &CompileOptions::new())
        .map(Arc::new)
        .unwrap_or_else(|e| panic!("{e}"));
    let t = template("<:call:part:zz=1>", &["part"]);
    assert_eq!(
        render(&t, &[("part", Value::template(part))]),
        "[?zz: template `part` has no parameter `zz`]x"
    );
}

#[test]
fn dropped_registry_renders_placeholder() {
    let reg = registry("<:otx:a>[<:call:b>]<.otx><:otx:b>b<.otx>");
    let a = reg.resolve("a").unwrap_or_else(|| panic!("missing a"));
    drop(reg);
    assert_eq!(render(&a, &[]), "[[?b: template registry is no longer alive]]");
}

// Context checks

#[test]
fn context_for_another_template_writes_nothing() {
    let t = template("text", &[]);
    let other = template("text", &[]);
    let mut ctx = Context::new(&other);
    let mut out = String::new();
    let result = Interpreter::new().run(&t, &mut ctx, &mut out);
    assert!(matches!(
        result,
        Err(RunError::ContextMismatch { expected, found, .. }) if expected == t.id() && found == other.id()
    ));
    assert_eq!(out, "");
}

struct FailingSink;

impl fmt::Write for FailingSink {
    fn write_str(&mut self, _s: &str) -> fmt::Result {
        Err(fmt::Error)
    }
}

#[test]
fn sink_failure_aborts() {
    let t = template("text", &[]);
    let mut ctx = Context::new(&t);
    let result = Interpreter::new().run(&t, &mut ctx, &mut FailingSink);
    assert!(matches!(result, Err(RunError::Output(_))));
}

// Exec and debug

#[derive(Debug)]
struct Greeter {
    name: &'static str,
}

impl Structural for Greeter {
    fn type_name(&self) -> &str {
        "greeter"
    }

    fn field(&self, name: &str) -> Option<Value> {
        (name == "name").then(|| Value::from(self.name))
    }
}

fn greeter_ops() -> Arc<OperationTable> {
    Arc::new(
        OperationTable::new("greeter")
            .register("hello", Arity::Nullary, |target, _| match target {
                Value::Object(obj) => Ok(Value::from(format!("hi {}", obj.field("name").unwrap_or_default()))),
                _ => Err("not a greeter".to_string()),
            })
            .register("shout", Arity::Unary, |_, arg| {
                Ok(Value::from(arg.map(ToString::to_string).unwrap_or_default().to_uppercase()))
            })
            .register("quiet", Arity::Nullary, |_, _| Ok(Value::Null))
            .register("fail", Arity::Nullary, |_, _| Err("boom".to_string())),
    )
}

#[test]
fn exec_invokes_against_the_operation_target() {
    let options = CompileOptions::new().params(["w"]).operations(greeter_ops());
    let t = template_with("<:exec:hello>/<:exec:shout:w>/<:exec:quiet>/<:exec:fail>", &options);
    let mut ctx = Context::new(&t);
    ctx.bind_operation_target(Value::object(Greeter { name: "ada" }));
    assert_eq!(ctx.set("w", "hey"), Ok(()));
    assert_eq!(
        Interpreter::new().render(&t, &mut ctx).ok(),
        Some("hi ada/HEY//[?fail: operation failed: boom]".to_string())
    );
}

#[test]
fn exec_without_matching_target_renders_placeholder() {
    let options = CompileOptions::new().operations(greeter_ops());
    let t = template_with("<:exec:hello>.", &options);
    assert_eq!(
        render(&t, &[]),
        "[?hello: operation target must be greeter, found null]."
    );
}

#[test]
fn this_reads_the_operation_target() {
    let t = template("<&this.name>", &[]);
    let mut ctx = Context::new(&t);
    ctx.bind_operation_target(Value::object(Greeter { name: "bo" }));
    assert_eq!(Interpreter::new().render(&t, &mut ctx).ok(), Some("bo".to_string()));
}

#[test]
fn debug_trigger_fires_without_output() {
    let t = template("a<:debug>b<:debug:x:7>c<:debug:x:8>d", &["x"]);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let mut ctx = Context::new(&t);
    assert_eq!(ctx.set("x", 7), Ok(()));
    ctx.set_debug_trigger(DebugTrigger::new(move |event| {
        log.lock().push((event.index, event.value.cloned(), event.compare.map(str::to_string)));
    }));
    assert_eq!(Interpreter::new().render(&t, &mut ctx).ok(), Some("abcd".to_string()));
    assert_eq!(
        *seen.lock(),
        vec![(1, None, None), (3, Some(Value::Int(7)), Some("7".to_string()))]
    );
}

#[test]
fn debug_trigger_reaches_called_templates() {
    let reg = registry("<:otx:inner><:debug><.otx><:otx:outer><:call:inner><.otx>");
    let outer = reg.resolve("outer").unwrap_or_else(|| panic!("missing outer"));
    let hits = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&hits);
    let mut ctx = Context::new(&outer);
    ctx.set_debug_trigger(DebugTrigger::new(move |event| log.lock().push(event.template.to_string())));
    assert!(Interpreter::new().render(&outer, &mut ctx).is_ok());
    assert_eq!(*hits.lock(), vec!["inner".to_string()]);
}

// Concurrency

#[test]
fn one_template_many_threads() {
    let t = Arc::new(template("<:for:e:xs><&e * k><.for>", &["xs", "k"]));
    let handles: Vec<_> = (1..=4)
        .map(|k| {
            let t = Arc::clone(&t);
            std::thread::spawn(move || {
                let mut ctx = Context::new(&t);
                let _ = ctx.set("xs", ints(&[1, 2, 3]));
                let _ = ctx.set("k", k);
                Interpreter::new().render(&t, &mut ctx).ok()
            })
        })
        .collect();
    let results: Vec<Option<String>> = handles.into_iter().map(|h| h.join().ok().flatten()).collect();
    assert_eq!(
        results,
        vec![
            Some("123".to_string()),
            Some("246".to_string()),
            Some("369".to_string()),
            Some("4812".to_string()),
        ]
    );
}

#[test]
fn context_can_be_reused_after_reset() {
    let t = template("<&a><:set:b=a>", &["a"]);
    let mut ctx = Context::new(&t);
    let interpreter = Interpreter::new();
    let _ = ctx.set("a", 1);
    assert_eq!(interpreter.render(&t, &mut ctx).ok(), Some("1".to_string()));
    assert_eq!(ctx.get("b"), Some(&Value::Int(1)));
    ctx.reset();
    assert_eq!(interpreter.render(&t, &mut ctx).ok(), Some("[?a: no value]".to_string()));
    assert_eq!(ctx.get("b"), Some(&Value::Null));
}

proptest! {
    #[test]
    fn marker_free_text_renders_verbatim(text in "[^<]{0,80}", n in 0i64..100) {
        let t = template(&text, &["n"]);
        prop_assert_eq!(render(&t, &[("n", Value::Int(n))]), text);
    }

    #[test]
    fn loop_body_runs_once_per_element(items in proptest::collection::vec(1i64..10, 0..20)) {
        let t = template("<:for:e:xs>x<:if:e_next>,<.if><.for>", &["xs"]);
        let out = render(&t, &[("xs", ints(&items))]);
        prop_assert_eq!(out.matches('x').count(), items.len());
        prop_assert_eq!(out.matches(',').count(), items.len().saturating_sub(1));
    }
}
