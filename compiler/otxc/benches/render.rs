//! Compile and render benchmarks for otx templates.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use otxc::{compile, read_templates, CompileOptions, Context, Interpreter, ReaderOptions, Value};

/// Plain text with a few substitutions
const GREETING: &str = "Dear <&name>,\nyour order <&order.id> ships on <&order.date>.\n";

/// Nested blocks with lookahead separators
const TABLE: &str = "\
<table><:for:row:rows>
<tr><:for:cell:row><td><:if:cell>x<:else>-<.if></td><:if:cell_next>|<.if><.for></tr><.for>
</table>";

/// Cross-template calls inside a loop
const SITE: &str = "\
<:otx: page : items >
<ul><:for:e:items><:call:row:item=e><.for></ul>
<.otx>
<:otx: row : item >
<li><&item></li>
<.otx>
";

fn generate_n_literals(n: usize) -> String {
    (0..n)
        .map(|i| format!("line {i} <&v{}>\n", i % 8))
        .collect()
}

fn rows(n: usize, width: usize) -> Value {
    let row: Vec<Value> = (0..width).map(|i| Value::from(i % 2 == 0)).collect();
    Value::from((0..n).map(|_| Value::from(row.clone())).collect::<Vec<_>>())
}

fn bench_compile_greeting(c: &mut Criterion) {
    let options = CompileOptions::new().params(["name", "order"]);
    c.bench_function("compile/greeting", |b| {
        b.iter(|| black_box(compile("greeting", black_box(GREETING), &options)));
    });
}

fn bench_compile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile/lines");
    let options = CompileOptions::new().params((0..8).map(|i| format!("v{i}")));
    for n in [10, 100, 1000] {
        let source = generate_n_literals(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &source, |b, source| {
            b.iter(|| black_box(compile("lines", source, &options)));
        });
    }
    group.finish();
}

fn bench_render_table(c: &mut Criterion) {
    let Ok(template) = compile("table", TABLE, &CompileOptions::new().params(["rows"])) else {
        return;
    };
    let interpreter = Interpreter::new();
    let mut group = c.benchmark_group("render/table");
    for n in [10, 100] {
        let data = rows(n, 8);
        group.bench_with_input(BenchmarkId::from_parameter(n), &data, |b, data| {
            let mut ctx = Context::new(&template);
            b.iter(|| {
                ctx.reset();
                let _ = ctx.set("rows", data.clone());
                black_box(interpreter.render(&template, &mut ctx))
            });
        });
    }
    group.finish();
}

fn bench_render_calls(c: &mut Criterion) {
    let Ok(registry) = read_templates("site", SITE, &ReaderOptions::new()) else {
        return;
    };
    let Some(page) = registry.resolve("page") else {
        return;
    };
    let items = Value::from((0..100_i64).map(Value::from).collect::<Vec<_>>());
    let interpreter = Interpreter::new();

    c.bench_function("render/calls_100", |b| {
        let mut ctx = Context::new(&page);
        b.iter(|| {
            let _ = ctx.set("items", items.clone());
            black_box(interpreter.render(&page, &mut ctx))
        });
    });
}

criterion_group!(
    benches,
    bench_compile_greeting,
    bench_compile_scaling,
    bench_render_table,
    bench_render_calls,
);
criterion_main!(benches);
