use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phpgrep_core::pattern::pattern_source;
use phpgrep_core::{parser, Compiler};
use std::fmt::Write;
use std::ops::ControlFlow;

fn synthetic_source(functions: usize) -> String {
    let mut src = String::from("<?php\n");
    for i in 0..functions {
        write!(
            src,
            "function handler{i}($req) {{\n    \
             $id = $req->get('id');\n    \
             if (in_array($id, [1, 2, {i}])) {{\n        \
             return lookup($id, \"key{i}\");\n    \
             }}\n    \
             return $req->param('fallback') ?? {i};\n}}\n"
        )
        .unwrap();
    }
    src
}

fn bench_matcher(c: &mut Criterion) {
    let source = pattern_source(&synthetic_source(200));
    let root = parser::parse_source(&source).expect("synthetic source parses");

    let matcher = Compiler::default()
        .compile(r#"in_array($x, ${"*"})"#, Vec::new())
        .expect("pattern compiles");
    c.bench_function("find_in_array_calls", |b| {
        b.iter(|| {
            let mut hits = 0u32;
            matcher.find_ast(black_box(&root), &source, false, |_| {
                hits += 1;
                ControlFlow::Continue(())
            });
            hits
        })
    });

    let backref = Compiler::default()
        .compile("$x ?? $x", Vec::new())
        .expect("pattern compiles");
    c.bench_function("find_with_backref", |b| {
        b.iter(|| {
            let mut hits = 0u32;
            backref.find_ast(black_box(&root), &source, false, |_| {
                hits += 1;
                ControlFlow::Continue(())
            });
            hits
        })
    });

    c.bench_function("compile_pattern", |b| {
        b.iter(|| {
            Compiler::default()
                .compile(black_box(r#"f(${"x:var"}, ${"*"})"#), Vec::new())
                .unwrap()
        })
    });

    c.bench_function("parse_source", |b| {
        b.iter(|| parser::parse_source(black_box(&source)).unwrap())
    });
}

criterion_group!(benches, bench_matcher);
criterion_main!(benches);
