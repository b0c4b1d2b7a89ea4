//! Benchmarks for the MAS-Lang front end and unroller.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use maslang::frontend::{Lexer, Parser};
use maslang::transform::Unrolling;

const PROGRAM: &str = r#"
    array data = [4, 8, 15, 16, 23, 42, 7, 1, 9, 12];
    int total = 0;
    int evens = 0;
    float mean;
    for (int i = 0; i < 10; i++) {
        total += data[i];
        if (data[i] % 2 == 0) {
            evens++;
        } else if (data[i] > 20) {
            total -= 1;
        } else {
            print(data[i]);
        }
    }
    mean = total / 10.0;
    int k = 100;
    while (k > 0) {
        total = total + k * 2 - 1;
        k = k - 3;
    }
    print(concat("mean: ", "done"));
    print(mean);
"#;

/// A program with `copies` copies of the loop-heavy section.
fn scaled_program(copies: usize) -> String {
    let mut source = String::from("int acc = 0;\nint j;\n");
    for n in 0..copies {
        source.push_str(&format!(
            "for (j = 0; j < {}; j = j + 2) {{ acc = acc + j * {} - (acc % 7); }}\n",
            10 + n, n
        ));
    }
    source
}

/// Benchmark lexer speed.
fn bench_lexing(c: &mut Criterion) {
    c.bench_function("lex_program", |b| {
        b.iter(|| Lexer::new(black_box(PROGRAM)).tokenize().unwrap())
    });
}

/// Benchmark parsing speed.
fn bench_parsing(c: &mut Criterion) {
    c.bench_function("parse_program", |b| {
        b.iter(|| {
            let mut parser = Parser::new(Lexer::new(black_box(PROGRAM))).unwrap();
            parser.parse_program().unwrap()
        })
    });
}

/// Benchmark semantic checking.
fn bench_checking(c: &mut Criterion) {
    let program = maslang::parse(PROGRAM).unwrap();
    c.bench_function("check_program", |b| {
        b.iter(|| maslang::check(black_box(&program)))
    });
}

/// Benchmark unrolling at different factors and program sizes.
fn bench_unrolling(c: &mut Criterion) {
    let mut group = c.benchmark_group("unroll");
    for copies in [10, 100] {
        let program = maslang::parse(&scaled_program(copies)).unwrap();
        for factor in [2, 4, 8] {
            group.bench_with_input(
                BenchmarkId::new(format!("factor_{}", factor), copies),
                &program,
                |b, program| {
                    b.iter(|| {
                        let mut program = program.clone();
                        Unrolling::new(factor).run(&mut program)
                    })
                },
            );
        }
    }
    group.finish();
}

criterion_group!(benches, bench_lexing, bench_parsing, bench_checking, bench_unrolling);
criterion_main!(benches);
