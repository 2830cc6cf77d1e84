use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pascvm::{compile, parse};

const FACTORIAL: &str = r#"
program Fatorial;
var
    n, i, fat: integer;
begin
    writeln('Introduza um numero inteiro positivo:');
    readln(n);
    fat := 1;
    for i := 1 to n do
        fat := fat * i;
    writeln('Fatorial de ', n, ': ', fat);
end.
"#;

/// A long straight-line program with nested control flow in every block
fn generated_program(blocks: usize) -> String {
    let mut source = String::from(
        "program Big;\nvar i, j, total: integer; ok: boolean; v: array[1..10] of integer;\nbegin\n",
    );
    for n in 0..blocks {
        source.push_str(&format!(
            "  total := total + {n} * (i - j) / 2;\n\
             \x20 if (total > {n}) and not ok then total := total % 7 else ok := true;\n\
             \x20 for i := 1 to 10 do total := total + v[i];\n\
             \x20 while j < {n} do j := j + 1;\n"
        ));
    }
    source.push_str("  writeln(total)\nend.\n");
    source
}

fn bench_factorial(c: &mut Criterion) {
    c.bench_function("compile factorial", |b| {
        b.iter(|| black_box(compile(black_box(FACTORIAL)).unwrap()))
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let source = generated_program(500);
    c.bench_function("parse 500 blocks", |b| {
        b.iter(|| black_box(parse(black_box(&source))))
    });
}

fn bench_compile_large(c: &mut Criterion) {
    let source = generated_program(500);
    c.bench_function("compile 500 blocks", |b| {
        b.iter(|| black_box(compile(black_box(&source)).unwrap().render()))
    });
}

fn bench_error_recovery(c: &mut Criterion) {
    // Every block has a missing operand; the parser must recover each time
    let source = generated_program(200).replace("total + ", "total + ;");
    c.bench_function("recover 200 errors", |b| {
        b.iter(|| black_box(parse(black_box(&source)).diagnostics.len()))
    });
}

criterion_group!(
    benches,
    bench_factorial,
    bench_parse_large,
    bench_compile_large,
    bench_error_recovery,
);

criterion_main!(benches);
