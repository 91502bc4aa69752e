//! Performance benchmarks for the Micro-C compiler phases.
//!
//! Each phase is measured on its own input (tokens, tree, tables, module), so
//! a regression points at the phase that caused it. Inputs are the programs
//! in `test_scripts/` plus a generated stress program.
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to collect per-function timings:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- "stress" --profile-time 5
//! ```

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use microc::{CompileOptions, compile};
use microc_compiler::{CodeGenerator, Optimiser, SemanticAnalyzer};
use microc_parser::{Parser, parse, scan};
use std::fmt::Write as _;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// `functions` small functions, each calling the previous one, and a `main`
/// that calls the last.
fn stress_program(functions: usize) -> String {
    let mut source = String::from("int f0(int n) { return n; }\n");
    for i in 1..functions {
        let _ = write!(
            source,
            "int f{i}(int n) {{\n\
             \x20   int total = 0;\n\
             \x20   int k;\n\
             \x20   for (k = 0; k < n; k = k + 1) {{\n\
             \x20       if (k % 2 == 0) total = total + k * {i};\n\
             \x20       else total = total - f{prev}(k);\n\
             \x20   }}\n\
             \x20   return total ^ 1;\n\
             }}\n",
            prev = i - 1
        );
    }
    let _ = writeln!(source, "int main() {{ print(f{}(10)); return 0; }}", functions - 1);
    source
}

fn inputs() -> Vec<(&'static str, String)> {
    vec![
        ("fibonacci", include_str!("../test_scripts/fibonacci.c").to_string()),
        ("many_args", include_str!("../test_scripts/many_args.c").to_string()),
        ("arithmetic", include_str!("../test_scripts/arithmetic.c").to_string()),
        ("stress_200", stress_program(200)),
    ]
}

/// Each phase on prepared input.
fn phase_benchmarks(c: &mut Criterion) {
    setup_profiler();

    for (name, source) in inputs() {
        let mut group = c.benchmark_group(format!("phases/{name}"));
        group.throughput(Throughput::Bytes(source.len() as u64));

        group.bench_function("lex", |b| {
            b.iter(|| {
                let arena = Bump::new();
                black_box(scan(black_box(&source), &arena).tokens.len())
            });
        });

        group.bench_function("parse", |b| {
            b.iter(|| {
                let arena = Bump::new();
                let tokens = scan(&source, &arena).into_result().unwrap();
                black_box(parse(black_box(tokens), &arena).unwrap().functions.len())
            });
        });

        let arena = Bump::new();
        let program = Parser::parse(&source, &arena).unwrap();

        group.bench_function("analyze", |b| {
            b.iter(|| {
                let analysis = SemanticAnalyzer::new().analyze(black_box(&program)).unwrap();
                black_box(analysis.types.len())
            });
        });

        let analysis = SemanticAnalyzer::new().analyze(&program).unwrap();

        group.bench_function("codegen", |b| {
            b.iter(|| {
                let module = CodeGenerator::from_analysis(&analysis)
                    .generate(black_box(&program))
                    .unwrap();
                black_box(module.instruction_count())
            });
        });

        let module = CodeGenerator::from_analysis(&analysis).generate(&program).unwrap();

        group.bench_function("optimise", |b| {
            b.iter(|| {
                let mut module = module.clone();
                let stats = Optimiser::default().optimise(black_box(&mut module));
                end_profiling_frame();
                black_box(stats.total())
            });
        });

        group.finish();
    }
}

/// The whole pipeline at growing program sizes.
fn end_to_end_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for functions in [10, 100, 1000] {
        let source = stress_program(functions);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("stress", functions), &source, |b, source| {
            b.iter(|| {
                let compilation = compile(black_box(source), &CompileOptions::default()).unwrap();
                end_profiling_frame();
                black_box(compilation.module.instruction_count())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, phase_benchmarks, end_to_end_benchmarks);
criterion_main!(benches);
