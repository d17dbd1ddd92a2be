//! Benchmarks for regex parsing and analysis.
//!
//! These benchmarks measure the cost of the pipeline stages separately
//! and end to end:
//! - Parsing pattern text into the automaton
//! - Backtracking classification on vulnerable and harmless patterns
//! - Stack consumption estimation on deeply wrapped repetitions
//! - The full check suite through the engine

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use rexamine::analysis::{backtracking, stack_usage};
use rexamine::{
    AccessorMethod, AnalysisConfig, Engine, MatchType, PatternId, PatternUsage, RegexFlags,
    UsageOrigin,
};

// =============================================================================
// Pattern Generators
// =============================================================================

/// Generate a literal run of the given length.
fn literal_run(chars: usize) -> String {
    "a".repeat(chars)
}

/// Generate an alternation with the given number of multi-char branches.
fn alternation_run(branches: usize) -> String {
    let mut pattern = String::from("ab0");
    for i in 1..branches {
        pattern.push_str(&format!("|ab{i}"));
    }
    pattern
}

/// Generate an alternation wrapped in the given number of groups,
/// repeated as a whole.
fn wrapped_alternation(depth: usize) -> String {
    let mut pattern = String::new();
    for _ in 0..depth {
        pattern.push('(');
    }
    pattern.push_str("a|b");
    for _ in 0..depth {
        pattern.push(')');
    }
    pattern.push('*');
    pattern
}

/// A pattern shaped like real-world input validation.
fn email_pattern() -> &'static str {
    "^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\\.[a-zA-Z]{2,6}$"
}

fn full_usage() -> PatternUsage {
    PatternUsage {
        pattern: PatternId(0),
        match_type: MatchType::Full,
        invocations: vec![AccessorMethod::Matches],
        escaped: false,
        origin: UsageOrigin::MethodCall,
    }
}

// =============================================================================
// Parsing
// =============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");

    group.bench_function("email", |b| {
        b.iter(|| black_box(rexamine::parse(black_box(email_pattern()), RegexFlags::empty())))
    });

    let nested = wrapped_alternation(16);
    group.bench_function("nested_groups", |b| {
        b.iter(|| black_box(rexamine::parse(black_box(&nested), RegexFlags::empty())))
    });

    group.finish();
}

fn bench_parse_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_scaling");

    for chars in [10, 100, 1000] {
        let pattern = literal_run(chars);
        group.throughput(Throughput::Elements(chars as u64));
        group.bench_with_input(
            BenchmarkId::new("literal_chars", chars),
            &pattern,
            |b, pattern| b.iter(|| black_box(rexamine::parse(black_box(pattern), RegexFlags::empty()))),
        );
    }

    group.finish();
}

// =============================================================================
// Backtracking Classification
// =============================================================================

fn bench_backtracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtracking");

    for (name, pattern) in [
        ("exponential", "(a+)+$"),
        ("quadratic", "x*\\w*"),
        ("harmless", "([^,]*,)*"),
    ] {
        let parse = rexamine::parse(pattern, RegexFlags::empty());
        group.bench_function(name, |b| {
            b.iter(|| black_box(backtracking::classify(black_box(&parse), MatchType::Full)))
        });
    }

    group.finish();
}

// =============================================================================
// Stack Consumption
// =============================================================================

fn bench_stack_usage(c: &mut Criterion) {
    let mut group = c.benchmark_group("stack_usage");

    for depth in [1, 4, 16] {
        let parse = rexamine::parse(&wrapped_alternation(depth), RegexFlags::empty());
        group.bench_with_input(BenchmarkId::new("wrapper_depth", depth), &parse, |b, parse| {
            b.iter(|| black_box(stack_usage::analyze(black_box(parse), 5.0)))
        });
    }

    group.finish();
}

// =============================================================================
// Full Engine
// =============================================================================

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_analyze");

    let engine = Engine::new(AnalysisConfig::new());
    let usage = full_usage();

    for (name, pattern) in [
        ("email", email_pattern().to_string()),
        ("vulnerable", "(a+)+$".to_string()),
        ("wrapped_alternation", wrapped_alternation(8)),
    ] {
        group.bench_with_input(BenchmarkId::new("pattern", name), &pattern, |b, pattern| {
            b.iter(|| black_box(engine.analyze(black_box(pattern), RegexFlags::empty(), &usage)))
        });
    }

    group.finish();
}

fn bench_engine_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_scaling");
    group.sample_size(50); // Reduce samples for the larger patterns

    let engine = Engine::new(AnalysisConfig::new());
    let usage = full_usage();

    for branches in [10, 100, 500] {
        let pattern = alternation_run(branches);
        group.throughput(Throughput::Elements(branches as u64));
        group.bench_with_input(
            BenchmarkId::new("alternation_branches", branches),
            &pattern,
            |b, pattern| {
                b.iter(|| black_box(engine.analyze(black_box(pattern), RegexFlags::empty(), &usage)))
            },
        );
    }

    group.finish();
}

criterion_group!(parse_benches, bench_parse, bench_parse_scaling);

criterion_group!(analysis_benches, bench_backtracking, bench_stack_usage);

criterion_group!(engine_benches, bench_engine, bench_engine_scaling);

criterion_main!(parse_benches, analysis_benches, engine_benches);
