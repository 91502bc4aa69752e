// tests/optimiser_tests.rs
//! Peephole optimiser tests over whole programs


use microc::CompileOptions;
use microc_compiler::{Optimisations, Optimiser};
use test_harness::*;

const PROGRAMS: &[(&str, &[i64])] = &[
    ("fibonacci.c", &[]),
    ("factorial.c", &[6]),
    ("for_loop.c", &[]),
    ("while_loop.c", &[]),
    ("shadowing.c", &[]),
    ("arithmetic.c", &[]),
    ("comparisons.c", &[]),
    ("many_args.c", &[]),
    ("gcd.c", &[48, 36, 0]),
];

#[test]
fn optimising_twice_changes_nothing() {
    let harness = TestHarness::new();
    for (program, _) in PROGRAMS {
        let compilation = harness.compile_ok(program, &CompileOptions::default());
        let mut module = compilation.module.clone();

        let stats = Optimiser::default().optimise(&mut module);
        assert_eq!(stats.total(), 0, "{program}: second pass rewrote {stats:?}");
        assert_eq!(module, compilation.module, "{program}");
    }
}

#[test]
fn optimised_modules_are_never_larger() {
    let harness = TestHarness::new();
    for (program, _) in PROGRAMS {
        let plain = harness.compile_ok(program, &CompileOptions::unoptimised());
        let optimised = harness.compile_ok(program, &CompileOptions::default());

        assert!(
            optimised.module.instruction_count() < plain.module.instruction_count(),
            "{program}: {} >= {}",
            optimised.module.instruction_count(),
            plain.module.instruction_count()
        );
        assert!(
            optimised.module.instructions().all(|i| !i.is_nop()),
            "{program}: nop survived"
        );
    }
}

#[test]
fn each_rewrite_alone_preserves_behaviour() {
    let harness = TestHarness::new();
    let rewrites = [
        Optimisations::NOP_ELIMINATION,
        Optimisations::PUSH_POP,
        Optimisations::CONSTANT_FOLDING,
        Optimisations::SELF_MOVE,
    ];

    for (program, input) in PROGRAMS {
        let expected = harness.run_with(program, &CompileOptions::unoptimised(), input);
        for rewrite in rewrites {
            let only = CompileOptions::default().with_optimisations(rewrite);
            let without = CompileOptions::default().with_optimisations(Optimisations::all() - rewrite);

            assert_eq!(
                harness.run_with(program, &only, input),
                expected,
                "{program} with only {rewrite:?}"
            );
            assert_eq!(
                harness.run_with(program, &without, input),
                expected,
                "{program} without {rewrite:?}"
            );
        }
    }
}

#[test]
fn no_rewrites_leaves_the_module_alone() {
    let harness = TestHarness::new();
    let plain = harness.compile_ok("many_args.c", &CompileOptions::unoptimised());
    let options = CompileOptions::default().with_optimisations(Optimisations::empty());
    let untouched = harness.compile_ok("many_args.c", &options);

    assert_eq!(untouched.module, plain.module);
    assert_eq!(untouched.stats.map(|s| s.total()), Some(0));
}

#[test]
fn push_pop_pairs_dominate_the_savings() {
    let harness = TestHarness::new();
    let stats = harness
        .compile_ok("arithmetic.c", &CompileOptions::default())
        .stats
        .unwrap();

    assert!(stats.push_pops_combined > 0);
    assert!(stats.constants_folded > 0);
    assert!(stats.push_pops_combined >= stats.constants_folded);
    assert!(stats.iterations >= 1);
}
