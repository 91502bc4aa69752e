// tests/pipeline_tests.rs
//! End-to-end tests: source files compiled through every phase and executed


use microc::CompileOptions;
use microc_compiler::x64::Opcode;
use microc_core::{CompileError, Type};
use microc_parser::ast::TreeStyle;
use test_harness::*;

// ============================================================================
// Programs that run
// ============================================================================

#[test]
fn fibonacci_prints_55() {
    let harness = TestHarness::new();
    let result = harness.run("fibonacci.c", &[]);
    assert_eq!(result.output, "55\n");
    assert_eq!(result.value, 0);
}

#[test]
fn recursive_factorial_reads_its_argument() {
    let harness = TestHarness::new();
    assert_eq!(harness.run("factorial.c", &[5]).output, "120\n");
    assert_eq!(harness.run("factorial.c", &[0]).output, "1\n");
    assert_eq!(harness.run("factorial.c", &[20]).output, "2432902008176640000\n");
}

#[test]
fn for_loop_matches_hand_written_while() {
    let harness = TestHarness::new();
    let lowered = harness.run("for_loop.c", &[]);
    let manual = harness.run("while_loop.c", &[]);

    assert_eq!(lowered.output, "385\n");
    assert_eq!(lowered.value, 385);
    assert_eq!(lowered, manual);
}

#[test]
fn inner_declarations_shadow_outer_ones() {
    let harness = TestHarness::new();
    let result = harness.run("shadowing.c", &[]);
    assert_eq!(result.output, "2\n3\n2\n1\n4\n");
    assert_eq!(result.value, 1);
}

#[test]
fn arithmetic_follows_precedence_and_truncates() {
    let harness = TestHarness::new();
    let result = harness.run("arithmetic.c", &[]);
    let lines: Vec<&str> = result.output.lines().collect();
    assert_eq!(lines, ["7", "9", "13", "-3", "-2", "512", "-4", "100", "7"]);
}

#[test]
fn comparisons_are_signed() {
    let harness = TestHarness::new();
    let result = harness.run("comparisons.c", &[]);
    let lines: Vec<&str> = result.output.lines().collect();
    assert_eq!(
        lines,
        [
            "1 1 0 0 0 1 1 2",
            "0 1 0 1 1 0 2 2",
            "1 1 0 0 0 1 -3 2",
        ]
    );
}

#[test]
fn stack_arguments_reach_callees_in_order() {
    let harness = TestHarness::new();
    let result = harness.run("many_args.c", &[]);
    assert_eq!(result.output, "36\n59\n8 7 6 5 4 3 2 1\n");
}

#[test]
fn loop_over_input_until_zero() {
    let harness = TestHarness::new();
    let result = harness.run("gcd.c", &[12, 18, 35, 14, 17, 5, 0]);
    assert_eq!(result.output, "6\n7\n1\n");
}

// ============================================================================
// Artifacts
// ============================================================================

#[test]
fn assembly_declares_every_function_global() {
    let harness = TestHarness::new();
    let compilation = harness.compile_ok("many_args.c", &CompileOptions::default());
    let assembly = compilation.assembly();

    assert!(assembly.contains(".global weigh"));
    assert!(assembly.contains(".global main"));

    let calls = |target: &str| {
        compilation
            .module
            .instructions()
            .filter(|i| i.opcode == Opcode::Call && i.operand(0) == target)
            .count()
    };
    assert_eq!(calls("weigh"), 2);
    assert_eq!(calls("sum8"), 2);
    assert_eq!(calls("print8"), 1);

    let listed = assembly
        .lines()
        .filter(|line| line.split_whitespace().take(2).eq(["call", "weigh"]))
        .count();
    assert_eq!(listed, 2);
}

#[test]
fn tables_describe_the_program() {
    let harness = TestHarness::new();
    let compilation = harness.compile_ok("many_args.c", &CompileOptions::default());
    let analysis = &compilation.analysis;

    let weigh = analysis.functions.get("weigh").unwrap();
    assert_eq!(weigh.params, vec![Type::Int; 8]);
    assert_eq!(weigh.return_type, Type::Int);
    assert!(analysis.functions.get("print8").unwrap().is_intrinsic());

    assert!(!analysis.symbols.is_empty());
    assert!(!analysis.types.is_empty());
    assert_eq!(
        analysis.functions.to_string().lines().count(),
        analysis.functions.len()
    );
}

#[test]
fn ast_dump_covers_the_whole_program() {
    let harness = TestHarness::new();
    let options = CompileOptions::default().with_ast(TreeStyle::Unicode);
    let ast = harness.compile_ok("fibonacci.c", &options).ast.unwrap();

    assert!(ast.starts_with("Program"));
    assert!(ast.contains("FuncDecl int fibonacci"));
    assert!(ast.contains("FuncDecl int main"));
    assert!(ast.contains("WhileStmt"));
    assert!(!ast.contains("ForStmt"));
}

// ============================================================================
// Rejected programs
// ============================================================================

#[test]
fn initializer_type_mismatch() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.diagnostics("errors/type_mismatch.c"),
        ["2:11: Type of initializer does not match type of variable 'f': expected float, found int"]
    );
}

#[test]
fn call_with_too_few_arguments() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.diagnostics("errors/arity.c"),
        ["6:12: Invalid number of arguments for call to 'add': 1 given, but expected 2"]
    );
}

#[test]
fn call_with_wrong_argument_type() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.diagnostics("errors/argument_type.c"),
        ["6:12: Invalid type for argument 1 of call to 'add': string given, but expected int"]
    );
}

#[test]
fn undefined_and_redefined_variables() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.diagnostics("errors/undefined.c"),
        ["3:12: Undefined variable 'y'"]
    );
    assert_eq!(
        harness.diagnostics("errors/redefinition.c"),
        ["3:9: Cannot redefine variable 'x'"]
    );
}

#[test]
fn every_lexical_error_is_reported() {
    let harness = TestHarness::new();
    assert_eq!(
        harness.diagnostics("errors/lex_errors.c"),
        ["2:15: Invalid character '@'", "3:15: Invalid character '#'"]
    );
}

#[test]
fn chained_equality_is_a_syntax_error() {
    let harness = TestHarness::new();
    let err = harness
        .compile("errors/non_associative.c", &CompileOptions::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::Parse(_)));
    assert_eq!(
        harness.diagnostics("errors/non_associative.c"),
        ["3:19: non-associative operators may not be used multiple times in a row"]
    );
}

#[test]
fn float_functions_pass_analysis_but_not_codegen() {
    let harness = TestHarness::new();
    let err = harness
        .compile("errors/float_codegen.c", &CompileOptions::default())
        .unwrap_err();
    assert!(matches!(err, CompileError::Codegen(_)));
    assert_eq!(
        harness.diagnostics("errors/float_codegen.c"),
        ["1:18: Float parameters not supported by this code generator"]
    );
}
