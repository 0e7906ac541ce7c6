mod common;

use common::{Session, eval};
use numlang::RuntimeError;

fn runtime_error(err: &miette::Report) -> &RuntimeError {
    err.downcast_ref::<RuntimeError>()
        .unwrap_or_else(|| panic!("expected a runtime error, got {err:?}"))
}

#[test]
fn numbers_evaluate_to_themselves() {
    for n in [0.0, 1.0, 42.0, 123456789.0] {
        assert_eq!(eval(&format!("{n}")), n);
    }
}

#[test]
fn arithmetic() {
    assert_eq!(eval("1 + 2 * 3"), 7.0);
    assert_eq!(eval("(1 + 2) * 3"), 9.0);
    assert_eq!(eval("10 - 4 - 3"), 3.0);
    assert_eq!(eval("7 / 2"), 3.5);
    assert_eq!(eval("-3 + +5"), 2.0);
}

#[test]
fn division_by_zero_follows_floating_point() {
    assert_eq!(eval("1 / 0"), f64::INFINITY);
    assert_eq!(eval("-1 / 0"), f64::NEG_INFINITY);
    assert!(eval("0 / 0").is_nan());
}

#[test]
fn comparisons_yield_one_or_zero() {
    assert_eq!(eval("1 < 2"), 1.0);
    assert_eq!(eval("2 < 1"), 0.0);
    assert_eq!(eval("2 <= 2"), 1.0);
    assert_eq!(eval("3 >= 4"), 0.0);
    assert_eq!(eval("3 > 2"), 1.0);
    assert_eq!(eval("3 == 3"), 1.0);
    assert_eq!(eval("3 != 3"), 0.0);
}

#[test]
fn pure_expressions_are_idempotent() {
    let mut session = Session::new();
    for _ in 0..5 {
        assert_eq!(session.value("2 * (3 + 4)"), 14.0);
    }
}

#[test]
fn assignment_yields_the_assigned_value() {
    let mut session = Session::new();
    assert_eq!(session.value("x = 7"), 7.0);
    assert_eq!(session.value("a = b = 2"), 2.0);
    assert_eq!(session.value("a + b"), 4.0);
}

#[test]
fn block_value_is_its_last_statement() {
    assert_eq!(eval("{ 1; 2; 3 }"), 3.0);
    assert_eq!(eval("{}"), 0.0);
    assert_eq!(eval(""), 0.0);
}

#[test]
fn if_else() {
    assert_eq!(eval("if (1) 10; else 20;"), 10.0);
    assert_eq!(eval("if (0) 10; else 20;"), 20.0);
    assert_eq!(eval("if (0) 10"), 0.0);
    assert_eq!(eval("if (0 * 5) 1 else 2"), 2.0);
}

#[test]
fn while_loop_value() {
    let mut session = Session::new();
    assert_eq!(session.value("i = 0; while (i < 3) { i = i + 1; }"), 3.0);
    assert_eq!(session.value("while (0) 5"), 0.0);
}

#[test]
fn for_loop_value_and_clauses() {
    let mut session = Session::new();
    assert_eq!(session.value("s = 0; for (i = 1; i <= 4; i = i + 1) s = s + i"), 10.0);
    assert_eq!(session.value("i"), 5.0);
    assert_eq!(session.value("for (; 0;) 1"), 0.0);
}

#[test]
fn for_without_condition_ends_on_return() {
    let mut session = Session::new();
    session.value("func first_over(n) { for (i = 0;; i = i + 1) { if (i * i > n) return i; } }");
    assert_eq!(session.value("first_over(10)"), 4.0);
}

#[test]
fn function_definition_yields_zero_and_persists() {
    let mut session = Session::new();
    assert_eq!(session.value("func sq(x) { return x * x; }"), 0.0);
    assert_eq!(session.value("sq(9)"), 81.0);
}

#[test]
fn function_without_return_yields_body_value() {
    let mut session = Session::new();
    session.value("func twice(x) { x * 2 }");
    assert_eq!(session.value("twice(4)"), 8.0);
    session.value("func nothing() {}");
    assert_eq!(session.value("nothing()"), 0.0);
}

#[test]
fn return_skips_remaining_statements() {
    let mut session = Session::new();
    session.value("func f() { while (1) { return 5; print(99); } }");
    assert_eq!(session.value("f()"), 5.0);
    assert_eq!(session.printed(), "");
    session.value("func g() { return; }");
    assert_eq!(session.value("g()"), 0.0);
}

#[test]
fn recursion() {
    let mut session = Session::new();
    session.value("func fact(n) { if (n <= 1) return 1; return n * fact(n - 1); }");
    assert_eq!(session.value("fact(10)"), 3628800.0);
    session.value("func fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); }");
    assert_eq!(session.value("fib(15)"), 610.0);
}

#[test]
fn parameters_never_leak_into_the_caller() {
    let mut session = Session::new();
    session.value("a = 100");
    session.value("func f(a, tmp) { a = a + 1; return a + tmp; }");
    assert_eq!(session.value("f(1, 2)"), 4.0);
    assert_eq!(session.value("a"), 100.0);
    assert!(session.eval("tmp").is_err());
}

#[test]
fn call_scope_sees_and_updates_caller_bindings() {
    let mut session = Session::new();
    session.value("counter = 0");
    session.value("func bump() { counter = counter + 1; fresh = 1; }");
    session.value("bump(); bump()");
    assert_eq!(session.value("counter"), 2.0);
    assert!(session.eval("fresh").is_err());
}

#[test]
fn functions_defined_inside_a_call_are_discarded() {
    let mut session = Session::new();
    session.value("func outer() { func inner() { return 3; } return inner(); }");
    assert_eq!(session.value("outer()"), 3.0);
    let err = session.error("inner()");
    assert!(matches!(runtime_error(&err), RuntimeError::UndefinedFunction(name) if name == "inner"));
}

#[test]
fn arguments_are_evaluated_left_to_right_in_the_caller() {
    let mut session = Session::new();
    session.value("func pair(a, b) { return a * 10 + b; }");
    assert_eq!(session.value("n = 1; pair(n = n + 1, n = n * 3)"), 26.0);
}

#[test]
fn print_renders_integers_and_fractions() {
    let mut session = Session::new();
    assert_eq!(session.value("print(1, 4 / 2, 7 / 2, 0 * -1)"), 0.0);
    assert_eq!(session.printed(), "1 2 3.5 0\n");
    session.value("print()");
    assert_eq!(session.printed(), "\n");
    session.value("print(1 / 0, 0 - 1 / 0)");
    assert_eq!(session.printed(), "inf -inf\n");
}

#[test]
fn print_is_available_inside_functions() {
    let mut session = Session::new();
    session.value("func show(x) { print(x, x * x); }");
    session.value("show(3)");
    assert_eq!(session.printed(), "3 9\n");
}

#[test]
fn undefined_variable() {
    let err = Session::new().error("y");
    assert!(matches!(runtime_error(&err), RuntimeError::UndefinedVariable(name) if name == "y"));
}

#[test]
fn undefined_function() {
    let err = Session::new().error("nope(1)");
    assert!(matches!(runtime_error(&err), RuntimeError::UndefinedFunction(name) if name == "nope"));
}

#[test]
fn arity_mismatch_names_the_function() {
    let mut session = Session::new();
    session.value("func add(a, b) { return a + b; }");
    for call in ["add()", "add(1)", "add(1, 2, 3)"] {
        let err = session.error(call);
        assert!(matches!(
            runtime_error(&err),
            RuntimeError::ArityMismatch { name, expected: 2, .. } if name == "add"
        ));
        assert!(err.to_string().contains("add"));
    }
}

#[test]
fn arity_is_checked_before_arguments_run() {
    let mut session = Session::new();
    session.value("func one(a) { return a; }");
    session.error("one(x = 1, 2)");
    assert!(session.eval("x").is_err());
}

#[test]
fn top_level_return_is_an_error() {
    let mut session = Session::new();
    let err = session.error("x = 1; return x = 2; x = 3");
    assert!(matches!(runtime_error(&err), RuntimeError::TopLevelReturn));
    assert_eq!(session.value("x"), 2.0);
    let err = session.error("while (1) { return; }");
    assert!(matches!(runtime_error(&err), RuntimeError::TopLevelReturn));
}

#[test]
fn output_sink_failures_are_reported() {
    struct Broken;
    impl std::io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::other("closed"))
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    let program = numlang::parse("print(1)").unwrap();
    let mut env = numlang::Environment::new();
    let err = numlang::evaluate(&program, &mut env, &mut Broken).unwrap_err();
    assert!(matches!(runtime_error(&err), RuntimeError::Output(_)));
}
