use spi_core::language::interpreter::call_stack::{ArType, StackAction};
use spi_core::language::interpreter::MAX_CALL_DEPTH_LIMIT;
use spi_core::language::parser::MAX_EXPRESSION_DEPTH;
use spi_core::language::{parse, Interpreter, SemanticAnalyzer};
use spi_core::{evaluate_expression, run_source, ErrorCode, ErrorKind, RunOptions, RunOutcome, Value};

fn run(source: &str) -> RunOutcome {
    run_source(source, &RunOptions::default()).unwrap_or_else(|e| panic!("run failed: {}", e))
}

fn run_err(source: &str, options: &RunOptions) -> spi_core::Error {
    match run_source(source, options) {
        Ok(outcome) => panic!("run should fail, memory was {:?}", outcome.memory),
        Err(e) => e,
    }
}

fn assert_close(value: Option<&Value>, expected: f64) {
    match value {
        Some(Value::Real(actual)) => assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected),
        other => panic!("expected a REAL near {}, got {:?}", expected, other),
    }
}

#[test]
fn integer_arithmetic_expressions() {
    let cases = [
        ("3", 3),
        ("2 + 7 * 4", 30),
        ("7 - 8 DIV 4", 5),
        ("14 + 2 * 3 - 6 DIV 2", 17),
        ("7 + 3 * (10 DIV (12 DIV (3 + 1) - 1))", 22),
        ("7 + 3 * (10 DIV (12 DIV (3 + 1) - 1)) DIV (2 + 3) - 5 - 3 + (8)", 10),
        ("7 + (((3 + 2)))", 12),
        ("- 3", -3),
        ("+ 3", 3),
        ("5 - - - + - 3", 8),
        ("5 - - - + - (3 + 4) - +2", 10),
    ];

    for (expr, expected) in cases {
        let outcome = run(&format!(
            "PROGRAM Test;
               VAR
                   a : INTEGER;
               BEGIN
                   a := {}
               END.
            ",
            expr
        ));
        assert_eq!(outcome.memory.get("a"), Some(&Value::Integer(expected)), "evaluating {}", expr);
    }
}

#[test]
fn float_arithmetic_expressions() {
    let cases = [("3.14", 3.14), ("2.14 + 7 * 4", 30.14), ("7.14 - 8 / 4", 5.14)];

    for (expr, expected) in cases {
        let outcome = run(&format!(
            "PROGRAM Test;
               VAR
                   a : REAL;
               BEGIN
                   a := {}
               END.
            ",
            expr
        ));
        assert_close(outcome.memory.get("a"), expected);
    }
}

#[test]
fn procedure_call_binds_arguments() {
    let source = "\
program Main;

procedure Alpha(a : integer; b : integer);
var x : integer;
begin
   x := (a + b ) * 2;
end;

begin { Main }

   Alpha(3 + 5, 7);

end.  { Main }
";
    let options = RunOptions { log_stack: true, ..RunOptions::default() };
    let outcome = run_source(source, &options).unwrap();

    // Alpha only touches its own record, so main ends up empty.
    assert!(outcome.memory.is_empty());

    let leave_alpha = outcome
        .stack_events
        .iter()
        .find(|event| event.action == StackAction::Leave && event.record.ar_type == ArType::Procedure)
        .expect("no LEAVE event for Alpha");
    assert_eq!(leave_alpha.record.name, "Alpha");
    assert_eq!(leave_alpha.record.nesting_level, 2);
    assert_eq!(leave_alpha.record.get("a"), Some(Value::Integer(8)));
    assert_eq!(leave_alpha.record.get("b"), Some(Value::Integer(7)));
    assert_eq!(leave_alpha.record.get("x"), Some(Value::Integer(30)));

    let actions: Vec<(StackAction, &str)> = outcome
        .stack_events
        .iter()
        .map(|event| (event.action, event.record.name.as_str()))
        .collect();
    assert_eq!(
        actions,
        vec![
            (StackAction::Enter, "Main"),
            (StackAction::Enter, "Alpha"),
            (StackAction::Leave, "Alpha"),
            (StackAction::Leave, "Main"),
        ]
    );
}

#[test]
fn whole_program_with_nested_procedures() {
    let source = "\
PROGRAM Part12;
VAR
   number : INTEGER;
   a, b   : INTEGER;
   y      : REAL;

PROCEDURE P1;
VAR
   a : REAL;
   k : INTEGER;
   PROCEDURE P2;
   VAR
      a, z : INTEGER;
   BEGIN {P2}
      z := 777;
   END;  {P2}
BEGIN {P1}

END;  {P1}

BEGIN {Part12}
   number := 2;
   a := number ;
   b := 10 * a + 10 * number DIV 4;
   y := 20 / 7 + 3.14
END.  {Part12}
";
    let outcome = run(source);

    assert_eq!(outcome.program, "Part12");
    assert_eq!(outcome.memory.len(), 4);
    assert_eq!(outcome.memory.get("number"), Some(&Value::Integer(2)));
    assert_eq!(outcome.memory.get("a"), Some(&Value::Integer(2)));
    assert_eq!(outcome.memory.get("b"), Some(&Value::Integer(25)));
    assert_close(outcome.memory.get("y"), 20.0 / 7.0 + 3.14);
}

#[test]
fn nested_procedures_reach_outer_variables() {
    let outcome = run(
        "PROGRAM Main;
         VAR total : INTEGER;
         PROCEDURE Outer(n : INTEGER);
         VAR doubled : INTEGER;
            PROCEDURE Inner(k : INTEGER);
            BEGIN
               total := doubled + k
            END;
         BEGIN
            doubled := n * 2;
            Inner(1)
         END;
         BEGIN
            total := 0;
            Outer(20)
         END.",
    );
    assert_eq!(outcome.memory.get("total"), Some(&Value::Integer(41)));
}

#[test]
fn unbounded_recursion_hits_the_depth_limit() {
    let options = RunOptions { max_call_depth: 16, ..RunOptions::default() };
    let err = run_err(
        "PROGRAM Main;
         PROCEDURE Forever(k : INTEGER);
         BEGIN
            Forever(k + 1)
         END;
         BEGIN
            Forever(0)
         END.",
        &options,
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.code, ErrorCode::RecursionLimit);
    assert_eq!(err.lexeme.as_deref(), Some("Forever"));
    assert_eq!(err.line, Some(4));
}

const ENDLESS: &str = "PROGRAM Main; PROCEDURE F(k : INTEGER); BEGIN F(k + 1) END; BEGIN F(0) END.";

#[test]
fn recursion_limit_holds_at_the_highest_depth() {
    let options = RunOptions { max_call_depth: MAX_CALL_DEPTH_LIMIT, ..RunOptions::default() };
    let err = run_err(ENDLESS, &options);
    assert_eq!(err.code, ErrorCode::RecursionLimit);
    assert!(err.message.contains(&MAX_CALL_DEPTH_LIMIT.to_string()), "{}", err.message);
}

#[test]
fn oversized_depth_is_clamped() {
    let options = RunOptions { max_call_depth: 1_000_000, ..RunOptions::default() };
    let err = run_err(ENDLESS, &options);
    assert_eq!(err.code, ErrorCode::RecursionLimit);
    assert!(err.message.contains(&MAX_CALL_DEPTH_LIMIT.to_string()), "{}", err.message);
}

#[test]
fn failing_procedure_still_leaves_its_frame() {
    let tree = parse(
        "PROGRAM M;
         VAR x : INTEGER;
         PROCEDURE P;
         BEGIN
            x := 1 DIV 0
         END;
         BEGIN
            P()
         END.",
    )
    .unwrap();
    SemanticAnalyzer::new().analyze(&tree).unwrap();

    let mut interpreter = Interpreter::new(&tree).with_stack_logging(true);
    let err = interpreter.interpret().unwrap_err();
    assert_eq!(err.code, ErrorCode::DivisionByZero);
    assert_eq!(err.line, Some(5));

    let actions: Vec<(StackAction, &str)> = interpreter
        .stack_events()
        .iter()
        .map(|event| (event.action, event.record.name.as_str()))
        .collect();
    assert_eq!(
        actions,
        vec![
            (StackAction::Enter, "M"),
            (StackAction::Enter, "P"),
            (StackAction::Leave, "P"),
            (StackAction::Leave, "M"),
        ]
    );
}

#[test]
fn global_memory_after_interpret() {
    let tree = parse("PROGRAM Main; VAR a, b : INTEGER; y : REAL; BEGIN a := 2; b := a * 10; y := b / 4 END.").unwrap();
    SemanticAnalyzer::new().analyze(&tree).unwrap();

    let mut interpreter = Interpreter::new(&tree);
    interpreter.interpret().unwrap();

    let memory = interpreter.global_memory();
    assert_eq!(memory.get("a"), Some(&Value::Integer(2)));
    assert_eq!(memory.get("b"), Some(&Value::Integer(20)));
    assert_eq!(memory.get("y"), Some(&Value::Real(5.0)));
    assert!(interpreter.stack_events().is_empty());
}

#[test]
fn locals_do_not_outlive_their_call() {
    let err = run_err(
        "PROGRAM Main;
         VAR seen : INTEGER;
         PROCEDURE Keep;
         VAR local : INTEGER;
         BEGIN
            local := 5;
            seen := local
         END;
         BEGIN
            Keep();
            Keep();
            seen := local
         END.",
        &RunOptions::default(),
    );
    // `local` is not visible from the program body at all.
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert_eq!(err.code, ErrorCode::IdNotFound);

    let options = RunOptions { log_stack: true, ..RunOptions::default() };
    let outcome = run_source(
        "PROGRAM Main;
         VAR seen : INTEGER;
         PROCEDURE Bump(n : INTEGER);
         VAR local : INTEGER;
         BEGIN
            local := n;
            seen := seen + local
         END;
         BEGIN
            seen := 0;
            Bump(1);
            Bump(2)
         END.",
        &options,
    )
    .unwrap();
    assert_eq!(outcome.memory.get("seen"), Some(&Value::Integer(3)));

    let entries: Vec<_> = outcome
        .stack_events
        .iter()
        .filter(|event| event.action == StackAction::Enter && event.record.name == "Bump")
        .collect();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].record.get("n"), Some(Value::Integer(2)));
    assert_eq!(entries[1].record.get("local"), None);
}

#[test]
fn reading_before_assignment_fails() {
    let err = run_err(
        "PROGRAM Main;
         VAR seen : INTEGER;
         PROCEDURE Peek;
         VAR local : INTEGER;
         BEGIN
            seen := local
         END;
         BEGIN
            Peek()
         END.",
        &RunOptions::default(),
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.code, ErrorCode::UninitializedVariable);
    assert_eq!(err.lexeme.as_deref(), Some("local"));
    assert_eq!(err.line, Some(6));
}

#[test]
fn integers_widen_when_stored_as_real() {
    let outcome = run(
        "PROGRAM Main;
         VAR y, z : REAL;
         PROCEDURE Half(r : REAL);
         BEGIN
            z := r / 2
         END;
         BEGIN
            y := 2;
            Half(5)
         END.",
    );
    assert_eq!(outcome.memory.get("y"), Some(&Value::Real(2.0)));
    assert_eq!(outcome.memory.get("z"), Some(&Value::Real(2.5)));
}

#[test]
fn integer_division_floors() {
    let outcome = run("PROGRAM Main; VAR a, b : INTEGER; BEGIN a := -7 DIV 2; b := 7 DIV 2 END.");
    assert_eq!(outcome.memory.get("a"), Some(&Value::Integer(-4)));
    assert_eq!(outcome.memory.get("b"), Some(&Value::Integer(3)));
}

#[test]
fn division_by_zero_is_a_runtime_error() {
    let err = run_err(
        "PROGRAM Main;
         VAR a : INTEGER;
         BEGIN
            a := 0;
            a := 10 DIV a
         END.",
        &RunOptions::default(),
    );
    assert_eq!(err.kind, ErrorKind::Runtime);
    assert_eq!(err.code, ErrorCode::DivisionByZero);
    assert_eq!(err.lexeme.as_deref(), Some("DIV"));
    assert_eq!(err.line, Some(5));

    let err = run_err("PROGRAM Main; VAR y : REAL; BEGIN y := 1 / 0 END.", &RunOptions::default());
    assert_eq!(err.code, ErrorCode::DivisionByZero);
}

#[test]
fn overflow_is_a_runtime_error() {
    let err = run_err(
        "PROGRAM Main; VAR a : INTEGER; BEGIN a := 9223372036854775807; a := a + 1 END.",
        &RunOptions::default(),
    );
    assert_eq!(err.code, ErrorCode::IntegerOverflow);
}

#[test]
fn real_overflow_is_a_runtime_error() {
    let err = run_err(
        "PROGRAM Main;
         VAR r : REAL;
         BEGIN
            r := 100000000000000000000.0;
            r := r * r * r * r * r * r * r * r * r * r * r * r * r * r * r * r
         END.",
        &RunOptions::default(),
    );
    assert_eq!(err.code, ErrorCode::RealOverflow);
    assert_eq!(err.line, Some(5));
}

#[test]
fn deep_expressions_return_errors() {
    let chain = format!("1{}", "+1".repeat(MAX_EXPRESSION_DEPTH));
    assert_eq!(evaluate_expression(&chain).unwrap(), Value::Integer(MAX_EXPRESSION_DEPTH as i64 + 1));

    let parens = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
    let err = evaluate_expression(&parens).unwrap_err();
    assert_eq!(err.code, ErrorCode::NestingTooDeep);
}

#[test]
fn standalone_expressions() {
    assert_eq!(evaluate_expression("7 + 3 * (10 DIV (12 DIV (3 + 1) - 1))").unwrap(), Value::Integer(22));
    assert_eq!(evaluate_expression("5 - - - + - (3 + 4) - +2").unwrap(), Value::Integer(10));
    assert_eq!(evaluate_expression("10 / 4").unwrap(), Value::Real(2.5));

    let err = evaluate_expression("x + 1").unwrap_err();
    assert_eq!(err.code, ErrorCode::IdNotFound);

    let err = evaluate_expression("2 *").unwrap_err();
    assert_eq!(err.code, ErrorCode::UnexpectedEof);
}
