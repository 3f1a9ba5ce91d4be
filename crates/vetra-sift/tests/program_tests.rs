//! End-to-end filter program scenarios.

use vetra_core::{Record, Value, ValueKind};
use vetra_sift::build::*;
use vetra_sift::{Config, EvalContext, Program, Verdict};

fn compile(root: Box<dyn vetra_sift::Expr>) -> Program {
    Program::compile(root, Config::default()).expect("program should compile")
}

#[test]
fn test_statement_expression_returns_last_value() {
    // { x = 1; x == 1 } as a statement expression yields true
    let root = compound_returning(true)
        .with(assign(variable("program_x"), literal(1i64)))
        .with(comparison(CmpOp::Eq, variable("program_x"), literal(1i64)))
        .boxed();
    let program = compile(root);

    let (verdict, _) = program.eval(Record::new());
    assert_eq!(verdict.unwrap(), Verdict::Accept(Value::Bool(true)));
}

#[test]
fn test_block_mode_yields_true() {
    // same statements in block mode: the last value is discarded
    let root = compound()
        .with(assign(variable("program_y"), literal(1i64)))
        .with(comparison(CmpOp::Eq, variable("program_y"), literal(1i64)))
        .boxed();
    let program = compile(root);

    let (verdict, _) = program.eval(Record::new());
    assert_eq!(verdict.unwrap(), Verdict::Accept(Value::Bool(true)));
}

#[test]
fn test_falsy_statement_skips_side_effects() {
    // { false; $HOST = "touched" } fails on the first statement and the
    // assignment never runs
    let root = compound()
        .with(literal(false))
        .with(assign(variable("$HOST"), literal("touched")))
        .boxed();
    let program = compile(root);

    let (verdict, record) = program.eval(Record::new());
    let err = verdict.unwrap_err();
    assert_eq!(err.message, "bailing out due to a falsy expr");
    assert!(record.get("HOST").is_none(), "side effect must not run");
}

#[test]
fn test_drop_verdict() {
    let root = compound()
        .with(literal(true))
        .with(drop_record())
        .with(assign(variable("$HOST"), literal("unreachable")))
        .boxed();
    let program = compile(root);

    let (verdict, record) = program.eval(Record::new());
    assert_eq!(verdict.unwrap(), Verdict::Drop);
    assert!(record.get("HOST").is_none());
}

#[test]
fn test_done_verdict_keeps_prior_assignments() {
    let root = compound()
        .with(assign(variable("$program_done_mark"), literal("early")))
        .with(done())
        .with(assign(variable("$program_done_mark"), literal("late")))
        .boxed();
    let program = compile(root);

    let (verdict, record) = program.eval(Record::new());
    assert_eq!(verdict.unwrap(), Verdict::Done);
    let (raw, _) = record.get("program_done_mark").unwrap();
    assert_eq!(&**raw, "early");
}

#[test]
fn test_assignments_sync_back_to_the_record() {
    let root = compound()
        .with(assign(variable("$program_sync_port"), literal(6514i64)))
        .boxed();
    let program = compile(root);

    let (verdict, record) = program.eval(Record::new());
    assert!(verdict.is_ok());
    let (raw, kind) = record.get("program_sync_port").unwrap();
    assert_eq!(&**raw, "6514");
    assert_eq!(kind, ValueKind::Int);
}

#[test]
fn test_record_fields_feed_comparisons() {
    let root = compound()
        .with(comparison(
            CmpOp::Gt,
            variable("$program_severity"),
            literal(3i64),
        ))
        .boxed();
    let program = compile(root);

    let matching = Record::new().with_field("program_severity", "5", ValueKind::Int);
    let (verdict, _) = program.eval(matching);
    assert_eq!(verdict.unwrap(), Verdict::Accept(Value::Bool(true)));

    let other = Record::new().with_field("program_severity", "2", ValueKind::Int);
    let (verdict, _) = program.eval(other);
    assert!(verdict.is_err(), "falsy filter fails the block");
}

#[test]
fn test_declared_variables_survive_across_records() {
    // count = count ?? 0 ; count = 1 pattern via a reused context
    let root = compound()
        .with(assign(
            declared_variable("program_counter"),
            null_coalesce(declared_variable("program_counter"), literal(0i64)),
        ))
        .boxed();
    let program = compile(root);

    let mut ctx = EvalContext::new(Record::new());
    program.eval_in_context(&mut ctx).unwrap();

    // seed a value, then move to the next record
    let seeded = compound()
        .with(assign(declared_variable("program_counter"), literal(41i64)))
        .boxed();
    let seeder = compile(seeded);
    seeder.eval_in_context(&mut ctx).unwrap();

    let _ = ctx.rebind(Record::new());
    let check = compile(
        compound()
            .with(comparison(
                CmpOp::Eq,
                declared_variable("program_counter"),
                literal(41i64),
            ))
            .boxed(),
    );
    assert!(check.eval_in_context(&mut ctx).is_ok());
}

#[test]
fn test_template_enrichment_into_record() {
    let root = compound()
        .with(assign(
            variable("$program_summary"),
            template("${HOST}: ${MESSAGE}").unwrap(),
        ))
        .boxed();
    let program = compile(root);

    let record = Record::new()
        .with_field("HOST", "web-1", ValueKind::String)
        .with_field("MESSAGE", "listening", ValueKind::String);
    let (verdict, record) = program.eval(record);
    assert!(verdict.is_ok());
    let (raw, _) = record.get("program_summary").unwrap();
    assert_eq!(&**raw, "web-1: listening");
}

#[test]
fn test_literal_dict_enrichment() {
    // $program_meta = {"source": "edge", "ports": [1, 2]}
    let root = compound()
        .with(assign(
            variable("$program_meta"),
            literal_dict(vec![
                dict_elem(literal("source"), literal("edge")),
                dict_elem(
                    literal("ports"),
                    literal_list(vec![list_elem(literal(1i64)), list_elem(literal(2i64))]),
                ),
            ]),
        ))
        .boxed();
    let program = compile(root);

    let (verdict, record) = program.eval(Record::new());
    assert!(verdict.is_ok());
    let (raw, kind) = record.get("program_meta").unwrap();
    assert_eq!(kind, ValueKind::Dict);
    assert_eq!(&**raw, r#"{"source":"edge","ports":[1,2]}"#);
}

#[test]
fn test_eval_errors_carry_the_offending_value() {
    let root = compound().with(literal(0i64)).boxed();
    let program = compile(root);

    let (verdict, _) = program.eval(Record::new());
    let err = verdict.unwrap_err();
    assert_eq!(err.detail.as_deref(), Some("0 (int)"));
}
