//! regexp_search generator scenarios.

use vetra_core::{Record, Value, ValueKind};
use vetra_sift::build::*;
use vetra_sift::{Config, ConfigError, Control, EvalContext, Expr, FunctionArgs, FunctionRegistry};

fn search(
    subject: Box<dyn Expr>,
    pattern: &str,
    named: &[(&str, bool)],
) -> Result<Box<dyn Expr>, ConfigError> {
    let mut args = FunctionArgs::new(vec![subject, literal(pattern)]);
    for (name, flag) in named {
        args = args.with_named(name, literal(*flag));
    }
    let mut expr = FunctionRegistry::with_builtins().construct("regexp_search", args)?;
    expr.init(&Config::default())?;
    Ok(expr)
}

fn eval(expr: &dyn Expr, record: Record) -> Value {
    let mut ctx = EvalContext::new(record);
    match vetra_sift::expr::eval_expr(expr, &mut ctx).expect("eval should succeed") {
        Control::Value(v) => v,
        other => panic!("expected a value, got {:?}", other),
    }
}

#[test]
fn test_named_group_renames_numeric_key() {
    let expr = search(literal("foo123bar"), r"(?<n>\d+)", &[]).unwrap();
    let value = eval(&*expr, Record::new());

    assert_eq!(value.len(), Some(1), "group 0 is elided: {}", value.repr());
    assert_eq!(value.get_subscript(&Value::from("n")), Some(Value::from("123")));
    assert_eq!(value.get_subscript(&Value::from("1")), None);
}

#[test]
fn test_keep_zero_retains_whole_match() {
    let expr = search(literal("foo123bar"), r"(?<n>\d+)", &[("keep_zero", true)]).unwrap();
    let value = eval(&*expr, Record::new());

    assert_eq!(value.len(), Some(2));
    assert_eq!(
        value.get_subscript(&Value::from("0")),
        Some(Value::from("foo123bar"))
    );
    assert_eq!(value.get_subscript(&Value::from("n")), Some(Value::from("123")));
}

#[test]
fn test_list_mode_collects_groups_in_order() {
    let expr = search(literal("foo123bar"), r"(?<n>\d+)", &[("list_mode", true)]).unwrap();
    let value = eval(&*expr, Record::new());
    assert_eq!(value, Value::from(vec!["123"]));

    let multi = search(literal("2024-06-01"), r"(\d+)-(\d+)-(\d+)", &[("list_mode", true)]).unwrap();
    let value = eval(&*multi, Record::new());
    assert_eq!(value, Value::from(vec!["2024", "06", "01"]));
}

#[test]
fn test_pattern_without_groups_keeps_whole_match() {
    // with a single group (the whole match), group 0 is not elided
    let expr = search(literal("abc123"), r"\d+", &[]).unwrap();
    let value = eval(&*expr, Record::new());
    assert_eq!(value.get_subscript(&Value::from("0")), Some(Value::from("123")));
}

#[test]
fn test_no_match_yields_empty_container() {
    let dict = search(literal("letters"), r"\d+(x)", &[]).unwrap();
    assert_eq!(eval(&*dict, Record::new()).len(), Some(0));

    let list = search(literal("letters"), r"\d+(x)", &[("list_mode", true)]).unwrap();
    assert_eq!(eval(&*list, Record::new()).len(), Some(0));
}

#[test]
fn test_unmatched_optional_group_is_skipped() {
    let expr = search(literal("abc"), r"(a)(x)?(c)?", &[]).unwrap();
    let value = eval(&*expr, Record::new());
    assert_eq!(value.get_subscript(&Value::from("1")), Some(Value::from("a")));
    assert_eq!(value.get_subscript(&Value::from("2")), None);
}

#[test]
fn test_subject_comes_from_the_record() {
    let expr = search(
        variable("$regexp_test_msg"),
        r"user=(?<user>\w+)",
        &[],
    )
    .unwrap();
    let record = Record::new().with_field(
        "regexp_test_msg",
        "login user=alice ok",
        ValueKind::String,
    );
    let value = eval(&*expr, record);
    assert_eq!(
        value.get_subscript(&Value::from("user")),
        Some(Value::from("alice"))
    );
}

#[test]
fn test_bad_pattern_is_a_config_error() {
    let result = search(literal("x"), r"(unclosed", &[]);
    assert!(matches!(result, Err(ConfigError::BadPattern { .. })));
}

#[test]
fn test_non_literal_pattern_is_rejected() {
    let args = FunctionArgs::new(vec![literal("x"), variable("regexp_test_pattern")]);
    let result = FunctionRegistry::with_builtins().construct("regexp_search", args);
    assert!(matches!(result, Err(ConfigError::LiteralRequired { .. })));
}
