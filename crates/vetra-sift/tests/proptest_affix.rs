//! Property tests for the affix predicates against std as the oracle.

use proptest::prelude::*;
use vetra_core::{Record, Value};
use vetra_sift::build::literal;
use vetra_sift::{Config, Control, EvalContext, Expr, FunctionArgs, FunctionRegistry};

fn run_predicate(name: &str, haystack: &str, needle: &str, ignorecase: bool) -> bool {
    let registry = FunctionRegistry::with_builtins();
    let mut args = FunctionArgs::new(vec![literal(haystack), literal(needle)]);
    if ignorecase {
        args = args.with_named("ignorecase", literal(true));
    }
    let mut expr = registry.construct(name, args).unwrap();
    expr.init(&Config::default()).unwrap();

    let mut ctx = EvalContext::new(Record::new());
    match vetra_sift::expr::eval_expr(&*expr, &mut ctx).unwrap() {
        Control::Value(Value::Bool(b)) => b,
        other => panic!("expected boolean, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn startswith_agrees_with_std(h in "[a-zA-Z0-9]{0,16}", n in "[a-zA-Z0-9]{0,6}") {
        prop_assert_eq!(run_predicate("startswith", &h, &n, false), h.starts_with(&n));
    }

    #[test]
    fn endswith_agrees_with_std(h in "[a-zA-Z0-9]{0,16}", n in "[a-zA-Z0-9]{0,6}") {
        prop_assert_eq!(run_predicate("endswith", &h, &n, false), h.ends_with(&n));
    }

    #[test]
    fn includes_agrees_with_std(h in "[a-zA-Z0-9]{0,16}", n in "[a-zA-Z0-9]{0,6}") {
        prop_assert_eq!(run_predicate("includes", &h, &n, false), h.contains(&n));
    }

    #[test]
    fn ignorecase_matches_lowercased_oracle(h in "[a-zA-Z]{0,12}", n in "[a-zA-Z]{0,4}") {
        let expected = h.to_lowercase().contains(&n.to_lowercase());
        prop_assert_eq!(run_predicate("includes", &h, &n, true), expected);
    }

    #[test]
    fn empty_needle_always_matches(h in "[a-zA-Z0-9]{0,16}") {
        for name in ["startswith", "endswith", "includes"] {
            prop_assert!(run_predicate(name, &h, "", false));
        }
    }
}
