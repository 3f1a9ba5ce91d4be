//! Property tests for the value universe invariants.

use proptest::prelude::*;
use std::sync::Arc;
use vetra_core::value::{Dict, List, Value, ValueKind};

fn scalar_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Int),
        // finite doubles only: NaN is not equal to itself and infinities
        // do not render in a parseable form
        any::<f64>()
            .prop_filter("finite", |f| f.is_finite())
            .prop_map(Value::Double),
        "[a-zA-Z0-9 _.-]{0,24}".prop_map(|s| Value::Str(Arc::from(s.as_str()))),
    ]
}

fn tree_value() -> impl Strategy<Value = Value> {
    scalar_value().prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..6)
                .prop_map(|items| Value::List(items.into_iter().collect())),
            prop::collection::vec(("[a-z]{1,8}", inner), 0..6).prop_map(|entries| {
                let mut dict = Dict::new();
                for (k, v) in entries {
                    let _ = dict.insert(Arc::from(k.as_str()), v);
                }
                Value::Dict(dict)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn repr_parse_back_roundtrips_primitives(value in scalar_value()) {
        // null renders as empty text, which is its canonical form
        let parsed = Value::from_typed_text(value.kind(), &value.repr()).unwrap();
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn deep_clone_preserves_observable_state(value in tree_value()) {
        let copy = value.deep_clone();
        prop_assert_eq!(&copy, &value);
        prop_assert_eq!(copy.is_truthy(), value.is_truthy());
        prop_assert_eq!(copy.len(), value.len());
    }

    #[test]
    fn deep_clone_of_containers_is_detached(items in prop::collection::vec(any::<i64>(), 1..6)) {
        let original: List = items.iter().map(|n| Value::Int(*n)).collect();
        let mut copy = match Value::List(original.clone()).deep_clone() {
            Value::List(l) => l,
            _ => unreachable!(),
        };
        copy.push(Value::Null).unwrap();
        prop_assert_eq!(original.len() + 1, copy.len());
    }

    #[test]
    fn truthiness_matches_emptiness_for_strings(s in "[a-z]{0,8}") {
        let value = Value::from(s.as_str());
        prop_assert_eq!(value.is_truthy(), !s.is_empty());
    }

    #[test]
    fn marshal_tags_match_kind(value in tree_value()) {
        let mut out = String::new();
        let kind = value.marshal_into(&mut out);
        prop_assert_eq!(kind, value.kind());
        if matches!(kind, ValueKind::List | ValueKind::Dict) {
            // structured marshalling is parseable back into a container
            let parsed = Value::from_typed_text(kind, &out).unwrap();
            prop_assert_eq!(parsed.len(), value.len());
        }
    }
}
