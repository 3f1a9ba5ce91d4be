//! Dynamic values flowing through the Sift filter engine
//!
//! Every value a filter expression produces or consumes is a [`Value`].
//! Containers ([`Dict`], [`List`]) are copy-on-write: cloning a handle is
//! O(1), and the first mutation through a shared handle unshares the body.
//! [`MessageValue`] carries a raw record field together with its type tag
//! and is parsed into a typed value only when one is actually needed.

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use rustc_hash::FxBuildHasher;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// IndexMap with FxBuildHasher, keyed by `Arc<str>` for O(1) clone.
pub type FxIndexMap<K, V> = IndexMap<K, V, FxBuildHasher>;

/// Type tag of a record field or a marshalled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Null,
    Boolean,
    Int,
    Double,
    String,
    Bytes,
    Datetime,
    List,
    Dict,
}

impl ValueKind {
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Int => "int",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Bytes => "bytes",
            ValueKind::Datetime => "datetime",
            ValueKind::List => "list",
            ValueKind::Dict => "dict",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors raised by value capability calls.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValueError {
    #[error("cannot mutate frozen {0}")]
    Frozen(&'static str),

    #[error("{op} is not supported on {kind}")]
    Unsupported { op: &'static str, kind: &'static str },

    #[error("list index {index} is out of range (len {len})")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("malformed {kind} payload {text:?}")]
    Malformed { kind: ValueKind, text: String },
}

// =============================================================================
// Containers
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DictBody {
    frozen: bool,
    entries: FxIndexMap<Arc<str>, Value>,
}

/// Insertion-ordered string-keyed container with copy-on-write sharing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dict {
    body: Arc<DictBody>,
}

impl Dict {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            body: Arc::new(DictBody {
                frozen: false,
                entries: IndexMap::with_capacity_and_hasher(capacity, FxBuildHasher),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.body.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.body.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.body.entries.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.body.entries.iter()
    }

    /// Unshares the body if another handle still holds it.
    fn body_mut(&mut self) -> Result<&mut DictBody, ValueError> {
        if self.body.frozen {
            return Err(ValueError::Frozen("dict"));
        }
        Ok(Arc::make_mut(&mut self.body))
    }

    pub fn insert(&mut self, key: Arc<str>, value: Value) -> Result<(), ValueError> {
        self.body_mut()?.entries.insert(key, value);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Result<Option<Value>, ValueError> {
        Ok(self.body_mut()?.entries.shift_remove(key))
    }

    /// Rejects all further mutation through any handle sharing this body.
    pub fn freeze(&mut self) {
        if !self.body.frozen {
            Arc::make_mut(&mut self.body).frozen = true;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.body.frozen
    }

    /// Recursive copy with a fresh, unfrozen body.
    pub fn deep_clone(&self) -> Dict {
        let entries = self
            .body
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.deep_clone()))
            .collect();
        Dict {
            body: Arc::new(DictBody { frozen: false, entries }),
        }
    }

    #[doc(hidden)]
    pub fn shares_body_with(&self, other: &Dict) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for Dict {
    fn eq(&self, other: &Self) -> bool {
        self.body.entries == other.body.entries
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ListBody {
    frozen: bool,
    items: Vec<Value>,
}

/// Ordered container with copy-on-write sharing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct List {
    body: Arc<ListBody>,
}

impl List {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.body.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.body.items.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.body.items.iter()
    }

    fn body_mut(&mut self) -> Result<&mut ListBody, ValueError> {
        if self.body.frozen {
            return Err(ValueError::Frozen("list"));
        }
        Ok(Arc::make_mut(&mut self.body))
    }

    pub fn push(&mut self, value: Value) -> Result<(), ValueError> {
        self.body_mut()?.items.push(value);
        Ok(())
    }

    pub fn set(&mut self, index: usize, value: Value) -> Result<(), ValueError> {
        let len = self.len();
        let body = self.body_mut()?;
        match body.items.get_mut(index) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ValueError::IndexOutOfRange {
                index: index as i64,
                len,
            }),
        }
    }

    pub fn remove(&mut self, index: usize) -> Result<Option<Value>, ValueError> {
        let body = self.body_mut()?;
        if index < body.items.len() {
            Ok(Some(body.items.remove(index)))
        } else {
            Ok(None)
        }
    }

    pub fn freeze(&mut self) {
        if !self.body.frozen {
            Arc::make_mut(&mut self.body).frozen = true;
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.body.frozen
    }

    pub fn deep_clone(&self) -> List {
        let items = self.body.items.iter().map(Value::deep_clone).collect();
        List {
            body: Arc::new(ListBody { frozen: false, items }),
        }
    }

    #[doc(hidden)]
    pub fn shares_body_with(&self, other: &List) -> bool {
        Arc::ptr_eq(&self.body, &other.body)
    }
}

impl PartialEq for List {
    fn eq(&self, other: &Self) -> bool {
        self.body.items == other.body.items
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        List {
            body: Arc::new(ListBody {
                frozen: false,
                items: iter.into_iter().collect(),
            }),
        }
    }
}

// =============================================================================
// Message values
// =============================================================================

/// A raw record field paired with its type tag.
///
/// The payload is shared with the record store (or with the template
/// formatter's output), so handing one around never copies the text. The
/// typed form is produced on demand by [`MessageValue::materialize`];
/// containers always store the materialized form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageValue {
    kind: ValueKind,
    raw: Arc<str>,
}

impl MessageValue {
    pub fn new(raw: Arc<str>, kind: ValueKind) -> Self {
        Self { kind, raw }
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub fn raw(&self) -> &Arc<str> {
        &self.raw
    }

    /// Parses the raw payload into the typed value its tag promises.
    pub fn materialize(&self) -> Result<Value, ValueError> {
        Value::from_typed_text(self.kind, &self.raw)
    }
}

// =============================================================================
// Value
// =============================================================================

/// A dynamically typed filter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[derive(Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(Arc<str>),
    Bytes(Arc<[u8]>),
    Datetime(DateTime<Utc>),
    List(List),
    Dict(Dict),
    Message(MessageValue),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Int(_) => ValueKind::Int,
            Value::Double(_) => ValueKind::Double,
            Value::Str(_) => ValueKind::String,
            Value::Bytes(_) => ValueKind::Bytes,
            Value::Datetime(_) => ValueKind::Datetime,
            Value::List(_) => ValueKind::List,
            Value::Dict(_) => ValueKind::Dict,
            Value::Message(m) => m.kind(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Message(_) => "message_value",
            other => other.kind().name(),
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Double(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Bytes(b) => !b.is_empty(),
            Value::Datetime(_) => true,
            Value::List(l) => !l.is_empty(),
            Value::Dict(d) => !d.is_empty(),
            Value::Message(m) => match m.materialize() {
                Ok(v) => v.is_truthy(),
                Err(_) => false,
            },
        }
    }

    /// True when this value reads as null, looking through message values.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null) || matches!(self, Value::Message(m) if m.kind() == ValueKind::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Double(n) => Some(*n as i64),
            Value::Message(m) if m.kind() == ValueKind::Int => m.raw().parse().ok(),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            Value::Int(n) => Some(*n as f64),
            Value::Message(m) if matches!(m.kind(), ValueKind::Int | ValueKind::Double) => {
                m.raw().parse().ok()
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            Value::Message(m) if m.kind() == ValueKind::String => Some(m.raw()),
            _ => None,
        }
    }

    /// Renders the canonical textual form into `out`.
    ///
    /// Top-level strings render unquoted (this is what the string predicates
    /// compare against); strings nested in containers are quoted.
    pub fn repr_into(&self, out: &mut String) {
        match self {
            Value::Null => {}
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Int(n) => {
                use fmt::Write;
                let _ = write!(out, "{}", n);
            }
            Value::Double(n) => {
                use fmt::Write;
                let _ = write!(out, "{}", n);
            }
            Value::Str(s) => out.push_str(s),
            Value::Bytes(b) => out.push_str(&String::from_utf8_lossy(b)),
            Value::Datetime(dt) => {
                out.push_str(&dt.to_rfc3339_opts(SecondsFormat::Micros, true));
            }
            Value::List(_) | Value::Dict(_) => self.render_container(out),
            Value::Message(m) => out.push_str(m.raw()),
        }
    }

    pub fn repr(&self) -> String {
        let mut out = String::new();
        self.repr_into(&mut out);
        out
    }

    /// Typed text rendering: appends the text and reports its type tag.
    pub fn marshal_into(&self, out: &mut String) -> ValueKind {
        self.repr_into(out);
        self.kind()
    }

    fn render_container(&self, out: &mut String) {
        use fmt::Write;
        match self {
            Value::List(l) => {
                out.push('[');
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    v.render_element(out);
                }
                out.push(']');
            }
            Value::Dict(d) => {
                out.push('{');
                for (i, (k, v)) in d.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{:?}:", k);
                    v.render_element(out);
                }
                out.push('}');
            }
            _ => unreachable!("render_container on non-container"),
        }
    }

    fn render_element(&self, out: &mut String) {
        use fmt::Write;
        match self {
            Value::Null => out.push_str("null"),
            Value::Str(s) => {
                let _ = write!(out, "{:?}", s);
            }
            Value::Message(m) if m.kind() == ValueKind::String => {
                let _ = write!(out, "{:?}", m.raw());
            }
            Value::Message(m) if m.kind() == ValueKind::Null => out.push_str("null"),
            other => other.repr_into(out),
        }
    }

    /// Parses typed text back into a value; inverse of repr for primitives.
    pub fn from_typed_text(kind: ValueKind, text: &str) -> Result<Value, ValueError> {
        let malformed = || ValueError::Malformed {
            kind,
            text: text.to_string(),
        };
        match kind {
            ValueKind::Null => Ok(Value::Null),
            ValueKind::String => Ok(Value::Str(Arc::from(text))),
            ValueKind::Bytes => Ok(Value::Bytes(Arc::from(text.as_bytes()))),
            ValueKind::Boolean => match text {
                "true" | "1" => Ok(Value::Bool(true)),
                "false" | "0" | "" => Ok(Value::Bool(false)),
                _ => Err(malformed()),
            },
            ValueKind::Int => text.parse().map(Value::Int).map_err(|_| malformed()),
            ValueKind::Double => text.parse().map(Value::Double).map_err(|_| malformed()),
            ValueKind::Datetime => DateTime::parse_from_rfc3339(text)
                .map(|dt| Value::Datetime(dt.with_timezone(&Utc)))
                .map_err(|_| malformed()),
            ValueKind::List | ValueKind::Dict => {
                let json: serde_json::Value =
                    serde_json::from_str(text).map_err(|_| malformed())?;
                let value = Value::from_json(json);
                match (kind, &value) {
                    (ValueKind::List, Value::List(_)) => Ok(value),
                    (ValueKind::Dict, Value::Dict(_)) => Ok(value),
                    _ => Err(malformed()),
                }
            }
        }
    }

    fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Double(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(Arc::from(s.as_str())),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(entries) => {
                let mut dict = Dict::with_capacity(entries.len());
                for (k, v) in entries {
                    // freshly created, cannot be frozen
                    let _ = dict.insert(Arc::from(k.as_str()), Value::from_json(v));
                }
                Value::Dict(dict)
            }
        }
    }

    /// Deep copy; containers get distinct, unfrozen bodies.
    pub fn deep_clone(&self) -> Value {
        match self {
            Value::List(l) => Value::List(l.deep_clone()),
            Value::Dict(d) => Value::Dict(d.deep_clone()),
            other => other.clone(),
        }
    }

    /// Number of entries for containers, byte length for strings and bytes.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Str(s) => Some(s.len()),
            Value::Bytes(b) => Some(b.len()),
            Value::List(l) => Some(l.len()),
            Value::Dict(d) => Some(d.len()),
            Value::Message(m) => m.materialize().ok().and_then(|v| v.len()),
            _ => None,
        }
    }

    /// Containers store typed values only; message payloads are parsed first.
    fn into_storable(self) -> Result<Value, ValueError> {
        match self {
            Value::Message(m) => m.materialize(),
            other => Ok(other),
        }
    }

    /// Returns a fresh copy of the element under `key`, or None.
    pub fn get_subscript(&self, key: &Value) -> Option<Value> {
        match self {
            Value::Dict(d) => d.get(&key.repr()).cloned(),
            Value::List(l) => {
                let index = key.as_int()?;
                if index < 0 {
                    return None;
                }
                l.get(index as usize).cloned()
            }
            _ => None,
        }
    }

    pub fn set_subscript(&mut self, key: &Value, value: Value) -> Result<(), ValueError> {
        let value = value.into_storable()?;
        match self {
            Value::Dict(d) => d.insert(Arc::from(key.repr().as_str()), value),
            Value::List(l) => {
                let len = l.len();
                let index = key.as_int().ok_or(ValueError::Unsupported {
                    op: "set_subscript",
                    kind: key.type_name(),
                })?;
                if index < 0 || index as usize > len {
                    return Err(ValueError::IndexOutOfRange { index, len });
                }
                if index as usize == len {
                    l.push(value)
                } else {
                    l.set(index as usize, value)
                }
            }
            other => Err(ValueError::Unsupported {
                op: "set_subscript",
                kind: other.type_name(),
            }),
        }
    }

    pub fn append(&mut self, value: Value) -> Result<(), ValueError> {
        let value = value.into_storable()?;
        match self {
            Value::List(l) => l.push(value),
            other => Err(ValueError::Unsupported {
                op: "append",
                kind: other.type_name(),
            }),
        }
    }

    /// Removes `key`; Ok(false) when the key was not present.
    pub fn unset_key(&mut self, key: &Value) -> Result<bool, ValueError> {
        match self {
            Value::Dict(d) => Ok(d.remove(&key.repr())?.is_some()),
            Value::List(l) => {
                let index = key.as_int().ok_or(ValueError::Unsupported {
                    op: "unset_key",
                    kind: key.type_name(),
                })?;
                if index < 0 {
                    return Ok(false);
                }
                Ok(l.remove(index as usize)?.is_some())
            }
            other => Err(ValueError::Unsupported {
                op: "unset_key",
                kind: other.type_name(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Arc::from(s.as_str()))
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==========================================================================
    // Kind and truthiness
    // ==========================================================================

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Null.kind().name(), "null");
        assert_eq!(Value::Bool(true).kind().name(), "boolean");
        assert_eq!(Value::Int(3).kind().name(), "int");
        assert_eq!(Value::Double(0.5).kind().name(), "double");
        assert_eq!(Value::from("x").kind().name(), "string");
        assert_eq!(Value::List(List::new()).kind().name(), "list");
        assert_eq!(Value::Dict(Dict::new()).kind().name(), "dict");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Double(0.0).is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(Value::from("x").is_truthy());
        assert!(!Value::List(List::new()).is_truthy());
        assert!(Value::from(vec![1i64]).is_truthy());
    }

    #[test]
    fn test_message_value_truthiness_follows_payload() {
        let truthy = Value::Message(MessageValue::new(Arc::from("42"), ValueKind::Int));
        let falsy = Value::Message(MessageValue::new(Arc::from("0"), ValueKind::Int));
        let broken = Value::Message(MessageValue::new(Arc::from("nope"), ValueKind::Int));
        assert!(truthy.is_truthy());
        assert!(!falsy.is_truthy());
        assert!(!broken.is_truthy());
    }

    // ==========================================================================
    // repr / marshal / parse-back
    // ==========================================================================

    #[test]
    fn test_repr_primitives() {
        assert_eq!(Value::Null.repr(), "");
        assert_eq!(Value::Bool(true).repr(), "true");
        assert_eq!(Value::Int(-42).repr(), "-42");
        assert_eq!(Value::Double(1.5).repr(), "1.5");
        assert_eq!(Value::from("plain").repr(), "plain");
    }

    #[test]
    fn test_repr_containers_quote_strings() {
        let list = Value::from(vec!["a", "b"]);
        assert_eq!(list.repr(), r#"["a","b"]"#);

        let mut dict = Dict::new();
        dict.insert(Arc::from("k"), Value::Int(1)).unwrap();
        assert_eq!(Value::Dict(dict).repr(), r#"{"k":1}"#);
    }

    #[test]
    fn test_marshal_reports_kind() {
        let mut out = String::new();
        assert_eq!(Value::Int(7).marshal_into(&mut out), ValueKind::Int);
        assert_eq!(out, "7");
    }

    #[test]
    fn test_repr_parse_back_roundtrip() {
        for value in [
            Value::Bool(false),
            Value::Int(i64::MIN),
            Value::Int(i64::MAX),
            Value::Double(2.25),
            Value::from("hello"),
            Value::Datetime(DateTime::parse_from_rfc3339("2024-06-01T10:20:30.000001Z").unwrap().into()),
        ] {
            let parsed = Value::from_typed_text(value.kind(), &value.repr()).unwrap();
            assert_eq!(parsed, value, "roundtrip failed for {:?}", value);
        }
    }

    #[test]
    fn test_from_typed_text_structured() {
        let v = Value::from_typed_text(ValueKind::Dict, r#"{"a":[1,2]}"#).unwrap();
        let Value::Dict(d) = v else { panic!("expected dict") };
        assert_eq!(d.get("a"), Some(&Value::from(vec![1i64, 2])));

        assert!(Value::from_typed_text(ValueKind::List, "{}").is_err());
        assert!(Value::from_typed_text(ValueKind::Int, "12x").is_err());
    }

    // ==========================================================================
    // Copy-on-write and freezing
    // ==========================================================================

    #[test]
    fn test_dict_write_unshares() {
        let mut a = Dict::new();
        a.insert(Arc::from("k"), Value::Int(1)).unwrap();
        let b = a.clone();
        assert!(a.shares_body_with(&b));

        a.insert(Arc::from("k"), Value::Int(2)).unwrap();
        assert!(!a.shares_body_with(&b));
        assert_eq!(b.get("k"), Some(&Value::Int(1)));
        assert_eq!(a.get("k"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_list_write_unshares() {
        let mut a: List = [Value::Int(1)].into_iter().collect();
        let b = a.clone();
        a.push(Value::Int(2)).unwrap();
        assert_eq!(b.len(), 1);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_frozen_rejects_mutation() {
        let mut d = Dict::new();
        d.insert(Arc::from("k"), Value::Int(1)).unwrap();
        d.freeze();
        assert_eq!(
            d.insert(Arc::from("x"), Value::Null),
            Err(ValueError::Frozen("dict"))
        );
        assert_eq!(d.remove("k"), Err(ValueError::Frozen("dict")));

        let mut l = List::new();
        l.freeze();
        assert_eq!(l.push(Value::Null), Err(ValueError::Frozen("list")));
    }

    #[test]
    fn test_deep_clone_is_deep_and_unfrozen() {
        let mut inner = Dict::new();
        inner.insert(Arc::from("n"), Value::Int(1)).unwrap();
        let mut outer = Dict::new();
        outer.insert(Arc::from("inner"), Value::Dict(inner)).unwrap();
        outer.freeze();

        let original = Value::Dict(outer);
        let mut copy = original.deep_clone();
        assert_eq!(copy, original);
        assert_eq!(copy.is_truthy(), original.is_truthy());
        assert_eq!(copy.len(), original.len());

        // the copy is mutable and detached
        copy.set_subscript(&Value::from("inner"), Value::Int(9)).unwrap();
        assert_ne!(copy, original);
    }

    // ==========================================================================
    // Subscript operations
    // ==========================================================================

    #[test]
    fn test_subscript_get_set_unset() {
        let mut v = Value::Dict(Dict::new());
        v.set_subscript(&Value::from("k"), Value::Int(5)).unwrap();
        assert_eq!(v.get_subscript(&Value::from("k")), Some(Value::Int(5)));
        assert!(v.unset_key(&Value::from("k")).unwrap());
        assert!(!v.unset_key(&Value::from("k")).unwrap());
    }

    #[test]
    fn test_list_set_subscript_bounds() {
        let mut v = Value::from(vec![1i64, 2]);
        v.set_subscript(&Value::Int(0), Value::Int(9)).unwrap();
        // index == len appends
        v.set_subscript(&Value::Int(2), Value::Int(3)).unwrap();
        assert_eq!(v, Value::from(vec![9i64, 2, 3]));
        assert!(matches!(
            v.set_subscript(&Value::Int(7), Value::Null),
            Err(ValueError::IndexOutOfRange { index: 7, len: 3 })
        ));
    }

    #[test]
    fn test_storing_message_value_materializes() {
        let mut v = Value::List(List::new());
        v.append(Value::Message(MessageValue::new(Arc::from("12"), ValueKind::Int)))
            .unwrap();
        assert_eq!(v.get_subscript(&Value::Int(0)), Some(Value::Int(12)));
    }

    #[test]
    fn test_scalar_subscript_unsupported() {
        let mut v = Value::Int(1);
        assert!(matches!(
            v.set_subscript(&Value::Int(0), Value::Null),
            Err(ValueError::Unsupported { .. })
        ));
    }
}
