//! Record template formatter
//!
//! Templates interpolate record fields into text: `"$HOST: ${MESSAGE}"`.
//! A template that consists of exactly one field reference preserves that
//! field's type tag; anything else renders as a string. The filter engine
//! consumes this through [`Template::format_value_and_type`] only.

use crate::record::{field_handle, FieldHandle, Record};
use crate::value::ValueKind;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unterminated field reference at byte {0}")]
    UnterminatedReference(usize),

    #[error("empty field reference at byte {0}")]
    EmptyReference(usize),
}

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(Arc<str>),
    Field(FieldHandle),
}

/// Options honored while formatting; owned by the evaluation context.
#[derive(Debug, Clone)]
pub struct TemplateOptions {
    /// Keep the `$NAME` reference text in the output when the field is
    /// unset, instead of expanding it to nothing.
    pub keep_missing_references: bool,
}

impl Default for TemplateOptions {
    fn default() -> Self {
        Self {
            keep_missing_references: false,
        }
    }
}

/// A compiled record template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    source: Arc<str>,
    parts: Vec<Part>,
}

impl Template {
    /// Compiles `source`, interning every referenced field name.
    ///
    /// `$NAME` and `${NAME}` reference fields, `$$` is a literal dollar.
    pub fn compile(source: &str) -> Result<Template, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let bytes = source.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            if bytes[i] != b'$' {
                let start = i;
                while i < bytes.len() && bytes[i] != b'$' {
                    i += 1;
                }
                literal.push_str(&source[start..i]);
                continue;
            }

            // bytes[i] == '$'
            match bytes.get(i + 1) {
                Some(b'$') => {
                    literal.push('$');
                    i += 2;
                }
                Some(b'{') => {
                    let start = i + 2;
                    let end = source[start..]
                        .find('}')
                        .map(|offset| start + offset)
                        .ok_or(TemplateError::UnterminatedReference(i))?;
                    if end == start {
                        return Err(TemplateError::EmptyReference(i));
                    }
                    flush_literal(&mut parts, &mut literal);
                    parts.push(Part::Field(field_handle(&source[start..end])));
                    i = end + 1;
                }
                _ => {
                    let start = i + 1;
                    let mut end = start;
                    while end < bytes.len() && is_name_byte(bytes[end]) {
                        end += 1;
                    }
                    if end == start {
                        return Err(TemplateError::EmptyReference(i));
                    }
                    flush_literal(&mut parts, &mut literal);
                    parts.push(Part::Field(field_handle(&source[start..end])));
                    i = end;
                }
            }
        }

        flush_literal(&mut parts, &mut literal);
        Ok(Template {
            source: Arc::from(source),
            parts,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when formatting can only ever produce the template text itself.
    pub fn is_literal(&self) -> bool {
        !self.parts.iter().any(|p| matches!(p, Part::Field(_)))
    }

    /// Formats against `records` (first match wins across records) into
    /// `out`, returning the type tag of the produced text.
    pub fn format_value_and_type(
        &self,
        records: &[Record],
        options: &TemplateOptions,
        out: &mut String,
    ) -> ValueKind {
        if let [Part::Field(handle)] = self.parts.as_slice() {
            if let Some((raw, kind)) = lookup(records, *handle) {
                out.push_str(&raw);
                return kind;
            }
            return ValueKind::String;
        }

        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Field(handle) => {
                    if let Some((raw, _)) = lookup(records, *handle) {
                        out.push_str(&raw);
                    } else if options.keep_missing_references {
                        out.push('$');
                        if let Some(name) = crate::record::field_name(*handle) {
                            out.push_str(&name);
                        }
                    }
                }
            }
        }
        ValueKind::String
    }
}

fn lookup(records: &[Record], handle: FieldHandle) -> Option<(Arc<str>, ValueKind)> {
    records
        .iter()
        .find_map(|r| r.get_value(handle).map(|(raw, kind)| (raw.clone(), kind)))
}

fn flush_literal(parts: &mut Vec<Part>, literal: &mut String) {
    if !literal.is_empty() {
        parts.push(Part::Literal(Arc::from(literal.as_str())));
        literal.clear();
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[(&str, &str, ValueKind)]) -> Record {
        let mut r = Record::new();
        for (name, raw, kind) in fields {
            r.set(name, *raw, *kind);
        }
        r
    }

    #[test]
    fn test_mixed_template_renders_string() {
        let t = Template::compile("$HOST: ${MESSAGE}!").unwrap();
        let r = record(&[
            ("HOST", "web-1", ValueKind::String),
            ("MESSAGE", "up", ValueKind::String),
        ]);
        let mut out = String::new();
        let kind = t.format_value_and_type(&[r], &TemplateOptions::default(), &mut out);
        assert_eq!(out, "web-1: up!");
        assert_eq!(kind, ValueKind::String);
    }

    #[test]
    fn test_single_field_preserves_type() {
        let t = Template::compile("$DESTPORT").unwrap();
        let r = record(&[("DESTPORT", "6514", ValueKind::Int)]);
        let mut out = String::new();
        let kind = t.format_value_and_type(&[r], &TemplateOptions::default(), &mut out);
        assert_eq!(out, "6514");
        assert_eq!(kind, ValueKind::Int);
    }

    #[test]
    fn test_dollar_escape_and_missing_field() {
        let t = Template::compile("cost: $$$DESTPORT").unwrap();
        let mut out = String::new();
        let kind =
            t.format_value_and_type(&[Record::new()], &TemplateOptions::default(), &mut out);
        assert_eq!(out, "cost: $");
        assert_eq!(kind, ValueKind::String);
    }

    #[test]
    fn test_first_record_with_field_wins() {
        let t = Template::compile("$HOST").unwrap();
        let empty = Record::new();
        let filled = record(&[("HOST", "db-2", ValueKind::String)]);
        let mut out = String::new();
        t.format_value_and_type(&[empty, filled], &TemplateOptions::default(), &mut out);
        assert_eq!(out, "db-2");
    }

    #[test]
    fn test_compile_errors() {
        assert_eq!(
            Template::compile("${oops"),
            Err(TemplateError::UnterminatedReference(0))
        );
        assert_eq!(Template::compile("a$ b"), Err(TemplateError::EmptyReference(1)));
    }

    #[test]
    fn test_literal_template_detection() {
        assert!(Template::compile("no refs $$ here").unwrap().is_literal());
        assert!(!Template::compile("$HOST").unwrap().is_literal());
    }
}
