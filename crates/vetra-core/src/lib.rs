//! Vetra Core - Shared types for the Vetra log pipeline
//!
//! This crate provides the foundational types consumed by the Sift filter
//! engine and the surrounding daemon: the dynamic value universe, the log
//! record store with interned field handles, source spans and the template
//! formatter.

pub mod record;
pub mod span;
pub mod template;
pub mod value;

pub use record::{field_handle, field_name, FieldHandle, Record};
pub use span::Span;
pub use template::{Template, TemplateError, TemplateOptions};
pub use value::{Dict, List, MessageValue, Value, ValueError, ValueKind};
