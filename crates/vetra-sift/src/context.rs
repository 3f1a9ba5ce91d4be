//! Per-record evaluation environment
//!
//! A context binds the record(s) under evaluation to the variable scope,
//! the scratch pool and the error stack. It is single-threaded for its
//! lifetime; the expression tree it evaluates is shared and read-only.

use crate::error::EvalError;
use crate::scope::Scope;
use crate::scratch::ScratchPool;
use std::borrow::Cow;
use vetra_core::{Record, Span, TemplateOptions, Value};

/// Outcome of evaluating one expression.
///
/// `drop` and `done` are cooperative cancellation, not errors: they thread
/// through evaluation results and make enclosing statement blocks stop
/// short while still counting as success.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Value(Value),
    Drop,
    Done,
}

impl Control {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Control::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_interrupt(&self) -> bool {
        matches!(self, Control::Drop | Control::Done)
    }
}

pub type EvalResult = Result<Control, EvalError>;

/// Evaluation environment for a single record (or a correlated set).
pub struct EvalContext {
    records: Vec<Record>,
    pub template_options: TemplateOptions,
    pub scope: Scope,
    pub scratch: ScratchPool,
    errors: Vec<EvalError>,
}

impl EvalContext {
    pub fn new(record: Record) -> Self {
        Self::with_records(vec![record])
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        assert!(!records.is_empty(), "a context needs at least one record");
        Self {
            records,
            template_options: TemplateOptions::default(),
            scope: Scope::new(),
            scratch: ScratchPool::new(),
            errors: Vec::new(),
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self) -> &Record {
        &self.records[0]
    }

    /// Swaps in the next record, carrying the scope (declared variables
    /// survive) and the warmed-up scratch pool over. Returns the previous
    /// record with assigned variables synced into it.
    pub fn rebind(&mut self, record: Record) -> Record {
        let mut previous = std::mem::replace(&mut self.records[0], record);
        self.scope.sync(&mut previous);
        self.scope.begin_record();
        self.errors.clear();
        previous
    }

    /// Builds an error, records it on the error stack and hands it back
    /// for propagation through `?`.
    pub fn error(
        &mut self,
        message: impl Into<Cow<'static, str>>,
        span: Span,
        value: Option<&Value>,
    ) -> EvalError {
        let mut error = EvalError::new(message, span);
        if let Some(value) = value {
            error = error.with_detail(format!("{} ({})", value.repr(), value.type_name()));
        }
        self.errors.push(error.clone());
        error
    }

    pub fn errors(&self) -> &[EvalError] {
        &self.errors
    }

    pub fn last_error(&self) -> Option<&EvalError> {
        self.errors.last()
    }

    /// Forgets recorded errors; used by the null-protected operators that
    /// swallow failures of their operand.
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Syncs the scope and releases the record back to the host.
    pub fn finish(mut self) -> Record {
        let mut record = self.records.swap_remove(0);
        self.scope.sync(&mut record);
        record
    }
}
