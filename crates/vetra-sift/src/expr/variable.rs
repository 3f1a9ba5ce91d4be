//! Variable reference expressions
//!
//! `$NAME` references are tied to the record: the first read demarshals
//! the raw field into a message value and caches it in the scope, writes
//! go through the scope and are synced back when the context finishes.
//! Unprefixed names are floating, optionally declared.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::EvalError;
use crate::expr::{Expr, ExprInfo};
use crate::scope::{map_variable_name, VarHandle, VarKind};
use std::sync::Arc;
use vetra_core::{MessageValue, Value};

pub struct VariableExpr {
    info: ExprInfo,
    handle: VarHandle,
    kind: VarKind,
    name: Arc<str>,
}

/// A reference to `$NAME` (message-tied) or `name` (floating).
pub fn variable(name: &str) -> Box<dyn Expr> {
    let kind = if name.starts_with('$') {
        VarKind::MessageTied
    } else {
        VarKind::Floating
    };
    variable_of_kind(name, kind)
}

/// A floating variable that survives across records in its scope.
pub fn declared_variable(name: &str) -> Box<dyn Expr> {
    variable_of_kind(name, VarKind::DeclaredFloating)
}

fn variable_of_kind(name: &str, kind: VarKind) -> Box<dyn Expr> {
    Box::new(VariableExpr {
        info: ExprInfo::new(),
        handle: map_variable_name(name, kind),
        kind,
        name: Arc::from(name),
    })
}

impl VariableExpr {
    fn load_from_record(&self, ctx: &mut EvalContext) -> Result<Option<Value>, EvalError> {
        let field = self.handle.field_handle();
        let Some((raw, kind)) = ctx.record().get_value(field) else {
            return Ok(None);
        };
        let value = Value::Message(MessageValue::new(raw.clone(), kind));
        ctx.scope
            .register(VarKind::MessageTied, self.handle, None)
            .cache_value(value.clone());
        Ok(Some(value))
    }
}

impl Expr for VariableExpr {
    fn name(&self) -> &'static str {
        "variable"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        if let Some(variable) = ctx.scope.lookup(self.handle) {
            if let Some(value) = variable.value() {
                return Ok(Control::Value(value));
            }
            let span = self.info.span;
            return Err(ctx.error(
                format!("variable {} is unset", self.name),
                span,
                None,
            ));
        }

        if self.handle.is_message_tied() {
            if let Some(value) = self.load_from_record(ctx)? {
                return Ok(Control::Value(value));
            }
        }

        let span = self.info.span;
        Err(ctx.error(format!("no such variable: {}", self.name), span, None))
    }

    fn assign(&self, ctx: &mut EvalContext, value: Value) -> Result<(), EvalError> {
        ctx.scope
            .register(self.kind, self.handle, None)
            .set_value(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::eval_expr;
    use vetra_core::{Record, ValueKind};

    #[test]
    fn test_message_variable_reads_record_field() {
        let record = Record::new().with_field("variable_test_msg", "disk full", ValueKind::String);
        let mut ctx = EvalContext::new(record);
        let expr = variable("$variable_test_msg");

        let Control::Value(value) = eval_expr(&*expr, &mut ctx).unwrap() else {
            panic!("expected a value");
        };
        assert_eq!(value.repr(), "disk full");
        assert_eq!(value.kind(), ValueKind::String);

        // second read comes from the scope cache
        let handle = map_variable_name("$variable_test_msg", VarKind::MessageTied);
        assert!(ctx.scope.lookup(handle).is_some());
        assert!(eval_expr(&*expr, &mut ctx).is_ok());
    }

    #[test]
    fn test_missing_field_is_an_error() {
        let mut ctx = EvalContext::new(Record::new());
        let expr = variable("$variable_test_absent");
        assert!(eval_expr(&*expr, &mut ctx).is_err());
        assert!(ctx.last_error().is_some());
    }

    #[test]
    fn test_floating_assign_then_read() {
        let mut ctx = EvalContext::new(Record::new());
        let expr = variable("variable_test_local");

        assert!(eval_expr(&*expr, &mut ctx).is_err());
        ctx.clear_errors();

        expr.assign(&mut ctx, Value::Int(5)).unwrap();
        assert_eq!(
            eval_expr(&*expr, &mut ctx).unwrap(),
            Control::Value(Value::Int(5))
        );
    }

    #[test]
    fn test_unset_variable_reports_unset() {
        let mut ctx = EvalContext::new(Record::new());
        let expr = variable("variable_test_unset");
        expr.assign(&mut ctx, Value::Int(1)).unwrap();

        let handle = map_variable_name("variable_test_unset", VarKind::Floating);
        ctx.scope.unset(handle);

        let err = eval_expr(&*expr, &mut ctx).unwrap_err();
        assert!(err.message.contains("unset"));
    }
}
