//! Subscript assignment statements
//!
//! `object[key] = value` and the append form `object[] = value`. The
//! incoming value is cloned before insertion, so later mutation through
//! either handle cannot alias the other; the result of the statement is
//! the stored clone. A null-protected variant skips the whole statement
//! when the value side is null or fails.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::ConfigError;
use crate::expr::{eval_expr, operand, optimize_in_place, Config, Expr, ExprInfo};
use tracing::debug;
use vetra_core::Value;

pub struct SetSubscriptExpr {
    info: ExprInfo,
    null_protected: bool,
    object: Box<dyn Expr>,
    key: Option<Box<dyn Expr>>,
    new_value: Box<dyn Expr>,
}

/// `object[key] = value`; with `key` None, appends to a list.
pub fn set_subscript(
    object: Box<dyn Expr>,
    key: Option<Box<dyn Expr>>,
    new_value: Box<dyn Expr>,
) -> Box<dyn Expr> {
    new_set_subscript(false, object, key, new_value)
}

/// Null-protected variant: `object[key] =?? value`.
pub fn set_subscript_if_set(
    object: Box<dyn Expr>,
    key: Option<Box<dyn Expr>>,
    new_value: Box<dyn Expr>,
) -> Box<dyn Expr> {
    new_set_subscript(true, object, key, new_value)
}

fn new_set_subscript(
    null_protected: bool,
    object: Box<dyn Expr>,
    key: Option<Box<dyn Expr>>,
    new_value: Box<dyn Expr>,
) -> Box<dyn Expr> {
    let mut info = ExprInfo::new();
    info.ignore_falsy_result = true;
    Box::new(SetSubscriptExpr {
        info,
        null_protected,
        object,
        key,
        new_value,
    })
}

impl SetSubscriptExpr {
    fn store(&self, ctx: &mut EvalContext, value: Value) -> EvalResult {
        let span = self.info.span;
        let mut object = operand!(self.object.as_ref(), ctx);

        let stored = value.deep_clone();
        match &self.key {
            Some(key_expr) => {
                let key = operand!(key_expr.as_ref(), ctx);
                object
                    .set_subscript(&key, stored.clone())
                    .map_err(|e| ctx.error(e.to_string(), span, Some(&key)))?;
            }
            None => {
                object
                    .append(stored.clone())
                    .map_err(|e| ctx.error(e.to_string(), span, None))?;
            }
        }

        self.object.assign(ctx, object)?;
        Ok(Control::Value(stored))
    }
}

impl Expr for SetSubscriptExpr {
    fn name(&self) -> &'static str {
        if self.null_protected {
            "set_subscript_if_set"
        } else {
            "set_subscript"
        }
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        self.object.init(cfg)?;
        if let Err(e) = self.new_value.init(cfg) {
            self.object.deinit(cfg);
            return Err(e);
        }
        if let Some(key) = &mut self.key {
            if let Err(e) = key.init(cfg) {
                self.object.deinit(cfg);
                self.new_value.deinit(cfg);
                return Err(e);
            }
        }
        let kind = self.name();
        self.info.resolve_counter(kind, cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.object);
        optimize_in_place(&mut self.new_value);
        if let Some(key) = &mut self.key {
            optimize_in_place(key);
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        if self.null_protected {
            return match eval_expr(self.new_value.as_ref(), ctx) {
                Ok(Control::Value(value)) if value.is_null() => Ok(Control::Value(value)),
                Ok(Control::Value(value)) => self.store(ctx, value),
                Ok(signal) => Ok(signal),
                Err(error) => {
                    debug!(error = %error, "null-protected set-subscript suppressing error");
                    ctx.clear_errors();
                    Ok(Control::Value(Value::Null))
                }
            };
        }
        let value = operand!(self.new_value.as_ref(), ctx);
        self.store(ctx, value)
    }

    fn deinit(&mut self, cfg: &Config) {
        self.object.deinit(cfg);
        self.new_value.deinit(cfg);
        if let Some(key) = &mut self.key {
            key.deinit(cfg);
        }
        self.info.release_counter();
    }
}
