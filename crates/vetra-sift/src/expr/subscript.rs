//! Container element access
//!
//! `object[key]` reads an element and, as an assignment target, writes
//! one. Writing goes through the place chain: the container is fetched,
//! mutated (unsharing its copy-on-write body) and stored back into the
//! place the object expression names, so nested subscripts compose.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::{ConfigError, EvalError};
use crate::expr::{operand, optimize_in_place, Config, Expr, ExprInfo};
use vetra_core::Value;

pub struct GetSubscriptExpr {
    info: ExprInfo,
    object: Box<dyn Expr>,
    key: Box<dyn Expr>,
}

pub fn get_subscript(object: Box<dyn Expr>, key: Box<dyn Expr>) -> Box<dyn Expr> {
    Box::new(GetSubscriptExpr {
        info: ExprInfo::new(),
        object,
        key,
    })
}

impl GetSubscriptExpr {
    fn eval_object_and_key(
        &self,
        ctx: &mut EvalContext,
    ) -> Result<Result<(Value, Value), Control>, EvalError> {
        let object = match crate::expr::eval_expr(self.object.as_ref(), ctx)? {
            Control::Value(v) => v,
            signal => return Ok(Err(signal)),
        };
        let key = match crate::expr::eval_expr(self.key.as_ref(), ctx)? {
            Control::Value(v) => v,
            signal => return Ok(Err(signal)),
        };
        Ok(Ok((object, key)))
    }
}

impl Expr for GetSubscriptExpr {
    fn name(&self) -> &'static str {
        "get_subscript"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        crate::expr::init_pair(&mut self.object, &mut self.key, cfg)?;
        self.info.resolve_counter("get_subscript", cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.object);
        optimize_in_place(&mut self.key);
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let object = operand!(self.object.as_ref(), ctx);
        let object = match object {
            Value::Message(m) => {
                let span = self.info.span;
                m.materialize()
                    .map_err(|e| ctx.error(e.to_string(), span, None))?
            }
            other => other,
        };
        let key = operand!(self.key.as_ref(), ctx);
        match object.get_subscript(&key) {
            Some(value) => Ok(Control::Value(value)),
            None => {
                let span = self.info.span;
                Err(ctx.error("no such key", span, Some(&key)))
            }
        }
    }

    fn assign(&self, ctx: &mut EvalContext, value: Value) -> Result<(), EvalError> {
        let span = self.info.span;
        let (mut object, key) = match self.eval_object_and_key(ctx)? {
            Ok(pair) => pair,
            Err(_) => {
                return Err(ctx.error("control statement in assignment target", span, None));
            }
        };
        object
            .set_subscript(&key, value)
            .map_err(|e| ctx.error(e.to_string(), span, Some(&key)))?;
        self.object.assign(ctx, object)
    }

    fn deinit(&mut self, cfg: &Config) {
        self.object.deinit(cfg);
        self.key.deinit(cfg);
        self.info.release_counter();
    }
}
