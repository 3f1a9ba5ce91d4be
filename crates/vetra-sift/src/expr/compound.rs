//! Statement sequencing with short-circuit semantics
//!
//! A compound expression runs its children in declaration order. A falsy
//! child (unless flagged `ignore_falsy_result`) fails the whole block; a
//! `drop`/`done` signal stops the walk and counts as success. In block
//! mode the result is boolean true, in statement-expression mode it is
//! the value of the last child.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::ConfigError;
use crate::expr::{
    deinit_subexprs, eval_expr, init_subexprs, optimize_in_place, Config, Expr, ExprInfo,
};
use tracing::{debug, trace};
use vetra_core::Value;

pub struct CompoundExpr {
    info: ExprInfo,
    return_value_of_last_expr: bool,
    exprs: Vec<Box<dyn Expr>>,
}

/// An empty statement block; `true` unless a child fails.
pub fn compound() -> CompoundExpr {
    compound_returning(false)
}

/// A statement expression yielding the value of its last child.
pub fn compound_returning(return_value_of_last_expr: bool) -> CompoundExpr {
    CompoundExpr {
        info: ExprInfo::new(),
        return_value_of_last_expr,
        exprs: Vec::new(),
    }
}

impl CompoundExpr {
    pub fn add(&mut self, expr: Box<dyn Expr>) {
        self.exprs.push(expr);
    }

    pub fn with(mut self, expr: Box<dyn Expr>) -> Self {
        self.add(expr);
        self
    }

    pub fn boxed(self) -> Box<dyn Expr> {
        Box::new(self)
    }

    fn trace_step(&self, expr: &dyn Expr, value: &Value, success: bool) {
        if expr.info().suppress_from_trace {
            return;
        }
        if !success {
            debug!(
                expr = %expr.info().location(),
                value = %value.repr(),
                kind = value.type_name(),
                "falsy expression halted the statement block"
            );
        } else {
            trace!(
                expr = %expr.info().location(),
                value = %value.repr(),
                truthy = value.is_truthy(),
                kind = value.type_name(),
                "eval step"
            );
        }
    }
}

impl Expr for CompoundExpr {
    fn name(&self) -> &'static str {
        "compound"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        init_subexprs(&mut self.exprs, cfg)?;
        self.info.resolve_counter("compound", cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        for slot in &mut self.exprs {
            optimize_in_place(slot);
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let mut result = None;

        for expr in &self.exprs {
            match eval_expr(expr.as_ref(), ctx)? {
                signal @ (Control::Drop | Control::Done) => {
                    // code flow modifier, short circuiting counts as success
                    return Ok(signal);
                }
                Control::Value(value) => {
                    let success = expr.info().ignore_falsy_result || value.is_truthy();
                    self.trace_step(expr.as_ref(), &value, success);
                    if !success {
                        let span = expr.info().span;
                        return Err(ctx.error(
                            "bailing out due to a falsy expr",
                            span,
                            Some(&value),
                        ));
                    }
                    result = Some(value);
                }
            }
        }

        match result {
            Some(value) if self.return_value_of_last_expr => Ok(Control::Value(value)),
            // an empty list of statements, or a block whose result is
            // ignored, is implicitly true
            _ => Ok(Control::Value(Value::Bool(true))),
        }
    }

    fn deinit(&mut self, cfg: &Config) {
        deinit_subexprs(&mut self.exprs, cfg);
        self.info.release_counter();
    }
}
