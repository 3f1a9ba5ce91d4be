//! Boolean operators and null coalescing

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::ConfigError;
use crate::expr::{
    eval_expr, init_pair, operand, optimize_in_place, Config, Expr, ExprInfo,
};
use tracing::debug;
use vetra_core::Value;

pub struct NotExpr {
    info: ExprInfo,
    operand: Box<dyn Expr>,
}

/// Logical negation of the operand's truthiness.
pub fn not(operand: Box<dyn Expr>) -> Box<dyn Expr> {
    Box::new(NotExpr {
        info: ExprInfo::new(),
        operand,
    })
}

impl Expr for NotExpr {
    fn name(&self) -> &'static str {
        "not"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        self.operand.init(cfg)?;
        self.info.resolve_counter("not", cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.operand);
        if let Some(value) = self.operand.as_literal() {
            return Some(crate::expr::literal::literal(!value.is_truthy()));
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let value = operand!(self.operand.as_ref(), ctx);
        Ok(Control::Value(Value::Bool(!value.is_truthy())))
    }

    fn deinit(&mut self, cfg: &Config) {
        self.operand.deinit(cfg);
        self.info.release_counter();
    }
}

pub struct BooleanExpr {
    info: ExprInfo,
    is_and: bool,
    lhs: Box<dyn Expr>,
    rhs: Box<dyn Expr>,
}

/// Short-circuit conjunction: the right side only runs when the left is
/// truthy.
pub fn and(lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    boolean(true, lhs, rhs)
}

/// Short-circuit disjunction.
pub fn or(lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    boolean(false, lhs, rhs)
}

fn boolean(is_and: bool, lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    Box::new(BooleanExpr {
        info: ExprInfo::new(),
        is_and,
        lhs,
        rhs,
    })
}

impl Expr for BooleanExpr {
    fn name(&self) -> &'static str {
        if self.is_and {
            "and"
        } else {
            "or"
        }
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        init_pair(&mut self.lhs, &mut self.rhs, cfg)?;
        let kind = self.name();
        self.info.resolve_counter(kind, cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.lhs);
        optimize_in_place(&mut self.rhs);
        if let Some(value) = self.lhs.as_literal() {
            // a constant left side either decides the result or reduces
            // the operator to the truthiness of the right side
            let decided = value.is_truthy() != self.is_and;
            if decided {
                return Some(crate::expr::literal::literal(!self.is_and));
            }
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let lhs = operand!(self.lhs.as_ref(), ctx);
        if lhs.is_truthy() != self.is_and {
            return Ok(Control::Value(Value::Bool(!self.is_and)));
        }
        let rhs = operand!(self.rhs.as_ref(), ctx);
        Ok(Control::Value(Value::Bool(rhs.is_truthy())))
    }

    fn deinit(&mut self, cfg: &Config) {
        self.lhs.deinit(cfg);
        self.rhs.deinit(cfg);
        self.info.release_counter();
    }
}

pub struct NullCoalesceExpr {
    info: ExprInfo,
    lhs: Box<dyn Expr>,
    rhs: Box<dyn Expr>,
}

/// `lhs ?? rhs`: the right side runs when the left is null or fails.
///
/// A constant non-null left side folds to itself at construction time; a
/// constant null folds to the right side.
pub fn null_coalesce(lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    if let Some(value) = lhs.as_literal() {
        if value.is_null() {
            return rhs;
        }
        return lhs;
    }
    Box::new(NullCoalesceExpr {
        info: ExprInfo::new(),
        lhs,
        rhs,
    })
}

impl Expr for NullCoalesceExpr {
    fn name(&self) -> &'static str {
        "null_coalesce"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        init_pair(&mut self.lhs, &mut self.rhs, cfg)?;
        self.info.resolve_counter("null_coalesce", cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.lhs);
        optimize_in_place(&mut self.rhs);
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        match eval_expr(self.lhs.as_ref(), ctx) {
            Ok(Control::Value(value)) if !value.is_null() => Ok(Control::Value(value)),
            Ok(Control::Value(_)) => eval_expr(self.rhs.as_ref(), ctx),
            Ok(signal) => Ok(signal),
            Err(error) => {
                debug!(error = %error, "null coalesce suppressing error");
                ctx.clear_errors();
                eval_expr(self.rhs.as_ref(), ctx)
            }
        }
    }

    fn deinit(&mut self, cfg: &Config) {
        self.lhs.deinit(cfg);
        self.rhs.deinit(cfg);
        self.info.release_counter();
    }
}
