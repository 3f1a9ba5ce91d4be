//! Assignment expressions
//!
//! Plain assignment stores the right side into the place named by the
//! left side and yields the stored value; containers are shared
//! copy-on-write, so no copy happens here. The null-protected variant
//! (`=??`) skips the assignment when the right side is null and swallows
//! its evaluation errors.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::ConfigError;
use crate::expr::{eval_expr, operand, optimize_in_place, Config, Expr, ExprInfo};
use tracing::debug;
use vetra_core::Value;

pub struct AssignExpr {
    info: ExprInfo,
    null_protected: bool,
    lhs: Box<dyn Expr>,
    rhs: Box<dyn Expr>,
}

/// `lhs = rhs`; a statement, its falsy result never fails the block.
pub fn assign(lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    new_assign(false, lhs, rhs)
}

/// `lhs =?? rhs`: assign only when the right side yields a non-null value.
pub fn assign_if_set(lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    new_assign(true, lhs, rhs)
}

fn new_assign(null_protected: bool, lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    let mut info = ExprInfo::new();
    info.ignore_falsy_result = true;
    Box::new(AssignExpr {
        info,
        null_protected,
        lhs,
        rhs,
    })
}

impl Expr for AssignExpr {
    fn name(&self) -> &'static str {
        if self.null_protected {
            "assign_if_set"
        } else {
            "assign"
        }
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        crate::expr::init_pair(&mut self.lhs, &mut self.rhs, cfg)?;
        let kind = self.name();
        self.info.resolve_counter(kind, cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.lhs);
        optimize_in_place(&mut self.rhs);
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let value = if self.null_protected {
            match eval_expr(self.rhs.as_ref(), ctx) {
                Ok(Control::Value(value)) if value.is_null() => {
                    return Ok(Control::Value(value));
                }
                Ok(Control::Value(value)) => value,
                Ok(signal) => return Ok(signal),
                Err(error) => {
                    debug!(error = %error, "null-protected assignment suppressing error");
                    ctx.clear_errors();
                    return Ok(Control::Value(Value::Null));
                }
            }
        } else {
            operand!(self.rhs.as_ref(), ctx)
        };

        self.lhs.assign(ctx, value.clone())?;
        Ok(Control::Value(value))
    }

    fn deinit(&mut self, cfg: &Config) {
        self.lhs.deinit(cfg);
        self.rhs.deinit(cfg);
        self.info.release_counter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::eval_expr;
    use crate::expr::literal::literal;
    use crate::expr::variable::variable;
    use crate::scope::{map_variable_name, VarKind};
    use vetra_core::Record;

    #[test]
    fn test_assign_stores_and_returns_value() {
        let expr = assign(variable("assign_test_x"), literal(7i64));
        let mut ctx = EvalContext::new(Record::new());
        assert_eq!(
            eval_expr(&*expr, &mut ctx).unwrap(),
            Control::Value(Value::Int(7))
        );

        let handle = map_variable_name("assign_test_x", VarKind::Floating);
        assert_eq!(
            ctx.scope.lookup(handle).and_then(|v| v.value()),
            Some(Value::Int(7))
        );
    }

    #[test]
    fn test_assignment_ignores_falsy_result() {
        let expr = assign(variable("assign_test_y"), literal(false));
        assert!(expr.info().ignore_falsy_result);
    }

    #[test]
    fn test_literal_is_not_assignable() {
        let expr = assign(literal(1i64), literal(2i64));
        let mut ctx = EvalContext::new(Record::new());
        let err = eval_expr(&*expr, &mut ctx).unwrap_err();
        assert!(err.message.contains("not a valid assignment target"));
    }

    #[test]
    fn test_null_protected_skips_null_rhs() {
        let expr = assign_if_set(variable("assign_test_z"), literal(Value::Null));
        let mut ctx = EvalContext::new(Record::new());
        assert_eq!(
            eval_expr(&*expr, &mut ctx).unwrap(),
            Control::Value(Value::Null)
        );
        let handle = map_variable_name("assign_test_z", VarKind::Floating);
        assert!(ctx.scope.lookup(handle).is_none(), "nothing was assigned");
    }

    #[test]
    fn test_null_protected_swallows_rhs_error() {
        let expr = assign_if_set(variable("assign_test_w"), variable("assign_test_missing"));
        let mut ctx = EvalContext::new(Record::new());
        assert_eq!(
            eval_expr(&*expr, &mut ctx).unwrap(),
            Control::Value(Value::Null)
        );
        assert!(ctx.errors().is_empty());
    }

    #[test]
    fn test_shared_container_unshares_on_later_write() {
        // x = [1]; y = x; x.append leaves y untouched
        let mut ctx = EvalContext::new(Record::new());
        eval_expr(
            &*assign(variable("assign_test_a"), literal(Value::from(vec![1i64]))),
            &mut ctx,
        )
        .unwrap();
        eval_expr(
            &*assign(variable("assign_test_b"), variable("assign_test_a")),
            &mut ctx,
        )
        .unwrap();

        let a = map_variable_name("assign_test_a", VarKind::Floating);
        let b = map_variable_name("assign_test_b", VarKind::Floating);
        let mut a_val = ctx.scope.lookup(a).unwrap().value().unwrap();
        a_val.append(Value::Int(2)).unwrap();
        ctx.scope.lookup_mut(a).unwrap().set_value(a_val);

        assert_eq!(
            ctx.scope.lookup(a).unwrap().value(),
            Some(Value::from(vec![1i64, 2]))
        );
        assert_eq!(
            ctx.scope.lookup(b).unwrap().value(),
            Some(Value::from(vec![1i64]))
        );
    }
}
