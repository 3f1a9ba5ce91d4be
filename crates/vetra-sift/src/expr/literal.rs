//! Literal expressions

use crate::context::{Control, EvalContext, EvalResult};
use crate::expr::{Expr, ExprInfo};
use vetra_core::Value;

pub struct LiteralExpr {
    info: ExprInfo,
    value: Value,
}

/// A constant known at configuration time.
pub fn literal(value: impl Into<Value>) -> Box<dyn Expr> {
    Box::new(LiteralExpr {
        info: ExprInfo::new(),
        value: value.into(),
    })
}

impl Expr for LiteralExpr {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn eval(&self, _ctx: &mut EvalContext) -> EvalResult {
        Ok(Control::Value(self.value.clone()))
    }

    fn as_literal(&self) -> Option<&Value> {
        Some(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::eval_expr;
    use vetra_core::Record;

    #[test]
    fn test_literal_evaluates_to_its_value() {
        let expr = literal(42i64);
        let mut ctx = EvalContext::new(Record::new());
        assert_eq!(
            eval_expr(&*expr, &mut ctx).unwrap(),
            Control::Value(Value::Int(42))
        );
        assert_eq!(expr.as_literal(), Some(&Value::Int(42)));
    }
}
