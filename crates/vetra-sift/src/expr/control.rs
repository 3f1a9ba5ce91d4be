//! Cooperative cancellation statements
//!
//! `done()` accepts the record as-is and stops evaluating the remaining
//! statements; `drop_record()` does the same but discards the record. Both
//! are success, not errors, and fold through enclosing compounds.

use crate::context::{Control, EvalContext, EvalResult};
use crate::expr::{Expr, ExprInfo};

pub struct DoneExpr {
    info: ExprInfo,
}

pub fn done() -> Box<dyn Expr> {
    Box::new(DoneExpr {
        info: ExprInfo::new(),
    })
}

impl Expr for DoneExpr {
    fn name(&self) -> &'static str {
        "done"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn eval(&self, _ctx: &mut EvalContext) -> EvalResult {
        Ok(Control::Done)
    }
}

pub struct DropExpr {
    info: ExprInfo,
}

pub fn drop_record() -> Box<dyn Expr> {
    Box::new(DropExpr {
        info: ExprInfo::new(),
    })
}

impl Expr for DropExpr {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn eval(&self, _ctx: &mut EvalContext) -> EvalResult {
        Ok(Control::Drop)
    }
}
