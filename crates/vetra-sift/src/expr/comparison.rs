//! Comparison operators
//!
//! Comparisons are type-aware: two numbers (or datetimes) compare
//! numerically, two strings byte-wise, anything else is only ever equal
//! or not equal structurally. Message values are parsed into their typed
//! form first; payloads that fail to parse compare as their raw text.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::ConfigError;
use crate::expr::{operand, optimize_in_place, Config, Expr, ExprInfo};
use std::cmp::Ordering;
use vetra_core::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    fn evaluate(self, ordering: Option<Ordering>) -> bool {
        match (self, ordering) {
            (CmpOp::Eq, Some(Ordering::Equal)) => true,
            (CmpOp::Ne, Some(Ordering::Equal)) => false,
            (CmpOp::Ne, _) => true,
            (CmpOp::Lt, Some(Ordering::Less)) => true,
            (CmpOp::Le, Some(Ordering::Less | Ordering::Equal)) => true,
            (CmpOp::Gt, Some(Ordering::Greater)) => true,
            (CmpOp::Ge, Some(Ordering::Greater | Ordering::Equal)) => true,
            _ => false,
        }
    }
}

pub struct ComparisonExpr {
    info: ExprInfo,
    op: CmpOp,
    lhs: Box<dyn Expr>,
    rhs: Box<dyn Expr>,
}

pub fn comparison(op: CmpOp, lhs: Box<dyn Expr>, rhs: Box<dyn Expr>) -> Box<dyn Expr> {
    Box::new(ComparisonExpr {
        info: ExprInfo::new(),
        op,
        lhs,
        rhs,
    })
}

/// Resolves a message value to its typed form, falling back to the raw
/// text when the payload does not parse.
fn settle(value: Value) -> Value {
    match value {
        Value::Message(m) => match m.materialize() {
            Ok(v) => v,
            Err(_) => Value::Str(m.raw().clone()),
        },
        other => other,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Int(n) => Some(*n as f64),
        Value::Double(n) => Some(*n),
        Value::Bool(b) => Some(*b as i64 as f64),
        Value::Datetime(dt) => Some(dt.timestamp_micros() as f64),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<&[u8]> {
    match value {
        Value::Str(s) => Some(s.as_bytes()),
        Value::Bytes(b) => Some(b),
        _ => None,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        return Some(a.cmp(b));
    }
    if let (Some(a), Some(b)) = (as_number(lhs), as_number(rhs)) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (as_text(lhs), as_text(rhs)) {
        return Some(a.cmp(b));
    }
    if lhs.is_null() && rhs.is_null() {
        return Some(Ordering::Equal);
    }
    // mixed or structural: only equality is meaningful
    if lhs == rhs {
        Some(Ordering::Equal)
    } else {
        None
    }
}

impl Expr for ComparisonExpr {
    fn name(&self) -> &'static str {
        "comparison"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        crate::expr::init_pair(&mut self.lhs, &mut self.rhs, cfg)?;
        self.info.resolve_counter("comparison", cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.lhs);
        optimize_in_place(&mut self.rhs);
        if let (Some(lhs), Some(rhs)) = (self.lhs.as_literal(), self.rhs.as_literal()) {
            let lhs = settle(lhs.clone());
            let rhs = settle(rhs.clone());
            let result = self.op.evaluate(compare(&lhs, &rhs));
            return Some(crate::expr::literal::literal(result));
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let lhs = settle(operand!(self.lhs.as_ref(), ctx));
        let rhs = settle(operand!(self.rhs.as_ref(), ctx));
        let result = self.op.evaluate(compare(&lhs, &rhs));
        Ok(Control::Value(Value::Bool(result)))
    }

    fn deinit(&mut self, cfg: &Config) {
        self.lhs.deinit(cfg);
        self.rhs.deinit(cfg);
        self.info.release_counter();
    }
}
