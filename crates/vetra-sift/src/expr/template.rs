//! Template interpolation expressions
//!
//! Wraps a compiled record template. Evaluation renders into a scratch
//! buffer and yields a message value carrying the rendered text and the
//! type the formatter reported. Templates without field references are
//! trivialized into plain string literals at optimize time.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::ConfigError;
use crate::expr::{Expr, ExprInfo};
use std::sync::Arc;
use vetra_core::{MessageValue, Template, Value};

pub struct TemplateExpr {
    info: ExprInfo,
    template: Template,
}

/// A `"$HOST ..."` interpolation; compilation failures are configuration
/// errors.
pub fn template(source: &str) -> Result<Box<dyn Expr>, ConfigError> {
    let template = Template::compile(source)?;
    Ok(Box::new(TemplateExpr {
        info: ExprInfo::new(),
        template,
    }))
}

impl Expr for TemplateExpr {
    fn name(&self) -> &'static str {
        "template"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        if self.template.is_literal() {
            let mut text = String::new();
            self.template
                .format_value_and_type(&[], &Default::default(), &mut text);
            return Some(crate::expr::literal::literal(text));
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let mark = ctx.scratch.mark();
        let slot = ctx.scratch.alloc();

        let mut buf = std::mem::take(ctx.scratch.get_mut(slot));
        let kind = self
            .template
            .format_value_and_type(ctx.records(), &ctx.template_options, &mut buf);
        let value = MessageValue::new(Arc::from(buf.as_str()), kind);
        *ctx.scratch.get_mut(slot) = buf;

        ctx.scratch.reclaim(mark);
        Ok(Control::Value(Value::Message(value)))
    }
}
