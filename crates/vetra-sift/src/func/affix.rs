//! String affix and inclusion predicates
//!
//! `startswith(haystack, needle, ignorecase=false)` and friends. The
//! needle may be a single expression or a list of alternatives; the
//! predicate is true on the first matching alternative. Needles known to
//! be literal at configuration time are pre-rendered (and pre-folded)
//! once at init; everything else renders per call into scratch buffers.
//!
//! Case-insensitive mode folds both sides with Unicode lowercasing and
//! then compares bytes, which is only correct when both sides fold to
//! the same form; locale-specific foldings are out of scope.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::{ConfigError, EvalError};
use crate::expr::{init_pair, operand, optimize_in_place, Config, Expr, ExprInfo};
use crate::func::FunctionArgs;
use smallvec::SmallVec;
use vetra_core::Value;

type AffixPredicate = fn(&str, &str) -> bool;

fn match_startswith(haystack: &str, needle: &str) -> bool {
    haystack.as_bytes().starts_with(needle.as_bytes())
}

fn match_endswith(haystack: &str, needle: &str) -> bool {
    haystack.as_bytes().ends_with(needle.as_bytes())
}

fn match_includes(haystack: &str, needle: &str) -> bool {
    haystack.contains(needle)
}

pub struct AffixExpr {
    info: ExprInfo,
    fname: &'static str,
    ignore_case: bool,
    haystack: Box<dyn Expr>,
    needle: Box<dyn Expr>,
    cached_needles: SmallVec<[String; 4]>,
    predicate: AffixPredicate,
}

pub fn startswith(args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    new_affix(args, "startswith", match_startswith)
}

pub fn endswith(args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    new_affix(args, "endswith", match_endswith)
}

pub fn includes(args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    new_affix(args, "includes", match_includes)
}

fn new_affix(
    mut args: FunctionArgs,
    fname: &'static str,
    predicate: AffixPredicate,
) -> Result<Box<dyn Expr>, ConfigError> {
    let ignore_case = args
        .named_literal_bool(fname, "ignorecase")?
        .unwrap_or(false);

    if args.len() != 2 {
        return Err(ConfigError::BadArity {
            function: fname,
            details: format!("expected haystack and needle, got {}", args.len()),
        });
    }
    let haystack = args.take_expr(0).ok_or(ConfigError::BadArity {
        function: fname,
        details: "haystack must be set".into(),
    })?;
    let needle = args.take_expr(1).ok_or(ConfigError::BadArity {
        function: fname,
        details: "needle must be set".into(),
    })?;
    args.finish(fname)?;

    Ok(Box::new(AffixExpr {
        info: ExprInfo::new(),
        fname,
        ignore_case,
        haystack,
        needle,
        cached_needles: SmallVec::new(),
        predicate,
    }))
}

impl AffixExpr {
    fn render(&self, value: &Value) -> String {
        let text = value.repr();
        if self.ignore_case {
            text.to_lowercase()
        } else {
            text
        }
    }

    /// Pre-renders needles that are fully known at configuration time: a
    /// single literal, or a literal list whose elements are all literal.
    fn cache_needles(&mut self) {
        if let Some(value) = self.needle.as_literal() {
            let rendered = self.render(value);
            self.cached_needles.push(rendered);
            return;
        }
        if let Some(elements) = self.needle.literal_list_elements() {
            let rendered: Option<SmallVec<[String; 4]>> = elements
                .iter()
                .map(|elem| elem.value.as_literal().map(|v| self.render(v)))
                .collect();
            if let Some(rendered) = rendered {
                if !rendered.is_empty() {
                    self.cached_needles = rendered;
                }
            }
        }
    }

    fn matches_any(&self, ctx: &mut EvalContext, haystack_slot: usize) -> Result<bool, EvalError> {
        // evaluate the needle(s) of this call into the scratch region
        let needle_value = match crate::expr::eval_expr(self.needle.as_ref(), ctx)? {
            Control::Value(v) => v,
            _ => {
                let span = self.info.span;
                return Err(ctx.error("control statement in needle position", span, None));
            }
        };
        let needle_value = match needle_value {
            Value::Message(m) => {
                let span = self.info.span;
                m.materialize()
                    .map_err(|e| ctx.error(e.to_string(), span, None))?
            }
            other => other,
        };

        match needle_value {
            Value::List(items) => {
                for item in items.iter() {
                    let slot = ctx.scratch.alloc();
                    let rendered = self.render(item);
                    ctx.scratch.get_mut(slot).push_str(&rendered);
                    if (self.predicate)(ctx.scratch.get(haystack_slot), ctx.scratch.get(slot)) {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            single @ (Value::Str(_) | Value::Bytes(_)) => {
                let rendered = self.render(&single);
                Ok((self.predicate)(ctx.scratch.get(haystack_slot), &rendered))
            }
            other => {
                let span = self.info.span;
                Err(ctx.error("needle must be a string or a list", span, Some(&other)))
            }
        }
    }

    fn eval_inner(&self, ctx: &mut EvalContext) -> EvalResult {
        let haystack = operand!(self.haystack.as_ref(), ctx);
        let slot = ctx.scratch.alloc();
        let rendered = self.render(&haystack);
        ctx.scratch.get_mut(slot).push_str(&rendered);

        if !self.cached_needles.is_empty() {
            let matched = self
                .cached_needles
                .iter()
                .any(|needle| (self.predicate)(ctx.scratch.get(slot), needle));
            return Ok(Control::Value(Value::Bool(matched)));
        }

        let matched = self.matches_any(ctx, slot)?;
        Ok(Control::Value(Value::Bool(matched)))
    }
}

impl Expr for AffixExpr {
    fn name(&self) -> &'static str {
        self.fname
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        init_pair(&mut self.haystack, &mut self.needle, cfg)?;
        self.cache_needles();
        self.info.resolve_counter(self.fname, cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.haystack);
        optimize_in_place(&mut self.needle);
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let mark = ctx.scratch.mark();
        let result = self.eval_inner(ctx);
        ctx.scratch.reclaim(mark);
        result
    }

    fn deinit(&mut self, cfg: &Config) {
        self.haystack.deinit(cfg);
        self.needle.deinit(cfg);
        self.info.release_counter();
    }
}
