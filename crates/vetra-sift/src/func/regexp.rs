//! Regular expression search generator
//!
//! `regexp_search(string, pattern, keep_zero=false, list_mode=false)`
//! fills a fresh container with the capture groups of the first match.
//! The pattern must be a configuration-time literal; failing to compile
//! it fails the configuration, never a record. Failing to match yields
//! an empty container.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::{ConfigError, EvalError};
use crate::expr::generator::ContainerGenerator;
use crate::expr::{optimize_in_place, Config, Expr, ExprInfo};
use crate::func::FunctionArgs;
use regex::Regex;
use tracing::error;
use vetra_core::{Dict, List, Value};

pub struct RegexpSearchExpr {
    info: ExprInfo,
    lhs: Box<dyn Expr>,
    pattern: Regex,
    keep_zero: bool,
    list_mode: bool,
}

pub fn regexp_search(mut args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    const FNAME: &str = "regexp_search";

    let keep_zero = args.named_literal_bool(FNAME, "keep_zero")?.unwrap_or(false);
    let list_mode = args.named_literal_bool(FNAME, "list_mode")?.unwrap_or(false);

    if args.len() != 2 {
        return Err(ConfigError::BadArity {
            function: FNAME,
            details: format!("expected string and pattern, got {}", args.len()),
        });
    }

    let pattern_source = args
        .literal_string(1)
        .ok_or(ConfigError::LiteralRequired {
            function: FNAME,
            argument: "pattern",
            expected: "string",
        })?;
    let pattern = Regex::new(&pattern_source).map_err(|source| ConfigError::BadPattern {
        pattern: pattern_source,
        source,
    })?;

    let lhs = args.take_expr(0).ok_or(ConfigError::BadArity {
        function: FNAME,
        details: "string must be set".into(),
    })?;
    let _ = args.take_expr(1);
    args.finish(FNAME)?;

    let mut info = ExprInfo::new();
    info.ignore_falsy_result = true;
    Ok(Box::new(RegexpSearchExpr {
        info,
        lhs,
        pattern,
        keep_zero,
        list_mode,
    }))
}

impl RegexpSearchExpr {
    /// Group zero spans the whole match; it is noise whenever the pattern
    /// has real capture groups and the caller did not opt in.
    fn elide_group_zero(&self, group_count: usize) -> bool {
        group_count > 1 && !self.keep_zero
    }

    fn store_matches_to_list(
        &self,
        caps: &regex::Captures<'_>,
        fillable: &mut Value,
    ) -> Result<(), vetra_core::ValueError> {
        for i in 0..self.pattern.captures_len() {
            if i == 0 && self.elide_group_zero(self.pattern.captures_len()) {
                continue;
            }
            if let Some(group) = caps.get(i) {
                fillable.append(Value::from(group.as_str()))?;
            }
        }
        Ok(())
    }

    fn store_matches_to_dict(
        &self,
        caps: &regex::Captures<'_>,
        fillable: &mut Value,
    ) -> Result<(), vetra_core::ValueError> {
        // first store every participating group under its decimal index
        for i in 0..self.pattern.captures_len() {
            if i == 0 && self.elide_group_zero(self.pattern.captures_len()) {
                continue;
            }
            if let Some(group) = caps.get(i) {
                fillable.set_subscript(&Value::from(i.to_string()), Value::from(group.as_str()))?;
            }
        }

        // then rename named groups, dropping their numeric key; on a name
        // collision the last write wins
        for (i, name) in self.pattern.capture_names().enumerate() {
            let Some(name) = name else { continue };
            if caps.get(i).is_none() {
                continue;
            }
            let numeric_key = Value::from(i.to_string());
            if let Some(value) = fillable.get_subscript(&numeric_key) {
                fillable.set_subscript(&Value::from(name), value)?;
                fillable.unset_key(&numeric_key)?;
            }
        }
        Ok(())
    }
}

impl ContainerGenerator for RegexpSearchExpr {
    fn create_container(&self, _ctx: &mut EvalContext) -> Result<Value, EvalError> {
        Ok(if self.list_mode {
            Value::List(List::new())
        } else {
            Value::Dict(Dict::new())
        })
    }

    fn generate(&self, ctx: &mut EvalContext, fillable: &mut Value) -> Result<(), EvalError> {
        let subject = match crate::expr::eval_expr(self.lhs.as_ref(), ctx)? {
            Control::Value(v) => v,
            _ => {
                let span = self.info.span;
                return Err(ctx.error("control statement in subject position", span, None));
            }
        };

        let mark = ctx.scratch.mark();
        let slot = ctx.scratch.alloc();
        let mut buf = std::mem::take(ctx.scratch.get_mut(slot));
        subject.repr_into(&mut buf);

        let result = match self.pattern.captures(&buf) {
            None => Ok(()),
            Some(caps) => {
                if self.list_mode {
                    self.store_matches_to_list(&caps, fillable)
                } else {
                    self.store_matches_to_dict(&caps, fillable)
                }
            }
        };

        *ctx.scratch.get_mut(slot) = buf;
        ctx.scratch.reclaim(mark);

        result.map_err(|e| {
            error!(error = %e, "failed to store regexp match");
            let span = self.info.span;
            ctx.error(e.to_string(), span, None)
        })
    }
}

impl Expr for RegexpSearchExpr {
    fn name(&self) -> &'static str {
        "regexp_search"
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        self.lhs.init(cfg)?;
        self.info.resolve_counter("regexp_search", cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        optimize_in_place(&mut self.lhs);
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let mut fillable = self.create_container(ctx)?;
        self.generate(ctx, &mut fillable)?;
        Ok(Control::Value(fillable))
    }

    fn deinit(&mut self, cfg: &Config) {
        self.lhs.deinit(cfg);
        self.info.release_counter();
    }
}
