//! Filter expression tree
//!
//! Expressions follow a five-phase lifecycle: construction, `init`
//! (recursive, registers eval counters), `optimize` (may hand back a
//! replacement node), `eval` (read-only, re-entered per record) and
//! `deinit`. Trees are immutable after `init` and may be shared across
//! threads; all per-record state lives in the [`EvalContext`].

pub mod assign;
pub mod comparison;
pub mod compound;
pub mod control;
pub mod generator;
pub mod literal;
pub mod ops;
pub mod set_subscript;
pub mod subscript;
pub mod template;
pub mod variable;

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::{ConfigError, EvalError};
use crate::metrics::{Metrics, STATS_LEVEL_EXPR_COUNTERS};
use prometheus::IntCounter;
use std::sync::Arc;
use vetra_core::{Span, Value};

pub use generator::GeneratorElem;

/// Engine-wide configuration handed to `init`/`deinit`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Retain expression display text and log falsy steps verbosely.
    pub debug: bool,
    /// Statistics verbosity; per-expression counters resolve at level 3.
    pub stats_level: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            stats_level: 0,
        }
    }
}

/// State shared by every expression node.
#[derive(Default)]
pub struct ExprInfo {
    pub span: Span,
    /// Original source text, retained only when debugging is on.
    pub text: Option<Arc<str>>,
    /// A falsy result from this node does not fail the enclosing block.
    pub ignore_falsy_result: bool,
    /// Keep this node out of per-step trace output.
    pub suppress_from_trace: bool,
    eval_counter: Option<IntCounter>,
}

impl ExprInfo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_location(&mut self, span: Span, text: Option<&str>) {
        self.span = span;
        self.text = text.map(Arc::from);
    }

    /// Log-friendly rendering of where this node came from.
    pub fn location(&self) -> String {
        match &self.text {
            Some(text) => format!("{}|{}", self.span, text),
            None => self.span.to_string(),
        }
    }

    pub fn resolve_counter(&mut self, kind: &'static str, cfg: &Config) {
        if cfg.stats_level >= STATS_LEVEL_EXPR_COUNTERS {
            self.eval_counter = Some(Metrics::global().expr_eval_counter(kind));
        }
    }

    pub fn release_counter(&mut self) {
        self.eval_counter = None;
    }

    pub fn count_eval(&self) {
        if let Some(counter) = &self.eval_counter {
            counter.inc();
        }
    }
}

/// A node of the filter expression tree.
pub trait Expr: Send + Sync {
    /// Node kind; doubles as the metrics label.
    fn name(&self) -> &'static str;

    fn info(&self) -> &ExprInfo;

    fn info_mut(&mut self) -> &mut ExprInfo;

    /// Prepares the node for evaluation. Implementations with children
    /// initialize them first (rolling back on failure) and then delegate
    /// here, mirroring the registration of their eval counter.
    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        let kind = self.name();
        self.info_mut().resolve_counter(kind, cfg);
        Ok(())
    }

    /// Constant folding and literal trivialization; a returned node
    /// replaces this one in the tree.
    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        None
    }

    /// Evaluates against the context. Must not mutate the tree.
    fn eval(&self, ctx: &mut EvalContext) -> EvalResult;

    /// Symmetric teardown; safe to call only after a successful `init`.
    fn deinit(&mut self, _cfg: &Config) {
        self.info_mut().release_counter();
    }

    /// The constant this node evaluates to, when known at config time.
    fn as_literal(&self) -> Option<&Value> {
        None
    }

    /// Elements of a literal list generator, for callers that pre-render
    /// needle strings at init time.
    fn literal_list_elements(&self) -> Option<&[GeneratorElem]> {
        None
    }

    /// Elements of a literal dict generator.
    fn literal_dict_elements(&self) -> Option<&[GeneratorElem]> {
        None
    }

    /// Stores `value` into the place this expression names.
    fn assign(&self, ctx: &mut EvalContext, value: Value) -> Result<(), EvalError> {
        let span = self.info().span;
        Err(ctx.error("expression is not a valid assignment target", span, Some(&value)))
    }
}

/// Evaluates a node, bumping its eval counter.
pub fn eval_expr(expr: &dyn Expr, ctx: &mut EvalContext) -> EvalResult {
    expr.info().count_eval();
    expr.eval(ctx)
}

/// Evaluates an operand position: a control signal short-circuits the
/// enclosing expression by propagating outward.
macro_rules! operand {
    ($expr:expr, $ctx:expr) => {
        match $crate::expr::eval_expr($expr, $ctx)? {
            $crate::context::Control::Value(value) => value,
            signal => return Ok(signal),
        }
    };
}
pub(crate) use operand;

/// Runs `optimize` on a tree slot, splicing in the replacement if any.
pub fn optimize_in_place(slot: &mut Box<dyn Expr>) {
    if let Some(replacement) = slot.optimize() {
        *slot = replacement;
    }
}

/// Initializes a list of children; on failure the already-initialized
/// prefix is deinitialized in reverse before the error propagates.
pub fn init_subexprs(exprs: &mut [Box<dyn Expr>], cfg: &Config) -> Result<(), ConfigError> {
    for i in 0..exprs.len() {
        if let Err(e) = exprs[i].init(cfg) {
            for expr in exprs[..i].iter_mut().rev() {
                expr.deinit(cfg);
            }
            return Err(e);
        }
    }
    Ok(())
}

pub fn deinit_subexprs(exprs: &mut [Box<dyn Expr>], cfg: &Config) {
    for expr in exprs.iter_mut() {
        expr.deinit(cfg);
    }
}

/// Two-child variant of [`init_subexprs`].
pub fn init_pair(
    lhs: &mut Box<dyn Expr>,
    rhs: &mut Box<dyn Expr>,
    cfg: &Config,
) -> Result<(), ConfigError> {
    lhs.init(cfg)?;
    if let Err(e) = rhs.init(cfg) {
        lhs.deinit(cfg);
        return Err(e);
    }
    Ok(())
}

/// Evaluates an operand all the way to a concrete [`Value`], treating a
/// control signal as an error. For contexts that cannot short-circuit
/// (function arguments evaluated eagerly into a slice).
pub fn eval_value(expr: &dyn Expr, ctx: &mut EvalContext) -> Result<Value, EvalError> {
    match eval_expr(expr, ctx)? {
        Control::Value(value) => Ok(value),
        _ => {
            let span = expr.info().span;
            Err(ctx.error("control statement in value position", span, None))
        }
    }
}
