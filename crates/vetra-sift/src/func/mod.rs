//! Built-in filter function library
//!
//! Functions are constructed at configuration time from a name and an
//! argument list; arity and literal-argument violations surface as
//! configuration errors, never at eval time.

pub mod affix;
pub mod regexp;
pub mod transform;
pub mod vars;

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::{ConfigError, EvalError};
use crate::expr::{deinit_subexprs, eval_value, init_subexprs, Config, Expr, ExprInfo};
use rustc_hash::FxHashMap;
use vetra_core::{Span, Value};

/// Positional and named argument expressions of one function call.
///
/// Constructors consume the expressions they accept; anything left over
/// when [`FunctionArgs::finish`] runs is a configuration error.
pub struct FunctionArgs {
    positional: Vec<Option<Box<dyn Expr>>>,
    named: Vec<(String, Option<Box<dyn Expr>>)>,
}

impl FunctionArgs {
    pub fn new(positional: Vec<Box<dyn Expr>>) -> Self {
        Self {
            positional: positional.into_iter().map(Some).collect(),
            named: Vec::new(),
        }
    }

    pub fn with_named(mut self, name: &str, expr: Box<dyn Expr>) -> Self {
        self.named.push((name.to_string(), Some(expr)));
        self
    }

    pub fn len(&self) -> usize {
        self.positional.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty()
    }

    /// Consumes the positional argument at `index`.
    pub fn take_expr(&mut self, index: usize) -> Option<Box<dyn Expr>> {
        self.positional.get_mut(index)?.take()
    }

    /// The literal string value of the positional argument at `index`,
    /// without consuming it.
    pub fn literal_string(&self, index: usize) -> Option<String> {
        let expr = self.positional.get(index)?.as_ref()?;
        expr.as_literal()?.as_str().map(ToOwned::to_owned)
    }

    /// Consumes the named argument `name`, requiring a literal boolean.
    pub fn named_literal_bool(
        &mut self,
        function: &'static str,
        name: &'static str,
    ) -> Result<Option<bool>, ConfigError> {
        let Some(slot) = self.named.iter_mut().find(|(n, _)| n == name) else {
            return Ok(None);
        };
        let expr = slot.1.take().ok_or(ConfigError::LiteralRequired {
            function,
            argument: name,
            expected: "boolean",
        })?;
        match expr.as_literal().and_then(Value::as_bool) {
            Some(value) => Ok(Some(value)),
            None => Err(ConfigError::LiteralRequired {
                function,
                argument: name,
                expected: "boolean",
            }),
        }
    }

    /// Verifies every argument was consumed.
    pub fn finish(self, function: &'static str) -> Result<(), ConfigError> {
        if let Some(index) = self.positional.iter().position(Option::is_some) {
            return Err(ConfigError::UnexpectedArgument {
                function,
                argument: format!("#{}", index),
            });
        }
        if let Some((name, _)) = self.named.iter().find(|(_, e)| e.is_some()) {
            return Err(ConfigError::UnexpectedArgument {
                function,
                argument: name.clone(),
            });
        }
        Ok(())
    }
}

pub type FunctionCtor = fn(FunctionArgs) -> Result<Box<dyn Expr>, ConfigError>;

/// Name to constructor table, populated at configuration time.
pub struct FunctionRegistry {
    ctors: FxHashMap<&'static str, FunctionCtor>,
}

impl FunctionRegistry {
    pub fn empty() -> Self {
        Self {
            ctors: FxHashMap::default(),
        }
    }

    /// The standard library of built-ins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("startswith", affix::startswith);
        registry.register("endswith", affix::endswith);
        registry.register("includes", affix::includes);
        registry.register("regexp_search", regexp::regexp_search);
        registry.register("lower", transform::lower);
        registry.register("upper", transform::upper);
        registry.register("vars", vars::vars);
        registry.register("load_vars", vars::load_vars);
        registry
    }

    pub fn register(&mut self, name: &'static str, ctor: FunctionCtor) {
        self.ctors.insert(name, ctor);
    }

    pub fn construct(
        &self,
        name: &str,
        args: FunctionArgs,
    ) -> Result<Box<dyn Expr>, ConfigError> {
        let ctor = self
            .ctors
            .get(name)
            .ok_or_else(|| ConfigError::UnknownFunction(name.to_string()))?;
        ctor(args)
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

/// Eagerly evaluated function body: gets its arguments as values.
pub type SimpleFunction = fn(&mut EvalContext, &[Value], Span) -> Result<Value, EvalError>;

/// Adapter giving simple host functions the standard expression contract.
pub struct SimpleFunctionExpr {
    info: ExprInfo,
    fname: &'static str,
    args: Vec<Box<dyn Expr>>,
    func: SimpleFunction,
}

pub fn simple_function(
    fname: &'static str,
    args: Vec<Box<dyn Expr>>,
    func: SimpleFunction,
) -> Box<dyn Expr> {
    Box::new(SimpleFunctionExpr {
        info: ExprInfo::new(),
        fname,
        args,
        func,
    })
}

impl Expr for SimpleFunctionExpr {
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
        init_subexprs(&mut self.args, cfg)?;
        self.info.resolve_counter(self.fname, cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        for arg in &mut self.args {
            crate::expr::optimize_in_place(arg);
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let mut values = Vec::with_capacity(self.args.len());
        for arg in &self.args {
            values.push(eval_value(arg.as_ref(), ctx)?);
        }
        let value = (self.func)(ctx, &values, self.info.span)?;
        Ok(Control::Value(value))
    }

    fn deinit(&mut self, cfg: &Config) {
        deinit_subexprs(&mut self.args, cfg);
        self.info.release_counter();
    }
}
