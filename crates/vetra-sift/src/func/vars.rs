//! Scope snapshot functions
//!
//! `vars()` renders the live variables of the evaluation as a dict, with
//! message-tied names spelled `$NAME`; `load_vars(dict)` is the inverse
//! and registers each entry, `$`-prefixed keys becoming message-tied
//! variables and everything else declared floating.

use crate::context::EvalContext;
use crate::error::{ConfigError, EvalError};
use crate::expr::Expr;
use crate::func::{simple_function, FunctionArgs};
use crate::scope::{map_variable_name, variable_name, VarKind};
use vetra_core::{Dict, Span, Value};

fn vars_fn(ctx: &mut EvalContext, args: &[Value], span: Span) -> Result<Value, EvalError> {
    if !args.is_empty() {
        return Err(ctx.error("vars() takes no arguments", span, None));
    }

    let mut snapshot = Dict::new();
    ctx.scope.foreach(|variable| {
        let Some(name) = variable_name(variable.handle()) else {
            return true;
        };
        let Some(value) = variable.value() else {
            return true;
        };
        let stored = match value {
            // cached record fields are stored in their typed form
            Value::Message(m) => match m.materialize() {
                Ok(v) => v,
                Err(_) => Value::Str(m.raw().clone()),
            },
            other => other.deep_clone(),
        };
        // building a fresh dict, insertion cannot fail
        let _ = snapshot.insert(name, stored);
        true
    });
    Ok(Value::Dict(snapshot))
}

fn load_vars_fn(ctx: &mut EvalContext, args: &[Value], span: Span) -> Result<Value, EvalError> {
    if args.len() != 1 {
        return Err(ctx.error("load_vars() requires exactly one argument", span, None));
    }
    let Value::Dict(source) = &args[0] else {
        return Err(ctx.error(
            "load_vars() argument must be a dict",
            span,
            Some(&args[0]),
        ));
    };

    for (name, value) in source.iter() {
        if name.is_empty() {
            return Err(ctx.error("variable name must not be empty", span, None));
        }
        let kind = if name.starts_with('$') {
            VarKind::MessageTied
        } else {
            VarKind::DeclaredFloating
        };
        let handle = map_variable_name(name, kind);
        let value = value.deep_clone();
        ctx.scope.register(kind, handle, None).set_value(value);
    }
    Ok(Value::Bool(true))
}

pub fn vars(mut args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    if !args.is_empty() {
        return Err(ConfigError::BadArity {
            function: "vars",
            details: format!("expected no arguments, got {}", args.len()),
        });
    }
    args.finish("vars")?;
    Ok(simple_function("vars", Vec::new(), vars_fn))
}

pub fn load_vars(mut args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    if args.len() != 1 {
        return Err(ConfigError::BadArity {
            function: "load_vars",
            details: format!("expected one dict argument, got {}", args.len()),
        });
    }
    let source = args.take_expr(0).ok_or(ConfigError::BadArity {
        function: "load_vars",
        details: "argument must be set".into(),
    })?;
    args.finish("load_vars")?;
    Ok(simple_function("load_vars", vec![source], load_vars_fn))
}
