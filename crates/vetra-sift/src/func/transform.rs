//! ASCII case transform functions

use crate::context::EvalContext;
use crate::error::{ConfigError, EvalError};
use crate::expr::Expr;
use crate::func::{simple_function, FunctionArgs};
use std::sync::Arc;
use vetra_core::{Span, Value};

fn extract_str_arg<'a>(
    ctx: &mut EvalContext,
    fname: &'static str,
    args: &'a [Value],
    span: Span,
) -> Result<&'a str, EvalError> {
    if args.len() != 1 {
        return Err(ctx.error(
            format!("{}() requires exactly one argument", fname),
            span,
            None,
        ));
    }
    match args[0].as_str() {
        Some(s) => Ok(s),
        None => Err(ctx.error(
            format!("{}() argument must be a string", fname),
            span,
            Some(&args[0]),
        )),
    }
}

fn lower_fn(ctx: &mut EvalContext, args: &[Value], span: Span) -> Result<Value, EvalError> {
    let s = extract_str_arg(ctx, "lower", args, span)?;
    Ok(Value::Str(Arc::from(s.to_ascii_lowercase().as_str())))
}

fn upper_fn(ctx: &mut EvalContext, args: &[Value], span: Span) -> Result<Value, EvalError> {
    let s = extract_str_arg(ctx, "upper", args, span)?;
    Ok(Value::Str(Arc::from(s.to_ascii_uppercase().as_str())))
}

fn new_transform(
    mut args: FunctionArgs,
    fname: &'static str,
    func: crate::func::SimpleFunction,
) -> Result<Box<dyn Expr>, ConfigError> {
    if args.len() != 1 {
        return Err(ConfigError::BadArity {
            function: fname,
            details: format!("expected one string argument, got {}", args.len()),
        });
    }
    let arg = args.take_expr(0).ok_or(ConfigError::BadArity {
        function: fname,
        details: "argument must be set".into(),
    })?;
    args.finish(fname)?;
    Ok(simple_function(fname, vec![arg], func))
}

pub fn lower(args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    new_transform(args, "lower", lower_fn)
}

pub fn upper(args: FunctionArgs) -> Result<Box<dyn Expr>, ConfigError> {
    new_transform(args, "upper", upper_fn)
}
