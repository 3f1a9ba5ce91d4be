//! Literal container generators
//!
//! A `{...}` or `[...]` literal is not a constant: it is a generator that
//! creates a fresh container on every evaluation and populates it from
//! its element expressions. Nested literals are themselves generators, so
//! each evaluation builds an entirely new tree of containers. Elements
//! flagged cloneable get a deep copy before insertion, keeping shared
//! structures out of the freshly built container.

use crate::context::{Control, EvalContext, EvalResult};
use crate::error::{ConfigError, EvalError};
use crate::expr::{optimize_in_place, Config, Expr, ExprInfo};
use vetra_core::{Dict, List, Value};

/// One element of a literal generator: an optional key expression, the
/// value expression and whether the value needs cloning before insertion.
pub struct GeneratorElem {
    pub key: Option<Box<dyn Expr>>,
    pub value: Box<dyn Expr>,
    pub cloneable: bool,
}

impl GeneratorElem {
    pub fn new(key: Option<Box<dyn Expr>>, value: Box<dyn Expr>, cloneable: bool) -> Self {
        Self {
            key,
            value,
            cloneable,
        }
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        if let Some(key) = &mut self.key {
            key.init(cfg)?;
        }
        if let Err(e) = self.value.init(cfg) {
            if let Some(key) = &mut self.key {
                key.deinit(cfg);
            }
            return Err(e);
        }
        Ok(())
    }

    fn optimize(&mut self) {
        if let Some(key) = &mut self.key {
            optimize_in_place(key);
        }
        optimize_in_place(&mut self.value);
    }

    fn deinit(&mut self, cfg: &Config) {
        if let Some(key) = &mut self.key {
            key.deinit(cfg);
        }
        self.value.deinit(cfg);
    }
}

/// The container-producing half of a generator expression: create a fresh
/// dict or list, then write into it.
pub trait ContainerGenerator {
    fn create_container(&self, ctx: &mut EvalContext) -> Result<Value, EvalError>;
    fn generate(&self, ctx: &mut EvalContext, fillable: &mut Value) -> Result<(), EvalError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerKind {
    Dict,
    List,
}

pub struct LiteralGeneratorExpr {
    info: ExprInfo,
    container: ContainerKind,
    elements: Vec<GeneratorElem>,
}

/// A `{...}` literal; element keys are required.
pub fn literal_dict(elements: Vec<GeneratorElem>) -> Box<dyn Expr> {
    new_literal_generator(ContainerKind::Dict, elements)
}

/// A `[...]` literal; element keys must be absent.
pub fn literal_list(elements: Vec<GeneratorElem>) -> Box<dyn Expr> {
    new_literal_generator(ContainerKind::List, elements)
}

/// A list element shorthand: no key, not cloneable.
pub fn list_elem(value: Box<dyn Expr>) -> GeneratorElem {
    GeneratorElem::new(None, value, false)
}

/// A dict element shorthand: keyed, not cloneable.
pub fn dict_elem(key: Box<dyn Expr>, value: Box<dyn Expr>) -> GeneratorElem {
    GeneratorElem::new(Some(key), value, false)
}

fn new_literal_generator(
    container: ContainerKind,
    elements: Vec<GeneratorElem>,
) -> Box<dyn Expr> {
    let mut info = ExprInfo::new();
    // generators build state, their container result never gates a block
    info.ignore_falsy_result = true;
    Box::new(LiteralGeneratorExpr {
        info,
        container,
        elements,
    })
}

/// Writes `elements` into `fillable`; shared by literal generators and by
/// callers that fill an existing container.
pub fn generate_elements(
    ctx: &mut EvalContext,
    fillable: &mut Value,
    elements: &[GeneratorElem],
    span: vetra_core::Span,
) -> Result<(), EvalError> {
    for elem in elements {
        let key = match &elem.key {
            Some(key_expr) => match crate::expr::eval_expr(key_expr.as_ref(), ctx)? {
                Control::Value(v) => Some(v),
                _ => {
                    return Err(ctx.error("control statement in literal key", span, None));
                }
            },
            None => None,
        };

        let mut value = match crate::expr::eval_expr(elem.value.as_ref(), ctx)? {
            Control::Value(v) => v,
            _ => {
                return Err(ctx.error("control statement in literal element", span, None));
            }
        };
        if elem.cloneable {
            value = value.deep_clone();
        }

        let result = match &key {
            Some(key) => fillable.set_subscript(key, value),
            None => fillable.append(value),
        };
        result.map_err(|e| ctx.error(e.to_string(), span, key.as_ref()))?;
    }
    Ok(())
}

impl ContainerGenerator for LiteralGeneratorExpr {
    fn create_container(&self, _ctx: &mut EvalContext) -> Result<Value, EvalError> {
        Ok(match self.container {
            ContainerKind::Dict => Value::Dict(Dict::with_capacity(self.elements.len())),
            ContainerKind::List => Value::List(List::new()),
        })
    }

    fn generate(&self, ctx: &mut EvalContext, fillable: &mut Value) -> Result<(), EvalError> {
        generate_elements(ctx, fillable, &self.elements, self.info.span)
    }
}

impl Expr for LiteralGeneratorExpr {
    fn name(&self) -> &'static str {
        match self.container {
            ContainerKind::Dict => "literal_dict",
            ContainerKind::List => "literal_list",
        }
    }

    fn info(&self) -> &ExprInfo {
        &self.info
    }

    fn info_mut(&mut self) -> &mut ExprInfo {
        &mut self.info
    }

    fn init(&mut self, cfg: &Config) -> Result<(), ConfigError> {
        for i in 0..self.elements.len() {
            if let Err(e) = self.elements[i].init(cfg) {
                for elem in self.elements[..i].iter_mut().rev() {
                    elem.deinit(cfg);
                }
                return Err(e);
            }
        }
        let kind = self.name();
        self.info.resolve_counter(kind, cfg);
        Ok(())
    }

    fn optimize(&mut self) -> Option<Box<dyn Expr>> {
        for elem in &mut self.elements {
            elem.optimize();
        }
        None
    }

    fn eval(&self, ctx: &mut EvalContext) -> EvalResult {
        let mut fillable = self.create_container(ctx)?;
        self.generate(ctx, &mut fillable)?;
        Ok(Control::Value(fillable))
    }

    fn deinit(&mut self, cfg: &Config) {
        for elem in &mut self.elements {
            elem.deinit(cfg);
        }
        self.info.release_counter();
    }

    fn literal_list_elements(&self) -> Option<&[GeneratorElem]> {
        (self.container == ContainerKind::List).then_some(&self.elements)
    }

    fn literal_dict_elements(&self) -> Option<&[GeneratorElem]> {
        (self.container == ContainerKind::Dict).then_some(&self.elements)
    }
}
