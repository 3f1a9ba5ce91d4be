//! Vetra Sift - Embedded filter expression engine
//!
//! Sift evaluates a shared, immutable expression tree against every log
//! record flowing through the pipeline: filtering, transforming and
//! enriching records at line rate. The configuration parser produces the
//! tree through the constructor functions re-exported here; the host
//! drives it through [`Program`].

pub mod context;
pub mod error;
pub mod expr;
pub mod func;
pub mod metrics;
pub mod program;
pub mod scope;
pub mod scratch;

pub use context::{Control, EvalContext, EvalResult};
pub use error::{ConfigError, EvalError};
pub use expr::{Config, Expr, ExprInfo};
pub use func::{FunctionArgs, FunctionRegistry};
pub use metrics::Metrics;
pub use program::{Program, Verdict};
pub use scope::{Scope, VarHandle, VarKind};
pub use scratch::{ScratchMark, ScratchPool};

/// Expression constructors, re-exported for tree builders.
pub mod build {
    pub use crate::expr::assign::{assign, assign_if_set};
    pub use crate::expr::comparison::{comparison, CmpOp};
    pub use crate::expr::compound::{compound, compound_returning};
    pub use crate::expr::control::{done, drop_record};
    pub use crate::expr::generator::{
        dict_elem, list_elem, literal_dict, literal_list, GeneratorElem,
    };
    pub use crate::expr::literal::literal;
    pub use crate::expr::ops::{and, not, null_coalesce, or};
    pub use crate::expr::set_subscript::{set_subscript, set_subscript_if_set};
    pub use crate::expr::subscript::get_subscript;
    pub use crate::expr::template::template;
    pub use crate::expr::variable::{declared_variable, variable};
}
