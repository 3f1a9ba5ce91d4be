//! Compiled filter programs
//!
//! The host-facing driver: owns the root expression, runs the
//! init/optimize phases at configuration time, and per record builds an
//! evaluation context, maps the outcome to a routing verdict and hands
//! the (possibly modified) record back.

use crate::context::{Control, EvalContext};
use crate::error::{ConfigError, EvalError};
use crate::expr::{eval_expr, optimize_in_place, Config, Expr};
use crate::metrics::Metrics;
use tracing::debug;
use vetra_core::{Record, Value};

/// What the host should do with the record.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// The filter matched (or not); the record continues downstream.
    Accept(Value),
    /// A `drop` statement discarded the record.
    Drop,
    /// A `done` statement accepted the record early.
    Done,
}

pub struct Program {
    root: Box<dyn Expr>,
    cfg: Config,
    initialized: bool,
}

impl Program {
    /// Initializes and optimizes `root` under `cfg`.
    pub fn compile(mut root: Box<dyn Expr>, cfg: Config) -> Result<Program, ConfigError> {
        root.init(&cfg)?;
        optimize_in_place(&mut root);
        Ok(Program {
            root,
            cfg,
            initialized: true,
        })
    }

    /// Evaluates one record in a fresh context. Returns the verdict and
    /// the record with assigned message variables synced back.
    pub fn eval(&self, record: Record) -> (Result<Verdict, EvalError>, Record) {
        let mut ctx = EvalContext::new(record);
        let verdict = self.eval_in_context(&mut ctx);
        (verdict, ctx.finish())
    }

    /// Evaluates against a caller-managed context, for hosts that reuse
    /// one context (scope, scratch buffers) across a stream of records.
    pub fn eval_in_context(&self, ctx: &mut EvalContext) -> Result<Verdict, EvalError> {
        match eval_expr(self.root.as_ref(), ctx) {
            Ok(Control::Value(value)) => Ok(Verdict::Accept(value)),
            Ok(Control::Drop) => {
                Metrics::global().count_dropped_record();
                Ok(Verdict::Drop)
            }
            Ok(Control::Done) => Ok(Verdict::Done),
            Err(error) => {
                Metrics::global().count_eval_error();
                debug!(error = %error, "record evaluation failed");
                Err(error)
            }
        }
    }

    /// Symmetric teardown of the init phase; runs automatically on drop.
    pub fn shutdown(&mut self) {
        if self.initialized {
            self.root.deinit(&self.cfg);
            self.initialized = false;
        }
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::compound::compound;
    use crate::expr::literal::literal;

    #[test]
    fn test_compile_eval_roundtrip() {
        let program = Program::compile(compound().with(literal(true)).boxed(), Config::default())
            .unwrap();
        let (verdict, _record) = program.eval(Record::new());
        assert_eq!(verdict.unwrap(), Verdict::Accept(Value::Bool(true)));
    }

    #[test]
    fn test_repeated_init_deinit_cycles() {
        for _ in 0..3 {
            let mut program = Program::compile(
                compound().with(literal(true)).boxed(),
                Config {
                    stats_level: 3,
                    ..Config::default()
                },
            )
            .unwrap();
            let (verdict, _) = program.eval(Record::new());
            assert!(verdict.is_ok());
            program.shutdown();
            // a second shutdown is a no-op
            program.shutdown();
        }
    }
}
