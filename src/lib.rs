mod ast;
mod context;
mod continuation;
mod environment;
mod error;
mod interpreter;
mod parser;
mod primitive;
mod value;

#[cfg(test)]
mod test_utils;

pub use ast::{AppForm, Datum, Expr, IfForm, LambdaForm, LetForm, Name, PrimAppForm, SetForm};
pub use context::{EvaluationContext, Outcome};
pub use environment::Environment;
pub use error::{EvaluationError, SyntaxError, VulcanError};
pub use interpreter::{Interpreter, MachineStats};
pub use parser::{parse, read_all, Atom, Sexp, MAX_NESTING};
pub use primitive::{PrimitiveResult, Primitives};
pub use value::{BoxCell, Closure, Value};
