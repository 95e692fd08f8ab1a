use log::debug;
use serde::{ser::SerializeMap, Serialize, Serializer};

use crate::{
    ast::build_program,
    error::VulcanError,
    interpreter::{Interpreter, MachineStats},
    parser::{parse, Sexp},
    primitive::Primitives,
    value::Value,
};


/// Evaluates programs given as source text or as already-read S-expressions.
///
/// Every program starts from the empty environment. Boxes and closures
/// returned by one program may still be handed to the embedder, but nothing
/// a program binds is visible to the next one.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    interpreter: Interpreter,
}

impl EvaluationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primitives(primitives: Primitives) -> Self {
        Self { interpreter: Interpreter::with_primitives(primitives) }
    }

    pub fn interpreter(&self) -> &Interpreter {
        &self.interpreter
    }

    pub fn last_run(&self) -> MachineStats {
        self.interpreter.last_run()
    }

    pub fn evaluate_str(&mut self, input: &str) -> Result<Value, VulcanError> {
        let program = parse(input)?;
        debug!("parsed {} program from {} bytes of source", program.kind(), input.len());

        Ok(self.interpreter.evaluate(&program)?)
    }

    pub fn evaluate_sexps(&mut self, sexps: &[Sexp]) -> Result<Value, VulcanError> {
        let program = build_program(sexps)?;
        Ok(self.interpreter.evaluate(&program)?)
    }
}

/// Serializable result of running one program:
/// `{"ok": true, "output": ...}` or `{"ok": false, "type": ..., "message": ...}`.
#[derive(Debug)]
pub struct Outcome(pub Result<Value, VulcanError>);

impl From<Result<Value, VulcanError>> for Outcome {
    fn from(result: Result<Value, VulcanError>) -> Self {
        Self(result)
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match &self.0 {
            Ok(value) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ok", &true)?;
                map.serialize_entry("output", value)?;
                map.end()
            }
            Err(error) => {
                let mut map = serializer.serialize_map(Some(3))?;
                map.serialize_entry("ok", &false)?;
                map.serialize_entry("type", error.kind())?;
                map.serialize_entry("message", &error.to_string())?;
                map.end()
            }
        }
    }
}
