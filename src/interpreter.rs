use std::rc::Rc;

use log::{debug, trace};
use serde::Serialize;

use crate::{
    ast::Expr,
    continuation::Continuation,
    environment::Environment,
    error::EvaluationError,
    primitive::Primitives,
    value::{Closure, Value},
};

pub(crate) type MachineResult<T> = Result<T, EvaluationError>;


/// The single active instruction of the machine.
pub(crate) enum State {
    Evaluating(Expr),
    Returning(Value),
    Halted(Value),
}

impl State {
    fn describe(&self) -> String {
        match self {
            Self::Evaluating(expr) => format!("evaluating {}", expr.kind()),
            Self::Returning(value) => format!("returning {}", value),
            Self::Halted(value) => format!("halted with {}", value),
        }
    }
}

/// Counters collected while running one program.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MachineStats {
    /// Number of state transitions taken.
    pub steps: u64,
    /// Highest number of continuation frames on the stack at any point.
    pub peak_depth: usize,
}

/// Control, environment and continuation stack of one evaluation.
pub(crate) struct Machine<'p> {
    primitives: &'p Primitives,
    env: Environment,
    stack: Vec<Continuation>,
    stats: MachineStats,
}

impl<'p> Machine<'p> {
    fn new(primitives: &'p Primitives) -> Self {
        let env = Environment::empty();
        let mut machine = Self {
            primitives,
            env: env.clone(),
            stack: Vec::new(),
            stats: MachineStats::default(),
        };
        machine.push(Continuation::Halt { env });
        machine
    }

    pub(crate) fn push(&mut self, continuation: Continuation) {
        self.stack.push(continuation);
        self.stats.peak_depth = self.stats.peak_depth.max(self.stack.len());
    }

    pub(crate) fn set_env(&mut self, env: Environment) {
        self.env = env;
    }

    /// Enters the body of a closure. The callee's body runs on top of
    /// whatever is already on the stack.
    pub(crate) fn apply_procedure(&mut self, operator: Value, values: Vec<Value>) -> MachineResult<State> {
        let closure = match operator {
            Value::Closure(closure) => closure,
            other => return Err(EvaluationError::NotAProcedure(format!("{} {}", other.type_name(), other))),
        };

        if values.len() != closure.arity() {
            return Err(EvaluationError::Arity { expected: closure.arity(), actual: values.len() });
        }

        self.env = closure.env.extend(&closure.lambda.params, values)?;
        Ok(State::Evaluating(closure.lambda.body.clone()))
    }

    pub(crate) fn apply_primitive(&mut self, name: &str, values: &[Value]) -> MachineResult<State> {
        self.primitives.apply(name, values).map(State::Returning)
    }

    fn visit(&mut self, expr: Expr) -> MachineResult<State> {
        let env = self.env.clone();

        match expr {
            Expr::Datum(datum) => Ok(State::Returning(datum.into())),

            Expr::Ref(name) => Ok(State::Returning(self.env.lookup(&name)?)),

            Expr::Lambda(lambda) => Ok(State::Returning(Value::Closure(Rc::new(Closure { env, lambda })))),

            Expr::If(form) => {
                let test = form.test.clone();
                self.push(Continuation::If { env, form });
                Ok(State::Evaluating(test))
            }

            Expr::Set(form) => {
                let rhs = form.rhs.clone();
                self.push(Continuation::Set { env, form });
                Ok(State::Evaluating(rhs))
            }

            Expr::Seq(body) => {
                let first = body.first().cloned()
                    .ok_or_else(|| EvaluationError::MalformedProgram("empty sequence".to_owned()))?;
                if body.len() > 1 {
                    self.push(Continuation::Sequence { env, body, index: 1 });
                }
                Ok(State::Evaluating(first))
            }

            Expr::Let(form) => {
                if form.vars.len() != form.inits.len() {
                    return Err(EvaluationError::MalformedProgram("let binds names and initializers of different lengths".to_owned()));
                }
                let Some(first) = form.inits.first().cloned() else {
                    return Ok(State::Evaluating(form.body.clone()));
                };

                let values = Vec::with_capacity(form.inits.len());
                self.push(Continuation::Let { env, values, form });
                Ok(State::Evaluating(first))
            }

            Expr::Letrec(form) => {
                if form.vars.len() != form.inits.len() {
                    return Err(EvaluationError::MalformedProgram("letrec binds names and initializers of different lengths".to_owned()));
                }
                let first = form.inits.first().cloned()
                    .ok_or_else(|| EvaluationError::MalformedProgram("letrec without bindings".to_owned()))?;

                // Every name is visible, as undefined, to every initializer
                self.env = env.extend(&form.vars, vec![Value::Undefined; form.vars.len()])?;
                let values = Vec::with_capacity(form.inits.len());
                self.push(Continuation::Letrec { env: self.env.clone(), values, form });
                Ok(State::Evaluating(first))
            }

            Expr::PrimApp(form) => {
                let Some(first) = form.rands.first().cloned() else {
                    return self.apply_primitive(&form.name, &[]);
                };

                let values = Vec::with_capacity(form.rands.len());
                self.push(Continuation::PrimApp { env, values, form });
                Ok(State::Evaluating(first))
            }

            Expr::App(form) => {
                let rator = form.rator.clone();
                self.push(Continuation::Operator { env, form });
                Ok(State::Evaluating(rator))
            }
        }
    }

    fn ret(&mut self, value: Value) -> MachineResult<State> {
        let continuation = self.stack.pop()
            .ok_or_else(|| EvaluationError::MalformedProgram("continuation stack exhausted before halting".to_owned()))?;

        trace!("resuming {} frame with {}", continuation.kind(), value);
        self.env = continuation.env().clone();
        continuation.resume(self, value)
    }

    fn step(&mut self, state: State) -> MachineResult<State> {
        self.stats.steps += 1;
        trace!(
            "step {} at depth {}, {} frame(s) in scope: {}",
            self.stats.steps, self.stack.len(), self.env.depth(), state.describe()
        );

        match state {
            State::Evaluating(expr) => self.visit(expr),
            State::Returning(value) => self.ret(value),
            halted @ State::Halted(_) => Ok(halted),
        }
    }

    fn run(&mut self, expr: Expr) -> MachineResult<Value> {
        let mut state = State::Evaluating(expr);
        loop {
            state = match state {
                State::Halted(value) => return Ok(value),
                running => self.step(running)?,
            };
        }
    }
}

/// Evaluates expression trees on an explicit continuation stack, so neither
/// deep nesting of non-tail calls nor long chains of tail calls consume
/// native stack.
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    primitives: Primitives,
    last_run: MachineStats,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_primitives(primitives: Primitives) -> Self {
        Self { primitives, last_run: MachineStats::default() }
    }

    pub fn primitives(&self) -> &Primitives {
        &self.primitives
    }

    pub fn primitives_mut(&mut self) -> &mut Primitives {
        &mut self.primitives
    }

    /// Statistics of the most recent call to [`Interpreter::evaluate`], whether it succeeded or not.
    pub fn last_run(&self) -> MachineStats {
        self.last_run
    }

    /// Runs `expr` to completion, starting from the empty environment.
    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, EvaluationError> {
        debug!("evaluating {} expression", expr.kind());

        let mut machine = Machine::new(&self.primitives);
        let result = machine.run(expr.clone());
        self.last_run = machine.stats;

        match &result {
            Ok(value) => debug!("halted with {} after {} steps, peak depth {}", value, self.last_run.steps, self.last_run.peak_depth),
            Err(error) => debug!("aborted after {} steps: {}", self.last_run.steps, error),
        }
        result
    }
}
