use std::rc::Rc;

use crate::{
    ast::{AppForm, Expr, IfForm, LetForm, PrimAppForm, SetForm},
    environment::Environment,
    interpreter::{Machine, MachineResult, State},
    value::Value,
};


/// One reified "what to do with the next value" frame of the machine's stack.
///
/// Every frame carries the environment that was active when it was pushed;
/// the machine reinstates it before resuming the frame.
pub(crate) enum Continuation {
    Halt { env: Environment },
    If { env: Environment, form: Rc<IfForm> },
    Set { env: Environment, form: Rc<SetForm> },
    /// `values` holds the initializers evaluated so far, in order.
    Let { env: Environment, values: Vec<Value>, form: Rc<LetForm> },
    /// `env` is the frame pre-bound to undefined, later patched in place.
    Letrec { env: Environment, values: Vec<Value>, form: Rc<LetForm> },
    /// `index` is the next expression of `body` to evaluate.
    Sequence { env: Environment, body: Rc<[Expr]>, index: usize },
    PrimApp { env: Environment, values: Vec<Value>, form: Rc<PrimAppForm> },
    Operator { env: Environment, form: Rc<AppForm> },
    Operand { env: Environment, operator: Value, values: Vec<Value>, form: Rc<AppForm> },
}

impl Continuation {
    pub(crate) fn env(&self) -> &Environment {
        match self {
            Self::Halt { env }
            | Self::If { env, .. }
            | Self::Set { env, .. }
            | Self::Let { env, .. }
            | Self::Letrec { env, .. }
            | Self::Sequence { env, .. }
            | Self::PrimApp { env, .. }
            | Self::Operator { env, .. }
            | Self::Operand { env, .. } => env,
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::Halt { .. } => "halt",
            Self::If { .. } => "if",
            Self::Set { .. } => "set!",
            Self::Let { .. } => "let",
            Self::Letrec { .. } => "letrec",
            Self::Sequence { .. } => "seq",
            Self::PrimApp { .. } => "primapp",
            Self::Operator { .. } => "operator",
            Self::Operand { .. } => "operand",
        }
    }

    /// Consumes the frame with the value just produced and decides the next
    /// machine state. The machine's environment has already been reset to
    /// `self.env()`.
    pub(crate) fn resume(self, machine: &mut Machine, value: Value) -> MachineResult<State> {
        match self {
            Self::Halt { .. } => Ok(State::Halted(value)),

            Self::If { form, .. } => {
                let branch = if value.is_truthy() { &form.conseq } else { &form.alt };
                Ok(State::Evaluating(branch.clone()))
            }

            Self::Set { env, form } => {
                env.assign(&form.name, value)?;
                Ok(State::Returning(Value::Unit))
            }

            Self::Sequence { env, body, index } => {
                let next = body[index].clone();
                if index + 1 < body.len() {
                    machine.push(Self::Sequence { env, body, index: index + 1 });
                }
                Ok(State::Evaluating(next))
            }

            Self::Let { env, mut values, form } => {
                values.push(value);
                if values.len() == form.inits.len() {
                    machine.set_env(env.extend(&form.vars, values)?);
                    return Ok(State::Evaluating(form.body.clone()));
                }

                let next = form.inits[values.len()].clone();
                machine.push(Self::Let { env, values, form });
                Ok(State::Evaluating(next))
            }

            Self::Letrec { env, mut values, form } => {
                values.push(value);
                if values.len() == form.inits.len() {
                    // Patch the cells every initializer already closed over
                    for (name, value) in form.vars.iter().zip(values) {
                        env.assign(name, value)?;
                    }
                    return Ok(State::Evaluating(form.body.clone()));
                }

                let next = form.inits[values.len()].clone();
                machine.push(Self::Letrec { env, values, form });
                Ok(State::Evaluating(next))
            }

            Self::PrimApp { env, mut values, form } => {
                values.push(value);
                if values.len() == form.rands.len() {
                    return machine.apply_primitive(&form.name, &values);
                }

                let next = form.rands[values.len()].clone();
                machine.push(Self::PrimApp { env, values, form });
                Ok(State::Evaluating(next))
            }

            Self::Operator { env, form } => {
                let Some(first) = form.rands.first().cloned() else {
                    return machine.apply_procedure(value, Vec::new());
                };

                let values = Vec::with_capacity(form.rands.len());
                machine.push(Self::Operand { env, operator: value, values, form });
                Ok(State::Evaluating(first))
            }

            Self::Operand { env, operator, mut values, form } => {
                values.push(value);
                if values.len() == form.rands.len() {
                    // Nothing is pushed here, so a call in tail position reuses the caller's stack
                    return machine.apply_procedure(operator, values);
                }

                let next = form.rands[values.len()].clone();
                machine.push(Self::Operand { env, operator, values, form });
                Ok(State::Evaluating(next))
            }
        }
    }
}
