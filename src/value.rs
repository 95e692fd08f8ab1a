use core::{cell::RefCell, fmt};
use std::rc::Rc;

use itertools::Itertools;
use serde::{Serialize, Serializer};

use crate::{ast::{Datum, LambdaForm}, environment::Environment};


/// A procedure value: a lambda paired with the frame it was created in.
pub struct Closure {
    pub(crate) env: Environment,
    pub(crate) lambda: Rc<LambdaForm>,
}

impl Closure {
    pub fn arity(&self) -> usize {
        self.lambda.params.len()
    }
}

/// A single mutable cell, created and accessed only through primitives.
#[derive(Clone)]
pub struct BoxCell(Rc<RefCell<Value>>);

impl BoxCell {
    pub fn new(value: Value) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn get(&self) -> Value {
        self.0.borrow().clone()
    }

    pub fn set(&self, value: Value) {
        // The old contents are dropped after the borrow ends
        drop(self.0.replace(value));
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Drop for BoxCell {
    fn drop(&mut self) {
        if Rc::strong_count(&self.0) == 1 {
            let mut pending = Vec::new();
            defer(&mut pending, Garbage::Value(self.0.replace(Value::Unit)));
            release(pending);
        }
    }
}

#[derive(Clone)]
pub enum Value {
    Integer(i64),
    Boolean(bool),
    /// Placeholder held by `letrec` names before their initializer has run.
    Undefined,
    Unit,
    Box(BoxCell),
    Closure(Rc<Closure>),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Boolean(_) => "boolean",
            Self::Undefined => "undefined",
            Self::Unit => "unit",
            Self::Box(_) => "box",
            Self::Closure(_) => "procedure",
        }
    }

    /// Only the literal `#f` is false.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Self::Boolean(false))
    }
}

/// Something whose last owner is going away.
///
/// Boxes, closures and frames can nest arbitrarily deep (a tail loop that wraps
/// its accumulator in a fresh box every iteration builds such a chain), so their
/// contents are moved onto a worklist instead of being dropped recursively.
pub(crate) enum Garbage {
    Value(Value),
    Frame(Environment),
}

impl Garbage {
    fn is_last_owner(&self) -> bool {
        match self {
            Self::Value(Value::Box(cell)) => Rc::strong_count(&cell.0) == 1,
            Self::Value(Value::Closure(closure)) => Rc::strong_count(closure) == 1,
            Self::Value(_) => false,
            Self::Frame(env) => env.is_last_owner(),
        }
    }
}

/// Queues `garbage` if dropping it would free nested values; anything else is dropped on the spot.
pub(crate) fn defer(pending: &mut Vec<Garbage>, garbage: Garbage) {
    if garbage.is_last_owner() {
        pending.push(garbage);
    }
}

pub(crate) fn release(mut pending: Vec<Garbage>) {
    while let Some(garbage) = pending.pop() {
        match garbage {
            Garbage::Value(Value::Box(cell)) => {
                let contents = cell.0.replace(Value::Unit);
                defer(&mut pending, Garbage::Value(contents));
            }
            Garbage::Value(Value::Closure(closure)) => {
                if let Some(closure) = Rc::into_inner(closure) {
                    defer(&mut pending, Garbage::Frame(closure.env));
                }
            }
            Garbage::Value(_) => {}
            Garbage::Frame(env) => env.unlink(&mut pending),
        }
    }
}

impl From<Datum> for Value {
    fn from(datum: Datum) -> Self {
        match datum {
            Datum::Integer(value) => Self::Integer(value),
            Datum::Boolean(value) => Self::Boolean(value),
            Datum::Undefined => Self::Undefined,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

// Boxes and closures compare by identity
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::Undefined, Self::Undefined) => true,
            (Self::Unit, Self::Unit) => true,
            (Self::Box(a), Self::Box(b)) => a.ptr_eq(b),
            (Self::Closure(a), Self::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(value) => write!(f, "{}", value),
            Self::Boolean(true) => write!(f, "#t"),
            Self::Boolean(false) => write!(f, "#f"),
            Self::Undefined => write!(f, "#undefined"),
            Self::Unit => write!(f, "#<void>"),
            Self::Box(_) => write!(f, "#<box>"),
            Self::Closure(closure) => write!(f, "#<procedure ({})>", closure.lambda.params.iter().join(" ")),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (self as &dyn fmt::Display).fmt(f)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Integer(value) => serializer.serialize_i64(*value),
            Self::Boolean(value) => serializer.serialize_bool(*value),
            other => serializer.collect_str(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::Expr;

    use super::*;

    fn closure(params: &[&str]) -> Value {
        let Expr::Lambda(lambda) = Expr::lambda(params.iter().copied(), Expr::datum(0i64)) else { unreachable!() };
        Value::Closure(Rc::new(Closure { env: Environment::empty(), lambda }))
    }

    #[test]
    fn only_false_is_falsy() {
        assert!(!Value::Boolean(false).is_truthy());
        for value in [Value::Boolean(true), Value::Integer(0), Value::Unit, Value::Undefined, closure(&[])] {
            assert!(value.is_truthy(), "{} should be truthy", value);
        }
    }

    #[test]
    fn boxes_and_closures_compare_by_identity() {
        let cell = BoxCell::new(Value::Integer(1));
        assert_eq!(Value::Box(cell.clone()), Value::Box(cell.clone()));
        assert_ne!(Value::Box(cell), Value::Box(BoxCell::new(Value::Integer(1))));

        let f = closure(&["x"]);
        assert_eq!(f, f.clone());
        assert_ne!(f, closure(&["x"]));
    }

    #[test]
    fn box_contents_are_shared_between_clones() {
        let cell = BoxCell::new(Value::Undefined);
        cell.clone().set(Value::Integer(5));
        assert_eq!(cell.get(), Value::Integer(5));
    }

    #[test]
    fn display_and_json() -> anyhow::Result<()> {
        assert_eq!(closure(&["a", "b"]).to_string(), "#<procedure (a b)>");
        assert_eq!(serde_json::to_string(&Value::Integer(-3))?, "-3");
        assert_eq!(serde_json::to_string(&Value::Boolean(true))?, "true");
        assert_eq!(serde_json::to_string(&Value::Unit)?, "\"#<void>\"");
        Ok(())
    }
}
