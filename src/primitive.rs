use core::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::{ast::Name, error::EvaluationError, value::{BoxCell, Value}};

pub type PrimitiveResult = Result<Value, EvaluationError>;

type PrimitiveFn = dyn Fn(&[Value]) -> PrimitiveResult;


#[derive(Clone)]
struct Primitive {
    arity: usize,
    function: Rc<PrimitiveFn>,
}

/// Named operations callable through `#%primapp`. Arguments reach the
/// function already evaluated and already checked against the declared arity.
#[derive(Clone)]
pub struct Primitives {
    table: IndexMap<Name, Primitive>,
}

impl fmt::Debug for Primitives {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.table.iter().map(|(name, primitive)| (name, primitive.arity)))
            .finish()
    }
}

fn expect_integer(name: &str, value: &Value) -> Result<i64, EvaluationError> {
    match value {
        Value::Integer(number) => Ok(*number),
        other => Err(EvaluationError::primitive(name, format!("expected an integer, got {} {}", other.type_name(), other))),
    }
}

fn expect_box<'v>(name: &str, value: &'v Value) -> Result<&'v BoxCell, EvaluationError> {
    match value {
        Value::Box(cell) => Ok(cell),
        other => Err(EvaluationError::primitive(name, format!("expected a box, got {} {}", other.type_name(), other))),
    }
}

fn builtin_arithmetic(name: &str, values: &[Value], f: impl Fn(i64, i64) -> Option<i64>) -> PrimitiveResult {
    let a = expect_integer(name, &values[0])?;
    let b = expect_integer(name, &values[1])?;
    f(a, b)
        .map(Value::Integer)
        .ok_or_else(|| EvaluationError::primitive(name, format!("integer overflow on {} and {}", a, b)))
}

fn builtin_box(values: &[Value]) -> PrimitiveResult {
    Ok(Value::Box(BoxCell::new(values[0].clone())))
}

fn builtin_set_box(values: &[Value]) -> PrimitiveResult {
    expect_box("set_box", &values[0])?.set(values[1].clone());
    Ok(Value::Unit)
}

fn builtin_unbox(values: &[Value]) -> PrimitiveResult {
    match expect_box("unbox", &values[0])?.get() {
        Value::Undefined => Err(EvaluationError::UndefinedValueAccess),
        value => Ok(value),
    }
}

fn builtin_is_zero(values: &[Value]) -> PrimitiveResult {
    Ok(Value::Boolean(expect_integer("is_zero", &values[0])? == 0))
}

fn builtin_is_equal(values: &[Value]) -> PrimitiveResult {
    Ok(Value::Boolean(values[0] == values[1]))
}

fn builtin_is_less(values: &[Value]) -> PrimitiveResult {
    Ok(Value::Boolean(expect_integer("is_less", &values[0])? < expect_integer("is_less", &values[1])?))
}

fn builtin_plus(values: &[Value]) -> PrimitiveResult {
    builtin_arithmetic("plus", values, i64::checked_add)
}

fn builtin_minus(values: &[Value]) -> PrimitiveResult {
    builtin_arithmetic("minus", values, i64::checked_sub)
}

fn builtin_mult(values: &[Value]) -> PrimitiveResult {
    builtin_arithmetic("mult", values, i64::checked_mul)
}

fn builtin_add1(values: &[Value]) -> PrimitiveResult {
    let number = expect_integer("add1", &values[0])?;
    number.checked_add(1)
        .map(Value::Integer)
        .ok_or_else(|| EvaluationError::primitive("add1", "integer overflow"))
}

fn builtin_sub1(values: &[Value]) -> PrimitiveResult {
    let number = expect_integer("sub1", &values[0])?;
    number.checked_sub(1)
        .map(Value::Integer)
        .ok_or_else(|| EvaluationError::primitive("sub1", "integer overflow"))
}

fn builtin_not(values: &[Value]) -> PrimitiveResult {
    Ok(Value::Boolean(!values[0].is_truthy()))
}

fn builtin_void(_values: &[Value]) -> PrimitiveResult {
    Ok(Value::Unit)
}

impl Primitives {
    /// A table with no entries; every `#%primapp` against it fails.
    pub fn empty() -> Self {
        Self { table: IndexMap::new() }
    }

    /// Adds or replaces the primitive called `name`.
    pub fn register(
        &mut self,
        name: &str,
        arity: usize,
        function: impl Fn(&[Value]) -> PrimitiveResult + 'static,
    ) -> &mut Self {
        self.table.insert(Name::from(name), Primitive { arity, function: Rc::new(function) });
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    pub fn arity(&self, name: &str) -> Option<usize> {
        self.table.get(name).map(|primitive| primitive.arity)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(|name| &**name)
    }

    pub fn apply(&self, name: &str, values: &[Value]) -> PrimitiveResult {
        let primitive = self.table.get(name)
            .ok_or_else(|| EvaluationError::UnknownPrimitive(name.to_owned()))?;

        if values.len() != primitive.arity {
            return Err(EvaluationError::Arity { expected: primitive.arity, actual: values.len() });
        }

        (primitive.function)(values)
    }
}

impl Default for Primitives {
    fn default() -> Self {
        let builtins: [(&str, usize, fn(&[Value]) -> PrimitiveResult); 13] = [
            ("box", 1, builtin_box),
            ("set_box", 2, builtin_set_box),
            ("unbox", 1, builtin_unbox),

            ("is_zero", 1, builtin_is_zero),
            ("is_equal", 2, builtin_is_equal),
            ("is_less", 2, builtin_is_less),
            ("not", 1, builtin_not),

            ("plus", 2, builtin_plus),
            ("minus", 2, builtin_minus),
            ("mult", 2, builtin_mult),
            ("add1", 1, builtin_add1),
            ("sub1", 1, builtin_sub1),

            ("void", 0, builtin_void),
        ];

        let mut primitives = Self::empty();
        for (name, arity, function) in builtins {
            primitives.register(name, arity, function);
        }
        primitives
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(number: i64) -> Value {
        Value::Integer(number)
    }

    #[test]
    fn arithmetic_is_checked() -> anyhow::Result<()> {
        let primitives = Primitives::default();

        assert_eq!(primitives.apply("plus", &[int(3), int(4)])?, Value::Integer(7));
        assert_eq!(primitives.apply("minus", &[int(3), int(4)])?, Value::Integer(-1));
        assert_eq!(primitives.apply("mult", &[int(6), int(7)])?, Value::Integer(42));
        assert_eq!(primitives.apply("add1", &[int(41)])?, Value::Integer(42));
        assert_eq!(primitives.apply("sub1", &[int(0)])?, Value::Integer(-1));
        assert!(matches!(
            primitives.apply("plus", &[int(i64::MAX), int(1)]),
            Err(EvaluationError::Primitive { .. })
        ));
        assert!(matches!(
            primitives.apply("sub1", &[int(i64::MIN)]),
            Err(EvaluationError::Primitive { .. })
        ));
        Ok(())
    }

    #[test]
    fn predicates() -> anyhow::Result<()> {
        let primitives = Primitives::default();

        assert_eq!(primitives.apply("is_zero", &[int(0)])?, Value::Boolean(true));
        assert_eq!(primitives.apply("is_equal", &[Value::Boolean(true), Value::Boolean(true)])?, Value::Boolean(true));
        assert_eq!(primitives.apply("is_equal", &[int(1), Value::Boolean(true)])?, Value::Boolean(false));
        assert_eq!(primitives.apply("is_less", &[int(1), int(2)])?, Value::Boolean(true));
        assert_eq!(primitives.apply("not", &[Value::Boolean(false)])?, Value::Boolean(true));
        assert_eq!(primitives.apply("not", &[int(0)])?, Value::Boolean(false));
        Ok(())
    }

    #[test]
    fn boxes_hold_and_update_values() -> anyhow::Result<()> {
        let primitives = Primitives::default();
        let cell = primitives.apply("box", &[int(1)])?;

        assert_eq!(primitives.apply("set_box", &[cell.clone(), int(2)])?, Value::Unit);
        assert_eq!(primitives.apply("unbox", &[cell])?, Value::Integer(2));
        Ok(())
    }

    #[test]
    fn unboxing_undefined_fails() -> anyhow::Result<()> {
        let primitives = Primitives::default();
        let cell = primitives.apply("box", &[Value::Undefined])?;

        assert_eq!(primitives.apply("unbox", &[cell]), Err(EvaluationError::UndefinedValueAccess));
        Ok(())
    }

    #[test]
    fn dispatch_errors() {
        let primitives = Primitives::default();

        assert_eq!(primitives.apply("frobnicate", &[]), Err(EvaluationError::UnknownPrimitive("frobnicate".to_owned())));
        assert_eq!(primitives.apply("plus", &[int(1)]), Err(EvaluationError::Arity { expected: 2, actual: 1 }));
        assert!(matches!(primitives.apply("unbox", &[int(1)]), Err(EvaluationError::Primitive { .. })));
        assert!(matches!(primitives.apply("is_zero", &[Value::Boolean(true)]), Err(EvaluationError::Primitive { .. })));
    }

    #[test]
    fn the_table_is_extensible() -> anyhow::Result<()> {
        let mut primitives = Primitives::default();
        primitives.register("double", 1, |values| {
            expect_integer("double", &values[0]).map(|n| Value::Integer(n * 2))
        });

        assert_eq!(primitives.apply("double", &[int(21)])?, Value::Integer(42));
        assert_eq!(primitives.arity("double"), Some(1));
        assert!(primitives.names().any(|name| name == "void"));
        Ok(())
    }
}
