#![no_main]

use core::fmt;

use itertools::Itertools;
use libfuzzer_sys::{arbitrary::Arbitrary, fuzz_target};

// Primitive names, a few of them wrong on purpose
#[derive(Arbitrary, Debug)]
enum VulcanPrimitive {
    Box, SetBox, Unbox,
    IsZero, IsEqual, IsLess, Not,
    Plus, Minus, Mult, Add1, Sub1,
    Void,

    Unknown(String),
}

impl fmt::Display for VulcanPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            VulcanPrimitive::Box => "box",
            VulcanPrimitive::SetBox => "set_box",
            VulcanPrimitive::Unbox => "unbox",
            VulcanPrimitive::IsZero => "is_zero",
            VulcanPrimitive::IsEqual => "is_equal",
            VulcanPrimitive::IsLess => "is_less",
            VulcanPrimitive::Not => "not",
            VulcanPrimitive::Plus => "plus",
            VulcanPrimitive::Minus => "minus",
            VulcanPrimitive::Mult => "mult",
            VulcanPrimitive::Add1 => "add1",
            VulcanPrimitive::Sub1 => "sub1",
            VulcanPrimitive::Void => "void",
            VulcanPrimitive::Unknown(name) => name,
        })
    }
}

#[derive(Arbitrary, Debug)]
enum VulcanVariable {
    A, B, C, X, Y,
}

impl fmt::Display for VulcanVariable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", match self {
            VulcanVariable::A => "a",
            VulcanVariable::B => "b",
            VulcanVariable::C => "c",
            VulcanVariable::X => "x",
            VulcanVariable::Y => "y",
        })
    }
}

// No applications, so every generated program terminates
#[derive(Arbitrary, Debug)]
enum VulcanExpr {
    Integer(i64),
    Boolean(bool),
    Undefined,
    Ref(VulcanVariable),

    Let(Vec<(VulcanVariable, VulcanExpr)>, Vec<VulcanExpr>),
    Letrec(Vec<(VulcanVariable, VulcanExpr)>, Vec<VulcanExpr>),
    Lambda(Vec<VulcanVariable>, Vec<VulcanExpr>),
    If(Box<VulcanExpr>, Box<VulcanExpr>, Box<VulcanExpr>),
    Set(VulcanVariable, Box<VulcanExpr>),
    Begin(Vec<VulcanExpr>),
    PrimApp(VulcanPrimitive, Vec<VulcanExpr>),
}

fn stringify_body(body: &[VulcanExpr]) -> String {
    body.iter()
        .map(VulcanExpr::to_string)
        .join(" ")
}

fn stringify_bindings(bindings: &[(VulcanVariable, VulcanExpr)]) -> String {
    bindings.iter()
        .map(|(name, init)| format!("[{} {}]", name, init))
        .join(" ")
}

impl fmt::Display for VulcanExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VulcanExpr::Integer(value) => write!(f, "(#%datum {})", value.unsigned_abs()),
            VulcanExpr::Boolean(value) => write!(f, "(#%datum {})", if *value { "#t" } else { "#f" }),
            VulcanExpr::Undefined => write!(f, "(#%datum #undefined)"),
            VulcanExpr::Ref(name) => write!(f, "{}", name),
            VulcanExpr::Let(bindings, body) =>
                write!(f, "(#%let ({}) {})", stringify_bindings(bindings), stringify_body(body)),
            VulcanExpr::Letrec(bindings, body) =>
                write!(f, "(#%letrec ({}) {})", stringify_bindings(bindings), stringify_body(body)),
            VulcanExpr::Lambda(params, body) =>
                write!(f, "(#%lambda ({}) {})", params.iter().join(" "), stringify_body(body)),
            VulcanExpr::If(test, conseq, alt) => write!(f, "(#%if {} {} {})", test, conseq, alt),
            VulcanExpr::Set(name, rhs) => write!(f, "(#%set! {} {})", name, rhs),
            VulcanExpr::Begin(body) => write!(f, "(#%begin {})", stringify_body(body)),
            VulcanExpr::PrimApp(name, rands) => write!(f, "(#%primapp {} {})", name, stringify_body(rands)),
        }
    }
}

fuzz_target!(|exprs: Vec<VulcanExpr>| {
    let mut context = vulcan::EvaluationContext::new();

    for expr in exprs {
        let _ = context.evaluate_str(&expr.to_string());
    }
});
