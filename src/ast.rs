use std::rc::Rc;

use itertools::Itertools;

use crate::{error::SyntaxError, parser::{Atom, Sexp}};


pub type Name = Rc<str>;

type BuildResult<O> = Result<O, SyntaxError>;

/// Literal data that may appear in a `#%datum` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Datum {
    Integer(i64),
    Boolean(bool),
    Undefined,
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

/// Shared shape of `let` and `letrec`.
#[derive(Debug)]
pub struct LetForm {
    pub vars: Vec<Name>,
    pub inits: Vec<Expr>,
    pub body: Expr,
}

#[derive(Debug)]
pub struct IfForm {
    pub test: Expr,
    pub conseq: Expr,
    pub alt: Expr,
}

#[derive(Debug)]
pub struct LambdaForm {
    pub params: Vec<Name>,
    pub body: Expr,
}

#[derive(Debug)]
pub struct AppForm {
    pub rator: Expr,
    pub rands: Vec<Expr>,
}

#[derive(Debug)]
pub struct PrimAppForm {
    pub name: Name,
    pub rands: Vec<Expr>,
}

#[derive(Debug)]
pub struct SetForm {
    pub name: Name,
    pub rhs: Expr,
}

/// A node of the core language. Cloning is cheap: every compound node is
/// reference counted, so closures and pending continuations share the tree
/// instead of copying it.
#[derive(Debug, Clone)]
pub enum Expr {
    Let(Rc<LetForm>),
    Letrec(Rc<LetForm>),
    Seq(Rc<[Expr]>),
    Ref(Name),
    Datum(Datum),
    If(Rc<IfForm>),
    Lambda(Rc<LambdaForm>),
    App(Rc<AppForm>),
    PrimApp(Rc<PrimAppForm>),
    Set(Rc<SetForm>),
}

fn split_bindings<'n>(bindings: impl IntoIterator<Item = (&'n str, Expr)>) -> (Vec<Name>, Vec<Expr>) {
    bindings.into_iter()
        .map(|(name, init)| (Name::from(name), init))
        .unzip()
}

impl Expr {
    pub fn datum(value: impl Into<Datum>) -> Self {
        Self::Datum(value.into())
    }

    pub fn reference(name: &str) -> Self {
        Self::Ref(Name::from(name))
    }

    pub fn let_<'n>(bindings: impl IntoIterator<Item = (&'n str, Expr)>, body: Expr) -> Self {
        let (vars, inits) = split_bindings(bindings);
        Self::Let(Rc::new(LetForm { vars, inits, body }))
    }

    pub fn letrec<'n>(bindings: impl IntoIterator<Item = (&'n str, Expr)>, body: Expr) -> Self {
        let (vars, inits) = split_bindings(bindings);
        Self::Letrec(Rc::new(LetForm { vars, inits, body }))
    }

    pub fn seq(exprs: impl IntoIterator<Item = Expr>) -> Self {
        Self::Seq(exprs.into_iter().collect())
    }

    pub fn if_(test: Expr, conseq: Expr, alt: Expr) -> Self {
        Self::If(Rc::new(IfForm { test, conseq, alt }))
    }

    pub fn lambda<'n>(params: impl IntoIterator<Item = &'n str>, body: Expr) -> Self {
        let params = params.into_iter().map(Name::from).collect();
        Self::Lambda(Rc::new(LambdaForm { params, body }))
    }

    pub fn app(rator: Expr, rands: impl IntoIterator<Item = Expr>) -> Self {
        Self::App(Rc::new(AppForm { rator, rands: rands.into_iter().collect() }))
    }

    pub fn primapp(name: &str, rands: impl IntoIterator<Item = Expr>) -> Self {
        Self::PrimApp(Rc::new(PrimAppForm { name: Name::from(name), rands: rands.into_iter().collect() }))
    }

    pub fn set(name: &str, rhs: Expr) -> Self {
        Self::Set(Rc::new(SetForm { name: Name::from(name), rhs }))
    }

    /// Short label of the node kind, used in machine traces.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Let(_) => "let",
            Self::Letrec(_) => "letrec",
            Self::Seq(_) => "seq",
            Self::Ref(_) => "ref",
            Self::Datum(_) => "datum",
            Self::If(_) => "if",
            Self::Lambda(_) => "lambda",
            Self::App(_) => "app",
            Self::PrimApp(_) => "primapp",
            Self::Set(_) => "set!",
        }
    }
}

fn expect_symbol<'a>(form: &'static str, sexp: &Sexp<'a>) -> BuildResult<&'a str> {
    match sexp {
        Sexp::Atom(Atom::Symbol(symbol)) => Ok(*symbol),
        other => Err(SyntaxError::invalid(form, format!("expected an identifier, got `{}`", other))),
    }
}

fn expect_unique(form: &'static str, names: &[Name]) -> BuildResult<()> {
    if !names.iter().all_unique() {
        return Err(SyntaxError::invalid(form, format!("duplicate name in ({})", names.iter().join(" "))));
    }
    Ok(())
}

fn build_datum(list: &[Sexp]) -> BuildResult<Expr> {
    // A datum wraps exactly one literal atom; symbols are references, not data
    let [sexp] = list else {
        return Err(SyntaxError::invalid("#%datum", format!("expected one literal, got {}", list.len())));
    };

    let datum = match sexp {
        Sexp::Atom(Atom::Integer(value)) => Datum::Integer(*value),
        Sexp::Atom(Atom::Boolean(value)) => Datum::Boolean(*value),
        Sexp::Atom(Atom::Undefined) => Datum::Undefined,
        other => return Err(SyntaxError::invalid("#%datum", format!("`{}` is not literal data", other))),
    };
    Ok(Expr::Datum(datum))
}

fn build_binding(form: &'static str, sexp: &Sexp) -> BuildResult<(Name, Expr)> {
    // Each binding is a two element list: the name and its initializer
    match sexp {
        Sexp::List(pair) if pair.len() == 2 => {
            let name = expect_symbol(form, &pair[0])?;
            Ok((Name::from(name), build(&pair[1])?))
        }
        other => Err(SyntaxError::invalid(form, format!("expected a [name expr] binding, got `{}`", other))),
    }
}

fn build_let_form(form: &'static str, list: &[Sexp]) -> BuildResult<LetForm> {
    let Some((Sexp::List(bindings), body)) = list.split_first() else {
        return Err(SyntaxError::invalid(form, "expected a binding list"));
    };

    let (vars, inits): (Vec<_>, Vec<_>) = bindings.iter()
        .map(|binding| build_binding(form, binding))
        .collect::<BuildResult<Vec<_>>>()?
        .into_iter()
        .unzip();
    expect_unique(form, &vars)?;

    Ok(LetForm { vars, inits, body: build_body(form, body)? })
}

fn build_letrec(list: &[Sexp]) -> BuildResult<Expr> {
    let form = build_let_form("#%letrec", list)?;
    if form.vars.is_empty() {
        return Err(SyntaxError::invalid("#%letrec", "expected at least one binding"));
    }
    Ok(Expr::Letrec(Rc::new(form)))
}

fn build_lambda(list: &[Sexp]) -> BuildResult<Expr> {
    let Some((Sexp::List(params), body)) = list.split_first() else {
        return Err(SyntaxError::invalid("#%lambda", "expected a parameter list"));
    };

    let params = params.iter()
        .map(|param| expect_symbol("#%lambda", param).map(Name::from))
        .collect::<BuildResult<Vec<_>>>()?;
    expect_unique("#%lambda", &params)?;

    Ok(Expr::Lambda(Rc::new(LambdaForm { params, body: build_body("#%lambda", body)? })))
}

fn build_if(list: &[Sexp]) -> BuildResult<Expr> {
    let [test, conseq, alt] = list else {
        return Err(SyntaxError::invalid("#%if", format!("expected test, consequent and alternative, got {} part(s)", list.len())));
    };
    Ok(Expr::if_(build(test)?, build(conseq)?, build(alt)?))
}

fn build_set(list: &[Sexp]) -> BuildResult<Expr> {
    let [name, rhs] = list else {
        return Err(SyntaxError::invalid("#%set!", format!("expected a name and a value, got {} part(s)", list.len())));
    };
    Ok(Expr::set(expect_symbol("#%set!", name)?, build(rhs)?))
}

fn build_app(list: &[Sexp]) -> BuildResult<Expr> {
    let Some((rator, rands)) = list.split_first() else {
        return Err(SyntaxError::invalid("#%app", "expected an operator"));
    };
    Ok(Expr::app(build(rator)?, build_list(rands)?))
}

fn build_primapp(list: &[Sexp]) -> BuildResult<Expr> {
    let Some((name, rands)) = list.split_first() else {
        return Err(SyntaxError::invalid("#%primapp", "expected a primitive name"));
    };
    Ok(Expr::primapp(expect_symbol("#%primapp", name)?, build_list(rands)?))
}

fn build_list(list: &[Sexp]) -> BuildResult<Vec<Expr>> {
    list.iter().map(build).collect()
}

fn build_body(form: &'static str, list: &[Sexp]) -> BuildResult<Expr> {
    match list {
        [] => Err(SyntaxError::invalid(form, "expected at least one body expression")),
        [single] => build(single),
        many => Ok(Expr::Seq(build_list(many)?.into())),
    }
}

fn build(sexp: &Sexp) -> BuildResult<Expr> {
    let list = match sexp {
        Sexp::Atom(Atom::Symbol(name)) => return Ok(Expr::reference(name)),
        Sexp::Atom(atom) => return Err(SyntaxError::invalid("expression", format!("bare literal `{}` must be wrapped in #%datum", atom))),
        Sexp::List(list) => list,
    };

    let Some((Sexp::Atom(Atom::Symbol(tag)), rest)) = list.split_first() else {
        return Err(SyntaxError::invalid("expression", format!("`{}` does not start with a form keyword", sexp)));
    };

    match *tag {
        "#%datum" => build_datum(rest),
        "#%let" => Ok(Expr::Let(Rc::new(build_let_form("#%let", rest)?))),
        "#%letrec" => build_letrec(rest),
        "#%lambda" => build_lambda(rest),
        "#%if" => build_if(rest),
        "#%set!" => build_set(rest),
        "#%begin" => build_body("#%begin", rest),
        "#%app" => build_app(rest),
        "#%primapp" | "#%prim" => build_primapp(rest),
        other => Err(SyntaxError::invalid("expression", format!("unknown form `{}`", other))),
    }
}

/// Builds a program from its top-level forms.
pub(crate) fn build_program(sexps: &[Sexp]) -> BuildResult<Expr> {
    if sexps.is_empty() { return Err(SyntaxError::EmptyProgram); }
    build_body("program", sexps)
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    use super::*;

    #[test]
    fn builds_let_with_sequenced_body() -> anyhow::Result<()> {
        let expr = parse("(#%let ([x (#%datum 1)] [y (#%datum #t)]) x y)")?;

        let Expr::Let(form) = expr else { anyhow::bail!("expected a let") };
        assert_eq!(form.vars, vec![Name::from("x"), Name::from("y")]);
        assert!(matches!(form.inits[..], [Expr::Datum(Datum::Integer(1)), Expr::Datum(Datum::Boolean(true))]));
        assert!(matches!(&form.body, Expr::Seq(body) if body.len() == 2));
        Ok(())
    }

    #[test]
    fn several_top_level_forms_become_a_sequence() -> anyhow::Result<()> {
        assert!(matches!(parse("(#%datum 1) (#%datum 2)")?, Expr::Seq(exprs) if exprs.len() == 2));
        assert!(matches!(parse("(#%datum 1)")?, Expr::Datum(Datum::Integer(1))));
        Ok(())
    }

    #[test]
    fn prim_is_an_alias_for_primapp() -> anyhow::Result<()> {
        let Expr::PrimApp(form) = parse("(#%prim add1 (#%datum 1))")? else { anyhow::bail!("expected a primapp") };
        assert_eq!(&*form.name, "add1");
        assert_eq!(form.rands.len(), 1);
        Ok(())
    }

    #[test]
    fn zero_binding_let_is_accepted_but_letrec_is_not() {
        assert!(parse("(#%let () (#%datum 1))").is_ok());
        assert!(matches!(
            parse("(#%letrec () (#%datum 1))"),
            Err(SyntaxError::InvalidForm { form: "#%letrec", .. })
        ));
    }

    #[test]
    fn rejects_malformed_forms() {
        let cases = [
            "(#%if (#%datum #t) (#%datum 1))",
            "(#%lambda (x x) x)",
            "(#%let ([x (#%datum 1)] [x (#%datum 2)]) x)",
            "(#%let ([x]) x)",
            "(#%lambda (x))",
            "(#%datum x)",
            "(#%set! (x) (#%datum 1))",
            "(#%app)",
            "(#%primapp)",
            "(#%begin)",
            "(f x)",
            "(#%quote x)",
            "42",
        ];

        for case in cases {
            assert!(matches!(parse(case), Err(SyntaxError::InvalidForm { .. })), "{} should be rejected", case);
        }
        assert_eq!(parse("  ; nothing here\n").unwrap_err(), SyntaxError::EmptyProgram);
    }
}
