use core::{fmt, ops::Range};

use itertools::Itertools;
use logos::Logos;

use crate::{ast::{build_program, Expr}, error::SyntaxError};


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Paren,
    Bracket,
    Brace,
}

impl Delimiter {
    pub fn closer(self) -> char {
        match self {
            Self::Paren => ')',
            Self::Bracket => ']',
            Self::Brace => '}',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Logos)]
#[logos(skip r"([ \t\r\n\f]+|;[^\n]*)")]
enum Token<'a> {
    #[token("(", |_| Delimiter::Paren)]
    #[token("[", |_| Delimiter::Bracket)]
    #[token("{", |_| Delimiter::Brace)]
    Open(Delimiter),

    #[token(")", |_| Delimiter::Paren)]
    #[token("]", |_| Delimiter::Bracket)]
    #[token("}", |_| Delimiter::Brace)]
    Close(Delimiter),

    #[token("#t", |_| true)]
    #[token("#true", |_| true)]
    #[token("#f", |_| false)]
    #[token("#false", |_| false)]
    Boolean(bool),

    #[token("#undefined")]
    Undefined,

    // Digits are kept as text so an overflowing literal can be reported with its span
    #[regex(r"[0-9]+", |lex| lex.slice())]
    Integer(&'a str),

    #[regex(r"(#%)?[!@$%^&*=+_/?<>a-zA-Z\-][!@$%^&*=+_/?<>a-zA-Z0-9\-.]*", |lex| lex.slice())]
    Symbol(&'a str),
}

type Spanned<'a> = (Token<'a>, Range<usize>);

#[derive(Debug, Clone, PartialEq)]
pub enum Atom<'a> {
    Symbol(&'a str),
    Integer(i64),
    Boolean(bool),
    Undefined,
}

/// Surface syntax tree produced by the reader, borrowing its symbols from the source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Sexp<'a> {
    Atom(Atom<'a>),
    List(Vec<Self>),
}

impl<'a> fmt::Display for Atom<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Symbol(symbol) => write!(f, "{}", symbol),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Boolean(true) => write!(f, "#t"),
            Self::Boolean(false) => write!(f, "#f"),
            Self::Undefined => write!(f, "#undefined"),
        }
    }
}

impl<'a> fmt::Display for Sexp<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Atom(atom) => atom.fmt(f),
            Self::List(items) => write!(f, "({})", items.iter().join(" ")),
        }
    }
}

type ParseResult<O> = Result<O, SyntaxError>;

/// Deepest list nesting the reader accepts. Reading, building and dropping
/// the tree all recurse once per level.
pub const MAX_NESTING: usize = 512;


fn lexer(input: &str) -> ParseResult<Vec<Spanned<'_>>> {
    let mut tokens = vec![];
    let mut tokenizer = Token::lexer(input);

    while let Some(result) = tokenizer.next() {
        match result {
            Ok(token) => tokens.push((token, tokenizer.span())),
            Err(_) => return Err(SyntaxError::UnknownToken(tokenizer.span())),
        }
    }

    Ok(tokens)
}

fn read_list<'a, 'b: 'a>(mut tokens: &'a [Spanned<'b>], open: Delimiter, depth: usize) -> ParseResult<(&'a [Spanned<'b>], Sexp<'b>)> {
    // A list continues until the closer matching the delimiter it was opened with
    let mut items = vec![];

    loop {
        match tokens.split_first() {
            None => return Err(SyntaxError::UnexpectedEof),
            Some(((Token::Close(close), span), rest)) => {
                if *close != open {
                    return Err(SyntaxError::MismatchedDelimiter {
                        expected: open.closer(),
                        found: close.closer(),
                        span: span.clone(),
                    });
                }
                return Ok((rest, Sexp::List(items)));
            }
            Some(_) => {
                let (rest, item) = read_sexp(tokens, depth)?;
                items.push(item);
                tokens = rest;
            }
        }
    }
}

fn read_sexp<'a, 'b: 'a>(tokens: &'a [Spanned<'b>], depth: usize) -> ParseResult<(&'a [Spanned<'b>], Sexp<'b>)> {
    let ((token, span), rest) = tokens.split_first().ok_or(SyntaxError::UnexpectedEof)?;

    let atom = match token {
        Token::Open(_) if depth == MAX_NESTING => {
            return Err(SyntaxError::NestingTooDeep { limit: MAX_NESTING, span: span.clone() });
        }
        Token::Open(delimiter) => return read_list(rest, *delimiter, depth + 1),
        Token::Close(_) => return Err(SyntaxError::UnexpectedClose(span.clone())),
        Token::Integer(digits) => Atom::Integer(
            digits.parse().map_err(|_| SyntaxError::IntegerOutOfRange(span.clone()))?
        ),
        Token::Boolean(value) => Atom::Boolean(*value),
        Token::Undefined => Atom::Undefined,
        Token::Symbol(symbol) => Atom::Symbol(symbol),
    };

    Ok((rest, Sexp::Atom(atom)))
}

/// Reads every top-level form in `input`.
pub fn read_all(input: &str) -> ParseResult<Vec<Sexp<'_>>> {
    let tokens = lexer(input)?;
    let mut tokens = tokens.as_slice();
    let mut sexps = vec![];

    while !tokens.is_empty() {
        let (rest, sexp) = read_sexp(tokens, 0)?;
        sexps.push(sexp);
        tokens = rest;
    }

    Ok(sexps)
}

/// Reads and builds a whole program. Several top-level forms are evaluated in sequence.
pub fn parse(input: &str) -> ParseResult<Expr> {
    let sexps = read_all(input)?;
    build_program(&sexps)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol(name: &str) -> Sexp<'_> {
        Sexp::Atom(Atom::Symbol(name))
    }

    #[test]
    fn reads_nested_forms_with_mixed_delimiters() -> anyhow::Result<()> {
        let sexps = read_all("(#%let ([x (#%datum 42)])\n  x)")?;

        assert_eq!(sexps, vec![Sexp::List(vec![
            symbol("#%let"),
            Sexp::List(vec![Sexp::List(vec![
                symbol("x"),
                Sexp::List(vec![symbol("#%datum"), Sexp::Atom(Atom::Integer(42))]),
            ])]),
            symbol("x"),
        ])]);
        Ok(())
    }

    #[test]
    fn reads_literals_and_skips_comments() -> anyhow::Result<()> {
        let sexps = read_all("#t #false #undefined ; trailing comment\n 7 odd? n-1 a.b")?;

        assert_eq!(sexps, vec![
            Sexp::Atom(Atom::Boolean(true)),
            Sexp::Atom(Atom::Boolean(false)),
            Sexp::Atom(Atom::Undefined),
            Sexp::Atom(Atom::Integer(7)),
            symbol("odd?"),
            symbol("n-1"),
            symbol("a.b"),
        ]);
        Ok(())
    }

    #[test]
    fn rejects_mismatched_and_unclosed_lists() {
        assert!(matches!(
            read_all("(#%app f ]"),
            Err(SyntaxError::MismatchedDelimiter { expected: ')', found: ']', .. })
        ));
        assert_eq!(read_all("(#%app f"), Err(SyntaxError::UnexpectedEof));
        assert_eq!(read_all("x)"), Err(SyntaxError::UnexpectedClose(1..2)));
    }

    #[test]
    fn rejects_unknown_characters_and_huge_integers() {
        assert!(matches!(read_all("(x , y)"), Err(SyntaxError::UnknownToken(_))));
        assert!(matches!(
            read_all("99999999999999999999999"),
            Err(SyntaxError::IntegerOutOfRange(_))
        ));
    }

    #[test]
    fn limits_list_nesting() {
        let nested = |depth: usize| format!("{}x{}", "(".repeat(depth), ")".repeat(depth));

        assert!(read_all(&nested(MAX_NESTING)).is_ok());
        assert_eq!(
            read_all(&nested(MAX_NESTING + 1)),
            Err(SyntaxError::NestingTooDeep { limit: MAX_NESTING, span: MAX_NESTING..MAX_NESTING + 1 })
        );
        assert!(matches!(read_all(&nested(100_000)), Err(SyntaxError::NestingTooDeep { .. })));
    }

    #[test]
    fn displays_sexps_back_as_source() -> anyhow::Result<()> {
        let sexps = read_all("[#%primapp plus {x} #t]")?;
        assert_eq!(sexps[0].to_string(), "(#%primapp plus (x) #t)");
        Ok(())
    }
}
