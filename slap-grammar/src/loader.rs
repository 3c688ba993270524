use std::error::Error;
use std::fmt::{self, Display};

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace1},
    combinator::{map, opt, value},
    multi::{many0, many1, separated_list1},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

use crate::{ActionMode, ActionTemplate, Alternative, Assoc, GrammarSpec, ProductionSpec};

/// A grammar file failed to parse.
#[derive(Debug, PartialEq, Eq)]
pub struct LoadError {
    pub line: usize,
    pub col: usize,
    pub message: String,
}

impl Error for LoadError {}

impl Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "grammar syntax error at line {}, column {}: {}",
            self.line, self.col, self.message
        )
    }
}

enum Directive {
    Start(String),
    Operators(Assoc, Vec<String>),
    Param(String),
}

fn line_comment(input: &str) -> IResult<&str, ()> {
    value((), pair(char('#'), take_while(|c: char| c != '\n')))(input)
}

/// Whitespace and comments, zero or more.
fn sp(input: &str) -> IResult<&str, ()> {
    value((), many0(alt((value((), multispace1), line_comment))))(input)
}

fn ident(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// A `'`-quoted string with `\'` and `\\` escapes.
fn quoted(input: &str) -> IResult<&str, String> {
    let (mut rest, _) = char('\'')(input)?;
    let mut text = String::new();
    loop {
        let mut chars = rest.chars();
        match chars.next() {
            Some('\'') => return Ok((&rest[1..], text)),
            Some('\\') => match chars.next() {
                Some(escaped @ ('\'' | '\\')) => {
                    text.push(escaped);
                    rest = &rest[1 + escaped.len_utf8()..];
                }
                _ => {
                    return Err(nom::Err::Error(nom::error::Error::new(
                        rest,
                        nom::error::ErrorKind::Escaped,
                    )))
                }
            },
            Some(c) => {
                text.push(c);
                rest = &rest[c.len_utf8()..];
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    rest,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }
}

fn integer(input: &str) -> IResult<&str, i64> {
    let (input, (sign, digits)) = pair(opt(char('-')), digit1)(input)?;
    let mut number: i64 = digits.parse().unwrap_or(0);
    if sign.is_some() {
        number = -number;
    }
    Ok((input, number))
}

fn assoc(input: &str) -> IResult<&str, Assoc> {
    alt((
        value(Assoc::NonAssoc, tag("nonassoc")),
        value(Assoc::Left, tag("left")),
        value(Assoc::Right, tag("right")),
    ))(input)
}

fn directive(input: &str) -> IResult<&str, Directive> {
    terminated(
        alt((
            map(preceded(pair(tag("start"), sp), ident), |name| {
                Directive::Start(name.to_string())
            }),
            map(
                pair(assoc, many1(preceded(sp, quoted))),
                |(assoc, tokens)| Directive::Operators(assoc, tokens),
            ),
            map(preceded(pair(tag("param"), sp), ident), |name| {
                Directive::Param(name.to_string())
            }),
        )),
        tuple((sp, char(';'))),
    )(input)
}

fn action(input: &str) -> IResult<&str, ActionTemplate> {
    alt((
        map(quoted, ActionTemplate::Code),
        map(integer, ActionTemplate::Index),
    ))(input)
}

fn alternative(input: &str) -> IResult<&str, Alternative> {
    let (input, pattern) = quoted(input)?;
    let (input, action) = opt(preceded(tuple((sp, tag("=>"), sp)), action))(input)?;
    let (input, prec) = opt(preceded(tuple((sp, tag("%prec"), sp)), quoted))(input)?;
    let mut alternative = Alternative::new(&pattern);
    alternative.action = action.unwrap_or(ActionTemplate::Omitted);
    alternative.prec = prec;
    Ok((input, alternative))
}

fn production(input: &str) -> IResult<&str, ProductionSpec> {
    let (input, name) = ident(input)?;
    let (input, _) = tuple((sp, char(':'), sp))(input)?;
    let (input, alternatives) =
        separated_list1(tuple((sp, char('|'), sp)), alternative)(input)?;
    let (input, _) = tuple((sp, char(';')))(input)?;
    Ok((
        input,
        ProductionSpec {
            name: name.to_string(),
            alternatives,
        },
    ))
}

fn grammar_file(input: &str) -> IResult<&str, GrammarSpec> {
    let (input, directives) = many0(preceded(sp, directive))(input)?;
    let (input, _) = sp(input)?;
    let (input, mode) = alt((
        value(ActionMode::Sexp, tag("grammar")),
        value(ActionMode::Jison, tag("bnf")),
    ))(input)?;
    let (input, _) = tuple((sp, char('{')))(input)?;
    let (input, productions) = many1(preceded(sp, production))(input)?;
    let (input, _) = tuple((sp, char('}'), sp))(input)?;

    let mut spec = GrammarSpec::new(mode);
    spec.productions = productions;
    for directive in directives {
        match directive {
            Directive::Start(name) => spec.start = Some(name),
            Directive::Operators(assoc, tokens) => spec.operators.push((assoc, tokens)),
            Directive::Param(name) => spec.parse_params.push(name),
        }
    }
    Ok((input, spec))
}

/// Parse a grammar file into a [`GrammarSpec`].
pub fn parse_grammar_text(text: &str) -> Result<GrammarSpec, LoadError> {
    match grammar_file(text) {
        Ok((rest, spec)) if rest.is_empty() => Ok(spec),
        Ok((rest, _)) => Err(error_at(text, rest, "unexpected trailing input")),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(error_at(text, e.input, "malformed grammar"))
        }
        Err(nom::Err::Incomplete(_)) => Err(error_at(text, "", "unexpected end of input")),
    }
}

fn error_at(full: &str, rest: &str, message: &str) -> LoadError {
    let consumed = full.len() - rest.len();
    let prefix = &full[..consumed];
    let line = prefix.matches('\n').count() + 1;
    let col = prefix
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0)
        + 1;
    LoadError {
        line,
        col,
        message: message.to_string(),
    }
}
