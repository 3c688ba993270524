use std::collections::BTreeMap;
use std::mem;

use once_cell::sync::Lazy;
use regex::Regex;
use slap_grammar::{ActionMode, ActionTemplate};

/// One token of a compiled action body. Bodies interleave literal output
/// text with references that the emitter resolves against the runtime
/// stacks of the generated parser.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionTok {
    Literal(String),
    /// Semantic value at the given offset below the value-stack top.
    PositionRef(i32),
    /// Location at the given offset below the location-stack top.
    LocRef(i32),
    /// The caller's result slot (`$$`).
    ResultRef,
    /// The caller's location slot (`@$` / `@0`).
    ResultLoc,
}

/// A compiled action body in canonical form: literals are merged and
/// never empty, so equal bodies compare equal and deduplicate.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ActionBody(Vec<ActionTok>);

impl ActionBody {
    pub fn toks(&self) -> &[ActionTok] {
        &self.0
    }

    /// The stack offsets referenced by this body, in body order.
    pub fn position_refs(&self) -> Vec<i32> {
        self.0
            .iter()
            .filter_map(|tok| match tok {
                ActionTok::PositionRef(k) => Some(*k),
                _ => None,
            })
            .collect()
    }
}

/// The template cannot be compiled under the grammar's action mode.
#[derive(Debug, PartialEq, Eq)]
pub struct UnsupportedActionError {
    pub template: String,
}

struct BodyBuilder {
    toks: Vec<ActionTok>,
    pending: String,
}

impl BodyBuilder {
    fn new() -> Self {
        BodyBuilder {
            toks: Vec::new(),
            pending: String::new(),
        }
    }

    fn push_str(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    fn push_char(&mut self, c: char) {
        self.pending.push(c);
    }

    fn push_tok(&mut self, tok: ActionTok) {
        self.flush();
        self.toks.push(tok);
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            self.toks
                .push(ActionTok::Literal(mem::take(&mut self.pending)));
        }
    }

    fn finish(mut self) -> ActionBody {
        self.flush();
        ActionBody(self.toks)
    }
}

/// Compile an action template into its body. `rhs_names` are the
/// alias-stripped right-hand-side symbol names; `aliases` holds the
/// stripped `[alias]` names per position.
pub fn compile(
    mode: ActionMode,
    template: &ActionTemplate,
    rhs_names: &[String],
    aliases: &[Option<String>],
) -> Result<ActionBody, UnsupportedActionError> {
    match mode {
        ActionMode::Sexp => Ok(compile_sexp(template, rhs_names.len())),
        ActionMode::Jison => compile_jison(template, rhs_names, aliases),
    }
}

/// Offset below the stack top of 1-based position `n` in a rule of
/// length `len`: the last right-hand-side symbol sits at offset 0.
fn offset(len: usize, n: i64) -> i32 {
    (len as i64 - n) as i32
}

fn position_return(len: usize, n: i64) -> ActionBody {
    let mut body = BodyBuilder::new();
    if len == 0 {
        // an empty production has no stack slot to pass through; it
        // yields the empty sequence
        body.push_str("return [];");
    } else {
        body.push_str("return ");
        body.push_tok(ActionTok::PositionRef(offset(len, n)));
        body.push_str(";");
    }
    body.finish()
}

static DOLLAR_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$(-?\d+)").unwrap());
static BARE_INT: Lazy<Regex> = Lazy::new(|| Regex::new(r"-?\d+").unwrap());

fn compile_sexp(template: &ActionTemplate, len: usize) -> ActionBody {
    match template {
        ActionTemplate::Omitted => position_return(len, 1),
        ActionTemplate::Index(n) => position_return(len, *n),
        ActionTemplate::Code(text) => {
            let mut body = BodyBuilder::new();
            body.push_str("return ");
            // `$n` references opt out of bare-integer rewriting, so the
            // template may contain literal digits
            if DOLLAR_REF.is_match(text) {
                rewrite_refs(&mut body, &DOLLAR_REF, text, len, 1);
            } else {
                rewrite_refs(&mut body, &BARE_INT, text, len, 0);
            }
            body.push_str(";");
            body.finish()
        }
    }
}

fn rewrite_refs(body: &mut BodyBuilder, re: &Regex, text: &str, len: usize, group: usize) {
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let whole = caps.get(0).unwrap();
        let number: i64 = caps.get(group).unwrap().as_str().parse().unwrap();
        body.push_str(&text[last..whole.start()]);
        body.push_tok(ActionTok::PositionRef(offset(len, number)));
        last = whole.end();
    }
    body.push_str(&text[last..]);
}

fn compile_jison(
    template: &ActionTemplate,
    rhs_names: &[String],
    aliases: &[Option<String>],
) -> Result<ActionBody, UnsupportedActionError> {
    let len = rhs_names.len();
    match template {
        ActionTemplate::Omitted => Ok(if len == 0 {
            let mut body = BodyBuilder::new();
            body.push_str("return null;");
            body.finish()
        } else {
            position_return(len, 1)
        }),
        ActionTemplate::Index(n) => Err(UnsupportedActionError {
            template: n.to_string(),
        }),
        ActionTemplate::Code(text) => {
            Ok(scan_code(text, len, &name_positions(rhs_names, aliases)))
        }
    }
}

/// Named-reference table: aliases plus symbol names, the latter with
/// numeric disambiguation (`name` resolves to the first occurrence,
/// `name1`, `name2`, ... to each occurrence in order).
fn name_positions(rhs_names: &[String], aliases: &[Option<String>]) -> BTreeMap<String, usize> {
    let mut positions = BTreeMap::new();
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for (i, name) in rhs_names.iter().enumerate() {
        let position = i + 1;
        if let Some(alias) = &aliases[i] {
            positions.entry(alias.clone()).or_insert(position);
        }
        let count = counts
            .entry(name.as_str())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        positions
            .entry(format!("{}{}", name, count))
            .or_insert(position);
        if *count == 1 {
            positions.entry(name.clone()).or_insert(position);
        }
    }
    positions
}

fn scan_code(text: &str, len: usize, names: &BTreeMap<String, usize>) -> ActionBody {
    let chars: Vec<char> = text.chars().collect();
    let mut body = BodyBuilder::new();
    let mut quote: Option<char> = None;
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if let Some(q) = quote {
            body.push_char(c);
            if c == '\\' && i + 1 < chars.len() {
                body.push_char(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                body.push_char(c);
                i += 1;
            }
            '$' if chars.get(i + 1) == Some(&'$') => {
                body.push_tok(ActionTok::ResultRef);
                i += 2;
            }
            '@' if chars.get(i + 1) == Some(&'$') => {
                body.push_tok(ActionTok::ResultLoc);
                i += 2;
            }
            '$' | '@' => {
                if let Some((n, used)) = scan_number(&chars[i + 1..]) {
                    if c == '@' && n == 0 {
                        body.push_tok(ActionTok::ResultLoc);
                    } else if c == '$' {
                        body.push_tok(ActionTok::PositionRef(offset(len, n)));
                    } else {
                        body.push_tok(ActionTok::LocRef(offset(len, n)));
                    }
                    i += 1 + used;
                } else if let Some((name, used)) = scan_ident(&chars[i + 1..]) {
                    match names.get(&name) {
                        Some(position) => {
                            let k = offset(len, *position as i64);
                            body.push_tok(if c == '$' {
                                ActionTok::PositionRef(k)
                            } else {
                                ActionTok::LocRef(k)
                            });
                        }
                        None => {
                            body.push_char(c);
                            body.push_str(&name);
                        }
                    }
                    i += 1 + used;
                } else {
                    body.push_char(c);
                    i += 1;
                }
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let (word, used) = scan_ident(&chars[i..]).unwrap();
                match word.as_str() {
                    "YYABORT" => body.push_str("return false"),
                    "YYACCEPT" => body.push_str("return true"),
                    _ => body.push_str(&word),
                }
                i += used;
            }
            _ => {
                body.push_char(c);
                i += 1;
            }
        }
    }
    body.finish()
}

fn scan_number(chars: &[char]) -> Option<(i64, usize)> {
    let mut i = usize::from(chars.first() == Some(&'-'));
    let digits_start = i;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if i == digits_start {
        return None;
    }
    let text: String = chars[..i].iter().collect();
    Some((text.parse().unwrap(), i))
}

fn scan_ident(chars: &[char]) -> Option<(String, usize)> {
    let first = *chars.first()?;
    if !first.is_ascii_alphabetic() && first != '_' {
        return None;
    }
    let mut i = 1;
    while i < chars.len()
        && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
    {
        i += 1;
    }
    Some((chars[..i].iter().collect(), i))
}
