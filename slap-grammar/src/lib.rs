use std::fmt::{self, Display};

mod loader;

pub use loader::{parse_grammar_text, LoadError};

/// Operator associativity, as declared by one precedence row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Assoc {
    Left,
    Right,
    NonAssoc,
}

impl Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Assoc::Left => write!(f, "left"),
            Assoc::Right => write!(f, "right"),
            Assoc::NonAssoc => write!(f, "nonassoc"),
        }
    }
}

/// Which action-template dialect a grammar uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionMode {
    Sexp,
    Jison,
}

/// An alternative's semantic-action template, before compilation.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionTemplate {
    Omitted,
    Index(i64),
    Code(String),
}

/// One right-hand-side alternative of a production.
#[derive(Debug, Clone, PartialEq)]
pub struct Alternative {
    /// Symbol names in order, possibly carrying `[alias]` suffixes.
    /// Empty for an ε-alternative.
    pub pattern: Vec<String>,
    pub action: ActionTemplate,
    /// `%prec` override: the name of an operator terminal.
    pub prec: Option<String>,
}

impl Alternative {
    pub fn new(pattern: &str) -> Self {
        Alternative {
            pattern: pattern.split_whitespace().map(str::to_string).collect(),
            action: ActionTemplate::Omitted,
            prec: None,
        }
    }

    pub fn code(mut self, code: &str) -> Self {
        self.action = ActionTemplate::Code(code.to_string());
        self
    }

    pub fn index(mut self, index: i64) -> Self {
        self.action = ActionTemplate::Index(index);
        self
    }

    pub fn prec(mut self, token: &str) -> Self {
        self.prec = Some(token.to_string());
        self
    }
}

/// A named nonterminal together with its ordered alternatives.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductionSpec {
    pub name: String,
    pub alternatives: Vec<Alternative>,
}

/// The declarative grammar consumed by the generator. Production order is
/// significant: the first left-hand side is the default start symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarSpec {
    pub mode: ActionMode,
    pub productions: Vec<ProductionSpec>,
    /// Precedence rows, lowest first.
    pub operators: Vec<(Assoc, Vec<String>)>,
    pub start: Option<String>,
    pub parse_params: Vec<String>,
}

impl GrammarSpec {
    pub fn new(mode: ActionMode) -> Self {
        GrammarSpec {
            mode,
            productions: Vec::new(),
            operators: Vec::new(),
            start: None,
            parse_params: Vec::new(),
        }
    }

    pub fn production(mut self, name: &str, alternatives: Vec<Alternative>) -> Self {
        self.productions.push(ProductionSpec {
            name: name.to_string(),
            alternatives,
        });
        self
    }

    pub fn operator_row(mut self, assoc: Assoc, tokens: &[&str]) -> Self {
        self.operators
            .push((assoc, tokens.iter().map(|t| t.to_string()).collect()));
        self
    }

    pub fn start(mut self, name: &str) -> Self {
        self.start = Some(name.to_string());
        self
    }

    pub fn parse_param(mut self, name: &str) -> Self {
        self.parse_params.push(name.to_string());
        self
    }

    /// Whether the grammar defines productions for `name`.
    pub fn defines(&self, name: &str) -> bool {
        self.productions.iter().any(|p| p.name == name)
    }
}
