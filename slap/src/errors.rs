use std::error::Error;
use std::fmt::{self, Display};
use std::path::PathBuf;

use owo_colors::OwoColorize;

use slap_grammar::LoadError;
use slap_parser::grammar::{Grammar, GrammarError};
use slap_parser::table::{ConflictKind, ParseTable, TableEntry};

#[derive(Debug)]
pub enum Severity {
    Error,
    Warning,
}

impl Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "{}", "error".bright_red().bold()),
            Severity::Warning => write!(f, "{}", "warning".yellow().bold()),
        }
    }
}

/// Fatal generation errors, rendered with a colored severity prefix.
#[derive(Debug)]
pub enum SlapError {
    Grammar(GrammarError),
    Load { path: PathBuf, error: LoadError },
    Io { path: PathBuf, error: std::io::Error },
}

impl SlapError {
    pub fn load(path: PathBuf, error: LoadError) -> Self {
        SlapError::Load { path, error }
    }

    pub fn io(path: PathBuf, error: std::io::Error) -> Self {
        SlapError::Io { path, error }
    }
}

impl From<GrammarError> for SlapError {
    fn from(error: GrammarError) -> Self {
        SlapError::Grammar(error)
    }
}

impl Error for SlapError {}

impl Display for SlapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlapError::Grammar(error) => write!(f, "{}: {}", Severity::Error, error),
            SlapError::Load { path, error } => {
                write!(f, "{}: {}: {}", Severity::Error, path.display(), error)
            }
            SlapError::Io { path, error } => {
                write!(f, "{}: {}: {}", Severity::Error, path.display(), error)
            }
        }
    }
}

/// Render the recorded conflicts, one block per record.
pub(crate) fn render_conflicts(grammar: &Grammar, table: &ParseTable) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for record in table.conflicts() {
        let kind = match record.kind {
            ConflictKind::ReduceReduce => "reduce/reduce",
            ConflictKind::Ambiguous => "shift/reduce",
            _ => "resolved",
        };
        let _ = writeln!(
            out,
            "{}: {} conflict in state {} on '{}'",
            Severity::Warning,
            kind,
            record.state,
            grammar.symbols().name(record.terminal).bold()
        );
        let _ = writeln!(out, "  rule: {}", grammar.display_rule(record.rule).bold());
        let chosen = match record.chosen {
            TableEntry::Shift(target) => format!("shift, goto state {}", target),
            TableEntry::Reduce(rule) => {
                format!("reduce {}", grammar.display_rule(rule))
            }
            TableEntry::Accept => "accept".to_string(),
            TableEntry::NonAssoc => "error entry (nonassociative)".to_string(),
            TableEntry::Goto(target) => format!("goto state {}", target),
        };
        let _ = writeln!(out, "  resolved: {}", chosen);
    }
    out
}
