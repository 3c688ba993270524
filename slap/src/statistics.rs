use std::fmt::{self, Display};

/// Generation counts for the CLI's statistics display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statistics {
    /// User terminals, the reserved `$end` and `error` excluded.
    pub tokens: usize,
    /// User nonterminals, `$accept` excluded.
    pub types: usize,
    /// User rules, the synthesized accept rule excluded.
    pub rules: usize,
    pub states: usize,
    pub conflicts: u32,
}

impl Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} tokens, {} types, {} rules, {} states, {} conflicts",
            self.tokens, self.types, self.rules, self.states, self.conflicts
        )
    }
}
