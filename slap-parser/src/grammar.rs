use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self, Display};

use slap_grammar::{Assoc, GrammarSpec};

use crate::action::ActionBody;
use crate::grammar_builder::GrammarBuilder;
use crate::symbol::{SymbolId, SymbolTable};

/// Structural grammar errors; these abort generation.
#[derive(Debug, PartialEq)]
pub enum GrammarError {
    NoRules,
    UndefinedStart(String),
    ReservedName(String),
    DuplicateOperator(String),
    UnsupportedAction { production: String, template: String },
}

impl Error for GrammarError {}

impl Display for GrammarError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarError::NoRules => write!(f, "grammar defines no rules"),
            GrammarError::UndefinedStart(name) => {
                write!(f, "start symbol '{}' has no productions", name)
            }
            GrammarError::ReservedName(name) => {
                write!(f, "'{}' is reserved and cannot be redefined", name)
            }
            GrammarError::DuplicateOperator(name) => {
                write!(f, "operator '{}' appears in more than one precedence row", name)
            }
            GrammarError::UnsupportedAction { production, template } => write!(
                f,
                "production '{}' has an unsupported action template: {}",
                production, template
            ),
        }
    }
}

/// Precedence and associativity of an operator terminal. Level 1 is the
/// lowest precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operator {
    pub assoc: Assoc,
    pub level: u16,
}

/// A single production. Ids are dense and 1-based; id 0 is the
/// synthesized accept rule `$accept -> start $end`.
#[derive(Debug)]
pub struct Rule {
    id: u32,
    lhs: SymbolId,
    rhs: Vec<SymbolId>,
    prec: u16,
    action: Option<usize>,
}

impl Rule {
    pub(crate) fn new(
        id: u32,
        lhs: SymbolId,
        rhs: Vec<SymbolId>,
        prec: u16,
        action: Option<usize>,
    ) -> Self {
        Rule {
            id,
            lhs,
            rhs,
            prec,
            action,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn lhs(&self) -> SymbolId {
        self.lhs
    }

    pub fn rhs(&self) -> &[SymbolId] {
        &self.rhs
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }

    pub fn prec(&self) -> u16 {
        self.prec
    }

    pub fn action(&self) -> Option<usize> {
        self.action
    }
}

pub struct RuleDisplay<'grammar> {
    rule: &'grammar Rule,
    grammar: &'grammar Grammar,
}

impl<'grammar> Display for RuleDisplay<'grammar> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ->", self.grammar.symbols().name(self.rule.lhs()))?;
        if self.rule.is_empty() {
            write!(f, " <empty>")?;
        } else {
            for symbol in self.rule.rhs() {
                write!(f, " {}", self.grammar.symbols().name(*symbol))?;
            }
        }
        Ok(())
    }
}

/// The compiled grammar: interned symbols, dense rules, the operator
/// table, and the deduplicated action bodies. Immutable once built.
#[derive(Debug)]
pub struct Grammar {
    symbols: SymbolTable,
    rules: Vec<Rule>,
    rules_of: BTreeMap<SymbolId, Vec<u32>>,
    operators: BTreeMap<SymbolId, Operator>,
    actions: Vec<ActionBody>,
    start: SymbolId,
    parse_params: Vec<String>,
}

impl Grammar {
    pub fn from_spec(spec: &GrammarSpec) -> Result<Self, GrammarError> {
        GrammarBuilder::new(spec)?.build()
    }

    pub(crate) fn new(
        symbols: SymbolTable,
        rules: Vec<Rule>,
        rules_of: BTreeMap<SymbolId, Vec<u32>>,
        operators: BTreeMap<SymbolId, Operator>,
        actions: Vec<ActionBody>,
        start: SymbolId,
        parse_params: Vec<String>,
    ) -> Self {
        Grammar {
            symbols,
            rules,
            rules_of,
            operators,
            actions,
            start,
            parse_params,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn rule(&self, id: u32) -> &Rule {
        &self.rules[id as usize]
    }

    /// Rule ids of a nonterminal, in definition order.
    pub fn rules_of(&self, non_terminal: SymbolId) -> &[u32] {
        self.rules_of
            .get(&non_terminal)
            .map(|rules| rules.as_slice())
            .unwrap_or(&[])
    }

    pub fn operator(&self, terminal: SymbolId) -> Option<&Operator> {
        self.operators.get(&terminal)
    }

    pub fn operators(&self) -> impl Iterator<Item = (SymbolId, &Operator)> {
        self.operators.iter().map(|(id, op)| (*id, op))
    }

    pub fn start(&self) -> SymbolId {
        self.start
    }

    pub fn actions(&self) -> &[ActionBody] {
        &self.actions
    }

    pub fn parse_params(&self) -> &[String] {
        &self.parse_params
    }

    /// The flat rule table: `(lhs id, rhs length)` indexed by rule id.
    pub fn rule_table(&self) -> impl Iterator<Item = (SymbolId, usize)> + '_ {
        self.rules.iter().map(|rule| (rule.lhs(), rule.len()))
    }

    /// Rules grouped by their compiled action body, in body order. The
    /// accept rule is never dispatched and carries no group.
    pub fn action_groups(&self) -> Vec<(&ActionBody, Vec<u32>)> {
        let mut groups: BTreeMap<usize, Vec<u32>> = BTreeMap::new();
        for rule in self.rules.iter().skip(1) {
            if let Some(action) = rule.action() {
                groups.entry(action).or_default().push(rule.id());
            }
        }
        groups
            .into_iter()
            .map(|(action, rules)| (&self.actions[action], rules))
            .collect()
    }

    pub fn display_rule(&self, id: u32) -> RuleDisplay<'_> {
        RuleDisplay {
            rule: self.rule(id),
            grammar: self,
        }
    }

    /// Render the resolved grammar as an s-expression.
    pub fn to_sexp(&self) -> String {
        let mut out = String::from("(grammar\n");
        out.push_str(&format!("  (start {})\n", self.symbols.name(self.start)));
        if !self.operators.is_empty() {
            let mut rows: BTreeMap<u16, (Assoc, Vec<&str>)> = BTreeMap::new();
            for (id, operator) in &self.operators {
                rows.entry(operator.level)
                    .or_insert((operator.assoc, Vec::new()))
                    .1
                    .push(self.symbols.name(*id));
            }
            out.push_str("  (operators\n");
            for (_, (assoc, names)) in rows {
                out.push_str(&format!("    ({}", assoc));
                for name in names {
                    out.push_str(&format!(" \"{}\"", name));
                }
                out.push_str(")\n");
            }
            out.push_str("  )\n");
        }
        out.push_str("  (rules\n");
        for rule in &self.rules {
            out.push_str(&format!(
                "    (rule {} {} (",
                rule.id(),
                self.symbols.name(rule.lhs())
            ));
            for (i, symbol) in rule.rhs().iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(self.symbols.name(*symbol));
            }
            out.push_str("))\n");
        }
        out.push_str("  ))");
        out
    }
}

impl Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Grammar (start: {}) {{",
            self.symbols.name(self.start)
        )?;
        for rule in &self.rules {
            writeln!(f, "\t{}: {}", rule.id(), self.display_rule(rule.id()))?;
        }
        write!(f, "}}")
    }
}
