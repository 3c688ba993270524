use std::collections::BTreeMap;
use std::fmt::{self, Display};
use std::io::{self, Write};

use slap_grammar::Assoc;

use crate::grammar::Grammar;
use crate::lr0::Automaton;
use crate::symbol::{SymbolId, SymbolKind, END};

#[cfg(test)]
mod tests;

/// One parse-table entry. Nonterminal keys always hold a `Goto`;
/// terminal keys hold the rest. `NonAssoc` is the poison entry written
/// for nonassociative operators at equal precedence: meeting that
/// terminal at runtime is a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableEntry {
    Shift(u32),
    Goto(u32),
    Reduce(u32),
    Accept,
    NonAssoc,
}

impl Display for TableEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableEntry::Shift(target) => write!(f, "s{}", target),
            TableEntry::Goto(target) => write!(f, "g{}", target),
            TableEntry::Reduce(rule) => write!(f, "r{}", rule),
            TableEntry::Accept => write!(f, "acc"),
            TableEntry::NonAssoc => write!(f, "non"),
        }
    }
}

/// How a forced (`bydefault`) resolution was classified. Only
/// `ReduceReduce` and `Ambiguous` count as real conflicts; the other
/// three are normalized silently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    EmptyOptional,
    Passthrough,
    Precedence,
    ReduceReduce,
    Ambiguous,
}

impl Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::EmptyOptional => write!(f, "empty-optional"),
            ConflictKind::Passthrough => write!(f, "passthrough"),
            ConflictKind::Precedence => write!(f, "precedence"),
            ConflictKind::ReduceReduce => write!(f, "reduce-reduce"),
            ConflictKind::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConflictRecord {
    pub state: u32,
    pub terminal: SymbolId,
    pub rule: u32,
    pub shift_target: Option<u32>,
    pub chosen: TableEntry,
    pub kind: ConflictKind,
}

/// The SLR(1) parse table: one action row per automaton state, plus the
/// per-state default reductions and the conflict diagnostics gathered
/// during construction.
#[derive(Debug)]
pub struct ParseTable {
    rows: Vec<BTreeMap<SymbolId, TableEntry>>,
    defaults: BTreeMap<u32, u32>,
    conflicts: Vec<ConflictRecord>,
    conflict_count: u32,
}

impl ParseTable {
    pub fn build(grammar: &Grammar, automaton: &Automaton) -> ParseTable {
        let mut rows = Vec::with_capacity(automaton.state_count());
        let mut conflicts = Vec::new();
        let mut conflict_count = 0;

        for (state_id, state) in automaton.states() {
            let mut row: BTreeMap<SymbolId, TableEntry> = BTreeMap::new();
            for (symbol, target) in automaton.transitions(state_id) {
                let entry = match grammar.symbols().kind(symbol) {
                    SymbolKind::NonTerminal => TableEntry::Goto(target as u32),
                    SymbolKind::Terminal => TableEntry::Shift(target as u32),
                };
                row.insert(symbol, entry);
            }
            if state
                .items()
                .iter()
                .any(|item| item.next_symbol(grammar) == Some(END))
            {
                row.insert(END, TableEntry::Accept);
            }
            for (item, lookaheads) in state.lookaheads() {
                for terminal in lookaheads.iter().copied() {
                    match row.get(&terminal).copied() {
                        None => {
                            row.insert(terminal, TableEntry::Reduce(item.rule()));
                        }
                        Some(existing) => {
                            let (chosen, bydefault) =
                                resolve(grammar, existing, item.rule(), terminal);
                            row.insert(terminal, chosen);
                            if bydefault {
                                let kind = categorize(grammar, existing, item.rule());
                                if matches!(
                                    kind,
                                    ConflictKind::ReduceReduce | ConflictKind::Ambiguous
                                ) {
                                    conflict_count += 1;
                                    conflicts.push(ConflictRecord {
                                        state: state_id as u32,
                                        terminal,
                                        rule: item.rule(),
                                        shift_target: match existing {
                                            TableEntry::Shift(target) => Some(target),
                                            _ => None,
                                        },
                                        chosen,
                                        kind,
                                    });
                                }
                            }
                        }
                    }
                }
            }
            rows.push(row);
        }

        let defaults = compute_defaults(grammar, &rows);
        ParseTable {
            rows,
            defaults,
            conflicts,
            conflict_count,
        }
    }

    pub fn state_count(&self) -> usize {
        self.rows.len()
    }

    pub fn row(&self, state: u32) -> &BTreeMap<SymbolId, TableEntry> {
        &self.rows[state as usize]
    }

    pub fn get(&self, state: u32, symbol: SymbolId) -> Option<&TableEntry> {
        self.rows[state as usize].get(&symbol)
    }

    /// The default reduction of a state whose action row is uniform.
    pub fn default_action(&self, state: u32) -> Option<u32> {
        self.defaults.get(&state).copied()
    }

    pub fn defaults(&self) -> &BTreeMap<u32, u32> {
        &self.defaults
    }

    pub fn conflicts(&self) -> &[ConflictRecord] {
        &self.conflicts
    }

    /// Number of reduce/reduce and ambiguous shift/reduce resolutions.
    pub fn conflict_count(&self) -> u32 {
        self.conflict_count
    }
}

/// Resolve a reduce candidate against an existing entry. Returns the
/// winning entry and whether the decision was forced (`bydefault`)
/// rather than settled by precedence.
fn resolve(
    grammar: &Grammar,
    existing: TableEntry,
    rule_id: u32,
    terminal: SymbolId,
) -> (TableEntry, bool) {
    match existing {
        TableEntry::Reduce(other) => {
            if other == rule_id {
                (existing, false)
            } else {
                // the textually earlier rule wins
                (TableEntry::Reduce(other.min(rule_id)), true)
            }
        }
        TableEntry::Shift(_) => {
            let rule_prec = grammar.rule(rule_id).prec();
            let operator = grammar.operator(terminal);
            match operator {
                None => (existing, true),
                Some(_) if rule_prec == 0 => (existing, true),
                Some(operator) => {
                    if rule_prec < operator.level {
                        (existing, false)
                    } else if rule_prec > operator.level {
                        (TableEntry::Reduce(rule_id), false)
                    } else {
                        match operator.assoc {
                            Assoc::Right => (existing, false),
                            Assoc::Left => (TableEntry::Reduce(rule_id), false),
                            Assoc::NonAssoc => (TableEntry::NonAssoc, false),
                        }
                    }
                }
            }
        }
        // accept, an earlier poison entry, or (unreachably for terminal
        // keys) a goto: keep what is there
        _ => (existing, true),
    }
}

/// Classify a forced resolution from the rule's shape.
fn categorize(grammar: &Grammar, existing: TableEntry, rule_id: u32) -> ConflictKind {
    let rule = grammar.rule(rule_id);
    if rule.is_empty() {
        ConflictKind::EmptyOptional
    } else if rule.len() == 1 && grammar.symbols().kind(rule.rhs()[0]) == SymbolKind::NonTerminal {
        ConflictKind::Passthrough
    } else if rule.prec() != 0 {
        ConflictKind::Precedence
    } else if matches!(existing, TableEntry::Reduce(_)) {
        ConflictKind::ReduceReduce
    } else {
        ConflictKind::Ambiguous
    }
}

/// A state defaults to a reduction when every terminal entry of its row
/// reduces the same rule.
fn compute_defaults(
    grammar: &Grammar,
    rows: &[BTreeMap<SymbolId, TableEntry>],
) -> BTreeMap<u32, u32> {
    let mut defaults = BTreeMap::new();
    for (state, row) in rows.iter().enumerate() {
        let mut rule = None;
        let mut uniform = true;
        for (symbol, entry) in row {
            if grammar.symbols().kind(*symbol) == SymbolKind::NonTerminal {
                continue;
            }
            match entry {
                TableEntry::Reduce(r) => match rule {
                    None => rule = Some(*r),
                    Some(previous) if previous == *r => {}
                    Some(_) => {
                        uniform = false;
                        break;
                    }
                },
                _ => {
                    uniform = false;
                    break;
                }
            }
        }
        if uniform {
            if let Some(rule) = rule {
                defaults.insert(state as u32, rule);
            }
        }
    }
    defaults
}

/// Render the rule list and the action/goto grid as plain text.
pub fn output_table(
    grammar: &Grammar,
    table: &ParseTable,
    output: &mut dyn Write,
) -> io::Result<()> {
    writeln!(output, "Rules:")?;
    for rule in grammar.rules() {
        writeln!(output, "{}: {}", rule.id(), grammar.display_rule(rule.id()))?;
    }
    writeln!(output)?;

    let state_digits = format!("{}", table.state_count()).len();
    let symbols: Vec<SymbolId> = grammar.symbols().ids().collect();
    let mut widths = Vec::new();
    write!(output, "{: >width$}", "", width = state_digits)?;
    for symbol in &symbols {
        let name = grammar.symbols().name(*symbol);
        let width = name.len().max(4);
        widths.push(width);
        write!(output, "|{: <width$}", name, width = width)?;
    }
    writeln!(output, "|")?;
    for state in 0..table.state_count() {
        write!(output, "{:0width$}", state, width = state_digits)?;
        for (i, symbol) in symbols.iter().enumerate() {
            let cell = match table.get(state as u32, *symbol) {
                Some(entry) => format!("{}", entry),
                None => String::new(),
            };
            write!(output, "|{: <width$}", cell, width = widths[i])?;
        }
        writeln!(output, "|")?;
    }
    Ok(())
}
