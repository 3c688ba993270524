use std::collections::{BTreeMap, BTreeSet};

use crate::grammar::Grammar;
use crate::symbol::{SymbolId, SymbolKind, END};

/// NULLABLE, FIRST and FOLLOW, computed as monotone fixed points over
/// the rule list (the accept rule included).
#[derive(Debug)]
pub struct GrammarAnalysis {
    nullable: BTreeSet<SymbolId>,
    first: BTreeMap<SymbolId, BTreeSet<SymbolId>>,
    follow: BTreeMap<SymbolId, BTreeSet<SymbolId>>,
}

impl GrammarAnalysis {
    pub fn compute(grammar: &Grammar) -> Self {
        let nullable = compute_nullable(grammar);
        let first = compute_first_sets(grammar, &nullable);
        let follow = compute_follow_sets(grammar, &nullable, &first);
        GrammarAnalysis {
            nullable,
            first,
            follow,
        }
    }

    pub fn is_nullable(&self, symbol: SymbolId) -> bool {
        self.nullable.contains(&symbol)
    }

    pub fn first(&self, non_terminal: SymbolId) -> Option<&BTreeSet<SymbolId>> {
        self.first.get(&non_terminal)
    }

    pub fn follow(&self, non_terminal: SymbolId) -> Option<&BTreeSet<SymbolId>> {
        self.follow.get(&non_terminal)
    }
}

/// FIRST of a symbol sequence: accumulate FIRST of each symbol until the
/// first non-nullable one.
fn first_of_sequence(
    grammar: &Grammar,
    nullable: &BTreeSet<SymbolId>,
    first_sets: &BTreeMap<SymbolId, BTreeSet<SymbolId>>,
    sequence: &[SymbolId],
) -> BTreeSet<SymbolId> {
    let mut result = BTreeSet::new();
    for symbol in sequence {
        if grammar.symbols().kind(*symbol) == SymbolKind::Terminal {
            result.insert(*symbol);
            break;
        }
        if let Some(first) = first_sets.get(symbol) {
            result.extend(first.iter().copied());
        }
        if !nullable.contains(symbol) {
            break;
        }
    }
    result
}

fn compute_nullable(grammar: &Grammar) -> BTreeSet<SymbolId> {
    let mut nullable = BTreeSet::new();
    // repeat until no more changes occur
    loop {
        let mut inserted_any = false;
        for rule in grammar.rules() {
            if nullable.contains(&rule.lhs()) {
                continue;
            }
            if rule.rhs().iter().all(|symbol| nullable.contains(symbol)) {
                nullable.insert(rule.lhs());
                inserted_any = true;
            }
        }
        if !inserted_any {
            break;
        }
    }
    nullable
}

fn compute_first_sets(
    grammar: &Grammar,
    nullable: &BTreeSet<SymbolId>,
) -> BTreeMap<SymbolId, BTreeSet<SymbolId>> {
    // init empty first sets
    let mut first_sets = BTreeMap::new();
    for non_terminal in grammar.symbols().non_terminals() {
        first_sets.insert(non_terminal, BTreeSet::new());
    }
    // repeat until no more changes occur
    loop {
        let mut inserted_any = false;
        for rule in grammar.rules() {
            let first_for_rhs = first_of_sequence(grammar, nullable, &first_sets, rule.rhs());
            let first_of_lhs = first_sets.get_mut(&rule.lhs()).unwrap();
            for symbol in first_for_rhs {
                let was_inserted = first_of_lhs.insert(symbol);
                inserted_any = inserted_any || was_inserted;
            }
        }
        if !inserted_any {
            break;
        }
    }
    first_sets
}

fn compute_follow_sets(
    grammar: &Grammar,
    nullable: &BTreeSet<SymbolId>,
    first_sets: &BTreeMap<SymbolId, BTreeSet<SymbolId>>,
) -> BTreeMap<SymbolId, BTreeSet<SymbolId>> {
    let mut follow_sets = BTreeMap::new();
    for non_terminal in grammar.symbols().non_terminals() {
        follow_sets.insert(non_terminal, BTreeSet::new());
    }
    // the start symbol is always followed by end-of-input
    follow_sets.get_mut(&grammar.start()).unwrap().insert(END);
    // repeat until no more changes occur
    loop {
        let mut inserted_any = false;
        for rule in grammar.rules() {
            for (i, symbol) in rule.rhs().iter().enumerate() {
                if grammar.symbols().kind(*symbol) != SymbolKind::NonTerminal {
                    continue;
                }
                let remainder = &rule.rhs()[i + 1..];
                let mut additions =
                    first_of_sequence(grammar, nullable, first_sets, remainder);
                let remainder_nullable =
                    remainder.iter().all(|symbol| nullable.contains(symbol));
                if remainder_nullable {
                    additions.extend(follow_sets.get(&rule.lhs()).unwrap().iter().copied());
                }
                let follow_of_symbol = follow_sets.get_mut(symbol).unwrap();
                for addition in additions {
                    let was_inserted = follow_of_symbol.insert(addition);
                    inserted_any = inserted_any || was_inserted;
                }
            }
        }
        if !inserted_any {
            break;
        }
    }
    follow_sets
}
