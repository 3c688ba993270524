use slap_grammar::{ActionMode, Alternative, Assoc, GrammarSpec};

use super::{ConflictKind, ParseTable, TableEntry};
use crate::analysis::GrammarAnalysis;
use crate::grammar::Grammar;
use crate::lr0::Automaton;
use crate::symbol::{SymbolId, SymbolKind, END};

fn compile(spec: &GrammarSpec) -> (Grammar, Automaton, ParseTable) {
    let grammar = Grammar::from_spec(spec).unwrap();
    let mut automaton = Automaton::build(&grammar);
    let analysis = GrammarAnalysis::compute(&grammar);
    automaton.assign_lookaheads(&grammar, &analysis);
    let table = ParseTable::build(&grammar, &automaton);
    (grammar, automaton, table)
}

/// Walk the table over a token sequence and record the ids of the rules
/// reduced on the way to acceptance.
fn simulate(grammar: &Grammar, table: &ParseTable, tokens: &[&str]) -> Result<Vec<u32>, String> {
    let mut input: Vec<SymbolId> = tokens
        .iter()
        .map(|name| grammar.symbols().lookup(name).unwrap())
        .collect();
    input.push(END);
    let mut states = vec![0u32];
    let mut reductions = Vec::new();
    let mut pos = 0;
    loop {
        let state = *states.last().unwrap();
        let entry = match table.default_action(state) {
            Some(rule) => TableEntry::Reduce(rule),
            None => {
                let symbol = input[pos];
                match table.get(state, symbol) {
                    Some(entry) => *entry,
                    None => {
                        return Err(format!(
                            "unexpected '{}' in state {}",
                            grammar.symbols().name(symbol),
                            state
                        ))
                    }
                }
            }
        };
        match entry {
            TableEntry::Shift(target) => {
                states.push(target);
                pos += 1;
            }
            TableEntry::Reduce(rule) => {
                reductions.push(rule);
                let popped = grammar.rule(rule).len();
                states.truncate(states.len() - popped);
                let top = *states.last().unwrap();
                match table.get(top, grammar.rule(rule).lhs()) {
                    Some(TableEntry::Goto(target)) => states.push(*target),
                    _ => return Err(format!("missing goto in state {}", top)),
                }
            }
            TableEntry::Accept => return Ok(reductions),
            TableEntry::NonAssoc => {
                return Err(format!(
                    "nonassociative '{}' in state {}",
                    grammar.symbols().name(input[pos]),
                    state
                ))
            }
            TableEntry::Goto(_) => unreachable!("goto under a terminal key"),
        }
    }
}

fn arithmetic() -> GrammarSpec {
    GrammarSpec::new(ActionMode::Sexp)
        .operator_row(Assoc::Left, &["+"])
        .operator_row(Assoc::Left, &["*"])
        .start("Expression")
        .production(
            "Expression",
            vec![
                Alternative::new("NUMBER"),
                Alternative::new("Expression + Expression").code("[\"+\",1,3]"),
                Alternative::new("Expression * Expression").code("[\"*\",1,3]"),
                Alternative::new("( Expression )").index(2),
            ],
        )
}

#[test]
fn test_precedence_orders_reductions() {
    let (grammar, _, table) = compile(&arithmetic());
    // 2 + 3 * 4: the multiplication reduces first
    let reductions =
        simulate(&grammar, &table, &["NUMBER", "+", "NUMBER", "*", "NUMBER"]).unwrap();
    assert_eq!(reductions, vec![1, 1, 1, 3, 2]);
    assert_eq!(table.conflict_count(), 0);
}

#[test]
fn test_left_associativity_reduces_eagerly() {
    let (grammar, _, table) = compile(&arithmetic());
    let reductions =
        simulate(&grammar, &table, &["NUMBER", "+", "NUMBER", "+", "NUMBER"]).unwrap();
    assert_eq!(reductions, vec![1, 1, 2, 1, 2]);
}

#[test]
fn test_right_associativity_shifts() {
    let spec = GrammarSpec::new(ActionMode::Sexp)
        .operator_row(Assoc::Right, &["^"])
        .production(
            "E",
            vec![
                Alternative::new("NUMBER"),
                Alternative::new("E ^ E").code("[\"^\",1,3]"),
            ],
        );
    let (grammar, _, table) = compile(&spec);
    let reductions =
        simulate(&grammar, &table, &["NUMBER", "^", "NUMBER", "^", "NUMBER"]).unwrap();
    assert_eq!(reductions, vec![1, 1, 1, 2, 2]);
}

#[test]
fn test_empty_production_reduces_by_default_action() {
    let spec = GrammarSpec::new(ActionMode::Sexp).production(
        "List",
        vec![
            Alternative::new(""),
            Alternative::new("List ITEM").code("[...1,2]"),
        ],
    );
    let (grammar, _, table) = compile(&spec);
    // state 0 can only reduce the empty alternative, whatever the token
    assert_eq!(table.default_action(0), Some(1));
    let reductions = simulate(&grammar, &table, &["ITEM", "ITEM", "ITEM"]).unwrap();
    assert_eq!(reductions, vec![1, 2, 2, 2]);
}

#[test]
fn test_nonassoc_poisons_the_entry() {
    let spec = GrammarSpec::new(ActionMode::Sexp)
        .operator_row(Assoc::NonAssoc, &["=="])
        .production(
            "E",
            vec![
                Alternative::new("NUMBER"),
                Alternative::new("E == E").code("[\"==\",1,3]"),
            ],
        );
    let (grammar, _, table) = compile(&spec);
    let eq = grammar.symbols().lookup("==").unwrap();
    let poisoned = (0..table.state_count() as u32)
        .any(|state| table.get(state, eq) == Some(&TableEntry::NonAssoc));
    assert!(poisoned);
    let error = simulate(
        &grammar,
        &table,
        &["NUMBER", "==", "NUMBER", "==", "NUMBER"],
    )
    .unwrap_err();
    assert!(error.contains("nonassociative"));
    // a single comparison still parses
    assert!(simulate(&grammar, &table, &["NUMBER", "==", "NUMBER"]).is_ok());
}

#[test]
fn test_reduce_reduce_is_counted_and_lower_id_wins() {
    let spec = GrammarSpec::new(ActionMode::Sexp)
        .production(
            "S",
            vec![Alternative::new("A X"), Alternative::new("B X")],
        )
        .production("A", vec![Alternative::new("Y")])
        .production("B", vec![Alternative::new("Y")]);
    let (grammar, _, table) = compile(&spec);
    assert!(table.conflict_count() >= 1);
    let record = table
        .conflicts()
        .iter()
        .find(|record| record.kind == ConflictKind::ReduceReduce)
        .unwrap();
    assert_eq!(record.chosen, TableEntry::Reduce(3));
    assert_eq!(grammar.symbols().name(record.terminal), "X");
    // generation still completes and the earlier rule parses
    let reductions = simulate(&grammar, &table, &["Y", "X"]).unwrap();
    assert_eq!(reductions, vec![3, 1]);
}

#[test]
fn test_passthrough_and_empty_conflicts_are_silent() {
    // an optional wrapper around a passthrough: forced resolutions that
    // are normalized without counting
    let spec = GrammarSpec::new(ActionMode::Sexp)
        .production(
            "S",
            vec![Alternative::new("Opt x"), Alternative::new("x")],
        )
        .production("Opt", vec![Alternative::new(""), Alternative::new("y")]);
    let (_, _, table) = compile(&spec);
    for record in table.conflicts() {
        assert!(matches!(
            record.kind,
            ConflictKind::ReduceReduce | ConflictKind::Ambiguous
        ));
    }
}

#[test]
fn test_shift_entries_match_automaton_transitions() {
    let (grammar, automaton, table) = compile(&arithmetic());
    for state in 0..table.state_count() {
        for (symbol, entry) in table.row(state as u32) {
            if let TableEntry::Shift(target) = entry {
                assert_eq!(grammar.symbols().kind(*symbol), SymbolKind::Terminal);
                assert!(automaton
                    .transitions(state)
                    .any(|(edge, node)| edge == *symbol && node == *target as usize));
            }
        }
    }
}

#[test]
fn test_goto_entries_only_under_nonterminals() {
    let (grammar, _, table) = compile(&arithmetic());
    for state in 0..table.state_count() {
        for (symbol, entry) in table.row(state as u32) {
            match entry {
                TableEntry::Goto(_) => {
                    assert_eq!(grammar.symbols().kind(*symbol), SymbolKind::NonTerminal)
                }
                _ => assert_eq!(grammar.symbols().kind(*symbol), SymbolKind::Terminal),
            }
        }
    }
}

#[test]
fn test_output_table_lists_rules_and_states() {
    let (grammar, _, table) = compile(&arithmetic());
    let mut rendered = Vec::new();
    super::output_table(&grammar, &table, &mut rendered).unwrap();
    let text = String::from_utf8(rendered).unwrap();
    assert!(text.starts_with("Rules:"));
    assert!(text.contains("0: $accept -> Expression $end"));
    assert!(text.contains("NUMBER"));
}
