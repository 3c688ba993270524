use std::collections::BTreeSet;

use slap_grammar::{ActionMode, Alternative, Assoc, GrammarSpec};

use super::{Automaton, Item};
use crate::analysis::GrammarAnalysis;
use crate::grammar::Grammar;
use crate::symbol::END;

fn arithmetic() -> Grammar {
    let spec = GrammarSpec::new(ActionMode::Sexp)
        .operator_row(Assoc::Left, &["+"])
        .operator_row(Assoc::Left, &["*"])
        .production(
            "Expression",
            vec![
                Alternative::new("NUMBER"),
                Alternative::new("Expression + Expression").code("[\"+\",1,3]"),
                Alternative::new("Expression * Expression").code("[\"*\",1,3]"),
                Alternative::new("( Expression )").index(2),
            ],
        );
    Grammar::from_spec(&spec).unwrap()
}

#[test]
fn test_state_zero_is_closure_of_accept_item() {
    let grammar = arithmetic();
    let automaton = Automaton::build(&grammar);
    let state = automaton.state(0);
    // the accept item plus one predicted item per Expression rule
    assert!(state.items().contains(&Item::new(0)));
    assert_eq!(state.items().len(), 5);
    assert!(state.reductions().is_empty());
    assert!(state.has_shifts());
    assert!(!state.has_conflicts());
}

#[test]
fn test_goto_is_deterministic() {
    let grammar = arithmetic();
    let automaton = Automaton::build(&grammar);
    for (state, _) in automaton.states() {
        let mut seen = BTreeSet::new();
        for (symbol, _) in automaton.transitions(state) {
            assert!(seen.insert(symbol), "duplicate transition in state {}", state);
        }
    }
}

#[test]
fn test_kernel_signatures_are_unique() {
    let grammar = arithmetic();
    let automaton = Automaton::build(&grammar);
    let mut signatures = BTreeSet::new();
    for (state, data) in automaton.states() {
        let signature: Vec<(u32, u8)> = data.kernel_items().map(|item| item.core()).collect();
        assert!(
            signatures.insert(signature),
            "state {} duplicates an existing kernel",
            state
        );
    }
    assert_eq!(signatures.len(), automaton.state_count());
}

#[test]
fn test_end_of_input_is_never_shifted() {
    let grammar = arithmetic();
    let automaton = Automaton::build(&grammar);
    for (state, _) in automaton.states() {
        for (symbol, _) in automaton.transitions(state) {
            assert_ne!(symbol, END);
        }
    }
}

#[test]
fn test_lookaheads_are_follow_of_lhs() {
    let grammar = arithmetic();
    let mut automaton = Automaton::build(&grammar);
    let analysis = GrammarAnalysis::compute(&grammar);
    automaton.assign_lookaheads(&grammar, &analysis);
    let expression = grammar.symbols().lookup("Expression").unwrap();
    let follow = analysis.follow(expression).unwrap();
    let mut reduction_states = 0;
    for (_, state) in automaton.states() {
        for (item, lookaheads) in state.lookaheads() {
            assert!(item.at_end(&grammar));
            assert_eq!(lookaheads, follow);
            reduction_states += 1;
        }
    }
    assert!(reduction_states > 0);
}

#[test]
fn test_shared_suffixes_reuse_states() {
    // both alternatives end in the same tail; the tail's states must be
    // created once
    let spec = GrammarSpec::new(ActionMode::Sexp)
        .production(
            "S",
            vec![Alternative::new("a Tail"), Alternative::new("b Tail")],
        )
        .production("Tail", vec![Alternative::new("x y")]);
    let grammar = Grammar::from_spec(&spec).unwrap();
    let automaton = Automaton::build(&grammar);
    // states reached on x from either context share one kernel
    let mut x_targets = BTreeSet::new();
    let x = grammar.symbols().lookup("x").unwrap();
    for (state, _) in automaton.states() {
        for (symbol, target) in automaton.transitions(state) {
            if symbol == x {
                x_targets.insert(target);
            }
        }
    }
    assert_eq!(x_targets.len(), 1);
}
