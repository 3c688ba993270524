use std::collections::{BTreeMap, BTreeSet};

use petgraph::{graph::NodeIndex, prelude::DiGraph, visit::EdgeRef, Direction::Outgoing};

use crate::analysis::GrammarAnalysis;
use crate::grammar::Grammar;
use crate::symbol::{SymbolId, SymbolKind, END};

mod item;
#[cfg(test)]
mod tests;

pub use item::{DotIdx, Item, ItemDisplay};

/// One canonical LR(0) state: the closed item set plus the flags the
/// parse-table builder needs.
#[derive(Debug)]
pub struct LrState {
    items: BTreeSet<Item>,
    reductions: BTreeSet<Item>,
    lookaheads: BTreeMap<Item, BTreeSet<SymbolId>>,
    has_shifts: bool,
    has_conflicts: bool,
}

impl LrState {
    pub fn items(&self) -> &BTreeSet<Item> {
        &self.items
    }

    pub fn reductions(&self) -> &BTreeSet<Item> {
        &self.reductions
    }

    /// Reduction items with their lookahead sets. Empty until
    /// [`Automaton::assign_lookaheads`] has run.
    pub fn lookaheads(&self) -> &BTreeMap<Item, BTreeSet<SymbolId>> {
        &self.lookaheads
    }

    pub fn has_shifts(&self) -> bool {
        self.has_shifts
    }

    pub fn has_conflicts(&self) -> bool {
        self.has_conflicts
    }

    pub fn kernel_items(&self) -> impl Iterator<Item = &Item> {
        self.items.iter().filter(|item| item.is_kernel())
    }
}

type KernelSig = Vec<(u32, DotIdx)>;

/// The canonical LR(0) automaton. States are petgraph nodes (the node
/// index is the dense state id), transitions are edges weighted with the
/// consumed symbol.
#[derive(Debug)]
pub struct Automaton {
    graph: DiGraph<LrState, SymbolId>,
}

impl Automaton {
    /// Build the automaton from state 0, the closure of
    /// `[$accept -> • start $end]`. States are deduplicated by kernel
    /// signature, so each canonical state is created at most once.
    pub fn build(grammar: &Grammar) -> Self {
        let mut graph = DiGraph::new();
        let mut kernels: BTreeMap<KernelSig, NodeIndex> = BTreeMap::new();

        let start_item = Item::new(0);
        let start_state = graph.add_node(closure(grammar, vec![start_item]));
        kernels.insert(vec![start_item.core()], start_state);

        let mut unprocessed = vec![start_state];
        while let Some(node) = unprocessed.pop() {
            // group the state's items by the symbol after the dot;
            // end-of-input is never shifted
            let mut moves: BTreeMap<SymbolId, Vec<Item>> = BTreeMap::new();
            for item in graph[node].items.iter() {
                match item.next_symbol(grammar) {
                    Some(symbol) if symbol != END => {
                        moves.entry(symbol).or_default().push(*item)
                    }
                    _ => {}
                }
            }
            for (symbol, items) in moves {
                let kernel: Vec<Item> = items.iter().map(|item| item.advanced()).collect();
                let mut signature: KernelSig = kernel.iter().map(|item| item.core()).collect();
                signature.sort_unstable();
                let target = match kernels.get(&signature) {
                    Some(existing) => *existing,
                    None => {
                        let state = graph.add_node(closure(grammar, kernel));
                        kernels.insert(signature, state);
                        unprocessed.push(state);
                        state
                    }
                };
                graph.add_edge(node, target, symbol);
            }
        }
        Automaton { graph }
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn state(&self, id: usize) -> &LrState {
        &self.graph[NodeIndex::new(id)]
    }

    pub fn states(&self) -> impl Iterator<Item = (usize, &LrState)> {
        self.graph
            .node_indices()
            .map(move |node| (node.index(), &self.graph[node]))
    }

    pub fn transitions(&self, state: usize) -> impl Iterator<Item = (SymbolId, usize)> + '_ {
        self.graph
            .edges_directed(NodeIndex::new(state), Outgoing)
            .map(|edge| (*edge.weight(), edge.target().index()))
    }

    /// Give every reduction item its SLR(1) lookahead set: FOLLOW of the
    /// rule's left-hand side.
    pub fn assign_lookaheads(&mut self, grammar: &Grammar, analysis: &GrammarAnalysis) {
        for node in self.graph.node_indices() {
            let reductions: Vec<Item> = self.graph[node].reductions.iter().copied().collect();
            let mut lookaheads = BTreeMap::new();
            for item in reductions {
                let lhs = grammar.rule(item.rule()).lhs();
                let follow = analysis.follow(lhs).cloned().unwrap_or_default();
                lookaheads.insert(item, follow);
            }
            self.graph[node].lookaheads = lookaheads;
        }
    }
}

/// Close a kernel: predict through every nonterminal after a dot,
/// deduplicating on item cores, and accumulate the state flags.
fn closure(grammar: &Grammar, kernel: Vec<Item>) -> LrState {
    let mut state = LrState {
        items: BTreeSet::new(),
        reductions: BTreeSet::new(),
        lookaheads: BTreeMap::new(),
        has_shifts: false,
        has_conflicts: false,
    };
    let mut queue = Vec::new();
    for item in kernel {
        if state.items.insert(item) {
            queue.push(item);
        }
    }
    while let Some(item) = queue.pop() {
        match item.next_symbol(grammar) {
            None => {
                state.reductions.insert(item);
                state.has_conflicts =
                    state.has_conflicts || state.reductions.len() > 1 || state.has_shifts;
            }
            Some(symbol) => match grammar.symbols().kind(symbol) {
                SymbolKind::Terminal => {
                    state.has_shifts = true;
                    state.has_conflicts = state.has_conflicts || !state.reductions.is_empty();
                }
                SymbolKind::NonTerminal => {
                    for rule in grammar.rules_of(symbol) {
                        let predicted = Item::new(*rule);
                        if state.items.insert(predicted) {
                            queue.push(predicted);
                        }
                    }
                }
            },
        }
    }
    state
}
