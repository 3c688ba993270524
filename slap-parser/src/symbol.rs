use std::collections::BTreeMap;

pub type SymbolId = u32;

/// Synthesized start symbol of the augmented grammar.
pub const ACCEPT: SymbolId = 0;
/// End-of-input marker.
pub const END: SymbolId = 1;
/// The error-recovery token.
pub const ERROR: SymbolId = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Terminal,
    NonTerminal,
}

/// Interns every symbol name of a grammar into a single dense id space.
/// Ids 0, 1 and 2 are reserved for `$accept`, `$end` and `error`; user
/// symbols are numbered from 3 in the order they are first seen.
#[derive(Debug)]
pub struct SymbolTable {
    names: Vec<String>,
    kinds: Vec<SymbolKind>,
    ids: BTreeMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut table = SymbolTable {
            names: Vec::new(),
            kinds: Vec::new(),
            ids: BTreeMap::new(),
        };
        table.insert("$accept", SymbolKind::NonTerminal);
        table.insert("$end", SymbolKind::Terminal);
        table.insert("error", SymbolKind::Terminal);
        table
    }

    fn insert(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        let id = self.names.len() as SymbolId;
        self.names.push(name.to_string());
        self.kinds.push(kind);
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Return the id for `name`, allocating a fresh one on first sight.
    pub fn intern(&mut self, name: &str, kind: SymbolKind) -> SymbolId {
        match self.ids.get(name) {
            Some(id) => *id,
            None => self.insert(name, kind),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    pub fn kind(&self, id: SymbolId) -> SymbolKind {
        self.kinds[id as usize]
    }

    pub fn name(&self, id: SymbolId) -> &str {
        &self.names[id as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_reserved(name: &str) -> bool {
        matches!(name, "$accept" | "$end" | "error")
    }

    pub fn ids(&self) -> impl Iterator<Item = SymbolId> {
        0..self.names.len() as SymbolId
    }

    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.ids().filter(|id| self.kind(*id) == SymbolKind::Terminal)
    }

    pub fn non_terminals(&self) -> impl Iterator<Item = SymbolId> + '_ {
        self.ids()
            .filter(|id| self.kind(*id) == SymbolKind::NonTerminal)
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_symbols_are_seeded() {
        let table = SymbolTable::new();
        assert_eq!(table.lookup("$accept"), Some(ACCEPT));
        assert_eq!(table.lookup("$end"), Some(END));
        assert_eq!(table.lookup("error"), Some(ERROR));
        assert_eq!(table.kind(ACCEPT), SymbolKind::NonTerminal);
        assert_eq!(table.kind(END), SymbolKind::Terminal);
        assert_eq!(table.kind(ERROR), SymbolKind::Terminal);
    }

    #[test]
    fn test_intern_assigns_first_seen_order() {
        let mut table = SymbolTable::new();
        let expr = table.intern("Expression", SymbolKind::NonTerminal);
        let number = table.intern("NUMBER", SymbolKind::Terminal);
        assert_eq!(expr, 3);
        assert_eq!(number, 4);
        assert_eq!(table.intern("Expression", SymbolKind::NonTerminal), 3);
        assert_eq!(table.name(4), "NUMBER");
        assert_eq!(table.terminals().collect::<Vec<_>>(), vec![1, 2, 4]);
    }
}
