use std::collections::BTreeMap;

use slap_grammar::{Alternative, Assoc, GrammarSpec};

use crate::action::{self, ActionBody};
use crate::grammar::{Grammar, GrammarError, Operator, Rule};
use crate::symbol::{SymbolId, SymbolKind, SymbolTable, ACCEPT, END};

/// Builds the compiled [`Grammar`] from a [`GrammarSpec`]: interning,
/// rule numbering, precedence assignment, action compilation, and the
/// accept-rule augmentation.
pub struct GrammarBuilder<'spec> {
    spec: &'spec GrammarSpec,
    symbols: SymbolTable,
    rules: Vec<Rule>,
    rules_of: BTreeMap<SymbolId, Vec<u32>>,
    actions: Vec<ActionBody>,
    action_ids: BTreeMap<ActionBody, usize>,
    operator_rows: BTreeMap<String, (Assoc, u16)>,
}

impl<'spec> GrammarBuilder<'spec> {
    pub fn new(spec: &'spec GrammarSpec) -> Result<Self, GrammarError> {
        if spec.productions.is_empty() {
            return Err(GrammarError::NoRules);
        }
        for production in &spec.productions {
            if SymbolTable::is_reserved(&production.name) {
                return Err(GrammarError::ReservedName(production.name.clone()));
            }
        }
        let mut operator_rows = BTreeMap::new();
        for (row, (assoc, tokens)) in spec.operators.iter().enumerate() {
            for token in tokens {
                let level = row as u16 + 1;
                if operator_rows.insert(token.clone(), (*assoc, level)).is_some() {
                    return Err(GrammarError::DuplicateOperator(token.clone()));
                }
            }
        }
        Ok(GrammarBuilder {
            spec,
            symbols: SymbolTable::new(),
            rules: Vec::new(),
            rules_of: BTreeMap::new(),
            actions: Vec::new(),
            action_ids: BTreeMap::new(),
            operator_rows,
        })
    }

    pub fn build(mut self) -> Result<Grammar, GrammarError> {
        let spec = self.spec;
        let start_name = match &spec.start {
            Some(name) => name.clone(),
            None => spec.productions[0].name.clone(),
        };
        if !spec.defines(&start_name) {
            return Err(GrammarError::UndefinedStart(start_name));
        }

        // rule 0 is the accept rule; its right-hand side is patched once
        // the start symbol has an id
        self.rules.push(Rule::new(0, ACCEPT, Vec::new(), 0, None));
        self.rules_of.insert(ACCEPT, vec![0]);

        for production in &spec.productions {
            let lhs = self.intern(&production.name);
            for alternative in &production.alternatives {
                self.add_rule(lhs, &production.name, alternative)?;
            }
        }

        // operator tokens that never occur in a rule still need ids
        let rows: Vec<(String, Assoc, u16)> = self
            .operator_rows
            .iter()
            .map(|(name, (assoc, level))| (name.clone(), *assoc, *level))
            .collect();
        let mut operators = BTreeMap::new();
        for (name, assoc, level) in rows {
            let id = self.intern(&name);
            operators.insert(id, Operator { assoc, level });
        }

        let start = self
            .symbols
            .lookup(&start_name)
            .expect("start symbol interned with its production");
        self.rules[0] = Rule::new(0, ACCEPT, vec![start, END], 0, None);

        Ok(Grammar::new(
            self.symbols,
            self.rules,
            self.rules_of,
            operators,
            self.actions,
            start,
            spec.parse_params.clone(),
        ))
    }

    fn add_rule(
        &mut self,
        lhs: SymbolId,
        production: &str,
        alternative: &Alternative,
    ) -> Result<(), GrammarError> {
        let (names, aliases) = split_aliases(&alternative.pattern);
        let rhs: Vec<SymbolId> = names.iter().map(|name| self.intern(name)).collect();
        let prec = self.rule_precedence(alternative, &names);
        let body = action::compile(self.spec.mode, &alternative.action, &names, &aliases)
            .map_err(|error| GrammarError::UnsupportedAction {
                production: production.to_string(),
                template: error.template,
            })?;
        let action = self.intern_action(body);
        let id = self.rules.len() as u32;
        self.rules.push(Rule::new(id, lhs, rhs, prec, Some(action)));
        self.rules_of.entry(lhs).or_default().push(id);
        Ok(())
    }

    fn intern(&mut self, name: &str) -> SymbolId {
        let kind = if self.spec.defines(name) {
            SymbolKind::NonTerminal
        } else {
            SymbolKind::Terminal
        };
        self.symbols.intern(name, kind)
    }

    fn intern_action(&mut self, body: ActionBody) -> usize {
        match self.action_ids.get(&body) {
            Some(id) => *id,
            None => {
                let id = self.actions.len();
                self.actions.push(body.clone());
                self.action_ids.insert(body, id);
                id
            }
        }
    }

    /// Rule precedence: an explicit `%prec` operator wins, otherwise the
    /// rightmost operator terminal of the right-hand side, otherwise 0.
    fn rule_precedence(&self, alternative: &Alternative, names: &[String]) -> u16 {
        if let Some(token) = &alternative.prec {
            if let Some((_, level)) = self.operator_rows.get(token) {
                return *level;
            }
        }
        for name in names.iter().rev() {
            if self.spec.defines(name) {
                continue;
            }
            if let Some((_, level)) = self.operator_rows.get(name) {
                return *level;
            }
        }
        0
    }
}

/// Strip inline `[alias]` suffixes from pattern tokens. Aliases are kept
/// per position for jison-mode action rewriting.
fn split_aliases(pattern: &[String]) -> (Vec<String>, Vec<Option<String>>) {
    let mut names = Vec::with_capacity(pattern.len());
    let mut aliases = Vec::with_capacity(pattern.len());
    for token in pattern {
        match token.find('[') {
            Some(open) if token.ends_with(']') => {
                names.push(token[..open].to_string());
                aliases.push(Some(token[open + 1..token.len() - 1].to_string()));
            }
            _ => {
                names.push(token.clone());
                aliases.push(None);
            }
        }
    }
    (names, aliases)
}
