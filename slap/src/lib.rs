use std::io::{self, Write};

use slap_grammar::GrammarSpec;
use slap_parser::analysis::GrammarAnalysis;
use slap_parser::grammar::Grammar;
use slap_parser::lr0::Automaton;
use slap_parser::symbol;
use slap_parser::table::{self, ParseTable};

mod errors;
mod statistics;

pub use errors::SlapError;
pub use slap_codegen::GeneratedCode;
pub use slap_parser::ParserCodeGen;
pub use statistics::Statistics;

/// The output of a generator run: the compiled grammar and its parse
/// table, ready for emission or inspection.
pub struct Compilation {
    grammar: Grammar,
    table: ParseTable,
}

/// Run the generation phases in order: symbol/rule/action compilation,
/// LR(0) construction, the set fixed points, SLR lookahead assignment,
/// and the parse-table build.
pub fn compile(spec: &GrammarSpec) -> Result<Compilation, SlapError> {
    let grammar = Grammar::from_spec(spec)?;
    let mut automaton = Automaton::build(&grammar);
    let analysis = GrammarAnalysis::compute(&grammar);
    automaton.assign_lookaheads(&grammar, &analysis);
    let table = ParseTable::build(&grammar, &automaton);
    Ok(Compilation { grammar, table })
}

impl Compilation {
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn table(&self) -> &ParseTable {
        &self.table
    }

    pub fn emit(&self, codegen: &dyn ParserCodeGen) -> GeneratedCode {
        codegen.generate_code(&self.grammar, &self.table)
    }

    pub fn statistics(&self) -> Statistics {
        let symbols = self.grammar.symbols();
        Statistics {
            tokens: symbols
                .terminals()
                .filter(|id| *id != symbol::END && *id != symbol::ERROR)
                .count(),
            types: symbols
                .non_terminals()
                .filter(|id| *id != symbol::ACCEPT)
                .count(),
            rules: self.grammar.rules().len() - 1,
            states: self.table.state_count(),
            conflicts: self.table.conflict_count(),
        }
    }

    pub fn conflict_report(&self) -> String {
        errors::render_conflicts(&self.grammar, &self.table)
    }

    pub fn write_table(&self, output: &mut dyn Write) -> io::Result<()> {
        table::output_table(&self.grammar, &self.table, output)
    }

    pub fn to_sexp(&self) -> String {
        self.grammar.to_sexp()
    }
}

#[cfg(test)]
mod tests {
    use slap_grammar::{ActionMode, Alternative, Assoc, GrammarSpec};

    #[test]
    fn test_compile_reports_statistics() {
        let spec = GrammarSpec::new(ActionMode::Sexp)
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
            );
        let compilation = super::compile(&spec).unwrap();
        let statistics = compilation.statistics();
        assert_eq!(statistics.tokens, 5);
        assert_eq!(statistics.types, 1);
        assert_eq!(statistics.rules, 4);
        assert_eq!(statistics.conflicts, 0);
        assert!(statistics.states > 0);
        assert!(compilation.conflict_report().is_empty());
    }

    #[test]
    fn test_sexp_dump_contains_operators_and_rules() {
        let spec = GrammarSpec::new(ActionMode::Sexp)
            .operator_row(Assoc::Left, &["+"])
            .production(
                "E",
                vec![
                    Alternative::new("NUMBER"),
                    Alternative::new("E + E").code("[\"+\",1,3]"),
                ],
            );
        let compilation = super::compile(&spec).unwrap();
        let sexp = compilation.to_sexp();
        assert!(sexp.starts_with("(grammar"));
        assert!(sexp.contains("(start E)"));
        assert!(sexp.contains("(left \"+\")"));
        assert!(sexp.contains("(rule 0 $accept (E $end))"));
        assert!(sexp.contains("(rule 2 E (E + E))"));
    }
}
