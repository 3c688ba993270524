use slap_codegen::GeneratedCode;

use crate::grammar::Grammar;
use crate::table::ParseTable;

/// Emits a runnable parser program from a compiled grammar and its
/// parse table.
pub trait ParserCodeGen {
    fn generate_code(&self, grammar: &Grammar, table: &ParseTable) -> GeneratedCode;
}
