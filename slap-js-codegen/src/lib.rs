use std::io::{self, Write};
use std::path::Path;

use slap_codegen::{GeneratedCode, Template};
use slap_parser::action::{ActionBody, ActionTok};
use slap_parser::grammar::Grammar;
use slap_parser::table::{ParseTable, TableEntry};
use slap_parser::ParserCodeGen;

/// Emits the compiled tables and action dispatch into a self-contained
/// JavaScript parser module built around the embedded driver template.
pub struct JsParserCodeGen {
    driver_template: Template<'static>,
}

impl JsParserCodeGen {
    pub fn new() -> Self {
        JsParserCodeGen {
            driver_template: Template::new(include_str!("driver.js.tpl")),
        }
    }
}

impl Default for JsParserCodeGen {
    fn default() -> Self {
        Self::new()
    }
}

struct CodeWriter<'parser> {
    grammar: &'parser Grammar,
    table: &'parser ParseTable,
}

impl<'parser> CodeWriter<'parser> {
    /// `{"$accept":0,"$end":1,...}`: every symbol name to its id; the
    /// runtime uses it to normalize tokens the lexer names by string.
    fn write_symbols(&self, output: &mut dyn Write) -> io::Result<()> {
        write!(output, "{{")?;
        for (i, id) in self.grammar.symbols().ids().enumerate() {
            if i > 0 {
                write!(output, ",")?;
            }
            write!(
                output,
                "{}:{}",
                js_string(self.grammar.symbols().name(id)),
                id
            )?;
        }
        write!(output, "}}")
    }

    /// `{1:"$end",...}`: terminal ids back to names, for error reports.
    fn write_terminals(&self, output: &mut dyn Write) -> io::Result<()> {
        write!(output, "{{")?;
        for (i, id) in self.grammar.symbols().terminals().enumerate() {
            if i > 0 {
                write!(output, ",")?;
            }
            write!(
                output,
                "{}:{}",
                id,
                js_string(self.grammar.symbols().name(id))
            )?;
        }
        write!(output, "}}")
    }

    /// `[[lhs,len],...]` indexed by rule id.
    fn write_productions(&self, output: &mut dyn Write) -> io::Result<()> {
        write!(output, "[")?;
        for (i, (lhs, len)) in self.grammar.rule_table().enumerate() {
            if i > 0 {
                write!(output, ",")?;
            }
            write!(output, "[{},{}]", lhs, len)?;
        }
        write!(output, "]")
    }

    /// One object per state. Goto entries are bare state numbers; shift,
    /// reduce and accept use the tuple encoding `[1,s]`/`[2,r]`/`[3]`;
    /// the nonassoc poison entry is `0`.
    fn write_table(&self, output: &mut dyn Write) -> io::Result<()> {
        writeln!(output, "[")?;
        for state in 0..self.table.state_count() {
            if state > 0 {
                writeln!(output, ",")?;
            }
            write!(output, "  {{")?;
            for (i, (symbol, entry)) in self.table.row(state as u32).iter().enumerate() {
                if i > 0 {
                    write!(output, ",")?;
                }
                write!(output, "{}:", symbol)?;
                match entry {
                    TableEntry::Shift(target) => write!(output, "[1,{}]", target)?,
                    TableEntry::Goto(target) => write!(output, "{}", target)?,
                    TableEntry::Reduce(rule) => write!(output, "[2,{}]", rule)?,
                    TableEntry::Accept => write!(output, "[3]")?,
                    TableEntry::NonAssoc => write!(output, "0")?,
                }
            }
            write!(output, "}}")?;
        }
        write!(output, "\n]")
    }

    fn write_default_actions(&self, output: &mut dyn Write) -> io::Result<()> {
        write!(output, "{{")?;
        for (i, (state, rule)) in self.table.defaults().iter().enumerate() {
            if i > 0 {
                write!(output, ",")?;
            }
            write!(output, "{}:[2,{}]", state, rule)?;
        }
        write!(output, "}}")
    }

    /// The `performAction` dispatch: rules sharing a compiled body share
    /// one case arm.
    fn write_action_cases(&self, output: &mut dyn Write) -> io::Result<()> {
        for (body, rules) in self.grammar.action_groups() {
            write!(output, "      ")?;
            for rule in rules {
                write!(output, "case {}: ", rule)?;
            }
            writeln!(output)?;
            writeln!(output, "        {}", render_body(body))?;
            writeln!(output, "        break;")?;
        }
        Ok(())
    }

    /// Extra parameter names threaded into the action signature.
    fn write_action_params(&self, output: &mut dyn Write) -> io::Result<()> {
        for param in self.grammar.parse_params() {
            write!(output, ", {}", param)?;
        }
        Ok(())
    }
}

impl ParserCodeGen for JsParserCodeGen {
    fn generate_code(&self, grammar: &Grammar, table: &ParseTable) -> GeneratedCode {
        let writer = CodeWriter { grammar, table };
        let mut generated = GeneratedCode::new();
        generated
            .add(Path::new("parser.js"), |output| {
                let mut template = self.driver_template.writer();
                template.substitute("symbols", |out| writer.write_symbols(out));
                template.substitute("terminals", |out| writer.write_terminals(out));
                template.substitute("productions", |out| writer.write_productions(out));
                template.substitute("table", |out| writer.write_table(out));
                template.substitute("default_actions", |out| writer.write_default_actions(out));
                template.substitute("action_cases", |out| writer.write_action_cases(out));
                template.substitute("action_params", |out| writer.write_action_params(out));
                template.substitute("action_args", |out| writer.write_action_params(out));
                template.write(output)
            })
            .expect("emission into an in-memory buffer failed");
        generated
    }
}

/// Render a compiled action body as the text of a JavaScript statement
/// sequence. `$` is the value stack, `_$` the location stack and `$0`
/// the top-of-stack index; the body runs with `this` bound to the
/// parser's result slot.
fn render_body(body: &ActionBody) -> String {
    let mut out = String::new();
    for tok in body.toks() {
        match tok {
            ActionTok::Literal(text) => out.push_str(text),
            ActionTok::PositionRef(k) => out.push_str(&stack_ref("$", *k)),
            ActionTok::LocRef(k) => out.push_str(&stack_ref("_$", *k)),
            ActionTok::ResultRef => out.push_str("this.$"),
            ActionTok::ResultLoc => out.push_str("this._$"),
        }
    }
    out
}

fn stack_ref(stack: &str, offset: i32) -> String {
    if offset == 0 {
        format!("{}[$0]", stack)
    } else if offset > 0 {
        format!("{}[$0 - {}]", stack, offset)
    } else {
        format!("{}[$0 + {}]", stack, -offset)
    }
}

fn js_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for c in text.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('"');
    out
}
