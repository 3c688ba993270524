use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use slap::SlapError;
use slap_js_codegen::JsParserCodeGen;

#[derive(Parser, Debug)]
#[command(author, version, about = "SLR(1) parser generator", long_about = None)]
struct CommandLine {
    #[arg(required = true, help = "Path to the grammar file")]
    grammar: PathBuf,
    #[arg(short, long, help = "Write the emitted parser to this file")]
    output: Option<PathBuf>,
    #[arg(short, long, help = "Print token/type/rule/state/conflict counts")]
    stats: bool,
    #[arg(long, help = "Include per-conflict details with --stats")]
    conflicts: bool,
    #[arg(long, help = "Print the parse table grid")]
    table: bool,
    #[arg(long, help = "Dump the resolved grammar as an s-expression")]
    sexp: bool,
}

fn main() -> color_eyre::eyre::Result<ExitCode> {
    color_eyre::install()?;
    let cli = CommandLine::parse();
    Ok(match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("{}", error);
            ExitCode::FAILURE
        }
    })
}

fn run(cli: &CommandLine) -> Result<(), SlapError> {
    let text = std::fs::read_to_string(&cli.grammar)
        .map_err(|error| SlapError::io(cli.grammar.clone(), error))?;
    let spec = slap_grammar::parse_grammar_text(&text)
        .map_err(|error| SlapError::load(cli.grammar.clone(), error))?;
    let compilation = slap::compile(&spec)?;

    if cli.sexp {
        println!("{}", compilation.to_sexp());
    }
    if cli.stats {
        println!("{}", compilation.statistics());
        if cli.conflicts {
            print!("{}", compilation.conflict_report());
        }
    }
    if cli.table {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        compilation
            .write_table(&mut lock)
            .map_err(|error| SlapError::io(cli.grammar.clone(), error))?;
    }
    if let Some(output) = &cli.output {
        let generated = compilation.emit(&JsParserCodeGen::new());
        let source = generated
            .get(Path::new("parser.js"))
            .expect("the JavaScript emitter produces parser.js");
        std::fs::write(output, source)
            .map_err(|error| SlapError::io(output.clone(), error))?;
    }
    Ok(())
}
