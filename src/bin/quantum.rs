use std::io::Write;

use clap::Parser as CParser;
use log::error;
use quantum::Interpreter;

#[derive(CParser, Debug)]
#[command(name = "quantum", author, version, about = "Tree-walking interpreter for the Quantum (.sa) scripting language")]
struct Cli {
    /// Script to execute. Omit to start a REPL.
    file: Option<std::path::PathBuf>,

    /// Parse `file` and report diagnostics without executing it.
    #[arg(long)]
    check: bool,
}

fn main() {
    simple_logger::init_with_level(log::Level::Warn).unwrap();
    let args = Cli::parse();

    let code = match &args.file {
        Some(path) if args.check => run_check(path),
        Some(path) => run_file(path),
        None => run_repl(),
    };
    std::process::exit(code);
}

fn run_check(path: &std::path::Path) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            error!("could not read file '{}': {e}", path.display());
            return 1;
        }
    };
    match quantum::check_source(&path.to_string_lossy(), &source) {
        Ok(()) => 0,
        Err(diagnostic) => {
            eprintln!("{diagnostic}");
            1
        }
    }
}

fn run_file(path: &std::path::Path) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            error!("could not read file '{}': {e}", path.display());
            return 1;
        }
    };
    let mut interp = Interpreter::new();
    interp.run(&source)
}

fn run_repl() -> i32 {
    let mut interp = Interpreter::new();
    let stdin = std::io::stdin();
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if stdin.read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        interp.run(&line);
    }
    0
}
