//! pascvm
//!
//! Compiles a Pascal source file to EWVM code, or runs an interactive
//! session when no file is given.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Parser;
use log::LevelFilter;
use pascvm::{CompileError, CompileOptions, Compiler};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

#[derive(Debug, Parser)]
#[command(name = "pascvm", version, about = "Compile a Pascal subset to EWVM code")]
struct Cli {
    /// Source file; starts an interactive session when omitted
    file: Option<PathBuf>,

    /// Write the generated code here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Print the parsed AST to stderr
    #[arg(long)]
    ast: bool,

    /// Skip the constant array index bound checks
    #[arg(long)]
    no_range_checks: bool,

    /// Raise log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let compiler = Compiler::new(CompileOptions {
        range_checks: !cli.no_range_checks,
    });

    let result = match &cli.file {
        Some(path) => run_file(&compiler, &cli, path),
        None => run_repl(&compiler, &cli),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    // RUST_LOG takes precedence over -v
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

/// Compile one source text and emit the result
///
/// Returns `Ok(false)` when the source had problems; these were already
/// reported on stderr.
fn compile_and_emit(compiler: &Compiler, cli: &Cli, source: &str) -> Result<bool> {
    match compiler.compile(source) {
        Ok(compilation) => {
            if cli.ast {
                eprintln!("{:#?}", compilation.program);
            }
            let text = compilation.render();
            match &cli.output {
                Some(path) => fs::write(path, text)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => print!("{}", text),
            }
            Ok(true)
        }
        Err(CompileError::Diagnostics(diagnostics)) => {
            for diagnostic in &diagnostics {
                eprintln!("{}", diagnostic);
            }
            eprintln!("Translation failed due to parsing errors.");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

fn run_file(compiler: &Compiler, cli: &Cli, path: &Path) -> Result<bool> {
    let source =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    log::info!("compiling {}", path.display());
    compile_and_emit(compiler, cli, &source)
}

/// Whether a buffered program looks finished
fn is_complete(line: &str) -> bool {
    line.trim_end().ends_with("end.")
}

fn run_repl(compiler: &Compiler, cli: &Cli) -> Result<bool> {
    println!("pascvm - Pascal to EWVM");
    println!("Enter a program; it is compiled after 'end.' or a blank line. Ctrl+D to exit.\n");

    let mut editor = DefaultEditor::new().context("starting line editor")?;
    let mut buffer = String::new();
    let mut all_ok = true;

    loop {
        let prompt = if buffer.is_empty() { "> " } else { ". " };
        match editor.readline(prompt) {
            Ok(line) => {
                let blank = line.trim().is_empty();
                if !blank {
                    let _ = editor.add_history_entry(line.as_str());
                    buffer.push_str(&line);
                    buffer.push('\n');
                }
                if buffer.is_empty() || !(blank || is_complete(&line)) {
                    continue;
                }
                all_ok &= compile_and_emit(compiler, cli, &buffer)?;
                buffer.clear();
            }
            Err(ReadlineError::Interrupted) => {
                buffer.clear();
            }
            Err(ReadlineError::Eof) => {
                if !buffer.trim().is_empty() {
                    all_ok &= compile_and_emit(compiler, cli, &buffer)?;
                }
                println!();
                break;
            }
            Err(e) => return Err(e).context("reading input"),
        }
    }
    Ok(all_ok)
}
