use std::{fs, path::PathBuf, process::ExitCode, thread};

use clap::Parser;
use noxy::{config::Config, display_error, init_tracing, run_file};

/// Stack for the evaluator thread; deep recursion in Noxy programs is deep
/// recursion in the evaluator.
const EVALUATOR_STACK_SIZE: usize = 256 * 1024 * 1024;

#[derive(Parser, Debug)]
#[command(name = "noxy")]
#[command(about = "Type checks and runs Noxy programs")]
struct Cli {
    /// Path to the `.nx` program to run
    file: PathBuf,

    /// Standard library directory, overriding NOXY_STDLIB
    #[arg(long)]
    stdlib: Option<PathBuf>,

    /// Skip static type checking
    #[arg(long)]
    no_check: bool,

    /// Log every phase to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "warn" });

    let evaluator = thread::Builder::new()
        .name(String::from("noxy"))
        .stack_size(EVALUATOR_STACK_SIZE)
        .spawn(move || run(cli));

    match evaluator.map(|handle| handle.join()) {
        Ok(Ok(code)) => code,
        _ => {
            eprintln!("noxy: the evaluator thread stopped unexpectedly");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> ExitCode {
    let config = Config::for_entry(&cli.file)
        .with_stdlib(cli.stdlib)
        .with_type_check(!cli.no_check);

    match run_file(&cli.file, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Errors from imported modules point into their own file.
            let file = error.get_position().file.to_string();
            let source = fs::read_to_string(&file).ok();
            display_error(&error, source.as_deref());
            ExitCode::FAILURE
        }
    }
}
