#![allow(clippy::module_inception)]

use std::{fmt::Display, fs, io::Write, path::Path, rc::Rc, sync::Once, time::Instant};

use tracing::info;

use crate::{
    config::Config,
    errors::errors::{Error, ErrorImpl, ErrorTip},
    interpreter::interpreter::Interpreter,
    lexer::lexer::tokenize,
    modules::resolver::ModuleResolver,
    native::registry::NativeRegistry,
    parser::parser::parse,
    type_checker::type_checker::type_check,
};

pub mod ast;
pub mod config;
pub mod errors;
pub mod interpreter;
pub mod lexer;
pub mod macros;
pub mod modules;
pub mod native;
pub mod parser;
pub mod runtime;
pub mod type_checker;

extern crate regex;

/// A location in a source file. Lines and columns are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub file: Rc<String>,
}

impl Position {
    pub fn new(line: u32, column: u32, file: Rc<String>) -> Self {
        Position { line, column, file }
    }

    pub fn null() -> Self {
        Position::new(0, 0, Rc::new(String::from("<null>")))
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Span { start, end }
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the global `tracing` subscriber. `RUST_LOG` wins over `default_level`.
pub fn init_tracing(default_level: &str) {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_level));
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_level(true).with_writer(std::io::stderr))
            .with(filter)
            .init();
    });
}

/// Tokenizes, parses, checks and runs a program held in memory.
///
/// The resolver and native registry are created fresh for every run, so module
/// caches and open file handles never leak between programs.
pub fn run_source(
    source: String,
    file_name: &str,
    config: &Config,
    output: Box<dyn Write>,
) -> Result<(), Error> {
    let start = Instant::now();
    let tokens = tokenize(source, Some(String::from(file_name)))?;
    info!("Tokenized in {:?}", start.elapsed());

    let parse_start = Instant::now();
    let program = parse(tokens, Rc::new(String::from(file_name)))?;
    info!("Parsed in {:?}", parse_start.elapsed());

    let resolver = Rc::new(ModuleResolver::new(
        config.base_path.clone(),
        config.stdlib_path.clone(),
    ));
    let natives = Rc::new(NativeRegistry::with_defaults());

    if config.type_check {
        let check_start = Instant::now();
        type_check(&program, Rc::clone(&resolver), Rc::clone(&natives))?;
        info!("Type checked in {:?}", check_start.elapsed());
    }

    let run_start = Instant::now();
    let mut interpreter = Interpreter::new(resolver, natives, output);
    interpreter.run(&program)?;
    info!("Executed in {:?}", run_start.elapsed());

    Ok(())
}

/// Reads `path` and runs it with [`run_source`], writing program output to stdout.
pub fn run_file(path: &Path, config: &Config) -> Result<(), Error> {
    let file_name = path.to_string_lossy().to_string();
    let source = fs::read_to_string(path).map_err(|err| {
        Error::new(
            ErrorImpl::ModuleReadError {
                path: file_name.clone(),
                message: err.to_string(),
            },
            Position::new(0, 0, Rc::new(file_name.clone())),
        )
    })?;

    run_source(source, &file_name, config, Box::new(std::io::stdout()))
}

/// Returns the text of the 1-based `line` in `source`, without its line terminator.
pub fn get_line_at_position(source: &str, line: u32) -> Option<String> {
    if line == 0 {
        return None;
    }

    source
        .split('\n')
        .nth((line - 1) as usize)
        .map(|text| text.trim_end_matches('\r').to_string())
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_get_line_at_position() {
        let source = "Hello, world!\nlet a: int = 1\r\n\nTesting { }\n";

        assert_eq!(
            super::get_line_at_position(source, 1),
            Some(String::from("Hello, world!"))
        );
        assert_eq!(
            super::get_line_at_position(source, 2),
            Some(String::from("let a: int = 1"))
        );
        assert_eq!(
            super::get_line_at_position(source, 4),
            Some(String::from("Testing { }"))
        );
        assert_eq!(super::get_line_at_position(source, 0), None);
        assert_eq!(super::get_line_at_position(source, 9), None);
    }

    #[test]
    fn test_position_display() {
        let position = super::Position::new(3, 7, std::rc::Rc::new(String::from("main.nx")));
        assert_eq!(position.to_string(), "main.nx:3:7");
    }
}

/// Renders an error to stderr as `file:line:column: Kind: message` followed by the
/// offending source line when `source` is available.
pub fn display_error(error: &Error, source: Option<&str>) {
    /*
        main.nx:20:9: TypeError: expected type `int`, received `string`
           |
        20 | let a: int = "x"
           | -------------^
    */

    let position = error.get_position();

    if let ErrorTip::None = error.get_tip() {
        eprintln!("{}", error);
    } else {
        eprintln!("{} ({})", error, error.get_tip());
    }

    let Some(line_text) = source.and_then(|source| get_line_at_position(source, position.line))
    else {
        return;
    };

    let line_string = position.line.to_string();
    let padding = line_string.len() + 2;

    eprintln!("{:>padding$}", "|");

    let (line_text_removed, removed_whitespace) = remove_starting_whitespace(&line_text);
    eprintln!("{} | {}", line_string, line_text_removed.trim_end());

    let arrows = (position.column as usize)
        .saturating_sub(removed_whitespace)
        .max(1);

    eprintln!("{:>padding$} {:->arrows$}", "|", "^");
}

fn remove_starting_whitespace(string: &str) -> (String, usize) {
    let mut start = 0;
    for c in string.chars() {
        if c == ' ' || c == '\t' {
            start += 1;
        } else {
            break;
        }
    }

    (String::from(&string[start..]), start)
}
