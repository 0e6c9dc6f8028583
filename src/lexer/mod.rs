//! Lexical analysis module.
//!
//! This module turns Noxy source text into a stream of tokens. It handles:
//!
//! - Keyword and identifier recognition
//! - Integer and float literals
//! - String, bytes and f-string literals with escape sequences
//! - Operators and punctuation
//! - Significant newlines, comments and whitespace

pub mod lexer;
pub mod tokens;

#[cfg(test)]
mod tests;
