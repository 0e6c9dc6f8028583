//! Error types and error handling for the interpreter.
//!
//! This module defines the error types used by every phase, from
//! tokenizing to evaluation. It includes:
//!
//! - Error structures with `file:line:column` information
//! - Specific error variants for each phase, grouped into error kinds
//! - Error formatting and display functionality
//! - Helpful error messages and suggestions

pub mod errors;

#[cfg(test)]
mod tests;
