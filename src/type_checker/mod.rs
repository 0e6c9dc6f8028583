//! Static type checking.
//!
//! The checker runs in two phases over a parsed program:
//!
//! - Phase 1 processes `use` statements and registers struct and function
//!   declarations, so they may be referenced before they appear
//! - Phase 2 walks every statement, checking expressions against declared
//!   types and stopping at the first error
//!
//! Imported modules are checked once each, through the resolver shared with
//! the evaluator.

pub mod type_checker;

#[cfg(test)]
mod tests;
