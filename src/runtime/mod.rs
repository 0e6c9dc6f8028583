//! Runtime model shared by the evaluator and the native functions.
//!
//! - value: runtime values, references and f-string formatting
//! - environment: lexical scopes, function homes and module namespaces

pub mod environment;
pub mod value;

#[cfg(test)]
mod tests;
