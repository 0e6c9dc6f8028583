//! Tree-walking evaluator.
//!
//! Statements and expressions are executed by free functions over a shared
//! [`interpreter::Interpreter`], which owns the scope chain, the loaded module
//! namespaces and the native context.

pub mod expr;
pub mod interpreter;
pub mod stmt;
