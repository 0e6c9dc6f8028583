//! Module resolution.
//!
//! Maps dotted `use` paths to `.nx` files or directories, parses them once
//! and exposes their exported functions, structs and globals.

pub mod resolver;

#[cfg(test)]
mod tests;
