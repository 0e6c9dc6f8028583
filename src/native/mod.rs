//! Native functions callable from Noxy programs.
//!
//! - [`registry`]: signatures, callables and the resources natives share
//! - [`builtins`]: printing, conversions and container helpers
//! - [`strings`]: string helpers behind `stdlib/strings.nx`
//! - [`io`]: files behind `stdlib/io.nx`

pub mod builtins;
pub mod io;
pub mod registry;
pub mod strings;

#[cfg(test)]
mod tests;
