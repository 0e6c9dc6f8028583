/// AST (Abstract Syntax Tree) module
/// Contains all definitions related to the AST structure
///
/// Submodules:
/// - ast: The closed `Expr`/`Stmt` enums and `Program`
/// - expressions: Definitions for the expression node payloads
/// - statements: Definitions for the statement node payloads
/// - types: The `Type` enum and the compatibility relation
pub mod ast;
pub mod expressions;
pub mod statements;
pub mod types;

#[cfg(test)]
mod tests;
