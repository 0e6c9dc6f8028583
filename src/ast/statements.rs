use std::{rc::Rc, slice::Iter};

use crate::Span;

use super::{ast::{Expr, Stmt}, types::Type};

#[derive(Debug, Clone)]
pub struct BlockStmt {
    pub body: Vec<Stmt>,
    pub span: Span,
}

impl BlockStmt {
    pub fn iter(&self) -> Iter<'_, Stmt> {
        self.body.iter()
    }
}

#[derive(Debug, Clone)]
pub struct ExpressionStmt {
    pub expression: Expr,
    pub span: Span,
}

/// `let name: T [= value]`. Without a value the variable starts at the type's default.
#[derive(Debug, Clone)]
pub struct VarDeclStmt {
    pub identifier: String,
    pub explicit_type: Type,
    pub assigned_value: Option<Expr>,
    pub span: Span,
}

/// `global name: T = value`
#[derive(Debug, Clone)]
pub struct GlobalDeclStmt {
    pub identifier: String,
    pub explicit_type: Type,
    pub assigned_value: Expr,
    pub span: Span,
}

/// `target = value` where target is a symbol, a member or an index expression.
#[derive(Debug, Clone)]
pub struct AssignmentStmt {
    pub assignee: Expr,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub condition: Expr,
    pub then_body: BlockStmt,
    pub else_body: Option<BlockStmt>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub condition: Expr,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BreakStmt {
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub type_: Type,
}

#[derive(Debug, Clone)]
pub struct FnDeclStmt {
    pub identifier: String,
    pub parameters: Vec<Parameter>,
    pub return_type: Type,
    pub body: BlockStmt,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StructField {
    pub name: String,
    pub type_: Type,
}

#[derive(Debug, Clone)]
pub struct StructDeclStmt {
    pub identifier: String,
    pub fields: Vec<StructField>,
    pub span: Span,
}

impl StructDeclStmt {
    pub fn field(&self, name: &str) -> Option<&StructField> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSelection {
    /// `use a.b select *`
    All,
    /// `use a.b select x, y`
    Names(Vec<String>),
    /// `use a.b`, binds the namespace `b`
    Namespace,
}

#[derive(Debug, Clone)]
pub struct UseStmt {
    pub path: Vec<String>,
    pub selection: ImportSelection,
    pub span: Span,
}

impl UseStmt {
    pub fn dotted_path(&self) -> String {
        self.path.join(".")
    }
}

/// Declarations that are shared between the resolver, the checker and the
/// evaluator are reference counted so registering them never clones a body.
pub type FnDecl = Rc<FnDeclStmt>;
pub type StructDecl = Rc<StructDeclStmt>;
pub type GlobalDecl = Rc<GlobalDeclStmt>;
