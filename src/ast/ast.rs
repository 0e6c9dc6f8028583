use std::rc::Rc;

use crate::Span;

use super::{
    expressions::{
        ArrayLiteralExpr, BinaryExpr, BoolExpr, BytesExpr, CallExpr, FStringExpr, FloatExpr,
        IndexExpr, IntExpr, MapLiteralExpr, MemberExpr, NullExpr, PrefixExpr, RefExpr, StringExpr,
        SymbolExpr, ZerosExpr,
    },
    statements::{
        AssignmentStmt, BreakStmt, ExpressionStmt, FnDecl, GlobalDecl, IfStmt,
        ReturnStmt, StructDecl, UseStmt, VarDeclStmt, WhileStmt,
    },
};

#[derive(Debug, Clone)]
pub enum Expr {
    Int(IntExpr),
    Float(FloatExpr),
    String(StringExpr),
    Bytes(BytesExpr),
    Bool(BoolExpr),
    Null(NullExpr),
    Symbol(SymbolExpr),
    Binary(BinaryExpr),
    Prefix(PrefixExpr),
    Call(CallExpr),
    Index(IndexExpr),
    Member(MemberExpr),
    ArrayLiteral(ArrayLiteralExpr),
    MapLiteral(MapLiteralExpr),
    Ref(RefExpr),
    Zeros(ZerosExpr),
    FString(FStringExpr),
}

impl Expr {
    pub fn get_span(&self) -> &Span {
        match self {
            Expr::Int(expr) => &expr.span,
            Expr::Float(expr) => &expr.span,
            Expr::String(expr) => &expr.span,
            Expr::Bytes(expr) => &expr.span,
            Expr::Bool(expr) => &expr.span,
            Expr::Null(expr) => &expr.span,
            Expr::Symbol(expr) => &expr.span,
            Expr::Binary(expr) => &expr.span,
            Expr::Prefix(expr) => &expr.span,
            Expr::Call(expr) => &expr.span,
            Expr::Index(expr) => &expr.span,
            Expr::Member(expr) => &expr.span,
            Expr::ArrayLiteral(expr) => &expr.span,
            Expr::MapLiteral(expr) => &expr.span,
            Expr::Ref(expr) => &expr.span,
            Expr::Zeros(expr) => &expr.span,
            Expr::FString(expr) => &expr.span,
        }
    }

    /// A short human readable description used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::Symbol(symbol) => symbol.value.clone(),
            Expr::Member(member) => format!("{}.{}", member.object.describe(), member.property),
            Expr::Call(_) => String::from("call result"),
            Expr::Index(_) => String::from("index expression"),
            _ => String::from("expression"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl(VarDeclStmt),
    GlobalDecl(GlobalDecl),
    Assignment(AssignmentStmt),
    Expression(ExpressionStmt),
    If(IfStmt),
    While(WhileStmt),
    Return(ReturnStmt),
    Break(BreakStmt),
    FnDecl(FnDecl),
    StructDecl(StructDecl),
    Use(Rc<UseStmt>),
}

impl Stmt {
    pub fn get_span(&self) -> &Span {
        match self {
            Stmt::VarDecl(stmt) => &stmt.span,
            Stmt::GlobalDecl(stmt) => &stmt.span,
            Stmt::Assignment(stmt) => &stmt.span,
            Stmt::Expression(stmt) => &stmt.span,
            Stmt::If(stmt) => &stmt.span,
            Stmt::While(stmt) => &stmt.span,
            Stmt::Return(stmt) => &stmt.span,
            Stmt::Break(stmt) => &stmt.span,
            Stmt::FnDecl(stmt) => &stmt.span,
            Stmt::StructDecl(stmt) => &stmt.span,
            Stmt::Use(stmt) => &stmt.span,
        }
    }
}

/// A parsed source file.
#[derive(Debug, Clone)]
pub struct Program {
    pub body: Vec<Stmt>,
    pub file: Rc<String>,
}
