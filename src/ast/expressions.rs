use std::fmt::Display;

use crate::Span;

use super::ast::Expr;

#[derive(Debug, Clone)]
pub struct IntExpr {
    pub value: i64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct FloatExpr {
    pub value: f64,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct StringExpr {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BytesExpr {
    pub value: Vec<u8>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct BoolExpr {
    pub value: bool,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct NullExpr {
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct SymbolExpr {
    pub value: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Greater,
    GreaterEquals,
    Less,
    LessEquals,
    Equals,
    NotEquals,
    And,
    Or,
}

impl BinaryOperator {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Greater
                | BinaryOperator::GreaterEquals
                | BinaryOperator::Less
                | BinaryOperator::LessEquals
        )
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, BinaryOperator::Equals | BinaryOperator::NotEquals)
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::Greater => ">",
            BinaryOperator::GreaterEquals => ">=",
            BinaryOperator::Less => "<",
            BinaryOperator::LessEquals => "<=",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
        };
        write!(f, "{}", symbol)
    }
}

#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub left: Box<Expr>,
    pub operator: BinaryOperator,
    pub right: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Negate,
    Not,
}

impl Display for PrefixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixOperator::Negate => write!(f, "-"),
            PrefixOperator::Not => write!(f, "!"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PrefixExpr {
    pub operator: PrefixOperator,
    pub right_expr: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct CallExpr {
    pub callee: Box<Expr>,
    pub arguments: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub object: Box<Expr>,
    pub index: Box<Expr>,
    pub span: Span,
}

/// `object.property`, a struct field or a namespace member.
#[derive(Debug, Clone)]
pub struct MemberExpr {
    pub object: Box<Expr>,
    pub property: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ArrayLiteralExpr {
    pub elements: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MapLiteralExpr {
    pub entries: Vec<(Expr, Expr)>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct RefExpr {
    pub target: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ZerosExpr {
    pub size: Box<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum FStringPart {
    Text(String),
    Expr {
        expr: Expr,
        format_spec: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct FStringExpr {
    pub parts: Vec<FStringPart>,
    pub span: Span,
}
