use lazy_static::lazy_static;
use std::{collections::HashMap, fmt::Display};

use crate::Span;

lazy_static! {
    pub static ref RESERVED_LOOKUP: HashMap<&'static str, TokenKind> = {
        let mut map = HashMap::new();
        map.insert("let", TokenKind::Let);
        map.insert("global", TokenKind::Global);
        map.insert("func", TokenKind::Func);
        map.insert("struct", TokenKind::Struct);
        map.insert("if", TokenKind::If);
        map.insert("then", TokenKind::Then);
        map.insert("else", TokenKind::Else);
        map.insert("end", TokenKind::End);
        map.insert("while", TokenKind::While);
        map.insert("do", TokenKind::Do);
        map.insert("return", TokenKind::Return);
        map.insert("break", TokenKind::Break);
        map.insert("int", TokenKind::TypeInt);
        map.insert("float", TokenKind::TypeFloat);
        map.insert("string", TokenKind::TypeString);
        map.insert("str", TokenKind::TypeStr);
        map.insert("bool", TokenKind::TypeBool);
        map.insert("bytes", TokenKind::TypeBytes);
        map.insert("void", TokenKind::TypeVoid);
        map.insert("ref", TokenKind::Ref);
        map.insert("true", TokenKind::True);
        map.insert("false", TokenKind::False);
        map.insert("null", TokenKind::Null);
        map.insert("use", TokenKind::Use);
        map.insert("select", TokenKind::Select);
        map.insert("zeros", TokenKind::Zeros);
        map
    };
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum TokenKind {
    EOF,
    Newline,
    Int,
    Float,
    String,
    Bytes,
    FString,
    Identifier,

    OpenBracket,
    CloseBracket,
    OpenCurly,
    CloseCurly,
    OpenParen,
    CloseParen,

    Assignment, // =
    Equals,     // ==
    Not,        // !
    NotEquals,  // !=

    Less,
    LessEquals,
    Greater,
    GreaterEquals,

    Or,  // |
    And, // &

    Dot,
    Colon,
    Comma,
    Arrow,

    Plus,
    Dash,
    Slash,
    Star,
    Percent,

    // Reserved
    Let,
    Global,
    Func,
    Struct,
    If,
    Then,
    Else,
    End,
    While,
    Do,
    Return,
    Break,
    TypeInt,
    TypeFloat,
    TypeString,
    TypeStr,
    TypeBool,
    TypeBytes,
    TypeVoid,
    Ref,
    True,
    False,
    Null,
    Use,
    Select,
    Zeros,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Literal text of the token. String literals hold their unescaped contents,
    /// bytes literals one char per byte (`U+0000..=U+00FF`), f-strings their raw body.
    pub value: String,
    pub span: Span,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Token {{\nkind: {},\nvalue: {}}}", self.kind, self.value)
    }
}

impl Token {
    pub fn is_one_of_many(&self, kinds: &[TokenKind]) -> bool {
        kinds.contains(&self.kind)
    }
}
