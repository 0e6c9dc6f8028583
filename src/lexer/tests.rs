//! Unit tests for the lexer module.
//!
//! This module contains tests for tokenization including:
//! - Keywords and identifiers
//! - Numeric literals (integers and floats)
//! - String, bytes and f-string literals with escape sequences
//! - Operators and punctuation
//! - Newlines, comments and positions
//! - Error cases

use pretty_assertions::assert_eq;

use super::{lexer::tokenize, tokens::TokenKind};
use crate::errors::errors::ErrorKind;

fn kinds(source: &str) -> Vec<TokenKind> {
    tokenize(source.to_string(), Some("test.nx".to_string()))
        .unwrap()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

#[test]
fn test_tokenize_keywords() {
    let source = "let global func struct if then else end while do return break use select zeros ref";
    assert_eq!(
        kinds(source),
        vec![
            TokenKind::Let,
            TokenKind::Global,
            TokenKind::Func,
            TokenKind::Struct,
            TokenKind::If,
            TokenKind::Then,
            TokenKind::Else,
            TokenKind::End,
            TokenKind::While,
            TokenKind::Do,
            TokenKind::Return,
            TokenKind::Break,
            TokenKind::Use,
            TokenKind::Select,
            TokenKind::Zeros,
            TokenKind::Ref,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_type_keywords() {
    assert_eq!(
        kinds("int float string str bool bytes void"),
        vec![
            TokenKind::TypeInt,
            TokenKind::TypeFloat,
            TokenKind::TypeString,
            TokenKind::TypeStr,
            TokenKind::TypeBool,
            TokenKind::TypeBytes,
            TokenKind::TypeVoid,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_identifiers() {
    let tokens = tokenize("foo _bar baz42 endless".to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Identifier);
    assert_eq!(tokens[0].value, "foo");
    assert_eq!(tokens[1].value, "_bar");
    assert_eq!(tokens[2].value, "baz42");
    assert_eq!(tokens[3].kind, TokenKind::Identifier);
    assert_eq!(tokens[3].value, "endless");
}

#[test]
fn test_tokenize_numbers() {
    let tokens = tokenize("42 3.14 0 7.".to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Int);
    assert_eq!(tokens[0].value, "42");
    assert_eq!(tokens[1].kind, TokenKind::Float);
    assert_eq!(tokens[1].value, "3.14");
    assert_eq!(tokens[2].kind, TokenKind::Int);
    // `7.` is an int followed by a dot, floats need digits on both sides.
    assert_eq!(tokens[3].kind, TokenKind::Int);
    assert_eq!(tokens[4].kind, TokenKind::Dot);
}

#[test]
fn test_tokenize_strings() {
    let tokens = tokenize("\"hello\" \"\"".to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::String);
    assert_eq!(tokens[0].value, "hello");
    assert_eq!(tokens[1].kind, TokenKind::String);
    assert_eq!(tokens[1].value, "");
}

#[test]
fn test_tokenize_string_escapes() {
    let tokens = tokenize(r#""a\nb\t\"q\" \x41 \q""#.to_string(), None).unwrap();

    assert_eq!(tokens[0].value, "a\nb\t\"q\" A \\q");
}

#[test]
fn test_tokenize_bytes() {
    let tokens = tokenize(r#"b"hi\x00\xff" b'é'"#.to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::Bytes);
    let bytes: Vec<u8> = tokens[0].value.chars().map(|c| c as u32 as u8).collect();
    assert_eq!(bytes, vec![b'h', b'i', 0, 255]);

    let bytes: Vec<u8> = tokens[1].value.chars().map(|c| c as u32 as u8).collect();
    assert_eq!(bytes, "é".as_bytes().to_vec());
}

#[test]
fn test_tokenize_fstring_keeps_raw_body() {
    let tokens = tokenize(r#"f"x = {x:05} {m["k"]}""#.to_string(), None).unwrap();

    assert_eq!(tokens[0].kind, TokenKind::FString);
    assert_eq!(tokens[0].value, r#"x = {x:05} {m["k"]}"#);
    assert_eq!(tokens[1].kind, TokenKind::EOF);
}

#[test]
fn test_tokenize_operators() {
    assert_eq!(
        kinds("+ - * / % == != < <= > >= & | ! = ->"),
        vec![
            TokenKind::Plus,
            TokenKind::Dash,
            TokenKind::Star,
            TokenKind::Slash,
            TokenKind::Percent,
            TokenKind::Equals,
            TokenKind::NotEquals,
            TokenKind::Less,
            TokenKind::LessEquals,
            TokenKind::Greater,
            TokenKind::GreaterEquals,
            TokenKind::And,
            TokenKind::Or,
            TokenKind::Not,
            TokenKind::Assignment,
            TokenKind::Arrow,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_punctuation() {
    assert_eq!(
        kinds("( ) [ ] { } , : ."),
        vec![
            TokenKind::OpenParen,
            TokenKind::CloseParen,
            TokenKind::OpenBracket,
            TokenKind::CloseBracket,
            TokenKind::OpenCurly,
            TokenKind::CloseCurly,
            TokenKind::Comma,
            TokenKind::Colon,
            TokenKind::Dot,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_comments_and_newlines() {
    assert_eq!(
        kinds("let a: int = 1 // trailing comment\n// whole line\nprint(a)"),
        vec![
            TokenKind::Let,
            TokenKind::Identifier,
            TokenKind::Colon,
            TokenKind::TypeInt,
            TokenKind::Assignment,
            TokenKind::Int,
            TokenKind::Newline,
            TokenKind::Newline,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Identifier,
            TokenKind::CloseParen,
            TokenKind::EOF,
        ]
    );
}

#[test]
fn test_tokenize_positions() {
    let tokens = tokenize("let a: int = 1\n  print(a)".to_string(), Some("pos.nx".to_string())).unwrap();

    assert_eq!(tokens[0].span.start.line, 1);
    assert_eq!(tokens[0].span.start.column, 1);
    assert_eq!(tokens[1].span.start.column, 5);

    let print = tokens.iter().find(|token| token.value == "print").unwrap();
    assert_eq!(print.span.start.line, 2);
    assert_eq!(print.span.start.column, 3);
    assert_eq!(print.span.start.file.as_str(), "pos.nx");
}

#[test]
fn test_tokenize_unrecognized_token() {
    let error = tokenize("let a = #".to_string(), None).unwrap_err();

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.kind(), ErrorKind::LexError);
    assert_eq!(error.get_position().column, 9);
}

#[test]
fn test_tokenize_unterminated_string() {
    let error = tokenize("print(\"oops)\n".to_string(), None).unwrap_err();
    assert_eq!(error.get_error_name(), "UnterminatedString");

    let error = tokenize("f\"{a}".to_string(), None).unwrap_err();
    assert_eq!(error.get_error_name(), "UnterminatedString");
}
