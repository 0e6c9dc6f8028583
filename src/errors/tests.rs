//! Unit tests for error handling.
//!
//! This module contains tests for error types, error kinds and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorKind, ErrorTip};
use crate::Position;
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn position(line: u32, column: u32) -> Position {
    Position::new(line, column, Rc::new("test.nx".to_string()))
}

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::UnrecognisedToken {
            token: "@".to_string(),
        },
        position(1, 10),
    );

    assert_eq!(error.get_error_name(), "UnrecognisedToken");
    assert_eq!(error.kind(), ErrorKind::LexError);
}

#[test]
fn test_error_position() {
    let error = Error::new(
        ErrorImpl::UnexpectedToken {
            token: "identifier".to_string(),
        },
        position(4, 2),
    );

    assert_eq!(error.get_position().line, 4);
    assert_eq!(error.get_position().column, 2);
    assert_eq!(error.kind(), ErrorKind::ParseError);
}

#[test]
fn test_error_display_includes_location_and_kind() {
    let error = Error::new(
        ErrorImpl::TypeMatchError {
            expected: "int".to_string(),
            received: "string".to_string(),
        },
        position(3, 14),
    );

    assert_eq!(
        error.to_string(),
        "test.nx:3:14: TypeError: expected type `int`, received `string`"
    );
}

#[test]
fn test_runtime_error_kinds() {
    let cases = vec![
        (ErrorImpl::DivisionByZero, ErrorKind::DivisionError),
        (ErrorImpl::ModuloByZero, ErrorKind::DivisionError),
        (
            ErrorImpl::IndexOutOfBounds {
                index: 5,
                length: 2,
            },
            ErrorKind::IndexError,
        ),
        (
            ErrorImpl::MissingKey {
                key: "\"a\"".to_string(),
            },
            ErrorKind::KeyError,
        ),
        (
            ErrorImpl::UnknownField {
                struct_name: "P".to_string(),
                field: "z".to_string(),
            },
            ErrorKind::FieldError,
        ),
        (
            ErrorImpl::VariableNotDeclared {
                variable: "x".to_string(),
            },
            ErrorKind::NameError,
        ),
        (
            ErrorImpl::ModuleNotFound {
                path: "a.b".to_string(),
            },
            ErrorKind::ImportError,
        ),
        (
            ErrorImpl::InvalidHandle {
                resource: "file".to_string(),
                handle: 9,
            },
            ErrorKind::RuntimeError,
        ),
    ];

    for (error_impl, kind) in cases {
        assert_eq!(error_impl.kind(), kind);
    }
}

#[test]
fn test_error_tips() {
    let error = Error::new(
        ErrorImpl::ModuleNotFound {
            path: "utils.math".to_string(),
        },
        position(1, 1),
    );

    match error.get_tip() {
        ErrorTip::Suggestion(tip) => assert!(tip.contains("utils/math.nx")),
        ErrorTip::None => panic!("expected a suggestion"),
    }

    let error = Error::new(ErrorImpl::BreakOutsideLoop, position(1, 1));
    assert!(matches!(error.get_tip(), ErrorTip::None));
}
