use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_internal_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn kind(&self) -> ErrorKind {
        self.internal_error.kind()
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnterminatedString { .. } => "UnterminatedString",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnexpectedTokenDetailed { .. } => "UnexpectedTokenDetailed",
            ErrorImpl::NumberParseError { .. } => "NumberParseError",
            ErrorImpl::InvalidAssignmentTarget => "InvalidAssignmentTarget",
            ErrorImpl::TypeMatchError { .. } => "TypeMatchError",
            ErrorImpl::ArgumentTypeMatchError { .. } => "ArgumentTypeMatchError",
            ErrorImpl::FieldTypeMatchError { .. } => "FieldTypeMatchError",
            ErrorImpl::UnexpectedArguments { .. } => "UnexpectedArguments",
            ErrorImpl::InvalidOperands { .. } => "InvalidOperands",
            ErrorImpl::InvalidOperand { .. } => "InvalidOperand",
            ErrorImpl::ConditionNotBool { .. } => "ConditionNotBool",
            ErrorImpl::NotIndexable { .. } => "NotIndexable",
            ErrorImpl::NoSuchField { .. } => "NoSuchField",
            ErrorImpl::NotCallable { .. } => "NotCallable",
            ErrorImpl::NotAValue { .. } => "NotAValue",
            ErrorImpl::MissingReturnValue { .. } => "MissingReturnValue",
            ErrorImpl::ReturnOutsideFunction => "ReturnOutsideFunction",
            ErrorImpl::BreakOutsideLoop => "BreakOutsideLoop",
            ErrorImpl::NestedDeclaration { .. } => "NestedDeclaration",
            ErrorImpl::UnknownType { .. } => "UnknownType",
            ErrorImpl::InvalidMapKey { .. } => "InvalidMapKey",
            ErrorImpl::VariableNotDeclared { .. } => "VariableNotDeclared",
            ErrorImpl::FunctionNotDeclared { .. } => "FunctionNotDeclared",
            ErrorImpl::UnknownField { .. } => "UnknownField",
            ErrorImpl::NullFieldAccess { .. } => "NullFieldAccess",
            ErrorImpl::IndexOutOfBounds { .. } => "IndexOutOfBounds",
            ErrorImpl::MissingKey { .. } => "MissingKey",
            ErrorImpl::DivisionByZero => "DivisionByZero",
            ErrorImpl::ModuloByZero => "ModuloByZero",
            ErrorImpl::ModuleNotFound { .. } => "ModuleNotFound",
            ErrorImpl::SymbolNotExported { .. } => "SymbolNotExported",
            ErrorImpl::ModuleReadError { .. } => "ModuleReadError",
            ErrorImpl::InvalidArraySize { .. } => "InvalidArraySize",
            ErrorImpl::CallDepthExceeded { .. } => "CallDepthExceeded",
            ErrorImpl::UnsupportedOperation { .. } => "UnsupportedOperation",
            ErrorImpl::InvalidHandle { .. } => "InvalidHandle",
            ErrorImpl::NativeFailure { .. } => "NativeFailure",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnexpectedToken { token } if token == "\n" => ErrorTip::Suggestion(
                String::from("Unexpected end of line, is an expression missing?"),
            ),
            ErrorImpl::UnterminatedString { .. } => ErrorTip::Suggestion(String::from(
                "String literals must be closed on the line they start",
            )),
            ErrorImpl::NumberParseError { token } => ErrorTip::Suggestion(format!(
                "Invalid number: `{}`, is it above the integer limit?",
                token
            )),
            ErrorImpl::MissingReturnValue { expected } => ErrorTip::Suggestion(format!(
                "A bare `return` is only allowed in `void` functions, this one returns `{}`",
                expected
            )),
            ErrorImpl::NestedDeclaration { .. } => ErrorTip::Suggestion(String::from(
                "Move the declaration to the top level of the file",
            )),
            ErrorImpl::ModuleNotFound { path } => ErrorTip::Suggestion(format!(
                "Expected `{}.nx` next to the program or in the standard library",
                path.replace('.', "/")
            )),
            ErrorImpl::InvalidMapKey { .. } => ErrorTip::Suggestion(String::from(
                "Map keys must be int, string, bool or bytes",
            )),
            ErrorImpl::ModuloByZero | ErrorImpl::DivisionByZero => ErrorTip::Suggestion(
                String::from("Check the divisor before dividing"),
            ),
            _ => ErrorTip::None,
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.position, self.kind(), self.internal_error)
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

/// The coarse error taxonomy visible to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    LexError,
    ParseError,
    TypeError,
    NameError,
    FieldError,
    IndexError,
    KeyError,
    DivisionError,
    ImportError,
    RuntimeError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unterminated {literal} literal")]
    UnterminatedString { literal: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unexpected token ({message}): {token:?}")]
    UnexpectedTokenDetailed { token: String, message: String },
    #[error("error parsing number: {token:?}")]
    NumberParseError { token: String },
    #[error("invalid assignment target")]
    InvalidAssignmentTarget,

    #[error("expected type `{expected}`, received `{received}`")]
    TypeMatchError { expected: String, received: String },
    #[error("argument {index} of `{function}`: expected `{expected}`, received `{received}`")]
    ArgumentTypeMatchError {
        function: String,
        index: usize,
        expected: String,
        received: String,
    },
    #[error("field `{field}`: expected `{expected}`, received `{received}`")]
    FieldTypeMatchError {
        field: String,
        expected: String,
        received: String,
    },
    #[error("`{function}` expects {expected} arguments, received {received}")]
    UnexpectedArguments {
        function: String,
        expected: usize,
        received: usize,
    },
    #[error("operator `{operator}` cannot be applied to `{left}` and `{right}`")]
    InvalidOperands {
        operator: String,
        left: String,
        right: String,
    },
    #[error("operator `{operator}` cannot be applied to `{operand}`")]
    InvalidOperand { operator: String, operand: String },
    #[error("`{construct}` condition must be `bool`, received `{received}`")]
    ConditionNotBool { construct: String, received: String },
    #[error("values of type `{type_}` cannot be indexed by `{index}`")]
    NotIndexable { type_: String, index: String },
    #[error("type `{type_}` has no field `{field}`")]
    NoSuchField { type_: String, field: String },
    #[error("`{callee}` is not callable")]
    NotCallable { callee: String },
    #[error("`{name}` is a {kind}, not a value")]
    NotAValue { name: String, kind: String },
    #[error("missing return value of type `{expected}`")]
    MissingReturnValue { expected: String },
    #[error("`return` outside of a function")]
    ReturnOutsideFunction,
    #[error("`break` outside of a loop")]
    BreakOutsideLoop,
    #[error("`{declaration}` declarations are only allowed at the top level")]
    NestedDeclaration { declaration: String },
    #[error("unknown type `{type_}`")]
    UnknownType { type_: String },
    #[error("type `{type_}` cannot be used as a map key")]
    InvalidMapKey { type_: String },

    #[error("variable `{variable}` not declared")]
    VariableNotDeclared { variable: String },
    #[error("function `{function}` not declared")]
    FunctionNotDeclared { function: String },

    #[error("struct `{struct_name}` has no field `{field}`")]
    UnknownField { struct_name: String, field: String },
    #[error("cannot access field `{field}` of null")]
    NullFieldAccess { field: String },
    #[error("index {index} out of bounds for length {length}")]
    IndexOutOfBounds { index: i64, length: usize },
    #[error("key {key} not found")]
    MissingKey { key: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,

    #[error("module `{path}` not found")]
    ModuleNotFound { path: String },
    #[error("symbol `{symbol}` not found in module `{module}`")]
    SymbolNotExported { symbol: String, module: String },
    #[error("could not read `{path}`: {message}")]
    ModuleReadError { path: String, message: String },

    #[error("invalid array size {size}")]
    InvalidArraySize { size: i64 },
    #[error("maximum call depth of {limit} exceeded")]
    CallDepthExceeded { limit: usize },
    #[error("{message}")]
    UnsupportedOperation { message: String },
    #[error("invalid {resource} handle {handle}")]
    InvalidHandle { resource: String, handle: i64 },
    #[error("`{function}` failed: {message}")]
    NativeFailure { function: String, message: String },
}

impl ErrorImpl {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorImpl::UnrecognisedToken { .. } | ErrorImpl::UnterminatedString { .. } => {
                ErrorKind::LexError
            }
            ErrorImpl::UnexpectedToken { .. }
            | ErrorImpl::UnexpectedTokenDetailed { .. }
            | ErrorImpl::NumberParseError { .. }
            | ErrorImpl::InvalidAssignmentTarget => ErrorKind::ParseError,
            ErrorImpl::TypeMatchError { .. }
            | ErrorImpl::ArgumentTypeMatchError { .. }
            | ErrorImpl::FieldTypeMatchError { .. }
            | ErrorImpl::UnexpectedArguments { .. }
            | ErrorImpl::InvalidOperands { .. }
            | ErrorImpl::InvalidOperand { .. }
            | ErrorImpl::ConditionNotBool { .. }
            | ErrorImpl::NotIndexable { .. }
            | ErrorImpl::NoSuchField { .. }
            | ErrorImpl::NotCallable { .. }
            | ErrorImpl::NotAValue { .. }
            | ErrorImpl::MissingReturnValue { .. }
            | ErrorImpl::ReturnOutsideFunction
            | ErrorImpl::BreakOutsideLoop
            | ErrorImpl::NestedDeclaration { .. }
            | ErrorImpl::UnknownType { .. }
            | ErrorImpl::InvalidMapKey { .. } => ErrorKind::TypeError,
            ErrorImpl::VariableNotDeclared { .. } | ErrorImpl::FunctionNotDeclared { .. } => {
                ErrorKind::NameError
            }
            ErrorImpl::UnknownField { .. } | ErrorImpl::NullFieldAccess { .. } => {
                ErrorKind::FieldError
            }
            ErrorImpl::IndexOutOfBounds { .. } => ErrorKind::IndexError,
            ErrorImpl::MissingKey { .. } => ErrorKind::KeyError,
            ErrorImpl::DivisionByZero | ErrorImpl::ModuloByZero => ErrorKind::DivisionError,
            ErrorImpl::ModuleNotFound { .. }
            | ErrorImpl::SymbolNotExported { .. }
            | ErrorImpl::ModuleReadError { .. } => ErrorKind::ImportError,
            ErrorImpl::InvalidArraySize { .. }
            | ErrorImpl::CallDepthExceeded { .. }
            | ErrorImpl::UnsupportedOperation { .. }
            | ErrorImpl::InvalidHandle { .. }
            | ErrorImpl::NativeFailure { .. } => ErrorKind::RuntimeError,
        }
    }
}
