//! Type system definitions for the AST.
//!
//! This module defines the closed set of Noxy types:
//!
//! - Primitive types (int, float, string, bool, bytes, void)
//! - Arrays with an optional fixed size
//! - Nominal struct types
//! - References, maps and module namespaces
//!
//! Types are written by the parser from annotations and produced by the type
//! checker for expressions. Equality is structural and ignores array sizes; the
//! looser assignment rule lives in [`compatible`].

use std::{
    fmt::Display,
    hash::{Hash, Hasher},
};

/// Represents the primitive types in the language. `str` is folded into
/// [`Primitive::String`] when the name is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Float,
    String,
    Bool,
    Bytes,
    Void,
}

impl Primitive {
    pub fn from_name(name: &str) -> Option<Primitive> {
        match name {
            "int" => Some(Primitive::Int),
            "float" => Some(Primitive::Float),
            "string" | "str" => Some(Primitive::String),
            "bool" => Some(Primitive::Bool),
            "bytes" => Some(Primitive::Bytes),
            "void" => Some(Primitive::Void),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Float => "float",
            Primitive::String => "string",
            Primitive::Bool => "bool",
            Primitive::Bytes => "bytes",
            Primitive::Void => "void",
        }
    }
}

#[derive(Debug, Clone)]
pub enum Type {
    Primitive(Primitive),
    /// `size` is `None` for parameters and `zeros()` results.
    Array {
        element: Box<Type>,
        size: Option<usize>,
    },
    Struct(String),
    Ref(Box<Type>),
    Map {
        key: Box<Type>,
        value: Box<Type>,
    },
    /// A namespace bound by `use a.b` without `select`. Holds the dotted path.
    Module(String),
}

impl Type {
    pub fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }

    pub fn float() -> Type {
        Type::Primitive(Primitive::Float)
    }

    pub fn string() -> Type {
        Type::Primitive(Primitive::String)
    }

    pub fn bool() -> Type {
        Type::Primitive(Primitive::Bool)
    }

    pub fn bytes() -> Type {
        Type::Primitive(Primitive::Bytes)
    }

    pub fn void() -> Type {
        Type::Primitive(Primitive::Void)
    }

    /// Builds a primitive from its source name, including the `str` alias.
    pub fn primitive(name: &str) -> Option<Type> {
        Primitive::from_name(name).map(Type::Primitive)
    }

    pub fn array(element: Type, size: Option<usize>) -> Type {
        Type::Array {
            element: Box::new(element),
            size,
        }
    }

    pub fn reference(inner: Type) -> Type {
        Type::Ref(Box::new(inner))
    }

    pub fn map(key: Type, value: Type) -> Type {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// The type of `null`.
    pub fn null() -> Type {
        Type::reference(Type::void())
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Int | Primitive::Float))
    }

    pub fn is_ref(&self) -> bool {
        matches!(self, Type::Ref(_))
    }

    /// Strips one level of `ref`.
    pub fn deref(&self) -> &Type {
        match self {
            Type::Ref(inner) => inner,
            other => other,
        }
    }

    /// Placeholder types produced by `[]` and `{}`.
    pub fn is_placeholder(&self) -> bool {
        match self {
            Type::Array { element, .. } => element.is_void(),
            Type::Map { key, value } => key.is_void() && value.is_void(),
            _ => false,
        }
    }

    pub fn is_valid_map_key(&self) -> bool {
        matches!(
            self,
            Type::Primitive(Primitive::Int | Primitive::String | Primitive::Bool | Primitive::Bytes)
        )
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Type::Primitive(a), Type::Primitive(b)) => a == b,
            (Type::Array { element: a, .. }, Type::Array { element: b, .. }) => a == b,
            (Type::Struct(a), Type::Struct(b)) => a == b,
            (Type::Ref(a), Type::Ref(b)) => a == b,
            (
                Type::Map { key: ka, value: va },
                Type::Map { key: kb, value: vb },
            ) => ka == kb && va == vb,
            (Type::Module(a), Type::Module(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Type::Primitive(primitive) => primitive.hash(state),
            // Size is not part of equality, so it must not be hashed either.
            Type::Array { element, .. } => element.hash(state),
            Type::Struct(name) | Type::Module(name) => name.hash(state),
            Type::Ref(inner) => inner.hash(state),
            Type::Map { key, value } => {
                key.hash(state);
                value.hash(state);
            }
        }
    }
}

impl Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Primitive(primitive) => write!(f, "{}", primitive.name()),
            Type::Array {
                element,
                size: Some(size),
            } => write!(f, "{}[{}]", element, size),
            Type::Array { element, size: None } => write!(f, "{}[]", element),
            Type::Struct(name) => write!(f, "{}", name),
            Type::Ref(inner) => write!(f, "ref {}", inner),
            Type::Map { key, value } => write!(f, "map[{}, {}]", key, value),
            Type::Module(name) => write!(f, "module {}", name),
        }
    }
}

/// Whether a value of type `actual` may be stored where `expected` is declared.
///
/// Array sizes never matter here, so `zeros(10)` may initialise an `int[5]`;
/// that size is not checked at runtime either.
pub fn compatible(expected: &Type, actual: &Type) -> bool {
    if *actual == Type::null() {
        return expected.is_ref();
    }

    match (expected, actual) {
        (Type::Array { element: e, .. }, Type::Array { element: a, .. }) => {
            a.is_void() || e == a
        }
        (Type::Map { .. }, Type::Map { .. }) if actual.is_placeholder() => true,
        _ => expected == actual,
    }
}
