//! Runtime values for the evaluator.
//!
//! Scalars are stored inline. Structs, arrays and maps are shared handles
//! (`Rc<RefCell<_>>`), so copying a `Value` aliases them; [`Value::deep_copy`]
//! is the explicit by-value copy used for function parameters.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt::{self, Display},
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{ast::types::Type, errors::errors::ErrorImpl};

use super::environment::Namespace;

/// A variable slot. Bindings and `ref x` values share the same slot.
pub type Slot = Rc<RefCell<Value>>;

pub type StructHandle = Rc<RefCell<StructInstance>>;
pub type ArrayHandle = Rc<RefCell<ArrayInstance>>;
pub type MapHandle = Rc<RefCell<MapInstance>>;

#[derive(Debug, Clone)]
pub struct StructInstance {
    pub name: String,
    /// Fields in declaration order.
    pub fields: IndexMap<String, Value>,
}

impl StructInstance {
    pub fn get_field(&self, field: &str) -> Result<Value, ErrorImpl> {
        self.fields
            .get(field)
            .cloned()
            .ok_or_else(|| ErrorImpl::UnknownField {
                struct_name: self.name.clone(),
                field: field.to_string(),
            })
    }

    pub fn set_field(&mut self, field: &str, value: Value) -> Result<(), ErrorImpl> {
        match self.fields.get_mut(field) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(ErrorImpl::UnknownField {
                struct_name: self.name.clone(),
                field: field.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayInstance {
    pub elements: Vec<Value>,
    pub element_type: Type,
}

impl ArrayInstance {
    fn checked_index(&self, index: i64) -> Result<usize, ErrorImpl> {
        if index < 0 || index as usize >= self.elements.len() {
            return Err(ErrorImpl::IndexOutOfBounds {
                index,
                length: self.elements.len(),
            });
        }
        Ok(index as usize)
    }

    pub fn get(&self, index: i64) -> Result<Value, ErrorImpl> {
        let index = self.checked_index(index)?;
        Ok(self.elements[index].clone())
    }

    pub fn set(&mut self, index: i64, value: Value) -> Result<(), ErrorImpl> {
        let index = self.checked_index(index)?;
        self.elements[index] = value;
        Ok(())
    }
}

/// Hashable projection of the values allowed as map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MapKey {
    Int(i64),
    Str(String),
    Bool(bool),
    Bytes(Vec<u8>),
}

impl MapKey {
    pub fn from_value(value: &Value) -> Result<MapKey, ErrorImpl> {
        match value {
            Value::Int(value) => Ok(MapKey::Int(*value)),
            Value::Str(value) => Ok(MapKey::Str(value.clone())),
            Value::Bool(value) => Ok(MapKey::Bool(*value)),
            Value::Bytes(value) => Ok(MapKey::Bytes(value.clone())),
            Value::Ref(reference) => MapKey::from_value(&reference.get()?),
            other => Err(ErrorImpl::UnsupportedOperation {
                message: format!("`{}` cannot be used as a map key", other.type_name()),
            }),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            MapKey::Int(value) => Value::Int(*value),
            MapKey::Str(value) => Value::Str(value.clone()),
            MapKey::Bool(value) => Value::Bool(*value),
            MapKey::Bytes(value) => Value::Bytes(value.clone()),
        }
    }
}

impl Display for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

/// Insertion ordered map.
#[derive(Debug, Clone, Default)]
pub struct MapInstance {
    pub entries: IndexMap<MapKey, Value>,
}

impl MapInstance {
    pub fn get(&self, key: &Value) -> Result<Value, ErrorImpl> {
        let key = MapKey::from_value(key)?;
        self.entries
            .get(&key)
            .cloned()
            .ok_or_else(|| ErrorImpl::MissingKey {
                key: match &key {
                    MapKey::Str(text) => format!("{:?}", text),
                    other => other.to_string(),
                },
            })
    }

    pub fn insert(&mut self, key: &Value, value: Value) -> Result<(), ErrorImpl> {
        self.entries.insert(MapKey::from_value(key)?, value);
        Ok(())
    }
}

/// What a `ref` points at.
#[derive(Debug, Clone)]
pub enum Reference {
    /// `ref x`, or a snapshot of any other expression in a fresh slot.
    Slot(Slot),
    /// `ref s.f`
    Field(StructHandle, String),
    /// `ref a[i]`
    Index(ArrayHandle, usize),
}

impl Reference {
    pub fn get(&self) -> Result<Value, ErrorImpl> {
        match self {
            Reference::Slot(slot) => Ok(slot.borrow().clone()),
            Reference::Field(instance, field) => instance.borrow().get_field(field),
            Reference::Index(array, index) => array.borrow().get(*index as i64),
        }
    }

    pub fn set(&self, value: Value) -> Result<(), ErrorImpl> {
        match self {
            Reference::Slot(slot) => {
                *slot.borrow_mut() = value;
                Ok(())
            }
            Reference::Field(instance, field) => instance.borrow_mut().set_field(field, value),
            Reference::Index(array, index) => array.borrow_mut().set(*index as i64, value),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Null,
    Struct(StructHandle),
    Array(ArrayHandle),
    Map(MapHandle),
    Ref(Reference),
    Module(Rc<Namespace>),
}

impl Value {
    pub fn new_struct(name: &str, fields: IndexMap<String, Value>) -> Value {
        Value::Struct(Rc::new(RefCell::new(StructInstance {
            name: name.to_string(),
            fields,
        })))
    }

    pub fn new_array(elements: Vec<Value>, element_type: Type) -> Value {
        Value::Array(Rc::new(RefCell::new(ArrayInstance {
            elements,
            element_type,
        })))
    }

    pub fn new_map(entries: IndexMap<MapKey, Value>) -> Value {
        Value::Map(Rc::new(RefCell::new(MapInstance { entries })))
    }

    /// Wraps `value` in a fresh slot and returns a reference to it.
    pub fn snapshot_ref(value: Value) -> Value {
        Value::Ref(Reference::Slot(Rc::new(RefCell::new(value))))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::Null => "null",
            Value::Struct(_) => "struct",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
            Value::Ref(_) => "ref",
            Value::Module(_) => "module",
        }
    }

    /// Follows references until a non-reference value is reached.
    pub fn deref(&self) -> Result<Value, ErrorImpl> {
        let mut current = self.clone();
        while let Value::Ref(reference) = current {
            current = reference.get()?;
        }
        Ok(current)
    }

    /// Duplicates nested structs, arrays and maps. References are kept as they are.
    ///
    /// A handle reached twice is copied once, so shared and cyclic values keep
    /// their shape in the copy.
    pub fn deep_copy(&self) -> Value {
        self.deep_copy_with(&mut HashMap::new())
    }

    fn deep_copy_with(&self, copies: &mut HashMap<*const (), Value>) -> Value {
        let Some(key) = self.handle_key() else {
            return self.clone();
        };
        if let Some(copy) = copies.get(&key) {
            return copy.clone();
        }

        match self {
            Value::Struct(instance) => {
                let (name, fields) = {
                    let instance = instance.borrow();
                    (instance.name.clone(), instance.fields.clone())
                };
                let copy = Value::new_struct(&name, IndexMap::new());
                copies.insert(key, copy.clone());

                let fields = fields
                    .iter()
                    .map(|(name, value)| (name.clone(), value.deep_copy_with(copies)))
                    .collect();
                if let Value::Struct(handle) = &copy {
                    handle.borrow_mut().fields = fields;
                }
                copy
            }
            Value::Array(array) => {
                let (elements, element_type) = {
                    let array = array.borrow();
                    (array.elements.clone(), array.element_type.clone())
                };
                let copy = Value::new_array(Vec::new(), element_type);
                copies.insert(key, copy.clone());

                let elements = elements
                    .iter()
                    .map(|value| value.deep_copy_with(copies))
                    .collect();
                if let Value::Array(handle) = &copy {
                    handle.borrow_mut().elements = elements;
                }
                copy
            }
            Value::Map(map) => {
                let entries = map.borrow().entries.clone();
                let copy = Value::new_map(IndexMap::new());
                copies.insert(key, copy.clone());

                let entries = entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.deep_copy_with(copies)))
                    .collect();
                if let Value::Map(handle) = &copy {
                    handle.borrow_mut().entries = entries;
                }
                copy
            }
            other => other.clone(),
        }
    }

    /// Identity of a struct, array or map handle.
    fn handle_key(&self) -> Option<*const ()> {
        match self {
            Value::Struct(handle) => Some(Rc::as_ptr(handle) as *const ()),
            Value::Array(handle) => Some(Rc::as_ptr(handle) as *const ()),
            Value::Map(handle) => Some(Rc::as_ptr(handle) as *const ()),
            _ => None,
        }
    }

    /// `null`, `false` and references to `null` are falsy.
    pub fn is_truthy(&self) -> Result<bool, ErrorImpl> {
        Ok(match self {
            Value::Null => false,
            Value::Bool(value) => *value,
            Value::Ref(reference) => !matches!(reference.get()?.deref()?, Value::Null),
            _ => true,
        })
    }

    /// Structural equality. References are compared by their targets.
    pub fn equals(&self, other: &Value) -> Result<bool, ErrorImpl> {
        self.equals_with(other, &mut HashSet::new())
    }

    /// `comparing` holds the handle pairs already being compared further up;
    /// meeting one again means the values repeat the same cycle.
    fn equals_with(
        &self,
        other: &Value,
        comparing: &mut HashSet<(*const (), *const ())>,
    ) -> Result<bool, ErrorImpl> {
        let left = self.deref()?;
        let right = other.deref()?;

        if let (Some(a), Some(b)) = (left.handle_key(), right.handle_key()) {
            if a == b || !comparing.insert((a, b)) {
                return Ok(true);
            }
            let equal = left.equals_contents(&right, comparing);
            comparing.remove(&(a, b));
            return equal;
        }

        Ok(match (&left, &right) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Module(a), Value::Module(b)) => Rc::ptr_eq(a, b),
            _ => false,
        })
    }

    fn equals_contents(
        &self,
        other: &Value,
        comparing: &mut HashSet<(*const (), *const ())>,
    ) -> Result<bool, ErrorImpl> {
        match (self, other) {
            (Value::Struct(a), Value::Struct(b)) => {
                let (a, b) = (a.borrow().clone(), b.borrow().clone());
                if a.name != b.name || a.fields.len() != b.fields.len() {
                    return Ok(false);
                }
                for (name, value) in a.fields.iter() {
                    match b.fields.get(name) {
                        Some(other) if value.equals_with(other, comparing)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            (Value::Array(a), Value::Array(b)) => {
                let (a, b) = (a.borrow().elements.clone(), b.borrow().elements.clone());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b.iter()) {
                    if !x.equals_with(y, comparing)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            (Value::Map(a), Value::Map(b)) => {
                let (a, b) = (a.borrow().entries.clone(), b.borrow().entries.clone());
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (key, value) in a.iter() {
                    match b.get(key) {
                        Some(other) if value.equals_with(other, comparing)? => {}
                        _ => return Ok(false),
                    }
                }
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Writes the value, printing a handle that contains itself as `...` the
    /// second time it is reached.
    fn write_with(
        &self,
        f: &mut fmt::Formatter<'_>,
        open: &mut HashSet<*const ()>,
    ) -> fmt::Result {
        if let Some(key) = self.handle_key() {
            if !open.insert(key) {
                return write!(f, "...");
            }
            let result = self.write_contents(f, open);
            open.remove(&key);
            return result;
        }
        self.write_contents(f, open)
    }

    fn write_contents(
        &self,
        f: &mut fmt::Formatter<'_>,
        open: &mut HashSet<*const ()>,
    ) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{}", value),
            Value::Float(value) => write!(f, "{:.6}", value),
            Value::Str(value) => write!(f, "{}", value),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Bytes(value) => write!(f, "{}", String::from_utf8_lossy(value)),
            Value::Null => write!(f, "null"),
            Value::Struct(instance) => {
                let instance = instance.borrow();
                write!(f, "{}(", instance.name)?;
                for (index, (name, value)) in instance.fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", name)?;
                    value.write_with(f, open)?;
                }
                write!(f, ")")
            }
            Value::Array(array) => {
                write!(f, "[")?;
                for (index, value) in array.borrow().elements.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    value.write_with(f, open)?;
                }
                write!(f, "]")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (index, (key, value)) in map.borrow().entries.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", key)?;
                    value.write_with(f, open)?;
                }
                write!(f, "}}")
            }
            Value::Ref(reference) => match reference.get() {
                Ok(target) => target.write_with(f, open),
                Err(_) => write!(f, "null"),
            },
            Value::Module(namespace) => write!(f, "<module {}>", namespace.name),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_with(f, &mut HashSet::new())
    }
}

/// Widest padding and longest precision an f-string spec may ask for. Larger
/// specs are not parsed, so the value prints plainly.
pub const MAX_FORMAT_WIDTH: usize = 1_000;

/// A parsed f-string format spec: `[0][width][.precision][type]`.
#[derive(Debug, Default, PartialEq)]
struct FormatSpec {
    zero_pad: bool,
    width: usize,
    precision: Option<usize>,
    kind: Option<char>,
}

impl FormatSpec {
    fn parse(spec: &str) -> Option<FormatSpec> {
        let mut parsed = FormatSpec::default();
        let mut rest = spec;

        if let Some(stripped) = rest.strip_prefix('0') {
            parsed.zero_pad = true;
            rest = stripped;
        }

        let width_len = rest.chars().take_while(|ch| ch.is_ascii_digit()).count();
        if width_len > 0 {
            parsed.width = rest[..width_len].parse().ok()?;
            rest = &rest[width_len..];
        }

        if let Some(stripped) = rest.strip_prefix('.') {
            let precision_len = stripped.chars().take_while(|ch| ch.is_ascii_digit()).count();
            if precision_len == 0 {
                return None;
            }
            parsed.precision = Some(stripped[..precision_len].parse().ok()?);
            rest = &stripped[precision_len..];
        }

        if parsed.width > MAX_FORMAT_WIDTH || parsed.precision.unwrap_or(0) > MAX_FORMAT_WIDTH {
            return None;
        }

        let mut chars = rest.chars();
        parsed.kind = chars.next();
        if chars.next().is_some() {
            return None;
        }
        if let Some(kind) = parsed.kind {
            if !matches!(kind, 'd' | 'f' | 'e' | 'x' | 'X' | 'o' | 'b' | 's') {
                return None;
            }
        }

        Some(parsed)
    }

    fn pad(&self, text: String, numeric: bool) -> String {
        let length = text.chars().count();
        if length >= self.width {
            return text;
        }
        let fill = self.width - length;

        if numeric && self.zero_pad {
            // Zeros go after the sign.
            let (sign, digits) = match text.strip_prefix('-') {
                Some(digits) => ("-", digits),
                None => ("", text.as_str()),
            };
            return format!("{}{}{}", sign, "0".repeat(fill), digits);
        }

        if numeric {
            format!("{}{}", " ".repeat(fill), text)
        } else {
            format!("{}{}", text, " ".repeat(fill))
        }
    }
}

/// Renders `value` in exponent notation the way `1.500000e+03` is written.
fn exponent(value: f64, precision: usize) -> String {
    let formatted = format!("{:.*e}", precision, value);
    match formatted.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => formatted,
    }
}

/// Formats an interpolated value. Unknown specs fall back to plain display.
pub fn format_value(value: &Value, spec: Option<&str>) -> String {
    let value = value.deref().unwrap_or(Value::Null);

    let Some(spec) = spec else {
        return value.to_string();
    };
    let Some(parsed) = FormatSpec::parse(spec) else {
        return value.to_string();
    };

    match value {
        Value::Int(int) => {
            let text = match parsed.kind {
                Some(radix @ ('x' | 'X' | 'o' | 'b')) => {
                    let magnitude = int.unsigned_abs();
                    let digits = match radix {
                        'x' => format!("{:x}", magnitude),
                        'X' => format!("{:X}", magnitude),
                        'o' => format!("{:o}", magnitude),
                        _ => format!("{:b}", magnitude),
                    };
                    if int < 0 {
                        format!("-{}", digits)
                    } else {
                        digits
                    }
                }
                Some('f') => format!("{:.*}", parsed.precision.unwrap_or(6), int as f64),
                Some('e') => exponent(int as f64, parsed.precision.unwrap_or(6)),
                _ => int.to_string(),
            };
            parsed.pad(text, true)
        }
        Value::Float(float) => {
            let text = match parsed.kind {
                Some('e') => exponent(float, parsed.precision.unwrap_or(6)),
                _ => format!("{:.*}", parsed.precision.unwrap_or(6), float),
            };
            parsed.pad(text, true)
        }
        other => parsed.pad(other.to_string(), false),
    }
}
