//! Core natives: printing, conversions and container helpers.

use std::io::Write;

use crate::{
    ast::types::Type,
    errors::errors::ErrorImpl,
    runtime::value::{MapKey, Value},
};

use super::registry::{
    argument_error, expect_int, expect_str, failure, plain_args, NativeContext, NativeRegistry,
    NativeReturn, NativeSignature, ParamKind,
};

pub fn register(registry: &mut NativeRegistry) {
    use ParamKind::{Any, Array, Element, Is, Key, Map, Sequence};

    registry.register("print", NativeSignature::Variadic, print);
    registry.register("to_str", NativeSignature::fixed(vec![Any], Type::string()), to_str);
    registry.register("to_int", NativeSignature::fixed(vec![Any], Type::int()), to_int);
    registry.register("to_float", NativeSignature::fixed(vec![Any], Type::float()), to_float);
    registry.register("to_bytes", NativeSignature::fixed(vec![Any], Type::bytes()), to_bytes);
    registry.register(
        "strlen",
        NativeSignature::fixed(vec![Is(Type::string())], Type::int()),
        strlen,
    );
    registry.register(
        "ord",
        NativeSignature::fixed(vec![Is(Type::string())], Type::int()),
        ord,
    );
    registry.register(
        "chr",
        NativeSignature::fixed(vec![Is(Type::int())], Type::string()),
        chr,
    );
    registry.register("length", NativeSignature::fixed(vec![Any], Type::int()), length);
    registry.register(
        "substring",
        NativeSignature::fixed(
            vec![Is(Type::string()), Is(Type::int()), Is(Type::int())],
            Type::string(),
        ),
        substring,
    );
    registry.register(
        "slice",
        NativeSignature::fixed(
            vec![Is(Type::bytes()), Is(Type::int()), Is(Type::int())],
            Type::bytes(),
        ),
        slice,
    );

    let returns = |type_: Type| NativeReturn::Is(type_);
    registry.register(
        "append",
        NativeSignature::container(vec![Array, Element], returns(Type::void())),
        append,
    );
    registry.register(
        "pop",
        NativeSignature::container(vec![Array], NativeReturn::Element),
        pop,
    );
    registry.register(
        "remove",
        NativeSignature::container(vec![Array, Element], returns(Type::void())),
        remove,
    );
    registry.register(
        "contains",
        NativeSignature::container(vec![Sequence, Element], returns(Type::bool())),
        contains,
    );
    registry.register(
        "keys",
        NativeSignature::container(vec![Map], NativeReturn::Keys),
        keys,
    );
    registry.register(
        "has_key",
        NativeSignature::container(vec![Map, Key], returns(Type::bool())),
        has_key,
    );
    registry.register(
        "delete",
        NativeSignature::container(vec![Map, Key], returns(Type::void())),
        delete,
    );
}

/// Clamps `start..end` the way negative and out of range slice bounds behave:
/// negative indices count from the end, the result is never out of range.
pub fn slice_bounds(length: usize, start: i64, end: i64) -> (usize, usize) {
    let length = length as i64;
    let clamp = |index: i64| {
        let index = if index < 0 { index + length } else { index };
        index.clamp(0, length) as usize
    };

    let (start, end) = (clamp(start), clamp(end));
    (start, end.max(start))
}

fn print(context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let line = args
        .iter()
        .map(|arg| arg.to_string())
        .collect::<Vec<String>>()
        .join(" ");

    writeln!(context.output, "{}", line)
        .and_then(|_| context.output.flush())
        .map_err(|err| failure("print", err.to_string()))?;

    Ok(Value::Null)
}

fn to_str(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    Ok(Value::Str(args[0].to_string()))
}

fn to_int(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;

    match &args[0] {
        Value::Int(value) => Ok(Value::Int(*value)),
        Value::Float(value) if value.is_finite() => Ok(Value::Int(value.trunc() as i64)),
        Value::Bool(value) => Ok(Value::Int(*value as i64)),
        Value::Str(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| failure("to_int", format!("cannot convert {:?} to int", text))),
        other => Err(failure(
            "to_int",
            format!("cannot convert {} to int", other.type_name()),
        )),
    }
}

fn to_float(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;

    match &args[0] {
        Value::Int(value) => Ok(Value::Float(*value as f64)),
        Value::Float(value) => Ok(Value::Float(*value)),
        Value::Bool(value) => Ok(Value::Float(if *value { 1.0 } else { 0.0 })),
        Value::Str(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| failure("to_float", format!("cannot convert {:?} to float", text))),
        other => Err(failure(
            "to_float",
            format!("cannot convert {} to float", other.type_name()),
        )),
    }
}

fn byte_of(value: &Value) -> Result<u8, ErrorImpl> {
    match value {
        Value::Int(int) => u8::try_from(*int)
            .map_err(|_| failure("to_bytes", format!("{} is out of byte range (0-255)", int))),
        other => Err(argument_error("to_bytes", "int", other)),
    }
}

fn to_bytes(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;

    match &args[0] {
        Value::Bytes(bytes) => Ok(Value::Bytes(bytes.clone())),
        Value::Str(text) => Ok(Value::Bytes(text.as_bytes().to_vec())),
        value @ Value::Int(_) => Ok(Value::Bytes(vec![byte_of(value)?])),
        Value::Array(array) => {
            let bytes = array
                .borrow()
                .elements
                .iter()
                .map(|element| byte_of(&element.deref()?))
                .collect::<Result<Vec<u8>, ErrorImpl>>()?;
            Ok(Value::Bytes(bytes))
        }
        other => Err(failure(
            "to_bytes",
            format!("cannot convert {} to bytes", other.type_name()),
        )),
    }
}

fn strlen(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let text = expect_str("strlen", &args[0])?;

    Ok(Value::Int(text.chars().count() as i64))
}

fn ord(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let text = expect_str("ord", &args[0])?;

    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) => Ok(Value::Int(ch as i64)),
        _ => Err(failure(
            "ord",
            format!("expected a single character, received {:?}", text),
        )),
    }
}

fn chr(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let code = expect_int("chr", &args[0])?;

    u32::try_from(code)
        .ok()
        .and_then(char::from_u32)
        .map(|ch| Value::Str(ch.to_string()))
        .ok_or_else(|| failure("chr", format!("{} is not a valid code point", code)))
}

fn length(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;

    let length = match &args[0] {
        Value::Str(text) => text.chars().count(),
        Value::Bytes(bytes) => bytes.len(),
        Value::Array(array) => array.borrow().elements.len(),
        Value::Map(map) => map.borrow().entries.len(),
        other => {
            return Err(failure(
                "length",
                format!("{} has no length", other.type_name()),
            ))
        }
    };

    Ok(Value::Int(length as i64))
}

fn substring(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let text = expect_str("substring", &args[0])?;
    let start = expect_int("substring", &args[1])?;
    let end = expect_int("substring", &args[2])?;

    let chars: Vec<char> = text.chars().collect();
    let (start, end) = slice_bounds(chars.len(), start, end);

    Ok(Value::Str(chars[start..end].iter().collect()))
}

fn slice(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let Value::Bytes(bytes) = &args[0] else {
        return Err(argument_error("slice", "bytes", &args[0]));
    };
    let start = expect_int("slice", &args[1])?;
    let end = expect_int("slice", &args[2])?;

    let (start, end) = slice_bounds(bytes.len(), start, end);
    Ok(Value::Bytes(bytes[start..end].to_vec()))
}

fn append(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let mut args = args.into_iter();
    let (Some(target), Some(item)) = (args.next(), args.next()) else {
        return Err(failure("append", "expected an array and an item"));
    };

    match target.deref()? {
        Value::Array(array) => {
            array.borrow_mut().elements.push(item);
            Ok(Value::Null)
        }
        other => Err(argument_error("append", "array", &other)),
    }
}

fn pop(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;

    match &args[0] {
        Value::Array(array) => array
            .borrow_mut()
            .elements
            .pop()
            .ok_or_else(|| failure("pop", "pop from an empty array")),
        other => Err(argument_error("pop", "array", other)),
    }
}

/// Removes the first element equal to the item; a missing item is ignored.
fn remove(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let Value::Array(array) = &args[0] else {
        return Err(argument_error("remove", "array", &args[0]));
    };

    let elements = array.borrow().elements.clone();
    let mut position = None;
    for (index, element) in elements.iter().enumerate() {
        if element.equals(&args[1])? {
            position = Some(index);
            break;
        }
    }

    if let Some(index) = position {
        array.borrow_mut().elements.remove(index);
    }
    Ok(Value::Null)
}

fn contains(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    match args[0].deref()? {
        Value::Array(array) => {
            let elements = array.borrow().elements.clone();
            for element in elements.iter() {
                if element.equals(&args[1])? {
                    return Ok(Value::Bool(true));
                }
            }
            Ok(Value::Bool(false))
        }
        Value::Str(text) => {
            let needle = args[1].deref()?;
            Ok(Value::Bool(text.contains(expect_str("contains", &needle)?)))
        }
        other => Err(argument_error("contains", "array", &other)),
    }
}

fn keys(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let Value::Map(map) = &args[0] else {
        return Err(argument_error("keys", "map", &args[0]));
    };

    let keys: Vec<Value> = map.borrow().entries.keys().map(MapKey::to_value).collect();
    let key_type = match map.borrow().entries.keys().next() {
        Some(MapKey::Int(_)) => Type::int(),
        Some(MapKey::Str(_)) => Type::string(),
        Some(MapKey::Bool(_)) => Type::bool(),
        Some(MapKey::Bytes(_)) => Type::bytes(),
        None => Type::void(),
    };

    Ok(Value::new_array(keys, key_type))
}

fn has_key(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    match args[0].deref()? {
        Value::Map(map) => {
            let key = MapKey::from_value(&args[1])?;
            Ok(Value::Bool(map.borrow().entries.contains_key(&key)))
        }
        other => Err(argument_error("has_key", "map", &other)),
    }
}

fn delete(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    match args[0].deref()? {
        Value::Map(map) => {
            let key = MapKey::from_value(&args[1])?;
            map.borrow_mut().entries.shift_remove(&key);
            Ok(Value::Null)
        }
        other => Err(argument_error("delete", "map", &other)),
    }
}
