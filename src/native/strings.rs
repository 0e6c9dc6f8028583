//! String natives, wrapped by `stdlib/strings.nx`.

use crate::{ast::types::Type, errors::errors::ErrorImpl, runtime::value::Value};

use super::registry::{
    expect_int, expect_str, failure, plain_args, NativeContext, NativeRegistry, NativeSignature,
    ParamKind,
};

const MAX_REPEAT: i64 = 10_000;
/// Longest string, in bytes, `strings_repeat` may build.
const MAX_REPEAT_LEN: usize = 1 << 24;

pub fn register(registry: &mut NativeRegistry) {
    let string = || ParamKind::Is(Type::string());

    registry.register(
        "strings_contains",
        NativeSignature::fixed(vec![string(), string()], Type::bool()),
        contains,
    );
    registry.register(
        "strings_starts_with",
        NativeSignature::fixed(vec![string(), string()], Type::bool()),
        starts_with,
    );
    registry.register(
        "strings_ends_with",
        NativeSignature::fixed(vec![string(), string()], Type::bool()),
        ends_with,
    );
    registry.register(
        "strings_index_of",
        NativeSignature::fixed(vec![string(), string()], Type::int()),
        index_of,
    );
    registry.register(
        "strings_to_upper",
        NativeSignature::fixed(vec![string()], Type::string()),
        to_upper,
    );
    registry.register(
        "strings_to_lower",
        NativeSignature::fixed(vec![string()], Type::string()),
        to_lower,
    );
    registry.register(
        "strings_trim",
        NativeSignature::fixed(vec![string()], Type::string()),
        trim,
    );
    registry.register(
        "strings_replace",
        NativeSignature::fixed(vec![string(), string(), string()], Type::string()),
        replace,
    );
    registry.register(
        "strings_repeat",
        NativeSignature::fixed(vec![string(), ParamKind::Is(Type::int())], Type::string()),
        repeat,
    );
}

/// Derefs the arguments and reads the first `count` as strings.
fn strings(function: &str, args: Vec<Value>, count: usize) -> Result<Vec<String>, ErrorImpl> {
    plain_args(args)?
        .iter()
        .take(count)
        .map(|arg| expect_str(function, arg).map(String::from))
        .collect()
}

fn contains(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_contains", args, 2)?;
    Ok(Value::Bool(args[0].contains(args[1].as_str())))
}

fn starts_with(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_starts_with", args, 2)?;
    Ok(Value::Bool(args[0].starts_with(args[1].as_str())))
}

fn ends_with(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_ends_with", args, 2)?;
    Ok(Value::Bool(args[0].ends_with(args[1].as_str())))
}

/// Character index of the first match, `-1` when there is none.
fn index_of(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_index_of", args, 2)?;

    let index = match args[0].find(args[1].as_str()) {
        Some(byte_index) => args[0][..byte_index].chars().count() as i64,
        None => -1,
    };
    Ok(Value::Int(index))
}

fn to_upper(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_to_upper", args, 1)?;
    Ok(Value::Str(args[0].to_uppercase()))
}

fn to_lower(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_to_lower", args, 1)?;
    Ok(Value::Str(args[0].to_lowercase()))
}

fn trim(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_trim", args, 1)?;
    Ok(Value::Str(args[0].trim().to_string()))
}

/// Replaces every occurrence. An empty pattern leaves the string unchanged.
fn replace(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = strings("strings_replace", args, 3)?;

    if args[1].is_empty() {
        return Ok(Value::Str(args[0].clone()));
    }
    Ok(Value::Str(args[0].replace(args[1].as_str(), &args[2])))
}

fn repeat(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let text = expect_str("strings_repeat", &args[0])?;
    let count = expect_int("strings_repeat", &args[1])?;

    if !(0..=MAX_REPEAT).contains(&count) {
        return Err(failure(
            "strings_repeat",
            format!("count must be between 0 and {}, received {}", MAX_REPEAT, count),
        ));
    }
    if text.len().saturating_mul(count as usize) > MAX_REPEAT_LEN {
        return Err(failure(
            "strings_repeat",
            format!("result would exceed {} bytes", MAX_REPEAT_LEN),
        ));
    }
    Ok(Value::Str(text.repeat(count as usize)))
}
