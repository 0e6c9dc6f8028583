use std::{fs, path::PathBuf};

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use super::{
    builtins::slice_bounds,
    registry::{
        NativeContext, NativeRegistry, NativeReturn, NativeSignature, OutputBuffer, ParamKind,
    },
};
use crate::{ast::types::Type, errors::errors::ErrorImpl, runtime::value::Value};

fn call(registry: &NativeRegistry, context: &mut NativeContext, name: &str, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let native = registry.get(name).unwrap();
    (native.callable)(context, args)
}

fn string(text: &str) -> Value {
    Value::Str(text.to_string())
}

fn field(value: &Value, name: &str) -> Value {
    match value {
        Value::Struct(instance) => instance.borrow().get_field(name).unwrap(),
        other => panic!("expected struct, got {:?}", other),
    }
}

fn scratch_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("noxy-{}-{}", std::process::id(), name))
}

#[test]
fn test_default_registry_contents() {
    let registry = NativeRegistry::with_defaults();

    for name in [
        "print", "to_str", "length", "pop", "keys", "remove", "strings_trim", "io_open", "io_mkdir",
    ] {
        assert!(registry.contains(name), "missing native `{}`", name);
    }
    assert!(!registry.contains("net_listen"));

    assert_eq!(registry.get("print").unwrap().signature, NativeSignature::Variadic);
    assert_eq!(
        registry.get("substring").unwrap().signature,
        NativeSignature::fixed(
            vec![
                ParamKind::Is(Type::string()),
                ParamKind::Is(Type::int()),
                ParamKind::Is(Type::int())
            ],
            Type::string()
        )
    );
    assert_eq!(
        registry.get("io_open").unwrap().signature.return_type(None),
        Type::Struct(String::from("File"))
    );

    assert_eq!(
        registry.get("append").unwrap().signature,
        NativeSignature::container(
            vec![ParamKind::Array, ParamKind::Element],
            NativeReturn::Is(Type::void())
        )
    );

    let keys = &registry.get("keys").unwrap().signature;
    let map = Type::Map {
        key: Box::new(Type::string()),
        value: Box::new(Type::int()),
    };
    assert_eq!(keys.arity(), Some(1));
    assert_eq!(keys.return_type(Some(&map)), Type::array(Type::string(), None));
    assert_eq!(registry.get("print").unwrap().signature.arity(), None);

    let names = registry.names();
    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted);
}

#[test]
fn test_print_joins_with_spaces() {
    let registry = NativeRegistry::with_defaults();
    let output = OutputBuffer::new();
    let mut context = NativeContext::new(Box::new(output.clone()));

    call(
        &registry,
        &mut context,
        "print",
        vec![string("a"), Value::Int(1), Value::Float(2.5), Value::Null],
    )
    .unwrap();
    call(&registry, &mut context, "print", vec![]).unwrap();

    assert_eq!(output.contents(), "a 1 2.500000 null\n\n");
}

#[test]
fn test_conversions() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));
    let mut run = |name: &str, arg: Value| call(&registry, &mut context, name, vec![arg]);

    assert!(matches!(run("to_int", string(" 42 ")), Ok(Value::Int(42))));
    assert!(matches!(run("to_int", Value::Float(-3.9)), Ok(Value::Int(-3))));
    assert!(matches!(run("to_int", Value::Bool(true)), Ok(Value::Int(1))));
    assert!(matches!(run("to_float", Value::Int(2)), Ok(Value::Float(value)) if value == 2.0));
    assert!(matches!(run("to_str", Value::Float(1.0)), Ok(Value::Str(text)) if text == "1.000000"));
    assert!(matches!(
        run("to_bytes", string("hi")),
        Ok(Value::Bytes(bytes)) if bytes == b"hi"
    ));
    assert!(matches!(
        run("to_bytes", Value::new_array(vec![Value::Int(104), Value::Int(105)], Type::int())),
        Ok(Value::Bytes(bytes)) if bytes == b"hi"
    ));

    assert_eq!(
        run("to_int", string("abc")).unwrap_err(),
        ErrorImpl::NativeFailure {
            function: String::from("to_int"),
            message: String::from("cannot convert \"abc\" to int")
        }
    );
    assert!(run("to_bytes", Value::Int(256)).is_err());
}

#[test]
fn test_characters() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));
    let mut run = |name: &str, arg: Value| call(&registry, &mut context, name, vec![arg]);

    assert!(matches!(run("strlen", string("héllo")), Ok(Value::Int(5))));
    assert!(matches!(run("ord", string("A")), Ok(Value::Int(65))));
    assert!(run("ord", string("AB")).is_err());
    assert!(matches!(run("chr", Value::Int(97)), Ok(Value::Str(text)) if text == "a"));
    assert!(run("chr", Value::Int(-1)).is_err());
}

#[test]
fn test_slice_bounds_clamp() {
    assert_eq!(slice_bounds(5, 1, 3), (1, 3));
    assert_eq!(slice_bounds(5, -2, 5), (3, 5));
    assert_eq!(slice_bounds(5, 0, 99), (0, 5));
    assert_eq!(slice_bounds(5, 4, 2), (4, 4));
    assert_eq!(slice_bounds(0, -1, 1), (0, 0));
}

#[test]
fn test_substring_and_slice() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));

    let text = call(
        &registry,
        &mut context,
        "substring",
        vec![string("hello"), Value::Int(1), Value::Int(-1)],
    )
    .unwrap();
    assert_eq!(text.to_string(), "ell");

    let bytes = call(
        &registry,
        &mut context,
        "slice",
        vec![Value::Bytes(b"abcdef".to_vec()), Value::Int(2), Value::Int(4)],
    )
    .unwrap();
    assert_eq!(bytes.to_string(), "cd");
}

#[test]
fn test_container_helpers() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));

    let array = Value::new_array(vec![Value::Int(1)], Type::int());
    call(&registry, &mut context, "append", vec![Value::snapshot_ref(array.clone()), Value::Int(2)]).unwrap();
    assert_eq!(array.to_string(), "[1, 2]");
    assert!(matches!(
        call(&registry, &mut context, "length", vec![array.clone()]),
        Ok(Value::Int(2))
    ));
    assert!(matches!(
        call(&registry, &mut context, "contains", vec![array.clone(), Value::Int(2)]),
        Ok(Value::Bool(true))
    ));
    assert!(matches!(
        call(&registry, &mut context, "contains", vec![array, Value::Int(3)]),
        Ok(Value::Bool(false))
    ));

    let map = Value::new_map(IndexMap::new());
    if let Value::Map(handle) = &map {
        handle.borrow_mut().insert(&string("a"), Value::Int(1)).unwrap();
        handle.borrow_mut().insert(&string("b"), Value::Int(2)).unwrap();
    }
    assert!(matches!(
        call(&registry, &mut context, "has_key", vec![map.clone(), string("a")]),
        Ok(Value::Bool(true))
    ));
    call(&registry, &mut context, "delete", vec![map.clone(), string("a")]).unwrap();
    assert_eq!(map.to_string(), "{b: 2}");
    assert!(call(&registry, &mut context, "length", vec![Value::Int(3)]).is_err());
}

#[test]
fn test_pop_keys_and_remove() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));

    let array = Value::new_array(vec![Value::Int(1), Value::Int(2), Value::Int(1)], Type::int());
    call(&registry, &mut context, "remove", vec![array.clone(), Value::Int(1)]).unwrap();
    assert_eq!(array.to_string(), "[2, 1]");
    call(&registry, &mut context, "remove", vec![array.clone(), Value::Int(7)]).unwrap();
    assert_eq!(array.to_string(), "[2, 1]");

    assert!(matches!(
        call(&registry, &mut context, "pop", vec![Value::snapshot_ref(array.clone())]),
        Ok(Value::Int(1))
    ));
    assert!(matches!(
        call(&registry, &mut context, "pop", vec![array.clone()]),
        Ok(Value::Int(2))
    ));
    assert_eq!(
        call(&registry, &mut context, "pop", vec![array]).unwrap_err(),
        ErrorImpl::NativeFailure {
            function: String::from("pop"),
            message: String::from("pop from an empty array")
        }
    );

    let map = Value::new_map(IndexMap::new());
    if let Value::Map(handle) = &map {
        handle.borrow_mut().insert(&Value::Int(2), string("b")).unwrap();
        handle.borrow_mut().insert(&Value::Int(1), string("a")).unwrap();
    }
    let keys = call(&registry, &mut context, "keys", vec![map]).unwrap();
    assert_eq!(keys.to_string(), "[2, 1]");
    match &keys {
        Value::Array(array) => assert_eq!(array.borrow().element_type, Type::int()),
        other => panic!("expected array, got {:?}", other),
    }

    assert!(call(&registry, &mut context, "keys", vec![Value::Int(1)]).is_err());
}

#[test]
fn test_string_natives() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));
    let mut run = |name: &str, args: Vec<Value>| {
        call(&registry, &mut context, name, args).unwrap().to_string()
    };

    assert_eq!(run("strings_contains", vec![string("noxy"), string("ox")]), "true");
    assert_eq!(run("strings_starts_with", vec![string("noxy"), string("no")]), "true");
    assert_eq!(run("strings_ends_with", vec![string("noxy"), string("no")]), "false");
    assert_eq!(run("strings_index_of", vec![string("añb"), string("b")]), "2");
    assert_eq!(run("strings_index_of", vec![string("abc"), string("z")]), "-1");
    assert_eq!(run("strings_to_upper", vec![string("abc")]), "ABC");
    assert_eq!(run("strings_to_lower", vec![string("ABC")]), "abc");
    assert_eq!(run("strings_trim", vec![string("  x \n")]), "x");
    assert_eq!(run("strings_replace", vec![string("a-b-c"), string("-"), string("+")]), "a+b+c");
    assert_eq!(run("strings_replace", vec![string("abc"), string(""), string("+")]), "abc");
    assert_eq!(run("strings_repeat", vec![string("ab"), Value::Int(3)]), "ababab");

    assert!(call(&registry, &mut context, "strings_repeat", vec![string("ab"), Value::Int(-1)]).is_err());
    assert!(call(&registry, &mut context, "strings_repeat", vec![string("ab"), Value::Int(10_001)]).is_err());

    let long = string(&"x".repeat(1 << 20));
    assert!(call(&registry, &mut context, "strings_repeat", vec![long, Value::Int(10_000)]).is_err());
}

#[test]
fn test_file_round_trip() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));
    let path = scratch_path("round-trip.txt");
    let path_value = string(&path.to_string_lossy());

    let file = call(&registry, &mut context, "io_open", vec![path_value.clone(), string("w")]).unwrap();
    assert!(matches!(field(&file, "fd"), Value::Int(3)));
    assert!(matches!(field(&file, "open"), Value::Bool(true)));

    let written = call(&registry, &mut context, "io_write", vec![file.clone(), string("one\ntwo\n")]).unwrap();
    assert!(matches!(written, Value::Bool(true)));
    call(&registry, &mut context, "io_close", vec![Value::snapshot_ref(file.clone())]).unwrap();
    assert!(matches!(field(&file, "open"), Value::Bool(false)));

    // Closing twice does nothing.
    call(&registry, &mut context, "io_close", vec![file.clone()]).unwrap();

    let reader = call(&registry, &mut context, "io_open", vec![path_value.clone(), string("r")]).unwrap();
    assert!(matches!(field(&reader, "fd"), Value::Int(4)));

    let line = call(&registry, &mut context, "io_read_line", vec![reader.clone()]).unwrap();
    assert!(matches!(field(&line, "ok"), Value::Bool(true)));
    assert_eq!(field(&line, "data").to_string(), "one\n");

    let rest = call(&registry, &mut context, "io_read", vec![reader.clone()]).unwrap();
    assert_eq!(field(&rest, "data").to_string(), "two\n");

    let eof = call(&registry, &mut context, "io_read_line", vec![reader.clone()]).unwrap();
    assert_eq!(field(&eof, "data").to_string(), "");
    call(&registry, &mut context, "io_close", vec![reader]).unwrap();

    assert!(matches!(
        call(&registry, &mut context, "io_exists", vec![path_value.clone()]),
        Ok(Value::Bool(true))
    ));
    assert!(matches!(
        call(&registry, &mut context, "io_remove", vec![path_value.clone()]),
        Ok(Value::Bool(true))
    ));
    assert!(!path.exists());
}

#[test]
fn test_file_failures() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));
    let missing = string(&scratch_path("missing/file.txt").to_string_lossy());

    let file = call(&registry, &mut context, "io_open", vec![missing.clone(), string("r")]).unwrap();
    assert!(matches!(field(&file, "fd"), Value::Int(-1)));
    assert!(matches!(field(&file, "open"), Value::Bool(false)));

    assert_eq!(
        call(&registry, &mut context, "io_read", vec![file]).unwrap_err(),
        ErrorImpl::InvalidHandle {
            resource: String::from("file"),
            handle: -1
        }
    );
    assert!(call(&registry, &mut context, "io_open", vec![missing.clone(), string("rw")]).is_err());
    assert!(matches!(
        call(&registry, &mut context, "io_remove", vec![missing]),
        Ok(Value::Bool(false))
    ));
}

#[test]
fn test_mkdir_and_remove_directory() {
    let registry = NativeRegistry::with_defaults();
    let mut context = NativeContext::new(Box::new(OutputBuffer::new()));
    let directory = scratch_path("directory");
    let _ = fs::remove_dir(&directory);
    let directory_value = string(&directory.to_string_lossy());

    assert!(matches!(
        call(&registry, &mut context, "io_mkdir", vec![directory_value.clone()]),
        Ok(Value::Bool(true))
    ));
    assert!(matches!(
        call(&registry, &mut context, "io_mkdir", vec![directory_value.clone()]),
        Ok(Value::Bool(false))
    ));
    assert!(matches!(
        call(&registry, &mut context, "io_remove", vec![directory_value]),
        Ok(Value::Bool(true))
    ));
}
