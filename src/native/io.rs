//! File natives, wrapped by `stdlib/io.nx`.
//!
//! Files are addressed by the `fd` field of a `File` struct. Failures the
//! program can react to come back as `IOResult` or `bool` values; only a
//! descriptor that is unknown or already closed is a runtime error.

use std::{
    fs::{self, OpenOptions},
    io::{BufRead, BufReader, Read, Write},
    path::Path,
};

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    ast::types::Type,
    errors::errors::ErrorImpl,
    runtime::value::{StructHandle, Value},
};

use super::registry::{
    argument_error, expect_str, failure, plain_args, FileHandle, NativeContext, NativeRegistry,
    NativeSignature, ParamKind,
};

pub fn register(registry: &mut NativeRegistry) {
    use ParamKind::{Any, Is};

    let file = || Type::Struct(String::from("File"));
    let io_result = || Type::Struct(String::from("IOResult"));

    registry.register(
        "io_open",
        NativeSignature::fixed(vec![Is(Type::string()), Is(Type::string())], file()),
        open,
    );
    registry.register("io_close", NativeSignature::fixed(vec![Any], Type::void()), close);
    registry.register("io_read", NativeSignature::fixed(vec![Any], io_result()), read);
    registry.register(
        "io_read_line",
        NativeSignature::fixed(vec![Any], io_result()),
        read_line,
    );
    registry.register(
        "io_write",
        NativeSignature::fixed(vec![Any, Is(Type::string())], Type::bool()),
        write,
    );
    registry.register(
        "io_exists",
        NativeSignature::fixed(vec![Is(Type::string())], Type::bool()),
        exists,
    );
    registry.register(
        "io_remove",
        NativeSignature::fixed(vec![Is(Type::string())], Type::bool()),
        remove,
    );
    registry.register(
        "io_mkdir",
        NativeSignature::fixed(vec![Is(Type::string())], Type::bool()),
        mkdir,
    );
}

fn file_value(fd: i64, path: &str, mode: &str, open: bool) -> Value {
    let mut fields = IndexMap::new();
    fields.insert(String::from("fd"), Value::Int(fd));
    fields.insert(String::from("path"), Value::Str(path.to_string()));
    fields.insert(String::from("mode"), Value::Str(mode.to_string()));
    fields.insert(String::from("open"), Value::Bool(open));
    Value::new_struct("File", fields)
}

fn io_result(result: Result<String, String>) -> Value {
    let (ok, data, error) = match result {
        Ok(data) => (true, data, String::new()),
        Err(error) => (false, String::new(), error),
    };

    let mut fields = IndexMap::new();
    fields.insert(String::from("ok"), Value::Bool(ok));
    fields.insert(String::from("data"), Value::Str(data));
    fields.insert(String::from("error"), Value::Str(error));
    Value::new_struct("IOResult", fields)
}

/// The `File` struct behind `value` and its descriptor.
fn file_struct(function: &str, value: &Value) -> Result<(StructHandle, i64), ErrorImpl> {
    let Value::Struct(handle) = value.deref()? else {
        return Err(argument_error(function, "File", value));
    };

    let fd = match handle.borrow().get_field("fd")? {
        Value::Int(fd) => fd,
        other => return Err(argument_error(function, "int descriptor", &other)),
    };
    Ok((handle, fd))
}

fn open(context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let path = expect_str("io_open", &args[0])?;
    let mode = expect_str("io_open", &args[1])?;

    let opened = match mode {
        "r" => fs::File::open(path).map(|file| FileHandle::Reader(BufReader::new(file))),
        "w" => fs::File::create(path).map(FileHandle::Writer),
        "a" => OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map(FileHandle::Writer),
        other => {
            return Err(failure(
                "io_open",
                format!("invalid file mode {:?}, expected \"r\", \"w\" or \"a\"", other),
            ))
        }
    };

    match opened {
        Ok(handle) => {
            let fd = context.files.insert(handle);
            debug!("Opened {} as fd {} ({})", path, fd, mode);
            Ok(file_value(fd, path, mode, true))
        }
        Err(err) => {
            debug!("Could not open {}: {}", path, err);
            Ok(file_value(-1, path, mode, false))
        }
    }
}

fn close(context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let (handle, fd) = file_struct("io_close", &args[0])?;

    if !matches!(handle.borrow().get_field("open")?, Value::Bool(true)) {
        return Ok(Value::Null);
    }

    if let Some(FileHandle::Writer(mut file)) = context.files.remove(fd) {
        file.flush()
            .map_err(|err| failure("io_close", err.to_string()))?;
    }
    debug!("Closed fd {}", fd);

    handle.borrow_mut().set_field("open", Value::Bool(false))?;
    Ok(Value::Null)
}

fn read(context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let (_, fd) = file_struct("io_read", &args[0])?;

    let result = match context.files.get_mut(fd)? {
        FileHandle::Reader(reader) => {
            let mut content = String::new();
            reader
                .read_to_string(&mut content)
                .map(|_| content)
                .map_err(|err| err.to_string())
        }
        FileHandle::Writer(_) => Err(String::from("file is not open for reading")),
    };
    Ok(io_result(result))
}

/// Reads up to and including the next newline. `data` is empty at end of file.
fn read_line(context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let (_, fd) = file_struct("io_read_line", &args[0])?;

    let result = match context.files.get_mut(fd)? {
        FileHandle::Reader(reader) => {
            let mut line = String::new();
            reader
                .read_line(&mut line)
                .map(|_| line)
                .map_err(|err| err.to_string())
        }
        FileHandle::Writer(_) => Err(String::from("file is not open for reading")),
    };
    Ok(io_result(result))
}

fn write(context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let (_, fd) = file_struct("io_write", &args[0])?;
    let content = args[1].deref()?;
    let content = expect_str("io_write", &content)?;

    let written = match context.files.get_mut(fd)? {
        FileHandle::Writer(file) => file
            .write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .is_ok(),
        FileHandle::Reader(_) => false,
    };
    Ok(Value::Bool(written))
}

fn exists(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let path = expect_str("io_exists", &args[0])?;

    Ok(Value::Bool(Path::new(path).exists()))
}

fn remove(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let path = Path::new(expect_str("io_remove", &args[0])?);

    let removed = if path.is_dir() {
        fs::remove_dir(path)
    } else {
        fs::remove_file(path)
    };
    Ok(Value::Bool(removed.is_ok()))
}

fn mkdir(_context: &mut NativeContext, args: Vec<Value>) -> Result<Value, ErrorImpl> {
    let args = plain_args(args)?;
    let path = expect_str("io_mkdir", &args[0])?;

    Ok(Value::Bool(fs::create_dir(path).is_ok()))
}
