//! Registry of native functions.
//!
//! The type checker reads each entry's [`NativeSignature`] and the evaluator
//! calls its [`NativeFn`], so both always agree on which natives exist.

use std::{
    cell::RefCell,
    collections::HashMap,
    fs,
    io::{BufReader, Write},
    rc::Rc,
};

use crate::{ast::types::Type, errors::errors::ErrorImpl, runtime::value::Value};

use super::{builtins, io, strings};

/// A native parameter: anything, exactly one type, or a type that depends on
/// the container passed first.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Any,
    Is(Type),
    /// An array of any element type.
    Array,
    /// An array or a string.
    Sequence,
    /// A map of any key and value type.
    Map,
    /// An element of the first argument: its element type, or `string` for a string.
    Element,
    /// A key of the map passed first.
    Key,
}

/// What a fixed native returns.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeReturn {
    Is(Type),
    /// The element type of the array passed first.
    Element,
    /// An array of the key type of the map passed first.
    Keys,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NativeSignature {
    /// Any number of arguments of any type, returns `void`.
    Variadic,
    Fixed {
        params: Vec<ParamKind>,
        returns: NativeReturn,
    },
}

impl NativeSignature {
    pub fn fixed(params: Vec<ParamKind>, return_type: Type) -> Self {
        NativeSignature::Fixed {
            params,
            returns: NativeReturn::Is(return_type),
        }
    }

    /// A native working on the array or map passed as its first argument.
    pub fn container(params: Vec<ParamKind>, returns: NativeReturn) -> Self {
        NativeSignature::Fixed { params, returns }
    }

    /// Number of arguments the native takes, `None` when any count is accepted.
    pub fn arity(&self) -> Option<usize> {
        match self {
            NativeSignature::Variadic => None,
            NativeSignature::Fixed { params, .. } => Some(params.len()),
        }
    }

    /// The result type, given the type of the first argument with refs removed.
    pub fn return_type(&self, container: Option<&Type>) -> Type {
        let returns = match self {
            NativeSignature::Variadic => return Type::void(),
            NativeSignature::Fixed { returns, .. } => returns,
        };

        match (returns, container) {
            (NativeReturn::Is(type_), _) => type_.clone(),
            (NativeReturn::Element, Some(Type::Array { element, .. })) => (**element).clone(),
            (NativeReturn::Keys, Some(Type::Map { key, .. })) => Type::array((**key).clone(), None),
            _ => Type::void(),
        }
    }
}

pub type NativeFn = fn(&mut NativeContext, Vec<Value>) -> Result<Value, ErrorImpl>;

#[derive(Debug, Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    pub signature: NativeSignature,
    pub callable: NativeFn,
}

/// An open file. Readers are buffered so lines can be read one at a time.
pub enum FileHandle {
    Reader(BufReader<fs::File>),
    Writer(fs::File),
}

/// Open files by descriptor. Descriptors start at 3 and are never reused.
pub struct FileRegistry {
    files: HashMap<i64, FileHandle>,
    next_fd: i64,
}

impl Default for FileRegistry {
    fn default() -> Self {
        FileRegistry {
            files: HashMap::new(),
            next_fd: 3,
        }
    }
}

impl FileRegistry {
    pub fn insert(&mut self, handle: FileHandle) -> i64 {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.files.insert(fd, handle);
        fd
    }

    pub fn get_mut(&mut self, fd: i64) -> Result<&mut FileHandle, ErrorImpl> {
        self.files.get_mut(&fd).ok_or(ErrorImpl::InvalidHandle {
            resource: String::from("file"),
            handle: fd,
        })
    }

    pub fn remove(&mut self, fd: i64) -> Option<FileHandle> {
        self.files.remove(&fd)
    }
}

/// Process resources handed to every native call.
pub struct NativeContext {
    pub output: Box<dyn Write>,
    pub files: FileRegistry,
}

impl NativeContext {
    pub fn new(output: Box<dyn Write>) -> Self {
        NativeContext {
            output,
            files: FileRegistry::default(),
        }
    }
}

/// A cloneable in-memory sink, used to capture program output.
#[derive(Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).to_string()
    }
}

impl Write for OutputBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct NativeRegistry {
    functions: HashMap<&'static str, NativeFunction>,
}

impl NativeRegistry {
    pub fn new() -> Self {
        NativeRegistry::default()
    }

    /// A registry holding the core, string and I/O natives.
    pub fn with_defaults() -> Self {
        let mut registry = NativeRegistry::new();
        builtins::register(&mut registry);
        strings::register(&mut registry);
        io::register(&mut registry);
        registry
    }

    pub fn register(&mut self, name: &'static str, signature: NativeSignature, callable: NativeFn) {
        self.functions.insert(
            name,
            NativeFunction {
                name,
                signature,
                callable,
            },
        );
    }

    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.functions.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

/// Derefs every argument so natives only see plain values.
pub fn plain_args(args: Vec<Value>) -> Result<Vec<Value>, ErrorImpl> {
    args.iter().map(Value::deref).collect()
}

pub fn expect_int(function: &str, value: &Value) -> Result<i64, ErrorImpl> {
    match value {
        Value::Int(value) => Ok(*value),
        other => Err(argument_error(function, "int", other)),
    }
}

pub fn expect_str<'a>(function: &str, value: &'a Value) -> Result<&'a str, ErrorImpl> {
    match value {
        Value::Str(value) => Ok(value),
        other => Err(argument_error(function, "string", other)),
    }
}

pub fn argument_error(function: &str, expected: &str, received: &Value) -> ErrorImpl {
    ErrorImpl::NativeFailure {
        function: function.to_string(),
        message: format!("expected {}, received {}", expected, received.type_name()),
    }
}

pub fn failure(function: &str, message: impl Into<String>) -> ErrorImpl {
    ErrorImpl::NativeFailure {
        function: function.to_string(),
        message: message.into(),
    }
}
