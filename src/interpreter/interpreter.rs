//! The evaluator state and the machinery shared by statements and expressions:
//! module namespaces, imports, lazily evaluated globals and calls.

use std::{collections::HashMap, io::Write, path::PathBuf, rc::Rc};

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::{
    ast::{
        ast::{Program, Stmt},
        expressions::CallExpr,
        statements::{ImportSelection, StructDecl, UseStmt},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    modules::resolver::{Export, ModuleResolver},
    native::registry::{NativeContext, NativeRegistry},
    runtime::{
        environment::{Binding, Env, Environment, Function, Namespace},
        value::Value,
    },
    Position,
};

use super::{expr::evaluate_expression, stmt::execute_statement};

/// Nested calls allowed before a program is stopped.
pub const MAX_CALL_DEPTH: usize = 1000;

/// How a statement finished.
#[derive(Debug, Clone)]
pub enum Flow {
    Next,
    Break,
    Return(Value),
}

/// Attaches `position` to a runtime failure.
pub fn at(position: &Position) -> impl FnOnce(ErrorImpl) -> Error + '_ {
    move |error| Error::new(error, position.clone())
}

pub struct Interpreter {
    resolver: Rc<ModuleResolver>,
    natives: Rc<NativeRegistry>,
    pub context: NativeContext,
    /// Root scope of the entry program.
    pub global_env: Env,
    /// Scope the next statement runs in.
    pub env: Env,
    /// One namespace per canonical module path.
    namespaces: HashMap<PathBuf, Rc<Namespace>>,
    call_depth: usize,
}

impl Interpreter {
    pub fn new(
        resolver: Rc<ModuleResolver>,
        natives: Rc<NativeRegistry>,
        output: Box<dyn Write>,
    ) -> Self {
        let global_env = Environment::new_root();

        Interpreter {
            resolver,
            natives,
            context: NativeContext::new(output),
            env: Rc::clone(&global_env),
            global_env,
            namespaces: HashMap::new(),
            call_depth: 0,
        }
    }

    /// Runs the entry program: imports first, then struct and function
    /// registration, then every other statement in order.
    pub fn run(&mut self, program: &Program) -> Result<(), Error> {
        for stmt in program.body.iter() {
            if let Stmt::Use(use_stmt) = stmt {
                self.execute_use(use_stmt)?;
            }
        }

        let home = Rc::clone(&self.global_env);
        register_declarations(&home, program);

        for stmt in program.body.iter() {
            match execute_statement(self, stmt)? {
                Flow::Next => {}
                // A top level `return` ends the program.
                Flow::Break | Flow::Return(_) => break,
            }
        }

        self.context.output.flush().map_err(|err| {
            Error::new(
                ErrorImpl::NativeFailure {
                    function: String::from("print"),
                    message: err.to_string(),
                },
                Position::new(0, 0, Rc::clone(&program.file)),
            )
        })
    }

    /// Runs `f` with `env` as the current scope, restoring the previous scope
    /// afterwards whether or not `f` fails.
    pub fn in_env<T>(
        &mut self,
        env: Env,
        f: impl FnOnce(&mut Self) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let previous = std::mem::replace(&mut self.env, env);
        let result = f(self);
        self.env = previous;
        result
    }

    /// Loads the runtime namespace of a module, creating it on first use.
    ///
    /// A file module gets its own root scope holding its imports, structs and
    /// functions. Its globals are only registered, and evaluated on first use.
    /// The namespace is cached before its imports run, so import cycles end.
    pub fn load_namespace(
        &mut self,
        path: &[String],
        position: &Position,
    ) -> Result<Rc<Namespace>, Error> {
        let module = self.resolver.resolve(path, position)?;
        if let Some(namespace) = self.namespaces.get(&module.path) {
            return Ok(Rc::clone(namespace));
        }

        let Some(program) = &module.program else {
            let mut submodules = IndexMap::new();
            for (name, export) in module.exports.iter() {
                if let Export::Module(member) = export {
                    submodules.insert(name.clone(), self.load_namespace(member, position)?);
                }
            }

            let namespace = Rc::new(Namespace {
                name: module.name.clone(),
                env: Environment::new_root(),
                submodules,
            });
            self.namespaces
                .insert(module.path.clone(), Rc::clone(&namespace));
            return Ok(namespace);
        };

        debug!("Loading namespace `{}`", module.name);
        let env = Environment::new_root();
        let namespace = Rc::new(Namespace {
            name: module.name.clone(),
            env: Rc::clone(&env),
            submodules: IndexMap::new(),
        });
        self.namespaces
            .insert(module.path.clone(), Rc::clone(&namespace));

        // Declarations come first so a module importing this one back finds them.
        register_declarations(&env, program);
        for decl in module.globals() {
            env.defer_global(Rc::clone(decl));
        }
        for use_stmt in module.imports.iter() {
            self.in_env(Rc::clone(&env), |interpreter| interpreter.execute_use(use_stmt))?;
        }

        Ok(namespace)
    }

    /// Binds what a `use` statement imports into the current scope.
    pub fn execute_use(&mut self, use_stmt: &UseStmt) -> Result<(), Error> {
        let position = &use_stmt.span.start;
        let namespace = self.load_namespace(&use_stmt.path, position)?;

        match &use_stmt.selection {
            ImportSelection::All => {
                let module = self.resolver.resolve(&use_stmt.path, position)?;
                for name in module.exports.keys() {
                    self.import_member(&namespace, name, position)?;
                }
            }
            ImportSelection::Names(names) => {
                for name in names.iter() {
                    self.import_member(&namespace, name, position)?;
                }
            }
            ImportSelection::Namespace => {
                let name = use_stmt.path.last().cloned().unwrap_or_default();
                for decl in namespace.env.local_structs() {
                    self.env.define_struct(decl);
                }
                self.env.define(
                    &name,
                    Type::Module(use_stmt.dotted_path()),
                    Value::Module(namespace),
                );
            }
        }

        Ok(())
    }

    /// Copies one member of a namespace into the current scope. Globals are
    /// evaluated here and then share their slot with the module.
    fn import_member(
        &mut self,
        namespace: &Rc<Namespace>,
        name: &str,
        position: &Position,
    ) -> Result<(), Error> {
        if let Some(submodule) = namespace.submodules.get(name) {
            self.env.define(
                name,
                Type::Module(submodule.name.clone()),
                Value::Module(Rc::clone(submodule)),
            );
            return Ok(());
        }

        if let Some(function) = namespace.env.get_function(name) {
            self.env.define_function(function);
            return Ok(());
        }

        if let Some(decl) = namespace.env.get_struct(name) {
            self.env.define_struct(decl);
            return Ok(());
        }

        match self.global_binding(&namespace.env, name)? {
            Some(binding) => {
                self.env.define_slot(name, binding.type_, binding.slot);
                Ok(())
            }
            None => Err(Error::new(
                ErrorImpl::SymbolNotExported {
                    symbol: name.to_string(),
                    module: namespace.name.clone(),
                },
                position.clone(),
            )),
        }
    }

    /// Looks a variable up from `env`, evaluating a pending global of that name
    /// first if there is one.
    pub fn global_binding(&mut self, env: &Env, name: &str) -> Result<Option<Binding>, Error> {
        if let Some(binding) = env.lookup(name) {
            return Ok(Some(binding));
        }

        // Removed before evaluation: a global that reads itself is unbound.
        let Some((home, decl)) = env.take_deferred(name) else {
            return Ok(None);
        };

        debug!("Evaluating global `{}`", name);
        let value = self.in_env(Rc::clone(&home), |interpreter| {
            evaluate_expression(interpreter, &decl.assigned_value)
        })?;
        home.define(
            name,
            decl.explicit_type.clone(),
            retag(value, &decl.explicit_type),
        );

        Ok(env.lookup(name))
    }

    /// Calls a struct constructor, a user function or a native, in that order.
    pub fn call_named(
        &mut self,
        env: &Env,
        name: &str,
        call: &CallExpr,
    ) -> Result<Value, Error> {
        if let Some(decl) = env.get_struct(name) {
            return self.construct(&decl, call);
        }

        if let Some(function) = env.get_function(name) {
            return self.call_function(&function, call);
        }

        let Some(native) = self.natives.get(name).cloned() else {
            return Err(Error::new(
                ErrorImpl::FunctionNotDeclared {
                    function: name.to_string(),
                },
                call.span.start.clone(),
            ));
        };

        if let Some(arity) = native.signature.arity() {
            self.check_arity(name, arity, call)?;
        }

        let args = self.evaluate_arguments(call)?;
        trace!("Calling native `{}`", name);
        (native.callable)(&mut self.context, args).map_err(at(&call.span.start))
    }

    fn evaluate_arguments(&mut self, call: &CallExpr) -> Result<Vec<Value>, Error> {
        call.arguments
            .iter()
            .map(|argument| evaluate_expression(self, argument))
            .collect()
    }

    fn check_arity(&self, name: &str, expected: usize, call: &CallExpr) -> Result<(), Error> {
        if call.arguments.len() != expected {
            return Err(Error::new(
                ErrorImpl::UnexpectedArguments {
                    function: name.to_string(),
                    expected,
                    received: call.arguments.len(),
                },
                call.span.start.clone(),
            ));
        }
        Ok(())
    }

    pub fn construct(&mut self, decl: &StructDecl, call: &CallExpr) -> Result<Value, Error> {
        self.check_arity(&decl.identifier, decl.fields.len(), call)?;

        let values = self.evaluate_arguments(call)?;
        let fields = decl
            .fields
            .iter()
            .zip(values)
            .map(|(field, value)| (field.name.clone(), value))
            .collect();

        Ok(Value::new_struct(&decl.identifier, fields))
    }

    /// Arguments are evaluated in the caller's scope. The body runs in a fresh
    /// scope under the root of the module that declared the function.
    pub fn call_function(&mut self, function: &Function, call: &CallExpr) -> Result<Value, Error> {
        let decl = &function.decl;
        self.check_arity(&decl.identifier, decl.parameters.len(), call)?;

        let values = self.evaluate_arguments(call)?;
        let home = function.home().map_err(at(&call.span.start))?;
        let env = Environment::child(&home);

        for (parameter, value) in decl.parameters.iter().zip(values) {
            let value = match &parameter.type_ {
                // By-value parameters get their own copy.
                Type::Struct(_) | Type::Array { .. } | Type::Map { .. } => value
                    .deref()
                    .map_err(at(&call.span.start))?
                    .deep_copy(),
                _ => value,
            };
            env.define(&parameter.name, parameter.type_.clone(), value);
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(Error::new(
                ErrorImpl::CallDepthExceeded {
                    limit: MAX_CALL_DEPTH,
                },
                call.span.start.clone(),
            ));
        }

        trace!("Calling `{}`", decl.identifier);
        self.call_depth += 1;
        let flow = self.in_env(env, |interpreter| {
            for stmt in decl.body.iter() {
                match execute_statement(interpreter, stmt)? {
                    Flow::Next => {}
                    flow => return Ok(flow),
                }
            }
            Ok(Flow::Next)
        });
        self.call_depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            Flow::Next | Flow::Break => Ok(Value::Null),
        }
    }
}

/// Registers the structs and functions of `program` in `env`, with `env` as
/// the home of every function.
fn register_declarations(env: &Env, program: &Program) {
    for stmt in program.body.iter() {
        match stmt {
            Stmt::StructDecl(decl) => env.define_struct(Rc::clone(decl)),
            Stmt::FnDecl(decl) => env.define_function(Function::new(Rc::clone(decl), env)),
            _ => {}
        }
    }
}

/// Arrays stored under a declared array type take that element type.
pub fn retag(value: Value, declared: &Type) -> Value {
    if let (Value::Array(array), Type::Array { element, .. }) = (&value, declared) {
        array.borrow_mut().element_type = (**element).clone();
    }
    value
}
