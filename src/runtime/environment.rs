//! Environment for variable scoping in the evaluator.
//!
//! Scopes form a parent chain of reference counted environments. Every
//! scope holds variable bindings, and the functions and structs declared
//! in it. Module roots also hold the module's globals that have not been
//! evaluated yet.

use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
};

use indexmap::IndexMap;

use crate::{
    ast::{
        statements::{FnDecl, GlobalDecl, StructDecl},
        types::{Primitive, Type},
    },
    errors::errors::ErrorImpl,
};

use super::value::{Slot, Value};

pub type Env = Rc<Environment>;

/// A variable binding: its declared type and the slot holding its value.
#[derive(Debug, Clone)]
pub struct Binding {
    pub type_: Type,
    pub slot: Slot,
}

/// A user function together with the root environment it runs in.
#[derive(Debug, Clone)]
pub struct Function {
    pub decl: FnDecl,
    home: Weak<Environment>,
}

impl Function {
    pub fn new(decl: FnDecl, home: &Env) -> Self {
        Function {
            decl,
            home: Rc::downgrade(home),
        }
    }

    pub fn home(&self) -> Result<Env, ErrorImpl> {
        self.home.upgrade().ok_or_else(|| ErrorImpl::UnsupportedOperation {
            message: format!(
                "the module defining `{}` is no longer loaded",
                self.decl.identifier
            ),
        })
    }
}

/// A loaded module bound by `use a.b`.
pub struct Namespace {
    /// Dotted module path.
    pub name: String,
    /// The module's root environment. Empty for directory modules.
    pub env: Env,
    /// Sub-modules of a directory module.
    pub submodules: IndexMap<String, Rc<Namespace>>,
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("name", &self.name)
            .field("submodules", &self.submodules.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Default)]
pub struct Environment {
    parent: Option<Env>,
    variables: RefCell<HashMap<String, Binding>>,
    functions: RefCell<HashMap<String, Function>>,
    structs: RefCell<HashMap<String, StructDecl>>,
    deferred: RefCell<HashMap<String, GlobalDecl>>,
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("variables", &self.variables.borrow().keys().collect::<Vec<_>>())
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}

impl Environment {
    pub fn new_root() -> Env {
        Rc::new(Environment::default())
    }

    pub fn child(parent: &Env) -> Env {
        Rc::new(Environment {
            parent: Some(Rc::clone(parent)),
            ..Environment::default()
        })
    }

    /// The outermost environment of this chain.
    pub fn root(self: &Rc<Self>) -> Env {
        let mut current = Rc::clone(self);
        while let Some(parent) = current.parent.clone() {
            current = parent;
        }
        current
    }

    /// Defines `name` in this scope, shadowing any outer binding.
    pub fn define(&self, name: &str, type_: Type, value: Value) {
        self.define_slot(name, type_, Rc::new(RefCell::new(value)));
    }

    /// Binds `name` to an existing slot, used to share imported globals.
    pub fn define_slot(&self, name: &str, type_: Type, slot: Slot) {
        self.variables
            .borrow_mut()
            .insert(name.to_string(), Binding { type_, slot });
    }

    pub fn lookup(&self, name: &str) -> Option<Binding> {
        if let Some(binding) = self.variables.borrow().get(name) {
            return Some(binding.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    pub fn get(&self, name: &str) -> Result<Value, ErrorImpl> {
        self.lookup(name)
            .map(|binding| binding.slot.borrow().clone())
            .ok_or_else(|| ErrorImpl::VariableNotDeclared {
                variable: name.to_string(),
            })
    }

    pub fn get_slot(&self, name: &str) -> Option<Slot> {
        self.lookup(name).map(|binding| binding.slot)
    }

    pub fn set(&self, name: &str, value: Value) -> Result<(), ErrorImpl> {
        match self.lookup(name) {
            Some(binding) => {
                *binding.slot.borrow_mut() = value;
                Ok(())
            }
            None => Err(ErrorImpl::VariableNotDeclared {
                variable: name.to_string(),
            }),
        }
    }

    pub fn define_function(&self, function: Function) {
        self.functions
            .borrow_mut()
            .insert(function.decl.identifier.clone(), function);
    }

    pub fn get_function(&self, name: &str) -> Option<Function> {
        if let Some(function) = self.functions.borrow().get(name) {
            return Some(function.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get_function(name))
    }

    pub fn define_struct(&self, decl: StructDecl) {
        self.structs
            .borrow_mut()
            .insert(decl.identifier.clone(), decl);
    }

    pub fn get_struct(&self, name: &str) -> Option<StructDecl> {
        if let Some(decl) = self.structs.borrow().get(name) {
            return Some(Rc::clone(decl));
        }
        self.parent.as_ref().and_then(|parent| parent.get_struct(name))
    }

    pub fn local_structs(&self) -> Vec<StructDecl> {
        self.structs.borrow().values().cloned().collect()
    }

    /// Registers a global whose initializer runs on first use.
    pub fn defer_global(&self, decl: GlobalDecl) {
        self.deferred
            .borrow_mut()
            .insert(decl.identifier.clone(), decl);
    }

    /// Removes a pending global from the nearest scope that holds it, together
    /// with that scope.
    pub fn take_deferred(self: &Rc<Self>, name: &str) -> Option<(Env, GlobalDecl)> {
        let mut current = Some(Rc::clone(self));
        while let Some(env) = current {
            let decl = env.deferred.borrow_mut().remove(name);
            if let Some(decl) = decl {
                return Some((env, decl));
            }
            current = env.parent.clone();
        }
        None
    }

    /// The value a declaration without initializer starts with.
    pub fn default_value(&self, type_: &Type) -> Value {
        self.default_value_guarded(type_, &mut vec![])
    }

    fn default_value_guarded(&self, type_: &Type, visiting: &mut Vec<String>) -> Value {
        match type_ {
            Type::Primitive(primitive) => match primitive {
                Primitive::Int => Value::Int(0),
                Primitive::Float => Value::Float(0.0),
                Primitive::String => Value::Str(String::new()),
                Primitive::Bool => Value::Bool(false),
                Primitive::Bytes => Value::Bytes(vec![]),
                Primitive::Void => Value::Null,
            },
            Type::Array { element, size } => {
                let elements = (0..size.unwrap_or(0))
                    .map(|_| self.default_value_guarded(element, visiting))
                    .collect();
                Value::new_array(elements, (**element).clone())
            }
            Type::Map { .. } => Value::new_map(IndexMap::new()),
            Type::Struct(name) => {
                // A struct that contains itself by value ends in `null`.
                if visiting.contains(name) {
                    return Value::Null;
                }
                let Some(decl) = self.get_struct(name) else {
                    return Value::Null;
                };

                visiting.push(name.clone());
                let fields = decl
                    .fields
                    .iter()
                    .map(|field| {
                        (
                            field.name.clone(),
                            self.default_value_guarded(&field.type_, visiting),
                        )
                    })
                    .collect();
                visiting.pop();

                Value::new_struct(name, fields)
            }
            Type::Ref(_) | Type::Module(_) => Value::Null,
        }
    }
}
