use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    path::PathBuf,
    rc::Rc,
};

use tracing::debug;

use crate::{
    ast::{
        ast::{Expr, Program, Stmt},
        expressions::{BinaryExpr, BinaryOperator, CallExpr, FStringPart, MemberExpr, PrefixOperator},
        statements::{BlockStmt, FnDecl, ImportSelection, StructDecl, UseStmt},
        types::{compatible, Type},
    },
    errors::errors::{Error, ErrorImpl},
    modules::resolver::{Export, Module, ModuleResolver},
    native::registry::{NativeRegistry, NativeSignature, ParamKind},
    Position,
};

/// Canonical paths of the modules already checked during this run.
type CheckedModules = Rc<RefCell<HashSet<PathBuf>>>;

#[derive(Debug)]
pub struct TypeChecker {
    /// Innermost scope last. Index 0 holds globals and imports.
    scopes: Vec<HashMap<String, Type>>,
    functions: HashMap<String, FnDecl>,
    structs: HashMap<String, StructDecl>,
    current_return: Option<Type>,
    loop_depth: usize,
    resolver: Rc<ModuleResolver>,
    natives: Rc<NativeRegistry>,
    checked: CheckedModules,
}

impl TypeChecker {
    pub fn new(resolver: Rc<ModuleResolver>, natives: Rc<NativeRegistry>) -> Self {
        TypeChecker::with_checked(resolver, natives, Rc::new(RefCell::new(HashSet::new())))
    }

    fn with_checked(
        resolver: Rc<ModuleResolver>,
        natives: Rc<NativeRegistry>,
        checked: CheckedModules,
    ) -> Self {
        TypeChecker {
            scopes: vec![HashMap::new()],
            functions: HashMap::new(),
            structs: HashMap::new(),
            current_return: None,
            loop_depth: 0,
            resolver,
            natives,
            checked,
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn define_variable(&mut self, name: &str, type_: Type) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), type_);
        }
    }

    fn define_global(&mut self, name: &str, type_: Type) {
        self.scopes[0].insert(name.to_string(), type_);
    }

    pub fn lookup_variable(&self, name: &str) -> Option<&Type> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name))
    }

    fn is_top_level(&self) -> bool {
        self.scopes.len() == 1 && self.current_return.is_none()
    }

    /// Phase 1: imports, then struct and function signatures, then global names.
    fn register_declarations(&mut self, program: &Program) -> Result<(), Error> {
        for stmt in program.body.iter() {
            if let Stmt::Use(use_stmt) = stmt {
                self.process_use(use_stmt)?;
            }
        }

        for stmt in program.body.iter() {
            match stmt {
                Stmt::StructDecl(decl) => {
                    self.structs.insert(decl.identifier.clone(), Rc::clone(decl));
                }
                Stmt::FnDecl(decl) => {
                    self.functions.insert(decl.identifier.clone(), Rc::clone(decl));
                }
                Stmt::GlobalDecl(decl) => {
                    self.define_global(&decl.identifier, decl.explicit_type.clone());
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Checks the entry program: every statement, in order.
    pub fn check_program(&mut self, program: &Program) -> Result<(), Error> {
        self.register_declarations(program)?;

        for stmt in program.body.iter() {
            type_check_stmt(self, stmt)?;
        }

        Ok(())
    }

    /// Checks an imported module. Only its declarations are checked, since
    /// nothing else in a module ever runs.
    fn check_module(&mut self, program: &Program) -> Result<(), Error> {
        self.register_declarations(program)?;

        for stmt in program.body.iter() {
            if matches!(
                stmt,
                Stmt::FnDecl(_) | Stmt::StructDecl(_) | Stmt::GlobalDecl(_)
            ) {
                type_check_stmt(self, stmt)?;
            }
        }

        Ok(())
    }

    /// Resolves a module and checks it the first time it is seen. The module
    /// is marked before it is checked, so import cycles end.
    fn load_module(&mut self, path: &[String], position: &Position) -> Result<Rc<Module>, Error> {
        let module = self.resolver.resolve(path, position)?;

        if let Some(program) = &module.program {
            let first_visit = self.checked.borrow_mut().insert(module.path.clone());
            if first_visit {
                debug!("Type checking module `{}`", module.name);
                let mut checker = TypeChecker::with_checked(
                    Rc::clone(&self.resolver),
                    Rc::clone(&self.natives),
                    Rc::clone(&self.checked),
                );
                checker.check_module(program)?;
            }
        }

        Ok(module)
    }

    fn load_namespace(&mut self, dotted: &str, position: &Position) -> Result<Rc<Module>, Error> {
        let path: Vec<String> = dotted.split('.').map(String::from).collect();
        self.load_module(&path, position)
    }

    fn process_use(&mut self, use_stmt: &UseStmt) -> Result<(), Error> {
        let position = &use_stmt.span.start;
        let module = self.load_module(&use_stmt.path, position)?;

        match &use_stmt.selection {
            ImportSelection::All => {
                for (name, export) in module.exports.iter() {
                    self.import_export(name, export);
                }
            }
            ImportSelection::Names(names) => {
                for name in names.iter() {
                    let export = module.get(name).ok_or_else(|| {
                        Error::new(
                            ErrorImpl::SymbolNotExported {
                                symbol: name.clone(),
                                module: use_stmt.dotted_path(),
                            },
                            position.clone(),
                        )
                    })?;
                    self.import_export(name, export);
                }
            }
            ImportSelection::Namespace => {
                let name = use_stmt.path.last().cloned().unwrap_or_default();
                self.define_global(&name, Type::Module(use_stmt.dotted_path()));
                for decl in module.structs() {
                    self.structs.insert(decl.identifier.clone(), Rc::clone(decl));
                }
            }
        }

        Ok(())
    }

    fn import_export(&mut self, name: &str, export: &Export) {
        match export {
            Export::Func(decl) => {
                self.functions.insert(name.to_string(), Rc::clone(decl));
            }
            Export::Struct(decl) => {
                self.structs.insert(name.to_string(), Rc::clone(decl));
            }
            Export::Var(decl) => self.define_global(name, decl.explicit_type.clone()),
            Export::Module(path) => self.define_global(name, Type::Module(path.join("."))),
        }
    }

    /// Struct names must be declared and map keys hashable.
    fn validate_type(&self, type_: &Type, position: &Position) -> Result<(), Error> {
        match type_ {
            Type::Primitive(_) | Type::Module(_) => Ok(()),
            Type::Array { element, .. } => self.validate_type(element, position),
            Type::Ref(inner) => self.validate_type(inner, position),
            Type::Struct(name) => {
                if self.structs.contains_key(name) {
                    Ok(())
                } else {
                    Err(Error::new(
                        ErrorImpl::UnknownType {
                            type_: name.clone(),
                        },
                        position.clone(),
                    ))
                }
            }
            Type::Map { key, value } => {
                if !key.is_valid_map_key() {
                    return Err(Error::new(
                        ErrorImpl::InvalidMapKey {
                            type_: key.to_string(),
                        },
                        position.clone(),
                    ));
                }
                self.validate_type(value, position)
            }
        }
    }
}

/// Checks `program` and every module it imports. The first error found is returned.
pub fn type_check(
    program: &Program,
    resolver: Rc<ModuleResolver>,
    natives: Rc<NativeRegistry>,
) -> Result<(), Error> {
    let mut type_checker = TypeChecker::new(resolver, natives);
    type_checker.check_program(program)
}

fn mismatch(expected: &Type, received: &Type, position: &Position) -> Error {
    Error::new(
        ErrorImpl::TypeMatchError {
            expected: expected.to_string(),
            received: received.to_string(),
        },
        position.clone(),
    )
}

fn expect_bool(
    type_checker: &mut TypeChecker,
    construct: &str,
    condition: &Expr,
) -> Result<(), Error> {
    let condition_type = type_check_expr(type_checker, condition)?;
    if condition_type != Type::bool() {
        return Err(Error::new(
            ErrorImpl::ConditionNotBool {
                construct: construct.to_string(),
                received: condition_type.to_string(),
            },
            condition.get_span().start.clone(),
        ));
    }
    Ok(())
}

fn type_check_block(type_checker: &mut TypeChecker, block: &BlockStmt) -> Result<(), Error> {
    type_checker.push_scope();
    for stmt in block.iter() {
        type_check_stmt(type_checker, stmt)?;
    }
    type_checker.pop_scope();
    Ok(())
}

fn nested_declaration(declaration: &str, position: &Position) -> Error {
    Error::new(
        ErrorImpl::NestedDeclaration {
            declaration: declaration.to_string(),
        },
        position.clone(),
    )
}

pub fn type_check_stmt(type_checker: &mut TypeChecker, stmt: &Stmt) -> Result<(), Error> {
    let position = &stmt.get_span().start;

    match stmt {
        Stmt::VarDecl(decl) => {
            type_checker.validate_type(&decl.explicit_type, position)?;
            if let Some(value) = &decl.assigned_value {
                let value_type = type_check_expr(type_checker, value)?;
                if !compatible(&decl.explicit_type, &value_type) {
                    return Err(mismatch(
                        &decl.explicit_type,
                        &value_type,
                        &value.get_span().start,
                    ));
                }
            }
            type_checker.define_variable(&decl.identifier, decl.explicit_type.clone());
        }
        Stmt::GlobalDecl(decl) => {
            type_checker.validate_type(&decl.explicit_type, position)?;
            let value_type = type_check_expr(type_checker, &decl.assigned_value)?;
            if !compatible(&decl.explicit_type, &value_type) {
                return Err(mismatch(
                    &decl.explicit_type,
                    &value_type,
                    &decl.assigned_value.get_span().start,
                ));
            }
            type_checker.define_global(&decl.identifier, decl.explicit_type.clone());
        }
        Stmt::Assignment(assignment) => {
            let target_type = type_check_expr(type_checker, &assignment.assignee)?;
            let value_type = type_check_expr(type_checker, &assignment.value)?;
            if !compatible(&target_type, &value_type) {
                return Err(mismatch(
                    &target_type,
                    &value_type,
                    &assignment.value.get_span().start,
                ));
            }
        }
        Stmt::Expression(expression) => {
            type_check_expr(type_checker, &expression.expression)?;
        }
        Stmt::If(if_stmt) => {
            expect_bool(type_checker, "if", &if_stmt.condition)?;
            type_check_block(type_checker, &if_stmt.then_body)?;
            if let Some(else_body) = &if_stmt.else_body {
                type_check_block(type_checker, else_body)?;
            }
        }
        Stmt::While(while_stmt) => {
            expect_bool(type_checker, "while", &while_stmt.condition)?;
            type_checker.loop_depth += 1;
            type_check_block(type_checker, &while_stmt.body)?;
            type_checker.loop_depth -= 1;
        }
        Stmt::Return(return_stmt) => {
            let Some(expected) = type_checker.current_return.clone() else {
                return Err(Error::new(ErrorImpl::ReturnOutsideFunction, position.clone()));
            };

            match &return_stmt.value {
                None if !expected.is_void() => {
                    return Err(Error::new(
                        ErrorImpl::MissingReturnValue {
                            expected: expected.to_string(),
                        },
                        position.clone(),
                    ));
                }
                None => {}
                Some(value) => {
                    let value_type = type_check_expr(type_checker, value)?;
                    if !compatible(&expected, &value_type) {
                        return Err(mismatch(&expected, &value_type, &value.get_span().start));
                    }
                }
            }
        }
        Stmt::Break(_) => {
            if type_checker.loop_depth == 0 {
                return Err(Error::new(ErrorImpl::BreakOutsideLoop, position.clone()));
            }
        }
        Stmt::FnDecl(decl) => {
            if !type_checker.is_top_level() {
                return Err(nested_declaration("func", position));
            }

            for parameter in decl.parameters.iter() {
                type_checker.validate_type(&parameter.type_, position)?;
            }
            type_checker.validate_type(&decl.return_type, position)?;

            type_checker.push_scope();
            for parameter in decl.parameters.iter() {
                type_checker.define_variable(&parameter.name, parameter.type_.clone());
            }
            type_checker.current_return = Some(decl.return_type.clone());
            let outer_loop_depth = std::mem::replace(&mut type_checker.loop_depth, 0);

            for stmt in decl.body.iter() {
                type_check_stmt(type_checker, stmt)?;
            }

            type_checker.loop_depth = outer_loop_depth;
            type_checker.current_return = None;
            type_checker.pop_scope();
        }
        Stmt::StructDecl(decl) => {
            if !type_checker.is_top_level() {
                return Err(nested_declaration("struct", position));
            }
            for field in decl.fields.iter() {
                type_checker.validate_type(&field.type_, position)?;
            }
        }
        Stmt::Use(_) => {
            // Imports are processed before any statement is checked.
            if !type_checker.is_top_level() {
                return Err(nested_declaration("use", position));
            }
        }
    }

    Ok(())
}

pub fn type_check_expr(type_checker: &mut TypeChecker, expr: &Expr) -> Result<Type, Error> {
    let position = &expr.get_span().start;

    match expr {
        Expr::Int(_) => Ok(Type::int()),
        Expr::Float(_) => Ok(Type::float()),
        Expr::String(_) => Ok(Type::string()),
        Expr::Bytes(_) => Ok(Type::bytes()),
        Expr::Bool(_) => Ok(Type::bool()),
        Expr::Null(_) => Ok(Type::null()),
        Expr::Symbol(symbol) => type_checker
            .lookup_variable(&symbol.value)
            .cloned()
            .ok_or_else(|| {
                Error::new(
                    ErrorImpl::VariableNotDeclared {
                        variable: symbol.value.clone(),
                    },
                    position.clone(),
                )
            }),
        Expr::Binary(binary) => type_check_binary(type_checker, binary),
        Expr::Prefix(prefix) => {
            let operand = type_check_expr(type_checker, &prefix.right_expr)?;
            let valid = match prefix.operator {
                PrefixOperator::Negate => operand.is_numeric(),
                PrefixOperator::Not => operand == Type::bool(),
            };

            if valid {
                Ok(operand)
            } else {
                Err(Error::new(
                    ErrorImpl::InvalidOperand {
                        operator: prefix.operator.to_string(),
                        operand: operand.to_string(),
                    },
                    position.clone(),
                ))
            }
        }
        Expr::Call(call) => type_check_call(type_checker, call),
        Expr::Index(index) => {
            let object = type_check_expr(type_checker, &index.object)?;
            let index_type = type_check_expr(type_checker, &index.index)?;

            let result = match object.deref() {
                Type::Array { element, .. } if index_type == Type::int() => {
                    Some((**element).clone())
                }
                Type::Primitive(_) if *object.deref() == Type::string() && index_type == Type::int() => {
                    Some(Type::string())
                }
                Type::Primitive(_) if *object.deref() == Type::bytes() && index_type == Type::int() => {
                    Some(Type::int())
                }
                Type::Map { key, value } if compatible(key, &index_type) => Some((**value).clone()),
                _ => None,
            };

            result.ok_or_else(|| {
                Error::new(
                    ErrorImpl::NotIndexable {
                        type_: object.to_string(),
                        index: index_type.to_string(),
                    },
                    position.clone(),
                )
            })
        }
        Expr::Member(member) => type_check_member(type_checker, member),
        Expr::ArrayLiteral(array) => {
            let Some(first) = array.elements.first() else {
                return Ok(Type::array(Type::void(), Some(0)));
            };

            let element_type = type_check_expr(type_checker, first)?;
            for element in array.elements.iter().skip(1) {
                let other = type_check_expr(type_checker, element)?;
                if !compatible(&element_type, &other) {
                    return Err(mismatch(&element_type, &other, &element.get_span().start));
                }
            }

            Ok(Type::array(element_type, Some(array.elements.len())))
        }
        Expr::MapLiteral(map) => {
            let Some((first_key, first_value)) = map.entries.first() else {
                return Ok(Type::map(Type::void(), Type::void()));
            };

            let key_type = type_check_expr(type_checker, first_key)?;
            if !key_type.is_valid_map_key() {
                return Err(Error::new(
                    ErrorImpl::InvalidMapKey {
                        type_: key_type.to_string(),
                    },
                    first_key.get_span().start.clone(),
                ));
            }
            let value_type = type_check_expr(type_checker, first_value)?;

            for (key, value) in map.entries.iter().skip(1) {
                let other_key = type_check_expr(type_checker, key)?;
                if !compatible(&key_type, &other_key) {
                    return Err(mismatch(&key_type, &other_key, &key.get_span().start));
                }
                let other_value = type_check_expr(type_checker, value)?;
                if !compatible(&value_type, &other_value) {
                    return Err(mismatch(&value_type, &other_value, &value.get_span().start));
                }
            }

            Ok(Type::map(key_type, value_type))
        }
        Expr::Ref(reference) => Ok(Type::reference(type_check_expr(
            type_checker,
            &reference.target,
        )?)),
        Expr::Zeros(zeros) => {
            let size = type_check_expr(type_checker, &zeros.size)?;
            if size != Type::int() {
                return Err(mismatch(&Type::int(), &size, &zeros.size.get_span().start));
            }
            Ok(Type::array(Type::int(), None))
        }
        Expr::FString(fstring) => {
            for part in fstring.parts.iter() {
                if let FStringPart::Expr { expr, .. } = part {
                    type_check_expr(type_checker, expr)?;
                }
            }
            Ok(Type::string())
        }
    }
}

fn type_check_binary(type_checker: &mut TypeChecker, binary: &BinaryExpr) -> Result<Type, Error> {
    let left = type_check_expr(type_checker, &binary.left)?;
    let right = type_check_expr(type_checker, &binary.right)?;
    let operator = binary.operator;

    let result = match operator {
        BinaryOperator::Add
            if left == right && (left == Type::string() || left == Type::bytes()) =>
        {
            Some(left.clone())
        }
        _ if operator.is_arithmetic() => (left == right && left.is_numeric()).then(|| left.clone()),
        _ if operator.is_comparison() => (left == right && left.is_numeric()).then(Type::bool),
        _ if operator.is_equality() => {
            ((left.is_ref() && right.is_ref()) || left == right).then(Type::bool)
        }
        _ => (left == Type::bool() && right == Type::bool()).then(Type::bool),
    };

    result.ok_or_else(|| {
        Error::new(
            ErrorImpl::InvalidOperands {
                operator: operator.to_string(),
                left: left.to_string(),
                right: right.to_string(),
            },
            binary.span.start.clone(),
        )
    })
}

fn type_check_member(type_checker: &mut TypeChecker, member: &MemberExpr) -> Result<Type, Error> {
    let position = &member.span.start;
    let object = type_check_expr(type_checker, &member.object)?;

    match object.deref() {
        Type::Struct(name) => {
            let Some(decl) = type_checker.structs.get(name) else {
                return Err(Error::new(
                    ErrorImpl::UnknownType {
                        type_: name.clone(),
                    },
                    position.clone(),
                ));
            };

            decl.field(&member.property)
                .map(|field| field.type_.clone())
                .ok_or_else(|| {
                    Error::new(
                        ErrorImpl::NoSuchField {
                            type_: name.clone(),
                            field: member.property.clone(),
                        },
                        position.clone(),
                    )
                })
        }
        Type::Module(dotted) => {
            let module = type_checker.load_namespace(dotted, position)?;
            match module.get(&member.property) {
                Some(Export::Var(decl)) => Ok(decl.explicit_type.clone()),
                Some(Export::Module(path)) => Ok(Type::Module(path.join("."))),
                Some(export) => Err(Error::new(
                    ErrorImpl::NotAValue {
                        name: format!("{}.{}", dotted, member.property),
                        kind: export.kind().to_string(),
                    },
                    position.clone(),
                )),
                None => Err(Error::new(
                    ErrorImpl::SymbolNotExported {
                        symbol: member.property.clone(),
                        module: dotted.clone(),
                    },
                    position.clone(),
                )),
            }
        }
        _ => Err(Error::new(
            ErrorImpl::NoSuchField {
                type_: object.to_string(),
                field: member.property.clone(),
            },
            position.clone(),
        )),
    }
}

/// `ref T` parameters also take a bare struct or array of type `T`, which is then
/// passed without copying.
fn argument_compatible(parameter: &Type, argument: &Type) -> bool {
    if compatible(parameter, argument) {
        return true;
    }

    match parameter {
        Type::Ref(inner) => match (&**inner, argument) {
            (Type::Struct(_), Type::Struct(_)) => **inner == *argument,
            (Type::Array { .. }, Type::Array { .. }) => compatible(inner, argument),
            _ => false,
        },
        _ => false,
    }
}

fn check_arity(function: &str, expected: usize, call: &CallExpr) -> Result<(), Error> {
    if expected != call.arguments.len() {
        return Err(Error::new(
            ErrorImpl::UnexpectedArguments {
                function: function.to_string(),
                expected,
                received: call.arguments.len(),
            },
            call.span.start.clone(),
        ));
    }
    Ok(())
}

fn check_arguments(
    type_checker: &mut TypeChecker,
    function: &str,
    parameters: &[Type],
    call: &CallExpr,
) -> Result<(), Error> {
    check_arity(function, parameters.len(), call)?;

    for (index, (parameter, argument)) in parameters.iter().zip(call.arguments.iter()).enumerate() {
        let argument_type = type_check_expr(type_checker, argument)?;
        if !argument_compatible(parameter, &argument_type) {
            return Err(Error::new(
                ErrorImpl::ArgumentTypeMatchError {
                    function: function.to_string(),
                    index: index + 1,
                    expected: parameter.to_string(),
                    received: argument_type.to_string(),
                },
                argument.get_span().start.clone(),
            ));
        }
    }

    Ok(())
}

/// Constructor arguments are matched against the fields in declaration order.
fn check_constructor(
    type_checker: &mut TypeChecker,
    decl: &StructDecl,
    call: &CallExpr,
) -> Result<Type, Error> {
    check_arity(&decl.identifier, decl.fields.len(), call)?;

    for (field, argument) in decl.fields.iter().zip(call.arguments.iter()) {
        let argument_type = type_check_expr(type_checker, argument)?;
        if !compatible(&field.type_, &argument_type) {
            return Err(Error::new(
                ErrorImpl::FieldTypeMatchError {
                    field: field.name.clone(),
                    expected: field.type_.to_string(),
                    received: argument_type.to_string(),
                },
                argument.get_span().start.clone(),
            ));
        }
    }

    Ok(Type::Struct(decl.identifier.clone()))
}

fn check_function_call(
    type_checker: &mut TypeChecker,
    decl: &FnDecl,
    call: &CallExpr,
) -> Result<Type, Error> {
    let parameters: Vec<Type> = decl
        .parameters
        .iter()
        .map(|parameter| parameter.type_.clone())
        .collect();
    check_arguments(type_checker, &decl.identifier, &parameters, call)?;
    Ok(decl.return_type.clone())
}

/// Whether an argument of type `argument` may be passed as `param`. The
/// container-relative kinds are resolved against `container`, the first
/// argument's type with one ref removed.
fn native_param_accepts(param: &ParamKind, container: Option<&Type>, argument: &Type) -> bool {
    match param {
        ParamKind::Any => true,
        ParamKind::Is(expected) => compatible(expected, argument),
        ParamKind::Array => matches!(argument.deref(), Type::Array { .. }),
        ParamKind::Sequence => {
            matches!(argument.deref(), Type::Array { .. }) || *argument.deref() == Type::string()
        }
        ParamKind::Map => matches!(argument.deref(), Type::Map { .. }),
        // An empty literal's placeholder element takes anything.
        ParamKind::Element => match element_type(container) {
            Some(element) => element.is_void() || compatible(&element, argument),
            None => false,
        },
        ParamKind::Key => match container {
            Some(Type::Map { key, .. }) => key.is_void() || compatible(key, argument),
            _ => false,
        },
    }
}

/// What an array holds, or `string` for the characters of a string.
fn element_type(container: Option<&Type>) -> Option<Type> {
    match container {
        Some(Type::Array { element, .. }) => Some((**element).clone()),
        Some(string) if *string == Type::string() => Some(Type::string()),
        _ => None,
    }
}

fn describe_param(param: &ParamKind, container: Option<&Type>) -> String {
    match (param, container) {
        (ParamKind::Any, _) => String::from("any"),
        (ParamKind::Is(expected), _) => expected.to_string(),
        (ParamKind::Array, _) => String::from("array"),
        (ParamKind::Sequence, _) => String::from("array or string"),
        (ParamKind::Map, _) => String::from("map"),
        (ParamKind::Element, Some(Type::Array { element, .. })) => element.to_string(),
        (ParamKind::Element, _) => String::from("string"),
        (ParamKind::Key, Some(Type::Map { key, .. })) => key.to_string(),
        (ParamKind::Key, _) => String::from("map key"),
    }
}

fn check_native_call(
    type_checker: &mut TypeChecker,
    name: &str,
    signature: &NativeSignature,
    call: &CallExpr,
) -> Result<Type, Error> {
    let NativeSignature::Fixed { params, .. } = signature else {
        for argument in call.arguments.iter() {
            type_check_expr(type_checker, argument)?;
        }
        return Ok(signature.return_type(None));
    };

    check_arity(name, params.len(), call)?;

    let mut container: Option<Type> = None;
    for (index, (param, argument)) in params.iter().zip(call.arguments.iter()).enumerate() {
        let argument_type = type_check_expr(type_checker, argument)?;

        if !native_param_accepts(param, container.as_ref(), &argument_type) {
            return Err(Error::new(
                ErrorImpl::ArgumentTypeMatchError {
                    function: name.to_string(),
                    index: index + 1,
                    expected: describe_param(param, container.as_ref()),
                    received: argument_type.to_string(),
                },
                argument.get_span().start.clone(),
            ));
        }

        if index == 0 {
            container = Some(argument_type.deref().clone());
        }
    }

    Ok(signature.return_type(container.as_ref()))
}

fn type_check_call(type_checker: &mut TypeChecker, call: &CallExpr) -> Result<Type, Error> {
    match &*call.callee {
        Expr::Symbol(symbol) => {
            let name = symbol.value.as_str();

            if let Some(decl) = type_checker.structs.get(name).cloned() {
                return check_constructor(type_checker, &decl, call);
            }
            if let Some(decl) = type_checker.functions.get(name).cloned() {
                return check_function_call(type_checker, &decl, call);
            }

            let Some(native) = type_checker.natives.get(name).cloned() else {
                return Err(Error::new(
                    ErrorImpl::FunctionNotDeclared {
                        function: name.to_string(),
                    },
                    symbol.span.start.clone(),
                ));
            };

            check_native_call(type_checker, name, &native.signature, call)
        }
        Expr::Member(member) => {
            let object = type_check_expr(type_checker, &member.object)?;
            let Type::Module(dotted) = object else {
                return Err(Error::new(
                    ErrorImpl::NotCallable {
                        callee: call.callee.describe(),
                    },
                    member.span.start.clone(),
                ));
            };

            let module = type_checker.load_namespace(&dotted, &member.span.start)?;
            match module.get(&member.property) {
                Some(Export::Func(decl)) => check_function_call(type_checker, decl, call),
                Some(Export::Struct(decl)) => check_constructor(type_checker, decl, call),
                Some(_) => Err(Error::new(
                    ErrorImpl::NotCallable {
                        callee: call.callee.describe(),
                    },
                    member.span.start.clone(),
                )),
                None => Err(Error::new(
                    ErrorImpl::SymbolNotExported {
                        symbol: member.property.clone(),
                        module: dotted,
                    },
                    member.span.start.clone(),
                )),
            }
        }
        other => Err(Error::new(
            ErrorImpl::NotCallable {
                callee: other.describe(),
            },
            other.get_span().start.clone(),
        )),
    }
}
