use std::rc::Rc;

use tracing::trace;

use crate::{
    ast::{
        ast::{Expr, Stmt},
        statements::{AssignmentStmt, BlockStmt},
    },
    errors::errors::{Error, ErrorImpl},
    runtime::{
        environment::{Environment, Function},
        value::Value,
    },
    Position,
};

use super::{
    expr::{evaluate_expression, evaluate_index_key},
    interpreter::{at, retag, Flow, Interpreter},
};

pub fn execute_statement(interpreter: &mut Interpreter, stmt: &Stmt) -> Result<Flow, Error> {
    match stmt {
        Stmt::VarDecl(decl) => {
            let value = match &decl.assigned_value {
                Some(value) => evaluate_expression(interpreter, value)?,
                None => interpreter.env.default_value(&decl.explicit_type),
            };
            interpreter.env.define(
                &decl.identifier,
                decl.explicit_type.clone(),
                retag(value, &decl.explicit_type),
            );
        }
        Stmt::GlobalDecl(decl) => {
            let value = evaluate_expression(interpreter, &decl.assigned_value)?;
            interpreter.env.root().define(
                &decl.identifier,
                decl.explicit_type.clone(),
                retag(value, &decl.explicit_type),
            );
        }
        Stmt::Assignment(assignment) => execute_assignment(interpreter, assignment)?,
        Stmt::Expression(expression) => {
            evaluate_expression(interpreter, &expression.expression)?;
        }
        Stmt::If(if_stmt) => {
            let condition = evaluate_expression(interpreter, &if_stmt.condition)?;
            let truthy = condition
                .is_truthy()
                .map_err(at(&if_stmt.condition.get_span().start))?;

            if truthy {
                return execute_block(interpreter, &if_stmt.then_body);
            } else if let Some(else_body) = &if_stmt.else_body {
                return execute_block(interpreter, else_body);
            }
        }
        Stmt::While(while_stmt) => loop {
            let condition = evaluate_expression(interpreter, &while_stmt.condition)?;
            let truthy = condition
                .is_truthy()
                .map_err(at(&while_stmt.condition.get_span().start))?;
            if !truthy {
                break;
            }

            match execute_block(interpreter, &while_stmt.body)? {
                Flow::Next => {}
                Flow::Break => break,
                flow @ Flow::Return(_) => return Ok(flow),
            }
        },
        Stmt::Return(return_stmt) => {
            let value = match &return_stmt.value {
                Some(value) => evaluate_expression(interpreter, value)?,
                None => Value::Null,
            };
            return Ok(Flow::Return(value));
        }
        Stmt::Break(_) => return Ok(Flow::Break),
        // Top level declarations are registered before the program runs.
        Stmt::FnDecl(decl) => {
            if !is_root(interpreter) {
                let env = Rc::clone(&interpreter.env);
                env.define_function(Function::new(Rc::clone(decl), &env));
            }
        }
        Stmt::StructDecl(decl) => {
            if !is_root(interpreter) {
                interpreter.env.define_struct(Rc::clone(decl));
            }
        }
        Stmt::Use(_) => {}
    }

    Ok(Flow::Next)
}

fn is_root(interpreter: &Interpreter) -> bool {
    Rc::ptr_eq(&interpreter.env, &interpreter.global_env)
}

/// Runs `block` in a child scope of the current one.
pub fn execute_block(interpreter: &mut Interpreter, block: &BlockStmt) -> Result<Flow, Error> {
    let env = Environment::child(&interpreter.env);

    interpreter.in_env(env, |interpreter| {
        for stmt in block.iter() {
            match execute_statement(interpreter, stmt)? {
                Flow::Next => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Next)
    })
}

/// The value is evaluated before the target, so `a[f()] = g()` runs `g` first.
fn execute_assignment(
    interpreter: &mut Interpreter,
    assignment: &AssignmentStmt,
) -> Result<(), Error> {
    let value = evaluate_expression(interpreter, &assignment.value)?;
    let position = &assignment.assignee.get_span().start;

    match &assignment.assignee {
        Expr::Symbol(symbol) => {
            let env = Rc::clone(&interpreter.env);
            match interpreter.global_binding(&env, &symbol.value)? {
                Some(binding) => {
                    trace!("Assigning `{}`", symbol.value);
                    *binding.slot.borrow_mut() = retag(value, &binding.type_);
                    Ok(())
                }
                None => Err(Error::new(
                    ErrorImpl::VariableNotDeclared {
                        variable: symbol.value.clone(),
                    },
                    position.clone(),
                )),
            }
        }
        Expr::Member(member) => {
            let object = evaluate_expression(interpreter, &member.object)?;
            let object = object.deref().map_err(at(position))?;

            match object {
                Value::Struct(instance) => instance
                    .borrow_mut()
                    .set_field(&member.property, value)
                    .map_err(at(&member.span.start)),
                Value::Module(namespace) => {
                    match interpreter.global_binding(&namespace.env, &member.property)? {
                        Some(binding) => {
                            *binding.slot.borrow_mut() = value;
                            Ok(())
                        }
                        None => Err(Error::new(
                            ErrorImpl::SymbolNotExported {
                                symbol: member.property.clone(),
                                module: namespace.name.clone(),
                            },
                            member.span.start.clone(),
                        )),
                    }
                }
                Value::Null => Err(Error::new(
                    ErrorImpl::NullFieldAccess {
                        field: member.property.clone(),
                    },
                    member.span.start.clone(),
                )),
                other => Err(Error::new(
                    ErrorImpl::NoSuchField {
                        type_: other.type_name().to_string(),
                        field: member.property.clone(),
                    },
                    member.span.start.clone(),
                )),
            }
        }
        Expr::Index(index) => {
            let object = evaluate_expression(interpreter, &index.object)?;
            let object = object.deref().map_err(at(position))?;
            let key = evaluate_index_key(interpreter, &index.index)?;
            let index_position = &index.index.get_span().start;

            match object {
                Value::Array(array) => {
                    let Value::Int(offset) = key else {
                        return Err(not_indexable("array", &key, index_position));
                    };
                    array
                        .borrow_mut()
                        .set(offset, value)
                        .map_err(at(index_position))
                }
                Value::Map(map) => map
                    .borrow_mut()
                    .insert(&key, value)
                    .map_err(at(index_position)),
                Value::Str(_) | Value::Bytes(_) => Err(Error::new(
                    ErrorImpl::UnsupportedOperation {
                        message: format!("values of type `{}` are immutable", object.type_name()),
                    },
                    position.clone(),
                )),
                other => Err(not_indexable(other.type_name(), &key, index_position)),
            }
        }
        _ => Err(Error::new(
            ErrorImpl::InvalidAssignmentTarget,
            position.clone(),
        )),
    }
}

pub fn not_indexable(type_: &str, index: &Value, position: &Position) -> Error {
    Error::new(
        ErrorImpl::NotIndexable {
            type_: type_.to_string(),
            index: index.type_name().to_string(),
        },
        position.clone(),
    )
}
