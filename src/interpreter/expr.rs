use std::rc::Rc;

use indexmap::IndexMap;

use crate::{
    ast::{
        ast::Expr,
        expressions::{BinaryExpr, BinaryOperator, CallExpr, FStringPart, MemberExpr, PrefixOperator},
        types::Type,
    },
    errors::errors::{Error, ErrorImpl},
    runtime::{
        environment::Namespace,
        value::{format_value, MapKey, Reference, Value},
    },
    Position,
};

use super::{
    interpreter::{at, Interpreter},
    stmt::not_indexable,
};

/// Largest array `zeros` will allocate.
pub const MAX_ZEROS: i64 = 100_000;

pub fn evaluate_expression(interpreter: &mut Interpreter, expr: &Expr) -> Result<Value, Error> {
    match expr {
        Expr::Int(int) => Ok(Value::Int(int.value)),
        Expr::Float(float) => Ok(Value::Float(float.value)),
        Expr::String(string) => Ok(Value::Str(string.value.clone())),
        Expr::Bytes(bytes) => Ok(Value::Bytes(bytes.value.clone())),
        Expr::Bool(boolean) => Ok(Value::Bool(boolean.value)),
        Expr::Null(_) => Ok(Value::Null),
        Expr::Symbol(symbol) => {
            let env = Rc::clone(&interpreter.env);
            match interpreter.global_binding(&env, &symbol.value)? {
                Some(binding) => Ok(binding.slot.borrow().clone()),
                None => Err(Error::new(
                    ErrorImpl::VariableNotDeclared {
                        variable: symbol.value.clone(),
                    },
                    symbol.span.start.clone(),
                )),
            }
        }
        Expr::Binary(binary) => evaluate_binary(interpreter, binary),
        Expr::Prefix(prefix) => {
            let operand = evaluate_expression(interpreter, &prefix.right_expr)?;
            let position = &prefix.span.start;
            let operand = operand.deref().map_err(at(position))?;

            match (prefix.operator, &operand) {
                (PrefixOperator::Negate, Value::Int(int)) => Ok(Value::Int(int.wrapping_neg())),
                (PrefixOperator::Negate, Value::Float(float)) => Ok(Value::Float(-float)),
                (PrefixOperator::Not, _) => {
                    Ok(Value::Bool(!operand.is_truthy().map_err(at(position))?))
                }
                (operator, other) => Err(Error::new(
                    ErrorImpl::InvalidOperand {
                        operator: operator.to_string(),
                        operand: other.type_name().to_string(),
                    },
                    position.clone(),
                )),
            }
        }
        Expr::Call(call) => evaluate_call(interpreter, call),
        Expr::Index(index) => {
            let object = evaluate_expression(interpreter, &index.object)?;
            let object = object.deref().map_err(at(&index.span.start))?;
            let key = evaluate_index_key(interpreter, &index.index)?;

            index_value(&object, &key, &index.index.get_span().start)
        }
        Expr::Member(member) => evaluate_member(interpreter, member),
        Expr::ArrayLiteral(array) => {
            let elements = array
                .elements
                .iter()
                .map(|element| evaluate_expression(interpreter, element))
                .collect::<Result<Vec<_>, _>>()?;
            let element_type = elements
                .first()
                .map(runtime_type)
                .unwrap_or_else(Type::void);

            Ok(Value::new_array(elements, element_type))
        }
        Expr::MapLiteral(map) => {
            let mut entries = IndexMap::new();
            for (key, value) in map.entries.iter() {
                let key_value = evaluate_index_key(interpreter, key)?;
                let key_value =
                    MapKey::from_value(&key_value).map_err(at(&key.get_span().start))?;
                entries.insert(key_value, evaluate_expression(interpreter, value)?);
            }
            Ok(Value::new_map(entries))
        }
        Expr::Ref(reference) => evaluate_ref(interpreter, &reference.target),
        Expr::Zeros(zeros) => {
            let size = evaluate_expression(interpreter, &zeros.size)?;
            let position = &zeros.size.get_span().start;

            match size.deref().map_err(at(position))? {
                Value::Int(size) if (0..=MAX_ZEROS).contains(&size) => Ok(Value::new_array(
                    vec![Value::Int(0); size as usize],
                    Type::int(),
                )),
                Value::Int(size) => Err(Error::new(
                    ErrorImpl::InvalidArraySize { size },
                    position.clone(),
                )),
                other => Err(Error::new(
                    ErrorImpl::TypeMatchError {
                        expected: String::from("int"),
                        received: other.type_name().to_string(),
                    },
                    position.clone(),
                )),
            }
        }
        Expr::FString(fstring) => {
            let mut text = String::new();
            for part in fstring.parts.iter() {
                match part {
                    FStringPart::Text(literal) => text.push_str(literal),
                    FStringPart::Expr { expr, format_spec } => {
                        let value = evaluate_expression(interpreter, expr)?;
                        text.push_str(&format_value(&value, format_spec.as_deref()));
                    }
                }
            }
            Ok(Value::Str(text))
        }
    }
}

/// Evaluates an index or map key with references followed.
pub fn evaluate_index_key(interpreter: &mut Interpreter, expr: &Expr) -> Result<Value, Error> {
    let value = evaluate_expression(interpreter, expr)?;
    value.deref().map_err(at(&expr.get_span().start))
}

fn index_value(object: &Value, key: &Value, position: &Position) -> Result<Value, Error> {
    match (object, key) {
        (Value::Array(array), Value::Int(offset)) => {
            array.borrow().get(*offset).map_err(at(position))
        }
        (Value::Str(text), Value::Int(offset)) => {
            let length = text.chars().count();
            usize::try_from(*offset)
                .ok()
                .and_then(|offset| text.chars().nth(offset))
                .map(|ch| Value::Str(ch.to_string()))
                .ok_or_else(|| out_of_bounds(*offset, length, position))
        }
        (Value::Bytes(bytes), Value::Int(offset)) => usize::try_from(*offset)
            .ok()
            .and_then(|offset| bytes.get(offset))
            .map(|byte| Value::Int(*byte as i64))
            .ok_or_else(|| out_of_bounds(*offset, bytes.len(), position)),
        (Value::Map(map), _) => map.borrow().get(key).map_err(at(position)),
        (other, _) => Err(not_indexable(other.type_name(), key, position)),
    }
}

fn out_of_bounds(index: i64, length: usize, position: &Position) -> Error {
    Error::new(ErrorImpl::IndexOutOfBounds { index, length }, position.clone())
}

/// The element type recorded for an array literal.
fn runtime_type(value: &Value) -> Type {
    match value {
        Value::Int(_) => Type::int(),
        Value::Float(_) => Type::float(),
        Value::Str(_) => Type::string(),
        Value::Bool(_) => Type::bool(),
        Value::Bytes(_) => Type::bytes(),
        Value::Struct(instance) => Type::Struct(instance.borrow().name.clone()),
        Value::Array(array) => Type::array(array.borrow().element_type.clone(), None),
        Value::Map(_) => Type::map(Type::void(), Type::void()),
        Value::Ref(reference) => match reference.get() {
            Ok(target) => Type::reference(runtime_type(&target)),
            Err(_) => Type::null(),
        },
        Value::Null => Type::null(),
        Value::Module(namespace) => Type::Module(namespace.name.clone()),
    }
}

fn evaluate_binary(interpreter: &mut Interpreter, binary: &BinaryExpr) -> Result<Value, Error> {
    let position = &binary.span.start;

    if binary.operator.is_logical() {
        let left = evaluate_expression(interpreter, &binary.left)?;
        let left = left.is_truthy().map_err(at(position))?;

        let short_circuit = match binary.operator {
            BinaryOperator::And => !left,
            _ => left,
        };
        if short_circuit {
            return Ok(Value::Bool(left));
        }

        let right = evaluate_expression(interpreter, &binary.right)?;
        return Ok(Value::Bool(right.is_truthy().map_err(at(position))?));
    }

    let left = evaluate_expression(interpreter, &binary.left)?;
    let right = evaluate_expression(interpreter, &binary.right)?;

    if binary.operator.is_equality() {
        let equal = left.equals(&right).map_err(at(position))?;
        return Ok(Value::Bool(match binary.operator {
            BinaryOperator::Equals => equal,
            _ => !equal,
        }));
    }

    let left = left.deref().map_err(at(position))?;
    let right = right.deref().map_err(at(position))?;

    binary_operation(binary.operator, &left, &right).map_err(at(position))
}

/// Arithmetic and ordering on already dereferenced operands.
pub fn binary_operation(
    operator: BinaryOperator,
    left: &Value,
    right: &Value,
) -> Result<Value, ErrorImpl> {
    use BinaryOperator::*;

    match (left, right) {
        (Value::Int(a), Value::Int(b)) => {
            let (a, b) = (*a, *b);
            Ok(match operator {
                Add => Value::Int(a.wrapping_add(b)),
                Subtract => Value::Int(a.wrapping_sub(b)),
                Multiply => Value::Int(a.wrapping_mul(b)),
                Divide if b == 0 => return Err(ErrorImpl::DivisionByZero),
                Divide => Value::Int(floor_div(a, b)),
                Modulo if b == 0 => return Err(ErrorImpl::ModuloByZero),
                Modulo => Value::Int(floor_mod(a, b)),
                Greater => Value::Bool(a > b),
                GreaterEquals => Value::Bool(a >= b),
                Less => Value::Bool(a < b),
                LessEquals => Value::Bool(a <= b),
                _ => return Err(invalid_operands(operator, left, right)),
            })
        }
        (Value::Int(a), Value::Float(b)) => float_operation(operator, *a as f64, *b),
        (Value::Float(a), Value::Int(b)) => float_operation(operator, *a, *b as f64),
        (Value::Float(a), Value::Float(b)) => float_operation(operator, *a, *b),
        (Value::Str(a), Value::Str(b)) => Ok(match operator {
            Add => Value::Str(format!("{}{}", a, b)),
            Greater => Value::Bool(a > b),
            GreaterEquals => Value::Bool(a >= b),
            Less => Value::Bool(a < b),
            LessEquals => Value::Bool(a <= b),
            _ => return Err(invalid_operands(operator, left, right)),
        }),
        (Value::Bytes(a), Value::Bytes(b)) if operator == Add => {
            Ok(Value::Bytes([a.as_slice(), b.as_slice()].concat()))
        }
        _ => Err(invalid_operands(operator, left, right)),
    }
}

fn float_operation(operator: BinaryOperator, a: f64, b: f64) -> Result<Value, ErrorImpl> {
    use BinaryOperator::*;

    Ok(match operator {
        Add => Value::Float(a + b),
        Subtract => Value::Float(a - b),
        Multiply => Value::Float(a * b),
        Divide if b == 0.0 => return Err(ErrorImpl::DivisionByZero),
        Divide => Value::Float(a / b),
        Modulo if b == 0.0 => return Err(ErrorImpl::ModuloByZero),
        Modulo => {
            let remainder = a % b;
            if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
                Value::Float(remainder + b)
            } else {
                Value::Float(remainder)
            }
        }
        Greater => Value::Bool(a > b),
        GreaterEquals => Value::Bool(a >= b),
        Less => Value::Bool(a < b),
        LessEquals => Value::Bool(a <= b),
        _ => {
            return Err(invalid_operands(
                operator,
                &Value::Float(a),
                &Value::Float(b),
            ))
        }
    })
}

/// Division rounding towards negative infinity.
fn floor_div(a: i64, b: i64) -> i64 {
    let quotient = a.wrapping_div(b);
    if a.wrapping_rem(b) != 0 && ((a < 0) != (b < 0)) {
        quotient.wrapping_sub(1)
    } else {
        quotient
    }
}

/// Remainder with the sign of the divisor.
fn floor_mod(a: i64, b: i64) -> i64 {
    let remainder = a.wrapping_rem(b);
    if remainder != 0 && ((remainder < 0) != (b < 0)) {
        remainder.wrapping_add(b)
    } else {
        remainder
    }
}

fn invalid_operands(operator: BinaryOperator, left: &Value, right: &Value) -> ErrorImpl {
    ErrorImpl::InvalidOperands {
        operator: operator.to_string(),
        left: left.type_name().to_string(),
        right: right.type_name().to_string(),
    }
}

fn evaluate_call(interpreter: &mut Interpreter, call: &CallExpr) -> Result<Value, Error> {
    match call.callee.as_ref() {
        Expr::Symbol(symbol) => {
            let env = Rc::clone(&interpreter.env);
            interpreter.call_named(&env, &symbol.value, call)
        }
        Expr::Member(member) => {
            let object = evaluate_expression(interpreter, &member.object)?;
            let object = object.deref().map_err(at(&member.span.start))?;

            let Value::Module(namespace) = object else {
                return Err(not_callable(member, &call.span.start));
            };

            if let Some(decl) = namespace.env.get_struct(&member.property) {
                return interpreter.construct(&decl, call);
            }
            if let Some(function) = namespace.env.get_function(&member.property) {
                return interpreter.call_function(&function, call);
            }

            Err(Error::new(
                ErrorImpl::SymbolNotExported {
                    symbol: member.property.clone(),
                    module: namespace.name.clone(),
                },
                member.span.start.clone(),
            ))
        }
        other => Err(Error::new(
            ErrorImpl::NotCallable {
                callee: other.describe(),
            },
            call.span.start.clone(),
        )),
    }
}

fn not_callable(member: &MemberExpr, position: &Position) -> Error {
    Error::new(
        ErrorImpl::NotCallable {
            callee: format!("{}.{}", member.object.describe(), member.property),
        },
        position.clone(),
    )
}

fn evaluate_member(interpreter: &mut Interpreter, member: &MemberExpr) -> Result<Value, Error> {
    let object = evaluate_expression(interpreter, &member.object)?;
    let object = object.deref().map_err(at(&member.span.start))?;

    member_value(interpreter, object, member)
}

fn member_value(
    interpreter: &mut Interpreter,
    object: Value,
    member: &MemberExpr,
) -> Result<Value, Error> {
    let position = &member.span.start;

    match object {
        Value::Struct(instance) => instance
            .borrow()
            .get_field(&member.property)
            .map_err(at(position)),
        Value::Module(namespace) => {
            namespace_member(interpreter, &namespace, &member.property, position)
        }
        Value::Null => Err(Error::new(
            ErrorImpl::NullFieldAccess {
                field: member.property.clone(),
            },
            position.clone(),
        )),
        other => Err(Error::new(
            ErrorImpl::NoSuchField {
                type_: other.type_name().to_string(),
                field: member.property.clone(),
            },
            position.clone(),
        )),
    }
}

/// Reads `name` through a namespace: a sub-module or a global. Functions and
/// structs can only be called.
fn namespace_member(
    interpreter: &mut Interpreter,
    namespace: &Rc<Namespace>,
    name: &str,
    position: &Position,
) -> Result<Value, Error> {
    if let Some(submodule) = namespace.submodules.get(name) {
        return Ok(Value::Module(Rc::clone(submodule)));
    }

    if let Some(binding) = interpreter.global_binding(&namespace.env, name)? {
        return Ok(binding.slot.borrow().clone());
    }

    let kind = if namespace.env.get_function(name).is_some() {
        Some("function")
    } else if namespace.env.get_struct(name).is_some() {
        Some("struct")
    } else {
        None
    };

    let error = match kind {
        Some(kind) => ErrorImpl::NotAValue {
            name: format!("{}.{}", namespace.name, name),
            kind: kind.to_string(),
        },
        None => ErrorImpl::SymbolNotExported {
            symbol: name.to_string(),
            module: namespace.name.clone(),
        },
    };
    Err(Error::new(error, position.clone()))
}

/// `ref x`, `ref s.f` and `ref a[i]` point at live storage. Anything else is
/// copied into a fresh slot.
fn evaluate_ref(interpreter: &mut Interpreter, target: &Expr) -> Result<Value, Error> {
    let position = &target.get_span().start;

    match target {
        Expr::Symbol(symbol) => {
            let env = Rc::clone(&interpreter.env);
            match interpreter.global_binding(&env, &symbol.value)? {
                Some(binding) => Ok(Value::Ref(Reference::Slot(binding.slot))),
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

            match object.deref().map_err(at(position))? {
                Value::Struct(instance) => {
                    // Fails early on an unknown field.
                    instance
                        .borrow()
                        .get_field(&member.property)
                        .map_err(at(&member.span.start))?;
                    Ok(Value::Ref(Reference::Field(
                        instance,
                        member.property.clone(),
                    )))
                }
                Value::Module(namespace) => {
                    match interpreter.global_binding(&namespace.env, &member.property)? {
                        Some(binding) => Ok(Value::Ref(Reference::Slot(binding.slot))),
                        None => Ok(Value::snapshot_ref(namespace_member(
                            interpreter,
                            &namespace,
                            &member.property,
                            &member.span.start,
                        )?)),
                    }
                }
                other => Ok(Value::snapshot_ref(member_value(interpreter, other, member)?)),
            }
        }
        Expr::Index(index) => {
            let object = evaluate_expression(interpreter, &index.object)?;
            let object = object.deref().map_err(at(position))?;

            let key = evaluate_index_key(interpreter, &index.index)?;
            let key_position = &index.index.get_span().start;

            match (&object, &key) {
                (Value::Array(array), Value::Int(offset)) => {
                    // The offset is checked once, the reference then stays on that element.
                    array.borrow().get(*offset).map_err(at(key_position))?;
                    Ok(Value::Ref(Reference::Index(
                        Rc::clone(array),
                        *offset as usize,
                    )))
                }
                _ => Ok(Value::snapshot_ref(index_value(&object, &key, key_position)?)),
            }
        }
        other => Ok(Value::snapshot_ref(evaluate_expression(interpreter, other)?)),
    }
}
