use std::rc::Rc;

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use super::{
    environment::Environment,
    value::{format_value, MapKey, Reference, Value},
};
use crate::{
    ast::{
        statements::{StructDeclStmt, StructField},
        types::Type,
    },
    errors::errors::ErrorImpl,
    Position, Span,
};

fn point(x: i64, y: i64) -> Value {
    let mut fields = IndexMap::new();
    fields.insert(String::from("x"), Value::Int(x));
    fields.insert(String::from("y"), Value::Int(y));
    Value::new_struct("Point", fields)
}

fn field(value: &Value, name: &str) -> Value {
    match value {
        Value::Struct(instance) => instance.borrow().get_field(name).unwrap(),
        other => panic!("expected struct, got {:?}", other),
    }
}

#[test]
fn test_define_get_set_walk_outward() {
    let root = Environment::new_root();
    root.define("x", Type::int(), Value::Int(1));

    let child = Environment::child(&root);
    assert!(matches!(child.get("x"), Ok(Value::Int(1))));

    child.set("x", Value::Int(2)).unwrap();
    assert!(matches!(root.get("x"), Ok(Value::Int(2))));

    // Shadowing only affects the inner scope.
    child.define("x", Type::string(), Value::Str(String::from("inner")));
    assert!(matches!(child.get("x"), Ok(Value::Str(ref text)) if text == "inner"));
    assert!(matches!(root.get("x"), Ok(Value::Int(2))));
}

#[test]
fn test_unbound_names_are_name_errors() {
    let root = Environment::new_root();

    assert_eq!(
        root.get("missing").unwrap_err(),
        ErrorImpl::VariableNotDeclared {
            variable: String::from("missing")
        }
    );
    assert!(root.set("missing", Value::Null).is_err());
}

#[test]
fn test_root_of_nested_scopes() {
    let root = Environment::new_root();
    let inner = Environment::child(&Environment::child(&root));

    assert!(Rc::ptr_eq(&inner.root(), &root));
}

#[test]
fn test_slot_reference_sees_later_writes() {
    let root = Environment::new_root();
    root.define("count", Type::int(), Value::Int(1));

    let reference = Reference::Slot(root.get_slot("count").unwrap());
    root.set("count", Value::Int(7)).unwrap();
    assert!(matches!(reference.get(), Ok(Value::Int(7))));

    reference.set(Value::Int(9)).unwrap();
    assert!(matches!(root.get("count"), Ok(Value::Int(9))));
}

#[test]
fn test_field_and_index_references() {
    let value = point(1, 2);
    let Value::Struct(handle) = &value else {
        unreachable!()
    };
    let reference = Reference::Field(Rc::clone(handle), String::from("y"));
    reference.set(Value::Int(20)).unwrap();
    assert!(matches!(field(&value, "y"), Value::Int(20)));

    let array = Value::new_array(vec![Value::Int(0), Value::Int(0)], Type::int());
    let Value::Array(handle) = &array else {
        unreachable!()
    };
    Reference::Index(Rc::clone(handle), 1)
        .set(Value::Int(5))
        .unwrap();
    assert_eq!(array.to_string(), "[0, 5]");

    let stale = Reference::Index(Rc::clone(handle), 4);
    assert_eq!(
        stale.get().unwrap_err(),
        ErrorImpl::IndexOutOfBounds { index: 4, length: 2 }
    );
}

#[test]
fn test_unknown_field_is_field_error() {
    let value = point(1, 2);
    let Value::Struct(handle) = &value else {
        unreachable!()
    };

    let error = handle.borrow_mut().set_field("z", Value::Int(0)).unwrap_err();
    assert_eq!(
        error,
        ErrorImpl::UnknownField {
            struct_name: String::from("Point"),
            field: String::from("z")
        }
    );
}

#[test]
fn test_plain_copies_alias_and_deep_copies_do_not() {
    let original = point(1, 2);
    let alias = original.clone();
    let copy = original.deep_copy();

    if let Value::Struct(handle) = &alias {
        handle.borrow_mut().set_field("x", Value::Int(100)).unwrap();
    }

    assert!(matches!(field(&original, "x"), Value::Int(100)));
    assert!(matches!(field(&copy, "x"), Value::Int(1)));
}

#[test]
fn test_deep_copy_keeps_ref_fields_aliased() {
    let target = point(1, 2);
    let mut fields = IndexMap::new();
    fields.insert(String::from("value"), Value::Int(1));
    fields.insert(
        String::from("next"),
        Value::snapshot_ref(target.clone()),
    );
    let node = Value::new_struct("Node", fields);

    let copy = node.deep_copy();
    if let Value::Struct(handle) = &target {
        handle.borrow_mut().set_field("x", Value::Int(42)).unwrap();
    }

    let next = field(&copy, "next").deref().unwrap();
    assert!(matches!(field(&next, "x"), Value::Int(42)));
}

#[test]
fn test_deep_copy_of_nested_arrays() {
    let inner = Value::new_array(vec![Value::Int(1)], Type::int());
    let outer = Value::new_array(vec![inner.clone()], Type::array(Type::int(), None));

    let copy = outer.deep_copy();
    if let Value::Array(handle) = &inner {
        handle.borrow_mut().set(0, Value::Int(9)).unwrap();
    }

    assert_eq!(outer.to_string(), "[[9]]");
    assert_eq!(copy.to_string(), "[[1]]");
}

#[test]
fn test_truthiness() {
    assert!(!Value::Null.is_truthy().unwrap());
    assert!(!Value::Bool(false).is_truthy().unwrap());
    assert!(Value::Int(0).is_truthy().unwrap());
    assert!(Value::Str(String::new()).is_truthy().unwrap());
    assert!(!Value::snapshot_ref(Value::Null).is_truthy().unwrap());
    assert!(Value::snapshot_ref(point(0, 0)).is_truthy().unwrap());
}

#[test]
fn test_structural_equality() {
    assert!(point(1, 2).equals(&point(1, 2)).unwrap());
    assert!(!point(1, 2).equals(&point(2, 1)).unwrap());
    assert!(Value::Null.equals(&Value::Null).unwrap());
    assert!(!Value::Null.equals(&Value::Int(0)).unwrap());
    assert!(Value::snapshot_ref(Value::Int(3))
        .equals(&Value::Int(3))
        .unwrap());
    assert!(Value::snapshot_ref(Value::Null)
        .equals(&Value::Null)
        .unwrap());
}

#[test]
fn test_display() {
    assert_eq!(Value::Float(2.5).to_string(), "2.500000");
    assert_eq!(Value::Bool(true).to_string(), "true");
    assert_eq!(Value::Bytes(b"hi".to_vec()).to_string(), "hi");
    assert_eq!(point(1, 2).to_string(), "Point(x: 1, y: 2)");
    assert_eq!(Value::snapshot_ref(Value::Int(4)).to_string(), "4");

    let mut entries = IndexMap::new();
    entries.insert(MapKey::Str(String::from("b")), Value::Int(2));
    entries.insert(MapKey::Str(String::from("a")), Value::Int(1));
    assert_eq!(Value::new_map(entries).to_string(), "{b: 2, a: 1}");
}

#[test]
fn test_map_lookup() {
    let map = Value::new_map(IndexMap::new());
    let Value::Map(handle) = &map else {
        unreachable!()
    };

    handle
        .borrow_mut()
        .insert(&Value::Str(String::from("k")), Value::Int(1))
        .unwrap();
    assert!(matches!(
        handle.borrow().get(&Value::Str(String::from("k"))),
        Ok(Value::Int(1))
    ));
    assert_eq!(
        handle
            .borrow()
            .get(&Value::Str(String::from("nope")))
            .unwrap_err(),
        ErrorImpl::MissingKey {
            key: String::from("\"nope\"")
        }
    );
}

#[test]
fn test_format_specs() {
    assert_eq!(format_value(&Value::Int(255), Some("x")), "ff");
    assert_eq!(format_value(&Value::Int(255), Some("X")), "FF");
    assert_eq!(format_value(&Value::Int(8), Some("o")), "10");
    assert_eq!(format_value(&Value::Int(5), Some("b")), "101");
    assert_eq!(format_value(&Value::Int(42), Some("5")), "   42");
    assert_eq!(format_value(&Value::Int(42), Some("05")), "00042");
    assert_eq!(format_value(&Value::Int(-42), Some("05")), "-0042");
    assert_eq!(format_value(&Value::Float(3.14159), Some(".2f")), "3.14");
    assert_eq!(format_value(&Value::Float(1500.0), Some(".2e")), "1.50e+03");
    assert_eq!(format_value(&Value::Float(2.5), None), "2.500000");
    assert_eq!(format_value(&Value::Str(String::from("ab")), Some("4")), "ab  ");
    assert_eq!(format_value(&Value::Int(7), Some("??")), "7");
}

fn decl(name: &str, fields: Vec<(&str, Type)>) -> Rc<StructDeclStmt> {
    let position = Position::null();
    Rc::new(StructDeclStmt {
        identifier: name.to_string(),
        fields: fields
            .into_iter()
            .map(|(name, type_)| StructField {
                name: name.to_string(),
                type_,
            })
            .collect(),
        span: Span::new(position.clone(), position),
    })
}

#[test]
fn test_default_values() {
    let root = Environment::new_root();
    root.define_struct(decl("Point", vec![("x", Type::int()), ("y", Type::float())]));
    root.define_struct(decl(
        "Node",
        vec![
            ("value", Type::int()),
            ("next", Type::reference(Type::Struct(String::from("Node")))),
            ("inner", Type::Struct(String::from("Node"))),
        ],
    ));

    assert_eq!(
        root.default_value(&Type::array(Type::int(), Some(3))).to_string(),
        "[0, 0, 0]"
    );
    assert_eq!(
        root.default_value(&Type::Struct(String::from("Point"))).to_string(),
        "Point(x: 0, y: 0.000000)"
    );
    assert_eq!(
        root.default_value(&Type::Struct(String::from("Node"))).to_string(),
        "Node(value: 0, next: null, inner: null)"
    );
    assert!(matches!(
        root.default_value(&Type::map(Type::string(), Type::int())),
        Value::Map(_)
    ));
}

fn self_linked_node(value: i64) -> Value {
    let mut fields = IndexMap::new();
    fields.insert(String::from("value"), Value::Int(value));
    fields.insert(String::from("next"), Value::Null);
    let node = Value::new_struct("Node", fields);

    if let Value::Struct(handle) = &node {
        handle.borrow_mut().set_field("next", node.clone()).unwrap();
    }
    node
}

#[test]
fn test_cyclic_values_display() {
    assert_eq!(self_linked_node(1).to_string(), "Node(value: 1, next: ...)");

    let array = Value::new_array(vec![Value::Int(1)], Type::int());
    if let Value::Array(handle) = &array {
        handle.borrow_mut().elements.push(array.clone());
    }
    assert_eq!(array.to_string(), "[1, ...]");

    // A handle reached twice without a cycle prints in full both times.
    let shared = point(1, 2);
    let pair = Value::new_array(vec![shared.clone(), shared], Type::Struct(String::from("Point")));
    assert_eq!(pair.to_string(), "[Point(x: 1, y: 2), Point(x: 1, y: 2)]");
}

#[test]
fn test_cyclic_values_compare() {
    assert!(self_linked_node(1).equals(&self_linked_node(1)).unwrap());
    assert!(!self_linked_node(1).equals(&self_linked_node(2)).unwrap());
}

#[test]
fn test_deep_copy_of_a_cycle_is_a_cycle() {
    let node = self_linked_node(1);
    let copy = node.deep_copy();

    let (Value::Struct(original), Value::Struct(copied)) = (&node, &copy) else {
        panic!("expected structs");
    };
    assert!(!Rc::ptr_eq(original, copied));

    let Value::Struct(next) = field(&copy, "next") else {
        panic!("expected a struct in `next`");
    };
    assert!(Rc::ptr_eq(&next, copied));
}

#[test]
fn test_oversized_format_specs_print_plainly() {
    assert_eq!(format_value(&Value::Int(7), Some("999999999999")), "7");
    assert_eq!(format_value(&Value::Float(1.0), Some(".5000f")), "1.000000");
    assert_eq!(format_value(&Value::Int(7), Some("3")).len(), 3);
}
