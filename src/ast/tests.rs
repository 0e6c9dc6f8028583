//! Unit tests for type equality and compatibility.

use std::collections::HashSet;

use pretty_assertions::assert_eq;

use super::types::{compatible, Type};

#[test]
fn test_str_is_an_alias_of_string() {
    let str_type = Type::primitive("str").unwrap();
    let string_type = Type::primitive("string").unwrap();

    assert_eq!(str_type, string_type);

    let mut set = HashSet::new();
    set.insert(str_type);
    assert!(set.contains(&string_type));
    assert!(set.contains(&Type::string()));
    assert_eq!(Type::string().to_string(), "string");
}

#[test]
fn test_array_equality_ignores_size() {
    let fixed = Type::array(Type::int(), Some(5));
    let dynamic = Type::array(Type::int(), None);

    assert_eq!(fixed, dynamic);
    assert_ne!(fixed, Type::array(Type::float(), Some(5)));

    let mut set = HashSet::new();
    set.insert(fixed);
    assert!(set.contains(&dynamic));
}

#[test]
fn test_nominal_structs_and_refs() {
    assert_eq!(Type::Struct("P".into()), Type::Struct("P".into()));
    assert_ne!(Type::Struct("P".into()), Type::Struct("Q".into()));
    assert_eq!(
        Type::reference(Type::Struct("P".into())),
        Type::reference(Type::Struct("P".into()))
    );
    assert_ne!(Type::reference(Type::int()), Type::int());
}

#[test]
fn test_null_is_only_compatible_with_refs() {
    assert!(compatible(&Type::reference(Type::Struct("Node".into())), &Type::null()));
    assert!(!compatible(&Type::int(), &Type::null()));
    assert!(!compatible(&Type::Struct("Node".into()), &Type::null()));
}

#[test]
fn test_array_compatibility_is_size_blind() {
    // zeros(10) assigned to an int[5]: accepted, the declared size is never enforced.
    assert!(compatible(
        &Type::array(Type::int(), Some(5)),
        &Type::array(Type::int(), None)
    ));
    assert!(compatible(
        &Type::array(Type::int(), None),
        &Type::array(Type::int(), Some(5))
    ));
    assert!(compatible(
        &Type::array(Type::string(), Some(3)),
        &Type::array(Type::string(), Some(2))
    ));
    assert!(!compatible(
        &Type::array(Type::string(), Some(3)),
        &Type::array(Type::int(), Some(3))
    ));
}

#[test]
fn test_empty_literal_placeholders() {
    let empty_array = Type::array(Type::void(), Some(0));
    assert!(compatible(&Type::array(Type::Struct("P".into()), None), &empty_array));
    assert_ne!(Type::array(Type::int(), None), empty_array);

    let empty_map = Type::map(Type::void(), Type::void());
    assert!(compatible(&Type::map(Type::string(), Type::int()), &empty_map));
    assert!(!compatible(
        &Type::map(Type::string(), Type::int()),
        &Type::map(Type::string(), Type::float())
    ));
}

#[test]
fn test_type_display() {
    assert_eq!(Type::array(Type::int(), Some(3)).to_string(), "int[3]");
    assert_eq!(Type::array(Type::int(), None).to_string(), "int[]");
    assert_eq!(Type::reference(Type::Struct("P".into())).to_string(), "ref P");
    assert_eq!(Type::map(Type::string(), Type::bool()).to_string(), "map[string, bool]");
}
