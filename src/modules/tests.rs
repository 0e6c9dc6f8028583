use std::{path::PathBuf, rc::Rc};

use pretty_assertions::assert_eq;

use super::resolver::{Export, ModuleResolver};
use crate::{errors::errors::ErrorKind, Position};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn stdlib() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("stdlib")
}

fn path(dotted: &str) -> Vec<String> {
    dotted.split('.').map(String::from).collect()
}

fn resolver() -> ModuleResolver {
    ModuleResolver::new(fixtures(), Some(stdlib()))
}

#[test]
fn test_resolves_file_module_exports() {
    let module = resolver().resolve(&path("math"), &Position::null()).unwrap();

    let exports: Vec<(&str, &str)> = module
        .exports
        .iter()
        .map(|(name, export)| (name.as_str(), export.kind()))
        .collect();
    assert_eq!(
        exports,
        vec![
            ("Vec2", "struct"),
            ("ORIGIN_X", "var"),
            ("SCALE", "var"),
            ("add", "func"),
            ("scaled", "func"),
        ]
    );
    assert!(!module.is_directory());
    assert_eq!(module.functions().count(), 2);
}

#[test]
fn test_records_module_imports() {
    let module = resolver().resolve(&path("cycle_a"), &Position::null()).unwrap();

    assert_eq!(module.imports.len(), 1);
    assert_eq!(module.imports[0].dotted_path(), "cycle_b");
}

#[test]
fn test_cache_returns_same_module() {
    let resolver = resolver();
    let first = resolver.resolve(&path("math"), &Position::null()).unwrap();
    let second = resolver.resolve(&path("math"), &Position::null()).unwrap();

    assert!(Rc::ptr_eq(&first, &second));
}

#[test]
fn test_directory_module_members() {
    let module = resolver().resolve(&path("geometry"), &Position::null()).unwrap();

    assert!(module.is_directory());
    let members: Vec<&String> = module.exports.keys().collect();
    assert_eq!(members, vec!["nested", "shapes", "units"]);
    assert!(matches!(
        module.get("nested"),
        Some(Export::Module(member)) if member == &path("geometry.nested")
    ));
}

#[test]
fn test_nested_path_resolves_to_file() {
    let module = resolver()
        .resolve(&path("geometry.nested.deep"), &Position::null())
        .unwrap();

    assert_eq!(module.name, "geometry.nested.deep");
    assert!(module.get("depth").is_some());
}

#[test]
fn test_falls_back_to_stdlib() {
    let module = resolver().resolve(&path("io"), &Position::null()).unwrap();

    assert!(module.get("File").is_some());
    assert!(module.get("open").is_some());
}

#[test]
fn test_base_directory_wins_over_stdlib() {
    let resolver = ModuleResolver::new(fixtures(), Some(fixtures().join("geometry")));

    let module = resolver.resolve(&path("math"), &Position::null()).unwrap();
    assert!(module.get("add").is_some());

    let module = resolver.resolve(&path("shapes"), &Position::null()).unwrap();
    assert!(module.get("area").is_some());
}

#[test]
fn test_missing_module_is_import_error() {
    let position = Position::new(4, 1, Rc::new(String::from("main.nx")));
    let error = resolver()
        .resolve(&path("does.not.exist"), &position)
        .unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ImportError);
    assert_eq!(error.get_position(), &position);
    assert_eq!(
        error.to_string(),
        "main.nx:4:1: ImportError: module `does.not.exist` not found"
    );
}

#[test]
fn test_parse_errors_point_into_the_module() {
    let error = resolver().resolve(&path("broken"), &Position::null()).unwrap_err();

    assert_eq!(error.kind(), ErrorKind::ParseError);
    assert!(error.get_position().file.ends_with("broken.nx"));
}
