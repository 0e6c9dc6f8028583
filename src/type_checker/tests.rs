use std::{path::PathBuf, rc::Rc};

use pretty_assertions::assert_eq;

use super::type_checker::type_check;
use crate::{
    errors::errors::{Error, ErrorImpl, ErrorKind},
    lexer::lexer::tokenize,
    modules::resolver::ModuleResolver,
    native::registry::NativeRegistry,
    parser::parser::parse,
};

fn check(source: &str) -> Result<(), Error> {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    let tokens = tokenize(source.to_string(), Some(String::from("test.nx")))?;
    let program = parse(tokens, Rc::new(String::from("test.nx")))?;

    let resolver = ModuleResolver::new(root.join("tests/fixtures"), Some(root.join("stdlib")));
    type_check(
        &program,
        Rc::new(resolver),
        Rc::new(NativeRegistry::with_defaults()),
    )
}

fn check_err(source: &str) -> Error {
    check(source).expect_err("expected a type error")
}

#[test]
fn test_str_is_string() {
    check("let a: str = \"x\"\nlet b: string = a\n").unwrap();
}

#[test]
fn test_array_sizes_are_not_checked() {
    check("let x: int[5] = zeros(5)\n").unwrap();
    check("let y: string[3] = [\"a\", \"b\"]\n").unwrap();
    // Known gap: the declared size is never compared with the runtime length.
    check("let z: int[5] = zeros(10)\n").unwrap();
    check("let e: float[2] = []\n").unwrap();
}

#[test]
fn test_array_element_type_mismatch() {
    let error = check_err("let y: string[3] = [1, 2]\n");

    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::TypeMatchError {
            expected: String::from("string[3]"),
            received: String::from("int[2]")
        }
    );
    assert_eq!(error.get_position().line, 1);
    assert_eq!(error.get_position().column, 20);
}

#[test]
fn test_first_error_wins() {
    let error = check_err("let a: int = \"one\"\nlet b: string = 2\n");

    assert_eq!(error.kind(), ErrorKind::TypeError);
    assert_eq!(error.get_position().line, 1);
}

#[test]
fn test_arithmetic_rules() {
    check("let a: int = 2\nlet b: int = a + 3\nlet c: float = 1.5 * 2.0\n").unwrap();
    check("let s: string = \"a\" + \"b\"\nlet t: bytes = b\"a\" + b\"b\"\n").unwrap();

    let error = check_err("let a: int = 1 + 2.0\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::InvalidOperands {
            operator: String::from("+"),
            left: String::from("int"),
            right: String::from("float")
        }
    );
    assert_eq!(check_err("let s: string = \"a\" - \"b\"\n").kind(), ErrorKind::TypeError);
    assert_eq!(check_err("let b: bool = \"a\" < \"b\"\n").kind(), ErrorKind::TypeError);
}

#[test]
fn test_logic_and_unary_rules() {
    check("let a: bool = !(1 < 2) & true | false\nlet n: int = -3\n").unwrap();

    assert!(matches!(
        check_err("let a: bool = 1 & true\n").get_internal_error(),
        ErrorImpl::InvalidOperands { .. }
    ));
    assert!(matches!(
        check_err("let a: int = -true\n").get_internal_error(),
        ErrorImpl::InvalidOperand { .. }
    ));
    assert!(matches!(
        check_err("let a: bool = !1\n").get_internal_error(),
        ErrorImpl::InvalidOperand { .. }
    ));
}

#[test]
fn test_equality_of_refs_and_null() {
    let source = "
struct Node
    value: int
    next: ref Node
end
let n: Node = Node(1, null)
let same: bool = n.next == null
let other: bool = 1 == 1
";
    check(source).unwrap();

    assert!(matches!(
        check_err("let a: bool = 1 == \"1\"\n").get_internal_error(),
        ErrorImpl::InvalidOperands { .. }
    ));
}

#[test]
fn test_null_only_fits_refs() {
    check("let r: ref int = null\n").unwrap();

    let error = check_err("let x: int = null\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::TypeMatchError {
            expected: String::from("int"),
            received: String::from("ref void")
        }
    );
}

#[test]
fn test_conditions_must_be_bool() {
    check("if 1 < 2 then\n    print(1)\nend\n").unwrap();

    let error = check_err("while 1 do\n    break\nend\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::ConditionNotBool {
            construct: String::from("while"),
            received: String::from("int")
        }
    );
}

#[test]
fn test_block_scopes_end() {
    let error = check_err("if true then\n    let inner: int = 1\nend\nprint(inner)\n");

    assert_eq!(error.kind(), ErrorKind::NameError);
    assert_eq!(error.get_position().line, 4);
}

#[test]
fn test_functions_and_returns() {
    let source = "
func add(a: int, b: int) -> int
    return a + b
end
func shout(s: string)
    print(s)
    return
end
let total: int = add(1, 2)
shout(\"hi\")
";
    check(source).unwrap();

    let error = check_err("func f() -> int\n    return \"x\"\nend\n");
    assert_eq!(error.get_position().line, 2);
    assert_eq!(error.kind(), ErrorKind::TypeError);

    assert!(matches!(
        check_err("func f() -> int\n    return\nend\n").get_internal_error(),
        ErrorImpl::MissingReturnValue { .. }
    ));
    assert_eq!(
        check_err("return 1\n").get_internal_error(),
        &ErrorImpl::ReturnOutsideFunction
    );
    assert_eq!(
        check_err("func f()\n    break\nend\n").get_internal_error(),
        &ErrorImpl::BreakOutsideLoop
    );
}

#[test]
fn test_functions_see_later_globals() {
    let source = "
func read() -> int
    return counter
end
global counter: int = 3
";
    check(source).unwrap();
}

#[test]
fn test_call_arity_and_argument_types() {
    let error = check_err("func f(a: int) -> int\n    return a\nend\nf(1, 2)\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::UnexpectedArguments {
            function: String::from("f"),
            expected: 1,
            received: 2
        }
    );

    let error = check_err("func f(a: int) -> int\n    return a\nend\nf(\"x\")\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::ArgumentTypeMatchError {
            function: String::from("f"),
            index: 1,
            expected: String::from("int"),
            received: String::from("string")
        }
    );

    assert_eq!(check_err("nope(1)\n").kind(), ErrorKind::NameError);
}

#[test]
fn test_ref_parameters_accept_bare_structs_and_arrays() {
    let source = "
struct P
    x: int
end
func bump(p: ref P)
    p.x = p.x + 1
end
func fill(a: ref int[])
    a[0] = 1
end
let p: P = P(1)
bump(p)
bump(ref p)
let a: int[3] = zeros(3)
fill(a)
";
    check(source).unwrap();

    let error = check_err("struct P\n    x: int\nend\nfunc f(p: P)\n    print(p)\nend\nlet p: P = P(1)\nf(ref p)\n");
    assert!(matches!(
        error.get_internal_error(),
        ErrorImpl::ArgumentTypeMatchError { .. }
    ));
}

#[test]
fn test_constructors() {
    let source = "struct Pt\n    x: int\n    y: int\nend\nlet p: Pt = Pt(1, 2)\np.x = 9\n";
    check(source).unwrap();

    let error = check_err("struct Pt\n    x: int\n    y: int\nend\nlet p: Pt = Pt(1, \"2\")\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::FieldTypeMatchError {
            field: String::from("y"),
            expected: String::from("int"),
            received: String::from("string")
        }
    );

    let error = check_err("struct Pt\n    x: int\nend\nlet p: Pt = Pt(1)\nprint(p.z)\n");
    assert!(matches!(error.get_internal_error(), ErrorImpl::NoSuchField { .. }));
}

#[test]
fn test_bare_struct_name_is_not_a_value() {
    let error = check_err("struct Pt\n    x: int\nend\nprint(Pt)\n");

    assert_eq!(error.kind(), ErrorKind::NameError);
}

#[test]
fn test_unknown_types() {
    assert!(matches!(
        check_err("let p: Missing = null\n").get_internal_error(),
        ErrorImpl::UnknownType { .. }
    ));
    assert!(matches!(
        check_err("let m: map[float, int] = {}\n").get_internal_error(),
        ErrorImpl::InvalidMapKey { .. }
    ));
}

#[test]
fn test_indexing() {
    let source = "
let a: int[2] = [1, 2]
let x: int = a[0]
let s: string = \"abc\"[1]
let b: int = b\"ab\"[0]
let m: map[string, int] = {\"k\": 1}
let v: int = m[\"k\"]
let r: ref int[] = ref a
let y: int = r[1]
";
    check(source).unwrap();

    assert!(matches!(
        check_err("let m: map[string, int] = {\"k\": 1}\nprint(m[1])\n").get_internal_error(),
        ErrorImpl::NotIndexable { .. }
    ));
    assert!(matches!(
        check_err("let a: int = 1\nprint(a[0])\n").get_internal_error(),
        ErrorImpl::NotIndexable { .. }
    ));
}

#[test]
fn test_literals() {
    check("let m: map[string, int] = {}\nlet n: map[int, bool] = {1: true, 2: false}\n").unwrap();

    assert_eq!(
        check_err("let a: int[2] = [1, \"x\"]\n").get_position().column,
        21
    );
    assert_eq!(
        check_err("let m: map[int, int] = {1: 1, 2: \"x\"}\n").kind(),
        ErrorKind::TypeError
    );
    assert!(matches!(
        check_err("print({1.5: 1})\n").get_internal_error(),
        ErrorImpl::InvalidMapKey { .. }
    ));
    assert_eq!(check_err("let z: int[] = zeros(\"3\")\n").kind(), ErrorKind::TypeError);
}

#[test]
fn test_fstring_expressions_are_checked() {
    check("let n: int = 2\nprint(f\"n = {n:05}\")\n").unwrap();

    assert_eq!(check_err("print(f\"{missing}\")\n").kind(), ErrorKind::NameError);
}

#[test]
fn test_native_signatures() {
    check("let n: int = strlen(\"abc\")\nprint(1, \"two\", 3.0)\n").unwrap();

    let error = check_err("let n: int = strlen(5)\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::ArgumentTypeMatchError {
            function: String::from("strlen"),
            index: 1,
            expected: String::from("string"),
            received: String::from("int")
        }
    );
    assert!(matches!(
        check_err("let s: string = to_str(1, 2)\n").get_internal_error(),
        ErrorImpl::UnexpectedArguments { .. }
    ));
}

#[test]
fn test_nested_declarations_are_rejected() {
    assert_eq!(
        check_err("func outer()\n    func inner()\n    end\nend\n").get_internal_error(),
        &ErrorImpl::NestedDeclaration {
            declaration: String::from("func")
        }
    );
    assert!(matches!(
        check_err("if true then\n    struct S\n        x: int\n    end\nend\n").get_internal_error(),
        ErrorImpl::NestedDeclaration { .. }
    ));
}

#[test]
fn test_selected_imports() {
    let source = "
use math select add, Vec2, SCALE
let v: Vec2 = Vec2(1, 2)
let n: int = add(v.x, SCALE)
";
    check(source).unwrap();

    let error = check_err("use math select nope\n");
    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::SymbolNotExported {
            symbol: String::from("nope"),
            module: String::from("math")
        }
    );
    assert_eq!(error.kind(), ErrorKind::ImportError);

    assert_eq!(check_err("use math select add\nscaled(1)\n").kind(), ErrorKind::NameError);
}

#[test]
fn test_select_all_and_namespaces() {
    check("use math select *\nlet v: Vec2 = scaled(Vec2(1, 1))\n").unwrap();

    let source = "
use math
let v: Vec2 = math.Vec2(1, 2)
let n: int = math.add(math.SCALE, v.y)
";
    check(source).unwrap();

    assert!(matches!(
        check_err("use math\nprint(math.add)\n").get_internal_error(),
        ErrorImpl::NotAValue { .. }
    ));
    assert_eq!(
        check_err("use math\nlet s: string = math.SCALE\n").kind(),
        ErrorKind::TypeError
    );
}

#[test]
fn test_directory_namespaces() {
    check("use geometry\nlet a: int = geometry.shapes.area(geometry.shapes.Rect(2, 3))\n").unwrap();
    check("use geometry.nested.deep select depth\nlet d: int = depth()\n").unwrap();
}

#[test]
fn test_import_cycles_terminate() {
    check("use cycle_a select ping\nprint(ping(3))\n").unwrap();
}

#[test]
fn test_stdlib_modules() {
    let source = "
use io
use strings select to_upper
let f: File = io.open(\"missing.txt\", \"r\")
let ok: bool = f.open
print(to_upper(\"x\"))
";
    check(source).unwrap();
}

#[test]
fn test_missing_module() {
    let error = check_err("use nowhere select x\n");

    assert_eq!(error.kind(), ErrorKind::ImportError);
    assert_eq!(error.to_string(), "test.nx:1:1: ImportError: module `nowhere` not found");
}

#[test]
fn test_container_natives_use_element_types() {
    let source = "
let xs: int[] = [1]
append(xs, 2)
remove(xs, 1)
let last: int = pop(xs)
let found: bool = contains(xs, 3)
let within: bool = contains(\"noxy\", \"ox\")
let m: map[string, int] = {\"a\": 1}
let names: string[] = keys(m)
let known: bool = has_key(m, \"a\")
delete(m, \"a\")
let r: ref int[] = ref xs
append(r, 4)
";
    check(source).unwrap();
}

#[test]
fn test_append_rejects_a_foreign_element() {
    let error = check_err("let xs: int[] = [1]\nappend(xs, \"a\")\nlet y: int = xs[1] + 1\n");

    assert_eq!(
        error.get_internal_error(),
        &ErrorImpl::ArgumentTypeMatchError {
            function: String::from("append"),
            index: 2,
            expected: String::from("int"),
            received: String::from("string")
        }
    );
    assert_eq!(error.get_position().line, 2);
}

#[test]
fn test_container_natives_reject_mismatches() {
    for source in [
        "let xs: int[] = [1]\nlet b: bool = contains(xs, \"a\")\n",
        "let xs: int[] = [1]\nremove(xs, 1.5)\n",
        "let s: string = pop([1, 2])\n",
        "let m: map[string, int] = {\"a\": 1}\nlet b: bool = has_key(m, 1)\n",
        "let m: map[string, int] = {\"a\": 1}\ndelete(m, true)\n",
        "let m: map[string, int] = {\"a\": 1}\nlet ks: int[] = keys(m)\n",
        "append(5, 1)\n",
        "let b: bool = has_key([1], 0)\n",
    ] {
        assert_eq!(check_err(source).kind(), ErrorKind::TypeError, "{}", source);
    }
}
