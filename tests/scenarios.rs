//! End-to-end behavior of the middle end on small programs.

mod common;

use common::{compile, messages};
use weft_lang::{
    ast::{Expression, Final, Item, Package, Resolution},
    typechecker::Ty,
};

fn fn_ty(pkg: &Package<Final>, name: &str) -> Ty {
    let id = pkg
        .root_items()
        .iter()
        .find(|item| item.name() == Some(name))
        .map(|item| item.id())
        .expect("function exists");
    pkg.typeck.item_tys.get(&id).cloned().expect("function typed")
}

#[test]
fn typed_main_with_let() {
    let (pkg, cx) = compile("function main() = (let a: Int = 1; a);");

    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
    assert_eq!(fn_ty(&pkg, "main"), Ty::fn_ty(vec![], Ty::Int));

    let Some(Item::Function(main)) = pkg
        .root_items()
        .iter()
        .find(|item| item.name() == Some("main"))
    else {
        panic!("main exists");
    };
    assert_eq!(main.body.get_info(), Ty::Int);
}

#[test]
fn let_with_wrong_ascription() {
    let (_, cx) = compile("function main() = (let a: Int = \"\"; a);");

    assert_eq!(messages(&cx), vec!["expected int, found string".to_string()]);
}

#[test]
fn missing_struct_literal_fields() {
    let (_, cx) = compile(
        "type Pair = struct { x: Int, y: Int };\nfunction f() = Pair { x: 1 };",
    );

    assert!(messages(&cx).contains(&"missing fields in literal: y".to_string()));
}

#[test]
fn module_call_collapses_to_path() {
    let (pkg, cx) = compile("mod m (function g() = (););\nfunction main() = m.g();");

    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));

    let Some(Item::Function(main)) = pkg
        .root_items()
        .iter()
        .find(|item| item.name() == Some("main"))
    else {
        panic!("main exists");
    };
    let Expression::Call(call) = &main.body else {
        panic!("expected call body");
    };
    let Expression::Path(path) = &call.callee else {
        panic!("expected path callee, got {:?}", call.callee);
    };
    assert_eq!(path.segments, vec!["m".to_string(), "g".to_string()]);
    let Resolution::Item { id } = &path.res else {
        panic!("expected item resolution");
    };
    assert!(matches!(pkg.item(*id), Some(Item::Function(g)) if g.name == "g"));
}

#[test]
fn loop_with_break_types_unit() {
    let (pkg, cx) = compile("function main() = loop ( break );");

    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
    assert_eq!(fn_ty(&pkg, "main"), Ty::fn_ty(vec![], Ty::Unit));
}

#[test]
fn endless_loop_types_never_and_unifies() {
    let (pkg, cx) = compile("function main() = loop ( 1 );");

    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
    assert_eq!(fn_ty(&pkg, "main"), Ty::fn_ty(vec![], Ty::Never));

    // never unifies with anything, so the loop's value can seed an int
    let (_, cx) = compile("function main() = (let a: Int = loop (1); a);");
    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
}
