//! Error-channel behavior: diagnostics accumulate, sentinels absorb
//! follow-up unification, and nothing panics on badly typed input.

mod common;

use common::{compile, messages};

#[test]
fn unknown_name_reports_once_and_does_not_cascade() {
    // `nope` is undefined; everything downstream of it must stay silent
    let (_, cx) = compile(
        "function main() = (\n\
           let a = nope;\n\
           let b: Int = a;\n\
           b + 1\n\
         );",
    );

    assert_eq!(messages(&cx), vec!["cannot find nope".to_string()]);
}

#[test]
fn error_type_absorbs_field_access() {
    let (_, cx) = compile("function main() = (let a = nope; a.field);");
    assert_eq!(messages(&cx), vec!["cannot find nope".to_string()]);
}

#[test]
fn several_independent_errors_all_surface() {
    let (_, cx) = compile(
        "function f() = missing_one;\n\
         function g() = missing_two;",
    );

    let messages = messages(&cx);
    assert!(messages.contains(&"cannot find missing_one".to_string()));
    assert!(messages.contains(&"cannot find missing_two".to_string()));
}

#[test]
fn spans_point_into_the_source() {
    let (_, cx) = compile("function main() = (let a: Int = \"\"; a);");

    let errors = cx.sink.errors();
    assert_eq!(errors.len(), 1);
    // the literal sits on line 1 (zero based: 0)
    assert_eq!(errors[0].span.start.0, 0);
    let rendered = errors[0].to_string();
    assert!(rendered.contains("main.weft"));
    assert!(rendered.contains("expected int, found string"));
}

#[test]
fn mixed_precedence_classes_diagnose_but_recover() {
    let (_, cx) = compile("function main(): Int = 1 + 2 * 3;");

    let messages = messages(&cx);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("parenthesize"));
}

#[test]
fn tuple_index_out_of_range() {
    let (_, cx) = compile("function main(): Int = (let t = (1, 2); t.5);");
    assert!(messages(&cx)
        .iter()
        .any(|message| message.contains("has no field 5")));
}

#[test]
fn calling_a_non_function() {
    let (_, cx) = compile("function main() = (let a = 1; a());");
    assert!(messages(&cx).contains(&"expected function, found int".to_string()));
}

#[test]
fn intrinsics_must_be_called() {
    let (_, cx) = compile("function main() = (let f = ___transmute; ());");
    assert!(messages(&cx)
        .iter()
        .any(|message| message.contains("must be called")));
}
