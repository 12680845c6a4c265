//! Smoke tests for the emitted WebAssembly text.

mod common;

use common::{compile, messages};
use weft_lang::codegen;

fn wat_for(input: &str) -> String {
    let (pkg, cx) = compile(input);
    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
    codegen::generate(&cx, &pkg)
}

#[test]
fn module_skeleton_is_present() {
    let wat = wat_for("function main() = ();");

    assert!(wat.starts_with("(module"));
    assert!(wat.contains("(memory (export \"memory\")"));
    assert!(wat.contains("(func $__alloc"));
    assert!(wat.contains("(func $__str_cmp"));
    assert!(wat.contains("(start $__init)"));
    assert!(wat.contains("(export \"main\" (func $main_main))"));
}

#[test]
fn nested_function_names_use_definition_paths() {
    let wat = wat_for(
        "mod m (function g(): Int = 1;);\nfunction main(): Int = m.g();",
    );

    assert!(wat.contains("(func $main_m_g (result i64)"));
    assert!(wat.contains("call $main_m_g"));
}

#[test]
fn params_map_to_wasm_locals() {
    let wat = wat_for("function add(a: Int, b: Int): Int = a + b;");

    assert!(wat.contains("(func $main_add (param i64) (param i64) (result i64)"));
    assert!(wat.contains("local.get 0"));
    assert!(wat.contains("local.get 1"));
    assert!(wat.contains("i64.add"));
}

#[test]
fn if_expressions_carry_result_types() {
    let wat = wat_for("function pick(c: Bool): Int = if c then 1 else 2;");

    assert!(wat.contains("if (result i64)"));
    assert!(wat.contains("else"));
    assert!(wat.contains("end"));
}

#[test]
fn comparisons_are_unsigned() {
    let wat = wat_for("function below(a: Int, b: Int): Bool = a < b;");
    assert!(wat.contains("i64.lt_u"));

    let wat = wat_for("function div(a: Int, b: Int): Int = a / b;");
    assert!(wat.contains("i64.div_u"));
}

#[test]
fn string_comparison_goes_through_runtime() {
    let wat = wat_for("function same(a: String, b: String): Bool = a == b;");

    assert!(wat.contains("call $__str_cmp"));
    assert!(wat.contains("i32.eqz"));
}

#[test]
fn memory_intrinsics_lower_directly() {
    let wat = wat_for(
        "function poke(addr: I32, value: I32) = __i32_store(addr, value);\n\
         function peek(addr: I32): Int = __i64_load(addr);\n\
         function widen(n: I32): Int = __i32_extend_to_i64_u(n);",
    );

    assert!(wat.contains("i32.store"));
    assert!(wat.contains("i64.load"));
    assert!(wat.contains("i64.extend_i32_u"));
}

#[test]
fn diverging_code_stays_valid() {
    let wat = wat_for(
        "function forever(): Int = (let a: Int = loop (1); a);",
    );

    // the endless loop is followed by an explicit unreachable so the
    // surrounding code validates
    assert!(wat.contains("unreachable"));
}
