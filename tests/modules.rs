//! Cross-module and cross-package behavior driven through the loader.

mod common;

use std::path::{Path, PathBuf};

use common::{compile, messages};
use weft_lang::context::{GlobalCx, Options};

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("weft-it-{tag}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    dir
}

fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("test file written");
    path
}

#[test]
fn nested_modules_resolve_by_path() {
    let (_, cx) = compile(
        "mod outer (\n\
           mod inner (function leaf(): Int = 1;);\n\
           function mid(): Int = inner.leaf();\n\
         );\n\
         function main(): Int = outer.mid() + outer.inner.leaf();",
    );
    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
}

#[test]
fn use_reexports_are_followed() {
    let (_, cx) = compile(
        "mod m (type Pair = struct { x: Int, y: Int };);\n\
         use m.Pair;\n\
         function f(): Int = (let p = Pair { x: 1, y: 2 }; p.x);",
    );
    assert!(!cx.sink.has_errors(), "{:?}", messages(&cx));
}

#[test]
fn sibling_module_items_are_not_in_scope_unqualified() {
    let (_, cx) = compile(
        "mod m (function g() = (););\n\
         function main() = g();",
    );
    assert!(messages(&cx).contains(&"cannot find g".to_string()));
}

#[test]
fn extern_package_members_resolve() {
    let dir = temp_dir("extern");
    write_file(
        &dir,
        "mathutil.weft",
        "function double(n: Int): Int = n + n;\nmod inner (function one(): Int = 1;);",
    );
    let root = write_file(
        &dir,
        "app.weft",
        "extern mod mathutil;\nfunction main(): Int = mathutil.double(mathutil.inner.one());",
    );

    let mut cx = GlobalCx::new(Options {
        no_std: true,
        ..Default::default()
    });
    cx.load_root(&root);
    assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
}

#[test]
fn item_ids_unique_across_packages() {
    let dir = temp_dir("ids");
    write_file(&dir, "dep.weft", "function one(): Int = 1;");
    let root = write_file(
        &dir,
        "app.weft",
        "extern mod dep;\nfunction main(): Int = dep.one();",
    );

    let mut cx = GlobalCx::new(Options {
        no_std: true,
        ..Default::default()
    });
    let pkg = cx.load_root(&root);
    assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

    let mut all_ids = pkg.items_by_id.keys().copied().collect::<Vec<_>>();
    for dep in &cx.packages {
        all_ids.extend(dep.items_by_id.keys().copied());
    }
    let mut deduped = all_ids.clone();
    deduped.sort_unstable();
    deduped.dedup();
    assert_eq!(deduped.len(), all_ids.len());
}

#[test]
fn std_utilities_are_callable() {
    let dir = temp_dir("std");
    let root = write_file(
        &dir,
        "app.weft",
        "extern mod std;\n\
         function main(): I32 = (\n\
           let big = std.max(3, 4);\n\
           std.mem.alloc(16_I32)\n\
         );",
    );

    let mut cx = GlobalCx::new(Options::default());
    cx.load_root(&root);
    assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
}
