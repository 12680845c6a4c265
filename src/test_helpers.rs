//! Helpers shared by the unit tests: run a source string through the
//! in-memory pipeline without touching the file system.

use crate::{
    ast::{Final, Package},
    builder::build_package,
    context::{GlobalCx, Options},
    errors::{SourceFile, Span},
    lexer::tokenize,
    parser::parse_file,
    resolver::resolve_package,
    typechecker::check_package,
};

pub(crate) fn check_source(input: &str) -> (Package<Final>, GlobalCx) {
    let mut cx = GlobalCx::new(Options {
        no_std: true,
        ..Default::default()
    });

    let source = SourceFile::new("main.weft", input);
    let tokens = tokenize(&source).expect("test source lexes");
    let items = parse_file(&source, tokens, &cx.sink).expect("test source parses");

    let id = cx.alloc_pkg_id();
    let built = build_package(id, "main", "main.weft".into(), &items, None, Span::default());
    let resolved = resolve_package(&mut cx, &built);
    let checked = check_package(&cx, &resolved);

    (checked, cx)
}
