//! Pipeline helpers shared by the integration tests.

use weft_lang::{
    ast::{Final, Package},
    builder::build_package,
    context::{GlobalCx, Options},
    errors::{SourceFile, Span},
    lexer::tokenize,
    parser::parse_file,
    resolver::resolve_package,
    typechecker::check_package,
};

/// Run a source string through lex → parse → build → resolve → check.
pub fn compile(input: &str) -> (Package<Final>, GlobalCx) {
    let mut cx = GlobalCx::new(Options {
        no_std: true,
        ..Default::default()
    });

    let source = SourceFile::new("main.weft", input);
    let tokens = tokenize(&source).expect("source lexes");
    let items = parse_file(&source, tokens, &cx.sink).expect("source parses");

    let id = cx.alloc_pkg_id();
    let built = build_package(id, "main", "main.weft".into(), &items, None, Span::default());
    let resolved = resolve_package(&mut cx, &built);
    let checked = check_package(&cx, &resolved);

    (checked, cx)
}

pub fn messages(cx: &GlobalCx) -> Vec<String> {
    cx.sink
        .errors()
        .iter()
        .map(|error| error.message.clone())
        .collect()
}
