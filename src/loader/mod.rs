//! Package and module-file loading.
//!
//! Dependencies load at most once per name and are compiled through the
//! whole pipeline (lex → parse → build → resolve → check) before the
//! referring package continues; the resulting final package is appended
//! to the context's finalized list. Circular dependencies are detected
//! here. `mod name;` items have their file contents spliced into the
//! parsed tree before the builder runs.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    rc::Rc,
};

use log::{debug, trace};

use crate::{
    ast::{Final, Item, ItemError, ItemId, Module, Package, Parsed, PkgId},
    builder::build_package,
    context::{DebugCategory, GlobalCx},
    errors::{ErrorEmitted, SourceFile, Span},
    lexer::tokenize,
    parser::parse_file,
    printer,
    resolver::resolve_package,
    typechecker::check_package,
};

/// Source of the embedded standard library, loadable as `extern mod std;`.
const STD_SOURCE: &str = include_str!("../../lib/std.weft");

impl GlobalCx {
    /// Load and fully compile the root package.
    pub fn load_root(&mut self, path: &Path) -> Package<Final> {
        let name = self
            .options
            .package_name
            .clone()
            .unwrap_or_else(|| stem_of(path));
        if let Some(parent) = path.parent() {
            self.search_dir = parent.to_path_buf();
        }

        let id = self.alloc_pkg_id();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                let error = self.sink.emit(
                    format!("could not read file '{}': {err}", path.display()),
                    Span::default(),
                );
                return error_package(id, &name, path.to_path_buf(), error);
            }
        };

        self.loading.push(name.clone());
        let pkg = self.compile_source(id, &name, path.to_path_buf(), content, true);
        self.loading.pop();
        pkg
    }

    /// Load a dependency package by name, memoized. Returns `None` (after
    /// diagnosing once) when the package cannot be loaded.
    pub fn load_package(&mut self, name: &str, span: &Span) -> Option<PkgId> {
        if let Some(result) = self.loaded.get(name) {
            return *result;
        }
        if self.loading.iter().any(|loading| loading == name) {
            self.sink.emit(
                format!("circular dependency on package '{name}'"),
                span.clone(),
            );
            self.loaded.insert(name.to_string(), None);
            return None;
        }

        let (path, content) = if name == "std" && !self.options.no_std {
            (PathBuf::from("<std>"), STD_SOURCE.to_string())
        } else {
            let path = self.search_dir.join(format!("{name}.weft"));
            match std::fs::read_to_string(&path) {
                Ok(content) => (path, content),
                Err(_) => {
                    self.sink.emit(
                        format!("could not load package '{name}'"),
                        span.clone(),
                    );
                    self.loaded.insert(name.to_string(), None);
                    return None;
                }
            }
        };

        debug!("loading package '{name}' from '{}'", path.display());
        let id = self.alloc_pkg_id();
        self.loading.push(name.to_string());
        let pkg = self.compile_source(id, name, path, content, false);
        self.loading.pop();

        self.packages.push(pkg);
        self.loaded.insert(name.to_string(), Some(id));
        Some(id)
    }

    /// Run one package through the full pipeline. Debug dumps only fire
    /// for the root package.
    fn compile_source(
        &mut self,
        id: PkgId,
        name: &str,
        path: PathBuf,
        content: String,
        is_root: bool,
    ) -> Package<Final> {
        let source = SourceFile::new(path.display().to_string(), &content);

        let tokens = match tokenize(&source) {
            Ok(tokens) => tokens,
            Err(err) => {
                let error = self.sink.emit(err.message, err.span);
                return error_package(id, name, path, error);
            }
        };
        if is_root && self.options.dumps(DebugCategory::Tokens) {
            println!("{tokens:#?}");
        }

        let items = match parse_file(&source, tokens, &self.sink) {
            Ok(items) => items,
            Err(err) => {
                let error = self.sink.emit(err.message, err.span);
                return error_package(id, name, path, error);
            }
        };

        let dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let mut active = HashSet::new();
        if let Ok(canonical) = path.canonicalize() {
            active.insert(canonical);
        }
        let items = self.expand_file_modules(items, &dir, &mut active);

        let built = build_package(id, name, path, &items, None, whole_file_span(&source));
        if is_root && self.options.dumps(DebugCategory::Ast) {
            println!("{}", printer::print_package(&built));
        }

        let resolved = resolve_package(self, &built);
        if is_root && self.options.dumps(DebugCategory::Resolved) {
            println!("{}", printer::print_package(&resolved));
        }

        let checked = check_package(self, &resolved);
        if is_root && self.options.dumps(DebugCategory::Typecked) {
            println!("{}", printer::print_package(&checked));
        }

        checked
    }

    /// Splice the contents of `mod name;` declarations into the parsed
    /// tree, reading `name.weft` next to the declaring file.
    fn expand_file_modules(
        &mut self,
        items: Vec<Item<Parsed>>,
        dir: &Path,
        active: &mut HashSet<PathBuf>,
    ) -> Vec<Item<Parsed>> {
        items
            .into_iter()
            .map(|item| match item {
                Item::Mod(module) if module.file_module => {
                    match self.load_module_file(dir, &module.name, &module.position, active) {
                        Ok(items) => Item::Mod(Module { items, ..module }),
                        Err(error) => Item::Error(ItemError {
                            id: (),
                            error,
                            def_path: (),
                            position: module.position,
                        }),
                    }
                }
                Item::Mod(module) => Item::Mod(Module {
                    items: self.expand_file_modules(module.items, dir, active),
                    ..module
                }),
                other => other,
            })
            .collect()
    }

    fn load_module_file(
        &mut self,
        dir: &Path,
        name: &str,
        span: &Span,
        active: &mut HashSet<PathBuf>,
    ) -> Result<Vec<Item<Parsed>>, ErrorEmitted> {
        let path = dir.join(format!("{name}.weft"));
        trace!("loading module file '{}'", path.display());

        let canonical = path.canonicalize().unwrap_or_else(|_| path.clone());
        if !active.insert(canonical.clone()) {
            return Err(self.sink.emit(
                format!("module file '{}' includes itself", path.display()),
                span.clone(),
            ));
        }

        let result = (|| {
            let content = std::fs::read_to_string(&path).map_err(|_| {
                self.sink.emit(
                    format!("could not load module file '{}'", path.display()),
                    span.clone(),
                )
            })?;
            let source = SourceFile::new(path.display().to_string(), &content);
            let tokens = tokenize(&source)
                .map_err(|err| self.sink.emit(err.message, err.span))?;
            let items = parse_file(&source, tokens, &self.sink)
                .map_err(|err| self.sink.emit(err.message, err.span))?;

            let sub_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
            Ok(self.expand_file_modules(items, &sub_dir, active))
        })();

        active.remove(&canonical);
        result
    }
}

fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_else(|| "main".to_string())
}

fn whole_file_span(source: &Rc<SourceFile>) -> Span {
    Span {
        start: (0, 0),
        end: (0, 0),
        source: Rc::clone(source),
    }
}

fn error_package(id: PkgId, name: &str, file: PathBuf, error: ErrorEmitted) -> Package<Final> {
    let root = Item::Mod(Module {
        id: ItemId::root(id),
        name: name.to_string(),
        items: vec![],
        file_module: false,
        def_path: vec![name.to_string()],
        position: Span::default(),
    });
    let mut items_by_id = std::collections::HashMap::new();
    crate::ast::fold::register_items(&mut items_by_id, &root);

    Package {
        id,
        name: name.to_string(),
        file,
        root,
        items_by_id,
        fatal_error: Some(error),
        typeck: Default::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Options;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, content).expect("test file written");
        path
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("weft-loader-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        dir
    }

    #[test]
    fn test_load_root_with_dependency() {
        let dir = temp_dir("dep");
        write_file(&dir, "util.weft", "function three(): Int = 3;");
        let root = write_file(
            &dir,
            "app.weft",
            "extern mod util;\nfunction main(): Int = util.three();",
        );

        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        let pkg = cx.load_root(&root);

        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
        assert_eq!(pkg.name, "app");
        assert!(cx.package_by_name("util").is_some());
    }

    #[test]
    fn test_dependency_loads_once() {
        let dir = temp_dir("memo");
        write_file(&dir, "util.weft", "function three(): Int = 3;");
        let root = write_file(
            &dir,
            "app.weft",
            "extern mod util;\nextern mod util;\nfunction main(): Int = util.three();",
        );

        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        cx.load_root(&root);

        // two extern items, one load (the second name is a duplicate item
        // diagnostic, not a second package)
        assert_eq!(
            cx.packages.iter().filter(|p| p.name == "util").count(),
            1
        );
    }

    #[test]
    fn test_circular_dependency_is_diagnosed() {
        let dir = temp_dir("cycle");
        write_file(&dir, "a.weft", "extern mod b;\nfunction fa() = ();");
        write_file(&dir, "b.weft", "extern mod a;\nfunction fb() = ();");
        let root = write_file(&dir, "rootpkg.weft", "extern mod a;\nfunction main() = ();");

        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        cx.load_root(&root);

        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message.contains("circular dependency")));
    }

    #[test]
    fn test_missing_package_is_diagnosed_once() {
        let dir = temp_dir("missing");
        let root = write_file(
            &dir,
            "app2.weft",
            "extern mod nope;\nmod m (extern mod nope;);\nfunction main() = ();",
        );

        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        cx.load_root(&root);

        let count = cx
            .sink
            .errors()
            .iter()
            .filter(|e| e.message.contains("could not load package 'nope'"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_file_module_is_spliced() {
        let dir = temp_dir("filemod");
        write_file(&dir, "disk.weft", "function stored(): Int = 9;");
        let root = write_file(
            &dir,
            "app3.weft",
            "mod disk;\nfunction main(): Int = disk.stored();",
        );

        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        let pkg = cx.load_root(&root);

        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
        let Some(Item::Mod(module)) = pkg
            .root_items()
            .iter()
            .find(|item| item.name() == Some("disk"))
        else {
            panic!("expected module");
        };
        assert_eq!(module.items.len(), 1);
    }

    #[test]
    fn test_std_is_loadable() {
        let dir = temp_dir("std");
        let root = write_file(
            &dir,
            "app4.weft",
            "extern mod std;\nfunction main(): Int = std.max(1, 2);",
        );

        let mut cx = GlobalCx::new(Options::default());
        cx.load_root(&root);

        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
    }

    #[test]
    fn test_parse_error_marks_package_fatal() {
        let dir = temp_dir("fatal");
        let root = write_file(&dir, "bad.weft", "function main( = ();");

        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        let pkg = cx.load_root(&root);

        assert!(pkg.fatal_error.is_some());
        assert!(cx.sink.has_errors());
    }
}
