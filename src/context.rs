//! The per-invocation global context: compiler options, the error sink,
//! the package-id counter and the growing list of finalized dependency
//! packages.

use std::{collections::HashMap, path::PathBuf};

use crate::{
    ast::{Final, Package, PkgId},
    errors::ErrorSink,
};

/// Debug dump categories recognized by the driver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DebugCategory {
    Tokens,
    Ast,
    Resolved,
    Typecked,
    Wat,
    WasmValidate,
}

#[derive(Clone, Debug, Default)]
pub struct Options {
    /// Name of the root package; defaults to the root file's stem.
    pub package_name: Option<String>,
    pub output: Option<PathBuf>,
    /// Suppress writing the output file.
    pub no_output: bool,
    /// Do not make the embedded standard library loadable.
    pub no_std: bool,
    pub debug: Vec<DebugCategory>,
}

impl Options {
    pub fn dumps(&self, category: DebugCategory) -> bool {
        self.debug.contains(&category)
    }
}

pub struct GlobalCx {
    pub sink: ErrorSink,
    pub options: Options,
    /// Directory package files are resolved against (the root file's
    /// parent); set by the loader.
    pub search_dir: PathBuf,
    next_pkg: u32,
    /// Finalized dependency packages, in load order.
    pub packages: Vec<Package<Final>>,
    /// Memoized load results by package name; `None` records a failed
    /// load so it is diagnosed only once.
    pub(crate) loaded: HashMap<String, Option<PkgId>>,
    /// Names currently being loaded, for circular-dependency detection.
    pub(crate) loading: Vec<String>,
}

impl GlobalCx {
    pub fn new(options: Options) -> GlobalCx {
        GlobalCx {
            sink: ErrorSink::new(),
            options,
            search_dir: PathBuf::from("."),
            next_pkg: 0,
            packages: vec![],
            loaded: HashMap::new(),
            loading: vec![],
        }
    }

    pub fn alloc_pkg_id(&mut self) -> PkgId {
        let id = PkgId(self.next_pkg);
        self.next_pkg += 1;
        id
    }

    pub fn package(&self, id: PkgId) -> Option<&Package<Final>> {
        self.packages.iter().find(|pkg| pkg.id == id)
    }

    pub fn package_by_name(&self, name: &str) -> Option<&Package<Final>> {
        self.packages.iter().find(|pkg| pkg.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pkg_ids_are_sequential() {
        let mut cx = GlobalCx::new(Options::default());
        assert_eq!(cx.alloc_pkg_id(), PkgId(0));
        assert_eq!(cx.alloc_pkg_id(), PkgId(1));
    }

    #[test]
    fn test_dump_flags() {
        let options = Options {
            debug: vec![DebugCategory::Tokens, DebugCategory::Wat],
            ..Default::default()
        };
        assert!(options.dumps(DebugCategory::Tokens));
        assert!(!options.dumps(DebugCategory::Resolved));
    }
}
