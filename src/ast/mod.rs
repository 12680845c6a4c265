//! # AST Module
//!
//! The Weft AST is parameterized by a *phase*: the same node shapes are
//! reused across compilation stages, with elaboration slots (identifiers,
//! resolutions, definition paths, types) filled in as the pipeline
//! progresses:
//!
//! ```text
//! Parsed  →  Built  →  Resolved  →  Typecked (= Final)
//! (parser)   (ids)     (names)      (types)
//! ```
//!
//! Each slot is an associated type on [`Phase`], `()` until the producing
//! stage fills it. The [`fold`] submodule provides the scaffolding that
//! rewrites a package from one phase to the next.

pub mod expression;
pub mod fold;
pub mod item;
pub mod type_name;

pub use expression::*;
pub use item::*;
pub use type_name::*;

use std::{
    collections::HashMap,
    fmt::{Debug, Display},
    path::PathBuf,
};

use once_cell::sync::Lazy;

use crate::{
    errors::ErrorEmitted,
    typechecker::{LocalInfo, Ty, TypeckResults},
};

/// Identifier of a package, unique within one compiler invocation.
/// Assigned by the loader at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PkgId(pub u32);

/// Globally unique, phase-stable identifier of an item. Item `0` of every
/// package is reserved for the package root module.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId {
    pub pkg: PkgId,
    pub item: u32,
}

impl ItemId {
    pub fn root(pkg: PkgId) -> ItemId {
        ItemId { pkg, item: 0 }
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.pkg.0, self.item)
    }
}

/// Identifier of a `loop` expression, unique within its package.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LoopId(pub u32);

/// Ordered module names from the package root down to and including an
/// item's own name. The first segment is the package name.
pub type DefPath = Vec<String>;

/// Names exposed to programs but implemented by the compiler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Builtin {
    Print,
    StringTy,
    IntTy,
    I32Ty,
    BoolTy,
    True,
    False,
    Trap,
    Null,
    I32Store,
    I64Store,
    I32Load,
    I64Load,
    MemorySize,
    MemoryGrow,
    I32ExtendToI64U,
    Transmute,
    Asm,
    Locals,
}

static BUILTIN_NAMES: Lazy<HashMap<&'static str, Builtin>> = Lazy::new(|| {
    use Builtin::*;
    HashMap::from([
        ("print", Print),
        ("String", StringTy),
        ("Int", IntTy),
        ("I32", I32Ty),
        ("Bool", BoolTy),
        ("true", True),
        ("false", False),
        ("trap", Trap),
        ("__NULL", Null),
        ("__i32_store", I32Store),
        ("__i64_store", I64Store),
        ("__i32_load", I32Load),
        ("__i64_load", I64Load),
        ("__memory_size", MemorySize),
        ("__memory_grow", MemoryGrow),
        ("__i32_extend_to_i64_u", I32ExtendToI64U),
        ("___transmute", Transmute),
        ("___asm", Asm),
        ("__locals", Locals),
    ])
});

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTIN_NAMES.get(name).copied()
    }

    pub fn name(&self) -> &'static str {
        BUILTIN_NAMES
            .iter()
            .find(|(_, b)| **b == *self)
            .map(|(name, _)| *name)
            .expect("builtin without a name")
    }
}

impl Display for Builtin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of name lookup for one identifier occurrence.
///
/// `Local` indices are distances from the top of the locals stack in the
/// Resolved phase (the most recently pushed local is `0`); the checker
/// rewrites them to dense per-function indices in the Typecked phase.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    Local { index: usize },
    Item { id: ItemId },
    Builtin(Builtin),
    TyParam { index: usize, name: String },
    Error(ErrorEmitted),
}

/// Elaboration slots present on AST nodes of one compilation phase.
///
/// Slots are `()` until the producing stage fills them: the builder
/// assigns `ItemId`/`LoopId`, the resolver `Res`/`DefPath`, and the
/// checker the remaining ones.
pub trait Phase: Clone + Debug + PartialEq {
    type ItemId: Clone + Copy + Debug + PartialEq;
    type LoopId: Clone + Copy + Debug + PartialEq;
    type Res: Clone + Debug + PartialEq;
    type DefPath: Clone + Debug + PartialEq;
    type TypeInfo: Clone + Debug + PartialEq;
    type FieldIdx: Clone + Copy + Debug + PartialEq;
    type BreakTarget: Clone + Copy + Debug + PartialEq;
    type LocalInfo: Clone + Debug + PartialEq;
    type Typeck: Clone + Debug + PartialEq;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Parsed;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Built;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolved;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Typecked;

/// The last phase of the pipeline; what codegen consumes.
pub type Final = Typecked;

impl Phase for Parsed {
    type ItemId = ();
    type LoopId = ();
    type Res = ();
    type DefPath = ();
    type TypeInfo = ();
    type FieldIdx = ();
    type BreakTarget = ();
    type LocalInfo = ();
    type Typeck = ();
}

impl Phase for Built {
    type ItemId = ItemId;
    type LoopId = LoopId;
    type Res = ();
    type DefPath = ();
    type TypeInfo = ();
    type FieldIdx = ();
    type BreakTarget = ();
    type LocalInfo = ();
    type Typeck = ();
}

impl Phase for Resolved {
    type ItemId = ItemId;
    type LoopId = LoopId;
    type Res = Resolution;
    type DefPath = DefPath;
    type TypeInfo = ();
    type FieldIdx = ();
    type BreakTarget = ();
    type LocalInfo = ();
    type Typeck = ();
}

impl Phase for Typecked {
    type ItemId = ItemId;
    type LoopId = LoopId;
    type Res = Resolution;
    type DefPath = DefPath;
    type TypeInfo = Ty;
    type FieldIdx = usize;
    type BreakTarget = LoopId;
    type LocalInfo = LocalInfo;
    type Typeck = TypeckResults;
}

/// One compiled package: a tree of modules rooted at item `0`, plus the
/// by-identifier lookup table rebuilt by every fold over the package.
#[derive(Clone, Debug, PartialEq)]
pub struct Package<P: Phase> {
    pub id: PkgId,
    pub name: String,
    pub file: PathBuf,
    /// The root module (item `0`); its contents are the root items.
    pub root: Item<P>,
    pub items_by_id: HashMap<ItemId, Item<P>>,
    /// Set when a fatal error aborted the parse of the root file.
    pub fatal_error: Option<ErrorEmitted>,
    pub typeck: P::Typeck,
}

impl<P: Phase> Package<P> {
    pub fn item(&self, id: ItemId) -> Option<&Item<P>> {
        self.items_by_id.get(&id)
    }

    pub fn root_items(&self) -> &[Item<P>] {
        match &self.root {
            Item::Mod(module) => module.items.as_slice(),
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_round_trip() {
        for name in [
            "print",
            "true",
            "trap",
            "__NULL",
            "__i32_store",
            "___transmute",
            "__locals",
        ] {
            let builtin = Builtin::from_name(name).expect("known builtin");
            assert_eq!(builtin.name(), name);
        }
    }

    #[test]
    fn test_unknown_name_is_not_builtin() {
        assert_eq!(Builtin::from_name("println"), None);
        assert_eq!(Builtin::from_name("transmute"), None);
    }

    #[test]
    fn test_root_item_id() {
        let id = ItemId::root(PkgId(3));
        assert_eq!(id.item, 0);
        assert_eq!(format!("{id}"), "3:0");
    }
}
