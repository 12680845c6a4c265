use crate::errors::{ErrorEmitted, Span};

use super::{Expression, Phase, TypeName};

/// An item: one named declaration inside a module (or the module itself).
#[derive(Clone, Debug, PartialEq)]
pub enum Item<P: Phase> {
    Function(Function<P>),
    TypeDef(TypeDef<P>),
    Import(Import<P>),
    Mod(Module<P>),
    ExternPkg(ExternPkg<P>),
    Global(Global<P>),
    Use(Use<P>),
    Error(ItemError<P>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct Function<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub params: Vec<Param<P>>,
    pub return_type: Option<TypeName<P>>,
    pub body: Expression<P>,
    pub def_path: P::DefPath,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Param<P: Phase> {
    pub name: String,
    pub type_name: TypeName<P>,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TypeDef<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub generics: Vec<String>,
    pub def: TypeDefKind<P>,
    pub def_path: P::DefPath,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TypeDefKind<P: Phase> {
    Struct(Vec<FieldDef<P>>),
    Alias(TypeName<P>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef<P: Phase> {
    pub name: String,
    pub type_name: TypeName<P>,
    pub position: Span,
}

/// A foreign function made available to Weft code; `module`/`function`
/// are the strings the WebAssembly import is keyed by.
#[derive(Clone, Debug, PartialEq)]
pub struct Import<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub module: String,
    pub function: String,
    pub params: Vec<Param<P>>,
    pub return_type: Option<TypeName<P>>,
    pub def_path: P::DefPath,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Module<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub items: Vec<Item<P>>,
    /// Set for `mod name;`: contents live in a separate file and are
    /// spliced in by the loader before the builder runs.
    pub file_module: bool,
    pub def_path: P::DefPath,
    pub position: Span,
}

/// An `extern mod name;` reference to another package. Resolution loads
/// the package eagerly so later paths through it can be followed.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternPkg<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub def_path: P::DefPath,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Global<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub mutable: bool,
    pub type_name: TypeName<P>,
    pub value: Expression<P>,
    pub def_path: P::DefPath,
    pub position: Span,
}

/// A `use a.b.c;` declaration. The item's name is the final segment;
/// after resolution
/// `res` points at whatever the final segment denotes.
#[derive(Clone, Debug, PartialEq)]
pub struct Use<P: Phase> {
    pub id: P::ItemId,
    pub name: String,
    pub segments: Vec<String>,
    pub res: P::Res,
    pub def_path: P::DefPath,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemError<P: Phase> {
    pub id: P::ItemId,
    pub error: ErrorEmitted,
    pub def_path: P::DefPath,
    pub position: Span,
}

impl<P: Phase> Item<P> {
    pub fn id(&self) -> P::ItemId {
        match self {
            Item::Function(Function { id, .. })
            | Item::TypeDef(TypeDef { id, .. })
            | Item::Import(Import { id, .. })
            | Item::Mod(Module { id, .. })
            | Item::ExternPkg(ExternPkg { id, .. })
            | Item::Global(Global { id, .. })
            | Item::Use(Use { id, .. })
            | Item::Error(ItemError { id, .. }) => *id,
        }
    }

    /// The declared name, or `None` for error placeholders.
    pub fn name(&self) -> Option<&str> {
        match self {
            Item::Function(Function { name, .. })
            | Item::TypeDef(TypeDef { name, .. })
            | Item::Import(Import { name, .. })
            | Item::Mod(Module { name, .. })
            | Item::ExternPkg(ExternPkg { name, .. })
            | Item::Global(Global { name, .. })
            | Item::Use(Use { name, .. }) => Some(name.as_str()),
            Item::Error(_) => None,
        }
    }

    pub fn position(&self) -> Span {
        match self {
            Item::Function(Function { position, .. })
            | Item::TypeDef(TypeDef { position, .. })
            | Item::Import(Import { position, .. })
            | Item::Mod(Module { position, .. })
            | Item::ExternPkg(ExternPkg { position, .. })
            | Item::Global(Global { position, .. })
            | Item::Use(Use { position, .. })
            | Item::Error(ItemError { position, .. }) => position.clone(),
        }
    }

    pub fn def_path(&self) -> &P::DefPath {
        match self {
            Item::Function(Function { def_path, .. })
            | Item::TypeDef(TypeDef { def_path, .. })
            | Item::Import(Import { def_path, .. })
            | Item::Mod(Module { def_path, .. })
            | Item::ExternPkg(ExternPkg { def_path, .. })
            | Item::Global(Global { def_path, .. })
            | Item::Use(Use { def_path, .. })
            | Item::Error(ItemError { def_path, .. }) => def_path,
        }
    }
}
