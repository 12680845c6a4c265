use std::{collections::HashMap, fmt::Display};

use crate::ast::ItemId;

/// A unification variable, identified by a sequential integer and
/// resolved through the inference context's substitution.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TyVar(pub u32);

/// Canonical semantic type representation used by inference and code
/// generation. Structs are nominal: two struct types are the same type
/// exactly when they come from the same item.
#[derive(Clone, Debug, PartialEq)]
pub enum Ty {
    /// Boolean truth value
    Bool,
    /// Immutable string value
    String,
    /// Unit / no-value type
    Unit,
    /// 64-bit unsigned integer
    Int,
    /// 32-bit integer
    I32,
    /// The empty type; unifies with anything
    Never,
    /// Function signature
    Fn { params: Vec<Ty>, return_ty: Box<Ty> },
    /// User defined struct, referenced by the defining item. Field types
    /// live in the item-signature table, keeping recursive structs
    /// representable.
    Struct { id: ItemId, name: String },
    Tuple(Vec<Ty>),
    /// Untyped-at-runtime address with a compile-time pointee
    RawPtr(Box<Ty>),
    Var(TyVar),
    /// Reference to an opaque generic parameter of the enclosing type
    Param { index: usize, name: String },
    /// Sentinel for an already-diagnosed situation; absorbs unification
    Error,
}

impl Ty {
    pub fn fn_ty(params: Vec<Ty>, return_ty: Ty) -> Ty {
        Ty::Fn {
            params,
            return_ty: Box::new(return_ty),
        }
    }

    pub fn rawptr(inner: Ty) -> Ty {
        Ty::RawPtr(Box::new(inner))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Ty::Error)
    }

    /// Whether any unification variable occurs anywhere in this type.
    pub fn contains_var(&self) -> bool {
        match self {
            Ty::Var(_) => true,
            Ty::Fn { params, return_ty } => {
                params.iter().any(Ty::contains_var) || return_ty.contains_var()
            }
            Ty::Tuple(elements) => elements.iter().any(Ty::contains_var),
            Ty::RawPtr(inner) => inner.contains_var(),
            _ => false,
        }
    }
}

impl Display for Ty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ty::Bool => f.write_str("bool"),
            Ty::String => f.write_str("string"),
            Ty::Unit => f.write_str("()"),
            Ty::Int => f.write_str("int"),
            Ty::I32 => f.write_str("i32"),
            Ty::Never => f.write_str("!"),
            Ty::Fn { params, return_ty } => write!(
                f,
                "fn({}) -> {return_ty}",
                params
                    .iter()
                    .map(|param| param.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Ty::Struct { name, .. } => f.write_str(name),
            Ty::Tuple(elements) => write!(
                f,
                "({})",
                elements
                    .iter()
                    .map(|el| el.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            Ty::RawPtr(inner) => write!(f, "*{inner}"),
            Ty::Var(TyVar(n)) => write!(f, "?{n}"),
            Ty::Param { name, .. } => f.write_str(name),
            Ty::Error => f.write_str("<error>"),
        }
    }
}

/// Post-typecheck information about one `let` binding: the dense index of
/// the local within its function and its resolved type.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalInfo {
    pub index: usize,
    pub ty: Ty,
}

/// Per-package results of type checking: item type signatures, struct
/// field tables (without generic substitution) and per-function local
/// type lists (parameters first, then `let` bindings in order).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeckResults {
    pub item_tys: HashMap<ItemId, Ty>,
    pub struct_fields: HashMap<ItemId, Vec<(String, Ty)>>,
    pub fn_locals: HashMap<ItemId, Vec<Ty>>,
}
