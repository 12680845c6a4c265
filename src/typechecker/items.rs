//! Item signature lowering: computes the semantic type of an item from
//! its AST form, memoized per item id. Alias cycles are detected here;
//! struct field tables are produced as a side product.

use std::collections::{HashMap, HashSet};

use crate::{
    ast::{
        Builtin, Item, ItemId, Package, Resolution, Resolved, TypeDefKind, TypeName,
    },
    context::GlobalCx,
    errors::{ErrorSink, Span},
};

use super::types::Ty;

pub struct ItemTypes<'a> {
    cx: &'a GlobalCx,
    pkg: &'a Package<Resolved>,
    sink: ErrorSink,
    tys: HashMap<ItemId, Ty>,
    struct_fields: HashMap<ItemId, Vec<(String, Ty)>>,
    in_progress: HashSet<ItemId>,
}

impl<'a> ItemTypes<'a> {
    pub fn new(cx: &'a GlobalCx, pkg: &'a Package<Resolved>) -> ItemTypes<'a> {
        ItemTypes {
            cx,
            pkg,
            sink: cx.sink.clone(),
            tys: HashMap::new(),
            struct_fields: HashMap::new(),
            in_progress: HashSet::new(),
        }
    }

    pub fn into_tables(self) -> (HashMap<ItemId, Ty>, HashMap<ItemId, Vec<(String, Ty)>>) {
        (self.tys, self.struct_fields)
    }

    /// Replace a memoized signature; used once a function's inferred
    /// return type is known.
    pub(super) fn override_ty(&mut self, id: ItemId, ty: Ty) {
        self.tys.insert(id, ty);
    }

    /// The type of an item, lowered on demand and memoized. Items of
    /// finalized dependency packages are answered from their typeck
    /// tables.
    pub fn type_of_item(&mut self, id: ItemId, span: &Span) -> Ty {
        let pkg = self.pkg;

        if id.pkg != pkg.id {
            let Some(dep) = self.cx.package(id.pkg) else {
                return Ty::Error;
            };
            if let Some(Item::Use(use_item)) = dep.item(id) {
                let res = use_item.res.clone();
                return self.type_of_resolved_value(&res, span);
            }
            return match dep.typeck.item_tys.get(&id) {
                Some(ty) => ty.clone(),
                None => Ty::Error,
            };
        }

        if let Some(ty) = self.tys.get(&id) {
            return ty.clone();
        }

        let Some(item) = pkg.item(id) else {
            return Ty::Error;
        };
        let item_span = item.position();

        if !self.in_progress.insert(id) {
            self.sink
                .emit("cycle detected in type definition", item_span);
            self.tys.insert(id, Ty::Error);
            return Ty::Error;
        }

        let ty = match item {
            Item::Function(function) => {
                let params = function
                    .params
                    .iter()
                    .map(|param| self.lower_type_name(&param.type_name))
                    .collect();
                let return_ty = function
                    .return_type
                    .as_ref()
                    .map(|ty| self.lower_type_name(ty))
                    .unwrap_or(Ty::Unit);
                Ty::fn_ty(params, return_ty)
            }
            Item::Import(import) => {
                let params = import
                    .params
                    .iter()
                    .map(|param| self.lower_type_name(&param.type_name))
                    .collect();
                let return_ty = import
                    .return_type
                    .as_ref()
                    .map(|ty| self.lower_type_name(ty))
                    .unwrap_or(Ty::Unit);
                Ty::fn_ty(params, return_ty)
            }
            Item::TypeDef(type_def) => match &type_def.def {
                TypeDefKind::Struct(fields) => {
                    let ty = Ty::Struct {
                        id,
                        name: type_def.name.clone(),
                    };
                    // memoize before lowering fields so recursive structs
                    // (through raw pointers) terminate
                    self.tys.insert(id, ty.clone());
                    let fields = fields.to_vec();
                    let lowered = fields
                        .iter()
                        .map(|field| (field.name.clone(), self.lower_type_name(&field.type_name)))
                        .collect();
                    self.struct_fields.insert(id, lowered);
                    self.in_progress.remove(&id);
                    return ty;
                }
                TypeDefKind::Alias(target) => self.lower_type_name(target),
            },
            Item::Global(global) => self.lower_type_name(&global.type_name),
            Item::Use(use_item) => {
                let res = use_item.res.clone();
                self.type_of_resolved_value(&res, span)
            }
            Item::Mod(_) | Item::ExternPkg(_) => {
                self.sink
                    .emit("modules cannot be used as values or types", span.clone());
                Ty::Error
            }
            Item::Error(_) => Ty::Error,
        };

        self.in_progress.remove(&id);
        self.tys.insert(id, ty.clone());
        ty
    }

    /// Follow chains of `use` items to the final resolution.
    pub fn resolve_use(&mut self, res: &Resolution, span: &Span) -> Resolution {
        let mut seen = HashSet::new();
        let mut current = res.clone();
        loop {
            let Resolution::Item { id } = current else {
                return current;
            };
            match self.use_target(id) {
                Some(target) => {
                    if !seen.insert(id) {
                        return Resolution::Error(
                            self.sink
                                .emit("cycle detected between use declarations", span.clone()),
                        );
                    }
                    current = target;
                }
                None => return current,
            }
        }
    }

    fn use_target(&self, id: ItemId) -> Option<Resolution> {
        if id.pkg == self.pkg.id {
            match self.pkg.item(id)? {
                Item::Use(use_item) => Some(use_item.res.clone()),
                _ => None,
            }
        } else {
            match self.cx.package(id.pkg)?.item(id)? {
                Item::Use(use_item) => Some(use_item.res.clone()),
                _ => None,
            }
        }
    }

    /// Type of an item-or-builtin resolution in item-signature context
    /// (no inference variables available here).
    fn type_of_resolved_value(&mut self, res: &Resolution, span: &Span) -> Ty {
        match self.resolve_use(res, span) {
            Resolution::Item { id } => self.type_of_item(id, span),
            Resolution::Builtin(builtin) => match builtin {
                Builtin::IntTy => Ty::Int,
                Builtin::I32Ty => Ty::I32,
                Builtin::BoolTy => Ty::Bool,
                Builtin::StringTy => Ty::String,
                other => {
                    self.sink
                        .emit(format!("'{other}' cannot be re-exported"), span.clone());
                    Ty::Error
                }
            },
            Resolution::Error(_) => Ty::Error,
            _ => Ty::Error,
        }
    }

    /// Ordered `(name, type)` field list of a struct item, without
    /// generic substitution.
    pub fn struct_fields(&mut self, id: ItemId, span: &Span) -> Option<Vec<(String, Ty)>> {
        if id.pkg != self.pkg.id {
            return self
                .cx
                .package(id.pkg)
                .and_then(|dep| dep.typeck.struct_fields.get(&id).cloned());
        }
        if !self.struct_fields.contains_key(&id) {
            let _ = self.type_of_item(id, span);
        }
        self.struct_fields.get(&id).cloned()
    }

    /// `Some(mutable)` when the item is a global.
    pub fn global_mutability(&self, id: ItemId) -> Option<bool> {
        if id.pkg == self.pkg.id {
            match self.pkg.item(id)? {
                Item::Global(global) => Some(global.mutable),
                _ => None,
            }
        } else {
            match self.cx.package(id.pkg)?.item(id)? {
                Item::Global(global) => Some(global.mutable),
                _ => None,
            }
        }
    }

    pub fn sink(&self) -> ErrorSink {
        self.sink.clone()
    }

    /// Map an AST type to its semantic type. Generic arguments are
    /// lowered for their own diagnostics but stay opaque otherwise.
    pub fn lower_type_name(&mut self, type_name: &TypeName<Resolved>) -> Ty {
        match type_name {
            TypeName::Ident(ident) => {
                for arg in &ident.generic_args {
                    let _ = self.lower_type_name(arg);
                }
                match &ident.res {
                    Resolution::Item { id } => self.type_of_item(*id, &ident.position),
                    Resolution::TyParam { index, name } => Ty::Param {
                        index: *index,
                        name: name.clone(),
                    },
                    Resolution::Builtin(builtin) => match builtin {
                        Builtin::IntTy => Ty::Int,
                        Builtin::I32Ty => Ty::I32,
                        Builtin::BoolTy => Ty::Bool,
                        Builtin::StringTy => Ty::String,
                        other => {
                            self.sink.emit(
                                format!("'{other}' is not a type"),
                                ident.position.clone(),
                            );
                            Ty::Error
                        }
                    },
                    Resolution::Local { .. } => {
                        self.sink.emit("expected a type", ident.position.clone());
                        Ty::Error
                    }
                    Resolution::Error(_) => Ty::Error,
                }
            }
            TypeName::Tuple(elements, _) => {
                if elements.is_empty() {
                    Ty::Unit
                } else {
                    Ty::Tuple(
                        elements
                            .iter()
                            .map(|el| self.lower_type_name(el))
                            .collect(),
                    )
                }
            }
            TypeName::RawPtr(inner, _) => Ty::rawptr(self.lower_type_name(inner)),
            TypeName::Never(_) => Ty::Never,
            TypeName::Error(_, _) => Ty::Error,
        }
    }
}
