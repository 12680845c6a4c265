//! Name resolution: rewrites a `Built` package into a `Resolved` one.
//!
//! Every identifier occurrence is paired with a [`Resolution`], every
//! item receives its definition path, and field-access chains whose left
//! hand side denotes a module are collapsed into [`PathExpr`] nodes, so
//! that after this stage no field access has a module on its left.
//!
//! Locals live on a single stack of names threaded through expression
//! traversal; a reference is stored as its de-Bruijn distance from the
//! top of the stack. Blocks snapshot the stack depth on entry and
//! truncate on exit; `let` pushes its binding after its right hand side
//! has been visited.

use std::collections::HashMap;

use crate::{
    ast::fold::{fold_package, super_fold_expression, super_fold_type_name, Folder},
    ast::{
        Built, Builtin, Expression, ExternPkg, FieldAccess, FieldDef, FieldName, Function, Global,
        Id, Import, Item, ItemError, ItemId, Let, LoopId, Module, Package, Param, PathExpr,
        Resolution, Resolved, TypeDef, TypeDefKind, TypeIdent, TypeName, Use,
    },
    ast::{DefPath, ExprError},
    context::GlobalCx,
    errors::Span,
};

pub struct Resolver<'a> {
    cx: &'a mut GlobalCx,
    pkg: &'a Package<Built>,
    /// Names of live locals, innermost last.
    locals: Vec<String>,
    /// Module-name prefix of the item currently being resolved.
    def_path: DefPath,
    /// Direct items of the module currently being resolved.
    module_map: HashMap<String, ItemId>,
    /// On-demand module-contents cache, keyed by the module (or extern)
    /// item id.
    member_cache: HashMap<ItemId, HashMap<String, ItemId>>,
    /// Generic parameters of the type definition being resolved.
    generics: Vec<String>,
    /// `use` items currently being followed, for cycle detection.
    use_stack: Vec<ItemId>,
}

/// Resolve all names in a built package.
pub fn resolve_package(cx: &mut GlobalCx, pkg: &Package<Built>) -> Package<Resolved> {
    log::debug!("resolving package '{}'", pkg.name);
    let mut resolver = Resolver {
        cx,
        pkg,
        locals: vec![],
        def_path: vec![],
        module_map: HashMap::new(),
        member_cache: HashMap::new(),
        generics: vec![],
        use_stack: vec![],
    };
    fold_package(&mut resolver, pkg)
}

/// What a resolver needs to know about an item to follow paths through
/// it, copied out so lookups never hold borrows across package loads.
enum ItemView {
    Mod,
    Extern(String),
    UseBuilt(Vec<String>, Span),
    UseResolved(Resolution),
    Other,
}

impl<'a> Resolver<'a> {
    fn item_def_path(&self, name: &str) -> DefPath {
        let mut path = self.def_path.clone();
        path.push(name.to_string());
        path
    }

    fn item_view(&self, id: ItemId) -> Option<ItemView> {
        if id.pkg == self.pkg.id {
            Some(match self.pkg.item(id)? {
                Item::Mod(_) => ItemView::Mod,
                Item::ExternPkg(e) => ItemView::Extern(e.name.clone()),
                Item::Use(u) => ItemView::UseBuilt(u.segments.clone(), u.position.clone()),
                _ => ItemView::Other,
            })
        } else {
            let pkg = self.cx.package(id.pkg)?;
            Some(match pkg.item(id)? {
                Item::Mod(_) => ItemView::Mod,
                Item::ExternPkg(e) => ItemView::Extern(e.name.clone()),
                Item::Use(u) => ItemView::UseResolved(u.res.clone()),
                _ => ItemView::Other,
            })
        }
    }

    /// Direct members of a module-like item (a module, or an extern
    /// package standing for the dependency's root module).
    fn module_members(&mut self, id: ItemId, span: &Span) -> Option<HashMap<String, ItemId>> {
        if let Some(cached) = self.member_cache.get(&id) {
            return Some(cached.clone());
        }

        enum Source {
            Items(Vec<(String, ItemId)>),
            Extern(String),
        }

        let source = if id.pkg == self.pkg.id {
            match self.pkg.item(id)? {
                Item::Mod(module) => Source::Items(named_children(&module.items)),
                Item::ExternPkg(e) => Source::Extern(e.name.clone()),
                _ => return None,
            }
        } else {
            let pkg = self.cx.package(id.pkg)?;
            match pkg.item(id)? {
                Item::Mod(module) => Source::Items(named_children(&module.items)),
                Item::ExternPkg(e) => Source::Extern(e.name.clone()),
                _ => return None,
            }
        };

        let members = match source {
            Source::Items(pairs) => pairs.into_iter().collect::<HashMap<_, _>>(),
            Source::Extern(name) => {
                let dep = self.cx.load_package(&name, span)?;
                let pkg = self.cx.package(dep)?;
                named_children(pkg.root_items()).into_iter().collect()
            }
        };

        self.member_cache.insert(id, members.clone());
        Some(members)
    }

    /// If `res` denotes a `use` item, forward to what the use points at.
    fn follow_use(&mut self, res: Resolution, span: &Span) -> Resolution {
        let Resolution::Item { id } = res else {
            return res;
        };
        match self.item_view(id) {
            Some(ItemView::UseBuilt(segments, use_span)) => {
                if self.use_stack.contains(&id) {
                    return Resolution::Error(
                        self.cx
                            .sink
                            .emit("cycle detected between use declarations", span.clone()),
                    );
                }
                self.use_stack.push(id);
                let target = self.resolve_use_target(&segments, &use_span);
                self.use_stack.pop();
                target
            }
            Some(ItemView::UseResolved(target)) => target,
            _ => res,
        }
    }

    fn is_module_like(&self, res: &Resolution) -> bool {
        match res {
            Resolution::Item { id } => matches!(
                self.item_view(*id),
                Some(ItemView::Mod) | Some(ItemView::Extern(_))
            ),
            _ => false,
        }
    }

    fn resolve_member(&mut self, base: Resolution, name: &str, span: &Span) -> Resolution {
        let base = self.follow_use(base, span);
        match base {
            Resolution::Error(error) => Resolution::Error(error),
            Resolution::Item { id } => match self.module_members(id, span) {
                Some(members) => match members.get(name) {
                    Some(member) => Resolution::Item { id: *member },
                    None => Resolution::Error(
                        self.cx
                            .sink
                            .emit(format!("no member '{name}' in this module"), span.clone()),
                    ),
                },
                None => Resolution::Error(
                    self.cx
                        .sink
                        .emit("expected a module on the left of '.'", span.clone()),
                ),
            },
            _ => Resolution::Error(
                self.cx
                    .sink
                    .emit("expected a module on the left of '.'", span.clone()),
            ),
        }
    }

    fn resolve_use_target(&mut self, segments: &[String], span: &Span) -> Resolution {
        let Some(first) = segments.first() else {
            return Resolution::Error(self.cx.sink.emit("empty use path", span.clone()));
        };
        let mut res = self.resolve_bare_item_name(first, span);
        for segment in &segments[1..] {
            res = self.resolve_member(res, segment, span);
        }
        res
    }

    /// Name lookup outside the locals stack: current module items, then
    /// packages in scope, then builtins.
    fn resolve_bare_item_name(&mut self, name: &str, span: &Span) -> Resolution {
        if let Some(id) = self.module_map.get(name) {
            return Resolution::Item { id: *id };
        }
        if name == self.pkg.name {
            return Resolution::Item {
                id: ItemId::root(self.pkg.id),
            };
        }
        if let Some(dep) = self.cx.package_by_name(name) {
            return Resolution::Item {
                id: ItemId::root(dep.id),
            };
        }
        if let Some(builtin) = Builtin::from_name(name) {
            return Resolution::Builtin(builtin);
        }
        Resolution::Error(
            self.cx
                .sink
                .emit(format!("cannot find {name}"), span.clone()),
        )
    }

    fn resolve_value_name(&mut self, name: &str, span: &Span) -> Resolution {
        if let Some(position) = self.locals.iter().rposition(|local| local == name) {
            return Resolution::Local {
                index: self.locals.len() - 1 - position,
            };
        }
        self.resolve_bare_item_name(name, span)
    }

    fn resolve_type_ident(&mut self, name: &str, span: &Span) -> Resolution {
        if let Some(index) = self.generics.iter().position(|generic| generic == name) {
            return Resolution::TyParam {
                index,
                name: name.to_string(),
            };
        }
        self.resolve_bare_item_name(name, span)
    }

    fn fold_module(&mut self, module: &Module<Built>) -> Item<Resolved> {
        let def_path = self.item_def_path(&module.name);

        // diagnose duplicate names among the module's direct items
        let mut seen = HashMap::new();
        for child in &module.items {
            let Some(name) = child.name() else { continue };
            if let Some(()) = seen.insert(name.to_string(), ()) {
                self.cx.sink.emit(
                    format!("duplicate item name '{name}' in module '{}'", module.name),
                    child.position(),
                );
            }
        }

        let contents = named_children(&module.items).into_iter().collect();
        let saved_map = std::mem::replace(&mut self.module_map, contents);
        self.def_path.push(module.name.clone());

        let items = module
            .items
            .iter()
            .map(|child| self.fold_item(child))
            .collect();

        self.def_path.pop();
        self.module_map = saved_map;

        Item::Mod(Module {
            id: module.id,
            name: module.name.clone(),
            items,
            file_module: module.file_module,
            def_path,
            position: module.position.clone(),
        })
    }
}

fn named_children<P: crate::ast::Phase<ItemId = ItemId>>(
    items: &[Item<P>],
) -> Vec<(String, ItemId)> {
    items
        .iter()
        .filter_map(|item| item.name().map(|name| (name.to_string(), item.id())))
        .collect()
}

impl<'a> Folder for Resolver<'a> {
    type From = Built;
    type To = Resolved;

    fn map_item_id(&mut self, id: &ItemId) -> ItemId {
        *id
    }

    fn map_loop_id(&mut self, id: &LoopId) -> LoopId {
        *id
    }

    fn map_res(&mut self, _res: &()) -> Resolution {
        unreachable!("the resolver folds identifiers directly")
    }

    fn map_def_path(&mut self, _def_path: &()) -> DefPath {
        unreachable!("the resolver folds items directly")
    }

    fn map_info(&mut self, _info: &()) {}

    fn map_field_idx(&mut self, _idx: &()) {}

    fn map_break_target(&mut self, _target: &()) {}

    fn map_local_info(&mut self, _local: &()) {}

    fn map_typeck(&mut self, _typeck: &()) {}

    fn fold_id(&mut self, id: &Id<Built>) -> Id<Resolved> {
        let res = self.resolve_value_name(&id.name, &id.position);
        Id {
            name: id.name.clone(),
            res,
            info: (),
            position: id.position.clone(),
        }
    }

    fn fold_type_name(&mut self, type_name: &TypeName<Built>) -> TypeName<Resolved> {
        match type_name {
            TypeName::Ident(ident) => {
                let res = self.resolve_type_ident(&ident.name, &ident.position);
                TypeName::Ident(TypeIdent {
                    name: ident.name.clone(),
                    generic_args: ident
                        .generic_args
                        .iter()
                        .map(|arg| self.fold_type_name(arg))
                        .collect(),
                    res,
                    position: ident.position.clone(),
                })
            }
            other => super_fold_type_name(self, other),
        }
    }

    fn fold_item(&mut self, item: &Item<Built>) -> Item<Resolved> {
        match item {
            Item::Function(function) => {
                let def_path = self.item_def_path(&function.name);
                let params = function
                    .params
                    .iter()
                    .map(|param| Param {
                        name: param.name.clone(),
                        type_name: self.fold_type_name(&param.type_name),
                        position: param.position.clone(),
                    })
                    .collect::<Vec<_>>();
                let return_type = function
                    .return_type
                    .as_ref()
                    .map(|ty| self.fold_type_name(ty));

                let depth = self.locals.len();
                for param in &function.params {
                    self.locals.push(param.name.clone());
                }
                let body = self.fold_expression(&function.body);
                self.locals.truncate(depth);

                Item::Function(Function {
                    id: function.id,
                    name: function.name.clone(),
                    params,
                    return_type,
                    body,
                    def_path,
                    position: function.position.clone(),
                })
            }
            Item::TypeDef(type_def) => {
                let def_path = self.item_def_path(&type_def.name);
                let saved = std::mem::replace(&mut self.generics, type_def.generics.clone());
                let def = match &type_def.def {
                    TypeDefKind::Struct(fields) => TypeDefKind::Struct(
                        fields
                            .iter()
                            .map(|field| FieldDef {
                                name: field.name.clone(),
                                type_name: self.fold_type_name(&field.type_name),
                                position: field.position.clone(),
                            })
                            .collect(),
                    ),
                    TypeDefKind::Alias(target) => TypeDefKind::Alias(self.fold_type_name(target)),
                };
                self.generics = saved;

                Item::TypeDef(TypeDef {
                    id: type_def.id,
                    name: type_def.name.clone(),
                    generics: type_def.generics.clone(),
                    def,
                    def_path,
                    position: type_def.position.clone(),
                })
            }
            Item::Import(import) => Item::Import(Import {
                id: import.id,
                name: import.name.clone(),
                module: import.module.clone(),
                function: import.function.clone(),
                params: import
                    .params
                    .iter()
                    .map(|param| Param {
                        name: param.name.clone(),
                        type_name: self.fold_type_name(&param.type_name),
                        position: param.position.clone(),
                    })
                    .collect(),
                return_type: import.return_type.as_ref().map(|ty| self.fold_type_name(ty)),
                def_path: self.item_def_path(&import.name),
                position: import.position.clone(),
            }),
            Item::Mod(module) => self.fold_module(module),
            Item::ExternPkg(extern_pkg) => {
                // load eagerly so later paths through this package resolve
                let _ = self
                    .cx
                    .load_package(&extern_pkg.name, &extern_pkg.position);
                Item::ExternPkg(ExternPkg {
                    id: extern_pkg.id,
                    name: extern_pkg.name.clone(),
                    def_path: self.item_def_path(&extern_pkg.name),
                    position: extern_pkg.position.clone(),
                })
            }
            Item::Global(global) => Item::Global(Global {
                id: global.id,
                name: global.name.clone(),
                mutable: global.mutable,
                type_name: self.fold_type_name(&global.type_name),
                value: self.fold_expression(&global.value),
                def_path: self.item_def_path(&global.name),
                position: global.position.clone(),
            }),
            Item::Use(use_item) => {
                let res = self.resolve_use_target(&use_item.segments, &use_item.position);
                Item::Use(Use {
                    id: use_item.id,
                    name: use_item.name.clone(),
                    segments: use_item.segments.clone(),
                    res,
                    def_path: self.item_def_path(&use_item.name),
                    position: use_item.position.clone(),
                })
            }
            Item::Error(item_error) => Item::Error(ItemError {
                id: item_error.id,
                error: item_error.error,
                def_path: self.def_path.clone(),
                position: item_error.position.clone(),
            }),
        }
    }

    fn fold_expression(&mut self, expression: &Expression<Built>) -> Expression<Resolved> {
        match expression {
            Expression::Let(let_exp) => {
                let value = self.fold_expression(&let_exp.value);
                let type_name = let_exp
                    .type_name
                    .as_ref()
                    .map(|ty| self.fold_type_name(ty));
                // the binding becomes visible only after its initializer
                self.locals.push(let_exp.name.clone());
                Expression::Let(Let {
                    name: let_exp.name.clone(),
                    type_name,
                    value: Box::new(value),
                    local: (),
                    info: (),
                    position: let_exp.position.clone(),
                })
            }
            Expression::Block(block) => {
                let depth = self.locals.len();
                let expressions = block
                    .expressions
                    .iter()
                    .map(|sub| self.fold_expression(sub))
                    .collect();
                self.locals.truncate(depth);
                Expression::Block(crate::ast::Block {
                    expressions,
                    info: (),
                    position: block.position.clone(),
                })
            }
            Expression::FieldAccess(access) => {
                let target = self.fold_expression(&access.target);

                let module_path = match &target {
                    Expression::Id(id) => Some((vec![id.name.clone()], id.res.clone())),
                    Expression::Path(path) => Some((path.segments.clone(), path.res.clone())),
                    _ => None,
                }
                .and_then(|(segments, res)| {
                    let forwarded = self.follow_use(res, &access.position);
                    self.is_module_like(&forwarded)
                        .then_some((segments, forwarded))
                });

                let Some((mut segments, base)) = module_path else {
                    return Expression::FieldAccess(Box::new(FieldAccess {
                        target,
                        field: access.field.clone(),
                        field_index: (),
                        info: (),
                        position: access.position.clone(),
                    }));
                };

                match &access.field {
                    FieldName::Named(name) => {
                        let res = self.resolve_member(base, name, &access.position);
                        segments.push(name.clone());
                        Expression::Path(PathExpr {
                            segments,
                            res,
                            info: (),
                            position: access.position.clone(),
                        })
                    }
                    FieldName::Index(_) => {
                        let error = self
                            .cx
                            .sink
                            .emit("modules have no numeric members", access.position.clone());
                        Expression::Error(ExprError {
                            error,
                            info: (),
                            position: access.position.clone(),
                        })
                    }
                }
            }
            other => super_fold_expression(self, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        builder::build_package,
        context::{GlobalCx, Options},
        errors::SourceFile,
        lexer::tokenize,
        parser::parse_file,
    };

    fn resolve_source(input: &str) -> (Package<Resolved>, GlobalCx) {
        let mut cx = GlobalCx::new(Options {
            no_std: true,
            ..Default::default()
        });
        let source = SourceFile::new("main.weft", input);
        let tokens = tokenize(&source).expect("lexes");
        let items = parse_file(&source, tokens, &cx.sink).expect("parses");
        let pkg_id = cx.alloc_pkg_id();
        let built = build_package(
            pkg_id,
            "main",
            "main.weft".into(),
            &items,
            None,
            Span::default(),
        );
        let resolved = resolve_package(&mut cx, &built);
        (resolved, cx)
    }

    fn first_function(pkg: &Package<Resolved>) -> &Function<Resolved> {
        pkg.root_items()
            .iter()
            .find_map(|item| match item {
                Item::Function(f) => Some(f),
                _ => None,
            })
            .expect("package has a function")
    }

    fn block_expressions<'e>(body: &'e Expression<Resolved>) -> &'e [Expression<Resolved>] {
        match body {
            Expression::Block(block) => &block.expressions,
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn test_local_de_bruijn_indices() {
        let (pkg, cx) = resolve_source(
            "function f(a: Int, b: Int) = (let c = a; (let d = 1; a));",
        );
        assert!(!cx.sink.has_errors());

        let body = block_expressions(&first_function(&pkg).body);

        // `a` inside `let c = a`: stack is [a, b], distance 1
        let Expression::Let(let_c) = &body[0] else {
            panic!("expected let");
        };
        let Expression::Id(a_ref) = let_c.value.as_ref() else {
            panic!("expected id");
        };
        assert_eq!(a_ref.res, Resolution::Local { index: 1 });

        // `a` at the end of the inner block: stack is [a, b, c, d]
        let inner = block_expressions(&body[1]);
        let Expression::Id(a_again) = &inner[1] else {
            panic!("expected id");
        };
        assert_eq!(a_again.res, Resolution::Local { index: 3 });
    }

    #[test]
    fn test_shadowing_resolves_to_innermost() {
        let (pkg, cx) = resolve_source("function f() = (let a = 1; let a = 2; a);");
        assert!(!cx.sink.has_errors());

        let body = block_expressions(&first_function(&pkg).body);
        let Expression::Id(a_ref) = &body[2] else {
            panic!("expected id");
        };
        assert_eq!(a_ref.res, Resolution::Local { index: 0 });
    }

    #[test]
    fn test_block_scope_is_truncated() {
        let (_, cx) = resolve_source("function f() = ((let x = 1; x); x);");
        let errors = cx.sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "cannot find x");
    }

    #[test]
    fn test_module_path_collapses() {
        let (pkg, cx) =
            resolve_source("mod m (function g() = (););\nfunction main() = m.g();");
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        let main = pkg
            .root_items()
            .iter()
            .find_map(|item| match item {
                Item::Function(f) if f.name == "main" => Some(f),
                _ => None,
            })
            .expect("main exists");

        let Expression::Call(call) = &main.body else {
            panic!("expected call body");
        };
        let Expression::Path(path) = &call.callee else {
            panic!("expected collapsed path, got {:?}", call.callee);
        };
        assert_eq!(path.segments, vec!["m".to_string(), "g".to_string()]);

        let Resolution::Item { id } = path.res else {
            panic!("expected item resolution");
        };
        let Some(Item::Function(g)) = pkg.item(id) else {
            panic!("path should point at g");
        };
        assert_eq!(g.name, "g");

        assert_no_module_field_access(&main.body, &pkg);
    }

    fn assert_no_module_field_access(expr: &Expression<Resolved>, pkg: &Package<Resolved>) {
        if let Expression::FieldAccess(access) = expr {
            if let Expression::Id(id) = &access.target {
                if let Resolution::Item { id: item_id } = &id.res {
                    assert!(!matches!(
                        pkg.item(*item_id),
                        Some(Item::Mod(_)) | Some(Item::ExternPkg(_))
                    ));
                }
            }
        }
    }

    #[test]
    fn test_module_numeric_member_is_diagnosed() {
        let (_, cx) = resolve_source("mod m ();\nfunction main() = m.0;");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message.contains("numeric")));
    }

    #[test]
    fn test_missing_member_is_diagnosed() {
        let (_, cx) = resolve_source("mod m ();\nfunction main() = m.g();");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message.contains("no member 'g'")));
    }

    #[test]
    fn test_duplicate_items_are_diagnosed() {
        let (_, cx) = resolve_source("function f() = ();\nfunction f() = ();");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message.contains("duplicate item name 'f'")));
    }

    #[test]
    fn test_builtins_resolve() {
        let (pkg, cx) = resolve_source("function main() = print(\"hi\");");
        assert!(!cx.sink.has_errors());

        let Expression::Call(call) = &first_function(&pkg).body else {
            panic!("expected call");
        };
        let Expression::Id(callee) = &call.callee else {
            panic!("expected id callee");
        };
        assert_eq!(callee.res, Resolution::Builtin(Builtin::Print));
    }

    #[test]
    fn test_unknown_name_message() {
        let (_, cx) = resolve_source("function main() = nope;");
        assert_eq!(cx.sink.errors()[0].message, "cannot find nope");
    }

    #[test]
    fn test_use_forwards_to_target() {
        let (pkg, cx) = resolve_source(
            "mod m (function g() = (););\nuse m.g;\nfunction main() = g();",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        let use_item = pkg
            .root_items()
            .iter()
            .find_map(|item| match item {
                Item::Use(u) => Some(u),
                _ => None,
            })
            .expect("use item");
        let Resolution::Item { id } = use_item.res else {
            panic!("use should resolve to an item");
        };
        assert!(matches!(pkg.item(id), Some(Item::Function(f)) if f.name == "g"));
    }

    #[test]
    fn test_type_params_resolve_in_struct_fields() {
        let (pkg, cx) = resolve_source("type Box[T] = struct { v: T, n: Int };");
        assert!(!cx.sink.has_errors());

        let Some(Item::TypeDef(def)) = pkg.root_items().first() else {
            panic!("expected type def");
        };
        let TypeDefKind::Struct(fields) = &def.def else {
            panic!("expected struct");
        };
        let TypeName::Ident(v_ty) = &fields[0].type_name else {
            panic!("expected ident type");
        };
        assert_eq!(
            v_ty.res,
            Resolution::TyParam {
                index: 0,
                name: "T".to_string()
            }
        );
        let TypeName::Ident(n_ty) = &fields[1].type_name else {
            panic!("expected ident type");
        };
        assert_eq!(n_ty.res, Resolution::Builtin(Builtin::IntTy));
    }

    #[test]
    fn test_def_paths_start_at_package() {
        let (pkg, _) = resolve_source("mod m (function g() = (););");

        let Some(Item::Mod(module)) = pkg.root_items().first() else {
            panic!("expected module");
        };
        assert_eq!(module.def_path, vec!["main".to_string(), "m".to_string()]);
        let Some(Item::Function(g)) = module.items.first() else {
            panic!("expected function");
        };
        assert_eq!(
            g.def_path,
            vec!["main".to_string(), "m".to_string(), "g".to_string()]
        );
    }

    #[test]
    fn test_item_ids_stay_unique() {
        let (pkg, _) = resolve_source(
            "mod m (function g() = (); mod inner (function h() = ();););\nfunction main() = ();",
        );
        // root module, m, g, inner, h, main: all registered exactly once
        assert_eq!(pkg.items_by_id.len(), 6);
        let mut indices = pkg.items_by_id.keys().map(|id| id.item).collect::<Vec<_>>();
        indices.sort_unstable();
        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5]);
    }
}
