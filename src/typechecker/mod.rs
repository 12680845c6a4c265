//! # Type Checker Module
//!
//! Transforms a `Resolved` package into the `Typecked` (final) phase:
//! item signatures are lowered on demand ([`items`]), function bodies are
//! inferred via unification ([`expression`], [`infer`]), and a final
//! resolver pass replaces every remaining inference variable by its
//! substitution, diagnosing the ones that stay unbound.

mod expression;
mod infer;
mod items;
mod types;

pub use types::{LocalInfo, Ty, TyVar, TypeckResults};

use std::collections::HashMap;

use crate::{
    ast::fold::{register_items, super_fold_expression, Folder},
    ast::{
        DefPath, Expression, ExternPkg, FieldDef, Final, Function, Global, Import, Item, ItemError,
        ItemId, LoopId, Module, Package, Param, Resolution, Resolved, TypeDef, TypeDefKind,
        TypeIdent, TypeName, Typecked, Use,
    },
    context::GlobalCx,
    errors::ErrorSink,
};

use self::{expression::BodyChecker, infer::InferCtx, items::ItemTypes};

/// Type check a resolved package.
pub fn check_package(cx: &GlobalCx, pkg: &Package<Resolved>) -> Package<Final> {
    log::debug!("type checking package '{}'", pkg.name);

    let mut items = ItemTypes::new(cx, pkg);
    lower_signatures(&mut items, &pkg.root);

    let mut fn_locals = HashMap::new();
    let root = check_item(&mut items, &mut fn_locals, &pkg.root);

    let (item_tys, struct_fields) = items.into_tables();
    let mut items_by_id = HashMap::new();
    register_items(&mut items_by_id, &root);

    Package {
        id: pkg.id,
        name: pkg.name.clone(),
        file: pkg.file.clone(),
        root,
        items_by_id,
        fatal_error: pkg.fatal_error,
        typeck: TypeckResults {
            item_tys,
            struct_fields,
            fn_locals,
        },
    }
}

/// Lower the signature of every item up front, in source order.
fn lower_signatures(items: &mut ItemTypes, item: &Item<Resolved>) {
    match item {
        Item::Function(f) => {
            items.type_of_item(f.id, &f.position);
        }
        Item::Import(i) => {
            items.type_of_item(i.id, &i.position);
        }
        Item::TypeDef(t) => {
            items.type_of_item(t.id, &t.position);
        }
        Item::Global(g) => {
            items.type_of_item(g.id, &g.position);
        }
        Item::Mod(module) => {
            for child in &module.items {
                lower_signatures(items, child);
            }
        }
        Item::ExternPkg(_) | Item::Use(_) | Item::Error(_) => {}
    }
}

fn check_item(
    items: &mut ItemTypes,
    fn_locals: &mut HashMap<ItemId, Vec<Ty>>,
    item: &Item<Resolved>,
) -> Item<Typecked> {
    match item {
        Item::Function(function) => check_function(items, fn_locals, function),
        Item::Global(global) => check_global(items, fn_locals, global),
        Item::Mod(module) => Item::Mod(Module {
            id: module.id,
            name: module.name.clone(),
            items: module
                .items
                .iter()
                .map(|child| check_item(items, fn_locals, child))
                .collect(),
            file_module: module.file_module,
            def_path: module.def_path.clone(),
            position: module.position.clone(),
        }),
        Item::TypeDef(type_def) => Item::TypeDef(TypeDef {
            id: type_def.id,
            name: type_def.name.clone(),
            generics: type_def.generics.clone(),
            def: match &type_def.def {
                TypeDefKind::Struct(fields) => TypeDefKind::Struct(
                    fields
                        .iter()
                        .map(|field| FieldDef {
                            name: field.name.clone(),
                            type_name: convert_type_name(&field.type_name),
                            position: field.position.clone(),
                        })
                        .collect(),
                ),
                TypeDefKind::Alias(target) => TypeDefKind::Alias(convert_type_name(target)),
            },
            def_path: type_def.def_path.clone(),
            position: type_def.position.clone(),
        }),
        Item::Import(import) => Item::Import(Import {
            id: import.id,
            name: import.name.clone(),
            module: import.module.clone(),
            function: import.function.clone(),
            params: convert_params(&import.params),
            return_type: import.return_type.as_ref().map(convert_type_name),
            def_path: import.def_path.clone(),
            position: import.position.clone(),
        }),
        Item::ExternPkg(extern_pkg) => Item::ExternPkg(ExternPkg {
            id: extern_pkg.id,
            name: extern_pkg.name.clone(),
            def_path: extern_pkg.def_path.clone(),
            position: extern_pkg.position.clone(),
        }),
        Item::Use(use_item) => Item::Use(Use {
            id: use_item.id,
            name: use_item.name.clone(),
            segments: use_item.segments.clone(),
            res: use_item.res.clone(),
            def_path: use_item.def_path.clone(),
            position: use_item.position.clone(),
        }),
        Item::Error(item_error) => Item::Error(ItemError {
            id: item_error.id,
            error: item_error.error,
            def_path: item_error.def_path.clone(),
            position: item_error.position.clone(),
        }),
    }
}

fn check_function(
    items: &mut ItemTypes,
    fn_locals: &mut HashMap<ItemId, Vec<Ty>>,
    function: &Function<Resolved>,
) -> Item<Typecked> {
    log::trace!("checking body of '{}'", function.name);
    let sink = items.sink();
    let mut checker = BodyChecker::new(items);

    let param_tys = function
        .params
        .iter()
        .map(|param| checker.items.lower_type_name(&param.type_name))
        .collect::<Vec<_>>();
    for ty in &param_tys {
        checker.push_param(ty.clone());
    }

    // an unannotated return type is inferred from the body
    let (return_ty, inferred_return) = match &function.return_type {
        Some(type_name) => (checker.items.lower_type_name(type_name), false),
        None => (checker.infer.new_var(), true),
    };

    let body = checker.check_expression(&function.body);
    checker
        .infer
        .assign(&return_ty, body.info(), &body.position());

    let BodyChecker {
        infer,
        fn_locals: local_tys,
        ..
    } = checker;

    let body = resolve_pass(&body, &infer, &sink);
    let locals = local_tys
        .iter()
        .map(|ty| infer.fully_resolve(ty).unwrap_or(Ty::Error))
        .collect::<Vec<_>>();
    fn_locals.insert(function.id, locals);

    if inferred_return {
        let resolved = infer.fully_resolve(&return_ty).unwrap_or(Ty::Error);
        items.override_ty(function.id, Ty::fn_ty(param_tys, resolved));
    }

    Item::Function(Function {
        id: function.id,
        name: function.name.clone(),
        params: convert_params(&function.params),
        return_type: function.return_type.as_ref().map(convert_type_name),
        body,
        def_path: function.def_path.clone(),
        position: function.position.clone(),
    })
}

fn check_global(
    items: &mut ItemTypes,
    fn_locals: &mut HashMap<ItemId, Vec<Ty>>,
    global: &Global<Resolved>,
) -> Item<Typecked> {
    let sink = items.sink();
    let mut checker = BodyChecker::new(items);

    let declared = checker.items.lower_type_name(&global.type_name);
    let value = checker.check_expression(&global.value);
    checker
        .infer
        .assign(&declared, value.info(), &value.position());

    let BodyChecker {
        infer,
        fn_locals: local_tys,
        ..
    } = checker;
    let value = resolve_pass(&value, &infer, &sink);
    let locals = local_tys
        .iter()
        .map(|ty| infer.fully_resolve(ty).unwrap_or(Ty::Error))
        .collect::<Vec<_>>();
    fn_locals.insert(global.id, locals);

    Item::Global(Global {
        id: global.id,
        name: global.name.clone(),
        mutable: global.mutable,
        type_name: convert_type_name(&global.type_name),
        value,
        def_path: global.def_path.clone(),
        position: global.position.clone(),
    })
}

fn convert_params(params: &[Param<Resolved>]) -> Vec<Param<Typecked>> {
    params
        .iter()
        .map(|param| Param {
            name: param.name.clone(),
            type_name: convert_type_name(&param.type_name),
            position: param.position.clone(),
        })
        .collect()
}

pub(crate) fn convert_type_name(type_name: &TypeName<Resolved>) -> TypeName<Typecked> {
    match type_name {
        TypeName::Ident(ident) => TypeName::Ident(TypeIdent {
            name: ident.name.clone(),
            generic_args: ident.generic_args.iter().map(convert_type_name).collect(),
            res: ident.res.clone(),
            position: ident.position.clone(),
        }),
        TypeName::Tuple(elements, position) => TypeName::Tuple(
            elements.iter().map(convert_type_name).collect(),
            position.clone(),
        ),
        TypeName::RawPtr(inner, position) => {
            TypeName::RawPtr(Box::new(convert_type_name(inner)), position.clone())
        }
        TypeName::Never(position) => TypeName::Never(position.clone()),
        TypeName::Error(error, position) => TypeName::Error(*error, position.clone()),
    }
}

/// Final pass over a checked body: deep-resolve every expression and
/// local type, diagnosing anything still unbound.
struct ResolvePass<'i> {
    infer: &'i InferCtx,
    sink: ErrorSink,
}

fn resolve_pass(
    body: &Expression<Typecked>,
    infer: &InferCtx,
    sink: &ErrorSink,
) -> Expression<Typecked> {
    ResolvePass {
        infer,
        sink: sink.clone(),
    }
    .fold_expression(body)
}

impl<'i> Folder for ResolvePass<'i> {
    type From = Typecked;
    type To = Typecked;

    fn map_item_id(&mut self, id: &ItemId) -> ItemId {
        *id
    }

    fn map_loop_id(&mut self, id: &LoopId) -> LoopId {
        *id
    }

    fn map_res(&mut self, res: &Resolution) -> Resolution {
        res.clone()
    }

    fn map_def_path(&mut self, def_path: &DefPath) -> DefPath {
        def_path.clone()
    }

    fn map_info(&mut self, info: &Ty) -> Ty {
        info.clone()
    }

    fn map_field_idx(&mut self, idx: &usize) -> usize {
        *idx
    }

    fn map_break_target(&mut self, target: &LoopId) -> LoopId {
        *target
    }

    fn map_local_info(&mut self, local: &LocalInfo) -> LocalInfo {
        local.clone()
    }

    fn map_typeck(&mut self, typeck: &TypeckResults) -> TypeckResults {
        typeck.clone()
    }

    fn fold_expression(&mut self, expression: &Expression<Typecked>) -> Expression<Typecked> {
        let mut folded = super_fold_expression(self, expression);

        let info = match self.infer.fully_resolve(folded.info()) {
            Ok(ty) => ty,
            Err(_) => match &folded {
                // an unconstrained asm splice defaults to unit
                Expression::Asm(_) => Ty::Unit,
                _ => {
                    self.sink.emit("cannot infer type", folded.position());
                    Ty::Error
                }
            },
        };
        *folded.info_mut() = info;

        if let Expression::Let(let_exp) = &mut folded {
            let_exp.local.ty = self
                .infer
                .fully_resolve(&let_exp.local.ty)
                .unwrap_or(Ty::Error);
        }

        folded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Expression;
    use crate::test_helpers::check_source;

    fn function_ty(pkg: &Package<Final>, name: &str) -> Ty {
        let id = pkg
            .root_items()
            .iter()
            .find(|item| item.name() == Some(name))
            .map(|item| item.id())
            .expect("function exists");
        pkg.typeck.item_tys.get(&id).cloned().expect("typed")
    }

    fn function_body<'p>(pkg: &'p Package<Final>, name: &str) -> &'p Expression<Typecked> {
        pkg.root_items()
            .iter()
            .find_map(|item| match item {
                Item::Function(f) if f.name == name => Some(&f.body),
                _ => None,
            })
            .expect("function exists")
    }

    #[test]
    fn test_simple_let_body() {
        let (pkg, cx) = check_source("function main() = (let a: Int = 1; a);");
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        assert_eq!(function_ty(&pkg, "main"), Ty::fn_ty(vec![], Ty::Int));
        assert_eq!(function_body(&pkg, "main").get_info(), Ty::Int);
    }

    #[test]
    fn test_let_ascription_mismatch() {
        let (_, cx) = check_source("function main() = (let a: Int = \"\"; a);");
        let errors = cx.sink.errors();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "expected int, found string");
    }

    #[test]
    fn test_missing_struct_fields() {
        let (_, cx) = check_source(
            "type Pair = struct { x: Int, y: Int };\nfunction f() = Pair { x: 1 };",
        );
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "missing fields in literal: y"));
    }

    #[test]
    fn test_loop_with_break_is_unit() {
        let (pkg, cx) = check_source("function main() = loop ( break );");
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
        assert_eq!(function_ty(&pkg, "main"), Ty::fn_ty(vec![], Ty::Unit));
    }

    #[test]
    fn test_loop_without_break_is_never() {
        let (pkg, cx) = check_source("function main() = loop ( 1 );");
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
        assert_eq!(function_ty(&pkg, "main"), Ty::fn_ty(vec![], Ty::Never));
    }

    #[test]
    fn test_never_unifies_with_int_local() {
        let (_, cx) =
            check_source("function main() = (let a: Int = loop (1); a);");
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
    }

    #[test]
    fn test_break_records_innermost_loop() {
        let (pkg, cx) = check_source(
            "function main() = loop ( loop ( break ) );",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        // outer loop has no break of its own
        let Expression::Loop(outer) = function_body(&pkg, "main") else {
            panic!("expected loop");
        };
        assert_eq!(outer.info, Ty::Never);
        let Expression::Loop(inner) = strip_block(&outer.body) else {
            panic!("expected inner loop");
        };
        assert_eq!(inner.info, Ty::Unit);
        let Expression::Break(break_exp) = strip_block(&inner.body) else {
            panic!("expected break");
        };
        assert_eq!(break_exp.target, inner.loop_id);
        assert_ne!(break_exp.target, outer.loop_id);
    }

    fn strip_block(expr: &Expression<Typecked>) -> &Expression<Typecked> {
        match expr {
            Expression::Block(block) if block.expressions.len() == 1 => &block.expressions[0],
            other => other,
        }
    }

    #[test]
    fn test_break_outside_loop() {
        let (_, cx) = check_source("function main() = break;");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "break outside of loop"));
    }

    #[test]
    fn test_no_vars_survive_checking() {
        let (pkg, cx) = check_source(
            "type Pair = struct { x: Int, y: I32 };\n\
             function main() = (\n\
               let p = Pair { x: 1, y: 2_I32 };\n\
               let t = (p.x, p.y);\n\
               if t.1 < 3_I32 then print(\"small\") else ()\n\
             );",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        fn walk(expr: &Expression<Typecked>) {
            assert!(
                !expr.get_info().contains_var(),
                "unresolved var in {expr:?}"
            );
            match expr {
                Expression::Block(b) => b.expressions.iter().for_each(walk),
                Expression::Let(l) => {
                    assert!(!l.local.ty.contains_var());
                    walk(&l.value)
                }
                Expression::If(i) => {
                    walk(&i.condition);
                    walk(&i.then_branch);
                    if let Some(e) = &i.else_branch {
                        walk(e);
                    }
                }
                Expression::Call(c) => {
                    walk(&c.callee);
                    c.arguments.iter().for_each(walk);
                }
                Expression::FieldAccess(f) => walk(&f.target),
                Expression::TupleLiteral(t) => t.elements.iter().for_each(walk),
                Expression::StructLiteral(s) => {
                    s.fields.iter().for_each(|f| walk(&f.value))
                }
                _ => {}
            }
        }
        walk(function_body(&pkg, "main"));
    }

    #[test]
    fn test_cannot_infer_unconstrained_let() {
        let (_, cx) = check_source("function main() = (let a = ___transmute(1); ());");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "cannot infer type"));
    }

    #[test]
    fn test_transmute_takes_context_type() {
        let (_, cx) =
            check_source("function main() = (let a: I32 = ___transmute(1); ());");
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
    }

    #[test]
    fn test_alias_cycle_is_diagnosed() {
        let (_, cx) = check_source("type A = B;\ntype B = A;\nfunction main() = ();");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message.contains("cycle detected in type definition")));
    }

    #[test]
    fn test_recursive_struct_through_rawptr() {
        let (pkg, cx) = check_source(
            "type Node = struct { value: Int, next: *Node };\nfunction main() = ();",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        let node_id = pkg
            .root_items()
            .iter()
            .find(|item| item.name() == Some("Node"))
            .map(|item| item.id())
            .expect("node exists");
        let fields = pkg.typeck.struct_fields.get(&node_id).expect("fields");
        assert_eq!(fields[1].0, "next");
        assert_eq!(
            fields[1].1,
            Ty::rawptr(Ty::Struct {
                id: node_id,
                name: "Node".to_string()
            })
        );
    }

    #[test]
    fn test_field_access_through_rawptr() {
        let (_, cx) = check_source(
            "type Node = struct { value: Int, next: *Node };\n\
             function f(n: *Node): Int = n.value;",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
    }

    #[test]
    fn test_arity_mismatch() {
        let (_, cx) = check_source(
            "function g(a: Int) = ();\nfunction main() = g(1, 2);",
        );
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "expected 1 arguments, found 2"));
    }

    #[test]
    fn test_binary_operator_table() {
        let (_, cx) = check_source("function f(): Bool = 1 < 2;");
        assert!(!cx.sink.has_errors());

        let (_, cx) = check_source("function f() = 1 + 2_I32;");
        assert!(cx.sink.has_errors());

        let (_, cx) = check_source("function f(): Bool = true & false;");
        assert!(!cx.sink.has_errors());

        let (_, cx) = check_source("function f(): Bool = \"a\" == \"b\";");
        assert!(!cx.sink.has_errors());
    }

    #[test]
    fn test_unary_minus_rejected() {
        let (_, cx) = check_source("function f() = -1;");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "unary - is not supported"));
    }

    #[test]
    fn test_assignment_targets() {
        let (_, cx) = check_source(
            "global mut g: Int = 0;\nfunction f() = (let a = 1; a = 2; g = 3);",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());

        let (_, cx) = check_source("global g: Int = 0;\nfunction f() = g = 3;");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "cannot assign to immutable global"));

        let (_, cx) = check_source("function h() = ();\nfunction f() = h = 3;");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "invalid assignment target"));
    }

    #[test]
    fn test_null_pointer_unifies() {
        let (_, cx) = check_source(
            "type Node = struct { value: Int, next: *Node };\n\
             function f(n: *Node): Bool = n == __NULL;",
        );
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
    }

    #[test]
    fn test_type_param_as_value_is_diagnosed() {
        let (_, cx) = check_source("type Box[T] = struct { v: T };\nfunction main() = ();");
        assert!(!cx.sink.has_errors());

        let (_, cx) = check_source(
            "type Box[T] = struct { v: T };\nfunction main() = ();\nglobal g: Box[Int] = Box { v: 1 };",
        );
        // generic arguments are opaque; the literal still checks against
        // the unsubstituted field type, which is a param
        assert!(cx.sink.has_errors());
    }

    #[test]
    fn test_if_branch_mismatch() {
        let (_, cx) = check_source("function f() = if true then 1 else \"s\";");
        assert!(cx
            .sink
            .errors()
            .iter()
            .any(|e| e.message == "expected int, found string"));
    }
}
