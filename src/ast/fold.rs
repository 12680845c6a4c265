//! Folding scaffold for rewriting a package from one phase to the next.
//!
//! A [`Folder`] maps every item, expression, identifier-with-resolution
//! and AST type from its `From` phase to its `To` phase. The
//! `super_fold_*` functions recurse structurally and fill the phase slots
//! through the folder's `map_*` hooks, so a concrete folder only
//! overrides the nodes it actually cares about.

use std::collections::HashMap;

use super::{
    Asm, Assign, AstString, BinaryExpression, Block, Break, Call, Empty, ExprError, Expression,
    ExternPkg, FieldAccess, FieldDef, Function, Global, Id, If, Import, Item, ItemError, ItemId,
    Let, Loop, Module, Num, Package, Param, PathExpr, Phase, Prefix, StructLiteral,
    StructLiteralField, TupleLiteral, TypeDef, TypeDefKind, TypeIdent, TypeName, Use,
};

pub trait Folder: Sized {
    type From: Phase;
    type To: Phase;

    fn fold_item(&mut self, item: &Item<Self::From>) -> Item<Self::To> {
        super_fold_item(self, item)
    }

    fn fold_expression(&mut self, expression: &Expression<Self::From>) -> Expression<Self::To> {
        super_fold_expression(self, expression)
    }

    fn fold_type_name(&mut self, type_name: &TypeName<Self::From>) -> TypeName<Self::To> {
        super_fold_type_name(self, type_name)
    }

    fn fold_id(&mut self, id: &Id<Self::From>) -> Id<Self::To> {
        Id {
            name: id.name.clone(),
            res: self.map_res(&id.res),
            info: self.map_info(&id.info),
            position: id.position.clone(),
        }
    }

    fn map_item_id(&mut self, id: &<Self::From as Phase>::ItemId) -> <Self::To as Phase>::ItemId;

    fn map_loop_id(&mut self, id: &<Self::From as Phase>::LoopId) -> <Self::To as Phase>::LoopId;

    fn map_res(&mut self, res: &<Self::From as Phase>::Res) -> <Self::To as Phase>::Res;

    fn map_def_path(
        &mut self,
        def_path: &<Self::From as Phase>::DefPath,
    ) -> <Self::To as Phase>::DefPath;

    fn map_info(&mut self, info: &<Self::From as Phase>::TypeInfo)
        -> <Self::To as Phase>::TypeInfo;

    fn map_field_idx(
        &mut self,
        idx: &<Self::From as Phase>::FieldIdx,
    ) -> <Self::To as Phase>::FieldIdx;

    fn map_break_target(
        &mut self,
        target: &<Self::From as Phase>::BreakTarget,
    ) -> <Self::To as Phase>::BreakTarget;

    fn map_local_info(
        &mut self,
        local: &<Self::From as Phase>::LocalInfo,
    ) -> <Self::To as Phase>::LocalInfo;

    fn map_typeck(&mut self, typeck: &<Self::From as Phase>::Typeck)
        -> <Self::To as Phase>::Typeck;
}

/// Apply a folder to a whole package, rebuilding the by-identifier item
/// table from the folded tree.
pub fn fold_package<F>(folder: &mut F, pkg: &Package<F::From>) -> Package<F::To>
where
    F: Folder,
    F::To: Phase<ItemId = ItemId>,
{
    let root = folder.fold_item(&pkg.root);

    let mut items_by_id = HashMap::new();
    register_items(&mut items_by_id, &root);

    Package {
        id: pkg.id,
        name: pkg.name.clone(),
        file: pkg.file.clone(),
        root,
        items_by_id,
        fatal_error: pkg.fatal_error,
        typeck: folder.map_typeck(&pkg.typeck),
    }
}

/// Insert an item and all items nested below it into a by-id table.
pub fn register_items<P>(map: &mut HashMap<ItemId, Item<P>>, item: &Item<P>)
where
    P: Phase<ItemId = ItemId>,
{
    let previous = map.insert(item.id(), item.clone());
    debug_assert!(previous.is_none(), "duplicate item id {}", item.id());

    if let Item::Mod(module) = item {
        for child in &module.items {
            register_items(map, child);
        }
    }
}

pub fn fold_params<F: Folder>(folder: &mut F, params: &[Param<F::From>]) -> Vec<Param<F::To>> {
    params
        .iter()
        .map(|param| Param {
            name: param.name.clone(),
            type_name: folder.fold_type_name(&param.type_name),
            position: param.position.clone(),
        })
        .collect()
}

pub fn super_fold_item<F: Folder>(folder: &mut F, item: &Item<F::From>) -> Item<F::To> {
    match item {
        Item::Function(function) => Item::Function(Function {
            id: folder.map_item_id(&function.id),
            name: function.name.clone(),
            params: fold_params(folder, &function.params),
            return_type: function
                .return_type
                .as_ref()
                .map(|ty| folder.fold_type_name(ty)),
            body: folder.fold_expression(&function.body),
            def_path: folder.map_def_path(&function.def_path),
            position: function.position.clone(),
        }),
        Item::TypeDef(type_def) => Item::TypeDef(TypeDef {
            id: folder.map_item_id(&type_def.id),
            name: type_def.name.clone(),
            generics: type_def.generics.clone(),
            def: match &type_def.def {
                TypeDefKind::Struct(fields) => TypeDefKind::Struct(
                    fields
                        .iter()
                        .map(|field| FieldDef {
                            name: field.name.clone(),
                            type_name: folder.fold_type_name(&field.type_name),
                            position: field.position.clone(),
                        })
                        .collect(),
                ),
                TypeDefKind::Alias(target) => TypeDefKind::Alias(folder.fold_type_name(target)),
            },
            def_path: folder.map_def_path(&type_def.def_path),
            position: type_def.position.clone(),
        }),
        Item::Import(import) => Item::Import(Import {
            id: folder.map_item_id(&import.id),
            name: import.name.clone(),
            module: import.module.clone(),
            function: import.function.clone(),
            params: fold_params(folder, &import.params),
            return_type: import
                .return_type
                .as_ref()
                .map(|ty| folder.fold_type_name(ty)),
            def_path: folder.map_def_path(&import.def_path),
            position: import.position.clone(),
        }),
        Item::Mod(module) => Item::Mod(Module {
            id: folder.map_item_id(&module.id),
            name: module.name.clone(),
            items: module
                .items
                .iter()
                .map(|child| folder.fold_item(child))
                .collect(),
            file_module: module.file_module,
            def_path: folder.map_def_path(&module.def_path),
            position: module.position.clone(),
        }),
        Item::ExternPkg(extern_pkg) => Item::ExternPkg(ExternPkg {
            id: folder.map_item_id(&extern_pkg.id),
            name: extern_pkg.name.clone(),
            def_path: folder.map_def_path(&extern_pkg.def_path),
            position: extern_pkg.position.clone(),
        }),
        Item::Global(global) => Item::Global(Global {
            id: folder.map_item_id(&global.id),
            name: global.name.clone(),
            mutable: global.mutable,
            type_name: folder.fold_type_name(&global.type_name),
            value: folder.fold_expression(&global.value),
            def_path: folder.map_def_path(&global.def_path),
            position: global.position.clone(),
        }),
        Item::Use(use_item) => Item::Use(Use {
            id: folder.map_item_id(&use_item.id),
            name: use_item.name.clone(),
            segments: use_item.segments.clone(),
            res: folder.map_res(&use_item.res),
            def_path: folder.map_def_path(&use_item.def_path),
            position: use_item.position.clone(),
        }),
        Item::Error(item_error) => Item::Error(ItemError {
            id: folder.map_item_id(&item_error.id),
            error: item_error.error,
            def_path: folder.map_def_path(&item_error.def_path),
            position: item_error.position.clone(),
        }),
    }
}

pub fn super_fold_expression<F: Folder>(
    folder: &mut F,
    expression: &Expression<F::From>,
) -> Expression<F::To> {
    match expression {
        Expression::Empty(empty) => Expression::Empty(Empty {
            info: folder.map_info(&empty.info),
            position: empty.position.clone(),
        }),
        Expression::Let(let_exp) => Expression::Let(Let {
            name: let_exp.name.clone(),
            type_name: let_exp
                .type_name
                .as_ref()
                .map(|ty| folder.fold_type_name(ty)),
            value: Box::new(folder.fold_expression(&let_exp.value)),
            local: folder.map_local_info(&let_exp.local),
            info: folder.map_info(&let_exp.info),
            position: let_exp.position.clone(),
        }),
        Expression::Assign(assign) => Expression::Assign(Box::new(Assign {
            lhs: folder.fold_expression(&assign.lhs),
            rhs: folder.fold_expression(&assign.rhs),
            info: folder.map_info(&assign.info),
            position: assign.position.clone(),
        })),
        Expression::Block(block) => Expression::Block(Block {
            expressions: block
                .expressions
                .iter()
                .map(|sub| folder.fold_expression(sub))
                .collect(),
            info: folder.map_info(&block.info),
            position: block.position.clone(),
        }),
        Expression::Num(num) => Expression::Num(Num {
            value: num.value,
            kind: num.kind,
            info: folder.map_info(&num.info),
            position: num.position.clone(),
        }),
        Expression::AstString(string) => Expression::AstString(AstString {
            value: string.value.clone(),
            info: folder.map_info(&string.info),
            position: string.position.clone(),
        }),
        Expression::Id(id) => Expression::Id(folder.fold_id(id)),
        Expression::Path(path) => Expression::Path(PathExpr {
            segments: path.segments.clone(),
            res: folder.map_res(&path.res),
            info: folder.map_info(&path.info),
            position: path.position.clone(),
        }),
        Expression::Binary(binary) => Expression::Binary(Box::new(BinaryExpression {
            operator: binary.operator,
            lhs: folder.fold_expression(&binary.lhs),
            rhs: folder.fold_expression(&binary.rhs),
            info: folder.map_info(&binary.info),
            position: binary.position.clone(),
        })),
        Expression::Prefix(prefix) => Expression::Prefix(Box::new(Prefix {
            operator: prefix.operator,
            inner: folder.fold_expression(&prefix.inner),
            info: folder.map_info(&prefix.info),
            position: prefix.position.clone(),
        })),
        Expression::Call(call) => Expression::Call(Box::new(Call {
            callee: folder.fold_expression(&call.callee),
            arguments: call
                .arguments
                .iter()
                .map(|arg| folder.fold_expression(arg))
                .collect(),
            info: folder.map_info(&call.info),
            position: call.position.clone(),
        })),
        Expression::FieldAccess(access) => Expression::FieldAccess(Box::new(FieldAccess {
            target: folder.fold_expression(&access.target),
            field: access.field.clone(),
            field_index: folder.map_field_idx(&access.field_index),
            info: folder.map_info(&access.info),
            position: access.position.clone(),
        })),
        Expression::If(if_exp) => Expression::If(Box::new(If {
            condition: folder.fold_expression(&if_exp.condition),
            then_branch: folder.fold_expression(&if_exp.then_branch),
            else_branch: if_exp
                .else_branch
                .as_ref()
                .map(|branch| folder.fold_expression(branch)),
            info: folder.map_info(&if_exp.info),
            position: if_exp.position.clone(),
        })),
        Expression::Loop(loop_exp) => Expression::Loop(Box::new(Loop {
            body: folder.fold_expression(&loop_exp.body),
            loop_id: folder.map_loop_id(&loop_exp.loop_id),
            info: folder.map_info(&loop_exp.info),
            position: loop_exp.position.clone(),
        })),
        Expression::Break(break_exp) => Expression::Break(Break {
            target: folder.map_break_target(&break_exp.target),
            info: folder.map_info(&break_exp.info),
            position: break_exp.position.clone(),
        }),
        Expression::StructLiteral(literal) => Expression::StructLiteral(StructLiteral {
            name: folder.fold_id(&literal.name),
            fields: literal
                .fields
                .iter()
                .map(|field| StructLiteralField {
                    name: field.name.clone(),
                    value: folder.fold_expression(&field.value),
                    field_index: folder.map_field_idx(&field.field_index),
                    position: field.position.clone(),
                })
                .collect(),
            info: folder.map_info(&literal.info),
            position: literal.position.clone(),
        }),
        Expression::TupleLiteral(tuple) => Expression::TupleLiteral(TupleLiteral {
            elements: tuple
                .elements
                .iter()
                .map(|el| folder.fold_expression(el))
                .collect(),
            info: folder.map_info(&tuple.info),
            position: tuple.position.clone(),
        }),
        Expression::Asm(asm) => Expression::Asm(Asm {
            instructions: asm.instructions.clone(),
            info: folder.map_info(&asm.info),
            position: asm.position.clone(),
        }),
        Expression::Error(error) => Expression::Error(ExprError {
            error: error.error,
            info: folder.map_info(&error.info),
            position: error.position.clone(),
        }),
    }
}

pub fn super_fold_type_name<F: Folder>(
    folder: &mut F,
    type_name: &TypeName<F::From>,
) -> TypeName<F::To> {
    match type_name {
        TypeName::Ident(ident) => TypeName::Ident(TypeIdent {
            name: ident.name.clone(),
            generic_args: ident
                .generic_args
                .iter()
                .map(|arg| folder.fold_type_name(arg))
                .collect(),
            res: folder.map_res(&ident.res),
            position: ident.position.clone(),
        }),
        TypeName::Tuple(elements, position) => TypeName::Tuple(
            elements
                .iter()
                .map(|el| folder.fold_type_name(el))
                .collect(),
            position.clone(),
        ),
        TypeName::RawPtr(inner, position) => {
            TypeName::RawPtr(Box::new(folder.fold_type_name(inner)), position.clone())
        }
        TypeName::Never(position) => TypeName::Never(position.clone()),
        TypeName::Error(error, position) => TypeName::Error(*error, position.clone()),
    }
}
