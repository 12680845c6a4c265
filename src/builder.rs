//! Builder stage: walks the parsed AST and assigns every item a stable
//! package-scoped identifier and every loop a stable identifier. No
//! semantic validation happens here beyond identifier uniqueness.

use std::collections::{HashMap, HashSet};

use crate::{
    ast::fold::{register_items, Folder},
    ast::{Built, Item, ItemId, LoopId, Module, Package, Parsed, PkgId},
    errors::{ErrorEmitted, Span},
};

pub struct Builder {
    pkg: PkgId,
    next_item: u32,
    next_loop: u32,
    seen: HashSet<ItemId>,
}

impl Builder {
    pub fn new(pkg: PkgId) -> Builder {
        Builder {
            pkg,
            // item 0 is reserved for the package root module
            next_item: 1,
            next_loop: 0,
            seen: HashSet::new(),
        }
    }

    fn alloc_item_id(&mut self) -> ItemId {
        let id = ItemId {
            pkg: self.pkg,
            item: self.next_item,
        };
        self.next_item += 1;
        assert!(self.seen.insert(id), "item id {id} assigned twice");
        id
    }
}

impl Folder for Builder {
    type From = Parsed;
    type To = Built;

    fn map_item_id(&mut self, _id: &()) -> ItemId {
        self.alloc_item_id()
    }

    fn map_loop_id(&mut self, _id: &()) -> LoopId {
        let id = LoopId(self.next_loop);
        self.next_loop += 1;
        id
    }

    fn map_res(&mut self, _res: &()) {}

    fn map_def_path(&mut self, _def_path: &()) {}

    fn map_info(&mut self, _info: &()) {}

    fn map_field_idx(&mut self, _idx: &()) {}

    fn map_break_target(&mut self, _target: &()) {}

    fn map_local_info(&mut self, _local: &()) {}

    fn map_typeck(&mut self, _typeck: &()) {}
}

/// Wrap the parsed root items of a source file into a package, assigning
/// identifiers along the way.
pub fn build_package(
    id: PkgId,
    name: impl ToString,
    file: std::path::PathBuf,
    items: &[Item<Parsed>],
    fatal_error: Option<ErrorEmitted>,
    position: Span,
) -> Package<Built> {
    let name = name.to_string();
    let mut builder = Builder::new(id);

    let items = items
        .iter()
        .map(|item| builder.fold_item(item))
        .collect::<Vec<_>>();

    let root = Item::Mod(Module {
        id: ItemId::root(id),
        name: name.clone(),
        items,
        file_module: false,
        def_path: (),
        position,
    });

    let mut items_by_id = HashMap::new();
    register_items(&mut items_by_id, &root);

    log::debug!(
        "built package '{name}' with {count} items",
        count = items_by_id.len()
    );

    Package {
        id,
        name,
        file,
        root,
        items_by_id,
        fatal_error,
        typeck: (),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Break, Empty, Expression, Function, Loop};

    fn function(name: &str, body: Expression<Parsed>) -> Item<Parsed> {
        Item::Function(Function {
            id: (),
            name: name.to_string(),
            params: vec![],
            return_type: None,
            body,
            def_path: (),
            position: Span::default(),
        })
    }

    fn empty() -> Expression<Parsed> {
        Expression::Empty(Empty {
            info: (),
            position: Span::default(),
        })
    }

    #[test]
    fn test_ids_are_sequential_and_unique() {
        let items = vec![
            function("a", empty()),
            Item::Mod(Module {
                id: (),
                name: "m".to_string(),
                items: vec![function("b", empty())],
                file_module: false,
                def_path: (),
                position: Span::default(),
            }),
            function("c", empty()),
        ];

        let pkg = build_package(
            PkgId(0),
            "main",
            "main.weft".into(),
            &items,
            None,
            Span::default(),
        );

        // root module, two top level functions, the module, one nested fn
        assert_eq!(pkg.items_by_id.len(), 5);
        assert!(pkg.item(ItemId::root(pkg.id)).is_some());

        let mut ids = pkg.items_by_id.keys().map(|id| id.item).collect::<Vec<_>>();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_loop_ids_start_at_zero() {
        let body = Expression::Block(Block {
            expressions: vec![
                Expression::Loop(Box::new(Loop {
                    body: empty(),
                    loop_id: (),
                    info: (),
                    position: Span::default(),
                })),
                Expression::Loop(Box::new(Loop {
                    body: Expression::Break(Break {
                        target: (),
                        info: (),
                        position: Span::default(),
                    }),
                    loop_id: (),
                    info: (),
                    position: Span::default(),
                })),
            ],
            info: (),
            position: Span::default(),
        });

        let pkg = build_package(
            PkgId(0),
            "main",
            "main.weft".into(),
            &[function("f", body)],
            None,
            Span::default(),
        );

        let Some(Item::Function(f)) = pkg.root_items().first() else {
            panic!("expected function");
        };
        let Expression::Block(block) = &f.body else {
            panic!("expected block body");
        };
        let loop_ids = block
            .expressions
            .iter()
            .map(|e| match e {
                Expression::Loop(l) => l.loop_id,
                _ => panic!("expected loop"),
            })
            .collect::<Vec<_>>();

        assert_eq!(loop_ids, vec![LoopId(0), LoopId(1)]);
    }
}
