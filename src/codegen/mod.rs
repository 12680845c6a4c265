//! WebAssembly text-format backend. Consumes the final phase of the root
//! package (plus its finalized dependencies) and writes one WAT module:
//! host imports, a linear memory with length-prefixed string data, the
//! prototype runtime, one wasm function per Weft function, and a start
//! function running global initializers.
//!
//! Symbol names are the definition paths joined with underscores, so
//! items of different packages and modules cannot collide.

mod layout;
mod runtime;

pub use layout::{layout_of, Layout};

use std::collections::HashMap;

use log::info;

use crate::{
    ast::{
        BinaryOperator, Builtin, Expression, Final, Function, Global, Import, Item, ItemId,
        OperatorClass, Package, PkgId, PrefixOperator, Resolution,
    },
    context::GlobalCx,
    typechecker::Ty,
};

const DATA_BASE: u32 = 16;
const HEAP_BASE: u32 = 65536;

/// Emit the WAT module for a compiled program.
pub fn generate(cx: &GlobalCx, root: &Package<Final>) -> String {
    info!("generating code for package '{}'", root.name);
    let mut gen = Codegen {
        cx,
        root,
        string_offsets: HashMap::new(),
        data: vec![],
        data_end: DATA_BASE,
        imports: vec!["(import \"env\" \"print\" (func $__print (param i32)))".to_string()],
        global_decls: vec![],
        init_funcs: vec![],
        init_calls: vec![],
        funcs: vec![],
        main: None,
    };

    let packages = cx
        .packages
        .iter()
        .chain(std::iter::once(root))
        .collect::<Vec<_>>();
    for pkg in &packages {
        for item in pkg.root_items() {
            gen.item(pkg, item);
        }
    }

    gen.assemble()
}

struct Codegen<'a> {
    cx: &'a GlobalCx,
    root: &'a Package<Final>,
    string_offsets: HashMap<String, u32>,
    /// `(offset, length-prefixed bytes)` per interned string.
    data: Vec<(u32, Vec<u8>)>,
    data_end: u32,
    imports: Vec<String>,
    global_decls: Vec<String>,
    init_funcs: Vec<String>,
    init_calls: Vec<String>,
    funcs: Vec<String>,
    main: Option<String>,
}

fn mangle(def_path: &[String]) -> String {
    format!("${}", def_path.join("_"))
}

/// Stack representation of a type; `None` for valueless types.
fn wat_ty(ty: &Ty) -> Option<&'static str> {
    match ty {
        Ty::Int => Some("i64"),
        Ty::Unit | Ty::Never | Ty::Error => None,
        _ => Some("i32"),
    }
}

impl<'a> Codegen<'a> {
    fn package(&self, id: PkgId) -> Option<&'a Package<Final>> {
        if id == self.root.id {
            Some(self.root)
        } else {
            self.cx.package(id)
        }
    }

    fn find_item(&self, id: ItemId) -> Option<&'a Item<Final>> {
        self.package(id.pkg)?.item(id)
    }

    fn item_ty(&self, id: ItemId) -> Option<Ty> {
        self.package(id.pkg)?.typeck.item_tys.get(&id).cloned()
    }

    fn struct_field_tys(&self, id: ItemId) -> Vec<Ty> {
        self.package(id.pkg)
            .and_then(|pkg| pkg.typeck.struct_fields.get(&id))
            .map(|fields| fields.iter().map(|(_, ty)| ty.clone()).collect())
            .unwrap_or_default()
    }

    /// Follow `use` items to the resolution they re-export.
    fn resolve_item_res(&self, res: &Resolution) -> Resolution {
        let mut current = res.clone();
        let mut guard = 0;
        while let Resolution::Item { id } = &current {
            match self.find_item(*id) {
                Some(Item::Use(use_item)) if guard < 64 => {
                    current = use_item.res.clone();
                    guard += 1;
                }
                _ => break,
            }
        }
        current
    }

    fn intern_string(&mut self, value: &str) -> u32 {
        if let Some(offset) = self.string_offsets.get(value) {
            return *offset;
        }
        let offset = self.data_end;
        let mut bytes = (value.len() as u32).to_le_bytes().to_vec();
        bytes.extend_from_slice(value.as_bytes());
        self.data_end += bytes.len() as u32;
        self.data_end = layout::align_to(self.data_end, 4);
        self.data.push((offset, bytes));
        self.string_offsets.insert(value.to_string(), offset);
        offset
    }

    fn item(&mut self, pkg: &'a Package<Final>, item: &'a Item<Final>) {
        match item {
            Item::Function(function) => self.function(pkg, function),
            Item::Import(import) => self.import(import),
            Item::Global(global) => self.global(pkg, global),
            Item::Mod(module) => {
                for child in &module.items {
                    self.item(pkg, child);
                }
            }
            Item::TypeDef(_) | Item::ExternPkg(_) | Item::Use(_) | Item::Error(_) => {}
        }
    }

    fn import(&mut self, import: &Import<Final>) {
        let Some(Ty::Fn { params, return_ty }) = self.item_ty(import.id) else {
            return;
        };
        let name = mangle(&import.def_path);
        let params = params
            .iter()
            .filter_map(wat_ty)
            .map(|ty| format!(" (param {ty})"))
            .collect::<String>();
        let result = wat_ty(&return_ty)
            .map(|ty| format!(" (result {ty})"))
            .unwrap_or_default();
        self.imports.push(format!(
            "(import \"{}\" \"{}\" (func {name}{params}{result}))",
            import.module, import.function
        ));
    }

    fn global(&mut self, pkg: &'a Package<Final>, global: &Global<Final>) {
        let name = mangle(&global.def_path);
        let ty = self.item_ty(global.id).unwrap_or(Ty::Error);
        let wat = wat_ty(&ty);

        if let Some(wat) = wat {
            let zero = format!("({wat}.const 0)");
            self.global_decls
                .push(format!("(global {name} (mut {wat}) {zero})"));
        }

        let locals = pkg
            .typeck
            .fn_locals
            .get(&global.id)
            .cloned()
            .unwrap_or_default();
        let mut emitter = FnEmitter::new(self, locals);
        emitter.expr(&global.value);
        let mut lines = emitter.finish();
        if wat.is_some() {
            lines.push(format!("global.set {name}"));
        }

        let init_name = format!("$__init_{}", &name[1..]);
        let local_decls = local_decl_text(pkg, global.id);
        self.init_funcs.push(format!(
            "(func {init_name}\n{local_decls}{body}\n)",
            body = indent_lines(&lines, 1)
        ));
        self.init_calls.push(format!("call {init_name}"));
    }

    fn function(&mut self, pkg: &'a Package<Final>, function: &Function<Final>) {
        let name = mangle(&function.def_path);
        let Some(Ty::Fn { params, return_ty }) = self.item_ty(function.id) else {
            return;
        };

        let locals = pkg
            .typeck
            .fn_locals
            .get(&function.id)
            .cloned()
            .unwrap_or_default();
        let mut emitter = FnEmitter::new(self, locals.clone());
        emitter.expr(&function.body);
        let lines = emitter.finish();

        let param_text = params
            .iter()
            .filter_map(wat_ty)
            .map(|ty| format!(" (param {ty})"))
            .collect::<String>();
        let result_text = wat_ty(&return_ty)
            .map(|ty| format!(" (result {ty})"))
            .unwrap_or_default();

        let mut local_decls = locals
            .iter()
            .skip(params.len())
            .filter_map(wat_ty)
            .map(|ty| format!("  (local {ty})\n"))
            .collect::<String>();
        local_decls.push_str("  (local $__scratch i32)\n");

        self.funcs.push(format!(
            "(func {name}{param_text}{result_text}\n{local_decls}{body}\n)",
            body = indent_lines(&lines, 1)
        ));

        if pkg.id == self.root.id && function.def_path.len() == 2 && function.name == "main" {
            self.main = Some(name);
        }
    }

    fn assemble(self) -> String {
        let mut out = String::from("(module\n");

        for import in &self.imports {
            out.push_str(&indent_text(import, 1));
        }

        let pages = (self.data_end / 65536 + 2).max(2);
        out.push_str(&format!("  (memory (export \"memory\") {pages})\n"));
        out.push_str(&format!(
            "  (global $__hp (mut i32) (i32.const {HEAP_BASE}))\n"
        ));

        for decl in &self.global_decls {
            out.push_str(&indent_text(decl, 1));
        }

        out.push_str(&indent_text(runtime::ALLOC, 1));
        out.push_str(&indent_text(runtime::STR_CMP, 1));

        for func in &self.funcs {
            out.push_str(&indent_text(func, 1));
        }

        let init_calls = self
            .init_calls
            .iter()
            .map(|call| format!("  {call}\n"))
            .collect::<String>();
        for init in &self.init_funcs {
            out.push_str(&indent_text(init, 1));
        }
        out.push_str(&format!("  (func $__init\n{init_calls}  )\n"));
        out.push_str("  (start $__init)\n");

        if let Some(main) = &self.main {
            out.push_str(&format!("  (export \"main\" (func {main}))\n"));
        }

        for (offset, bytes) in &self.data {
            out.push_str(&format!(
                "  (data (i32.const {offset}) \"{}\")\n",
                escape_bytes(bytes)
            ));
        }

        out.push_str(")\n");
        out
    }
}

fn local_decl_text(pkg: &Package<Final>, id: ItemId) -> String {
    let mut text = pkg
        .typeck
        .fn_locals
        .get(&id)
        .map(|locals| {
            locals
                .iter()
                .filter_map(wat_ty)
                .map(|ty| format!("  (local {ty})\n"))
                .collect::<String>()
        })
        .unwrap_or_default();
    text.push_str("  (local $__scratch i32)\n");
    text
}

fn indent_lines(lines: &[String], level: usize) -> String {
    lines
        .iter()
        .map(|line| format!("{}{line}", "  ".repeat(level)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn indent_text(text: &str, level: usize) -> String {
    text.lines()
        .map(|line| format!("{}{line}\n", "  ".repeat(level)))
        .collect()
}

fn escape_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|byte| match *byte {
            b'"' => "\\\"".to_string(),
            b'\\' => "\\\\".to_string(),
            0x20..=0x7e => (*byte as char).to_string(),
            other => format!("\\{other:02x}"),
        })
        .collect()
}

/// Emits the instruction sequence of one function body.
struct FnEmitter<'g, 'a> {
    gen: &'g mut Codegen<'a>,
    /// Dense local index → wasm local index; `None` for valueless locals.
    slots: Vec<Option<u32>>,
    lines: Vec<String>,
}

impl<'g, 'a> FnEmitter<'g, 'a> {
    fn new(gen: &'g mut Codegen<'a>, locals: Vec<Ty>) -> FnEmitter<'g, 'a> {
        let mut next = 0u32;
        let slots = locals
            .iter()
            .map(|ty| {
                wat_ty(ty).map(|_| {
                    let slot = next;
                    next += 1;
                    slot
                })
            })
            .collect();
        FnEmitter {
            gen,
            slots,
            lines: vec![],
        }
    }

    fn finish(self) -> Vec<String> {
        self.lines
    }

    fn push(&mut self, line: impl ToString) {
        self.lines.push(line.to_string());
    }

    fn expr(&mut self, expression: &Expression<Final>) {
        self.expr_inner(expression);
        // a diverging expression leaves the stack polymorphic for
        // whatever the parent expects
        if *expression.info() == Ty::Never && !matches!(expression, Expression::Break(_)) {
            self.push("unreachable");
        }
    }

    fn expr_inner(&mut self, expression: &Expression<Final>) {
        match expression {
            Expression::Empty(_) => {}
            Expression::Num(num) => match num.info {
                Ty::Int => self.push(format!("i64.const {}", num.value)),
                _ => self.push(format!("i32.const {}", num.value)),
            },
            Expression::AstString(string) => {
                let offset = self.gen.intern_string(&string.value);
                self.push(format!("i32.const {offset}"));
            }
            Expression::Id(id) => self.value_of_res(&id.res, &id.info),
            Expression::Path(path) => self.value_of_res(&path.res, &path.info),
            Expression::Let(let_exp) => {
                self.expr(&let_exp.value);
                if let Some(slot) = self.slots.get(let_exp.local.index).copied().flatten() {
                    self.push(format!("local.set {slot}"));
                } else if wat_ty(let_exp.value.info()).is_some() {
                    self.push("drop");
                }
            }
            Expression::Assign(assign) => self.assign(&assign.lhs, &assign.rhs),
            Expression::Block(block) => {
                let count = block.expressions.len();
                for (index, sub) in block.expressions.iter().enumerate() {
                    self.expr(sub);
                    if index + 1 < count && wat_ty(sub.info()).is_some() {
                        self.push("drop");
                    }
                }
            }
            Expression::Binary(binary) => {
                let operand_ty = binary.lhs.get_info();
                self.expr(&binary.lhs);
                self.expr(&binary.rhs);
                self.binary_op(binary.operator, &operand_ty);
            }
            Expression::Prefix(prefix) => {
                self.expr(&prefix.inner);
                match prefix.operator {
                    PrefixOperator::Not => match prefix.inner.info() {
                        Ty::Bool => self.push("i32.eqz"),
                        Ty::Int => {
                            self.push("i64.const -1");
                            self.push("i64.xor");
                        }
                        _ => {
                            self.push("i32.const -1");
                            self.push("i32.xor");
                        }
                    },
                    PrefixOperator::Minus => self.push("unreachable"),
                }
            }
            Expression::Call(call) => self.call(call),
            Expression::FieldAccess(access) => {
                self.expr(&access.target);
                let field_tys = self.field_tys_of(access.target.info());
                let layout = layout_of(&field_tys);
                let offset = layout.field_offsets[access.field_index];
                match wat_ty(&access.info) {
                    Some("i64") => self.push(format!("i64.load offset={offset}")),
                    Some(_) => self.push(format!("i32.load offset={offset}")),
                    None => self.push("drop"),
                }
            }
            Expression::If(if_exp) => {
                self.expr(&if_exp.condition);
                match wat_ty(&if_exp.info) {
                    Some(ty) => self.push(format!("if (result {ty})")),
                    None => self.push("if"),
                }
                self.expr(&if_exp.then_branch);
                if let Some(else_branch) = &if_exp.else_branch {
                    self.push("else");
                    self.expr(else_branch);
                }
                self.push("end");
            }
            Expression::Loop(loop_exp) => {
                let id = loop_exp.loop_id.0;
                self.push(format!("block $__break{id}"));
                self.push(format!("loop $__loop{id}"));
                self.expr(&loop_exp.body);
                if wat_ty(loop_exp.body.info()).is_some() {
                    self.push("drop");
                }
                self.push(format!("br $__loop{id}"));
                self.push("end");
                self.push("end");
            }
            Expression::Break(break_exp) => {
                self.push(format!("br $__break{}", break_exp.target.0));
            }
            Expression::StructLiteral(literal) => {
                let field_tys = self.field_tys_of(&literal.info);
                let layout = layout_of(&field_tys);
                self.push(format!("i32.const {}", layout.size));
                self.push("call $__alloc");
                self.push("local.set $__scratch");
                // refcount header
                self.push("local.get $__scratch");
                self.push("i32.const 1");
                self.push("i32.store");
                for field in &literal.fields {
                    let field_ty = &field_tys[field.field_index];
                    if wat_ty(field_ty).is_none() {
                        self.expr(&field.value);
                        continue;
                    }
                    self.push("local.get $__scratch");
                    self.expr(&field.value);
                    let offset = layout.field_offsets[field.field_index];
                    match wat_ty(field_ty) {
                        Some("i64") => self.push(format!("i64.store offset={offset}")),
                        _ => self.push(format!("i32.store offset={offset}")),
                    }
                }
                self.push("local.get $__scratch");
            }
            Expression::TupleLiteral(tuple) => {
                let field_tys = self.field_tys_of(&tuple.info);
                let layout = layout_of(&field_tys);
                self.push(format!("i32.const {}", layout.size));
                self.push("call $__alloc");
                self.push("local.set $__scratch");
                self.push("local.get $__scratch");
                self.push("i32.const 1");
                self.push("i32.store");
                for (index, element) in tuple.elements.iter().enumerate() {
                    let element_ty = &field_tys[index];
                    if wat_ty(element_ty).is_none() {
                        self.expr(element);
                        continue;
                    }
                    self.push("local.get $__scratch");
                    self.expr(element);
                    let offset = layout.field_offsets[index];
                    match wat_ty(element_ty) {
                        Some("i64") => self.push(format!("i64.store offset={offset}")),
                        _ => self.push(format!("i32.store offset={offset}")),
                    }
                }
                self.push("local.get $__scratch");
            }
            Expression::Asm(asm) => {
                for instruction in &asm.instructions {
                    self.push(instruction);
                }
            }
            Expression::Error(_) => self.push("unreachable"),
        }
    }

    /// Field types of the value a field access or literal goes through:
    /// a struct (possibly behind a raw pointer) or a tuple.
    fn field_tys_of(&self, ty: &Ty) -> Vec<Ty> {
        match ty {
            Ty::Struct { id, .. } => self.gen.struct_field_tys(*id),
            Ty::Tuple(elements) => elements.clone(),
            Ty::RawPtr(inner) => self.field_tys_of(inner),
            _ => vec![],
        }
    }

    fn value_of_res(&mut self, res: &Resolution, info: &Ty) {
        match res {
            Resolution::Local { index } => {
                if let Some(slot) = self.slots.get(*index).copied().flatten() {
                    self.push(format!("local.get {slot}"));
                }
            }
            Resolution::Item { .. } => match self.gen.resolve_item_res(res) {
                Resolution::Item { id } => match self.gen.find_item(id) {
                    Some(Item::Global(global)) => {
                        if wat_ty(info).is_some() {
                            let name = mangle(&global.def_path);
                            self.push(format!("global.get {name}"));
                        }
                    }
                    _ => {
                        self.push("unreachable ;; function values are not supported");
                    }
                },
                Resolution::Builtin(builtin) => self.builtin_value(builtin),
                _ => self.push("unreachable"),
            },
            Resolution::Builtin(builtin) => self.builtin_value(*builtin),
            Resolution::TyParam { .. } | Resolution::Error(_) => self.push("unreachable"),
        }
    }

    fn builtin_value(&mut self, builtin: Builtin) {
        match builtin {
            Builtin::True => self.push("i32.const 1"),
            Builtin::False => self.push("i32.const 0"),
            Builtin::Null => self.push("i32.const 0"),
            _ => self.push("unreachable ;; builtin is not a first-class value"),
        }
    }

    fn assign(&mut self, lhs: &Expression<Final>, rhs: &Expression<Final>) {
        match lhs {
            Expression::Id(id) => self.assign_res(&id.res, rhs),
            Expression::Path(path) => self.assign_res(&path.res, rhs),
            Expression::FieldAccess(access) => {
                let field_tys = self.field_tys_of(access.target.info());
                let layout = layout_of(&field_tys);
                let offset = layout.field_offsets[access.field_index];
                let field_ty = &field_tys[access.field_index];

                if wat_ty(field_ty).is_none() {
                    self.expr(&access.target);
                    if wat_ty(access.target.info()).is_some() {
                        self.push("drop");
                    }
                    self.expr(rhs);
                    return;
                }

                self.expr(&access.target);
                self.expr(rhs);
                match wat_ty(field_ty) {
                    Some("i64") => self.push(format!("i64.store offset={offset}")),
                    _ => self.push(format!("i32.store offset={offset}")),
                }
            }
            _ => self.push("unreachable"),
        }
    }

    fn assign_res(&mut self, res: &Resolution, rhs: &Expression<Final>) {
        match res {
            Resolution::Local { index } => {
                self.expr(rhs);
                if let Some(slot) = self.slots.get(*index).copied().flatten() {
                    self.push(format!("local.set {slot}"));
                } else if wat_ty(rhs.info()).is_some() {
                    self.push("drop");
                }
            }
            Resolution::Item { .. } => {
                let resolved = self.gen.resolve_item_res(res);
                match resolved {
                    Resolution::Item { id } => match self.gen.find_item(id) {
                        Some(Item::Global(global)) => {
                            let name = mangle(&global.def_path);
                            self.expr(rhs);
                            if wat_ty(rhs.info()).is_some() {
                                self.push(format!("global.set {name}"));
                            }
                        }
                        _ => self.push("unreachable"),
                    },
                    _ => self.push("unreachable"),
                }
            }
            _ => self.push("unreachable"),
        }
    }

    fn call(&mut self, call: &crate::ast::Call<Final>) {
        let callee_res = match &call.callee {
            Expression::Id(id) => Some(&id.res),
            Expression::Path(path) => Some(&path.res),
            _ => None,
        };

        let resolved = callee_res.map(|res| self.gen.resolve_item_res(res));
        match resolved {
            Some(Resolution::Builtin(builtin)) => self.builtin_call(builtin, call),
            Some(Resolution::Item { id }) => match self.gen.find_item(id) {
                Some(Item::Function(function)) => {
                    let name = mangle(&function.def_path);
                    for argument in &call.arguments {
                        self.expr(argument);
                    }
                    self.push(format!("call {name}"));
                }
                Some(Item::Import(import)) => {
                    let name = mangle(&import.def_path);
                    for argument in &call.arguments {
                        self.expr(argument);
                    }
                    self.push(format!("call {name}"));
                }
                _ => self.push("unreachable ;; indirect calls are not supported"),
            },
            _ => self.push("unreachable ;; indirect calls are not supported"),
        }
    }

    fn builtin_call(&mut self, builtin: Builtin, call: &crate::ast::Call<Final>) {
        use Builtin::*;

        if builtin == Trap {
            self.push("unreachable");
            return;
        }
        if builtin == Locals {
            let listing = self
                .slots
                .iter()
                .enumerate()
                .map(|(index, slot)| match slot {
                    Some(wasm) => format!("{index}->{wasm}"),
                    None => format!("{index}->()"),
                })
                .collect::<Vec<_>>()
                .join(" ");
            self.push(format!(";; locals: {listing}"));
            return;
        }
        if builtin == Transmute {
            let from = call
                .arguments
                .first()
                .map(|arg| arg.get_info())
                .unwrap_or(Ty::Unit);
            for argument in &call.arguments {
                self.expr(argument);
            }
            match (wat_ty(&from), wat_ty(&call.info)) {
                (Some("i64"), Some("i32")) => self.push("i32.wrap_i64"),
                (Some("i32"), Some("i64")) => self.push("i64.extend_i32_u"),
                (None, Some(ty)) => self.push(format!("{ty}.const 0")),
                (Some(_), None) => self.push("drop"),
                _ => {}
            }
            return;
        }

        for argument in &call.arguments {
            self.expr(argument);
        }
        match builtin {
            Print => self.push("call $__print"),
            I32Store => self.push("i32.store"),
            I64Store => self.push("i64.store"),
            I32Load => self.push("i32.load"),
            I64Load => self.push("i64.load"),
            MemorySize => self.push("memory.size"),
            MemoryGrow => self.push("memory.grow"),
            I32ExtendToI64U => self.push("i64.extend_i32_u"),
            _ => self.push("unreachable ;; builtin cannot be called"),
        }
    }

    fn binary_op(&mut self, operator: BinaryOperator, operand_ty: &Ty) {
        use BinaryOperator::*;

        if *operand_ty == Ty::String {
            self.push("call $__str_cmp");
            match operator {
                Equals => self.push("i32.eqz"),
                NotEquals => {
                    self.push("i32.const 0");
                    self.push("i32.ne");
                }
                LessThan => {
                    self.push("i32.const 0");
                    self.push("i32.lt_s");
                }
                GreaterThan => {
                    self.push("i32.const 0");
                    self.push("i32.gt_s");
                }
                LessOrEqual => {
                    self.push("i32.const 0");
                    self.push("i32.le_s");
                }
                GreaterOrEqual => {
                    self.push("i32.const 0");
                    self.push("i32.ge_s");
                }
                _ => self.push("unreachable"),
            }
            return;
        }

        let prefix = match operand_ty {
            Ty::Int => "i64",
            _ => "i32",
        };
        let op = match (operator.class(), operator) {
            (_, Add) => "add",
            (_, Sub) => "sub",
            (_, Mul) => "mul",
            (_, Div) => "div_u",
            (_, Mod) => "rem_u",
            (_, Equals) => "eq",
            (_, NotEquals) => "ne",
            (_, LessThan) => "lt_u",
            (_, GreaterThan) => "gt_u",
            (_, LessOrEqual) => "le_u",
            (_, GreaterOrEqual) => "ge_u",
            (OperatorClass::Logical, And) => "and",
            (OperatorClass::Logical, Or) => "or",
            _ => "nop",
        };
        // bool comparisons use plain integer compares
        let op = match (operand_ty, operator) {
            (Ty::Bool, Equals) => "eq",
            (Ty::Bool, NotEquals) => "ne",
            _ => op,
        };
        self.push(format!("{prefix}.{op}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::check_source;

    fn generate_source(input: &str) -> String {
        let (pkg, cx) = check_source(input);
        assert!(!cx.sink.has_errors(), "{:?}", cx.sink.errors());
        generate(&cx, &pkg)
    }

    #[test]
    fn test_simple_function_emits() {
        let wat = generate_source("function main(): Int = (let a: Int = 1; a);");

        assert!(wat.contains("(func $main_main (result i64)"));
        assert!(wat.contains("i64.const 1"));
        assert!(wat.contains("local.set 0"));
        assert!(wat.contains("local.get 0"));
        assert!(wat.contains("(export \"main\" (func $main_main))"));
    }

    #[test]
    fn test_string_goes_to_data_segment() {
        let wat = generate_source("function main() = print(\"hi\");");

        assert!(wat.contains("call $__print"));
        // 4-byte little-endian length prefix, then the bytes
        assert!(wat.contains("(data (i32.const 16) \"\\02\\00\\00\\00hi\")"));
    }

    #[test]
    fn test_loop_break_labels_match() {
        let wat = generate_source("function main() = loop ( break );");

        assert!(wat.contains("block $__break0"));
        assert!(wat.contains("loop $__loop0"));
        assert!(wat.contains("br $__break0"));
        assert!(wat.contains("br $__loop0"));
    }

    #[test]
    fn test_struct_literal_allocates_and_stores() {
        let wat = generate_source(
            "type Pair = struct { x: I32, y: Int };\n\
             function main(): Int = (let p = Pair { x: 1_I32, y: 2 }; p.y);",
        );

        // layout: header at 0, i32 at 4, int at 8, total 16
        assert!(wat.contains("i32.const 16\ncall $__alloc") || wat.contains("call $__alloc"));
        assert!(wat.contains("i32.store offset=4"));
        assert!(wat.contains("i64.store offset=8"));
        assert!(wat.contains("i64.load offset=8"));
    }

    #[test]
    fn test_globals_init_through_start() {
        let wat = generate_source("global mut counter: Int = 7;\nfunction main() = ();");

        assert!(wat.contains("(global $main_counter (mut i64) (i64.const 0))"));
        assert!(wat.contains("(func $__init_main_counter"));
        assert!(wat.contains("global.set $main_counter"));
        assert!(wat.contains("(start $__init)"));
    }

    #[test]
    fn test_trap_is_unreachable() {
        let wat = generate_source("function main() = trap();");
        assert!(wat.contains("unreachable"));
    }

    #[test]
    fn test_imports_are_declared() {
        let wat = generate_source(
            "import (\"host\" \"clock\") function clock(): Int;\n\
             function main(): Int = clock();",
        );

        assert!(wat.contains("(import \"host\" \"clock\" (func $main_clock (result i64)))"));
        assert!(wat.contains("call $main_clock"));
    }
}
