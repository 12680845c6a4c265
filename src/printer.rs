//! Debug pretty-printer for the `--debug ast|resolved|typecked` dumps.
//! Works over any phase; elaboration slots print with their `Debug`
//! representation, so the same printer shows progressively more as the
//! pipeline advances.

use std::fmt::Debug;

use crate::ast::{Expression, Item, Package, Phase, TypeDefKind};

pub fn print_package<P: Phase>(pkg: &Package<P>) -> String {
    let mut printer = Printer::default();
    printer.line(format!("package {} ({:?})", pkg.name, pkg.id));
    printer.indent += 1;
    for item in pkg.root_items() {
        printer.item(item);
    }
    printer.out
}

#[derive(Default)]
struct Printer {
    out: String,
    indent: usize,
}

impl Printer {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn nested(&mut self, header: impl AsRef<str>, body: impl FnOnce(&mut Printer)) {
        self.line(header);
        self.indent += 1;
        body(self);
        self.indent -= 1;
    }

    fn slot(value: &impl Debug) -> String {
        format!("{value:?}")
    }

    fn item<P: Phase>(&mut self, item: &Item<P>) {
        match item {
            Item::Function(f) => {
                let params = f
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", p.name, p.type_name))
                    .collect::<Vec<_>>()
                    .join(", ");
                let ret = f
                    .return_type
                    .as_ref()
                    .map(|t| format!(": {t}"))
                    .unwrap_or_default();
                self.nested(
                    format!(
                        "function {}({params}){ret} [{}] path={}",
                        f.name,
                        Self::slot(&f.id),
                        Self::slot(&f.def_path)
                    ),
                    |p| p.expression(&f.body),
                );
            }
            Item::TypeDef(t) => match &t.def {
                TypeDefKind::Struct(fields) => {
                    let fields = fields
                        .iter()
                        .map(|f| format!("{}: {}", f.name, f.type_name))
                        .collect::<Vec<_>>()
                        .join(", ");
                    self.line(format!(
                        "type {} = struct {{ {fields} }} [{}]",
                        t.name,
                        Self::slot(&t.id)
                    ));
                }
                TypeDefKind::Alias(target) => {
                    self.line(format!("type {} = {target} [{}]", t.name, Self::slot(&t.id)));
                }
            },
            Item::Import(i) => {
                self.line(format!(
                    "import (\"{}\" \"{}\") {} [{}]",
                    i.module,
                    i.function,
                    i.name,
                    Self::slot(&i.id)
                ));
            }
            Item::Mod(m) => {
                self.nested(format!("mod {} [{}]", m.name, Self::slot(&m.id)), |p| {
                    for child in &m.items {
                        p.item(child);
                    }
                });
            }
            Item::ExternPkg(e) => {
                self.line(format!("extern mod {} [{}]", e.name, Self::slot(&e.id)));
            }
            Item::Global(g) => {
                let mutability = if g.mutable { "mut " } else { "" };
                self.nested(
                    format!(
                        "global {mutability}{}: {} [{}]",
                        g.name,
                        g.type_name,
                        Self::slot(&g.id)
                    ),
                    |p| p.expression(&g.value),
                );
            }
            Item::Use(u) => {
                self.line(format!(
                    "use {} -> {} [{}]",
                    u.segments.join("."),
                    Self::slot(&u.res),
                    Self::slot(&u.id)
                ));
            }
            Item::Error(e) => self.line(format!("<error item> [{}]", Self::slot(&e.id))),
        }
    }

    fn expression<P: Phase>(&mut self, expression: &Expression<P>) {
        let info = Self::slot(expression.info());
        match expression {
            Expression::Empty(_) => self.line(format!("empty :: {info}")),
            Expression::Let(l) => {
                let ascription = l
                    .type_name
                    .as_ref()
                    .map(|t| format!(": {t}"))
                    .unwrap_or_default();
                self.nested(
                    format!(
                        "let {}{ascription} local={} :: {info}",
                        l.name,
                        Self::slot(&l.local)
                    ),
                    |p| p.expression(&l.value),
                );
            }
            Expression::Assign(a) => self.nested(format!("assign :: {info}"), |p| {
                p.expression(&a.lhs);
                p.expression(&a.rhs);
            }),
            Expression::Block(b) => self.nested(format!("block :: {info}"), |p| {
                for sub in &b.expressions {
                    p.expression(sub);
                }
            }),
            Expression::Num(n) => {
                self.line(format!("num {} ({:?}) :: {info}", n.value, n.kind))
            }
            Expression::AstString(s) => self.line(format!("string {:?} :: {info}", s.value)),
            Expression::Id(id) => self.line(format!(
                "id {} -> {} :: {info}",
                id.name,
                Self::slot(&id.res)
            )),
            Expression::Path(path) => self.line(format!(
                "path {} -> {} :: {info}",
                path.segments.join("."),
                Self::slot(&path.res)
            )),
            Expression::Binary(b) => {
                self.nested(format!("binary '{}' :: {info}", b.operator), |p| {
                    p.expression(&b.lhs);
                    p.expression(&b.rhs);
                })
            }
            Expression::Prefix(pre) => {
                self.nested(format!("prefix '{}' :: {info}", pre.operator), |p| {
                    p.expression(&pre.inner);
                })
            }
            Expression::Call(c) => self.nested(format!("call :: {info}"), |p| {
                p.expression(&c.callee);
                for argument in &c.arguments {
                    p.expression(argument);
                }
            }),
            Expression::FieldAccess(f) => self.nested(
                format!(
                    "field .{} idx={} :: {info}",
                    f.field,
                    Self::slot(&f.field_index)
                ),
                |p| p.expression(&f.target),
            ),
            Expression::If(i) => self.nested(format!("if :: {info}"), |p| {
                p.expression(&i.condition);
                p.expression(&i.then_branch);
                if let Some(else_branch) = &i.else_branch {
                    p.expression(else_branch);
                }
            }),
            Expression::Loop(l) => self.nested(
                format!("loop {} :: {info}", Self::slot(&l.loop_id)),
                |p| p.expression(&l.body),
            ),
            Expression::Break(b) => {
                self.line(format!("break -> {} :: {info}", Self::slot(&b.target)))
            }
            Expression::StructLiteral(s) => {
                self.nested(format!("struct {} :: {info}", s.name.name), |p| {
                    for field in &s.fields {
                        p.nested(
                            format!("field {} idx={}", field.name, Self::slot(&field.field_index)),
                            |p| p.expression(&field.value),
                        );
                    }
                })
            }
            Expression::TupleLiteral(t) => self.nested(format!("tuple :: {info}"), |p| {
                for element in &t.elements {
                    p.expression(element);
                }
            }),
            Expression::Asm(a) => {
                self.line(format!("asm {:?} :: {info}", a.instructions));
            }
            Expression::Error(_) => self.line(format!("<error> :: {info}")),
        }
    }
}
