//! Expression checking: infers a type for every expression of a function
//! body (or global initializer), threading the locals stack and the loop
//! state alongside the inference context.

use std::collections::HashSet;

use crate::{
    ast::{
        Asm, Assign, AstString, BinaryExpression, BinaryOperator, Block, Break, Builtin, Call,
        Empty, ExprError, Expression, FieldAccess, FieldName, Id, If, Let, Loop, LoopId, Num,
        OperatorClass, PathExpr, Prefix, PrefixOperator, Resolution, Resolved, StructLiteral,
        StructLiteralField, TupleLiteral, Typecked,
    },
    errors::{ErrorSink, Span},
    lexer::IntKind,
};

use super::{convert_type_name, infer::InferCtx, items::ItemTypes, LocalInfo, Ty};

struct LoopState {
    id: LoopId,
    has_break: bool,
}

pub struct BodyChecker<'c, 'a> {
    pub(super) items: &'c mut ItemTypes<'a>,
    pub(super) infer: InferCtx,
    sink: ErrorSink,
    /// Parallel to the resolver's name stack: `(type, dense index)` per
    /// live local, innermost last.
    locals: Vec<(Ty, usize)>,
    /// All locals of the function in allocation order, parameters first.
    pub(super) fn_locals: Vec<Ty>,
    loops: Vec<LoopState>,
}

impl<'c, 'a> BodyChecker<'c, 'a> {
    pub fn new(items: &'c mut ItemTypes<'a>) -> BodyChecker<'c, 'a> {
        let sink = items.sink();
        BodyChecker {
            items,
            infer: InferCtx::new(sink.clone()),
            sink,
            locals: vec![],
            fn_locals: vec![],
            loops: vec![],
        }
    }

    /// Introduce a function parameter as a local.
    pub fn push_param(&mut self, ty: Ty) {
        let index = self.fn_locals.len();
        self.fn_locals.push(ty.clone());
        self.locals.push((ty, index));
    }

    fn error_expr(&mut self, message: impl ToString, span: Span) -> Expression<Typecked> {
        let error = self.sink.emit(message, span.clone());
        Expression::Error(ExprError {
            error,
            info: Ty::Error,
            position: span,
        })
    }

    /// The type of a value-position resolution.
    fn type_of_value(&mut self, res: &Resolution, span: &Span) -> Ty {
        match res {
            Resolution::Local { index } => {
                let (ty, _) = self.locals[self.locals.len() - 1 - index].clone();
                ty
            }
            Resolution::Item { .. } => {
                let forwarded = self.items.resolve_use(res, span);
                match forwarded {
                    Resolution::Item { id } => self.items.type_of_item(id, span),
                    other => self.type_of_value(&other, span),
                }
            }
            Resolution::Builtin(builtin) => self.builtin_value_ty(*builtin, span),
            Resolution::TyParam { .. } => {
                self.sink
                    .emit("type parameter cannot be used as value", span.clone());
                Ty::Error
            }
            Resolution::Error(_) => Ty::Error,
        }
    }

    fn builtin_value_ty(&mut self, builtin: Builtin, span: &Span) -> Ty {
        use Builtin::*;
        match builtin {
            Print => Ty::fn_ty(vec![Ty::String], Ty::Unit),
            True | False => Ty::Bool,
            Trap => Ty::fn_ty(vec![], Ty::Never),
            Null => {
                let pointee = self.infer.new_var();
                Ty::rawptr(pointee)
            }
            I32Store => Ty::fn_ty(vec![Ty::I32, Ty::I32], Ty::Unit),
            I64Store => Ty::fn_ty(vec![Ty::I32, Ty::Int], Ty::Unit),
            I32Load => Ty::fn_ty(vec![Ty::I32], Ty::I32),
            I64Load => Ty::fn_ty(vec![Ty::I32], Ty::Int),
            MemorySize => Ty::fn_ty(vec![], Ty::I32),
            MemoryGrow => Ty::fn_ty(vec![Ty::I32], Ty::I32),
            I32ExtendToI64U => Ty::fn_ty(vec![Ty::I32], Ty::Int),
            Locals => Ty::fn_ty(vec![], Ty::Unit),
            Transmute | Asm => {
                self.sink
                    .emit(format!("intrinsic '{builtin}' must be called"), span.clone());
                Ty::Error
            }
            StringTy | IntTy | I32Ty | BoolTy => {
                self.sink.emit(
                    format!("'{builtin}' is a type and cannot be used as a value"),
                    span.clone(),
                );
                Ty::Error
            }
        }
    }

    /// Rewrite a local resolution from de-Bruijn distance to the dense
    /// per-function index codegen consumes.
    fn rewrite_res(&mut self, res: &Resolution) -> (Resolution, Option<Ty>) {
        match res {
            Resolution::Local { index } => {
                let (ty, dense) = self.locals[self.locals.len() - 1 - index].clone();
                (Resolution::Local { index: dense }, Some(ty))
            }
            other => (other.clone(), None),
        }
    }

    pub fn check_expression(&mut self, expression: &Expression<Resolved>) -> Expression<Typecked> {
        match expression {
            Expression::Empty(empty) => Expression::Empty(Empty {
                info: Ty::Unit,
                position: empty.position.clone(),
            }),
            Expression::Let(let_exp) => self.check_let(let_exp),
            Expression::Assign(assign) => self.check_assign(assign),
            Expression::Block(block) => {
                let depth = self.locals.len();
                let expressions = block
                    .expressions
                    .iter()
                    .map(|sub| self.check_expression(sub))
                    .collect::<Vec<_>>();
                self.locals.truncate(depth);
                let info = expressions
                    .last()
                    .map(|last| last.get_info())
                    .unwrap_or(Ty::Unit);
                Expression::Block(Block {
                    expressions,
                    info,
                    position: block.position.clone(),
                })
            }
            Expression::Num(num) => Expression::Num(Num {
                value: num.value,
                kind: num.kind,
                info: match num.kind {
                    IntKind::Int => Ty::Int,
                    IntKind::I32 => Ty::I32,
                },
                position: num.position.clone(),
            }),
            Expression::AstString(string) => Expression::AstString(AstString {
                value: string.value.clone(),
                info: Ty::String,
                position: string.position.clone(),
            }),
            Expression::Id(id) => {
                let (res, local_ty) = self.rewrite_res(&id.res);
                let info = match local_ty {
                    Some(ty) => ty,
                    None => self.type_of_value(&id.res, &id.position),
                };
                Expression::Id(Id {
                    name: id.name.clone(),
                    res,
                    info,
                    position: id.position.clone(),
                })
            }
            Expression::Path(path) => {
                let (res, local_ty) = self.rewrite_res(&path.res);
                let info = match local_ty {
                    Some(ty) => ty,
                    None => self.type_of_value(&path.res, &path.position),
                };
                Expression::Path(PathExpr {
                    segments: path.segments.clone(),
                    res,
                    info,
                    position: path.position.clone(),
                })
            }
            Expression::Binary(binary) => self.check_binary(binary),
            Expression::Prefix(prefix) => self.check_prefix(prefix),
            Expression::Call(call) => self.check_call(call),
            Expression::FieldAccess(access) => self.check_field_access(access),
            Expression::If(if_exp) => self.check_if(if_exp),
            Expression::Loop(loop_exp) => {
                self.loops.push(LoopState {
                    id: loop_exp.loop_id,
                    has_break: false,
                });
                // the body's value is discarded at every iteration
                let body = self.check_expression(&loop_exp.body);
                let state = self.loops.pop().expect("loop state pushed above");
                let info = if state.has_break { Ty::Unit } else { Ty::Never };
                Expression::Loop(Box::new(Loop {
                    body,
                    loop_id: loop_exp.loop_id,
                    info,
                    position: loop_exp.position.clone(),
                }))
            }
            Expression::Break(break_exp) => match self.loops.last_mut() {
                None => self.error_expr("break outside of loop", break_exp.position.clone()),
                Some(state) => {
                    state.has_break = true;
                    let target = state.id;
                    Expression::Break(Break {
                        target,
                        info: Ty::Never,
                        position: break_exp.position.clone(),
                    })
                }
            },
            Expression::StructLiteral(literal) => self.check_struct_literal(literal),
            Expression::TupleLiteral(tuple) => {
                let elements = tuple
                    .elements
                    .iter()
                    .map(|el| self.check_expression(el))
                    .collect::<Vec<_>>();
                let info = Ty::Tuple(elements.iter().map(|el| el.get_info()).collect());
                Expression::TupleLiteral(TupleLiteral {
                    elements,
                    info,
                    position: tuple.position.clone(),
                })
            }
            Expression::Asm(asm) => Expression::Asm(Asm {
                instructions: asm.instructions.clone(),
                info: self.infer.new_var(),
                position: asm.position.clone(),
            }),
            Expression::Error(error) => Expression::Error(ExprError {
                error: error.error,
                info: Ty::Error,
                position: error.position.clone(),
            }),
        }
    }

    fn check_let(&mut self, let_exp: &Let<Resolved>) -> Expression<Typecked> {
        let declared = match &let_exp.type_name {
            Some(type_name) => self.items.lower_type_name(type_name),
            None => self.infer.new_var(),
        };
        let value = self.check_expression(&let_exp.value);
        self.infer
            .assign(&declared, value.info(), &value.position());

        let index = self.fn_locals.len();
        self.fn_locals.push(declared.clone());
        self.locals.push((declared.clone(), index));

        Expression::Let(Let {
            name: let_exp.name.clone(),
            type_name: let_exp.type_name.as_ref().map(convert_type_name),
            value: Box::new(value),
            local: LocalInfo {
                index,
                ty: declared,
            },
            info: Ty::Unit,
            position: let_exp.position.clone(),
        })
    }

    fn check_assign(&mut self, assign: &Assign<Resolved>) -> Expression<Typecked> {
        let lhs = self.check_expression(&assign.lhs);
        let rhs = self.check_expression(&assign.rhs);
        self.infer.assign(lhs.info(), rhs.info(), &rhs.position());
        self.validate_lvalue(&assign.lhs);

        Expression::Assign(Box::new(Assign {
            lhs,
            rhs,
            info: Ty::Unit,
            position: assign.position.clone(),
        }))
    }

    /// An assignable place is a local, a mutable global, or a field chain
    /// rooted in one.
    fn validate_lvalue(&mut self, lhs: &Expression<Resolved>) {
        match lhs {
            Expression::Id(Id { res, position, .. })
            | Expression::Path(PathExpr { res, position, .. }) => {
                let res = self.items.resolve_use(res, position);
                match res {
                    Resolution::Local { .. } | Resolution::Error(_) => {}
                    Resolution::Item { id } => match self.items.global_mutability(id) {
                        Some(true) => {}
                        Some(false) => {
                            self.sink
                                .emit("cannot assign to immutable global", position.clone());
                        }
                        None => {
                            self.sink
                                .emit("invalid assignment target", position.clone());
                        }
                    },
                    Resolution::Builtin(_) | Resolution::TyParam { .. } => {
                        self.sink
                            .emit("invalid assignment target", position.clone());
                    }
                }
            }
            Expression::FieldAccess(access) => self.validate_lvalue(&access.target),
            Expression::Error(_) => {}
            other => {
                self.sink
                    .emit("invalid assignment target", other.position());
            }
        }
    }

    fn check_binary(&mut self, binary: &BinaryExpression<Resolved>) -> Expression<Typecked> {
        let lhs = self.check_expression(&binary.lhs);
        let rhs = self.check_expression(&binary.rhs);
        let info = self.binary_result(binary.operator, lhs.info(), rhs.info(), &binary.position);

        Expression::Binary(Box::new(BinaryExpression {
            operator: binary.operator,
            lhs,
            rhs,
            info,
            position: binary.position.clone(),
        }))
    }

    fn binary_result(
        &mut self,
        operator: BinaryOperator,
        lhs: &Ty,
        rhs: &Ty,
        span: &Span,
    ) -> Ty {
        let lhs = self.infer.resolve_if_possible(lhs);
        let rhs = self.infer.resolve_if_possible(rhs);
        if lhs.is_error() || rhs.is_error() {
            return Ty::Error;
        }

        let allowed = match operator.class() {
            OperatorClass::Comparison => match (&lhs, &rhs) {
                (Ty::Int, Ty::Int) | (Ty::I32, Ty::I32) | (Ty::String, Ty::String) => {
                    Some(Ty::Bool)
                }
                (Ty::RawPtr(lhs_inner), Ty::RawPtr(rhs_inner)) => {
                    self.infer.assign(lhs_inner, rhs_inner, span);
                    Some(Ty::Bool)
                }
                (Ty::Bool, Ty::Bool)
                    if matches!(
                        operator,
                        BinaryOperator::Equals | BinaryOperator::NotEquals
                    ) =>
                {
                    Some(Ty::Bool)
                }
                _ => None,
            },
            OperatorClass::Additive | OperatorClass::Multiplicative => match (&lhs, &rhs) {
                (Ty::Int, Ty::Int) => Some(Ty::Int),
                (Ty::I32, Ty::I32) => Some(Ty::I32),
                _ => None,
            },
            OperatorClass::Logical => match (&lhs, &rhs) {
                (Ty::Bool, Ty::Bool) => Some(Ty::Bool),
                _ => None,
            },
        };

        match allowed {
            Some(ty) => ty,
            None => {
                self.sink.emit(
                    format!("invalid operands {lhs} and {rhs} for operator '{operator}'"),
                    span.clone(),
                );
                Ty::Error
            }
        }
    }

    fn check_prefix(&mut self, prefix: &Prefix<Resolved>) -> Expression<Typecked> {
        let inner = self.check_expression(&prefix.inner);
        let info = match prefix.operator {
            PrefixOperator::Minus => {
                self.sink
                    .emit("unary - is not supported", prefix.position.clone());
                Ty::Error
            }
            PrefixOperator::Not => {
                let inner_ty = self.infer.resolve_if_possible(inner.info());
                match inner_ty {
                    Ty::Int | Ty::I32 | Ty::Bool => inner_ty,
                    Ty::Error => Ty::Error,
                    other => {
                        self.sink.emit(
                            format!("invalid operand {other} for operator '!'"),
                            prefix.position.clone(),
                        );
                        Ty::Error
                    }
                }
            }
        };

        Expression::Prefix(Box::new(Prefix {
            operator: prefix.operator,
            inner,
            info,
            position: prefix.position.clone(),
        }))
    }

    fn check_call(&mut self, call: &Call<Resolved>) -> Expression<Typecked> {
        match builtin_callee(&call.callee) {
            Some(Builtin::Transmute) => return self.check_transmute(call),
            Some(Builtin::Asm) => return self.check_asm_call(call),
            _ => {}
        }

        let callee = self.check_expression(&call.callee);
        let callee_ty = self.infer.resolve_if_possible(callee.info());
        let arguments = call
            .arguments
            .iter()
            .map(|arg| self.check_expression(arg))
            .collect::<Vec<_>>();

        let info = match &callee_ty {
            Ty::Fn { params, return_ty } => {
                if params.len() != arguments.len() {
                    self.sink.emit(
                        format!(
                            "expected {} arguments, found {}",
                            params.len(),
                            arguments.len()
                        ),
                        call.position.clone(),
                    );
                    Ty::Error
                } else {
                    for (param, argument) in params.iter().zip(arguments.iter()) {
                        self.infer
                            .assign(param, argument.info(), &argument.position());
                    }
                    (**return_ty).clone()
                }
            }
            Ty::Error => Ty::Error,
            other => {
                self.sink.emit(
                    format!("expected function, found {other}"),
                    callee.position(),
                );
                Ty::Error
            }
        };

        Expression::Call(Box::new(Call {
            callee,
            arguments,
            info,
            position: call.position.clone(),
        }))
    }

    /// `___transmute(e)` reinterprets its argument: argument types are
    /// ignored and the result is a fresh variable for the context to
    /// constrain.
    fn check_transmute(&mut self, call: &Call<Resolved>) -> Expression<Typecked> {
        let arguments = call
            .arguments
            .iter()
            .map(|arg| self.check_expression(arg))
            .collect::<Vec<_>>();
        let result = self.infer.new_var();

        let callee = Expression::Id(Id {
            name: Builtin::Transmute.name().to_string(),
            res: Resolution::Builtin(Builtin::Transmute),
            info: Ty::Fn {
                params: arguments.iter().map(|arg| arg.get_info()).collect(),
                return_ty: Box::new(result.clone()),
            },
            position: call.callee.position(),
        });

        Expression::Call(Box::new(Call {
            callee,
            arguments,
            info: result,
            position: call.position.clone(),
        }))
    }

    /// A call to `___asm` elaborates into an [`Asm`] node carrying its
    /// instruction strings verbatim.
    fn check_asm_call(&mut self, call: &Call<Resolved>) -> Expression<Typecked> {
        let mut instructions = vec![];
        for argument in &call.arguments {
            match argument {
                Expression::AstString(string) => instructions.push(string.value.clone()),
                other => {
                    return self.error_expr(
                        "___asm arguments must be string literals",
                        other.position(),
                    );
                }
            }
        }

        Expression::Asm(Asm {
            instructions,
            info: self.infer.new_var(),
            position: call.position.clone(),
        })
    }

    fn check_field_access(&mut self, access: &FieldAccess<Resolved>) -> Expression<Typecked> {
        let target = self.check_expression(&access.target);
        let target_ty = self.infer.resolve_if_possible(target.info());

        let lookup: Result<(Ty, usize), Option<String>> = match &target_ty {
            Ty::Tuple(elements) => match &access.field {
                FieldName::Index(index) => match elements.get(*index as usize) {
                    Some(ty) => Ok((ty.clone(), *index as usize)),
                    None => Err(Some(format!(
                        "tuple {target_ty} has no field {index}"
                    ))),
                },
                FieldName::Named(name) => {
                    Err(Some(format!("tuple {target_ty} has no field '{name}'")))
                }
            },
            Ty::Struct { .. } | Ty::RawPtr(_) => {
                let struct_ty = match &target_ty {
                    Ty::RawPtr(inner) => self.infer.resolve_if_possible(inner),
                    other => other.clone(),
                };
                match &struct_ty {
                    Ty::Struct { id, name } => match &access.field {
                        FieldName::Named(field_name) => {
                            let fields = self
                                .items
                                .struct_fields(*id, &access.position)
                                .unwrap_or_default();
                            match fields
                                .iter()
                                .enumerate()
                                .find(|(_, (name, _))| name == field_name)
                            {
                                Some((index, (_, ty))) => Ok((ty.clone(), index)),
                                None => Err(Some(format!(
                                    "no field '{field_name}' on struct '{name}'"
                                ))),
                            }
                        }
                        FieldName::Index(_) => {
                            Err(Some(format!("struct '{name}' has no numeric fields")))
                        }
                    },
                    Ty::Error => Err(None),
                    other => Err(Some(format!("expected struct or tuple, found *{other}"))),
                }
            }
            Ty::Error => Err(None),
            other => Err(Some(format!("expected struct or tuple, found {other}"))),
        };

        match lookup {
            Ok((info, field_index)) => Expression::FieldAccess(Box::new(FieldAccess {
                target,
                field: access.field.clone(),
                field_index,
                info,
                position: access.position.clone(),
            })),
            Err(Some(message)) => self.error_expr(message, access.position.clone()),
            // the target is already diagnosed; absorb silently
            Err(None) => Expression::FieldAccess(Box::new(FieldAccess {
                target,
                field: access.field.clone(),
                field_index: 0,
                info: Ty::Error,
                position: access.position.clone(),
            })),
        }
    }

    fn check_if(&mut self, if_exp: &If<Resolved>) -> Expression<Typecked> {
        let condition = self.check_expression(&if_exp.condition);
        self.infer
            .assign(&Ty::Bool, condition.info(), &condition.position());

        let then_branch = self.check_expression(&if_exp.then_branch);
        let (else_branch, info) = match &if_exp.else_branch {
            Some(branch) => {
                let else_branch = self.check_expression(branch);
                self.infer.assign(
                    then_branch.info(),
                    else_branch.info(),
                    &else_branch.position(),
                );
                let info = then_branch.get_info();
                (Some(else_branch), info)
            }
            None => {
                self.infer
                    .assign(&Ty::Unit, then_branch.info(), &then_branch.position());
                (None, Ty::Unit)
            }
        };

        Expression::If(Box::new(If {
            condition,
            then_branch,
            else_branch,
            info,
            position: if_exp.position.clone(),
        }))
    }

    fn check_struct_literal(&mut self, literal: &StructLiteral<Resolved>) -> Expression<Typecked> {
        let name = &literal.name;
        let struct_ty = match &name.res {
            Resolution::Item { .. } => self.type_of_value(&name.res, &name.position),
            Resolution::Error(_) => Ty::Error,
            _ => {
                self.sink
                    .emit("expected a struct type", name.position.clone());
                Ty::Error
            }
        };

        let (struct_id, struct_name) = match &struct_ty {
            Ty::Struct { id, name } => (*id, name.clone()),
            // already diagnosed; check the field values and absorb
            Ty::Error => {
                let fields = literal
                    .fields
                    .iter()
                    .map(|field| StructLiteralField {
                        name: field.name.clone(),
                        value: self.check_expression(&field.value),
                        field_index: 0,
                        position: field.position.clone(),
                    })
                    .collect();
                return Expression::StructLiteral(StructLiteral {
                    name: Id {
                        name: name.name.clone(),
                        res: name.res.clone(),
                        info: Ty::Error,
                        position: name.position.clone(),
                    },
                    fields,
                    info: Ty::Error,
                    position: literal.position.clone(),
                });
            }
            other => {
                return self.error_expr(
                    format!("expected struct, found {other}"),
                    name.position.clone(),
                );
            }
        };

        let declared = self
            .items
            .struct_fields(struct_id, &literal.position)
            .unwrap_or_default();

        let mut assigned = HashSet::new();
        let mut fields = vec![];
        for field in &literal.fields {
            let value = self.check_expression(&field.value);
            match declared
                .iter()
                .enumerate()
                .find(|(_, (name, _))| *name == field.name)
            {
                Some((index, (_, field_ty))) => {
                    self.infer
                        .assign(field_ty, value.info(), &value.position());
                    assigned.insert(field.name.clone());
                    fields.push(StructLiteralField {
                        name: field.name.clone(),
                        value,
                        field_index: index,
                        position: field.position.clone(),
                    });
                }
                None => {
                    self.sink.emit(
                        format!("unknown field '{}' on struct '{struct_name}'", field.name),
                        field.position.clone(),
                    );
                }
            }
        }

        let missing = declared
            .iter()
            .filter(|(name, _)| !assigned.contains(name))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            self.sink.emit(
                format!("missing fields in literal: {}", missing.join(", ")),
                literal.position.clone(),
            );
        }

        Expression::StructLiteral(StructLiteral {
            name: Id {
                name: name.name.clone(),
                res: name.res.clone(),
                info: struct_ty.clone(),
                position: name.position.clone(),
            },
            fields,
            info: struct_ty,
            position: literal.position.clone(),
        })
    }
}

fn builtin_callee(callee: &Expression<Resolved>) -> Option<Builtin> {
    let res = match callee {
        Expression::Id(id) => &id.res,
        Expression::Path(path) => &path.res,
        _ => return None,
    };
    match res {
        Resolution::Builtin(builtin) => Some(*builtin),
        _ => None,
    }
}
