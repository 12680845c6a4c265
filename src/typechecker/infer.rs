//! The inference context: a single mutable substitution from unification
//! variables to types, plus the unification procedure itself.

use crate::errors::{ErrorSink, Span};

use super::types::{Ty, TyVar};

pub struct InferCtx {
    subst: Vec<Option<Ty>>,
    sink: ErrorSink,
}

impl InferCtx {
    pub fn new(sink: ErrorSink) -> InferCtx {
        InferCtx {
            subst: vec![],
            sink,
        }
    }

    /// Allocate a fresh unification variable.
    pub fn new_var(&mut self) -> Ty {
        let var = TyVar(self.subst.len() as u32);
        self.subst.push(None);
        Ty::Var(var)
    }

    /// Shallow chase: follow variable bindings at the top of the type
    /// only. Component types are not resolved; callers re-resolve at
    /// every inspection point.
    pub fn resolve_if_possible(&self, ty: &Ty) -> Ty {
        let mut current = ty.clone();
        loop {
            let next = match &current {
                Ty::Var(TyVar(n)) => self.subst[*n as usize].clone(),
                _ => None,
            };
            match next {
                Some(bound) => current = bound,
                None => break,
            }
        }
        current
    }

    fn occurs(&self, var: TyVar, ty: &Ty) -> bool {
        let ty = self.resolve_if_possible(ty);
        match &ty {
            Ty::Var(other) => *other == var,
            Ty::Fn { params, return_ty } => {
                params.iter().any(|param| self.occurs(var, param)) || self.occurs(var, return_ty)
            }
            Ty::Tuple(elements) => elements.iter().any(|el| self.occurs(var, el)),
            Ty::RawPtr(inner) => self.occurs(var, inner),
            _ => false,
        }
    }

    fn bind(&mut self, var: TyVar, ty: &Ty) {
        debug_assert!(self.subst[var.0 as usize].is_none());
        self.subst[var.0 as usize] = Some(ty.clone());
    }

    /// Unify `actual` with `expected`, reporting a mismatch at `span`.
    /// Error types absorb unification silently so one diagnostic does not
    /// cascade into many; a variable meeting an error is bound to the
    /// error sentinel for the same reason.
    pub fn assign(&mut self, expected: &Ty, actual: &Ty, span: &Span) {
        let expected = self.resolve_if_possible(expected);
        let actual = self.resolve_if_possible(actual);

        match (&expected, &actual) {
            (Ty::Var(var), other) | (other, Ty::Var(var)) => {
                if let Ty::Var(other_var) = other {
                    if other_var == var {
                        return;
                    }
                }
                if self.occurs(*var, other) {
                    self.sink
                        .emit(format!("cannot construct infinite type {expected}"), span.clone());
                    return;
                }
                self.bind(*var, other);
            }
            (Ty::Error, _) | (_, Ty::Error) => {}
            (Ty::Never, _) | (_, Ty::Never) => {}
            (Ty::Bool, Ty::Bool)
            | (Ty::String, Ty::String)
            | (Ty::Unit, Ty::Unit)
            | (Ty::Int, Ty::Int)
            | (Ty::I32, Ty::I32) => {}
            (Ty::Tuple(expected_els), Ty::Tuple(actual_els))
                if expected_els.len() == actual_els.len() =>
            {
                for (exp, act) in expected_els.iter().zip(actual_els.iter()) {
                    self.assign(exp, act, span);
                }
            }
            (Ty::RawPtr(expected_inner), Ty::RawPtr(actual_inner)) => {
                self.assign(expected_inner, actual_inner, span);
            }
            (
                Ty::Fn {
                    params: expected_params,
                    return_ty: expected_ret,
                },
                Ty::Fn {
                    params: actual_params,
                    return_ty: actual_ret,
                },
            ) if expected_params.len() == actual_params.len() => {
                for (exp, act) in expected_params.iter().zip(actual_params.iter()) {
                    self.assign(exp, act, span);
                }
                self.assign(expected_ret, actual_ret, span);
            }
            (Ty::Struct { id: expected_id, .. }, Ty::Struct { id: actual_id, .. })
                if expected_id == actual_id => {}
            (
                Ty::Param {
                    index: expected_idx, ..
                },
                Ty::Param {
                    index: actual_idx, ..
                },
            ) if expected_idx == actual_idx => {}
            _ => {
                self.sink
                    .emit(format!("expected {expected}, found {actual}"), span.clone());
            }
        }
    }

    /// Deep resolution: replace every variable in `ty` by its
    /// substitution. Returns the first still-unbound variable on failure.
    pub fn fully_resolve(&self, ty: &Ty) -> Result<Ty, TyVar> {
        let ty = self.resolve_if_possible(ty);
        match &ty {
            Ty::Var(var) => Err(*var),
            Ty::Fn { params, return_ty } => Ok(Ty::Fn {
                params: params
                    .iter()
                    .map(|param| self.fully_resolve(param))
                    .collect::<Result<_, _>>()?,
                return_ty: Box::new(self.fully_resolve(return_ty)?),
            }),
            Ty::Tuple(elements) => Ok(Ty::Tuple(
                elements
                    .iter()
                    .map(|el| self.fully_resolve(el))
                    .collect::<Result<_, _>>()?,
            )),
            Ty::RawPtr(inner) => Ok(Ty::rawptr(self.fully_resolve(inner)?)),
            _ => Ok(ty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorSink;

    fn ctx() -> (InferCtx, ErrorSink) {
        let sink = ErrorSink::new();
        (InferCtx::new(sink.clone()), sink)
    }

    #[test]
    fn test_bind_and_resolve() {
        let (mut infer, sink) = ctx();
        let var = infer.new_var();

        infer.assign(&var, &Ty::Int, &Span::default());

        assert!(!sink.has_errors());
        assert_eq!(infer.resolve_if_possible(&var), Ty::Int);
    }

    #[test]
    fn test_shallow_chase_through_chain() {
        let (mut infer, sink) = ctx();
        let a = infer.new_var();
        let b = infer.new_var();

        infer.assign(&a, &b, &Span::default());
        infer.assign(&b, &Ty::Bool, &Span::default());

        assert!(!sink.has_errors());
        assert_eq!(infer.resolve_if_possible(&a), Ty::Bool);
    }

    #[test]
    fn test_mismatch_reports() {
        let (mut infer, sink) = ctx();

        infer.assign(&Ty::Int, &Ty::String, &Span::default());

        assert_eq!(sink.errors()[0].message, "expected int, found string");
    }

    #[test]
    fn test_error_absorbs() {
        let (mut infer, sink) = ctx();

        infer.assign(&Ty::Error, &Ty::String, &Span::default());
        infer.assign(&Ty::Int, &Ty::Error, &Span::default());

        assert!(!sink.has_errors());
    }

    #[test]
    fn test_never_unifies_one_sided() {
        let (mut infer, sink) = ctx();

        infer.assign(&Ty::Int, &Ty::Never, &Span::default());
        infer.assign(&Ty::Never, &Ty::Bool, &Span::default());

        assert!(!sink.has_errors());
    }

    #[test]
    fn test_structural_unification() {
        let (mut infer, sink) = ctx();
        let var = infer.new_var();

        infer.assign(
            &Ty::Tuple(vec![Ty::Int, var.clone()]),
            &Ty::Tuple(vec![Ty::Int, Ty::Bool]),
            &Span::default(),
        );

        assert!(!sink.has_errors());
        assert_eq!(infer.resolve_if_possible(&var), Ty::Bool);
    }

    #[test]
    fn test_tuple_arity_mismatch() {
        let (mut infer, sink) = ctx();

        infer.assign(
            &Ty::Tuple(vec![Ty::Int]),
            &Ty::Tuple(vec![Ty::Int, Ty::Int]),
            &Span::default(),
        );

        assert!(sink.has_errors());
    }

    #[test]
    fn test_symmetry() {
        for flip in [false, true] {
            let (mut infer, sink) = ctx();
            let var = infer.new_var();
            let lhs = Ty::rawptr(var.clone());
            let rhs = Ty::rawptr(Ty::I32);

            if flip {
                infer.assign(&rhs, &lhs, &Span::default());
            } else {
                infer.assign(&lhs, &rhs, &Span::default());
            }

            assert!(!sink.has_errors());
            assert_eq!(infer.resolve_if_possible(&var), Ty::I32);
        }
    }

    #[test]
    fn test_occurs_check() {
        let (mut infer, sink) = ctx();
        let var = infer.new_var();

        infer.assign(&var, &Ty::rawptr(var.clone()), &Span::default());

        assert!(sink.has_errors());
    }

    #[test]
    fn test_fully_resolve_reports_unbound() {
        let (mut infer, _) = ctx();
        let bound = infer.new_var();
        let unbound = infer.new_var();

        infer.assign(&bound, &Ty::Int, &Span::default());

        assert_eq!(infer.fully_resolve(&bound), Ok(Ty::Int));
        assert!(infer
            .fully_resolve(&Ty::Tuple(vec![Ty::Int, unbound]))
            .is_err());
    }
}
