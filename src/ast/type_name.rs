use std::fmt::Display;

use crate::errors::{ErrorEmitted, Span};

use super::Phase;

/// A type as written in source, before lowering to a semantic type.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeName<P: Phase> {
    Ident(TypeIdent<P>),
    Tuple(Vec<TypeName<P>>, Span),
    RawPtr(Box<TypeName<P>>, Span),
    Never(Span),
    Error(ErrorEmitted, Span),
}

/// A named type reference, possibly with generic arguments:
/// `Pair`, `List[Int]`.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeIdent<P: Phase> {
    pub name: String,
    pub generic_args: Vec<TypeName<P>>,
    pub res: P::Res,
    pub position: Span,
}

impl<P: Phase> TypeName<P> {
    pub fn position(&self) -> Span {
        match self {
            TypeName::Ident(TypeIdent { position, .. }) => position.clone(),
            TypeName::Tuple(_, position)
            | TypeName::RawPtr(_, position)
            | TypeName::Never(position)
            | TypeName::Error(_, position) => position.clone(),
        }
    }
}

impl<P: Phase> Display for TypeName<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeName::Ident(TypeIdent {
                name, generic_args, ..
            }) => {
                f.write_str(name)?;
                if !generic_args.is_empty() {
                    write!(
                        f,
                        "[{}]",
                        generic_args
                            .iter()
                            .map(|arg| arg.to_string())
                            .collect::<Vec<_>>()
                            .join(", ")
                    )?;
                }
                Ok(())
            }
            TypeName::Tuple(elements, _) => write!(
                f,
                "({})",
                elements
                    .iter()
                    .map(|el| el.to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            TypeName::RawPtr(inner, _) => write!(f, "*{inner}"),
            TypeName::Never(_) => f.write_str("!"),
            TypeName::Error(_, _) => f.write_str("<error>"),
        }
    }
}
