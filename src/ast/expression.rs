use std::fmt::Display;

use crate::{
    errors::{ErrorEmitted, Span},
    lexer::IntKind,
};

use super::Phase;

/// An expression. Weft is expression oriented; every node carries its
/// span and, once the checker has run, its type in the `info` slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Expression<P: Phase> {
    Empty(Empty<P>),
    Let(Let<P>),
    Assign(Box<Assign<P>>),
    Block(Block<P>),
    Num(Num<P>),
    AstString(AstString<P>),
    Id(Id<P>),
    Path(PathExpr<P>),
    Binary(Box<BinaryExpression<P>>),
    Prefix(Box<Prefix<P>>),
    Call(Box<Call<P>>),
    FieldAccess(Box<FieldAccess<P>>),
    If(Box<If<P>>),
    Loop(Box<Loop<P>>),
    Break(Break<P>),
    StructLiteral(StructLiteral<P>),
    TupleLiteral(TupleLiteral<P>),
    Asm(Asm<P>),
    Error(ExprError<P>),
}

/// The unit value `()`.
#[derive(Clone, Debug, PartialEq)]
pub struct Empty<P: Phase> {
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Let<P: Phase> {
    pub name: String,
    pub type_name: Option<super::TypeName<P>>,
    pub value: Box<Expression<P>>,
    pub local: P::LocalInfo,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Assign<P: Phase> {
    pub lhs: Expression<P>,
    pub rhs: Expression<P>,
    pub info: P::TypeInfo,
    pub position: Span,
}

/// A block `( e1; e2; ...; en )`. Value and type of the block are those
/// of the last expression, unit if empty.
#[derive(Clone, Debug, PartialEq)]
pub struct Block<P: Phase> {
    pub expressions: Vec<Expression<P>>,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Num<P: Phase> {
    pub value: u64,
    pub kind: IntKind,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AstString<P: Phase> {
    pub value: String,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Id<P: Phase> {
    pub name: String,
    pub res: P::Res,
    pub info: P::TypeInfo,
    pub position: Span,
}

/// A dotted item path such as `m.g`. Produced by the resolver when it
/// collapses a field-access chain through a module; never by the parser.
#[derive(Clone, Debug, PartialEq)]
pub struct PathExpr<P: Phase> {
    pub segments: Vec<String>,
    pub res: P::Res,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Equals,
    NotEquals,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    And,
    Or,
}

/// Precedence class of a binary operator. Chains mixing classes must be
/// parenthesized; the parser's validator rejects them otherwise.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorClass {
    Additive,
    Multiplicative,
    Comparison,
    Logical,
}

impl BinaryOperator {
    pub fn class(&self) -> OperatorClass {
        use BinaryOperator::*;
        match self {
            Add | Sub => OperatorClass::Additive,
            Mul | Div | Mod => OperatorClass::Multiplicative,
            Equals | NotEquals | LessThan | GreaterThan | LessOrEqual | GreaterOrEqual => {
                OperatorClass::Comparison
            }
            And | Or => OperatorClass::Logical,
        }
    }

    pub fn is_comparison(&self) -> bool {
        self.class() == OperatorClass::Comparison
    }
}

impl Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Equals => "==",
            BinaryOperator::NotEquals => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::LessOrEqual => "<=",
            BinaryOperator::GreaterOrEqual => ">=",
            BinaryOperator::And => "&",
            BinaryOperator::Or => "|",
        };
        f.write_str(text)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BinaryExpression<P: Phase> {
    pub operator: BinaryOperator,
    pub lhs: Expression<P>,
    pub rhs: Expression<P>,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrefixOperator {
    Not,
    Minus,
}

impl Display for PrefixOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PrefixOperator::Not => "!",
            PrefixOperator::Minus => "-",
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Prefix<P: Phase> {
    pub operator: PrefixOperator,
    pub inner: Expression<P>,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Call<P: Phase> {
    pub callee: Expression<P>,
    pub arguments: Vec<Expression<P>>,
    pub info: P::TypeInfo,
    pub position: Span,
}

/// Name of an accessed field: `x.name` or `x.0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldName {
    Named(String),
    Index(u64),
}

impl Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldName::Named(name) => f.write_str(name),
            FieldName::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldAccess<P: Phase> {
    pub target: Expression<P>,
    pub field: FieldName,
    /// Index of the field within the target's layout; filled by the
    /// checker and preserved by every later fold.
    pub field_index: P::FieldIdx,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct If<P: Phase> {
    pub condition: Expression<P>,
    pub then_branch: Expression<P>,
    pub else_branch: Option<Expression<P>>,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Loop<P: Phase> {
    pub body: Expression<P>,
    pub loop_id: P::LoopId,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Break<P: Phase> {
    /// The innermost enclosing loop; recorded by the checker.
    pub target: P::BreakTarget,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructLiteral<P: Phase> {
    pub name: Id<P>,
    pub fields: Vec<StructLiteralField<P>>,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct StructLiteralField<P: Phase> {
    pub name: String,
    pub value: Expression<P>,
    pub field_index: P::FieldIdx,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TupleLiteral<P: Phase> {
    pub elements: Vec<Expression<P>>,
    pub info: P::TypeInfo,
    pub position: Span,
}

/// Inline codegen instructions, produced by the checker from calls to the
/// `___asm` intrinsic.
#[derive(Clone, Debug, PartialEq)]
pub struct Asm<P: Phase> {
    pub instructions: Vec<String>,
    pub info: P::TypeInfo,
    pub position: Span,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExprError<P: Phase> {
    pub error: ErrorEmitted,
    pub info: P::TypeInfo,
    pub position: Span,
}

impl<P: Phase> Expression<P> {
    pub fn get_info(&self) -> P::TypeInfo {
        self.info().clone()
    }

    pub fn info(&self) -> &P::TypeInfo {
        match self {
            Expression::Empty(Empty { info, .. })
            | Expression::Let(Let { info, .. })
            | Expression::Block(Block { info, .. })
            | Expression::Num(Num { info, .. })
            | Expression::AstString(AstString { info, .. })
            | Expression::Id(Id { info, .. })
            | Expression::Path(PathExpr { info, .. })
            | Expression::Break(Break { info, .. })
            | Expression::StructLiteral(StructLiteral { info, .. })
            | Expression::TupleLiteral(TupleLiteral { info, .. })
            | Expression::Asm(Asm { info, .. })
            | Expression::Error(ExprError { info, .. }) => info,
            Expression::Assign(assign) => &assign.info,
            Expression::Binary(binary) => &binary.info,
            Expression::Prefix(prefix) => &prefix.info,
            Expression::Call(call) => &call.info,
            Expression::FieldAccess(access) => &access.info,
            Expression::If(if_exp) => &if_exp.info,
            Expression::Loop(loop_exp) => &loop_exp.info,
        }
    }

    pub fn info_mut(&mut self) -> &mut P::TypeInfo {
        match self {
            Expression::Empty(Empty { info, .. })
            | Expression::Let(Let { info, .. })
            | Expression::Block(Block { info, .. })
            | Expression::Num(Num { info, .. })
            | Expression::AstString(AstString { info, .. })
            | Expression::Id(Id { info, .. })
            | Expression::Path(PathExpr { info, .. })
            | Expression::Break(Break { info, .. })
            | Expression::StructLiteral(StructLiteral { info, .. })
            | Expression::TupleLiteral(TupleLiteral { info, .. })
            | Expression::Asm(Asm { info, .. })
            | Expression::Error(ExprError { info, .. }) => info,
            Expression::Assign(assign) => &mut assign.info,
            Expression::Binary(binary) => &mut binary.info,
            Expression::Prefix(prefix) => &mut prefix.info,
            Expression::Call(call) => &mut call.info,
            Expression::FieldAccess(access) => &mut access.info,
            Expression::If(if_exp) => &mut if_exp.info,
            Expression::Loop(loop_exp) => &mut loop_exp.info,
        }
    }

    pub fn position(&self) -> Span {
        match self {
            Expression::Empty(Empty { position, .. })
            | Expression::Let(Let { position, .. })
            | Expression::Block(Block { position, .. })
            | Expression::Num(Num { position, .. })
            | Expression::AstString(AstString { position, .. })
            | Expression::Id(Id { position, .. })
            | Expression::Path(PathExpr { position, .. })
            | Expression::Break(Break { position, .. })
            | Expression::StructLiteral(StructLiteral { position, .. })
            | Expression::TupleLiteral(TupleLiteral { position, .. })
            | Expression::Asm(Asm { position, .. })
            | Expression::Error(ExprError { position, .. }) => position.clone(),
            Expression::Assign(assign) => assign.position.clone(),
            Expression::Binary(binary) => binary.position.clone(),
            Expression::Prefix(prefix) => prefix.position.clone(),
            Expression::Call(call) => call.position.clone(),
            Expression::FieldAccess(access) => access.position.clone(),
            Expression::If(if_exp) => if_exp.position.clone(),
            Expression::Loop(loop_exp) => loop_exp.position.clone(),
        }
    }
}
