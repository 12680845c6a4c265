//! Parser for Weft: recursive descent over the token stream, producing
//! the `Parsed` phase of the AST. Parse errors are fatal for the current
//! file; the mixed-precedence validator, on the other hand, reports
//! through the error sink and recovers.

use std::{error::Error, fmt::Display, rc::Rc};

use crate::{
    ast::{
        AstString, BinaryExpression, BinaryOperator, Block, Break, Call, Empty, Expression,
        ExternPkg, FieldAccess, FieldDef, FieldName, Function, Global, Id, If, Import, Item, Let,
        Loop, Module, Num, OperatorClass, Param, Parsed, Prefix, PrefixOperator, StructLiteral,
        StructLiteralField, TupleLiteral, TypeDef, TypeDefKind, TypeIdent, TypeName, Use,
        Assign as AssignExpr,
    },
    errors::{ErrorSink, SourceFile, Span},
    lexer::Token,
};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.span.to_string(&self.message).as_str())
    }
}

impl Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    source: Rc<SourceFile>,
    sink: ErrorSink,
}

/// Parse the root items of one source file.
pub fn parse_file(
    source: &Rc<SourceFile>,
    tokens: Vec<Token>,
    sink: &ErrorSink,
) -> ParseResult<Vec<Item<Parsed>>> {
    let mut parser = Parser::new(source, tokens, sink);
    let items = parser.parse_items(false)?;
    log::trace!(
        "parsed {count} root items from '{name}'",
        count = items.len(),
        name = source.name
    );
    Ok(items)
}

impl Parser {
    pub fn new(source: &Rc<SourceFile>, tokens: Vec<Token>, sink: &ErrorSink) -> Parser {
        Parser {
            tokens,
            position: 0,
            source: Rc::clone(source),
            sink: sink.clone(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn current_span(&self) -> Span {
        match self.tokens.get(self.position) {
            Some(token) => token.position(),
            None => self
                .tokens
                .last()
                .map(|token| token.position())
                .unwrap_or_else(|| Span {
                    start: (0, 0),
                    end: (0, 0),
                    source: Rc::clone(&self.source),
                }),
        }
    }

    fn err(&self, message: impl ToString) -> ParseError {
        ParseError {
            message: message.to_string(),
            span: self.current_span(),
        }
    }

    fn eat(&mut self, pred: fn(&Token) -> bool) -> Option<Token> {
        if self.peek().is_some_and(pred) {
            self.next()
        } else {
            None
        }
    }

    fn expect(&mut self, expected: &str, pred: fn(&Token) -> bool) -> ParseResult<Token> {
        match self.peek() {
            Some(token) if pred(token) => Ok(self.next().expect("peeked token vanished")),
            Some(token) => Err(self.err(format!("expected {expected}, found '{token}'"))),
            None => Err(self.err(format!("expected {expected}, found end of file"))),
        }
    }

    fn expect_name(&mut self) -> ParseResult<(String, Span)> {
        match self.peek() {
            Some(Token::Id { .. }) => {
                let Some(Token::Id { value, position }) = self.next() else {
                    unreachable!()
                };
                Ok((value, position))
            }
            Some(token) => Err(self.err(format!("expected a name, found '{token}'"))),
            None => Err(self.err("expected a name, found end of file")),
        }
    }

    // ------------------------------------------------------------------
    // items
    // ------------------------------------------------------------------

    /// Parse items until end of input (or, inside an inline module, until
    /// the closing parenthesis).
    fn parse_items(&mut self, inside_mod: bool) -> ParseResult<Vec<Item<Parsed>>> {
        let mut items = vec![];
        loop {
            match self.peek() {
                None => break,
                Some(Token::RParen { .. }) if inside_mod => break,
                Some(_) => items.push(self.parse_item()?),
            }
        }
        Ok(items)
    }

    fn parse_item(&mut self) -> ParseResult<Item<Parsed>> {
        match self.peek() {
            Some(Token::FunctionKeyword { .. }) => self.parse_function(),
            Some(Token::TypeKeyword { .. }) => self.parse_type_def(),
            Some(Token::ImportKeyword { .. }) => self.parse_import(),
            Some(Token::ExternKeyword { .. }) => self.parse_extern(),
            Some(Token::ModKeyword { .. }) => self.parse_mod(),
            Some(Token::GlobalKeyword { .. }) => self.parse_global(),
            Some(Token::UseKeyword { .. }) => self.parse_use(),
            Some(token) => Err(self.err(format!("expected an item, found '{token}'"))),
            None => Err(self.err("expected an item, found end of file")),
        }
    }

    fn parse_function(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'function'", |t| matches!(t, Token::FunctionKeyword { .. }))?
            .position();
        let (name, _) = self.expect_name()?;

        self.expect("'('", |t| matches!(t, Token::LParen { .. }))?;
        let params = self.parse_params()?;
        self.expect("')'", |t| matches!(t, Token::RParen { .. }))?;

        let return_type = if self.eat(|t| matches!(t, Token::Colon { .. })).is_some() {
            Some(self.parse_type_name()?)
        } else {
            None
        };

        self.expect("'='", |t| matches!(t, Token::Assign { .. }))?;
        let body = self.parse_expression()?;
        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        Ok(Item::Function(Function {
            id: (),
            name,
            params,
            return_type,
            body,
            def_path: (),
            position: start.merge(&end),
        }))
    }

    fn parse_params(&mut self) -> ParseResult<Vec<Param<Parsed>>> {
        let mut params = vec![];
        if matches!(self.peek(), Some(Token::RParen { .. })) {
            return Ok(params);
        }
        loop {
            let (name, name_span) = self.expect_name()?;
            self.expect("':'", |t| matches!(t, Token::Colon { .. }))?;
            let type_name = self.parse_type_name()?;
            let position = name_span.merge(&type_name.position());
            params.push(Param {
                name,
                type_name,
                position,
            });
            if self.eat(|t| matches!(t, Token::Comma { .. })).is_none() {
                break;
            }
        }
        Ok(params)
    }

    fn parse_type_def(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'type'", |t| matches!(t, Token::TypeKeyword { .. }))?
            .position();
        let (name, _) = self.expect_name()?;

        let mut generics = vec![];
        if self.eat(|t| matches!(t, Token::LBracket { .. })).is_some() {
            loop {
                let (param, _) = self.expect_name()?;
                generics.push(param);
                if self.eat(|t| matches!(t, Token::Comma { .. })).is_none() {
                    break;
                }
            }
            self.expect("']'", |t| matches!(t, Token::RBracket { .. }))?;
        }

        self.expect("'='", |t| matches!(t, Token::Assign { .. }))?;

        let def = if self.eat(|t| matches!(t, Token::StructKeyword { .. })).is_some() {
            self.expect("'{'", |t| matches!(t, Token::LBrace { .. }))?;
            let mut fields = vec![];
            while !matches!(self.peek(), Some(Token::RBrace { .. })) {
                let (field_name, field_span) = self.expect_name()?;
                self.expect("':'", |t| matches!(t, Token::Colon { .. }))?;
                let type_name = self.parse_type_name()?;
                let position = field_span.merge(&type_name.position());
                fields.push(FieldDef {
                    name: field_name,
                    type_name,
                    position,
                });
                if self.eat(|t| matches!(t, Token::Comma { .. })).is_none() {
                    break;
                }
            }
            self.expect("'}'", |t| matches!(t, Token::RBrace { .. }))?;
            TypeDefKind::Struct(fields)
        } else {
            TypeDefKind::Alias(self.parse_type_name()?)
        };

        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        Ok(Item::TypeDef(TypeDef {
            id: (),
            name,
            generics,
            def,
            def_path: (),
            position: start.merge(&end),
        }))
    }

    fn parse_import(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'import'", |t| matches!(t, Token::ImportKeyword { .. }))?
            .position();
        self.expect("'('", |t| matches!(t, Token::LParen { .. }))?;
        let module = match self.expect("a module string", |t| {
            matches!(t, Token::StringLiteral { .. })
        })? {
            Token::StringLiteral { value, .. } => value,
            _ => unreachable!(),
        };
        let function = match self.expect("a function string", |t| {
            matches!(t, Token::StringLiteral { .. })
        })? {
            Token::StringLiteral { value, .. } => value,
            _ => unreachable!(),
        };
        self.expect("')'", |t| matches!(t, Token::RParen { .. }))?;

        self.expect("'function'", |t| matches!(t, Token::FunctionKeyword { .. }))?;
        let (name, _) = self.expect_name()?;
        self.expect("'('", |t| matches!(t, Token::LParen { .. }))?;
        let params = self.parse_params()?;
        self.expect("')'", |t| matches!(t, Token::RParen { .. }))?;
        let return_type = if self.eat(|t| matches!(t, Token::Colon { .. })).is_some() {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        Ok(Item::Import(Import {
            id: (),
            name,
            module,
            function,
            params,
            return_type,
            def_path: (),
            position: start.merge(&end),
        }))
    }

    fn parse_extern(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'extern'", |t| matches!(t, Token::ExternKeyword { .. }))?
            .position();
        self.expect("'mod'", |t| matches!(t, Token::ModKeyword { .. }))?;
        let (name, _) = self.expect_name()?;
        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        Ok(Item::ExternPkg(ExternPkg {
            id: (),
            name,
            def_path: (),
            position: start.merge(&end),
        }))
    }

    fn parse_mod(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'mod'", |t| matches!(t, Token::ModKeyword { .. }))?
            .position();
        let (name, _) = self.expect_name()?;

        if let Some(token) = self.eat(|t| matches!(t, Token::Semicolon { .. })) {
            // contents live in their own file; the loader splices them in
            return Ok(Item::Mod(Module {
                id: (),
                name,
                items: vec![],
                file_module: true,
                def_path: (),
                position: start.merge(&token.position()),
            }));
        }

        self.expect("'('", |t| matches!(t, Token::LParen { .. }))?;
        let items = self.parse_items(true)?;
        self.expect("')'", |t| matches!(t, Token::RParen { .. }))?;
        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        Ok(Item::Mod(Module {
            id: (),
            name,
            items,
            file_module: false,
            def_path: (),
            position: start.merge(&end),
        }))
    }

    fn parse_global(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'global'", |t| matches!(t, Token::GlobalKeyword { .. }))?
            .position();
        let mutable = self.eat(|t| matches!(t, Token::MutKeyword { .. })).is_some();
        let (name, _) = self.expect_name()?;
        self.expect("':'", |t| matches!(t, Token::Colon { .. }))?;
        let type_name = self.parse_type_name()?;
        self.expect("'='", |t| matches!(t, Token::Assign { .. }))?;
        let value = self.parse_expression()?;
        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        Ok(Item::Global(Global {
            id: (),
            name,
            mutable,
            type_name,
            value,
            def_path: (),
            position: start.merge(&end),
        }))
    }

    fn parse_use(&mut self) -> ParseResult<Item<Parsed>> {
        let start = self
            .expect("'use'", |t| matches!(t, Token::UseKeyword { .. }))?
            .position();
        let mut segments = vec![];
        loop {
            let (segment, _) = self.expect_name()?;
            segments.push(segment);
            if self.eat(|t| matches!(t, Token::Dot { .. })).is_none() {
                break;
            }
        }
        let end = self
            .expect("';'", |t| matches!(t, Token::Semicolon { .. }))?
            .position();

        let name = segments.last().cloned().expect("use path is never empty");
        Ok(Item::Use(Use {
            id: (),
            name,
            segments,
            res: (),
            def_path: (),
            position: start.merge(&end),
        }))
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    pub fn parse_expression(&mut self) -> ParseResult<Expression<Parsed>> {
        if matches!(self.peek(), Some(Token::LetKeyword { .. })) {
            return self.parse_let();
        }

        let lhs = self.parse_binary()?;

        if self.eat(|t| matches!(t, Token::Assign { .. })).is_some() {
            let rhs = self.parse_expression()?;
            let position = lhs.position().merge(&rhs.position());
            return Ok(Expression::Assign(Box::new(AssignExpr {
                lhs,
                rhs,
                info: (),
                position,
            })));
        }

        Ok(lhs)
    }

    fn parse_let(&mut self) -> ParseResult<Expression<Parsed>> {
        let start = self
            .expect("'let'", |t| matches!(t, Token::LetKeyword { .. }))?
            .position();
        let (name, _) = self.expect_name()?;
        let type_name = if self.eat(|t| matches!(t, Token::Colon { .. })).is_some() {
            Some(self.parse_type_name()?)
        } else {
            None
        };
        self.expect("'='", |t| matches!(t, Token::Assign { .. }))?;
        let value = self.parse_expression()?;
        let position = start.merge(&value.position());

        Ok(Expression::Let(Let {
            name,
            type_name,
            value: Box::new(value),
            local: (),
            info: (),
            position,
        }))
    }

    fn binary_operator(token: &Token) -> Option<BinaryOperator> {
        Some(match token {
            Token::Plus { .. } => BinaryOperator::Add,
            Token::Minus { .. } => BinaryOperator::Sub,
            Token::Times { .. } => BinaryOperator::Mul,
            Token::Slash { .. } => BinaryOperator::Div,
            Token::Percent { .. } => BinaryOperator::Mod,
            Token::Equal { .. } => BinaryOperator::Equals,
            Token::NotEqual { .. } => BinaryOperator::NotEquals,
            Token::LessThan { .. } => BinaryOperator::LessThan,
            Token::GreaterThan { .. } => BinaryOperator::GreaterThan,
            Token::LessOrEqual { .. } => BinaryOperator::LessOrEqual,
            Token::GreaterOrEqual { .. } => BinaryOperator::GreaterOrEqual,
            Token::Ampersand { .. } => BinaryOperator::And,
            Token::Pipe { .. } => BinaryOperator::Or,
            _ => return None,
        })
    }

    /// Parse a chain of binary operators. Chains are left associative and
    /// must stay within a single precedence class; mixing classes without
    /// parentheses is diagnosed and recovered from.
    fn parse_binary(&mut self) -> ParseResult<Expression<Parsed>> {
        let mut lhs = self.parse_prefix()?;
        let mut chain_class: Option<OperatorClass> = None;

        while let Some(operator) = self.peek().and_then(Self::binary_operator) {
            let op_span = self.current_span();
            self.next();

            match chain_class {
                None => chain_class = Some(operator.class()),
                Some(class) if class == operator.class() => {}
                Some(_) => {
                    self.sink.emit(
                        format!(
                            "operator '{operator}' mixes precedence classes; parenthesize the chain"
                        ),
                        op_span,
                    );
                }
            }

            let rhs = self.parse_prefix()?;
            let position = lhs.position().merge(&rhs.position());
            lhs = Expression::Binary(Box::new(BinaryExpression {
                operator,
                lhs,
                rhs,
                info: (),
                position,
            }));
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> ParseResult<Expression<Parsed>> {
        if let Some(token) = self.eat(|t| matches!(t, Token::Exclamation { .. })) {
            let inner = self.parse_prefix()?;
            let position = token.position().merge(&inner.position());
            return Ok(Expression::Prefix(Box::new(Prefix {
                operator: PrefixOperator::Not,
                inner,
                info: (),
                position,
            })));
        }
        if let Some(token) = self.eat(|t| matches!(t, Token::Minus { .. })) {
            let inner = self.parse_prefix()?;
            let position = token.position().merge(&inner.position());
            return Ok(Expression::Prefix(Box::new(Prefix {
                operator: PrefixOperator::Minus,
                inner,
                info: (),
                position,
            })));
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> ParseResult<Expression<Parsed>> {
        let mut expression = self.parse_primary()?;

        loop {
            if self.eat(|t| matches!(t, Token::Dot { .. })).is_some() {
                let field = match self.peek() {
                    Some(Token::Id { .. }) => {
                        let Some(Token::Id { value, .. }) = self.next() else {
                            unreachable!()
                        };
                        FieldName::Named(value)
                    }
                    Some(Token::Integer { .. }) => {
                        let Some(Token::Integer { value, .. }) = self.next() else {
                            unreachable!()
                        };
                        FieldName::Index(value)
                    }
                    _ => return Err(self.err("expected a field name after '.'")),
                };
                let position = expression.position().merge(&self.current_span());
                expression = Expression::FieldAccess(Box::new(FieldAccess {
                    target: expression,
                    field,
                    field_index: (),
                    info: (),
                    position,
                }));
                continue;
            }

            if matches!(self.peek(), Some(Token::LParen { .. }))
                && matches!(
                    expression,
                    Expression::Id(_) | Expression::FieldAccess(_) | Expression::Path(_)
                )
            {
                self.next();
                let mut arguments = vec![];
                if !matches!(self.peek(), Some(Token::RParen { .. })) {
                    loop {
                        arguments.push(self.parse_expression()?);
                        if self.eat(|t| matches!(t, Token::Comma { .. })).is_none() {
                            break;
                        }
                    }
                }
                let end = self
                    .expect("')'", |t| matches!(t, Token::RParen { .. }))?
                    .position();
                let position = expression.position().merge(&end);
                expression = Expression::Call(Box::new(Call {
                    callee: expression,
                    arguments,
                    info: (),
                    position,
                }));
                continue;
            }

            break;
        }

        Ok(expression)
    }

    fn parse_primary(&mut self) -> ParseResult<Expression<Parsed>> {
        match self.peek() {
            Some(Token::LParen { .. }) => self.parse_paren(),
            Some(Token::IfKeyword { .. }) => self.parse_if(),
            Some(Token::LoopKeyword { .. }) => {
                let start = self.next().expect("peeked token vanished").position();
                let body = self.parse_expression()?;
                let position = start.merge(&body.position());
                Ok(Expression::Loop(Box::new(Loop {
                    body,
                    loop_id: (),
                    info: (),
                    position,
                })))
            }
            Some(Token::BreakKeyword { .. }) => {
                let position = self.next().expect("peeked token vanished").position();
                Ok(Expression::Break(Break {
                    target: (),
                    info: (),
                    position,
                }))
            }
            Some(Token::Integer { .. }) => {
                let Some(Token::Integer {
                    value,
                    kind,
                    position,
                }) = self.next()
                else {
                    unreachable!()
                };
                Ok(Expression::Num(Num {
                    value,
                    kind,
                    info: (),
                    position,
                }))
            }
            Some(Token::StringLiteral { .. }) => {
                let Some(Token::StringLiteral { value, position }) = self.next() else {
                    unreachable!()
                };
                Ok(Expression::AstString(AstString {
                    value,
                    info: (),
                    position,
                }))
            }
            Some(Token::Id { .. }) => {
                let Some(Token::Id { value, position }) = self.next() else {
                    unreachable!()
                };
                let id = Id {
                    name: value,
                    res: (),
                    info: (),
                    position,
                };
                if matches!(self.peek(), Some(Token::LBrace { .. })) {
                    return self.parse_struct_literal(id);
                }
                Ok(Expression::Id(id))
            }
            Some(token) => Err(self.err(format!("expected an expression, found '{token}'"))),
            None => Err(self.err("expected an expression, found end of file")),
        }
    }

    /// `(` already peeked: unit, a parenthesized expression, a block, or
    /// a tuple literal, depending on the separators that follow.
    fn parse_paren(&mut self) -> ParseResult<Expression<Parsed>> {
        let start = self
            .expect("'('", |t| matches!(t, Token::LParen { .. }))?
            .position();

        if let Some(end) = self.eat(|t| matches!(t, Token::RParen { .. })) {
            return Ok(Expression::Empty(Empty {
                info: (),
                position: start.merge(&end.position()),
            }));
        }

        let first = self.parse_expression()?;

        if matches!(self.peek(), Some(Token::Semicolon { .. })) {
            let mut expressions = vec![first];
            while self.eat(|t| matches!(t, Token::Semicolon { .. })).is_some() {
                expressions.push(self.parse_expression()?);
            }
            let end = self
                .expect("')'", |t| matches!(t, Token::RParen { .. }))?
                .position();
            return Ok(Expression::Block(Block {
                expressions,
                info: (),
                position: start.merge(&end),
            }));
        }

        if matches!(self.peek(), Some(Token::Comma { .. })) {
            let mut elements = vec![first];
            while self.eat(|t| matches!(t, Token::Comma { .. })).is_some() {
                if matches!(self.peek(), Some(Token::RParen { .. })) {
                    break;
                }
                elements.push(self.parse_expression()?);
            }
            let end = self
                .expect("')'", |t| matches!(t, Token::RParen { .. }))?
                .position();
            return Ok(Expression::TupleLiteral(TupleLiteral {
                elements,
                info: (),
                position: start.merge(&end),
            }));
        }

        self.expect("')'", |t| matches!(t, Token::RParen { .. }))?;
        Ok(first)
    }

    fn parse_if(&mut self) -> ParseResult<Expression<Parsed>> {
        let start = self
            .expect("'if'", |t| matches!(t, Token::IfKeyword { .. }))?
            .position();
        let condition = self.parse_expression()?;
        self.expect("'then'", |t| matches!(t, Token::ThenKeyword { .. }))?;
        let then_branch = self.parse_expression()?;
        let else_branch = if self.eat(|t| matches!(t, Token::ElseKeyword { .. })).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };

        let position = start.merge(
            &else_branch
                .as_ref()
                .map(|branch| branch.position())
                .unwrap_or_else(|| then_branch.position()),
        );

        Ok(Expression::If(Box::new(If {
            condition,
            then_branch,
            else_branch,
            info: (),
            position,
        })))
    }

    fn parse_struct_literal(&mut self, name: Id<Parsed>) -> ParseResult<Expression<Parsed>> {
        self.expect("'{'", |t| matches!(t, Token::LBrace { .. }))?;

        let mut fields = vec![];
        while !matches!(self.peek(), Some(Token::RBrace { .. })) {
            let (field_name, field_span) = self.expect_name()?;
            self.expect("':'", |t| matches!(t, Token::Colon { .. }))?;
            let value = self.parse_expression()?;
            let position = field_span.merge(&value.position());
            fields.push(StructLiteralField {
                name: field_name,
                value,
                field_index: (),
                position,
            });
            if self.eat(|t| matches!(t, Token::Comma { .. })).is_none() {
                break;
            }
        }
        let end = self
            .expect("'}'", |t| matches!(t, Token::RBrace { .. }))?
            .position();
        let position = name.position.merge(&end);

        Ok(Expression::StructLiteral(StructLiteral {
            name,
            fields,
            info: (),
            position,
        }))
    }

    // ------------------------------------------------------------------
    // types
    // ------------------------------------------------------------------

    pub fn parse_type_name(&mut self) -> ParseResult<TypeName<Parsed>> {
        match self.peek() {
            Some(Token::Times { .. }) => {
                let start = self.next().expect("peeked token vanished").position();
                let inner = self.parse_type_name()?;
                let position = start.merge(&inner.position());
                Ok(TypeName::RawPtr(Box::new(inner), position))
            }
            Some(Token::Exclamation { .. }) => {
                let position = self.next().expect("peeked token vanished").position();
                Ok(TypeName::Never(position))
            }
            Some(Token::LParen { .. }) => {
                let start = self.next().expect("peeked token vanished").position();
                if let Some(end) = self.eat(|t| matches!(t, Token::RParen { .. })) {
                    return Ok(TypeName::Tuple(vec![], start.merge(&end.position())));
                }
                let first = self.parse_type_name()?;
                if matches!(self.peek(), Some(Token::Comma { .. })) {
                    let mut elements = vec![first];
                    while self.eat(|t| matches!(t, Token::Comma { .. })).is_some() {
                        if matches!(self.peek(), Some(Token::RParen { .. })) {
                            break;
                        }
                        elements.push(self.parse_type_name()?);
                    }
                    let end = self
                        .expect("')'", |t| matches!(t, Token::RParen { .. }))?
                        .position();
                    return Ok(TypeName::Tuple(elements, start.merge(&end)));
                }
                self.expect("')'", |t| matches!(t, Token::RParen { .. }))?;
                Ok(first)
            }
            Some(Token::Id { .. }) => {
                let Some(Token::Id { value, position }) = self.next() else {
                    unreachable!()
                };
                let mut generic_args = vec![];
                let mut full = position.clone();
                if self.eat(|t| matches!(t, Token::LBracket { .. })).is_some() {
                    loop {
                        generic_args.push(self.parse_type_name()?);
                        if self.eat(|t| matches!(t, Token::Comma { .. })).is_none() {
                            break;
                        }
                    }
                    let end = self
                        .expect("']'", |t| matches!(t, Token::RBracket { .. }))?
                        .position();
                    full = full.merge(&end);
                }
                Ok(TypeName::Ident(TypeIdent {
                    name: value,
                    generic_args,
                    res: (),
                    position: full,
                }))
            }
            Some(token) => Err(self.err(format!("expected a type, found '{token}'"))),
            None => Err(self.err("expected a type, found end of file")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{tokenize, IntKind};

    fn parse_items_str(input: &str) -> ParseResult<Vec<Item<Parsed>>> {
        let source = SourceFile::new("test.weft", input);
        let tokens = tokenize(&source).expect("lexes");
        parse_file(&source, tokens, &ErrorSink::new())
    }

    fn parse_expr_str(input: &str) -> ParseResult<Expression<Parsed>> {
        let source = SourceFile::new("test.weft", input);
        let tokens = tokenize(&source).expect("lexes");
        let mut parser = Parser::new(&source, tokens, &ErrorSink::new());
        parser.parse_expression()
    }

    #[test]
    fn test_parse_function_item() -> ParseResult<()> {
        let items = parse_items_str("function main() = (let a: Int = 1; a);")?;

        let Item::Function(f) = &items[0] else {
            panic!("expected function");
        };
        assert_eq!(f.name, "main");
        assert!(f.params.is_empty());
        assert!(f.return_type.is_none());
        assert!(matches!(f.body, Expression::Block(_)));
        Ok(())
    }

    #[test]
    fn test_parse_function_with_signature() -> ParseResult<()> {
        let items = parse_items_str("function add(a: Int, b: Int): Int = a + b;")?;

        let Item::Function(f) = &items[0] else {
            panic!("expected function");
        };
        assert_eq!(f.params.len(), 2);
        assert_eq!(f.params[1].name, "b");
        assert!(f.return_type.is_some());
        Ok(())
    }

    #[test]
    fn test_parse_struct_and_alias() -> ParseResult<()> {
        let items =
            parse_items_str("type Pair = struct { x: Int, y: Int }; type Num = Int;")?;

        let Item::TypeDef(pair) = &items[0] else {
            panic!("expected type def");
        };
        let TypeDefKind::Struct(fields) = &pair.def else {
            panic!("expected struct");
        };
        assert_eq!(fields.len(), 2);

        let Item::TypeDef(alias) = &items[1] else {
            panic!("expected type def");
        };
        assert!(matches!(alias.def, TypeDefKind::Alias(_)));
        Ok(())
    }

    #[test]
    fn test_parse_remaining_items() -> ParseResult<()> {
        let items = parse_items_str(
            "import (\"host\" \"print_raw\") function print_raw(ptr: I32);\n\
             extern mod std;\n\
             mod helpers (function id(x: Int): Int = x;);\n\
             mod disk;\n\
             global mut counter: Int = 0;\n\
             use helpers.id;",
        )?;

        assert!(matches!(&items[0], Item::Import(i) if i.module == "host"));
        assert!(matches!(&items[1], Item::ExternPkg(e) if e.name == "std"));
        assert!(matches!(&items[2], Item::Mod(m) if !m.file_module && m.items.len() == 1));
        assert!(matches!(&items[3], Item::Mod(m) if m.file_module));
        assert!(matches!(&items[4], Item::Global(g) if g.mutable));
        assert!(
            matches!(&items[5], Item::Use(u) if u.segments == vec!["helpers", "id"] && u.name == "id")
        );
        Ok(())
    }

    #[test]
    fn test_parse_paren_forms() -> ParseResult<()> {
        assert!(matches!(parse_expr_str("()")?, Expression::Empty(_)));
        assert!(matches!(parse_expr_str("(1)")?, Expression::Num(_)));
        assert!(
            matches!(parse_expr_str("(1; 2)")?, Expression::Block(b) if b.expressions.len() == 2)
        );
        assert!(
            matches!(parse_expr_str("(1,)")?, Expression::TupleLiteral(t) if t.elements.len() == 1)
        );
        assert!(
            matches!(parse_expr_str("(1, 2, 3)")?, Expression::TupleLiteral(t) if t.elements.len() == 3)
        );
        Ok(())
    }

    #[test]
    fn test_parse_literals() -> ParseResult<()> {
        assert!(
            matches!(parse_expr_str("7_I32")?, Expression::Num(n) if n.kind == IntKind::I32)
        );
        assert!(matches!(parse_expr_str("\"hi\"")?, Expression::AstString(_)));
        Ok(())
    }

    #[test]
    fn test_parse_call_and_field_chain() -> ParseResult<()> {
        let expr = parse_expr_str("m.g(1, 2).x")?;

        let Expression::FieldAccess(access) = expr else {
            panic!("expected field access");
        };
        assert_eq!(access.field, FieldName::Named("x".to_string()));
        let Expression::Call(call) = &access.target else {
            panic!("expected call");
        };
        assert_eq!(call.arguments.len(), 2);
        assert!(matches!(&call.callee, Expression::FieldAccess(_)));
        Ok(())
    }

    #[test]
    fn test_parse_tuple_index_access() -> ParseResult<()> {
        let expr = parse_expr_str("t.0")?;
        let Expression::FieldAccess(access) = expr else {
            panic!("expected field access");
        };
        assert_eq!(access.field, FieldName::Index(0));
        Ok(())
    }

    #[test]
    fn test_parse_if_loop_break() -> ParseResult<()> {
        let expr = parse_expr_str("if a then 1 else 2")?;
        assert!(matches!(expr, Expression::If(_)));

        let expr = parse_expr_str("loop ( break )")?;
        let Expression::Loop(l) = expr else {
            panic!("expected loop");
        };
        assert!(matches!(l.body, Expression::Break(_)));
        Ok(())
    }

    #[test]
    fn test_parse_struct_literal() -> ParseResult<()> {
        let expr = parse_expr_str("Pair { x: 1, y: 2 }")?;
        let Expression::StructLiteral(literal) = expr else {
            panic!("expected struct literal");
        };
        assert_eq!(literal.name.name, "Pair");
        assert_eq!(literal.fields.len(), 2);
        Ok(())
    }

    #[test]
    fn test_same_class_chain_is_fine() {
        let source = SourceFile::new("test.weft", "1 + 2 - 3");
        let tokens = tokenize(&source).expect("lexes");
        let sink = ErrorSink::new();
        let mut parser = Parser::new(&source, tokens, &sink);
        parser.parse_expression().expect("parses");

        assert!(!sink.has_errors());
    }

    #[test]
    fn test_mixed_classes_are_diagnosed() {
        let source = SourceFile::new("test.weft", "1 + 2 * 3");
        let tokens = tokenize(&source).expect("lexes");
        let sink = ErrorSink::new();
        let mut parser = Parser::new(&source, tokens, &sink);
        parser.parse_expression().expect("recovers");

        assert!(sink.has_errors());
    }

    #[test]
    fn test_parse_type_names() -> ParseResult<()> {
        let source = SourceFile::new("test.weft", "*Pair (Int, Bool) () ! List[Int]");
        let tokens = tokenize(&source).expect("lexes");
        let mut parser = Parser::new(&source, tokens, &ErrorSink::new());

        assert!(matches!(parser.parse_type_name()?, TypeName::RawPtr(..)));
        assert!(
            matches!(parser.parse_type_name()?, TypeName::Tuple(els, _) if els.len() == 2)
        );
        assert!(matches!(parser.parse_type_name()?, TypeName::Tuple(els, _) if els.is_empty()));
        assert!(matches!(parser.parse_type_name()?, TypeName::Never(_)));
        assert!(
            matches!(parser.parse_type_name()?, TypeName::Ident(ident) if ident.generic_args.len() == 1)
        );
        Ok(())
    }
}
