//! Parser for compiled templates
//!
//! Consumes the token stream the compiler assembles from a template (literal
//! text, output directives, and the code of evaluate directives) and builds a
//! single [`Program`]. Because the whole template is parsed as one program, a
//! block opened in one evaluate directive can be closed in a later one.

use super::ast::*;
use super::error::{SyntaxError, TemplateError, TemplateSource, UnclosedError};
use super::lexer::{Token, TokenKind};
use std::mem::discriminant;

type Result<T> = std::result::Result<T, TemplateError>;

/// Parser state
pub struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    source: &'a TemplateSource,
    /// Number of enclosing loops (for `break` / `continue` checks)
    loop_depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(mut tokens: Vec<Token>, source: &'a TemplateSource) -> Self {
        if !matches!(tokens.last().map(|t| &t.kind), Some(TokenKind::Eof)) {
            tokens.push(Token::new(TokenKind::Eof, source.source.len(), 0));
        }
        Self {
            tokens,
            pos: 0,
            source,
            loop_depth: 0,
        }
    }

    /// Parse the full template
    pub fn parse(mut self) -> Result<Program> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_statement()?);
        }
        Ok(Program {
            body,
            span: span(0, self.source.source.len()),
        })
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self, ahead: usize) -> &TokenKind {
        let index = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn previous_span(&self) -> Span {
        self.tokens[self.pos.saturating_sub(1)].span
    }

    fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if !self.is_at_end() {
            self.pos += 1;
        }
        token
    }

    fn check(&self, kind: &TokenKind) -> bool {
        discriminant(&self.current().kind) == discriminant(kind)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&kind.describe()))
        }
    }

    fn expect_ident(&mut self) -> Result<Ident> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let ident = Ident {
                    name: name.clone(),
                    span: self.current().span,
                };
                self.advance();
                Ok(ident)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> TemplateError {
        let token = self.current();
        SyntaxError {
            found: token.kind.describe(),
            expected: expected.to_string(),
            span: token.span,
            src: self.source.named_source(),
        }
        .into()
    }

    fn syntax_error(&self, found: &str, expected: &str, at: Span) -> TemplateError {
        SyntaxError {
            found: found.to_string(),
            expected: expected.to_string(),
            span: at,
            src: self.source.named_source(),
        }
        .into()
    }

    /// End of a simple statement: `;`, or implied before `}` and at the end
    fn consume_terminator(&mut self) -> Result<()> {
        match self.current().kind {
            TokenKind::Semi => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("`;`")),
        }
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn parse_statement(&mut self) -> Result<Stmt> {
        let start = self.current().span;

        match &self.current().kind {
            TokenKind::Text(text) => {
                let text = text.clone();
                self.advance();
                Ok(Stmt::Text(TextStmt { text, span: start }))
            }
            TokenKind::OutputOpen { escape } => {
                let escape = *escape;
                self.parse_output(escape, start)
            }
            TokenKind::LBrace => Ok(Stmt::Block(self.parse_block()?)),
            TokenKind::Var | TokenKind::Let | TokenKind::Const => {
                let decl = self.parse_decl()?;
                self.consume_terminator()?;
                Ok(Stmt::Decl(decl))
            }
            TokenKind::If => self.parse_if(start),
            TokenKind::For => self.parse_for(start),
            TokenKind::While => self.parse_while(start),
            TokenKind::Break | TokenKind::Continue => {
                let token = self.advance();
                if self.loop_depth == 0 {
                    return Err(self.syntax_error(
                        &token.kind.describe(),
                        "a statement (`break` and `continue` must be inside a loop)",
                        token.span,
                    ));
                }
                self.consume_terminator()?;
                Ok(if matches!(token.kind, TokenKind::Break) {
                    Stmt::Break(token.span)
                } else {
                    Stmt::Continue(token.span)
                })
            }
            TokenKind::Throw => {
                self.advance();
                let value = self.parse_expr()?;
                let span = join(start, value.span());
                self.consume_terminator()?;
                Ok(Stmt::Throw(ThrowStmt { value, span }))
            }
            TokenKind::Semi => {
                self.advance();
                Ok(Stmt::Empty(start))
            }
            TokenKind::RBrace => Err(self.unexpected("a statement")),
            _ => {
                let expr = self.parse_expr()?;
                let span = expr.span();
                self.consume_terminator()?;
                Ok(Stmt::Expr(ExprStmt { expr, span }))
            }
        }
    }

    /// Interpolate / escape directive
    fn parse_output(&mut self, escape: bool, start: Span) -> Result<Stmt> {
        self.advance(); // OutputOpen
        let expr = self.parse_expr()?;
        if !self.check(&TokenKind::OutputClose) {
            return Err(self.unexpected("end of directive"));
        }
        let end = self.advance().span;
        Ok(Stmt::Output(OutputStmt {
            expr,
            escape,
            span: join(start, end),
        }))
    }

    fn parse_block(&mut self) -> Result<BlockStmt> {
        let open = self.expect(&TokenKind::LBrace)?.span;
        let mut body = Vec::new();

        loop {
            if self.is_at_end() {
                return Err(UnclosedError {
                    kind: "block".to_string(),
                    close_delim: "}".to_string(),
                    open_span: open,
                    src: self.source.named_source(),
                }
                .into());
            }
            if self.check(&TokenKind::RBrace) {
                break;
            }
            body.push(self.parse_statement()?);
        }

        let close = self.advance().span;
        Ok(BlockStmt {
            body,
            span: join(open, close),
        })
    }

    /// `var a = 1, b` (without the terminator)
    fn parse_decl(&mut self) -> Result<DeclStmt> {
        let keyword = self.advance();
        let kind = match keyword.kind {
            TokenKind::Let => DeclKind::Let,
            TokenKind::Const => DeclKind::Const,
            _ => DeclKind::Var,
        };

        let mut declarators = Vec::new();
        loop {
            let name = self.expect_ident()?;
            let init = if self.eat(&TokenKind::Assign) {
                Some(self.parse_assignment()?)
            } else if kind == DeclKind::Const {
                return Err(self.unexpected("`=` (const declarations need a value)"));
            } else {
                None
            };
            declarators.push(Declarator { name, init });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        Ok(DeclStmt {
            kind,
            declarators,
            span: join(keyword.span, self.previous_span()),
        })
    }

    fn parse_if(&mut self, start: Span) -> Result<Stmt> {
        self.expect(&TokenKind::If)?;
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;

        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Stmt::If(IfStmt {
            condition,
            then_branch,
            else_branch,
            span: join(start, self.previous_span()),
        }))
    }

    fn parse_for(&mut self, start: Span) -> Result<Stmt> {
        self.expect(&TokenKind::For)?;
        self.expect(&TokenKind::LParen)?;

        // for (x of xs) / for (var x in obj)
        let binding_at = match (self.peek_kind(0), self.peek_kind(1), self.peek_kind(2)) {
            (TokenKind::Var | TokenKind::Let | TokenKind::Const, TokenKind::Ident(_), TokenKind::Of | TokenKind::In) => Some(1),
            (TokenKind::Ident(_), TokenKind::Of | TokenKind::In, _) => Some(0),
            _ => None,
        };
        if let Some(skip) = binding_at {
            for _ in 0..skip {
                self.advance();
            }
            return self.parse_for_each(start);
        }

        let init = if self.check(&TokenKind::Semi) {
            None
        } else if matches!(
            self.current().kind,
            TokenKind::Var | TokenKind::Let | TokenKind::Const
        ) {
            Some(Box::new(Stmt::Decl(self.parse_decl()?)))
        } else {
            let expr = self.parse_expr()?;
            let span = expr.span();
            Some(Box::new(Stmt::Expr(ExprStmt { expr, span })))
        };
        self.expect(&TokenKind::Semi)?;

        let condition = if self.check(&TokenKind::Semi) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::Semi)?;

        let update = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(&TokenKind::RParen)?;

        let body = Box::new(self.parse_loop_body()?);

        Ok(Stmt::For(ForStmt {
            init,
            condition,
            update,
            body,
            span: join(start, self.previous_span()),
        }))
    }

    /// Rest of `for (x of xs) body`, positioned at the binding name
    fn parse_for_each(&mut self, start: Span) -> Result<Stmt> {
        let binding = self.expect_ident()?;
        let kind = match self.advance().kind {
            TokenKind::Of => IterKind::Of,
            _ => IterKind::In,
        };
        let iter = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_loop_body()?);

        Ok(Stmt::ForEach(ForEachStmt {
            binding,
            kind,
            iter,
            body,
            span: join(start, self.previous_span()),
        }))
    }

    fn parse_while(&mut self, start: Span) -> Result<Stmt> {
        self.expect(&TokenKind::While)?;
        self.expect(&TokenKind::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(&TokenKind::RParen)?;
        let body = Box::new(self.parse_loop_body()?);

        Ok(Stmt::While(WhileStmt {
            condition,
            body,
            span: join(start, self.previous_span()),
        }))
    }

    fn parse_loop_body(&mut self) -> Result<Stmt> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }

    // ========================================================================
    // Expression parsing (precedence climbing)
    // ========================================================================

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        let target = self.parse_conditional()?;

        let op = match self.current().kind {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            _ => return Ok(target),
        };

        if !target.is_assignable() {
            return Err(self.syntax_error(
                "assignment",
                "a variable, property or index on the left of the assignment",
                target.span(),
            ));
        }

        self.advance();
        let value = self.parse_assignment()?;
        let span = join(target.span(), value.span());
        Ok(Expr::Assign(AssignExpr {
            target: Box::new(target),
            op,
            value: Box::new(value),
            span,
        }))
    }

    fn parse_conditional(&mut self) -> Result<Expr> {
        let condition = self.parse_or()?;

        if !self.eat(&TokenKind::Question) {
            return Ok(condition);
        }
        let then = self.parse_assignment()?;
        self.expect(&TokenKind::Colon)?;
        let otherwise = self.parse_assignment()?;

        let span = join(condition.span(), otherwise.span());
        Ok(Expr::Conditional(ConditionalExpr {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
            span,
        }))
    }

    /// Parse a left-associative chain of binary operators
    fn parse_binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr>,
        op_for: fn(&TokenKind) -> Option<BinaryOp>,
    ) -> Result<Expr> {
        let mut left = next(self)?;

        while let Some(op) = op_for(&self.current().kind) {
            self.advance();
            let right = next(self)?;
            let span = join(left.span(), right.span());
            left = Expr::Binary(BinaryExpr {
                left: Box::new(left),
                op,
                right: Box::new(right),
                span,
            });
        }

        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_and, |kind| match kind {
            TokenKind::OrOr => Some(BinaryOp::Or),
            _ => None,
        })
    }

    fn parse_and(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_equality, |kind| match kind {
            TokenKind::AndAnd => Some(BinaryOp::And),
            _ => None,
        })
    }

    fn parse_equality(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_relational, |kind| match kind {
            TokenKind::Eq => Some(BinaryOp::Eq),
            TokenKind::Ne => Some(BinaryOp::Ne),
            TokenKind::StrictEq => Some(BinaryOp::StrictEq),
            TokenKind::StrictNe => Some(BinaryOp::StrictNe),
            _ => None,
        })
    }

    fn parse_relational(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_additive, |kind| match kind {
            TokenKind::Lt => Some(BinaryOp::Lt),
            TokenKind::Le => Some(BinaryOp::Le),
            TokenKind::Gt => Some(BinaryOp::Gt),
            TokenKind::Ge => Some(BinaryOp::Ge),
            _ => None,
        })
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_multiplicative, |kind| match kind {
            TokenKind::Plus => Some(BinaryOp::Add),
            TokenKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn parse_multiplicative(&mut self) -> Result<Expr> {
        self.parse_binary_level(Self::parse_unary, |kind| match kind {
            TokenKind::Star => Some(BinaryOp::Mul),
            TokenKind::Slash => Some(BinaryOp::Div),
            TokenKind::Percent => Some(BinaryOp::Mod),
            _ => None,
        })
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let start = self.current().span;

        let op = match self.current().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Neg),
            TokenKind::Plus => Some(UnaryOp::Pos),
            TokenKind::Typeof => Some(UnaryOp::TypeOf),
            TokenKind::Increment | TokenKind::Decrement => {
                let update = if self.advance().kind == TokenKind::Increment {
                    UpdateOp::Increment
                } else {
                    UpdateOp::Decrement
                };
                let target = self.parse_unary()?;
                return self.update_expr(update, true, target, start);
            }
            _ => None,
        };

        let Some(op) = op else {
            return self.parse_postfix();
        };

        self.advance();
        let expr = self.parse_unary()?;
        let span = join(start, expr.span());
        Ok(Expr::Unary(UnaryExpr {
            op,
            expr: Box::new(expr),
            span,
        }))
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let expr = self.parse_call_member()?;

        let op = match self.current().kind {
            TokenKind::Increment => UpdateOp::Increment,
            TokenKind::Decrement => UpdateOp::Decrement,
            _ => return Ok(expr),
        };
        let start = expr.span();
        self.advance();
        self.update_expr(op, false, expr, start)
    }

    fn update_expr(&mut self, op: UpdateOp, prefix: bool, target: Expr, start: Span) -> Result<Expr> {
        if !target.is_assignable() {
            return Err(self.syntax_error(
                if op == UpdateOp::Increment { "`++`" } else { "`--`" },
                "a variable, property or index as the operand",
                target.span(),
            ));
        }
        let span = join(start, self.previous_span());
        Ok(Expr::Update(UpdateExpr {
            op,
            prefix,
            target: Box::new(target),
            span,
        }))
    }

    fn parse_call_member(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;

        loop {
            match self.current().kind {
                TokenKind::Dot => {
                    self.advance();
                    let property = self.expect_property_name()?;
                    let span = join(expr.span(), property.span);
                    expr = Expr::Member(MemberExpr {
                        base: Box::new(expr),
                        property,
                        span,
                    });
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    let end = self.expect(&TokenKind::RBracket)?.span;
                    let span = join(expr.span(), end);
                    expr = Expr::Index(IndexExpr {
                        base: Box::new(expr),
                        index: Box::new(index),
                        span,
                    });
                }
                TokenKind::LParen => {
                    let (args, end) = self.parse_args()?;
                    let span = join(expr.span(), end);
                    expr = Expr::Call(CallExpr {
                        callee: Box::new(expr),
                        args,
                        span,
                    });
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    /// `(a, b, c)`; returns the arguments and the span of `)`
    fn parse_args(&mut self) -> Result<(Vec<Expr>, Span)> {
        self.expect(&TokenKind::LParen)?;
        let mut args = Vec::new();
        while !self.check(&TokenKind::RParen) {
            args.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(&TokenKind::RParen)?.span;
        Ok((args, end))
    }

    /// Property names after `.` may be keywords (`x.new`, `item.default`)
    fn expect_property_name(&mut self) -> Result<Ident> {
        let token = self.current().clone();
        let name = match &token.kind {
            TokenKind::Ident(name) => name.clone(),
            kind => {
                let described = kind.describe();
                match described.strip_prefix('`').and_then(|s| s.strip_suffix('`')) {
                    Some(word) if word.chars().all(|c| c.is_ascii_alphabetic()) => {
                        word.to_string()
                    }
                    _ => return Err(self.unexpected("property name")),
                }
            }
        };
        self.advance();
        Ok(Ident {
            name,
            span: token.span,
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let token = self.current().clone();
        let literal = |value| {
            Ok(Expr::Literal(Literal {
                value,
                span: token.span,
            }))
        };

        match &token.kind {
            TokenKind::Number(n) => {
                self.advance();
                literal(LiteralValue::Number(*n))
            }
            TokenKind::String(s) => {
                self.advance();
                literal(LiteralValue::String(s.clone()))
            }
            TokenKind::True | TokenKind::False => {
                self.advance();
                literal(LiteralValue::Bool(matches!(token.kind, TokenKind::True)))
            }
            TokenKind::Null => {
                self.advance();
                literal(LiteralValue::Null)
            }
            TokenKind::Undefined => {
                self.advance();
                literal(LiteralValue::Undefined)
            }
            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Var(Ident {
                    name: name.clone(),
                    span: token.span,
                }))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array(),
            TokenKind::LBrace => self.parse_object(),
            TokenKind::New => {
                self.advance();
                let constructor = self.expect_ident()?;
                let (args, end) = if self.check(&TokenKind::LParen) {
                    self.parse_args()?
                } else {
                    (Vec::new(), constructor.span)
                };
                Ok(Expr::New(NewExpr {
                    constructor,
                    args,
                    span: join(token.span, end),
                }))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_array(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LBracket)?.span;
        let mut elements = Vec::new();
        while !self.check(&TokenKind::RBracket) {
            elements.push(self.parse_assignment()?);
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        let close = self.expect(&TokenKind::RBracket)?.span;
        Ok(Expr::Array(ArrayExpr {
            elements,
            span: join(open, close),
        }))
    }

    fn parse_object(&mut self) -> Result<Expr> {
        let open = self.expect(&TokenKind::LBrace)?.span;
        let mut entries = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            let key_token = self.current().clone();
            let key = match &key_token.kind {
                TokenKind::String(s) => {
                    self.advance();
                    s.clone()
                }
                TokenKind::Number(n) => {
                    self.advance();
                    super::value::format_number(*n)
                }
                _ => self.expect_property_name()?.name,
            };

            let value = if self.eat(&TokenKind::Colon) {
                self.parse_assignment()?
            } else if matches!(key_token.kind, TokenKind::Ident(_)) {
                // Shorthand `{ name }`
                Expr::Var(Ident {
                    name: key.clone(),
                    span: key_token.span,
                })
            } else {
                return Err(self.unexpected("`:`"));
            };
            entries.push((key, value));

            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }

        let close = self.expect(&TokenKind::RBrace)?.span;
        Ok(Expr::Object(ObjectExpr {
            entries,
            span: join(open, close),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::lexer::Lexer;

    /// Parse a single code fragment as a whole program
    fn parse(code: &str) -> Result<Program> {
        let source = TemplateSource::new("test", code);
        let tokens: Vec<Token> = Lexer::new(code, 0).collect();
        Parser::new(tokens, &source).parse()
    }

    fn parse_expr(code: &str) -> Expr {
        let program = parse(code).unwrap();
        match program.body.into_iter().next() {
            Some(Stmt::Expr(stmt)) => stmt.expr,
            other => panic!("expected expression statement, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expr("1 + 2 * 3");
        let Expr::Binary(add) = expr else {
            panic!("expected binary");
        };
        assert_eq!(add.op, BinaryOp::Add);
        assert!(matches!(*add.right, Expr::Binary(BinaryExpr { op: BinaryOp::Mul, .. })));
    }

    #[test]
    fn test_member_call_chain() {
        let expr = parse_expr("g.h.p(title, {class: 'x'})");
        let Expr::Call(call) = expr else {
            panic!("expected call");
        };
        assert_eq!(call.args.len(), 2);
        assert!(matches!(*call.callee, Expr::Member(_)));
        assert!(matches!(call.args[1], Expr::Object(_)));
    }

    #[test]
    fn test_c_style_for() {
        let program = parse("for (var i = 0; i < 3; i++) { print(i); }").unwrap();
        let Stmt::For(for_stmt) = &program.body[0] else {
            panic!("expected for");
        };
        assert!(for_stmt.init.is_some());
        assert!(for_stmt.condition.is_some());
        assert!(matches!(for_stmt.update, Some(Expr::Update(_))));
    }

    #[test]
    fn test_for_of_and_in() {
        let program = parse("for (var x of xs) {} for (k in obj) {}").unwrap();
        assert!(matches!(&program.body[0], Stmt::ForEach(f) if f.kind == IterKind::Of));
        assert!(matches!(&program.body[1], Stmt::ForEach(f) if f.kind == IterKind::In));
    }

    #[test]
    fn test_if_else_chain() {
        let program = parse("if (a) { x(); } else if (b) { y(); } else { z(); }").unwrap();
        let Stmt::If(if_stmt) = &program.body[0] else {
            panic!("expected if");
        };
        assert!(matches!(if_stmt.else_branch.as_deref(), Some(Stmt::If(_))));
    }

    #[test]
    fn test_unclosed_block() {
        let err = parse("if (a) { x();").unwrap_err();
        assert!(matches!(err, TemplateError::Unclosed(_)));
    }

    #[test]
    fn test_stray_closing_brace() {
        let err = parse("x(); }").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
    }

    #[test]
    fn test_break_outside_loop() {
        assert!(parse("break;").is_err());
        assert!(parse("while (true) { break; }").is_ok());
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse("1 = 2;").is_err());
        assert!(parse("a.b = 2;").is_ok());
    }

    #[test]
    fn test_missing_semicolon() {
        let err = parse("a = 1 b = 2").unwrap_err();
        assert!(matches!(err, TemplateError::Syntax(_)));
    }

    #[test]
    fn test_lexer_error_surfaces() {
        let err = parse("x = 'abc").unwrap_err();
        let TemplateError::Syntax(syntax) = err else {
            panic!("expected syntax error");
        };
        assert_eq!(syntax.found, "unclosed string");
    }

    #[test]
    fn test_const_needs_value() {
        assert!(parse("const a;").is_err());
        assert!(parse("const a = 1, b = 2;").is_ok());
    }
}
