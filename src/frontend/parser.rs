//! Parser for MAS-Lang.
//!
//! This module implements a recursive descent parser that converts a stream
//! of tokens into an AST. Parsing stops at the first unexpected token.

use crate::frontend::ast::*;
use crate::frontend::token::{Token, TokenKind, TokenSource};
use crate::utils::errors::{CompileError, CompileResult, SyntaxError};
use crate::utils::location::Span;
use std::mem;
use std::rc::Rc;

/// A parser over any token source.
pub struct Parser<S: TokenSource> {
    source: S,
    current: Token,
    peek: Token,
    previous: Token,
}

impl<S: TokenSource> Parser<S> {
    /// Create a new parser, reading the first two tokens.
    pub fn new(mut source: S) -> CompileResult<Self> {
        let current = source.next_token()?;
        let peek = source.next_token()?;
        Ok(Self {
            source,
            previous: current.clone(),
            current,
            peek,
        })
    }

    /// Parse a complete program.
    pub fn parse_program(&mut self) -> CompileResult<Program> {
        let start = self.current.span;
        let mut statements = Vec::new();

        while !self.is_at_end() {
            self.parse_statement(&mut statements)?;
        }

        Ok(Program::new(statements, start.merge(&self.previous.span)))
    }

    fn parse_block(&mut self) -> CompileResult<Block> {
        let start = self.current.span;
        self.consume(TokenKind::LeftBrace)?;

        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            self.parse_statement(&mut statements)?;
        }

        self.consume(TokenKind::RightBrace)?;
        Ok(Block::new(statements, start.merge(&self.previous.span)))
    }

    /// Parse one source statement. Declarations of several names and
    /// chained assignments expand to several AST statements.
    fn parse_statement(&mut self, out: &mut Vec<Stmt>) -> CompileResult<()> {
        let start = self.current.span;

        let kind = match self.current.kind {
            kind if kind.is_type_keyword() => return self.parse_declaration(out),
            TokenKind::Identifier => return self.parse_assignment_statement(out),
            TokenKind::If => self.parse_if_statement()?,
            TokenKind::For => self.parse_for_statement()?,
            TokenKind::While => self.parse_while_statement()?,
            TokenKind::Print => self.parse_print_statement()?,
            TokenKind::LeftBrace => StmtKind::Block(self.parse_block()?),
            _ => return Err(self.error("statement")),
        };

        out.push(Stmt::new(kind, start.merge(&self.previous.span)));
        Ok(())
    }

    fn parse_type(&mut self) -> CompileResult<Type> {
        let ty = match self.current.kind {
            TokenKind::Int => Type::Int,
            TokenKind::FloatType => Type::Float,
            TokenKind::Bool => Type::Bool,
            TokenKind::CharType => Type::Char,
            TokenKind::StringType => Type::String,
            TokenKind::Array => Type::Array,
            _ => return Err(self.error("type")),
        };
        self.advance()?;
        Ok(ty)
    }

    fn parse_declaration(&mut self, out: &mut Vec<Stmt>) -> CompileResult<()> {
        let ty = self.parse_type()?;

        loop {
            let start = self.current.span;
            let name = self.consume_identifier()?;
            let init = if self.match_token(TokenKind::Equal)? {
                Some(self.parse_expression()?)
            } else {
                None
            };
            out.push(Stmt::new(
                StmtKind::VarDecl { name, ty, init },
                start.merge(&self.previous.span),
            ));
            if !self.match_token(TokenKind::Comma)? {
                break;
            }
        }

        self.consume(TokenKind::Semicolon)?;
        Ok(())
    }

    fn parse_assignment_statement(&mut self, out: &mut Vec<Stmt>) -> CompileResult<()> {
        let mut chain = Vec::new();
        let assign = self.parse_assign_clause(Some(&mut chain))?;
        self.consume(TokenKind::Semicolon)?;

        chain.push(assign);
        out.extend(chain.into_iter().map(Stmt::assign));
        Ok(())
    }

    /// Parse `name op value`, `name++` or `name--`.
    ///
    /// With `chain`, a right-hand side that is itself an assignment
    /// (`a = b = e`) is parsed recursively; the inner assignments are pushed
    /// to `chain` in execution order and the outer one reads their target.
    fn parse_assign_clause(&mut self, chain: Option<&mut Vec<Assign>>) -> CompileResult<Assign> {
        let start = self.current.span;
        let target = self.consume_identifier()?;
        let target_expr = Expr::ident(target.clone(), self.previous.span);

        let op = match self.current.kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::AddAssign,
            TokenKind::MinusEqual => AssignOp::SubAssign,
            TokenKind::StarEqual => AssignOp::MulAssign,
            TokenKind::SlashEqual => AssignOp::DivAssign,
            TokenKind::PercentEqual => AssignOp::ModAssign,
            TokenKind::PlusPlus => AssignOp::Increment,
            TokenKind::MinusMinus => AssignOp::Decrement,
            _ => return Err(self.error("assignment operator")),
        };
        self.advance()?;

        let rhs = match op {
            AssignOp::Increment | AssignOp::Decrement => Expr::int_lit(1, self.previous.span),
            _ => match chain {
                Some(chain) if self.check(TokenKind::Identifier) && Self::is_chainable(self.peek.kind) => {
                    let inner_span = self.current.span;
                    let inner = self.parse_assign_clause(Some(&mut *chain))?;
                    let rhs = Expr::ident(inner.target.clone(), inner_span);
                    chain.push(inner);
                    rhs
                }
                _ => self.parse_expression()?,
            },
        };

        let value = match op.binary_op() {
            Some(bop) => Expr::binary(bop, target_expr, rhs),
            None => rhs,
        };

        Ok(Assign { target, op, value, span: start.merge(&self.previous.span) })
    }

    fn is_chainable(kind: TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
        )
    }

    fn parse_condition(&mut self) -> CompileResult<Expr> {
        self.consume(TokenKind::LeftParen)?;
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RightParen)?;
        Ok(condition)
    }

    fn parse_if_statement(&mut self) -> CompileResult<StmtKind> {
        self.consume(TokenKind::If)?;
        let condition = self.parse_condition()?;
        let then_block = self.parse_block()?;

        let mut else_ifs = Vec::new();
        let mut else_block = None;
        while self.check(TokenKind::Else) {
            let start = self.current.span;
            self.advance()?;
            if self.match_token(TokenKind::If)? {
                let condition = self.parse_condition()?;
                let block = self.parse_block()?;
                else_ifs.push(ElseIf { condition, block, span: start.merge(&self.previous.span) });
            } else {
                else_block = Some(self.parse_block()?);
                break;
            }
        }

        Ok(StmtKind::If { condition, then_block, else_ifs, else_block })
    }

    fn parse_for_statement(&mut self) -> CompileResult<StmtKind> {
        self.consume(TokenKind::For)?;
        self.consume(TokenKind::LeftParen)?;

        let init_ty = if self.current.kind.is_type_keyword() {
            Some(self.parse_type()?)
        } else {
            None
        };
        let start = self.current.span;
        let target = self.consume_identifier()?;
        self.consume(TokenKind::Equal)?;
        let value = self.parse_expression()?;
        let init = Assign::new(target, value, start.merge(&self.previous.span));
        self.consume(TokenKind::Semicolon)?;

        let condition = self.parse_expression()?;
        self.consume(TokenKind::Semicolon)?;

        let update = self.parse_assign_clause(None)?;
        self.consume(TokenKind::RightParen)?;

        let body = self.parse_block()?;
        Ok(StmtKind::For { init_ty, init, condition, update, body })
    }

    fn parse_while_statement(&mut self) -> CompileResult<StmtKind> {
        self.consume(TokenKind::While)?;
        let condition = self.parse_condition()?;
        let body = self.parse_block()?;
        Ok(StmtKind::While { condition, body })
    }

    fn parse_print_statement(&mut self) -> CompileResult<StmtKind> {
        self.consume(TokenKind::Print)?;
        let value = self.parse_condition()?;
        self.consume(TokenKind::Semicolon)?;
        Ok(StmtKind::Print(value))
    }

    // Expressions, lowest precedence first
    fn parse_expression(&mut self) -> CompileResult<Expr> {
        self.parse_or_expr()
    }

    fn parse_or_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_and_expr()?;
        while self.match_token(TokenKind::Or)? || self.match_token(TokenKind::PipePipe)? {
            let right = self.parse_and_expr()?;
            left = Expr::compare(CompareOp::Or, left, right);
        }
        Ok(left)
    }

    fn parse_and_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_equality_expr()?;
        while self.match_token(TokenKind::And)? || self.match_token(TokenKind::AmpAmp)? {
            let right = self.parse_equality_expr()?;
            left = Expr::compare(CompareOp::And, left, right);
        }
        Ok(left)
    }

    fn parse_equality_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_relational_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::EqualEqual => CompareOp::Eq,
                TokenKind::BangEqual => CompareOp::Ne,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_relational_expr()?;
            left = Expr::compare(op, left, right);
        }
        Ok(left)
    }

    fn parse_relational_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_additive_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Less => CompareOp::Lt,
                TokenKind::LessEqual => CompareOp::Le,
                TokenKind::Greater => CompareOp::Gt,
                TokenKind::GreaterEqual => CompareOp::Ge,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_additive_expr()?;
            left = Expr::compare(op, left, right);
        }
        Ok(left)
    }

    fn parse_additive_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_multiplicative_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_multiplicative_expr()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_multiplicative_expr(&mut self) -> CompileResult<Expr> {
        let mut left = self.parse_unary_expr()?;
        loop {
            let op = match self.current.kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Mod,
                _ => break,
            };
            self.advance()?;
            let right = self.parse_unary_expr()?;
            left = Expr::binary(op, left, right);
        }
        Ok(left)
    }

    fn parse_unary_expr(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;
        let op = match self.current.kind {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Not | TokenKind::Bang => UnaryOp::Not,
            TokenKind::PlusPlus => UnaryOp::Increment,
            TokenKind::MinusMinus => UnaryOp::Decrement,
            TokenKind::Plus => {
                self.advance()?;
                return self.parse_unary_expr();
            }
            _ => return self.parse_power_expr(),
        };
        self.advance()?;

        let operand = self.parse_unary_expr()?;
        let span = start.merge(&operand.span);

        // Negative literals are literals, not negations
        let folded = match (op, &operand.kind) {
            (UnaryOp::Neg, ExprKind::IntLiteral(n)) => Some(ExprKind::IntLiteral(-n)),
            (UnaryOp::Neg, ExprKind::FloatLiteral(x)) => Some(ExprKind::FloatLiteral(-x)),
            _ => None,
        };
        Ok(match folded {
            Some(kind) => Expr::new(kind, span),
            None => Expr::unary(op, operand, span),
        })
    }

    /// `base ^ exponent`, right-associative. The exponent may carry a sign.
    fn parse_power_expr(&mut self) -> CompileResult<Expr> {
        let base = self.parse_primary_expr()?;
        if self.match_token(TokenKind::Caret)? {
            let exponent = self.parse_unary_expr()?;
            return Ok(Expr::binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn parse_primary_expr(&mut self) -> CompileResult<Expr> {
        let start = self.current.span;

        match self.current.kind {
            TokenKind::Integer => {
                let value: i64 = self
                    .current
                    .lexeme
                    .parse()
                    .map_err(|_| self.error("integer literal within 64-bit range"))?;
                self.advance()?;
                Ok(Expr::int_lit(value, start))
            }
            TokenKind::Float => {
                let value = self
                    .current
                    .lexeme
                    .parse::<f64>()
                    .ok()
                    .filter(|x| x.is_finite())
                    .ok_or_else(|| self.error("finite float literal"))?;
                self.advance()?;
                Ok(Expr::float_lit(value, start))
            }
            TokenKind::True | TokenKind::False => {
                let value = self.check(TokenKind::True);
                self.advance()?;
                Ok(Expr::new(ExprKind::BoolLiteral(value), start))
            }
            TokenKind::String => {
                let value = mem::take(&mut self.current.lexeme);
                self.advance()?;
                Ok(Expr::new(ExprKind::StringLiteral(value), start))
            }
            TokenKind::Char => {
                let value = self.current.lexeme.chars().next().ok_or_else(|| self.error("char literal"))?;
                self.advance()?;
                Ok(Expr::new(ExprKind::CharLiteral(value), start))
            }
            TokenKind::Identifier => {
                let name = self.consume_identifier()?;
                if self.match_token(TokenKind::LeftBracket)? {
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RightBracket)?;
                    Ok(Expr::new(
                        ExprKind::ArrayAccess { array: name, index: Box::new(index) },
                        start.merge(&self.previous.span),
                    ))
                } else {
                    Ok(Expr::ident(name, start))
                }
            }
            TokenKind::LeftParen => {
                self.advance()?;
                let mut inner = self.parse_expression()?;
                self.consume(TokenKind::RightParen)?;
                inner.span = start.merge(&self.previous.span);
                Ok(inner)
            }
            TokenKind::LeftBracket => {
                self.advance()?;
                let mut elements = Vec::new();
                if !self.check(TokenKind::RightBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.match_token(TokenKind::Comma)? {
                            break;
                        }
                    }
                }
                self.consume(TokenKind::RightBracket)?;
                Ok(Expr::new(ExprKind::ArrayLiteral(elements), start.merge(&self.previous.span)))
            }
            TokenKind::Abs | TokenKind::Length | TokenKind::Min | TokenKind::Max => {
                let op = match self.current.kind {
                    TokenKind::Abs => UnaryOp::Abs,
                    TokenKind::Length => UnaryOp::Length,
                    TokenKind::Min => UnaryOp::Min,
                    _ => UnaryOp::Max,
                };
                self.advance()?;
                let operand = self.parse_condition()?;
                Ok(Expr::unary(op, operand, start.merge(&self.previous.span)))
            }
            TokenKind::Concat | TokenKind::Pow | TokenKind::Index => {
                let op = match self.current.kind {
                    TokenKind::Concat => BinaryOp::Concat,
                    TokenKind::Pow => BinaryOp::Pow,
                    _ => BinaryOp::Index,
                };
                self.advance()?;
                self.consume(TokenKind::LeftParen)?;
                let left = self.parse_expression()?;
                self.consume(TokenKind::Comma)?;
                let right = self.parse_expression()?;
                self.consume(TokenKind::RightParen)?;
                let mut expr = Expr::binary(op, left, right);
                expr.span = start.merge(&self.previous.span);
                Ok(expr)
            }
            _ => Err(self.error("expression")),
        }
    }

    // Helper methods
    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn is_at_end(&self) -> bool {
        self.current.is_eof()
    }

    fn advance(&mut self) -> CompileResult<()> {
        let next = self.source.next_token()?;
        let current = mem::replace(&mut self.peek, next);
        self.previous = mem::replace(&mut self.current, current);
        Ok(())
    }

    fn consume(&mut self, kind: TokenKind) -> CompileResult<()> {
        if self.check(kind) {
            self.advance()
        } else {
            Err(self.error(kind.to_string()))
        }
    }

    fn consume_identifier(&mut self) -> CompileResult<Name> {
        if self.check(TokenKind::Identifier) {
            let name: Name = Rc::from(self.current.lexeme.as_str());
            self.advance()?;
            Ok(name)
        } else {
            Err(self.error("identifier"))
        }
    }

    fn match_token(&mut self, kind: TokenKind) -> CompileResult<bool> {
        if self.check(kind) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn error(&self, expected: impl Into<String>) -> CompileError {
        CompileError::Syntax(SyntaxError {
            expected: expected.into(),
            found: self.current.kind,
            found_lexeme: self.current.lexeme.clone(),
            span: self.current_span(),
        })
    }

    fn current_span(&self) -> Span {
        self.current.span
    }
}
