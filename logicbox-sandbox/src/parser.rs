//! Recursive-descent parser for script lines
//!
//! Precedence, loosest first: lambda and conditional expressions, `or`,
//! `and`, `not`, comparisons, `|`, `^`, `&`, shifts, `+ -`,
//! `* / // %`, unary `+ - ~`, `**`, then calls, subscripts and attributes.

use crate::ast::{
    Arg, BinOp, BoolOp, CmpOp, Comprehension, Expr, Index, LambdaDef, Param, Stmt, Target,
    UnaryOp,
};
use crate::error::SyntaxError;
use crate::lexer::{tokenize, Token, TokenKind};
use std::rc::Rc;

/// Deepest bracket or operator nesting accepted on one line
pub const MAX_NESTING: usize = 100;

type PResult<T> = Result<T, SyntaxError>;

/// Parse a preparatory line: one or more `;`-separated statements
pub fn parse_statements(text: &str, line: usize) -> PResult<Vec<Stmt>> {
    let mut parser = Parser::new(text, line)?;
    let mut statements = Vec::new();
    loop {
        if parser.at(&TokenKind::Eof) {
            break;
        }
        statements.push(parser.statement()?);
        if parser.at(&TokenKind::Semicolon) {
            parser.advance();
            continue;
        }
        parser.expect_end()?;
        break;
    }
    Ok(statements)
}

/// Parse the trailing line, which must be a single expression
pub fn parse_expression(text: &str, line: usize) -> PResult<Expr> {
    let mut parser = Parser::new(text, line)?;
    let expr = parser.expression_list()?;
    let token = parser.current().clone();
    match token.kind {
        TokenKind::Eof => Ok(expr),
        TokenKind::Assign => Err(parser.error_at(
            "assignment is not allowed in the final expression",
            &token,
        )),
        ref kind if kind.is_augmented_assign() => Err(parser.error_at(
            "assignment is not allowed in the final expression",
            &token,
        )),
        TokenKind::Semicolon => Err(parser.error_at(
            "';' separates statements and cannot appear in the final expression",
            &token,
        )),
        _ => Err(parser.unexpected(&token)),
    }
}

struct Parser<'a> {
    text: &'a str,
    line: usize,
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str, line: usize) -> PResult<Self> {
        Ok(Self {
            text,
            line,
            tokens: tokenize(text, line)?,
            pos: 0,
            depth: 0,
        })
    }

    // Token cursor

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_next(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos + 1).map(|t| &t.kind)
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(&kind) {
            return Ok(self.advance());
        }
        let found = self.current().clone();
        let message = match found.kind {
            TokenKind::Eof => format!("expected '{}' before end of line", kind_text(&kind)),
            ref other => format!(
                "expected '{}' but found {}",
                kind_text(&kind),
                other.describe()
            ),
        };
        Err(self.error_at(message, &found))
    }

    fn expect_name(&mut self) -> PResult<String> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Name(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    fn expect_end(&mut self) -> PResult<()> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected(&token)),
        }
    }

    // Errors

    fn error_at(&self, message: impl Into<String>, token: &Token) -> SyntaxError {
        SyntaxError::at(message, self.text, self.line, token.span.start)
    }

    fn error_here(&self, message: impl Into<String>) -> SyntaxError {
        self.error_at(message, self.current())
    }

    fn unexpected(&self, token: &Token) -> SyntaxError {
        match &token.kind {
            TokenKind::Reserved(word) => {
                self.error_at(format!("'{}' is not allowed in scripts", word), token)
            }
            TokenKind::Eof => self.error_at("unexpected end of line", token),
            other => self.error_at(format!("invalid syntax near {}", other.describe()), token),
        }
    }

    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("expression is nested too deeply"));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // Statements

    fn statement(&mut self) -> PResult<Stmt> {
        if self.eat(&TokenKind::Pass) {
            return Ok(Stmt::Pass);
        }
        let start = self.current().clone();
        let first = self.expression_list()?;

        if self.at(&TokenKind::Assign) {
            let mut targets = vec![self.to_target(first, &start)?];
            loop {
                self.advance();
                let start = self.current().clone();
                let next = self.expression_list()?;
                if self.at(&TokenKind::Assign) {
                    targets.push(self.to_target(next, &start)?);
                } else {
                    return Ok(Stmt::Assign {
                        targets,
                        value: next,
                    });
                }
            }
        }

        if let Some(op) = augmented_op(self.peek()) {
            let target = match self.to_target(first, &start)? {
                Target::Tuple(_) => {
                    return Err(self.error_at(
                        "augmented assignment needs a single target",
                        &start,
                    ))
                }
                target => target,
            };
            self.advance();
            let value = self.expression_list()?;
            return Ok(Stmt::AugAssign { target, op, value });
        }

        Ok(Stmt::Expr(first))
    }

    fn to_target(&self, expr: Expr, start: &Token) -> PResult<Target> {
        match expr {
            Expr::Name(name) => Ok(Target::Name(name)),
            Expr::Tuple(items) | Expr::List(items) => items
                .into_iter()
                .map(|item| self.to_target(item, start))
                .collect::<PResult<Vec<_>>>()
                .map(Target::Tuple),
            Expr::Subscript { object, index } => match *index {
                Index::Single(index) => Ok(Target::Subscript {
                    object: *object,
                    index,
                }),
                Index::Slice { .. } => {
                    Err(self.error_at("cannot assign to a slice", start))
                }
            },
            Expr::Attribute { .. } => Err(self.error_at("cannot assign to an attribute", start)),
            _ => Err(self.error_at("cannot assign to expression", start)),
        }
    }

    // Expressions

    /// `test (',' test)* [',']`, a tuple when any comma is present
    fn expression_list(&mut self) -> PResult<Expr> {
        let first = self.test()?;
        if !self.at(&TokenKind::Comma) {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if !starts_expression(self.peek()) {
                break;
            }
            items.push(self.test()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn test(&mut self) -> PResult<Expr> {
        self.nested(|p| {
            if p.at(&TokenKind::Lambda) {
                return p.lambda();
            }
            let body = p.or_test()?;
            if !p.eat(&TokenKind::If) {
                return Ok(body);
            }
            let test = p.or_test()?;
            p.expect(TokenKind::Else)?;
            let orelse = p.test()?;
            Ok(Expr::IfExp {
                test: Box::new(test),
                body: Box::new(body),
                orelse: Box::new(orelse),
            })
        })
    }

    fn lambda(&mut self) -> PResult<Expr> {
        self.expect(TokenKind::Lambda)?;
        let mut params: Vec<Param> = Vec::new();
        while !self.at(&TokenKind::Colon) {
            let token = self.current().clone();
            let name = self.expect_name()?;
            if params.iter().any(|p| p.name == name) {
                return Err(self.error_at(
                    format!("duplicate argument '{}' in lambda", name),
                    &token,
                ));
            }
            let default = if self.eat(&TokenKind::Assign) {
                Some(self.test()?)
            } else {
                if params.iter().any(|p| p.default.is_some()) {
                    return Err(self.error_at(
                        "non-default argument follows default argument",
                        &token,
                    ));
                }
                None
            };
            params.push(Param { name, default });
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::Colon)?;
        let body = self.test()?;
        Ok(Expr::Lambda(Rc::new(LambdaDef { params, body })))
    }

    fn or_test(&mut self) -> PResult<Expr> {
        let first = self.and_test()?;
        if !self.at(&TokenKind::Or) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::Or) {
            values.push(self.and_test()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::Or,
            values,
        })
    }

    fn and_test(&mut self) -> PResult<Expr> {
        let first = self.not_test()?;
        if !self.at(&TokenKind::And) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat(&TokenKind::And) {
            values.push(self.not_test()?);
        }
        Ok(Expr::BoolOp {
            op: BoolOp::And,
            values,
        })
    }

    fn not_test(&mut self) -> PResult<Expr> {
        if self.eat(&TokenKind::Not) {
            let operand = self.nested(|p| p.not_test())?;
            return Ok(Expr::Not(Box::new(operand)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> PResult<Expr> {
        let left = self.bit_or()?;
        let mut ops = Vec::new();
        loop {
            let (op, two_words) = match (self.peek(), self.peek_next()) {
                (TokenKind::EqEq, _) => (CmpOp::Eq, false),
                (TokenKind::NotEq, _) => (CmpOp::NotEq, false),
                (TokenKind::Lt, _) => (CmpOp::Lt, false),
                (TokenKind::LtEq, _) => (CmpOp::LtE, false),
                (TokenKind::Gt, _) => (CmpOp::Gt, false),
                (TokenKind::GtEq, _) => (CmpOp::GtE, false),
                (TokenKind::In, _) => (CmpOp::In, false),
                (TokenKind::Not, Some(TokenKind::In)) => (CmpOp::NotIn, true),
                (TokenKind::Is, Some(TokenKind::Not)) => (CmpOp::IsNot, true),
                (TokenKind::Is, _) => (CmpOp::Is, false),
                _ => break,
            };
            if two_words {
                self.advance();
            }
            self.advance();
            ops.push((op, self.bit_or()?));
        }
        if ops.is_empty() {
            Ok(left)
        } else {
            Ok(Expr::Compare {
                left: Box::new(left),
                ops,
            })
        }
    }

    fn binary_level(
        &mut self,
        operand: fn(&mut Self) -> PResult<Expr>,
        operator: fn(&TokenKind) -> Option<BinOp>,
    ) -> PResult<Expr> {
        let mut left = operand(self)?;
        while let Some(op) = operator(self.peek()) {
            self.advance();
            let right = operand(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn bit_or(&mut self) -> PResult<Expr> {
        self.binary_level(Self::bit_xor, |k| {
            matches!(k, TokenKind::Pipe).then_some(BinOp::BitOr)
        })
    }

    fn bit_xor(&mut self) -> PResult<Expr> {
        self.binary_level(Self::bit_and, |k| {
            matches!(k, TokenKind::Caret).then_some(BinOp::BitXor)
        })
    }

    fn bit_and(&mut self) -> PResult<Expr> {
        self.binary_level(Self::shift, |k| {
            matches!(k, TokenKind::Amp).then_some(BinOp::BitAnd)
        })
    }

    fn shift(&mut self) -> PResult<Expr> {
        self.binary_level(Self::arith, |k| match k {
            TokenKind::Shl => Some(BinOp::LShift),
            TokenKind::Shr => Some(BinOp::RShift),
            _ => None,
        })
    }

    fn arith(&mut self) -> PResult<Expr> {
        self.binary_level(Self::term, |k| match k {
            TokenKind::Plus => Some(BinOp::Add),
            TokenKind::Minus => Some(BinOp::Sub),
            _ => None,
        })
    }

    fn term(&mut self) -> PResult<Expr> {
        self.binary_level(Self::factor, |k| match k {
            TokenKind::Star => Some(BinOp::Mul),
            TokenKind::Slash => Some(BinOp::Div),
            TokenKind::DoubleSlash => Some(BinOp::FloorDiv),
            TokenKind::Percent => Some(BinOp::Mod),
            _ => None,
        })
    }

    fn factor(&mut self) -> PResult<Expr> {
        let op = match self.peek() {
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Tilde => UnaryOp::Invert,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.nested(|p| p.factor())?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn power(&mut self) -> PResult<Expr> {
        let base = self.primary()?;
        if !self.eat(&TokenKind::DoubleStar) {
            return Ok(base);
        }
        let exponent = self.nested(|p| p.factor())?;
        Ok(Expr::Binary {
            op: BinOp::Pow,
            left: Box::new(base),
            right: Box::new(exponent),
        })
    }

    fn primary(&mut self) -> PResult<Expr> {
        let mut expr = self.atom()?;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    self.advance();
                    let args = self.nested(|p| p.call_args())?;
                    expr = Expr::Call {
                        func: Box::new(expr),
                        args,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.nested(|p| p.subscript())?;
                    self.expect(TokenKind::RBracket)?;
                    expr = Expr::Subscript {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                TokenKind::Dot => {
                    self.advance();
                    let name = self.expect_name()?;
                    expr = Expr::Attribute {
                        object: Box::new(expr),
                        name,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn call_args(&mut self) -> PResult<Vec<Arg>> {
        let mut args = Vec::new();
        let mut seen_keyword = false;
        while !self.at(&TokenKind::RParen) {
            let token = self.current().clone();
            if matches!(token.kind, TokenKind::Star | TokenKind::DoubleStar) {
                return Err(self.error_at("argument unpacking is not supported", &token));
            }
            let keyword = match (&token.kind, self.peek_next()) {
                (TokenKind::Name(name), Some(TokenKind::Assign)) => Some(name.clone()),
                _ => None,
            };
            if let Some(name) = keyword {
                self.advance();
                self.advance();
                if args
                    .iter()
                    .any(|a| matches!(a, Arg::Keyword(existing, _) if *existing == name))
                {
                    return Err(
                        self.error_at(format!("keyword argument repeated: {}", name), &token)
                    );
                }
                args.push(Arg::Keyword(name, self.test()?));
                seen_keyword = true;
            } else {
                if seen_keyword {
                    return Err(
                        self.error_at("positional argument follows keyword argument", &token)
                    );
                }
                let value = self.test()?;
                if self.at(&TokenKind::For) {
                    let clauses = self.comprehension_clauses()?;
                    args.push(Arg::Positional(Expr::ListComp {
                        element: Box::new(value),
                        clauses,
                    }));
                    break;
                }
                args.push(Arg::Positional(value));
            }
            if !self.eat(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;
        Ok(args)
    }

    fn subscript(&mut self) -> PResult<Index> {
        let lower = if self.at(&TokenKind::Colon) {
            None
        } else {
            Some(self.expression_list()?)
        };
        if !self.eat(&TokenKind::Colon) {
            return match lower {
                Some(index) => Ok(Index::Single(index)),
                None => Err(self.error_here("expected an index")),
            };
        }
        let upper = if matches!(self.peek(), TokenKind::Colon | TokenKind::RBracket) {
            None
        } else {
            Some(self.test()?)
        };
        let step = if self.eat(&TokenKind::Colon) && !self.at(&TokenKind::RBracket) {
            Some(self.test()?)
        } else {
            None
        };
        Ok(Index::Slice { lower, upper, step })
    }

    fn atom(&mut self) -> PResult<Expr> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Name(name) => {
                self.advance();
                Ok(Expr::Name(name))
            }
            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Int(value))
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Float(value))
            }
            TokenKind::Str(first) => {
                self.advance();
                let mut text = first;
                while let TokenKind::Str(next) = self.peek() {
                    text.push_str(next);
                    self.advance();
                }
                Ok(Expr::Str(Rc::from(text)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Bool(true))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Bool(false))
            }
            TokenKind::None => {
                self.advance();
                Ok(Expr::None)
            }
            TokenKind::LParen => {
                self.advance();
                self.nested(|p| p.paren_tail())
            }
            TokenKind::LBracket => {
                self.advance();
                self.nested(|p| p.list_tail())
            }
            TokenKind::LBrace => {
                self.advance();
                self.nested(|p| p.brace_tail())
            }
            _ => Err(self.unexpected(&token)),
        }
    }

    /// After `(`: unit tuple, grouping, tuple or generator
    fn paren_tail(&mut self) -> PResult<Expr> {
        if self.eat(&TokenKind::RParen) {
            return Ok(Expr::Tuple(Vec::new()));
        }
        let first = self.test()?;
        if self.at(&TokenKind::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect(TokenKind::RParen)?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                clauses,
            });
        }
        if self.eat(&TokenKind::RParen) {
            return Ok(first);
        }
        let items = self.sequence_rest(first, TokenKind::RParen)?;
        Ok(Expr::Tuple(items))
    }

    fn list_tail(&mut self) -> PResult<Expr> {
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.test()?;
        if self.at(&TokenKind::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect(TokenKind::RBracket)?;
            return Ok(Expr::ListComp {
                element: Box::new(first),
                clauses,
            });
        }
        if self.eat(&TokenKind::RBracket) {
            return Ok(Expr::List(vec![first]));
        }
        let items = self.sequence_rest(first, TokenKind::RBracket)?;
        Ok(Expr::List(items))
    }

    /// After `{`: dict, set or their comprehensions
    fn brace_tail(&mut self) -> PResult<Expr> {
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::Dict(Vec::new()));
        }
        let first = self.test()?;
        if self.eat(&TokenKind::Colon) {
            let value = self.test()?;
            if self.at(&TokenKind::For) {
                let clauses = self.comprehension_clauses()?;
                self.expect(TokenKind::RBrace)?;
                return Ok(Expr::DictComp {
                    key: Box::new(first),
                    value: Box::new(value),
                    clauses,
                });
            }
            let mut pairs = vec![(first, value)];
            while self.eat(&TokenKind::Comma) {
                if self.at(&TokenKind::RBrace) {
                    break;
                }
                let key = self.test()?;
                self.expect(TokenKind::Colon)?;
                pairs.push((key, self.test()?));
            }
            self.expect(TokenKind::RBrace)?;
            return Ok(Expr::Dict(pairs));
        }
        if self.at(&TokenKind::For) {
            let clauses = self.comprehension_clauses()?;
            self.expect(TokenKind::RBrace)?;
            return Ok(Expr::SetComp {
                element: Box::new(first),
                clauses,
            });
        }
        if self.eat(&TokenKind::RBrace) {
            return Ok(Expr::Set(vec![first]));
        }
        let items = self.sequence_rest(first, TokenKind::RBrace)?;
        Ok(Expr::Set(items))
    }

    /// Remaining `, item` entries up to and including `close`
    fn sequence_rest(&mut self, first: Expr, close: TokenKind) -> PResult<Vec<Expr>> {
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&close) {
                break;
            }
            items.push(self.test()?);
        }
        self.expect(close)?;
        Ok(items)
    }

    fn comprehension_clauses(&mut self) -> PResult<Vec<Comprehension>> {
        let mut clauses = Vec::new();
        while self.eat(&TokenKind::For) {
            let start = self.current().clone();
            let target = self.comprehension_target(&start)?;
            self.expect(TokenKind::In)?;
            let iter = self.or_test()?;
            let mut conditions = Vec::new();
            while self.eat(&TokenKind::If) {
                conditions.push(self.or_test()?);
            }
            clauses.push(Comprehension {
                target,
                iter,
                conditions,
            });
        }
        Ok(clauses)
    }

    fn comprehension_target(&mut self, start: &Token) -> PResult<Target> {
        let first = self.bit_or()?;
        if !self.at(&TokenKind::Comma) {
            return self.to_target(first, start);
        }
        let mut items = vec![first];
        while self.eat(&TokenKind::Comma) {
            if self.at(&TokenKind::In) {
                break;
            }
            items.push(self.bit_or()?);
        }
        self.to_target(Expr::Tuple(items), start)
    }
}

fn augmented_op(kind: &TokenKind) -> Option<BinOp> {
    match kind {
        TokenKind::PlusAssign => Some(BinOp::Add),
        TokenKind::MinusAssign => Some(BinOp::Sub),
        TokenKind::StarAssign => Some(BinOp::Mul),
        TokenKind::SlashAssign => Some(BinOp::Div),
        TokenKind::DoubleSlashAssign => Some(BinOp::FloorDiv),
        TokenKind::PercentAssign => Some(BinOp::Mod),
        _ => None,
    }
}

fn starts_expression(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Name(_)
            | TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Reserved(_)
            | TokenKind::True
            | TokenKind::False
            | TokenKind::None
            | TokenKind::LParen
            | TokenKind::LBracket
            | TokenKind::LBrace
            | TokenKind::Minus
            | TokenKind::Plus
            | TokenKind::Tilde
            | TokenKind::Not
            | TokenKind::Lambda
    )
}

fn kind_text(kind: &TokenKind) -> String {
    let described = kind.describe();
    described.trim_matches('\'').to_string()
}
