//! Textual logic syntax: `Fever(x) & Cough(x) ==> HasFlu(x)`
//!
//! Precedence, loosest first: `<=>`, `==>`/`<==` (right associative), `|`,
//! `^`, `&`, prefix `~`, then atoms and parenthesised sentences. `>>` and `<<`
//! are accepted as spellings of `==>` and `<==`.

use crate::error::{LogicError, LogicResult};
use crate::expr::{Expr, AND, IFF, IMPLIES, NOT, OR, REVERSE_IMPLIES, XOR};
use logos::Logos;

/// Deepest run of parentheses, negations, arguments and implications
const MAX_NESTING: usize = 128;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
enum Token {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_owned())]
    Name(String),

    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_owned())]
    Number(String),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token("<=>")]
    Iff,
    #[token("==>")]
    #[token(">>")]
    Implies,
    #[token("<==")]
    #[token("<<")]
    ReverseImplies,
    #[token("&")]
    And,
    #[token("|")]
    Or,
    #[token("^")]
    Xor,
    #[token("~")]
    Not,
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
    depth: usize,
}

/// Parse a sentence in textual logic syntax
pub fn parse(text: &str) -> LogicResult<Expr> {
    let mut tokens = Vec::new();
    let mut lexer = Token::lexer(text);
    while let Some(token) = lexer.next() {
        match token {
            Ok(token) => tokens.push((token, lexer.span().start)),
            Err(()) => {
                return Err(LogicError::Parse {
                    message: format!("unexpected character {:?}", lexer.slice()),
                    position: lexer.span().start,
                })
            }
        }
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        end: text.len(),
        depth: 0,
    };
    let expr = parser.iff()?;
    if let Some((token, position)) = parser.tokens.get(parser.pos) {
        return Err(LogicError::Parse {
            message: format!("unexpected {:?} after complete sentence", token),
            position: *position,
        });
    }
    Ok(expr)
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(self.end)
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> LogicError {
        LogicError::Parse {
            message: message.into(),
            position: self.position(),
        }
    }

    /// Run `parse` one nesting level deeper
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> LogicResult<T>) -> LogicResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(format!("nesting deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn build(&self, op: &str, args: Vec<Expr>) -> LogicResult<Expr> {
        Expr::new(op, args).bounded()
    }

    fn iff(&mut self) -> LogicResult<Expr> {
        let mut lhs = self.implication()?;
        while self.eat(&Token::Iff) {
            let rhs = self.implication()?;
            lhs = self.build(IFF, vec![lhs, rhs])?;
        }
        Ok(lhs)
    }

    fn implication(&mut self) -> LogicResult<Expr> {
        let lhs = self.disjunction()?;
        if self.eat(&Token::Implies) {
            let rhs = self.nested(Self::implication)?;
            return self.build(IMPLIES, vec![lhs, rhs]);
        }
        if self.eat(&Token::ReverseImplies) {
            let rhs = self.nested(Self::implication)?;
            return self.build(REVERSE_IMPLIES, vec![lhs, rhs]);
        }
        Ok(lhs)
    }

    fn disjunction(&mut self) -> LogicResult<Expr> {
        let mut lhs = self.exclusive()?;
        while self.eat(&Token::Or) {
            let rhs = self.exclusive()?;
            lhs = self.build(OR, vec![lhs, rhs])?;
        }
        Ok(lhs)
    }

    fn exclusive(&mut self) -> LogicResult<Expr> {
        let mut lhs = self.conjunction()?;
        while self.eat(&Token::Xor) {
            let rhs = self.conjunction()?;
            lhs = self.build(XOR, vec![lhs, rhs])?;
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> LogicResult<Expr> {
        let mut lhs = self.negation()?;
        while self.eat(&Token::And) {
            let rhs = self.negation()?;
            lhs = self.build(AND, vec![lhs, rhs])?;
        }
        Ok(lhs)
    }

    fn negation(&mut self) -> LogicResult<Expr> {
        if self.eat(&Token::Not) {
            let operand = self.nested(Self::negation)?;
            return self.build(NOT, vec![operand]);
        }
        self.primary()
    }

    fn primary(&mut self) -> LogicResult<Expr> {
        let token = self.peek().cloned();
        match token {
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.nested(Self::iff)?;
                if !self.eat(&Token::RParen) {
                    return Err(self.error("expected ')'"));
                }
                Ok(inner)
            }
            Some(Token::Number(text)) => {
                self.pos += 1;
                Ok(Expr::symbol(text))
            }
            Some(Token::Name(name)) => {
                self.pos += 1;
                if !self.eat(&Token::LParen) {
                    return Ok(Expr::symbol(name));
                }
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.nested(Self::iff)?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        if self.eat(&Token::RParen) {
                            break;
                        }
                        return Err(self.error("expected ',' or ')' in argument list"));
                    }
                }
                self.build(&name, args)
            }
            Some(other) => Err(self.error(format!("unexpected {:?}", other))),
            None => Err(self.error("unexpected end of expression")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_definite_rule() {
        let e = parse("Fever(x) & Cough(x) & SoreThroat(x) ==> HasStrepThroat(x)").unwrap();
        assert_eq!(e.op(), IMPLIES);
        assert_eq!(
            e.to_string(),
            "(((Fever(x) & Cough(x)) & SoreThroat(x)) ==> HasStrepThroat(x))"
        );
    }

    #[test]
    fn test_precedence_and_negation() {
        let e = parse("~P | Q & R").unwrap();
        assert_eq!(e.to_string(), "(~P | (Q & R))");
        let e = parse("P >> Q").unwrap();
        assert_eq!(e.op(), IMPLIES);
    }

    #[test]
    fn test_nested_terms() {
        let e = parse("Knows(John, Mother(y))").unwrap();
        assert_eq!(e.args().len(), 2);
        assert_eq!(e.args()[1].to_string(), "Mother(y)");
    }

    #[test]
    fn test_parse_errors_carry_position() {
        match parse("P & ") {
            Err(LogicError::Parse { position, .. }) => assert_eq!(position, 4),
            other => panic!("expected parse error, got {:?}", other),
        }
        assert!(parse("P $ Q").is_err());
        assert!(parse("F(x").is_err());
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let negations = format!("{}P", "~".repeat(100_000));
        assert!(matches!(parse(&negations), Err(LogicError::Parse { .. })));

        let parens = format!("{}P{}", "(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse(&parens), Err(LogicError::Parse { .. })));

        let args = format!("{}x{}", "F(".repeat(100_000), ")".repeat(100_000));
        assert!(matches!(parse(&args), Err(LogicError::Parse { .. })));

        let arrows = format!("{}P", "P ==> ".repeat(100_000));
        assert!(matches!(parse(&arrows), Err(LogicError::Parse { .. })));

        let moderate = format!("{}P{}", "~(".repeat(50), ")".repeat(50));
        assert_eq!(parse(&moderate).unwrap().depth(), 51);
    }

    #[test]
    fn test_long_flat_chains_are_bounded() {
        let chain = format!("{}P", "P & ".repeat(100_000));
        assert!(matches!(parse(&chain), Err(LogicError::TooDeep { .. })));

        let chain = format!("{}P", "P | ".repeat(500));
        assert_eq!(parse(&chain).unwrap().depth(), 501);
    }
}
