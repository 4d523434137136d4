//! Tokenizer for one script line

use crate::error::SyntaxError;
use logos::Logos;
use std::ops::Range;

/// Raw token from logos (keywords are resolved afterwards)
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"([ \t\r\f]+|#[^\n]*)")]
enum RawToken {
    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"[0-9][0-9_]*", |lex| lex.slice().replace('_', "").parse::<i64>().ok())]
    Int(i64),

    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"\.[0-9][0-9_]*([eE][+-]?[0-9]+)?", parse_float)]
    #[regex(r"[0-9][0-9_]*[eE][+-]?[0-9]+", parse_float)]
    Float(f64),

    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Str,

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token(".")]
    Dot,
    #[token(";")]
    Semicolon,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("**")]
    DoubleStar,
    #[token("/")]
    Slash,
    #[token("//")]
    DoubleSlash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    LtEq,
    #[token(">")]
    Gt,
    #[token(">=")]
    GtEq,

    #[token("=")]
    Assign,
    #[token("+=")]
    PlusAssign,
    #[token("-=")]
    MinusAssign,
    #[token("*=")]
    StarAssign,
    #[token("/=")]
    SlashAssign,
    #[token("//=")]
    DoubleSlashAssign,
    #[token("%=")]
    PercentAssign,
}

fn parse_float(lex: &mut logos::Lexer<RawToken>) -> Option<f64> {
    lex.slice().replace('_', "").parse::<f64>().ok()
}

/// Token kinds seen by the parser
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    And,
    Or,
    Not,
    In,
    Is,
    If,
    Else,
    Lambda,
    For,
    True,
    False,
    None,
    Pass,

    /// Words of general-purpose scripting that this language refuses
    Reserved(String),

    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Dot,
    Semicolon,

    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,

    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DoubleSlashAssign,
    PercentAssign,

    Eof,
}

impl TokenKind {
    /// How the token is shown in syntax error messages
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Name(name) => format!("name '{}'", name),
            TokenKind::Int(v) => format!("number {}", v),
            TokenKind::Float(v) => format!("number {}", v),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Reserved(word) => format!("'{}'", word),
            TokenKind::Eof => "end of line".to_string(),
            other => format!("'{}'", other.symbol()),
        }
    }

    fn symbol(&self) -> &'static str {
        match self {
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Not => "not",
            TokenKind::In => "in",
            TokenKind::Is => "is",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Lambda => "lambda",
            TokenKind::For => "for",
            TokenKind::True => "True",
            TokenKind::False => "False",
            TokenKind::None => "None",
            TokenKind::Pass => "pass",
            TokenKind::LParen => "(",
            TokenKind::RParen => ")",
            TokenKind::LBracket => "[",
            TokenKind::RBracket => "]",
            TokenKind::LBrace => "{",
            TokenKind::RBrace => "}",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Dot => ".",
            TokenKind::Semicolon => ";",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Star => "*",
            TokenKind::DoubleStar => "**",
            TokenKind::Slash => "/",
            TokenKind::DoubleSlash => "//",
            TokenKind::Percent => "%",
            TokenKind::Amp => "&",
            TokenKind::Pipe => "|",
            TokenKind::Caret => "^",
            TokenKind::Tilde => "~",
            TokenKind::Shl => "<<",
            TokenKind::Shr => ">>",
            TokenKind::EqEq => "==",
            TokenKind::NotEq => "!=",
            TokenKind::Lt => "<",
            TokenKind::LtEq => "<=",
            TokenKind::Gt => ">",
            TokenKind::GtEq => ">=",
            TokenKind::Assign => "=",
            TokenKind::PlusAssign => "+=",
            TokenKind::MinusAssign => "-=",
            TokenKind::StarAssign => "*=",
            TokenKind::SlashAssign => "/=",
            TokenKind::DoubleSlashAssign => "//=",
            TokenKind::PercentAssign => "%=",
            TokenKind::Name(_)
            | TokenKind::Int(_)
            | TokenKind::Float(_)
            | TokenKind::Str(_)
            | TokenKind::Reserved(_)
            | TokenKind::Eof => "",
        }
    }

    pub fn is_augmented_assign(&self) -> bool {
        matches!(
            self,
            TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::SlashAssign
                | TokenKind::DoubleSlashAssign
                | TokenKind::PercentAssign
        )
    }
}

/// Words rejected at parse time
pub const RESERVED_WORDS: &[&str] = &[
    "def", "class", "import", "from", "while", "return", "global", "nonlocal", "del", "try",
    "except", "finally", "raise", "with", "as", "yield", "async", "await", "assert", "break",
    "continue", "elif", "exec", "eval", "compile", "open", "globals", "locals", "vars",
    "getattr", "setattr", "delattr", "__import__", "__builtins__", "breakpoint",
];

/// A token with its byte span in the line
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

/// Tokenize one line; the result always ends with [`TokenKind::Eof`]
pub fn tokenize(text: &str, line: usize) -> Result<Vec<Token>, SyntaxError> {
    let mut tokens = Vec::new();
    let mut lexer = RawToken::lexer(text);
    while let Some(raw) = lexer.next() {
        let span = lexer.span();
        let slice = lexer.slice();
        let raw = raw.map_err(|()| lex_error(text, line, span.start, slice))?;
        let kind = match raw {
            RawToken::Ident => keyword_or_name(slice),
            RawToken::Int(v) => TokenKind::Int(v),
            RawToken::Float(v) => TokenKind::Float(v),
            RawToken::Str => TokenKind::Str(
                unescape(&slice[1..slice.len() - 1])
                    .map_err(|msg| SyntaxError::at(msg, text, line, span.start))?,
            ),
            RawToken::LParen => TokenKind::LParen,
            RawToken::RParen => TokenKind::RParen,
            RawToken::LBracket => TokenKind::LBracket,
            RawToken::RBracket => TokenKind::RBracket,
            RawToken::LBrace => TokenKind::LBrace,
            RawToken::RBrace => TokenKind::RBrace,
            RawToken::Comma => TokenKind::Comma,
            RawToken::Colon => TokenKind::Colon,
            RawToken::Dot => TokenKind::Dot,
            RawToken::Semicolon => TokenKind::Semicolon,
            RawToken::Plus => TokenKind::Plus,
            RawToken::Minus => TokenKind::Minus,
            RawToken::Star => TokenKind::Star,
            RawToken::DoubleStar => TokenKind::DoubleStar,
            RawToken::Slash => TokenKind::Slash,
            RawToken::DoubleSlash => TokenKind::DoubleSlash,
            RawToken::Percent => TokenKind::Percent,
            RawToken::Amp => TokenKind::Amp,
            RawToken::Pipe => TokenKind::Pipe,
            RawToken::Caret => TokenKind::Caret,
            RawToken::Tilde => TokenKind::Tilde,
            RawToken::Shl => TokenKind::Shl,
            RawToken::Shr => TokenKind::Shr,
            RawToken::EqEq => TokenKind::EqEq,
            RawToken::NotEq => TokenKind::NotEq,
            RawToken::Lt => TokenKind::Lt,
            RawToken::LtEq => TokenKind::LtEq,
            RawToken::Gt => TokenKind::Gt,
            RawToken::GtEq => TokenKind::GtEq,
            RawToken::Assign => TokenKind::Assign,
            RawToken::PlusAssign => TokenKind::PlusAssign,
            RawToken::MinusAssign => TokenKind::MinusAssign,
            RawToken::StarAssign => TokenKind::StarAssign,
            RawToken::SlashAssign => TokenKind::SlashAssign,
            RawToken::DoubleSlashAssign => TokenKind::DoubleSlashAssign,
            RawToken::PercentAssign => TokenKind::PercentAssign,
        };
        tokens.push(Token { kind, span });
    }
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: text.len()..text.len(),
    });
    Ok(tokens)
}

fn keyword_or_name(word: &str) -> TokenKind {
    match word {
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "not" => TokenKind::Not,
        "in" => TokenKind::In,
        "is" => TokenKind::Is,
        "if" => TokenKind::If,
        "else" => TokenKind::Else,
        "lambda" => TokenKind::Lambda,
        "for" => TokenKind::For,
        "True" => TokenKind::True,
        "False" => TokenKind::False,
        "None" => TokenKind::None,
        "pass" => TokenKind::Pass,
        w if RESERVED_WORDS.contains(&w) => TokenKind::Reserved(w.to_string()),
        w => TokenKind::Name(w.to_string()),
    }
}

fn lex_error(text: &str, line: usize, offset: usize, slice: &str) -> SyntaxError {
    let message = if slice.starts_with('"') || slice.starts_with('\'') {
        "unterminated string literal".to_string()
    } else if slice.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        "integer literal is too large".to_string()
    } else {
        format!("invalid character '{}'", slice)
    };
    SyntaxError::at(message, text, line, offset)
}

fn unescape(body: &str) -> Result<String, String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('\'') => out.push('\''),
            Some('"') => out.push('"'),
            Some('x') => out.push(hex_escape(&mut chars, 2)?),
            Some('u') => out.push(hex_escape(&mut chars, 4)?),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, digits: usize) -> Result<char, String> {
    let hex: String = chars.by_ref().take(digits).collect();
    if hex.len() != digits {
        return Err("truncated escape sequence".to_string());
    }
    u32::from_str_radix(&hex, 16)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape sequence '{}'", hex))
}
