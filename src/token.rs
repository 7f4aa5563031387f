use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::fmt;

/*
Tokens are individual atoms in the molecule that is a programming language. Every
lexeme the lexer recognises maps to exactly one of these categories.
*/
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenType {
    // single character tokens
    Assign,
    Plus,
    Minus,
    Multiplication,
    Division,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    SemiColon,
    Lt,
    Gt,

    // one, two and three character tokens
    Negation,
    NotEq,
    Diff,
    Eq,
    Similar,
    Le,
    Ge,

    // literals
    Ident,
    Int,
    String,

    // keywords
    Let,
    Function,
    Return,
    If,
    Else,
    True,
    False,

    Illegal,
    Eof,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub static KEYWORDS: Lazy<HashMap<&'static str, TokenType>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("variable", TokenType::Let);
    m.insert("funcion", TokenType::Function);
    m.insert("regresa", TokenType::Return);
    m.insert("si", TokenType::If);
    m.insert("si_no", TokenType::Else);
    m.insert("verdadero", TokenType::True);
    m.insert("falso", TokenType::False);
    m
});

pub fn lookup_token_type(literal: &str) -> TokenType {
    KEYWORDS.get(literal).copied().unwrap_or(TokenType::Ident)
}

/// `line` defaults to `0` so tests can build tokens without worrying about it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token {
    pub token_type: TokenType,
    pub literal: String,
    pub line: usize,
}

impl Token {
    pub fn new(token_type: TokenType, literal: impl Into<String>, line: usize) -> Self {
        Self {
            token_type,
            literal: literal.into(),
            line,
        }
    }

    /// Convenience constructor for tests that don't care about line tracking.
    pub fn without_line(token_type: TokenType, literal: impl Into<String>) -> Self {
        Self::new(token_type, literal, 0)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Type {}, Literal: {}", self.token_type, self.literal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_every_keyword() {
        assert_eq!(lookup_token_type("variable"), TokenType::Let);
        assert_eq!(lookup_token_type("funcion"), TokenType::Function);
        assert_eq!(lookup_token_type("regresa"), TokenType::Return);
        assert_eq!(lookup_token_type("si"), TokenType::If);
        assert_eq!(lookup_token_type("si_no"), TokenType::Else);
        assert_eq!(lookup_token_type("verdadero"), TokenType::True);
        assert_eq!(lookup_token_type("falso"), TokenType::False);
    }

    #[test]
    fn unknown_identifier_falls_back_to_ident() {
        assert_eq!(lookup_token_type("suma"), TokenType::Ident);
    }

    #[test]
    fn tokens_without_line_default_to_zero() {
        let t = Token::without_line(TokenType::Ident, "x");
        assert_eq!(t.line, 0);
    }
}
