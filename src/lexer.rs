// File: src/lexer.rs
//
// Hand-written lexer for the Bob language. Produces a flat token stream with
// line/column information; lexical errors are routed through the shared
// ErrorReporter and yield an Error token so the parser can resynchronize.

use crate::errors::ErrorReporter;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Single-character tokens
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,
    LeftBracket,
    RightBracket,
    Comma,
    Dot,
    Semicolon,
    Colon,
    Question,
    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Equal,
    Greater,
    Less,
    BinAnd,
    BinOr,
    BinXor,
    BinNot,
    PlusPlus,
    MinusMinus,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    PercentEqual,
    BinAndEqual,
    BinOrEqual,
    BinXorEqual,
    ShlEqual,
    ShrEqual,
    Shl,
    Shr,
    EqualEqual,
    BangEqual,
    GreaterEqual,
    LessEqual,
    AndAnd,
    OrOr,
    // Literals
    Identifier,
    StringLit,
    IntegerLit,
    BigIntLit,
    NumberLit,
    // Keywords
    And,
    Or,
    True,
    False,
    If,
    Else,
    Func,
    For,
    Foreach,
    While,
    Do,
    Var,
    Class,
    Extends,
    Extension,
    Super,
    This,
    None,
    Return,
    Break,
    Continue,
    Import,
    From,
    As,
    Try,
    Catch,
    Finally,
    Throw,
    // Control
    Error,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub line: u32,
    pub column: u32,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: impl Into<String>, line: u32, column: u32) -> Self {
        Token { token_type, lexeme: lexeme.into(), line, column }
    }
}

static KEYWORDS: Lazy<AHashMap<&'static str, TokenType>> = Lazy::new(|| {
    let mut m = AHashMap::new();
    m.insert("and", TokenType::And);
    m.insert("or", TokenType::Or);
    m.insert("true", TokenType::True);
    m.insert("false", TokenType::False);
    m.insert("if", TokenType::If);
    m.insert("else", TokenType::Else);
    m.insert("func", TokenType::Func);
    m.insert("for", TokenType::For);
    m.insert("foreach", TokenType::Foreach);
    m.insert("while", TokenType::While);
    m.insert("do", TokenType::Do);
    m.insert("var", TokenType::Var);
    m.insert("class", TokenType::Class);
    m.insert("extends", TokenType::Extends);
    m.insert("extension", TokenType::Extension);
    m.insert("super", TokenType::Super);
    m.insert("this", TokenType::This);
    m.insert("none", TokenType::None);
    m.insert("return", TokenType::Return);
    m.insert("break", TokenType::Break);
    m.insert("continue", TokenType::Continue);
    m.insert("import", TokenType::Import);
    m.insert("from", TokenType::From);
    m.insert("as", TokenType::As);
    m.insert("try", TokenType::Try);
    m.insert("catch", TokenType::Catch);
    m.insert("finally", TokenType::Finally);
    m.insert("throw", TokenType::Throw);
    m
});

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: u32,
    column: u32,
    start_column: u32,
    reporter: Option<Rc<RefCell<ErrorReporter>>>,
}

impl Lexer {
    pub fn new() -> Self {
        Lexer {
            source: Vec::new(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_column: 1,
            reporter: None,
        }
    }

    pub fn set_error_reporter(&mut self, reporter: Rc<RefCell<ErrorReporter>>) {
        self.reporter = Some(reporter);
    }

    pub fn tokenize(&mut self, source: &str) -> Vec<Token> {
        self.source = source.chars().collect();
        self.tokens.clear();
        self.start = 0;
        self.current = 0;
        self.line = 1;
        self.column = 1;

        while !self.is_at_end() {
            self.start = self.current;
            self.start_column = self.column;
            self.scan_token();
        }

        self.tokens.push(Token::new(TokenType::Eof, "", self.line, self.column));
        std::mem::take(&mut self.tokens)
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn matches(&mut self, expected: char) -> bool {
        if self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    fn add_token(&mut self, token_type: TokenType) {
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        self.tokens.push(Token::new(token_type, lexeme, self.line, self.start_column));
    }

    fn error(&mut self, message: &str) {
        if let Some(reporter) = &self.reporter {
            reporter.borrow_mut().report_error(
                self.line,
                self.start_column,
                "Parse Error",
                message,
                "",
                true,
            );
        }
        self.add_token(TokenType::Error);
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenType::LeftParen),
            ')' => self.add_token(TokenType::RightParen),
            '{' => self.add_token(TokenType::LeftBrace),
            '}' => self.add_token(TokenType::RightBrace),
            '[' => self.add_token(TokenType::LeftBracket),
            ']' => self.add_token(TokenType::RightBracket),
            ',' => self.add_token(TokenType::Comma),
            '.' => self.add_token(TokenType::Dot),
            ';' => self.add_token(TokenType::Semicolon),
            ':' => self.add_token(TokenType::Colon),
            '?' => self.add_token(TokenType::Question),
            '~' => self.add_token(TokenType::BinNot),
            '+' => {
                if self.matches('+') {
                    self.add_token(TokenType::PlusPlus);
                } else if self.matches('=') {
                    self.add_token(TokenType::PlusEqual);
                } else {
                    self.add_token(TokenType::Plus);
                }
            }
            '-' => {
                if self.matches('-') {
                    self.add_token(TokenType::MinusMinus);
                } else if self.matches('=') {
                    self.add_token(TokenType::MinusEqual);
                } else {
                    self.add_token(TokenType::Minus);
                }
            }
            '*' => {
                if self.matches('=') {
                    self.add_token(TokenType::StarEqual);
                } else {
                    self.add_token(TokenType::Star);
                }
            }
            '%' => {
                if self.matches('=') {
                    self.add_token(TokenType::PercentEqual);
                } else {
                    self.add_token(TokenType::Percent);
                }
            }
            '!' => {
                if self.matches('=') {
                    self.add_token(TokenType::BangEqual);
                } else {
                    self.add_token(TokenType::Bang);
                }
            }
            '=' => {
                if self.matches('=') {
                    self.add_token(TokenType::EqualEqual);
                } else {
                    self.add_token(TokenType::Equal);
                }
            }
            '&' => {
                if self.matches('&') {
                    self.add_token(TokenType::AndAnd);
                } else if self.matches('=') {
                    self.add_token(TokenType::BinAndEqual);
                } else {
                    self.add_token(TokenType::BinAnd);
                }
            }
            '|' => {
                if self.matches('|') {
                    self.add_token(TokenType::OrOr);
                } else if self.matches('=') {
                    self.add_token(TokenType::BinOrEqual);
                } else {
                    self.add_token(TokenType::BinOr);
                }
            }
            '^' => {
                if self.matches('=') {
                    self.add_token(TokenType::BinXorEqual);
                } else {
                    self.add_token(TokenType::BinXor);
                }
            }
            '<' => {
                if self.matches('<') {
                    if self.matches('=') {
                        self.add_token(TokenType::ShlEqual);
                    } else {
                        self.add_token(TokenType::Shl);
                    }
                } else if self.matches('=') {
                    self.add_token(TokenType::LessEqual);
                } else {
                    self.add_token(TokenType::Less);
                }
            }
            '>' => {
                if self.matches('>') {
                    if self.matches('=') {
                        self.add_token(TokenType::ShrEqual);
                    } else {
                        self.add_token(TokenType::Shr);
                    }
                } else if self.matches('=') {
                    self.add_token(TokenType::GreaterEqual);
                } else {
                    self.add_token(TokenType::Greater);
                }
            }
            '/' => {
                if self.matches('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.matches('*') {
                    self.block_comment();
                } else if self.matches('=') {
                    self.add_token(TokenType::SlashEqual);
                } else {
                    self.add_token(TokenType::Slash);
                }
            }
            ' ' | '\r' | '\t' | '\n' => {}
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(c),
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            _ => self.error(&format!("Unexpected character '{}'", c)),
        }
    }

    fn block_comment(&mut self) {
        let mut depth = 1;
        while depth > 0 && !self.is_at_end() {
            if self.peek() == '/' && self.peek_next() == '*' {
                self.advance();
                self.advance();
                depth += 1;
            } else if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                depth -= 1;
            } else {
                self.advance();
            }
        }
        if depth > 0 {
            self.error("Unterminated block comment");
        }
    }

    fn string(&mut self) {
        let mut value = String::new();
        while self.peek() != '"' && !self.is_at_end() {
            let c = self.advance();
            if c == '\\' && !self.is_at_end() {
                let escaped = self.advance();
                match escaped {
                    'n' => value.push('\n'),
                    't' => value.push('\t'),
                    'r' => value.push('\r'),
                    '0' => value.push('\0'),
                    '\\' => value.push('\\'),
                    '"' => value.push('"'),
                    'e' => value.push('\u{1b}'),
                    other => {
                        value.push('\\');
                        value.push(other);
                    }
                }
            } else {
                value.push(c);
            }
        }

        if self.is_at_end() {
            self.error("Unterminated string");
            return;
        }

        self.advance(); // closing quote
        self.tokens.push(Token::new(TokenType::StringLit, value, self.line, self.start_column));
    }

    fn number(&mut self, first: char) {
        // 0b... binary integer literal
        if first == '0' && (self.peek() == 'b' || self.peek() == 'B') {
            self.advance();
            let digits_start = self.current;
            while self.peek() == '0' || self.peek() == '1' {
                self.advance();
            }
            if self.current == digits_start {
                self.error("Expected binary digits after '0b'");
                return;
            }
            let digits: String = self.source[digits_start..self.current].iter().collect();
            match i64::from_str_radix(&digits, 2) {
                Ok(v) => self.tokens.push(Token::new(
                    TokenType::IntegerLit,
                    v.to_string(),
                    self.line,
                    self.start_column,
                )),
                Err(_) => self.error("Binary literal out of range"),
            }
            return;
        }

        while self.peek().is_ascii_digit() {
            self.advance();
        }

        let mut is_float = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let lexeme: String = self.source[self.start..self.current].iter().collect();
        if is_float {
            self.tokens.push(Token::new(TokenType::NumberLit, lexeme, self.line, self.start_column));
        } else if lexeme.parse::<i64>().is_ok() {
            self.tokens.push(Token::new(
                TokenType::IntegerLit,
                lexeme,
                self.line,
                self.start_column,
            ));
        } else {
            // Too large for i64: surface as an arbitrary-precision literal.
            self.tokens.push(Token::new(
                TokenType::BigIntLit,
                lexeme,
                self.line,
                self.start_column,
            ));
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }
        let lexeme: String = self.source[self.start..self.current].iter().collect();
        let token_type = KEYWORDS.get(lexeme.as_str()).copied().unwrap_or(TokenType::Identifier);
        self.tokens.push(Token::new(token_type, lexeme, self.line, self.start_column));
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience entry point mirroring the library surface.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new().tokenize(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn types(source: &str) -> Vec<TokenType> {
        tokenize(source).into_iter().map(|t| t.token_type).collect()
    }

    #[test]
    fn scans_operators_and_compound_assignments() {
        assert_eq!(
            types("+ ++ += << <<= >> >>= == != <= >= && ||"),
            vec![
                TokenType::Plus,
                TokenType::PlusPlus,
                TokenType::PlusEqual,
                TokenType::Shl,
                TokenType::ShlEqual,
                TokenType::Shr,
                TokenType::ShrEqual,
                TokenType::EqualEqual,
                TokenType::BangEqual,
                TokenType::LessEqual,
                TokenType::GreaterEqual,
                TokenType::AndAnd,
                TokenType::OrOr,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn scans_number_literals() {
        let tokens = tokenize("42 3.25 0b1011 99999999999999999999999");
        assert_eq!(tokens[0].token_type, TokenType::IntegerLit);
        assert_eq!(tokens[0].lexeme, "42");
        assert_eq!(tokens[1].token_type, TokenType::NumberLit);
        assert_eq!(tokens[1].lexeme, "3.25");
        assert_eq!(tokens[2].token_type, TokenType::IntegerLit);
        assert_eq!(tokens[2].lexeme, "11");
        assert_eq!(tokens[3].token_type, TokenType::BigIntLit);
    }

    #[test]
    fn scans_keywords_and_identifiers() {
        let tokens = tokenize("var foo = none; foreach class extends");
        assert_eq!(tokens[0].token_type, TokenType::Var);
        assert_eq!(tokens[1].token_type, TokenType::Identifier);
        assert_eq!(tokens[3].token_type, TokenType::None);
        assert_eq!(tokens[5].token_type, TokenType::Foreach);
        assert_eq!(tokens[6].token_type, TokenType::Class);
        assert_eq!(tokens[7].token_type, TokenType::Extends);
    }

    #[test]
    fn string_escapes_are_decoded() {
        let tokens = tokenize(r#""a\nb\t\"q\"""#);
        assert_eq!(tokens[0].token_type, TokenType::StringLit);
        assert_eq!(tokens[0].lexeme, "a\nb\t\"q\"");
    }

    #[test]
    fn tracks_line_and_column() {
        let tokens = tokenize("var x\nvar y");
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[0].column, 1);
        assert_eq!(tokens[2].line, 2);
        assert_eq!(tokens[3].column, 5);
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = tokenize("1 // line\n/* block\nstill */ 2");
        assert_eq!(tokens[0].lexeme, "1");
        assert_eq!(tokens[1].lexeme, "2");
        assert_eq!(tokens[2].token_type, TokenType::Eof);
    }
}
