//! Part 21 (ISO 10303-21) tokenizer.
//!
//! Produces a flat token stream with source positions. Handles:
//! - Keywords, including hyphenated section markers (`END-ISO-10303-21`)
//!   and user-defined `!NAME` keywords
//! - Instance references (`#123`)
//! - Strings with `''` escapes, and `"..."` binary literals
//! - Integers and reals, including the `1.` and `0.E+00` forms
//! - Enumerations (`.T.`, `.UNSPECIFIED.`)
//! - Punctuation and the `$` / `*` sentinels
//!
//! Comments (`/* ... */`) are skipped. An unterminated comment, string or
//! enumeration is an error: everything after it would be misread.

use crate::error::{Result, StepError};

/// A token in a STEP file.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Keyword or type name, uppercased.
    Keyword(String),
    /// Instance reference (`#123`).
    EntityRef(u64),
    /// String literal contents, unescaped.
    String(String),
    /// Binary literal contents (hex digits).
    Binary(String),
    /// Real number.
    Real(f64),
    /// Integer number.
    Integer(i64),
    /// Enumeration name without the dots.
    Enum(String),
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `,`
    Comma,
    /// `;`
    Semicolon,
    /// `=`
    Equals,
    /// `*` (derived value).
    Asterisk,
    /// `$` (unset value).
    Dollar,
}

/// Position in the source (1-indexed).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    /// Line number.
    pub line: usize,
    /// Column number.
    pub col: usize,
}

/// A token with the position where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    /// The token.
    pub token: Token,
    /// Start position.
    pub pos: Position,
}

/// Lexer over raw file bytes.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    /// Create a lexer for the given input.
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Tokenize the entire input.
    pub fn tokenize(&mut self) -> Result<Vec<SpannedToken>> {
        let mut tokens = Vec::with_capacity(self.input.len() / 4);
        while let Some(tok) = self.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    /// Current position.
    pub fn position(&self) -> Position {
        Position {
            line: self.line,
            col: self.col,
        }
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<SpannedToken>> {
        self.skip_whitespace_and_comments()?;

        let start = self.position();
        let Some(ch) = self.peek() else {
            return Ok(None);
        };

        let token = match ch {
            b'(' => self.single(Token::LParen),
            b')' => self.single(Token::RParen),
            b',' => self.single(Token::Comma),
            b';' => self.single(Token::Semicolon),
            b'=' => self.single(Token::Equals),
            b'*' => self.single(Token::Asterisk),
            b'$' => self.single(Token::Dollar),
            b'#' => self.read_entity_ref(start)?,
            b'\'' => self.read_string(start)?,
            b'"' => self.read_binary(start)?,
            b'.' => self.read_enum(start)?,
            b'-' | b'+' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || c == b'.') => {
                self.read_number(start)?
            }
            b'0'..=b'9' => self.read_number(start)?,
            b'A'..=b'Z' | b'a'..=b'z' | b'_' | b'!' => self.read_keyword(),
            _ => {
                return Err(StepError::lexer(
                    start.line,
                    start.col,
                    format!("unexpected character: '{}'", ch as char),
                ));
            }
        };

        Ok(Some(SpannedToken { token, pos: start }))
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek()?;
        self.pos += 1;
        if ch == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    fn single(&mut self, token: Token) -> Token {
        self.advance();
        token
    }

    /// Consume bytes while `pred` holds and return them as text.
    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let begin = self.pos;
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
        String::from_utf8_lossy(&self.input[begin..self.pos]).into_owned()
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<()> {
        loop {
            while self.peek().is_some_and(|c| c.is_ascii_whitespace()) {
                self.advance();
            }
            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                let start = self.position();
                self.advance();
                self.advance();
                loop {
                    match self.peek() {
                        None => {
                            return Err(StepError::lexer(start.line, start.col, "unterminated comment"));
                        }
                        Some(b'*') if self.peek_at(1) == Some(b'/') => {
                            self.advance();
                            self.advance();
                            break;
                        }
                        Some(_) => {
                            self.advance();
                        }
                    }
                }
                continue;
            }
            return Ok(());
        }
    }

    fn read_entity_ref(&mut self, start: Position) -> Result<Token> {
        self.advance(); // '#'
        let digits = self.take_while(|c| c.is_ascii_digit());
        if digits.is_empty() {
            return Err(StepError::lexer(start.line, start.col, "expected digits after '#'"));
        }
        digits
            .parse()
            .map(Token::EntityRef)
            .map_err(|_| StepError::lexer(start.line, start.col, format!("invalid entity id: {digits}")))
    }

    fn read_string(&mut self, start: Position) -> Result<Token> {
        self.advance(); // opening quote
        let mut content = Vec::new();
        loop {
            match self.advance() {
                None => return Err(StepError::lexer(start.line, start.col, "unterminated string")),
                Some(b'\'') if self.peek() == Some(b'\'') => {
                    self.advance();
                    content.push(b'\'');
                }
                Some(b'\'') => break,
                Some(ch) => content.push(ch),
            }
        }
        Ok(Token::String(String::from_utf8_lossy(&content).into_owned()))
    }

    fn read_binary(&mut self, start: Position) -> Result<Token> {
        self.advance(); // opening '"'
        let hex = self.take_while(|c| c.is_ascii_hexdigit());
        if self.advance() != Some(b'"') {
            return Err(StepError::lexer(start.line, start.col, "unterminated binary literal"));
        }
        Ok(Token::Binary(hex))
    }

    fn read_enum(&mut self, start: Position) -> Result<Token> {
        self.advance(); // opening '.'
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        if self.peek() != Some(b'.') {
            return Err(StepError::lexer(start.line, start.col, "unterminated enumeration"));
        }
        self.advance();
        if name.is_empty() {
            return Err(StepError::lexer(start.line, start.col, "empty enumeration"));
        }
        Ok(Token::Enum(name.to_ascii_uppercase()))
    }

    fn read_number(&mut self, start: Position) -> Result<Token> {
        let begin = self.pos;
        let mut is_real = false;

        if matches!(self.peek(), Some(b'-' | b'+')) {
            self.advance();
        }
        self.take_while(|c| c.is_ascii_digit());

        // A '.' directly after the digits is always a decimal point; `1.` is a
        // valid Part 21 real.
        if self.peek() == Some(b'.') {
            is_real = true;
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }

        if matches!(self.peek(), Some(b'E' | b'e')) {
            is_real = true;
            self.advance();
            if matches!(self.peek(), Some(b'-' | b'+')) {
                self.advance();
            }
            let exp = self.take_while(|c| c.is_ascii_digit());
            if exp.is_empty() {
                return Err(StepError::lexer(start.line, start.col, "missing exponent digits"));
            }
        }

        let text = String::from_utf8_lossy(&self.input[begin..self.pos]).into_owned();
        if is_real {
            text.parse()
                .map(Token::Real)
                .map_err(|_| StepError::lexer(start.line, start.col, format!("invalid real number: {text}")))
        } else {
            text.parse()
                .map(Token::Integer)
                .map_err(|_| StepError::lexer(start.line, start.col, format!("invalid integer: {text}")))
        }
    }

    fn read_keyword(&mut self) -> Token {
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_' || c == b'-' || c == b'!');
        Token::Keyword(name.to_ascii_uppercase())
    }
}
