//! Lexer for MAS-Lang.
//!
//! The lexer converts source text into a stream of tokens on demand.

use crate::frontend::token::{Token, TokenKind, TokenSource};
use crate::utils::errors::{LexerError, LexerErrorKind};
use crate::utils::location::{SourceLocation, SourceMap, Span};
use std::iter::Peekable;
use std::str::Chars;
use unicode_xid::UnicodeXID;

/// A lexer for tokenizing source code.
pub struct Lexer<'a> {
    /// The source text
    source: &'a str,
    /// Character iterator
    chars: Peekable<Chars<'a>>,
    /// Current byte offset
    offset: usize,
    /// Current line number (1-indexed)
    line: usize,
    /// Current column number (1-indexed)
    column: usize,
    /// Start of current token
    token_start: SourceLocation,
    /// Whether we've produced EOF
    at_eof: bool,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            token_start: SourceLocation::start(),
            at_eof: false,
        }
    }

    /// Build a source map for rendering diagnostics over this input.
    pub fn source_map(&self) -> SourceMap {
        SourceMap::new(self.source)
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column, self.offset)
    }

    fn mark_token_start(&mut self) {
        self.token_start = self.current_location();
    }

    fn make_span(&self) -> Span {
        Span::new(self.token_start, self.current_location())
    }

    /// Peek at the current character without consuming it.
    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Peek at the next character (one ahead).
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.offset..].chars();
        chars.next();
        chars.next()
    }

    /// Consume and return the current character.
    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    /// Consume the current character if it matches.
    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Skip whitespace and comments. Block comments nest.
    fn skip_whitespace(&mut self) {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                Some('/') if self.peek_next() == Some('*') => {
                    self.advance();
                    self.advance();
                    let mut depth = 1;
                    while depth > 0 {
                        match self.advance() {
                            Some('*') if self.peek() == Some('/') => {
                                self.advance();
                                depth -= 1;
                            }
                            Some('/') if self.peek() == Some('*') => {
                                self.advance();
                                depth += 1;
                            }
                            None => break,
                            _ => {}
                        }
                    }
                }
                _ => break,
            }
        }
    }

    /// Create a token whose lexeme is the scanned source text.
    fn make_token(&self, kind: TokenKind) -> Token {
        let span = self.make_span();
        let lexeme = &self.source[span.start.offset..span.end.offset];
        Token::new(kind, span, lexeme)
    }

    fn make_error(&self, message: &str, kind: LexerErrorKind) -> LexerError {
        LexerError {
            message: message.to_string(),
            span: self.make_span(),
            kind,
        }
    }

    fn is_digit(c: Option<char>) -> bool {
        c.map(|c| c.is_ascii_digit()).unwrap_or(false)
    }

    /// Scan a number literal. The first digit is already consumed.
    fn scan_number(&mut self) -> Result<Token, LexerError> {
        while Self::is_digit(self.peek()) {
            self.advance();
        }

        let mut is_float = false;

        if self.peek() == Some('.') && Self::is_digit(self.peek_next()) {
            is_float = true;
            self.advance();
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }

        if self.peek() == Some('e') || self.peek() == Some('E') {
            is_float = true;
            self.advance();
            if self.peek() == Some('+') || self.peek() == Some('-') {
                self.advance();
            }
            if !Self::is_digit(self.peek()) {
                return Err(self.make_error(
                    "Invalid floating-point exponent",
                    LexerErrorKind::InvalidNumber,
                ));
            }
            while Self::is_digit(self.peek()) {
                self.advance();
            }
        }

        // `12abc` is one malformed token, not a number followed by a name
        if self.peek().map(|c| c.is_xid_continue()).unwrap_or(false) {
            while self.peek().map(|c| c.is_xid_continue()).unwrap_or(false) {
                self.advance();
            }
            return Err(self.make_error("Invalid number literal", LexerErrorKind::InvalidNumber));
        }

        if is_float {
            Ok(self.make_token(TokenKind::Float))
        } else {
            Ok(self.make_token(TokenKind::Integer))
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self.peek().map(|c| c.is_xid_continue()).unwrap_or(false) {
            self.advance();
        }

        let span = self.make_span();
        let lexeme = &self.source[span.start.offset..span.end.offset];
        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Identifier);
        Token::new(kind, span, lexeme)
    }

    /// Decode the character after a backslash.
    fn scan_escape(&mut self, quote: char) -> Result<char, LexerError> {
        match self.advance() {
            Some('n') => Ok('\n'),
            Some('t') => Ok('\t'),
            Some('r') => Ok('\r'),
            Some('\\') => Ok('\\'),
            Some('0') => Ok('\0'),
            Some('"') => Ok('"'),
            Some('\'') => Ok('\''),
            Some(c) if c != '\n' => Err(self.make_error(
                &format!("Invalid escape sequence: \\{}", c),
                LexerErrorKind::InvalidEscape,
            )),
            _ if quote == '"' => Err(self.make_error(
                "Unterminated string literal",
                LexerErrorKind::UnterminatedString,
            )),
            _ => Err(self.make_error(
                "Unterminated character literal",
                LexerErrorKind::UnterminatedChar,
            )),
        }
    }

    /// Scan a string literal. The opening quote is already consumed.
    fn scan_string(&mut self) -> Result<Token, LexerError> {
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('"') => break,
                Some('\\') => value.push(self.scan_escape('"')?),
                Some('\n') | None => {
                    return Err(self.make_error(
                        "Unterminated string literal",
                        LexerErrorKind::UnterminatedString,
                    ));
                }
                Some(c) => value.push(c),
            }
        }

        Ok(Token::new(TokenKind::String, self.make_span(), value))
    }

    /// Scan a character literal. The opening quote is already consumed.
    fn scan_char(&mut self) -> Result<Token, LexerError> {
        let value = match self.advance() {
            Some('\\') => self.scan_escape('\'')?,
            Some('\'') => {
                return Err(self.make_error(
                    "Empty character literal",
                    LexerErrorKind::UnterminatedChar,
                ));
            }
            Some(c) if c != '\n' => c,
            _ => {
                return Err(self.make_error(
                    "Unterminated character literal",
                    LexerErrorKind::UnterminatedChar,
                ));
            }
        };

        if !self.match_char('\'') {
            return Err(self.make_error(
                "Unterminated character literal",
                LexerErrorKind::UnterminatedChar,
            ));
        }

        Ok(Token::new(TokenKind::Char, self.make_span(), value.to_string()))
    }

    /// Pick `with` if the next character is `next`, else `without`.
    fn either(&mut self, next: char, with: TokenKind, without: TokenKind) -> Token {
        if self.match_char(next) {
            self.make_token(with)
        } else {
            self.make_token(without)
        }
    }

    /// Scan the next token.
    pub fn next_token(&mut self) -> Result<Token, LexerError> {
        self.skip_whitespace();
        self.mark_token_start();

        let c = match self.advance() {
            Some(c) => c,
            None => {
                self.at_eof = true;
                return Ok(self.make_token(TokenKind::Eof));
            }
        };

        let token = match c {
            '(' => self.make_token(TokenKind::LeftParen),
            ')' => self.make_token(TokenKind::RightParen),
            '[' => self.make_token(TokenKind::LeftBracket),
            ']' => self.make_token(TokenKind::RightBracket),
            '{' => self.make_token(TokenKind::LeftBrace),
            '}' => self.make_token(TokenKind::RightBrace),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            '^' => self.make_token(TokenKind::Caret),

            '+' => {
                if self.match_char('+') {
                    self.make_token(TokenKind::PlusPlus)
                } else {
                    self.either('=', TokenKind::PlusEqual, TokenKind::Plus)
                }
            }
            '-' => {
                if self.match_char('-') {
                    self.make_token(TokenKind::MinusMinus)
                } else {
                    self.either('=', TokenKind::MinusEqual, TokenKind::Minus)
                }
            }
            '*' => self.either('=', TokenKind::StarEqual, TokenKind::Star),
            '/' => self.either('=', TokenKind::SlashEqual, TokenKind::Slash),
            '%' => self.either('=', TokenKind::PercentEqual, TokenKind::Percent),
            '=' => self.either('=', TokenKind::EqualEqual, TokenKind::Equal),
            '!' => self.either('=', TokenKind::BangEqual, TokenKind::Bang),
            '<' => self.either('=', TokenKind::LessEqual, TokenKind::Less),
            '>' => self.either('=', TokenKind::GreaterEqual, TokenKind::Greater),
            '&' => {
                if self.match_char('&') {
                    self.make_token(TokenKind::AmpAmp)
                } else {
                    return Err(self.make_error(
                        "Expected '&&', found single '&'",
                        LexerErrorKind::UnexpectedChar,
                    ));
                }
            }
            '|' => {
                if self.match_char('|') {
                    self.make_token(TokenKind::PipePipe)
                } else {
                    return Err(self.make_error(
                        "Expected '||', found single '|'",
                        LexerErrorKind::UnexpectedChar,
                    ));
                }
            }

            '"' => return self.scan_string(),
            '\'' => return self.scan_char(),

            c if c.is_ascii_digit() => return self.scan_number(),

            c if c.is_xid_start() || c == '_' => self.scan_identifier(),

            _ => {
                return Err(self.make_error(
                    &format!("Unexpected character: '{}'", c),
                    LexerErrorKind::UnexpectedChar,
                ));
            }
        };
        Ok(token)
    }

    /// Check if we've reached EOF.
    pub fn is_at_end(&self) -> bool {
        self.at_eof
    }

    /// Collect all tokens into a vector, ending with `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexerError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }
}

impl TokenSource for Lexer<'_> {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        Lexer::next_token(self)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_eof {
            None
        } else {
            Some(self.next_token())
        }
    }
}
