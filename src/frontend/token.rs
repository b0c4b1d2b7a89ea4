//! Tokens and the token-source contract consumed by the parser.

use crate::utils::errors::LexerError;
use crate::utils::location::Span;
use std::fmt;

/// A token in the source code.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token
    pub kind: TokenKind,
    /// The source span
    pub span: Span,
    /// The raw text; for string and char literals, the decoded contents
    pub lexeme: String,
}

impl Token {
    /// Create a new token.
    pub fn new(kind: TokenKind, span: Span, lexeme: impl Into<String>) -> Self {
        Self { kind, span, lexeme: lexeme.into() }
    }

    /// Check if this is an EOF token.
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, self.lexeme)
    }
}

/// Anything that yields tokens on demand.
///
/// After the end of input, implementations keep returning `Eof` tokens.
pub trait TokenSource {
    /// Produce the next token.
    fn next_token(&mut self) -> Result<Token, LexerError>;
}

/// A token source over an already tokenized input.
#[derive(Debug, Clone)]
pub struct TokenStream {
    tokens: std::vec::IntoIter<Token>,
    eof_span: Span,
}

impl TokenStream {
    /// Wrap a token vector. A trailing `Eof` is optional.
    pub fn new(tokens: Vec<Token>) -> Self {
        let eof_span = tokens.last().map(|t| t.span).unwrap_or_default();
        Self { tokens: tokens.into_iter(), eof_span }
    }
}

impl TokenSource for TokenStream {
    fn next_token(&mut self) -> Result<Token, LexerError> {
        Ok(self
            .tokens
            .next()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, self.eof_span, "")))
    }
}

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    /// Integer literal
    Integer,
    /// Floating-point literal
    Float,
    /// String literal
    String,
    /// Character literal
    Char,

    /// Identifier
    Identifier,

    // Type keywords
    /// `int`
    Int,
    /// `float`
    FloatType,
    /// `bool`
    Bool,
    /// `char`
    CharType,
    /// `string`
    StringType,
    /// `array`
    Array,

    // Keywords
    /// `if`
    If,
    /// `else`
    Else,
    /// `for`
    For,
    /// `while`
    While,
    /// `print`
    Print,
    /// `true`
    True,
    /// `false`
    False,
    /// `and`
    And,
    /// `or`
    Or,
    /// `not`
    Not,

    // Builtin operation keywords
    /// `concat`
    Concat,
    /// `pow`
    Pow,
    /// `abs`
    Abs,
    /// `length`
    Length,
    /// `min`
    Min,
    /// `max`
    Max,
    /// `index`
    Index,

    // Arithmetic operators
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `%`
    Percent,
    /// `^`
    Caret,
    /// `++`
    PlusPlus,
    /// `--`
    MinusMinus,

    // Comparison operators
    /// `==`
    EqualEqual,
    /// `!=`
    BangEqual,
    /// `<`
    Less,
    /// `<=`
    LessEqual,
    /// `>`
    Greater,
    /// `>=`
    GreaterEqual,

    // Assignment operators
    /// `=`
    Equal,
    /// `+=`
    PlusEqual,
    /// `-=`
    MinusEqual,
    /// `*=`
    StarEqual,
    /// `/=`
    SlashEqual,
    /// `%=`
    PercentEqual,

    // Logical operators
    /// `&&`
    AmpAmp,
    /// `||`
    PipePipe,
    /// `!`
    Bang,

    // Delimiters
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `[`
    LeftBracket,
    /// `]`
    RightBracket,
    /// `{`
    LeftBrace,
    /// `}`
    RightBrace,
    /// `,`
    Comma,
    /// `;`
    Semicolon,

    /// End of input
    Eof,
}

impl TokenKind {
    /// Check if this is a keyword.
    pub fn is_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Int | FloatType | Bool | CharType | StringType | Array |
            If | Else | For | While | Print | True | False | And | Or | Not |
            Concat | Pow | Abs | Length | Min | Max | Index
        )
    }

    /// Check if this keyword names a variable type.
    pub fn is_type_keyword(&self) -> bool {
        use TokenKind::*;
        matches!(self, Int | FloatType | Bool | CharType | StringType | Array)
    }

    /// Check if this is an assignment operator (including `++`/`--`).
    pub fn is_assignment(&self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Equal | PlusEqual | MinusEqual | StarEqual | SlashEqual | PercentEqual |
            PlusPlus | MinusMinus
        )
    }

    /// Get the keyword for a string, if it is a keyword.
    pub fn keyword(s: &str) -> Option<TokenKind> {
        let kind = match s {
            "int" => TokenKind::Int,
            "float" => TokenKind::FloatType,
            "bool" => TokenKind::Bool,
            "char" => TokenKind::CharType,
            "string" => TokenKind::StringType,
            "array" => TokenKind::Array,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "for" => TokenKind::For,
            "while" => TokenKind::While,
            "print" => TokenKind::Print,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "concat" => TokenKind::Concat,
            "pow" => TokenKind::Pow,
            "abs" => TokenKind::Abs,
            "length" => TokenKind::Length,
            "min" => TokenKind::Min,
            "max" => TokenKind::Max,
            "index" => TokenKind::Index,
            _ => return None,
        };
        Some(kind)
    }

    /// Get a human-readable name for this token kind.
    pub fn name(&self) -> &'static str {
        use TokenKind::*;
        match self {
            Integer => "integer",
            Float => "float literal",
            String => "string literal",
            Char => "char literal",
            Identifier => "identifier",
            Int => "int",
            FloatType => "float",
            Bool => "bool",
            CharType => "char",
            StringType => "string",
            Array => "array",
            If => "if",
            Else => "else",
            For => "for",
            While => "while",
            Print => "print",
            True => "true",
            False => "false",
            And => "and",
            Or => "or",
            Not => "not",
            Concat => "concat",
            Pow => "pow",
            Abs => "abs",
            Length => "length",
            Min => "min",
            Max => "max",
            Index => "index",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Caret => "^",
            PlusPlus => "++",
            MinusMinus => "--",
            EqualEqual => "==",
            BangEqual => "!=",
            Less => "<",
            LessEqual => "<=",
            Greater => ">",
            GreaterEqual => ">=",
            Equal => "=",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            PercentEqual => "%=",
            AmpAmp => "&&",
            PipePipe => "||",
            Bang => "!",
            LeftParen => "(",
            RightParen => ")",
            LeftBracket => "[",
            RightBracket => "]",
            LeftBrace => "{",
            RightBrace => "}",
            Comma => ",",
            Semicolon => ";",
            Eof => "end of file",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_keyword() || matches!(self, TokenKind::Identifier | TokenKind::Eof)
            || self.name().contains(' ')
        {
            write!(f, "{}", self.name())
        } else {
            write!(f, "'{}'", self.name())
        }
    }
}
