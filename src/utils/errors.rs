//! Error types for the compiler.
//!
//! Each phase has its own error type; [`CompileError`] wraps them for the
//! library entry points.

use crate::frontend::token::TokenKind;
use crate::utils::location::Span;
use std::fmt;
use thiserror::Error;

/// Top-level error type for a compilation.
#[derive(Error, Debug)]
pub enum CompileError {
    /// Error during tokenization
    #[error("Lexer error: {0}")]
    Lexer(#[from] LexerError),

    /// First syntax error found by the parser
    #[error("Syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    /// Every error found by the semantic checker
    #[error("Semantic errors:\n{0}")]
    Semantic(#[from] SemanticErrors),

    /// Error raised by a code generator
    #[error("Code generation error: {0}")]
    Codegen(#[from] CodegenError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CompileError {
    /// Spans worth pointing at when rendering this error.
    pub fn spans(&self) -> Vec<Span> {
        match self {
            CompileError::Lexer(e) => vec![e.span],
            CompileError::Syntax(e) => vec![e.span],
            CompileError::Semantic(errors) => errors.iter().map(|e| e.span).collect(),
            CompileError::Codegen(_) | CompileError::Io(_) => Vec::new(),
        }
    }
}

/// Error during lexical analysis.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at {span}")]
pub struct LexerError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of lexer error
    pub kind: LexerErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexerErrorKind {
    /// Character that starts no token
    UnexpectedChar,
    /// String literal without closing quote
    UnterminatedString,
    /// Character literal without closing quote, or empty
    UnterminatedChar,
    /// Malformed number literal
    InvalidNumber,
    /// Unknown escape sequence
    InvalidEscape,
}

/// An unexpected token. Parsing stops at the first one.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct SyntaxError {
    /// The token kind or grammar rule that was expected
    pub expected: String,
    /// The kind of token that was found instead
    pub found: TokenKind,
    /// The text of the offending token
    pub found_lexeme: String,
    /// Location of the offending token
    pub span: Span,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)?;
        if !self.found_lexeme.is_empty() && self.found_lexeme != self.found.name() {
            write!(f, " `{}`", self.found_lexeme)?;
        }
        write!(f, " at {}", self.span)
    }
}

/// Error found by the semantic checker.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message} at {span}")]
pub struct SemanticError {
    /// The error message
    pub message: String,
    /// Location in source
    pub span: Span,
    /// The kind of semantic error
    pub kind: SemanticErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticErrorKind {
    /// Name declared twice
    AlreadyDeclared,
    /// Name used or assigned before any declaration
    Undeclared,
    /// Value type incompatible with its destination or context
    TypeMismatch,
    /// Operator applied to operand types it does not support
    InvalidOperationForType,
    /// Literal zero used as a divisor
    DivideByZeroLiteral,
}

impl fmt::Display for SemanticErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SemanticErrorKind::AlreadyDeclared => "already declared",
            SemanticErrorKind::Undeclared => "undeclared",
            SemanticErrorKind::TypeMismatch => "type mismatch",
            SemanticErrorKind::InvalidOperationForType => "invalid operation for type",
            SemanticErrorKind::DivideByZeroLiteral => "division by literal zero",
        };
        f.write_str(name)
    }
}

/// The non-empty list of errors from one semantic pass.
#[derive(Error, Debug, Clone, PartialEq)]
pub struct SemanticErrors(pub Vec<SemanticError>);

impl SemanticErrors {
    /// Iterate over the collected errors.
    pub fn iter(&self) -> std::slice::Iter<'_, SemanticError> {
        self.0.iter()
    }

    /// Number of collected errors.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no errors were collected.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Kinds of the collected errors, in report order.
    pub fn kinds(&self) -> Vec<SemanticErrorKind> {
        self.0.iter().map(|e| e.kind).collect()
    }
}

impl fmt::Display for SemanticErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  {}: {}", err.kind, err)?;
        }
        Ok(())
    }
}

/// Error during code generation.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct CodegenError {
    /// The error message
    pub message: String,
    /// The kind of codegen error
    pub kind: CodegenErrorKind,
}

impl CodegenError {
    /// A construct the backend cannot translate.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: CodegenErrorKind::UnsupportedFeature }
    }

    /// An expression whose type the backend could not determine.
    pub fn unknown_type(message: impl Into<String>) -> Self {
        Self { message: message.into(), kind: CodegenErrorKind::UnknownType }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodegenErrorKind {
    /// Feature not supported on target
    UnsupportedFeature,
    /// Expression type could not be determined
    UnknownType,
}

/// Result type using [`CompileError`].
pub type CompileResult<T> = Result<T, CompileError>;

/// Result type for code generators.
pub type CodegenResult<T> = Result<T, CodegenError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::location::SourceLocation;

    fn span() -> Span {
        Span::new(SourceLocation::new(1, 5, 4), SourceLocation::new(1, 6, 5))
    }

    #[test]
    fn test_syntax_error_display() {
        let err = SyntaxError {
            expected: "';'".to_string(),
            found: TokenKind::Identifier,
            found_lexeme: "y".to_string(),
            span: span(),
        };
        let s = err.to_string();
        assert!(s.contains("expected ';'"));
        assert!(s.contains("identifier `y`"));
        assert!(s.contains("1:5-6"));
    }

    #[test]
    fn test_semantic_errors_display_lists_all() {
        let errors = SemanticErrors(vec![
            SemanticError {
                message: "'a' is already declared".to_string(),
                span: span(),
                kind: SemanticErrorKind::AlreadyDeclared,
            },
            SemanticError {
                message: "'b' is not declared".to_string(),
                span: span(),
                kind: SemanticErrorKind::Undeclared,
            },
        ]);
        let s = CompileError::from(errors).to_string();
        assert!(s.contains("already declared: 'a'"));
        assert!(s.contains("undeclared: 'b'"));
    }
}
