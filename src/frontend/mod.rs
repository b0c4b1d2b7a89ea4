//! Frontend: Lexer, Parser, AST and semantic checker for MAS-Lang.
//!
//! ## Language Overview
//!
//! MAS-Lang is a small imperative language with scalar and array variables,
//! conditionals, counted and conditional loops, and printing:
//!
//! ```text
//! int total = 0;
//! array data = [4, 8, 15, 16, 23, 42];
//! for (int i = 0; i < 6; i++) {
//!     total += data[i];
//! }
//! if (total > 100) {
//!     print(concat("big: ", "yes"));
//! } else {
//!     print(total);
//! }
//! ```

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod semantic;
pub mod token;

// Re-exports
pub use ast::*;
pub use lexer::Lexer;
pub use parser::Parser;
pub use semantic::{check, Checker, SymbolTable, Typed};
pub use token::{Token, TokenKind, TokenSource, TokenStream};

use crate::utils::errors::{CompileResult, SemanticErrors};
use log::debug;

/// Parse source code into an AST.
pub fn parse(source: &str) -> CompileResult<Program> {
    let mut parser = Parser::new(Lexer::new(source))?;
    let program = parser.parse_program()?;
    debug!("parsed {} top-level statements", program.statements.len());
    Ok(program)
}

/// Parse and check, failing with every semantic error found.
pub fn parse_and_check(source: &str) -> CompileResult<Program> {
    let program = parse(source)?;
    let errors = check(&program);
    if !errors.is_empty() {
        return Err(SemanticErrors(errors).into());
    }
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::errors::CompileError;

    #[test]
    fn test_parse_simple() {
        let source = r#"
            int x = 0;
            for (i = 0; i < 10; i = i + 1) {
                x = x + i;
            }
        "#;
        assert!(parse(source).is_ok());
    }

    #[test]
    fn test_parse_and_check_reports_all_errors() {
        match parse_and_check("int a; int a; bool b = 1;") {
            Err(CompileError::Semantic(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected semantic errors, got {:?}", other),
        }
    }
}
