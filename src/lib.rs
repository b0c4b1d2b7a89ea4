//! # MAS-Lang - front end and loop-unrolling optimizer
//!
//! A compiler front end for MAS-Lang, a small imperative teaching language:
//! - Recursive-descent parsing into a typed AST
//! - Semantic checking that reports every error in one pass
//! - Loop unrolling with remainder loops, as an AST-to-AST rewrite
//! - Code generation to C or back to MAS-Lang source
//!
//! ## Architecture
//!
//! ```text
//! Source → Lexer → Parser → Checker → Unroller → CodeGen → Output
//! ```
//!
//! ## Example
//!
//! ```rust
//! use maslang::{CompileConfig, codegen::Target};
//!
//! let source = r#"
//!     int x = 0;
//!     for (i = 0; i < 10; i = i + 1) {
//!         x = x + 1;
//!     }
//!     print(x);
//! "#;
//!
//! let config = CompileConfig { unroll_factor: 5, target: Target::Source, ..Default::default() };
//! let unrolled = maslang::compile(source, &config)?;
//! assert!(unrolled.contains("i = i + 5"));
//! # Ok::<(), maslang::utils::errors::CompileError>(())
//! ```

#![warn(clippy::all)]

pub mod codegen;
pub mod frontend;
pub mod transform;
pub mod utils;

// Re-export commonly used types
pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::codegen::{CodeGenerator, Target};
    pub use crate::frontend::ast::*;
    pub use crate::frontend::{Checker, Lexer, Parser, TokenKind, TokenSource};
    pub use crate::transform::{Transform, UnrollStats, Unrolling};
    pub use crate::utils::errors::*;
    pub use crate::CompileConfig;
}

use frontend::ast::Program;
use log::{debug, info};
use transform::{Transform, Unrolling};
use utils::errors::{CompileResult, SemanticError};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parse source code into an AST.
pub fn parse(source: &str) -> CompileResult<Program> {
    frontend::parse(source)
}

/// Check a parsed program, returning every semantic error found.
pub fn check(program: &Program) -> Vec<SemanticError> {
    frontend::check(program)
}

/// Parse and check. Fails with every semantic error if there are any.
pub fn analyze(source: &str) -> CompileResult<Program> {
    frontend::parse_and_check(source)
}

/// Configuration for the compilation pipeline.
#[derive(Debug, Clone)]
pub struct CompileConfig {
    /// Enable loop unrolling
    pub enable_unrolling: bool,
    /// Copies of the loop body per unrolled iteration
    pub unroll_factor: i64,
    /// Target for code generation
    pub target: codegen::Target,
    /// Verbosity level: 0 errors only, 1 warnings, then info, debug, trace
    pub verbosity: u8,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            enable_unrolling: true,
            unroll_factor: 2,
            target: codegen::Target::C,
            verbosity: 1,
        }
    }
}

impl CompileConfig {
    /// No optimization, C output.
    pub fn unoptimized() -> Self {
        Self { enable_unrolling: false, ..Default::default() }
    }

    /// Log level for the configured verbosity.
    pub fn log_level(&self) -> log::LevelFilter {
        match self.verbosity {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }

    /// The transformation passes this configuration enables, in order.
    pub fn passes(&self) -> Vec<Box<dyn Transform>> {
        let mut passes: Vec<Box<dyn Transform>> = Vec::new();
        if self.enable_unrolling && self.unroll_factor > 1 {
            passes.push(Box::new(Unrolling::new(self.unroll_factor)));
        }
        passes
    }
}

/// Run the optimization pipeline.
pub fn optimize(mut program: Program, config: &CompileConfig) -> Program {
    let passes = config.passes();
    if passes.is_empty() {
        debug!("no optimization passes enabled");
        return program;
    }
    transform::run_passes(&mut program, &passes);
    program
}

/// Full pipeline: parse, check, optimize and generate code.
pub fn compile(source: &str, config: &CompileConfig) -> CompileResult<String> {
    info!("compiling {} bytes for target {}", source.len(), config.target);
    let program = analyze(source)?;
    let program = optimize(program, config);
    codegen::generate(&program, config.target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config() {
        let config = CompileConfig::default();
        assert!(config.enable_unrolling);
        assert_eq!(config.unroll_factor, 2);
        assert_eq!(config.target, codegen::Target::C);
        assert_eq!(config.passes().len(), 1);
    }

    #[test]
    fn test_passes_follow_config() {
        assert!(CompileConfig::unoptimized().passes().is_empty());
        let config = CompileConfig { unroll_factor: 1, ..Default::default() };
        assert!(config.passes().is_empty());
    }

    #[test]
    fn test_log_level_follows_verbosity() {
        assert_eq!(CompileConfig::default().log_level(), log::LevelFilter::Warn);
        let quiet = CompileConfig { verbosity: 0, ..Default::default() };
        assert_eq!(quiet.log_level(), log::LevelFilter::Error);
        let loud = CompileConfig { verbosity: 9, ..Default::default() };
        assert_eq!(loud.log_level(), log::LevelFilter::Trace);
    }

    #[test]
    fn test_optimize_without_passes_is_identity() {
        let program = parse("for (i = 0; i < 4; i++) { print(i); }").unwrap();
        let optimized = optimize(program.clone(), &CompileConfig::unoptimized());
        assert_eq!(optimized, program);
    }
}
