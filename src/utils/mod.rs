//! Utility modules shared by every phase:
//! - Error types
//! - Source location tracking
//! - Indented text output

pub mod errors;
pub mod location;
pub mod pretty;

// Re-exports
pub use errors::*;
pub use location::{SourceLocation, SourceMap, Span};
pub use pretty::CodeFormatter;
