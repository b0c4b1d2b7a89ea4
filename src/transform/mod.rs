//! Source-level transformations on the AST.

pub mod unrolling;

pub use unrolling::{UnrollStats, Unrolling, MAX_FACTOR};

use crate::frontend::ast::Program;
use log::info;

/// Transformation pass trait.
pub trait Transform {
    /// Apply the transformation, returning whether the program changed.
    fn apply(&self, program: &mut Program) -> bool;

    /// Get transformation name.
    fn name(&self) -> &str;
}

/// Run passes in order. Returns whether any of them changed the program.
pub fn run_passes(program: &mut Program, passes: &[Box<dyn Transform>]) -> bool {
    let mut changed = false;
    for pass in passes {
        let pass_changed = pass.apply(program);
        info!(
            "pass '{}': {}",
            pass.name(),
            if pass_changed { "changed program" } else { "no change" }
        );
        changed |= pass_changed;
    }
    changed
}
