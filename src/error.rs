// Typed error surfaces for the motor model, library loader, and simulator.
//
// Every fallible operation in this crate returns a `Result` against one of
// these enums instead of panicking. They are `#[non_exhaustive]` so a future
// variant is not a breaking change for downstream matches.

use thiserror::Error;

/// Errors constructing or updating a [`crate::motor::Motor`].
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum MotorError {
    #[error("invalid motor parameter `{field}`: {reason}")]
    InvalidParameter {
        field: &'static str,
        reason: &'static str,
    },
}

/// Errors loading or parsing a [`crate::library::MotorLibrary`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LibraryError {
    #[error("motor library is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Errors raised while stepping the closed-loop simulator.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SimulationError {
    #[error("simulation diverged at step {step} (t={time:.6}s): {reason}")]
    Diverged {
        step: usize,
        time: f64,
        reason: &'static str,
    },
}
