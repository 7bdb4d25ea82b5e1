//! Core types shared across the engine.
//!
//! Currently the typed error surface; see [`error`] for the taxonomy and
//! the recovery policy distinguishing surfaced errors from degradations.

pub mod error;

pub use error::{BinderyError, Result};
