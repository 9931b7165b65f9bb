//! Application-level configuration.
//!
//! - [`GenerationSettings`] — stop sequences and token cap for each turn
//! - [`RuntimeOptions`] — engine initialization parameters

pub mod generation;
pub mod runtime_options;

pub use generation::GenerationSettings;
pub use runtime_options::RuntimeOptions;
