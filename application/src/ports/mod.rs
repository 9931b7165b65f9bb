//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure and presentation adapters
//! must implement.

pub mod conversation_logger;
pub mod key_value_store;
pub mod model_catalog;
pub mod model_runtime;
pub mod session_observer;
