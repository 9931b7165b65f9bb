//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelId`] — identifier of a local model file
//! - [`error::DomainError`] — domain-level errors
//! - [`time::Timestamp`] — epoch-millisecond timestamps

pub mod error;
pub mod model;
pub mod string;
pub mod time;
