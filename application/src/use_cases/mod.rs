//! Use cases (application services)
//!
//! Use cases orchestrate domain logic and port interactions.

pub mod session_controller;
