//! `llama-server` runtime adapter
//!
//! Implements the [`ModelRuntime`](pocketllm_application::ModelRuntime) port by
//! running one `llama-server` child process per loaded model and talking to
//! its OpenAI-compatible HTTP API.
//!
//! # Module structure
//!
//! - [`server`] — child process lifecycle and health polling
//! - [`protocol`] — request/response bodies of the chat completions endpoint
//! - [`sse`] — server-sent event line framing
//! - [`runtime`] — [`LlamaServerRuntime`] and the resident model handle

pub mod error;
pub mod protocol;
pub mod runtime;
pub mod server;
pub mod sse;

pub use error::LlamaError;
pub use runtime::{LlamaServerConfig, LlamaServerRuntime};
