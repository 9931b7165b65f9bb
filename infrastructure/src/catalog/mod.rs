//! Local model inventory.
//!
//! Provides [`LocalModelCatalog`], which implements the
//! [`ModelCatalog`](pocketllm_application::ModelCatalog) port on top of a
//! persisted manifest of model files already on disk.

mod local_catalog;

pub use local_catalog::{CatalogError, LocalModelCatalog};
