//! Durable key/value storage.
//!
//! Provides [`FileKeyValueStore`], which implements the
//! [`KeyValueStore`](pocketllm_application::KeyValueStore) port with one file
//! per key.

mod file_store;

pub use file_store::FileKeyValueStore;
