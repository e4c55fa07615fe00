//! Durable entity storage and the shared best-effort KV cache.

pub mod durable;
pub mod kv;

pub use durable::{DurableStore, FileStore, MemoryStore};
pub use kv::KvStore;
