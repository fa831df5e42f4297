//! Service implementations
//!
//! Real implementations of the storage and source traits. These handle the
//! actual I/O; the core modules never touch them directly.

pub mod memory_store;
pub mod source_provider;
pub mod sqlite_store;

#[cfg(test)]
mod tests;

// Re-export all service implementations
pub use memory_store::InMemoryStore;
pub use source_provider::JsonSourceProvider;
pub use sqlite_store::SqliteStore;
