//! Content addressing primitives and the content store port
//!
//! This crate provides:
//! - `ContentHash`: BLAKE3-based content identity
//! - `ContentStore`: the byte-storage port the version engine writes through
//! - In-memory and filesystem-backed store implementations

pub mod hash;
pub mod store;

pub use hash::{hash_bytes, ContentHash, HashParseError, IncrementalHasher};
pub use store::{ContentRef, ContentStore, FsContentStore, MemoryContentStore, StoreError};
