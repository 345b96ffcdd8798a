//! Content store port and its in-memory and filesystem implementations
//!
//! The version engine never performs raw file I/O itself; all bytes flow
//! through the `ContentStore` trait. References are the hex encoding of the
//! content's BLAKE3 hash, so `put` is naturally idempotent and identical
//! content is stored once.

use crate::hash::{hash_bytes, ContentHash};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Error raised by content store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("content not found: {0}")]
    NotFound(String),
    #[error("invalid content reference: {0}")]
    InvalidRef(String),
    #[error("content store I/O failure")]
    Io(#[from] std::io::Error),
}

/// Opaque reference to stored content (hex of the content hash)
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ContentRef(String);

impl ContentRef {
    /// Build a reference from a content hash
    pub fn from_hash(hash: &ContentHash) -> Self {
        Self(hash.to_hex())
    }

    /// The reference as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the reference back into its content hash
    pub fn to_hash(&self) -> Result<ContentHash, StoreError> {
        ContentHash::from_hex(&self.0).map_err(|_| StoreError::InvalidRef(self.0.clone()))
    }
}

impl From<String> for ContentRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ContentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte-level get/put by reference
pub trait ContentStore: Send + Sync {
    /// Retrieve the bytes behind a reference
    fn get(&self, content_ref: &ContentRef) -> Result<Vec<u8>, StoreError>;

    /// Store bytes, returning a stable reference
    fn put(&self, data: &[u8]) -> Result<ContentRef, StoreError>;

    /// Whether a reference resolves without fetching it
    fn contains(&self, content_ref: &ContentRef) -> bool;
}

/// In-memory content-addressed store
///
/// Suitable for tests and for callers that persist elsewhere. Identical
/// content maps to the same key, so repeated `put`s are free.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: DashMap<ContentHash, Arc<[u8]>>,
}

impl MemoryContentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the store holds no blobs
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl ContentStore for MemoryContentStore {
    fn get(&self, content_ref: &ContentRef) -> Result<Vec<u8>, StoreError> {
        let hash = content_ref.to_hash()?;
        self.blobs
            .get(&hash)
            .map(|entry| entry.value().to_vec())
            .ok_or_else(|| StoreError::NotFound(content_ref.to_string()))
    }

    fn put(&self, data: &[u8]) -> Result<ContentRef, StoreError> {
        let hash = hash_bytes(data);
        self.blobs.entry(hash).or_insert_with(|| Arc::from(data));
        Ok(ContentRef::from_hash(&hash))
    }

    fn contains(&self, content_ref: &ContentRef) -> bool {
        match content_ref.to_hash() {
            Ok(hash) => self.blobs.contains_key(&hash),
            Err(_) => false,
        }
    }
}

/// Filesystem-backed content-addressed store
///
/// Objects live under `<root>/<first-two-hex>/<remaining-hex>`. Writes go to
/// a temp file in the root and are renamed into place, so a crash never
/// leaves a partial object at its final path.
pub struct FsContentStore {
    root: PathBuf,
}

impl FsContentStore {
    /// Open a store rooted at the given directory, creating it if needed
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory of the store
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, hash: &ContentHash) -> PathBuf {
        let hex = hash.to_hex();
        self.root.join(&hex[..2]).join(&hex[2..])
    }
}

impl ContentStore for FsContentStore {
    fn get(&self, content_ref: &ContentRef) -> Result<Vec<u8>, StoreError> {
        let hash = content_ref.to_hash()?;
        let path = self.object_path(&hash);
        match std::fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(content_ref.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn put(&self, data: &[u8]) -> Result<ContentRef, StoreError> {
        let hash = hash_bytes(data);
        let hex = hash.to_hex();
        let dir = self.root.join(&hex[..2]);
        let path = dir.join(&hex[2..]);

        if !path.exists() {
            std::fs::create_dir_all(&dir)?;

            let tmp = self.root.join(format!(".ingest-{hex}"));
            std::fs::write(&tmp, data)?;
            std::fs::rename(&tmp, &path)?;
        }

        Ok(ContentRef::from_hash(&hash))
    }

    fn contains(&self, content_ref: &ContentRef) -> bool {
        match content_ref.to_hash() {
            Ok(hash) => self.object_path(&hash).exists(),
            Err(_) => false,
        }
    }
}

impl std::fmt::Debug for FsContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsContentStore")
            .field("root", &self.root)
            .finish()
    }
}
