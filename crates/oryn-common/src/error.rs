//! Error types for OrynDB.

use crate::page::PageId;
use thiserror::Error;

/// Result type alias using OrynError.
pub type Result<T> = std::result::Result<T, OrynError>;

/// Errors that can occur in OrynDB operations.
#[derive(Debug, Error)]
pub enum OrynError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    IoError(String),

    // Buffer pool errors
    #[error("Buffer pool full, unable to allocate frame")]
    BufferPoolFull,

    #[error("Invalid page id")]
    InvalidPageId,

    #[error("Page not found: {page_id}")]
    PageNotFound { page_id: PageId },

    #[error("Page {page_id} is pinned ({pin_count} pins)")]
    PagePinned { page_id: PageId, pin_count: u32 },

    // B+ tree index errors
    #[error("all pages are pinned")]
    AllPagesPinned,

    #[error("B+ tree node full")]
    NodeFull,

    #[error("Invalid node type")]
    InvalidNodeType,

    #[error("B+ tree corrupted: {0}")]
    BTreeCorrupted(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}
