//! Error types for the storage core.

use thiserror::Error;

/// Result type alias for storage operations
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by the pager, the table and the open/close bracket.
///
/// Only [`StorageError::TableFull`] is recoverable; every other variant means
/// the database can no longer be trusted and the embedding shell should stop.
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O error from the backing file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Page number beyond the fixed page ceiling
    #[error("Tried to fetch page number out of bounds: {page_no} >= {max_pages}")]
    PageOutOfBounds { page_no: usize, max_pages: usize },

    /// Flush requested for a page that was never faulted in
    #[error("Tried to flush page {0} which is not resident")]
    PageNotResident(usize),

    /// Flush byte count larger than a page
    #[error("Tried to flush {bytes} bytes from a {page_size}-byte page")]
    FlushTooLarge { bytes: usize, page_size: usize },

    /// Every row slot is taken
    #[error("Table full: capacity is {capacity} rows")]
    TableFull { capacity: usize },

    /// Backing file does not hold a whole number of rows
    #[error("Corrupt database file: {0}")]
    Corrupted(String),

    /// Page geometry that cannot hold a row
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

impl StorageError {
    /// Create a corruption error with a message
    pub fn corruption(msg: impl Into<String>) -> Self {
        Self::Corrupted(msg.into())
    }

    /// Create an invalid layout error
    pub fn invalid_layout(msg: impl Into<String>) -> Self {
        Self::InvalidLayout(msg.into())
    }

    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::TableFull { .. })
    }
}
