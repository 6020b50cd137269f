//! Row layout and page geometry.
//!
//! Field spans are computed once from the declared column widths; every
//! other module addresses bytes through these values instead of through
//! the in-memory shape of [`crate::Row`].

use std::ops::Range;

use crate::error::{Result, StorageError};
use crate::{COLUMN_EMAIL_SIZE, COLUMN_USERNAME_SIZE, ID_SIZE, PAGE_SIZE, TABLE_MAX_PAGES};

/// Byte span of one column inside an encoded row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpan {
    pub offset: usize,
    pub width: usize,
}

impl FieldSpan {
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.width
    }

    fn after(&self, width: usize) -> FieldSpan {
        FieldSpan {
            offset: self.offset + self.width,
            width,
        }
    }
}

/// Fixed-width layout of a row: id, then username, then email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowLayout {
    pub id: FieldSpan,
    pub username: FieldSpan,
    pub email: FieldSpan,
    pub row_size: usize,
}

impl RowLayout {
    pub fn new(username_width: usize, email_width: usize) -> Self {
        let id = FieldSpan {
            offset: 0,
            width: ID_SIZE,
        };
        let username = id.after(username_width);
        let email = username.after(email_width);
        Self {
            id,
            username,
            email,
            row_size: email.offset + email.width,
        }
    }
}

impl Default for RowLayout {
    fn default() -> Self {
        Self::new(COLUMN_USERNAME_SIZE, COLUMN_EMAIL_SIZE)
    }
}

/// Page geometry of the heap file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    row: RowLayout,
    page_size: usize,
    max_pages: usize,
}

impl Layout {
    pub fn new(row: RowLayout, page_size: usize, max_pages: usize) -> Result<Self> {
        if row.row_size == 0 {
            return Err(StorageError::invalid_layout("row size must be at least 1 byte"));
        }
        if page_size < row.row_size {
            return Err(StorageError::invalid_layout(format!(
                "page size {} cannot hold a {}-byte row",
                page_size, row.row_size
            )));
        }
        if max_pages == 0 {
            return Err(StorageError::invalid_layout("max pages must be at least 1"));
        }
        // Capacity and the byte offset of the last page must both be addressable.
        let rows_per_page = page_size / row.row_size;
        if rows_per_page.checked_mul(max_pages).is_none()
            || page_size.checked_mul(max_pages).is_none()
        {
            return Err(StorageError::invalid_layout(format!(
                "{} pages of {} bytes overflow the addressable range",
                max_pages, page_size
            )));
        }
        Ok(Self {
            row,
            page_size,
            max_pages,
        })
    }

    pub fn row(&self) -> &RowLayout {
        &self.row
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn max_pages(&self) -> usize {
        self.max_pages
    }

    pub fn row_size(&self) -> usize {
        self.row.row_size
    }

    pub fn rows_per_page(&self) -> usize {
        self.page_size / self.row.row_size
    }

    /// Maximum number of rows the table can hold.
    pub fn capacity(&self) -> usize {
        self.rows_per_page() * self.max_pages
    }

    pub fn page_of(&self, row_no: usize) -> usize {
        row_no / self.rows_per_page()
    }

    pub fn offset_in_page(&self, row_no: usize) -> usize {
        (row_no % self.rows_per_page()) * self.row.row_size
    }

    /// Number of rows stored in a backing file of `file_length` bytes.
    ///
    /// Interior pages are written whole, so their unused tail counts toward
    /// the length; only the last partial page is written row by row.
    pub fn rows_in_file(&self, file_length: u64) -> Result<usize> {
        let page_size = self.page_size as u64;
        let row_size = self.row.row_size as u64;
        let full_pages = file_length / page_size;
        let tail = file_length % page_size;

        if tail % row_size != 0 {
            return Err(StorageError::corruption(format!(
                "file length {} leaves a {}-byte tail that is not a whole number of {}-byte rows",
                file_length, tail, row_size
            )));
        }
        let tail_rows = tail / row_size;
        if tail_rows >= self.rows_per_page() as u64 {
            return Err(StorageError::corruption(format!(
                "file length {} leaves {} rows in a page that holds {}",
                file_length,
                tail_rows,
                self.rows_per_page()
            )));
        }

        let rows = full_pages * self.rows_per_page() as u64 + tail_rows;
        if rows > self.capacity() as u64 {
            return Err(StorageError::corruption(format!(
                "file holds {} rows but the table capacity is {}",
                rows,
                self.capacity()
            )));
        }
        Ok(rows as usize)
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            row: RowLayout::default(),
            page_size: PAGE_SIZE,
            max_pages: TABLE_MAX_PAGES,
        }
    }
}
