//! Page cache over the backing file.
//!
//! Pages are faulted in on first reference and stay resident until the
//! table is closed; there is no eviction. Slots are a flat array indexed
//! by page number, sized to the fixed page ceiling.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use log::{debug, info};

use crate::error::{Result, StorageError};

pub struct Pager {
    file: File,
    file_length: u64,
    page_size: usize,
    pages: Vec<Option<Box<[u8]>>>,
}

impl Pager {
    /// Opens or creates the backing file for read/write.
    pub fn open(path: &Path, page_size: usize, max_pages: usize) -> Result<Self> {
        let mut pages = Vec::new();
        pages.try_reserve_exact(max_pages).map_err(|e| {
            StorageError::invalid_layout(format!("cannot allocate {} page slots: {}", max_pages, e))
        })?;
        pages.resize_with(max_pages, || None);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let file_length = file.metadata()?.len();
        info!(
            "opened {} ({} bytes, {} page slots)",
            path.display(),
            file_length,
            max_pages
        );

        Ok(Self {
            file,
            file_length,
            page_size,
            pages,
        })
    }

    /// Length of the backing file when it was opened.
    pub fn file_length(&self) -> u64 {
        self.file_length
    }

    pub fn max_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn is_resident(&self, page_no: usize) -> bool {
        self.pages.get(page_no).is_some_and(Option::is_some)
    }

    /// Whole or partial pages present on disk.
    fn pages_on_disk(&self) -> u64 {
        self.file_length.div_ceil(self.page_size as u64)
    }

    /// Returns the resident buffer for `page_no`, reading it from disk on a miss.
    pub fn get_page(&mut self, page_no: usize) -> Result<&mut [u8]> {
        if page_no >= self.pages.len() {
            return Err(StorageError::PageOutOfBounds {
                page_no,
                max_pages: self.pages.len(),
            });
        }

        if self.pages[page_no].is_none() {
            let mut page = vec![0u8; self.page_size].into_boxed_slice();
            if (page_no as u64) < self.pages_on_disk() {
                let offset = page_no as u64 * self.page_size as u64;
                // The last page on disk may be short; the rest stays zeroed.
                let len = (self.file_length - offset).min(self.page_size as u64) as usize;
                self.file.seek(SeekFrom::Start(offset))?;
                self.file.read_exact(&mut page[..len])?;
                debug!("page {} faulted in ({} bytes read)", page_no, len);
            } else {
                debug!("page {} allocated", page_no);
            }
            self.pages[page_no] = Some(page);
        }

        match self.pages[page_no].as_deref_mut() {
            Some(page) => Ok(page),
            None => Err(StorageError::PageNotResident(page_no)),
        }
    }

    /// Writes the first `byte_count` bytes of a resident page back to disk.
    pub fn flush(&mut self, page_no: usize, byte_count: usize) -> Result<()> {
        if byte_count > self.page_size {
            return Err(StorageError::FlushTooLarge {
                bytes: byte_count,
                page_size: self.page_size,
            });
        }
        let page = self
            .pages
            .get(page_no)
            .and_then(Option::as_deref)
            .ok_or(StorageError::PageNotResident(page_no))?;

        self.file
            .seek(SeekFrom::Start(page_no as u64 * self.page_size as u64))?;
        self.file.write_all(&page[..byte_count])?;
        debug!("page {} flushed ({} bytes)", page_no, byte_count);
        Ok(())
    }

    /// Drops the cached buffer for `page_no`.
    pub fn release(&mut self, page_no: usize) {
        if let Some(slot) = self.pages.get_mut(page_no) {
            *slot = None;
        }
    }

    /// Syncs and closes the backing file. Unflushed pages are discarded.
    pub fn close(self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }
}
