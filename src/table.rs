//! Heap file of fixed-width rows and its open/close bracket.
//!
//! Rows are packed by row number, `rows_per_page` to a page, and never
//! straddle a page boundary. Nothing reaches disk until [`Table::close`].

use std::path::Path;

use log::info;

use crate::error::{Result, StorageError};
use crate::pager::Pager;
use crate::row::Row;
use crate::schema::Layout;

pub struct Table {
    pager: Pager,
    layout: Layout,
    num_rows: usize,
}

impl Table {
    /// Opens the database at `path`, creating an empty file if needed.
    pub fn open(path: &Path, layout: Layout) -> Result<Self> {
        let pager = Pager::open(path, layout.page_size(), layout.max_pages())?;
        let num_rows = layout.rows_in_file(pager.file_length())?;
        info!("table has {} rows (capacity {})", num_rows, layout.capacity());

        Ok(Self {
            pager,
            layout,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Byte range of `row_no` inside its resident page.
    pub fn row_slot(&mut self, row_no: usize) -> Result<&mut [u8]> {
        let offset = self.layout.offset_in_page(row_no);
        let row_size = self.layout.row_size();
        let page = self.pager.get_page(self.layout.page_of(row_no))?;
        Ok(&mut page[offset..offset + row_size])
    }

    /// Appends `row` after the last one. Duplicate ids are allowed.
    pub fn insert(&mut self, row: &Row) -> Result<()> {
        let capacity = self.layout.capacity();
        if self.num_rows >= capacity {
            return Err(StorageError::TableFull { capacity });
        }

        let row_layout = *self.layout.row();
        let slot = self.row_slot(self.num_rows)?;
        row.encode(&row_layout, slot);
        self.num_rows += 1;
        Ok(())
    }

    /// Iterates every row in row-number order.
    pub fn scan(&mut self) -> Rows<'_> {
        Rows {
            table: self,
            next: 0,
        }
    }

    /// Flushes every resident page and closes the backing file.
    ///
    /// Full pages are written whole; the trailing partial page is written
    /// only up to its last row so the file ends at the logical end of the table.
    pub fn close(mut self) -> Result<()> {
        let rows_per_page = self.layout.rows_per_page();
        let full_pages = self.num_rows / rows_per_page;

        for page_no in 0..full_pages {
            if self.pager.is_resident(page_no) {
                self.pager.flush(page_no, self.layout.page_size())?;
                self.pager.release(page_no);
            }
        }

        let extra_rows = self.num_rows % rows_per_page;
        if extra_rows > 0 && self.pager.is_resident(full_pages) {
            self.pager
                .flush(full_pages, extra_rows * self.layout.row_size())?;
            self.pager.release(full_pages);
        }

        self.pager.close()?;
        info!("closed table with {} rows", self.num_rows);
        Ok(())
    }
}

/// Lazy scan over a [`Table`], created by [`Table::scan`].
pub struct Rows<'a> {
    table: &'a mut Table,
    next: usize,
}

impl Iterator for Rows<'_> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.table.num_rows {
            return None;
        }
        let row_no = self.next;
        self.next += 1;

        let row_layout = *self.table.layout.row();
        Some(
            self.table
                .row_slot(row_no)
                .map(|slot| Row::decode(&row_layout, slot)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::RowLayout;
    use crate::{PAGE_SIZE, ROW_SIZE, ROWS_PER_PAGE, TABLE_MAX_ROWS};
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};

    fn scratch() -> (TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");
        (dir, path)
    }

    fn user(i: usize) -> Row {
        Row::new(i as u32, &format!("user{i}"), &format!("person{i}@example.com"))
    }

    fn collect(table: &mut Table) -> Vec<Row> {
        table.scan().collect::<Result<Vec<_>>>().unwrap()
    }

    // Two rows per page, one page.
    fn tiny_layout() -> Layout {
        Layout::new(RowLayout::default(), 2 * ROW_SIZE, 1).unwrap()
    }

    #[test]
    fn new_file_is_empty() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert!(table.scan().next().is_none());
    }

    #[test]
    fn two_row_table_fills_and_persists() {
        let (_dir, path) = scratch();
        let ann = Row::new(1, "ann", "ann@x.io");
        let bob = Row::new(2, "bob", "bob@x.io");

        let mut table = Table::open(&path, tiny_layout()).unwrap();
        table.insert(&ann).unwrap();
        table.insert(&bob).unwrap();
        let err = table.insert(&Row::new(3, "cy", "cy@x.io")).unwrap_err();
        assert!(matches!(err, StorageError::TableFull { capacity: 2 }));
        assert_eq!(table.num_rows(), 2);
        assert_eq!(collect(&mut table), vec![ann.clone(), bob.clone()]);
        table.close().unwrap();

        let mut table = Table::open(&path, tiny_layout()).unwrap();
        assert_eq!(collect(&mut table), vec![ann, bob]);
    }

    #[test]
    fn fills_to_capacity_then_reports_full() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        for i in 0..TABLE_MAX_ROWS {
            table.insert(&user(i)).unwrap();
        }
        let err = table.insert(&user(TABLE_MAX_ROWS)).unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(table.num_rows(), TABLE_MAX_ROWS);
    }

    #[test]
    fn row_slots_stay_inside_their_page() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        for row_no in [0, 1, ROWS_PER_PAGE - 1, ROWS_PER_PAGE, 3 * ROWS_PER_PAGE + 5] {
            // Fault the page in first; row_slot then hands out a view into the
            // same resident buffer, so the pointers share a base.
            let page_start = table
                .pager
                .get_page(row_no / ROWS_PER_PAGE)
                .unwrap()
                .as_ptr() as usize;
            let slot = table.row_slot(row_no).unwrap();
            let start = slot.as_ptr() as usize;

            assert_eq!(slot.len(), ROW_SIZE);
            assert_eq!(start - page_start, (row_no % ROWS_PER_PAGE) * ROW_SIZE);
            assert!(start - page_start + ROW_SIZE <= PAGE_SIZE);
        }
    }

    #[test]
    fn persists_rows_across_reopen() {
        let (_dir, path) = scratch();
        let rows: Vec<Row> = (0..3 * ROWS_PER_PAGE + 4).map(user).collect();

        let mut table = Table::open(&path, Layout::default()).unwrap();
        for row in &rows {
            table.insert(row).unwrap();
        }
        table.close().unwrap();

        let mut table = Table::open(&path, Layout::default()).unwrap();
        assert_eq!(table.num_rows(), rows.len());
        assert_eq!(collect(&mut table), rows);
    }

    #[test]
    fn partial_page_is_flushed_without_padding() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        for i in 0..5 {
            table.insert(&user(i)).unwrap();
        }
        table.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 5 * ROW_SIZE as u64);
    }

    #[test]
    fn full_pages_are_flushed_whole() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        for i in 0..2 * ROWS_PER_PAGE + 1 {
            table.insert(&user(i)).unwrap();
        }
        table.close().unwrap();
        let expected = 2 * PAGE_SIZE + ROW_SIZE;
        assert_eq!(std::fs::metadata(&path).unwrap().len(), expected as u64);
    }

    #[test]
    fn appends_after_rows_loaded_from_disk() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        for i in 0..ROWS_PER_PAGE - 1 {
            table.insert(&user(i)).unwrap();
        }
        table.close().unwrap();

        let mut table = Table::open(&path, Layout::default()).unwrap();
        for i in ROWS_PER_PAGE - 1..ROWS_PER_PAGE + 2 {
            table.insert(&user(i)).unwrap();
        }
        table.close().unwrap();

        let mut table = Table::open(&path, Layout::default()).unwrap();
        let expected: Vec<Row> = (0..ROWS_PER_PAGE + 2).map(user).collect();
        assert_eq!(collect(&mut table), expected);
    }

    #[test]
    fn allows_duplicate_ids() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        table.insert(&Row::new(7, "a", "a@x")).unwrap();
        table.insert(&Row::new(7, "b", "b@x")).unwrap();
        let ids: Vec<u32> = collect(&mut table).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![7, 7]);
    }

    #[test]
    fn scan_is_restartable() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        table.insert(&user(1)).unwrap();
        let first = collect(&mut table);
        let second = collect(&mut table);
        assert_eq!(first, second);
        assert_eq!(table.num_rows(), 1);
    }

    #[test]
    fn close_without_rows_leaves_file_empty() {
        let (_dir, path) = scratch();
        let mut table = Table::open(&path, Layout::default()).unwrap();
        assert!(table.scan().next().is_none());
        table.close().unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn open_reports_an_unallocatable_page_table() {
        let (_dir, path) = scratch();
        let layout = Layout::new(RowLayout::default(), ROW_SIZE, usize::MAX / ROW_SIZE).unwrap();
        let err = Table::open(&path, layout).err().unwrap();
        assert!(matches!(err, StorageError::InvalidLayout(_)));
    }

    #[test]
    fn open_rejects_a_torn_row() {
        let (_dir, path) = scratch();
        std::fs::write(&path, vec![0u8; ROW_SIZE + 3]).unwrap();
        let err = Table::open(&path, Layout::default()).err().unwrap();
        assert!(matches!(err, StorageError::Corrupted(_)));
    }
}
