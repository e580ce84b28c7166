use crate::data::model::{TripRecord, TripTable};

/// Rows returned per page of raw data.
pub const PAGE_SIZE: usize = 5;

/// Page-at-a-time walk over a filtered table.
///
/// The cursor borrows the table, so it cannot outlive the filter session
/// that produced it.
#[derive(Debug, Clone)]
pub struct RowCursor<'a> {
    rows: &'a [TripRecord],
    position: usize,
    page_size: usize,
}

impl<'a> RowCursor<'a> {
    pub fn new(table: &'a TripTable) -> Self {
        Self::with_page_size(table, PAGE_SIZE)
    }

    pub fn with_page_size(table: &'a TripTable, page_size: usize) -> Self {
        RowCursor {
            rows: table.records(),
            position: 0,
            page_size: page_size.max(1),
        }
    }

    /// Return the next page and move past it. Empty once exhausted.
    pub fn advance(&mut self) -> &'a [TripRecord] {
        if self.exhausted() {
            return &[];
        }
        let end = (self.position + self.page_size).min(self.rows.len());
        let page = &self.rows[self.position..end];
        self.position += self.page_size;
        page
    }

    /// Whether every row has been handed out.
    pub fn exhausted(&self) -> bool {
        self.position >= self.rows.len()
    }

    /// Index of the first row of the next page.
    pub fn position(&self) -> usize {
        self.position
    }
}
