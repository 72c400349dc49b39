//! Paged column slices

use crate::error::CfmapResult;
use crate::store::{ColumnName, NamedColumn};
use std::collections::VecDeque;
use std::fmt;

type Fetch<C> = Box<dyn FnMut(Option<ColumnName>, usize) -> CfmapResult<Vec<C>> + Send>;

/// Lazy iterator over a column range, fetched one page at a time.
///
/// Every page after the first restarts at the last name returned, so it asks
/// for one extra column and drops the repeated one.
pub struct SliceIterator<C> {
    fetch: Fetch<C>,
    start: Option<ColumnName>,
    page_size: usize,
    buffer: VecDeque<C>,
    first_page: bool,
    exhausted: bool,
}

impl<C: NamedColumn> SliceIterator<C> {
    /// `fetch(start, count)` returns at most `count` columns from `start`.
    pub fn new<F>(start: Option<ColumnName>, page_size: usize, fetch: F) -> Self
    where
        F: FnMut(Option<ColumnName>, usize) -> CfmapResult<Vec<C>> + Send + 'static,
    {
        Self {
            fetch: Box::new(fetch),
            start,
            page_size: page_size.max(1),
            buffer: VecDeque::new(),
            first_page: true,
            exhausted: false,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    fn fill(&mut self) -> CfmapResult<()> {
        if !self.buffer.is_empty() || self.exhausted {
            return Ok(());
        }
        if self.first_page {
            self.first_page = false;
            let columns = (self.fetch)(self.start.clone(), self.page_size)?;
            self.exhausted = columns.len() < self.page_size;
            self.buffer.extend(columns);
        } else {
            let requested = self.page_size + 1;
            let columns = (self.fetch)(self.start.clone(), requested)?;
            self.exhausted = columns.len() < requested;
            let mut columns = columns.into_iter().peekable();
            if columns.next_if(|c| Some(c.name()) == self.start.as_ref()).is_some() {
                tracing::trace!(target: "slice", "skipped repeated page start");
            }
            self.buffer.extend(columns);
        }
        if let Some(last) = self.buffer.back() {
            self.start = Some(last.name().clone());
        } else {
            self.exhausted = true;
        }
        Ok(())
    }

    pub fn has_next(&mut self) -> CfmapResult<bool> {
        self.fill()?;
        Ok(!self.buffer.is_empty())
    }

    /// Remaining columns of the current page, fetching one if needed.
    pub fn next_page(&mut self) -> CfmapResult<Vec<C>> {
        self.fill()?;
        Ok(self.buffer.drain(..).collect())
    }
}

impl<C: NamedColumn> Iterator for SliceIterator<C> {
    type Item = CfmapResult<C>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Err(e) = self.fill() {
            self.exhausted = true;
            return Some(Err(e));
        }
        self.buffer.pop_front().map(Ok)
    }
}

impl<C> fmt::Debug for SliceIterator<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SliceIterator")
            .field("start", &self.start)
            .field("page_size", &self.page_size)
            .field("buffered", &self.buffer.len())
            .field("exhausted", &self.exhausted)
            .finish()
    }
}
