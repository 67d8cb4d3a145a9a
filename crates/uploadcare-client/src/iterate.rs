//! Bulk iteration over every page of a cursor

use crate::pagination::{ListSource, PageCursor};
use crate::Result;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::ops::ControlFlow;
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Drives a [`PageCursor`] page by page.
///
/// `max` is checked between pages against the number of items already seen,
/// so the page that crosses the limit is still delivered in full.
pub struct BulkIterator<T, S> {
    cursor: PageCursor<T, S>,
    max: Option<usize>,
}

impl<T, S> BulkIterator<T, S>
where
    T: DeserializeOwned + Send,
    S: ListSource,
{
    /// Iterate all pages of `cursor`
    pub fn new(cursor: PageCursor<T, S>) -> Self {
        Self { cursor, max: None }
    }

    /// Stop fetching once at least `max` items were seen
    pub fn with_max(mut self, max: usize) -> Self {
        self.max = Some(max);
        self
    }

    /// Set or clear the item limit
    pub fn with_limit(mut self, max: Option<usize>) -> Self {
        self.max = max;
        self
    }

    /// Fetch pages sequentially and hand each one to `on_page`.
    ///
    /// Stops when the callback breaks, the last page was delivered, or the
    /// limit was reached before a fetch. Returns the number of items seen.
    #[instrument(skip(self, on_page))]
    pub async fn run<F, Fut>(mut self, mut on_page: F) -> Result<usize>
    where
        F: FnMut(Vec<T>) -> Fut,
        Fut: Future<Output = ControlFlow<()>>,
    {
        let mut count = 0usize;

        loop {
            if self.max.is_some_and(|max| count >= max) {
                debug!(count, "Item limit reached");
                return Ok(count);
            }

            let has_more = self.cursor.advance().await?;
            let page = self.cursor.take_results();
            count += page.len();

            if on_page(page).await.is_break() {
                debug!(count, "Stopped by page callback");
                return Ok(count);
            }
            if !has_more {
                return Ok(count);
            }
        }
    }

    /// Run on the tokio runtime and report through `on_done`, which is
    /// called exactly once.
    pub fn spawn<F, Fut, D>(self, on_page: F, on_done: D) -> JoinHandle<()>
    where
        Self: Send + 'static,
        F: FnMut(Vec<T>) -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send,
        D: FnOnce(Result<usize>) + Send + 'static,
    {
        tokio::spawn(async move {
            let result = self.run(on_page).await;
            on_done(result);
        })
    }
}
