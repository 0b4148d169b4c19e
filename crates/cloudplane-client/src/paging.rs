//! Paginated collection reads
//!
//! Collections are read in `(start, limit)` slices. The server signals the end
//! of a collection with a short page, not an empty one: after a full final page
//! one more (empty) request is issued before the drain stops.

use crate::common::ApiRequest;
use crate::error::Result;
use crate::transport_trait::Transport;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Page size used when none is configured
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// One slice of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    /// First page of the given size
    pub fn first(limit: usize) -> Self {
        Self { offset: 0, limit }
    }

    /// The page following this one
    #[must_use]
    pub fn next(self) -> Self {
        Self {
            offset: self.offset + self.limit,
            limit: self.limit,
        }
    }

    fn apply(self, request: ApiRequest) -> ApiRequest {
        request
            .with_query("replyWithCount", "true")
            .with_query("start", self.offset)
            .with_query("limit", self.limit)
    }
}

/// Drains paginated collections through a [`Transport`]
#[derive(Debug)]
pub struct PagedLister<'a, T: Transport + ?Sized> {
    transport: &'a T,
    page_size: usize,
}

impl<'a, T: Transport + ?Sized> PagedLister<'a, T> {
    /// Create a lister with the default page size
    pub fn new(transport: &'a T) -> Self {
        Self {
            transport,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size; zero falls back to the default
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = if page_size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            page_size
        };
        self
    }

    /// Configured page size
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Fetch a single slice of a collection
    pub async fn list_page(
        &self,
        resource: &str,
        filters: &[(&str, &str)],
        page: Page,
    ) -> Result<Vec<Value>> {
        debug!(
            "Fetching {} start={} limit={}",
            resource, page.offset, page.limit
        );
        let request = page.apply(ApiRequest::get(resource).with_filters(filters));
        let envelope = self.transport.send(request).await?;
        Ok(envelope.into_inventories()?)
    }

    /// Fetch every item of a collection, in server order, as raw JSON.
    ///
    /// Any failing page aborts the drain; nothing fetched so far is returned.
    pub async fn list_all_values(&self, resource: &str, filters: &[(&str, &str)]) -> Result<Vec<Value>> {
        let mut items = Vec::new();
        let mut page = Page::first(self.page_size);

        loop {
            let batch = self.list_page(resource, filters, page).await?;
            items.extend(batch);

            if page.offset + page.limit > items.len() {
                break;
            }
            page = page.next();
        }

        debug!("Fetched {} item(s) from {}", items.len(), resource);
        Ok(items)
    }

    /// Fetch every item of a collection and deserialize it
    pub async fn list_all<I: DeserializeOwned>(
        &self,
        resource: &str,
        filters: &[(&str, &str)],
    ) -> Result<Vec<I>> {
        self.list_all_values(resource, filters)
            .await?
            .into_iter()
            .map(|value| serde_json::from_value(value).map_err(Into::into))
            .collect()
    }
}
