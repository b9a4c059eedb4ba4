// File: ./src/client/mod.rs
//! Remote content store access.
//!
//! The scheduling core only talks to the content platform through
//! [`ContentSource`]: a paginated range query and a single-item patch. The
//! HTTP implementation lives in [`core`]; tests substitute in-process fakes.
pub mod core;
pub mod middleware;
pub mod wire;

use crate::error::ClientError;
use crate::model::{ContentItem, ContentType, ItemPatch, Status};
use async_trait::async_trait;
use chrono::NaiveDateTime;

pub use crate::client::core::RestClient;

/// One page of a range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    pub content_type: ContentType,
    pub statuses: Vec<Status>,
    /// Exclusive lower bound.
    pub after: NaiveDateTime,
    /// Exclusive upper bound.
    pub before: NaiveDateTime,
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub total_pages: u32,
}

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Fetches a single page of items matching the query.
    async fn query(&self, query: &ContentQuery) -> Result<ContentPage, ClientError>;

    /// Saves `patch` for `item_id` and returns the item as stored remotely,
    /// or `None` when it was saved but now has a status the calendar does not
    /// schedule.
    async fn update(
        &self,
        rest_base: &str,
        item_id: u64,
        patch: &ItemPatch,
    ) -> Result<Option<ContentItem>, ClientError>;
}
