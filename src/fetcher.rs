// File: src/fetcher.rs
//! Range queries against the content store.
use crate::client::{ContentQuery, ContentSource};
use crate::error::SchedulerError;
use crate::model::{CalendarEvent, ContentType, DateRange, StatusFilter};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Clone)]
pub struct EventFetcher {
    source: Arc<dyn ContentSource>,
    per_page: u32,
    max_pages: u32,
}

impl EventFetcher {
    pub fn new(source: Arc<dyn ContentSource>, per_page: u32, max_pages: u32) -> Self {
        Self {
            source,
            per_page: per_page.clamp(1, 100),
            max_pages: max_pages.max(1),
        }
    }

    /// Returns every item of `content_type` whose status is in `filter` and
    /// whose date lies within `range`, both endpoints included.
    ///
    /// Pages are drained until the reported page count is reached. An empty
    /// filter yields no events without contacting the content store.
    pub async fn fetch(
        &self,
        content_type: &ContentType,
        filter: &StatusFilter,
        range: &DateRange,
    ) -> Result<Vec<CalendarEvent>, SchedulerError> {
        if filter.is_empty() {
            log::debug!("Status filter is empty, skipping fetch");
            return Ok(Vec::new());
        }

        let (after, before) = range.query_bounds();
        let mut query = ContentQuery {
            content_type: content_type.clone(),
            statuses: filter.to_vec(),
            after,
            before,
            page: 1,
            per_page: self.per_page,
        };

        let mut events = Vec::new();
        loop {
            let page = self
                .source
                .query(&query)
                .await
                .map_err(SchedulerError::fetch)?;
            let total_pages = page.total_pages.max(1);

            // The platform's bounds are exclusive and its status handling is
            // lenient; recheck both locally.
            events.extend(
                page.items
                    .iter()
                    .filter(|item| range.contains(item.date) && filter.contains(item.status))
                    .map(CalendarEvent::from),
            );

            if query.page >= total_pages {
                break;
            }
            if query.page >= self.max_pages {
                return Err(SchedulerError::FetchFailed(format!(
                    "result spans {} pages, more than the limit of {}",
                    total_pages, self.max_pages
                )));
            }
            query.page += 1;
        }

        // Items edited mid-drain can shift across page boundaries.
        let mut seen = HashSet::new();
        events.retain(|e| seen.insert(e.id.clone()));
        events.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.id.cmp(&b.id)));
        log::debug!(
            "Fetched {} {} between {} and {}",
            events.len(),
            content_type.rest_base,
            range.start(),
            range.end()
        );
        Ok(events)
    }
}
