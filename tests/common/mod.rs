// Shared fixtures for the integration suites: an in-process content store
// whose queries and saves can be held open and released in any order.
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use edcal::client::{ContentPage, ContentQuery, ContentSource};
use edcal::error::ClientError;
use edcal::model::{CalendarEvent, ContentItem, DateRange, ItemPatch, Status};
use edcal::notify::{Notice, NoticeKind, Notifier};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 5, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn range(from_day: u32, to_day: u32) -> DateRange {
    DateRange::new(at(from_day, 0), at(to_day, 23)).unwrap()
}

pub fn item(id: u64, day: u32, hour: u32, status: Status) -> ContentItem {
    ContentItem {
        id,
        title: format!("Post {}", id),
        url: format!("https://example.com/?p={}", id),
        date: at(day, hour),
        status,
        edit_url: format!("https://example.com/wp-admin/post.php?post={}&action=edit", id),
        preview_url: format!("https://example.com/?p={}&preview=true", id),
        content_type_rest_base: "posts".to_string(),
    }
}

pub fn event(id: u64, day: u32, hour: u32, status: Status) -> CalendarEvent {
    CalendarEvent::from(&item(id, day, hour, status))
}

struct Step {
    ok: bool,
    gate: Option<oneshot::Receiver<()>>,
}

struct ScriptedUpdate {
    item_id: u64,
    patch: ItemPatch,
    step: Step,
}

struct ScriptedQuery {
    after: NaiveDateTime,
    step: Step,
}

#[derive(Default)]
struct Inner {
    items: Vec<ContentItem>,
    queries: Vec<ContentQuery>,
    updates: Vec<(u64, ItemPatch)>,
    scripted_updates: Vec<ScriptedUpdate>,
    scripted_queries: Vec<ScriptedQuery>,
    lenient_bounds: bool,
    reported_pages: Option<u32>,
}

/// In-memory content store. Unscripted calls succeed immediately.
#[derive(Default)]
pub struct FakeSource {
    inner: Mutex<Inner>,
}

impl FakeSource {
    pub fn new(items: Vec<ContentItem>) -> Arc<Self> {
        let source = Self::default();
        source.inner.lock().unwrap().items = items;
        Arc::new(source)
    }

    /// Returns every stored item regardless of the query's date bounds.
    pub fn set_lenient_bounds(&self) {
        self.inner.lock().unwrap().lenient_bounds = true;
    }

    /// Overrides the page count reported with each page.
    pub fn report_pages(&self, pages: u32) {
        self.inner.lock().unwrap().reported_pages = Some(pages);
    }

    /// Holds the save of `patch` for `item_id` until the returned sender
    /// fires (or is dropped), then resolves it with `ok`.
    pub fn gate_update(&self, item_id: u64, patch: ItemPatch, ok: bool) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().scripted_updates.push(ScriptedUpdate {
            item_id,
            patch,
            step: Step {
                ok,
                gate: Some(rx),
            },
        });
        tx
    }

    pub fn fail_update(&self, item_id: u64, patch: ItemPatch) {
        self.inner.lock().unwrap().scripted_updates.push(ScriptedUpdate {
            item_id,
            patch,
            step: Step {
                ok: false,
                gate: None,
            },
        });
    }

    /// Holds the next query of `range` until the returned sender fires.
    pub fn gate_query(&self, range: &DateRange, ok: bool) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.inner.lock().unwrap().scripted_queries.push(ScriptedQuery {
            after: range.query_bounds().0,
            step: Step {
                ok,
                gate: Some(rx),
            },
        });
        tx
    }

    pub fn fail_query(&self, range: &DateRange) {
        self.inner.lock().unwrap().scripted_queries.push(ScriptedQuery {
            after: range.query_bounds().0,
            step: Step {
                ok: false,
                gate: None,
            },
        });
    }

    pub fn set_item(&self, replacement: ContentItem) {
        let mut inner = self.inner.lock().unwrap();
        inner.items.retain(|i| i.id != replacement.id);
        inner.items.push(replacement);
    }

    pub fn stored(&self, id: u64) -> Option<ContentItem> {
        self.inner
            .lock()
            .unwrap()
            .items
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    pub fn queries(&self) -> Vec<ContentQuery> {
        self.inner.lock().unwrap().queries.clone()
    }

    pub fn query_count(&self) -> usize {
        self.inner.lock().unwrap().queries.len()
    }

    pub fn updates(&self) -> Vec<(u64, ItemPatch)> {
        self.inner.lock().unwrap().updates.clone()
    }

    pub async fn wait_for_queries(&self, n: usize) {
        for _ in 0..1000 {
            if self.query_count() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("expected {} queries, saw {}", n, self.query_count());
    }

    pub async fn wait_for_updates(&self, n: usize) {
        for _ in 0..1000 {
            if self.updates().len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("expected {} updates, saw {}", n, self.updates().len());
    }
}

#[async_trait]
impl ContentSource for FakeSource {
    async fn query(&self, query: &ContentQuery) -> Result<ContentPage, ClientError> {
        let step = {
            let mut inner = self.inner.lock().unwrap();
            inner.queries.push(query.clone());
            let pos = inner
                .scripted_queries
                .iter()
                .position(|s| s.after == query.after);
            pos.map(|p| inner.scripted_queries.remove(p).step)
        };

        if let Some(step) = step {
            if let Some(gate) = step.gate {
                let _ = gate.await;
            }
            if !step.ok {
                return Err(ClientError::Transport("connection reset".to_string()));
            }
        }

        let inner = self.inner.lock().unwrap();
        let mut matching: Vec<ContentItem> = inner
            .items
            .iter()
            .filter(|i| i.content_type_rest_base == query.content_type.rest_base)
            .filter(|i| inner.lenient_bounds || query.statuses.contains(&i.status))
            .filter(|i| inner.lenient_bounds || (query.after < i.date && i.date < query.before))
            .cloned()
            .collect();
        matching.sort_by_key(|i| (i.date, i.id));

        let per_page = query.per_page.max(1) as usize;
        let total_pages = matching.len().div_ceil(per_page).max(1) as u32;
        let start = (query.page.saturating_sub(1) as usize) * per_page;
        let items = matching.into_iter().skip(start).take(per_page).collect();

        Ok(ContentPage {
            items,
            total_pages: inner.reported_pages.unwrap_or(total_pages),
        })
    }

    async fn update(
        &self,
        _rest_base: &str,
        item_id: u64,
        patch: &ItemPatch,
    ) -> Result<Option<ContentItem>, ClientError> {
        let step = {
            let mut inner = self.inner.lock().unwrap();
            inner.updates.push((item_id, patch.clone()));
            let pos = inner
                .scripted_updates
                .iter()
                .position(|s| s.item_id == item_id && &s.patch == patch);
            pos.map(|p| inner.scripted_updates.remove(p).step)
        };

        if let Some(step) = step {
            if let Some(gate) = step.gate {
                let _ = gate.await;
            }
            if !step.ok {
                return Err(ClientError::Status {
                    status: 500,
                    message: "Could not update post in the database.".to_string(),
                });
            }
        }

        let mut inner = self.inner.lock().unwrap();
        let stored = inner
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or(ClientError::Status {
                status: 404,
                message: "Invalid post ID.".to_string(),
            })?;
        if let Some(date) = patch.date {
            stored.date = date;
        }
        if let Some(status) = patch.status {
            stored.status = status;
        }
        Ok(Some(stored.clone()))
    }
}

/// Keeps every notice for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.kind == kind)
            .count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        self.notices.lock().unwrap().push(Notice {
            kind,
            message: message.to_string(),
        });
    }
}
