// File: src/store.rs
//! Optimistic update store.
//!
//! [`ScheduleStore`] is the read-model: the last known date and status of
//! every item the calendar has fetched, with pending optimistic values laid
//! over it by the [`MutationJournal`]. [`UpdateStore`] is the single
//! application-owned service around it: it applies a patch immediately, then
//! saves it remotely in a spawned task and settles the journal when the save
//! resolves.
use crate::client::ContentSource;
use crate::error::SchedulerError;
use crate::journal::{MutationJournal, MutationKey, PendingMutation, Resolution};
use crate::model::{CalendarEvent, ContentItem, Field, FieldValue, ItemPatch, Status};
use crate::notify::{NoticeKind, Notifier};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemRecord {
    pub id: u64,
    pub title: String,
    pub date: NaiveDateTime,
    pub status: Status,
    pub rest_base: String,
}

/// A field change applied to the read-model and awaiting its remote save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppliedMutation {
    pub key: MutationKey,
    pub seq: u64,
}

#[derive(Debug, Default)]
pub struct ScheduleStore {
    items: HashMap<u64, ItemRecord>,
    journal: MutationJournal,
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges fetch results into the read-model. Fields with a pending
    /// optimistic value keep it; everything else takes the fetched value.
    pub fn ingest(&mut self, events: &[CalendarEvent]) {
        for event in events {
            let id = event.source_item_id;
            let date_pending = self.journal.pending(MutationKey::new(id, Field::Date)).is_some();
            let status_pending = self
                .journal
                .pending(MutationKey::new(id, Field::Status))
                .is_some();

            match self.items.get_mut(&id) {
                Some(record) => {
                    record.title = event.title.clone();
                    record.rest_base = event.content_type_rest_base.clone();
                    if !date_pending {
                        record.date = event.start;
                    }
                    if !status_pending {
                        record.status = event.status;
                    }
                }
                None => {
                    self.items.insert(
                        id,
                        ItemRecord {
                            id,
                            title: event.title.clone(),
                            date: event.start,
                            status: event.status,
                            rest_base: event.content_type_rest_base.clone(),
                        },
                    );
                }
            }
        }
    }

    pub fn item(&self, id: u64) -> Option<&ItemRecord> {
        self.items.get(&id)
    }

    pub fn date_of(&self, id: u64) -> Option<NaiveDateTime> {
        self.items.get(&id).map(|r| r.date)
    }

    pub fn status_of(&self, id: u64) -> Option<Status> {
        self.items.get(&id).map(|r| r.status)
    }

    pub fn pending(&self, id: u64, field: Field) -> Option<&PendingMutation> {
        self.journal.pending(MutationKey::new(id, field))
    }

    pub fn has_pending(&self, id: u64) -> bool {
        self.journal.is_pending(id)
    }

    pub fn pending_count(&self) -> usize {
        self.journal.len()
    }

    fn value_of(&self, id: u64, field: Field) -> Option<FieldValue> {
        let record = self.items.get(&id)?;
        Some(match field {
            Field::Date => FieldValue::Date(record.date),
            Field::Status => FieldValue::Status(record.status),
        })
    }

    fn set_value(&mut self, id: u64, value: FieldValue) {
        if let Some(record) = self.items.get_mut(&id) {
            match value {
                FieldValue::Date(d) => record.date = d,
                FieldValue::Status(s) => record.status = s,
            }
        }
    }

    /// Applies `patch` optimistically and journals one mutation per field.
    pub fn apply(
        &mut self,
        item_id: u64,
        patch: &ItemPatch,
    ) -> Result<Vec<AppliedMutation>, SchedulerError> {
        if patch.is_empty() {
            return Err(SchedulerError::EmptyPatch);
        }
        if !self.items.contains_key(&item_id) {
            return Err(SchedulerError::UnknownItem(item_id));
        }

        let mut applied = Vec::new();
        for next in patch.values() {
            let field = next.field();
            let previous = self
                .value_of(item_id, field)
                .ok_or(SchedulerError::UnknownItem(item_id))?;
            let seq = self.journal.record(item_id, previous, next);
            self.set_value(item_id, next);
            log::debug!(
                "Applied #{} item {} {}: {} -> {}",
                seq,
                item_id,
                field,
                previous,
                next
            );
            applied.push(AppliedMutation {
                key: MutationKey::new(item_id, field),
                seq,
            });
        }
        Ok(applied)
    }

    /// Settles one applied mutation, restoring the previous value if it was
    /// the latest for its pair and the save failed.
    pub fn resolve(&mut self, applied: &AppliedMutation, succeeded: bool) -> Resolution {
        let resolution = self.journal.resolve(applied.key, applied.seq, succeeded);
        match &resolution {
            Resolution::RolledBack(m) => {
                self.set_value(m.item_id, m.previous_value);
                log::info!(
                    "Rolled back item {} {} to {}",
                    m.item_id,
                    m.field,
                    m.previous_value
                );
            }
            Resolution::Confirmed(m) => {
                log::debug!("Confirmed #{} item {} {}", m.seq, m.item_id, m.field);
            }
            Resolution::Stale { key, seq, latest } => {
                log::debug!(
                    "Ignoring stale resolution #{} of item {} {} (latest #{})",
                    seq,
                    key.item_id,
                    key.field,
                    latest
                );
            }
        }
        resolution
    }

    /// Adopts the stored values returned by the server for every field that
    /// has no pending mutation.
    pub fn reconcile(&mut self, item: &ContentItem) {
        let date_pending = self.pending(item.id, Field::Date).is_some();
        let status_pending = self.pending(item.id, Field::Status).is_some();
        if let Some(record) = self.items.get_mut(&item.id) {
            record.title = item.title.clone();
            if !date_pending && record.date != item.date {
                log::debug!("Item {} date normalised by server to {}", item.id, item.date);
                record.date = item.date;
            }
            if !status_pending && record.status != item.status {
                log::debug!("Item {} status changed by server to {}", item.id, item.status);
                record.status = item.status;
            }
        }
    }

    /// Rewrites rendered events with the read-model's current values.
    pub fn overlay(&self, events: &mut [CalendarEvent]) {
        for event in events.iter_mut() {
            if let Some(record) = self.items.get(&event.source_item_id) {
                event.start = record.date;
                event.status = record.status;
            }
        }
    }
}

/// Result of one remote save after the journal has been settled.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub item_id: u64,
    pub resolutions: Vec<Resolution>,
    pub error: Option<SchedulerError>,
}

impl SaveOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }

    pub fn rolled_back(&self) -> bool {
        self.resolutions
            .iter()
            .any(|r| matches!(r, Resolution::RolledBack(_)))
    }

    /// True when every field of the save was superseded before it resolved.
    pub fn was_superseded(&self) -> bool {
        !self.resolutions.is_empty() && self.resolutions.iter().all(Resolution::is_stale)
    }
}

/// Handle on an in-flight save. Dropping it does not cancel the save.
#[derive(Debug)]
pub struct SaveHandle {
    item_id: u64,
    inner: JoinHandle<SaveOutcome>,
}

impl SaveHandle {
    pub fn spawn<F>(item_id: u64, fut: F) -> Self
    where
        F: Future<Output = SaveOutcome> + Send + 'static,
    {
        Self {
            item_id,
            inner: tokio::spawn(fut),
        }
    }

    pub fn item_id(&self) -> u64 {
        self.item_id
    }

    pub async fn wait(self) -> SaveOutcome {
        match self.inner.await {
            Ok(outcome) => outcome,
            Err(e) => SaveOutcome {
                item_id: self.item_id,
                resolutions: Vec::new(),
                error: Some(SchedulerError::MutationFailed {
                    item_id: self.item_id,
                    reason: format!("save task ended unexpectedly: {}", e),
                }),
            },
        }
    }
}

/// Write-through cache over the remote content store.
#[derive(Clone)]
pub struct UpdateStore {
    state: Arc<Mutex<ScheduleStore>>,
    source: Arc<dyn ContentSource>,
    notifier: Arc<dyn Notifier>,
}

impl UpdateStore {
    pub fn new(source: Arc<dyn ContentSource>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ScheduleStore::new())),
            source,
            notifier,
        }
    }

    /// Shared read-model, for selectors.
    pub fn state(&self) -> Arc<Mutex<ScheduleStore>> {
        self.state.clone()
    }

    pub async fn ingest(&self, events: &[CalendarEvent]) {
        self.state.lock().await.ingest(events);
    }

    pub async fn snapshot(&self, item_id: u64) -> Option<ItemRecord> {
        self.state.lock().await.item(item_id).cloned()
    }

    pub async fn date_of(&self, item_id: u64) -> Option<NaiveDateTime> {
        self.state.lock().await.date_of(item_id)
    }

    pub async fn status_of(&self, item_id: u64) -> Option<Status> {
        self.state.lock().await.status_of(item_id)
    }

    /// Applies `patch` to the read-model before returning, then saves it
    /// remotely in the background.
    ///
    /// On success the journal entries are cleared. On failure the fields are
    /// rolled back and an error notice is raised, unless a newer mutation for
    /// the same field has been issued meanwhile, in which case the result is
    /// ignored.
    pub async fn update_item(
        &self,
        rest_base: &str,
        item_id: u64,
        patch: ItemPatch,
    ) -> Result<SaveHandle, SchedulerError> {
        let (applied, title) = {
            let mut state = self.state.lock().await;
            let applied = state.apply(item_id, &patch)?;
            let title = state
                .item(item_id)
                .map(|r| r.title.clone())
                .unwrap_or_default();
            (applied, title)
        };
        log::info!("Saving item {} ({}): {:?}", item_id, rest_base, patch);

        let this = self.clone();
        let rest_base = rest_base.to_string();
        Ok(SaveHandle::spawn(item_id, async move {
            this.save(rest_base, item_id, patch, applied, title).await
        }))
    }

    async fn save(
        &self,
        rest_base: String,
        item_id: u64,
        patch: ItemPatch,
        applied: Vec<AppliedMutation>,
        title: String,
    ) -> SaveOutcome {
        let result = self.source.update(&rest_base, item_id, &patch).await;

        let mut state = self.state.lock().await;
        let resolutions: Vec<Resolution> = applied
            .iter()
            .map(|a| state.resolve(a, result.is_ok()))
            .collect();
        let live = resolutions.iter().any(|r| !r.is_stale());

        match result {
            Ok(item) => {
                // An item that left the schedulable statuses keeps its
                // optimistic values until the next fetch drops it.
                if live && let Some(item) = &item {
                    state.reconcile(item);
                }
                drop(state);
                if live {
                    self.notifier
                        .notify(NoticeKind::Info, &format!("\"{}\" updated.", title));
                }
                SaveOutcome {
                    item_id,
                    resolutions,
                    error: None,
                }
            }
            Err(e) => {
                drop(state);
                let reason = e.to_string();
                let err = SchedulerError::mutation(item_id, e);
                if live {
                    self.notifier.notify(
                        NoticeKind::Error,
                        &format!("Could not save \"{}\": {}", title, reason),
                    );
                } else {
                    log::debug!("Superseded save of item {} failed: {}", item_id, err);
                }
                SaveOutcome {
                    item_id,
                    resolutions,
                    error: Some(err),
                }
            }
        }
    }
}
