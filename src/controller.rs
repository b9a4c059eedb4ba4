// File: src/controller.rs
//! Scheduling controller: glue between calendar-widget callbacks and the
//! fetcher/store pair.
//!
//! Every refresh takes a generation number. Once a fetch has resolved, either
//! way, any older fetch still in flight is discarded when it lands: a slow
//! response never overwrites a newer one, and never replaces the last good
//! event set after a newer fetch failed.
use crate::error::SchedulerError;
use crate::fetcher::EventFetcher;
use crate::model::{
    CalendarEvent, ContentType, DateRange, ItemPatch, Status, StatusFilter,
};
use crate::notify::{NoticeKind, Notifier};
use crate::store::{SaveHandle, SaveOutcome, UpdateStore};
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the widget reports an event was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropTarget {
    pub start: Option<NaiveDateTime>,
    pub all_day: bool,
}

impl DropTarget {
    pub fn at(start: NaiveDateTime) -> Self {
        Self {
            start: Some(start),
            all_day: false,
        }
    }

    /// The concrete instant of the drop, if it has one.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        if self.all_day { None } else { self.start }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// The response was rendered; holds the number of events.
    Applied(usize),
    /// A newer response had already been rendered.
    Discarded,
    /// The fetch failed; the previous events stay on screen.
    Failed(SchedulerError),
    /// No visible range yet.
    Skipped,
}

#[derive(Debug, Default)]
struct ViewState {
    range: Option<DateRange>,
    filter: StatusFilter,
    events: Vec<CalendarEvent>,
    issued_generation: u64,
    resolved_generation: u64,
    settled_generation: u64,
}

impl ViewState {
    fn is_loading(&self) -> bool {
        self.settled_generation < self.issued_generation
    }
}

#[derive(Clone)]
pub struct ScheduleController {
    content_type: ContentType,
    view: Arc<Mutex<ViewState>>,
    fetcher: EventFetcher,
    store: UpdateStore,
    notifier: Arc<dyn Notifier>,
}

impl ScheduleController {
    pub fn new(
        content_type: ContentType,
        fetcher: EventFetcher,
        store: UpdateStore,
        notifier: Arc<dyn Notifier>,
        filter: StatusFilter,
    ) -> Self {
        Self {
            content_type,
            view: Arc::new(Mutex::new(ViewState {
                filter,
                ..ViewState::default()
            })),
            fetcher,
            store,
            notifier,
        }
    }

    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    pub fn store(&self) -> &UpdateStore {
        &self.store
    }

    pub async fn events(&self) -> Vec<CalendarEvent> {
        self.view.lock().await.events.clone()
    }

    pub async fn find_event(&self, event_id: &str) -> Option<CalendarEvent> {
        self.view
            .lock()
            .await
            .events
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }

    pub async fn is_loading(&self) -> bool {
        self.view.lock().await.is_loading()
    }

    pub async fn filter(&self) -> StatusFilter {
        self.view.lock().await.filter.clone()
    }

    pub async fn range(&self) -> Option<DateRange> {
        self.view.lock().await.range
    }

    pub async fn set_range(&self, range: DateRange) -> RefreshOutcome {
        self.view.lock().await.range = Some(range);
        self.refresh().await
    }

    /// Adds or removes `status` from the filter and refetches.
    pub async fn toggle_status(&self, status: Status) -> RefreshOutcome {
        {
            let mut view = self.view.lock().await;
            view.filter.toggle(status);
            log::debug!("Status filter now {:?}", view.filter.to_vec());
        }
        self.refresh().await
    }

    pub async fn set_filter(&self, filter: StatusFilter) -> RefreshOutcome {
        self.view.lock().await.filter = filter;
        self.refresh().await
    }

    /// Fetches the current range and filter and renders the result unless a
    /// newer response got there first.
    pub async fn refresh(&self) -> RefreshOutcome {
        let (generation, range, filter) = {
            let mut view = self.view.lock().await;
            let Some(range) = view.range else {
                return RefreshOutcome::Skipped;
            };
            view.issued_generation += 1;
            (view.issued_generation, range, view.filter.clone())
        };

        let result = self
            .fetcher
            .fetch(&self.content_type, &filter, &range)
            .await;

        let mut view = self.view.lock().await;
        view.settled_generation = view.settled_generation.max(generation);
        if generation <= view.resolved_generation {
            log::debug!(
                "Discarding fetch #{} (already resolved #{})",
                generation,
                view.resolved_generation
            );
            return RefreshOutcome::Discarded;
        }
        view.resolved_generation = generation;

        match result {
            Ok(mut events) => {
                {
                    let state = self.store.state();
                    let mut state = state.lock().await;
                    state.ingest(&events);
                    state.overlay(&mut events);
                }
                let count = events.len();
                view.events = events;
                log::debug!("Rendered fetch #{} with {} events", generation, count);
                RefreshOutcome::Applied(count)
            }
            Err(e) => {
                drop(view);
                log::warn!("Fetch #{} failed: {}", generation, e);
                self.notifier.notify(NoticeKind::Error, &e.to_string());
                RefreshOutcome::Failed(e)
            }
        }
    }

    /// Handles a drag-drop. The moved event is rendered at its new date
    /// before the remote save resolves.
    pub async fn on_drop(
        &self,
        event: &CalendarEvent,
        target: DropTarget,
    ) -> Result<SaveHandle, SchedulerError> {
        let Some(start) = target.instant() else {
            let err = SchedulerError::InvalidDrop;
            log::warn!("Rejected drop of {}: {}", event.id, err);
            self.notifier.notify(NoticeKind::Error, &err.to_string());
            return Err(err);
        };
        self.reschedule(event, start).await
    }

    pub async fn reschedule(
        &self,
        event: &CalendarEvent,
        date: NaiveDateTime,
    ) -> Result<SaveHandle, SchedulerError> {
        self.dispatch(event, ItemPatch::date(date)).await
    }

    pub async fn change_status(
        &self,
        event: &CalendarEvent,
        status: Status,
    ) -> Result<SaveHandle, SchedulerError> {
        self.dispatch(event, ItemPatch::status(status)).await
    }

    async fn dispatch(
        &self,
        event: &CalendarEvent,
        patch: ItemPatch,
    ) -> Result<SaveHandle, SchedulerError> {
        {
            // Events shown but never ingested (e.g. handed in by the host).
            let state = self.store.state();
            let mut state = state.lock().await;
            if state.item(event.source_item_id).is_none() {
                state.ingest(std::slice::from_ref(event));
            }
        }

        let handle = match self
            .store
            .update_item(&event.content_type_rest_base, event.source_item_id, patch)
            .await
        {
            Ok(h) => h,
            Err(e) => {
                self.notifier.notify(NoticeKind::Error, &e.to_string());
                return Err(e);
            }
        };
        self.rerender().await;

        let this = self.clone();
        Ok(SaveHandle::spawn(handle.item_id(), async move {
            let outcome = handle.wait().await;
            this.after_save(&outcome).await;
            outcome
        }))
    }

    async fn after_save(&self, outcome: &SaveOutcome) {
        self.rerender().await;
        if outcome.was_superseded() {
            return;
        }
        if self.range().await.is_some() {
            self.refresh().await;
        }
    }

    /// Rewrites the rendered events from the store's read-model.
    async fn rerender(&self) {
        let mut view = self.view.lock().await;
        let state = self.store.state();
        let state = state.lock().await;
        state.overlay(&mut view.events);
    }
}
