// File: src/widget.rs
//! The narrow boundary to the third-party calendar widget.
//!
//! The widget calls into [`CalendarAdapter`] for everything it reports and
//! asks it how each event cell should be drawn. It never sees the controller,
//! the store or the inspector directly.
use crate::controller::{DropTarget, RefreshOutcome};
use crate::error::SchedulerError;
use crate::inspector::{InteractionTarget, Key};
use crate::model::{CalendarEvent, Rect, Status, StatusFilter};
use crate::store::SaveHandle;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use strum::{Display, EnumIter, IntoEnumIterator};

#[async_trait]
pub trait CalendarAdapter: Send + Sync {
    /// The visible range changed (navigation or view switch).
    async fn on_range_change(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<RefreshOutcome, SchedulerError>;

    /// An event was dragged onto a new slot.
    async fn on_drop(
        &self,
        event: &CalendarEvent,
        target: DropTarget,
    ) -> Result<SaveHandle, SchedulerError>;

    /// A rendered event was clicked; `rect` is its on-screen box.
    async fn on_event_click(&self, event: &CalendarEvent, rect: Rect);

    fn render_event(&self, event: &CalendarEvent) -> EventCell;

    /// Pointer released anywhere on the page.
    async fn on_pointer_up(&self, target: InteractionTarget);

    /// Key released anywhere on the page.
    async fn on_key_up(&self, key: Key, target: InteractionTarget);
}

/// Content of one event cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventCell {
    pub classes: Vec<String>,
    pub time_text: String,
    pub status_text: String,
    pub title: String,
}

impl EventCell {
    pub fn for_event(event: &CalendarEvent) -> Self {
        Self {
            classes: vec![
                format!("fc-status-{}", event.status),
                "fc-event-button-wrapper".to_string(),
            ],
            time_text: event.start.format("%-I:%M%P").to_string(),
            status_text: event.status.to_string(),
            title: event.title.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter)]
pub enum CalendarView {
    #[strum(serialize = "dayGridMonth")]
    Month,
    #[strum(serialize = "timeGridWeek")]
    Week,
    #[strum(serialize = "timeGridDay")]
    Day,
    #[strum(serialize = "listWeek")]
    List,
}

/// Options the widget is constructed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetOptions {
    pub editable: bool,
    pub initial_view: CalendarView,
    pub day_max_event_rows: u32,
    pub all_day_slot: bool,
    pub event_duration_editable: bool,
    /// Empty when the view switcher is hidden.
    pub view_switcher: Vec<CalendarView>,
}

impl WidgetOptions {
    pub fn for_viewport(is_mobile: bool) -> Self {
        Self {
            editable: true,
            initial_view: if is_mobile {
                CalendarView::Day
            } else {
                CalendarView::Month
            },
            day_max_event_rows: 5,
            all_day_slot: false,
            event_duration_editable: false,
            view_switcher: if is_mobile {
                Vec::new()
            } else {
                CalendarView::iter().collect()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCheckbox {
    pub status: Status,
    pub label: &'static str,
    pub checked: bool,
}

/// The status filter controls, in display order.
pub fn filter_checkboxes(filter: &StatusFilter) -> Vec<FilterCheckbox> {
    [Status::Draft, Status::Publish, Status::Future]
        .into_iter()
        .map(|status| FilterCheckbox {
            status,
            label: status.filter_label(),
            checked: filter.contains(status),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mobile_starts_on_day_view_without_switcher() {
        let opts = WidgetOptions::for_viewport(true);
        assert_eq!(opts.initial_view.to_string(), "timeGridDay");
        assert!(opts.view_switcher.is_empty());

        let opts = WidgetOptions::for_viewport(false);
        assert_eq!(opts.initial_view.to_string(), "dayGridMonth");
        assert_eq!(opts.view_switcher.len(), 4);
        assert_eq!(opts.day_max_event_rows, 5);
        assert!(!opts.all_day_slot);
    }

    #[test]
    fn checkboxes_follow_filter() {
        let mut filter = StatusFilter::default();
        filter.toggle(Status::Publish);
        let boxes = filter_checkboxes(&filter);
        assert_eq!(boxes[0].label, "Drafts");
        assert!(boxes[0].checked);
        assert!(!boxes[1].checked);
        assert_eq!(boxes[2].label, "Scheduled");
    }
}
