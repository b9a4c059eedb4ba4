// File: src/inspector.rs
//! Selection / inspector state machine.
//!
//! Tracks the one event selected for inspection and the floating panel that
//! shows it. Input arrives as raw pointer and keyboard events from anywhere on
//! the page plus the panel's own actions. Committing actions are returned as
//! [`InspectorCommand`]s for the controller to carry out.
use crate::config::{Config, default_outside_click_exemptions};
use crate::model::{CalendarEvent, Rect, Status};
use chrono::NaiveDateTime;
use std::collections::HashSet;

/// Date format of the panel header, e.g. `March 09, 2024 @ 2:00PM`.
pub const PANEL_DATE_FORMAT: &str = "%B %d, %Y @ %-I:%M%p";

#[derive(Debug, Clone, PartialEq)]
pub enum InspectorState {
    Closed,
    Viewing {
        event: CalendarEvent,
        anchor: Rect,
    },
    Rescheduling {
        event: CalendarEvent,
        anchor: Rect,
        pending_date: NaiveDateTime,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectorMode {
    #[default]
    View,
    Reschedule,
}

/// Flat view of the current selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionState {
    pub selected_event: Option<CalendarEvent>,
    pub anchor_rect: Option<Rect>,
    pub inspector_mode: InspectorMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Other(String),
}

/// The element an interaction landed on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InteractionTarget {
    pub inside_inspector: bool,
    pub classes: Vec<String>,
}

impl InteractionTarget {
    pub fn inspector() -> Self {
        Self {
            inside_inspector: true,
            classes: Vec::new(),
        }
    }

    pub fn with_classes<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inside_inspector: false,
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InspectorInput {
    EventClicked { event: CalendarEvent, rect: Rect },
    Reschedule,
    Back,
    PickDate(NaiveDateTime),
    ConfirmReschedule,
    SwitchToDraft,
    Close,
    KeyUp { key: Key, target: InteractionTarget },
    PointerUp(InteractionTarget),
}

#[derive(Debug, Clone, PartialEq)]
pub enum InspectorCommand {
    Reschedule {
        event: CalendarEvent,
        date: NaiveDateTime,
    },
    ChangeStatus {
        event: CalendarEvent,
        status: Status,
    },
}

/// Class names whose elements never count as "outside" the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExemptionSet {
    classes: HashSet<String>,
}

impl Default for ExemptionSet {
    fn default() -> Self {
        Self::new(default_outside_click_exemptions())
    }
}

impl ExemptionSet {
    pub fn new<I, S>(classes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.outside_click_exemptions.iter().cloned())
    }

    pub fn is_exempt(&self, target: &InteractionTarget) -> bool {
        target.inside_inspector || target.classes.iter().any(|c| self.classes.contains(c))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelAction {
    Reschedule,
    SwitchToDraft,
    Edit(String),
    Preview(String),
}

impl PanelAction {
    pub fn label(&self) -> &'static str {
        match self {
            PanelAction::Reschedule => "Reschedule",
            PanelAction::SwitchToDraft => "Switch to draft",
            PanelAction::Edit(_) => "Edit",
            PanelAction::Preview(_) => "Preview",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelBody {
    Details { actions: Vec<PanelAction> },
    DatePicker { pending_date: NaiveDateTime },
}

/// What the host draws for the open inspector.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectorPanel {
    pub title: String,
    pub date_label: String,
    pub status: Status,
    /// Top-left corner of the panel: the anchor's bottom-left.
    pub origin: (f64, f64),
    pub body: PanelBody,
}

#[derive(Debug, Clone)]
pub struct Inspector {
    state: InspectorState,
    exemptions: ExemptionSet,
}

impl Default for Inspector {
    fn default() -> Self {
        Self::new(ExemptionSet::default())
    }
}

impl Inspector {
    pub fn new(exemptions: ExemptionSet) -> Self {
        Self {
            state: InspectorState::Closed,
            exemptions,
        }
    }

    pub fn state(&self) -> &InspectorState {
        &self.state
    }

    pub fn is_open(&self) -> bool {
        !matches!(self.state, InspectorState::Closed)
    }

    pub fn selection(&self) -> SelectionState {
        match &self.state {
            InspectorState::Closed => SelectionState::default(),
            InspectorState::Viewing { event, anchor } => SelectionState {
                selected_event: Some(event.clone()),
                anchor_rect: Some(*anchor),
                inspector_mode: InspectorMode::View,
            },
            InspectorState::Rescheduling { event, anchor, .. } => SelectionState {
                selected_event: Some(event.clone()),
                anchor_rect: Some(*anchor),
                inspector_mode: InspectorMode::Reschedule,
            },
        }
    }

    /// Feeds one input through the transition table.
    pub fn handle(&mut self, input: InspectorInput) -> Option<InspectorCommand> {
        let state = std::mem::replace(&mut self.state, InspectorState::Closed);
        let (next, command) = self.transition(state, input);
        log::debug!("Inspector -> {}", describe(&next));
        self.state = next;
        command
    }

    fn transition(
        &self,
        state: InspectorState,
        input: InspectorInput,
    ) -> (InspectorState, Option<InspectorCommand>) {
        use InspectorInput as In;
        use InspectorState as S;

        match (state, input) {
            // A click on any event opens it, replacing whatever was open.
            (_, In::EventClicked { event, rect }) => (
                S::Viewing {
                    event,
                    anchor: rect,
                },
                None,
            ),

            (_, In::Close) => (S::Closed, None),
            (
                _,
                In::KeyUp {
                    key: Key::Escape, ..
                },
            ) => (S::Closed, None),
            (state, In::KeyUp { target, .. }) | (state, In::PointerUp(target)) => {
                if self.exemptions.is_exempt(&target) {
                    (state, None)
                } else {
                    (S::Closed, None)
                }
            }

            (S::Viewing { event, anchor }, In::Reschedule) => {
                let pending_date = event.start;
                (
                    S::Rescheduling {
                        event,
                        anchor,
                        pending_date,
                    },
                    None,
                )
            }
            (S::Viewing { event, anchor }, In::SwitchToDraft) => {
                if event.status == Status::Draft {
                    (S::Viewing { event, anchor }, None)
                } else {
                    (
                        S::Closed,
                        Some(InspectorCommand::ChangeStatus {
                            event,
                            status: Status::Draft,
                        }),
                    )
                }
            }

            (S::Rescheduling { event, anchor, .. }, In::Back) => {
                (S::Viewing { event, anchor }, None)
            }
            (S::Rescheduling { event, anchor, .. }, In::PickDate(date)) => (
                S::Rescheduling {
                    event,
                    anchor,
                    pending_date: date,
                },
                None,
            ),
            (
                S::Rescheduling {
                    event,
                    pending_date,
                    ..
                },
                In::ConfirmReschedule,
            ) => (
                S::Closed,
                Some(InspectorCommand::Reschedule {
                    event,
                    date: pending_date,
                }),
            ),

            (state, _) => (state, None),
        }
    }

    /// The panel to draw, or `None` while closed.
    pub fn panel(&self) -> Option<InspectorPanel> {
        let (event, anchor, body) = match &self.state {
            InspectorState::Closed => return None,
            InspectorState::Viewing { event, anchor } => {
                let mut actions = vec![PanelAction::Reschedule];
                if event.status != Status::Draft {
                    actions.push(PanelAction::SwitchToDraft);
                }
                actions.push(PanelAction::Edit(event.edit_url.clone()));
                actions.push(PanelAction::Preview(event.preview_url.clone()));
                (event, anchor, PanelBody::Details { actions })
            }
            InspectorState::Rescheduling {
                event,
                anchor,
                pending_date,
            } => (
                event,
                anchor,
                PanelBody::DatePicker {
                    pending_date: *pending_date,
                },
            ),
        };

        Some(InspectorPanel {
            title: event.title.clone(),
            date_label: event.start.format(PANEL_DATE_FORMAT).to_string(),
            status: event.status,
            origin: anchor.bottom_left(),
            body,
        })
    }
}

fn describe(state: &InspectorState) -> String {
    match state {
        InspectorState::Closed => "closed".to_string(),
        InspectorState::Viewing { event, .. } => format!("viewing {}", event.id),
        InspectorState::Rescheduling {
            event,
            pending_date,
            ..
        } => format!("rescheduling {} to {}", event.id, pending_date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn panel_date_uses_twelve_hour_clock() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 0)
            .unwrap();
        assert_eq!(
            date.format(PANEL_DATE_FORMAT).to_string(),
            "March 09, 2024 @ 2:05PM"
        );
    }

    #[test]
    fn exemptions_cover_inspector_and_listed_classes() {
        let set = ExemptionSet::new(["fc-title"]);
        assert!(set.is_exempt(&InteractionTarget::inspector()));
        assert!(set.is_exempt(&InteractionTarget::with_classes(["x", "fc-title"])));
        assert!(!set.is_exempt(&InteractionTarget::with_classes(["fc-daygrid-day"])));
    }
}
