// File: src/app.rs
//! The mount contract: given a mount root and the content type it names,
//! build the scheduling core and expose it to the calendar widget.
use crate::admin::MountRoot;
use crate::client::{ContentSource, RestClient};
use crate::config::Config;
use crate::context::AppContext;
use crate::controller::{DropTarget, RefreshOutcome, ScheduleController};
use crate::error::SchedulerError;
use crate::fetcher::EventFetcher;
use crate::inspector::{
    ExemptionSet, Inspector, InspectorCommand, InspectorInput, InspectorPanel, InspectorState,
    InteractionTarget, Key, SelectionState,
};
use crate::logging;
use crate::model::{CalendarEvent, DateRange, Rect, Status};
use crate::notify::{DesktopNotifier, LogNotifier, Notifier};
use crate::store::{SaveHandle, UpdateStore};
use crate::widget::{CalendarAdapter, EventCell, FilterCheckbox, WidgetOptions, filter_checkboxes};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct CalendarApp {
    controller: ScheduleController,
    inspector: Arc<Mutex<Inspector>>,
    options: WidgetOptions,
}

impl CalendarApp {
    /// Wires the core for the content type named by `root`.
    pub fn mount(
        root: &MountRoot,
        config: &Config,
        source: Arc<dyn ContentSource>,
        notifier: Arc<dyn Notifier>,
        is_mobile: bool,
    ) -> Result<Self, SchedulerError> {
        let slug = root.content_type();
        let content_type = config
            .content_type(slug)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownContentType(slug.to_string()))?;
        log::info!(
            "Mounting calendar for {} ({})",
            content_type.slug,
            content_type.rest_base
        );

        let fetcher = EventFetcher::new(source.clone(), config.per_page, config.max_pages);
        let store = UpdateStore::new(source, notifier.clone());
        let controller = ScheduleController::new(
            content_type,
            fetcher,
            store,
            notifier,
            config.status_filter(),
        );

        Ok(Self {
            controller,
            inspector: Arc::new(Mutex::new(Inspector::new(ExemptionSet::from_config(
                config,
            )))),
            options: WidgetOptions::for_viewport(is_mobile),
        })
    }

    /// Mounts against the REST API configured in `config`.
    pub fn from_config(root: &MountRoot, config: &Config, is_mobile: bool) -> Result<Self> {
        let client = RestClient::from_config(config)?;
        let notifier: Arc<dyn Notifier> = if config.desktop_notifications {
            Arc::new(DesktopNotifier::new("edcal"))
        } else {
            Arc::new(LogNotifier)
        };
        Ok(Self::mount(root, config, Arc::new(client), notifier, is_mobile)?)
    }

    /// Loads configuration, starts logging and mounts. A missing config file
    /// falls back to defaults.
    pub fn start(ctx: &dyn AppContext, root: &MountRoot, is_mobile: bool) -> Result<Self> {
        let config = match Config::load(ctx) {
            Ok(config) => config,
            Err(e) if Config::is_missing_config_error(&e) => Config::default(),
            Err(e) => return Err(e),
        };
        logging::init(ctx, &config.log_level)?;
        Self::from_config(root, &config, is_mobile)
    }

    pub fn controller(&self) -> &ScheduleController {
        &self.controller
    }

    pub fn options(&self) -> &WidgetOptions {
        &self.options
    }

    pub async fn inspector_state(&self) -> InspectorState {
        self.inspector.lock().await.state().clone()
    }

    pub async fn selection(&self) -> SelectionState {
        self.inspector.lock().await.selection()
    }

    pub async fn panel(&self) -> Option<InspectorPanel> {
        self.inspector.lock().await.panel()
    }

    pub async fn filter_checkboxes(&self) -> Vec<FilterCheckbox> {
        filter_checkboxes(&self.controller.filter().await)
    }

    pub async fn toggle_status(&self, status: Status) -> RefreshOutcome {
        self.controller.toggle_status(status).await
    }

    /// Feeds an inspector input and carries out the command it yields, if
    /// any. The returned handle tracks the resulting save.
    pub async fn inspect(
        &self,
        input: InspectorInput,
    ) -> Result<Option<SaveHandle>, SchedulerError> {
        let command = self.inspector.lock().await.handle(input);
        match command {
            None => Ok(None),
            Some(InspectorCommand::Reschedule { event, date }) => {
                self.controller.reschedule(&event, date).await.map(Some)
            }
            Some(InspectorCommand::ChangeStatus { event, status }) => {
                self.controller.change_status(&event, status).await.map(Some)
            }
        }
    }
}

#[async_trait]
impl CalendarAdapter for CalendarApp {
    async fn on_range_change(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<RefreshOutcome, SchedulerError> {
        let range = DateRange::new(start, end)?;
        Ok(self.controller.set_range(range).await)
    }

    async fn on_drop(
        &self,
        event: &CalendarEvent,
        target: DropTarget,
    ) -> Result<SaveHandle, SchedulerError> {
        self.controller.on_drop(event, target).await
    }

    async fn on_event_click(&self, event: &CalendarEvent, rect: Rect) {
        self.inspector
            .lock()
            .await
            .handle(InspectorInput::EventClicked {
                event: event.clone(),
                rect,
            });
    }

    fn render_event(&self, event: &CalendarEvent) -> EventCell {
        EventCell::for_event(event)
    }

    async fn on_pointer_up(&self, target: InteractionTarget) {
        self.inspector
            .lock()
            .await
            .handle(InspectorInput::PointerUp(target));
    }

    async fn on_key_up(&self, key: Key, target: InteractionTarget) {
        self.inspector
            .lock()
            .await
            .handle(InspectorInput::KeyUp { key, target });
    }
}
