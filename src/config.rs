// File: ./src/config.rs
// Handles configuration loading, saving, and defaults.
use crate::context::AppContext;
use crate::model::{ContentType, Status, StatusFilter};
use anyhow::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_content_types() -> Vec<ContentType> {
    vec![
        ContentType::new("post", "posts", "Posts"),
        ContentType::new("page", "pages", "Pages"),
    ]
}

fn default_statuses() -> Vec<Status> {
    vec![Status::Publish, Status::Draft, Status::Future]
}

fn default_per_page() -> u32 {
    100
}

fn default_max_pages() -> u32 {
    50
}

fn default_request_timeout() -> u64 {
    30
}

/// Class names of the sub-elements rendered inside each event cell. Clicks on
/// these never count as "outside" the inspector.
pub fn default_outside_click_exemptions() -> Vec<String> {
    [
        "fc-event",
        "fc-event-button-wrapper",
        "fc-event-headers",
        "fc-time",
        "fc-status",
        "fc-event-title",
        "fc-title",
        "fc-event-info-placeholder",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    #[serde(default)]
    pub site_url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub application_password: String,

    #[serde(default = "default_content_types")]
    pub content_types: Vec<ContentType>,
    #[serde(default = "default_statuses")]
    pub default_statuses: Vec<Status>,

    #[serde(default = "default_per_page")]
    pub per_page: u32,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_outside_click_exemptions")]
    pub outside_click_exemptions: Vec<String>,

    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub desktop_notifications: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            site_url: String::new(),
            username: String::new(),
            application_password: String::new(),
            // Match the serde defaults
            content_types: default_content_types(),
            default_statuses: default_statuses(),
            per_page: default_per_page(),
            max_pages: default_max_pages(),
            request_timeout_secs: default_request_timeout(),
            outside_click_exemptions: default_outside_click_exemptions(),
            log_level: default_log_level(),
            desktop_notifications: false,
        }
    }
}

impl Config {
    /// Load the configuration from disk using an explicit context.
    /// Returns a contextualized error if reading or parsing fails.
    pub fn load(ctx: &dyn AppContext) -> Result<Self> {
        let path = ctx.config_path()?;

        if !path.exists() {
            return Err(anyhow::anyhow!("Config file not found"));
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file '{}': {}", path.display(), e)
        })?;

        Self::parse(&contents, &path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self> {
        let config: Config = toml::from_str(contents).map_err(|e| {
            anyhow::anyhow!("Failed to parse config file '{}': {}", path.display(), e)
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Detects whether an error from [`Config::load`] means the file is absent
    /// (as opposed to unreadable or malformed).
    pub fn is_missing_config_error(err: &Error) -> bool {
        if err.to_string().contains("Config file not found") {
            return true;
        }
        for cause in err.chain() {
            if let Some(io_err) = cause.downcast_ref::<std::io::Error>()
                && io_err.kind() == std::io::ErrorKind::NotFound
            {
                return true;
            }
        }
        false
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.per_page) {
            anyhow::bail!("per_page must be between 1 and 100, got {}", self.per_page);
        }
        if self.max_pages == 0 {
            anyhow::bail!("max_pages must be at least 1");
        }
        if self.content_types.is_empty() {
            anyhow::bail!("at least one content type must be configured");
        }
        if self.default_statuses.is_empty() {
            anyhow::bail!("default_statuses must not be empty");
        }
        Ok(())
    }

    /// Save configuration using an explicit context (write to .tmp, then rename).
    pub fn save(&self, ctx: &dyn AppContext) -> Result<()> {
        let path = ctx.config_path()?;
        let toml_str = toml::to_string_pretty(self)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, toml_str)?;
        fs::rename(tmp_path, path)?;
        Ok(())
    }

    pub fn content_type(&self, slug: &str) -> Option<&ContentType> {
        self.content_types.iter().find(|c| c.slug == slug)
    }

    pub fn status_filter(&self) -> StatusFilter {
        StatusFilter::from_statuses(self.default_statuses.iter().copied())
    }
}
