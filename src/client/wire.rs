// File: ./src/client/wire.rs
//! JSON shapes of the content platform's REST API and their mapping onto
//! [`ContentItem`].
use crate::error::ClientError;
use crate::model::{ContentItem, Status, parse_wire_date};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

#[derive(Debug, Deserialize)]
pub struct WireItem {
    pub id: u64,
    pub date: Option<String>,
    pub status: String,
    pub title: Rendered,
    #[serde(default)]
    pub link: String,
    pub guid: Option<Rendered>,
}

/// Error body returned by the platform (`{"code": "...", "message": "..."}`).
#[derive(Debug, Deserialize)]
pub struct WireError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

impl WireError {
    /// Best-effort human message for a failed response body.
    pub fn describe(body: &[u8]) -> String {
        match serde_json::from_slice::<WireError>(body) {
            Ok(e) if !e.message.is_empty() => {
                if e.code.is_empty() {
                    e.message
                } else {
                    format!("{} ({})", e.message, e.code)
                }
            }
            _ => String::from_utf8_lossy(body).chars().take(200).collect(),
        }
    }
}

/// Builds admin edit links and preview links for items.
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    admin_root: Url,
}

impl LinkBuilder {
    pub fn new(admin_root: Url) -> Self {
        Self { admin_root }
    }

    pub fn edit_url(&self, item_id: u64) -> String {
        match self.admin_root.join("post.php") {
            Ok(mut url) => {
                url.query_pairs_mut()
                    .append_pair("post", &item_id.to_string())
                    .append_pair("action", "edit");
                url.to_string()
            }
            Err(_) => format!("post.php?post={}&action=edit", item_id),
        }
    }

    pub fn preview_url(&self, permalink: &str) -> String {
        match Url::parse(permalink) {
            Ok(mut url) => {
                url.query_pairs_mut().append_pair("preview", "true");
                url.to_string()
            }
            Err(_) if permalink.contains('?') => format!("{}&preview=true", permalink),
            Err(_) => format!("{}?preview=true", permalink),
        }
    }
}

impl WireItem {
    /// Converts into a [`ContentItem`]. Items with a status the calendar does
    /// not schedule (`pending`, `private`, ...) yield `Ok(None)`.
    pub fn into_item(
        self,
        rest_base: &str,
        links: &LinkBuilder,
    ) -> Result<Option<ContentItem>, ClientError> {
        let status = match self.status.parse::<Status>() {
            Ok(s) => s,
            Err(_) => {
                log::debug!("Skipping item {} with status '{}'", self.id, self.status);
                return Ok(None);
            }
        };
        let raw_date = self
            .date
            .ok_or_else(|| ClientError::Decode(format!("item {} has no date", self.id)))?;
        let date = parse_wire_date(&raw_date).map_err(ClientError::Decode)?;

        let permalink = match &self.guid {
            Some(g) if !g.rendered.is_empty() => g.rendered.clone(),
            _ => self.link.clone(),
        };

        Ok(Some(ContentItem {
            id: self.id,
            title: self.title.rendered,
            url: self.link,
            date,
            status,
            edit_url: links.edit_url(self.id),
            preview_url: links.preview_url(&permalink),
            content_type_rest_base: rest_base.to_string(),
        }))
    }
}
