// File: src/admin.rs
// Host admin surface: menu entries, asset gating and the mount root.
use crate::model::ContentType;
use std::collections::BTreeMap;

/// Element id of the node the calendar mounts into.
pub const MOUNT_ROOT_ID: &str = "edcal-render-editorial-calendar";
pub const REQUIRED_CAPABILITY: &str = "manage_options";
const PAGE_SLUG_MARKER: &str = "edcal-editorial";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub parent: String,
    pub page_title: String,
    pub menu_title: String,
    pub capability: String,
    pub slug: String,
}

impl MenuEntry {
    pub fn for_type(content_type: &ContentType) -> Self {
        let parent = if content_type.slug == "post" {
            "edit.php".to_string()
        } else {
            format!("edit.php?post_type={}", content_type.slug)
        };
        Self {
            parent,
            page_title: "Editorial Calendar".to_string(),
            menu_title: "Calendar".to_string(),
            capability: REQUIRED_CAPABILITY.to_string(),
            slug: format!("{}-{}-calendar", PAGE_SLUG_MARKER, content_type.slug),
        }
    }
}

/// One calendar submenu per configured content type.
pub fn menu_entries(content_types: &[ContentType]) -> Vec<MenuEntry> {
    content_types.iter().map(MenuEntry::for_type).collect()
}

/// Whether the calendar's stylesheet and script belong on this admin page.
pub fn should_enqueue_assets(pagenow: &str, page: Option<&str>) -> bool {
    pagenow == "edit.php" && page.is_some_and(|p| p.contains(PAGE_SLUG_MARKER))
}

/// The DOM node the host renders for the calendar page.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MountRoot {
    pub id: String,
    pub attributes: BTreeMap<String, String>,
}

impl MountRoot {
    /// Root for the admin page of `post_type` (from the page's query string).
    pub fn for_request(post_type: Option<&str>) -> Self {
        let mut attributes = BTreeMap::new();
        let post_type = post_type.map(str::trim).filter(|t| !t.is_empty());
        attributes.insert("type".to_string(), post_type.unwrap_or("post").to_string());
        Self {
            id: MOUNT_ROOT_ID.to_string(),
            attributes,
        }
    }

    /// The content type slug the root was rendered for. Defaults to `post`.
    pub fn content_type(&self) -> &str {
        self.attributes
            .get("type")
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .unwrap_or("post")
    }

    pub fn markup(&self) -> String {
        format!(
            "<div class=\"wrap\"><div id=\"{}\" type=\"{}\"></div></div>",
            self.id,
            escape_attr(self.content_type())
        )
    }
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
