// File: src/model.rs
//! Content items, calendar events and the value types that flow between the
//! fetcher, the optimistic store and the inspector.
use crate::error::SchedulerError;
use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Wire format used by the content platform for item dates (site-local time).
pub const WIRE_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Serde adapter for site-local dates in `YYYY-MM-DDTHH:MM:SS` form.
pub mod wire_date {
    use super::WIRE_DATE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&date.format(WIRE_DATE_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_wire_date(&raw).map_err(serde::de::Error::custom)
    }

    pub mod option {
        use super::super::WIRE_DATE_FORMAT;
        use chrono::NaiveDateTime;
        use serde::Serializer;

        pub fn serialize<S: Serializer>(
            date: &Option<NaiveDateTime>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(d) => s.serialize_str(&d.format(WIRE_DATE_FORMAT).to_string()),
                None => s.serialize_none(),
            }
        }
    }
}

/// Parses a platform date. Fractional seconds and a trailing `Z` are tolerated.
pub fn parse_wire_date(raw: &str) -> Result<NaiveDateTime, String> {
    let trimmed = raw.trim().trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, WIRE_DATE_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|e| format!("invalid date '{}': {}", raw, e))
}

/// Publication status of a content item. Only the three schedulable statuses
/// are shown on the calendar.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
    Display,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Status {
    Draft,
    Publish,
    Future,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        (*self).into()
    }

    /// Label used by the filter checkboxes.
    pub fn filter_label(&self) -> &'static str {
        match self {
            Status::Draft => "Drafts",
            Status::Publish => "Published",
            Status::Future => "Scheduled",
        }
    }
}

/// Editor-controlled subset of statuses shown on the calendar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusFilter(BTreeSet<Status>);

impl Default for StatusFilter {
    fn default() -> Self {
        Self(Status::iter().collect())
    }
}

impl StatusFilter {
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    pub fn from_statuses<I: IntoIterator<Item = Status>>(statuses: I) -> Self {
        Self(statuses.into_iter().collect())
    }

    /// Adds the status if absent, removes it if present.
    pub fn toggle(&mut self, status: Status) {
        if !self.0.remove(&status) {
            self.0.insert(status);
        }
    }

    pub fn contains(&self, status: Status) -> bool {
        self.0.contains(&status)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Status> + '_ {
        self.0.iter().copied()
    }

    pub fn to_vec(&self) -> Vec<Status> {
        self.0.iter().copied().collect()
    }
}

/// A content type the calendar can be mounted for (`post`, `page`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub slug: String,
    pub rest_base: String,
    #[serde(default)]
    pub label: String,
}

impl ContentType {
    pub fn new(slug: &str, rest_base: &str, label: &str) -> Self {
        Self {
            slug: slug.to_string(),
            rest_base: rest_base.to_string(),
            label: label.to_string(),
        }
    }
}

/// A schedulable item as owned by the external content store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: u64,
    pub title: String,
    pub url: String,
    #[serde(with = "wire_date")]
    pub date: NaiveDateTime,
    pub status: Status,
    pub edit_url: String,
    pub preview_url: String,
    pub content_type_rest_base: String,
}

/// Widget-facing projection of a [`ContentItem`]. Rebuilt on every fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: NaiveDateTime,
    pub status: Status,
    pub content_type_rest_base: String,
    pub source_item_id: u64,
    pub edit_url: String,
    pub preview_url: String,
}

impl CalendarEvent {
    pub fn event_id(rest_base: &str, item_id: u64) -> String {
        format!("{}-{}", rest_base, item_id)
    }
}

impl From<&ContentItem> for CalendarEvent {
    fn from(item: &ContentItem) -> Self {
        Self {
            id: Self::event_id(&item.content_type_rest_base, item.id),
            title: item.title.clone(),
            start: item.date,
            status: item.status,
            content_type_rest_base: item.content_type_rest_base.clone(),
            source_item_id: item.id,
            edit_url: item.edit_url.clone(),
            preview_url: item.preview_url.clone(),
        }
    }
}

/// The two mutable fields of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Field {
    Date,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    Date(NaiveDateTime),
    Status(Status),
}

impl FieldValue {
    pub fn field(&self) -> Field {
        match self {
            FieldValue::Date(_) => Field::Date,
            FieldValue::Status(_) => Field::Status,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Date(d) => write!(f, "{}", d.format(WIRE_DATE_FORMAT)),
            FieldValue::Status(s) => write!(f, "{}", s),
        }
    }
}

/// Partial update sent to the content store. Absent fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ItemPatch {
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "wire_date::option"
    )]
    pub date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
}

impl ItemPatch {
    pub fn date(date: NaiveDateTime) -> Self {
        Self {
            date: Some(date),
            status: None,
        }
    }

    pub fn status(status: Status) -> Self {
        Self {
            date: None,
            status: Some(status),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.status.is_none()
    }

    pub fn values(&self) -> Vec<FieldValue> {
        let mut out = Vec::with_capacity(2);
        if let Some(d) = self.date {
            out.push(FieldValue::Date(d));
        }
        if let Some(s) = self.status {
            out.push(FieldValue::Status(s));
        }
        out
    }
}

/// Closed interval of visible calendar time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

impl DateRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, SchedulerError> {
        if start > end {
            return Err(SchedulerError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn contains(&self, at: NaiveDateTime) -> bool {
        self.start <= at && at <= self.end
    }

    /// Exclusive bounds for a remote query that must include both endpoints.
    /// Saturates at the representable limits.
    pub fn query_bounds(&self) -> (NaiveDateTime, NaiveDateTime) {
        let step = Duration::seconds(1);
        (
            self.start.checked_sub_signed(step).unwrap_or(NaiveDateTime::MIN),
            self.end.checked_add_signed(step).unwrap_or(NaiveDateTime::MAX),
        )
    }
}

/// Screen rectangle of a rendered element, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Origin of a panel placed "bottom left" of this rectangle.
    pub fn bottom_left(&self) -> (f64, f64) {
        (self.x, self.y + self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn toggle_is_symmetric_difference() {
        let mut filter = StatusFilter::default();
        filter.toggle(Status::Draft);
        assert!(!filter.contains(Status::Draft));
        assert_eq!(filter.to_vec(), vec![Status::Publish, Status::Future]);
        filter.toggle(Status::Draft);
        assert_eq!(filter, StatusFilter::default());
    }

    #[test]
    fn range_rejects_inverted_bounds() {
        assert!(matches!(
            DateRange::new(at(5, 0), at(4, 0)),
            Err(SchedulerError::InvalidRange { .. })
        ));
        let r = DateRange::new(at(4, 0), at(4, 0)).unwrap();
        assert!(r.contains(at(4, 0)));
    }

    #[test]
    fn query_bounds_widen_and_saturate() {
        let r = DateRange::new(at(4, 0), at(5, 0)).unwrap();
        let (after, before) = r.query_bounds();
        assert_eq!(after, at(3, 23) + Duration::seconds(3599));
        assert_eq!(before, at(5, 0) + Duration::seconds(1));

        let edges = DateRange::new(NaiveDateTime::MIN, NaiveDateTime::MAX).unwrap();
        assert_eq!(edges.query_bounds(), (NaiveDateTime::MIN, NaiveDateTime::MAX));
    }

    #[test]
    fn status_and_field_names_are_lowercase() {
        assert_eq!(Status::Future.to_string(), "future");
        assert_eq!(Status::Publish.as_str(), "publish");
        assert_eq!("Draft".parse::<Status>().unwrap(), Status::Draft);
        assert!("pending".parse::<Status>().is_err());
        assert_eq!(Field::Status.to_string(), "status");
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let json = serde_json::to_string(&ItemPatch::date(at(9, 14))).unwrap();
        assert_eq!(json, r#"{"date":"2024-03-09T14:00:00"}"#);
        let json = serde_json::to_string(&ItemPatch::status(Status::Draft)).unwrap();
        assert_eq!(json, r#"{"status":"draft"}"#);
    }

    #[test]
    fn wire_dates_tolerate_fractions_and_zulu() {
        assert_eq!(parse_wire_date("2024-03-09T14:00:00").unwrap(), at(9, 14));
        assert_eq!(parse_wire_date("2024-03-09T14:00:00.000Z").unwrap(), at(9, 14));
        assert!(parse_wire_date("09/03/2024").is_err());
    }
}
