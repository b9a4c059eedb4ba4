// File: src/error.rs
//! Error taxonomy of the scheduling core and its transport.
use chrono::NaiveDateTime;
use std::time::Duration;
use thiserror::Error;

/// Failures raised by a [`crate::client::ContentSource`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("tls setup failed: {0}")]
    Tls(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Errors of the scheduling core. None of them is fatal: the worst outcome is
/// a stale or reverted calendar view.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// Range/filter query failed. Previously rendered events stay in place.
    #[error("could not load calendar items: {0}")]
    FetchFailed(String),
    /// Remote save rejected or timed out. The field is rolled back.
    #[error("could not save item {item_id}: {reason}")]
    MutationFailed { item_id: u64, reason: String },
    /// The drop did not resolve to a concrete instant.
    #[error("the item was dropped on a range, not on a date and time")]
    InvalidDrop,
    #[error("range start {start} is after range end {end}")]
    InvalidRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },
    #[error("item {0} is not loaded in the calendar")]
    UnknownItem(u64),
    #[error("content type '{0}' is not configured")]
    UnknownContentType(String),
    #[error("nothing to update")]
    EmptyPatch,
}

impl SchedulerError {
    pub fn fetch(err: ClientError) -> Self {
        SchedulerError::FetchFailed(err.to_string())
    }

    pub fn mutation(item_id: u64, err: ClientError) -> Self {
        SchedulerError::MutationFailed {
            item_id,
            reason: err.to_string(),
        }
    }
}
