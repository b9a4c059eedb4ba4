// Crate root library declaration and module exports.
pub mod admin;
pub mod app;
pub mod client;
pub mod config;
pub mod context;
pub mod controller;
pub mod error;
pub mod fetcher;
pub mod inspector;
pub mod journal;
pub mod logging;
pub mod markdown;
pub mod model;
pub mod notify;
pub mod store;
pub mod widget;
