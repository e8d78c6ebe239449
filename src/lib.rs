#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod bsky;
pub mod config;
pub mod data;
pub mod media;
pub mod table;
pub mod thumb;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
