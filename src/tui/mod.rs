//! TUI module for lokal-cli
//!
//! Terminal user interface using Ratatui, driven by the sync store.

mod app;
mod compose;
mod ui;

pub use app::run;
