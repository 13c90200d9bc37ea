#![allow(clippy::uninlined_format_args)]

pub mod api;
pub mod app;
pub mod config;
pub mod controller;
pub mod data;
pub mod debounce;
pub mod feed;
pub mod logging;
pub mod mpv;
pub mod player;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::{list, run, RunOptions};
