#![allow(clippy::uninlined_format_args)]

pub mod app;
pub mod comments;
pub mod config;
pub mod data;
pub mod feed;
pub mod layout;
pub mod logging;
pub mod reddit;
pub mod scroll;
pub mod state;
pub mod text;
pub mod ui;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use app::run;
