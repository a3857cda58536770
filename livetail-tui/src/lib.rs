//! # livetail-tui
//!
//! Terminal host for the livetail streaming engine. The crate owns the
//! render loop, key and mouse handling, and the footer/status chrome, while
//! [`livetail_core`] owns the session, buffer, filtering, and window layout.
//!
//! ## Overview
//!
//! The host pumps the session controller once per tick, measures the real
//! wrapped height of every row the layout plans to show, and feeds those
//! measurements back so scroll positions stay stable as estimates are
//! replaced. Rendering stays proportional to the viewport, not the buffer.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use livetail_core::{ChannelTarget, LogChannel, StreamFilters};
//! use livetail_tui::{AppDesc, start_with_target};
//! use ratatui::{Terminal, backend::CrosstermBackend};
//! use std::io;
//!
//! fn main() -> anyhow::Result<()> {
//!     let channel = LogChannel::Container {
//!         project: "demo".into(),
//!         environment: "production".into(),
//!         container: "api".into(),
//!     };
//!     let target = ChannelTarget::new("wss://logs.example.dev", channel, StreamFilters::default())?;
//!
//!     let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
//!     let mut desc = AppDesc::new();
//!     desc.show_debug_logs = true;
//!
//!     start_with_target(&mut terminal, target, desc)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Keys
//!
//! - `j`/`k`, `Ctrl+d`/`Ctrl+u`, `gg`/`G`: scroll; `G` re-enables follow
//! - `/`, `n`/`N`: search and walk matches
//! - `1`-`5`, `0`: toggle level filters / show all
//! - `r`, `t`, `c`: retry failed connection, toggle timestamps, clear
//! - `y`, `m`, `b`, `?`: yank match, mouse capture, debug pane, help

// internal modules (not part of public API but needed for app)
pub(crate) mod app;
pub(crate) mod app_block;
pub(crate) mod content_line_maker;
pub(crate) mod status_bar;
pub(crate) mod theme;
pub(crate) mod ui_logger;

// public API for running the application
pub use app::{AppDesc, start_with_signals, start_with_target};
