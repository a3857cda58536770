//! # livetail-core
//!
//! The engine behind `livetail`: stream build and runtime logs from a
//! deployment platform over a push connection, keep them in an append-only
//! buffer, and expose filtered, searchable, windowed views a renderer can
//! draw without ever touching the whole history.
//!
//! ## Overview
//!
//! The crate separates log acquisition from presentation. A
//! [`SessionController`] owns the moving parts for one log channel:
//!
//! ```text
//!   WebSocket ──► SessionHandle ──► LogBuffer ──► SearchIndex ──► LogWindow
//!   (worker thread)  events           records     visible/matches   plan
//! ```
//!
//! The session worker runs on its own thread and communicates only through
//! an event channel; the controller drains it on the owner's thread once
//! per tick. Nothing in the engine is shared across threads, so none of it
//! needs locks.
//!
//! ## Core Concepts
//!
//! ### Push sessions
//!
//! [`SessionHandle`](session::SessionHandle) opens one WebSocket per
//! target and forwards every text frame in arrival order. Connection
//! drops reconnect with doubling backoff (2s, then 4s); the third
//! consecutive failure is permanent and surfaces as
//! [`ConnectionState::PermanentlyFailed`], after which only a manual
//! retry opens a fresh session. Stopping a session joins its worker, so
//! no frame or retry timer can fire afterwards.
//!
//! ### Buffer and sequences
//!
//! [`LogBuffer`](buffer::LogBuffer) assigns each normalized record a
//! gapless sequence number. Wire frames are normalized by a total
//! function ([`normalize_frame`]): structured JSON when it parses,
//! plain text otherwise, never an error. An optional cap evicts oldest
//! records first.
//!
//! ### Filtering vs. search
//!
//! Level filters decide *visibility*; the search term decides *matches
//! within the visible list*. An empty level selection shows everything.
//! Searching never hides records, it navigates them, which is what you
//! want when an error's context is the lines around it.
//!
//! ### Windowed rendering
//!
//! [`LogWindow`](window::LogWindow) tracks cumulative row heights
//! (estimated from display width, replaced by measurements the renderer
//! reports back) and plans the minimal contiguous slice worth
//! materializing, plus an overscan margin. The view stays pinned to the
//! bottom until the user scrolls away and re-pins when they return.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use livetail_core::{ChannelTarget, LogChannel, SessionController, StreamFilters};
//!
//! fn main() -> Result<(), livetail_core::TargetError> {
//!     let target = ChannelTarget::new(
//!         "https://platform.example.dev",
//!         LogChannel::Container {
//!             project: "shop".to_string(),
//!             environment: "production".to_string(),
//!             container: "web".to_string(),
//!         },
//!         StreamFilters::default(),
//!     )?;
//!
//!     let mut controller = SessionController::new();
//!     controller.set_target(target);
//!     controller.set_viewport(80, 24);
//!
//!     for _ in 0..100 {
//!         if controller.pump() {
//!             let model = controller.read_model();
//!             println!(
//!                 "[{}] {} records, {} visible",
//!                 model.connection.label(),
//!                 model.total_records,
//!                 model.visible_records
//!             );
//!         }
//!         std::thread::sleep(std::time::Duration::from_millis(50));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Performance
//!
//! - **Lazy rendering**: only the planned window is ever materialized
//! - **Incremental search**: appended records are scanned alone, and a
//!   term that extends the previous one only narrows the previous matches
//! - **Parallel scans**: rayon kicks in past 1000 candidates
//! - **O(1) level counts**: maintained on ingest and eviction

pub mod buffer;
pub mod connection;
pub mod controller;
pub mod filter;
pub mod lifecycle;
pub mod normalize;
pub mod record;
pub mod session;
pub mod target;
pub mod window;

// re-export commonly used types
pub use buffer::LogBuffer;
pub use connection::{ConnectionMachine, ConnectionState};
pub use controller::{ReadModel, SessionController};
pub use filter::{FilterState, MatchDirection, SearchIndex};
pub use lifecycle::{LifecycleEvent, LifecycleSignal, NoSignals};
pub use normalize::normalize_frame;
pub use record::{LevelCounts, LevelSet, LogLevel, LogRecord};
pub use session::{SessionEvent, SessionHandle, SessionOptions};
pub use target::{ChannelTarget, LogChannel, StreamFilters, TargetError};
pub use window::{LogWindow, RowHeightCache, WindowPlan};
