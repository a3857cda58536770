use crate::buffer::LogBuffer;
use crate::connection::ConnectionState;
use crate::filter::{FilterState, MatchDirection, SearchIndex};
use crate::lifecycle::LifecycleEvent;
use crate::record::{LevelCounts, LevelSet, LogLevel, LogRecord};
use crate::session::{SessionEvent, SessionHandle, SessionOptions};
use crate::target::ChannelTarget;
use crate::window::LogWindow;

/// Snapshot of everything a status line wants to show.
///
/// Carries counts only. The visible records themselves stay inside the
/// controller and are read by position through
/// [`SessionController::record_at`] (positions `0..visible_records`), so
/// taking a snapshot never copies the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadModel {
    pub connection: ConnectionState,
    pub total_records: usize,
    pub visible_records: usize,
    pub dropped_records: u64,
    pub match_count: usize,
    pub current_match: usize,
    pub level_counts: LevelCounts,
}

/// Owns one target's whole stream: the session, the buffer, the filter
/// and search index over it, and the scroll window.
///
/// Everything here runs on the owner's thread. The session worker talks
/// to it only through the event channel, drained by [`pump`] once per
/// tick, so no state in this struct is ever touched concurrently.
///
/// [`pump`]: SessionController::pump
pub struct SessionController {
    target: Option<ChannelTarget>,
    session: Option<SessionHandle>,
    options: SessionOptions,
    state: ConnectionState,
    buffer: LogBuffer,
    filter: FilterState,
    index: SearchIndex,
    window: LogWindow,
}

impl SessionController {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default(), 0)
    }

    /// `max_records` of zero keeps the buffer unbounded
    pub fn with_options(options: SessionOptions, max_records: usize) -> Self {
        Self {
            target: None,
            session: None,
            options,
            state: ConnectionState::Idle,
            buffer: LogBuffer::with_max_records(max_records),
            filter: FilterState::default(),
            index: SearchIndex::new(),
            window: LogWindow::new(),
        }
    }

    /// Attach to a channel. A no-op when the target is unchanged;
    /// otherwise the old session is stopped and joined *before* the
    /// stream state resets, so nothing from the old channel can land in
    /// the new buffer.
    pub fn set_target(&mut self, target: ChannelTarget) {
        if self.target.as_ref() == Some(&target) {
            return;
        }
        self.shutdown_session();
        self.reset_stream_state();
        self.buffer.set_wire_timestamps(target.filters().timestamps);
        log::info!("attaching to {}", target.describe());
        self.session = Some(SessionHandle::open_with(&target, self.options));
        self.state = ConnectionState::Connecting;
        self.target = Some(target);
    }

    /// Drain pending session events in arrival order: mirror state
    /// changes, ingest frames, then bring the derived views up to date.
    /// Returns whether anything observable changed.
    pub fn pump(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        let mut changed = false;
        let mut ingested = false;
        while let Some(event) = session.try_next_event() {
            match event {
                SessionEvent::StateChanged(state) => {
                    if self.state != state {
                        self.state = state;
                        changed = true;
                    }
                }
                SessionEvent::Frame(frame) => {
                    self.buffer.ingest(&frame);
                    ingested = true;
                }
            }
        }
        if ingested {
            self.index.refresh(&self.buffer, &self.filter);
            // a capped buffer can evict matched records on ingest
            self.filter.clamp_match(self.index.match_count());
            self.window.sync(&self.buffer, self.index.visible());
            self.window.follow_if_pinned();
            changed = true;
        }
        changed
    }

    // ------------------------------------------------------------------
    // filtering and search
    // ------------------------------------------------------------------

    /// Replace the level selection. The term is kept; match positions are
    /// recomputed against the new visible list and the cursor clamped.
    pub fn set_active_levels(&mut self, levels: LevelSet) {
        if self.filter.active_levels == levels {
            return;
        }
        self.filter.active_levels = levels;
        self.index.refresh(&self.buffer, &self.filter);
        self.filter.clamp_match(self.index.match_count());
        self.window.rebuild(&self.buffer, self.index.visible());
    }

    pub fn toggle_level(&mut self, level: LogLevel) {
        let mut levels = self.filter.active_levels;
        levels.toggle(level);
        self.set_active_levels(levels);
    }

    /// Replace the search term. The cursor resets to the first match and
    /// the window scrolls to it when there is one.
    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let term = term.into();
        if self.filter.search_term == term {
            return;
        }
        self.filter.search_term = term;
        self.filter.current_match = 0;
        self.index.refresh(&self.buffer, &self.filter);
        if let Some(&position) = self.index.matches().first() {
            self.window.scroll_to_position(position);
        }
    }

    /// Step the match cursor and scroll the new match into view. `None`
    /// when there are no matches.
    pub fn advance_match(&mut self, direction: MatchDirection) -> Option<usize> {
        let cursor = self.filter.advance(direction, self.index.match_count())?;
        if let Some(&position) = self.index.matches().get(cursor) {
            self.window.scroll_to_position(position);
        }
        Some(cursor)
    }

    /// position of the current match within the visible list
    pub fn current_match_position(&self) -> Option<usize> {
        self.index.matches().get(self.filter.current_match).copied()
    }

    pub fn current_match_record(&self) -> Option<&LogRecord> {
        let position = self.current_match_position()?;
        let index = self.index.visible().get(position).copied()?;
        self.buffer.get(index)
    }

    // ------------------------------------------------------------------
    // session control
    // ------------------------------------------------------------------

    /// Open a fresh session after a permanent failure. The attempt
    /// counter starts over because the session does. Returns false when
    /// the connection is not in the failed state.
    pub fn retry_now(&mut self) -> bool {
        if !self.state.is_terminal() || self.target.is_none() {
            return false;
        }
        self.shutdown_session();
        if let Some(target) = self.target.as_ref() {
            log::info!("manual retry for {}", target.describe());
            self.session = Some(SessionHandle::open_with(target, self.options));
            self.state = ConnectionState::Connecting;
        }
        true
    }

    /// Drop every record. Level selection and term survive; sequences
    /// restart from zero, so measured heights go with the records.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.index.reset();
        self.index.refresh(&self.buffer, &self.filter);
        self.filter.current_match = 0;
        self.window.reset();
    }

    pub fn handle_lifecycle(&mut self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::Terminate => self.dispose(),
            LifecycleEvent::Suspend | LifecycleEvent::Resume => {
                log::debug!("lifecycle event: {event:?}");
            }
        }
    }

    /// Stop and join the session. Idempotent; the controller is reusable
    /// afterwards via `set_target`.
    pub fn dispose(&mut self) {
        self.shutdown_session();
        self.target = None;
        self.state = ConnectionState::Idle;
    }

    fn shutdown_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.stop();
        }
    }

    fn reset_stream_state(&mut self) {
        self.buffer.clear();
        self.index.reset();
        self.filter = FilterState::default();
        self.window.reset();
    }

    // ------------------------------------------------------------------
    // window plumbing
    // ------------------------------------------------------------------

    pub fn set_viewport(&mut self, cols: u16, rows: u16) {
        if self.window.set_viewport(cols, rows) {
            self.window.rebuild(&self.buffer, self.index.visible());
        }
    }

    /// forward a height the host measured for a visible position
    pub fn record_measured(&mut self, position: usize, rows: u16) -> bool {
        self.window
            .record_measured(&self.buffer, self.index.visible(), position, rows)
    }

    // ------------------------------------------------------------------
    // reads
    // ------------------------------------------------------------------

    pub fn state(&self) -> &ConnectionState {
        &self.state
    }

    pub fn target(&self) -> Option<&ChannelTarget> {
        self.target.as_ref()
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub fn window(&self) -> &LogWindow {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut LogWindow {
        &mut self.window
    }

    /// record at a position of the visible list
    pub fn record_at(&self, position: usize) -> Option<&LogRecord> {
        let index = self.index.visible().get(position).copied()?;
        self.buffer.get(index)
    }

    pub fn visible_len(&self) -> usize {
        self.index.visible().len()
    }

    pub fn matches(&self) -> &[usize] {
        self.index.matches()
    }

    pub fn read_model(&self) -> ReadModel {
        ReadModel {
            connection: self.state.clone(),
            total_records: self.buffer.len(),
            visible_records: self.index.visible().len(),
            dropped_records: self.buffer.dropped(),
            match_count: self.index.match_count(),
            current_match: self.filter.current_match,
            level_counts: self.buffer.level_counts(),
        }
    }
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{LogChannel, StreamFilters};
    use std::time::Duration;
    use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

    fn scripted_controller() -> (SessionController, UnboundedSender<SessionEvent>) {
        let (tx, rx) = unbounded_channel();
        let mut controller = SessionController::new();
        controller.session = Some(SessionHandle::detached(rx));
        controller.state = ConnectionState::Connecting;
        (controller, tx)
    }

    fn sample_target() -> ChannelTarget {
        ChannelTarget::new(
            "ws://127.0.0.1:1",
            LogChannel::Container {
                project: "demo".to_string(),
                environment: "prod".to_string(),
                container: "web".to_string(),
            },
            StreamFilters::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_pump_ingests_frames_in_arrival_order() {
        let (mut controller, tx) = scripted_controller();
        tx.send(SessionEvent::StateChanged(ConnectionState::Connected))
            .unwrap();
        tx.send(SessionEvent::Frame("hello".to_string())).unwrap();
        tx.send(SessionEvent::Frame(
            r#"{"level":"error","message":"boom"}"#.to_string(),
        ))
        .unwrap();

        assert!(controller.pump());
        assert_eq!(controller.state(), &ConnectionState::Connected);

        let model = controller.read_model();
        assert_eq!(model.total_records, 2);
        assert_eq!(model.visible_records, 2);

        let first = controller.record_at(0).unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(first.level, LogLevel::Unknown);
        assert_eq!(first.message, "hello");
        let second = controller.record_at(1).unwrap();
        assert_eq!(second.sequence, 1);
        assert_eq!(second.level, LogLevel::Error);
        assert_eq!(second.message, "boom");

        // nothing pending, nothing changes
        assert!(!controller.pump());
    }

    #[test]
    fn test_pump_mirrors_connection_state() {
        let (mut controller, tx) = scripted_controller();
        tx.send(SessionEvent::StateChanged(
            ConnectionState::PermanentlyFailed {
                reason: "connection closed".to_string(),
            },
        ))
        .unwrap();
        assert!(controller.pump());
        assert!(controller.state().is_terminal());
    }

    #[test]
    fn test_search_term_resets_cursor_and_scrolls() {
        let (mut controller, tx) = scripted_controller();
        controller.set_viewport(40, 10);
        for i in 0..100 {
            let frame = if i == 60 { "needle here".to_string() } else { format!("row {i}") };
            tx.send(SessionEvent::Frame(frame)).unwrap();
        }
        controller.pump();
        controller.window_mut().jump_to_top();

        controller.set_search_term("NEEDLE");
        let model = controller.read_model();
        assert_eq!(model.match_count, 1);
        assert_eq!(model.current_match, 0);
        assert_eq!(controller.current_match_position(), Some(60));
        // centered on the match (offset 60, half a 10-row viewport above)
        assert_eq!(controller.window().scroll_top(), 55);
    }

    #[test]
    fn test_advance_match_cycles_and_scrolls() {
        let (mut controller, tx) = scripted_controller();
        controller.set_viewport(40, 10);
        for i in 0..30 {
            let frame = if i % 10 == 0 { format!("match {i}") } else { format!("row {i}") };
            tx.send(SessionEvent::Frame(frame)).unwrap();
        }
        controller.pump();
        controller.set_search_term("match");
        assert_eq!(controller.read_model().match_count, 3);

        assert_eq!(controller.advance_match(MatchDirection::Next), Some(1));
        assert_eq!(controller.advance_match(MatchDirection::Next), Some(2));
        assert_eq!(controller.advance_match(MatchDirection::Next), Some(0));
        assert_eq!(controller.current_match_position(), Some(0));
    }

    #[test]
    fn test_level_change_keeps_term_and_clamps_cursor() {
        let (mut controller, tx) = scripted_controller();
        tx.send(SessionEvent::Frame(
            r#"{"level":"info","message":"deploy started"}"#.to_string(),
        ))
        .unwrap();
        tx.send(SessionEvent::Frame(
            r#"{"level":"error","message":"deploy failed"}"#.to_string(),
        ))
        .unwrap();
        tx.send(SessionEvent::Frame(
            r#"{"level":"info","message":"deploy retried"}"#.to_string(),
        ))
        .unwrap();
        controller.pump();

        controller.set_search_term("deploy");
        controller.advance_match(MatchDirection::Next);
        controller.advance_match(MatchDirection::Next);
        assert_eq!(controller.read_model().current_match, 2);

        controller.set_active_levels(LevelSet::of(&[LogLevel::Error]));
        let model = controller.read_model();
        assert_eq!(controller.filter().search_term, "deploy");
        assert_eq!(model.visible_records, 1);
        assert_eq!(model.match_count, 1);
        assert_eq!(model.current_match, 0);
    }

    #[test]
    fn test_clear_keeps_filters_and_restarts_sequences() {
        let (mut controller, tx) = scripted_controller();
        tx.send(SessionEvent::Frame("alpha match".to_string())).unwrap();
        tx.send(SessionEvent::Frame("beta".to_string())).unwrap();
        controller.pump();
        controller.toggle_level(LogLevel::Unknown);
        controller.set_search_term("match");

        controller.clear();
        let model = controller.read_model();
        assert_eq!(model.total_records, 0);
        assert_eq!(model.match_count, 0);
        assert_eq!(controller.filter().search_term, "match");
        assert!(controller.filter().active_levels.contains(LogLevel::Unknown));

        tx.send(SessionEvent::Frame("fresh match".to_string())).unwrap();
        controller.pump();
        assert_eq!(controller.record_at(0).unwrap().sequence, 0);
        assert_eq!(controller.read_model().match_count, 1);
    }

    #[test]
    fn test_timestamped_target_splits_wire_stamps() {
        let (tx, rx) = unbounded_channel();
        let mut controller = SessionController::new();
        let target = sample_target().with_filters(StreamFilters {
            timestamps: true,
            ..StreamFilters::default()
        });
        controller.set_target(target);
        // swap the real session for a scripted one; the target's filters
        // already configured the buffer
        controller.session = Some(SessionHandle::detached(rx));

        tx.send(SessionEvent::Frame(
            "2024-01-15T10:30:00Z GET /healthz 200".to_string(),
        ))
        .unwrap();
        controller.pump();
        let record = controller.record_at(0).unwrap();
        assert_eq!(record.message, "GET /healthz 200");
        assert_eq!(record.timestamp.timestamp(), 1_705_314_600);
        controller.dispose();
    }

    #[test]
    fn test_retry_now_requires_permanent_failure() {
        let (mut controller, _tx) = scripted_controller();
        assert!(!controller.retry_now());

        controller.state = ConnectionState::PermanentlyFailed {
            reason: "three strikes".to_string(),
        };
        // no target recorded: still refuses
        assert!(!controller.retry_now());

        controller.target = Some(sample_target());
        let options = SessionOptions {
            max_attempts: 1,
            base_delay: Duration::from_millis(1),
        };
        controller.options = options;
        assert!(controller.retry_now());
        assert_eq!(controller.state(), &ConnectionState::Connecting);
        assert!(controller.session.is_some());
        controller.dispose();
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (mut controller, _tx) = scripted_controller();
        controller.target = Some(sample_target());
        controller.dispose();
        assert_eq!(controller.state(), &ConnectionState::Idle);
        assert!(controller.target().is_none());
        assert!(controller.session.is_none());
        controller.dispose();
        assert_eq!(controller.state(), &ConnectionState::Idle);
    }

    #[test]
    fn test_lifecycle_terminate_disposes() {
        let (mut controller, tx) = scripted_controller();
        tx.send(SessionEvent::Frame("keep".to_string())).unwrap();
        controller.pump();

        controller.handle_lifecycle(LifecycleEvent::Suspend);
        assert_eq!(controller.state(), &ConnectionState::Connecting);

        controller.handle_lifecycle(LifecycleEvent::Terminate);
        assert_eq!(controller.state(), &ConnectionState::Idle);
        assert!(controller.session.is_none());
        // records stay readable for the shutdown frame
        assert_eq!(controller.read_model().total_records, 1);
    }

    #[test]
    fn test_pinned_window_follows_pumped_frames() {
        let (mut controller, tx) = scripted_controller();
        controller.set_viewport(40, 5);
        for i in 0..20 {
            tx.send(SessionEvent::Frame(format!("row {i}"))).unwrap();
        }
        controller.pump();
        assert!(controller.window().is_pinned());
        assert_eq!(
            controller.window().scroll_top(),
            controller.window().max_scroll()
        );

        controller.window_mut().jump_to_top();
        for i in 20..40 {
            tx.send(SessionEvent::Frame(format!("row {i}"))).unwrap();
        }
        controller.pump();
        assert_eq!(controller.window().scroll_top(), 0);
    }
}
