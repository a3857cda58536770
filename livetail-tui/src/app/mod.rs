use crate::{app_block::AppBlock, status_bar::DisplayEvent, theme, ui_logger::UiLogger};
use anyhow::{Result, anyhow};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, MouseEvent},
    execute,
};
use livetail_core::{
    ChannelTarget, LifecycleEvent, LifecycleSignal, NoSignals, SessionController, SessionOptions,
};
use ratatui::{Terminal, backend::CrosstermBackend, prelude::*, widgets::Widget};
use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

mod events;
mod render;

// constants
const DEFAULT_EVENT_POLL_INTERVAL_MS: u64 = 16;
const HELP_POPUP_WIDTH: u16 = 62;
const DEBUG_PANE_HEIGHT: u16 = 6;
const DISPLAY_EVENT_DURATION_MS: u64 = 800;
const TIMESTAMP_GUTTER_WIDTH: u16 = 9; // "HH:MM:SS "

#[derive(Clone)]
pub struct AppDesc {
    pub event_poll_interval: Duration,
    pub show_debug_logs: bool,
    pub max_records: usize,
    pub initial_search: Option<String>,
    pub session: SessionOptions,
}

impl AppDesc {
    pub fn new() -> Self {
        Self {
            event_poll_interval: Duration::from_millis(DEFAULT_EVENT_POLL_INTERVAL_MS),
            show_debug_logs: false,
            max_records: 0,
            initial_search: None,
            session: SessionOptions::default(),
        }
    }
}

impl Default for AppDesc {
    fn default() -> Self {
        Self::new()
    }
}

/// Start the application attached to a log stream target
pub fn start_with_target(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    target: ChannelTarget,
    desc: AppDesc,
) -> Result<()> {
    start_with_signals(terminal, target, desc, Box::new(NoSignals))
}

/// Start the application with an external lifecycle signal source
pub fn start_with_signals(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    target: ChannelTarget,
    desc: AppDesc,
    lifecycle: Box<dyn LifecycleSignal>,
) -> Result<()> {
    color_eyre::install().or(Err(anyhow!("Error installing color_eyre")))?;

    let app = App::new(target, lifecycle, desc.clone());
    app.run(terminal, &desc)
}

struct App {
    is_exiting: bool,
    controller: SessionController,
    base_target: ChannelTarget, // rebuilt with new filters when timestamps toggle
    lifecycle: Box<dyn LifecycleSignal>,
    show_timestamps: bool,
    search_input: String, // current search input text (includes leading '/')
    search_focused: bool, // whether the search input is focused
    pending_jump: bool,   // first 'g' of a gg chord was pressed
    debug_logs: Arc<Mutex<Vec<String>>>, // debug log messages for UI display
    hard_focused_block_id: uuid::Uuid, // set by clicking, persists until another click
    logs_block: AppBlock,
    debug_block: AppBlock,
    last_logs_area: Option<Rect>, // last rendered areas, for routing mouse events
    last_debug_area: Option<Rect>,
    mouse_capture_enabled: bool, // disable to allow terminal-native text selection
    show_debug_logs: bool,
    show_help_popup: bool,
    display_event: Option<DisplayEvent>, // temporary event to display in footer
}

// ============================================================================
// Initialization
// ============================================================================
impl App {
    fn setup_logger() -> Arc<Mutex<Vec<String>>> {
        let debug_logs = Arc::new(Mutex::new(Vec::new()));
        let logger = Box::new(UiLogger::new(debug_logs.clone()));

        if log::set_logger(Box::leak(logger)).is_ok() {
            log::set_max_level(log::LevelFilter::Debug);
        }

        debug_logs
    }

    fn new(target: ChannelTarget, lifecycle: Box<dyn LifecycleSignal>, desc: AppDesc) -> Self {
        let debug_logs = Self::setup_logger();

        let show_timestamps = target.filters().timestamps;

        let mut controller = SessionController::with_options(desc.session, desc.max_records);
        controller.set_target(target.clone());

        let initial_search_input = desc
            .initial_search
            .as_ref()
            .map(|value| value.trim_start_matches('/'))
            .filter(|value| !value.is_empty())
            .map(|value| format!("/{}", value))
            .unwrap_or_default();

        if initial_search_input.len() > 1 {
            controller.set_search_term(initial_search_input[1..].to_string());
        }

        let logs_block = AppBlock::new().set_title("Logs");
        let debug_block = AppBlock::new()
            .set_title("Debug Logs")
            .set_padding(ratatui::widgets::Padding::horizontal(1));

        let logs_block_id = logs_block.id();

        Self {
            is_exiting: false,
            controller,
            base_target: target,
            lifecycle,
            show_timestamps,
            search_input: initial_search_input,
            search_focused: false,
            pending_jump: false,
            debug_logs,
            hard_focused_block_id: logs_block_id,
            logs_block,
            debug_block,
            last_logs_area: None,
            last_debug_area: None,
            mouse_capture_enabled: true,
            show_debug_logs: desc.show_debug_logs,
            show_help_popup: false,
            display_event: None,
        }
    }
}

// ============================================================================
// Lifecycle
// ============================================================================
impl App {
    fn run(
        mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        desc: &AppDesc,
    ) -> Result<()> {
        let event_poll_interval = desc.event_poll_interval;

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| -> Result<()> {
            while !self.is_exiting {
                self.poll_event(event_poll_interval)?;
                self.controller.pump();
                self.poll_lifecycle();
                self.check_and_clear_expired_event();
                terminal.draw(|frame| frame.render_widget(&mut self, frame.area()))?;
            }
            Ok(())
        }));

        // tear down the session before returning
        self.cleanup();

        match result {
            Ok(r) => r,
            Err(_) => {
                eprintln!("Application panicked, terminal restored");
                std::process::exit(1);
            }
        }
    }

    fn cleanup(&mut self) {
        log::debug!("Closing session before exit");
        self.controller.dispose();
    }

    fn poll_event(&mut self, poll_interval: Duration) -> Result<()> {
        if event::poll(poll_interval)? {
            let event = event::read()?;
            match event {
                Event::Key(key) => self.handle_key(key)?,
                Event::Mouse(mouse) => {
                    if self.mouse_capture_enabled {
                        self.handle_mouse_event(&mouse);
                    }
                }
                Event::Resize(width, height) => {
                    log::debug!("Terminal resized to {}x{}", width, height);
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn poll_lifecycle(&mut self) {
        if let Some(event) = self.lifecycle.poll_event() {
            log::debug!("Lifecycle event: {:?}", event);
            if event == LifecycleEvent::Terminate {
                self.is_exiting = true;
            }
            self.controller.handle_lifecycle(event);
        }
    }
}

// ============================================================================
// Search management
// ============================================================================
impl App {
    fn search_query(&self) -> &str {
        // search_input includes the leading '/', so skip it
        if self.search_input.starts_with('/') && self.search_input.len() > 1 {
            &self.search_input[1..]
        } else {
            ""
        }
    }

    fn apply_search(&mut self) {
        let query = self.search_query().to_string();
        self.controller.set_search_term(query);
    }
}

// ============================================================================
// Focus management
// ============================================================================
impl App {
    fn set_hard_focused_block(&mut self, block_id: uuid::Uuid) {
        self.hard_focused_block_id = block_id;
    }

    fn get_display_focused_block(&self) -> uuid::Uuid {
        self.hard_focused_block_id
    }

    fn is_log_block_focused(&self) -> bool {
        // the logs block also takes focus while the debug pane is hidden
        !self.show_debug_logs || self.get_display_focused_block() == self.logs_block.id()
    }

    fn set_mouse_capture(&mut self, enable: bool) -> Result<()> {
        if self.mouse_capture_enabled == enable {
            return Ok(());
        }

        let mut stdout = io::stdout();
        if enable {
            execute!(stdout, EnableMouseCapture)?;
        } else {
            execute!(stdout, DisableMouseCapture)?;
        }

        self.mouse_capture_enabled = enable;
        Ok(())
    }

    fn is_mouse_in_area(&self, mouse: &MouseEvent, area: Rect) -> bool {
        mouse.column >= area.x
            && mouse.column < area.x + area.width
            && mouse.row >= area.y
            && mouse.row < area.y + area.height
    }

    fn get_block_under_mouse(&self, mouse: &MouseEvent) -> Option<uuid::Uuid> {
        if let Some(area) = self.last_logs_area
            && self.is_mouse_in_area(mouse, area)
        {
            return Some(self.logs_block.id());
        }

        if self.show_debug_logs
            && let Some(area) = self.last_debug_area
            && self.is_mouse_in_area(mouse, area)
        {
            return Some(self.debug_block.id());
        }

        None
    }
}

// ============================================================================
// Display events
// ============================================================================
impl App {
    /// Set a display event to show in the footer for a given duration
    fn set_display_event(&mut self, text: String, duration: Duration, style: Option<Style>) {
        self.display_event = Some(DisplayEvent::create(
            text,
            duration,
            style,
            theme::DISPLAY_EVENT_STYLE,
        ));
    }

    /// Check if the current display event has expired and clear it if so
    fn check_and_clear_expired_event(&mut self) {
        self.display_event = DisplayEvent::check_and_clear(self.display_event.take());
    }
}

// ============================================================================
// Widget implementation
// ============================================================================
impl Widget for &mut App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let (logs_area, debug_area, footer_area) = if self.show_debug_logs {
            let [logs_area, debug_area, footer_area] = Layout::vertical([
                Constraint::Fill(1),
                Constraint::Length(DEBUG_PANE_HEIGHT),
                Constraint::Length(1),
            ])
            .areas(area);
            (logs_area, Some(debug_area), footer_area)
        } else {
            let [logs_area, footer_area] =
                Layout::vertical([Constraint::Fill(1), Constraint::Length(1)]).areas(area);
            (logs_area, None, footer_area)
        };

        self.render_logs(logs_area, buf);
        if let Some(debug_area) = debug_area {
            self.render_debug_logs(debug_area, buf);
        }
        self.render_footer(footer_area, buf);

        // render help popup on top if visible
        if self.show_help_popup {
            self.render_help_popup(area, buf);
        }
    }
}
