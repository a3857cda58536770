use super::{App, DISPLAY_EVENT_DURATION_MS};
use anyhow::Result;
use arboard::Clipboard;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use itertools::Itertools;
use livetail_core::{LevelSet, LogLevel, MatchDirection};
use std::time::Duration;

impl App {
    pub(super) fn handle_mouse_event(&mut self, mouse: &MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollDown => {
                if let Some(block_id) = self.get_block_under_mouse(mouse) {
                    self.scroll_block(block_id, true);
                }
            }
            MouseEventKind::ScrollUp => {
                if let Some(block_id) = self.get_block_under_mouse(mouse) {
                    self.scroll_block(block_id, false);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                if let Some(block_id) = self.get_block_under_mouse(mouse) {
                    self.set_hard_focused_block(block_id);
                }
            }
            _ => {}
        }
    }

    fn scroll_block(&mut self, block_id: uuid::Uuid, down: bool) {
        if block_id == self.debug_block.id() {
            self.scroll_debug_logs(down);
        } else {
            self.controller
                .window_mut()
                .scroll_by(if down { 1 } else { -1 });
        }
    }

    fn scroll_focused_block(&mut self, down: bool) {
        if self.show_debug_logs && self.get_display_focused_block() == self.debug_block.id() {
            self.scroll_debug_logs(down);
        } else {
            self.controller
                .window_mut()
                .scroll_by(if down { 1 } else { -1 });
        }
    }

    fn scroll_debug_logs(&mut self, down: bool) {
        let lines = self.debug_block.get_lines_count();
        let position = self.debug_block.get_scroll_position();
        let next = if down {
            (position + 1).min(lines.saturating_sub(1))
        } else {
            position.saturating_sub(1)
        };
        self.debug_block.set_scroll_position(next);
    }

    pub(super) fn yank_current_match(&mut self) -> Result<()> {
        let Some(record) = self.controller.current_match_record() else {
            log::debug!("No search match to yank");
            return Ok(());
        };
        let content = record.wire_text().to_string();

        let mut clipboard = Clipboard::new()?;
        clipboard.set_text(&content)?;

        log::debug!("Copied {} chars to clipboard", content.len());

        self.set_display_event(
            "Current match copied to clipboard".to_string(),
            Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
            None, // use default style
        );

        Ok(())
    }

    fn toggle_level_key(&mut self, key: char) {
        let level = match key {
            '1' => LogLevel::Info,
            '2' => LogLevel::Success,
            '3' => LogLevel::Warning,
            '4' => LogLevel::Error,
            _ => LogLevel::Unknown,
        };
        self.controller.toggle_level(level);

        let message = {
            let levels = &self.controller.filter().active_levels;
            if levels.is_empty() {
                "Level filter cleared - showing all levels".to_string()
            } else {
                format!("Levels: {}", levels.iter().map(|l| l.as_str()).join(", "))
            }
        };
        self.set_display_event(
            message,
            Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
            None,
        );
    }

    fn toggle_timestamps(&mut self) {
        let mut filters = *self.base_target.filters();
        filters.timestamps = !filters.timestamps;
        self.show_timestamps = filters.timestamps;

        // server-side timestamps change the wire text, so the whole stream restarts
        let target = self.base_target.with_filters(filters);
        self.base_target = target.clone();
        self.controller.set_target(target);

        let message = if self.show_timestamps {
            "Timestamps on - stream restarted"
        } else {
            "Timestamps off - stream restarted"
        };
        self.set_display_event(
            message.to_string(),
            Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
            None,
        );
    }

    pub(super) fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.kind != KeyEventKind::Press {
            return Ok(());
        }

        // help popup mode has higher priority
        if self.show_help_popup {
            match key.code {
                KeyCode::Char('?') | KeyCode::Esc => {
                    self.show_help_popup = false;
                    return Ok(());
                }
                KeyCode::Char('q') => {
                    // let 'q' fall through to quit the program
                }
                _ => return Ok(()), // ignore other keys when help popup is open
            }
        }

        // handle search input mode when focused
        if !self.search_input.is_empty() && self.search_focused {
            match key.code {
                KeyCode::Esc => {
                    // unfocus and clear the search
                    self.search_focused = false;
                    self.search_input.clear();
                    self.apply_search();
                    return Ok(());
                }
                KeyCode::Char(c) => {
                    self.search_input.push(c);
                    self.apply_search();
                    return Ok(());
                }
                KeyCode::Backspace => {
                    self.search_input.pop();
                    // if the user deleted the '/', clear the search and unfocus
                    if self.search_input.is_empty() {
                        self.search_focused = false;
                    }
                    self.apply_search();
                    return Ok(());
                }
                KeyCode::Enter => {
                    // unfocus the search input, keep the term active
                    self.search_focused = false;
                    // if only a '/' is left, clear the search
                    if self.search_input.len() == 1 {
                        self.search_input.clear();
                        self.apply_search();
                    }
                    return Ok(());
                }
                _ => {}
            }
        }

        // a pending 'g' only survives into an immediate second 'g'
        if self.pending_jump && key.code != KeyCode::Char('g') {
            self.pending_jump = false;
        }

        match key.code {
            KeyCode::Char('q') => {
                // always quit, regardless of search state or other modes
                log::debug!("Quit key pressed");
                self.is_exiting = true;
                Ok(())
            }
            KeyCode::Esc => {
                // if a search is active but not focused, clear it; Esc never quits
                if !self.search_input.is_empty() && !self.search_focused {
                    self.search_input.clear();
                    self.apply_search();
                }
                Ok(())
            }
            KeyCode::Char('c') => {
                if key.modifiers.contains(KeyModifiers::CONTROL) {
                    self.is_exiting = true;
                } else {
                    self.controller.clear();
                    self.set_display_event(
                        "Logs cleared".to_string(),
                        Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
                        None,
                    );
                }
                Ok(())
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let step = self.controller.window().half_page();
                self.controller.window_mut().scroll_by(step);
                Ok(())
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let step = self.controller.window().half_page();
                self.controller.window_mut().scroll_by(-step);
                Ok(())
            }
            KeyCode::Char('j') | KeyCode::Down => {
                self.scroll_focused_block(true);
                Ok(())
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.scroll_focused_block(false);
                Ok(())
            }
            KeyCode::Char('g') => {
                if self.pending_jump {
                    self.pending_jump = false;
                    self.controller.window_mut().jump_to_top();
                } else {
                    self.pending_jump = true;
                }
                Ok(())
            }
            KeyCode::Char('G') => {
                self.controller.window_mut().jump_to_bottom();
                Ok(())
            }
            KeyCode::Char('/') => {
                self.search_input = "/".to_string();
                self.search_focused = true;
                self.apply_search();
                Ok(())
            }
            KeyCode::Char('n') => {
                self.controller.advance_match(MatchDirection::Next);
                Ok(())
            }
            KeyCode::Char('N') => {
                self.controller.advance_match(MatchDirection::Previous);
                Ok(())
            }
            KeyCode::Char(c @ '1'..='5') => {
                self.toggle_level_key(c);
                Ok(())
            }
            KeyCode::Char('0') => {
                self.controller.set_active_levels(LevelSet::empty());
                self.set_display_event(
                    "Showing all levels".to_string(),
                    Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
                    None,
                );
                Ok(())
            }
            KeyCode::Char('t') => {
                self.toggle_timestamps();
                Ok(())
            }
            KeyCode::Char('r') => {
                if self.controller.retry_now() {
                    self.set_display_event(
                        "Reconnecting".to_string(),
                        Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
                        None,
                    );
                } else {
                    log::debug!("Retry ignored: connection is not in a failed state");
                }
                Ok(())
            }
            KeyCode::Char('y') => {
                if let Err(e) = self.yank_current_match() {
                    log::debug!("Failed to yank match: {}", e);
                }
                Ok(())
            }
            KeyCode::Char('m') => {
                let enable = !self.mouse_capture_enabled;
                self.set_mouse_capture(enable)?;
                let message = if enable {
                    "Mouse capture on"
                } else {
                    "Mouse capture off - terminal text selection available"
                };
                self.set_display_event(
                    message.to_string(),
                    Duration::from_millis(DISPLAY_EVENT_DURATION_MS),
                    None,
                );
                Ok(())
            }
            KeyCode::Char('b') => {
                self.show_debug_logs = !self.show_debug_logs;
                log::debug!("Debug logs visibility toggled: {}", self.show_debug_logs);
                Ok(())
            }
            KeyCode::Char('?') => {
                self.show_help_popup = !self.show_help_popup;
                Ok(())
            }
            _ => Ok(()),
        }
    }
}
