use super::{App, HELP_POPUP_WIDTH, TIMESTAMP_GUTTER_WIDTH};
use crate::{app_block::AppBlock, content_line_maker, status_bar::{StatusBar, StatusGravity, StatusStyle}, theme};
use livetail_core::{ConnectionState, LogLevel};
use ratatui::{
    prelude::*,
    widgets::{Paragraph, StatefulWidget, Widget},
};
use std::time::Instant;

/// helper function to highlight search matches in text
/// splits text into spans, applying bold & underlined style to matching parts
fn create_highlighted_line(text: &str, search_term: &str, base_style: Style) -> Line<'static> {
    if search_term.is_empty() {
        return Line::styled(text.to_string(), base_style);
    }

    let text_lower = text.to_lowercase();
    let term_lower = search_term.to_lowercase();

    // byte offsets found in the lowercased text only line up with the original
    // when lowercasing preserved lengths; otherwise skip highlighting
    if text_lower.len() != text.len() {
        return Line::styled(text.to_string(), base_style);
    }

    let mut spans = Vec::new();
    let mut last_pos = 0;

    while let Some(match_pos) = text_lower[last_pos..].find(&term_lower) {
        let absolute_pos = last_pos + match_pos;
        let match_end = absolute_pos + term_lower.len();

        let Some(head) = text.get(last_pos..absolute_pos) else {
            break;
        };
        let Some(matched) = text.get(absolute_pos..match_end) else {
            break;
        };

        if !head.is_empty() {
            spans.push(Span::styled(head.to_string(), base_style));
        }
        spans.push(Span::styled(
            matched.to_string(),
            base_style.add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        ));

        last_pos = match_end;
    }

    // add remaining text after the last match
    if last_pos < text.len() {
        spans.push(Span::styled(text[last_pos..].to_string(), base_style));
    }

    Line::from(spans)
}

fn connection_status_text(state: &ConnectionState) -> String {
    match state {
        ConnectionState::Idle => "idle".to_string(),
        ConnectionState::Connecting => "connecting...".to_string(),
        ConnectionState::Connected => "connected".to_string(),
        ConnectionState::Retrying {
            attempt,
            next_attempt_at,
        } => {
            let wait = next_attempt_at.saturating_duration_since(Instant::now());
            format!("reconnecting in {}s (attempt {})", wait.as_secs(), attempt)
        }
        ConnectionState::PermanentlyFailed { reason } => {
            let short: String = reason.chars().take(48).collect();
            format!("failed: {} - press r to retry", short)
        }
    }
}

impl App {
    pub(super) fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let model = self.controller.read_model();

        // determine middle text (help hint, search input, or display event)
        let (mid_text, custom_style) = if let Some(event) = &self.display_event {
            (event.text.clone(), Some(event.style))
        } else if !self.search_input.is_empty() {
            (self.search_input.clone(), None)
        } else {
            ("?: help | q: quit".to_string(), None)
        };

        let mut status_bar = StatusBar::new().add_status(
            StatusGravity::Left,
            connection_status_text(&model.connection),
            StatusStyle::new().fg(theme::state_color(&model.connection)),
        );

        // per-level counts, colored like the rows they describe; a '*' marks
        // levels currently admitted by the filter
        let active_levels = &self.controller.filter().active_levels;
        for level in LogLevel::ALL {
            let count = model.level_counts.get(level);
            if count == 0 {
                continue;
            }
            let marker = if active_levels.contains(level) { "*" } else { "" };
            status_bar = status_bar.add_status(
                StatusGravity::Left,
                format!("{}{} {}", marker, level.as_str(), count),
                StatusStyle::new().fg(theme::level_color(level)),
            );
        }

        if model.dropped_records > 0 {
            status_bar = status_bar.add_status_plain(
                StatusGravity::Left,
                &format!("{} evicted", model.dropped_records),
            );
        }

        status_bar = status_bar.add_status(StatusGravity::Mid, mid_text, StatusStyle::new());

        if model.match_count > 0 {
            status_bar = status_bar.add_status_plain(
                StatusGravity::Right,
                &format!("match {}/{}", model.current_match + 1, model.match_count),
            );
        }
        if self.controller.window().is_pinned() {
            status_bar = status_bar.add_status_plain(StatusGravity::Right, "following");
        }
        status_bar = status_bar
            .add_status_plain(StatusGravity::Right, &format!("v{}", env!("CARGO_PKG_VERSION")));

        if let Some(style) = custom_style {
            status_bar = status_bar.set_style(style);
        } else if self.search_focused {
            status_bar = status_bar.set_style(theme::SEARCH_FOCUS_STYLE);
        }

        status_bar.render(area, buf);
    }

    pub(super) fn render_help_popup(&self, area: Rect, buf: &mut Buffer) {
        use ratatui::widgets::{Block, Borders, Clear};

        let help_text = vec![
            Line::from("Navigation:".bold()),
            Line::from("  j/k/↑/↓   - Scroll one row"),
            Line::from("  Ctrl+d/u  - Scroll half a page"),
            Line::from("  gg / G    - Jump to top / bottom (G re-enables follow)"),
            Line::from(""),
            Line::from("Search & filter:".bold()),
            Line::from("  /         - Search message text (Enter keeps, Esc clears)"),
            Line::from("  n / N     - Next / previous match"),
            Line::from("  1-5       - Toggle info/success/warning/error/unknown"),
            Line::from("  0         - Show all levels"),
            Line::from(""),
            Line::from("Session:".bold()),
            Line::from("  r         - Retry a failed connection"),
            Line::from("  t         - Toggle server timestamps (restarts stream)"),
            Line::from("  c         - Clear buffered logs"),
            Line::from(""),
            Line::from("Misc:".bold()),
            Line::from("  y         - Copy current match to clipboard"),
            Line::from("  m         - Toggle mouse capture"),
            Line::from("  b         - Toggle debug logs pane"),
            Line::from("  q         - Quit"),
        ];

        // calculate popup height: content lines + 2 for borders
        let popup_height = help_text.len() as u16 + 2;

        // center the popup
        let popup_area = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(popup_height),
            Constraint::Fill(1),
        ])
        .split(area)[1];

        let popup_area = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(HELP_POPUP_WIDTH),
            Constraint::Fill(1),
        ])
        .split(popup_area)[1];

        // clear the area first
        Clear.render(popup_area, buf);

        let block = Block::default()
            .title("Help")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme::TEXT_FG_COLOR));

        Paragraph::new(help_text)
            .block(block)
            .fg(theme::TEXT_FG_COLOR)
            .render(popup_area, buf);
    }

    pub(super) fn render_logs(&mut self, area: Rect, buf: &mut Buffer) {
        self.last_logs_area = Some(area);

        let [content_area, scrollbar_area] = Layout::horizontal([
            Constraint::Fill(1),   // main content takes most space
            Constraint::Length(1), // scrollbar is 1 character wide
        ])
        .margin(0)
        .areas(area);

        let is_focused = self.is_log_block_focused();

        let model = self.controller.read_model();
        let mut title = if model.visible_records == model.total_records {
            format!("Logs - {}", model.total_records)
        } else {
            format!("Logs - {} of {}", model.visible_records, model.total_records)
        };
        if self.controller.window().is_pinned() {
            title += " - Following";
        }
        self.logs_block.update_title(title);

        let inner_area = self.logs_block.get_content_rect(content_area, is_focused);
        let gutter_width = if self.show_timestamps {
            TIMESTAMP_GUTTER_WIDTH
        } else {
            0
        };
        let text_width = inner_area.width.saturating_sub(gutter_width);

        if text_width == 0 || inner_area.height == 0 {
            self.logs_block.build(is_focused).render(content_area, buf);
            return;
        }

        self.controller.set_viewport(text_width, inner_area.height);

        // measured heights replace estimates; a second pass settles the plan
        // when a measurement shifted the layout under the viewport
        for _ in 0..2 {
            let plan = self.controller.window().plan();
            let mut layout_moved = false;
            for position in plan.start..plan.end {
                let rows = match self.controller.record_at(position) {
                    Some(record) => content_line_maker::wrapped_rows(&record.message, text_width),
                    None => continue,
                };
                layout_moved |= self.controller.record_measured(position, rows);
            }
            if !layout_moved {
                break;
            }
        }

        let plan = self.controller.window().plan();
        let scroll_top = self.controller.window().scroll_top();
        let skip = scroll_top
            .saturating_sub(plan.top_offset)
            .min(u16::MAX as u64) as u16;

        let term = self.controller.filter().search_term.clone();
        let current = self.controller.current_match_position();

        let mut content_lines: Vec<Line> = Vec::new();
        for position in plan.start..plan.end {
            let (message, level, stamp) = match self.controller.record_at(position) {
                Some(record) => (
                    record.message.clone(),
                    record.level,
                    record.timestamp.format("%H:%M:%S").to_string(),
                ),
                None => continue,
            };

            let level_style = theme::level_style(level);
            let base_style = if current == Some(position) {
                level_style.patch(theme::CURRENT_MATCH_STYLE)
            } else {
                level_style
            };

            let wrapped = content_line_maker::wrap_content(&message, text_width);
            for (row, segment) in wrapped.iter().enumerate() {
                let mut line = create_highlighted_line(segment, &term, base_style);
                if gutter_width > 0 {
                    let cell = if row == 0 {
                        format!("{} ", stamp)
                    } else {
                        " ".repeat(gutter_width as usize)
                    };
                    line.spans.insert(0, Span::styled(cell, theme::TIMESTAMP_STYLE));
                }
                content_lines.push(line);
            }
        }

        if model.total_records == 0 {
            content_lines.push(Line::from("waiting for logs...".italic()));
        }

        let block = self.logs_block.build(is_focused);
        Paragraph::new(content_lines)
            .block(block)
            .fg(theme::TEXT_FG_COLOR)
            .scroll((skip, 0))
            .render(content_area, buf);

        // the scrollbar tracks virtual rows and stops when the bottom row is flush
        let content_length = self.controller.window().max_scroll().min(usize::MAX as u64) as usize;
        let position = scroll_top.min(usize::MAX as u64) as usize;
        self.logs_block.set_lines_count(content_length);
        self.logs_block.update_scrollbar_state(content_length, Some(position));

        let scrollbar = AppBlock::create_scrollbar(is_focused);
        StatefulWidget::render(
            scrollbar,
            scrollbar_area,
            buf,
            self.logs_block.get_scrollbar_state(),
        );
    }

    pub(super) fn render_debug_logs(&mut self, area: Rect, buf: &mut Buffer) {
        self.last_debug_area = Some(area);

        let is_focused = self.get_display_focused_block() == self.debug_block.id();

        // generate content for the debug logs block
        let debug_lines: Vec<Line> = if let Ok(logs) = self.debug_logs.lock() {
            if logs.is_empty() {
                vec![Line::from("No debug logs...".italic())]
            } else {
                logs.iter()
                    .rev() // show most recent first
                    .map(|entry| {
                        let entry_upper = entry.to_uppercase();
                        let style = if entry_upper.contains("ERROR") {
                            theme::ERROR_STYLE
                        } else if entry_upper.contains("WARN") {
                            theme::WARN_STYLE
                        } else if entry_upper.contains("DEBUG") {
                            theme::DEBUG_STYLE
                        } else {
                            theme::INFO_STYLE
                        };
                        Line::styled(entry.clone(), style)
                    })
                    .collect()
            }
        } else {
            vec![Line::from("Failed to read debug logs...".italic())]
        };

        let [content_area, scrollbar_area] = Layout::horizontal([
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .margin(0)
        .areas(area);

        let lines_count = debug_lines.len();
        self.debug_block.set_lines_count(lines_count);
        let scroll_position = self
            .debug_block
            .get_scroll_position()
            .min(lines_count.saturating_sub(1));
        self.debug_block.set_scroll_position(scroll_position);
        self.debug_block
            .update_scrollbar_state(lines_count, Some(scroll_position));

        let block = self.debug_block.build(is_focused);
        Paragraph::new(debug_lines)
            .block(block)
            .fg(theme::TEXT_FG_COLOR)
            .scroll((scroll_position as u16, 0))
            .render(content_area, buf);

        let scrollbar = AppBlock::create_scrollbar(is_focused);
        StatefulWidget::render(
            scrollbar,
            scrollbar_area,
            buf,
            self.debug_block.get_scrollbar_state(),
        );
    }
}
