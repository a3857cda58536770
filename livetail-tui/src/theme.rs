use livetail_core::{ConnectionState, LogLevel};
use ratatui::{prelude::*, style::Color};

pub const TEXT_FG_COLOR: Color = Color::Gray;

pub const BORDER_COLOR: Color = Color::Gray;

pub const INFO_STYLE: Style = Style::new().fg(Color::White);

pub const SUCCESS_STYLE: Style = Style::new().fg(Color::LightGreen);

pub const WARN_STYLE: Style = Style::new().fg(Color::LightYellow);

pub const ERROR_STYLE: Style = Style::new().fg(Color::LightRed);

pub const UNKNOWN_STYLE: Style = Style::new().fg(Color::Gray);

pub const DEBUG_STYLE: Style = Style::new().fg(Color::LightGreen);

pub const TIMESTAMP_STYLE: Style = Style::new().fg(Color::DarkGray);

/// row background for the match the cursor currently sits on
pub const CURRENT_MATCH_STYLE: Style = Style::new().bg(Color::DarkGray);

pub const DISPLAY_EVENT_STYLE: Style = Style::new()
    .fg(Color::Black)
    .bg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const SEARCH_FOCUS_STYLE: Style = Style::new().bg(Color::DarkGray);

pub fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::White,
        LogLevel::Success => Color::LightGreen,
        LogLevel::Warning => Color::LightYellow,
        LogLevel::Error => Color::LightRed,
        LogLevel::Unknown => Color::Gray,
    }
}

pub fn level_style(level: LogLevel) -> Style {
    match level {
        LogLevel::Info => INFO_STYLE,
        LogLevel::Success => SUCCESS_STYLE,
        LogLevel::Warning => WARN_STYLE,
        LogLevel::Error => ERROR_STYLE,
        LogLevel::Unknown => UNKNOWN_STYLE,
    }
}

pub fn state_color(state: &ConnectionState) -> Color {
    match state {
        ConnectionState::Idle => Color::Gray,
        ConnectionState::Connecting => Color::LightBlue,
        ConnectionState::Connected => Color::LightGreen,
        ConnectionState::Retrying { .. } => Color::LightYellow,
        ConnectionState::PermanentlyFailed { .. } => Color::LightRed,
    }
}
