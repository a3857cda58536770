use chrono::{DateTime, Utc};

/// Severity taxonomy of the platform's structured log frames.
///
/// Wire values are lowercase (`"info"`, `"success"`, `"warning"`,
/// `"error"`). Free-form frames and unrecognized values map to
/// [`LogLevel::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Unknown,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Info,
        LogLevel::Success,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Unknown,
    ];

    /// parse a wire level, case-insensitively; `warn` is accepted as an
    /// alias for `warning`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "info" => LogLevel::Info,
            "success" => LogLevel::Success,
            "warning" | "warn" => LogLevel::Warning,
            "error" => LogLevel::Error,
            _ => LogLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Unknown => "unknown",
        }
    }

    fn index(self) -> usize {
        match self {
            LogLevel::Info => 0,
            LogLevel::Success => 1,
            LogLevel::Warning => 2,
            LogLevel::Error => 3,
            LogLevel::Unknown => 4,
        }
    }
}

/// Set of levels a view keeps visible.
///
/// The empty set is the default and means "no restriction": every level is
/// admitted. `admits` encodes that rule so callers never special-case it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelSet(u8);

impl LevelSet {
    pub const fn empty() -> Self {
        LevelSet(0)
    }

    pub fn of(levels: &[LogLevel]) -> Self {
        let mut set = LevelSet::empty();
        for level in levels {
            set.insert(*level);
        }
        set
    }

    pub fn insert(&mut self, level: LogLevel) {
        self.0 |= 1 << level.index();
    }

    pub fn remove(&mut self, level: LogLevel) {
        self.0 &= !(1 << level.index());
    }

    pub fn toggle(&mut self, level: LogLevel) {
        self.0 ^= 1 << level.index();
    }

    pub fn contains(&self, level: LogLevel) -> bool {
        self.0 & (1 << level.index()) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// whether a record of this level passes the filter; an empty set
    /// admits everything
    pub fn admits(&self, level: LogLevel) -> bool {
        self.is_empty() || self.contains(level)
    }

    pub fn iter(&self) -> impl Iterator<Item = LogLevel> + '_ {
        LogLevel::ALL.into_iter().filter(|level| self.contains(*level))
    }
}

/// Running per-level totals for a whole buffer, updated O(1) on
/// append and eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LevelCounts([u64; 5]);

impl LevelCounts {
    pub fn add(&mut self, level: LogLevel) {
        self.0[level.index()] += 1;
    }

    pub fn remove(&mut self, level: LogLevel) {
        let slot = &mut self.0[level.index()];
        *slot = slot.saturating_sub(1);
    }

    pub fn get(&self, level: LogLevel) -> u64 {
        self.0[level.index()]
    }

    pub fn total(&self) -> u64 {
        self.0.iter().sum()
    }

    pub fn clear(&mut self) {
        self.0 = [0; 5];
    }

    pub fn iter(&self) -> impl Iterator<Item = (LogLevel, u64)> + '_ {
        LogLevel::ALL.into_iter().map(|level| (level, self.get(level)))
    }
}

/// One normalized log record.
///
/// `sequence` is assigned by the buffer at ingestion and is unique,
/// strictly increasing and gapless within a buffer epoch. `timestamp` is
/// display-only: ordering always comes from `sequence`. `raw` keeps the
/// wire frame whenever it differs from the rendered message.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub sequence: u64,
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub raw: Option<String>,
}

impl LogRecord {
    pub fn new(sequence: u64, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            sequence,
            level,
            message: message.into(),
            timestamp: Utc::now(),
            raw: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// the original frame text when it was kept, the message otherwise
    pub fn wire_text(&self) -> &str {
        self.raw.as_deref().unwrap_or(&self.message)
    }
}
