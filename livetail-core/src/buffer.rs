use crate::normalize::normalize_frame;
use crate::record::{LevelCounts, LogRecord};
use std::collections::VecDeque;

/// Append-only store for one streaming session.
///
/// Sequences are assigned here, at ingestion: monotonic from zero,
/// strictly increasing and gapless. Buffer index `i` always corresponds to
/// sequence `dropped() + i`, so evicting old records never renumbers the
/// ones that remain. `clear` starts a fresh epoch with sequences back at
/// zero.
#[derive(Debug)]
pub struct LogBuffer {
    records: VecDeque<LogRecord>,
    next_sequence: u64,
    dropped: u64,
    max_records: Option<usize>,
    counts: LevelCounts,
    wire_timestamps: bool,
}

impl LogBuffer {
    /// unbounded buffer; memory is the session's to spend
    pub fn new() -> Self {
        Self {
            records: VecDeque::new(),
            next_sequence: 0,
            dropped: 0,
            max_records: None,
            counts: LevelCounts::default(),
            wire_timestamps: false,
        }
    }

    /// buffer that evicts its oldest records beyond `max` entries
    pub fn with_max_records(max: usize) -> Self {
        let mut buffer = Self::new();
        buffer.max_records = (max > 0).then_some(max);
        buffer
    }

    /// whether the channel asked the server to prefix plain lines with a
    /// timestamp; set from the target's filters before frames arrive
    pub fn set_wire_timestamps(&mut self, enabled: bool) {
        self.wire_timestamps = enabled;
    }

    /// normalize one wire frame, assign it the next sequence and append
    /// it; returns the assigned sequence
    pub fn ingest(&mut self, frame: &str) -> u64 {
        let sequence = self.next_sequence;
        let record = normalize_frame(frame, sequence, self.wire_timestamps);
        self.next_sequence += 1;
        self.counts.add(record.level);
        self.records.push_back(record);
        if let Some(max) = self.max_records {
            while self.records.len() > max {
                if let Some(evicted) = self.records.pop_front() {
                    self.dropped += 1;
                    self.counts.remove(evicted.level);
                    log::debug!("buffer full, evicted sequence {}", evicted.sequence);
                }
            }
        }
        sequence
    }

    /// the live record list, in append order == sequence order
    pub fn snapshot(&self) -> &VecDeque<LogRecord> {
        &self.records
    }

    pub fn get(&self, index: usize) -> Option<&LogRecord> {
        self.records.get(index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// how many records were evicted in this epoch; downstream index caches
    /// use this to notice that positions shifted
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn level_counts(&self) -> LevelCounts {
        self.counts
    }

    /// discard everything and start a new sequence epoch
    pub fn clear(&mut self) {
        self.records.clear();
        self.next_sequence = 0;
        self.dropped = 0;
        self.counts.clear();
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}
