use crate::buffer::LogBuffer;
use crate::record::LogRecord;
use std::collections::HashMap;
use unicode_width::UnicodeWidthStr;

/// rows materialized beyond each viewport edge
pub const DEFAULT_OVERSCAN: u16 = 8;
/// distance from the bottom, in rows, that still counts as "at bottom"
const FOLLOW_THRESHOLD: u64 = 2;

/// Measured wrapped heights by record sequence, with a display-width
/// estimate for rows the host has not materialized yet.
///
/// Estimates and measurements are both functions of the viewport width,
/// so the owner flushes the cache whenever the width changes (and
/// wholesale on target change or clear, since sequences restart).
#[derive(Debug, Default)]
pub struct RowHeightCache {
    measured: HashMap<u64, u16>,
}

impl RowHeightCache {
    /// monospace heuristic: ceil(display width / columns) per embedded
    /// line segment, each segment at least one row
    pub fn estimate(message: &str, width: u16) -> u16 {
        if width == 0 {
            return 1;
        }
        let width = width as u64;
        let rows: u64 = message
            .split('\n')
            .map(|segment| {
                let cells = UnicodeWidthStr::width(segment) as u64;
                cells.max(1).div_ceil(width)
            })
            .sum();
        rows.clamp(1, u16::MAX as u64) as u16
    }

    /// measured height when the host reported one, the estimate otherwise
    pub fn height(&self, record: &LogRecord, width: u16) -> u16 {
        self.measured
            .get(&record.sequence)
            .copied()
            .unwrap_or_else(|| Self::estimate(&record.message, width))
    }

    pub fn insert_measured(&mut self, sequence: u64, rows: u16) {
        self.measured.insert(sequence, rows.max(1));
    }

    pub fn clear(&mut self) {
        self.measured.clear();
    }
}

/// Contiguous run of visible positions the host should materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WindowPlan {
    /// first visible position to materialize
    pub start: usize,
    /// one past the last position to materialize
    pub end: usize,
    /// row offset of `start` within the whole content
    pub top_offset: u64,
    /// total content height in rows; drives the scrollbar
    pub total_height: u64,
}

/// Scroll geometry over the visible list.
///
/// Keeps cumulative row offsets built from the height cache, decides the
/// materialization window (viewport plus overscan on both ends), and owns
/// the pin-to-bottom rule: appends only follow the tail while the
/// viewport bottom sits within [`FOLLOW_THRESHOLD`] of the content
/// bottom, and every user scroll recomputes that flag.
#[derive(Debug)]
pub struct LogWindow {
    heights: RowHeightCache,
    /// offsets[p] = first row of visible position p
    offsets: Vec<u64>,
    total: u64,
    scroll_top: u64,
    viewport_cols: u16,
    viewport_rows: u16,
    pinned: bool,
    overscan: u16,
    synced_drop_epoch: u64,
}

impl LogWindow {
    pub fn new() -> Self {
        Self::with_overscan(DEFAULT_OVERSCAN)
    }

    pub fn with_overscan(overscan: u16) -> Self {
        Self {
            heights: RowHeightCache::default(),
            offsets: Vec::new(),
            total: 0,
            scroll_top: 0,
            viewport_cols: 0,
            viewport_rows: 0,
            pinned: true,
            overscan,
            synced_drop_epoch: 0,
        }
    }

    /// forget everything; the next sync starts from scratch, pinned
    pub fn reset(&mut self) {
        self.heights.clear();
        self.offsets.clear();
        self.total = 0;
        self.scroll_top = 0;
        self.pinned = true;
        self.synced_drop_epoch = 0;
    }

    /// returns true when the size actually changed; a width change
    /// invalidates every height
    pub fn set_viewport(&mut self, cols: u16, rows: u16) -> bool {
        let mut changed = false;
        if cols != self.viewport_cols {
            self.viewport_cols = cols;
            self.heights.clear();
            self.offsets.clear();
            changed = true;
        }
        if rows != self.viewport_rows {
            self.viewport_rows = rows;
            changed = true;
        }
        changed
    }

    /// bring offsets in line with the visible list: cheap extension for
    /// appended positions, full rebuild when positions shifted
    pub fn sync(&mut self, buffer: &LogBuffer, visible: &[usize]) {
        let shifted = buffer.dropped() != self.synced_drop_epoch
            || visible.len() < self.offsets.len()
            || self.offsets.is_empty();
        if shifted {
            self.rebuild(buffer, visible);
        } else if visible.len() > self.offsets.len() {
            self.extend(buffer, visible);
        }
    }

    /// recompute every offset; the view stays anchored to its distance
    /// from the bottom so evictions do not make the content jump
    pub fn rebuild(&mut self, buffer: &LogBuffer, visible: &[usize]) {
        let bottom_distance = self.total.saturating_sub(self.scroll_top);
        self.offsets.clear();
        self.offsets.reserve(visible.len());
        let mut offset = 0u64;
        for &index in visible {
            self.offsets.push(offset);
            offset += self.row_height(buffer, index);
        }
        self.total = offset;
        self.synced_drop_epoch = buffer.dropped();
        if self.pinned {
            self.scroll_top = self.max_scroll();
        } else {
            self.scroll_top = self
                .total
                .saturating_sub(bottom_distance)
                .min(self.max_scroll());
        }
    }

    /// append offsets for new tail positions; `scroll_top` stays put so a
    /// burst of records never moves a reader who scrolled away
    fn extend(&mut self, buffer: &LogBuffer, visible: &[usize]) {
        for &index in &visible[self.offsets.len()..] {
            self.offsets.push(self.total);
            self.total += self.row_height(buffer, index);
        }
    }

    fn row_height(&self, buffer: &LogBuffer, index: usize) -> u64 {
        buffer
            .get(index)
            .map(|record| self.heights.height(record, self.viewport_cols) as u64)
            .unwrap_or(1)
    }

    /// The host measured a row it materialized. Replaces the estimate and
    /// recomputes the offsets of everything after it; returns true when
    /// any offset moved. Measurements above the viewport shift
    /// `scroll_top` along so the content on screen stays put.
    pub fn record_measured(
        &mut self,
        buffer: &LogBuffer,
        visible: &[usize],
        position: usize,
        rows: u16,
    ) -> bool {
        let Some(&index) = visible.get(position) else {
            return false;
        };
        let Some(record) = buffer.get(index) else {
            return false;
        };
        let old = self.heights.height(record, self.viewport_cols);
        let rows = rows.max(1);
        self.heights.insert_measured(record.sequence, rows);
        if old == rows {
            return false;
        }

        let delta = rows as i64 - old as i64;
        for p in position + 1..self.offsets.len() {
            self.offsets[p] = add_delta(self.offsets[p], delta);
        }
        self.total = add_delta(self.total, delta);

        if self.pinned {
            self.scroll_top = self.max_scroll();
        } else if self.offsets.get(position).copied().unwrap_or(0) + (old as u64) <= self.scroll_top
        {
            // the row sits entirely above the view
            self.scroll_top = add_delta(self.scroll_top, delta).min(self.max_scroll());
        }
        true
    }

    /// minimal contiguous range covering the viewport, padded by the
    /// overscan margin on both ends
    pub fn plan(&self) -> WindowPlan {
        if self.offsets.is_empty() {
            return WindowPlan::default();
        }
        let viewport_bottom = self.scroll_top + self.viewport_rows as u64;
        // last position starting at or above scroll_top
        let start = self
            .offsets
            .partition_point(|&offset| offset <= self.scroll_top)
            .saturating_sub(1);
        // first position starting at or below the viewport bottom edge
        let end = self
            .offsets
            .partition_point(|&offset| offset < viewport_bottom);
        let start = start.saturating_sub(self.overscan as usize);
        let end = (end + self.overscan as usize).min(self.offsets.len());
        WindowPlan {
            start,
            end,
            top_offset: self.offsets[start],
            total_height: self.total,
        }
    }

    // ------------------------------------------------------------------
    // scrolling
    // ------------------------------------------------------------------

    pub fn scroll_top(&self) -> u64 {
        self.scroll_top
    }

    pub fn total_height(&self) -> u64 {
        self.total
    }

    pub fn viewport_rows(&self) -> u16 {
        self.viewport_rows
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn max_scroll(&self) -> u64 {
        self.total.saturating_sub(self.viewport_rows as u64)
    }

    /// user scroll to an absolute row; recomputes the pin flag
    pub fn scroll_to(&mut self, top: u64) {
        self.scroll_top = top.min(self.max_scroll());
        self.update_pinned();
    }

    pub fn scroll_by(&mut self, delta: i64) {
        let target = add_delta(self.scroll_top, delta);
        self.scroll_to(target);
    }

    pub fn half_page(&self) -> i64 {
        (self.viewport_rows / 2).max(1) as i64
    }

    pub fn jump_to_top(&mut self) {
        self.scroll_to(0);
    }

    /// jumping to the bottom re-enables following
    pub fn jump_to_bottom(&mut self) {
        self.scroll_to(self.max_scroll());
    }

    /// center a visible position in the viewport (match navigation)
    pub fn scroll_to_position(&mut self, position: usize) {
        let Some(&offset) = self.offsets.get(position) else {
            return;
        };
        let centered = offset.saturating_sub(self.viewport_rows as u64 / 2);
        self.scroll_to(centered);
    }

    /// appended content pulls the view down only while pinned
    pub fn follow_if_pinned(&mut self) {
        if self.pinned {
            self.scroll_top = self.max_scroll();
        }
    }

    fn update_pinned(&mut self) {
        self.pinned = self.max_scroll().saturating_sub(self.scroll_top) <= FOLLOW_THRESHOLD;
    }
}

impl Default for LogWindow {
    fn default() -> Self {
        Self::new()
    }
}

fn add_delta(value: u64, delta: i64) -> u64 {
    if delta >= 0 {
        value.saturating_add(delta as u64)
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}
