use crate::buffer::LogBuffer;
use crate::record::LevelSet;
use rayon::prelude::*;

/// above this many candidates the scans go parallel
const PARALLEL_THRESHOLD: usize = 1000;

/// Direction for cyclic match navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchDirection {
    Next,
    Previous,
}

/// What the view has asked for: level membership, search term, and which
/// match the cursor sits on.
///
/// An empty level set shows every record (the default). The search term
/// never narrows the visible list; it selects matches within it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    pub active_levels: LevelSet,
    pub search_term: String,
    pub current_match: usize,
}

impl FilterState {
    /// cyclic step through `match_count` matches:
    /// `(index + direction + count) % count`, a no-op when there are none
    pub fn advance(&mut self, direction: MatchDirection, match_count: usize) -> Option<usize> {
        if match_count == 0 {
            return None;
        }
        self.current_match = match direction {
            MatchDirection::Next => (self.current_match + 1) % match_count,
            MatchDirection::Previous => (self.current_match + match_count - 1) % match_count,
        };
        Some(self.current_match)
    }

    /// keep the cursor meaningful after the match list was recomputed
    pub fn clamp_match(&mut self, match_count: usize) {
        if match_count == 0 {
            self.current_match = 0;
        } else if self.current_match >= match_count {
            self.current_match = match_count - 1;
        }
    }
}

/// Derived views over the buffer: the level-visible index list and the
/// match positions within it.
///
/// `visible` holds buffer indices in order; `matches` holds positions
/// *into `visible`* whose message contains the term case-insensitively.
/// Refreshes are incremental where the cheap paths apply: newly appended
/// records are scanned alone, and a term that extends the previous one
/// only narrows the previous matches. Level changes, evictions and buffer
/// clears force a full rebuild because positions shift.
#[derive(Debug, Default)]
pub struct SearchIndex {
    visible: Vec<usize>,
    matches: Vec<usize>,
    scanned: usize,
    indexed_levels: LevelSet,
    indexed_term: String,
    indexed_drop_epoch: u64,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// drop everything; the next refresh rebuilds from scratch
    pub fn reset(&mut self) {
        self.visible.clear();
        self.matches.clear();
        self.scanned = 0;
        self.indexed_levels = LevelSet::empty();
        self.indexed_term.clear();
        self.indexed_drop_epoch = 0;
    }

    /// bring the index in line with the buffer and the filter state
    pub fn refresh(&mut self, buffer: &LogBuffer, state: &FilterState) {
        let shifted = buffer.dropped() != self.indexed_drop_epoch || self.scanned > buffer.len();
        let levels_changed = state.active_levels != self.indexed_levels;

        if shifted || levels_changed {
            self.rebuild(buffer, state);
            return;
        }

        if buffer.len() > self.scanned {
            self.extend(buffer, state);
        }

        if state.search_term != self.indexed_term {
            self.rescan_matches(buffer, state);
        }
    }

    /// ordered buffer indices passing the level filter
    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    /// ordered positions into `visible()` whose message matches the term
    pub fn matches(&self) -> &[usize] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    fn rebuild(&mut self, buffer: &LogBuffer, state: &FilterState) {
        self.visible = compute_visible(buffer, state.active_levels, 0);
        self.matches = compute_matches(buffer, &self.visible, &state.search_term, 0);
        self.scanned = buffer.len();
        self.indexed_levels = state.active_levels;
        self.indexed_term = state.search_term.clone();
        self.indexed_drop_epoch = buffer.dropped();
    }

    /// scan only the records appended since the last refresh
    fn extend(&mut self, buffer: &LogBuffer, state: &FilterState) {
        let first_new_position = self.visible.len();
        let mut appended = compute_visible(buffer, state.active_levels, self.scanned);
        self.visible.append(&mut appended);
        let mut new_matches = compute_matches(
            buffer,
            &self.visible[first_new_position..],
            &state.search_term,
            first_new_position,
        );
        self.matches.append(&mut new_matches);
        self.scanned = buffer.len();
    }

    fn rescan_matches(&mut self, buffer: &LogBuffer, state: &FilterState) {
        let term = state.search_term.as_str();
        let extends_previous = !self.indexed_term.is_empty()
            && term.starts_with(&self.indexed_term)
            && !self.matches.is_empty();

        self.matches = if extends_previous {
            // anything matching the longer term matched the shorter one,
            // so the previous matches bound the search space
            let needle = term.to_lowercase();
            let candidates = std::mem::take(&mut self.matches);
            filter_positions(buffer, &self.visible, candidates, &needle)
        } else {
            compute_matches(buffer, &self.visible, term, 0)
        };
        self.indexed_term = term.to_string();
    }
}

/// buffer indices from `from` onward whose level is admitted
fn compute_visible(buffer: &LogBuffer, levels: LevelSet, from: usize) -> Vec<usize> {
    let total = buffer.len();
    if levels.is_empty() {
        // empty selection shows everything, same order as the snapshot
        return (from..total).collect();
    }
    let candidates: Vec<usize> = (from..total).collect();
    if candidates.len() > PARALLEL_THRESHOLD {
        candidates
            .into_par_iter()
            .filter(|&index| admits(buffer, levels, index))
            .collect()
    } else {
        candidates
            .into_iter()
            .filter(|&index| admits(buffer, levels, index))
            .collect()
    }
}

/// positions (offset by `base`) of `window` entries whose message contains
/// the term, case-insensitively; the term only ever searches messages
fn compute_matches(buffer: &LogBuffer, window: &[usize], term: &str, base: usize) -> Vec<usize> {
    if term.is_empty() {
        return Vec::new();
    }
    // lowercase the needle once, not per record
    let needle = term.to_lowercase();
    if window.len() > PARALLEL_THRESHOLD {
        window
            .par_iter()
            .enumerate()
            .filter(|&(_, &index)| contains(buffer, index, &needle))
            .map(|(offset, _)| base + offset)
            .collect()
    } else {
        window
            .iter()
            .enumerate()
            .filter(|&(_, &index)| contains(buffer, index, &needle))
            .map(|(offset, _)| base + offset)
            .collect()
    }
}

/// narrow existing match positions to those still matching the needle
fn filter_positions(
    buffer: &LogBuffer,
    visible: &[usize],
    candidates: Vec<usize>,
    needle: &str,
) -> Vec<usize> {
    let keep = |position: &usize| {
        visible
            .get(*position)
            .is_some_and(|&index| contains(buffer, index, needle))
    };
    if candidates.len() > PARALLEL_THRESHOLD {
        candidates.into_par_iter().filter(keep).collect()
    } else {
        candidates.into_iter().filter(keep).collect()
    }
}

fn admits(buffer: &LogBuffer, levels: LevelSet, index: usize) -> bool {
    buffer
        .get(index)
        .is_some_and(|record| levels.admits(record.level))
}

fn contains(buffer: &LogBuffer, index: usize, needle: &str) -> bool {
    buffer
        .get(index)
        .is_some_and(|record| record.message.to_lowercase().contains(needle))
}
