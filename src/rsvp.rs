// Word timing index for the RSVP display
// Maps a narration playback position to the word being spoken

use serde::{Deserialize, Serialize};

/// A transcript word aligned to the narration timeline.
///
/// Timings arrive from the backend ordered by `start_ms`, non-overlapping,
/// covering the narration from start to finish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordTiming {
    pub word: String,
    pub start_ms: u64,
    pub end_ms: u64,
}

/// The word to display for a given playback position, with the derived
/// values the reading view renders (position in the script, percent read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWord<'a> {
    pub timing: &'a WordTiming,
    pub index: usize,
    pub progress_percent: u32,
}

/// Resolve the word active at `position_ms`.
///
/// Returns the last word whose `start_ms` has passed, so a silent gap
/// between two words keeps showing the earlier one instead of going blank.
/// Before the first word starts, the first word is shown (pre-roll) rather
/// than nothing. Empty timing lists resolve to `None`.
///
/// Runs on every engine position tick, so lookup is a binary search on the
/// sorted `start_ms` column.
pub fn resolve_active_word(timings: &[WordTiming], position_ms: u64) -> Option<ActiveWord<'_>> {
    if timings.is_empty() {
        return None;
    }

    let started = timings.partition_point(|t| t.start_ms <= position_ms);
    // started == 0 is the pre-roll case; clamp onto the first word.
    let index = started.saturating_sub(1);

    let progress_percent = (index as f64 / timings.len() as f64 * 100.0).round() as u32;

    Some(ActiveWord {
        timing: &timings[index],
        index,
        progress_percent,
    })
}

/// Index of the optimal recognition point within a displayed word: the
/// character the reader's eye fixates on. Chosen by word length, counted
/// in chars so multi-byte scripts don't split a code point.
pub fn orp_index(word: &str) -> usize {
    let len = word.chars().count();
    match len {
        0 | 1 => 0,
        2..=5 => len / 2 - 1,
        6..=9 => 2,
        10..=13 => 3,
        _ => 4,
    }
}

/// Parse the backend's JSON-encoded word timings.
///
/// The wire format is `[{"word": "...", "startMs": 0, "endMs": 300}, ...]`.
/// Malformed or missing payloads degrade to an empty list — the reading view
/// simply shows no highlighting — and must never block playback. Entries are
/// re-sorted by start and empty words dropped, since alignment services
/// occasionally emit artifacts.
pub fn parse_word_timings(raw: Option<&str>) -> Vec<WordTiming> {
    let raw = match raw {
        Some(r) if !r.trim().is_empty() => r,
        _ => return Vec::new(),
    };

    let mut timings: Vec<WordTiming> = match serde_json::from_str(raw) {
        Ok(t) => t,
        Err(e) => {
            log::warn!("[Rsvp] Ignoring malformed word timings: {}", e);
            return Vec::new();
        }
    };

    timings.retain(|t| !t.word.is_empty());
    timings.sort_by_key(|t| t.start_ms);
    timings
}
