use std::time::Duration;

use crate::session::{Phase, SessionState};
use crate::whitelist::SkipMask;

/// Standard word length for WPM purposes
pub const CHARS_PER_WORD: f64 = 5.0;

/// Everything the host needs to redraw after a keystroke or tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snapshot {
    pub phase: Phase,
    pub cursor: usize,
    pub text_len: usize,
    pub correct_chars: u32,
    pub error_chars: u32,
    pub total_keystrokes: u32,
    pub last_keystroke_correct: bool,
    pub elapsed: Duration,
    pub accuracy: u32,
    pub wpm: u32,
    pub progress_percent: f64,
}

impl Snapshot {
    pub fn compute(
        phase: Phase,
        state: &SessionState,
        text_len: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            phase,
            cursor: state.cursor,
            text_len,
            correct_chars: state.correct_chars,
            error_chars: state.error_chars,
            total_keystrokes: state.total_keystrokes,
            last_keystroke_correct: state.last_keystroke_correct,
            elapsed,
            accuracy: accuracy(state.correct_chars, state.total_keystrokes),
            wpm: wpm(state.correct_chars, elapsed),
            progress_percent: progress_percent(state.cursor, text_len),
        }
    }
}

pub fn accuracy(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

pub fn wpm(correct: u32, elapsed: Duration) -> u32 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0;
    }
    ((correct as f64 / CHARS_PER_WORD) / (secs / 60.0)).round() as u32
}

pub fn progress_percent(cursor: usize, text_len: usize) -> f64 {
    if text_len == 0 {
        return 0.0;
    }
    cursor as f64 / text_len as f64 * 100.0
}

/// `MM:SS.s`, minutes zero-padded to two digits
pub fn format_elapsed(elapsed: Duration) -> String {
    let tenths = elapsed.as_millis() / 100;
    let minutes = tenths / 600;
    let rest = tenths % 600;
    format!("{:02}:{:02}.{}", minutes, rest / 10, rest % 10)
}

/// How a single reference char should be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    TypedPlain,
    TypedWhitelisted,
    CurrentCorrect,
    CurrentError,
    Upcoming,
}

pub fn classify(idx: usize, cursor: usize, mask: &SkipMask, last_correct: bool) -> CharClass {
    use std::cmp::Ordering::*;

    match idx.cmp(&cursor) {
        Less if mask.is_skipped(idx) => CharClass::TypedWhitelisted,
        Less => CharClass::TypedPlain,
        Equal if last_correct => CharClass::CurrentCorrect,
        Equal => CharClass::CurrentError,
        Greater => CharClass::Upcoming,
    }
}
