//! The practice-session state machine.
//!
//! A session moves `Idle -> Ready -> Active -> Complete`. `retry` goes back to
//! `Ready` on the same text, `reset` (or Escape) back to `Idle`. Whitelisted
//! spans are skipped automatically, so whenever the session waits for input
//! the cursor sits on a char that has to be typed, or at the end of the text.

use std::time::{Duration, SystemTime};

use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::feedback::{ErrorSound, Feedback};
use crate::input::Key;
use crate::metrics::{classify, CharClass, Snapshot};
use crate::runtime::RefreshTimer;
use crate::text::ReferenceText;
use crate::whitelist::{compute_mask, SkipMask, Whitelist};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    /// No reference text loaded
    Idle,
    /// Text loaded, clock not started
    Ready,
    /// Clock started by the first keystroke
    Active,
    /// Cursor reached the end of the text
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub cursor: usize,
    pub correct_chars: u32,
    pub error_chars: u32,
    pub total_keystrokes: u32,
    pub started_at: Option<SystemTime>,
    pub finished_at: Option<SystemTime>,
    pub running: bool,
    pub last_keystroke_correct: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            cursor: 0,
            correct_chars: 0,
            error_chars: 0,
            total_keystrokes: 0,
            started_at: None,
            finished_at: None,
            running: false,
            last_keystroke_correct: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Correct,
    Incorrect,
    /// Escape: the session was reset
    Cancelled,
    /// No state change (wrong phase, deletion, non-typing key)
    Ignored,
}

/// Result of one keystroke: what happened, whether the phase changed, and
/// the fresh snapshot to render.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    pub outcome: KeyOutcome,
    pub transition: Option<Phase>,
    pub snapshot: Snapshot,
}

#[derive(Debug)]
pub struct PracticeSession<C: Clock = SystemClock, F: Feedback = ErrorSound> {
    clock: C,
    feedback: F,
    text: ReferenceText,
    whitelist: Whitelist,
    mask: SkipMask,
    state: SessionState,
    phase: Phase,
    timer: RefreshTimer,
}

impl PracticeSession {
    pub fn new(sound: ErrorSound) -> Self {
        Self::with_parts(SystemClock, sound)
    }
}

impl<C: Clock, F: Feedback> PracticeSession<C, F> {
    pub fn with_parts(clock: C, feedback: F) -> Self {
        Self {
            clock,
            feedback,
            text: ReferenceText::default(),
            whitelist: Whitelist::default(),
            mask: SkipMask::default(),
            state: SessionState::default(),
            phase: Phase::Idle,
            timer: RefreshTimer::default(),
        }
    }

    /// Load `raw` text with the given whitelist and get ready for typing.
    ///
    /// Blank text leaves the session untouched and returns `None`.
    pub fn start<I, S>(&mut self, raw: &str, whitelist_tokens: I) -> Option<Snapshot>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Some(text) = ReferenceText::parse(raw) else {
            debug!("start ignored: no text");
            return None;
        };

        self.whitelist = Whitelist::configure(whitelist_tokens);
        self.mask = compute_mask(text.chars(), &self.whitelist);
        self.text = text;

        info!(
            chars = self.text.len(),
            tokens = self.whitelist.len(),
            whitelisted = self.mask.as_slice().iter().filter(|m| **m).count(),
            "practice session started"
        );

        Some(self.begin_run())
    }

    /// Start over on the same text and whitelist.
    pub fn retry(&mut self) -> Option<Snapshot> {
        if self.phase == Phase::Idle {
            return None;
        }

        info!("practice session restarted");
        Some(self.begin_run())
    }

    /// Drop the text and all counters.
    pub fn reset(&mut self) {
        self.timer.cancel();
        self.text = ReferenceText::default();
        self.whitelist = Whitelist::default();
        self.mask = SkipMask::default();
        self.state = SessionState::default();
        self.phase = Phase::Idle;
        info!("practice session reset");
    }

    pub fn handle_keystroke(&mut self, key: Key) -> Update {
        let before = self.phase;
        let outcome = self.apply_key(key);
        let transition = (self.phase != before).then_some(self.phase);

        if let Some(phase) = transition {
            debug!(from = %before, to = %phase, "phase changed");
        }

        Update {
            outcome,
            transition,
            snapshot: self.snapshot(),
        }
    }

    /// Periodic refresh. Only reads the clock.
    pub fn on_tick(&self) -> Option<Snapshot> {
        self.timer.is_armed().then(|| self.snapshot())
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::compute(self.phase, &self.state, self.text.len(), self.elapsed())
    }

    pub fn elapsed(&self) -> Duration {
        let Some(started_at) = self.state.started_at else {
            return Duration::ZERO;
        };
        let until = self.state.finished_at.unwrap_or_else(|| self.clock.now());
        until.duration_since(started_at).unwrap_or_default()
    }

    /// Render classes for every char of the text
    pub fn classes(&self) -> Vec<CharClass> {
        (0..self.text.len())
            .map(|idx| {
                classify(
                    idx,
                    self.state.cursor,
                    &self.mask,
                    self.state.last_keystroke_correct,
                )
            })
            .collect()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn text(&self) -> &ReferenceText {
        &self.text
    }

    pub fn whitelist(&self) -> &Whitelist {
        &self.whitelist
    }

    pub fn mask(&self) -> &SkipMask {
        &self.mask
    }

    pub fn timer(&self) -> &RefreshTimer {
        &self.timer
    }

    fn begin_run(&mut self) -> Snapshot {
        self.timer.cancel();
        self.state = SessionState {
            cursor: self.whitelist.skip_from(self.text.chars(), 0),
            ..SessionState::default()
        };

        if self.state.cursor >= self.text.len() {
            // nothing left to type once the whitelist is skipped
            self.phase = Phase::Complete;
        } else {
            self.state.running = true;
            self.phase = Phase::Ready;
            self.timer.arm();
        }

        self.snapshot()
    }

    fn apply_key(&mut self, key: Key) -> KeyOutcome {
        if key == Key::Escape {
            self.reset();
            return KeyOutcome::Cancelled;
        }

        if !self.state.running || self.text.is_empty() {
            return KeyOutcome::Ignored;
        }

        // typing is append-only
        if matches!(key, Key::Backspace | Key::Delete) {
            return KeyOutcome::Ignored;
        }

        let Some(typed) = key.typed_char() else {
            return KeyOutcome::Ignored;
        };

        self.state.total_keystrokes += 1;
        if self.state.started_at.is_none() {
            self.state.started_at = Some(self.clock.now());
            self.phase = Phase::Active;
        }

        self.state.cursor = self.whitelist.skip_from(self.text.chars(), self.state.cursor);

        let outcome = match self.text.get(self.state.cursor) {
            Some(expected) if expected == typed => {
                self.state.correct_chars += 1;
                self.state.last_keystroke_correct = true;
                self.state.cursor = self
                    .whitelist
                    .skip_from(self.text.chars(), self.state.cursor + 1);
                KeyOutcome::Correct
            }
            expected => {
                self.state.error_chars += 1;
                self.state.last_keystroke_correct = false;
                debug!(?expected, ?typed, cursor = self.state.cursor, "mistyped");
                if let Err(e) = self.feedback.signal_error() {
                    debug!("error feedback failed: {e}");
                }
                KeyOutcome::Incorrect
            }
        };

        if self.state.cursor >= self.text.len() {
            self.finish();
        }

        outcome
    }

    fn finish(&mut self) {
        self.state.running = false;
        self.state.finished_at = Some(self.clock.now());
        self.phase = Phase::Complete;
        self.timer.cancel();

        let snapshot = self.snapshot();
        info!(
            wpm = snapshot.wpm,
            accuracy = snapshot.accuracy,
            keystrokes = snapshot.total_keystrokes,
            "practice session complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::feedback::RecordingFeedback;
    use assert_matches::assert_matches;

    type TestSession = PracticeSession<ManualClock, RecordingFeedback>;

    fn session() -> (TestSession, ManualClock, RecordingFeedback) {
        let clock = ManualClock::new();
        let feedback = RecordingFeedback::new();
        let session = PracticeSession::with_parts(clock.clone(), feedback.clone());
        (session, clock, feedback)
    }

    fn type_str(session: &mut TestSession, s: &str) -> Vec<Update> {
        s.chars()
            .map(|c| {
                let key = if c == '\n' { Key::Enter } else { Key::Char(c) };
                session.handle_keystroke(key)
            })
            .collect()
    }

    #[test]
    fn new_session_is_idle() {
        let (session, _, _) = session();
        assert_eq!(session.phase(), Phase::Idle);
        assert!(!session.timer().is_armed());
        assert_eq!(session.on_tick(), None);
        assert_eq!(session.snapshot().accuracy, 0);
    }

    #[test]
    fn start_with_blank_text_is_noop() {
        let (mut session, _, _) = session();
        assert_eq!(session.start("   \n ", ["[KW]"]), None);
        assert_eq!(session.phase(), Phase::Idle);
        assert!(session.whitelist().is_empty());
    }

    #[test]
    fn plain_text_completes() {
        let (mut session, _, _) = session();
        session.start("cat", Vec::<String>::new()).unwrap();
        assert_eq!(session.phase(), Phase::Ready);

        let updates = type_str(&mut session, "cat");
        assert!(updates.iter().all(|u| u.outcome == KeyOutcome::Correct));

        let snap = session.snapshot();
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(snap.cursor, 3);
        assert_eq!(snap.correct_chars, 3);
        assert_eq!(snap.error_chars, 0);
        assert_eq!(snap.total_keystrokes, 3);
        assert_eq!(snap.accuracy, 100);
        assert_eq!(snap.progress_percent, 100.0);
    }

    #[test]
    fn leading_whitelist_is_skipped_on_start() {
        let (mut session, _, _) = session();
        let snap = session.start("[KW]cat", ["[KW]"]).unwrap();
        assert_eq!(snap.cursor, 4);
        assert_eq!(snap.total_keystrokes, 0);

        type_str(&mut session, "cat");
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.state().total_keystrokes, 3);
    }

    #[test]
    fn mismatch_then_match() {
        let (mut session, _, feedback) = session();
        session.start("dog", Vec::<String>::new()).unwrap();

        let update = session.handle_keystroke(Key::Char('x'));
        assert_eq!(update.outcome, KeyOutcome::Incorrect);
        assert_eq!(update.snapshot.cursor, 0);
        assert_eq!(update.snapshot.error_chars, 1);
        assert_eq!(update.snapshot.correct_chars, 0);
        assert_eq!(update.snapshot.total_keystrokes, 1);
        assert!(!update.snapshot.last_keystroke_correct);
        assert_eq!(feedback.count(), 1);

        let update = session.handle_keystroke(Key::Char('d'));
        assert_eq!(update.outcome, KeyOutcome::Correct);
        assert_eq!(update.snapshot.cursor, 1);
        assert_eq!(update.snapshot.correct_chars, 1);
        assert_eq!(update.snapshot.total_keystrokes, 2);
        assert_eq!(update.snapshot.accuracy, 50);
        assert!(update.snapshot.last_keystroke_correct);
    }

    #[test]
    fn adjacent_whitelist_spans_skip_together() {
        let (mut session, _, _) = session();
        let snap = session.start("[A][B]x", ["[A]", "[B]"]).unwrap();
        assert_eq!(snap.cursor, 6);

        let update = session.handle_keystroke(Key::Char('x'));
        assert_eq!(update.outcome, KeyOutcome::Correct);
        assert_eq!(update.transition, Some(Phase::Complete));
        assert_eq!(session.state().total_keystrokes, 1);
    }

    #[test]
    fn interior_whitelist_spans_skip_after_advance() {
        let (mut session, _, _) = session();
        session.start("a[A][B]b[A]", ["[A]", "[B]"]).unwrap();

        let update = session.handle_keystroke(Key::Char('a'));
        assert_eq!(update.snapshot.cursor, 7);

        let update = session.handle_keystroke(Key::Char('b'));
        // trailing token skipped straight to the end
        assert_eq!(update.snapshot.cursor, 11);
        assert_eq!(update.transition, Some(Phase::Complete));
    }

    #[test]
    fn cursor_never_rests_on_whitelisted_char() {
        let text = "[KW] alpha [TOPIC][KW]beta\n[KW]gamma [TOPIC]";
        let whitelist = ["[KW]", "[TOPIC]"];
        let (mut session, _, _) = session();
        session.start(text, whitelist).unwrap();

        let chars: Vec<char> = session.text().chars().to_vec();
        while session.phase() != Phase::Complete {
            let cursor = session.state().cursor;
            assert!(!session.mask().is_skipped(cursor), "cursor {cursor} on whitelist");
            let c = chars[cursor];
            let key = if c == '\n' { Key::Enter } else { Key::Char(c) };
            assert_eq!(session.handle_keystroke(key).outcome, KeyOutcome::Correct);
        }

        assert_eq!(session.state().cursor, chars.len());
        assert_eq!(session.state().error_chars, 0);
    }

    #[test]
    fn enter_matches_newline() {
        let (mut session, _, _) = session();
        session.start("a\r\nb", Vec::<String>::new()).unwrap();
        type_str(&mut session, "a\nb");
        assert_eq!(session.phase(), Phase::Complete);
        assert_eq!(session.state().correct_chars, 3);
    }

    #[test]
    fn deletion_and_navigation_keys_change_nothing() {
        let (mut session, _, _) = session();
        session.start("ab", Vec::<String>::new()).unwrap();
        session.handle_keystroke(Key::Char('a'));
        let before = session.state().clone();

        for key in [Key::Backspace, Key::Delete, Key::Other, Key::Char('\u{1b}')] {
            let update = session.handle_keystroke(key);
            assert_eq!(update.outcome, KeyOutcome::Ignored);
            assert_eq!(update.transition, None);
        }

        assert_eq!(session.state(), &before);
    }

    #[test]
    fn first_keystroke_starts_clock() {
        let (mut session, clock, _) = session();
        session.start("hello", Vec::<String>::new()).unwrap();
        assert_eq!(session.state().started_at, None);

        clock.advance(Duration::from_secs(10));
        session.handle_keystroke(Key::Other);
        assert_eq!(session.phase(), Phase::Ready);

        let update = session.handle_keystroke(Key::Char('z'));
        assert_eq!(update.transition, Some(Phase::Active));
        assert_eq!(session.state().started_at, Some(clock.now()));
        assert_eq!(session.elapsed(), Duration::ZERO);
    }

    #[test]
    fn wpm_follows_manual_clock() {
        let (mut session, clock, _) = session();
        session.start("abcdefghij", Vec::<String>::new()).unwrap();

        session.handle_keystroke(Key::Char('a'));
        clock.advance(Duration::from_secs(6));
        type_str(&mut session, "bcdefghij");

        // 10 correct chars = 2 words in 0.1 minutes
        let snap = session.snapshot();
        assert_eq!(snap.elapsed, Duration::from_secs(6));
        assert_eq!(snap.wpm, 20);
    }

    #[test]
    fn elapsed_freezes_on_completion() {
        let (mut session, clock, _) = session();
        session.start("ab", Vec::<String>::new()).unwrap();
        session.handle_keystroke(Key::Char('a'));
        clock.advance(Duration::from_secs(3));
        session.handle_keystroke(Key::Char('b'));

        clock.advance(Duration::from_secs(60));
        assert_eq!(session.elapsed(), Duration::from_secs(3));
    }

    #[test]
    fn tick_never_mutates_counters() {
        let (mut session, clock, _) = session();
        session.start("abc", Vec::<String>::new()).unwrap();
        session.handle_keystroke(Key::Char('a'));
        let before = session.state().clone();

        clock.advance(Duration::from_millis(250));
        let snap = session.on_tick().unwrap();

        assert_eq!(session.state(), &before);
        assert_eq!(snap.elapsed, Duration::from_millis(250));
    }

    #[test]
    fn timer_armed_while_running_only() {
        let (mut session, _, _) = session();
        session.start("ab", Vec::<String>::new()).unwrap();
        assert!(session.timer().is_armed());
        assert_eq!(session.timer().generation(), 1);

        type_str(&mut session, "ab");
        assert!(!session.timer().is_armed());
        assert_eq!(session.on_tick(), None);

        session.retry().unwrap();
        assert!(session.timer().is_armed());
        assert_eq!(session.timer().generation(), 2);

        session.reset();
        assert!(!session.timer().is_armed());
    }

    #[test]
    fn restarting_mid_run_keeps_a_single_timer() {
        let (mut session, _, _) = session();
        session.start("abc", Vec::<String>::new()).unwrap();
        session.start("xyz", Vec::<String>::new()).unwrap();
        session.retry().unwrap();

        assert!(session.timer().is_armed());
        assert_eq!(session.timer().generation(), 3);
    }

    #[test]
    fn retry_keeps_text_and_resets_counters() {
        let (mut session, clock, _) = session();
        session.start("[KW]go", ["[KW]"]).unwrap();
        type_str(&mut session, "xgo");
        assert_eq!(session.phase(), Phase::Complete);

        clock.advance(Duration::from_secs(1));
        let snap = session.retry().unwrap();

        assert_eq!(session.phase(), Phase::Ready);
        assert_eq!(snap.cursor, 4);
        assert_eq!(snap.total_keystrokes, 0);
        assert_eq!(snap.error_chars, 0);
        assert_eq!(session.state().started_at, None);
        assert!(snap.last_keystroke_correct);
        assert_eq!(session.text().to_string(), "[KW]go");
        assert_eq!(session.mask().spans(), vec![(0, 4)]);
    }

    #[test]
    fn retry_from_idle_is_noop() {
        let (mut session, _, _) = session();
        assert_eq!(session.retry(), None);
        assert_eq!(session.phase(), Phase::Idle);
    }

    #[test]
    fn escape_resets_to_idle() {
        let (mut session, _, _) = session();
        session.start("hello", ["[KW]"]).unwrap();
        session.handle_keystroke(Key::Char('h'));

        let update = session.handle_keystroke(Key::Escape);
        assert_eq!(update.outcome, KeyOutcome::Cancelled);
        assert_eq!(update.transition, Some(Phase::Idle));
        assert!(session.text().is_empty());
        assert!(session.mask().is_empty());
        assert_eq!(session.state(), &SessionState::default());
        assert!(!session.timer().is_armed());
    }

    #[test]
    fn keys_ignored_when_idle_or_complete() {
        let (mut session, _, _) = session();
        assert_matches!(
            session.handle_keystroke(Key::Char('a')),
            Update {
                outcome: KeyOutcome::Ignored,
                transition: None,
                ..
            }
        );

        session.start("a", Vec::<String>::new()).unwrap();
        session.handle_keystroke(Key::Char('a'));
        assert_eq!(session.phase(), Phase::Complete);

        let update = session.handle_keystroke(Key::Char('a'));
        assert_eq!(update.outcome, KeyOutcome::Ignored);
        assert_eq!(session.state().total_keystrokes, 1);
    }

    #[test]
    fn feedback_failure_is_swallowed() {
        let clock = ManualClock::new();
        let feedback = RecordingFeedback::failing();
        let mut session = PracticeSession::with_parts(clock, feedback.clone());
        session.start("a", Vec::<String>::new()).unwrap();

        let update = session.handle_keystroke(Key::Char('b'));
        assert_eq!(update.outcome, KeyOutcome::Incorrect);
        assert_eq!(feedback.count(), 1);
        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn fully_whitelisted_text_completes_immediately() {
        let (mut session, _, _) = session();
        let snap = session.start("[KW][KW]", ["[KW]"]).unwrap();

        assert_eq!(snap.phase, Phase::Complete);
        assert_eq!(snap.cursor, 8);
        assert!(!session.timer().is_armed());
        assert_eq!(
            session.handle_keystroke(Key::Char('x')).outcome,
            KeyOutcome::Ignored
        );
    }

    #[test]
    fn token_overflowing_text_is_typed_normally() {
        let (mut session, _, _) = session();
        let snap = session.start("ab[K", ["[KW]"]).unwrap();
        assert_eq!(snap.cursor, 0);
        assert!(session.mask().spans().is_empty());

        type_str(&mut session, "ab[K");
        assert_eq!(session.phase(), Phase::Complete);
    }

    #[test]
    fn classes_follow_cursor_and_mask() {
        let (mut session, _, _) = session();
        session.start("[A]bc", ["[A]"]).unwrap();
        session.handle_keystroke(Key::Char('b'));
        session.handle_keystroke(Key::Char('x'));

        assert_eq!(
            session.classes(),
            vec![
                CharClass::TypedWhitelisted,
                CharClass::TypedWhitelisted,
                CharClass::TypedWhitelisted,
                CharClass::TypedPlain,
                CharClass::CurrentError,
            ]
        );
    }

    #[test]
    fn counters_are_monotonic() {
        let (mut session, _, _) = session();
        session.start("typing practice", Vec::<String>::new()).unwrap();

        let mut last = session.snapshot();
        for c in "tyxping pz".chars() {
            let snap = session.handle_keystroke(Key::Char(c)).snapshot;
            assert!(snap.correct_chars >= last.correct_chars);
            assert!(snap.error_chars >= last.error_chars);
            assert!(snap.total_keystrokes > last.total_keystrokes);
            assert!(snap.accuracy <= 100);
            last = snap;
        }
    }
}
