use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use crossterm::event::{self, Event as CtEvent, KeyEvent, KeyEventKind};

/// Default refresh interval for the elapsed-time display
pub const TICK_RATE_MS: u64 = 100;

/// Unified event type consumed by the app runner
#[derive(Clone, Debug)]
pub enum PracticeEvent {
    Key(KeyEvent),
    Paste(String),
    Resize,
    Tick,
    /// The event source is gone; nothing more will arrive
    Closed,
}

/// Source of terminal events (keyboard, paste, resize)
pub trait PracticeEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError>;
}

/// Production event source using crossterm
pub struct CrosstermEventSource {
    rx: Receiver<PracticeEvent>,
}

impl CrosstermEventSource {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();

        std::thread::spawn(move || loop {
            let evt = match event::read() {
                // Windows consoles report key releases as well
                Ok(CtEvent::Key(key)) if key.kind == KeyEventKind::Release => None,
                Ok(CtEvent::Key(key)) => Some(PracticeEvent::Key(key)),
                Ok(CtEvent::Paste(text)) => Some(PracticeEvent::Paste(text)),
                Ok(CtEvent::Resize(_, _)) => Some(PracticeEvent::Resize),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("terminal event stream closed: {e}");
                    break;
                }
            };

            if let Some(evt) = evt {
                if tx.send(evt).is_err() {
                    break;
                }
            }
        });

        Self { rx }
    }
}

impl Default for CrosstermEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeEventSource for CrosstermEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Configurable ticker interface
pub trait Ticker: Send + Sync + 'static {
    fn interval(&self) -> Duration;
}

/// Fixed interval ticker
#[derive(Clone, Copy, Debug)]
pub struct FixedTicker {
    interval: Duration,
}

impl FixedTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl Default for FixedTicker {
    fn default() -> Self {
        Self::new(Duration::from_millis(TICK_RATE_MS))
    }
}

impl Ticker for FixedTicker {
    fn interval(&self) -> Duration {
        self.interval
    }
}

/// Test event source for unit tests
pub struct TestEventSource {
    rx: Receiver<PracticeEvent>,
}

impl TestEventSource {
    pub fn new(rx: Receiver<PracticeEvent>) -> Self {
        Self { rx }
    }
}

impl PracticeEventSource for TestEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<PracticeEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Runner that advances the application one event/tick at a time
pub struct Runner<E: PracticeEventSource, T: Ticker> {
    event_source: E,
    ticker: T,
}

impl<E: PracticeEventSource, T: Ticker> Runner<E, T> {
    pub fn new(event_source: E, ticker: T) -> Self {
        Self {
            event_source,
            ticker,
        }
    }

    /// Blocks up to tick interval and returns the next event, or Tick on timeout
    pub fn step(&self) -> PracticeEvent {
        match self.event_source.recv_timeout(self.ticker.interval()) {
            Ok(ev) => ev,
            Err(RecvTimeoutError::Timeout) => PracticeEvent::Tick,
            Err(RecvTimeoutError::Disconnected) => PracticeEvent::Closed,
        }
    }
}

/// The periodic elapsed-time refresh of a session.
///
/// Only one schedule can exist: `arm` cancels whatever was armed before.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshTimer {
    armed: bool,
    generation: u64,
}

impl RefreshTimer {
    pub fn arm(&mut self) {
        self.cancel();
        self.generation += 1;
        self.armed = true;
        tracing::debug!(generation = self.generation, "refresh timer armed");
    }

    pub fn cancel(&mut self) {
        if self.armed {
            tracing::debug!(generation = self.generation, "refresh timer cancelled");
        }
        self.armed = false;
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Number of times the timer has been armed; identifies the live schedule.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}
