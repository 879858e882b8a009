use rodio::source::{SineWave, Source};
use std::cell::Cell;
use std::io;
use std::rc::Rc;
use std::sync::mpsc::{self, Sender};
use std::thread;
use std::time::Duration;

/// Audible (or otherwise noticeable) signal for a mistyped character.
///
/// Callers treat this as fire-and-forget: an `Err` is dropped, never shown.
pub trait Feedback {
    fn signal_error(&self) -> io::Result<()>;
}

/// Pitch and length of the mistake tone
const TONE_HZ: f32 = 220.0;
const TONE_MS: u64 = 90;
const TONE_VOLUME: f32 = 0.2;

/// Plays a short sine tone on a dedicated audio thread.
///
/// The thread owns the output stream; each `signal_error` sends a request
/// and returns immediately. If no output device can be opened the thread
/// exits, and later signals come back as `Err`.
#[derive(Debug)]
pub struct Tone {
    tx: Sender<()>,
}

impl Tone {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<()>();

        thread::spawn(move || {
            let (_stream, handle) = match rodio::OutputStream::try_default() {
                Ok(output) => output,
                Err(e) => {
                    tracing::debug!("no audio output, error tone disabled: {e}");
                    return;
                }
            };

            while rx.recv().is_ok() {
                if let Ok(sink) = rodio::Sink::try_new(&handle) {
                    sink.append(
                        SineWave::new(TONE_HZ)
                            .take_duration(Duration::from_millis(TONE_MS))
                            .amplify(TONE_VOLUME),
                    );
                    sink.detach();
                }
            }
        });

        Self { tx }
    }
}

impl Feedback for Tone {
    fn signal_error(&self) -> io::Result<()> {
        self.tx
            .send(())
            .map_err(|_| io::Error::other("audio thread stopped"))
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Feedback for Silent {
    fn signal_error(&self) -> io::Result<()> {
        Ok(())
    }
}

/// Tone or silence, picked at runtime from config/CLI
#[derive(Debug)]
pub enum ErrorSound {
    Tone(Tone),
    Off,
}

impl ErrorSound {
    pub fn new(enabled: bool) -> Self {
        if enabled {
            ErrorSound::Tone(Tone::spawn())
        } else {
            ErrorSound::Off
        }
    }
}

impl Feedback for ErrorSound {
    fn signal_error(&self) -> io::Result<()> {
        match self {
            ErrorSound::Tone(tone) => tone.signal_error(),
            ErrorSound::Off => Silent.signal_error(),
        }
    }
}

/// Counts signals; optionally fails every call. Used by tests.
#[derive(Clone, Debug, Default)]
pub struct RecordingFeedback {
    count: Rc<Cell<usize>>,
    fail: bool,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            count: Rc::default(),
            fail: true,
        }
    }

    pub fn count(&self) -> usize {
        self.count.get()
    }
}

impl Feedback for RecordingFeedback {
    fn signal_error(&self) -> io::Result<()> {
        self.count.set(self.count.get() + 1);
        if self.fail {
            return Err(io::Error::other("no audio device"));
        }
        Ok(())
    }
}
