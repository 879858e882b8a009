pub mod ui;

use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{
        DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers,
        KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{
        disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement, EnterAlternateScreen,
        LeaveAlternateScreen,
    },
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use retype::{
    compose::Compose,
    config::{self, Config, FileConfigStore},
    error::TextError,
    feedback::ErrorSound,
    input::{self, Key},
    runtime::{
        CrosstermEventSource, FixedTicker, PracticeEvent, PracticeEventSource, Runner, Ticker,
    },
    text::read_text_file,
    KeyOutcome, Phase, PracticeSession,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    sync::Mutex,
    time::Duration,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// type pasted text back, with placeholder tokens skipped for you
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Paste or load a text, list the tokens you never want to type (one per line), then type the text back while retype tracks accuracy, speed and progress."
)]
pub struct Cli {
    /// text to practice; skips the compose screen
    #[clap(short = 'p', long = "text")]
    text: Option<String>,

    /// read the text to practice from a file
    #[clap(short = 'f', long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// whitelist token, repeat for more; replaces the configured defaults
    #[clap(short = 'w', long = "whitelist")]
    whitelist: Vec<String>,

    /// do not play the error tone on mistakes
    #[clap(long)]
    no_sound: bool,

    /// refresh interval of the timer display, in milliseconds
    #[clap(long)]
    tick_ms: Option<u64>,
}

impl Cli {
    fn whitelist(&self, config: &Config) -> Vec<String> {
        if self.whitelist.is_empty() {
            config.default_whitelist.clone()
        } else {
            self.whitelist.clone()
        }
    }

    fn sound(&self, config: &Config) -> bool {
        config.sound && !self.no_sound
    }

    fn tick_rate(&self, config: &Config) -> Duration {
        Duration::from_millis(self.tick_ms.unwrap_or(config.tick_rate_ms).max(1))
    }

    fn initial_text(&self) -> Result<Option<String>, TextError> {
        match (&self.text, &self.file) {
            (Some(text), _) => Ok(Some(text.clone())),
            (None, Some(path)) => read_text_file(path).map(Some),
            (None, None) => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

#[derive(Debug)]
pub struct App {
    pub session: PracticeSession,
    pub compose: Compose,
    pub default_whitelist: Vec<String>,
    pub caps_lock: Option<bool>,
    /// Terminal sends kitty-protocol key events (lock state, base keys)
    pub enhanced_keys: bool,
}

impl App {
    pub fn new(default_whitelist: Vec<String>, sound: ErrorSound) -> Self {
        Self {
            session: PracticeSession::new(sound),
            compose: Compose::new(&default_whitelist),
            default_whitelist,
            caps_lock: None,
            enhanced_keys: false,
        }
    }

    pub fn from_cli(cli: &Cli, config: &Config) -> Result<Self, TextError> {
        let mut app = Self::new(cli.whitelist(config), ErrorSound::new(cli.sound(config)));

        if let Some(text) = cli.initial_text()? {
            app.compose.set_text(&text);
            app.start();
        }

        Ok(app)
    }

    /// Start a session from the compose fields. Returns false if there is no text.
    pub fn start(&mut self) -> bool {
        self.session
            .start(&self.compose.text, self.compose.whitelist_lines())
            .is_some()
    }

    /// Back to an empty compose screen
    pub fn new_text(&mut self) {
        self.session.reset();
        self.compose = Compose::new(&self.default_whitelist);
    }

    pub fn on_paste(&mut self, text: &str) {
        if self.session.phase() == Phase::Idle {
            self.compose.paste(text);
        }
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if let Some(caps) = input::caps_lock(&key, self.enhanced_keys) {
            self.caps_lock = Some(caps);
        }
        let key = if self.enhanced_keys {
            input::resolve_case(key)
        } else {
            key
        };

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        match self.session.phase() {
            Phase::Idle => return self.on_compose_key(key, ctrl),
            Phase::Ready | Phase::Active => match key.code {
                KeyCode::Char('r') if ctrl => {
                    self.session.retry();
                }
                KeyCode::Char('n') if ctrl => self.new_text(),
                _ => {
                    let update = self.session.handle_keystroke(Key::from(key));
                    if update.outcome == KeyOutcome::Cancelled {
                        self.new_text();
                    }
                }
            },
            Phase::Complete => match key.code {
                KeyCode::Char('r') => {
                    self.session.retry();
                }
                KeyCode::Char('n') | KeyCode::Esc => self.new_text(),
                _ => {}
            },
        }

        Control::Continue
    }

    fn on_compose_key(&mut self, key: KeyEvent, ctrl: bool) -> Control {
        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::F(5) => {
                self.start();
            }
            KeyCode::Char('s') if ctrl => {
                self.start();
            }
            KeyCode::Char('l') if ctrl => self.compose.clear(),
            KeyCode::Tab | KeyCode::BackTab => self.compose.toggle_focus(),
            KeyCode::Enter => self.compose.insert_char('\n'),
            KeyCode::Backspace => self.compose.backspace(),
            KeyCode::Char(c) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.compose.insert_char(c)
            }
            _ => {}
        }

        Control::Continue
    }
}

fn init_logging() {
    let path = config::log_path();
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "retype=info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .init();
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    init_logging();

    let config = config::load_or_init(&FileConfigStore::new());
    let mut app = match App::from_cli(&cli, &config) {
        Ok(app) => app,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, e).exit();
        }
    };

    tracing::info!("retype {} starting", env!("CARGO_PKG_VERSION"));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;

    // must be queried before the event reader thread owns the input
    let supported = supports_keyboard_enhancement().unwrap_or_else(|e| {
        tracing::warn!("keyboard enhancement query failed: {e}");
        false
    });
    if let Some(flags) = keyboard_enhancement(supported) {
        execute!(stdout, flags)?;
        app.enhanced_keys = true;
    }
    tracing::info!(enhanced = app.enhanced_keys, "keyboard reporting");

    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(cli.tick_rate(&config)),
    );

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = start_tui(&mut terminal, &mut app, &runner);

    if app.enhanced_keys {
        execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
    }
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen,
    )?;
    terminal.show_cursor()?;

    result
}

/// Kitty keyboard protocol flags to push, if the terminal supports them.
/// Lock state is only reported when every key is sent as an escape code.
fn keyboard_enhancement(supported: bool) -> Option<PushKeyboardEnhancementFlags> {
    supported.then(|| {
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                | KeyboardEnhancementFlags::REPORT_ALTERNATE_KEYS,
        )
    })
}

fn start_tui<B: Backend, E: PracticeEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| ui(app, f))?;

    loop {
        match runner.step() {
            PracticeEvent::Tick => {
                // only a running session has a live timer display
                if app.session.on_tick().is_some() {
                    terminal.draw(|f| ui(app, f))?;
                }
            }
            PracticeEvent::Resize => {
                terminal.draw(|f| ui(app, f))?;
            }
            PracticeEvent::Paste(text) => {
                app.on_paste(&text);
                terminal.draw(|f| ui(app, f))?;
            }
            PracticeEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
                terminal.draw(|f| ui(app, f))?;
            }
            PracticeEvent::Closed => {
                tracing::warn!("no more terminal input, quitting");
                break;
            }
        }
    }

    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    f.render_widget(app, f.area());
}
