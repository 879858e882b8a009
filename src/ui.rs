use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Widget, Wrap},
};
use retype::{
    compose::Field,
    metrics::{format_elapsed, CharClass, Snapshot},
    Phase,
};
use unicode_width::UnicodeWidthStr;

use crate::App;

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.session.phase() {
            Phase::Idle => render_compose(self, area, buf),
            Phase::Ready | Phase::Active => render_practice(self, area, buf),
            Phase::Complete => render_results(self, area, buf),
        }
    }
}

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

fn italic() -> Style {
    Style::default().add_modifier(Modifier::ITALIC)
}

fn field_block(title: &str, focused: bool) -> Block<'_> {
    let border_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().add_modifier(Modifier::DIM)
    };

    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(title)
}

fn render_compose(app: &App, area: Rect, buf: &mut Buffer) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN.min(area.height / 8))
        .constraints([
            Constraint::Min(3),    // text
            Constraint::Length(6), // whitelist
            Constraint::Length(1), // legend
        ])
        .split(area);

    let compose = &app.compose;

    let text = if compose.text.is_empty() {
        Paragraph::new(Span::styled(
            "Paste the text to practice here",
            italic().add_modifier(Modifier::DIM),
        ))
    } else {
        Paragraph::new(compose.text.as_str())
    };
    text.block(field_block(" Text ", compose.focus == Field::Text))
        .wrap(Wrap { trim: false })
        .render(chunks[0], buf);

    Paragraph::new(compose.whitelist.as_str())
        .block(field_block(
            " Whitelist (one token per line) ",
            compose.focus == Field::Whitelist,
        ))
        .render(chunks[1], buf);

    let legend = if compose.can_start() {
        "(tab) switch field / (ctrl+s) start / (ctrl+l) clear / (esc)ape"
    } else {
        "(tab) switch field / (ctrl+l) clear / (esc)ape"
    };
    Paragraph::new(Span::styled(legend, italic())).render(chunks[2], buf);
}

fn char_style(class: CharClass) -> Style {
    match class {
        CharClass::TypedPlain => bold().fg(Color::Green),
        CharClass::TypedWhitelisted => italic().fg(Color::DarkGray),
        CharClass::CurrentCorrect => dim_bold().add_modifier(Modifier::UNDERLINED),
        CharClass::CurrentError => bold()
            .fg(Color::Red)
            .add_modifier(Modifier::UNDERLINED | Modifier::REVERSED),
        CharClass::Upcoming => dim_bold(),
    }
}

/// The reference text as styled lines, one per `\n`
fn prompt_lines(app: &App) -> Vec<Line<'static>> {
    let chars = app.session.text().chars();
    let classes = app.session.classes();

    let mut lines = vec![];
    let mut spans = vec![];

    for (c, class) in chars.iter().zip(classes) {
        let current = matches!(class, CharClass::CurrentCorrect | CharClass::CurrentError);
        let symbol = match c {
            '\n' if current => "↵".to_string(),
            '\n' => String::new(),
            ' ' if class == CharClass::CurrentError => "·".to_string(),
            c => c.to_string(),
        };

        if !symbol.is_empty() {
            spans.push(Span::styled(symbol, char_style(class)));
        }
        if *c == '\n' {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }
    lines.push(Line::from(spans));

    lines
}

fn stats_line(snapshot: &Snapshot) -> String {
    format!(
        "{} correct   {} errors   {} keys   {}% acc   {} wpm   {} / {}",
        snapshot.correct_chars,
        snapshot.error_chars,
        snapshot.total_keystrokes,
        snapshot.accuracy,
        snapshot.wpm,
        snapshot.cursor,
        snapshot.text_len,
    )
}

fn render_practice(app: &App, area: Rect, buf: &mut Buffer) {
    let snapshot = app.session.snapshot();
    let lines = prompt_lines(app);

    let max_chars_per_line = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1);
    let text = app.session.text().to_string();
    let single_line = lines.len() == 1 && text.width() <= max_chars_per_line as usize;
    let prompt_occupied_lines = if single_line {
        1
    } else {
        lines
            .iter()
            .map(|l| (l.width() as f64 / max_chars_per_line as f64).ceil().max(1.0) as u16)
            .fold(1u16, u16::saturating_add)
    };
    let padding = area.height.saturating_sub(prompt_occupied_lines.saturating_add(4)) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(1), // timer and caps lock
            Constraint::Length(padding),
            Constraint::Min(prompt_occupied_lines.min(area.height)),
            Constraint::Length(padding),
            Constraint::Length(1), // progress
            Constraint::Length(1), // stats
            Constraint::Length(1), // legend
        ])
        .split(area);

    let mut status = vec![Span::styled(format_elapsed(snapshot.elapsed), dim_bold())];
    if let Some(caps) = app.caps_lock {
        status.push(Span::raw("   "));
        status.push(if caps {
            Span::styled("Caps Lock: ON", bold().fg(Color::Yellow))
        } else {
            Span::styled("Caps Lock: OFF", Style::default().add_modifier(Modifier::DIM))
        });
    }
    Paragraph::new(Line::from(status))
        .alignment(Alignment::Center)
        .render(chunks[0], buf);

    Paragraph::new(lines)
        .alignment(if single_line {
            // when the prompt is small enough to fit on one line
            // centering the text gives a nice zen feeling
            Alignment::Center
        } else {
            Alignment::Left
        })
        .wrap(Wrap { trim: false })
        .render(chunks[2], buf);

    let ratio = (snapshot.progress_percent / 100.0).clamp(0.0, 1.0);
    Gauge::default()
        .gauge_style(Style::default().fg(Color::Magenta))
        .ratio(ratio)
        .label(format!("{:.0}%", snapshot.progress_percent))
        .render(chunks[4], buf);

    Paragraph::new(Span::styled(stats_line(&snapshot), bold()))
        .alignment(Alignment::Center)
        .render(chunks[5], buf);

    Paragraph::new(Span::styled(
        "(ctrl+r) retry / (ctrl+n) new text / (esc)ape",
        italic(),
    ))
    .render(chunks[6], buf);
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let snapshot = app.session.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN.min(area.height / 8))
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1), // headline
            Constraint::Length(1), // counts
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    let headline = format!(
        "{} wpm   {}% acc   {}",
        snapshot.wpm,
        snapshot.accuracy,
        format_elapsed(snapshot.elapsed)
    );
    Paragraph::new(Span::styled(headline, bold()))
        .alignment(Alignment::Center)
        .render(chunks[1], buf);

    Paragraph::new(Span::styled(
        stats_line(&snapshot),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
    ))
    .alignment(Alignment::Center)
    .render(chunks[2], buf);

    Paragraph::new(Span::styled("(r)etry / (n)ew text / (esc)ape", italic()))
        .render(chunks[4], buf);
}
