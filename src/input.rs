use crossterm::event::{KeyCode, KeyEvent, KeyEventState, KeyModifiers};

/// Keystrokes as the practice session understands them
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Escape,
    /// Arrows, function keys, modifier chords and the like
    Other,
}

impl Key {
    /// The character this key types, if it types exactly one visible one.
    /// Enter types a newline.
    pub fn typed_char(&self) -> Option<char> {
        match *self {
            Key::Char(c) if !c.is_control() => Some(c),
            Key::Enter => Some('\n'),
            _ => None,
        }
    }
}

impl From<KeyEvent> for Key {
    fn from(key: KeyEvent) -> Self {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return Key::Other;
        }

        match key.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Delete => Key::Delete,
            KeyCode::Esc => Key::Escape,
            _ => Key::Other,
        }
    }
}

/// Caps Lock state, when the terminal reports it with the key event.
///
/// With enhanced keyboard reporting every key carries its lock state, so an
/// empty state means the lock is off.
pub fn caps_lock(key: &KeyEvent, enhanced: bool) -> Option<bool> {
    if enhanced || !key.state.is_empty() {
        Some(key.state.contains(KeyEventState::CAPS_LOCK))
    } else {
        None
    }
}

/// Under enhanced keyboard reporting, letters arrive as their base key with
/// the lock state alongside. Apply Shift and Caps Lock the way the terminal
/// would have when producing text.
pub fn resolve_case(mut key: KeyEvent) -> KeyEvent {
    if let KeyCode::Char(c) = key.code {
        let caps = key.state.contains(KeyEventState::CAPS_LOCK);
        let shift = key.modifiers.contains(KeyModifiers::SHIFT);
        if caps ^ shift {
            key.code = KeyCode::Char(swap_case(c));
        }
    }
    key
}

fn swap_case(c: char) -> char {
    let swapped: String = if c.is_lowercase() {
        c.to_uppercase().collect()
    } else if c.is_uppercase() {
        c.to_lowercase().collect()
    } else {
        return c;
    };

    let mut chars = swapped.chars();
    match (chars.next(), chars.next()) {
        (Some(single), None) => single,
        _ => c,
    }
}
