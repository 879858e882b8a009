//! Editing state for the screen shown before a session starts: the text to
//! practice and the whitelist, one token per line.

/// Spaces a tab expands to; a tab has no key that types it during practice
pub const TAB_WIDTH: usize = 4;

/// Line breaks as `\n` and tabs as spaces, for text entering the editor
pub fn normalize_input(s: &str) -> String {
    s.replace("\r\n", "\n")
        .replace('\r', "\n")
        .replace('\t', &" ".repeat(TAB_WIDTH))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Field {
    #[default]
    Text,
    Whitelist,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Compose {
    pub text: String,
    pub whitelist: String,
    pub focus: Field,
}

impl Compose {
    pub fn new(whitelist: &[String]) -> Self {
        Self {
            text: String::new(),
            whitelist: whitelist.join("\n"),
            focus: Field::Text,
        }
    }

    fn focused_mut(&mut self) -> &mut String {
        match self.focus {
            Field::Text => &mut self.text,
            Field::Whitelist => &mut self.whitelist,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Field::Text => Field::Whitelist,
            Field::Whitelist => Field::Text,
        };
    }

    pub fn insert_char(&mut self, c: char) {
        self.focused_mut().push(c);
    }

    /// Terminals may deliver pasted line breaks as `\r`
    pub fn paste(&mut self, s: &str) {
        let normalized = normalize_input(s);
        self.focused_mut().push_str(&normalized);
    }

    /// Replace the practice text, e.g. from the command line
    pub fn set_text(&mut self, s: &str) {
        self.text = normalize_input(s);
    }

    pub fn backspace(&mut self) {
        self.focused_mut().pop();
    }

    /// Empty both fields and go back to the text field
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Whitelist lines as typed; `Whitelist::configure` does the cleanup.
    pub fn whitelist_lines(&self) -> Vec<&str> {
        self.whitelist.lines().collect()
    }

    pub fn can_start(&self) -> bool {
        !self.text.trim().is_empty()
    }
}
