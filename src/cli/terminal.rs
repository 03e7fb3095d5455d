//! Terminal output helpers

use std::sync::OnceLock;

use owo_colors::{OwoColorize, Style};

fn color_enabled() -> bool {
    static ENABLED: OnceLock<bool> = OnceLock::new();
    *ENABLED.get_or_init(|| supports_color::on(supports_color::Stream::Stdout).is_some())
}

/// Width of the attached terminal in columns, if stdout is one.
pub fn terminal_width() -> Option<usize> {
    terminal_size::terminal_size().map(|(width, _)| usize::from(width.0))
}

/// Shortens `text` to at most `width` characters, marking the cut with `~`.
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width.saturating_sub(1)).collect();
    short.push('~');
    short
}

/// Extension trait for colouring output. Colours are dropped when stdout
/// does not support them.
pub trait Colorize {
    /// Green
    fn success(&self) -> String;
    /// Yellow
    fn warning(&self) -> String;
    /// Bold
    fn heading(&self) -> String;
    /// Dimmed
    fn dim(&self) -> String;
}

impl<T: AsRef<str> + ?Sized> Colorize for T {
    fn success(&self) -> String {
        paint(self.as_ref(), Style::new().green())
    }

    fn warning(&self) -> String {
        paint(self.as_ref(), Style::new().yellow())
    }

    fn heading(&self) -> String {
        paint(self.as_ref(), Style::new().bold())
    }

    fn dim(&self) -> String {
        paint(self.as_ref(), Style::new().dimmed())
    }
}

fn paint(text: &str, style: Style) -> String {
    if color_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}
