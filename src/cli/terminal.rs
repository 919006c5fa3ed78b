//! Colored status lines

use owo_colors::{OwoColorize, colors::css};

/// How a status line is presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Work completed (green)
    Success,
    /// Completed, but probably not what was wanted (amber)
    Warning,
    /// Secondary detail (dimmed)
    Muted,
}

/// Colors `text` for stderr, where status lines are written.
///
/// Plain text is returned when stderr does not support color.
pub fn paint(text: &str, tone: Tone) -> String {
    if supports_color::on(supports_color::Stream::Stderr).is_none() {
        return text.to_string();
    }
    match tone {
        Tone::Success => text.fg::<css::Green>().to_string(),
        Tone::Warning => text.fg::<css::Orange>().to_string(),
        Tone::Muted => text.dimmed().to_string(),
    }
}
