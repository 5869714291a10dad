//! Task state to terminal style mapping

use colored::{Color, ColoredString, Colorize};

use crate::task::TaskState;

/// How a piece of dashboard text is emphasized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateStyle {
    /// Foreground color, `None` for the terminal default
    pub color: Option<Color>,
    /// Bold weight
    pub bold: bool,
    /// Black background
    pub on_black: bool,
}

impl StateStyle {
    /// Plain text, no emphasis
    pub const NEUTRAL: Self = Self {
        color: None,
        bold: false,
        on_black: false,
    };

    const fn strong(color: Color) -> Self {
        Self {
            color: Some(color),
            bold: true,
            on_black: true,
        }
    }

    /// Apply this style to `text`.
    #[must_use]
    pub fn paint(self, text: &str) -> ColoredString {
        let mut painted = text.normal();
        if let Some(color) = self.color {
            painted = painted.color(color);
        }
        if self.bold {
            painted = painted.bold();
        }
        if self.on_black {
            painted = painted.on_black();
        }
        painted
    }
}

/// Style of a group label in the given state.
#[must_use]
pub const fn group_style(state: TaskState) -> StateStyle {
    match state {
        TaskState::Initializing | TaskState::Pending => StateStyle {
            color: Some(Color::BrightBlack),
            bold: false,
            on_black: true,
        },
        TaskState::InProgress | TaskState::InProgressMustRerun => StateStyle::strong(Color::Blue),
        TaskState::Failed => StateStyle::strong(Color::Red),
        TaskState::Succeeded => StateStyle::strong(Color::Green),
        TaskState::None => StateStyle::NEUTRAL,
    }
}

/// Style of a tag section header for the tag's reduced state.
#[must_use]
pub const fn tag_style(state: TaskState) -> StateStyle {
    match state {
        TaskState::Succeeded => StateStyle::strong(Color::Green),
        TaskState::Failed => StateStyle::strong(Color::Red),
        _ => StateStyle::strong(Color::Blue),
    }
}
