//! Color palette and style helpers.
//!
//! The active palette is a value (not globals) because the theme preference
//! is a durable setting the user can flip at runtime.

use ratatui::style::{Color, Modifier, Style};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeKind {
    #[default]
    Dark,
    Light,
}

impl ThemeKind {
    pub fn toggled(self) -> Self {
        match self {
            ThemeKind::Dark => ThemeKind::Light,
            ThemeKind::Light => ThemeKind::Dark,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub bg: Color,
    pub primary: Color,
    pub secondary: Color,
    pub muted: Color,
    pub accent: Color,
    pub selection_bg: Color,
    pub border: Color,
    pub border_focused: Color,
    pub ok: Color,
    pub warn: Color,
    pub err: Color,
    pub info: Color,
    /// Cycled through chart series and pie slices.
    pub chart: [Color; 6],
}

impl Theme {
    pub fn of(kind: ThemeKind) -> Self {
        match kind {
            ThemeKind::Dark => Self::dark(),
            ThemeKind::Light => Self::light(),
        }
    }

    pub fn dark() -> Self {
        Self {
            bg: Color::Rgb(18, 18, 18),
            primary: Color::Rgb(210, 210, 225),
            secondary: Color::Rgb(115, 115, 138),
            muted: Color::Rgb(72, 72, 88),
            accent: Color::Rgb(255, 95, 95),
            selection_bg: Color::Rgb(28, 28, 40),
            border: Color::Rgb(40, 40, 52),
            border_focused: Color::Rgb(120, 100, 200),
            ok: Color::Rgb(80, 200, 120),
            warn: Color::Rgb(255, 184, 80),
            err: Color::Rgb(255, 80, 80),
            info: Color::Rgb(80, 160, 220),
            chart: [
                Color::Rgb(80, 160, 220),
                Color::Rgb(80, 200, 120),
                Color::Rgb(255, 184, 80),
                Color::Rgb(180, 120, 220),
                Color::Rgb(255, 95, 95),
                Color::Rgb(100, 160, 130),
            ],
        }
    }

    pub fn light() -> Self {
        Self {
            bg: Color::Rgb(245, 245, 242),
            primary: Color::Rgb(40, 40, 48),
            secondary: Color::Rgb(110, 110, 125),
            muted: Color::Rgb(165, 165, 175),
            accent: Color::Rgb(200, 60, 60),
            selection_bg: Color::Rgb(225, 225, 235),
            border: Color::Rgb(200, 200, 208),
            border_focused: Color::Rgb(110, 90, 190),
            ok: Color::Rgb(40, 150, 80),
            warn: Color::Rgb(190, 130, 30),
            err: Color::Rgb(190, 50, 50),
            info: Color::Rgb(40, 110, 180),
            chart: [
                Color::Rgb(40, 110, 180),
                Color::Rgb(40, 150, 80),
                Color::Rgb(190, 130, 30),
                Color::Rgb(130, 80, 180),
                Color::Rgb(190, 50, 50),
                Color::Rgb(60, 120, 100),
            ],
        }
    }

    pub fn style_default(&self) -> Style {
        Style::default().fg(self.primary)
    }

    pub fn style_secondary(&self) -> Style {
        Style::default().fg(self.secondary)
    }

    pub fn style_muted(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn style_selected(&self, focused: bool) -> Style {
        let style = Style::default().bg(self.selection_bg).fg(self.primary);
        if focused {
            style.add_modifier(Modifier::BOLD)
        } else {
            style
        }
    }

    pub fn style_error(&self) -> Style {
        Style::default().fg(self.err)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark()
    }
}
