use ratatui::style::{Color, Modifier, Style};

use crate::config::ThemeName;

/// Colours for one configured theme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    pub accent: Color,
    pub muted: Color,
    pub pinned: Color,
    pub match_fg: Color,
    pub selection_fg: Color,
    pub selection_bg: Color,
    pub danger: Color,
}

impl Palette {
    pub fn for_theme(theme: ThemeName) -> Self {
        match theme {
            ThemeName::Dark => Self {
                accent: Color::Cyan,
                muted: Color::Gray,
                pinned: Color::Yellow,
                match_fg: Color::Yellow,
                selection_fg: Color::Black,
                selection_bg: Color::Blue,
                danger: Color::Red,
            },
            ThemeName::Light => Self {
                accent: Color::Blue,
                muted: Color::DarkGray,
                pinned: Color::Magenta,
                match_fg: Color::Red,
                selection_fg: Color::White,
                selection_bg: Color::Blue,
                danger: Color::Red,
            },
        }
    }

    pub fn border(&self, focused: bool) -> Style {
        if focused {
            Style::default().fg(self.accent)
        } else {
            Style::default()
        }
    }

    pub fn highlight(&self) -> Style {
        Style::default()
            .fg(self.match_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn selection(&self) -> Style {
        Style::default()
            .bg(self.selection_bg)
            .fg(self.selection_fg)
            .add_modifier(Modifier::BOLD)
    }

    pub fn meta(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::for_theme(ThemeName::default())
    }
}
