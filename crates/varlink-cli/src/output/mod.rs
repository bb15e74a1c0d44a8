//! Terminal presentation shared by every command.
//!
//! Colour is decided once per invocation from `--color` and whether stdout is
//! a terminal; renderers receive the resulting [`Palette`] and stay free of
//! terminal probing.

mod json;

use clap::ValueEnum;
use colored::Colorize;

pub(crate) use json::render_parameters;

/// Colour selection for rendered output.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, ValueEnum)]
pub enum ColorChoice {
    /// Colour output only when stdout is a terminal.
    #[default]
    Auto,
    /// Always colour output.
    Always,
    /// Never colour output.
    Never,
}

impl ColorChoice {
    /// Resolves the choice against the terminal status of stdout.
    #[must_use]
    pub fn resolve(self, stdout_is_terminal: bool) -> bool {
        match self {
            Self::Auto => stdout_is_terminal,
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// Roles a rendered fragment can play.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Style {
    Key,
    String,
    Keyword,
    Name,
    Comment,
    Label,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Palette {
    enabled: bool,
}

impl Palette {
    pub(crate) fn new(enabled: bool) -> Self {
        if enabled {
            // `colored` otherwise probes the environment on its own.
            colored::control::set_override(true);
        }
        Self { enabled }
    }

    pub(crate) const fn plain() -> Self {
        Self { enabled: false }
    }

    pub(crate) fn paint(self, text: &str, style: Style) -> String {
        if !self.enabled {
            return text.to_owned();
        }
        let painted = match style {
            Style::Key => text.cyan(),
            Style::String | Style::Name => text.magenta(),
            Style::Keyword => text.blue(),
            Style::Comment => text.green(),
            Style::Label => text.bold(),
        };
        painted.to_string()
    }
}
