use serde::{Deserialize, Serialize};

use crate::color::ColorDepth;

pub const DEFAULT_WIDTH: u16 = 80;
pub const DEFAULT_HEIGHT: u16 = 24;
pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 20;

/// What the host terminal can do. Computed by the host at start and
/// refreshed whenever the terminal is resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalCaps {
    pub width: u16,
    pub height: u16,
    pub color_depth: ColorDepth,
    pub unicode: bool,
}

impl TerminalCaps {
    pub fn new(width: u16, height: u16, color_depth: ColorDepth, unicode: bool) -> Self {
        Self {
            width,
            height,
            color_depth,
            unicode,
        }
    }

    /// Reads color depth and unicode support from the process environment.
    /// The size is supplied by the caller, which owns the terminal handle.
    pub fn detect(width: u16, height: u16) -> Self {
        Self::from_env_lookup(width, height, |key| std::env::var(key).ok())
    }

    pub fn from_env_lookup<F>(width: u16, height: u16, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            width,
            height,
            color_depth: detect_color_depth(&lookup),
            unicode: detect_unicode(&lookup),
        }
    }

    pub fn with_size(self, width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    pub fn fits(&self, min_width: u16, min_height: u16) -> bool {
        self.width >= min_width && self.height >= min_height
    }

    /// True when the animated acts may run: large enough and able to show color.
    pub fn is_sufficient(&self, min_width: u16, min_height: u16) -> bool {
        self.fits(min_width, min_height) && self.color_depth.has_color()
    }
}

impl Default for TerminalCaps {
    fn default() -> Self {
        Self::new(DEFAULT_WIDTH, DEFAULT_HEIGHT, ColorDepth::TrueColor, true)
    }
}

fn detect_color_depth<F>(lookup: &F) -> ColorDepth
where
    F: Fn(&str) -> Option<String>,
{
    if lookup("NO_COLOR").is_some_and(|value| !value.is_empty()) {
        return ColorDepth::None;
    }

    let colorterm = lookup("COLORTERM").unwrap_or_default().to_ascii_lowercase();
    if colorterm == "truecolor" || colorterm == "24bit" {
        return ColorDepth::TrueColor;
    }

    let term = lookup("TERM").unwrap_or_default().to_ascii_lowercase();
    if term == "dumb" {
        return ColorDepth::None;
    }
    if term.contains("256color") {
        return ColorDepth::Ansi256;
    }
    ColorDepth::Ansi16
}

fn detect_unicode<F>(lookup: &F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    if cfg!(windows) && lookup("WT_SESSION").is_none() {
        return false;
    }

    for key in ["LC_ALL", "LC_CTYPE", "LANG"] {
        if let Some(value) = lookup(key).filter(|value| !value.is_empty()) {
            let lowered = value.to_ascii_lowercase();
            return lowered.contains("utf-8") || lowered.contains("utf8");
        }
    }
    true
}
