use std::fmt::Write as _;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const RESET: &str = "\x1b[0m";

const COLOR_CUBE_OFFSET: u8 = 16;
const COLOR_CUBE_STEPS: [u8; 6] = [0, 95, 135, 175, 215, 255];
const GRAYSCALE_OFFSET: u8 = 232;

// Basic 16-color table, same sRGB values most terminals ship with.
const BASIC_COLORS: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(205, 0, 0),
    Rgb::new(0, 205, 0),
    Rgb::new(205, 205, 0),
    Rgb::new(0, 0, 238),
    Rgb::new(205, 0, 205),
    Rgb::new(0, 205, 205),
    Rgb::new(229, 229, 229),
    Rgb::new(127, 127, 127),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(92, 92, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 255, 255),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#RRGGBB` (the leading `#` is optional).
    pub fn parse_hex(raw: &str) -> Option<Self> {
        let hex = raw.trim().trim_start_matches('#');
        if hex.len() != 6 || !hex.is_ascii() {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Self::new(r, g, b))
    }

    /// Multiplies every channel, saturating at 255.
    pub fn scaled(self, factor: f32) -> Self {
        let scale = |channel: u8| (channel as f32 * factor).clamp(0.0, 255.0) as u8;
        Self::new(scale(self.r), scale(self.g), scale(self.b))
    }

    /// Appends the foreground escape for this color at the given depth.
    /// `ColorDepth::None` appends nothing.
    pub fn write_fg(self, depth: ColorDepth, out: &mut String) {
        match depth {
            ColorDepth::None => {}
            ColorDepth::TrueColor => {
                let _ = write!(out, "\x1b[38;2;{};{};{}m", self.r, self.g, self.b);
            }
            ColorDepth::Ansi256 => {
                let _ = write!(out, "\x1b[38;5;{}m", self.to_ansi256());
            }
            ColorDepth::Ansi16 => {
                let index = self.to_ansi16();
                let code = if index < 8 { 30 + index } else { 90 + index - 8 };
                let _ = write!(out, "\x1b[{}m", code);
            }
        }
    }

    pub fn to_ansi256(self) -> u8 {
        let gray_candidate = self.r == self.g && self.g == self.b;
        if gray_candidate && self.r > 3 && self.r < 247 {
            let level = ((self.r as u16).saturating_sub(8) * 24 / 240).min(23) as u8;
            return GRAYSCALE_OFFSET + level;
        }
        let r = nearest_cube_step(self.r);
        let g = nearest_cube_step(self.g);
        let b = nearest_cube_step(self.b);
        COLOR_CUBE_OFFSET + 36 * r + 6 * g + b
    }

    pub fn to_ansi16(self) -> u8 {
        BASIC_COLORS
            .iter()
            .enumerate()
            .min_by_key(|(_, candidate)| self.distance_sq(**candidate))
            .map(|(index, _)| index as u8)
            .unwrap_or(7)
    }

    fn distance_sq(self, other: Rgb) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }
}

fn nearest_cube_step(channel: u8) -> u8 {
    COLOR_CUBE_STEPS
        .iter()
        .enumerate()
        .min_by_key(|(_, step)| (**step as i16 - channel as i16).unsigned_abs())
        .map(|(index, _)| index as u8)
        .unwrap_or(0)
}

/// How many colors the terminal can show. Ordered from least to most capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorDepth {
    None,
    Ansi16,
    Ansi256,
    TrueColor,
}

impl ColorDepth {
    pub fn has_color(self) -> bool {
        self != Self::None
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::None => "no-color",
            Self::Ansi16 => "16-color",
            Self::Ansi256 => "256-color",
            Self::TrueColor => "truecolor",
        }
    }
}

pub fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    let t = t.clamp(0.0, 1.0);
    (a as f32 * (1.0 - t) + b as f32 * t).round() as u8
}

pub fn lerp_rgb(a: Rgb, b: Rgb, t: f32) -> Rgb {
    Rgb::new(
        lerp_channel(a.r, b.r, t),
        lerp_channel(a.g, b.g, t),
        lerp_channel(a.b, b.b, t),
    )
}

/// Wraps `text` in a foreground escape and a reset. Plain text when the depth has no color.
pub fn colorize(text: &str, color: Rgb, depth: ColorDepth) -> String {
    if !depth.has_color() {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len() + 24);
    color.write_fg(depth, &mut out);
    out.push_str(text);
    out.push_str(RESET);
    out
}

pub fn strip_ansi(text: &str) -> String {
    static SGR_RE: OnceLock<Regex> = OnceLock::new();
    let re = SGR_RE.get_or_init(|| {
        Regex::new(r"\x1b\[[0-9;?]*[@-~]").expect("escape sequence regex should compile")
    });
    re.replace_all(text, "").into_owned()
}

/// Terminal columns taken by `text`, ignoring escape sequences.
pub fn visible_width(text: &str) -> usize {
    strip_ansi(text).chars().count()
}
