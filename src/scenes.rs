//! Static text scenes: the closer card, the small-terminal fallback, the
//! equations page and the one-line hints.

use crate::color::{colorize, visible_width, ColorDepth, Rgb};
use crate::frame_buffer::{FrameBuffer, Tint};
use crate::geometry::{ASCII_RAMP, UNICODE_RAMP};

pub const ACCENT: Rgb = Rgb::new(0, 255, 170);
pub const BODY: Rgb = Rgb::new(0, 204, 136);
pub const HINT: Rgb = Rgb::new(100, 100, 100);
pub const PROGRESS: Rgb = Rgb::new(50, 50, 50);
pub const GOLD: Rgb = Rgb::new(255, 174, 0);
const HEADER: Rgb = Rgb::new(0, 255, 255);

pub const TITLE: &str = "NEURAL CORTEX ACTIVE";
pub const TAGLINE: [&str; 2] = [
    "Every model fused. Every edge case covered.",
    "Six minds. One command line.",
];
pub const BEGIN_PROMPT: &str = "Press any key to begin...";
pub const CONTINUE_PROMPT: &str = "Press any key to continue...";
pub const SKIP_HINT: &str = "Press 'S' to skip | ESC to disable forever | '?' for math";
pub const DONUT_HINT: &str = "DONUT MODE | Press 'Q' to quit | '?' for math";
pub const PROGRESS_HINT: &str = "...";

const CARD_MIN_WIDTH: usize = 50;
const CARD_MAX_WIDTH: usize = 70;
const FALLBACK_RULE_WIDTH: usize = 35;

#[derive(Debug, Clone, Copy)]
struct BoxChars {
    top_left: char,
    top_right: char,
    bottom_left: char,
    bottom_right: char,
    horizontal: char,
    vertical: char,
}

const ROUNDED_BOX: BoxChars = BoxChars {
    top_left: '╭',
    top_right: '╮',
    bottom_left: '╰',
    bottom_right: '╯',
    horizontal: '─',
    vertical: '│',
};

const ASCII_BOX: BoxChars = BoxChars {
    top_left: '+',
    top_right: '+',
    bottom_left: '+',
    bottom_right: '+',
    horizontal: '-',
    vertical: '|',
};

/// Left padding that centers `text_width` columns inside `width`.
pub fn center_offset(text_width: usize, width: usize) -> usize {
    width.saturating_sub(text_width) / 2
}

/// Left-pads `text` so it sits centered in `width` columns. Escape codes do
/// not count toward the width; text wider than `width` is returned as is.
pub fn center_line(text: &str, width: usize) -> String {
    let padding = center_offset(visible_width(text), width);
    format!("{}{}", " ".repeat(padding), text)
}

/// Stamps the bordered closer card into the middle of `buffer`.
pub fn draw_closer(buffer: &mut FrameBuffer, unicode: bool) {
    let chars = if unicode { ROUNDED_BOX } else { ASCII_BOX };
    let width = buffer.width();
    let card_width = (width * 7 / 10)
        .clamp(CARD_MIN_WIDTH, CARD_MAX_WIDTH)
        .min(width);
    if card_width < 2 {
        return;
    }
    let inner = card_width - 2;

    let mut rows: Vec<(&str, Rgb)> = vec![("", BODY), (TITLE, ACCENT), ("", BODY)];
    rows.extend(TAGLINE.iter().map(|line| (*line, BODY)));
    rows.extend([("", BODY), (BEGIN_PROMPT, ACCENT), ("", BODY)]);

    let card_height = rows.len() + 2;
    let left = center_offset(card_width, width);
    let top = center_offset(card_height, buffer.height());
    let (Ok(left), Ok(top)) = (i32::try_from(left), i32::try_from(top)) else {
        return;
    };
    let border = Tint::Fixed(ACCENT);
    let right = left + card_width as i32 - 1;

    let rule = chars.horizontal.to_string().repeat(inner);
    buffer.stamp_text(left, top, &format!("{}{rule}{}", chars.top_left, chars.top_right), border);
    for (index, (text, color)) in rows.iter().enumerate() {
        let y = top + 1 + index as i32;
        buffer.stamp_glyph(left, y, chars.vertical, border);
        buffer.stamp_text(left + 1, y, &" ".repeat(inner), Tint::Plain);
        let clipped = text.chars().take(inner).collect::<String>();
        let x = left + 1 + center_offset(clipped.chars().count(), inner) as i32;
        buffer.stamp_text(x, y, &clipped, Tint::Fixed(*color));
        buffer.stamp_glyph(right, y, chars.vertical, border);
    }
    let bottom = top + card_height as i32 - 1;
    buffer.stamp_text(
        left,
        bottom,
        &format!("{}{rule}{}", chars.bottom_left, chars.bottom_right),
        border,
    );
}

/// Plain centered banner shown when the terminal cannot host the animation.
/// Carries no color escapes.
pub fn fallback_text(width: usize, height: usize, unicode: bool) -> String {
    let rule_char = if unicode { '═' } else { '=' };
    let rule = rule_char.to_string().repeat(FALLBACK_RULE_WIDTH.min(width.max(1)));
    let mut lines = vec![rule.clone(), TITLE.to_owned(), rule, String::new()];
    lines.extend(TAGLINE.iter().map(|line| (*line).to_owned()));
    lines.push(String::new());
    lines.push(CONTINUE_PROMPT.to_owned());

    let mut out = String::new();
    for _ in 0..center_offset(lines.len(), height) {
        out.push('\n');
    }
    let body = lines
        .iter()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                center_line(line, width)
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    out.push_str(&body);
    out
}

/// Hint line centered in `width`, colored when the terminal supports it.
pub fn hint_line(text: &str, width: usize, depth: ColorDepth) -> String {
    let clipped = text.chars().take(width).collect::<String>();
    center_line(&colorize(&clipped, HINT, depth), width)
}

/// Barely visible marker shown while a hidden key sequence is part way in.
pub fn progress_line(depth: ColorDepth) -> String {
    colorize(PROGRESS_HINT, PROGRESS, depth)
}

const MATH_BODY: &str = "Torus parametric equations:
  x(θ,φ) = (R + r·cos φ)·cos θ
  y(θ,φ) = r·sin φ
  z(θ,φ) = (R + r·cos φ)·sin θ

  R = 2   major radius, center to tube center
  r = 1   minor radius, tube thickness
  θ = angle around the ring (0 to 2π)
  φ = angle around the tube (0 to 2π)

Rotation: about x by A, then about z by B

  Rx(A) = [1    0       0    ]     Rz(B) = [cos B  -sin B  0]
          [0  cos A  -sin A  ]             [sin B   cos B  0]
          [0  sin A   cos A  ]             [0       0      1]

Perspective projection (z pushed back by 5):
  x_screen = width/2  + (30/z)·x
  y_screen = height/2 - (15/z)·y

Luminance: rotated surface normal · light direction, L ∈ [-1, 1]
Depth test: keep the cell with the largest 1/z

Character ramp:
  ";

const MATH_FOOTER: &str = "Press '?' again to return";

/// Frozen page describing the torus math.
pub fn math_page(unicode: bool, depth: ColorDepth) -> String {
    let title = "DONUT MATH: 3D torus equations";
    let rule_width = 71;
    let header = if unicode {
        format!(
            "╔{rule}╗\n║{title:^rule_width$}║\n╚{rule}╝",
            rule = "═".repeat(rule_width),
        )
    } else {
        format!(
            "+{rule}+\n|{title:^rule_width$}|\n+{rule}+",
            rule = "-".repeat(rule_width),
        )
    };

    let ramp = if unicode { &UNICODE_RAMP[..] } else { &ASCII_RAMP[..] };
    let ramp_line = ramp
        .iter()
        .map(|glyph| format!("'{glyph}'"))
        .collect::<Vec<_>>()
        .join(", ");
    let mut body = format!("{MATH_BODY}{{ {ramp_line} }}");
    if !unicode {
        for (from, to) in [("θ", "t"), ("φ", "p"), ("·", "*"), ("π", "pi"), ("∈", "in")] {
            body = body.replace(from, to);
        }
    }

    format!(
        "{}\n\n{}\n\n{}",
        colorize(&header, HEADER, depth),
        body,
        colorize(MATH_FOOTER, GOLD, depth)
    )
}
