use anyhow::{anyhow, Result};

use crate::color::{ColorDepth, Rgb, RESET};
use crate::palette::Palette;

pub const BLANK: char = ' ';
/// Stored depth of a cleared cell. Every real write uses a larger value.
pub const FAR_DEPTH: f32 = 0.0;
/// Depth given to stamped text so nothing drawn later in the frame covers it.
pub const STAMP_DEPTH: f32 = f32::MAX;

/// How a non-blank cell is colored when the frame is snapshotted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tint {
    Plain,
    /// Scalar looked up in the active palette (one unit = one pass over the stops).
    Palette(f32),
    Fixed(Rgb),
}

/// Character and depth grids of identical shape, allocated once and reused
/// for every frame until the terminal is resized.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    chars: Vec<char>,
    depth: Vec<f32>,
    tints: Vec<Tint>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let cells = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            chars: filled_vec(cells, BLANK)?,
            depth: filled_vec(cells, FAR_DEPTH)?,
            tints: filled_vec(cells, Tint::Plain)?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Reallocates every grid for a new terminal size. On failure the buffer
    /// keeps its previous shape and contents.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        if width == self.width && height == self.height {
            self.clear();
            return Ok(());
        }
        *self = Self::new(width, height)?;
        Ok(())
    }

    pub fn clear(&mut self) {
        self.chars.fill(BLANK);
        self.depth.fill(FAR_DEPTH);
        self.tints.fill(Tint::Plain);
    }

    /// Depth-tested write: applies only when `depth` is greater than the stored
    /// depth (closer wins). Out-of-bounds coordinates are ignored.
    pub fn try_write(&mut self, x: i32, y: i32, depth: f32, glyph: char, tint: Tint) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        if depth.is_nan() || depth <= self.depth[index] {
            return false;
        }
        self.depth[index] = depth;
        self.chars[index] = glyph;
        self.tints[index] = tint;
        true
    }

    /// Writes `text` left to right starting at `(x, y)` on top of everything,
    /// clipping at the buffer edges. Returns the number of cells written.
    pub fn stamp_text(&mut self, x: i32, y: i32, text: &str, tint: Tint) -> usize {
        let mut written = 0;
        for (offset, glyph) in text.chars().enumerate() {
            let Some(column) = i32::try_from(offset).ok().and_then(|o| x.checked_add(o)) else {
                break;
            };
            if self.stamp_glyph(column, y, glyph, tint) {
                written += 1;
            }
        }
        written
    }

    /// Overwrites one cell regardless of its stored depth.
    pub fn stamp_glyph(&mut self, x: i32, y: i32, glyph: char, tint: Tint) -> bool {
        let Some(index) = self.index(x, y) else {
            return false;
        };
        self.chars[index] = glyph;
        self.depth[index] = STAMP_DEPTH;
        self.tints[index] = tint;
        true
    }

    pub fn glyph_at(&self, x: usize, y: usize) -> Option<char> {
        self.linear(x, y).map(|index| self.chars[index])
    }

    pub fn depth_at(&self, x: usize, y: usize) -> Option<f32> {
        self.linear(x, y).map(|index| self.depth[index])
    }

    pub fn tint_at(&self, x: usize, y: usize) -> Option<Tint> {
        self.linear(x, y).map(|index| self.tints[index])
    }

    pub fn filled_cells(&self) -> usize {
        self.chars.iter().filter(|glyph| **glyph != BLANK).count()
    }

    pub fn snapshot(&self, palette: &Palette, depth: ColorDepth) -> String {
        let mut out = String::with_capacity(self.width * self.height * 4);
        self.snapshot_into(palette, depth, self.height, &mut out);
        out
    }

    /// Appends the first `rows` rows as styled text, rows joined by `\n`.
    /// Blank cells are plain spaces; a color escape is only emitted when the
    /// color changes between neighbouring cells.
    pub fn snapshot_into(&self, palette: &Palette, depth: ColorDepth, rows: usize, out: &mut String) {
        let rows = rows.min(self.height);
        for y in 0..rows {
            let mut active: Option<Rgb> = None;
            for x in 0..self.width {
                let index = y * self.width + x;
                let glyph = self.chars[index];
                let color = match (glyph, self.tints[index]) {
                    (BLANK, _) | (_, Tint::Plain) => None,
                    (_, Tint::Palette(t)) => Some(palette.sample(t)),
                    (_, Tint::Fixed(rgb)) => Some(rgb),
                };

                if depth.has_color() && color != active {
                    if active.is_some() {
                        out.push_str(RESET);
                    }
                    if let Some(rgb) = color {
                        rgb.write_fg(depth, out);
                    }
                    active = color;
                }
                out.push(glyph);
            }
            if active.is_some() {
                out.push_str(RESET);
            }
            if y + 1 < rows {
                out.push('\n');
            }
        }
    }

    /// Characters only, no styling.
    pub fn plain_text(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for (row_index, row) in self.chars.chunks(self.width.max(1)).enumerate() {
            if row_index > 0 {
                out.push('\n');
            }
            out.extend(row.iter());
        }
        out
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        let x = usize::try_from(x).ok()?;
        let y = usize::try_from(y).ok()?;
        self.linear(x, y)
    }

    fn linear(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }
}

pub(crate) fn cell_count(width: usize, height: usize) -> Result<usize> {
    width
        .checked_mul(height)
        .ok_or_else(|| anyhow!("frame size {width}x{height} overflows"))
}

pub(crate) fn filled_vec<T: Clone>(len: usize, value: T) -> Result<Vec<T>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(len)
        .map_err(|error| anyhow!("failed to allocate {len} cells: {error}"))?;
    values.resize(len, value);
    Ok(values)
}
