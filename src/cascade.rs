//! Falling glyph streams with a logo that fades in through the reveal mask.

use anyhow::Result;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::color::Rgb;
use crate::frame_buffer::{FrameBuffer, Tint, BLANK};
use crate::reveal::RevealMask;

pub const MIN_STREAM_LENGTH: usize = 5;
pub const MAX_STREAM_LENGTH: usize = 20;
pub const MIN_STREAM_SPEED: f32 = 0.3;
pub const MAX_STREAM_SPEED: f32 = 1.0;
pub const MIN_STREAM_LIFETIME: u32 = 60;
pub const MAX_STREAM_LIFETIME: u32 = 180;
pub const MUTATION_CHANCE: f64 = 0.1;

const TAIL_FADE: f32 = 0.8;
const INTENSITY_HEAD_MIN: f32 = 0.8;
const INTENSITY_BRIGHT_MIN: f32 = 0.5;
const INTENSITY_MID_MIN: f32 = 0.3;

pub const HEAD_COLOR: Rgb = Rgb::new(220, 255, 220);
pub const BRIGHT_COLOR: Rgb = Rgb::new(50, 255, 130);
pub const MID_COLOR: Rgb = Rgb::new(0, 255, 100);
pub const OVERLAY_COLOR: Rgb = Rgb::new(0, 255, 170);

// Half-width katakana keep every glyph one terminal column wide.
const UNICODE_GLYPHS: &str = "ｦｧｨｩｪｫｬｭｮｯｱｲｳｴｵｶｷｸｹｺｻｼｽｾｿﾀﾁﾂﾃﾄﾅﾆﾇﾈﾉﾊﾋﾌﾍﾎﾏﾐﾑﾒﾓﾔﾕﾖﾗﾘﾙﾚﾛﾜﾝ0123456789:.=*+-<>¦|\"'^~`";
const ASCII_GLYPHS: &str = "0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ:.=*+-<>|\"'^~`";

pub const DEFAULT_LOGO: &str = r"  ____ ___  ____ _____ _______  __
 / ___/ _ \|  _ \_   _| ____\ \/ /
| |  | | | | |_) || | |  _|  \  /
| |__| |_| |  _ < | | | |___ /  \
 \____\___/|_| \_\|_| |_____/_/\_\";

/// Brightness along a trail: 1.0 at the head fading to 0.2 at the tail.
pub fn trail_intensity(offset: usize, length: usize) -> f32 {
    if length == 0 {
        return 0.0;
    }
    1.0 - (offset as f32 / length as f32) * TAIL_FADE
}

/// Discrete color tier for a trail intensity.
pub fn intensity_color(intensity: f32) -> Rgb {
    if intensity > INTENSITY_HEAD_MIN {
        HEAD_COLOR
    } else if intensity > INTENSITY_BRIGHT_MIN {
        BRIGHT_COLOR
    } else if intensity > INTENSITY_MID_MIN {
        MID_COLOR
    } else {
        let green = (100.0 + intensity.clamp(0.0, 1.0) * 100.0) as u8;
        Rgb::new(0, green, 40)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    column: usize,
    head: f32,
    length: usize,
    speed: f32,
    lifetime: u32,
    glyphs: Vec<char>,
}

impl Stream {
    pub fn new(column: usize, head: f32, speed: f32, lifetime: u32, glyphs: Vec<char>) -> Self {
        Self {
            column,
            head,
            length: glyphs.len(),
            speed,
            lifetime,
            glyphs,
        }
    }

    fn spawn<R: Rng>(rng: &mut R, width: usize, height: usize, glyph_set: &[char]) -> Self {
        let mut stream = Self {
            column: 0,
            head: 0.0,
            length: 0,
            speed: MIN_STREAM_SPEED,
            lifetime: 0,
            glyphs: Vec::with_capacity(MAX_STREAM_LENGTH),
        };
        stream.respawn(rng, width, height, glyph_set);
        stream
    }

    /// Re-randomizes every attribute in place, reusing the glyph ring.
    fn respawn<R: Rng>(&mut self, rng: &mut R, width: usize, height: usize, glyph_set: &[char]) {
        self.length = rng.gen_range(MIN_STREAM_LENGTH..=MAX_STREAM_LENGTH);
        self.column = rng.gen_range(0..width.max(1));
        self.head = -(rng.gen_range(0..height.max(1)) as f32);
        self.speed = rng.gen_range(MIN_STREAM_SPEED..MAX_STREAM_SPEED);
        self.lifetime = rng.gen_range(MIN_STREAM_LIFETIME..=MAX_STREAM_LIFETIME);
        self.glyphs.clear();
        self.glyphs
            .extend((0..self.length).map(|_| random_glyph(rng, glyph_set)));
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn head(&self) -> f32 {
        self.head
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn lifetime(&self) -> u32 {
        self.lifetime
    }

    pub fn glyph(&self, offset: usize) -> char {
        if self.glyphs.is_empty() {
            return BLANK;
        }
        self.glyphs[offset % self.glyphs.len()]
    }

    fn is_spent(&self, height: usize) -> bool {
        self.lifetime == 0 || self.head > (height + self.length) as f32
    }

    /// Writes the trail into `buffer`, using intensity as the depth so that a
    /// brighter cell is never dimmed by a later, darker write.
    pub fn composite_into(&self, buffer: &mut FrameBuffer) -> usize {
        let Ok(column) = i32::try_from(self.column) else {
            return 0;
        };
        let head_row = self.head.floor() as i64;
        let mut written = 0;
        for offset in 0..self.length {
            let row = head_row - offset as i64;
            let Ok(row) = i32::try_from(row) else {
                continue;
            };
            let intensity = trail_intensity(offset, self.length);
            let tint = Tint::Fixed(intensity_color(intensity));
            if buffer.try_write(column, row, intensity, self.glyph(offset), tint) {
                written += 1;
            }
        }
        written
    }
}

fn random_glyph<R: Rng>(rng: &mut R, glyph_set: &[char]) -> char {
    if glyph_set.is_empty() {
        return '0';
    }
    glyph_set[rng.gen_range(0..glyph_set.len())]
}

/// Fixed text image centered once for the viewport it was built for.
#[derive(Debug, Clone)]
pub struct Overlay {
    lines: Vec<Vec<char>>,
    art_width: usize,
    offset_x: usize,
    offset_y: usize,
    enabled: bool,
}

impl Overlay {
    pub fn new(art: &str, width: usize, height: usize) -> Self {
        let lines = art
            .lines()
            .map(|line| line.chars().collect::<Vec<_>>())
            .collect::<Vec<_>>();
        let art_width = lines.iter().map(Vec::len).max().unwrap_or(0);
        let art_height = lines.len();
        let enabled = art_width > 0 && art_width <= width && art_height <= height;
        Self {
            lines,
            art_width,
            offset_x: width.saturating_sub(art_width) / 2,
            offset_y: height.saturating_sub(art_height) / 2,
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn offset(&self) -> (usize, usize) {
        (self.offset_x, self.offset_y)
    }

    pub fn art_width(&self) -> usize {
        self.art_width
    }

    /// Non-blank overlay glyph covering screen cell `(x, y)`, if any.
    pub fn glyph_at(&self, x: usize, y: usize) -> Option<char> {
        if !self.enabled {
            return None;
        }
        let line = self.lines.get(y.checked_sub(self.offset_y)?)?;
        let glyph = *line.get(x.checked_sub(self.offset_x)?)?;
        (glyph != BLANK && glyph != '\0').then_some(glyph)
    }

    /// Replaces revealed cells with overlay glyphs in the overlay color.
    pub fn apply(&self, buffer: &mut FrameBuffer, mask: &RevealMask) -> usize {
        if !self.enabled {
            return 0;
        }
        let mut written = 0;
        for (line_index, line) in self.lines.iter().enumerate() {
            let y = self.offset_y + line_index;
            for (column_index, glyph) in line.iter().enumerate() {
                let x = self.offset_x + column_index;
                if *glyph == BLANK || !mask.get(x, y) {
                    continue;
                }
                let (Ok(cx), Ok(cy)) = (i32::try_from(x), i32::try_from(y)) else {
                    continue;
                };
                if buffer.stamp_glyph(cx, cy, *glyph, Tint::Fixed(OVERLAY_COLOR)) {
                    written += 1;
                }
            }
        }
        written
    }
}

#[derive(Debug, Clone)]
pub struct CascadeOptions {
    pub density_percent: u32,
    pub fade_frames: u32,
    pub unicode: bool,
    pub seed: Option<u64>,
    pub logo: String,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            density_percent: 60,
            fade_frames: 90,
            unicode: true,
            seed: None,
            logo: DEFAULT_LOGO.to_owned(),
        }
    }
}

pub struct Cascade {
    width: usize,
    height: usize,
    options: CascadeOptions,
    glyph_set: Vec<char>,
    streams: Vec<Stream>,
    overlay: Overlay,
    mask: RevealMask,
    frame: u32,
    rng: SmallRng,
}

impl Cascade {
    pub fn new(width: usize, height: usize, options: CascadeOptions) -> Result<Self> {
        let mut rng = match options.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_entropy(),
        };
        let glyph_set = if options.unicode {
            UNICODE_GLYPHS.chars().collect::<Vec<_>>()
        } else {
            ASCII_GLYPHS.chars().collect::<Vec<_>>()
        };
        let streams = build_pool(&mut rng, width, height, options.density_percent, &glyph_set);
        Ok(Self {
            width,
            height,
            overlay: Overlay::new(&options.logo, width, height),
            mask: RevealMask::new(width, height)?,
            options,
            glyph_set,
            streams,
            frame: 0,
            rng,
        })
    }

    pub fn streams(&self) -> &[Stream] {
        &self.streams
    }

    pub fn mask(&self) -> &RevealMask {
        &self.mask
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Logo fade progress in `[0, 1]`, driven by the frame count.
    pub fn fade(&self) -> f32 {
        (self.frame as f32 / self.options.fade_frames.max(1) as f32).min(1.0)
    }

    /// Advances every stream, shimmers glyphs, respawns spent streams and
    /// rebuilds the reveal mask for the new fade fraction.
    pub fn update(&mut self) {
        self.frame = self.frame.saturating_add(1);
        for stream in &mut self.streams {
            stream.head += stream.speed;
            stream.lifetime = stream.lifetime.saturating_sub(1);

            if !stream.glyphs.is_empty() && self.rng.gen_bool(MUTATION_CHANCE) {
                let index = self.rng.gen_range(0..stream.glyphs.len());
                stream.glyphs[index] = random_glyph(&mut self.rng, &self.glyph_set);
            }

            if stream.is_spent(self.height) {
                stream.respawn(&mut self.rng, self.width, self.height, &self.glyph_set);
            }
        }
        let fade = self.fade();
        self.mask.recompute(fade);
    }

    /// Draws every stream, then lays revealed overlay cells on top.
    pub fn composite_into(&self, buffer: &mut FrameBuffer) {
        for stream in &self.streams {
            stream.composite_into(buffer);
        }
        self.overlay.apply(buffer, &self.mask);
    }

    /// Rebuilds the pool, mask and overlay placement for a new viewport.
    /// The frame counter (and so the fade) carries over.
    pub fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        let mask = RevealMask::new(width, height)?;
        self.width = width;
        self.height = height;
        self.streams = build_pool(
            &mut self.rng,
            width,
            height,
            self.options.density_percent,
            &self.glyph_set,
        );
        self.overlay = Overlay::new(&self.options.logo, width, height);
        self.mask = mask;
        let fade = self.fade();
        self.mask.recompute(fade);
        Ok(())
    }
}

fn build_pool<R: Rng>(
    rng: &mut R,
    width: usize,
    height: usize,
    density_percent: u32,
    glyph_set: &[char],
) -> Vec<Stream> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let count = width * density_percent.min(100) as usize / 100;
    (0..count)
        .map(|_| Stream::spawn(rng, width, height, glyph_set))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        intensity_color, trail_intensity, Cascade, CascadeOptions, Overlay, Stream, BRIGHT_COLOR,
        HEAD_COLOR, MAX_STREAM_LENGTH, MAX_STREAM_SPEED, MIN_STREAM_LENGTH, MIN_STREAM_SPEED,
        OVERLAY_COLOR,
    };
    use crate::frame_buffer::{FrameBuffer, Tint};
    use crate::reveal::RevealMask;

    fn seeded(width: usize, height: usize) -> Cascade {
        Cascade::new(
            width,
            height,
            CascadeOptions {
                seed: Some(42),
                ..CascadeOptions::default()
            },
        )
        .expect("cascade")
    }

    #[test]
    fn pool_size_follows_density() {
        assert_eq!(seeded(100, 30).streams().len(), 60);
        assert_eq!(seeded(1, 30).streams().len(), 0);
    }

    #[test]
    fn spawned_streams_respect_bounds() {
        let cascade = seeded(100, 30);
        for stream in cascade.streams() {
            assert!(stream.column() < 100);
            assert!(stream.head() <= 0.0);
            assert!((MIN_STREAM_LENGTH..=MAX_STREAM_LENGTH).contains(&stream.length()));
            assert!(stream.speed() >= MIN_STREAM_SPEED && stream.speed() < MAX_STREAM_SPEED);
        }
    }

    #[test]
    fn streams_respawn_and_stay_in_columns_over_time() {
        let mut cascade = seeded(80, 24);
        for _ in 0..400 {
            cascade.update();
            for stream in cascade.streams() {
                assert!(stream.column() < 80);
                assert!(stream.head() <= (24 + stream.length()) as f32 + MAX_STREAM_SPEED);
                assert!(stream.lifetime() > 0);
            }
        }
    }

    #[test]
    fn overlapping_trails_keep_the_brightest_intensity() {
        let head = Stream::new(3, 5.0, 0.5, 10, vec!['H'; 10]);
        // offset 5 of this trail lands on row 5 with intensity 0.6
        let tail = Stream::new(3, 10.0, 0.5, 10, vec!['t'; 10]);

        for order in [[&head, &tail], [&tail, &head]] {
            let mut buffer = FrameBuffer::new(8, 12).expect("buffer");
            for stream in order {
                stream.composite_into(&mut buffer);
            }
            assert_eq!(buffer.depth_at(3, 5), Some(1.0));
            assert_eq!(buffer.glyph_at(3, 5), Some('H'));
            assert_eq!(buffer.tint_at(3, 5), Some(Tint::Fixed(HEAD_COLOR)));
        }
    }

    #[test]
    fn trail_intensity_decreases_from_head_to_tail() {
        assert_eq!(trail_intensity(0, 10), 1.0);
        assert!(trail_intensity(9, 10) < trail_intensity(1, 10));
        assert!((trail_intensity(9, 10) - 0.28).abs() < 1e-6);
        assert_eq!(intensity_color(1.0), HEAD_COLOR);
        assert_eq!(intensity_color(0.6), BRIGHT_COLOR);
        assert_eq!(intensity_color(0.2).g, 120);
    }

    #[test]
    fn overlay_is_centered_and_disabled_when_oversized() {
        let overlay = Overlay::new("ab\ncd", 10, 6);
        assert_eq!(overlay.offset(), (4, 2));
        assert_eq!(overlay.glyph_at(4, 2), Some('a'));
        assert_eq!(overlay.glyph_at(5, 3), Some('d'));
        assert_eq!(overlay.glyph_at(6, 3), None);

        let oversized = Overlay::new("abcdef", 4, 4);
        assert!(!oversized.is_enabled());
        assert_eq!(oversized.glyph_at(0, 1), None);
    }

    #[test]
    fn fully_faded_overlay_replaces_cascade_cells() {
        let overlay = Overlay::new("X X", 5, 1);
        let mut mask = RevealMask::new(5, 1).expect("mask");
        let mut buffer = FrameBuffer::new(5, 1).expect("buffer");
        buffer.try_write(2, 0, 0.9, 'r', Tint::Plain);
        buffer.try_write(3, 0, 0.9, 'r', Tint::Plain);

        mask.recompute(0.0);
        assert_eq!(overlay.apply(&mut buffer, &mask), 0);

        mask.recompute(1.0);
        assert_eq!(overlay.apply(&mut buffer, &mask), 2);
        assert_eq!(buffer.plain_text(), " XrX ");
        assert_eq!(buffer.tint_at(1, 0), Some(Tint::Fixed(OVERLAY_COLOR)));
    }

    #[test]
    fn fade_reaches_one_after_fade_frames() {
        let mut cascade = seeded(100, 30);
        for _ in 0..90 {
            cascade.update();
        }
        assert_eq!(cascade.fade(), 1.0);
        assert_eq!(cascade.mask().revealed_count(), 100 * 30);

        let mut buffer = FrameBuffer::new(100, 30).expect("buffer");
        cascade.composite_into(&mut buffer);
        let (x, y) = cascade.overlay().offset();
        assert_eq!(buffer.glyph_at(x + 2, y), Some('_'));
    }

    #[test]
    fn resize_rebuilds_pool_and_recenters_overlay() {
        let mut cascade = seeded(100, 30);
        cascade.update();
        cascade.resize(70, 20).expect("resize");
        assert_eq!(cascade.streams().len(), 42);
        assert!(cascade.streams().iter().all(|stream| stream.column() < 70));
        assert_eq!(cascade.mask().width(), 70);
        assert_eq!(cascade.frame(), 1);
        let width = cascade.overlay().art_width();
        assert_eq!(cascade.overlay().offset().0, (70 - width) / 2);

        cascade.resize(10, 3).expect("resize");
        assert!(!cascade.overlay().is_enabled());
    }

    #[test]
    fn same_seed_gives_same_streams() {
        let mut first = seeded(90, 25);
        let mut second = seeded(90, 25);
        for _ in 0..50 {
            first.update();
            second.update();
        }
        assert_eq!(first.streams(), second.streams());
    }

    #[test]
    fn trailing_glyphs_shimmer_without_moving_the_stream() {
        let mut cascade = seeded(40, 12);
        for stream in &mut cascade.streams {
            stream.head = -1.0e6;
            stream.lifetime = u32::MAX;
        }
        let before = cascade
            .streams()
            .iter()
            .map(|stream| (stream.column(), stream.length(), stream.glyphs.clone()))
            .collect::<Vec<_>>();

        for _ in 0..200 {
            cascade.update();
        }

        let mut changed = 0;
        for (stream, (column, length, glyphs)) in cascade.streams().iter().zip(&before) {
            assert_eq!(stream.column(), *column);
            assert_eq!(stream.length(), *length);
            assert_eq!(stream.glyphs.len(), glyphs.len());
            if stream.glyphs != *glyphs {
                changed += 1;
            }
        }
        assert!(changed > 0, "no glyph changed in 200 updates");
    }
}
