use anyhow::Result;

use crate::frame_buffer::{cell_count, filled_vec};

/// Fade progress below which nothing is revealed.
pub const REVEAL_START: f32 = 0.5;

const POSITION_SALT: u64 = 0x9E37_79B9_7F4A_7C15;
const UNIT_MANTISSA_BITS: u32 = 53;

/// Stable pseudo-random value in `[0, 1)` for a cell. Pure function of position.
pub fn cell_noise(x: usize, y: usize) -> f64 {
    let key = (x as u64) ^ ((y as u64) << 32) ^ POSITION_SALT;
    unit_from_hash(hash_u64(key))
}

/// Share of cells revealed at a given fade fraction.
pub fn reveal_threshold(fade: f32) -> f64 {
    let fade = f64::from(fade.clamp(0.0, 1.0));
    let start = f64::from(REVEAL_START);
    ((fade - start) / (1.0 - start)).max(0.0)
}

pub fn is_revealed(x: usize, y: usize, fade: f32) -> bool {
    cell_noise(x, y) < reveal_threshold(fade)
}

/// Per-cell reveal flags, rebuilt from scratch on every [`RevealMask::recompute`].
#[derive(Debug, Clone)]
pub struct RevealMask {
    width: usize,
    height: usize,
    cells: Vec<bool>,
}

impl RevealMask {
    pub fn new(width: usize, height: usize) -> Result<Self> {
        let cells = cell_count(width, height)?;
        Ok(Self {
            width,
            height,
            cells: filled_vec(cells, false)?,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn recompute(&mut self, fade: f32) {
        let threshold = reveal_threshold(fade);
        if threshold <= 0.0 {
            self.cells.fill(false);
            return;
        }
        for y in 0..self.height {
            let row = &mut self.cells[y * self.width..(y + 1) * self.width];
            for (x, cell) in row.iter_mut().enumerate() {
                *cell = cell_noise(x, y) < threshold;
            }
        }
    }

    pub fn get(&self, x: usize, y: usize) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.cells[y * self.width + x]
    }

    pub fn revealed_count(&self) -> usize {
        self.cells.iter().filter(|cell| **cell).count()
    }
}

fn unit_from_hash(hash: u64) -> f64 {
    (hash >> (64 - UNIT_MANTISSA_BITS)) as f64 / (1_u64 << UNIT_MANTISSA_BITS) as f64
}

fn hash_u64(mut value: u64) -> u64 {
    value ^= value >> 33;
    value = value.wrapping_mul(0xff51_afd7_ed55_8ccd);
    value ^= value >> 33;
    value = value.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    value ^= value >> 33;
    value
}

#[cfg(test)]
mod tests {
    use super::{cell_noise, is_revealed, RevealMask};

    #[test]
    fn full_fade_reveals_every_cell() {
        let mut mask = RevealMask::new(100, 30).expect("mask");
        mask.recompute(1.0);
        assert_eq!(mask.revealed_count(), 100 * 30);
    }

    #[test]
    fn first_half_of_fade_reveals_nothing() {
        let mut mask = RevealMask::new(40, 12).expect("mask");
        mask.recompute(0.5);
        assert_eq!(mask.revealed_count(), 0);
    }

    #[test]
    fn mask_is_a_pure_function_of_inputs() {
        let mut first = RevealMask::new(50, 20).expect("mask");
        let mut second = RevealMask::new(50, 20).expect("mask");
        first.recompute(0.9);
        first.recompute(0.7);
        second.recompute(0.7);
        for y in 0..20 {
            for x in 0..50 {
                assert_eq!(first.get(x, y), second.get(x, y));
                assert_eq!(first.get(x, y), is_revealed(x, y, 0.7));
            }
        }
    }

    #[test]
    fn reveal_grows_monotonically_with_fade() {
        let mut mask = RevealMask::new(60, 20).expect("mask");
        let mut previous = 0;
        for step in 10..=20 {
            mask.recompute(step as f32 / 20.0);
            let count = mask.revealed_count();
            assert!(count >= previous);
            previous = count;
        }
        mask.recompute(0.75);
        let half = mask.revealed_count() as f64 / (60.0 * 20.0);
        assert!((0.35..0.65).contains(&half), "{half}");
    }

    #[test]
    fn noise_is_in_unit_range_and_out_of_bounds_is_hidden() {
        for y in 0..64 {
            for x in 0..64 {
                let value = cell_noise(x, y);
                assert!((0.0..1.0).contains(&value));
            }
        }
        let mut mask = RevealMask::new(2, 2).expect("mask");
        mask.recompute(1.0);
        assert!(!mask.get(2, 0));
    }
}
