use std::f32::consts::TAU;

use anyhow::{bail, Result};

use crate::color::{lerp_rgb, Rgb};

pub const CYAN: Rgb = Rgb::new(0, 255, 255);
pub const MAGENTA: Rgb = Rgb::new(255, 0, 255);

const RAINBOW_STOPS: [Rgb; 7] = [
    Rgb::new(255, 0, 0),
    Rgb::new(255, 165, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(0, 127, 255),
    Rgb::new(139, 0, 255),
    Rgb::new(255, 0, 0),
];

const BRAND_BRIGHTEN: f32 = 1.5;

/// Ordered color stops sampled by a scalar in `[0, 1)`.
///
/// The palette never changes while it is in use; the orchestrator swaps
/// the whole value when the host or the alternate input sequence asks for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    name: String,
    stops: Vec<Rgb>,
    cycling: bool,
}

impl Palette {
    pub fn from_stops(name: impl Into<String>, stops: Vec<Rgb>) -> Result<Self> {
        if stops.is_empty() {
            bail!("palette needs at least one color stop");
        }
        Ok(Self {
            name: name.into(),
            stops,
            cycling: false,
        })
    }

    /// Cyan to magenta, the default look of the rotating geometry.
    pub fn cyber() -> Self {
        Self {
            name: "cyber".to_owned(),
            stops: vec![CYAN, MAGENTA],
            cycling: false,
        }
    }

    /// Full hue wheel; also advances with both rotation angles.
    pub fn rainbow() -> Self {
        Self {
            name: "rainbow".to_owned(),
            stops: RAINBOW_STOPS.to_vec(),
            cycling: true,
        }
    }

    /// Brand color fading into a brighter version of itself.
    pub fn brand(color: Rgb) -> Self {
        Self {
            name: "brand".to_owned(),
            stops: vec![color, color.scaled(BRAND_BRIGHTEN)],
            cycling: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stops(&self) -> &[Rgb] {
        &self.stops
    }

    pub fn is_cycling(&self) -> bool {
        self.cycling
    }

    /// Samples the palette. `t` wraps, so any real value is accepted.
    pub fn sample(&self, t: f32) -> Rgb {
        let t = wrap_unit(t);
        match self.stops.len() {
            0 => Rgb::new(255, 255, 255),
            1 => self.stops[0],
            len => {
                let scaled = t * (len - 1) as f32;
                let index = (scaled.floor() as usize).min(len - 2);
                lerp_rgb(self.stops[index], self.stops[index + 1], scaled - index as f32)
            }
        }
    }

    /// Samples by angle in radians; one full turn covers the palette once.
    pub fn sample_angle(&self, angle: f32) -> Rgb {
        self.sample(angle / TAU)
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::cyber()
    }
}

fn wrap_unit(t: f32) -> f32 {
    if !t.is_finite() {
        return 0.0;
    }
    let wrapped = t.rem_euclid(1.0);
    // rem_euclid can round up to exactly 1.0 for tiny negative inputs
    if wrapped >= 1.0 {
        0.0
    } else {
        wrapped
    }
}
