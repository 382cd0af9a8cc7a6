//! Rotating torus rendered into a [`FrameBuffer`] with a depth test.
//!
//! A torus point is the tube circle `(R + r·cos φ, r·sin φ)` swept around the
//! vertical axis by θ, rotated about the x axis by `A` and the z axis by `B`,
//! then pushed away from the viewer so perspective division stays well clear
//! of zero.

use std::f32::consts::{FRAC_1_SQRT_2, PI, TAU};

use crate::frame_buffer::{FrameBuffer, Tint};

pub const MAJOR_RADIUS: f32 = 2.0;
pub const MINOR_RADIUS: f32 = 1.0;
pub const VIEWER_DISTANCE: f32 = 5.0;
pub const RING_STEP: f32 = PI / 45.0;
pub const TUBE_STEP: f32 = PI / 150.0;
pub const ANGLE_A_STEP: f32 = 0.04;
pub const ANGLE_B_STEP: f32 = 0.02;

const REFERENCE_WIDTH: f32 = 80.0;
const REFERENCE_HEIGHT: f32 = 24.0;
const REFERENCE_SCALE_X: f32 = 30.0;
const REFERENCE_SCALE_Y: f32 = 15.0;

/// Every ramp glyph occupies exactly one terminal column.
pub const UNICODE_RAMP: [char; 8] = [' ', '.', '·', ':', '*', '◉', '◎', '●'];
pub const ASCII_RAMP: [char; 8] = [' ', '.', ':', '-', '=', '*', '#', '@'];

/// Light comes from above and from behind the viewer.
const LIGHT: Vec3 = Vec3::new(0.0, FRAC_1_SQRT_2, -FRAC_1_SQRT_2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn dot(self, other: Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }
}

/// Point on the unrotated torus. `theta` runs around the ring, `phi` around the tube.
pub fn torus_point(theta: f32, phi: f32) -> Vec3 {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    surface_point(sin_theta, cos_theta, sin_phi, cos_phi)
}

/// Unit surface normal of the unrotated torus at `(theta, phi)`.
pub fn torus_normal(theta: f32, phi: f32) -> Vec3 {
    let (sin_theta, cos_theta) = theta.sin_cos();
    let (sin_phi, cos_phi) = phi.sin_cos();
    surface_normal(sin_theta, cos_theta, sin_phi, cos_phi)
}

fn surface_point(sin_theta: f32, cos_theta: f32, sin_phi: f32, cos_phi: f32) -> Vec3 {
    let circle_x = MAJOR_RADIUS + MINOR_RADIUS * cos_phi;
    let circle_y = MINOR_RADIUS * sin_phi;
    Vec3::new(circle_x * cos_theta, circle_y, circle_x * sin_theta)
}

fn surface_normal(sin_theta: f32, cos_theta: f32, sin_phi: f32, cos_phi: f32) -> Vec3 {
    Vec3::new(cos_phi * cos_theta, sin_phi, cos_phi * sin_theta)
}

/// Rotation about x by `A` followed by rotation about z by `B`.
#[derive(Debug, Clone, Copy)]
pub struct Rotation {
    sin_a: f32,
    cos_a: f32,
    sin_b: f32,
    cos_b: f32,
}

impl Rotation {
    pub fn new(angle_a: f32, angle_b: f32) -> Self {
        let (sin_a, cos_a) = angle_a.sin_cos();
        let (sin_b, cos_b) = angle_b.sin_cos();
        Self {
            sin_a,
            cos_a,
            sin_b,
            cos_b,
        }
    }

    pub fn apply(&self, v: Vec3) -> Vec3 {
        let y = v.y * self.cos_a - v.z * self.sin_a;
        let z = v.y * self.sin_a + v.z * self.cos_a;
        Vec3::new(
            v.x * self.cos_b - y * self.sin_b,
            v.x * self.sin_b + y * self.cos_b,
            z,
        )
    }
}

pub fn rotate(v: Vec3, angle_a: f32, angle_b: f32) -> Vec3 {
    Rotation::new(angle_a, angle_b).apply(v)
}

/// Brightness of a rotated normal against the fixed light, in `[-1, 1]`.
pub fn luminance(rotated_normal: Vec3) -> f32 {
    rotated_normal.dot(LIGHT)
}

/// Splits `[-1, 1]` into `ramp_len` equal bins, so the brightest glyph owns
/// the top bin rather than only the exact value 1.0.
pub fn ramp_index(luminance: f32, ramp_len: usize) -> usize {
    if ramp_len == 0 {
        return 0;
    }
    let scaled = ((luminance + 1.0) / 2.0 * ramp_len as f32) as i64;
    scaled.clamp(0, ramp_len as i64 - 1) as usize
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedPoint {
    pub x: i32,
    pub y: i32,
    /// One over the post-offset depth; larger is closer.
    pub ooz: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub center_x: f32,
    pub center_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
}

impl Projection {
    /// Scales the reference 80x24 framing to the viewport, keeping the
    /// 2:1 cell aspect so the torus stays round.
    pub fn for_viewport(width: usize, height: usize) -> Self {
        let fit = (width as f32 / REFERENCE_WIDTH).min(height as f32 / REFERENCE_HEIGHT);
        Self {
            center_x: width as f32 * 0.5,
            center_y: height as f32 * 0.5,
            scale_x: REFERENCE_SCALE_X * fit,
            scale_y: REFERENCE_SCALE_Y * fit,
        }
    }

    pub fn project(&self, rotated: Vec3) -> ProjectedPoint {
        let z = rotated.z + VIEWER_DISTANCE;
        let ooz = 1.0 / z;
        ProjectedPoint {
            x: (self.center_x + self.scale_x * ooz * rotated.x).floor() as i32,
            y: (self.center_y - self.scale_y * ooz * rotated.y).floor() as i32,
            ooz,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TorusRenderer {
    angle_a: f32,
    angle_b: f32,
    projection: Projection,
    ramp: &'static [char; 8],
    ring_trig: Vec<(f32, f32)>,
    tube_trig: Vec<(f32, f32)>,
}

impl TorusRenderer {
    pub fn new(width: usize, height: usize, unicode: bool) -> Self {
        Self {
            angle_a: 0.0,
            angle_b: 0.0,
            projection: Projection::for_viewport(width, height),
            ramp: if unicode { &UNICODE_RAMP } else { &ASCII_RAMP },
            ring_trig: trig_table(RING_STEP),
            tube_trig: trig_table(TUBE_STEP),
        }
    }

    pub fn angles(&self) -> (f32, f32) {
        (self.angle_a, self.angle_b)
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_viewport(&mut self, width: usize, height: usize) {
        self.projection = Projection::for_viewport(width, height);
    }

    /// Draws the torus at the current angles, then advances both angles by
    /// their (different) per-frame steps. The buffer is not cleared here.
    /// `cycling` folds angle `A` into the color tone as well as `B`.
    pub fn compute_frame(&mut self, buffer: &mut FrameBuffer, cycling: bool) -> usize {
        let written = self.render_at(buffer, self.angle_a, self.angle_b, cycling);
        self.angle_a = (self.angle_a + ANGLE_A_STEP) % TAU;
        self.angle_b = (self.angle_b + ANGLE_B_STEP) % TAU;
        written
    }

    /// Draws the torus at the given angles. Returns how many samples won
    /// their depth test.
    pub fn render_at(
        &self,
        buffer: &mut FrameBuffer,
        angle_a: f32,
        angle_b: f32,
        cycling: bool,
    ) -> usize {
        let rotation = Rotation::new(angle_a, angle_b);
        let tone_phase = if cycling { angle_a + angle_b } else { angle_b };
        let center_x = self.projection.center_x;
        let center_y = self.projection.center_y;
        let mut written = 0;

        for &(sin_theta, cos_theta) in &self.ring_trig {
            for &(sin_phi, cos_phi) in &self.tube_trig {
                let point = rotation.apply(surface_point(sin_theta, cos_theta, sin_phi, cos_phi));
                let projected = self.projection.project(point);
                let normal = rotation.apply(surface_normal(sin_theta, cos_theta, sin_phi, cos_phi));
                let glyph = self.ramp[ramp_index(luminance(normal), self.ramp.len())];

                let angle = (projected.y as f32 - center_y).atan2(projected.x as f32 - center_x);
                let tint = Tint::Palette((angle + tone_phase) / TAU);
                if buffer.try_write(projected.x, projected.y, projected.ooz, glyph, tint) {
                    written += 1;
                }
            }
        }
        written
    }
}

fn trig_table(step: f32) -> Vec<(f32, f32)> {
    let count = (TAU / step).ceil() as usize;
    (0..count).map(|index| (index as f32 * step).sin_cos()).collect()
}
