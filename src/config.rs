use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::capability::{MIN_HEIGHT, MIN_WIDTH};

const MAX_FPS: u32 = 240;

/// Tunables for the intro sequence. Every field has a default, so an empty
/// YAML document is a valid config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplashConfig {
    pub target_fps: u32,
    pub slow_fps: u32,
    pub slow_frame_threshold_ms: u64,
    pub perf_window: usize,
    pub perf_min_samples: usize,
    pub cascade_secs: f32,
    pub geometry_secs: f32,
    pub closer_secs: f32,
    pub fallback_timeout_secs: f32,
    pub logo_fade_frames: u32,
    pub stream_density_percent: u32,
    pub min_width: u16,
    pub min_height: u16,
    pub seed: Option<u64>,
    pub reduced_motion: bool,
}

impl Default for SplashConfig {
    fn default() -> Self {
        Self {
            target_fps: 30,
            slow_fps: 15,
            slow_frame_threshold_ms: 50,
            perf_window: 30,
            perf_min_samples: 10,
            cascade_secs: 3.0,
            geometry_secs: 3.0,
            closer_secs: 2.0,
            fallback_timeout_secs: 3.0,
            logo_fade_frames: 90,
            stream_density_percent: 60,
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
            seed: None,
            reduced_motion: false,
        }
    }
}

/// Frame counts at which each act ends, counted from the first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActThresholds {
    pub cascade_end: u32,
    pub geometry_end: u32,
    pub closer_end: u32,
}

impl SplashConfig {
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(raw).map_err(|error| {
            let location = error
                .location()
                .map(|location| format!("line {}, column {}", location.line(), location.column()))
                .unwrap_or_else(|| "unknown location".to_owned());
            anyhow!("failed to parse splash config at {}: {}", location, error)
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read splash config {}", path.display()))?;
        Self::from_yaml_str(&contents)
            .with_context(|| format!("invalid splash config {}", path.display()))
    }

    /// Applies `PREFERS_REDUCED_MOTION=1` from the environment.
    pub fn apply_env(&mut self) {
        self.apply_env_lookup(|key| std::env::var(key).ok());
    }

    pub fn apply_env_lookup<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup("PREFERS_REDUCED_MOTION").as_deref() == Some("1") {
            self.reduced_motion = true;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_fps == 0 || self.target_fps > MAX_FPS {
            bail!("target_fps must be in 1..={MAX_FPS}, got {}", self.target_fps);
        }
        if self.slow_fps == 0 || self.slow_fps > self.target_fps {
            bail!(
                "slow_fps must be in 1..=target_fps ({}), got {}",
                self.target_fps,
                self.slow_fps
            );
        }
        for (label, seconds) in [
            ("cascade_secs", self.cascade_secs),
            ("geometry_secs", self.geometry_secs),
            ("closer_secs", self.closer_secs),
            ("fallback_timeout_secs", self.fallback_timeout_secs),
        ] {
            if !seconds.is_finite() || seconds <= 0.0 {
                bail!("{label} must be > 0, got {seconds}");
            }
        }
        if self.perf_window == 0 {
            bail!("perf_window must be > 0");
        }
        if self.perf_min_samples > self.perf_window {
            bail!(
                "perf_min_samples ({}) cannot exceed perf_window ({})",
                self.perf_min_samples,
                self.perf_window
            );
        }
        if self.logo_fade_frames == 0 {
            bail!("logo_fade_frames must be > 0");
        }
        if self.stream_density_percent > 100 {
            bail!(
                "stream_density_percent must be in 0..=100, got {}",
                self.stream_density_percent
            );
        }
        Ok(())
    }

    pub fn fast_interval(&self) -> Duration {
        interval_for_fps(self.target_fps)
    }

    pub fn slow_interval(&self) -> Duration {
        interval_for_fps(self.slow_fps)
    }

    pub fn slow_frame_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_frame_threshold_ms)
    }

    pub fn act_thresholds(&self) -> ActThresholds {
        let cascade_end = self.frames_for(self.cascade_secs);
        let geometry_end = cascade_end.saturating_add(self.frames_for(self.geometry_secs));
        let closer_end = geometry_end.saturating_add(self.frames_for(self.closer_secs));
        ActThresholds {
            cascade_end,
            geometry_end,
            closer_end,
        }
    }

    pub fn fallback_timeout_frames(&self) -> u32 {
        self.frames_for(self.fallback_timeout_secs)
    }

    fn frames_for(&self, seconds: f32) -> u32 {
        (seconds * self.target_fps as f32).round().max(1.0) as u32
    }
}

fn interval_for_fps(fps: u32) -> Duration {
    Duration::from_millis(1000 / u64::from(fps.max(1)))
}
