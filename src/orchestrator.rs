use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use serde::Serialize;

use crate::capability::TerminalCaps;
use crate::cascade::{Cascade, CascadeOptions, DEFAULT_LOGO};
use crate::config::{ActThresholds, SplashConfig};
use crate::frame_buffer::FrameBuffer;
use crate::geometry::TorusRenderer;
use crate::input::{Key, SequenceMatcher};
use crate::palette::Palette;
use crate::scenes;
use crate::schedule::TickScheduler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Act {
    /// Plain banner for terminals that cannot host the animation.
    Static,
    Cascade,
    Geometry,
    Closer,
    Done,
}

/// Signal polled by the host after every tick and key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Completion {
    pub done: bool,
    pub suppress_future: bool,
}

/// Buffers reused across frames; rebuilt only on resize.
struct Stage {
    buffer: FrameBuffer,
    torus: TorusRenderer,
    cascade: Cascade,
}

impl Stage {
    fn new(caps: &TerminalCaps, config: &SplashConfig) -> Result<Self> {
        let width = usize::from(caps.width);
        let height = usize::from(caps.height);
        let options = CascadeOptions {
            density_percent: config.stream_density_percent,
            fade_frames: config.logo_fade_frames,
            unicode: caps.unicode,
            seed: config.seed,
            logo: DEFAULT_LOGO.to_owned(),
        };
        Ok(Self {
            buffer: FrameBuffer::new(width, height)?,
            torus: TorusRenderer::new(width, height, caps.unicode),
            cascade: Cascade::new(width, height, options)?,
        })
    }

    fn resize(&mut self, width: usize, height: usize) -> Result<()> {
        self.buffer.resize(width, height)?;
        self.cascade.resize(width, height)?;
        self.torus.set_viewport(width, height);
        Ok(())
    }
}

/// Drives the intro acts from host ticks and key presses. Never returns an
/// error to the host: every failure finishes the sequence early.
pub struct Orchestrator {
    caps: TerminalCaps,
    config: SplashConfig,
    thresholds: ActThresholds,
    palette: Palette,
    act: Act,
    frame: u32,
    act_started: u32,
    stage: Option<Stage>,
    scheduler: TickScheduler,
    matcher: SequenceMatcher,
    next_tick: Duration,
    show_math: bool,
    donut: bool,
    completion: Completion,
}

impl Orchestrator {
    pub fn new(caps: TerminalCaps, palette: Palette, config: SplashConfig) -> Self {
        let mut orchestrator = Self::build(caps, palette, config);
        if orchestrator.act == Act::Static || orchestrator.completion.done {
            return orchestrator;
        }
        if orchestrator.config.reduced_motion {
            info!("reduced motion requested, showing closer only");
            let start = orchestrator.thresholds.geometry_end;
            orchestrator.frame = start;
            orchestrator.enter(Act::Closer);
            orchestrator.guarded(Self::draw_current);
        }
        orchestrator
    }

    /// Geometry act that runs until the user quits.
    pub fn donut(caps: TerminalCaps, palette: Palette, config: SplashConfig) -> Self {
        let mut orchestrator = Self::build(caps, palette, config);
        if orchestrator.act == Act::Static || orchestrator.completion.done {
            return orchestrator;
        }
        orchestrator.donut = true;
        orchestrator.enter(Act::Geometry);
        orchestrator
    }

    fn build(caps: TerminalCaps, palette: Palette, config: SplashConfig) -> Self {
        let mut orchestrator = Self {
            caps,
            thresholds: config.act_thresholds(),
            scheduler: TickScheduler::from_config(&config),
            next_tick: config.fast_interval(),
            config,
            palette,
            act: Act::Cascade,
            frame: 0,
            act_started: 0,
            stage: None,
            matcher: SequenceMatcher::alternate(),
            show_math: false,
            donut: false,
            completion: Completion::default(),
        };

        if !orchestrator.caps_sufficient() {
            info!(
                "terminal {}x{} ({}) cannot host the animation, using static banner",
                caps.width,
                caps.height,
                caps.color_depth.label()
            );
            orchestrator.act = Act::Static;
            return orchestrator;
        }

        match Stage::new(&orchestrator.caps, &orchestrator.config) {
            Ok(stage) => orchestrator.stage = Some(stage),
            Err(error) => {
                warn!("failed to allocate frame buffers, finishing early: {error:#}");
                orchestrator.finish(false);
            }
        }
        orchestrator
    }

    pub fn act(&self) -> Act {
        self.act
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn completion(&self) -> Completion {
        self.completion
    }

    pub fn next_tick_in(&self) -> Duration {
        self.next_tick
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn caps(&self) -> TerminalCaps {
        self.caps
    }

    pub fn thresholds(&self) -> ActThresholds {
        self.thresholds
    }

    pub fn is_showing_math(&self) -> bool {
        self.show_math
    }

    pub fn is_donut(&self) -> bool {
        self.donut
    }

    pub fn frame_buffer(&self) -> Option<&FrameBuffer> {
        self.stage.as_ref().map(|stage| &stage.buffer)
    }

    /// Runs one step of the active act and returns the delay before the next
    /// tick. While the equations page is up nothing advances.
    pub fn tick(&mut self) -> Duration {
        if self.completion.done || self.show_math {
            return self.next_tick;
        }

        let started = Instant::now();
        if !self.guarded(Self::step) {
            return self.next_tick;
        }
        self.next_tick = self.scheduler.record(started.elapsed());
        self.next_tick
    }

    pub fn handle_key(&mut self, key: Key) {
        if self.completion.done {
            return;
        }
        if self.act == Act::Static {
            self.finish(false);
            return;
        }
        if !self.donut && self.matcher.feed(key) {
            self.activate_rainbow();
            return;
        }

        match key {
            Key::Char('?') => {
                self.show_math = !self.show_math;
                debug!("equations page {}", if self.show_math { "shown" } else { "hidden" });
            }
            Key::Char('q' | 'Q' | 's' | 'S') if self.donut => self.finish(false),
            Key::Esc if self.donut => self.finish(false),
            Key::Char('s' | 'S') => self.finish(false),
            Key::Esc => self.finish(true),
            Key::Enter | Key::Char(' ') if self.act == Act::Closer => self.finish(false),
            _ => {}
        }
    }

    /// Reallocates buffers for the new size. A terminal that shrinks below the
    /// minimum drops to the static banner.
    pub fn on_resize(&mut self, width: u16, height: u16) {
        self.caps = self.caps.with_size(width, height);
        if self.completion.done || self.act == Act::Static {
            return;
        }
        if !self.caps_sufficient() {
            info!("terminal resized to {width}x{height}, below minimum, using static banner");
            self.stage = None;
            self.show_math = false;
            self.enter(Act::Static);
            return;
        }

        let resized = match self.stage.as_mut() {
            Some(stage) => stage.resize(usize::from(width), usize::from(height)),
            None => Err(anyhow!("no frame buffers to resize")),
        };
        match resized {
            Ok(()) => {
                debug!("reallocated frame buffers for {width}x{height}");
                if self.act == Act::Closer {
                    self.guarded(Self::draw_current);
                }
            }
            Err(error) => {
                warn!("resize to {width}x{height} failed, finishing early: {error:#}");
                self.finish(false);
            }
        }
    }

    /// Styled text for the current state. Pure; the host prints it.
    pub fn render_frame(&self) -> String {
        let width = usize::from(self.caps.width);
        let height = usize::from(self.caps.height);
        let depth = self.caps.color_depth;

        if self.show_math {
            return scenes::math_page(self.caps.unicode, depth);
        }
        if self.act == Act::Static {
            return scenes::fallback_text(width, height, self.caps.unicode);
        }
        if self.act == Act::Done {
            return String::new();
        }
        let Some(stage) = self.stage.as_ref() else {
            return String::new();
        };

        let hint = match self.act {
            _ if self.donut => Some(scenes::DONUT_HINT),
            Act::Cascade | Act::Geometry => Some(scenes::SKIP_HINT),
            _ => None,
        };
        let buffer = &stage.buffer;
        let mut footer = Vec::with_capacity(2);
        if self.sequence_in_progress() {
            footer.push(scenes::progress_line(depth));
        }
        if let Some(hint) = hint {
            footer.push(scenes::hint_line(hint, buffer.width(), depth));
        }

        let mut out = String::with_capacity(buffer.width() * buffer.height() * 4);
        if footer.is_empty() || footer.len() >= buffer.height() {
            buffer.snapshot_into(&self.palette, depth, buffer.height(), &mut out);
            return out;
        }
        buffer.snapshot_into(&self.palette, depth, buffer.height() - footer.len(), &mut out);
        for line in footer {
            out.push('\n');
            out.push_str(&line);
        }
        out
    }

    /// True while the first few keys of the alternate sequence are in.
    fn sequence_in_progress(&self) -> bool {
        !self.donut && (1..5).contains(&self.matcher.progress())
    }

    fn caps_sufficient(&self) -> bool {
        self.caps
            .is_sufficient(self.config.min_width, self.config.min_height)
    }

    fn step(&mut self) -> Result<()> {
        self.frame = self.frame.saturating_add(1);
        let act = self.act;
        if act != Act::Static {
            let stage = self
                .stage
                .as_mut()
                .ok_or_else(|| anyhow!("{act:?} act has no frame buffers"))?;
            if act == Act::Cascade {
                stage.cascade.update();
            }
        }
        self.draw_current()?;
        self.advance();
        Ok(())
    }

    fn draw_current(&mut self) -> Result<()> {
        let cycling = self.palette.is_cycling();
        let unicode = self.caps.unicode;
        let Some(stage) = self.stage.as_mut() else {
            return match self.act {
                Act::Static | Act::Done => Ok(()),
                act => Err(anyhow!("{act:?} act has no frame buffers")),
            };
        };
        match self.act {
            Act::Cascade => {
                stage.buffer.clear();
                stage.cascade.composite_into(&mut stage.buffer);
            }
            Act::Geometry => {
                stage.buffer.clear();
                stage.torus.compute_frame(&mut stage.buffer, cycling);
            }
            Act::Closer => {
                stage.buffer.clear();
                scenes::draw_closer(&mut stage.buffer, unicode);
            }
            Act::Static | Act::Done => {}
        }
        Ok(())
    }

    fn advance(&mut self) {
        if self.donut {
            return;
        }
        let elapsed = self.frame.saturating_sub(self.act_started);
        let next = match self.act {
            Act::Static if elapsed >= self.config.fallback_timeout_frames() => Act::Done,
            Act::Cascade if self.frame >= self.thresholds.cascade_end => Act::Geometry,
            Act::Geometry if self.frame >= self.thresholds.geometry_end => Act::Closer,
            Act::Closer if self.frame >= self.thresholds.closer_end => Act::Done,
            act => act,
        };
        if next != self.act {
            self.enter(next);
        }
    }

    fn enter(&mut self, act: Act) {
        debug!("act {:?} -> {:?} at frame {}", self.act, act, self.frame);
        self.act = act;
        self.act_started = self.frame;
        if act == Act::Done {
            self.completion.done = true;
        }
    }

    fn finish(&mut self, suppress_future: bool) {
        self.completion = Completion {
            done: true,
            suppress_future: self.completion.suppress_future || suppress_future,
        };
        self.show_math = false;
        if self.act != Act::Done {
            self.enter(Act::Done);
        }
    }

    fn activate_rainbow(&mut self) {
        if self.palette.is_cycling() {
            return;
        }
        info!("alternate sequence entered, switching {} palette to rainbow", self.palette.name());
        self.palette = Palette::rainbow();
    }

    /// Runs `step` so that neither an error nor a panic escapes; either one
    /// finishes the sequence. Returns whether the step succeeded.
    fn guarded<F>(&mut self, step: F) -> bool
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let act = self.act;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| step(self)));
        let failure = match outcome {
            Ok(Ok(())) => return true,
            Ok(Err(error)) => format!("{error:#}"),
            Err(payload) => panic_message(payload.as_ref()),
        };
        warn!("{act:?} act failed, finishing early: {failure}");
        self.finish(false);
        false
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panic: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panic: {message}")
    } else {
        "panic with non-string payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::bail;

    use super::{Act, Orchestrator};
    use crate::capability::TerminalCaps;
    use crate::color::{strip_ansi, ColorDepth};
    use crate::config::SplashConfig;
    use crate::input::{Key, ALTERNATE_SEQUENCE};
    use crate::palette::Palette;
    use crate::scenes::{DONUT_HINT, PROGRESS_HINT, SKIP_HINT, TITLE};

    fn caps(width: u16, height: u16) -> TerminalCaps {
        TerminalCaps::new(width, height, ColorDepth::TrueColor, true)
    }

    fn seeded() -> SplashConfig {
        SplashConfig {
            seed: Some(9),
            ..SplashConfig::default()
        }
    }

    fn run(orchestrator: &mut Orchestrator, ticks: u32) {
        for _ in 0..ticks {
            orchestrator.tick();
        }
    }

    #[test]
    fn step_error_finishes_without_suppressing() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        assert!(!orchestrator.guarded(|_| bail!("boom")));
        assert_eq!(orchestrator.act(), Act::Done);
        assert!(orchestrator.completion().done);
        assert!(!orchestrator.completion().suppress_future);
    }

    #[test]
    fn step_panic_is_contained() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        let contained = orchestrator.guarded(|_| panic!("render exploded"));
        assert!(!contained);
        assert!(orchestrator.completion().done);
        assert_eq!(orchestrator.render_frame(), "");
    }

    #[test]
    fn hint_occupies_last_row_during_animation() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        orchestrator.tick();
        let frame = strip_ansi(&orchestrator.render_frame());
        let rows = frame.split('\n').collect::<Vec<_>>();
        assert_eq!(rows.len(), 30);
        assert_eq!(rows[29].trim(), SKIP_HINT);
    }

    #[test]
    fn donut_mode_shows_its_own_hint_and_quits_on_q() {
        let mut orchestrator = Orchestrator::donut(caps(80, 24), Palette::cyber(), seeded());
        orchestrator.tick();
        assert!(strip_ansi(&orchestrator.render_frame()).ends_with(DONUT_HINT));
        orchestrator.handle_key(Key::Char('Q'));
        assert!(orchestrator.completion().done);
    }

    #[test]
    fn escape_in_donut_mode_does_not_suppress() {
        let mut orchestrator = Orchestrator::donut(caps(80, 24), Palette::cyber(), seeded());
        orchestrator.handle_key(Key::Esc);
        assert!(orchestrator.completion().done);
        assert!(!orchestrator.completion().suppress_future);
    }

    #[test]
    fn closer_completes_on_enter_but_not_on_other_keys() {
        let config = SplashConfig {
            reduced_motion: true,
            ..seeded()
        };
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), config);
        assert_eq!(orchestrator.act(), Act::Closer);
        assert!(strip_ansi(&orchestrator.render_frame()).contains(TITLE));

        orchestrator.handle_key(Key::Char('x'));
        assert!(!orchestrator.completion().done);
        orchestrator.handle_key(Key::Enter);
        assert!(orchestrator.completion().done);
    }

    #[test]
    fn alternate_sequence_swaps_palette_without_changing_act() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        run(&mut orchestrator, 5);
        for key in ALTERNATE_SEQUENCE {
            orchestrator.handle_key(key);
        }
        assert!(orchestrator.palette().is_cycling());
        assert_eq!(orchestrator.act(), Act::Cascade);
        assert!(!orchestrator.completion().done);
    }

    #[test]
    fn alternate_sequence_is_off_in_donut_mode() {
        let mut orchestrator = Orchestrator::donut(caps(80, 24), Palette::cyber(), seeded());
        orchestrator.tick();
        for key in &ALTERNATE_SEQUENCE[..3] {
            orchestrator.handle_key(*key);
        }
        assert!(!strip_ansi(&orchestrator.render_frame()).contains(PROGRESS_HINT));
        for key in &ALTERNATE_SEQUENCE[3..] {
            orchestrator.handle_key(*key);
        }
        assert!(!orchestrator.palette().is_cycling());
        assert!(!orchestrator.completion().done);
    }

    #[test]
    fn question_mark_mid_sequence_keeps_progress() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        orchestrator.tick();
        let (head, rest) = ALTERNATE_SEQUENCE.split_at(4);
        for key in head {
            orchestrator.handle_key(*key);
        }
        orchestrator.handle_key(Key::Char('?'));
        orchestrator.handle_key(Key::Char('?'));
        assert!(!orchestrator.is_showing_math());
        for key in rest {
            orchestrator.handle_key(*key);
        }
        assert!(orchestrator.palette().is_cycling());
    }

    #[test]
    fn uppercase_letters_do_not_finish_the_sequence() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        for key in &ALTERNATE_SEQUENCE[..8] {
            orchestrator.handle_key(*key);
        }
        orchestrator.handle_key(Key::Char('B'));
        orchestrator.handle_key(Key::Char('A'));
        assert!(!orchestrator.palette().is_cycling());
        assert!(!orchestrator.completion().done);
    }

    #[test]
    fn progress_marker_sits_above_the_hint_for_early_sequence_keys() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        orchestrator.tick();
        let rows_after = |orchestrator: &Orchestrator| {
            strip_ansi(&orchestrator.render_frame())
                .split('\n')
                .map(str::to_owned)
                .collect::<Vec<_>>()
        };

        orchestrator.handle_key(Key::Up);
        let rows = rows_after(&orchestrator);
        assert_eq!(rows.len(), 30);
        assert_eq!(rows[28], PROGRESS_HINT);
        assert_eq!(rows[29].trim(), SKIP_HINT);

        for key in &ALTERNATE_SEQUENCE[1..5] {
            orchestrator.handle_key(*key);
        }
        let rows = rows_after(&orchestrator);
        assert_eq!(rows.len(), 30);
        assert_ne!(rows[28], PROGRESS_HINT);
    }

    #[test]
    fn math_page_freezes_the_sequence() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        run(&mut orchestrator, 3);
        orchestrator.handle_key(Key::Char('?'));
        run(&mut orchestrator, 200);
        assert_eq!(orchestrator.frame(), 3);
        assert_eq!(orchestrator.act(), Act::Cascade);
        assert!(orchestrator.render_frame().contains("Press '?' again to return"));

        orchestrator.handle_key(Key::Char('?'));
        orchestrator.tick();
        assert_eq!(orchestrator.frame(), 4);
    }

    #[test]
    fn shrinking_below_minimum_drops_to_static_banner() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        run(&mut orchestrator, 100);
        assert_eq!(orchestrator.act(), Act::Geometry);

        orchestrator.on_resize(50, 15);
        assert_eq!(orchestrator.act(), Act::Static);
        assert!(orchestrator.frame_buffer().is_none());
        assert!(strip_ansi(&orchestrator.render_frame()).contains(TITLE));

        orchestrator.on_resize(100, 30);
        assert_eq!(orchestrator.act(), Act::Static);

        let timeout = orchestrator.config.fallback_timeout_frames();
        run(&mut orchestrator, timeout);
        assert!(orchestrator.completion().done);
    }

    #[test]
    fn resize_reallocates_the_stage() {
        let mut orchestrator = Orchestrator::new(caps(100, 30), Palette::cyber(), seeded());
        orchestrator.tick();
        orchestrator.on_resize(120, 40);
        let buffer = orchestrator.frame_buffer().expect("stage");
        assert_eq!((buffer.width(), buffer.height()), (120, 40));
        orchestrator.tick();
        assert_eq!(strip_ansi(&orchestrator.render_frame()).split('\n').count(), 40);
    }
}
