use std::io::{self, Stdout, Write};
use std::panic;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    queue,
    style::{Print, ResetColor},
    terminal::{
        self, BeginSynchronizedUpdate, Clear, ClearType, DisableLineWrap, EnableLineWrap,
        EndSynchronizedUpdate, EnterAlternateScreen, LeaveAlternateScreen,
    },
};
use log::{debug, error, info};

use cortex_splash::{Completion, Key, Orchestrator, Palette, Rgb, SplashConfig, TerminalCaps};

const BUILD_LABEL: &str = match option_env!("CORTEX_SPLASH_BUILD") {
    Some(label) => label,
    None => "unknown",
};

#[derive(Debug, Parser)]
#[command(name = "cortex-splash")]
#[command(about = "Animated 3D ASCII intro: glyph cascade, rotating torus, closer card")]
#[command(version, long_version = BUILD_LABEL)]
struct Cli {
    /// YAML file with splash tunables.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Skip the animation and show only the closer card.
    #[arg(long)]
    reduced_motion: bool,
    /// Spin the torus until 'q' is pressed.
    #[arg(long)]
    donut: bool,
    /// cyber, rainbow or brand:#RRGGBB
    #[arg(long, default_value = "cyber")]
    palette: String,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    fps: Option<u32>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let palette = parse_palette(&cli.palette)?;

    let (width, height) = terminal::size().context("failed to query terminal size")?;
    let caps = TerminalCaps::detect(width, height);
    info!(
        "terminal {}x{}, color {}, unicode {}",
        caps.width,
        caps.height,
        caps.color_depth.label(),
        caps.unicode
    );

    let mut orchestrator = if cli.donut {
        Orchestrator::donut(caps, palette, config)
    } else {
        Orchestrator::new(caps, palette, config)
    };
    let completion = run_terminal(&mut orchestrator)?;

    if completion.suppress_future {
        eprintln!("suppress_future=true");
    }
    println!("{}", serde_json::to_string(&completion)?);
    Ok(())
}

fn build_config(cli: &Cli) -> Result<SplashConfig> {
    let mut config = match &cli.config {
        Some(path) => SplashConfig::load(path)?,
        None => SplashConfig::default(),
    };
    config.apply_env();
    if cli.reduced_motion {
        config.reduced_motion = true;
    }
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(fps) = cli.fps {
        config.target_fps = fps;
        config.slow_fps = config.slow_fps.min(fps);
    }
    config.validate().context("invalid command line overrides")?;
    Ok(config)
}

fn parse_palette(raw: &str) -> Result<Palette> {
    match raw {
        "cyber" => Ok(Palette::cyber()),
        "rainbow" => Ok(Palette::rainbow()),
        other => {
            let Some(hex) = other.strip_prefix("brand:") else {
                bail!("unknown palette '{other}' (expected cyber, rainbow or brand:#RRGGBB)");
            };
            let Some(color) = Rgb::parse_hex(hex) else {
                bail!("invalid brand color '{hex}' (expected #RRGGBB)");
            };
            Ok(Palette::brand(color))
        }
    }
}

fn run_terminal(orchestrator: &mut Orchestrator) -> Result<Completion> {
    let mut out = io::stdout();
    terminal::enable_raw_mode().context("failed to enable raw mode")?;
    let _cleanup = CleanupGuard;
    let _panics = PanicToLog::install();
    queue!(out, EnterAlternateScreen, DisableLineWrap, cursor::Hide)?;
    draw(&mut out, orchestrator)?;

    let mut next_tick = Instant::now() + orchestrator.next_tick_in();
    while !orchestrator.completion().done {
        let timeout = next_tick.saturating_duration_since(Instant::now());
        if event::poll(timeout).context("failed to poll terminal events")? {
            match event::read().context("failed to read terminal event")? {
                Event::Key(KeyEvent {
                    code,
                    modifiers,
                    kind,
                    ..
                }) => {
                    if kind != KeyEventKind::Press {
                        continue;
                    }
                    let key = if code == KeyCode::Char('c')
                        && modifiers.contains(KeyModifiers::CONTROL)
                    {
                        Key::Char('s')
                    } else {
                        map_key(code)
                    };
                    debug!("key {key:?}");
                    orchestrator.handle_key(key);
                }
                Event::Resize(width, height) => orchestrator.on_resize(width, height),
                _ => continue,
            }
            draw(&mut out, orchestrator)?;
            continue;
        }

        let interval = orchestrator.tick();
        draw(&mut out, orchestrator)?;
        next_tick = Instant::now() + interval;
    }
    Ok(orchestrator.completion())
}

fn map_key(code: KeyCode) -> Key {
    match code {
        KeyCode::Char(c) => Key::Char(c),
        KeyCode::Up => Key::Up,
        KeyCode::Down => Key::Down,
        KeyCode::Left => Key::Left,
        KeyCode::Right => Key::Right,
        KeyCode::Enter => Key::Enter,
        KeyCode::Esc => Key::Esc,
        _ => Key::Other,
    }
}

fn draw(out: &mut Stdout, orchestrator: &Orchestrator) -> Result<()> {
    let frame = orchestrator.render_frame();
    queue!(out, BeginSynchronizedUpdate)?;
    for (row, line) in frame.split('\n').enumerate() {
        let Ok(row) = u16::try_from(row) else {
            break;
        };
        queue!(
            out,
            cursor::MoveTo(0, row),
            Print(line),
            ResetColor,
            Clear(ClearType::UntilNewLine)
        )?;
    }
    queue!(out, Clear(ClearType::FromCursorDown), EndSynchronizedUpdate)?;
    out.flush()?;
    Ok(())
}

struct CleanupGuard;

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        let mut out = io::stdout();
        let _ = queue!(
            out,
            EndSynchronizedUpdate,
            ResetColor,
            cursor::Show,
            EnableLineWrap,
            LeaveAlternateScreen
        );
        let _ = out.flush();
        let _ = terminal::disable_raw_mode();
    }
}

/// Sends panic reports to the log instead of the raw-mode screen. Dropping it
/// puts the default hook back.
struct PanicToLog;

impl PanicToLog {
    fn install() -> Self {
        panic::set_hook(Box::new(|info| error!("panic during terminal session: {info}")));
        Self
    }
}

impl Drop for PanicToLog {
    fn drop(&mut self) {
        let _ = panic::take_hook();
    }
}
