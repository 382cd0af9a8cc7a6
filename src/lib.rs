//! Animated 3D ASCII intro sequence for terminal applications.
//!
//! The [`Orchestrator`] owns every buffer and is driven by the host: call
//! [`Orchestrator::tick`] on the interval it returns, forward key presses and
//! resizes, and print [`Orchestrator::render_frame`] after each.

pub mod capability;
pub mod cascade;
pub mod color;
pub mod config;
pub mod frame_buffer;
pub mod geometry;
pub mod input;
pub mod orchestrator;
pub mod palette;
pub mod reveal;
pub mod scenes;
pub mod schedule;

pub use capability::TerminalCaps;
pub use color::{ColorDepth, Rgb};
pub use config::SplashConfig;
pub use frame_buffer::FrameBuffer;
pub use input::Key;
pub use orchestrator::{Act, Completion, Orchestrator};
pub use palette::Palette;
