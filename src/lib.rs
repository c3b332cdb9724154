//! # retro-ntsc
//!
//! NTSC composite-video signal emulation for NES, SNES, and Sega Master
//! System frames: the chroma artifacts, fringing, bleed, and scanline shimmer
//! of a console plugged into a CRT over a composite cable.
//!
//! The expensive signal math happens once per parameter change, when a setup
//! is compiled into a kernel table covering every possible input sample.
//! Rendering a frame is then pure table lookups: each 256-sample scanline
//! becomes 602 RGB pixels, at NES/SNES/SMS's shared 240-line frame height.
//!
//! ## Quick start
//!
//! ```
//! use retro_ntsc::{ConsoleVariant, NtscFilter, Preset, SetupOverrides};
//!
//! let mut filter = NtscFilter::new(ConsoleVariant::Nes);
//!
//! // composite is the default; switch baselines or nudge single knobs
//! let warmer = SetupOverrides {
//!     hue: Some(0.05),
//!     ..Default::default()
//! };
//! filter.configure(Some(Preset::SVideo), &warmer)?;
//!
//! // NES input is one palette sample per pixel (low 6 bits color,
//! // high 3 bits emphasis)
//! filter.input_mut().fill(0x21);
//! filter.process()?;
//!
//! let rgb = filter.output(); // 240 * 602 * 3 bytes
//! assert_eq!(rgb.len(), 240 * 602 * 3);
//! # Ok::<(), retro_ntsc::NtscError>(())
//! ```
//!
//! ## Modules
//!
//! - [`filter`] - the filter itself: variants, setups, presets, processing
//! - [`color`] - NES palette and RGB565 adapters for RGB callers
//! - [`config`] - TOML-backed filter configuration
//! - [`error`] - error types

pub mod color;
pub mod config;
pub mod error;
pub mod filter;

pub use config::FilterConfig;
pub use error::{NtscError, Result};
pub use filter::{ConsoleVariant, NtscFilter, Preset, Setup, SetupOverrides};
