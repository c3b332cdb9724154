//! The NTSC filter: setup compilation and frame processing.

mod blit;
mod kernel;
mod setup;
mod variant;

pub use setup::{Preset, Setup, SetupOverrides};
pub use variant::ConsoleVariant;

use image::RgbImage;
use tracing::{debug, trace};

use crate::error::{BufferError, Result, StateError};
use kernel::KernelTable;

/// NTSC composite-video filter for one console variant.
///
/// The filter owns its input and output buffers at the variant's fixed
/// dimensions. Typical use: fill [`input_mut`](NtscFilter::input_mut) (or call
/// [`load_input`](NtscFilter::load_input)), call
/// [`process`](NtscFilter::process), read [`output`](NtscFilter::output).
///
/// Parameter changes go through [`configure`](NtscFilter::configure), which
/// recompiles the kernel table; per-frame processing never recalculates
/// signal math.
///
/// ```
/// use retro_ntsc::{ConsoleVariant, NtscFilter, Preset, SetupOverrides};
///
/// let mut filter = NtscFilter::new(ConsoleVariant::Nes);
/// filter.configure(Some(Preset::SVideo), &SetupOverrides::default())?;
///
/// filter.input_mut().fill(0x0f); // NES black
/// filter.process()?;
/// assert_eq!(filter.output().len(), 240 * 602 * 3);
/// # Ok::<(), retro_ntsc::NtscError>(())
/// ```
pub struct NtscFilter {
    variant: ConsoleVariant,
    setup: Setup,
    kernel: Option<KernelTable>,
    input: Vec<u16>,
    output: Vec<u8>,
    flicker: bool,
    odd_field: bool,
}

impl NtscFilter {
    /// Create a filter with the composite preset already compiled.
    pub fn new(variant: ConsoleVariant) -> Self {
        let setup = Setup::default();
        let kernel = KernelTable::build(&setup, variant);
        Self::from_parts(variant, setup, Some(kernel))
    }

    /// Create a filter with no compiled kernel.
    ///
    /// [`process`](NtscFilter::process) fails with
    /// [`StateError::Unconfigured`] until [`configure`](NtscFilter::configure)
    /// succeeds once.
    pub fn unconfigured(variant: ConsoleVariant) -> Self {
        Self::from_parts(variant, Setup::default(), None)
    }

    /// Create a filter from an explicit setup.
    pub fn with_setup(variant: ConsoleVariant, setup: Setup) -> Result<Self> {
        setup.validate()?;
        let kernel = KernelTable::build(&setup, variant);
        Ok(Self::from_parts(variant, setup, Some(kernel)))
    }

    /// Build a filter from a loaded [`FilterConfig`](crate::FilterConfig).
    pub fn from_config(config: &crate::FilterConfig) -> Result<Self> {
        config.build()
    }

    fn from_parts(variant: ConsoleVariant, setup: Setup, kernel: Option<KernelTable>) -> Self {
        Self {
            variant,
            setup,
            kernel,
            input: vec![0; variant.height() * variant.input_width()],
            output: vec![0; variant.height() * variant.output_width() * 3],
            flicker: false,
            odd_field: false,
        }
    }

    /// Rebuild the kernel table from a preset baseline plus overrides.
    ///
    /// With `preset` set, the named baseline is taken and `overrides` are
    /// layered on top; with `None`, overrides apply to the current setup.
    /// On a validation error the previous setup and kernel stay active.
    pub fn configure(&mut self, preset: Option<Preset>, overrides: &SetupOverrides) -> Result<()> {
        let mut next = match preset {
            Some(preset) => Setup::preset(preset),
            None => self.setup,
        };
        next.apply(overrides);
        next.validate()?;

        debug!(variant = %self.variant, ?preset, "compiling kernel table");
        self.kernel = Some(KernelTable::build(&next, self.variant));
        self.setup = next;
        Ok(())
    }

    /// Render the input buffer into the output buffer.
    ///
    /// With flicker enabled, each call advances the field parity and starts
    /// the scanline burst rotation on the new field's phase, so unmerged
    /// artifacts shimmer frame to frame the way they do on a real set.
    pub fn process(&mut self) -> Result<()> {
        let kernel = self
            .kernel
            .as_ref()
            .ok_or(StateError::Unconfigured)?;

        if self.flicker {
            self.odd_field = !self.odd_field;
        }
        let phase = if self.flicker {
            self.odd_field as usize
        } else {
            0
        };

        trace!(variant = %self.variant, phase, "rendering frame");
        blit::blit_frame(kernel, &self.input, &mut self.output, phase);
        Ok(())
    }

    /// Copy a full frame of raw samples into the input buffer.
    pub fn load_input(&mut self, samples: &[u16]) -> Result<()> {
        if samples.len() != self.input.len() {
            return Err(BufferError::DimensionMismatch {
                expected: self.input.len(),
                got: samples.len(),
            }
            .into());
        }
        self.input.copy_from_slice(samples);
        Ok(())
    }

    /// Copy a full frame of byte-wide samples, as the 8-bit palette variants
    /// produce them, into the input buffer.
    pub fn load_input_bytes(&mut self, samples: &[u8]) -> Result<()> {
        if samples.len() != self.input.len() {
            return Err(BufferError::DimensionMismatch {
                expected: self.input.len(),
                got: samples.len(),
            }
            .into());
        }
        for (dst, src) in self.input.iter_mut().zip(samples) {
            *dst = *src as u16;
        }
        Ok(())
    }

    /// Raw input samples, row-major, `height() * input_width()` long.
    pub fn input(&self) -> &[u16] {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut [u16] {
        &mut self.input
    }

    /// Rendered RGB bytes, row-major, `height() * output_width() * 3` long.
    pub fn output(&self) -> &[u8] {
        &self.output
    }

    /// Rendered frame as an [`image::RgbImage`].
    pub fn output_frame(&self) -> RgbImage {
        let width = self.variant.output_width() as u32;
        let height = self.variant.height() as u32;
        // the output buffer is allocated once at exactly this size
        RgbImage::from_raw(width, height, self.output.clone())
            .expect("output buffer matches frame dimensions")
    }

    pub fn variant(&self) -> ConsoleVariant {
        self.variant
    }

    /// The setup the active kernel was compiled from.
    pub fn setup(&self) -> &Setup {
        &self.setup
    }

    pub fn is_configured(&self) -> bool {
        self.kernel.is_some()
    }

    /// Enable or disable field-parity alternation between frames.
    pub fn set_flicker(&mut self, flicker: bool) {
        self.flicker = flicker;
    }

    pub fn flicker(&self) -> bool {
        self.flicker
    }

    /// Parity of the field the last [`process`](NtscFilter::process) call
    /// rendered. Only advances while flicker is enabled.
    pub fn odd_field(&self) -> bool {
        self.odd_field
    }

    pub fn height(&self) -> usize {
        self.variant.height()
    }

    pub fn input_width(&self) -> usize {
        self.variant.input_width()
    }

    pub fn output_width(&self) -> usize {
        self.variant.output_width()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfigured_process_is_an_error() {
        let mut filter = NtscFilter::unconfigured(ConsoleVariant::Sms);
        assert!(!filter.is_configured());
        match filter.process() {
            Err(crate::NtscError::State(StateError::Unconfigured)) => {}
            other => panic!("expected Unconfigured, got {other:?}"),
        }

        filter
            .configure(Some(Preset::Composite), &SetupOverrides::default())
            .unwrap();
        assert!(filter.is_configured());
        filter.process().unwrap();
    }

    #[test]
    fn failed_configure_keeps_the_old_kernel() {
        let mut filter = NtscFilter::new(ConsoleVariant::Nes);
        filter.input_mut().fill(0x2a);
        filter.process().unwrap();
        let before = filter.output().to_vec();

        let bad = SetupOverrides {
            saturation: Some(2.0),
            ..Default::default()
        };
        assert!(filter.configure(None, &bad).is_err());
        assert_eq!(filter.setup(), &Setup::default());

        filter.process().unwrap();
        assert_eq!(filter.output(), &before[..]);
    }

    #[test]
    fn load_input_checks_dimensions() {
        let mut filter = NtscFilter::new(ConsoleVariant::Nes);
        let short = vec![0u16; 100];
        assert!(filter.load_input(&short).is_err());

        let bytes = vec![0x0fu8; filter.height() * filter.input_width()];
        filter.load_input_bytes(&bytes).unwrap();
        assert!(filter.input().iter().all(|&s| s == 0x0f));
    }

    #[test]
    fn field_parity_only_advances_with_flicker() {
        let mut filter = NtscFilter::new(ConsoleVariant::Nes);
        filter.process().unwrap();
        assert!(!filter.odd_field());

        filter.set_flicker(true);
        filter.process().unwrap();
        assert!(filter.odd_field());
        filter.process().unwrap();
        assert!(!filter.odd_field());
    }

    #[test]
    fn output_frame_has_variant_dimensions() {
        let mut filter = NtscFilter::new(ConsoleVariant::Snes);
        filter.process().unwrap();
        let frame = filter.output_frame();
        assert_eq!(frame.width(), 602);
        assert_eq!(frame.height(), 240);
    }
}
