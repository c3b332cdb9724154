use serde::{Deserialize, Serialize};
use std::fmt;

use super::kernel::rgb_to_yiq;

/// Number of input pixels consumed per output chunk.
pub(crate) const IN_CHUNK: usize = 3;
/// Number of output pixels produced per chunk.
pub(crate) const OUT_CHUNK: usize = 7;

const HEIGHT: usize = 240;
const INPUT_WIDTH: usize = 256;

/// Selects which console's signal path the filter models.
///
/// The three consoles share one convolution engine; this descriptor supplies
/// the constants that differ between them: kernel table size, burst-phase
/// count, decoder calibration, and how a raw sample maps to Y/I/Q.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleVariant {
    /// Nintendo Entertainment System: 8-bit palette-index samples
    /// (64 colors x 8 emphasis states).
    Nes,
    /// Super Nintendo: 16-bit RGB565 samples.
    Snes,
    /// Sega Master System: 8-bit BGR222 palette samples.
    Sms,
}

impl ConsoleVariant {
    /// Number of visible scanlines.
    pub const fn height(self) -> usize {
        HEIGHT
    }

    /// Number of input samples per scanline.
    pub const fn input_width(self) -> usize {
        INPUT_WIDTH
    }

    /// Number of RGB output pixels per scanline.
    pub const fn output_width(self) -> usize {
        ((INPUT_WIDTH - 1) / IN_CHUNK + 1) * OUT_CHUNK
    }

    /// Number of color-burst phases the decoder cycles through.
    ///
    /// The SMS locks chroma to the burst, so it has a single phase and no
    /// per-scanline rotation.
    pub const fn burst_count(self) -> usize {
        match self {
            ConsoleVariant::Nes | ConsoleVariant::Snes => 3,
            ConsoleVariant::Sms => 1,
        }
    }

    /// Number of rows in the kernel table, one per distinct input sample.
    pub const fn entry_count(self) -> usize {
        match self {
            // 64 colors x 8 emphasis states
            ConsoleVariant::Nes => 512,
            // RGB565 quantized to 5-4-4 bits
            ConsoleVariant::Snes => 1 << 13,
            // 6-bit BGR222
            ConsoleVariant::Sms => 64,
        }
    }

    /// Calibration offset applied to the decoder hue, in degrees.
    ///
    /// Stock NES composite output is tinted roughly 15 degrees off the
    /// NTSC reference burst.
    pub(crate) fn hue_offset_deg(self) -> f32 {
        match self {
            ConsoleVariant::Nes => -15.0,
            ConsoleVariant::Snes | ConsoleVariant::Sms => 0.0,
        }
    }

    /// Baseline gamma correction folded into the neutral setting.
    pub(crate) fn gamma_bias(self) -> f32 {
        match self {
            ConsoleVariant::Nes => 0.1333,
            ConsoleVariant::Snes | ConsoleVariant::Sms => 0.0,
        }
    }

    /// Map a raw input sample to its kernel table row.
    pub(crate) fn table_index(self, sample: u16) -> usize {
        match self {
            ConsoleVariant::Nes => sample as usize & 0x1ff,
            ConsoleVariant::Snes => {
                let r = (sample >> 11) as usize;
                let g = (sample >> 5 & 0x3f) as usize;
                let b = (sample & 0x1f) as usize;
                r << 8 | (g >> 2) << 4 | b >> 1
            }
            ConsoleVariant::Sms => sample as usize & 0x3f,
        }
    }

    /// Decode a kernel table row index into baseband luma/chroma.
    pub(crate) fn entry_yiq(self, entry: usize) -> (f32, f32, f32) {
        match self {
            ConsoleVariant::Nes => nes_entry_yiq(entry),
            ConsoleVariant::Snes => {
                // 5-4-4 row index back to a representative RGB565 color
                let r5 = (entry >> 8) as u16;
                let g4 = (entry >> 4 & 0x0f) as u16;
                let b4 = (entry & 0x0f) as u16;
                let r = (r5 << 3 | r5 >> 2) as f32 / 255.0;
                let g = (g4 << 4 | g4) as f32 / 255.0;
                let b = (b4 << 4 | b4) as f32 / 255.0;
                rgb_to_yiq(r, g, b)
            }
            ConsoleVariant::Sms => {
                // --BBGGRR, two bits per channel
                let r = (entry & 0x03) as f32 / 3.0;
                let g = (entry >> 2 & 0x03) as f32 / 3.0;
                let b = (entry >> 4 & 0x03) as f32 / 3.0;
                rgb_to_yiq(r, g, b)
            }
        }
    }
}

impl fmt::Display for ConsoleVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nes => f.write_str("NES"),
            Self::Snes => f.write_str("SNES"),
            Self::Sms => f.write_str("SMS"),
        }
    }
}

/// NES colors are generated, not stored: each of the 64 palette entries is a
/// pair of voltage levels plus a phase angle, and the high three sample bits
/// select a color-emphasis tint that attenuates and re-tints the signal.
fn nes_entry_yiq(entry: usize) -> (f32, f32, f32) {
    const LO_LEVELS: [f32; 4] = [-0.12, 0.0, 0.31, 0.72];
    const HI_LEVELS: [f32; 4] = [0.40, 0.68, 1.0, 1.0];

    // sin/cos lookup for the 12 hue phases, 30 degrees apart
    const PHASES: [f32; 0x10 + 3] = [
        -1.0, -0.866025, -0.5, 0.0, 0.5, 0.866025, 1.0, 0.866025, 0.5, 0.0, -0.5, -0.866025,
        -1.0, -0.866025, -0.5, 0.0, 0.5, 0.866025, 1.0,
    ];
    let phase_sin = |color: usize| PHASES[color];
    let phase_cos = |color: usize| PHASES[color + 3];

    let level = entry >> 4 & 0x03;
    let mut lo = LO_LEVELS[level];
    let mut hi = HI_LEVELS[level];

    let color = entry & 0x0f;
    if color == 0 {
        lo = hi;
    } else if color == 0x0d {
        hi = lo;
    } else if color > 0x0d {
        hi = 0.0;
        lo = 0.0;
    }

    let sat = (hi - lo) * 0.5;
    let mut i = phase_sin(color) * sat;
    let mut q = phase_cos(color) * sat;
    let mut y = (hi + lo) * 0.5;

    let tint = entry >> 6 & 0x07;
    if tint != 0 && color <= 0x0d {
        const ATTEN_MUL: f32 = 0.79399;
        const ATTEN_SUB: f32 = 0.0782838;

        if tint == 7 {
            y = y * (ATTEN_MUL * 1.13) - ATTEN_SUB * 1.13;
        } else {
            const TINT_COLORS: [usize; 8] = [0, 6, 10, 8, 2, 4, 0, 0];
            let tint_color = TINT_COLORS[tint];
            let mut sat = hi * (0.5 - ATTEN_MUL * 0.5) + ATTEN_SUB * 0.5;
            y -= sat * 0.5;
            if tint >= 3 && tint != 4 {
                sat *= 0.6;
                y -= sat;
            }
            i += phase_sin(tint_color) * sat;
            q += phase_cos(tint_color) * sat;
        }
    }

    (y, i, q)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_dimensions() {
        for variant in [ConsoleVariant::Nes, ConsoleVariant::Snes, ConsoleVariant::Sms] {
            assert_eq!(variant.height(), 240);
            assert_eq!(variant.input_width(), 256);
            assert_eq!(variant.output_width(), 602);
        }
    }

    #[test]
    fn table_index_stays_in_bounds() {
        for variant in [ConsoleVariant::Nes, ConsoleVariant::Snes, ConsoleVariant::Sms] {
            for sample in [0u16, 1, 0x0f, 0xff, 0x1234, u16::MAX] {
                assert!(variant.table_index(sample) < variant.entry_count());
            }
        }
    }

    #[test]
    fn nes_black_has_no_chroma() {
        // 0x0d..0x0f collapse to the blanking level
        for entry in [0x0d, 0x0e, 0x0f] {
            let (y, i, q) = ConsoleVariant::Nes.entry_yiq(entry);
            assert_eq!(i, 0.0);
            assert_eq!(q, 0.0);
            assert!(y <= 0.0);
        }
    }

    #[test]
    fn snes_index_roundtrip_is_close() {
        // a reduced row's representative color must land back on that row
        for entry in [0usize, 0x1fff, 0x0aa5, 0x1234] {
            let r5 = (entry >> 8) as u16;
            let g4 = (entry >> 4 & 0x0f) as u16;
            let b4 = (entry & 0x0f) as u16;
            let sample = r5 << 11 | (g4 << 2 | g4 >> 2) << 5 | (b4 << 1 | b4 >> 3);
            assert_eq!(ConsoleVariant::Snes.table_index(sample), entry);
        }
    }
}
