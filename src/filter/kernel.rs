//! Kernel table construction.
//!
//! The filter never touches a composite waveform at run time. Instead, for
//! every distinct input sample and every color-burst phase, this module
//! precomputes the RGB contribution that sample makes to each nearby output
//! pixel: luma/chroma separation, bandwidth limiting, artifact injection, and
//! decoder-matrix recombination are all baked into one table row. Processing
//! a frame is then just table lookups and additions.

use std::f32::consts::PI;

use super::setup::Setup;
use super::variant::ConsoleVariant;

/// Phase positions baked into each table row per burst phase.
pub(crate) const ALIGNMENT_COUNT: usize = 3;
/// Output pixels covered by one alignment's contribution span.
pub(crate) const RGB_KERNEL_SIZE: usize = 14;
/// Packed contributions per burst phase within a table row.
pub(crate) const BURST_SIZE: usize = ALIGNMENT_COUNT * RGB_KERNEL_SIZE;

const RESCALE_IN: i32 = 8;
const RESCALE_OUT: i32 = 7;
const KERNEL_HALF: i32 = 16;
const KERNEL_SIZE: i32 = KERNEL_HALF * 2 + 1;
const TAP_TABLE_LEN: usize = (RESCALE_OUT * KERNEL_SIZE * 2) as usize;

const RGB_BITS: u32 = 8;
const RGB_UNIT: i32 = 1 << RGB_BITS;
const RGB_OFFSET: f32 = (RGB_UNIT * 2) as f32 + 0.5;

const LUMA_CUTOFF: f32 = 0.2;
const ARTIFACTS_MID: f32 = 1.0;
const ARTIFACTS_MAX: f32 = ARTIFACTS_MID * 1.5;
const FRINGING_MID: f32 = 1.0;
const FRINGING_MAX: f32 = FRINGING_MID * 2.0;

/// NTSC standard YIQ-to-RGB decoder matrix, as I/Q pairs per output channel.
const DEFAULT_DECODER: [f32; 6] = [0.956, 0.621, -0.272, -0.647, -1.105, 1.702];

/// Three 10-bit channels packed at bits 21/11/1, leaving headroom between
/// fields so six contributions can be summed before a single clamp.
pub(crate) type PackedRgb = u64;

pub(crate) const RGB_BUILDER: PackedRgb = 1 << 21 | 1 << 11 | 1 << 1;
pub(crate) const RGB_BIAS: PackedRgb = RGB_UNIT as PackedRgb * 2 * RGB_BUILDER;
pub(crate) const CLAMP_MASK: PackedRgb = RGB_BUILDER * 3 / 2;
pub(crate) const CLAMP_ADD: PackedRgb = RGB_BUILDER * 0x101;

/// Compiled per-(sample, phase) convolution table.
///
/// Read-only once built; owned by the filter instance that compiled it.
pub(crate) struct KernelTable {
    variant: ConsoleVariant,
    row_len: usize,
    rows: Box<[PackedRgb]>,
}

impl KernelTable {
    /// Compile the table for a validated setup.
    pub(crate) fn build(setup: &Setup, variant: ConsoleVariant) -> Self {
        let burst_count = variant.burst_count();
        let row_len = burst_count * BURST_SIZE;
        let mut rows = vec![0 as PackedRgb; variant.entry_count() * row_len].into_boxed_slice();

        let gains = Gains::new(setup, variant);

        let gamma = setup.gamma as f32 * -0.5 + variant.gamma_bias();
        let mut gamma_factor = gamma.abs().powf(0.73);
        if gamma < 0.0 {
            gamma_factor = -gamma_factor;
        }

        let merge = merged_fields(setup, variant);

        for entry in 0..variant.entry_count() {
            let (mut y, mut i, mut q) = variant.entry_yiq(entry);

            y *= setup.contrast as f32 * 0.5 + 1.0;
            // half-LSB nudge keeps the quantized blanking level from ringing
            y += setup.brightness as f32 * 0.5 - 0.5 / 256.0;

            let (mut r, mut g, mut b) = yiq_to_rgb::<f32>(y, i, q, &DEFAULT_DECODER);
            r = (r * gamma_factor - gamma_factor) * r + r;
            g = (g * gamma_factor - gamma_factor) * g + g;
            b = (b * gamma_factor - gamma_factor) * b + b;
            (y, i, q) = rgb_to_yiq(r, g, b);

            i *= RGB_UNIT as f32;
            q *= RGB_UNIT as f32;
            y = y * RGB_UNIT as f32 + RGB_OFFSET;

            let (r, g, b) = yiq_to_rgb::<i32>(y, i, q, &gains.to_rgb);
            let target = pack_rgb(r, g, b.min(0x3e0));

            let row = &mut rows[entry * row_len..][..row_len];
            generate_row(&gains, y, i, q, burst_count, row);
            if merge {
                merge_field_kernels(row);
            }
            correct_dc(target, burst_count, row);
        }

        KernelTable {
            variant,
            row_len,
            rows,
        }
    }

    pub(crate) fn variant(&self) -> ConsoleVariant {
        self.variant
    }

    pub(crate) fn burst_count(&self) -> usize {
        self.variant.burst_count()
    }

    /// Contribution row for a raw input sample.
    pub(crate) fn row(&self, sample: u16) -> &[PackedRgb] {
        let entry = self.variant.table_index(sample);
        &self.rows[entry * self.row_len..][..self.row_len]
    }
}

/// Field merging is forced on when both artifact knobs are fully off: without
/// artifacts there is nothing left for alternating fields to cancel, and the
/// unmerged table would only add shimmer.
pub(crate) fn merged_fields(setup: &Setup, variant: ConsoleVariant) -> bool {
    if variant.burst_count() < 2 {
        return false;
    }
    if setup.artifacts <= -1.0 && setup.fringing <= -1.0 {
        return true;
    }
    setup.merge_fields
}

/// Per-setup gain state shared by every table row.
struct Gains {
    /// decoder matrix rotated by hue/saturation, 6 floats per burst phase
    to_rgb: Vec<f32>,
    artifacts: f32,
    fringing: f32,
    taps: [f32; TAP_TABLE_LEN],
}

impl Gains {
    fn new(setup: &Setup, variant: ConsoleVariant) -> Self {
        let mut artifacts = setup.artifacts as f32;
        if artifacts > 0.0 {
            artifacts *= ARTIFACTS_MAX - ARTIFACTS_MID;
        }
        artifacts = artifacts * ARTIFACTS_MID + ARTIFACTS_MID;

        let mut fringing = setup.fringing as f32;
        if fringing > 0.0 {
            fringing *= FRINGING_MAX - FRINGING_MID;
        }
        fringing = fringing * FRINGING_MID + FRINGING_MID;

        let hue = setup.hue as f32 * PI + variant.hue_offset_deg() * PI / 180.0;
        let sat = setup.saturation as f32 + 1.0;
        let mut s = hue.sin() * sat;
        let mut c = hue.cos() * sat;

        let burst_count = variant.burst_count();
        let mut to_rgb = Vec::with_capacity(burst_count * 6);
        for burst in 0..burst_count {
            for pair in DEFAULT_DECODER.chunks_exact(2) {
                let (i, q) = (pair[0], pair[1]);
                to_rgb.push(i * c - q * s);
                to_rgb.push(i * s + q * c);
            }
            if burst + 1 < burst_count {
                // 120 degrees per burst phase
                (s, c) = rotate_iq(s, c, 0.866025, -0.5);
            }
        }

        Gains {
            to_rgb,
            artifacts,
            fringing,
            taps: composite_taps(setup),
        }
    }
}

/// Synthesize the luma and chroma FIR kernels and interleave them across the
/// 8-to-7 rescale phases.
///
/// Luma response comes from a raised-cosine rolloff shaped by `sharpness`
/// (edge ringing) and `resolution` (cutoff frequency), windowed by a Blackman
/// window. Chroma is a gaussian whose width tracks `bleed`.
fn composite_taps(setup: &Setup) -> [f32; TAP_TABLE_LEN] {
    // chroma kernel occupies the lower half of the scratch, luma the upper
    let mut kernels = [0.0f32; KERNEL_SIZE as usize * 2];
    let luma_center = KERNEL_SIZE as usize * 3 / 2;

    let rolloff = 1.0 + setup.sharpness as f32 * 0.032;
    let maxh = 32.0;
    let pow_a_n = rolloff.powf(maxh);

    let mut to_angle = setup.resolution as f32 + 1.0;
    to_angle = PI / maxh * LUMA_CUTOFF * (to_angle * to_angle + 1.0);

    kernels[luma_center] = maxh;
    for i in 0..KERNEL_SIZE {
        let x = i - KERNEL_HALF;
        let angle = x as f32 * to_angle;
        // the rolloff sum degenerates at the center tap unless far from unity
        if x != 0 || pow_a_n > 1.056 || pow_a_n < 0.981 {
            let rolloff_cos_a = rolloff * angle.cos();
            let num = 1.0 - rolloff_cos_a - pow_a_n * (maxh * angle).cos()
                + pow_a_n * rolloff * ((maxh - 1.0) * angle).cos();
            let den = 1.0 - rolloff_cos_a - rolloff_cos_a + rolloff * rolloff;
            kernels[luma_center - KERNEL_HALF as usize + i as usize] = num / den - 0.5;
        }
    }

    let mut sum = 0.0;
    for i in 0..KERNEL_SIZE as usize {
        let x = PI * 2.0 / (KERNEL_HALF * 2) as f32 * i as f32;
        let blackman = 0.42 - 0.5 * x.cos() + 0.08 * (x * 2.0).cos();
        let idx = luma_center - KERNEL_HALF as usize + i;
        kernels[idx] *= blackman;
        sum += kernels[idx];
    }
    sum = 1.0 / sum;
    for i in 0..KERNEL_SIZE as usize {
        let idx = luma_center - KERNEL_HALF as usize + i;
        kernels[idx] *= sum;
        debug_assert!(kernels[idx].is_finite());
    }

    let cutoff_factor = -0.03125;
    let mut cutoff = setup.bleed as f32;
    if cutoff < 0.0 {
        // steepen the negative range so full bleed reduction stays usable
        cutoff *= cutoff;
        cutoff *= cutoff;
        cutoff *= cutoff;
        cutoff *= -30.0 / 0.65;
    }
    cutoff = cutoff_factor - 0.65 * cutoff_factor * cutoff;

    for i in -KERNEL_HALF..=KERNEL_HALF {
        kernels[(KERNEL_SIZE / 2 + i) as usize] = ((i * i) as f32 * cutoff).exp();
    }

    // normalize even and odd chroma taps separately; the burst alternates
    // sign every other sample, so each comb leg must sum to one
    for start in 0..2 {
        let mut sum = 0.0;
        for x in (start..KERNEL_SIZE as usize).step_by(2) {
            sum += kernels[x];
        }
        sum = 1.0 / sum;
        for x in (start..KERNEL_SIZE as usize).step_by(2) {
            kernels[x] *= sum;
            debug_assert!(kernels[x].is_finite());
        }
    }

    // spread both kernels across the rescale phases, carrying the remainder
    // so no energy is lost to the 8->7 resampling
    let mut taps = [0.0f32; TAP_TABLE_LEN];
    let mut weight = 1.0;
    let mut out_idx = 0;
    for _ in 0..RESCALE_OUT {
        let mut remain = 0.0;
        weight -= 1.0 / RESCALE_IN as f32;
        for kernel in kernels {
            let m = kernel * weight;
            taps[out_idx] = m + remain;
            out_idx += 1;
            remain = kernel - m;
        }
    }
    taps
}

/// Sub-pixel placement of one input pixel within the output chunk.
struct TapAlignment {
    offset: usize,
    negate: f32,
    window: [f32; 4],
}

const fn tap_offset(ntsc: i32, scaled: i32) -> (usize, f32) {
    let base = ntsc - scaled / RESCALE_OUT * RESCALE_IN;
    let phase = (scaled + RESCALE_OUT * 10) % RESCALE_OUT;
    let offset = KERNEL_SIZE / 2
        + base
        + (phase != 0) as i32
        + (RESCALE_OUT - phase) % RESCALE_OUT
        + KERNEL_SIZE * 2 * phase;
    // subcarrier sign at this pixel's position
    let negate = 1 - ((ntsc + 100) & 2);
    (offset as usize, negate as f32)
}

const fn alignment(ntsc: i32, scaled: i32, window: [f32; 4]) -> TapAlignment {
    let (offset, negate) = tap_offset(ntsc, scaled);
    TapAlignment {
        offset,
        negate,
        window,
    }
}

const ALIGNMENTS: [TapAlignment; ALIGNMENT_COUNT] = [
    alignment(-4, -9, [1.0, 1.0, 0.6667, 0.0]),
    alignment(-2, -7, [0.3333, 1.0, 1.0, 0.3333]),
    alignment(0, -5, [0.0, 0.6667, 1.0, 1.0]),
];

/// Fill one table row: for each burst phase and alignment, run the Y/I/Q
/// triple through the FIR taps with artifact and fringing cross-feed, decode
/// to RGB, and pack.
fn generate_row(gains: &Gains, y: f32, i: f32, q: f32, burst_count: usize, row: &mut [PackedRgb]) {
    let y = y - RGB_OFFSET;
    let (mut i, mut q) = (i, q);
    let mut out_idx = 0;

    for burst in 0..burst_count {
        let to_rgb = &gains.to_rgb[burst * 6..];

        for align in &ALIGNMENTS {
            // fringing: luma leaking into the chroma channel
            let yy = y * gains.fringing * align.negate;
            let ic0 = (i + yy) * align.window[0];
            let qc1 = (q + yy) * align.window[1];
            let ic2 = (i - yy) * align.window[2];
            let qc3 = (q - yy) * align.window[3];

            // artifacts: chroma leaking into the luma channel
            let factor = gains.artifacts * align.negate;
            let ii = i * factor;
            let yc0 = (y + ii) * align.window[0];
            let yc2 = (y - ii) * align.window[2];
            let qq = q * factor;
            let yc1 = (y + qq) * align.window[1];
            let yc3 = (y - qq) * align.window[3];

            let mut tap = align.offset;
            for _ in 0..RGB_KERNEL_SIZE {
                let k = &gains.taps[tap..];
                let fi = k[0] * ic0 + k[2] * ic2;
                let fq = k[1] * qc1 + k[3] * qc3;
                let ksz = KERNEL_SIZE as usize;
                let fy = k[ksz] * yc0
                    + k[ksz + 1] * yc1
                    + k[ksz + 2] * yc2
                    + k[ksz + 3] * yc3
                    + RGB_OFFSET;

                // walk the interleaved rescale phases
                if tap < ksz * 2 * (RESCALE_OUT as usize - 1) {
                    tap += ksz * 2 - 1;
                } else {
                    tap -= ksz * 2 * (RESCALE_OUT as usize - 1) + 2;
                }

                let (r, g, b) = yiq_to_rgb::<i32>(fy, fi, fq, to_rgb);
                row[out_idx] = pack_rgb(r, g, b).wrapping_sub(RGB_BIAS);
                out_idx += 1;
            }
        }

        if burst + 1 < burst_count {
            (i, q) = rotate_iq(i, q, -0.866025, -0.5);
        }
    }
}

/// Average each burst phase's contributions with the next phase's, pairwise
/// in packed form, emulating the eye's blend of two interlaced fields.
fn merge_field_kernels(row: &mut [PackedRgb]) {
    for idx in 0..BURST_SIZE {
        let p0 = row[idx].wrapping_add(RGB_BIAS);
        let p1 = row[idx + BURST_SIZE].wrapping_add(RGB_BIAS);
        let p2 = row[idx + BURST_SIZE * 2].wrapping_add(RGB_BIAS);

        row[idx] =
            ((p0.wrapping_add(p1) - ((p0 ^ p1) & RGB_BUILDER)) >> 1).wrapping_sub(RGB_BIAS);
        row[idx + BURST_SIZE] =
            ((p1.wrapping_add(p2) - ((p1 ^ p2) & RGB_BUILDER)) >> 1).wrapping_sub(RGB_BIAS);
        row[idx + BURST_SIZE * 2] =
            ((p2.wrapping_add(p0) - ((p2 ^ p0) & RGB_BUILDER)) >> 1).wrapping_sub(RGB_BIAS);
    }
}

/// Distribute quantization error so that the overlapping contributions for a
/// flat field sum exactly to the entry's color at every output position.
fn correct_dc(color: PackedRgb, burst_count: usize, row: &mut [PackedRgb]) {
    for burst in 0..burst_count {
        let block = &mut row[burst * BURST_SIZE..][..BURST_SIZE];
        for i in 0..RGB_KERNEL_SIZE / 2 {
            let error = color
                .wrapping_sub(block[i])
                .wrapping_sub(block[(i + 12) % 14 + 14])
                .wrapping_sub(block[(i + 10) % 14 + 28])
                .wrapping_sub(block[i + 7])
                .wrapping_sub(block[i + 5 + 14])
                .wrapping_sub(block[i + 3 + 28]);

            // a quarter to each of three partner taps, the rest to the main
            let mut fourth = error.wrapping_add(2 * RGB_BUILDER) >> 2;
            fourth &= (RGB_BIAS >> 1) - RGB_BUILDER;
            fourth = fourth.wrapping_sub(RGB_BIAS >> 2);
            block[i + 3 + 28] = block[i + 3 + 28].wrapping_add(fourth);
            block[i + 5 + 14] = block[i + 5 + 14].wrapping_add(fourth);
            block[i + 7] = block[i + 7].wrapping_add(fourth);
            block[i] = block[i].wrapping_add(error.wrapping_sub(fourth.wrapping_mul(3)));
        }
    }
}

fn rotate_iq(i: f32, q: f32, sin_b: f32, cos_b: f32) -> (f32, f32) {
    (i * cos_b - q * sin_b, i * sin_b + q * cos_b)
}

pub(crate) fn rgb_to_yiq(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    (
        r * 0.299 + g * 0.587 + b * 0.114,
        r * 0.596 - g * 0.275 - b * 0.321,
        r * 0.212 - g * 0.523 + b * 0.311,
    )
}

fn yiq_to_rgb<T: FromFloat>(y: f32, i: f32, q: f32, to_rgb: &[f32]) -> (T, T, T) {
    (
        T::from_f32(y + to_rgb[0] * i + to_rgb[1] * q),
        T::from_f32(y + to_rgb[2] * i + to_rgb[3] * q),
        T::from_f32(y + to_rgb[4] * i + to_rgb[5] * q),
    )
}

trait FromFloat {
    fn from_f32(value: f32) -> Self;
}

impl FromFloat for i32 {
    fn from_f32(value: f32) -> Self {
        value as i32
    }
}

impl FromFloat for f32 {
    fn from_f32(value: f32) -> Self {
        value
    }
}

fn pack_rgb(r: i32, g: i32, b: i32) -> PackedRgb {
    (r as PackedRgb) << 21 | (g as PackedRgb) << 11 | (b as PackedRgb) << 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::setup::Preset;

    #[test]
    fn clean_presets_force_field_merging() {
        for preset in [Preset::SVideo, Preset::Rgb] {
            let mut setup = Setup::preset(preset);
            setup.merge_fields = false;
            assert!(merged_fields(&setup, ConsoleVariant::Nes));
        }

        let mut setup = Setup::preset(Preset::Composite);
        setup.merge_fields = false;
        assert!(!merged_fields(&setup, ConsoleVariant::Nes));
        // single burst phase: nothing to merge
        assert!(!merged_fields(&Setup::default(), ConsoleVariant::Sms));
    }

    #[test]
    fn zero_saturation_kills_the_decoder_matrix() {
        let setup = Setup::preset(Preset::Monochrome);
        let gains = Gains::new(&setup, ConsoleVariant::Nes);
        for coeff in &gains.to_rgb {
            assert_eq!(*coeff, 0.0);
        }
    }

    #[test]
    fn taps_are_finite_for_extreme_settings() {
        for (sharpness, resolution, bleed) in
            [(-1.0, -1.0, -1.0), (1.0, 1.0, 1.0), (0.0, 0.0, 0.0)]
        {
            let mut setup = Setup::default();
            setup.sharpness = sharpness;
            setup.resolution = resolution;
            setup.bleed = bleed;
            let taps = composite_taps(&setup);
            assert!(taps.iter().all(|t| t.is_finite()));
        }
    }

    #[test]
    fn table_rows_have_per_variant_length() {
        let setup = Setup::default();
        let nes = KernelTable::build(&setup, ConsoleVariant::Nes);
        assert_eq!(nes.row(0x0f).len(), 3 * BURST_SIZE);

        let sms = KernelTable::build(&setup, ConsoleVariant::Sms);
        assert_eq!(sms.row(0).len(), BURST_SIZE);
    }
}
