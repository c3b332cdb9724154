//! Frame rendering against a compiled kernel table.
//!
//! Each output pixel is the sum of six precomputed contributions from the
//! input samples whose kernels overlap it: three current samples and the
//! three before them. The sums stay in packed form until a single bit-trick
//! clamp, then unpack straight into the RGB byte stream.

use super::kernel::{KernelTable, PackedRgb, BURST_SIZE, CLAMP_ADD, CLAMP_MASK};
use super::variant::IN_CHUNK;

/// Render a full frame.
///
/// `input` holds `height * input_width` raw samples row-major, `output`
/// receives `height * output_width * 3` RGB bytes. `start_burst` selects the
/// burst phase of the first scanline; callers alternate it between frames to
/// animate artifact flicker. Scanline edges repeat the first and last sample
/// of the row, so a flat field stays flat out to the borders.
pub(crate) fn blit_frame(table: &KernelTable, input: &[u16], output: &mut [u8], start_burst: usize) {
    let variant = table.variant();
    let in_width = variant.input_width();
    let out_width = variant.output_width();
    let burst_count = table.burst_count();
    let chunk_count = (in_width - 1) / IN_CHUNK;

    debug_assert_eq!(input.len(), variant.height() * in_width);
    debug_assert_eq!(output.len(), variant.height() * out_width * 3);

    let mut burst = start_burst % burst_count;
    let rows_in = input.chunks_exact(in_width);
    let rows_out = output.chunks_exact_mut(out_width * 3);

    for (row_in, row_out) in rows_in.zip(rows_out) {
        let first = row_in[0];
        let last = row_in[in_width - 1];
        let mut state = RowState::begin(table, burst, first);
        let mut out = row_out.iter_mut();

        let mut emit = |rgb: [u8; 3]| {
            for byte in rgb {
                // chunks_exact_mut guarantees the row holds every pixel
                if let Some(slot) = out.next() {
                    *slot = byte;
                }
            }
        };

        // Feeds and pixel reads must interleave: pixels 0-1 of a chunk still
        // draw on the previous chunk's lane 1 and 2 kernels, pixels 2-3 on
        // the previous lane 2.
        let mut chunk = |state: &mut RowState<'_>, s0: u16, s1: u16, s2: u16| {
            state.feed(0, s0);
            emit(state.pixel(0));
            emit(state.pixel(1));
            state.feed(1, s1);
            emit(state.pixel(2));
            emit(state.pixel(3));
            state.feed(2, s2);
            emit(state.pixel(4));
            emit(state.pixel(5));
            emit(state.pixel(6));
        };

        let mut samples = row_in[1..].iter().copied();
        for _ in 0..chunk_count {
            let s0 = samples.next().unwrap_or(last);
            let s1 = samples.next().unwrap_or(last);
            let s2 = samples.next().unwrap_or(last);
            chunk(&mut state, s0, s1, s2);
        }

        // trailing chunk: pad with the edge sample to flush the window
        chunk(&mut state, last, last, last);

        burst = (burst + 1) % burst_count;
    }
}

/// Sliding window of the six kernel slices feeding the current chunk.
struct RowState<'a> {
    table: &'a KernelTable,
    burst_offset: usize,
    current: [&'a [PackedRgb]; IN_CHUNK],
    previous: [&'a [PackedRgb]; IN_CHUNK],
}

impl<'a> RowState<'a> {
    fn begin(table: &'a KernelTable, burst: usize, first: u16) -> Self {
        let burst_offset = burst * BURST_SIZE;
        let edge = &table.row(first)[burst_offset..][..BURST_SIZE];
        RowState {
            table,
            burst_offset,
            current: [edge; IN_CHUNK],
            previous: [edge; IN_CHUNK],
        }
    }

    /// Shift a new sample into one lane of the window.
    fn feed(&mut self, lane: usize, sample: u16) {
        self.previous[lane] = self.current[lane];
        self.current[lane] = &self.table.row(sample)[self.burst_offset..][..BURST_SIZE];
    }

    /// Resolve output pixel `x` (0..7) of the current chunk.
    fn pixel(&self, x: usize) -> [u8; 3] {
        let raw = self.current[0][x]
            .wrapping_add(self.current[1][(x + 12) % 7 + 14])
            .wrapping_add(self.current[2][(x + 10) % 7 + 28])
            .wrapping_add(self.previous[0][(x + 7) % 14])
            .wrapping_add(self.previous[1][(x + 5) % 7 + 21])
            .wrapping_add(self.previous[2][(x + 3) % 7 + 35]);
        clamp_rgb(raw)
    }
}

/// Saturate all three packed channels at once: overflow and underflow both
/// show up in the guard bits above each field, which the mask turns into a
/// per-channel flood value.
fn clamp_rgb(mut raw: PackedRgb) -> [u8; 3] {
    let sub = raw >> 9 & CLAMP_MASK;
    let mut clamp = CLAMP_ADD - sub;
    raw |= clamp;
    clamp -= sub;
    raw &= clamp;

    [
        (raw >> 21) as u8,
        (raw >> 11) as u8,
        (raw >> 1) as u8,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::kernel::KernelTable;
    use crate::filter::setup::Setup;
    use crate::filter::variant::ConsoleVariant;

    fn render(variant: ConsoleVariant, sample: u16, burst: usize) -> Vec<u8> {
        let table = KernelTable::build(&Setup::default(), variant);
        let input = vec![sample; variant.height() * variant.input_width()];
        let mut output = vec![0u8; variant.height() * variant.output_width() * 3];
        blit_frame(&table, &input, &mut output, burst);
        output
    }

    #[test]
    fn flat_field_renders_flat() {
        // edge clamping keeps a uniform frame uniform, borders included
        let output = render(ConsoleVariant::Nes, 0x22, 0);
        let first: [u8; 3] = output[..3].try_into().unwrap();
        for pixel in output.chunks_exact(3) {
            assert_eq!(pixel, first);
        }
    }

    #[test]
    fn single_burst_variant_ignores_start_phase() {
        let a = render(ConsoleVariant::Sms, 0x15, 0);
        let b = render(ConsoleVariant::Sms, 0x15, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn clamp_floors_underflowed_accumulations() {
        // a fully underflowed sum floods every channel down to the field
        // floor of 1, not to midtones; the OR against the flood value keeps
        // bit 1 of each field set
        assert_eq!(clamp_rgb(0), [1, 1, 1]);
    }
}
