//! Color adapters between console pixel formats and 8-bit RGB.
//!
//! The filter consumes raw console samples; these helpers bridge to and from
//! plain RGB byte streams for callers that work in full color: the NES
//! palette decode/encode pair and the RGB565 packing the SNES path uses.

use crate::error::{BufferError, ColorError, Result};

/// Canonical NES master palette, 64 entries of 8-bit RGB.
///
/// Entries `0x0d..=0x0f` of each row group are blanking-level black; they
/// decode identically, so index round trips are only color-exact, not
/// index-exact.
pub const NES_PALETTE: [[u8; 3]; 64] = [
    [102, 102, 102],
    [0, 42, 136],
    [20, 18, 168],
    [59, 0, 164],
    [92, 0, 126],
    [110, 0, 64],
    [108, 7, 0],
    [87, 29, 0],
    [52, 53, 0],
    [12, 73, 0],
    [0, 82, 0],
    [0, 79, 8],
    [0, 64, 78],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [174, 174, 174],
    [21, 95, 218],
    [66, 64, 254],
    [118, 39, 255],
    [161, 27, 205],
    [184, 30, 124],
    [181, 50, 32],
    [153, 79, 0],
    [108, 110, 0],
    [56, 135, 0],
    [13, 148, 0],
    [0, 144, 50],
    [0, 124, 142],
    [0, 0, 0],
    [0, 0, 0],
    [0, 0, 0],
    [254, 254, 254],
    [100, 176, 254],
    [147, 144, 254],
    [199, 119, 254],
    [243, 106, 254],
    [254, 110, 205],
    [254, 130, 112],
    [235, 159, 35],
    [189, 191, 0],
    [137, 217, 0],
    [93, 229, 48],
    [69, 225, 130],
    [72, 206, 223],
    [79, 79, 79],
    [0, 0, 0],
    [0, 0, 0],
    [254, 254, 254],
    [193, 224, 254],
    [212, 211, 254],
    [233, 200, 254],
    [251, 195, 254],
    [254, 197, 235],
    [254, 205, 198],
    [247, 217, 166],
    [229, 230, 149],
    [208, 240, 151],
    [190, 245, 171],
    [180, 243, 205],
    [181, 236, 243],
    [184, 184, 184],
    [0, 0, 0],
    [0, 0, 0],
];

/// Decode NES palette indices to an RGB byte stream.
///
/// Only the low six bits of a sample index the palette; emphasis bits do not
/// belong in this path, so values above `0x3f` are an error.
pub fn nes_to_rgb(indices: &[u8]) -> Result<Vec<u8>> {
    let mut rgb = Vec::with_capacity(indices.len() * 3);
    for (position, &index) in indices.iter().enumerate() {
        if index as usize >= NES_PALETTE.len() {
            return Err(ColorError::IndexOutOfRange {
                position,
                value: index,
                limit: NES_PALETTE.len() as u8 - 1,
            }
            .into());
        }
        rgb.extend_from_slice(&NES_PALETTE[index as usize]);
    }
    Ok(rgb)
}

/// Encode an RGB byte stream to nearest-match NES palette indices.
///
/// Nearest is squared euclidean distance in RGB; ties go to the lowest index.
pub fn rgb_to_nes(rgb: &[u8]) -> Result<Vec<u8>> {
    if rgb.len() % 3 != 0 {
        return Err(BufferError::NotRgbTriples { len: rgb.len() }.into());
    }

    let mut indices = Vec::with_capacity(rgb.len() / 3);
    for pixel in rgb.chunks_exact(3) {
        let mut best = 0u8;
        let mut best_distance = u32::MAX;
        for (index, entry) in NES_PALETTE.iter().enumerate() {
            let distance: u32 = entry
                .iter()
                .zip(pixel)
                .map(|(&a, &b)| {
                    let d = a as i32 - b as i32;
                    (d * d) as u32
                })
                .sum();
            if distance < best_distance {
                best_distance = distance;
                best = index as u8;
            }
        }
        indices.push(best);
    }
    Ok(indices)
}

/// Pack an RGB byte stream into RGB565 samples, rounding each channel to the
/// nearest representable level.
pub fn pack_rgb565(rgb: &[u8]) -> Result<Vec<u16>> {
    if rgb.len() % 3 != 0 {
        return Err(BufferError::NotRgbTriples { len: rgb.len() }.into());
    }

    let scale = |value: u8, levels: u16| -> u16 {
        (value as u32 * levels as u32 + 127) as u16 / 255
    };

    Ok(rgb
        .chunks_exact(3)
        .map(|pixel| {
            let r = scale(pixel[0], 31);
            let g = scale(pixel[1], 63);
            let b = scale(pixel[2], 31);
            r << 11 | g << 5 | b
        })
        .collect())
}

/// Unpack RGB565 samples to an RGB byte stream, replicating high bits into
/// the low bits so full-scale stays full-scale.
pub fn unpack_rgb565(samples: &[u16]) -> Vec<u8> {
    let mut rgb = Vec::with_capacity(samples.len() * 3);
    for &sample in samples {
        let r = (sample >> 11) as u8;
        let g = (sample >> 5 & 0x3f) as u8;
        let b = (sample & 0x1f) as u8;
        rgb.push(r << 3 | r >> 2);
        rgb.push(g << 2 | g >> 4);
        rgb.push(b << 3 | b >> 2);
    }
    rgb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_round_trip_is_color_exact() {
        let indices: Vec<u8> = (0..64).collect();
        let rgb = nes_to_rgb(&indices).unwrap();
        let back = rgb_to_nes(&rgb).unwrap();
        // duplicate blacks make index equality impossible; colors must match
        for (&original, &recovered) in indices.iter().zip(&back) {
            assert_eq!(
                NES_PALETTE[original as usize],
                NES_PALETTE[recovered as usize]
            );
        }
    }

    #[test]
    fn ties_pick_the_lowest_index() {
        // pure black is held by entries 13, 14, 15 and others
        let indices = rgb_to_nes(&[0, 0, 0]).unwrap();
        assert_eq!(indices, [13]);
    }

    #[test]
    fn emphasis_bits_are_rejected() {
        match nes_to_rgb(&[0x00, 0x40]) {
            Err(crate::NtscError::Color(ColorError::IndexOutOfRange {
                position, value, ..
            })) => {
                assert_eq!(position, 1);
                assert_eq!(value, 0x40);
            }
            other => panic!("expected IndexOutOfRange, got {other:?}"),
        }
    }

    #[test]
    fn partial_triples_are_rejected() {
        assert!(rgb_to_nes(&[1, 2]).is_err());
        assert!(pack_rgb565(&[1, 2, 3, 4]).is_err());
    }

    #[test]
    fn rgb565_round_trip_error_is_bounded() {
        // every channel value, against a varied counterpart in the others
        for value in 0..=255u8 {
            let rgb = [value, value.wrapping_add(85), value.wrapping_mul(3)];
            let packed = pack_rgb565(&rgb).unwrap();
            let back = unpack_rgb565(&packed);
            assert!((back[0] as i16 - rgb[0] as i16).abs() <= 4);
            assert!((back[1] as i16 - rgb[1] as i16).abs() <= 2);
            assert!((back[2] as i16 - rgb[2] as i16).abs() <= 4);
        }
    }

    #[test]
    fn full_scale_stays_full_scale() {
        let packed = pack_rgb565(&[255, 255, 255]).unwrap();
        assert_eq!(packed, [0xffff]);
        assert_eq!(unpack_rgb565(&packed), [255, 255, 255]);
    }
}
