//! LUT1/LUT2/LUT4 chunks: small per-run palettes with packed indices.
//!
//! All three widths share one palette-construction routine and one decoder;
//! only the index width and the resulting marker byte differ.

use crate::bits::{BitReader, BitWriter};
use crate::geom::Point;
use crate::marker;
use crate::pixel::Pixel;
use crate::raster::{PixelSink, PixelSource};
use crate::{DecodeError, NotApplicable};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

const MAX_WINDOW: i32 = 128;

/// Returns the index width in bits for a LUT marker, or `None` if `tag` is
/// not one of LUT1/LUT2/LUT4.
pub(crate) fn bits_for_marker(tag: u8) -> Option<u8> {
    match tag {
        marker::LUT1 => Some(1),
        marker::LUT2 => Some(2),
        marker::LUT4 => Some(4),
        _ => None,
    }
}

fn marker_for_bits(bits: u8) -> u8 {
    match bits {
        1 => marker::LUT1,
        2 => marker::LUT2,
        4 => marker::LUT4,
        _ => unreachable!("lut bits must be 1, 2 or 4"),
    }
}

/// Builds a palette of up to `2^bits` entries by greedily inserting the
/// first pixel of each new look-alike cluster, in order, stopping as soon
/// as the palette is full.
#[cfg(feature = "alloc")]
fn build_palette(pixels: &[Pixel], bits: u8) -> Vec<Pixel> {
    let capacity = 1usize << bits;
    let mut palette = Vec::with_capacity(capacity);
    for &pixel in pixels {
        if palette.len() == capacity {
            break;
        }
        if !palette.iter().any(|entry: &Pixel| entry.looks_alike(&pixel)) {
            palette.push(pixel);
        }
    }
    palette
}

fn palette_index(palette: &[Pixel], pixel: Pixel) -> Option<u8> {
    palette.iter().position(|entry| entry.looks_alike(&pixel)).map(|i| i as u8)
}

/// Encodes a run of up to 128 pixels, clipped to the remaining row width,
/// using a `bits`-wide palette index per pixel. Stops early at the first
/// pixel that no palette entry covers.
#[cfg(feature = "alloc")]
pub(crate) fn encode<S: PixelSource>(
    source: &S,
    x0: i32,
    y: i32,
    bits: u8,
) -> Result<Vec<u8>, NotApplicable> {
    let bounds = source.bounds();
    let window = (bounds.max.x - x0).min(MAX_WINDOW);
    if window <= 0 {
        return Err(NotApplicable);
    }

    let pixels: Vec<Pixel> = (0..window).map(|i| source.at(x0 + i, y)).collect();
    let palette = build_palette(&pixels, bits);

    let mut n: usize = 0;
    for &pixel in &pixels {
        if palette_index(&palette, pixel).is_none() {
            break;
        }
        n += 1;
    }

    if n == 0 {
        return Err(NotApplicable);
    }

    let capacity = 1usize << bits;
    let mut bytes = Vec::with_capacity(2 + capacity * 3 + (n * bits as usize + 7) / 8);
    bytes.push(n as u8);
    bytes.push(marker_for_bits(bits));
    for i in 0..capacity {
        let entry = palette.get(i).copied().unwrap_or(Pixel::ZERO);
        bytes.push(entry.r);
        bytes.push(entry.g);
        bytes.push(entry.b);
    }

    let mut writer = BitWriter::new();
    for &pixel in &pixels[..n] {
        let index = palette_index(&palette, pixel).expect("already matched above");
        writer.write_bits(index, bits);
    }
    bytes.extend_from_slice(&writer.finish());

    Ok(bytes)
}

/// Decodes any of the three LUT markers: reads `n`, the `2^bits`-entry
/// palette, then `n` packed indices, and paints the looked-up pixels.
pub(crate) fn decode<K: PixelSink>(
    sink: &mut K,
    tag: u8,
    payload: &[u8],
    n: u8,
    x: i32,
    y: i32,
) -> Result<Point, DecodeError> {
    if n == 0 {
        return Err(DecodeError::MalformedPayload);
    }
    let bits = bits_for_marker(tag).ok_or(DecodeError::UnrecognizedMarker)?;
    let capacity = 1usize << bits;
    let palette_bytes = capacity * 3;
    if payload.len() < palette_bytes {
        return Err(DecodeError::ShortRead);
    }

    let mut palette = [Pixel::ZERO; 16];
    for i in 0..capacity {
        let base = i * 3;
        palette[i] = Pixel::new(payload[base], payload[base + 1], payload[base + 2]);
    }

    let n = n as usize;
    let packed = &payload[palette_bytes..];
    let needed_bytes = (n * bits as usize + 7) / 8;
    if packed.len() < needed_bytes {
        return Err(DecodeError::ShortRead);
    }

    let mut reader = BitReader::new(packed);
    for i in 0..n {
        let index = reader
            .read_bits(bits)
            .ok_or(DecodeError::MalformedPayload)? as usize;
        if index >= capacity {
            return Err(DecodeError::MalformedPayload);
        }
        sink.set(x + i as i32, y, palette[index]);
    }

    Ok(Point::new(x + n as i32, y))
}
