//! LINEAR chunk: a straight-line ramp in RGB between two endpoint colors.
//!
//! Arithmetic is done in ×256 fixed point so both sides only need integer
//! division, matching how this encoding's source material treats colors as
//! slopes per pixel rather than floats.

use crate::geom::Point;
use crate::marker;
use crate::pixel::Pixel;
use crate::raster::{PixelSink, PixelSource};
use crate::{DecodeError, NotApplicable};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

const SLOPE_PROBE: i32 = 8;
const MAX_LENGTH: i32 = 240;

#[inline(always)]
fn fixed(channel: u8) -> i32 {
    (channel as i32) * 0x100
}

/// Encodes the longest run starting at `(x0, y)` that lies on a straight
/// RGB ramp from `base` (the pixel just left of the cursor, or black at row
/// start) to a slope sampled 8 pixels ahead. Not applicable when even the
/// first pixel misses the ramp (RAW-1 is the selector's fallback for that
/// case, not a degenerate length-1 LINEAR chunk).
#[cfg(feature = "alloc")]
pub(crate) fn encode<S: PixelSource>(source: &S, x0: i32, y: i32) -> Result<Vec<u8>, NotApplicable> {
    let bounds = source.bounds();
    if x0 >= bounds.max.x {
        return Err(NotApplicable);
    }

    let base = if x0 > bounds.min.x {
        source.at(x0 - 1, y)
    } else {
        Pixel::ZERO
    };

    let r0 = fixed(base.r);
    let g0 = fixed(base.g);
    let b0 = fixed(base.b);

    let probe = source.at(x0 + SLOPE_PROBE, y);
    let r_slope = (fixed(probe.r) - r0) / SLOPE_PROBE;
    let g_slope = (fixed(probe.g) - g0) / SLOPE_PROBE;
    let b_slope = (fixed(probe.b) - b0) / SLOPE_PROBE;

    let max_n = (bounds.max.x - x0).min(MAX_LENGTH);

    let mut n: i32 = 0;
    let mut endpoint = base;
    while n < max_n {
        let distance = (n + 1) as i32;
        let actual = source.at(x0 + n, y);
        let predicted = Pixel::new(
            ((r0 + r_slope * distance) / 0x100) as u8,
            ((g0 + g_slope * distance) / 0x100) as u8,
            ((b0 + b_slope * distance) / 0x100) as u8,
        );
        if !actual.looks_alike(&predicted) {
            break;
        }
        endpoint = actual;
        n += 1;
    }

    if n == 0 {
        return Err(NotApplicable);
    }

    let mut bytes = Vec::with_capacity(5);
    bytes.push(n as u8);
    bytes.push(marker::LINEAR);
    bytes.push(endpoint.r);
    bytes.push(endpoint.g);
    bytes.push(endpoint.b);
    Ok(bytes)
}

/// Decodes a LINEAR chunk whose tag byte and endpoint have already been
/// peeked. `base` is the last pixel painted before this chunk, or black at
/// row start. Returns the cursor advanced by `n`.
pub(crate) fn decode<K: PixelSink>(
    sink: &mut K,
    base: Pixel,
    endpoint: Pixel,
    n: u8,
    x: i32,
    y: i32,
) -> Result<Point, DecodeError> {
    let length = n as u32;
    if length == 0 {
        return Err(DecodeError::MalformedPayload);
    }

    let r0 = fixed(base.r) as u32;
    let g0 = fixed(base.g) as u32;
    let b0 = fixed(base.b) as u32;
    let r1 = fixed(endpoint.r) as u32;
    let g1 = fixed(endpoint.g) as u32;
    let b1 = fixed(endpoint.b) as u32;

    for i in 0..length {
        let weight_max = i + 1;
        let weight_min = length - i - 1;
        let pixel = Pixel::new(
            ((r0 * weight_min + r1 * weight_max) / length / 0x100) as u8,
            ((g0 * weight_min + g1 * weight_max) / length / 0x100) as u8,
            ((b0 * weight_min + b1 * weight_max) / length / 0x100) as u8,
        );
        sink.set(x + i as i32, y, pixel);
    }

    Ok(Point::new(x + length as i32, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterBuf;

    #[test]
    fn encodes_an_exact_ramp() {
        let pixels: Vec<Pixel> = (0..8).map(|i| Pixel::new(i * 16, i * 16, i * 16)).collect();
        let raster = RasterBuf::from_pixels(8, 1, &pixels);
        let bytes = encode(&raster, 0, 0).unwrap();
        assert_eq!(bytes[0], 8);
        assert_eq!(bytes[1], marker::LINEAR);
        assert_eq!(&bytes[2..5], &[112, 112, 112]);
    }

    #[test]
    fn not_applicable_when_first_pixel_misses_the_ramp() {
        let mut raster = RasterBuf::new(16, 1);
        raster.set(0, 0, Pixel::new(255, 0, 0));
        assert!(encode(&raster, 0, 0).is_err());
    }

    #[test]
    fn decode_length_one_collapses_to_endpoint() {
        let mut raster = RasterBuf::new(1, 1);
        let next = decode(&mut raster, Pixel::ZERO, Pixel::new(10, 20, 30), 1, 0, 0).unwrap();
        assert_eq!(next, Point::new(1, 0));
        assert_eq!(raster.at(0, 0), Pixel::new(10, 20, 30));
    }

    #[test]
    fn decode_interpolates_between_base_and_endpoint() {
        let mut raster = RasterBuf::new(8, 1);
        decode(&mut raster, Pixel::ZERO, Pixel::new(112, 112, 112), 8, 0, 0).unwrap();
        for i in 0..8 {
            let expected = (i as u8) * 16;
            let got = raster.at(i, 0);
            assert!(got.diff(&Pixel::new(expected, expected, expected)) < 12);
        }
    }
}
