//! Per-cursor encoder selection: run every applicable candidate encoding
//! and keep the one with the best bytes-per-pixel ratio.

use crate::marker;
use crate::raster::PixelSource;
use crate::{linear, lut, masked, newline, raw};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

const INITIAL_BEST: u32 = 1000;

/// Bytes emitted per pixel, in percent of the raw 3-byte-per-pixel
/// baseline. Lower is better; `bytes[0]` is always the chunk's pixel count.
fn ratio(bytes: &[u8]) -> u32 {
    let n = bytes[0] as u32;
    (bytes.len() as u32) * 100 / n / 3
}

/// Picks the best chunk encoding for the run starting at `(x, y)`.
///
/// NEWLINE is tried first and returned immediately when it applies — it is
/// unconditionally the best available encoding whenever a whole run of rows
/// matches the reference. Every other candidate is scored by [`ratio`] and
/// the lowest-ratio one wins, except MASKED's one quirk: a masked candidate
/// whose marker is MASK10/MASK32/MASK54/TRANSPARENT is accepted outright if
/// no earlier candidate was retained at all.
#[cfg(feature = "alloc")]
pub(crate) fn select<S: PixelSource>(current: &S, reference: &S, x: i32, y: i32) -> Vec<u8> {
    if let Ok(bytes) = newline::encode(current, reference, x, y) {
        return bytes;
    }

    let mut best: Option<Vec<u8>> = None;
    let mut best_ratio = INITIAL_BEST;

    for bits in [1u8, 2, 4] {
        if let Ok(bytes) = lut::encode(current, x, y, bits) {
            let r = ratio(&bytes);
            if r < best_ratio {
                best_ratio = r;
                best = Some(bytes);
            }
        }
    }

    if let Ok(bytes) = linear::encode(current, x, y) {
        let r = ratio(&bytes);
        if r < best_ratio {
            best_ratio = r;
            best = Some(bytes);
        }
    }

    for max_len in [4u8, 2, 1] {
        if let Ok(bytes) = raw::encode(current, x, y, max_len) {
            let r = ratio(&bytes);
            if r < best_ratio {
                best_ratio = r;
                best = Some(bytes);
            }
        }
    }

    if let Ok(bytes) = masked::encode(current, reference, x, y) {
        let r = ratio(&bytes);
        let tag = crate::low_nibble(bytes[1]);
        let cheap_marker = matches!(
            tag,
            marker::MASK10 | marker::MASK32 | marker::MASK54 | marker::TRANSPARENT
        );
        if (cheap_marker && best.is_none()) || r < best_ratio {
            best = Some(bytes);
        }
    }

    best.expect("length-1 RAW always succeeds and is tried last among equals")
}
