//! RAW chunk: literal pixels, the selector's safety net.
//!
//! A length-1 RAW chunk can always encode whatever sits at the cursor, so
//! it is the one candidate guaranteed to succeed.

use crate::geom::Point;
use crate::marker;
use crate::raster::{PixelSink, PixelSource};
use crate::{DecodeError, NotApplicable};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Emits up to `max_len` literal pixels starting at `(x, y)`, stopping at
/// the row's end.
#[cfg(feature = "alloc")]
pub(crate) fn encode<S: PixelSource>(
    source: &S,
    x: i32,
    y: i32,
    max_len: u8,
) -> Result<Vec<u8>, NotApplicable> {
    let bounds = source.bounds();
    let row_remaining = bounds.max.x - x;
    if row_remaining <= 0 {
        return Err(NotApplicable);
    }
    let n = row_remaining.min(max_len as i32) as u8;
    if n == 0 {
        return Err(NotApplicable);
    }

    let mut bytes = Vec::with_capacity(2 + n as usize * 3);
    bytes.push(n);
    bytes.push(marker::RAW);
    for i in 0..n as i32 {
        let pixel = source.at(x + i, y);
        bytes.push(pixel.r);
        bytes.push(pixel.g);
        bytes.push(pixel.b);
    }
    Ok(bytes)
}

/// Decodes a RAW chunk's payload (`3n` literal bytes) and paints it into
/// `sink` starting at `(x, y)`. Returns the cursor advanced by `n`.
pub(crate) fn decode<K: PixelSink>(
    sink: &mut K,
    payload: &[u8],
    n: u8,
    x: i32,
    y: i32,
) -> Result<Point, DecodeError> {
    if n == 0 {
        return Err(DecodeError::MalformedPayload);
    }
    let n = n as usize;
    if payload.len() < n * 3 {
        return Err(DecodeError::ShortRead);
    }
    for i in 0..n {
        let base = i * 3;
        let pixel = crate::pixel::Pixel::new(payload[base], payload[base + 1], payload[base + 2]);
        sink.set(x + i as i32, y, pixel);
    }
    Ok(Point::new(x + n as i32, y))
}
