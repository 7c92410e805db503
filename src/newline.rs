//! NEWLINE chunk: copy whole rows from the reference frame, or — when the
//! cursor has already reached the row's right edge through other chunks —
//! act as a pure row-wrap signal that paints nothing.
//!
//! This is the cheapest possible chunk (two bytes for an entire row run)
//! and the selector short-circuits on it: when it applies, nothing else is
//! worth trying.

use crate::geom::Point;
use crate::marker;
use crate::raster::PixelSource;
use crate::{cold, likely, DecodeError, NotApplicable};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// At a true row start (`x == bounds.min.x`), encodes the largest run of
/// whole rows, starting at `y`, that are pixel-identical to the reference
/// over the full row width. At the row's right edge (`x >= bounds.max.x`),
/// emits the row-wrap sentinel `[1, NEWLINE]` unconditionally — the row
/// itself was already finished by whatever chunk landed the cursor here, so
/// this costs two bytes purely to carry the cursor to the next row. Not
/// applicable anywhere else in the row.
#[cfg(feature = "alloc")]
pub(crate) fn encode<S: PixelSource>(
    current: &S,
    reference: &S,
    x: i32,
    y: i32,
) -> Result<Vec<u8>, NotApplicable> {
    let bounds = current.bounds();
    let min_x = bounds.min.x;
    let max_x = bounds.max.x;

    if x >= max_x {
        return Ok(alloc::vec![1, marker::NEWLINE]);
    }
    if x != min_x {
        return Err(NotApplicable);
    }

    let max_y = bounds.max.y;
    let mut n: i32 = 0;
    'rows: while y + n < max_y && n < 255 {
        let row = y + n;
        let mut cx = min_x;
        while cx < max_x {
            if !likely(current.at(cx, row) == reference.at(cx, row)) {
                cold();
                break 'rows;
            }
            cx += 1;
        }
        n += 1;
    }

    if n == 0 {
        return Err(NotApplicable);
    }

    let mut bytes = Vec::with_capacity(2);
    bytes.push(n as u8);
    bytes.push(marker::NEWLINE);
    Ok(bytes)
}

/// Decodes a NEWLINE chunk whose tag byte has already been peeked. If the
/// cursor is already at the row's right edge this is the row-wrap sentinel:
/// the declared count is ignored and the cursor simply moves to
/// `(min.x, y+1)` without painting anything (the row was already complete).
/// Otherwise copies `n` whole rows from `reference` into `current` and
/// returns the cursor at `(min.x, y+n)`, clipped to the frame's bottom edge.
pub(crate) fn decode<K, S>(
    current: &mut K,
    reference: &S,
    n: u8,
    x: i32,
    y: i32,
) -> Result<Point, DecodeError>
where
    K: PixelSource + crate::raster::PixelSink,
    S: PixelSource,
{
    if n == 0 {
        return Err(DecodeError::MalformedPayload);
    }

    let bounds = current.bounds();
    let min_x = bounds.min.x;
    let max_x = bounds.max.x;

    if x >= max_x {
        return Ok(Point::new(min_x, y + 1));
    }

    let max_y = bounds.max.y;
    let rows = n as i32;
    let mut row = y;
    let end_row = (y + rows).min(max_y);
    while row < end_row {
        let mut cx = min_x;
        while cx < max_x {
            let pixel = reference.at(cx, row);
            current.set(cx, row, pixel);
            cx += 1;
        }
        row += 1;
    }

    Ok(Point::new(min_x, y + rows))
}
