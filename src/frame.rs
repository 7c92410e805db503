//! The frame driver: walks the cursor left-to-right, top-to-bottom over a
//! frame rectangle, calling the selector to emit chunks on encode and
//! dispatching on the tag byte to decode them.

use crate::geom::{Point, Rect};
use crate::marker;
use crate::pixel::Pixel;
use crate::raster::{PixelSink, PixelSource};
#[cfg(feature = "alloc")]
use crate::select::select;
use crate::{linear, low_nibble, lut, masked, newline, raw};
use crate::{ByteSink, ByteSource, DecodeError, EncodeError};

#[cfg(feature = "std")]
use log::{debug, trace, warn};

fn bits_len(bits: u8, n: u8) -> usize {
    (n as usize * bits as usize + 7) / 8
}

/// Payload length in bytes following a chunk's two-byte header, or `None` if
/// `tag` does not match any known marker.
fn payload_len(tag: u8, n: u8) -> Option<usize> {
    match tag {
        marker::NEWLINE => Some(0),
        marker::TRANSPARENT => Some(0),
        marker::LUT1 => Some(2 * 3 + bits_len(1, n)),
        marker::LUT2 => Some(4 * 3 + bits_len(2, n)),
        marker::LUT4 => Some(16 * 3 + bits_len(4, n)),
        marker::MASK76 | marker::MASK54 | marker::MASK32 | marker::MASK10 => {
            Some((n as usize * 6 + 7) / 8)
        }
        marker::LINEAR => Some(3),
        marker::RAW => Some(n as usize * 3),
        _ => None,
    }
}

/// Encodes `current` against `reference` into `sink`, one chunk at a time,
/// until every pixel in `current`'s bounds has been covered.
///
/// `reference` may be an empty-bounds raster (no prior frame) — NEWLINE and
/// MASKED both degrade to "not applicable" in that case and the selector
/// falls through to a structural or literal encoding instead.
#[cfg(feature = "alloc")]
pub fn encode_frame<S, K>(current: &S, reference: &S, sink: &mut K) -> Result<(), EncodeError>
where
    S: PixelSource,
    K: ByteSink,
{
    let bounds = current.bounds();
    if bounds.is_empty() {
        return Ok(());
    }

    let mut cursor = Point::new(bounds.min.x, bounds.min.y);
    let mut bytes_written: u64 = 0;
    while cursor.y < bounds.max.y {
        let bytes = select(current, reference, cursor.x, cursor.y);
        let n = bytes[0] as i32;
        let tag = low_nibble(bytes[1]);
        if n < 1 {
            #[cfg(feature = "std")]
            warn!("encode: overflow at ({}, {}), chunk declared n={}", cursor.x, cursor.y, n);
            return Err(EncodeError::Overflow);
        }

        #[cfg(feature = "std")]
        trace!("encode: ({}, {}) tag=0x{:02x} n={}", cursor.x, cursor.y, tag, n);

        sink.write(&bytes)?;
        bytes_written += bytes.len() as u64;

        cursor = if tag == marker::NEWLINE {
            Point::new(bounds.min.x, cursor.y + n)
        } else {
            Point::new(cursor.x + n, cursor.y)
        };
        if cursor.x > bounds.max.x || cursor.y > bounds.max.y {
            #[cfg(feature = "std")]
            warn!("encode: cursor ({}, {}) escaped bounds {:?}", cursor.x, cursor.y, bounds);
            return Err(EncodeError::Overflow);
        }
    }

    sink.flush()?;

    #[cfg(feature = "std")]
    debug!(
        "encode: {}x{} frame, {} pixels, {} bytes written",
        bounds.max.x - bounds.min.x,
        bounds.max.y - bounds.min.y,
        (bounds.max.x - bounds.min.x) as u64 * (bounds.max.y - bounds.min.y) as u64,
        bytes_written,
    );

    Ok(())
}

/// Decodes a frame of `bounds` out of `source` into `current`, consulting
/// `reference` for every chunk that refers back to a prior frame.
///
/// Dispatch reads the tag byte directly rather than probing each decoder in
/// turn: the tag's low nibble names its marker unambiguously, so there is
/// nothing to guess.
pub fn decode_frame<K, S, B>(
    current: &mut K,
    reference: &S,
    bounds: Rect,
    source: &mut B,
) -> Result<(), DecodeError>
where
    K: PixelSource + PixelSink,
    S: PixelSource,
    B: ByteSource,
{
    match decode_frame_inner(current, reference, bounds, source) {
        Ok(()) => {
            #[cfg(feature = "std")]
            debug!(
                "decode: {}x{} frame complete",
                bounds.max.x - bounds.min.x,
                bounds.max.y - bounds.min.y,
            );
            Ok(())
        }
        Err(err) => {
            #[cfg(feature = "std")]
            warn!("decode: aborting frame {:?}: {}", bounds, err);
            Err(err)
        }
    }
}

fn decode_frame_inner<K, S, B>(
    current: &mut K,
    reference: &S,
    bounds: Rect,
    source: &mut B,
) -> Result<(), DecodeError>
where
    K: PixelSource + PixelSink,
    S: PixelSource,
    B: ByteSource,
{
    let mut cursor = Point::new(bounds.min.x, bounds.min.y);
    while cursor.y < bounds.max.y {
        let header = source.peek(2)?;
        let n = header[0];
        let tag = low_nibble(header[1]);
        let len = payload_len(tag, n).ok_or(DecodeError::UnrecognizedMarker)?;
        let chunk = source.peek(2 + len)?;
        let payload = &chunk[2..];

        #[cfg(feature = "std")]
        trace!("decode: ({}, {}) tag=0x{:02x} n={}", cursor.x, cursor.y, tag, n);

        let next = match tag {
            marker::NEWLINE => newline::decode(current, reference, n, cursor.x, cursor.y)?,
            marker::RAW => raw::decode(current, payload, n, cursor.x, cursor.y)?,
            marker::LUT1 | marker::LUT2 | marker::LUT4 => {
                lut::decode(current, tag, payload, n, cursor.x, cursor.y)?
            }
            marker::TRANSPARENT
            | marker::MASK76
            | marker::MASK54
            | marker::MASK32
            | marker::MASK10 => {
                masked::decode(current, reference, tag, payload, n, cursor.x, cursor.y)?
            }
            marker::LINEAR => {
                if payload.len() < 3 {
                    return Err(DecodeError::ShortRead);
                }
                let base = if cursor.x > bounds.min.x {
                    current.at(cursor.x - 1, cursor.y)
                } else {
                    Pixel::ZERO
                };
                let endpoint = Pixel::new(payload[0], payload[1], payload[2]);
                linear::decode(current, base, endpoint, n, cursor.x, cursor.y)?
            }
            _ => return Err(DecodeError::UnrecognizedMarker),
        };

        source.advance(2 + len)?;
        cursor = next;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterBuf;
    use crate::{SliceSource, VecSink};

    #[test]
    fn round_trips_a_flat_frame_with_no_reference() {
        let current = RasterBuf::new(6, 4);
        let reference = RasterBuf::new(0, 0);
        let mut sink = VecSink::new();
        encode_frame(&current, &reference, &mut sink).unwrap();
        let bytes = sink.into_inner();

        let mut decoded = RasterBuf::new(6, 4);
        let mut source = SliceSource::new(&bytes);
        decode_frame(&mut decoded, &reference, current.bounds(), &mut source).unwrap();

        for y in 0..4 {
            for x in 0..6 {
                assert_eq!(decoded.at(x, y), current.at(x, y));
            }
        }
    }

    #[test]
    fn round_trips_a_frame_identical_to_its_reference() {
        let current = RasterBuf::new(5, 3);
        let reference = current.clone();
        let mut sink = VecSink::new();
        encode_frame(&current, &reference, &mut sink).unwrap();
        let bytes = sink.into_inner();
        // an all-matching frame collapses to a single NEWLINE chunk.
        assert_eq!(bytes, alloc::vec![3, marker::NEWLINE]);

        let mut decoded = RasterBuf::new(5, 3);
        let mut source = SliceSource::new(&bytes);
        decode_frame(&mut decoded, &reference, current.bounds(), &mut source).unwrap();
        for y in 0..3 {
            for x in 0..5 {
                assert_eq!(decoded.at(x, y), Pixel::ZERO);
            }
        }
    }

    #[test]
    fn round_trips_a_row_with_mixed_chunks() {
        let mut current = RasterBuf::new(10, 1);
        for x in 0..10 {
            current.set(x, 0, Pixel::new((x * 20) as u8, 0, 0));
        }
        current.set(3, 0, Pixel::new(255, 0, 255));
        let reference = RasterBuf::new(10, 1);

        let mut sink = VecSink::new();
        encode_frame(&current, &reference, &mut sink).unwrap();
        let bytes = sink.into_inner();

        let mut decoded = RasterBuf::new(10, 1);
        let mut source = SliceSource::new(&bytes);
        decode_frame(&mut decoded, &reference, current.bounds(), &mut source).unwrap();

        for x in 0..10 {
            assert!(decoded.at(x, 0).looks_alike(&current.at(x, 0)));
        }
    }

    #[test]
    fn round_trips_multiple_rows_with_a_genuine_wrap() {
        let mut current = RasterBuf::new(4, 3);
        current.set(0, 1, Pixel::new(7, 8, 9));
        let reference = RasterBuf::new(4, 3);

        let mut sink = VecSink::new();
        encode_frame(&current, &reference, &mut sink).unwrap();
        let bytes = sink.into_inner();

        let mut decoded = RasterBuf::new(4, 3);
        let mut source = SliceSource::new(&bytes);
        decode_frame(&mut decoded, &reference, current.bounds(), &mut source).unwrap();

        for y in 0..3 {
            for x in 0..4 {
                assert!(decoded.at(x, y).looks_alike(&current.at(x, y)));
            }
        }
    }

    #[test]
    fn empty_bounds_encodes_nothing() {
        let current = RasterBuf::new(0, 0);
        let reference = RasterBuf::new(0, 0);
        let mut sink = VecSink::new();
        encode_frame(&current, &reference, &mut sink).unwrap();
        assert!(sink.into_inner().is_empty());
    }
}
