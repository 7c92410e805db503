//! Byte-level source and sink traits the frame driver peeks and writes
//! through, plus in-memory adapters so the codec can be exercised without
//! pulling in any I/O crate.

use crate::{DecodeError, EncodeError};

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// A sequential, peekable byte source. The codec peeks 2 bytes (5 for
/// LINEAR) to identify a chunk before consuming it.
pub trait ByteSource {
    /// Returns the next `n` bytes without consuming them. Fails with
    /// [`DecodeError::ShortRead`] if fewer than `n` bytes remain.
    fn peek(&self, n: usize) -> Result<&[u8], DecodeError>;

    /// Consumes `n` bytes previously inspected via [`peek`](Self::peek).
    fn advance(&mut self, n: usize) -> Result<(), DecodeError>;

    /// Peeks and consumes exactly `buf.len()` bytes into `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        let bytes = self.peek(buf.len())?;
        buf.copy_from_slice(bytes);
        self.advance(buf.len())
    }
}

/// A sequential byte sink. `write` may be called many times per chunk
/// boundary is never implied; the codec always writes one chunk per call.
pub trait ByteSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), EncodeError>;
    fn flush(&mut self) -> Result<(), EncodeError>;
}

/// A [`ByteSource`] over an in-memory byte slice.
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        SliceSource { data, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> ByteSource for SliceSource<'a> {
    #[inline(always)]
    fn peek(&self, n: usize) -> Result<&[u8], DecodeError> {
        self.data
            .get(self.pos..self.pos + n)
            .ok_or(DecodeError::ShortRead)
    }

    #[inline(always)]
    fn advance(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.pos + n > self.data.len() {
            return Err(DecodeError::ShortRead);
        }
        self.pos += n;
        Ok(())
    }
}

/// A [`ByteSink`] that appends to an owned `Vec<u8>`.
#[cfg(feature = "alloc")]
#[derive(Default)]
pub struct VecSink {
    buf: Vec<u8>,
}

#[cfg(feature = "alloc")]
impl VecSink {
    pub fn new() -> Self {
        VecSink { buf: Vec::new() }
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(feature = "alloc")]
impl ByteSink for VecSink {
    #[inline(always)]
    fn write(&mut self, bytes: &[u8]) -> Result<(), EncodeError> {
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    #[inline(always)]
    fn flush(&mut self) -> Result<(), EncodeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_source_peek_does_not_consume() {
        let mut src = SliceSource::new(&[1, 2, 3, 4]);
        assert_eq!(src.peek(2).unwrap(), &[1, 2]);
        assert_eq!(src.peek(2).unwrap(), &[1, 2]);
        src.advance(2).unwrap();
        assert_eq!(src.peek(2).unwrap(), &[3, 4]);
    }

    #[test]
    fn slice_source_short_read() {
        let src = SliceSource::new(&[1, 2]);
        assert_eq!(src.peek(3), Err(DecodeError::ShortRead));
    }

    #[test]
    fn vec_sink_accumulates() {
        let mut sink = VecSink::new();
        sink.write(&[1, 2]).unwrap();
        sink.write(&[3]).unwrap();
        sink.flush().unwrap();
        assert_eq!(sink.into_inner(), alloc::vec![1, 2, 3]);
    }
}
