//! Bounds-checked byte cursors
//!
//! [`ByteReader`] decodes little-endian fields in order. [`SubTableWalker`]
//! steps over the variable-length sub-tables that follow a table header,
//! yielding each one as a length-validated slice.

use core::marker::PhantomData;

use crate::error::{AcpiError, AcpiResult};
use crate::guid::Guid;

// =============================================================================
// BYTE READER
// =============================================================================

/// Sequential little-endian reader over a byte slice
///
/// Every read checks the remaining length; running off the end is a
/// [`AcpiError::CorruptTable`].
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the first byte
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Create a reader positioned at `offset`
    pub fn at(bytes: &'a [u8], offset: usize) -> AcpiResult<Self> {
        if offset > bytes.len() {
            return Err(AcpiError::CorruptTable);
        }
        Ok(Self { bytes, pos: offset })
    }

    /// Current offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    /// Take the next `len` bytes
    pub fn take(&mut self, len: usize) -> AcpiResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(AcpiError::CorruptTable)?;
        let out = self.bytes.get(self.pos..end).ok_or(AcpiError::CorruptTable)?;
        self.pos = end;
        Ok(out)
    }

    /// Skip `len` bytes
    pub fn skip(&mut self, len: usize) -> AcpiResult<()> {
        self.take(len).map(|_| ())
    }

    /// Read a fixed-size array
    pub fn array<const N: usize>(&mut self) -> AcpiResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Read a byte
    pub fn u8(&mut self) -> AcpiResult<u8> {
        Ok(self.array::<1>()?[0])
    }

    /// Read a little-endian u16
    pub fn u16(&mut self) -> AcpiResult<u16> {
        self.array().map(u16::from_le_bytes)
    }

    /// Read a little-endian u32
    pub fn u32(&mut self) -> AcpiResult<u32> {
        self.array().map(u32::from_le_bytes)
    }

    /// Read a little-endian u64
    pub fn u64(&mut self) -> AcpiResult<u64> {
        self.array().map(u64::from_le_bytes)
    }

    /// Read a GUID in its mixed-endian firmware encoding
    pub fn guid(&mut self) -> AcpiResult<Guid> {
        self.array().map(|b| Guid::from_bytes_le(&b))
    }
}

/// Unsigned byte sum of `bytes`, modulo 256
pub fn byte_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

// =============================================================================
// SUB-TABLE WALKER
// =============================================================================

/// Family-specific sub-table header
pub trait SubTableHeader: Sized + Copy {
    /// Encoded header size
    const SIZE: usize;

    /// Decode from the first [`Self::SIZE`] bytes
    fn decode(reader: &mut ByteReader<'_>) -> AcpiResult<Self>;

    /// Declared length of the whole sub-table, header included
    fn length(&self) -> usize;
}

/// One sub-table as seen by a walker
#[derive(Debug, Clone, Copy)]
pub struct RawSubTable<'a, H> {
    /// Decoded header copy
    pub header: H,
    /// Byte offset of the sub-table within the table
    pub offset: usize,
    /// All bytes of the sub-table, header included
    pub bytes: &'a [u8],
}

/// Iterator over the sub-tables of one table
///
/// Walks `bytes[start..end]` and stops once exactly `end` bytes have been
/// consumed. A zero declared length, a truncated header, or a sub-table that
/// runs past `end` yields [`AcpiError::CorruptTable`] and ends the walk.
#[derive(Debug)]
pub struct SubTableWalker<'a, H> {
    bytes: &'a [u8],
    pos: usize,
    end: usize,
    failed: bool,
    _header: PhantomData<H>,
}

impl<'a, H: SubTableHeader> SubTableWalker<'a, H> {
    /// Walk `bytes[start..]`, clamped to the slice length
    pub fn new(bytes: &'a [u8], start: usize) -> Self {
        Self {
            bytes,
            pos: start.min(bytes.len()),
            end: bytes.len(),
            failed: false,
            _header: PhantomData,
        }
    }

    /// Bytes consumed since the walk started
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a, H: SubTableHeader> Iterator for SubTableWalker<'a, H> {
    type Item = AcpiResult<RawSubTable<'a, H>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }

        let result = self.step();
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

impl<'a, H: SubTableHeader> SubTableWalker<'a, H> {
    fn step(&mut self) -> AcpiResult<RawSubTable<'a, H>> {
        let mut reader = ByteReader::at(&self.bytes[..self.end], self.pos)?;
        let header = H::decode(&mut reader)?;
        let length = header.length();

        if length == 0 {
            log::debug!("zero length sub-table at offset {:#x}", self.pos);
            return Err(AcpiError::CorruptTable);
        }

        let end = self.pos.checked_add(length).ok_or(AcpiError::CorruptTable)?;
        if end > self.end {
            log::debug!(
                "sub-table at offset {:#x} claims {} bytes, only {} left",
                self.pos,
                length,
                self.end - self.pos
            );
            return Err(AcpiError::CorruptTable);
        }

        let sub = RawSubTable {
            header,
            offset: self.pos,
            bytes: &self.bytes[self.pos..end],
        };

        #[cfg(feature = "trace-walk")]
        log::trace!("sub-table at {:#x}, {} bytes", sub.offset, length);

        self.pos = end;
        Ok(sub)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec::Vec;

    #[derive(Debug, Clone, Copy)]
    struct TypeLen {
        kind: u16,
        length: u16,
    }

    impl SubTableHeader for TypeLen {
        const SIZE: usize = 4;

        fn decode(reader: &mut ByteReader<'_>) -> AcpiResult<Self> {
            Ok(Self {
                kind: reader.u16()?,
                length: reader.u16()?,
            })
        }

        fn length(&self) -> usize {
            self.length as usize
        }
    }

    #[test]
    fn test_reader_fields() {
        let bytes = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.u8(), Ok(1));
        assert_eq!(r.u16(), Ok(0x1234));
        assert_eq!(r.u32(), Ok(0x1234_5678));
        assert_eq!(r.remaining(), 0);
        assert_eq!(r.u8(), Err(AcpiError::CorruptTable));
    }

    #[test]
    fn test_reader_at_out_of_range() {
        assert!(ByteReader::at(&[0u8; 4], 5).is_err());
        assert_eq!(ByteReader::at(&[0u8; 4], 4).map(|r| r.remaining()), Ok(0));
    }

    #[test]
    fn test_byte_sum_wraps() {
        assert_eq!(byte_sum(&[0xFF, 0x01]), 0);
        assert_eq!(byte_sum(&[0x80, 0x80, 0x05]), 5);
    }

    #[test]
    fn test_walker_consumes_exact_length() {
        let bytes = [
            0, 0, 6, 0, 0xAA, 0xBB, // kind 0, 6 bytes
            9, 0, 4, 0, // kind 9, 4 bytes
        ];
        let mut walker = SubTableWalker::<TypeLen>::new(&bytes, 0);
        let subs: Vec<_> = walker.by_ref().collect::<AcpiResult<_>>().expect("walk");
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].header.kind, 0);
        assert_eq!(subs[0].bytes, &bytes[..6]);
        assert_eq!(subs[1].header.kind, 9);
        assert_eq!(subs[1].offset, 6);
        assert_eq!(walker.position(), bytes.len());
    }

    #[test]
    fn test_walker_zero_length_stops() {
        let bytes = [0, 0, 4, 0, 1, 0, 0, 0, 2, 0, 4, 0];
        let results: Vec<_> = SubTableWalker::<TypeLen>::new(&bytes, 0).collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().err(), Some(&AcpiError::CorruptTable));
    }

    #[test]
    fn test_walker_overrun() {
        let bytes = [0, 0, 16, 0, 0, 0];
        let mut walker = SubTableWalker::<TypeLen>::new(&bytes, 0);
        assert!(matches!(walker.next(), Some(Err(AcpiError::CorruptTable))));
        assert!(walker.next().is_none());
    }

    #[test]
    fn test_walker_truncated_header() {
        let bytes = [0, 0, 8, 0, 0, 0, 0, 0, 1, 0];
        let results: Vec<_> = SubTableWalker::<TypeLen>::new(&bytes, 0).collect();
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().err(), Some(&AcpiError::CorruptTable));
    }
}
