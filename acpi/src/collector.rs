//! Generic sub-table collector
//!
//! Sub-table counts are not known before a walk, so each typed sequence grows
//! one record at a time. A record owns its own heap copy of the sub-table
//! bytes; nothing in a parsed structure borrows from the caller's buffer.
//!
//! Growth is fallible: the sequence reserves space first, then the byte copy
//! is allocated, then the record is decoded. If any step fails the sequence
//! is left exactly as it was.

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::cursor::ByteReader;
use crate::error::{AcpiError, AcpiResult};

/// A sub-table record decoded from an owned byte copy
pub trait SubTable: Sized {
    /// Minimum encoded size (the fixed part of the layout)
    const MIN_SIZE: usize;

    /// Decode the fixed fields; `raw` holds the whole sub-table
    fn decode(raw: Box<[u8]>) -> AcpiResult<Self>;

    /// The sub-table bytes exactly as they appeared in the table
    fn as_bytes(&self) -> &[u8];
}

/// Copy `bytes` into a new owned buffer
pub fn copy_bytes(bytes: &[u8]) -> AcpiResult<Box<[u8]>> {
    if bytes.is_empty() {
        return Err(AcpiError::InvalidArgument);
    }
    let mut data = Vec::new();
    data.try_reserve_exact(bytes.len())?;
    data.extend_from_slice(bytes);
    Ok(data.into_boxed_slice())
}

/// Append a record holding a copy of `bytes` to `sequence`
///
/// Returns the new record. On error `sequence` is unchanged.
pub fn collect<'s, T: SubTable>(sequence: &'s mut Vec<T>, bytes: &[u8]) -> AcpiResult<&'s mut T> {
    if bytes.len() < T::MIN_SIZE {
        log::debug!(
            "sub-table of {} bytes is shorter than its {} byte layout",
            bytes.len(),
            T::MIN_SIZE
        );
        return Err(AcpiError::CorruptTable);
    }

    sequence.try_reserve(1)?;
    let record = T::decode(copy_bytes(bytes)?)?;
    sequence.push(record);

    let last = sequence.len() - 1;
    Ok(&mut sequence[last])
}

/// Append an already-built value to `sequence` without aborting on OOM
pub fn push<T>(sequence: &mut Vec<T>, value: T) -> AcpiResult<()> {
    sequence.try_reserve(1)?;
    sequence.push(value);
    Ok(())
}

/// Reader positioned just past a sub-table header of `header_len` bytes
pub fn body(raw: &[u8], header_len: usize) -> AcpiResult<ByteReader<'_>> {
    ByteReader::at(raw, header_len)
}

/// Decode a run of `count` little-endian u32 values starting at `offset`
///
/// Stops early at the end of `raw`; callers that need every value compare
/// the returned length with `count`.
pub fn u32_list(raw: &[u8], offset: usize, count: usize) -> AcpiResult<Vec<u32>> {
    let available = raw.len().saturating_sub(offset) / 4;
    let n = count.min(available);

    let mut out = Vec::new();
    out.try_reserve_exact(n)?;
    let mut reader = ByteReader::at(raw, offset.min(raw.len()))?;
    for _ in 0..n {
        out.push(reader.u32()?);
    }
    Ok(out)
}

/// Decode a run of `count` little-endian u64 values starting at `offset`
pub fn u64_list(raw: &[u8], offset: usize, count: usize) -> AcpiResult<Vec<u64>> {
    let available = raw.len().saturating_sub(offset) / 8;
    let n = count.min(available);

    let mut out = Vec::new();
    out.try_reserve_exact(n)?;
    let mut reader = ByteReader::at(raw, offset.min(raw.len()))?;
    for _ in 0..n {
        out.push(reader.u64()?);
    }
    Ok(out)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Pair {
        first: u16,
        raw: Box<[u8]>,
    }

    impl SubTable for Pair {
        const MIN_SIZE: usize = 4;

        fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
            let first = ByteReader::new(&raw).u16()?;
            Ok(Self { first, raw })
        }

        fn as_bytes(&self) -> &[u8] {
            &self.raw
        }
    }

    #[test]
    fn test_collect_appends_in_order() {
        let mut seq: Vec<Pair> = Vec::new();
        collect(&mut seq, &[1, 0, 0, 0]).expect("first");
        let second = collect(&mut seq, &[2, 0, 9, 9, 9]).expect("second");
        assert_eq!(second.first, 2);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq[0].first, 1);
        assert_eq!(seq[1].as_bytes(), &[2, 0, 9, 9, 9]);
    }

    #[test]
    fn test_collect_short_leaves_sequence() {
        let mut seq: Vec<Pair> = Vec::new();
        collect(&mut seq, &[1, 0, 0, 0]).expect("first");
        assert_eq!(collect(&mut seq, &[1, 2]).unwrap_err(), AcpiError::CorruptTable);
        assert_eq!(seq.len(), 1);
    }

    #[test]
    fn test_copy_rejects_empty() {
        assert_eq!(copy_bytes(&[]).unwrap_err(), AcpiError::InvalidArgument);
    }

    #[test]
    fn test_lists_stop_at_end() {
        let raw = [1, 0, 0, 0, 2, 0, 0, 0, 3, 0];
        assert_eq!(u32_list(&raw, 0, 5).expect("list"), [1, 2]);
        assert_eq!(u32_list(&raw, 4, 1).expect("list"), [2]);
        assert!(u64_list(&raw, 8, 3).expect("list").is_empty());
        assert!(u32_list(&raw, 64, 3).expect("list").is_empty());
    }
}
