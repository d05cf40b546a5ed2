//! Table header decoding and validation
//!
//! All three families share the 36-byte ACPI description header. Validation
//! is the same for each: the byte sum over the declared length must be zero,
//! and the revision must be one the family's parser understands. A bad sum
//! is [`AcpiError::CorruptTable`], an unknown revision
//! [`AcpiError::UnsupportedRevision`].

use core::fmt;

use crate::cursor::{byte_sum, ByteReader};
use crate::error::{AcpiError, AcpiResult};

// =============================================================================
// REVISION
// =============================================================================

/// Table revision, major in the high nibble and minor in the low nibble
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AcpiRevision(pub u8);

impl AcpiRevision {
    /// Build from major and minor halves
    pub const fn new(major: u8, minor: u8) -> Self {
        Self(((major & 0x0F) << 4) | (minor & 0x0F))
    }

    /// Major revision
    pub const fn major(self) -> u8 {
        self.0 >> 4
    }

    /// Minor revision
    pub const fn minor(self) -> u8 {
        self.0 & 0x0F
    }

    /// Raw encoded byte
    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for AcpiRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major(), self.minor())
    }
}

impl fmt::Display for AcpiRevision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// TABLE HEADER
// =============================================================================

/// ACPI description header (common to all tables)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableHeader {
    /// Signature
    pub signature: [u8; 4],
    /// Length of the whole table, header included
    pub length: u32,
    /// Revision
    pub revision: AcpiRevision,
    /// Checksum
    pub checksum: u8,
    /// OEM ID
    pub oem_id: [u8; 6],
    /// OEM table ID
    pub oem_table_id: [u8; 8],
    /// OEM revision
    pub oem_revision: u32,
    /// Creator ID
    pub creator_id: u32,
    /// Creator revision
    pub creator_revision: u32,
}

impl TableHeader {
    /// Encoded size
    pub const SIZE: usize = 36;

    /// Decode from the start of a table
    pub fn decode(reader: &mut ByteReader<'_>) -> AcpiResult<Self> {
        Ok(Self {
            signature: reader.array()?,
            length: reader.u32()?,
            revision: AcpiRevision(reader.u8()?),
            checksum: reader.u8()?,
            oem_id: reader.array()?,
            oem_table_id: reader.array()?,
            oem_revision: reader.u32()?,
            creator_id: reader.u32()?,
            creator_revision: reader.u32()?,
        })
    }

    /// Parse from bytes
    pub fn from_bytes(bytes: &[u8]) -> AcpiResult<Self> {
        Self::decode(&mut ByteReader::new(bytes))
    }

    /// Signature as a string, if printable
    pub fn signature_str(&self) -> &str {
        core::str::from_utf8(&self.signature).unwrap_or("????")
    }
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Check that `bytes` sums to zero modulo 256
pub fn is_checksum_valid(bytes: &[u8]) -> bool {
    byte_sum(bytes) == 0
}

/// Validate a table and return its header plus the table bytes
///
/// `min_len` is the size of the family header (description header plus the
/// family's own fixed fields). The returned slice is cut to the declared
/// length, so later walks can never read past it even if the caller's
/// buffer is larger.
pub fn validate(
    bytes: &[u8],
    min_len: usize,
    is_supported: impl Fn(AcpiRevision) -> bool,
) -> AcpiResult<(TableHeader, &[u8])> {
    if bytes.is_empty() {
        return Err(AcpiError::InvalidArgument);
    }

    let header = TableHeader::from_bytes(bytes).map_err(|_| {
        log::debug!("table shorter than its description header");
        AcpiError::CorruptTable
    })?;

    let length = header.length as usize;
    if length < min_len.max(TableHeader::SIZE) || length > bytes.len() {
        log::debug!(
            "{} declares {} bytes, buffer holds {}",
            header.signature_str(),
            length,
            bytes.len()
        );
        return Err(AcpiError::CorruptTable);
    }

    let table = &bytes[..length];
    if !is_checksum_valid(table) {
        log::debug!("The checksum of the {} table is invalid.", header.signature_str());
        return Err(AcpiError::CorruptTable);
    }

    if !is_supported(header.revision) {
        log::debug!(
            "{} table revision {} is not supported",
            header.signature_str(),
            header.revision
        );
        return Err(AcpiError::UnsupportedRevision);
    }

    Ok((header, table))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TableBuilder;

    fn any_revision(_: AcpiRevision) -> bool {
        true
    }

    #[test]
    fn test_revision_halves() {
        let rev = AcpiRevision::new(1, 3);
        assert_eq!(rev.as_u8(), 0x13);
        assert_eq!(rev.major(), 1);
        assert_eq!(rev.minor(), 3);
        assert_eq!(AcpiRevision(0x02).minor(), 2);
    }

    #[test]
    fn test_header_decode() {
        let table = TableBuilder::new(*b"NFIT", 0x01, 4).build();
        let header = TableHeader::from_bytes(&table).expect("header");
        assert_eq!(&header.signature, b"NFIT");
        assert_eq!(header.length as usize, table.len());
        assert_eq!(header.revision, AcpiRevision::new(0, 1));
        assert_eq!(header.signature_str(), "NFIT");
    }

    #[test]
    fn test_validate_accepts_good_table() {
        let table = TableBuilder::new(*b"PCAT", 0x12, 4).build();
        let (header, body) = validate(&table, 40, any_revision).expect("valid");
        assert_eq!(body.len(), table.len());
        assert_eq!(header.revision.as_u8(), 0x12);
    }

    #[test]
    fn test_every_single_byte_flip_is_caught() {
        let table = TableBuilder::new(*b"PMTT", 0x02, 4)
            .raw(&[1, 2, 3, 4, 5, 6, 7, 8])
            .build();
        for i in 0..table.len() {
            if i == 9 {
                continue;
            }
            let mut bad = table.clone();
            bad[i] = bad[i].wrapping_add(0x11);
            let err = validate(&bad, 40, any_revision).unwrap_err();
            assert_eq!(err, AcpiError::CorruptTable, "flip at {}", i);
        }
    }

    #[test]
    fn test_revision_rejected_after_checksum() {
        let table = TableBuilder::new(*b"NFIT", 0x05, 4).build();
        assert_eq!(
            validate(&table, 40, |r| r.as_u8() == 1).unwrap_err(),
            AcpiError::UnsupportedRevision
        );
    }

    #[test]
    fn test_length_beyond_buffer() {
        let mut table = TableBuilder::new(*b"NFIT", 0x01, 4).build();
        table.truncate(38);
        assert_eq!(validate(&table, 40, any_revision).unwrap_err(), AcpiError::CorruptTable);
    }

    #[test]
    fn test_oversized_buffer_is_cut_to_length() {
        let mut table = TableBuilder::new(*b"NFIT", 0x01, 4).build();
        let len = table.len();
        table.extend_from_slice(&[0xAB; 7]);
        let (_, body) = validate(&table, 40, any_revision).expect("valid");
        assert_eq!(body.len(), len);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(validate(&[], 40, any_revision).unwrap_err(), AcpiError::InvalidArgument);
    }
}
