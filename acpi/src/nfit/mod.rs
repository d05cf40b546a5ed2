//! NVDIMM Firmware Interface Table
//!
//! The NFIT lists the system physical address ranges backed by NVDIMMs and
//! how each module contributes to them. Sub-tables are walked in order and
//! collected by type; types this crate does not know are skipped so newer
//! firmware keeps parsing.

mod records;

pub use records::{
    BlockDataWindow, ControlRegion, DeviceHandle, FlushHint, InterleaveDescriptor,
    NfitSubTableHeader, NfitSubTableType, PlatformCapabilities, PlatformCapabilityFlags,
    RegionMapping, RegionStateFlags, SmbiosManagementInfo, SpaRange, SpaRangeFlags, SpaRangeKind,
};

use alloc::vec::Vec;

use crate::collector;
use crate::cursor::{ByteReader, SubTableWalker};
use crate::error::AcpiResult;
use crate::header::{self, AcpiRevision, TableHeader};

/// NFIT signature
pub const SIGNATURE: [u8; 4] = *b"NFIT";

/// Size of the NFIT header (description header plus reserved u32)
pub const HEADER_SIZE: usize = TableHeader::SIZE + 4;

/// Revisions this parser understands
pub fn is_supported_revision(revision: AcpiRevision) -> bool {
    revision == AcpiRevision::new(0, 1)
}

// =============================================================================
// PARSED TABLE
// =============================================================================

/// A fully parsed NFIT
///
/// Each sequence holds the sub-tables of one type in the order they
/// appeared in the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNfit {
    /// Description header
    pub header: TableHeader,
    /// Reserved field following the header
    pub reserved: u32,
    /// SPA range structures
    pub spa_ranges: Vec<SpaRange>,
    /// Region mapping structures
    pub region_mappings: Vec<RegionMapping>,
    /// Interleave structures
    pub interleaves: Vec<InterleaveDescriptor>,
    /// SMBIOS management information structures
    pub smbios_info: Vec<SmbiosManagementInfo>,
    /// Control region structures
    pub control_regions: Vec<ControlRegion>,
    /// Block data window structures
    pub block_data_windows: Vec<BlockDataWindow>,
    /// Flush hint structures
    pub flush_hints: Vec<FlushHint>,
    /// Platform capabilities structures
    pub platform_capabilities: Vec<PlatformCapabilities>,
}

impl ParsedNfit {
    fn empty(header: TableHeader, reserved: u32) -> Self {
        Self {
            header,
            reserved,
            spa_ranges: Vec::new(),
            region_mappings: Vec::new(),
            interleaves: Vec::new(),
            smbios_info: Vec::new(),
            control_regions: Vec::new(),
            block_data_windows: Vec::new(),
            flush_hints: Vec::new(),
            platform_capabilities: Vec::new(),
        }
    }

    fn collect(&mut self, kind: NfitSubTableType, bytes: &[u8]) -> AcpiResult<()> {
        match kind {
            NfitSubTableType::SpaRange => collector::collect(&mut self.spa_ranges, bytes).map(drop),
            NfitSubTableType::RegionMapping => {
                collector::collect(&mut self.region_mappings, bytes).map(drop)
            }
            NfitSubTableType::Interleave => {
                collector::collect(&mut self.interleaves, bytes).map(drop)
            }
            NfitSubTableType::SmbiosManagementInfo => {
                collector::collect(&mut self.smbios_info, bytes).map(drop)
            }
            NfitSubTableType::ControlRegion => {
                collector::collect(&mut self.control_regions, bytes).map(drop)
            }
            NfitSubTableType::BlockDataWindow => {
                collector::collect(&mut self.block_data_windows, bytes).map(drop)
            }
            NfitSubTableType::FlushHint => {
                collector::collect(&mut self.flush_hints, bytes).map(drop)
            }
            NfitSubTableType::PlatformCapabilities => {
                collector::collect(&mut self.platform_capabilities, bytes).map(drop)
            }
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

/// Parse an NFIT from `bytes`
///
/// # Errors
///
/// - [`AcpiError::InvalidArgument`](crate::AcpiError::InvalidArgument) for an empty buffer
/// - [`AcpiError::CorruptTable`](crate::AcpiError::CorruptTable) for a bad checksum,
///   a zero-length or overrunning sub-table, or a sub-table shorter than its layout
/// - [`AcpiError::UnsupportedRevision`](crate::AcpiError::UnsupportedRevision) for
///   any revision other than 0.1
/// - [`AcpiError::OutOfMemory`](crate::AcpiError::OutOfMemory) if a sequence cannot grow
pub fn parse(bytes: &[u8]) -> AcpiResult<ParsedNfit> {
    let (header, table) = header::validate(bytes, HEADER_SIZE, is_supported_revision)?;
    let reserved = ByteReader::at(table, TableHeader::SIZE)?.u32()?;

    let mut nfit = ParsedNfit::empty(header, reserved);
    for sub in SubTableWalker::<NfitSubTableHeader>::new(table, HEADER_SIZE) {
        let sub = sub?;
        match NfitSubTableType::from_raw(sub.header.kind) {
            Some(kind) => nfit.collect(kind, sub.bytes)?,
            None => log::debug!(
                "skipping unknown NFIT sub-table type {} at offset {:#x}",
                sub.header.kind,
                sub.offset
            ),
        }
    }

    log::debug!(
        "NFIT: {} SPA ranges, {} region mappings, {} interleaves, {} control regions",
        nfit.spa_ranges.len(),
        nfit.region_mappings.len(),
        nfit.interleaves.len(),
        nfit.control_regions.len()
    );

    Ok(nfit)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AcpiError;
    use crate::collector::SubTable;
    use crate::guid::spa_range;
    use crate::test_support::{nfit as build, TableBuilder};

    fn sample_subtables() -> Vec<Vec<u8>> {
        alloc::vec![
            build::spa_range(1, spa_range::PERSISTENT, 0x1_0000_0000, 0x8000_0000),
            build::region_mapping(0x1001, 0x20, 1, 2, 0, 0x4000_0000, 1, 2),
            build::interleave(1, 256, &[0, 1]),
            build::smbios_info(&[0x11, 0x22, 0x33]),
            build::control_region(2, 0x8089),
            build::block_data_window(2, 0x2000),
            build::flush_hint(0x1001, &[0xC000_0000]),
            build::platform_capabilities(2, 0b011),
        ]
    }

    fn sample_table() -> Vec<u8> {
        let mut builder = TableBuilder::new(SIGNATURE, 0x01, 4);
        for sub in sample_subtables() {
            builder = builder.raw(&sub);
        }
        builder.build()
    }

    #[test]
    fn test_parse_collects_every_type() {
        let nfit = parse(&sample_table()).expect("nfit");
        assert_eq!(nfit.spa_ranges.len(), 1);
        assert_eq!(nfit.region_mappings.len(), 1);
        assert_eq!(nfit.interleaves.len(), 1);
        assert_eq!(nfit.smbios_info.len(), 1);
        assert_eq!(nfit.control_regions.len(), 1);
        assert_eq!(nfit.block_data_windows.len(), 1);
        assert_eq!(nfit.flush_hints.len(), 1);
        assert_eq!(nfit.platform_capabilities.len(), 1);
        assert_eq!(nfit.smbios_info[0].data(), &[0x11, 0x22, 0x33]);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let table = sample_table();
        assert_eq!(parse(&table).expect("first"), parse(&table).expect("second"));
    }

    #[test]
    fn test_raw_bytes_preserved_in_order() {
        let a = build::spa_range(7, spa_range::VOLATILE, 0x1000, 0x1000);
        let b = build::spa_range(3, spa_range::PERSISTENT, 0x2000, 0x1000);
        let table = TableBuilder::new(SIGNATURE, 0x01, 4).raw(&a).raw(&b).build();
        let nfit = parse(&table).expect("nfit");
        assert_eq!(nfit.spa_ranges[0].as_bytes(), &a[..]);
        assert_eq!(nfit.spa_ranges[1].as_bytes(), &b[..]);
    }

    #[test]
    fn test_unknown_type_skipped() {
        let unknown = [0x42, 0x00, 0x08, 0x00, 1, 2, 3, 4];
        let spa = build::spa_range(1, spa_range::PERSISTENT, 0, 0x1000);
        let table = TableBuilder::new(SIGNATURE, 0x01, 4).raw(&unknown).raw(&spa).build();
        let nfit = parse(&table).expect("nfit");
        assert_eq!(nfit.spa_ranges.len(), 1);
    }

    #[test]
    fn test_zero_length_subtable_is_corrupt() {
        let spa = build::spa_range(1, spa_range::PERSISTENT, 0, 0x1000);
        let zero = [0x01, 0x00, 0x00, 0x00];
        let table = TableBuilder::new(SIGNATURE, 0x01, 4).raw(&spa).raw(&zero).build();
        assert_eq!(parse(&table).unwrap_err(), AcpiError::CorruptTable);
    }

    #[test]
    fn test_short_known_subtable_is_corrupt() {
        let short = [0x00, 0x00, 0x08, 0x00, 0, 0, 0, 0];
        let table = TableBuilder::new(SIGNATURE, 0x01, 4).raw(&short).build();
        assert_eq!(parse(&table).unwrap_err(), AcpiError::CorruptTable);
    }

    #[test]
    fn test_revision_gate() {
        let table = TableBuilder::new(SIGNATURE, 0x02, 4).build();
        assert_eq!(parse(&table).unwrap_err(), AcpiError::UnsupportedRevision);
    }

    #[test]
    fn test_empty_table_parses() {
        let table = TableBuilder::new(SIGNATURE, 0x01, 4).build();
        let nfit = parse(&table).expect("nfit");
        assert!(nfit.spa_ranges.is_empty());
        assert_eq!(nfit.header.length as usize, HEADER_SIZE);
    }
}
