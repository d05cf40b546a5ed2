//! Platform Configuration Attributes Table
//!
//! The PCAT tells management software which memory modes the platform can
//! run, which interleave formats it accepts, and how much memory each socket
//! (or die) may map. Revision 0.x and 1.x tables share the sub-table type
//! numbers but lay out the capability, interleave and SKU records
//! differently, so the parsed table holds one of two [`PcatTables`] variants.
//!
//! Unlike the NFIT, an unknown sub-table type fails the parse.

mod records;

pub use records::{
    memory_mode, CapabilityInfoV0, CapabilityInfoV1, CurrentMemoryMode, DieSku,
    InterleaveCapabilityV0, InterleaveCapabilityV1, InterleaveFormatV0, InterleaveFormatV1,
    InterleaveSize, ManagementAttributes, MaxPmInterleaveSets, MemoryModeCapabilities,
    PcatSubTableHeader, PcatSubTableType, RuntimeInterface, SocketSku, VolatileMode,
};

use alloc::vec::Vec;

use crate::collector;
use crate::cursor::{ByteReader, SubTableWalker};
use crate::error::{AcpiError, AcpiResult};
use crate::header::{self, AcpiRevision, TableHeader};

/// PCAT signature
pub const SIGNATURE: [u8; 4] = *b"PCAT";

/// Size of the PCAT header (description header plus 4 reserved bytes)
pub const HEADER_SIZE: usize = TableHeader::SIZE + 4;

/// Revisions this parser understands
pub fn is_supported_revision(revision: AcpiRevision) -> bool {
    PcatGeneration::of(revision).is_some()
}

// =============================================================================
// GENERATIONS
// =============================================================================

/// PCAT schema generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcatGeneration {
    /// Revision 0.1 or 0.2: per-socket records
    V0,
    /// Revision 1.1, 1.2 or 1.3: per-die records
    V1,
}

impl PcatGeneration {
    /// Generation of a table revision, `None` if unsupported
    pub fn of(revision: AcpiRevision) -> Option<Self> {
        match (revision.major(), revision.minor()) {
            (0, 1..=2) => Some(Self::V0),
            (1, 1..=3) => Some(Self::V1),
            _ => None,
        }
    }
}

/// Revision 0.x records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcatV0Tables {
    /// Platform capability information
    pub capabilities: Vec<CapabilityInfoV0>,
    /// Memory interleave capability information
    pub interleave_capabilities: Vec<InterleaveCapabilityV0>,
    /// Socket SKU information
    pub socket_skus: Vec<SocketSku>,
}

/// Revision 1.x records
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PcatV1Tables {
    /// Platform capability information
    pub capabilities: Vec<CapabilityInfoV1>,
    /// Memory interleave capability information
    pub interleave_capabilities: Vec<InterleaveCapabilityV1>,
    /// Die SKU information
    pub die_skus: Vec<DieSku>,
}

/// Generation-specific record sequences
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PcatTables {
    /// Revision 0.x table
    V0(PcatV0Tables),
    /// Revision 1.x table
    V1(PcatV1Tables),
}

impl PcatTables {
    fn empty(generation: PcatGeneration) -> Self {
        match generation {
            PcatGeneration::V0 => Self::V0(PcatV0Tables::default()),
            PcatGeneration::V1 => Self::V1(PcatV1Tables::default()),
        }
    }

    /// Generation of the populated variant
    pub fn generation(&self) -> PcatGeneration {
        match self {
            Self::V0(_) => PcatGeneration::V0,
            Self::V1(_) => PcatGeneration::V1,
        }
    }

    /// Number of platform capability records
    pub fn capability_count(&self) -> usize {
        match self {
            Self::V0(t) => t.capabilities.len(),
            Self::V1(t) => t.capabilities.len(),
        }
    }

    /// Number of interleave capability records
    pub fn interleave_capability_count(&self) -> usize {
        match self {
            Self::V0(t) => t.interleave_capabilities.len(),
            Self::V1(t) => t.interleave_capabilities.len(),
        }
    }

    /// Number of socket or die SKU records
    pub fn sku_count(&self) -> usize {
        match self {
            Self::V0(t) => t.socket_skus.len(),
            Self::V1(t) => t.die_skus.len(),
        }
    }
}

// =============================================================================
// PARSED TABLE
// =============================================================================

/// A fully parsed PCAT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPcat {
    /// Description header
    pub header: TableHeader,
    /// Reserved bytes following the header
    pub reserved: [u8; 4],
    /// Capability, interleave and SKU records
    pub tables: PcatTables,
    /// Re-configuration input validation interfaces
    pub runtime_interfaces: Vec<RuntimeInterface>,
    /// Configuration management attribute extensions
    pub management_attributes: Vec<ManagementAttributes>,
}

impl ParsedPcat {
    /// Schema generation of the table
    pub fn generation(&self) -> PcatGeneration {
        self.tables.generation()
    }

    /// Table revision
    pub fn revision(&self) -> AcpiRevision {
        self.header.revision
    }

    fn collect(&mut self, kind: PcatSubTableType, bytes: &[u8]) -> AcpiResult<()> {
        let revision = self.header.revision;
        match (kind, &mut self.tables) {
            (PcatSubTableType::PlatformCapability, PcatTables::V0(t)) => {
                collector::collect(&mut t.capabilities, bytes).map(drop)
            }
            (PcatSubTableType::PlatformCapability, PcatTables::V1(t)) => {
                let cap = collector::collect(&mut t.capabilities, bytes)?;
                // 1.1 and 1.2 firmware supports mixed mode but never reports it
                if matches!(revision.minor(), 1 | 2) {
                    cap.force_mixed_mode();
                }
                Ok(())
            }
            (PcatSubTableType::InterleaveCapability, PcatTables::V0(t)) => {
                collector::collect(&mut t.interleave_capabilities, bytes).map(drop)
            }
            (PcatSubTableType::InterleaveCapability, PcatTables::V1(t)) => {
                collector::collect(&mut t.interleave_capabilities, bytes).map(drop)
            }
            (PcatSubTableType::SkuInfo, PcatTables::V0(t)) => {
                collector::collect(&mut t.socket_skus, bytes).map(drop)
            }
            (PcatSubTableType::SkuInfo, PcatTables::V1(t)) => {
                collector::collect(&mut t.die_skus, bytes).map(drop)
            }
            (PcatSubTableType::RuntimeInterface, _) => {
                collector::collect(&mut self.runtime_interfaces, bytes).map(drop)
            }
            (PcatSubTableType::ManagementAttributes, _) => {
                collector::collect(&mut self.management_attributes, bytes).map(drop)
            }
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

/// Parse a PCAT from `bytes`
///
/// # Errors
///
/// Same as [`nfit::parse`](crate::nfit::parse), plus
/// [`AcpiError::CorruptTable`] for a sub-table type outside the known set.
pub fn parse(bytes: &[u8]) -> AcpiResult<ParsedPcat> {
    let (header, table) = header::validate(bytes, HEADER_SIZE, is_supported_revision)?;
    let generation = PcatGeneration::of(header.revision).ok_or(AcpiError::UnsupportedRevision)?;
    let reserved = ByteReader::at(table, TableHeader::SIZE)?.array()?;

    let mut pcat = ParsedPcat {
        header,
        reserved,
        tables: PcatTables::empty(generation),
        runtime_interfaces: Vec::new(),
        management_attributes: Vec::new(),
    };

    for sub in SubTableWalker::<PcatSubTableHeader>::new(table, HEADER_SIZE) {
        let sub = sub?;
        let kind = PcatSubTableType::from_raw(sub.header.kind).ok_or_else(|| {
            log::warn!(
                "unknown PCAT sub-table type {} at offset {:#x}",
                sub.header.kind,
                sub.offset
            );
            AcpiError::CorruptTable
        })?;
        pcat.collect(kind, sub.bytes)?;
    }

    log::debug!(
        "PCAT {}: {} capability, {} interleave, {} SKU records",
        pcat.header.revision,
        pcat.tables.capability_count(),
        pcat.tables.interleave_capability_count(),
        pcat.tables.sku_count()
    );

    Ok(pcat)
}

// =============================================================================
// TESTS
// =============================================================================
