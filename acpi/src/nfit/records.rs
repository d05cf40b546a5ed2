//! NFIT sub-table records
//!
//! Each record keeps the owned copy of its sub-table bytes next to the
//! decoded fixed fields, so consumers that interpret the raw layout
//! downstream see exactly what firmware published.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::collector::{self, SubTable};
use crate::cursor::{ByteReader, SubTableHeader};
use crate::error::AcpiResult;
use crate::guid::{spa_range, Guid};

// =============================================================================
// SUB-TABLE HEADER
// =============================================================================

/// NFIT sub-table header: type and length, both u16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NfitSubTableHeader {
    /// Structure type
    pub kind: u16,
    /// Structure length, header included
    pub length: u16,
}

impl SubTableHeader for NfitSubTableHeader {
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

/// NFIT structure types this crate collects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NfitSubTableType {
    /// System physical address range
    SpaRange = 0,
    /// NVDIMM region mapping
    RegionMapping = 1,
    /// Interleave
    Interleave = 2,
    /// SMBIOS management information
    SmbiosManagementInfo = 3,
    /// NVDIMM control region
    ControlRegion = 4,
    /// NVDIMM block data window region
    BlockDataWindow = 5,
    /// Flush hint address
    FlushHint = 6,
    /// Platform capabilities
    PlatformCapabilities = 7,
}

impl NfitSubTableType {
    /// Map a raw type tag; `None` for types this crate skips
    pub fn from_raw(kind: u16) -> Option<Self> {
        Some(match kind {
            0 => Self::SpaRange,
            1 => Self::RegionMapping,
            2 => Self::Interleave,
            3 => Self::SmbiosManagementInfo,
            4 => Self::ControlRegion,
            5 => Self::BlockDataWindow,
            6 => Self::FlushHint,
            7 => Self::PlatformCapabilities,
            _ => return None,
        })
    }
}

// =============================================================================
// DEVICE HANDLE
// =============================================================================

/// NFIT device handle, the platform address of one module
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DeviceHandle(pub u32);

impl DeviceHandle {
    /// Module number within the channel
    pub const fn dimm_number(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// Memory channel number
    pub const fn channel(self) -> u8 {
        ((self.0 >> 4) & 0xF) as u8
    }

    /// Memory controller ID
    pub const fn memory_controller(self) -> u8 {
        ((self.0 >> 8) & 0xF) as u8
    }

    /// Socket ID
    pub const fn socket(self) -> u8 {
        ((self.0 >> 12) & 0xF) as u8
    }

    /// Node controller ID
    pub const fn node_controller(self) -> u16 {
        ((self.0 >> 16) & 0xFFF) as u16
    }

    /// Raw handle value
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl core::fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "DeviceHandle({:#010x})", self.0)
    }
}

// =============================================================================
// SPA RANGE
// =============================================================================

bitflags! {
    /// SPA range structure flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SpaRangeFlags: u16 {
        /// Control region is only for hot add / online operation
        const HOT_ADD_ONLY = 1 << 0;
        /// Proximity domain field is valid
        const PROXIMITY_DOMAIN_VALID = 1 << 1;
        /// SPA location cookie is valid
        const LOCATION_COOKIE_VALID = 1 << 2;
    }
}

/// Classification of a SPA range by its address range type GUID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaRangeKind {
    /// Volatile memory
    Volatile,
    /// Byte-addressable persistent memory
    Persistent,
    /// NVDIMM control region
    ControlRegion,
    /// NVDIMM block data window
    BlockDataWindow,
    /// Virtual disk or CD image, volatile
    VirtualVolatile,
    /// Virtual disk or CD image, persistent
    VirtualPersistent,
    /// Any other type GUID
    Other,
}

/// System physical address range structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpaRange {
    /// SPA range structure index
    pub index: u16,
    /// Flags
    pub flags: SpaRangeFlags,
    /// Proximity domain
    pub proximity_domain: u32,
    /// Address range type GUID
    pub range_type: Guid,
    /// System physical address range base
    pub base: u64,
    /// System physical address range length
    pub length: u64,
    /// Address range memory mapping attribute
    pub mapping_attributes: u64,
    raw: Box<[u8]>,
}

impl SpaRange {
    /// Classify the range by its type GUID
    pub fn range_kind(&self) -> SpaRangeKind {
        match self.range_type {
            g if g == spa_range::VOLATILE => SpaRangeKind::Volatile,
            g if g == spa_range::PERSISTENT => SpaRangeKind::Persistent,
            g if g == spa_range::CONTROL_REGION => SpaRangeKind::ControlRegion,
            g if g == spa_range::BLOCK_DATA_WINDOW => SpaRangeKind::BlockDataWindow,
            g if g == spa_range::VIRTUAL_DISK_VOLATILE || g == spa_range::VIRTUAL_CD_VOLATILE => {
                SpaRangeKind::VirtualVolatile
            }
            g if g == spa_range::VIRTUAL_DISK_PERSISTENT
                || g == spa_range::VIRTUAL_CD_PERSISTENT =>
            {
                SpaRangeKind::VirtualPersistent
            }
            _ => SpaRangeKind::Other,
        }
    }

    /// Check if `address` lies within the range
    pub fn contains(&self, address: u64) -> bool {
        address >= self.base && address - self.base < self.length
    }
}

impl SubTable for SpaRange {
    const MIN_SIZE: usize = 4 + 2 + 2 + 4 + 4 + Guid::SIZE + 8 + 8 + 8;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let index = r.u16()?;
        let flags = SpaRangeFlags::from_bits_retain(r.u16()?);
        r.skip(4)?;
        let proximity_domain = r.u32()?;
        let range_type = r.guid()?;
        let base = r.u64()?;
        let length = r.u64()?;
        let mapping_attributes = r.u64()?;
        Ok(Self {
            index,
            flags,
            proximity_domain,
            range_type,
            base,
            length,
            mapping_attributes,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(SpaRange::MIN_SIZE, 56);

// =============================================================================
// REGION MAPPING
// =============================================================================

bitflags! {
    /// NVDIMM state flags of a region mapping
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RegionStateFlags: u16 {
        /// Previous save operation failed
        const SAVE_FAILED = 1 << 0;
        /// Last restore operation failed
        const RESTORE_FAILED = 1 << 1;
        /// Platform flush of data failed
        const FLUSH_FAILED = 1 << 2;
        /// Device is not armed for persistence
        const NOT_ARMED = 1 << 3;
        /// SMART events observed before OS handoff
        const SMART_EVENTS_OBSERVED = 1 << 4;
        /// Platform firmware enabled SMART event notification
        const SMART_EVENTS_ENABLED = 1 << 5;
        /// Device could not be mapped into a SPA range
        const NOT_MAPPED = 1 << 6;
    }
}

/// NVDIMM region mapping structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionMapping {
    /// Device handle
    pub device_handle: DeviceHandle,
    /// NVDIMM physical ID
    pub physical_id: u16,
    /// NVDIMM region ID
    pub region_id: u16,
    /// SPA range structure index
    pub spa_range_index: u16,
    /// Control region structure index
    pub control_region_index: u16,
    /// Region size
    pub region_size: u64,
    /// Region offset
    pub region_offset: u64,
    /// NVDIMM physical address region base
    pub region_base: u64,
    /// Interleave structure index
    pub interleave_index: u16,
    /// Interleave ways
    pub interleave_ways: u16,
    /// NVDIMM state flags
    pub state_flags: RegionStateFlags,
    raw: Box<[u8]>,
}

impl SubTable for RegionMapping {
    const MIN_SIZE: usize = 4 + 4 + 2 * 4 + 8 * 3 + 2 * 4;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        Ok(Self {
            device_handle: DeviceHandle(r.u32()?),
            physical_id: r.u16()?,
            region_id: r.u16()?,
            spa_range_index: r.u16()?,
            control_region_index: r.u16()?,
            region_size: r.u64()?,
            region_offset: r.u64()?,
            region_base: r.u64()?,
            interleave_index: r.u16()?,
            interleave_ways: r.u16()?,
            state_flags: RegionStateFlags::from_bits_retain(r.u16()?),
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(RegionMapping::MIN_SIZE, 48);

// =============================================================================
// INTERLEAVE
// =============================================================================

/// Interleave structure
///
/// Describes how a region's lines rotate across the modules of an
/// interleave set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveDescriptor {
    /// Interleave structure index
    pub index: u16,
    /// Number of lines described
    pub line_count: u32,
    /// Line size in bytes
    pub line_size: u32,
    line_offsets: Vec<u32>,
    raw: Box<[u8]>,
}

impl InterleaveDescriptor {
    /// Offsets of the described lines, in line-size units
    ///
    /// Shorter than [`Self::line_count`] only if the structure was truncated.
    pub fn line_offsets(&self) -> &[u32] {
        &self.line_offsets
    }

    /// Offset of line `line`, in line-size units
    pub fn line_offset(&self, line: usize) -> Option<u32> {
        self.line_offsets.get(line).copied()
    }
}

impl SubTable for InterleaveDescriptor {
    const MIN_SIZE: usize = 4 + 2 + 2 + 4 + 4;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let index = r.u16()?;
        r.skip(2)?;
        let line_count = r.u32()?;
        let line_size = r.u32()?;
        let line_offsets = collector::u32_list(&raw, r.position(), line_count as usize)?;
        Ok(Self {
            index,
            line_count,
            line_size,
            line_offsets,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(InterleaveDescriptor::MIN_SIZE, 16);

// =============================================================================
// SMBIOS MANAGEMENT INFORMATION
// =============================================================================

/// SMBIOS management information structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmbiosManagementInfo {
    raw: Box<[u8]>,
}

impl SmbiosManagementInfo {
    /// Embedded SMBIOS table data
    pub fn data(&self) -> &[u8] {
        &self.raw[Self::MIN_SIZE..]
    }
}

impl SubTable for SmbiosManagementInfo {
    const MIN_SIZE: usize = 4 + 4;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        Ok(Self { raw })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

// =============================================================================
// CONTROL REGION
// =============================================================================

/// NVDIMM control region structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRegion {
    /// Control region structure index
    pub index: u16,
    /// Vendor ID
    pub vendor_id: u16,
    /// Device ID
    pub device_id: u16,
    /// Revision ID
    pub revision_id: u16,
    /// Subsystem vendor ID
    pub subsystem_vendor_id: u16,
    /// Subsystem device ID
    pub subsystem_device_id: u16,
    /// Subsystem revision ID
    pub subsystem_revision_id: u16,
    /// Valid fields
    pub valid_fields: u8,
    /// Manufacturing location
    pub manufacturing_location: u8,
    /// Manufacturing date
    pub manufacturing_date: u16,
    /// Serial number
    pub serial_number: u32,
    /// Region format interface code
    pub format_interface_code: u16,
    /// Number of block control windows
    pub block_control_windows: u16,
    /// Size of a block control window
    pub block_control_window_size: u64,
    /// Command register offset in block control window
    pub command_register_offset: u64,
    /// Size of command register
    pub command_register_size: u64,
    /// Status register offset in block control window
    pub status_register_offset: u64,
    /// Size of status register
    pub status_register_size: u64,
    /// Control region flags
    pub flags: u16,
    raw: Box<[u8]>,
}

impl SubTable for ControlRegion {
    const MIN_SIZE: usize = 4 + 2 * 7 + 1 + 1 + 2 + 2 + 4 + 2 + 2 + 8 * 5 + 2 + 6;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let index = r.u16()?;
        let vendor_id = r.u16()?;
        let device_id = r.u16()?;
        let revision_id = r.u16()?;
        let subsystem_vendor_id = r.u16()?;
        let subsystem_device_id = r.u16()?;
        let subsystem_revision_id = r.u16()?;
        let valid_fields = r.u8()?;
        let manufacturing_location = r.u8()?;
        let manufacturing_date = r.u16()?;
        r.skip(2)?;
        Ok(Self {
            index,
            vendor_id,
            device_id,
            revision_id,
            subsystem_vendor_id,
            subsystem_device_id,
            subsystem_revision_id,
            valid_fields,
            manufacturing_location,
            manufacturing_date,
            serial_number: r.u32()?,
            format_interface_code: r.u16()?,
            block_control_windows: r.u16()?,
            block_control_window_size: r.u64()?,
            command_register_offset: r.u64()?,
            command_register_size: r.u64()?,
            status_register_offset: r.u64()?,
            status_register_size: r.u64()?,
            flags: r.u16()?,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(ControlRegion::MIN_SIZE, 80);

// =============================================================================
// BLOCK DATA WINDOW
// =============================================================================

/// NVDIMM block data window region structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDataWindow {
    /// Control region structure index
    pub control_region_index: u16,
    /// Number of block data windows
    pub window_count: u16,
    /// Block data window start offset
    pub start_offset: u64,
    /// Size of a block data window
    pub window_size: u64,
    /// Block accessible memory capacity
    pub accessible_capacity: u64,
    /// Start address of the first accessible block
    pub accessible_capacity_start: u64,
    raw: Box<[u8]>,
}

impl SubTable for BlockDataWindow {
    const MIN_SIZE: usize = 4 + 2 + 2 + 8 * 4;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        Ok(Self {
            control_region_index: r.u16()?,
            window_count: r.u16()?,
            start_offset: r.u64()?,
            window_size: r.u64()?,
            accessible_capacity: r.u64()?,
            accessible_capacity_start: r.u64()?,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(BlockDataWindow::MIN_SIZE, 40);

// =============================================================================
// FLUSH HINT
// =============================================================================

/// Flush hint address structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushHint {
    /// Device handle
    pub device_handle: DeviceHandle,
    addresses: Vec<u64>,
    raw: Box<[u8]>,
}

impl FlushHint {
    /// Flush hint addresses
    pub fn addresses(&self) -> &[u64] {
        &self.addresses
    }
}

impl SubTable for FlushHint {
    const MIN_SIZE: usize = 4 + 4 + 2 + 6;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let device_handle = DeviceHandle(r.u32()?);
        let count = r.u16()?;
        let addresses = collector::u64_list(&raw, Self::MIN_SIZE, count as usize)?;
        Ok(Self {
            device_handle,
            addresses,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(FlushHint::MIN_SIZE, 16);

// =============================================================================
// PLATFORM CAPABILITIES
// =============================================================================

bitflags! {
    /// Platform capability bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PlatformCapabilityFlags: u32 {
        /// CPU cache flush to NVDIMM durability domain on power loss
        const CPU_CACHE_FLUSH = 1 << 0;
        /// Memory controller flush to NVDIMM durability domain on power loss
        const MEMORY_CONTROLLER_FLUSH = 1 << 1;
        /// Byte addressable persistent memory hardware mirroring
        const MIRRORING = 1 << 2;
    }
}

/// Platform capabilities structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Highest valid capability bit
    pub highest_valid_capability: u8,
    /// Capabilities
    pub capabilities: PlatformCapabilityFlags,
    raw: Box<[u8]>,
}

impl PlatformCapabilities {
    /// Capabilities restricted to the bits firmware declared valid
    pub fn valid_capabilities(&self) -> PlatformCapabilityFlags {
        let mask = match self.highest_valid_capability {
            31.. => u32::MAX,
            n => (1u32 << (n + 1)) - 1,
        };
        PlatformCapabilityFlags::from_bits_retain(self.capabilities.bits() & mask)
    }
}

impl SubTable for PlatformCapabilities {
    const MIN_SIZE: usize = 4 + 1 + 3 + 4 + 4;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let highest_valid_capability = r.u8()?;
        r.skip(3)?;
        Ok(Self {
            highest_valid_capability,
            capabilities: PlatformCapabilityFlags::from_bits_retain(r.u32()?),
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(PlatformCapabilities::MIN_SIZE, 16);

// =============================================================================
// TESTS
// =============================================================================
