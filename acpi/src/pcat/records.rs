//! PCAT sub-table records
//!
//! Capability, interleave and SKU records exist in two layouts. The `V0`
//! records belong to revision 0.x tables (per-socket), the `V1` records to
//! revision 1.x tables (per-die). Runtime interface and management
//! attribute records share one layout across both.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::collector::{self, SubTable};
use crate::cursor::{ByteReader, SubTableHeader};
use crate::error::{AcpiError, AcpiResult};
use crate::guid::Guid;

// =============================================================================
// SUB-TABLE HEADER
// =============================================================================

/// PCAT sub-table header: type and length, both u16
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcatSubTableHeader {
    /// Structure type
    pub kind: u16,
    /// Structure length, header included
    pub length: u16,
}

impl SubTableHeader for PcatSubTableHeader {
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

/// PCAT structure types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum PcatSubTableType {
    /// Platform capability information
    PlatformCapability = 0,
    /// Memory interleave capability information
    InterleaveCapability = 1,
    /// Re-configuration input validation interface
    RuntimeInterface = 2,
    /// Configuration management attributes extension
    ManagementAttributes = 3,
    /// Socket (0.x) or die (1.x) SKU information
    SkuInfo = 6,
}

impl PcatSubTableType {
    /// Map a raw type tag
    pub fn from_raw(kind: u16) -> Option<Self> {
        Some(match kind {
            0 => Self::PlatformCapability,
            1 => Self::InterleaveCapability,
            2 => Self::RuntimeInterface,
            3 => Self::ManagementAttributes,
            6 => Self::SkuInfo,
            _ => return None,
        })
    }
}

// =============================================================================
// MEMORY MODES
// =============================================================================

bitflags! {
    /// Memory modes the platform firmware supports
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemoryModeCapabilities: u8 {
        /// Volatile 1LM
        const ONE_LM = 1 << 0;
        /// Volatile 2LM (memory mode)
        const TWO_LM = 1 << 1;
        /// App Direct persistent memory
        const APP_DIRECT = 1 << 2;
        /// Volatile and persistent regions on the same platform
        const MIXED_MODE = 1 << 4;
    }
}

/// Volatile memory mode setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolatileMode {
    /// 1LM
    OneLm,
    /// 2LM
    TwoLm,
    /// Chosen by firmware
    Auto,
    /// Reserved encoding
    Reserved,
}

impl VolatileMode {
    /// Decode a two-bit mode field
    pub const fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::OneLm,
            1 => Self::TwoLm,
            2 => Self::Auto,
            _ => Self::Reserved,
        }
    }
}

/// Current memory mode byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentMemoryMode(pub u8);

impl CurrentMemoryMode {
    /// Mode chosen by firmware for this boot
    pub const fn current(self) -> VolatileMode {
        VolatileMode::from_bits(self.0)
    }

    /// Mode allowed by the firmware setup menu
    pub const fn allowed(self) -> VolatileMode {
        VolatileMode::from_bits(self.0 >> 2)
    }
}

/// Memory mode tag of an interleave capability record
pub mod memory_mode {
    /// 1LM
    pub const ONE_LM: u8 = 0;
    /// 2LM
    pub const TWO_LM: u8 = 1;
    /// App Direct
    pub const PM_DIRECT: u8 = 2;
    /// Cached App Direct
    pub const PM_CACHED: u8 = 3;
}

// =============================================================================
// PLATFORM CAPABILITY
// =============================================================================

fn decode_capability_head(
    raw: &[u8],
) -> AcpiResult<(u8, MemoryModeCapabilities, CurrentMemoryMode, u8, ByteReader<'_>)> {
    let mut r = collector::body(raw, 4)?;
    let config_input_support = r.u8()?;
    let modes = MemoryModeCapabilities::from_bits_retain(r.u8()?);
    let current = CurrentMemoryMode(r.u8()?);
    let pm_ras = r.u8()?;
    Ok((config_input_support, modes, current, pm_ras, r))
}

/// Platform capability information, revision 0.x
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInfoV0 {
    /// Management software config input support bits
    pub config_input_support: u8,
    /// Memory mode capabilities
    pub memory_modes: MemoryModeCapabilities,
    /// Current and allowed memory mode
    pub current_memory_mode: CurrentMemoryMode,
    /// Persistent memory RAS capability
    pub pm_ras_capability: u8,
    raw: Box<[u8]>,
}

impl SubTable for CapabilityInfoV0 {
    const MIN_SIZE: usize = 4 + 4 + 8;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let (config_input_support, memory_modes, current_memory_mode, pm_ras_capability, _) =
            decode_capability_head(&raw)?;
        Ok(Self {
            config_input_support,
            memory_modes,
            current_memory_mode,
            pm_ras_capability,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Maximum persistent memory interleave sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaxPmInterleaveSets(pub u16);

impl MaxPmInterleaveSets {
    /// Maximum sets per die
    pub const fn per_die(self) -> u8 {
        (self.0 & 0xFF) as u8
    }

    /// Maximum sets per module
    pub const fn per_module(self) -> u8 {
        (self.0 >> 8) as u8
    }
}

/// Platform capability information, revision 1.x
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInfoV1 {
    /// Management software config input support bits
    pub config_input_support: u8,
    /// Memory mode capabilities
    pub memory_modes: MemoryModeCapabilities,
    /// Current and allowed memory mode
    pub current_memory_mode: CurrentMemoryMode,
    /// Persistent memory RAS capability
    pub pm_ras_capability: u8,
    /// Maximum PM interleave sets
    pub max_pm_interleave_sets: MaxPmInterleaveSets,
    raw: Box<[u8]>,
}

impl CapabilityInfoV1 {
    const MODES_OFFSET: usize = 5;

    /// Mark mixed mode supported, in the decoded flags and the kept bytes
    pub(crate) fn force_mixed_mode(&mut self) {
        self.memory_modes |= MemoryModeCapabilities::MIXED_MODE;
        self.raw[Self::MODES_OFFSET] = self.memory_modes.bits();
    }
}

impl SubTable for CapabilityInfoV1 {
    const MIN_SIZE: usize = 4 + 4 + 2 + 6;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let (config_input_support, memory_modes, current_memory_mode, pm_ras_capability, mut r) =
            decode_capability_head(&raw)?;
        let max_pm_interleave_sets = MaxPmInterleaveSets(r.u16()?);
        Ok(Self {
            config_input_support,
            memory_modes,
            current_memory_mode,
            pm_ras_capability,
            max_pm_interleave_sets,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(CapabilityInfoV0::MIN_SIZE, 16);
const_assert_eq!(CapabilityInfoV1::MIN_SIZE, 16);

// =============================================================================
// INTERLEAVE CAPABILITY
// =============================================================================

/// One interleave format of a revision 0.x record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveFormatV0(pub u32);

impl InterleaveFormatV0 {
    /// Channel interleave size code
    pub const fn channel_size(self) -> u32 {
        self.0 & 0xFF
    }

    /// Memory controller interleave size code
    pub const fn controller_size(self) -> u32 {
        (self.0 >> 8) & 0xFF
    }

    /// Supported channel ways bitmap
    pub const fn channel_ways(self) -> u32 {
        (self.0 >> 16) & 0x7FFF
    }

    /// Format is recommended
    pub const fn recommended(self) -> bool {
        self.0 & (1 << 31) != 0
    }
}

/// One interleave format of a revision 1.x record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveFormatV1(pub u32);

impl InterleaveFormatV1 {
    /// Bitmap of the modules taking part in the interleave set
    pub const fn interleave_map(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    /// Format is recommended
    pub const fn recommended(self) -> bool {
        self.0 & (1 << 31) != 0
    }
}

fn format_list<F>(raw: &[u8], offset: usize, count: u16, wrap: fn(u32) -> F) -> AcpiResult<Vec<F>> {
    let words = collector::u32_list(raw, offset, count as usize)?;
    if words.len() != count as usize {
        log::debug!(
            "interleave capability lists {} formats, {} fit",
            count,
            words.len()
        );
        return Err(AcpiError::CorruptTable);
    }

    let mut out = Vec::new();
    out.try_reserve_exact(words.len())?;
    out.extend(words.into_iter().map(wrap));
    Ok(out)
}

/// Memory interleave capability information, revision 0.x
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveCapabilityV0 {
    /// Memory mode this record applies to
    pub memory_mode: u8,
    /// Interleave alignment size (power of two exponent)
    pub alignment_size: u16,
    formats: Vec<InterleaveFormatV0>,
    raw: Box<[u8]>,
}

impl InterleaveCapabilityV0 {
    /// Supported interleave formats
    pub fn formats(&self) -> &[InterleaveFormatV0] {
        &self.formats
    }
}

impl SubTable for InterleaveCapabilityV0 {
    const MIN_SIZE: usize = 4 + 1 + 3 + 2 + 2;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let memory_mode = r.u8()?;
        r.skip(3)?;
        let alignment_size = r.u16()?;
        let count = r.u16()?;
        let formats = format_list(&raw, Self::MIN_SIZE, count, InterleaveFormatV0)?;
        Ok(Self {
            memory_mode,
            alignment_size,
            formats,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Interleave size pair of a revision 1.x record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterleaveSize(pub u16);

impl InterleaveSize {
    /// Channel interleave size code
    pub const fn channel(self) -> u32 {
        (self.0 & 0xFF) as u32
    }

    /// Memory controller interleave size code
    pub const fn controller(self) -> u32 {
        (self.0 >> 8) as u32
    }
}

/// Memory interleave capability information, revision 1.x
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveCapabilityV1 {
    /// Memory mode this record applies to
    pub memory_mode: u8,
    /// Channel and controller interleave size
    pub interleave_size: InterleaveSize,
    /// Interleave alignment size
    pub alignment_size: u32,
    formats: Vec<InterleaveFormatV1>,
    raw: Box<[u8]>,
}

impl InterleaveCapabilityV1 {
    /// Supported interleave formats
    pub fn formats(&self) -> &[InterleaveFormatV1] {
        &self.formats
    }
}

impl SubTable for InterleaveCapabilityV1 {
    const MIN_SIZE: usize = 4 + 1 + 3 + 2 + 2 + 4;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let memory_mode = r.u8()?;
        r.skip(3)?;
        let interleave_size = InterleaveSize(r.u16()?);
        let count = r.u16()?;
        let alignment_size = r.u32()?;
        let formats = format_list(&raw, Self::MIN_SIZE, count, InterleaveFormatV1)?;
        Ok(Self {
            memory_mode,
            interleave_size,
            alignment_size,
            formats,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(InterleaveCapabilityV0::MIN_SIZE, 12);
const_assert_eq!(InterleaveCapabilityV1::MIN_SIZE, 16);

// =============================================================================
// RUNTIME INTERFACE / MANAGEMENT ATTRIBUTES
// =============================================================================

/// Re-configuration input validation interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInterface {
    /// Address space ID of the trigger register
    pub address_space_id: u8,
    /// Register bit width
    pub bit_width: u8,
    /// Register bit offset
    pub bit_offset: u8,
    /// Access size
    pub access_size: u8,
    /// Register address
    pub address: u64,
    raw: Box<[u8]>,
}

impl SubTable for RuntimeInterface {
    const MIN_SIZE: usize = 4 + 4 + 8;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        Ok(Self {
            address_space_id: r.u8()?,
            bit_width: r.u8()?,
            bit_offset: r.u8()?,
            access_size: r.u8()?,
            address: r.u64()?,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Configuration management attributes extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementAttributes {
    /// Vendor ID
    pub vendor_id: u16,
    /// Attribute GUID
    pub guid: Guid,
    raw: Box<[u8]>,
}

impl ManagementAttributes {
    /// Vendor data following the GUID
    pub fn data(&self) -> &[u8] {
        &self.raw[Self::MIN_SIZE..]
    }
}

impl SubTable for ManagementAttributes {
    const MIN_SIZE: usize = 4 + 2 + 2 + Guid::SIZE;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        r.skip(2)?;
        let vendor_id = r.u16()?;
        let guid = r.guid()?;
        Ok(Self {
            vendor_id,
            guid,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(ManagementAttributes::MIN_SIZE, 24);

// =============================================================================
// SKU LIMITS
// =============================================================================

/// Socket SKU information, revision 0.x
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketSku {
    /// Socket ID
    pub socket_id: u16,
    /// Mapped memory size limit
    pub mapped_memory_limit: u64,
    /// Total memory size mapped into SPA
    pub total_mapped_memory: u64,
    /// Memory used as 2LM cache
    pub cached_memory: u64,
    raw: Box<[u8]>,
}

impl SubTable for SocketSku {
    const MIN_SIZE: usize = 4 + 2 + 2 + 8 * 3;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        let socket_id = r.u16()?;
        r.skip(2)?;
        Ok(Self {
            socket_id,
            mapped_memory_limit: r.u64()?,
            total_mapped_memory: r.u64()?,
            cached_memory: r.u64()?,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Die SKU information, revision 1.x
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DieSku {
    /// Physical socket ID
    pub socket_id: u16,
    /// Die ID within the socket
    pub die_id: u16,
    /// Mapped memory size limit
    pub mapped_memory_limit: u64,
    /// Total memory size mapped into SPA
    pub total_mapped_memory: u64,
    /// Memory used as 2LM cache
    pub cached_memory: u64,
    raw: Box<[u8]>,
}

impl SubTable for DieSku {
    const MIN_SIZE: usize = 4 + 2 + 2 + 8 * 3;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let mut r = collector::body(&raw, 4)?;
        Ok(Self {
            socket_id: r.u16()?,
            die_id: r.u16()?,
            mapped_memory_limit: r.u64()?,
            total_mapped_memory: r.u64()?,
            cached_memory: r.u64()?,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(SocketSku::MIN_SIZE, 32);
const_assert_eq!(DieSku::MIN_SIZE, 32);

// =============================================================================
// TESTS
// =============================================================================
