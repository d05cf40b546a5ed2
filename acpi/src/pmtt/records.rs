//! PMTT 0.2 element records

use alloc::boxed::Box;

use bitflags::bitflags;
use static_assertions::const_assert_eq;

use crate::collector::{self, SubTable};
use crate::cursor::{ByteReader, SubTableHeader};
use crate::error::AcpiResult;
use crate::guid::Guid;

// =============================================================================
// COMMON HEADER
// =============================================================================

bitflags! {
    /// PMTT element flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PmttFlags: u16 {
        /// Element is a physical part of the topology
        const PHYSICAL_ELEMENT = 1 << 0;
        /// Low bit of the memory kind field: persistent memory
        const PERSISTENT = 1 << 2;
        /// High bit of the memory kind field
        const KIND_HIGH = 1 << 3;
    }
}

impl PmttFlags {
    /// Both memory kind bits set; the kind is unspecified
    pub const RESERVED_KIND: Self = Self::PERSISTENT.union(Self::KIND_HIGH);

    /// Check if the memory kind field holds the reserved encoding
    pub fn is_kind_reserved(self) -> bool {
        self.contains(Self::RESERVED_KIND)
    }
}

/// Element type tags
pub mod element_type {
    /// Socket
    pub const SOCKET: u8 = 0;
    /// Memory controller
    pub const CONTROLLER: u8 = 1;
    /// Memory module
    pub const MODULE: u8 = 2;
    /// Vendor specific element, identified by a type GUID
    pub const VENDOR: u8 = 0xFF;
}

/// Common header of every 0.2 element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmttCommonHeader {
    /// Element type
    pub kind: u8,
    /// Element length, children included
    pub length: u16,
    /// Flags
    pub flags: PmttFlags,
    /// Number of memory devices below this element
    pub memory_devices: u32,
}

impl SubTableHeader for PmttCommonHeader {
    const SIZE: usize = 12;

    fn decode(reader: &mut ByteReader<'_>) -> AcpiResult<Self> {
        let kind = reader.u8()?;
        reader.skip(1)?;
        let length = reader.u16()?;
        let flags = PmttFlags::from_bits_retain(reader.u16()?);
        reader.skip(2)?;
        Ok(Self {
            kind,
            length,
            flags,
            memory_devices: reader.u32()?,
        })
    }

    fn length(&self) -> usize {
        self.length as usize
    }
}

fn common_header(raw: &[u8]) -> AcpiResult<PmttCommonHeader> {
    PmttCommonHeader::decode(&mut ByteReader::new(raw))
}

// =============================================================================
// ELEMENTS
// =============================================================================

/// Socket element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmttSocket {
    /// Common header
    pub header: PmttCommonHeader,
    /// Physical socket ID
    pub socket_id: u16,
    raw: Box<[u8]>,
}

impl SubTable for PmttSocket {
    const MIN_SIZE: usize = PmttCommonHeader::SIZE + 2 + 2;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let header = common_header(&raw)?;
        let socket_id = collector::body(&raw, PmttCommonHeader::SIZE)?.u16()?;
        Ok(Self {
            header,
            socket_id,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Memory controller element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmttController {
    /// Common header
    pub header: PmttCommonHeader,
    /// Memory controller ID
    pub controller_id: u16,
    raw: Box<[u8]>,
}

impl SubTable for PmttController {
    const MIN_SIZE: usize = PmttCommonHeader::SIZE + 2 + 2;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let header = common_header(&raw)?;
        let controller_id = collector::body(&raw, PmttCommonHeader::SIZE)?.u16()?;
        Ok(Self {
            header,
            controller_id,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// Kind of a vendor specific element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VendorElementKind {
    /// Die inside a socket
    Die,
    /// Memory channel
    Channel,
    /// Module slot
    Slot,
}

/// Type GUIDs that identify die, channel and slot vendor elements
///
/// These are platform definitions published alongside the firmware, so the
/// caller supplies them. An element whose type matches none of the three is
/// skipped by the walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorTypeIds {
    /// Die inside a socket
    pub die: Guid,
    /// Memory channel under a controller
    pub channel: Guid,
    /// Module slot on a channel
    pub slot: Guid,
}

impl VendorTypeIds {
    /// Classify a vendor type GUID
    pub fn classify(&self, type_id: &Guid) -> Option<VendorElementKind> {
        match *type_id {
            g if g.is_null() => None,
            g if g == self.die => Some(VendorElementKind::Die),
            g if g == self.channel => Some(VendorElementKind::Channel),
            g if g == self.slot => Some(VendorElementKind::Slot),
            _ => None,
        }
    }
}

/// Vendor specific element (die, channel or slot)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmttVendorElement {
    /// Common header
    pub header: PmttCommonHeader,
    /// Vendor type GUID
    pub type_id: Guid,
    /// Device ID within its parent
    pub device_id: u16,
    raw: Box<[u8]>,
}

impl PmttVendorElement {
    /// Offset of the type GUID
    pub const TYPE_ID_OFFSET: usize = PmttCommonHeader::SIZE;

    /// Peek at the type GUID of an undecoded element
    pub fn type_id_of(bytes: &[u8]) -> AcpiResult<Guid> {
        ByteReader::at(bytes, Self::TYPE_ID_OFFSET)?.guid()
    }

    /// Vendor data following the fixed fields
    pub fn data(&self) -> &[u8] {
        &self.raw[Self::MIN_SIZE..]
    }
}

impl SubTable for PmttVendorElement {
    const MIN_SIZE: usize = PmttCommonHeader::SIZE + Guid::SIZE + 2 + 2;

    fn decode(raw: Box<[u8]>) -> AcpiResult<Self> {
        let header = common_header(&raw)?;
        let mut r = collector::body(&raw, Self::TYPE_ID_OFFSET)?;
        let type_id = r.guid()?;
        let device_id = r.u16()?;
        Ok(Self {
            header,
            type_id,
            device_id,
            raw,
        })
    }

    fn as_bytes(&self) -> &[u8] {
        &self.raw
    }
}

const_assert_eq!(PmttSocket::MIN_SIZE, 16);
const_assert_eq!(PmttController::MIN_SIZE, 16);
const_assert_eq!(PmttVendorElement::MIN_SIZE, 32);

// =============================================================================
// MODULES
// =============================================================================

/// Memory technology of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Persistent memory module
    Persistent,
    /// Volatile DDR module
    Ddr,
}

/// Where a module sits in the topology
///
/// Each field is the ID of the nearest preceding ancestor of that kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModuleLocation {
    /// Physical socket ID
    pub socket_id: u16,
    /// Die ID
    pub die_id: u16,
    /// Logical CPU ID: memory devices of earlier sockets plus the die ID
    pub cpu_id: u16,
    /// Memory controller ID
    pub controller_id: u16,
    /// Channel ID
    pub channel_id: u16,
    /// Slot ID
    pub slot_id: u16,
}

/// A module element with its resolved location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PmttModule {
    /// Common header
    pub header: PmttCommonHeader,
    /// SMBIOS type 17 handle, masked to 16 bits
    pub smbios_handle: u32,
    /// Memory technology
    pub kind: ModuleKind,
    /// Location in the topology
    pub location: ModuleLocation,
}

impl PmttModule {
    /// Encoded size of a module element
    pub const SIZE: usize = PmttCommonHeader::SIZE + 4;

    /// SMBIOS handles are 16 bits wide
    pub const SMBIOS_HANDLE_MASK: u32 = 0xFFFF;

    /// Decode a module element and stamp it with `location`
    pub fn decode(
        header: PmttCommonHeader,
        bytes: &[u8],
        location: ModuleLocation,
    ) -> AcpiResult<Self> {
        let handle = ByteReader::at(bytes, PmttCommonHeader::SIZE)?.u32()?;
        let kind = if header.flags.contains(PmttFlags::PERSISTENT) {
            ModuleKind::Persistent
        } else {
            ModuleKind::Ddr
        };
        Ok(Self {
            header,
            smbios_handle: handle & Self::SMBIOS_HANDLE_MASK,
            kind,
            location,
        })
    }

    /// Check if this module shares socket, die and controller with `other`
    pub fn same_controller(&self, other: &Self) -> bool {
        self.location.socket_id == other.location.socket_id
            && self.location.die_id == other.location.die_id
            && self.location.controller_id == other.location.controller_id
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pmtt as build;

    #[test]
    fn test_reserved_kind() {
        assert!(PmttFlags::from_bits_retain(0b1101).is_kind_reserved());
        assert!(!PmttFlags::from_bits_retain(0b0101).is_kind_reserved());
    }

    #[test]
    fn test_vendor_kind_lookup() {
        let ids = build::VENDOR_TYPES;
        assert_eq!(ids.classify(&ids.die), Some(VendorElementKind::Die));
        assert_eq!(ids.classify(&ids.channel), Some(VendorElementKind::Channel));
        assert_eq!(ids.classify(&ids.slot), Some(VendorElementKind::Slot));
        assert_eq!(ids.classify(&Guid::null()), None);
    }

    #[test]
    fn test_null_vendor_ids_match_nothing() {
        let unset = VendorTypeIds {
            die: Guid::null(),
            channel: Guid::null(),
            slot: Guid::null(),
        };
        assert_eq!(unset.classify(&Guid::null()), None);
        assert_eq!(unset.classify(&build::VENDOR_TYPES.die), None);
    }

    #[test]
    fn test_module_handle_masked() {
        let bytes = build::module(0xABCD_1234, build::PMEM);
        let header = common_header(&bytes).expect("header");
        let module =
            PmttModule::decode(header, &bytes, ModuleLocation::default()).expect("module");
        assert_eq!(module.smbios_handle, 0x1234);
        assert_eq!(module.kind, ModuleKind::Persistent);
    }

    #[test]
    fn test_vendor_type_peek() {
        let slot = build::VENDOR_TYPES.slot;
        let bytes = build::vendor(slot, 3, 1, build::PHYSICAL);
        assert_eq!(PmttVendorElement::type_id_of(&bytes), Ok(slot));
        assert!(PmttVendorElement::type_id_of(&bytes[..20]).is_err());
    }
}
