//! Byte-level builders for test tables

use alloc::vec::Vec;

use crate::cursor::byte_sum;
use crate::guid::Guid;

/// Little-endian byte sink
#[derive(Debug, Default)]
pub struct Bytes(Vec<u8>);

impl Bytes {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn u8(mut self, v: u8) -> Self {
        self.0.push(v);
        self
    }

    pub fn u16(mut self, v: u16) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(mut self, v: u32) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u64(mut self, v: u64) -> Self {
        self.0.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn guid(mut self, g: Guid) -> Self {
        self.0.extend_from_slice(&g.to_bytes_le());
        self
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.0.extend_from_slice(bytes);
        self
    }

    pub fn zeros(mut self, n: usize) -> Self {
        self.0.resize(self.0.len() + n, 0);
        self
    }

    /// Finish, patching the u16 length at `len_at` to the total size
    pub fn sized_u16(mut self, len_at: usize) -> Vec<u8> {
        let len = self.0.len() as u16;
        self.0[len_at..len_at + 2].copy_from_slice(&len.to_le_bytes());
        self.0
    }
}

/// Whole-table builder: description header, family reserved bytes, sub-tables
#[derive(Debug)]
pub struct TableBuilder {
    signature: [u8; 4],
    revision: u8,
    reserved: Vec<u8>,
    body: Vec<u8>,
}

impl TableBuilder {
    pub fn new(signature: [u8; 4], revision: u8, reserved_len: usize) -> Self {
        Self {
            signature,
            revision,
            reserved: alloc::vec![0; reserved_len],
            body: Vec::new(),
        }
    }

    /// Overwrite the family reserved bytes following the description header
    pub fn reserved(mut self, bytes: &[u8]) -> Self {
        self.reserved[..bytes.len()].copy_from_slice(bytes);
        self
    }

    /// Append one encoded sub-table
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut table = Vec::new();
        table.extend_from_slice(&self.signature);
        table.extend_from_slice(&0u32.to_le_bytes());
        table.push(self.revision);
        table.push(0);
        table.extend_from_slice(b"NVDIMM");
        table.extend_from_slice(b"TESTTBL ");
        table.extend_from_slice(&1u32.to_le_bytes());
        table.extend_from_slice(b"TEST");
        table.extend_from_slice(&1u32.to_le_bytes());
        table.extend_from_slice(&self.reserved);
        table.extend_from_slice(&self.body);

        let len = table.len() as u32;
        table[4..8].copy_from_slice(&len.to_le_bytes());
        table[9] = 0u8.wrapping_sub(byte_sum(&table));
        table
    }
}

// =============================================================================
// NFIT
// =============================================================================

pub mod nfit {
    use super::Bytes;
    use crate::guid::Guid;
    use alloc::vec::Vec;

    fn head(kind: u16) -> Bytes {
        Bytes::new().u16(kind).u16(0)
    }

    pub fn spa_range(index: u16, range_type: Guid, base: u64, length: u64) -> Vec<u8> {
        head(0)
            .u16(index)
            .u16(0)
            .u32(0)
            .u32(0)
            .guid(range_type)
            .u64(base)
            .u64(length)
            .u64(0)
            .sized_u16(2)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn region_mapping(
        handle: u32,
        pid: u16,
        spa_index: u16,
        control_region_index: u16,
        region_offset: u64,
        region_size: u64,
        interleave_index: u16,
        ways: u16,
    ) -> Vec<u8> {
        head(1)
            .u32(handle)
            .u16(pid)
            .u16(0)
            .u16(spa_index)
            .u16(control_region_index)
            .u64(region_size)
            .u64(region_offset)
            .u64(0)
            .u16(interleave_index)
            .u16(ways)
            .u16(0)
            .u16(0)
            .sized_u16(2)
    }

    pub fn interleave(index: u16, line_size: u32, offsets: &[u32]) -> Vec<u8> {
        let mut b = head(2)
            .u16(index)
            .u16(0)
            .u32(offsets.len() as u32)
            .u32(line_size);
        for &o in offsets {
            b = b.u32(o);
        }
        b.sized_u16(2)
    }

    pub fn smbios_info(data: &[u8]) -> Vec<u8> {
        head(3).u32(0).raw(data).sized_u16(2)
    }

    pub fn control_region(index: u16, vendor_id: u16) -> Vec<u8> {
        head(4)
            .u16(index)
            .u16(vendor_id)
            .u16(0x5141)
            .u16(0x0018)
            .u16(vendor_id)
            .u16(0x097A)
            .u16(0)
            .u8(1)
            .u8(0x01)
            .u16(0x1917)
            .u16(0)
            .u32(0xDEAD_BEEF)
            .u16(0x0301)
            .u16(0)
            .u64(0)
            .u64(0)
            .u64(0)
            .u64(0)
            .u64(0)
            .u16(0)
            .zeros(6)
            .sized_u16(2)
    }

    pub fn block_data_window(control_region_index: u16, window_size: u64) -> Vec<u8> {
        head(5)
            .u16(control_region_index)
            .u16(1)
            .u64(0)
            .u64(window_size)
            .u64(0)
            .u64(0)
            .sized_u16(2)
    }

    pub fn flush_hint(handle: u32, addresses: &[u64]) -> Vec<u8> {
        let mut b = head(6).u32(handle).u16(addresses.len() as u16).zeros(6);
        for &a in addresses {
            b = b.u64(a);
        }
        b.sized_u16(2)
    }

    pub fn platform_capabilities(highest: u8, capabilities: u32) -> Vec<u8> {
        head(7)
            .u8(highest)
            .zeros(3)
            .u32(capabilities)
            .u32(0)
            .sized_u16(2)
    }
}

// =============================================================================
// PCAT
// =============================================================================

pub mod pcat {
    use super::Bytes;
    use crate::guid::Guid;
    use alloc::vec::Vec;

    fn head(kind: u16) -> Bytes {
        Bytes::new().u16(kind).u16(0)
    }

    pub fn capability_v0(config_input: u8, modes: u8, current: u8) -> Vec<u8> {
        head(0)
            .u8(config_input)
            .u8(modes)
            .u8(current)
            .u8(0)
            .zeros(8)
            .sized_u16(2)
    }

    pub fn capability_v1(config_input: u8, modes: u8, current: u8, max_sets: u16) -> Vec<u8> {
        head(0)
            .u8(config_input)
            .u8(modes)
            .u8(current)
            .u8(0)
            .u16(max_sets)
            .zeros(6)
            .sized_u16(2)
    }

    pub fn interleave_v0(memory_mode: u8, alignment: u16, formats: &[u32]) -> Vec<u8> {
        let mut b = head(1)
            .u8(memory_mode)
            .zeros(3)
            .u16(alignment)
            .u16(formats.len() as u16);
        for &f in formats {
            b = b.u32(f);
        }
        b.sized_u16(2)
    }

    pub fn interleave_v1(memory_mode: u8, size: u16, alignment: u32, formats: &[u32]) -> Vec<u8> {
        let mut b = head(1)
            .u8(memory_mode)
            .zeros(3)
            .u16(size)
            .u16(formats.len() as u16)
            .u32(alignment);
        for &f in formats {
            b = b.u32(f);
        }
        b.sized_u16(2)
    }

    pub fn runtime_interface(address: u64) -> Vec<u8> {
        head(2)
            .u8(1)
            .u8(32)
            .u8(0)
            .u8(3)
            .u64(address)
            .zeros(8)
            .sized_u16(2)
    }

    pub fn management_attributes(vendor_id: u16, guid: Guid, data: &[u8]) -> Vec<u8> {
        head(3)
            .u16(0)
            .u16(vendor_id)
            .guid(guid)
            .raw(data)
            .sized_u16(2)
    }

    pub fn socket_sku(socket: u16, die: u16, mapped_limit: u64, total: u64, cached: u64) -> Vec<u8> {
        head(6)
            .u16(socket)
            .u16(die)
            .u64(mapped_limit)
            .u64(total)
            .u64(cached)
            .sized_u16(2)
    }
}

// =============================================================================
// PMTT
// =============================================================================

pub mod pmtt {
    use super::Bytes;
    use crate::guid::Guid;
    use crate::pmtt::VendorTypeIds;
    use alloc::vec::Vec;

    /// Vendor element type GUIDs used by the fixture tables
    pub const VENDOR_TYPES: VendorTypeIds = VendorTypeIds {
        die: Guid::new(0x0000_D1E0, 0x0001, 0x0002, [0x10, 0, 0, 0, 0, 0, 0, 0x01]),
        channel: Guid::new(0x0000_C4A0, 0x0001, 0x0002, [0x10, 0, 0, 0, 0, 0, 0, 0x02]),
        slot: Guid::new(0x0000_5107, 0x0001, 0x0002, [0x10, 0, 0, 0, 0, 0, 0, 0x03]),
    };

    /// Physical element flag
    pub const PHYSICAL: u16 = 1 << 0;
    /// Physical, persistent memory
    pub const PMEM: u16 = PHYSICAL | (1 << 2);
    /// Physical, volatile memory
    pub const DDR: u16 = PHYSICAL;
    /// Physical, memory kind reserved
    pub const RESERVED_KIND: u16 = PHYSICAL | (0b11 << 2);

    fn head(kind: u8, flags: u16, devices: u32) -> Bytes {
        Bytes::new().u8(kind).u8(0).u16(0).u16(flags).u16(0).u32(devices)
    }

    pub fn socket(socket_id: u16, devices: u32, flags: u16) -> Vec<u8> {
        head(0, flags, devices).u16(socket_id).u16(0).sized_u16(2)
    }

    pub fn controller(controller_id: u16, devices: u32, flags: u16) -> Vec<u8> {
        head(1, flags, devices).u16(controller_id).u16(0).sized_u16(2)
    }

    pub fn module(smbios_handle: u32, flags: u16) -> Vec<u8> {
        head(2, flags, 0).u32(smbios_handle).sized_u16(2)
    }

    pub fn vendor(type_id: Guid, device_id: u16, devices: u32, flags: u16) -> Vec<u8> {
        head(0xFF, flags, devices)
            .guid(type_id)
            .u16(device_id)
            .u16(0)
            .sized_u16(2)
    }

    /// Sub-tables of a revision 0.1 table
    pub mod legacy {
        use super::Bytes;
        use alloc::vec::Vec;

        fn head(kind: u8, flags: u16) -> Bytes {
            Bytes::new().u8(kind).u8(0).u16(0).u16(flags).u16(0)
        }

        /// Socket header; children are appended by the caller
        pub fn socket(flags: u16, children: &[Vec<u8>]) -> Vec<u8> {
            let mut b = head(0, flags).u16(0).u16(0);
            for c in children {
                b = b.raw(c);
            }
            b.sized_u16(2)
        }

        pub fn controller(flags: u16, domains: &[u32], children: &[Vec<u8>]) -> Vec<u8> {
            let mut b = head(1, flags)
                .zeros(18)
                .u16(domains.len() as u16);
            for &d in domains {
                b = b.u32(d);
            }
            for c in children {
                b = b.raw(c);
            }
            b.sized_u16(2)
        }

        pub fn module(flags: u16, size_mib: u32) -> Vec<u8> {
            head(2, flags)
                .u16(0)
                .u16(0)
                .u32(size_mib)
                .u32(0)
                .sized_u16(2)
        }
    }
}
