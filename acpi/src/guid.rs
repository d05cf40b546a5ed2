//! GUID handling
//!
//! Firmware stores GUIDs mixed-endian: the first three groups little-endian,
//! the last eight bytes as-is.

use core::fmt;

// =============================================================================
// GUID STRUCTURE
// =============================================================================

/// GUID (Globally Unique Identifier)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    /// Data 1 (time-low)
    pub data1: u32,
    /// Data 2 (time-mid)
    pub data2: u16,
    /// Data 3 (time-hi-and-version)
    pub data3: u16,
    /// Data 4 (clock-seq and node)
    pub data4: [u8; 8],
}

impl Guid {
    /// Encoded size
    pub const SIZE: usize = 16;

    /// Create a GUID from components
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self { data1, data2, data3, data4 }
    }

    /// Create null GUID
    pub const fn null() -> Self {
        Self::new(0, 0, 0, [0; 8])
    }

    /// Check if null
    pub fn is_null(&self) -> bool {
        *self == Self::null()
    }

    /// Decode from firmware byte order
    pub fn from_bytes_le(bytes: &[u8; 16]) -> Self {
        Self {
            data1: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_le_bytes([bytes[4], bytes[5]]),
            data3: u16::from_le_bytes([bytes[6], bytes[7]]),
            data4: [
                bytes[8], bytes[9], bytes[10], bytes[11],
                bytes[12], bytes[13], bytes[14], bytes[15],
            ],
        }
    }

    /// Encode in firmware byte order
    pub fn to_bytes_le(&self) -> [u8; 16] {
        let mut bytes = [0u8; 16];
        bytes[0..4].copy_from_slice(&self.data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.data3.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.data4);
        bytes
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7],
        )
    }
}

// =============================================================================
// SPA RANGE TYPES
// =============================================================================

/// Address range type GUIDs carried by NFIT SPA range structures
pub mod spa_range {
    use super::Guid;

    /// Volatile memory region
    pub const VOLATILE: Guid = Guid::new(
        0x7305944F, 0xFDDA, 0x44E3,
        [0xB1, 0x6C, 0x3F, 0x22, 0xD2, 0x52, 0xE5, 0xD0],
    );

    /// Byte-addressable persistent memory region
    pub const PERSISTENT: Guid = Guid::new(
        0x66F0D379, 0xB4F3, 0x4074,
        [0xAC, 0x43, 0x0D, 0x33, 0x18, 0xB7, 0x8C, 0xDB],
    );

    /// NVDIMM control region
    pub const CONTROL_REGION: Guid = Guid::new(
        0x92F701F6, 0x13B4, 0x405D,
        [0x91, 0x0B, 0x29, 0x93, 0x67, 0xE8, 0x23, 0x4C],
    );

    /// NVDIMM block data window region
    pub const BLOCK_DATA_WINDOW: Guid = Guid::new(
        0x91AF0530, 0x5D86, 0x470E,
        [0xA6, 0xB0, 0x0A, 0x2D, 0xB9, 0x40, 0x82, 0x49],
    );

    /// Virtual disk region, volatile
    pub const VIRTUAL_DISK_VOLATILE: Guid = Guid::new(
        0x77AB535A, 0x45FC, 0x624B,
        [0x55, 0x60, 0xF7, 0xB2, 0x81, 0xD1, 0xF9, 0x6E],
    );

    /// Virtual CD region, volatile
    pub const VIRTUAL_CD_VOLATILE: Guid = Guid::new(
        0x3D5ABD30, 0x4175, 0x87CE,
        [0x6D, 0x64, 0xD2, 0xAD, 0xE5, 0x23, 0xC4, 0xBB],
    );

    /// Virtual disk region, persistent
    pub const VIRTUAL_DISK_PERSISTENT: Guid = Guid::new(
        0x5CEA02C9, 0x4D07, 0x69D3,
        [0x26, 0x9F, 0x44, 0x96, 0xFB, 0xE0, 0x96, 0xF9],
    );

    /// Virtual CD region, persistent
    pub const VIRTUAL_CD_PERSISTENT: Guid = Guid::new(
        0x08018188, 0x42CD, 0xBB48,
        [0x10, 0x0F, 0x53, 0x87, 0xD5, 0x3D, 0xED, 0x3D],
    );
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::format;

    #[test]
    fn test_guid_byte_order() {
        let bytes = spa_range::PERSISTENT.to_bytes_le();
        assert_eq!(&bytes[..4], &[0x79, 0xD3, 0xF0, 0x66]);
        assert_eq!(Guid::from_bytes_le(&bytes), spa_range::PERSISTENT);
    }

    #[test]
    fn test_guid_display() {
        assert_eq!(
            format!("{}", spa_range::PERSISTENT),
            "66F0D379-B4F3-4074-AC43-0D3318B78CDB"
        );
    }

    #[test]
    fn test_null_guid() {
        assert!(Guid::null().is_null());
        assert!(!spa_range::PERSISTENT.is_null());
    }
}
