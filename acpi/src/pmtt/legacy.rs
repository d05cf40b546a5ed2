//! On-demand walk of revision 0.1 tables
//!
//! Revision 0.1 is never decoded into a [`ParsedPmtt`](super::ParsedPmtt).
//! The only question asked of it is whether 2LM can be configured, which
//! this module answers straight off the raw bytes.
//!
//! Layout: sockets at the top level, controllers nested in a socket,
//! modules nested in a controller. An enabled element is entered (its
//! children follow its fixed fields); a disabled one is stepped over whole.

use crate::cursor::ByteReader;
use crate::error::{AcpiError, AcpiResult};

use super::element_type;

/// Size of the 0.1 common header
pub const COMMON_HEADER_SIZE: usize = 8;

/// Fixed part of a socket element after the common header
const SOCKET_BODY: usize = 4;

/// Fixed part of a controller element after the common header
const CONTROLLER_BODY: usize = 20;

/// Offset of the proximity domain count within a controller body
const DOMAIN_COUNT_OFFSET: usize = 18;

/// Module element after the common header
const MODULE_BODY: usize = 12;

/// Offset of the module size within a module body
const MODULE_SIZE_OFFSET: usize = 4;

/// Persistent memory flag of a 0.1 module
const PERSISTENT_FLAG: u16 = 1 << 2;

#[derive(Debug, Clone, Copy)]
struct LegacyHeader {
    kind: u8,
    length: u16,
    flags: u16,
}

impl LegacyHeader {
    fn at(table: &[u8], offset: usize) -> AcpiResult<Self> {
        let mut r = ByteReader::at(table, offset)?;
        let kind = r.u8()?;
        r.skip(1)?;
        let length = r.u16()?;
        let flags = r.u16()?;
        Ok(Self {
            kind,
            length,
            flags,
        })
    }

    fn enabled(&self) -> bool {
        self.flags != 0
    }
}

/// Offset just past a disabled element
fn step_over(header: &LegacyHeader, offset: usize) -> AcpiResult<usize> {
    if header.length == 0 {
        log::debug!("zero length PMTT 0.1 element at offset {:#x}", offset);
        return Err(AcpiError::CorruptTable);
    }
    Ok(offset + header.length as usize)
}

fn kind_at(table: &[u8], offset: usize) -> AcpiResult<Option<u8>> {
    if offset >= table.len() {
        return Ok(None);
    }
    LegacyHeader::at(table, offset).map(|h| Some(h.kind))
}

/// Decide whether the topology of a validated 0.1 table permits 2LM
///
/// `table` must already be cut to its declared length. Any enabled
/// controller holding a populated DDR module without a populated persistent
/// module forbids 2LM; otherwise one enabled controller is enough to allow
/// it.
pub fn allows_two_level_memory(table: &[u8], start: usize) -> AcpiResult<bool> {
    let mut offset = start;
    let mut allowed = false;

    while kind_at(table, offset)? == Some(element_type::SOCKET) {
        let socket = LegacyHeader::at(table, offset)?;
        if !socket.enabled() {
            offset = step_over(&socket, offset)?;
            continue;
        }
        offset += COMMON_HEADER_SIZE + SOCKET_BODY;

        while kind_at(table, offset)? == Some(element_type::CONTROLLER) {
            let controller = LegacyHeader::at(table, offset)?;
            if !controller.enabled() {
                offset = step_over(&controller, offset)?;
                continue;
            }
            let domains = ByteReader::at(
                table,
                offset + COMMON_HEADER_SIZE + DOMAIN_COUNT_OFFSET,
            )?
            .u16()? as usize;
            // Modules follow the proximity domain list, not a fixed-size body.
            offset += COMMON_HEADER_SIZE + CONTROLLER_BODY + 4 * domains;

            let mut has_ddr = false;
            let mut has_pmem = false;
            while kind_at(table, offset)? == Some(element_type::MODULE) {
                let module = LegacyHeader::at(table, offset)?;
                let size = ByteReader::at(
                    table,
                    offset + COMMON_HEADER_SIZE + MODULE_SIZE_OFFSET,
                )?
                .u32()?;
                if !has_pmem && size > 0 {
                    if module.flags & PERSISTENT_FLAG != 0 {
                        has_pmem = true;
                    } else {
                        has_ddr = true;
                    }
                }
                offset += COMMON_HEADER_SIZE + MODULE_BODY;
            }

            if has_ddr && !has_pmem {
                log::debug!("controller with DDR but no persistent module, 2LM not allowed");
                return Ok(false);
            }
            allowed = true;
        }
    }

    Ok(allowed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::pmtt::legacy as build;
    use crate::test_support::TableBuilder;
    use alloc::vec::Vec;

    const ON: u16 = 1;
    const PMEM: u16 = 1 | PERSISTENT_FLAG;

    fn table(sockets: &[Vec<u8>]) -> Vec<u8> {
        let mut b = TableBuilder::new(*b"PMTT", 0x01, 4);
        for s in sockets {
            b = b.raw(s);
        }
        b.build()
    }

    fn walk(bytes: &[u8]) -> AcpiResult<bool> {
        allows_two_level_memory(bytes, 40)
    }

    #[test]
    fn test_ddr_with_pmem_allows() {
        let imc = build::controller(ON, &[0], &[build::module(ON, 16384), build::module(PMEM, 131072)]);
        let t = table(&[build::socket(ON, &[imc])]);
        assert_eq!(walk(&t), Ok(true));
    }

    #[test]
    fn test_ddr_only_controller_forbids() {
        let good = build::controller(ON, &[], &[build::module(PMEM, 1), build::module(ON, 1)]);
        let bad = build::controller(ON, &[0, 1], &[build::module(ON, 16384)]);
        let t = table(&[build::socket(ON, &[good, bad])]);
        assert_eq!(walk(&t), Ok(false));
    }

    #[test]
    fn test_disabled_elements_skipped() {
        let bad = build::controller(ON, &[], &[build::module(ON, 16384)]);
        let off_socket = build::socket(0, &[bad]);
        let off_imc = build::controller(0, &[], &[build::module(ON, 16384)]);
        let good = build::controller(ON, &[], &[build::module(PMEM, 1)]);
        let t = table(&[off_socket, build::socket(ON, &[off_imc, good])]);
        assert_eq!(walk(&t), Ok(true));
    }

    #[test]
    fn test_empty_modules_ignored() {
        let imc = build::controller(ON, &[], &[build::module(ON, 0)]);
        let t = table(&[build::socket(ON, &[imc])]);
        assert_eq!(walk(&t), Ok(true));
    }

    #[test]
    fn test_no_controllers() {
        let t = table(&[build::socket(ON, &[])]);
        assert_eq!(walk(&t), Ok(false));
        assert_eq!(walk(&table(&[])), Ok(false));
    }

    #[test]
    fn test_modules_found_past_domain_list() {
        let pmem = build::controller(ON, &[0, 1, 2], &[build::module(PMEM, 1)]);
        let t = table(&[build::socket(ON, &[pmem])]);
        assert_eq!(walk(&t), Ok(true));

        let ddr = build::controller(ON, &[0, 1, 2], &[build::module(ON, 1)]);
        let t = table(&[build::socket(ON, &[ddr])]);
        assert_eq!(walk(&t), Ok(false));
    }

    #[test]
    fn test_zero_length_disabled_element_is_corrupt() {
        let mut off_socket = build::socket(0, &[]);
        off_socket[2..4].copy_from_slice(&0u16.to_le_bytes());
        assert_eq!(walk(&table(&[off_socket])), Err(AcpiError::CorruptTable));

        let mut off_imc = build::controller(0, &[], &[]);
        off_imc[2..4].copy_from_slice(&0u16.to_le_bytes());
        let t = table(&[build::socket(ON, &[off_imc])]);
        assert_eq!(walk(&t), Err(AcpiError::CorruptTable));
    }

    #[test]
    fn test_truncated_element() {
        let imc = build::controller(ON, &[], &[build::module(ON, 16384)]);
        let mut t = table(&[build::socket(ON, &[imc])]);
        t.truncate(t.len() - 6);
        assert!(walk(&t).is_err());
    }
}
