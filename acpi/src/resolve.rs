//! Cross-reference resolvers
//!
//! Lookups over already-parsed tables. NFIT structures point at one another
//! through self-declared indices and device handles; the PMTT links physical
//! socket and die IDs to logical ones. None of these allocate, and a missing
//! target is always [`AcpiError::NotFound`].

use heapless::Vec as FixedVec;

use crate::error::{AcpiError, AcpiResult};
use crate::guid::Guid;
use crate::nfit::{
    BlockDataWindow, ControlRegion, FlushHint, InterleaveDescriptor, ParsedNfit, RegionMapping,
    SpaRange,
};
use crate::pmtt::{ParsedPmtt, PmttModule};

/// Physical ID meaning "every module"; never a lookup key
pub const PID_ALL: u16 = 0xFFFF;

/// Physical ID of a module that has none assigned; never a lookup key
pub const PID_INVALID: u16 = 0xFFFE;

// =============================================================================
// NFIT
// =============================================================================

impl ParsedNfit {
    /// SPA range with the given index (first match)
    pub fn spa_range(&self, index: u16) -> AcpiResult<&SpaRange> {
        self.spa_ranges
            .iter()
            .find(|r| r.index == index)
            .ok_or(AcpiError::NotFound)
    }

    /// Interleave structure with the given index (first match)
    pub fn interleave(&self, index: u16) -> AcpiResult<&InterleaveDescriptor> {
        self.interleaves
            .iter()
            .find(|i| i.index == index)
            .ok_or(AcpiError::NotFound)
    }

    /// First region mapping for module `pid` matching the optional filters
    ///
    /// `range_type` keeps only mappings whose SPA range has that type GUID;
    /// `spa_range_index` keeps only mappings into that SPA range.
    ///
    /// # Errors
    ///
    /// - [`AcpiError::InvalidArgument`] for [`PID_ALL`] or [`PID_INVALID`]
    /// - [`AcpiError::NotFound`] if no mapping passes the filters
    pub fn region_mapping_for_pid(
        &self,
        pid: u16,
        range_type: Option<&Guid>,
        spa_range_index: Option<u16>,
    ) -> AcpiResult<&RegionMapping> {
        if pid == PID_ALL || pid == PID_INVALID {
            return Err(AcpiError::InvalidArgument);
        }

        self.region_mappings
            .iter()
            .filter(|m| m.physical_id == pid)
            .filter(|m| spa_range_index.map_or(true, |idx| m.spa_range_index == idx))
            .find(|m| match range_type {
                None => true,
                Some(wanted) => self
                    .spa_range(m.spa_range_index)
                    .map_or(false, |range| range.range_type == *wanted),
            })
            .ok_or(AcpiError::NotFound)
    }

    /// Control region referenced by `mapping` (first match)
    pub fn control_region_for(&self, mapping: &RegionMapping) -> AcpiResult<&ControlRegion> {
        self.control_regions
            .iter()
            .find(|c| c.index == mapping.control_region_index)
            .ok_or(AcpiError::NotFound)
    }

    /// Block data window describing `control_region` (first match)
    pub fn block_data_window_for(
        &self,
        control_region: &ControlRegion,
    ) -> AcpiResult<&BlockDataWindow> {
        self.block_data_windows
            .iter()
            .find(|w| w.control_region_index == control_region.index)
            .ok_or(AcpiError::NotFound)
    }

    /// Flush hint for the module of `mapping`
    ///
    /// If several flush hints carry the same device handle the last one wins.
    pub fn flush_hint_for(&self, mapping: &RegionMapping) -> AcpiResult<&FlushHint> {
        self.flush_hints
            .iter()
            .rev()
            .find(|f| f.device_handle == mapping.device_handle)
            .ok_or(AcpiError::NotFound)
    }

    /// Collect every distinct control region used by module `pid` into `out`
    ///
    /// Regions already in `out` are not added twice. Returns the number of
    /// entries in `out`.
    ///
    /// # Errors
    ///
    /// - [`AcpiError::BufferTooSmall`] if `out` fills up before the scan ends
    /// - [`AcpiError::NotFound`] if a mapping of `pid` references a control
    ///   region the table does not contain
    pub fn control_regions_for_pid<'a, const N: usize>(
        &'a self,
        pid: u16,
        out: &mut FixedVec<&'a ControlRegion, N>,
    ) -> AcpiResult<usize> {
        for mapping in self.region_mappings.iter().filter(|m| m.physical_id == pid) {
            let region = self.control_region_for(mapping)?;
            if out.iter().any(|seen| core::ptr::eq(*seen, region)) {
                continue;
            }
            if out.push(region).is_err() {
                log::error!(
                    "more control regions for PID {:#x} than the {} slot output",
                    pid,
                    N
                );
                return Err(AcpiError::BufferTooSmall);
            }
        }
        Ok(out.len())
    }
}

// =============================================================================
// PMTT
// =============================================================================

impl ParsedPmtt {
    /// Persistent module with the given SMBIOS handle
    ///
    /// The handle is compared after masking to 16 bits. The last match wins.
    pub fn pmem_module_by_smbios_handle(&self, handle: u32) -> Option<&PmttModule> {
        let handle = handle & PmttModule::SMBIOS_HANDLE_MASK;
        self.pmem_modules
            .iter()
            .rev()
            .find(|m| m.smbios_handle == handle)
    }

    /// Logical socket of die `die_id` on physical socket `socket_id`
    ///
    /// The memory device counts of every socket listed before `socket_id`
    /// are summed and `die_id` added.
    pub fn logical_socket_id(&self, socket_id: u16, die_id: u16) -> AcpiResult<u32> {
        let mut preceding: u32 = 0;
        let mut found = false;
        for socket in &self.sockets {
            if socket.socket_id == socket_id {
                found = true;
                break;
            }
            preceding = preceding.wrapping_add(socket.header.memory_devices);
        }
        if !found {
            log::debug!("socket {} not in PMTT", socket_id);
            return Err(AcpiError::NotFound);
        }

        if !self.dies.iter().any(|d| d.device_id == die_id) {
            log::debug!("die {} not in PMTT", die_id);
            return Err(AcpiError::NotFound);
        }

        Ok(preceding.wrapping_add(u32::from(die_id)))
    }
}

/// Logical socket ID with an optional topology
///
/// Without a parsed PMTT every socket has a single die and the logical ID
/// is the physical one.
pub fn logical_socket_id(
    pmtt: Option<&ParsedPmtt>,
    socket_id: u16,
    die_id: u16,
) -> AcpiResult<u32> {
    match pmtt {
        Some(pmtt) => pmtt.logical_socket_id(socket_id, die_id),
        None => Ok(u32::from(socket_id)),
    }
}

// =============================================================================
// TESTS
// =============================================================================
