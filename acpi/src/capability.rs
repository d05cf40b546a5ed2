//! Platform capability queries
//!
//! Answers about memory modes, interleave formats and SKU limits, read from a
//! parsed PCAT and (for per-die records) a parsed PMTT. Every query matches
//! on the PCAT generation once and then reads the equivalent field of that
//! generation's record.
//!
//! Queries insist on exactly one capability record and, where they need it,
//! exactly one interleave capability record. Anything else is reported, not
//! guessed.

use alloc::vec::Vec;

use bitflags::bitflags;

use crate::error::{AcpiError, AcpiResult};
use crate::header::AcpiRevision;
use crate::pcat::{
    memory_mode, CapabilityInfoV0, CapabilityInfoV1, CurrentMemoryMode, DieSku,
    InterleaveCapabilityV0, InterleaveCapabilityV1, MaxPmInterleaveSets, MemoryModeCapabilities,
    ParsedPcat, PcatTables, SocketSku, VolatileMode,
};
use crate::pmtt::ParsedPmtt;
use crate::resolve;

/// Socket ID selecting every socket in the summing SKU queries
pub const SOCKET_ID_ALL: u32 = 0xFFFF;

// =============================================================================
// CHANNEL WAYS
// =============================================================================

bitflags! {
    /// Interleave set width
    ///
    /// Exactly one flag is set in a derived value; the empty value marks a
    /// width this crate does not support.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelWays: u16 {
        /// Not interleaved
        const ONE = 1 << 0;
        const TWO = 1 << 1;
        const THREE = 1 << 2;
        const FOUR = 1 << 3;
        const SIX = 1 << 4;
        const EIGHT = 1 << 5;
        const TWELVE = 1 << 6;
        const SIXTEEN = 1 << 7;
        const TWENTY_FOUR = 1 << 8;
    }
}

impl ChannelWays {
    /// Width of an interleave set of `modules` modules
    pub fn from_module_count(modules: u32) -> Self {
        match modules {
            1 => Self::ONE,
            2 => Self::TWO,
            3 => Self::THREE,
            4 => Self::FOUR,
            6 => Self::SIX,
            8 => Self::EIGHT,
            12 => Self::TWELVE,
            16 => Self::SIXTEEN,
            24 => Self::TWENTY_FOUR,
            _ => {
                log::warn!("unsupported number of modules in interleave set: {}", modules);
                Self::empty()
            }
        }
    }

    /// Check if the width is one the platform can build
    pub fn is_supported(self) -> bool {
        !self.is_empty()
    }
}

/// Channel ways of a list of interleave set maps
///
/// Each map is reduced to its module count. A count equal to the one before
/// it is skipped. A trailing [`ChannelWays::ONE`] is always appended since
/// firmware never lists the non-interleaved case.
pub fn channel_ways_from_maps<I>(maps: I) -> AcpiResult<Vec<ChannelWays>>
where
    I: IntoIterator<Item = u32>,
{
    let mut ways = Vec::new();
    let mut previous = 0;
    for map in maps {
        let modules = map.count_ones();
        if modules == previous {
            continue;
        }
        ways.try_reserve(1)?;
        ways.push(ChannelWays::from_module_count(modules));
        previous = modules;
    }
    ways.try_reserve(1)?;
    ways.push(ChannelWays::ONE);
    Ok(ways)
}

// =============================================================================
// RESULTS
// =============================================================================

/// Interleave formats supported for App Direct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterleaveSizes {
    /// Channel interleave size of each format
    pub channel_sizes: Vec<u32>,
    /// Memory controller interleave size of each format
    pub controller_sizes: Vec<u32>,
    /// Recommended flag of each format (revision 0.x only)
    pub recommended: Option<Vec<bool>>,
    /// Channel ways bitmap of each format (revision 0.x only)
    pub channel_ways: Option<Vec<u32>>,
    /// Interleave alignment size
    pub alignment_size: u32,
    /// PCAT revision the answer came from
    pub revision: AcpiRevision,
}

impl InterleaveSizes {
    /// Number of formats
    pub fn len(&self) -> usize {
        self.channel_sizes.len()
    }

    /// Check if no format is listed
    pub fn is_empty(&self) -> bool {
        self.channel_sizes.is_empty()
    }
}

// =============================================================================
// PLATFORM
// =============================================================================

/// The single platform capability record of either generation
#[derive(Debug, Clone, Copy)]
enum Capability<'a> {
    V0(&'a CapabilityInfoV0),
    V1(&'a CapabilityInfoV1),
}

impl Capability<'_> {
    fn current_memory_mode(self) -> CurrentMemoryMode {
        match self {
            Self::V0(c) => c.current_memory_mode,
            Self::V1(c) => c.current_memory_mode,
        }
    }

    fn config_input_support(self) -> u8 {
        match self {
            Self::V0(c) => c.config_input_support,
            Self::V1(c) => c.config_input_support,
        }
    }
}

/// SKU limits of one socket or die, keyed by logical socket
#[derive(Debug, Clone, Copy)]
struct SkuLimits {
    socket_id: u32,
    mapped_memory_limit: u64,
    total_mapped_memory: u64,
    cached_memory: u64,
}

impl SkuLimits {
    fn of_socket(sku: &SocketSku) -> Self {
        Self {
            socket_id: u32::from(sku.socket_id),
            mapped_memory_limit: sku.mapped_memory_limit,
            total_mapped_memory: sku.total_mapped_memory,
            cached_memory: sku.cached_memory,
        }
    }

    fn of_die(sku: &DieSku, socket_id: u32) -> Self {
        Self {
            socket_id,
            mapped_memory_limit: sku.mapped_memory_limit,
            total_mapped_memory: sku.total_mapped_memory,
            cached_memory: sku.cached_memory,
        }
    }
}

/// Parsed tables a capability query reads
///
/// Either table may be absent; queries that need a missing table fail.
#[derive(Debug, Clone, Copy, Default)]
pub struct Platform<'a> {
    /// Platform Configuration Attributes Table
    pub pcat: Option<&'a ParsedPcat>,
    /// Platform Memory Topology Table (revision 0.2)
    pub pmtt: Option<&'a ParsedPmtt>,
}

impl<'a> Platform<'a> {
    /// Create a query view over the given tables
    pub const fn new(pcat: Option<&'a ParsedPcat>, pmtt: Option<&'a ParsedPmtt>) -> Self {
        Self { pcat, pmtt }
    }

    fn pcat(&self) -> AcpiResult<&'a ParsedPcat> {
        self.pcat.ok_or_else(|| {
            log::debug!("no PCAT");
            AcpiError::NotFound
        })
    }

    /// The one capability record, or `missing` if there is not exactly one
    fn capability(&self, missing: AcpiError) -> AcpiResult<Capability<'a>> {
        let pcat = self.pcat.ok_or(missing)?;
        match &pcat.tables {
            PcatTables::V0(t) if t.capabilities.len() == 1 => Ok(Capability::V0(&t.capabilities[0])),
            PcatTables::V1(t) if t.capabilities.len() == 1 => Ok(Capability::V1(&t.capabilities[0])),
            tables => {
                log::debug!(
                    "expected one PCAT capability record, found {}",
                    tables.capability_count()
                );
                Err(missing)
            }
        }
    }

    // ----- Memory modes -----

    /// Volatile memory mode firmware selected for this boot
    ///
    /// # Errors
    ///
    /// [`AcpiError::Aborted`] without exactly one capability record.
    pub fn current_memory_mode(&self) -> AcpiResult<VolatileMode> {
        Ok(self.capability(AcpiError::Aborted)?.current_memory_mode().current())
    }

    /// Volatile memory mode allowed by the firmware setup menu
    ///
    /// 2LM allowed implies 1LM allowed.
    ///
    /// # Errors
    ///
    /// [`AcpiError::Aborted`] without exactly one capability record.
    pub fn allowed_memory_mode(&self) -> AcpiResult<VolatileMode> {
        Ok(self.capability(AcpiError::Aborted)?.current_memory_mode().allowed())
    }

    /// Check if firmware accepts configuration input from management software
    pub fn config_change_supported(&self) -> AcpiResult<bool> {
        Ok(self.capability(AcpiError::NotFound)?.config_input_support() & 1 != 0)
    }

    /// Memory modes the platform supports
    ///
    /// Revision 0.x platforms always support mixed mode.
    pub fn memory_mode_capabilities(&self) -> AcpiResult<MemoryModeCapabilities> {
        Ok(match self.capability(AcpiError::NotFound)? {
            Capability::V0(c) => c.memory_modes | MemoryModeCapabilities::MIXED_MODE,
            Capability::V1(c) => c.memory_modes,
        })
    }

    /// Maximum persistent memory interleave sets per die and per module
    ///
    /// Revision 1.x only.
    pub fn max_pm_interleave_sets(&self) -> AcpiResult<MaxPmInterleaveSets> {
        match self.capability(AcpiError::NotFound)? {
            Capability::V1(c) => Ok(c.max_pm_interleave_sets),
            Capability::V0(_) => {
                log::debug!("max PM interleave sets needs a revision 1.x PCAT");
                Err(AcpiError::NotFound)
            }
        }
    }

    // ----- SKU limits -----

    /// Walk the SKU records and combine the values of `socket_id`
    ///
    /// With `sum_all` set, [`SOCKET_ID_ALL`] sums every record; otherwise the
    /// first record of the socket is returned.
    fn sku_value(
        &self,
        socket_id: u32,
        sum_all: bool,
        pick: fn(&SkuLimits) -> u64,
    ) -> AcpiResult<u64> {
        let pcat = self.pcat()?;
        if pcat.tables.sku_count() == 0 {
            log::debug!("PCAT has no SKU records");
            return Err(AcpiError::NotFound);
        }

        let every = sum_all && socket_id == SOCKET_ID_ALL;
        let mut total: u64 = 0;
        let mut found = false;
        let mut visit = |limits: SkuLimits| -> bool {
            if every || limits.socket_id == socket_id {
                total = total.wrapping_add(pick(&limits));
                found = true;
                return !every;
            }
            false
        };

        match &pcat.tables {
            PcatTables::V0(t) => {
                for sku in &t.socket_skus {
                    if visit(SkuLimits::of_socket(sku)) {
                        break;
                    }
                }
            }
            PcatTables::V1(t) => {
                for sku in &t.die_skus {
                    let logical = resolve::logical_socket_id(self.pmtt, sku.socket_id, sku.die_id)?;
                    if visit(SkuLimits::of_die(sku, logical)) {
                        break;
                    }
                }
            }
        }

        if found {
            Ok(total)
        } else {
            log::debug!("no SKU record for socket {}", socket_id);
            Err(AcpiError::NotFound)
        }
    }

    /// Mapped memory size limit of logical socket `socket_id`
    pub fn socket_mapped_memory_limit(&self, socket_id: u32) -> AcpiResult<u64> {
        self.sku_value(socket_id, false, |l| l.mapped_memory_limit)
    }

    /// Memory of `socket_id` mapped into SPA, or of every socket for
    /// [`SOCKET_ID_ALL`]
    pub fn socket_total_mapped_memory(&self, socket_id: u32) -> AcpiResult<u64> {
        self.sku_value(socket_id, true, |l| l.total_mapped_memory)
    }

    /// Memory of `socket_id` used as 2LM cache, or of every socket for
    /// [`SOCKET_ID_ALL`]
    pub fn socket_cached_memory(&self, socket_id: u32) -> AcpiResult<u64> {
        self.sku_value(socket_id, true, |l| l.cached_memory)
    }

    // ----- Interleave -----

    /// Interleave sizes supported for App Direct
    ///
    /// Needs exactly one capability record and exactly one interleave
    /// capability record, and that record must describe App Direct.
    pub fn supported_interleave_sizes(&self) -> AcpiResult<InterleaveSizes> {
        let pcat = self.pcat()?;
        self.capability(AcpiError::NotFound)?;
        if pcat.tables.interleave_capability_count() != 1 {
            log::debug!(
                "expected one PCAT interleave capability record, found {}",
                pcat.tables.interleave_capability_count()
            );
            return Err(AcpiError::NotFound);
        }
        let revision = pcat.revision();

        match &pcat.tables {
            PcatTables::V0(t) => {
                let record = app_direct(&t.interleave_capabilities, |c: &InterleaveCapabilityV0| {
                    c.memory_mode
                })?;
                let formats = record.formats();
                let mut channel_sizes = Vec::new();
                let mut controller_sizes = Vec::new();
                let mut recommended = Vec::new();
                let mut ways = Vec::new();
                channel_sizes.try_reserve_exact(formats.len())?;
                controller_sizes.try_reserve_exact(formats.len())?;
                recommended.try_reserve_exact(formats.len())?;
                ways.try_reserve_exact(formats.len())?;

                for format in formats {
                    channel_sizes.push(format.channel_size());
                    controller_sizes.push(format.controller_size());
                    recommended.push(format.recommended());
                    ways.push(format.channel_ways());
                }
                Ok(InterleaveSizes {
                    channel_sizes,
                    controller_sizes,
                    recommended: Some(recommended),
                    channel_ways: Some(ways),
                    alignment_size: u32::from(record.alignment_size),
                    revision,
                })
            }
            PcatTables::V1(t) => {
                let record = app_direct(&t.interleave_capabilities, |c: &InterleaveCapabilityV1| {
                    c.memory_mode
                })?;
                let mut channel_sizes = Vec::new();
                channel_sizes.try_reserve_exact(1)?;
                channel_sizes.push(record.interleave_size.channel());
                let mut controller_sizes = Vec::new();
                controller_sizes.try_reserve_exact(1)?;
                controller_sizes.push(record.interleave_size.controller());
                Ok(InterleaveSizes {
                    channel_sizes,
                    controller_sizes,
                    recommended: None,
                    channel_ways: None,
                    alignment_size: record.alignment_size,
                    revision,
                })
            }
        }
    }

    /// The single revision 1.x interleave capability record
    fn interleave_v1(&self) -> AcpiResult<&'a InterleaveCapabilityV1> {
        let pcat = self.pcat()?;
        match &pcat.tables {
            PcatTables::V1(t) if t.interleave_capabilities.len() == 1 => {
                Ok(&t.interleave_capabilities[0])
            }
            PcatTables::V1(t) => {
                log::debug!(
                    "expected one PCAT interleave capability record, found {}",
                    t.interleave_capabilities.len()
                );
                Err(AcpiError::NotFound)
            }
            PcatTables::V0(_) => {
                log::debug!("interleave set maps need a revision 1.x PCAT");
                Err(AcpiError::NotFound)
            }
        }
    }

    /// Module bitmap of every supported interleave format
    ///
    /// Revision 1.x only.
    pub fn interleave_set_map(&self) -> AcpiResult<Vec<u32>> {
        let formats = self.interleave_v1()?.formats();
        let mut maps = Vec::new();
        maps.try_reserve_exact(formats.len())?;
        maps.extend(formats.iter().map(|f| f.interleave_map()));
        Ok(maps)
    }

    /// Interleave set widths derived from the interleave set maps
    ///
    /// Revision 1.x only. See [`channel_ways_from_maps`].
    pub fn channel_ways(&self) -> AcpiResult<Vec<ChannelWays>> {
        let formats = self.interleave_v1()?.formats();
        channel_ways_from_maps(formats.iter().map(|f| f.interleave_map()))
    }
}

/// First interleave capability record describing App Direct
fn app_direct<T>(records: &[T], mode: fn(&T) -> u8) -> AcpiResult<&T> {
    records
        .iter()
        .find(|r| mode(r) == memory_mode::PM_DIRECT)
        .ok_or_else(|| {
            log::debug!("no interleave capability record for App Direct");
            AcpiError::NotFound
        })
}

// =============================================================================
// TESTS
// =============================================================================
