//! Platform Memory Topology Table
//!
//! Revision 0.2 tables describe a socket, die, memory controller, channel,
//! slot and module hierarchy as a flat run of elements in document order.
//! The walk keeps the most recent ancestor of each kind and stamps every
//! module with them, then files the module as persistent or DDR. Die,
//! channel and slot are vendor elements told apart by a type GUID; the
//! caller passes the platform's GUIDs in a [`VendorTypeIds`].
//!
//! Revision 0.1 tables validate but are not decoded here: [`parse`] returns
//! `Ok(None)` and [`memory_mode_allowed`] walks them from the raw bytes.

pub mod legacy;
mod records;

pub use records::{
    element_type, ModuleKind, ModuleLocation, PmttCommonHeader, PmttController, PmttFlags,
    PmttModule, PmttSocket, PmttVendorElement, VendorElementKind, VendorTypeIds,
};

use alloc::vec::Vec;

use crate::collector;
use crate::cursor::{ByteReader, SubTableWalker};
use crate::error::{AcpiError, AcpiResult};
use crate::header::{self, AcpiRevision, TableHeader};

/// PMTT signature
pub const SIGNATURE: [u8; 4] = *b"PMTT";

/// Size of the PMTT header (description header plus one u32)
pub const HEADER_SIZE: usize = TableHeader::SIZE + 4;

/// Die ID given to modules of a socket that has no die elements
pub const SINGLE_DIE_SOCKET_DIE_ID: u16 = 0xFF;

/// Revision that is validated but left undecoded
pub const REVISION_DEFERRED: AcpiRevision = AcpiRevision::new(0, 1);

/// Revision walked into a [`ParsedPmtt`]
pub const REVISION_WALKED: AcpiRevision = AcpiRevision::new(0, 2);

/// Revisions this parser understands
pub fn is_supported_revision(revision: AcpiRevision) -> bool {
    revision == REVISION_DEFERRED || revision == REVISION_WALKED
}

// =============================================================================
// PARSED TABLE
// =============================================================================

/// A fully parsed revision 0.2 PMTT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPmtt {
    /// Description header
    pub header: TableHeader,
    /// Total memory devices on the platform
    pub memory_devices: u32,
    /// Socket elements
    pub sockets: Vec<PmttSocket>,
    /// Die elements
    pub dies: Vec<PmttVendorElement>,
    /// Memory controller elements
    pub controllers: Vec<PmttController>,
    /// Channel elements
    pub channels: Vec<PmttVendorElement>,
    /// Slot elements
    pub slots: Vec<PmttVendorElement>,
    /// Persistent memory modules
    pub pmem_modules: Vec<PmttModule>,
    /// Volatile DDR modules
    pub ddr_modules: Vec<PmttModule>,
}

impl ParsedPmtt {
    fn empty(header: TableHeader, memory_devices: u32) -> Self {
        Self {
            header,
            memory_devices,
            sockets: Vec::new(),
            dies: Vec::new(),
            controllers: Vec::new(),
            channels: Vec::new(),
            slots: Vec::new(),
            pmem_modules: Vec::new(),
            ddr_modules: Vec::new(),
        }
    }

    /// Check if every DDR module shares a controller with a persistent module
    ///
    /// A table without controllers never allows 2LM.
    pub fn allows_two_level_memory(&self) -> bool {
        if self.controllers.is_empty() {
            log::debug!("PMTT has no memory controllers");
            return false;
        }
        self.ddr_modules
            .iter()
            .all(|ddr| self.pmem_modules.iter().any(|pm| pm.same_controller(ddr)))
    }
}

// =============================================================================
// WALK STATE
// =============================================================================

/// Most recent ancestor IDs seen during a walk
#[derive(Debug, Default)]
struct Ancestry {
    location: ModuleLocation,
    /// Memory devices of every socket before the current one
    preceding_devices: u32,
    /// Memory devices of the current socket
    socket_devices: u32,
}

impl Ancestry {
    fn enter_socket(&mut self, socket: &PmttSocket) {
        self.location.socket_id = socket.socket_id;
        self.preceding_devices = self.preceding_devices.wrapping_add(self.socket_devices);
        self.socket_devices = socket.header.memory_devices;
        self.location.die_id = SINGLE_DIE_SOCKET_DIE_ID;
    }

    fn enter_die(&mut self, die: &PmttVendorElement) {
        self.location.die_id = die.device_id;
        self.location.cpu_id = ((self.preceding_devices & 0xFFFF) as u16).wrapping_add(die.device_id);
    }

    fn enter_controller(&mut self, controller: &PmttController) {
        self.location.controller_id = controller.controller_id;
        self.location.channel_id = 0;
    }

    fn enter_channel(&mut self, channel: &PmttVendorElement) {
        self.location.channel_id = channel.device_id;
        self.location.slot_id = 0;
    }

    fn enter_slot(&mut self, slot: &PmttVendorElement) {
        self.location.slot_id = slot.device_id;
    }
}

// =============================================================================
// PARSER
// =============================================================================

/// Parse a PMTT from `bytes`
///
/// Vendor elements are classified against `vendor_types`. Returns
/// `Ok(None)` for a valid revision 0.1 table.
///
/// # Errors
///
/// Same as [`nfit::parse`](crate::nfit::parse), plus
/// [`AcpiError::CorruptTable`] for an unknown physical element type.
pub fn parse(bytes: &[u8], vendor_types: &VendorTypeIds) -> AcpiResult<Option<ParsedPmtt>> {
    let (header, table) = header::validate(bytes, HEADER_SIZE, is_supported_revision)?;
    if header.revision == REVISION_DEFERRED {
        log::debug!("PMTT {} left for on-demand walks", header.revision);
        return Ok(None);
    }

    let memory_devices = ByteReader::at(table, TableHeader::SIZE)?.u32()?;
    let mut pmtt = ParsedPmtt::empty(header, memory_devices);
    let mut ancestry = Ancestry::default();

    for sub in SubTableWalker::<PmttCommonHeader>::new(table, HEADER_SIZE) {
        let sub = sub?;
        let element = sub.header;

        if !element.flags.contains(PmttFlags::PHYSICAL_ELEMENT) {
            log::debug!("PMTT element at {:#x} is not physical, skipped", sub.offset);
            continue;
        }

        match element.kind {
            element_type::SOCKET => {
                let socket = collector::collect(&mut pmtt.sockets, sub.bytes)?;
                ancestry.enter_socket(socket);
            }
            element_type::CONTROLLER => {
                let controller = collector::collect(&mut pmtt.controllers, sub.bytes)?;
                ancestry.enter_controller(controller);
            }
            element_type::VENDOR => {
                let type_id = PmttVendorElement::type_id_of(sub.bytes)?;
                match vendor_types.classify(&type_id) {
                    Some(VendorElementKind::Die) => {
                        let die = collector::collect(&mut pmtt.dies, sub.bytes)?;
                        ancestry.enter_die(die);
                    }
                    Some(VendorElementKind::Channel) => {
                        let channel = collector::collect(&mut pmtt.channels, sub.bytes)?;
                        ancestry.enter_channel(channel);
                    }
                    Some(VendorElementKind::Slot) => {
                        let slot = collector::collect(&mut pmtt.slots, sub.bytes)?;
                        ancestry.enter_slot(slot);
                    }
                    None => log::debug!("unknown PMTT vendor element {}", type_id),
                }
            }
            element_type::MODULE => {
                if element.flags.is_kind_reserved() {
                    log::debug!("PMTT module at {:#x} has a reserved memory kind", sub.offset);
                    continue;
                }
                let module = PmttModule::decode(element, sub.bytes, ancestry.location)?;
                let sequence = match module.kind {
                    ModuleKind::Persistent => &mut pmtt.pmem_modules,
                    ModuleKind::Ddr => &mut pmtt.ddr_modules,
                };
                collector::push(sequence, module)?;
            }
            other => {
                log::warn!("unknown PMTT element type {:#x} at {:#x}", other, sub.offset);
                return Err(AcpiError::CorruptTable);
            }
        }
    }

    log::debug!(
        "PMTT: {} sockets, {} dies, {} controllers, {} pmem modules, {} DDR modules",
        pmtt.sockets.len(),
        pmtt.dies.len(),
        pmtt.controllers.len(),
        pmtt.pmem_modules.len(),
        pmtt.ddr_modules.len()
    );

    Ok(Some(pmtt))
}

/// Decide whether the platform topology lets 2LM be configured
///
/// `raw` is the PMTT as firmware supplied it; `parsed` is the result of
/// [`parse`] on the same bytes. Revision 0.1 is answered from `raw`,
/// revision 0.2 from `parsed`. Any validation or structural failure yields
/// `false`.
pub fn memory_mode_allowed(raw: &[u8], parsed: Option<&ParsedPmtt>) -> bool {
    let (header, table) = match header::validate(raw, HEADER_SIZE, is_supported_revision) {
        Ok(validated) => validated,
        Err(err) => {
            log::warn!("PMTT rejected: {}", err);
            return false;
        }
    };

    if header.revision == REVISION_DEFERRED {
        return legacy::allows_two_level_memory(table, HEADER_SIZE).unwrap_or_else(|err| {
            log::debug!("PMTT {} walk failed: {}", header.revision, err);
            false
        });
    }

    match parsed {
        Some(pmtt) if pmtt.header.revision == REVISION_WALKED => pmtt.allows_two_level_memory(),
        _ => {
            log::debug!("no parsed PMTT {} topology", REVISION_WALKED);
            false
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
