//! # NVDIMM ACPI Tables
//!
//! Decoders for the three firmware tables that describe a persistent memory
//! platform, and the queries built on top of them.
//!
//! ## Tables
//!
//! - [`nfit`]: NVDIMM Firmware Interface Table. Address ranges, region
//!   mappings, interleave geometry, control/data windows, flush hints.
//! - [`pcat`]: Platform Configuration Attributes Table. Memory mode
//!   capabilities, interleave formats and per-socket (or per-die) limits, in
//!   two incompatible schema generations.
//! - [`pmtt`]: Platform Memory Topology Table. The socket, die, memory
//!   controller, channel, slot and module hierarchy.
//!
//! ## Flow
//!
//! ```text
//! raw bytes -> header::validate -> collector (driven by each walker)
//!           -> ParsedNfit / ParsedPcat / ParsedPmtt
//!           -> resolve / translate / capability
//! ```
//!
//! Every parse takes a byte slice owned by the caller and returns a fully
//! owned structure. A failed parse never hands back a partial result. Parsed
//! structures are immutable, so they can be shared across threads freely once
//! the parse returns.
//!
//! ## Usage
//!
//! ```ignore
//! use nvdimm_acpi::{nfit, translate};
//!
//! let nfit = nfit::parse(&nfit_bytes)?;
//! let mapping = nfit.region_mapping_for_pid(pid, None, None)?;
//! let range = nfit.spa_range(mapping.spa_range_index)?;
//! let interleave = nfit.interleave(mapping.interleave_index).ok();
//! let spa = translate::rdpa_to_spa(rdpa, mapping, range, interleave)?;
//! ```

#![cfg_attr(not(any(test, feature = "std")), no_std)]

extern crate alloc;

pub mod capability;
pub mod collector;
pub mod cursor;
pub mod error;
pub mod guid;
pub mod header;
pub mod nfit;
pub mod pcat;
pub mod pmtt;
pub mod resolve;
pub mod translate;

#[cfg(test)]
mod test_support;

pub use capability::Platform;
pub use error::{AcpiError, AcpiResult};
pub use guid::Guid;
pub use header::{AcpiRevision, TableHeader};
pub use nfit::ParsedNfit;
pub use pcat::ParsedPcat;
pub use pmtt::ParsedPmtt;
