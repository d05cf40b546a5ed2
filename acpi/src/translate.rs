//! Region to system physical address translation
//!
//! A module exposes its share of an SPA range as a zero-based region. In an
//! interleaved range the region is cut into lines that rotate across the
//! modules of the set; the interleave structure gives each line's position
//! within one rotation.

use crate::error::{AcpiError, AcpiResult};
use crate::nfit::{InterleaveDescriptor, RegionMapping, SpaRange};

/// Interleave geometry of one region
///
/// Built through [`Interleave::new`], which guarantees a listed offset for
/// every line of a rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interleave<'a> {
    line_size: u32,
    line_count: u32,
    line_offsets: &'a [u32],
    ways: u16,
}

impl<'a> Interleave<'a> {
    /// Geometry of `line_count` lines of `line_size` bytes over `ways` modules
    ///
    /// `line_offsets` gives each line's position within a rotation, in
    /// line-size units. Entries past `line_count` are ignored.
    ///
    /// # Errors
    ///
    /// [`AcpiError::CorruptTable`] if fewer than `line_count` offsets are
    /// listed.
    pub fn new(
        line_size: u32,
        line_count: u32,
        line_offsets: &'a [u32],
        ways: u16,
    ) -> AcpiResult<Self> {
        let listed = line_offsets.len();
        if usize::try_from(line_count).map_or(true, |count| listed < count) {
            log::debug!("interleave lists {} of {} line offsets", listed, line_count);
            return Err(AcpiError::CorruptTable);
        }
        Ok(Self {
            line_size,
            line_count,
            line_offsets,
            ways,
        })
    }

    /// Geometry of `descriptor` for a set of `ways` modules
    pub fn from_descriptor(descriptor: &'a InterleaveDescriptor, ways: u16) -> AcpiResult<Self> {
        Self::new(
            descriptor.line_size,
            descriptor.line_count,
            descriptor.line_offsets(),
            ways,
        )
    }

    /// Line size in bytes
    pub fn line_size(&self) -> u32 {
        self.line_size
    }

    /// Lines per rotation
    pub fn line_count(&self) -> u32 {
        self.line_count
    }

    /// Modules in the interleave set
    pub fn ways(&self) -> u16 {
        self.ways
    }

    /// Bytes of one module covered by a full rotation
    pub fn rotation_size(&self) -> u64 {
        u64::from(self.line_size) * u64::from(self.line_count)
    }
}

/// Translate a region offset into a system physical address
///
/// Without interleave the region is contiguous in the range. Arithmetic
/// wraps on overflow, matching firmware address math.
///
/// # Errors
///
/// [`AcpiError::DivideByZero`] if the line size or line count is zero.
pub fn translate(
    device_offset: u64,
    region_offset: u64,
    range_base: u64,
    interleave: Option<Interleave<'_>>,
) -> AcpiResult<u64> {
    let base = range_base.wrapping_add(region_offset);

    let Some(il) = interleave else {
        return Ok(base.wrapping_add(device_offset));
    };

    let line_size = u64::from(il.line_size);
    let rotation_size = il.rotation_size();
    if rotation_size == 0 {
        log::debug!(
            "degenerate interleave: line size {}, line count {}",
            il.line_size,
            il.line_count
        );
        return Err(AcpiError::DivideByZero);
    }

    let rotation = device_offset / rotation_size;
    // line < line_count <= line_offsets.len()
    let line = ((device_offset % rotation_size) / line_size) as usize;
    let line_offset = il.line_offsets[line];

    Ok(base
        .wrapping_add(rotation.wrapping_mul(rotation_size).wrapping_mul(u64::from(il.ways)))
        .wrapping_add(u64::from(line_offset).wrapping_mul(line_size))
        .wrapping_add(device_offset % line_size))
}

/// Translate an offset in the region of `mapping` into an SPA
///
/// `range` is the SPA range the mapping points at. `interleave` is the
/// mapping's interleave structure, if it has one.
///
/// # Errors
///
/// - [`AcpiError::CorruptTable`] if `interleave` lists fewer line offsets
///   than its line count
/// - [`AcpiError::DivideByZero`] as for [`translate`]
pub fn rdpa_to_spa(
    rdpa: u64,
    mapping: &RegionMapping,
    range: &SpaRange,
    interleave: Option<&InterleaveDescriptor>,
) -> AcpiResult<u64> {
    let interleave = interleave
        .map(|d| Interleave::from_descriptor(d, mapping.interleave_ways))
        .transpose()?;
    translate(rdpa, mapping.region_offset, range.base, interleave)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guid::spa_range;
    use crate::nfit;
    use crate::test_support::{nfit as nb, TableBuilder};

    const OFFSETS: [u32; 4] = [0, 1, 2, 3];

    fn four_line(line_size: u32) -> Interleave<'static> {
        Interleave::new(line_size, 4, &OFFSETS, 2).expect("geometry")
    }

    #[test]
    fn test_identity_without_interleave() {
        assert_eq!(translate(0, 0x40, 0x1000, None), Ok(0x1040));
        assert_eq!(translate(0x10, 0x40, 0x1000, None), Ok(0x1050));
    }

    #[test]
    fn test_interleaved_offset() {
        assert_eq!(translate(300, 0, 0x1000, Some(four_line(64))), Ok(0x1234));
        assert_eq!(translate(0, 0, 0x1000, Some(four_line(64))), Ok(0x1000));
        assert_eq!(translate(130, 0, 0x1000, Some(four_line(64))), Ok(0x1000 + 128 + 2));
    }

    #[test]
    fn test_degenerate_geometry() {
        assert_eq!(
            translate(300, 0, 0x1000, Some(four_line(0))),
            Err(AcpiError::DivideByZero)
        );
        let no_lines = Interleave::new(64, 0, &[], 2).expect("geometry");
        assert_eq!(translate(0, 0, 0, Some(no_lines)), Err(AcpiError::DivideByZero));
    }

    #[test]
    fn test_short_line_list_rejected() {
        assert_eq!(
            Interleave::new(64, 4, &OFFSETS[..2], 2),
            Err(AcpiError::CorruptTable)
        );
        let extra = Interleave::new(64, 2, &OFFSETS, 2).expect("geometry");
        assert_eq!(extra.rotation_size(), 128);
    }

    #[test]
    fn test_rdpa_to_spa_from_tables() {
        let table = TableBuilder::new(nfit::SIGNATURE, 0x01, 4)
            .raw(&nb::spa_range(1, spa_range::PERSISTENT, 0x1000, 0x10_0000))
            .raw(&nb::region_mapping(1, 0x10, 1, 1, 0x100, 0x8_0000, 2, 2))
            .raw(&nb::interleave(2, 64, &OFFSETS))
            .build();
        let nfit = nfit::parse(&table).expect("nfit");

        let mapping = nfit.region_mapping_for_pid(0x10, None, None).expect("mapping");
        let range = nfit.spa_range(mapping.spa_range_index).expect("range");
        let interleave = nfit.interleave(mapping.interleave_index).ok();

        assert_eq!(rdpa_to_spa(300, mapping, range, interleave), Ok(0x1334));
        assert_eq!(rdpa_to_spa(300, mapping, range, None), Ok(0x1000 + 0x100 + 300));
    }
}
