//! Error types for table decoding and queries

use core::fmt;

/// Result type for table operations
pub type AcpiResult<T> = core::result::Result<T, AcpiError>;

/// Errors surfaced by the parsers, resolvers and queries
///
/// Every function reports the first error it hits. Nothing is retried: the
/// inputs are in-memory bytes, so a retry cannot change the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcpiError {
    /// A required input was missing or empty
    InvalidArgument,
    /// Checksum mismatch, zero-length or truncated sub-table, or a length
    /// field pointing outside the buffer
    CorruptTable,
    /// Well-formed table with a schema generation this crate does not know
    UnsupportedRevision,
    /// A requested cross-reference or capability record does not exist
    NotFound,
    /// The capability record needed to answer a memory mode query is absent
    Aborted,
    /// Caller-provided fixed-capacity output is too small
    BufferTooSmall,
    /// Allocation failed while building a parsed structure
    OutOfMemory,
    /// Degenerate interleave geometry (zero line size or line count)
    DivideByZero,
}

impl AcpiError {
    /// Firmware-style status name
    pub fn name(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "INVALID_PARAMETER",
            Self::CorruptTable => "VOLUME_CORRUPTED",
            Self::UnsupportedRevision => "INCOMPATIBLE_VERSION",
            Self::NotFound => "NOT_FOUND",
            Self::Aborted => "ABORTED",
            Self::BufferTooSmall => "BUFFER_TOO_SMALL",
            Self::OutOfMemory => "OUT_OF_RESOURCES",
            Self::DivideByZero => "DIVIDE_BY_ZERO",
        }
    }

    /// Check if this error comes from the table bytes themselves
    ///
    /// Table errors are fatal to the parse of that family only; data from
    /// other, independently parsed tables stays usable.
    pub fn is_table_error(&self) -> bool {
        matches!(self, Self::CorruptTable | Self::UnsupportedRevision)
    }

    /// Check if this is a not-found type error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound | Self::Aborted)
    }
}

impl fmt::Display for AcpiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::InvalidArgument => "invalid argument",
            Self::CorruptTable => "corrupt table",
            Self::UnsupportedRevision => "unsupported table revision",
            Self::NotFound => "not found",
            Self::Aborted => "required table record missing",
            Self::BufferTooSmall => "output buffer too small",
            Self::OutOfMemory => "out of memory",
            Self::DivideByZero => "divide by zero in interleave geometry",
        };
        write!(f, "{} ({})", msg, self.name())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for AcpiError {}

impl From<alloc::collections::TryReserveError> for AcpiError {
    fn from(_: alloc::collections::TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_classes() {
        assert!(AcpiError::CorruptTable.is_table_error());
        assert!(AcpiError::UnsupportedRevision.is_table_error());
        assert!(!AcpiError::NotFound.is_table_error());
        assert!(AcpiError::Aborted.is_not_found());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AcpiError::CorruptTable.to_string(),
            "corrupt table (VOLUME_CORRUPTED)"
        );
    }

    #[test]
    fn test_reserve_failure_maps_to_oom() {
        let mut v: alloc::vec::Vec<u8> = alloc::vec::Vec::new();
        let err = v.try_reserve(usize::MAX).unwrap_err();
        assert_eq!(AcpiError::from(err), AcpiError::OutOfMemory);
    }
}
