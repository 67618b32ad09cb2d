use std::fmt;

/// Reasons a [`crate::verifier::Verifier`] rejected a buffer.
///
/// The verifier itself only ever reports accept/reject as a `bool` (see
/// [`crate::verifier::Verifier::verify_buffer`]); this enum is the enrichment
/// spec mentions for diagnostics and is recorded on
/// [`crate::verifier::Verifier::last_error`] without changing that
/// accept/reject contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// An offset, vector, or scalar read would fall outside the buffer.
    OutOfBounds,
    /// A value was not stored at a position matching its required alignment.
    Misaligned,
    /// A `uoffset`/`soffset` pointed somewhere that is not a valid target
    /// (e.g. zero when a value was required, or past the maximum buffer size).
    BadOffset,
    /// Nesting depth or table count exceeded the configured limits.
    ComplexityExceeded,
    /// A string's length-prefixed byte run was not followed by a `0` byte.
    MissingTerminator,
    /// A union's type tag and value offset disagreed about presence.
    BadUnionTag,
    /// The buffer's file identifier did not match the expected one.
    IdentifierMismatch,
    /// A size-prefixed buffer's declared size did not match its actual length.
    SizePrefixMismatch,
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyError::OutOfBounds => write!(f, "offset or element falls outside the buffer"),
            VerifyError::Misaligned => write!(f, "value is not aligned to its natural alignment"),
            VerifyError::BadOffset => write!(f, "offset value is zero or exceeds the maximum buffer size"),
            VerifyError::ComplexityExceeded => {
                write!(f, "nesting depth or table count exceeded configured limits")
            }
            VerifyError::MissingTerminator => write!(f, "string is missing its null terminator"),
            VerifyError::BadUnionTag => write!(f, "union type tag and value offset disagree"),
            VerifyError::IdentifierMismatch => write!(f, "buffer file identifier does not match"),
            VerifyError::SizePrefixMismatch => {
                write!(f, "size prefix does not match the remaining buffer length")
            }
        }
    }
}

impl std::error::Error for VerifyError {}
