use std::mem::size_of;

pub type UOffset = u32;
/// Signed offset used for vtable
pub type SOffset = i32;
/// Unsigned offset used for field offset stored in vtable.
pub type VOffset = u16;
/// Length of vector and string.
pub type Len = u32;

pub const SIZE_VOFFSET: usize = size_of::<VOffset>();
pub const SIZE_UOFFSET: usize = size_of::<UOffset>();
pub const SIZE_SOFFSET: usize = size_of::<SOffset>();
pub const SIZE_LEN: usize = size_of::<Len>();

/// The two housekeeping fields at the head of every vtable: its own byte
/// length and the byte length of the table it describes.
pub const VTABLE_METADATA_FIELDS: usize = 2;

/// Byte length of the optional file identifier following the root uoffset.
pub const FILE_IDENTIFIER_LENGTH: usize = 4;

/// Byte length of the optional size prefix preceding the root uoffset.
pub const SIZE_PREFIX_LENGTH: usize = SIZE_UOFFSET;

/// Buffers and offsets are restricted to this many bytes; any uoffset or
/// soffset resolving outside of it is rejected rather than risk wraparound.
pub const MAX_BUFFER_SIZE: usize = (1usize << 31) - 1;

/// Default cap on nested table depth used by a fresh [`crate::verifier::Verifier`].
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Default cap on total tables visited used by a fresh [`crate::verifier::Verifier`].
pub const DEFAULT_MAX_TABLES: usize = 1_000_000;
