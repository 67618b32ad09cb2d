use crate::error::VerifyError;
use byteorder::{ByteOrder, LittleEndian};

/// Reads `Self` from a little-endian byte buffer at `pos`.
///
/// The caller guarantees `buf` has at least `size_of::<Self>()` bytes
/// remaining at `pos`; this is the unchecked, hot-path half of the codec
/// (§4.A of the format). Bounds are established once, up front, by
/// [`crate::verifier::Verifier`], not re-checked on every field access.
pub trait Read {
    fn read<T: AsRef<[u8]>>(buf: &T, pos: usize) -> Self;
}

impl Read for bool {
    fn read<T: AsRef<[u8]>>(buf: &T, pos: usize) -> Self {
        buf.as_ref()[pos] != 0
    }
}

impl Read for u8 {
    fn read<T: AsRef<[u8]>>(buf: &T, pos: usize) -> Self {
        buf.as_ref()[pos]
    }
}

impl Read for i8 {
    fn read<T: AsRef<[u8]>>(buf: &T, pos: usize) -> Self {
        buf.as_ref()[pos] as i8
    }
}

macro_rules! impl_read_via_byteorder {
    ($ty:ident, $func:ident) => {
        impl Read for $ty {
            fn read<T: AsRef<[u8]>>(buf: &T, pos: usize) -> Self {
                LittleEndian::$func(&buf.as_ref()[pos..])
            }
        }
    };
}

impl_read_via_byteorder!(u16, read_u16);
impl_read_via_byteorder!(i16, read_i16);
impl_read_via_byteorder!(u32, read_u32);
impl_read_via_byteorder!(i32, read_i32);
impl_read_via_byteorder!(u64, read_u64);
impl_read_via_byteorder!(i64, read_i64);
impl_read_via_byteorder!(f32, read_f32);
impl_read_via_byteorder!(f64, read_f64);

/// Writes `self` into a little-endian byte buffer at `pos`.
///
/// Mirrors [`Read`] for the Builder's write side. The caller guarantees
/// `buf` has at least `size_of::<Self>()` bytes remaining at `pos`.
pub trait Write {
    fn write(self, buf: &mut [u8], pos: usize);
}

impl Write for bool {
    fn write(self, buf: &mut [u8], pos: usize) {
        buf[pos] = if self { 1 } else { 0 };
    }
}

impl Write for u8 {
    fn write(self, buf: &mut [u8], pos: usize) {
        buf[pos] = self;
    }
}

impl Write for i8 {
    fn write(self, buf: &mut [u8], pos: usize) {
        buf[pos] = self as u8;
    }
}

macro_rules! impl_write_via_byteorder {
    ($ty:ident, $func:ident) => {
        impl Write for $ty {
            fn write(self, buf: &mut [u8], pos: usize) {
                LittleEndian::$func(&mut buf[pos..], self);
            }
        }
    };
}

impl_write_via_byteorder!(u16, write_u16);
impl_write_via_byteorder!(i16, write_i16);
impl_write_via_byteorder!(u32, write_u32);
impl_write_via_byteorder!(i32, write_i32);
impl_write_via_byteorder!(u64, write_u64);
impl_write_via_byteorder!(i64, write_i64);
impl_write_via_byteorder!(f32, write_f32);
impl_write_via_byteorder!(f64, write_f64);

/// Bounds-checked counterpart of [`Read`], used when decoding bytes that have
/// not already been validated by a [`crate::verifier::Verifier`] pass.
pub trait CheckedRead: Read + Sized {
    /// Width of this type on the wire, in bytes.
    const WIDTH: usize;

    fn try_read<T: AsRef<[u8]>>(buf: &T, pos: usize) -> Result<Self, VerifyError> {
        let bytes = buf.as_ref();
        let in_bounds = pos
            .checked_add(Self::WIDTH)
            .map(|end| end <= bytes.len())
            .unwrap_or(false);
        if !in_bounds {
            return Err(VerifyError::OutOfBounds);
        }
        Ok(Self::read(buf, pos))
    }
}

macro_rules! impl_checked_read {
    ($ty:ident, $width:expr) => {
        impl CheckedRead for $ty {
            const WIDTH: usize = $width;
        }
    };
}

impl_checked_read!(bool, 1);
impl_checked_read!(u8, 1);
impl_checked_read!(i8, 1);
impl_checked_read!(u16, 2);
impl_checked_read!(i16, 2);
impl_checked_read!(u32, 4);
impl_checked_read!(i32, 4);
impl_checked_read!(u64, 8);
impl_checked_read!(i64, 8);
impl_checked_read!(f32, 4);
impl_checked_read!(f64, 8);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read() {
        assert_eq!(4, <u16>::read(&[4u8, 0, 0, 0, 1], 0));
    }

    #[test]
    fn test_write_roundtrip() {
        let mut buf = [0u8; 4];
        42i32.write(&mut buf, 0);
        assert_eq!(42i32, <i32>::read(&buf, 0));
    }

    #[test]
    fn test_checked_read_bounds() {
        let short = [1u8, 0, 0];
        assert!(<u32>::try_read(&short, 0).is_err());
        let ok = [1u8, 0, 0, 0];
        assert_eq!(1u32, <u32>::try_read(&ok, 0).unwrap());
    }
}
