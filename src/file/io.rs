//! Little-endian primitive IO over byte slices.
//!
//! Every integer in a metadata image is stored little-endian. The helpers here read and write
//! fixed-width values at a cursor offset with bounds checking, and handle the 2-or-4 byte
//! "dynamic" indices the tables stream uses for heap and row references.
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::file::io::{read_le_at, write_le_at};
//!
//! let mut buffer = [0u8; 6];
//! let mut offset = 0;
//! write_le_at(&mut buffer, &mut offset, 0x1234_u16)?;
//! write_le_at(&mut buffer, &mut offset, 0xDEAD_BEEF_u32)?;
//!
//! let mut offset = 2;
//! assert_eq!(read_le_at::<u32>(&buffer, &mut offset)?, 0xDEAD_BEEF);
//! # Ok::<(), winmdgen::Error>(())
//! ```

use crate::Result;

/// Fixed-width value that can be read from and written to little-endian bytes.
///
/// Implemented for all integer widths and both float widths.
pub trait CilIO: Sized {
    /// The byte array holding one encoded value
    type Bytes: Sized + AsRef<[u8]> + for<'a> TryFrom<&'a [u8]>;

    /// Decodes a value from little-endian bytes
    fn from_le_bytes(bytes: Self::Bytes) -> Self;

    /// Encodes the value as little-endian bytes
    fn to_le_bytes(self) -> Self::Bytes;
}

macro_rules! impl_cil_io {
    ($($ty:ty => $len:literal),* $(,)?) => {
        $(
            impl CilIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }

                fn to_le_bytes(self) -> Self::Bytes {
                    <$ty>::to_le_bytes(self)
                }
            }
        )*
    };
}

impl_cil_io!(
    u8 => 1, i8 => 1,
    u16 => 2, i16 => 2,
    u32 => 4, i32 => 4,
    u64 => 8, i64 => 8,
    f32 => 4, f64 => 8,
);

/// Reads a value from the start of `data`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if `data` is too short.
pub fn read_le<T: CilIO>(data: &[u8]) -> Result<T> {
    let mut offset = 0_usize;
    read_le_at(data, &mut offset)
}

/// Reads a value at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `data`.
pub fn read_le_at<T: CilIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let type_len = std::mem::size_of::<T>();
    let Some(end) = offset.checked_add(type_len) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    let Ok(read) = data[*offset..end].try_into() else {
        return Err(out_of_bounds_error!());
    };

    *offset = end;
    Ok(T::from_le_bytes(read))
}

/// Reads a 4-byte index if `is_large` is set, else a 2-byte index widened to `u32`.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the index does not fit in `data`.
pub fn read_le_at_dyn(data: &[u8], offset: &mut usize, is_large: bool) -> Result<u32> {
    let res = if is_large {
        read_le_at::<u32>(data, offset)?
    } else {
        u32::from(read_le_at::<u16>(data, offset)?)
    };

    Ok(res)
}

/// Writes a value at `offset` and advances `offset` past it.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the value does not fit in `data`.
pub fn write_le_at<T: CilIO>(data: &mut [u8], offset: &mut usize, value: T) -> Result<()> {
    let bytes = value.to_le_bytes();
    let bytes = bytes.as_ref();

    let Some(end) = offset.checked_add(bytes.len()) else {
        return Err(out_of_bounds_error!());
    };
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    data[*offset..end].copy_from_slice(bytes);
    *offset = end;
    Ok(())
}

/// Writes a 4-byte index if `is_large` is set, else a 2-byte index.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if the index does not fit in `data`, or
/// [`crate::Error::Malformed`] if a small index cannot represent `value`.
pub fn write_le_at_dyn(data: &mut [u8], offset: &mut usize, value: u32, is_large: bool) -> Result<()> {
    if is_large {
        write_le_at::<u32>(data, offset, value)
    } else {
        let small = u16::try_from(value)
            .map_err(|_| malformed_error!("Index {} does not fit into 2 bytes", value))?;
        write_le_at::<u16>(data, offset, small)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_BUFFER: [u8; 8] = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];

    #[test]
    fn read_widths() {
        assert_eq!(read_le::<u8>(&TEST_BUFFER).unwrap(), 0x01);
        assert_eq!(read_le::<i16>(&TEST_BUFFER).unwrap(), 0x0201);
        assert_eq!(read_le::<u32>(&TEST_BUFFER).unwrap(), 0x0403_0201);
        assert_eq!(read_le::<u64>(&TEST_BUFFER).unwrap(), 0x0807_0605_0403_0201);
        assert_eq!(read_le::<f32>(&[0x00, 0x00, 0x80, 0x3F]).unwrap(), 1.0);
    }

    #[test]
    fn read_advances_offset() {
        let mut offset = 2;
        assert_eq!(read_le_at::<u16>(&TEST_BUFFER, &mut offset).unwrap(), 0x0403);
        assert_eq!(offset, 4);
    }

    #[test]
    fn read_out_of_bounds() {
        let mut offset = 6;
        assert!(read_le_at::<u32>(&TEST_BUFFER, &mut offset).is_err());
        assert_eq!(offset, 6);

        let mut offset = usize::MAX;
        assert!(read_le_at::<u8>(&TEST_BUFFER, &mut offset).is_err());
    }

    #[test]
    fn read_dyn() {
        let mut offset = 0;
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, false).unwrap(), 0x0201);
        assert_eq!(read_le_at_dyn(&TEST_BUFFER, &mut offset, true).unwrap(), 0x0605_0403);
        assert_eq!(offset, 6);
    }

    #[test]
    fn write_then_read() {
        let mut buffer = [0u8; 8];
        let mut offset = 0;
        write_le_at(&mut buffer, &mut offset, -2_i32).unwrap();
        write_le_at_dyn(&mut buffer, &mut offset, 0xBEEF, false).unwrap();
        assert_eq!(offset, 6);
        assert_eq!(&buffer[..6], &[0xFE, 0xFF, 0xFF, 0xFF, 0xEF, 0xBE]);

        assert!(write_le_at_dyn(&mut buffer, &mut offset, 0x1_0000, false).is_err());
        assert!(write_le_at(&mut buffer, &mut offset, 0_u32).is_err());
    }
}
