//! CLR 2.0 runtime header (ECMA-335 II.25.3.3).
//!
//! The runtime header is the entry from the PE container into managed metadata. Only the
//! fields needed to locate the metadata root are kept; the rest of the 72-byte structure is
//! validated for size and skipped.

use crate::{file::parser::Parser, Result};

/// Size of the runtime header in bytes
pub const COR20_HEADER_SIZE: usize = 72;

/// The CLR runtime header of a metadata image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cor20Header {
    /// Size of the header in bytes, always 72
    pub cb: u32,
    /// Major runtime version required
    pub major_runtime_version: u16,
    /// Minor runtime version required
    pub minor_runtime_version: u16,
    /// RVA of the metadata root
    pub meta_data_rva: u32,
    /// Size of the metadata in bytes
    pub meta_data_size: u32,
    /// Runtime flags (`COMIMAGE_FLAGS_*`)
    pub flags: u32,
}

impl Cor20Header {
    /// Reads the header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than 72 bytes are available and
    /// [`crate::Error::Malformed`] if the size field or the metadata directory is invalid.
    pub fn read(data: &[u8]) -> Result<Cor20Header> {
        if data.len() < COR20_HEADER_SIZE {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(data);

        let cb = parser.read_le::<u32>()?;
        if cb as usize != COR20_HEADER_SIZE {
            return Err(malformed_error!(
                "Invalid CLR header size: expected 72, got {}",
                cb
            ));
        }

        let major_runtime_version = parser.read_le::<u16>()?;
        let minor_runtime_version = parser.read_le::<u16>()?;

        let meta_data_rva = parser.read_le::<u32>()?;
        let meta_data_size = parser.read_le::<u32>()?;
        if meta_data_rva == 0 || meta_data_size == 0 {
            return Err(malformed_error!(
                "Metadata directory is empty - rva: {}, size: {}",
                meta_data_rva,
                meta_data_size
            ));
        }

        let flags = parser.read_le::<u32>()?;

        Ok(Cor20Header {
            cb,
            major_runtime_version,
            minor_runtime_version,
            meta_data_rva,
            meta_data_size,
            flags,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(metadata_rva: u32, metadata_size: u32) -> Vec<u8> {
        let mut data = vec![0u8; COR20_HEADER_SIZE];
        data[0..4].copy_from_slice(&72u32.to_le_bytes());
        data[4..6].copy_from_slice(&2u16.to_le_bytes());
        data[6..8].copy_from_slice(&5u16.to_le_bytes());
        data[8..12].copy_from_slice(&metadata_rva.to_le_bytes());
        data[12..16].copy_from_slice(&metadata_size.to_le_bytes());
        data[16..20].copy_from_slice(&1u32.to_le_bytes());
        data
    }

    #[test]
    fn crafted() {
        let parsed = Cor20Header::read(&header(0x2050, 0x1234)).unwrap();
        assert_eq!(parsed.cb, 72);
        assert_eq!(parsed.major_runtime_version, 2);
        assert_eq!(parsed.minor_runtime_version, 5);
        assert_eq!(parsed.meta_data_rva, 0x2050);
        assert_eq!(parsed.meta_data_size, 0x1234);
        assert_eq!(parsed.flags, 1);
    }

    #[test]
    fn invalid() {
        assert!(Cor20Header::read(&[0u8; 16]).is_err());
        assert!(Cor20Header::read(&header(0, 0x10)).is_err());

        let mut wrong_size = header(0x2050, 0x10);
        wrong_size[0] = 0x40;
        assert!(Cor20Header::read(&wrong_size).is_err());
    }
}
