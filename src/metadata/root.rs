//! Metadata root (ECMA-335 II.24.2.1).
//!
//! The root starts with the `BSJB` signature, carries the metadata version string (for
//! Windows metadata something like `WindowsRuntime 1.4` or `v4.0.30319`) and the directory of
//! streams that follow it.

use crate::{
    file::io::{read_le, read_le_at},
    metadata::streams::StreamHeader,
    Result,
};

/// Signature of the metadata root, `BSJB` in little-endian
pub const CIL_HEADER_MAGIC: u32 = 0x424A_5342;

/// The metadata root and its stream directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    /// Always [`CIL_HEADER_MAGIC`]
    pub signature: u32,
    /// Major version, usually 1
    pub major_version: u16,
    /// Minor version, usually 1
    pub minor_version: u16,
    /// Length of the padded version string in bytes
    pub length: u32,
    /// Version string with trailing padding removed
    pub version: String,
    /// Reserved flags
    pub flags: u16,
    /// Stream headers in directory order
    pub stream_headers: Vec<StreamHeader>,
}

impl Root {
    /// Parses the metadata root at the start of `data`.
    ///
    /// Every stream header is checked against the length of `data`, so the returned
    /// directory can be sliced without further bounds checks.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the signature or stream directory is invalid and
    /// [`crate::Error::OutOfBounds`] if a stream points outside of `data`.
    pub fn read(data: &[u8]) -> Result<Root> {
        if data.len() < 20 {
            return Err(out_of_bounds_error!());
        }

        let signature = read_le::<u32>(data)?;
        if signature != CIL_HEADER_MAGIC {
            return Err(malformed_error!(
                "CIL_HEADER_MAGIC does not match - {}",
                signature
            ));
        }

        let length = read_le_at::<u32>(data, &mut 12)?;
        let version_end = 16_usize
            .checked_add(length as usize)
            .ok_or_else(|| malformed_error!("Version string length overflows - {}", length))?;
        if version_end + 4 > data.len() {
            return Err(out_of_bounds_error!());
        }

        let version = String::from_utf8_lossy(&data[16..version_end])
            .trim_end_matches('\0')
            .to_string();

        let mut offset = version_end;
        let flags = read_le_at::<u16>(data, &mut offset)?;
        let stream_count = read_le_at::<u16>(data, &mut offset)?;
        if stream_count == 0 || stream_count > 5 {
            return Err(malformed_error!("Invalid stream count - {}", stream_count));
        }

        let mut stream_headers = Vec::with_capacity(stream_count as usize);
        for _ in 0..stream_count {
            if offset >= data.len() {
                return Err(out_of_bounds_error!());
            }

            let header = StreamHeader::from(&data[offset..])?;
            let Some(stream_end) = header.offset.checked_add(header.size) else {
                return Err(malformed_error!(
                    "Stream offset and size cause integer overflow - {} + {}",
                    header.offset,
                    header.size
                ));
            };
            if stream_end as usize > data.len() {
                return Err(out_of_bounds_error!());
            }

            offset += 8 + (((header.name.len() + 1) + 3) & !3);
            stream_headers.push(header);
        }

        Ok(Root {
            signature,
            major_version: read_le::<u16>(&data[4..])?,
            minor_version: read_le::<u16>(&data[6..])?,
            length,
            version,
            flags,
            stream_headers,
        })
    }

    /// Returns the header of the stream called `name`.
    #[must_use]
    pub fn stream(&self, name: &str) -> Option<&StreamHeader> {
        self.stream_headers.iter().find(|header| header.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    fn crafted_root() -> Vec<u8> {
        let mut data = vec![
            0x42, 0x53, 0x4A, 0x42,
            0x01, 0x00,
            0x01, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x08, 0x00, 0x00, 0x00,
            b'v', b'4', b'.', b'0', 0x00, 0x00, 0x00, 0x00,
            0x00, 0x00,
            0x02, 0x00,
            // #~ at 0x3C, 4 bytes
            0x3C, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, b'#', b'~', 0x00, 0x00,
            // #Strings at 0x40, 4 bytes
            0x40, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00,
            b'#', b'S', b't', b'r', b'i', b'n', b'g', b's', 0x00, 0x00, 0x00, 0x00,
        ];
        data.resize(0x44, 0);
        data
    }

    #[test]
    fn crafted() {
        let root = Root::read(&crafted_root()).unwrap();
        assert_eq!(root.signature, CIL_HEADER_MAGIC);
        assert_eq!(root.major_version, 1);
        assert_eq!(root.version, "v4.0");
        assert_eq!(root.length, 8);
        assert_eq!(root.stream_headers.len(), 2);
        assert_eq!(root.stream("#~").unwrap().offset, 0x3C);
        assert_eq!(root.stream("#Strings").unwrap().size, 4);
        assert!(root.stream("#Blob").is_none());
    }

    #[test]
    fn stream_outside_data() {
        let mut data = crafted_root();
        data.truncate(0x43);
        assert!(Root::read(&data).is_err());
    }

    #[test]
    fn bad_magic() {
        let mut data = crafted_root();
        data[0] = 0x43;
        assert!(matches!(Root::read(&data), Err(crate::Error::Malformed { .. })));
    }
}
