//! Stream directory entries of the metadata root.

use crate::{file::io::read_le, Result};

/// Names of the streams a metadata image may carry
pub const STREAM_NAMES: [&str; 5] = ["#~", "#Strings", "#US", "#GUID", "#Blob"];

/// One entry of the stream directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHeader {
    /// Offset of the stream, relative to the metadata root
    pub offset: u32,
    /// Size of the stream in bytes
    pub size: u32,
    /// Stream name, e.g. `#Strings`
    pub name: String,
}

impl StreamHeader {
    /// Reads a stream header from the start of `data`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input and
    /// [`crate::Error::Malformed`] if the name is not one of [`STREAM_NAMES`].
    pub fn from(data: &[u8]) -> Result<StreamHeader> {
        if data.len() < 9 {
            return Err(out_of_bounds_error!());
        }

        let name_bytes: Vec<u8> = data[8..]
            .iter()
            .take(32)
            .take_while(|byte| **byte != 0)
            .copied()
            .collect();
        let name = String::from_utf8_lossy(&name_bytes).to_string();

        if !STREAM_NAMES.contains(&name.as_str()) {
            return Err(malformed_error!("Invalid stream header name - {}", name));
        }

        Ok(StreamHeader {
            offset: read_le::<u32>(data)?,
            size: read_le::<u32>(&data[4..])?,
            name,
        })
    }
}
