//! Interning heaps of the metadata writer.
//!
//! Every heap starts with its null entry so that index 0 always means "absent": the empty
//! string in `#Strings`, the empty blob in `#Blob`. The `#GUID` heap is 1-based and has no
//! null entry. Identical values are stored once.

use std::collections::HashMap;

use crate::Result;

/// Largest value a compressed unsigned integer can hold
const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;

/// Appends `value` to `buffer` as an ECMA-335 compressed unsigned integer (II.23.2).
///
/// # Errors
/// Returns [`crate::Error::Malformed`] if `value` exceeds `0x1FFF_FFFF`.
#[allow(clippy::cast_possible_truncation)]
pub fn write_compressed_uint(value: u32, buffer: &mut Vec<u8>) -> Result<()> {
    if value < 0x80 {
        buffer.push(value as u8);
    } else if value < 0x4000 {
        buffer.extend_from_slice(&(0x8000 | value as u16).to_be_bytes());
    } else if value <= MAX_COMPRESSED_UINT {
        buffer.extend_from_slice(&(0xC000_0000 | value).to_be_bytes());
    } else {
        return Err(malformed_error!(
            "Value {:#x} does not fit a compressed integer",
            value
        ));
    }

    Ok(())
}

/// Appends a `SerString`: a compressed length and UTF-8 bytes, or `0xFF` for null.
pub(crate) fn write_ser_string(value: Option<&str>, buffer: &mut Vec<u8>) -> Result<()> {
    match value {
        None => buffer.push(0xFF),
        Some(value) => {
            let length = u32::try_from(value.len())
                .map_err(|_| malformed_error!("String of {} bytes is too long", value.len()))?;
            write_compressed_uint(length, buffer)?;
            buffer.extend_from_slice(value.as_bytes());
        }
    }

    Ok(())
}

fn heap_index(length: usize) -> Result<u32> {
    u32::try_from(length).map_err(|_| malformed_error!("Heap exceeds 4GB"))
}

/// The `#Strings` heap: null-terminated UTF-8 strings
#[derive(Debug, Clone)]
pub struct StringHeap {
    data: Vec<u8>,
    interned: HashMap<String, u32>,
}

impl Default for StringHeap {
    fn default() -> Self {
        StringHeap {
            data: vec![0],
            interned: HashMap::new(),
        }
    }
}

impl StringHeap {
    /// Index of `value`, appending it on first use. The empty string is index 0.
    ///
    /// # Errors
    /// Returns an error if `value` contains a NUL byte or the heap overflows.
    pub fn intern(&mut self, value: &str) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(index) = self.interned.get(value) {
            return Ok(*index);
        }
        if value.contains('\0') {
            return Err(malformed_error!("String {:?} contains a NUL byte", value));
        }

        let index = heap_index(self.data.len())?;
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
        self.interned.insert(value.to_string(), index);
        Ok(index)
    }

    /// The heap bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// The `#Blob` heap: length-prefixed byte strings
#[derive(Debug, Clone)]
pub struct BlobHeap {
    data: Vec<u8>,
    interned: HashMap<Vec<u8>, u32>,
}

impl Default for BlobHeap {
    fn default() -> Self {
        BlobHeap {
            data: vec![0],
            interned: HashMap::new(),
        }
    }
}

impl BlobHeap {
    /// Index of `value`, appending it on first use. The empty blob is index 0.
    ///
    /// # Errors
    /// Returns an error if the blob is too long for a compressed length or the heap overflows.
    pub fn intern(&mut self, value: &[u8]) -> Result<u32> {
        if value.is_empty() {
            return Ok(0);
        }
        if let Some(index) = self.interned.get(value) {
            return Ok(*index);
        }

        let index = heap_index(self.data.len())?;
        write_compressed_uint(heap_index(value.len())?, &mut self.data)?;
        self.data.extend_from_slice(value);
        self.interned.insert(value.to_vec(), index);
        Ok(index)
    }

    /// The heap bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// The `#GUID` heap: 16-byte entries addressed from 1
#[derive(Debug, Clone, Default)]
pub struct GuidHeap {
    data: Vec<u8>,
}

impl GuidHeap {
    /// Appends `guid` and returns its 1-based index.
    ///
    /// # Errors
    /// Returns an error if the heap overflows.
    pub fn add(&mut self, guid: uguid::Guid) -> Result<u32> {
        self.data.extend_from_slice(&guid.to_bytes());
        heap_index(self.data.len() / 16)
    }

    /// The heap bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::streams::{Blob, Strings};

    #[test]
    fn compressed_uint() {
        let mut buffer = Vec::new();
        write_compressed_uint(0x03, &mut buffer).unwrap();
        write_compressed_uint(0x80, &mut buffer).unwrap();
        write_compressed_uint(0x4000, &mut buffer).unwrap();
        assert_eq!(buffer, [0x03, 0x80, 0x80, 0xC0, 0x00, 0x40, 0x00]);
        assert!(write_compressed_uint(0x2000_0000, &mut buffer).is_err());
    }

    #[test]
    fn strings_are_interned() {
        let mut heap = StringHeap::default();
        let rect = heap.intern("RECT").unwrap();
        let left = heap.intern("left").unwrap();
        assert_eq!(heap.intern("RECT").unwrap(), rect);
        assert_eq!(heap.intern("").unwrap(), 0);
        assert!(heap.intern("a\0b").is_err());

        let strings = Strings::from(heap.data()).unwrap();
        assert_eq!(strings.get(rect as usize).unwrap(), "RECT");
        assert_eq!(strings.get(left as usize).unwrap(), "left");
    }

    #[test]
    fn blobs_keep_their_length() {
        let mut heap = BlobHeap::default();
        let long = vec![0xAB; 0x90];
        let short = heap.intern(&[0x06, 0x08]).unwrap();
        let long_index = heap.intern(&long).unwrap();
        assert_eq!(heap.intern(&[0x06, 0x08]).unwrap(), short);

        let blobs = Blob::from(heap.data()).unwrap();
        assert_eq!(blobs.get(short as usize).unwrap(), &[0x06, 0x08]);
        assert_eq!(blobs.get(long_index as usize).unwrap(), long.as_slice());
    }
}
