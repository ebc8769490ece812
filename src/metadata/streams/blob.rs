//! The `#Blob` heap: length-prefixed signatures, attribute values and constants.

use crate::{file::parser::Parser, Result};

/// View over the `#Blob` heap
#[derive(Clone, Copy)]
pub struct Blob<'a> {
    data: &'a [u8],
}

impl<'a> Blob<'a> {
    /// Wraps the heap data. The first byte must be the empty blob.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with `0`.
    pub fn from(data: &'a [u8]) -> Result<Blob<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Invalid memory for #Blob heap"));
        }

        Ok(Blob { data })
    }

    /// Returns the blob at byte `index`, without its compressed length prefix.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the blob exceeds the heap.
    pub fn get(&self, index: usize) -> Result<&'a [u8]> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut parser = Parser::new(&self.data[index..]);
        let len = parser.read_compressed_uint()? as usize;
        parser.read_bytes(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let mut data = vec![0x00, 0x03, 0x06, 0x08, 0x00, 0x80, 0x81];
        data.extend(std::iter::repeat(0xAB).take(0x81));

        let blob = Blob::from(&data).unwrap();
        assert!(blob.get(0).unwrap().is_empty());
        assert_eq!(blob.get(1).unwrap(), &[0x06, 0x08, 0x00]);
        assert_eq!(blob.get(5).unwrap().len(), 0x81);
        assert!(blob.get(data.len()).is_err());
    }

    #[test]
    fn truncated() {
        let data = [0x00, 0x05, 0x01];
        let blob = Blob::from(&data).unwrap();
        assert!(blob.get(1).is_err());
    }
}
