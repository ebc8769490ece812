//! The `#GUID` heap: 16-byte identifiers addressed by 1-based index.

use crate::Result;

/// View over the `#GUID` heap
#[derive(Clone, Copy)]
pub struct Guid<'a> {
    data: &'a [u8],
}

impl<'a> Guid<'a> {
    /// Wraps the heap data.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap size is not a multiple of 16.
    pub fn from(data: &'a [u8]) -> Result<Guid<'a>> {
        if data.len() % 16 != 0 {
            return Err(malformed_error!(
                "Size of #GUID heap is not a multiple of 16 - {}",
                data.len()
            ));
        }

        Ok(Guid { data })
    }

    /// Returns the GUID at 1-based `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is 0 or past the heap.
    pub fn get(&self, index: usize) -> Result<uguid::Guid> {
        if index < 1 || index * 16 > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let mut buffer = [0u8; 16];
        buffer.copy_from_slice(&self.data[(index - 1) * 16..index * 16]);
        Ok(uguid::Guid::from_bytes(buffer))
    }
}
