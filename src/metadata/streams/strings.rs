//! The `#Strings` heap: null-terminated UTF-8 identifiers.

use std::ffi::CStr;

use crate::Result;

/// View over the `#Strings` heap
#[derive(Clone, Copy)]
pub struct Strings<'a> {
    data: &'a [u8],
}

impl<'a> Strings<'a> {
    /// Wraps the heap data. The first byte must be the empty string.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the heap is empty or does not start with `0`.
    pub fn from(data: &'a [u8]) -> Result<Strings<'a>> {
        if data.is_empty() || data[0] != 0 {
            return Err(malformed_error!("Provided #Strings heap is invalid"));
        }

        Ok(Strings { data })
    }

    /// Returns the string starting at byte `index`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `index` is past the heap and
    /// [`crate::Error::Malformed`] if the string is unterminated or not UTF-8.
    pub fn get(&self, index: usize) -> Result<&'a str> {
        if index >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        CStr::from_bytes_until_nul(&self.data[index..])
            .ok()
            .and_then(|string| string.to_str().ok())
            .ok_or_else(|| malformed_error!("Invalid string at index - {}", index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crafted() {
        let data = b"\0Windows.Win32.Foundation\0RECT\0left\0";
        let strings = Strings::from(data).unwrap();

        assert_eq!(strings.get(0).unwrap(), "");
        assert_eq!(strings.get(1).unwrap(), "Windows.Win32.Foundation");
        assert_eq!(strings.get(26).unwrap(), "RECT");
        assert_eq!(strings.get(28).unwrap(), "CT");
        assert_eq!(strings.get(31).unwrap(), "left");
        assert!(strings.get(100).is_err());
    }

    #[test]
    fn invalid() {
        assert!(Strings::from(b"").is_err());
        assert!(Strings::from(b"a\0").is_err());

        let strings = Strings::from(b"\0abc").unwrap();
        assert!(strings.get(1).is_err());
    }
}
