//! Byte cursor for signature, attribute and heap decoding.
//!
//! [`Parser`] wraps a borrowed slice and a position. On top of the little-endian reads from
//! [`crate::file::io`] it implements the ECMA-335 compressed integer forms (II.23.2) and the
//! packed type tokens used inside signature blobs.
//!
//! # Examples
//!
//! ```rust
//! use winmdgen::Parser;
//!
//! // Compressed 2-byte length followed by a little-endian u16
//! let mut parser = Parser::new(&[0x80, 0x80, 0x34, 0x12]);
//! assert_eq!(parser.read_compressed_uint()?, 0x80);
//! assert_eq!(parser.read_le::<u16>()?, 0x1234);
//! assert!(!parser.has_more_data());
//! # Ok::<(), winmdgen::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, CilIO},
    metadata::token::Token,
    Result,
};

/// Cursor over a borrowed byte slice
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Creates a cursor positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` while unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Current position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Skips `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        self.position += step;
        Ok(())
    }

    /// Returns the next byte without consuming it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] at the end of the data.
    pub fn peek_byte(&self) -> Result<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or(out_of_bounds_error!())
    }

    /// Reads a little-endian value.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit.
    pub fn read_le<T: CilIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Reads `length` raw bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.remaining() {
            return Err(out_of_bounds_error!());
        }

        let bytes = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }

    /// Reads a compressed unsigned integer (1, 2 or 4 bytes, big-endian payload).
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] on truncated input and
    /// [`crate::Error::Malformed`] on an invalid lead byte.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let first_byte = self.read_le::<u8>()?;

        if (first_byte & 0x80) == 0 {
            return Ok(u32::from(first_byte));
        }

        if (first_byte & 0xC0) == 0x80 {
            let second_byte = self.read_le::<u8>()?;
            return Ok(((u32::from(first_byte) & 0x3F) << 8) | u32::from(second_byte));
        }

        if (first_byte & 0xE0) == 0xC0 {
            let rest = self.read_bytes(3)?;
            return Ok(((u32::from(first_byte) & 0x1F) << 24)
                | (u32::from(rest[0]) << 16)
                | (u32::from(rest[1]) << 8)
                | u32::from(rest[2]));
        }

        Err(malformed_error!("Invalid compressed uint - {}", first_byte))
    }

    /// Reads a `TypeDefOrRefOrSpecEncoded` token (II.23.2.8).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the tag bits name no table.
    pub fn read_compressed_token(&mut self) -> Result<Token> {
        let compressed_token = self.read_compressed_uint()?;
        let table: u32 = match compressed_token & 0x3 {
            0x0 => 0x0200_0000, // TypeDef
            0x1 => 0x0100_0000, // TypeRef
            0x2 => 0x1B00_0000, // TypeSpec
            _ => {
                return Err(malformed_error!(
                    "Invalid compressed token - {}",
                    compressed_token
                ))
            }
        };

        Ok(Token::new(table | (compressed_token >> 2)))
    }

    /// Reads a `SerString` as found in custom attribute blobs.
    ///
    /// A lead byte of `0xFF` encodes a null string and yields `None`.
    ///
    /// # Errors
    /// Returns an error on truncated input or invalid UTF-8.
    pub fn read_ser_string(&mut self) -> Result<Option<String>> {
        if self.peek_byte()? == 0xFF {
            self.position += 1;
            return Ok(None);
        }

        let length = self.read_compressed_uint()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(length)?;

        match std::str::from_utf8(bytes) {
            Ok(string) => Ok(Some(string.to_string())),
            Err(error) => Err(malformed_error!(
                "Invalid UTF-8 string at offset {}-{}: {}",
                start,
                start + length,
                error
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn compressed_uint() {
        let test_cases = vec![
            (vec![0x03], 3),
            (vec![0x7F], 0x7F),
            (vec![0x80, 0x80], 0x80),
            (vec![0xAE, 0x57], 0x2E57),
            (vec![0xBF, 0xFF], 0x3FFF),
            (vec![0xC0, 0x00, 0x40, 0x00], 0x4000),
            (vec![0xDF, 0xFF, 0xFF, 0xFF], 0x1FFF_FFFF),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_uint().unwrap(), expected);
            assert!(!parser.has_more_data());
        }

        let mut parser = Parser::new(&[]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::OutOfBounds)
        ));

        let mut parser = Parser::new(&[0xC0, 0x00]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::OutOfBounds)
        ));

        let mut parser = Parser::new(&[0xFF]);
        assert!(matches!(
            parser.read_compressed_uint(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn compressed_token() {
        let test_cases = vec![
            (vec![0x48], 0x0200_0012),
            (vec![0x0D], 0x0100_0003),
            (vec![0x12], 0x1B00_0004),
        ];

        for (input, expected) in test_cases {
            let mut parser = Parser::new(&input);
            assert_eq!(parser.read_compressed_token().unwrap().value(), expected);
        }

        let mut parser = Parser::new(&[0x03]);
        assert!(parser.read_compressed_token().is_err());
    }

    #[test]
    fn ser_string() {
        let mut parser = Parser::new(&[0x03, b'a', b'b', b'c', 0xFF, 0x00]);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some("abc"));
        assert_eq!(parser.read_ser_string().unwrap(), None);
        assert_eq!(parser.read_ser_string().unwrap().as_deref(), Some(""));
        assert!(!parser.has_more_data());

        let mut parser = Parser::new(&[0x05, b'a']);
        assert!(parser.read_ser_string().is_err());
    }

    #[test]
    fn bytes_and_peek() {
        let mut parser = Parser::new(&[1, 2, 3]);
        assert_eq!(parser.peek_byte().unwrap(), 1);
        assert_eq!(parser.read_bytes(2).unwrap(), &[1, 2]);
        assert_eq!(parser.remaining(), 1);
        assert!(parser.advance_by(2).is_err());
        parser.advance_by(1).unwrap();
        assert!(parser.peek_byte().is_err());
    }
}
