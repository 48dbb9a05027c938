//! Cursor over the bytes of one metadata blob.
//!
//! The blob format is built from four primitives, all read through [`Parser`]:
//!
//! | Encoding          | Layout                                                       |
//! |-------------------|--------------------------------------------------------------|
//! | byte / bool       | one byte; booleans must be `0` or `1`                        |
//! | compressed uint   | 1, 2 or 4 bytes, big-endian payload, width in the top bits   |
//! | string            | 7-bit varint byte length, then UTF-8 bytes                   |
//! | count             | compressed uint bounded by the remaining input               |
//!
//! ```rust
//! use metascope::Parser;
//!
//! // "Hello", then a compressed 300
//! let data = [5, b'H', b'e', b'l', b'l', b'o', 0x81, 0x2C];
//! let mut parser = Parser::new(&data);
//!
//! assert_eq!(parser.read_prefixed_string_utf8()?, "Hello");
//! assert_eq!(parser.read_compressed_uint()?, 300);
//! assert!(!parser.has_more_data());
//! # Ok::<(), metascope::Error>(())
//! ```

use crate::{
    file::io::{read_le_at, MetaIO},
    Result,
};

/// Largest value a compressed uint can carry (29 payload bits).
pub const MAX_COMPRESSED_UINT: u32 = 0x1FFF_FFFF;

/// Bounds-checked reader over a borrowed byte slice.
///
/// Reads never panic: running past the end yields [`crate::Error::OutOfBounds`], an
/// impossible encoding yields [`crate::Error::Malformed`] naming the offset.
#[derive(Debug, Clone)]
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Starts reading at the beginning of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Offset of the next byte to read.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Bytes left after the cursor.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Returns `true` while unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.remaining() > 0
    }

    /// Reads a little-endian primitive.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the value does not fit in the remaining bytes.
    pub fn read_le<T: MetaIO>(&mut self) -> Result<T> {
        read_le_at::<T>(self.data, &mut self.position)
    }

    /// Reads a boolean byte.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] for a byte other than `0` or `1`.
    pub fn read_bool(&mut self) -> Result<bool> {
        let offset = self.position;
        match self.read_le::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(malformed_error!(
                "Boolean byte 0x{:02x} at offset {}",
                other,
                offset
            )),
        }
    }

    /// Reads a compressed unsigned integer.
    ///
    /// The top bits of the first byte select the width: `0` one byte, `10` two bytes, `110`
    /// four bytes. The remaining bits form a big-endian value of up to 29 bits.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a truncated value and
    /// [`crate::Error::Malformed`] for a first byte starting with `111`.
    pub fn read_compressed_uint(&mut self) -> Result<u32> {
        let offset = self.position;
        let first = self.read_le::<u8>()?;

        let (width, high_bits) = match first.leading_ones() {
            0 => (1, first),
            1 => (2, first & 0x3F),
            2 => (4, first & 0x1F),
            _ => {
                return Err(malformed_error!(
                    "Compressed integer prefix 0x{:02x} at offset {}",
                    first,
                    offset
                ))
            }
        };

        let mut value = u32::from(high_bits);
        for byte in self.read_bytes(width - 1)? {
            value = (value << 8) | u32::from(*byte);
        }
        Ok(value)
    }

    /// Reads the element count of a list that follows.
    ///
    /// Every encoded element takes at least one byte, so a count above the remaining input is
    /// rejected before anything is allocated for it.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the count exceeds the remaining bytes.
    pub fn read_count(&mut self) -> Result<usize> {
        let count = self.read_compressed_uint()? as usize;
        if count > self.remaining() {
            return Err(malformed_error!(
                "Count {} at offset {} exceeds the {} remaining bytes",
                count,
                self.position,
                self.remaining()
            ));
        }
        Ok(count)
    }

    /// Reads a 7-bit varint (low groups first, at most 32 bits).
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the value needs more than 32 bits.
    pub fn read_7bit_encoded_int(&mut self) -> Result<u32> {
        let offset = self.position;
        let mut value = 0u32;
        for shift in (0..35).step_by(7) {
            let byte = self.read_le::<u8>()?;
            let group = u32::from(byte & 0x7F);
            if shift == 28 && group > 0x0F {
                break;
            }
            value |= group << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(malformed_error!(
            "Varint at offset {} does not fit into 32 bits",
            offset
        ))
    }

    /// Reads a varint-length-prefixed UTF-8 string.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] for a truncated string and
    /// [`crate::Error::Malformed`] for invalid UTF-8.
    pub fn read_prefixed_string_utf8(&mut self) -> Result<String> {
        let length = self.read_7bit_encoded_int()? as usize;
        let start = self.position;
        let bytes = self.read_bytes(length)?;

        match std::str::from_utf8(bytes) {
            Ok(text) => Ok(text.to_owned()),
            Err(error) => Err(malformed_error!(
                "String at offset {} is not UTF-8: {}",
                start,
                error
            )),
        }
    }

    /// Borrows the next `length` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `length` bytes remain; the cursor
    /// does not move in that case.
    pub fn read_bytes(&mut self, length: usize) -> Result<&'a [u8]> {
        if length > self.remaining() {
            return Err(out_of_bounds_error!());
        }
        let bytes = &self.data[self.position..self.position + length];
        self.position += length;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn compressed_uint_widths() {
        let cases: [(&[u8], u32); 6] = [
            (&[0x03], 3),
            (&[0x7F], 0x7F),
            (&[0x80, 0x80], 0x80),
            (&[0xBF, 0xFF], 0x3FFF),
            (&[0xC0, 0x00, 0x40, 0x00], 0x4000),
            (&[0xDF, 0xFF, 0xFF, 0xFF], MAX_COMPRESSED_UINT),
        ];
        for (input, expected) in cases {
            let mut parser = Parser::new(input);
            assert_eq!(parser.read_compressed_uint().unwrap(), expected);
            assert!(!parser.has_more_data());
        }
    }

    #[test]
    fn compressed_uint_errors() {
        assert!(matches!(
            Parser::new(&[]).read_compressed_uint(),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            Parser::new(&[0xC0, 0x01]).read_compressed_uint(),
            Err(Error::OutOfBounds)
        ));
        assert!(matches!(
            Parser::new(&[0xE0]).read_compressed_uint(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn count_is_bounded_by_remaining_input() {
        let mut parser = Parser::new(&[0x05, 0x01, 0x02]);
        assert!(matches!(parser.read_count(), Err(Error::Malformed { .. })));

        let mut parser = Parser::new(&[0x02, 0x01, 0x02]);
        assert_eq!(parser.read_count().unwrap(), 2);
        assert_eq!(parser.remaining(), 2);
    }

    #[test]
    fn strings_and_booleans() {
        let data = [5, b'H', b'e', b'l', b'l', b'o', 1, 2, 2, 0xC3, 0x28];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_prefixed_string_utf8().unwrap(), "Hello");
        assert!(parser.read_bool().unwrap());
        assert!(matches!(parser.read_bool(), Err(Error::Malformed { .. })));
        assert!(matches!(
            parser.read_prefixed_string_utf8(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn varint_limits() {
        let mut parser = Parser::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(parser.read_7bit_encoded_int().unwrap(), u32::MAX);

        let mut parser = Parser::new(&[0x80, 0x80, 0x80, 0x80, 0x10]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));

        let mut parser = Parser::new(&[0x80, 0x80, 0x80, 0x80, 0x80, 0x01]);
        assert!(matches!(
            parser.read_7bit_encoded_int(),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn read_bytes_does_not_move_on_failure() {
        let mut parser = Parser::new(&[1, 2, 3]);
        assert!(matches!(parser.read_bytes(4), Err(Error::OutOfBounds)));
        assert_eq!(parser.pos(), 0);
        assert_eq!(parser.read_bytes(2).unwrap(), &[1, 2]);
        assert_eq!(parser.pos(), 2);
    }
}
