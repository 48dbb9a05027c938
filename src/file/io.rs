//! Low-level byte order and safe reading utilities for metadata blobs.
//!
//! Every fixed-width field of the metadata format is little-endian. The
//! [`crate::file::io::MetaIO`] trait abstracts over the primitive types the decoder reads so the
//! [`crate::file::parser::Parser`] can offer a single generic `read_le::<T>()`.
//!
//! # Examples
//!
//! ```rust,ignore
//! use metascope::file::io::read_le_at;
//!
//! let data = [0x01, 0x00, 0x02, 0x00];
//! let mut offset = 0;
//!
//! let first: u16 = read_le_at(&data, &mut offset)?;
//! let second: u16 = read_le_at(&data, &mut offset)?;
//! assert_eq!((first, second, offset), (1, 2, 4));
//! # Ok::<(), metascope::Error>(())
//! ```

use crate::Result;

/// A fixed-width primitive that can be decoded from little-endian bytes.
pub trait MetaIO: Sized {
    /// `[u8; N]` for an `N`-byte primitive
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Decodes the value.
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_meta_io {
    ($($ty:ty => $len:expr),* $(,)?) => {
        $(
            impl MetaIO for $ty {
                type Bytes = [u8; $len];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$ty>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_meta_io!(u8 => 1, u16 => 2, u32 => 4, u64 => 8);

/// Reads a `T` at `*offset` and moves `offset` past it. On failure `offset` is unchanged.
///
/// # Errors
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes remain.
pub fn read_le_at<T: MetaIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let end = offset
        .checked_add(std::mem::size_of::<T>())
        .filter(|&end| end <= data.len())
        .ok_or(out_of_bounds_error!())?;
    let bytes = data[*offset..end]
        .try_into()
        .map_err(|_| out_of_bounds_error!())?;

    *offset = end;
    Ok(T::from_le_bytes(bytes))
}
