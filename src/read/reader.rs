use std::borrow::Cow;
use core::fmt::Debug;

use crate::common::Format;
use crate::endianity::Endianity;
use crate::leb128;
use crate::read::{Error, Result};

/// Convert a `u64` to a `usize` and return it.
#[inline]
pub(crate) fn u64_to_offset(offset64: u64) -> Result<usize> {
    let offset = offset64 as usize;
    if offset as u64 == offset64 {
        Ok(offset)
    } else {
        Err(Error::UnsupportedOffset)
    }
}

/// The result of reading an initial length field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialLength {
    /// The length of the data that follows the field.
    pub length: usize,
    /// The offset size implied by the field.
    pub format: Format,
    /// The number of bytes the field itself occupied: 4, 12, or 8 for the
    /// legacy form that uses a leading zero word.
    pub header_size: u8,
}

/// A trait for reading the data from a DWARF section.
///
/// All read operations advance the section offset of the reader
/// unless specified otherwise.
pub trait Reader: Debug + Clone {
    /// The endianity of bytes that are read.
    type Endian: Endianity;

    /// Return the endianity of bytes that are read.
    fn endian(&self) -> Self::Endian;

    /// Return the number of bytes remaining.
    fn len(&self) -> usize;

    /// Return true if the number of bytes remaining is zero.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Set the number of bytes remaining to zero.
    fn empty(&mut self);

    /// Set the number of bytes remaining to the specified length.
    fn truncate(&mut self, len: usize) -> Result<()>;

    /// Return the offset of this reader's data relative to the start of
    /// the given base reader's data.
    ///
    /// May panic if this reader's data is not contained within the given
    /// base reader's data.
    fn offset_from(&self, base: &Self) -> usize;

    /// Find the index of the first occurrence of the given byte.
    /// The offset of the reader is not changed.
    fn find(&self, byte: u8) -> Result<usize>;

    /// Discard the specified number of bytes.
    fn skip(&mut self, len: usize) -> Result<()>;

    /// Split a reader in two.
    ///
    /// A new reader is returned that can be used to read the next
    /// `len` bytes, and `self` is advanced so that it reads the remainder.
    fn split(&mut self, len: usize) -> Result<Self>;

    /// Return all remaining data as a clone-on-write slice.
    fn to_slice(&self) -> Result<Cow<'_, [u8]>>;

    /// Convert all remaining data to a clone-on-write string.
    ///
    /// Returns an error if the data contains invalid characters.
    fn to_string(&self) -> Result<Cow<'_, str>>;

    /// Convert all remaining data to a clone-on-write string, including invalid characters.
    fn to_string_lossy(&self) -> Result<Cow<'_, str>>;

    /// Read exactly `buf.len()` bytes into `buf`.
    fn read_slice(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read a u8 array.
    #[inline]
    fn read_u8_array<A>(&mut self) -> Result<A>
    where
        A: Sized + Default + AsMut<[u8]>,
    {
        let mut val = Default::default();
        self.read_slice(<A as AsMut<[u8]>>::as_mut(&mut val))?;
        Ok(val)
    }

    /// Read a u8.
    #[inline]
    fn read_u8(&mut self) -> Result<u8> {
        let a: [u8; 1] = self.read_u8_array()?;
        Ok(a[0])
    }

    /// Read an i8.
    #[inline]
    fn read_i8(&mut self) -> Result<i8> {
        let a: [u8; 1] = self.read_u8_array()?;
        Ok(a[0] as i8)
    }

    /// Read a u16.
    #[inline]
    fn read_u16(&mut self) -> Result<u16> {
        let a: [u8; 2] = self.read_u8_array()?;
        Ok(self.endian().read_u16(&a))
    }

    /// Read an i16.
    #[inline]
    fn read_i16(&mut self) -> Result<i16> {
        let a: [u8; 2] = self.read_u8_array()?;
        Ok(self.endian().read_i16(&a))
    }

    /// Read a u32.
    #[inline]
    fn read_u32(&mut self) -> Result<u32> {
        let a: [u8; 4] = self.read_u8_array()?;
        Ok(self.endian().read_u32(&a))
    }

    /// Read an i32.
    #[inline]
    fn read_i32(&mut self) -> Result<i32> {
        let a: [u8; 4] = self.read_u8_array()?;
        Ok(self.endian().read_i32(&a))
    }

    /// Read a u64.
    #[inline]
    fn read_u64(&mut self) -> Result<u64> {
        let a: [u8; 8] = self.read_u8_array()?;
        Ok(self.endian().read_u64(&a))
    }

    /// Read an i64.
    #[inline]
    fn read_i64(&mut self) -> Result<i64> {
        let a: [u8; 8] = self.read_u8_array()?;
        Ok(self.endian().read_i64(&a))
    }

    /// Read a null-terminated slice, and return it (excluding the null).
    fn read_null_terminated_slice(&mut self) -> Result<Self> {
        let idx = self.find(0)?;
        let val = self.split(idx)?;
        self.skip(1)?;
        Ok(val)
    }

    /// Skip a LEB128 encoded integer.
    fn skip_leb128(&mut self) -> Result<()> {
        leb128::read::skip(self)
    }

    /// Read an unsigned LEB128 encoded integer.
    fn read_uleb128(&mut self) -> Result<u64> {
        leb128::read::unsigned(self)
    }

    /// Read an unsigned LEB128 encoded u32.
    fn read_uleb128_u32(&mut self) -> Result<u32> {
        leb128::read::unsigned(self)?
            .try_into()
            .map_err(|_| Error::BadUnsignedLeb128)
    }

    /// Read an unsigned LEB128 encoded u16.
    fn read_uleb128_u16(&mut self) -> Result<u16> {
        leb128::read::u16(self)
    }

    /// Read a signed LEB128 encoded integer.
    fn read_sleb128(&mut self) -> Result<i64> {
        leb128::read::signed(self)
    }

    /// Read a 24 bit unsigned integer, as used by the `strx3`/`addrx3` forms.
    fn read_u24(&mut self) -> Result<u32> {
        let a: [u8; 3] = self.read_u8_array()?;
        Ok(self.endian().read_uint(&a) as u32)
    }

    /// Read an initial length field, recognising the 32-bit form, the
    /// `0xffffffff` escape for 64-bit DWARF, and the legacy 64-bit form
    /// that begins with a zero word.
    fn read_initial_length_with_size(&mut self) -> Result<InitialLength> {
        const MAX_DWARF_32_UNIT_LENGTH: u32 = 0xffff_fff0;
        const DWARF_64_INITIAL_UNIT_LENGTH: u32 = 0xffff_ffff;

        let start = self.clone();
        let val = self.read_u32()?;
        if val == 0 && start.len() >= 8 {
            // The zero word is the high half of an 8-byte length.
            let mut legacy = start;
            let length = legacy.read_u64().and_then(u64_to_offset)?;
            *self = legacy;
            Ok(InitialLength {
                length,
                format: Format::Dwarf64,
                header_size: 8,
            })
        } else if val < MAX_DWARF_32_UNIT_LENGTH {
            Ok(InitialLength {
                length: val as usize,
                format: Format::Dwarf32,
                header_size: 4,
            })
        } else if val == DWARF_64_INITIAL_UNIT_LENGTH {
            let length = self.read_u64().and_then(u64_to_offset)?;
            Ok(InitialLength {
                length,
                format: Format::Dwarf64,
                header_size: 12,
            })
        } else {
            Err(Error::UnknownReservedLength(val))
        }
    }

    /// Read an initial length field, and return the unit length and format.
    #[inline]
    fn read_initial_length(&mut self) -> Result<(usize, Format)> {
        let initial = self.read_initial_length_with_size()?;
        Ok((initial.length, initial.format))
    }

    /// Read an address-sized integer, and return it as a `u64`.
    fn read_address(&mut self, address_size: u8) -> Result<u64> {
        match address_size {
            1 => self.read_u8().map(u64::from),
            2 => self.read_u16().map(u64::from),
            4 => self.read_u32().map(u64::from),
            8 => self.read_u64(),
            otherwise => Err(Error::UnsupportedAddressSize(otherwise)),
        }
    }

    /// Parse a word-sized integer according to the DWARF format.
    ///
    /// These are always used to encode section offsets or lengths,
    /// and so have a type of `usize`.
    fn read_word(&mut self, format: Format) -> Result<usize> {
        match format {
            Format::Dwarf32 => self.read_u32().map(|v| v as usize),
            Format::Dwarf64 => self.read_u64().and_then(u64_to_offset),
        }
    }

    /// Parse a word-sized section offset according to the DWARF format.
    #[inline]
    fn read_offset(&mut self, format: Format) -> Result<usize> {
        self.read_word(format)
    }

    /// Parse a section offset of the given size.
    ///
    /// This is used for `DW_FORM_ref_addr` values in DWARF version 2.
    fn read_sized_offset(&mut self, size: u8) -> Result<usize> {
        match size {
            1 => self.read_u8().map(usize::from),
            2 => self.read_u16().map(usize::from),
            4 => self.read_u32().map(|v| v as usize),
            8 => self.read_u64().and_then(u64_to_offset),
            otherwise => Err(Error::UnsupportedOffsetSize(otherwise)),
        }
    }
}

/// Sign extend an address read with the given size, for targets whose
/// addresses are signed.
pub fn sign_extend_address(value: u64, address_size: u8) -> u64 {
    match address_size {
        1 => value as u8 as i8 as i64 as u64,
        2 => value as u16 as i16 as i64 as u64,
        4 => value as u32 as i32 as i64 as u64,
        _ => value,
    }
}
