use core::ops::Range;

use crate::common::{DebugInfoOffset, Encoding, SectionId};
use crate::complaint::{complain, Complaints};
use crate::endianity::Endianity;
use crate::read::unit::parse_debug_info_offset;
use crate::read::{EndianSlice, Error, Reader, Result, Section};

/// The `DebugAranges` struct represents the DWARF address range information
/// found in the `.debug_aranges` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugAranges<R> {
    section: R,
}

impl<'input, Endian> DebugAranges<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugAranges` instance from the data in the `.debug_aranges`
    /// section.
    ///
    /// ```
    /// use dwarf_dies::{DebugAranges, LittleEndian};
    ///
    /// # let buf = [];
    /// # let read_debug_aranges_section = || &buf;
    /// let debug_aranges =
    ///     DebugAranges::new(read_debug_aranges_section(), LittleEndian);
    /// ```
    pub fn new(section: &'input [u8], endian: Endian) -> Self {
        DebugAranges {
            section: EndianSlice::new(section, endian),
        }
    }
}

impl<R: Reader> DebugAranges<R> {
    /// Iterate the sets of entries in the `.debug_aranges` section.
    ///
    /// Each set of entries belongs to a single unit.
    pub fn headers(&self) -> ArangeHeaderIter<R> {
        ArangeHeaderIter {
            input: self.section.clone(),
            offset: 0,
        }
    }

    /// Collect every range in the section, paired with the offset of the
    /// unit that covers it.
    ///
    /// Empty ranges are dropped. Ranges that wrap around the address space
    /// are reported and dropped.
    pub fn address_map(&self, complaints: &Complaints) -> Result<Vec<(Range<u64>, DebugInfoOffset)>> {
        let mut map = Vec::new();
        let mut headers = self.headers();
        while let Some(header) = headers.next()? {
            let mut entries = header.entries();
            while let Some(entry) = entries.next()? {
                if entry.length == 0 {
                    continue;
                }
                match entry.range() {
                    Some(range) => map.push((range, header.debug_info_offset())),
                    None => complain!(
                        complaints,
                        InvalidRange,
                        ".debug_aranges entry 0x{:x}+0x{:x} for unit at 0x{:x} wraps",
                        entry.address,
                        entry.length,
                        header.debug_info_offset().0
                    ),
                }
            }
        }
        map.sort_by_key(|(range, _)| range.start);
        Ok(map)
    }
}

impl<R> Section<R> for DebugAranges<R> {
    fn id() -> SectionId {
        SectionId::DebugAranges
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for DebugAranges<R> {
    fn from(section: R) -> Self {
        DebugAranges { section }
    }
}

/// An iterator over the headers of a `.debug_aranges` section.
#[derive(Clone, Debug)]
pub struct ArangeHeaderIter<R: Reader> {
    input: R,
    offset: usize,
}

impl<R: Reader> ArangeHeaderIter<R> {
    /// Advance the iterator to the next header.
    pub fn next(&mut self) -> Result<Option<ArangeHeader<R>>> {
        if self.input.is_empty() {
            return Ok(None);
        }

        let len = self.input.len();
        match ArangeHeader::parse(&mut self.input, self.offset) {
            Ok(header) => {
                self.offset += len - self.input.len();
                Ok(Some(header))
            }
            Err(e) => {
                self.input.empty();
                Err(e)
            }
        }
    }
}

/// A header for a set of entries in the `.debug_arange` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArangeHeader<R: Reader> {
    offset: usize,
    encoding: Encoding,
    length: usize,
    debug_info_offset: DebugInfoOffset,
    entries: R,
}

impl<R: Reader> ArangeHeader<R> {
    fn parse(input: &mut R, offset: usize) -> Result<Self> {
        let (length, format) = input.read_initial_length()?;
        let mut rest = input.split(length)?;

        // Check the version. The DWARF 5 spec says that this is always 2, but version 3
        // has been observed in the wild, potentially due to a bug; see
        // https://github.com/gimli-rs/gimli/issues/559 for more information.
        // lldb allows versions 2 through 5, possibly by mistake.
        let version = rest.read_u16()?;
        if version != 2 && version != 3 {
            return Err(Error::UnknownVersion(u64::from(version)));
        }

        let debug_info_offset = parse_debug_info_offset(&mut rest, format)?;
        let address_size = rest.read_u8()?;
        let segment_size = rest.read_u8()?;
        if segment_size != 0 {
            return Err(Error::UnsupportedSegmentSize(segment_size));
        }
        if !matches!(address_size, 1 | 2 | 4 | 8) {
            return Err(Error::UnsupportedAddressSize(address_size));
        }

        // unit_length + version + offset + address_size + segment_size
        let header_length = format.initial_length_size() as usize + 2 + format.word_size() as usize + 1 + 1;

        // The first tuple following the header in each set begins at an offset that is
        // a multiple of the size of a single tuple (that is, twice the size of an address).
        let tuple_length = usize::from(address_size) * 2;
        let padding = if header_length % tuple_length == 0 {
            0
        } else {
            tuple_length - header_length % tuple_length
        };
        rest.skip(padding)?;

        let encoding = Encoding {
            format,
            version,
            address_size,
        };
        Ok(ArangeHeader {
            offset,
            encoding,
            length,
            debug_info_offset,
            entries: rest,
        })
    }

    /// Return the offset of this header within the `.debug_aranges` section.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the length of this set of entries, including the header.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Return the encoding parameters for this set of entries.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Return the offset into the .debug_info section for this set of arange entries.
    pub fn debug_info_offset(&self) -> DebugInfoOffset {
        self.debug_info_offset
    }

    /// Return the arange entries in this set.
    pub fn entries(&self) -> ArangeEntryIter<R> {
        ArangeEntryIter {
            input: self.entries.clone(),
            encoding: self.encoding,
        }
    }
}

/// An iterator over the aranges from a `.debug_aranges` section.
#[derive(Debug, Clone)]
pub struct ArangeEntryIter<R: Reader> {
    input: R,
    encoding: Encoding,
}

impl<R: Reader> ArangeEntryIter<R> {
    /// Advance the iterator and return the next arange.
    ///
    /// A `(0, 0)` tuple ends the set; anything after it is padding.
    pub fn next(&mut self) -> Result<Option<ArangeEntry>> {
        if self.input.is_empty() {
            return Ok(None);
        }

        let address_size = self.encoding.address_size;
        let parsed = read_tuple(&mut self.input, address_size);
        match parsed {
            Ok((0, 0)) => {
                self.input.empty();
                Ok(None)
            }
            Ok((address, length)) => Ok(Some(ArangeEntry { address, length })),
            Err(e) => {
                self.input.empty();
                Err(e)
            }
        }
    }
}

fn read_tuple<R: Reader>(input: &mut R, address_size: u8) -> Result<(u64, u64)> {
    let address = input.read_address(address_size)?;
    let length = input.read_address(address_size)?;
    Ok((address, length))
}

/// A single parsed arange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ArangeEntry {
    address: u64,
    length: u64,
}

impl ArangeEntry {
    /// Return the beginning address of this arange.
    pub fn address(&self) -> u64 {
        self.address
    }

    /// Return the length of this arange.
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Return the range, or `None` if it wraps.
    pub fn range(&self) -> Option<Range<u64>> {
        self.address
            .checked_add(self.length)
            .map(|end| self.address..end)
    }
}
