use crate::common::{
    DebugLineStrOffset, DebugStrOffset, DebugStrOffsetsBase, DebugStrOffsetsIndex, Format,
    SectionId,
};
use crate::endianity::Endianity;
use crate::read::{EndianSlice, Error, Reader, Result, Section};

/// The `DebugStr` struct represents the DWARF strings
/// found in the `.debug_str` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugStr<R> {
    debug_str_section: R,
}

impl<'input, Endian> DebugStr<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugStr` instance from the data in the `.debug_str`
    /// section.
    ///
    /// ```
    /// use dwarf_dies::{DebugStr, LittleEndian};
    ///
    /// # let buf = [0x00, 0x01, 0x02, 0x03];
    /// # let read_debug_str_section_somehow = || &buf;
    /// let debug_str = DebugStr::new(read_debug_str_section_somehow(), LittleEndian);
    /// ```
    pub fn new(debug_str_section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(debug_str_section, endian))
    }
}

impl<R: Reader> DebugStr<R> {
    /// Lookup a string from the `.debug_str` section by DebugStrOffset.
    ///
    /// An offset at or past the end of the section is an error, since the
    /// unit that produced it cannot be trusted any further.
    ///
    /// ```
    /// use dwarf_dies::{DebugStr, DebugStrOffset, LittleEndian};
    ///
    /// # let buf = [0x01, 0x02, 0x00];
    /// let debug_str = DebugStr::new(&buf, LittleEndian);
    /// println!("Found string {:?}", debug_str.get_str(DebugStrOffset(0)));
    /// ```
    pub fn get_str(&self, offset: DebugStrOffset) -> Result<R> {
        get_null_terminated(&self.debug_str_section, SectionId::DebugStr, offset.0)
    }

    /// Lookup a string, treating an empty string as absent.
    pub fn get_nonempty_str(&self, offset: DebugStrOffset) -> Result<Option<R>> {
        let s = self.get_str(offset)?;
        Ok(if s.is_empty() { None } else { Some(s) })
    }
}

impl<R> Section<R> for DebugStr<R> {
    fn id() -> SectionId {
        SectionId::DebugStr
    }

    fn reader(&self) -> &R {
        &self.debug_str_section
    }
}

impl<R> From<R> for DebugStr<R> {
    fn from(debug_str_section: R) -> Self {
        DebugStr { debug_str_section }
    }
}

/// The `DebugLineStr` struct represents the DWARF strings
/// found in the `.debug_line_str` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugLineStr<R> {
    section: R,
}

impl<R: Reader> DebugLineStr<R> {
    /// Lookup a string from the `.debug_line_str` section by DebugLineStrOffset.
    pub fn get_str(&self, offset: DebugLineStrOffset) -> Result<R> {
        get_null_terminated(&self.section, SectionId::DebugLineStr, offset.0)
    }
}

impl<R> Section<R> for DebugLineStr<R> {
    fn id() -> SectionId {
        SectionId::DebugLineStr
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for DebugLineStr<R> {
    fn from(section: R) -> Self {
        DebugLineStr { section }
    }
}

fn get_null_terminated<R: Reader>(section: &R, id: SectionId, offset: usize) -> Result<R> {
    if offset >= section.len() {
        return Err(Error::OffsetOutOfBounds {
            section: id,
            offset,
        });
    }
    let mut input = section.clone();
    input.skip(offset)?;
    input.read_null_terminated_slice()
}

/// The raw contents of the `.debug_str_offsets` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugStrOffsets<R> {
    section: R,
}

impl<R: Reader> DebugStrOffsets<R> {
    /// Returns the `.debug_str` offset at the given `base` and `index`.
    ///
    /// A set of entries in the `.debug_str_offsets` section consists of a header
    /// followed by a series of string table offsets.
    ///
    /// The `base` must be the `DW_AT_str_offsets_base` value from the compilation unit DIE.
    /// This is an offset that points to the first entry following the header.
    /// Split units in DWARF 4 GNU style have no header and use a base of zero.
    ///
    /// The `index` is the value of a `DW_FORM_strx` attribute.
    pub fn get_str_offset(
        &self,
        format: Format,
        base: DebugStrOffsetsBase,
        index: DebugStrOffsetsIndex,
    ) -> Result<DebugStrOffset> {
        let entry = index
            .0
            .checked_mul(usize::from(format.word_size()))
            .and_then(|o| o.checked_add(base.0))
            .ok_or(Error::UnsupportedOffset)?;
        let mut input = self.section.clone();
        input.skip(entry).map_err(|_| Error::OffsetOutOfBounds {
            section: SectionId::DebugStrOffsets,
            offset: entry,
        })?;
        input.read_offset(format).map(DebugStrOffset)
    }
}

impl<R> Section<R> for DebugStrOffsets<R> {
    fn id() -> SectionId {
        SectionId::DebugStrOffsets
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for DebugStrOffsets<R> {
    fn from(section: R) -> Self {
        DebugStrOffsets { section }
    }
}
