//! Functions for parsing DWARF `.debug_info` and `.debug_types` sections.

use fallible_iterator::FallibleIterator;

use crate::common::{
    DebugAbbrevOffset, DebugAddrIndex, DebugInfoOffset, DebugLineStrOffset, DebugStrOffset,
    DebugStrOffsetsIndex, DebugTypeSignature, DebugTypesOffset, DwoId, Encoding, Format,
    SectionId, UnitSectionOffset,
};
use crate::constants;
use crate::endianity::Endianity;
use crate::read::abbrev::get_attribute_size;
use crate::read::{
    u64_to_offset, Abbreviations, AttributeSpecification, DebugAbbrev, EndianSlice, Error,
    Reader, Result, Section, UnitOffset,
};

impl DebugTypesOffset {
    /// Convert an offset to be relative to the start of the given unit,
    /// instead of relative to the start of the `.debug_types` section.
    /// Returns `None` if the offset is not within the unit entries.
    pub fn to_unit_offset<R: Reader>(&self, unit: &UnitHeader<R>) -> Option<UnitOffset> {
        UnitSectionOffset::DebugTypesOffset(*self).to_unit_offset(unit)
    }
}

impl DebugInfoOffset {
    /// Convert an offset to be relative to the start of the given unit,
    /// instead of relative to the start of the `.debug_info` section.
    /// Returns `None` if the offset is not within this unit entries.
    pub fn to_unit_offset<R: Reader>(&self, unit: &UnitHeader<R>) -> Option<UnitOffset> {
        UnitSectionOffset::DebugInfoOffset(*self).to_unit_offset(unit)
    }
}

impl UnitSectionOffset {
    /// Convert an offset to be relative to the start of the given unit,
    /// instead of relative to the start of the section.
    /// Returns `None` if the offset is not within the unit entries.
    pub fn to_unit_offset<R: Reader>(&self, unit: &UnitHeader<R>) -> Option<UnitOffset> {
        if self.is_types() != unit.offset().is_types() {
            return None;
        }
        let offset = self.raw().checked_sub(unit.offset().raw())?;
        let offset = UnitOffset(offset);
        if unit.is_valid_offset(offset) {
            Some(offset)
        } else {
            None
        }
    }
}

impl UnitOffset {
    /// Convert an offset to be relative to the start of the section that
    /// holds the given unit.
    pub fn to_unit_section_offset<R: Reader>(&self, unit: &UnitHeader<R>) -> UnitSectionOffset {
        match unit.offset() {
            UnitSectionOffset::DebugInfoOffset(o) => {
                UnitSectionOffset::DebugInfoOffset(DebugInfoOffset(o.0 + self.0))
            }
            UnitSectionOffset::DebugTypesOffset(o) => {
                UnitSectionOffset::DebugTypesOffset(DebugTypesOffset(o.0 + self.0))
            }
        }
    }
}

/// The `DebugInfo` struct represents the DWARF debugging information found in
/// the `.debug_info` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugInfo<R> {
    debug_info_section: R,
}

impl<'input, Endian> DebugInfo<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugInfo` instance from the data in the `.debug_info`
    /// section.
    ///
    /// ```
    /// use dwarf_dies::{DebugInfo, LittleEndian};
    ///
    /// # let buf = [0x00, 0x01, 0x02, 0x03];
    /// # let read_debug_info_section_somehow = || &buf;
    /// let debug_info = DebugInfo::new(read_debug_info_section_somehow(), LittleEndian);
    /// ```
    pub fn new(debug_info_section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(debug_info_section, endian))
    }
}

impl<R: Reader> DebugInfo<R> {
    /// Iterate the units in this `.debug_info` section.
    ///
    /// Can be [used with
    /// `FallibleIterator`](./index.html#using-with-fallibleiterator).
    pub fn units(&self) -> DebugInfoUnitHeadersIter<R> {
        DebugInfoUnitHeadersIter {
            input: self.debug_info_section.clone(),
            offset: DebugInfoOffset(0),
        }
    }

    /// Get the UnitHeader located at offset from this .debug_info section.
    pub fn header_from_offset(&self, offset: DebugInfoOffset) -> Result<UnitHeader<R>> {
        let input = &mut self.debug_info_section.clone();
        input.skip(offset.0).map_err(|_| Error::OffsetOutOfBounds {
            section: SectionId::DebugInfo,
            offset: offset.0,
        })?;
        parse_unit_header(input, offset.into())
    }

    /// The length of the section.
    pub fn len(&self) -> usize {
        self.debug_info_section.len()
    }

    /// Whether the section is empty.
    pub fn is_empty(&self) -> bool {
        self.debug_info_section.is_empty()
    }
}

impl<R> Section<R> for DebugInfo<R> {
    fn id() -> SectionId {
        SectionId::DebugInfo
    }

    fn reader(&self) -> &R {
        &self.debug_info_section
    }
}

impl<R> From<R> for DebugInfo<R> {
    fn from(debug_info_section: R) -> Self {
        DebugInfo { debug_info_section }
    }
}

/// An iterator over the units of a .debug_info section.
///
/// See the [documentation on
/// `DebugInfo::units`](./struct.DebugInfo.html#method.units) for more detail.
#[derive(Clone, Debug)]
pub struct DebugInfoUnitHeadersIter<R: Reader> {
    input: R,
    offset: DebugInfoOffset,
}

impl<R: Reader> DebugInfoUnitHeadersIter<R> {
    /// Advance the iterator to the next unit header.
    pub fn next(&mut self) -> Result<Option<UnitHeader<R>>> {
        if self.input.is_empty() {
            Ok(None)
        } else {
            let len = self.input.len();
            match parse_unit_header(&mut self.input, self.offset.into()) {
                Ok(header) => {
                    self.offset.0 += len - self.input.len();
                    Ok(Some(header))
                }
                Err(e) => {
                    self.input.empty();
                    Err(e)
                }
            }
        }
    }
}

impl<R: Reader> FallibleIterator for DebugInfoUnitHeadersIter<R> {
    type Item = UnitHeader<R>;
    type Error = Error;

    fn next(&mut self) -> ::core::result::Result<Option<Self::Item>, Self::Error> {
        DebugInfoUnitHeadersIter::next(self)
    }
}

/// The `DebugTypes` struct represents the DWARF type information
/// found in the `.debug_types` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugTypes<R> {
    debug_types_section: R,
}

impl<'input, Endian> DebugTypes<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugTypes` instance from the data in the `.debug_types`
    /// section.
    pub fn new(debug_types_section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(debug_types_section, endian))
    }
}

impl<R: Reader> DebugTypes<R> {
    /// Iterate the type-units in this `.debug_types` section.
    ///
    /// Can be [used with
    /// `FallibleIterator`](./index.html#using-with-fallibleiterator).
    pub fn units(&self) -> DebugTypesUnitHeadersIter<R> {
        DebugTypesUnitHeadersIter {
            input: self.debug_types_section.clone(),
            offset: DebugTypesOffset(0),
        }
    }

    /// Get the UnitHeader located at offset from this .debug_types section.
    pub fn header_from_offset(&self, offset: DebugTypesOffset) -> Result<UnitHeader<R>> {
        let input = &mut self.debug_types_section.clone();
        input.skip(offset.0).map_err(|_| Error::OffsetOutOfBounds {
            section: SectionId::DebugTypes,
            offset: offset.0,
        })?;
        parse_unit_header(input, offset.into())
    }
}

impl<R> Section<R> for DebugTypes<R> {
    fn id() -> SectionId {
        SectionId::DebugTypes
    }

    fn reader(&self) -> &R {
        &self.debug_types_section
    }
}

impl<R> From<R> for DebugTypes<R> {
    fn from(debug_types_section: R) -> Self {
        DebugTypes {
            debug_types_section,
        }
    }
}

/// An iterator over the type-units of this `.debug_types` section.
#[derive(Clone, Debug)]
pub struct DebugTypesUnitHeadersIter<R: Reader> {
    input: R,
    offset: DebugTypesOffset,
}

impl<R: Reader> DebugTypesUnitHeadersIter<R> {
    /// Advance the iterator to the next type unit header.
    pub fn next(&mut self) -> Result<Option<UnitHeader<R>>> {
        if self.input.is_empty() {
            Ok(None)
        } else {
            let len = self.input.len();
            match parse_unit_header(&mut self.input, self.offset.into()) {
                Ok(header) => {
                    self.offset.0 += len - self.input.len();
                    Ok(Some(header))
                }
                Err(e) => {
                    self.input.empty();
                    Err(e)
                }
            }
        }
    }
}

impl<R: Reader> FallibleIterator for DebugTypesUnitHeadersIter<R> {
    type Item = UnitHeader<R>;
    type Error = Error;

    fn next(&mut self) -> ::core::result::Result<Option<Self::Item>, Self::Error> {
        DebugTypesUnitHeadersIter::next(self)
    }
}

/// This enum specifies the type of the unit and any type
/// specific data carried in the header (e.g. the type
/// signature/type offset of a type unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitType {
    /// In DWARF5, a unit with type `DW_UT_compile`. In previous DWARF versions,
    /// any unit appearing in the .debug_info section.
    Compilation,
    /// In DWARF5, a unit with type `DW_UT_type`. In DWARF 4, any unit appearing
    /// in the .debug_types section.
    Type {
        /// The unique type signature for this type unit.
        type_signature: DebugTypeSignature,
        /// The offset within this type unit where the type is defined.
        type_offset: UnitOffset,
    },
    /// A unit with type `DW_UT_partial`. The root DIE of this unit should be a
    /// `DW_TAG_partial_unit`.
    Partial,
    /// A unit with type `DW_UT_skeleton`. The enclosed dwo_id can be used to
    /// link this with the corresponding `SplitCompilation` unit in a dwo file.
    /// NB: The non-standard GNU split DWARF extension to DWARF 4 will instead
    /// be a `Compilation` unit with the dwo_id present as an attribute on the
    /// root DIE.
    Skeleton(DwoId),
    /// A unit with type `DW_UT_split_compile`. The enclosed dwo_id can be used to
    /// link this with the corresponding `Skeleton` unit in the original binary.
    /// NB: The non-standard GNU split DWARF extension to DWARF 4 will instead
    /// be a `Compilation` unit with the dwo_id present as an attribute on the
    /// root DIE.
    SplitCompilation(DwoId),
    /// A unit with type `DW_UT_split_type`. A split type unit is identical to a
    /// conventional type unit except for the section in which it appears.
    SplitType {
        /// The unique type signature for this type unit.
        type_signature: DebugTypeSignature,
        /// The offset within this type unit where the type is defined.
        type_offset: UnitOffset,
    },
}

impl UnitType {
    #[cfg(test)]
    pub(crate) fn dw_ut(&self) -> constants::DwUt {
        match self {
            UnitType::Compilation => constants::DW_UT_compile,
            UnitType::Type { .. } => constants::DW_UT_type,
            UnitType::Partial => constants::DW_UT_partial,
            UnitType::Skeleton(_) => constants::DW_UT_skeleton,
            UnitType::SplitCompilation(_) => constants::DW_UT_split_compile,
            UnitType::SplitType { .. } => constants::DW_UT_split_type,
        }
    }

    /// Whether this is a type unit, in `.debug_types` or in DWARF 5 form.
    pub fn is_type_unit(&self) -> bool {
        matches!(self, UnitType::Type { .. } | UnitType::SplitType { .. })
    }
}

/// The common fields for the headers of compilation units and
/// type units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitHeader<R> {
    encoding: Encoding,
    unit_length: usize,
    initial_length_size: u8,
    unit_type: UnitType,
    debug_abbrev_offset: DebugAbbrevOffset,
    unit_offset: UnitSectionOffset,
    entries_buf: R,
}

impl<R: Reader> UnitHeader<R> {
    /// Construct a new `UnitHeader`.
    pub fn new(
        encoding: Encoding,
        unit_length: usize,
        unit_type: UnitType,
        debug_abbrev_offset: DebugAbbrevOffset,
        unit_offset: UnitSectionOffset,
        entries_buf: R,
    ) -> Self {
        UnitHeader {
            encoding,
            unit_length,
            initial_length_size: encoding.format.initial_length_size(),
            unit_type,
            debug_abbrev_offset,
            unit_offset,
            entries_buf,
        }
    }

    /// Return the serialized size of the common unit header for the given
    /// DWARF format.
    pub fn size_of_header(&self) -> usize {
        self.length_including_self() - self.entries_buf.len()
    }

    /// Get the offset of this unit within its section.
    pub fn offset(&self) -> UnitSectionOffset {
        self.unit_offset
    }

    /// Get the length of the debugging info for this compilation unit, not
    /// including the byte length of the encoded length itself.
    pub fn unit_length(&self) -> usize {
        self.unit_length
    }

    /// Get the length of the debugging info for this compilation unit,
    /// including the byte length of the encoded length itself.
    pub fn length_including_self(&self) -> usize {
        usize::from(self.initial_length_size) + self.unit_length
    }

    /// Return the encoding parameters for this unit.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Get the DWARF version of the debugging info for this compilation unit.
    pub fn version(&self) -> u16 {
        self.encoding.version
    }

    /// Get the UnitType of this unit.
    pub fn type_(&self) -> UnitType {
        self.unit_type
    }

    /// The offset into the `.debug_abbrev` section for this compilation unit's
    /// debugging information entries' abbreviations.
    pub fn debug_abbrev_offset(&self) -> DebugAbbrevOffset {
        self.debug_abbrev_offset
    }

    /// The size of addresses (in bytes) in this compilation unit.
    pub fn address_size(&self) -> u8 {
        self.encoding.address_size
    }

    /// Whether this compilation unit is encoded in 64- or 32-bit DWARF.
    pub fn format(&self) -> Format {
        self.encoding.format
    }

    /// The serialized size of the header for this compilation unit.
    pub fn header_size(&self) -> usize {
        self.size_of_header()
    }

    /// The type signature, for type units.
    pub fn type_signature(&self) -> Option<DebugTypeSignature> {
        match self.unit_type {
            UnitType::Type { type_signature, .. } | UnitType::SplitType { type_signature, .. } => {
                Some(type_signature)
            }
            _ => None,
        }
    }

    /// The offset of the type-defining die, for type units.
    pub fn type_offset(&self) -> Option<UnitOffset> {
        match self.unit_type {
            UnitType::Type { type_offset, .. } | UnitType::SplitType { type_offset, .. } => {
                Some(type_offset)
            }
            _ => None,
        }
    }

    /// The split unit identifier carried by DWARF 5 skeleton and split units.
    pub fn dwo_id(&self) -> Option<DwoId> {
        match self.unit_type {
            UnitType::Skeleton(id) | UnitType::SplitCompilation(id) => Some(id),
            _ => None,
        }
    }

    pub(crate) fn is_valid_offset(&self, offset: UnitOffset) -> bool {
        let size_of_header = self.header_size();
        if offset.0 < size_of_header {
            return false;
        }

        let relative_to_entries_buf = offset.0 - size_of_header;
        relative_to_entries_buf < self.entries_buf.len()
    }

    /// Get the underlying bytes for the supplied range.
    pub fn range_from(&self, idx: core::ops::RangeFrom<UnitOffset>) -> Result<R> {
        let size_of_header = self.header_size();
        let start = idx.start.0;
        if start < size_of_header {
            return Err(Error::OffsetOutOfBounds {
                section: self.section_id(),
                offset: self.unit_offset.raw() + start,
            });
        }
        let mut input = self.entries_buf.clone();
        input
            .skip(start - size_of_header)
            .map_err(|_| Error::OffsetOutOfBounds {
                section: self.section_id(),
                offset: self.unit_offset.raw() + start,
            })?;
        Ok(input)
    }

    /// The bytes of the unit that follow its header.
    pub fn entries_buf(&self) -> &R {
        &self.entries_buf
    }

    /// The section holding this unit.
    pub fn section_id(&self) -> SectionId {
        if self.unit_offset.is_types() {
            SectionId::DebugTypes
        } else {
            SectionId::DebugInfo
        }
    }

    /// Whether the unit has no dies: either nothing follows the header, or the
    /// first abbreviation code is zero.
    ///
    /// Some linkers leave such stubs behind when they discard a unit.
    pub fn is_dummy(&self) -> bool {
        let mut input = self.entries_buf.clone();
        match input.read_uleb128() {
            Ok(code) => code == 0,
            Err(_) => true,
        }
    }

    /// Check that the abbreviation offset lies within `.debug_abbrev`.
    pub fn validate_abbrev_offset(&self, debug_abbrev: &DebugAbbrev<R>) -> Result<()> {
        if self.debug_abbrev_offset.0 >= debug_abbrev.reader().len() {
            return Err(Error::BadAbbrevOffset {
                section: self.section_id(),
                unit_offset: self.unit_offset.raw(),
                abbrev_offset: self.debug_abbrev_offset.0,
            });
        }
        Ok(())
    }

    /// Parse this unit's abbreviations.
    pub fn abbreviations(&self, debug_abbrev: &DebugAbbrev<R>) -> Result<Abbreviations> {
        self.validate_abbrev_offset(debug_abbrev)?;
        debug_abbrev.abbreviations(self.debug_abbrev_offset())
    }
}

/// Parse the unit type from the unit header.
fn parse_unit_type<R: Reader>(input: &mut R) -> Result<constants::DwUt> {
    let val = input.read_u8()?;
    Ok(constants::DwUt(val))
}

/// Parse the `debug_abbrev_offset` in the compilation unit header.
fn parse_debug_abbrev_offset<R: Reader>(
    input: &mut R,
    format: Format,
) -> Result<DebugAbbrevOffset> {
    input.read_offset(format).map(DebugAbbrevOffset)
}

/// Parse the `debug_info_offset` in the arange header.
pub(crate) fn parse_debug_info_offset<R: Reader>(
    input: &mut R,
    format: Format,
) -> Result<DebugInfoOffset> {
    input.read_offset(format).map(DebugInfoOffset)
}

/// Parse a unit header.
///
/// For DWARF 2 to 4 the kind of unit is implied by the section that
/// `offset` points into; DWARF 5 headers carry it explicitly.
pub(crate) fn parse_unit_header<R: Reader>(
    input: &mut R,
    unit_offset: UnitSectionOffset,
) -> Result<UnitHeader<R>> {
    let section = if unit_offset.is_types() {
        SectionId::DebugTypes
    } else {
        SectionId::DebugInfo
    };
    let initial = input.read_initial_length_with_size()?;
    let unit_length = initial.length;
    let format = initial.format;
    if unit_length > input.len() {
        return Err(Error::UnitLengthOutOfBounds {
            section,
            unit_offset: unit_offset.raw(),
            length: unit_length,
        });
    }
    let mut rest = input.split(unit_length)?;
    let version = rest.read_u16()?;
    let abbrev_offset;
    let address_size;
    let unit_type;
    if !(2..=5).contains(&version) {
        return Err(Error::UnknownVersion(u64::from(version)));
    } else if version <= 4 {
        abbrev_offset = parse_debug_abbrev_offset(&mut rest, format)?;
        address_size = rest.read_u8()?;
        unit_type = if unit_offset.is_types() {
            constants::DW_UT_type
        } else {
            constants::DW_UT_compile
        };
    } else {
        unit_type = parse_unit_type(&mut rest)?;
        address_size = rest.read_u8()?;
        abbrev_offset = parse_debug_abbrev_offset(&mut rest, format)?;
    }
    if !matches!(address_size, 1 | 2 | 4 | 8) {
        return Err(Error::UnsupportedAddressSize(address_size));
    }
    let encoding = Encoding {
        format,
        version,
        address_size,
    };

    let unit_type = match unit_type {
        constants::DW_UT_compile => UnitType::Compilation,
        constants::DW_UT_type | constants::DW_UT_split_type => {
            let type_signature = parse_type_signature(&mut rest)?;
            let type_offset = parse_type_offset(&mut rest, format)?;
            if unit_type == constants::DW_UT_type {
                UnitType::Type {
                    type_signature,
                    type_offset,
                }
            } else {
                UnitType::SplitType {
                    type_signature,
                    type_offset,
                }
            }
        }
        constants::DW_UT_partial => UnitType::Partial,
        constants::DW_UT_skeleton => UnitType::Skeleton(DwoId(rest.read_u64()?)),
        constants::DW_UT_split_compile => UnitType::SplitCompilation(DwoId(rest.read_u64()?)),
        _ => return Err(Error::UnknownUnitType(unit_type)),
    };

    let header = UnitHeader {
        encoding,
        unit_length,
        initial_length_size: initial.header_size,
        unit_type,
        debug_abbrev_offset: abbrev_offset,
        unit_offset,
        entries_buf: rest,
    };
    if let Some(type_offset) = header.type_offset() {
        if !header.is_valid_offset(type_offset) {
            return Err(Error::TypeOffsetOutOfBounds {
                section,
                unit_offset: unit_offset.raw(),
                type_offset: type_offset.0,
            });
        }
    }
    Ok(header)
}

/// Parse a type unit header's unique type signature. Callers should handle
/// unique-ness checking.
fn parse_type_signature<R: Reader>(input: &mut R) -> Result<DebugTypeSignature> {
    input.read_u64().map(DebugTypeSignature)
}

/// Parse a type unit header's type offset.
fn parse_type_offset<R: Reader>(input: &mut R, format: Format) -> Result<UnitOffset> {
    input.read_offset(format).map(UnitOffset)
}

/// The value of an attribute in a `DebuggingInformationEntry`.
//
// Set the discriminant size so that all variants use the same alignment
// for their data.  This gives better code generation in `parse_attribute`.
#[repr(u64)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AttributeValue<R: Reader> {
    /// "Refers to some location in the address space of the described program."
    Addr(u64),

    /// An index into `.debug_addr`, relative to the unit's address base.
    DebugAddrIndex(DebugAddrIndex),

    /// A slice of an arbitrary number of bytes.
    Block(R),

    /// A one byte constant data value. How to interpret the byte depends on context.
    ///
    /// From section 7 of the standard: "Depending on context, it may be a
    /// signed integer, an unsigned integer, a floating-point constant, or
    /// anything else."
    Data1(u8),

    /// A two byte constant data value. How to interpret the bytes depends on context.
    Data2(u16),

    /// A four byte constant data value. How to interpret the bytes depends on context.
    Data4(u32),

    /// An eight byte constant data value. How to interpret the bytes depends on context.
    Data8(u64),

    /// A signed integer constant.
    Sdata(i64),

    /// An unsigned integer constant.
    Udata(u64),

    /// "The information bytes contain a DWARF expression (see Section 2.5) or
    /// location description (see Section 2.6)."
    Exprloc(R),

    /// A boolean that indicates presence or absence of the attribute.
    Flag(bool),

    /// An offset into another section. Which section this is an offset into
    /// depends on context.
    SecOffset(usize),

    /// An index into the location or range lists, relative to the unit's
    /// `DW_AT_loclists_base` or `DW_AT_rnglists_base`.
    ListIndex(usize),

    /// A reference to a `DebuggingInformationEntry` in this compilation unit.
    UnitRef(UnitOffset),

    /// A reference to a `DebuggingInformationEntry` that may or may not be in
    /// the same compilation unit.
    DebugInfoRef(DebugInfoOffset),

    /// A reference to a `DebuggingInformationEntry` in the alternate (`.dwz`)
    /// or supplementary object file.
    DebugInfoRefSup(DebugInfoOffset),

    /// A reference to a type unit, identified by its signature.
    DebugTypesRef(DebugTypeSignature),

    /// An offset into the `.debug_str` section.
    DebugStrRef(DebugStrOffset),

    /// An offset into the `.debug_str` section of the alternate (`.dwz`) or
    /// supplementary object file.
    DebugStrRefSup(DebugStrOffset),

    /// An offset into the `.debug_line_str` section.
    DebugLineStrRef(DebugLineStrOffset),

    /// An index into the unit's `.debug_str_offsets` table.
    DebugStrOffsetsIndex(DebugStrOffsetsIndex),

    /// A null terminated C string, including the final null byte. Not
    /// guaranteed to be UTF-8 or anything like that.
    String(R),
}

/// An attribute in a `DebuggingInformationEntry`, consisting of a name and
/// associated value.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Attribute<R: Reader> {
    name: constants::DwAt,
    form: constants::DwForm,
    value: AttributeValue<R>,
}

impl<R: Reader> Attribute<R> {
    /// Construct an attribute from its parts.
    pub fn new(name: constants::DwAt, form: constants::DwForm, value: AttributeValue<R>) -> Self {
        Attribute { name, form, value }
    }

    /// Get this attribute's name.
    pub fn name(&self) -> constants::DwAt {
        self.name
    }

    /// Get the form this attribute was encoded with. For `DW_FORM_indirect`
    /// this is the form that was read from the data.
    pub fn form(&self) -> constants::DwForm {
        self.form
    }

    /// Get this attribute's value.
    pub fn value(&self) -> &AttributeValue<R> {
        &self.value
    }

    pub(crate) fn set_value(&mut self, value: AttributeValue<R>) {
        self.value = value;
    }

    /// Rewrite the references of a unit in the alternate (`.dwz`) file so
    /// that they point back into that file.
    ///
    /// Inside the alternate file `DW_FORM_ref_addr` and `DW_FORM_strp` refer
    /// to the alternate file's own sections.
    pub fn into_alt(mut self) -> Self {
        self.value = match self.value {
            AttributeValue::DebugInfoRef(offset) => {
                self.form = constants::DW_FORM_GNU_ref_alt;
                AttributeValue::DebugInfoRefSup(offset)
            }
            AttributeValue::DebugStrRef(offset) => {
                self.form = constants::DW_FORM_GNU_strp_alt;
                AttributeValue::DebugStrRefSup(offset)
            }
            value => value,
        };
        self
    }

    /// Try to convert this attribute's value to a u8.
    pub fn u8_value(&self) -> Option<u8> {
        self.udata_value().and_then(|val| u8::try_from(val).ok())
    }

    /// Try to convert this attribute's value to a u16.
    pub fn u16_value(&self) -> Option<u16> {
        self.udata_value().and_then(|val| u16::try_from(val).ok())
    }

    /// Try to convert this attribute's value to an unsigned integer.
    pub fn udata_value(&self) -> Option<u64> {
        Some(match self.value {
            AttributeValue::Data1(data) => u64::from(data),
            AttributeValue::Data2(data) => u64::from(data),
            AttributeValue::Data4(data) => u64::from(data),
            AttributeValue::Data8(data) => data,
            AttributeValue::Udata(data) => data,
            AttributeValue::Sdata(data) => {
                if data < 0 {
                    // Maybe we should emit a warning here
                    return None;
                }
                data as u64
            }
            _ => return None,
        })
    }

    /// Try to convert this attribute's value to a signed integer.
    pub fn sdata_value(&self) -> Option<i64> {
        Some(match self.value {
            AttributeValue::Data1(data) => i64::from(data as i8),
            AttributeValue::Data2(data) => i64::from(data as i16),
            AttributeValue::Data4(data) => i64::from(data as i32),
            AttributeValue::Data8(data) => data as i64,
            AttributeValue::Sdata(data) => data,
            AttributeValue::Udata(data) => {
                if data > i64::MAX as u64 {
                    // Maybe we should emit a warning here
                    return None;
                }
                data as i64
            }
            _ => return None,
        })
    }

    /// Try to convert this attribute's value to an offset.
    ///
    /// DWARF 2 and 3 have no `DW_FORM_sec_offset`, and use `DW_FORM_data4`
    /// or `DW_FORM_data8` instead.
    pub fn offset_value(&self) -> Option<usize> {
        match self.value {
            AttributeValue::SecOffset(offset) => Some(offset),
            AttributeValue::Data4(data) => Some(data as usize),
            AttributeValue::Data8(data) => u64_to_offset(data).ok(),
            AttributeValue::Udata(data) => u64_to_offset(data).ok(),
            _ => None,
        }
    }

    /// Try to return this attribute's value as an address.
    pub fn address_value(&self) -> Option<u64> {
        match self.value {
            AttributeValue::Addr(addr) => Some(addr),
            _ => None,
        }
    }

    /// Whether the value is a flag that is set.
    pub fn flag_value(&self) -> bool {
        match self.value {
            AttributeValue::Flag(flag) => flag,
            _ => false,
        }
    }

    /// Try to return this attribute's value as an expression.
    pub fn exprloc_value(&self) -> Option<R> {
        Some(match self.value {
            AttributeValue::Block(ref data) => data.clone(),
            AttributeValue::Exprloc(ref data) => data.clone(),
            _ => return None,
        })
    }
}

fn length_u8_value<R: Reader>(input: &mut R) -> Result<R> {
    let len = input.read_u8()?;
    input.split(usize::from(len))
}

fn length_u16_value<R: Reader>(input: &mut R) -> Result<R> {
    let len = input.read_u16()?;
    input.split(usize::from(len))
}

fn length_u32_value<R: Reader>(input: &mut R) -> Result<R> {
    let len = input.read_u32()?;
    input.split(len as usize)
}

fn length_uleb_value<R: Reader>(input: &mut R) -> Result<R> {
    let len = input.read_uleb128().and_then(u64_to_offset)?;
    input.split(len)
}

/// Decode one attribute value with the given specification.
///
/// The result is not tied to any unit context: indexed strings and
/// addresses stay as indexes and references stay unit- or section-relative.
pub(crate) fn parse_attribute<R: Reader>(
    input: &mut R,
    encoding: Encoding,
    spec: AttributeSpecification,
) -> Result<Attribute<R>> {
    let mut form = spec.form();
    loop {
        let value = match form {
            constants::DW_FORM_indirect => {
                let dynamic_form = input.read_uleb128_u16()?;
                form = constants::DwForm(dynamic_form);
                if form == constants::DW_FORM_implicit_const {
                    return Err(Error::InvalidImplicitConst);
                }
                continue;
            }
            constants::DW_FORM_addr => {
                let addr = input.read_address(encoding.address_size)?;
                AttributeValue::Addr(addr)
            }
            constants::DW_FORM_block1 => {
                let block = length_u8_value(input)?;
                AttributeValue::Block(block)
            }
            constants::DW_FORM_block2 => {
                let block = length_u16_value(input)?;
                AttributeValue::Block(block)
            }
            constants::DW_FORM_block4 => {
                let block = length_u32_value(input)?;
                AttributeValue::Block(block)
            }
            constants::DW_FORM_block => {
                let block = length_uleb_value(input)?;
                AttributeValue::Block(block)
            }
            constants::DW_FORM_data1 => {
                let data = input.read_u8()?;
                AttributeValue::Data1(data)
            }
            constants::DW_FORM_data2 => {
                let data = input.read_u16()?;
                AttributeValue::Data2(data)
            }
            constants::DW_FORM_data4 => {
                let data = input.read_u32()?;
                AttributeValue::Data4(data)
            }
            constants::DW_FORM_data8 => {
                let data = input.read_u64()?;
                AttributeValue::Data8(data)
            }
            constants::DW_FORM_data16 => {
                let block = input.split(16)?;
                AttributeValue::Block(block)
            }
            constants::DW_FORM_udata => {
                let data = input.read_uleb128()?;
                AttributeValue::Udata(data)
            }
            constants::DW_FORM_sdata => {
                let data = input.read_sleb128()?;
                AttributeValue::Sdata(data)
            }
            constants::DW_FORM_exprloc => {
                let block = length_uleb_value(input)?;
                AttributeValue::Exprloc(block)
            }
            constants::DW_FORM_flag => {
                let present = input.read_u8()?;
                AttributeValue::Flag(present != 0)
            }
            constants::DW_FORM_flag_present => {
                // FlagPresent is this weird compile time always true thing that
                // isn't actually present in the serialized DIEs, only in the abbreviation.
                AttributeValue::Flag(true)
            }
            constants::DW_FORM_sec_offset => {
                let offset = input.read_offset(encoding.format)?;
                AttributeValue::SecOffset(offset)
            }
            constants::DW_FORM_loclistx | constants::DW_FORM_rnglistx => {
                let index = input.read_uleb128().and_then(u64_to_offset)?;
                AttributeValue::ListIndex(index)
            }
            constants::DW_FORM_ref1 => {
                let reference = input.read_u8()?;
                AttributeValue::UnitRef(UnitOffset(usize::from(reference)))
            }
            constants::DW_FORM_ref2 => {
                let reference = input.read_u16()?;
                AttributeValue::UnitRef(UnitOffset(usize::from(reference)))
            }
            constants::DW_FORM_ref4 => {
                let reference = input.read_u32()?;
                AttributeValue::UnitRef(UnitOffset(reference as usize))
            }
            constants::DW_FORM_ref8 => {
                let reference = input.read_u64().and_then(u64_to_offset)?;
                AttributeValue::UnitRef(UnitOffset(reference))
            }
            constants::DW_FORM_ref_udata => {
                let reference = input.read_uleb128().and_then(u64_to_offset)?;
                AttributeValue::UnitRef(UnitOffset(reference))
            }
            constants::DW_FORM_ref_addr => {
                // This is an offset, but DWARF version 2 specifies that DW_FORM_ref_addr
                // has the same size as an address on the target system.  This was changed
                // in DWARF version 3.
                let offset = if encoding.version <= 2 {
                    input.read_sized_offset(encoding.address_size)?
                } else {
                    input.read_offset(encoding.format)?
                };
                AttributeValue::DebugInfoRef(DebugInfoOffset(offset))
            }
            constants::DW_FORM_ref_sig8 => {
                let signature = input.read_u64()?;
                AttributeValue::DebugTypesRef(DebugTypeSignature(signature))
            }
            constants::DW_FORM_ref_sup4 => {
                let offset = input.read_u32()? as usize;
                AttributeValue::DebugInfoRefSup(DebugInfoOffset(offset))
            }
            constants::DW_FORM_ref_sup8 => {
                let offset = input.read_u64().and_then(u64_to_offset)?;
                AttributeValue::DebugInfoRefSup(DebugInfoOffset(offset))
            }
            constants::DW_FORM_GNU_ref_alt => {
                let offset = input.read_offset(encoding.format)?;
                AttributeValue::DebugInfoRefSup(DebugInfoOffset(offset))
            }
            constants::DW_FORM_string => {
                let string = input.read_null_terminated_slice()?;
                AttributeValue::String(string)
            }
            constants::DW_FORM_strp => {
                let offset = input.read_offset(encoding.format)?;
                AttributeValue::DebugStrRef(DebugStrOffset(offset))
            }
            constants::DW_FORM_strp_sup | constants::DW_FORM_GNU_strp_alt => {
                let offset = input.read_offset(encoding.format)?;
                AttributeValue::DebugStrRefSup(DebugStrOffset(offset))
            }
            constants::DW_FORM_line_strp => {
                let offset = input.read_offset(encoding.format)?;
                AttributeValue::DebugLineStrRef(DebugLineStrOffset(offset))
            }
            constants::DW_FORM_implicit_const => {
                let data = spec
                    .implicit_const_value()
                    .ok_or(Error::InvalidImplicitConst)?;
                AttributeValue::Sdata(data)
            }
            constants::DW_FORM_strx | constants::DW_FORM_GNU_str_index => {
                let index = input.read_uleb128().and_then(u64_to_offset)?;
                AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(index))
            }
            constants::DW_FORM_strx1 => {
                let index = input.read_u8()?;
                AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(usize::from(index)))
            }
            constants::DW_FORM_strx2 => {
                let index = input.read_u16()?;
                AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(usize::from(index)))
            }
            constants::DW_FORM_strx3 => {
                let index = input.read_u24()?;
                AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(index as usize))
            }
            constants::DW_FORM_strx4 => {
                let index = input.read_u32()?;
                AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(index as usize))
            }
            constants::DW_FORM_addrx | constants::DW_FORM_GNU_addr_index => {
                let index = input.read_uleb128().and_then(u64_to_offset)?;
                AttributeValue::DebugAddrIndex(DebugAddrIndex(index))
            }
            constants::DW_FORM_addrx1 => {
                let index = input.read_u8()?;
                AttributeValue::DebugAddrIndex(DebugAddrIndex(usize::from(index)))
            }
            constants::DW_FORM_addrx2 => {
                let index = input.read_u16()?;
                AttributeValue::DebugAddrIndex(DebugAddrIndex(usize::from(index)))
            }
            constants::DW_FORM_addrx3 => {
                let index = input.read_u24()?;
                AttributeValue::DebugAddrIndex(DebugAddrIndex(index as usize))
            }
            constants::DW_FORM_addrx4 => {
                let index = input.read_u32()?;
                AttributeValue::DebugAddrIndex(DebugAddrIndex(index as usize))
            }
            _ => {
                return Err(Error::UnknownForm(form));
            }
        };
        let attr = Attribute {
            name: spec.name(),
            form,
            value,
        };
        return Ok(attr);
    }
}

/// Advance `input` past the attributes described by `specs` without
/// decoding their values.
pub(crate) fn skip_attributes<R: Reader>(
    input: &mut R,
    encoding: Encoding,
    specs: &[AttributeSpecification],
) -> Result<()> {
    let mut skip_bytes = 0;
    for spec in specs {
        let mut form = spec.form();
        loop {
            if let Some(len) = get_attribute_size(form, encoding) {
                // We know the length of this attribute. Accumulate that length.
                skip_bytes += usize::from(len);
                break;
            }

            // We have encountered a variable-length attribute.
            if skip_bytes != 0 {
                // Skip the accumulated skip bytes and then read the attribute normally.
                input.skip(skip_bytes)?;
                skip_bytes = 0;
            }

            match form {
                constants::DW_FORM_indirect => {
                    form = constants::DwForm(input.read_uleb128_u16()?);
                    continue;
                }
                constants::DW_FORM_block1 => {
                    skip_bytes = usize::from(input.read_u8()?);
                }
                constants::DW_FORM_block2 => {
                    skip_bytes = usize::from(input.read_u16()?);
                }
                constants::DW_FORM_block4 => {
                    skip_bytes = input.read_u32()? as usize;
                }
                constants::DW_FORM_block | constants::DW_FORM_exprloc => {
                    skip_bytes = input.read_uleb128().and_then(u64_to_offset)?;
                }
                constants::DW_FORM_string => {
                    let _ = input.read_null_terminated_slice()?;
                }
                constants::DW_FORM_udata
                | constants::DW_FORM_sdata
                | constants::DW_FORM_ref_udata
                | constants::DW_FORM_strx
                | constants::DW_FORM_GNU_str_index
                | constants::DW_FORM_addrx
                | constants::DW_FORM_GNU_addr_index
                | constants::DW_FORM_loclistx
                | constants::DW_FORM_rnglistx => {
                    input.skip_leb128()?;
                }
                _ => {
                    return Err(Error::UnknownForm(form));
                }
            };
            break;
        }
    }
    if skip_bytes != 0 {
        input.skip(skip_bytes)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;
    use crate::endianity::{BigEndian, LittleEndian};
    use crate::test_util::GimliSectionMethods;
    use test_assembler::{Endian, Label, LabelMaker, Section};

    // Mixin methods for `Section` to help define binary test data.

    trait UnitSectionMethods {
        fn unit<'input, E>(self, unit: &mut UnitHeader<EndianSlice<'input, E>>) -> Self
        where
            E: Endianity;
        fn die(self, code: u64, die: fn(Self) -> Self) -> Self;
        fn die_null(self) -> Self;
        fn attr_string(self, s: &str) -> Self;
        fn attr_ref1(self, o: u8) -> Self;
    }

    impl UnitSectionMethods for Section {
        fn unit<'input, E>(self, unit: &mut UnitHeader<EndianSlice<'input, E>>) -> Self
        where
            E: Endianity,
        {
            let size = self.size();
            let length = Label::new();
            let start = Label::new();
            let end = Label::new();

            let section = match unit.format() {
                Format::Dwarf32 => self.L32(&length),
                Format::Dwarf64 => self.L32(0xffff_ffff).L64(&length),
            };

            let section = match unit.version() {
                2..=4 => section
                    .mark(&start)
                    .L16(unit.version())
                    .L32(unit.debug_abbrev_offset.0 as u32)
                    .D8(unit.address_size()),
                5 => section
                    .mark(&start)
                    .L16(unit.version())
                    .D8(unit.type_().dw_ut().0)
                    .D8(unit.address_size())
                    .L32(unit.debug_abbrev_offset.0 as u32),
                _ => unreachable!(),
            };

            let section = match unit.type_() {
                UnitType::Compilation | UnitType::Partial => section,
                UnitType::Type {
                    type_signature,
                    type_offset,
                }
                | UnitType::SplitType {
                    type_signature,
                    type_offset,
                } => section.L64(type_signature.0).L32(type_offset.0 as u32),
                UnitType::Skeleton(dwo_id) | UnitType::SplitCompilation(dwo_id) => {
                    section.L64(dwo_id.0)
                }
            };

            let section = section.append_bytes(unit.entries_buf.slice()).mark(&end);

            unit.unit_length = (&end - &start) as usize;
            length.set_const(unit.unit_length as u64);

            unit.unit_offset = UnitSectionOffset::DebugInfoOffset(DebugInfoOffset(size as usize));

            section
        }

        fn die(self, code: u64, die: fn(Self) -> Self) -> Self {
            let section = self.uleb(code);
            die(section)
        }

        fn die_null(self) -> Self {
            self.D8(0)
        }

        fn attr_string(self, attr: &str) -> Self {
            self.append_bytes(attr.as_bytes()).D8(0)
        }

        fn attr_ref1(self, attr: u8) -> Self {
            self.D8(attr)
        }
    }

    #[test]
    fn test_parse_debug_abbrev_offset_32() {
        let section = Section::with_endian(Endian::Little).L32(0x0403_0201);
        let buf = section.get_contents().unwrap();
        let buf = &mut EndianSlice::new(&buf, LittleEndian);

        match parse_debug_abbrev_offset(buf, Format::Dwarf32) {
            Ok(val) => assert_eq!(val, DebugAbbrevOffset(0x0403_0201)),
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_debug_abbrev_offset_32_incomplete() {
        let buf = [0x01, 0x02];
        let buf = &mut EndianSlice::new(&buf, LittleEndian);

        match parse_debug_abbrev_offset(buf, Format::Dwarf32) {
            Err(Error::UnexpectedEof) => {}
            otherwise => panic!("Unexpected result: {:?}", otherwise),
        };
    }

    #[test]
    fn test_parse_debug_info_unit_header_32_ok() {
        let expected_rest = &[1, 2, 3, 4, 5, 6, 7, 8, 9];
        let encoding = Encoding {
            format: Format::Dwarf32,
            version: 4,
            address_size: 8,
        };
        let mut expected_unit = UnitHeader {
            encoding,
            unit_length: 0,
            initial_length_size: 4,
            unit_type: UnitType::Compilation,
            debug_abbrev_offset: DebugAbbrevOffset(0x0807_0605),
            unit_offset: DebugInfoOffset(0).into(),
            entries_buf: EndianSlice::new(expected_rest, LittleEndian),
        };
        let section = Section::with_endian(Endian::Little)
            .unit(&mut expected_unit)
            .append_bytes(expected_rest);
        let buf = section.get_contents().unwrap();
        let rest = &mut EndianSlice::new(&buf, LittleEndian);

        assert_eq!(
            parse_unit_header(rest, DebugInfoOffset(0).into()),
            Ok(expected_unit)
        );
        assert_eq!(*rest, EndianSlice::new(expected_rest, LittleEndian));
        assert_eq!(expected_unit.header_size(), 11);
    }

    #[test]
    fn test_parse_debug_info_unit_header_64_ok() {
        let expected_rest = &[1, 2, 3, 4, 5, 6, 7, 8, 9];
        let encoding = Encoding {
            format: Format::Dwarf64,
            version: 4,
            address_size: 8,
        };
        let mut expected_unit = UnitHeader {
            encoding,
            unit_length: 0,
            initial_length_size: 12,
            unit_type: UnitType::Compilation,
            debug_abbrev_offset: DebugAbbrevOffset(0x0807_0605),
            unit_offset: DebugInfoOffset(0).into(),
            entries_buf: EndianSlice::new(expected_rest, LittleEndian),
        };
        let section = Section::with_endian(Endian::Little)
            .L32(0xffff_ffff)
            .L64(2 + 8 + 1 + expected_rest.len() as u64)
            .L16(4)
            .L64(0x0807_0605)
            .D8(8)
            .append_bytes(expected_rest);
        expected_unit.unit_length = 2 + 8 + 1 + expected_rest.len();
        let buf = section.get_contents().unwrap();
        let rest = &mut EndianSlice::new(&buf, LittleEndian);

        assert_eq!(
            parse_unit_header(rest, DebugInfoOffset(0).into()),
            Ok(expected_unit)
        );
        assert_eq!(expected_unit.header_size(), 23);
    }

    #[test]
    fn test_parse_v5_skeleton_unit_header() {
        let expected_rest = &[1, 2, 3, 4, 5, 6, 7, 8, 9];
        let encoding = Encoding {
            format: Format::Dwarf32,
            version: 5,
            address_size: 8,
        };
        let mut expected_unit = UnitHeader {
            encoding,
            unit_length: 0,
            initial_length_size: 4,
            unit_type: UnitType::Skeleton(DwoId(0x0706_5040_0302_1000)),
            debug_abbrev_offset: DebugAbbrevOffset(0x0102_0304),
            unit_offset: DebugInfoOffset(0).into(),
            entries_buf: EndianSlice::new(expected_rest, LittleEndian),
        };
        let section = Section::with_endian(Endian::Little)
            .unit(&mut expected_unit)
            .append_bytes(expected_rest);
        let buf = section.get_contents().unwrap();
        let rest = &mut EndianSlice::new(&buf, LittleEndian);

        let header = parse_unit_header(rest, DebugInfoOffset(0).into()).unwrap();
        assert_eq!(header, expected_unit);
        assert_eq!(header.dwo_id(), Some(DwoId(0x0706_5040_0302_1000)));
    }

    #[test]
    fn test_parse_type_unit_header_64_ok() {
        let expected_rest = &[1, 2, 3, 4, 5, 6, 7, 8, 9];
        let section = Section::with_endian(Endian::Big)
            .D32(0xffff_ffff)
            .D64(2 + 8 + 1 + 8 + 8 + expected_rest.len() as u64)
            .D16(4)
            .D64(0x0807_0605)
            .D8(8)
            .D64(0xdead_beef_dead_beef)
            .D64(2 + 8 + 1 + 8 + 8 + 12)
            .append_bytes(expected_rest);
        let buf = section.get_contents().unwrap();
        let rest = &mut EndianSlice::new(&buf, BigEndian);

        let header = parse_unit_header(rest, DebugTypesOffset(0).into()).unwrap();
        assert_eq!(header.format(), Format::Dwarf64);
        assert_eq!(
            header.type_signature(),
            Some(DebugTypeSignature(0xdead_beef_dead_beef))
        );
        assert_eq!(header.type_offset(), Some(UnitOffset(39)));
        assert_eq!(header.section_id(), SectionId::DebugTypes);
    }

    #[test]
    fn test_parse_type_offset_out_of_bounds() {
        let section = Section::with_endian(Endian::Little)
            .L32(2 + 4 + 1 + 8 + 4 + 1)
            .L16(4)
            .L32(0)
            .D8(8)
            .L64(0x1234)
            .L32(0x100)
            .D8(0);
        let buf = section.get_contents().unwrap();
        let rest = &mut EndianSlice::new(&buf, LittleEndian);
        assert_eq!(
            parse_unit_header(rest, DebugTypesOffset(0).into()),
            Err(Error::TypeOffsetOutOfBounds {
                section: SectionId::DebugTypes,
                unit_offset: 0,
                type_offset: 0x100,
            })
        );
    }

    #[test]
    fn test_parse_unit_header_unknown_version() {
        let buf = Section::with_endian(Endian::Little)
            .L32(7)
            .L16(6)
            .L32(0)
            .D8(8)
            .get_contents()
            .unwrap();
        let rest = &mut EndianSlice::new(&buf, LittleEndian);
        assert_eq!(
            parse_unit_header(rest, DebugInfoOffset(0).into()),
            Err(Error::UnknownVersion(6))
        );
    }

    #[test]
    fn test_parse_unit_header_length_out_of_bounds() {
        let buf = Section::with_endian(Endian::Little)
            .L32(0x100)
            .L16(4)
            .L32(0)
            .D8(8)
            .get_contents()
            .unwrap();
        let rest = &mut EndianSlice::new(&buf, LittleEndian);
        assert_eq!(
            parse_unit_header(rest, DebugInfoOffset(0).into()),
            Err(Error::UnitLengthOutOfBounds {
                section: SectionId::DebugInfo,
                unit_offset: 0,
                length: 0x100,
            })
        );
    }

    #[test]
    fn test_bad_abbrev_offset() {
        let buf = Section::with_endian(Endian::Little)
            .L32(8)
            .L16(4)
            .L32(0x40)
            .D8(8)
            .D8(0)
            .get_contents()
            .unwrap();
        let header = DebugInfo::new(&buf, LittleEndian)
            .header_from_offset(DebugInfoOffset(0))
            .unwrap();
        let abbrev_buf = [0u8; 4];
        let debug_abbrev = DebugAbbrev::new(&abbrev_buf, LittleEndian);
        assert_eq!(
            header.abbreviations(&debug_abbrev).unwrap_err(),
            Error::BadAbbrevOffset {
                section: SectionId::DebugInfo,
                unit_offset: 0,
                abbrev_offset: 0x40,
            }
        );
        assert!(header.is_dummy());
    }

    #[test]
    fn test_units_iter() {
        let mut unit1 = UnitHeader {
            encoding: Encoding {
                format: Format::Dwarf32,
                version: 4,
                address_size: 8,
            },
            unit_length: 0,
            initial_length_size: 4,
            unit_type: UnitType::Compilation,
            debug_abbrev_offset: DebugAbbrevOffset(0),
            unit_offset: DebugInfoOffset(0).into(),
            entries_buf: EndianSlice::new(&[1, 0], LittleEndian),
        };
        let mut unit2 = UnitHeader {
            encoding: Encoding {
                format: Format::Dwarf32,
                version: 2,
                address_size: 4,
            },
            unit_length: 0,
            initial_length_size: 4,
            unit_type: UnitType::Compilation,
            debug_abbrev_offset: DebugAbbrevOffset(0),
            unit_offset: DebugInfoOffset(0).into(),
            entries_buf: EndianSlice::new(&[2, 0], LittleEndian),
        };
        let section = Section::with_endian(Endian::Little)
            .unit(&mut unit1)
            .unit(&mut unit2);
        let buf = section.get_contents().unwrap();
        let debug_info = DebugInfo::new(&buf, LittleEndian);
        let mut units = debug_info.units();
        assert_eq!(units.next(), Ok(Some(unit1)));
        let second = units.next().unwrap().unwrap();
        assert_eq!(second.offset(), DebugInfoOffset(13).into());
        assert_eq!(second.version(), 2);
        assert_eq!(units.next(), Ok(None));
    }

    fn encoding4() -> Encoding {
        Encoding {
            format: Format::Dwarf32,
            version: 4,
            address_size: 4,
        }
    }

    fn parse_one(
        buf: &[u8],
        encoding: Encoding,
        form: constants::DwForm,
    ) -> Result<AttributeValue<EndianSlice<'_, LittleEndian>>> {
        let spec = AttributeSpecification::new(constants::DW_AT_name, form, None);
        let input = &mut EndianSlice::new(buf, LittleEndian);
        let attr = parse_attribute(input, encoding, spec)?;
        Ok(*attr.value())
    }

    #[test]
    fn test_parse_attribute_forms() {
        let encoding = encoding4();
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_addr),
            Ok(AttributeValue::Addr(0x0403_0201))
        );
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_data2),
            Ok(AttributeValue::Data2(0x0201))
        );
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_ref4),
            Ok(AttributeValue::UnitRef(UnitOffset(0x0403_0201)))
        );
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_ref_sig8),
            Ok(AttributeValue::DebugTypesRef(DebugTypeSignature(
                0x0807_0605_0403_0201
            )))
        );
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_strx3),
            Ok(AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(
                0x03_0201
            )))
        );
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_flag_present),
            Ok(AttributeValue::Flag(true))
        );
        let block = [0x02, 0xaa, 0xbb, 0xcc];
        assert_eq!(
            parse_one(&block, encoding, constants::DW_FORM_block1),
            Ok(AttributeValue::Block(EndianSlice::new(&block[1..3], LittleEndian)))
        );
        let string = b"main\0rest";
        assert_eq!(
            parse_one(string, encoding, constants::DW_FORM_string),
            Ok(AttributeValue::String(EndianSlice::new(b"main", LittleEndian)))
        );
    }

    #[test]
    fn test_parse_attribute_ref_addr_v2() {
        let buf = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let encoding = Encoding {
            format: Format::Dwarf32,
            version: 2,
            address_size: 8,
        };
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_ref_addr),
            Ok(AttributeValue::DebugInfoRef(DebugInfoOffset(
                0x0807_0605_0403_0201
            )))
        );
        let encoding = Encoding {
            version: 3,
            ..encoding
        };
        assert_eq!(
            parse_one(&buf, encoding, constants::DW_FORM_ref_addr),
            Ok(AttributeValue::DebugInfoRef(DebugInfoOffset(0x0403_0201)))
        );
    }

    #[test]
    fn test_parse_attribute_indirect() {
        let buf = Section::with_endian(Endian::Little)
            .uleb(constants::DW_FORM_udata.0.into())
            .uleb(1234)
            .get_contents()
            .unwrap();
        let spec =
            AttributeSpecification::new(constants::DW_AT_byte_size, constants::DW_FORM_indirect, None);
        let input = &mut EndianSlice::new(&buf, LittleEndian);
        let attr = parse_attribute(input, encoding4(), spec).unwrap();
        assert_eq!(attr.form(), constants::DW_FORM_udata);
        assert_eq!(attr.udata_value(), Some(1234));
        assert!(input.is_empty());
    }

    #[test]
    fn test_parse_attribute_implicit_const() {
        let spec = AttributeSpecification::new(
            constants::DW_AT_decl_file,
            constants::DW_FORM_implicit_const,
            Some(-3),
        );
        let input = &mut EndianSlice::new(&[], LittleEndian);
        let attr = parse_attribute(input, encoding4(), spec).unwrap();
        assert_eq!(attr.sdata_value(), Some(-3));
    }

    #[test]
    fn test_parse_attribute_unknown_form() {
        assert_eq!(
            parse_one(&[0; 8], encoding4(), constants::DwForm(0x99)),
            Err(Error::UnknownForm(constants::DwForm(0x99)))
        );
    }

    #[test]
    fn test_attribute_into_alt() {
        let attr: Attribute<EndianSlice<'_, LittleEndian>> = Attribute::new(
            constants::DW_AT_type,
            constants::DW_FORM_ref_addr,
            AttributeValue::DebugInfoRef(DebugInfoOffset(0x40)),
        );
        let alt = attr.into_alt();
        assert_eq!(alt.form(), constants::DW_FORM_GNU_ref_alt);
        assert_eq!(
            *alt.value(),
            AttributeValue::DebugInfoRefSup(DebugInfoOffset(0x40))
        );
    }

    #[test]
    fn test_skip_attributes() {
        let specs = [
            AttributeSpecification::new(constants::DW_AT_name, constants::DW_FORM_string, None),
            AttributeSpecification::new(constants::DW_AT_low_pc, constants::DW_FORM_addr, None),
            AttributeSpecification::new(constants::DW_AT_location, constants::DW_FORM_exprloc, None),
            AttributeSpecification::new(constants::DW_AT_byte_size, constants::DW_FORM_udata, None),
            AttributeSpecification::new(constants::DW_AT_sibling, constants::DW_FORM_ref4, None),
        ];
        let buf = Section::with_endian(Endian::Little)
            .attr_string("foo")
            .L32(0x1000)
            .uleb(3)
            .D8(1)
            .D8(2)
            .D8(3)
            .uleb(300)
            .L32(0x40)
            .attr_ref1(0x99)
            .get_contents()
            .unwrap();
        let input = &mut EndianSlice::new(&buf, LittleEndian);
        skip_attributes(input, encoding4(), &specs).unwrap();
        assert_eq!(input.slice(), &[0x99]);
    }

    #[test]
    fn test_unit_offset_conversion() {
        let buf = Section::with_endian(Endian::Little)
            .D8(0xee)
            .L32(9)
            .L16(4)
            .L32(0)
            .D8(8)
            .die(1, |s| s.die_null())
            .get_contents()
            .unwrap();
        let debug_info = DebugInfo::new(&buf, LittleEndian);
        let header = debug_info.header_from_offset(DebugInfoOffset(1)).unwrap();
        assert_eq!(header.header_size(), 11);
        assert_eq!(
            DebugInfoOffset(12).to_unit_offset(&header),
            Some(UnitOffset(11))
        );
        assert_eq!(DebugInfoOffset(5).to_unit_offset(&header), None);
        assert_eq!(DebugInfoOffset(14).to_unit_offset(&header), None);
        assert_eq!(
            UnitOffset(12).to_unit_section_offset(&header),
            DebugInfoOffset(13).into()
        );
        assert!(!header.is_dummy());
    }
}
