//! Read DWARF debugging information.
//!
//! This module holds the section-level readers: byte-stream primitives,
//! abbreviation tables, unit headers and attribute values, line program
//! headers, address tables, DWARF package indexes and `.gdb_index`, plus the
//! full and partial die readers that the unit manager drives.
//!
//! ## Example Usage
//!
//! Decode the first unit of a `.debug_info` section into a die tree:
//!
//! ```rust,no_run
//! # fn example() -> Result<(), dwarf_dies::Error> {
//! # type R = dwarf_dies::EndianSlice<'static, dwarf_dies::LittleEndian>;
//! # let get_file_section_reader = |name| -> Result<R, dwarf_dies::Error> { unimplemented!() };
//! let loader = |section: dwarf_dies::SectionId| get_file_section_reader(section.name());
//! let dwarf = dwarf_dies::Dwarf::load(loader)?;
//!
//! let mut headers = dwarf.units();
//! while let Some(header) = headers.next()? {
//!     let abbrevs = dwarf.abbreviations(&header)?;
//!     println!("unit at {:?} uses {} abbreviations", header.offset(), abbrevs.len());
//! }
//! # unreachable!()
//! # }
//! ```
//!
//! ## API Structure
//!
//! * The [`Dwarf`](./struct.Dwarf.html) type contains the sections of one
//!   object file. The unit manager owns one for the primary file, one per
//!   DWO or DWP file, and one for the `.dwz` alternate file.
//!
//! * Offsets into a section are strongly typed: an offset into `.debug_info` is
//!   the [`DebugInfoOffset`](./struct.DebugInfoOffset.html) type. There are
//!   similar types for offsets relative to a unit rather than a section.

use core::result;
use std::io;

use crate::common::SectionId;
use crate::constants;

pub(crate) mod abbrev;
pub use self::abbrev::*;

mod addr;
pub use self::addr::*;

mod aranges;
pub use self::aranges::*;

pub(crate) mod die;
pub use self::die::*;

mod dwarf;
pub use self::dwarf::*;

mod endian_slice;
pub use self::endian_slice::*;

pub(crate) mod gdb_index;
pub use self::gdb_index::*;

pub(crate) mod index;
pub use self::index::*;

mod line;
pub use self::line::*;

mod partial;
pub use self::partial::*;

mod reader;
pub use self::reader::*;

mod str;
pub use self::str::*;

pub(crate) mod unit;
pub use self::unit::*;

/// An offset into the current compilation or type unit.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct UnitOffset<T = usize>(pub T);

/// An error that occurred when reading DWARF.
///
/// Most variants are fatal for the operation that produced them. The two
/// exceptions, `UnitUnavailable` and `ReferenceUnresolved`, describe
/// degraded results that callers are expected to paper over with a
/// placeholder; see [`Error::is_recoverable`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading.
    #[error("I/O error: {0}")]
    Io(String),
    /// An error parsing an unsigned LEB128 value.
    #[error("unsigned LEB128 overflow")]
    BadUnsignedLeb128,
    /// An error parsing a signed LEB128 value.
    #[error("signed LEB128 overflow")]
    BadSignedLeb128,
    /// An abbreviation declared that its tag is zero, but zero is reserved for
    /// null records.
    #[error("invalid abbreviation tag: zero")]
    AbbreviationTagZero,
    /// An attribute specification declared that its form is zero, but zero is
    /// reserved for null records.
    #[error("invalid attribute form: zero")]
    AttributeFormZero,
    /// The abbreviation's has-children byte was not one of
    /// `DW_CHILDREN_{yes,no}`.
    #[error("invalid abbreviation children: 0x{:x}", .0 .0)]
    InvalidAbbreviationChildren(constants::DwChildren),
    /// Found an unknown `DW_FORM_*` type.
    #[error("unknown attribute form: 0x{:x}", .0 .0)]
    UnknownForm(constants::DwForm),
    /// Found an unknown reserved length value.
    #[error("unknown reserved length: 0x{0:x}")]
    UnknownReservedLength(u32),
    /// Found an unknown DWARF version.
    #[error("unknown DWARF version: {0}")]
    UnknownVersion(u64),
    /// Found an entry with an invalid abbreviation code.
    #[error("invalid abbreviation code {code} at offset 0x{offset:x}")]
    InvalidAbbreviationCode {
        /// The abbreviation code that was read.
        code: u64,
        /// The section offset of the entry.
        offset: usize,
    },
    /// Hit the end of input before it was expected.
    #[error("unexpected end of input")]
    UnexpectedEof,
    /// The specified address size is not supported.
    #[error("unsupported address size: {0}")]
    UnsupportedAddressSize(u8),
    /// The specified offset size is not supported.
    #[error("unsupported offset size: {0}")]
    UnsupportedOffsetSize(u8),
    /// An offset value was larger than the maximum supported value.
    #[error("offset overflow")]
    UnsupportedOffset,
    /// Nonzero segment selector sizes aren't supported yet.
    #[error("unsupported segment size: {0}")]
    UnsupportedSegmentSize(u8),
    /// Found an invalid UTF-8 string.
    #[error("invalid UTF-8")]
    BadUtf8,
    /// The `DW_UT_*` value for this unit is not supported.
    #[error("unknown unit type: 0x{:x}", .0 .0)]
    UnknownUnitType(constants::DwUt),
    /// A unit header's abbreviation offset lies outside `.debug_abbrev`.
    #[error(
        "abbrev offset 0x{abbrev_offset:x} in {} unit at 0x{unit_offset:x} is outside the abbreviation section",
        .section.name()
    )]
    BadAbbrevOffset {
        /// The section holding the unit.
        section: SectionId,
        /// The offset of the unit within its section.
        unit_offset: usize,
        /// The offending abbreviation offset.
        abbrev_offset: usize,
    },
    /// A unit header's length runs past the end of its section.
    #[error(
        "unit at 0x{unit_offset:x} in {} has length 0x{length:x} which runs past the end of the section",
        .section.name()
    )]
    UnitLengthOutOfBounds {
        /// The section holding the unit.
        section: SectionId,
        /// The offset of the unit within its section.
        unit_offset: usize,
        /// The unit length read from the header.
        length: usize,
    },
    /// A type unit's type offset does not point inside the unit.
    #[error(
        "type offset 0x{type_offset:x} of unit at 0x{unit_offset:x} in {} is out of range",
        .section.name()
    )]
    TypeOffsetOutOfBounds {
        /// The section holding the unit.
        section: SectionId,
        /// The offset of the unit within its section.
        unit_offset: usize,
        /// The offending type offset.
        type_offset: usize,
    },
    /// An offset into a section was out of range.
    #[error("offset 0x{offset:x} is outside {}", .section.name())]
    OffsetOutOfBounds {
        /// The section being indexed.
        section: SectionId,
        /// The offending offset.
        offset: usize,
    },
    /// An attribute used a form that only makes sense in a split unit, or
    /// in a unit with the matching base attribute.
    #[error("{form} used in a unit without the {section} base it requires", section = .section.name())]
    SplitFormWithoutContext {
        /// The form that was used.
        form: constants::DwForm,
        /// The section the form indexes.
        section: SectionId,
    },
    /// A reference to the alternate debug file was found, but none is loaded.
    #[error("{0} used but no alternate debug file is available")]
    MissingAltFile(constants::DwForm),
    /// An attribute with an indirect form cannot use `DW_FORM_implicit_const`.
    #[error("invalid indirect attribute form: DW_FORM_implicit_const")]
    InvalidImplicitConst,
    /// The minimum instruction length must not be zero.
    #[error("invalid minimum line instruction length: zero")]
    MinimumInstructionLengthZero,
    /// The maximum operations per instruction must not be zero.
    #[error("invalid maximum operations per line instruction: zero")]
    MaximumOperationsPerInstructionZero,
    /// The line range must not be zero.
    #[error("invalid line range: zero")]
    LineRangeZero,
    /// The opcode base must not be zero.
    #[error("invalid line opcode base: zero")]
    OpcodeBaseZero,
    /// Missing DW_LNCT_path in file entry format.
    #[error("missing file entry format path")]
    MissingFileEntryFormatPath,
    /// An attribute value was expected to be a string form.
    #[error("invalid attribute form for string")]
    ExpectedStringAttributeValue,
    /// A DWARF package index has an unsupported version.
    #[error("unsupported DWP index version: {0}")]
    UnknownIndexVersion(u32),
    /// The CU and TU indexes of a DWARF package disagree on their version.
    #[error("DWP index versions disagree: CU index is version {cu}, TU index is version {tu}")]
    IndexVersionMismatch {
        /// The version of `.debug_cu_index`.
        cu: u32,
        /// The version of `.debug_tu_index`.
        tu: u32,
    },
    /// Invalid section count in a DWARF package index.
    #[error("unsupported DWP section count: {0}")]
    UnsupportedIndexSectionCount(u32),
    /// Invalid slot count in a DWARF package index.
    #[error("invalid DWP slot count: 0x{0:x}")]
    InvalidIndexSlotCount(u32),
    /// Invalid row index in a DWARF package index.
    #[error("invalid DWP row index: 0x{0:x}")]
    InvalidIndexRow(u32),
    /// Unknown section type in a DWARF package index.
    #[error("unknown DWP section type: 0x{0:x}")]
    UnknownIndexSection(u32),
    /// A version 1 package index names a section that is not in the file.
    #[error("DWP section number {0} does not exist")]
    MissingIndexSection(u32),
    /// A version 1 package index lists the same kind of section twice for one unit.
    #[error("DWP unit lists {} twice", .0.name())]
    DuplicateIndexSection(SectionId),
    /// A contribution in a DWARF package lies outside its containing section.
    #[error("DWP contribution 0x{offset:x}+0x{size:x} lies outside {}", .section.name())]
    InvalidIndexContribution {
        /// The section holding the contribution.
        section: SectionId,
        /// The offset of the contribution.
        offset: u64,
        /// The size of the contribution.
        size: u64,
    },
    /// A `.gdb_index` section is malformed.
    #[error("invalid .gdb_index: {0}")]
    InvalidGdbIndex(&'static str),
    /// The `.gnu_debugaltlink` section could not be parsed.
    #[error("invalid .gnu_debugaltlink section")]
    InvalidAltLink,
    /// The alternate debug file named by `.gnu_debugaltlink` could not be found.
    #[error("could not find alternate debug file {0}")]
    AltFileNotFound(String),
    /// The alternate debug file did not have the expected build-id.
    #[error("alternate debug file {0} has a mismatched build-id")]
    AltFileBuildIdMismatch(String),
    /// A descriptor handle did not name a known unit.
    #[error("no unit with handle {0}")]
    InvalidUnitId(usize),
    /// The debug info for a unit lives in a split file that is not available.
    #[error("unit at 0x{unit_offset:x} is unavailable: {reason}")]
    UnitUnavailable {
        /// The section offset of the unit's skeleton.
        unit_offset: usize,
        /// Why the unit could not be read.
        reason: String,
    },
    /// A reference could not be resolved to a die.
    #[error("unresolved reference from die at 0x{from:x}: {target}")]
    ReferenceUnresolved {
        /// The section offset of the die holding the reference.
        from: usize,
        /// A description of the reference target.
        target: String,
    },
}

impl Error {
    /// Whether this error describes a degraded result rather than a failure
    /// of the whole operation.
    ///
    /// Callers should substitute a placeholder and continue when this
    /// returns true.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::UnitUnavailable { .. } | Error::ReferenceUnresolved { .. }
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

/// The result of a parse.
pub type Result<T> = result::Result<T, Error>;

/// A convenience trait for loading DWARF sections from object files.  To be
/// used like:
///
/// ```
/// use dwarf_dies::{DebugInfo, EndianSlice, LittleEndian, Reader, Section};
///
/// let buf = [0x00, 0x01, 0x02, 0x03];
/// let reader = EndianSlice::new(&buf, LittleEndian);
/// let loader = |name| -> Result<_, ()> { Ok(reader) };
///
/// let debug_info: DebugInfo<_> = Section::load(loader).unwrap();
/// ```
pub trait Section<R>: From<R> {
    /// Returns the section id for this type.
    fn id() -> SectionId;

    /// Returns the ELF section name for this type.
    fn section_name() -> &'static str {
        Self::id().name()
    }

    /// Returns the ELF section name (if any) for this type when used in a dwo
    /// file.
    fn dwo_section_name() -> Option<&'static str> {
        Self::id().dwo_name()
    }

    /// Try to load the section using the given loader function.
    fn load<F, E>(f: F) -> core::result::Result<Self, E>
    where
        F: FnOnce(SectionId) -> core::result::Result<R, E>,
    {
        f(Self::id()).map(From::from)
    }

    /// Returns the `Reader` for this section.
    fn reader(&self) -> &R
    where
        R: Reader;

    /// Returns the subrange of the section that is the contribution of
    /// a unit in a `.dwp` file.
    fn dwp_range(&self, offset: u32, size: u32) -> Result<Self>
    where
        R: Reader,
    {
        let mut data = self.reader().clone();
        let invalid = || Error::InvalidIndexContribution {
            section: Self::id(),
            offset: u64::from(offset),
            size: u64::from(size),
        };
        data.skip(offset as usize).map_err(|_| invalid())?;
        data.truncate(size as usize).map_err(|_| invalid())?;
        Ok(data.into())
    }
}
