use std::sync::Arc;

use crate::common::{
    DebugAddrBase, DebugStrOffsetsBase, Encoding, Format, SectionId,
};
use crate::constants;
use crate::read::{
    Abbreviations, Attribute, AttributeValue, DebugAbbrev, DebugAddr, DebugAranges, DebugCuIndex,
    DebugInfo, DebugInfoUnitHeadersIter, DebugLine, DebugLineStr, DebugStr, DebugStrOffsets,
    DebugTuIndex, DebugTypes, DebugTypesUnitHeadersIter, Error, Reader, Result, Section,
    UnitHeader,
};

/// The kind of object file a [`Dwarf`] was loaded from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum DwarfFileType {
    /// A normal executable or object file.
    #[default]
    Main,
    /// A split DWARF `.dwo` file, or one unit's contribution to a `.dwp`.
    Dwo,
}

/// All of the commonly used DWARF sections of one object file.
#[derive(Debug, Default, Clone)]
pub struct Dwarf<R> {
    /// The `.debug_abbrev` section.
    pub debug_abbrev: DebugAbbrev<R>,

    /// The `.debug_addr` section.
    pub debug_addr: DebugAddr<R>,

    /// The `.debug_aranges` section.
    pub debug_aranges: DebugAranges<R>,

    /// The `.debug_info` section.
    pub debug_info: DebugInfo<R>,

    /// The `.debug_line` section.
    pub debug_line: DebugLine<R>,

    /// The `.debug_line_str` section.
    pub debug_line_str: DebugLineStr<R>,

    /// The `.debug_str` section.
    pub debug_str: DebugStr<R>,

    /// The `.debug_str_offsets` section.
    pub debug_str_offsets: DebugStrOffsets<R>,

    /// The `.debug_types` section.
    pub debug_types: DebugTypes<R>,

    /// The `.debug_cu_index` section of a DWARF package.
    pub debug_cu_index: DebugCuIndex<R>,

    /// The `.debug_tu_index` section of a DWARF package.
    pub debug_tu_index: DebugTuIndex<R>,

    /// The `.gdb_index` section.
    pub gdb_index: Option<R>,

    /// Whether this is a split file.
    pub file_type: DwarfFileType,

    /// The alternate (`.dwz`) or supplementary object file.
    pub sup: Option<Arc<Dwarf<R>>>,
}

impl<R: Reader> Dwarf<R> {
    /// Try to load the DWARF sections using the given loader function.
    ///
    /// `section` loads a DWARF section from the object file.
    /// It should return an empty section if the section does not exist.
    pub fn load<F, E>(mut section: F) -> core::result::Result<Self, E>
    where
        F: FnMut(SectionId) -> core::result::Result<R, E>,
    {
        let gdb_index = section(SectionId::GdbIndex)?;
        Ok(Dwarf {
            debug_abbrev: Section::load(&mut section)?,
            debug_addr: Section::load(&mut section)?,
            debug_aranges: Section::load(&mut section)?,
            debug_info: Section::load(&mut section)?,
            debug_line: Section::load(&mut section)?,
            debug_line_str: Section::load(&mut section)?,
            debug_str: Section::load(&mut section)?,
            debug_str_offsets: Section::load(&mut section)?,
            debug_types: Section::load(&mut section)?,
            debug_cu_index: Section::load(&mut section)?,
            debug_tu_index: Section::load(&mut section)?,
            gdb_index: if gdb_index.is_empty() {
                None
            } else {
                Some(gdb_index)
            },
            file_type: DwarfFileType::Main,
            sup: None,
        })
    }

    /// Load the sections of a split DWARF file.
    ///
    /// Sections are requested with their normal ids; the loader is expected
    /// to map them to their `.dwo` names.
    pub fn load_dwo<F, E>(section: F) -> core::result::Result<Self, E>
    where
        F: FnMut(SectionId) -> core::result::Result<R, E>,
    {
        let mut dwarf = Self::load(section)?;
        dwarf.file_type = DwarfFileType::Dwo;
        Ok(dwarf)
    }

    /// Set the alternate object file that `DW_FORM_GNU_ref_alt` and
    /// `DW_FORM_GNU_strp_alt` refer into.
    pub fn set_sup(&mut self, sup: Dwarf<R>) {
        self.sup = Some(Arc::new(sup));
    }

    /// The alternate object file, if any.
    pub fn sup(&self) -> Option<&Dwarf<R>> {
        self.sup.as_deref()
    }

    /// Iterate the compilation- and partial-units in this
    /// `.debug_info` section.
    ///
    /// Can be [used with
    /// `FallibleIterator`](./index.html#using-with-fallibleiterator).
    #[inline]
    pub fn units(&self) -> DebugInfoUnitHeadersIter<R> {
        self.debug_info.units()
    }

    /// Iterate the type-units in this `.debug_types` section.
    ///
    /// Can be [used with
    /// `FallibleIterator`](./index.html#using-with-fallibleiterator).
    #[inline]
    pub fn type_units(&self) -> DebugTypesUnitHeadersIter<R> {
        self.debug_types.units()
    }

    /// Parse the abbreviations for a unit.
    ///
    /// This does not cache; the unit manager keeps an
    /// [`AbbreviationsCache`](crate::AbbreviationsCache) per file.
    #[inline]
    pub fn abbreviations(&self, unit: &UnitHeader<R>) -> Result<Abbreviations> {
        unit.abbreviations(&self.debug_abbrev)
    }

    /// Return an attribute value as a string slice.
    ///
    /// Handles inline strings, the string sections of this file and of the
    /// alternate file, and indexes into `.debug_str_offsets`.
    pub fn attr_string(&self, bases: &UnitBases, attr: &Attribute<R>) -> Result<R> {
        match *attr.value() {
            AttributeValue::String(ref string) => Ok(string.clone()),
            AttributeValue::DebugStrRef(offset) => self.debug_str.get_str(offset),
            AttributeValue::DebugStrRefSup(offset) => match self.sup() {
                Some(sup) => sup.debug_str.get_str(offset),
                None => Err(Error::MissingAltFile(attr.form())),
            },
            AttributeValue::DebugLineStrRef(offset) => self.debug_line_str.get_str(offset),
            AttributeValue::DebugStrOffsetsIndex(index) => {
                let base = self.str_offsets_base(bases).ok_or(Error::SplitFormWithoutContext {
                    form: attr.form(),
                    section: SectionId::DebugStrOffsets,
                })?;
                let offset =
                    self.debug_str_offsets
                        .get_str_offset(bases.encoding.format, base, index)?;
                self.debug_str.get_str(offset)
            }
            _ => Err(Error::ExpectedStringAttributeValue),
        }
    }

    /// Return an attribute value as an address.
    ///
    /// Indexed addresses are looked up in the `.debug_addr` section of the
    /// file holding the skeleton unit, so `addr` may differ from `self`.
    pub fn attr_address(
        &self,
        addr: &DebugAddr<R>,
        bases: &UnitBases,
        attr: &Attribute<R>,
    ) -> Result<Option<u64>> {
        match *attr.value() {
            AttributeValue::Addr(address) => Ok(Some(address)),
            AttributeValue::DebugAddrIndex(index) => {
                let base = bases.addr_base.ok_or(Error::SplitFormWithoutContext {
                    form: attr.form(),
                    section: SectionId::DebugAddr,
                })?;
                addr.get_address(bases.encoding.address_size, base, index)
                    .map(Some)
            }
            _ => Ok(None),
        }
    }

    fn str_offsets_base(&self, bases: &UnitBases) -> Option<DebugStrOffsetsBase> {
        if bases.str_offsets_base.is_some() {
            return bases.str_offsets_base;
        }
        if self.file_type != DwarfFileType::Dwo {
            return None;
        }
        // Split units have no DW_AT_str_offsets_base. DWARF 5 tables start
        // after a header, GNU DWARF 4 tables have none.
        Some(DebugStrOffsetsBase(if bases.encoding.version >= 5 {
            match bases.encoding.format {
                Format::Dwarf32 => 8,
                Format::Dwarf64 => 16,
            }
        } else {
            0
        }))
    }

    /// Whether this file is a DWARF package.
    pub fn is_package(&self) -> bool {
        !self.debug_cu_index.is_empty() || !self.debug_tu_index.is_empty()
    }
}

/// The table bases that indexed forms of one unit are relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitBases {
    /// The unit's encoding.
    pub encoding: Encoding,
    /// `DW_AT_str_offsets_base`.
    pub str_offsets_base: Option<DebugStrOffsetsBase>,
    /// `DW_AT_addr_base` or `DW_AT_GNU_addr_base`, usually from a skeleton.
    pub addr_base: Option<DebugAddrBase>,
    /// `DW_AT_GNU_ranges_base` or `DW_AT_rnglists_base`.
    pub ranges_base: Option<usize>,
}

impl UnitBases {
    /// Bases for a unit without any base attributes.
    pub fn new(encoding: Encoding) -> Self {
        UnitBases {
            encoding,
            str_offsets_base: None,
            addr_base: None,
            ranges_base: None,
        }
    }

    /// Update the bases from one attribute of a unit die.
    ///
    /// Returns true if the attribute was a base attribute.
    pub fn apply<R: Reader>(&mut self, attr: &Attribute<R>) -> bool {
        let offset = match attr.offset_value() {
            Some(offset) => offset,
            None => return false,
        };
        match attr.name() {
            constants::DW_AT_str_offsets_base => {
                self.str_offsets_base = Some(DebugStrOffsetsBase(offset));
            }
            constants::DW_AT_addr_base | constants::DW_AT_GNU_addr_base => {
                self.addr_base = Some(DebugAddrBase(offset));
            }
            constants::DW_AT_rnglists_base | constants::DW_AT_GNU_ranges_base => {
                self.ranges_base = Some(offset);
            }
            _ => return false,
        }
        true
    }

    /// Collect the bases from the attributes of a unit die.
    pub fn from_attrs<R: Reader>(encoding: Encoding, attrs: &[Attribute<R>]) -> Self {
        let mut bases = UnitBases::new(encoding);
        for attr in attrs {
            bases.apply(attr);
        }
        bases
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{DebugAddrIndex, DebugStrOffset, DebugStrOffsetsIndex};
    use crate::read::EndianSlice;
    use crate::LittleEndian;

    type Slice<'a> = EndianSlice<'a, LittleEndian>;

    fn encoding(version: u16) -> Encoding {
        Encoding {
            format: Format::Dwarf32,
            version,
            address_size: 4,
        }
    }

    /// Ensure that `Dwarf<R>` is covariant wrt R.
    #[test]
    fn test_dwarf_variance() {
        /// This only needs to compile.
        #[allow(dead_code)]
        fn f<'a: 'b, 'b, E: crate::Endianity>(
            x: Dwarf<EndianSlice<'a, E>>,
        ) -> Dwarf<EndianSlice<'b, E>> {
            x
        }
    }

    #[test]
    fn test_attr_string_forms() {
        let strs = b"\0main\0a.c\0";
        let mut dwarf: Dwarf<Slice<'_>> = Dwarf::default();
        dwarf.debug_str = DebugStr::new(strs, LittleEndian);
        let bases = UnitBases::new(encoding(4));

        let attr = Attribute::new(
            constants::DW_AT_name,
            constants::DW_FORM_strp,
            AttributeValue::DebugStrRef(DebugStrOffset(1)),
        );
        assert_eq!(dwarf.attr_string(&bases, &attr).unwrap().slice(), b"main");

        let attr = Attribute::new(
            constants::DW_AT_name,
            constants::DW_FORM_GNU_strp_alt,
            AttributeValue::DebugStrRefSup(DebugStrOffset(1)),
        );
        assert_eq!(
            dwarf.attr_string(&bases, &attr),
            Err(Error::MissingAltFile(constants::DW_FORM_GNU_strp_alt))
        );

        let mut sup: Dwarf<Slice<'_>> = Dwarf::default();
        sup.debug_str = DebugStr::new(b"xx\0alt\0", LittleEndian);
        dwarf.set_sup(sup);
        let attr = Attribute::new(
            constants::DW_AT_name,
            constants::DW_FORM_GNU_strp_alt,
            AttributeValue::DebugStrRefSup(DebugStrOffset(3)),
        );
        assert_eq!(dwarf.attr_string(&bases, &attr).unwrap().slice(), b"alt");
    }

    #[test]
    fn test_strx_needs_split_context() {
        let dwarf: Dwarf<Slice<'_>> = Dwarf::default();
        let attr = Attribute::new(
            constants::DW_AT_name,
            constants::DW_FORM_strx1,
            AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(0)),
        );
        assert_eq!(
            dwarf.attr_string(&UnitBases::new(encoding(5)), &attr),
            Err(Error::SplitFormWithoutContext {
                form: constants::DW_FORM_strx1,
                section: SectionId::DebugStrOffsets,
            })
        );

        let attr = Attribute::new(
            constants::DW_AT_low_pc,
            constants::DW_FORM_addrx,
            AttributeValue::DebugAddrIndex(DebugAddrIndex(0)),
        );
        assert_eq!(
            dwarf.attr_address(&dwarf.debug_addr, &UnitBases::new(encoding(5)), &attr),
            Err(Error::SplitFormWithoutContext {
                form: constants::DW_FORM_addrx,
                section: SectionId::DebugAddr,
            })
        );
    }

    #[test]
    fn test_strx_in_dwo_uses_default_base() {
        // str_offsets header (8 bytes) then two offsets.
        let offsets = [
            0x0c, 0, 0, 0, 5, 0, 0, 0, //
            0, 0, 0, 0, 4, 0, 0, 0,
        ];
        let mut dwarf: Dwarf<Slice<'_>> = Dwarf::default();
        dwarf.file_type = DwarfFileType::Dwo;
        dwarf.debug_str = DebugStr::new(b"foo\0bar\0", LittleEndian);
        dwarf.debug_str_offsets = DebugStrOffsets::from(EndianSlice::new(&offsets, LittleEndian));
        let attr = Attribute::new(
            constants::DW_AT_name,
            constants::DW_FORM_strx,
            AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(1)),
        );
        assert_eq!(
            dwarf
                .attr_string(&UnitBases::new(encoding(5)), &attr)
                .unwrap()
                .slice(),
            b"bar"
        );
        // GNU split DWARF 4 has no header.
        let attr = Attribute::new(
            constants::DW_AT_name,
            constants::DW_FORM_GNU_str_index,
            AttributeValue::DebugStrOffsetsIndex(DebugStrOffsetsIndex(3)),
        );
        assert_eq!(
            dwarf
                .attr_string(&UnitBases::new(encoding(4)), &attr)
                .unwrap()
                .slice(),
            b"bar"
        );
    }

    #[test]
    fn test_unit_bases_from_attrs() {
        let attrs: Vec<Attribute<Slice<'_>>> = vec![
            Attribute::new(
                constants::DW_AT_name,
                constants::DW_FORM_string,
                AttributeValue::String(EndianSlice::new(b"a.c", LittleEndian)),
            ),
            Attribute::new(
                constants::DW_AT_GNU_addr_base,
                constants::DW_FORM_sec_offset,
                AttributeValue::SecOffset(8),
            ),
            Attribute::new(
                constants::DW_AT_str_offsets_base,
                constants::DW_FORM_sec_offset,
                AttributeValue::SecOffset(0x10),
            ),
        ];
        let bases = UnitBases::from_attrs(encoding(5), &attrs);
        assert_eq!(bases.addr_base, Some(DebugAddrBase(8)));
        assert_eq!(bases.str_offsets_base, Some(DebugStrOffsetsBase(0x10)));
        assert_eq!(bases.ranges_base, None);
    }
}
