//! Functions for parsing DWARF debugging abbreviations.

use std::collections::hash_map::{self, HashMap};
use std::ops::Deref;
use std::sync::Arc;

use arrayvec::ArrayVec;

use crate::common::{DebugAbbrevOffset, Encoding, SectionId};
use crate::constants;
use crate::endianity::Endianity;
use crate::read::{EndianSlice, Error, Reader, Result, Section};

/// The `DebugAbbrev` struct represents the abbreviations describing
/// `DebuggingInformationEntry`s' attribute names and forms found in the
/// `.debug_abbrev` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugAbbrev<R> {
    debug_abbrev_section: R,
}

impl<'input, Endian> DebugAbbrev<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugAbbrev` instance from the data in the `.debug_abbrev`
    /// section.
    ///
    /// ```
    /// use dwarf_dies::{DebugAbbrev, LittleEndian};
    ///
    /// # let buf = [0x00, 0x01, 0x02, 0x03];
    /// # let read_debug_abbrev_section_somehow = || &buf;
    /// let debug_abbrev = DebugAbbrev::new(read_debug_abbrev_section_somehow(), LittleEndian);
    /// ```
    pub fn new(debug_abbrev_section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(debug_abbrev_section, endian))
    }
}

impl<R: Reader> DebugAbbrev<R> {
    /// Parse the abbreviations at the given `offset` within this
    /// `.debug_abbrev` section.
    ///
    /// The `offset` should generally be retrieved from a unit header.
    pub fn abbreviations(&self, debug_abbrev_offset: DebugAbbrevOffset) -> Result<Abbreviations> {
        let input = &mut self.debug_abbrev_section.clone();
        input
            .skip(debug_abbrev_offset.0)
            .map_err(|_| Error::OffsetOutOfBounds {
                section: SectionId::DebugAbbrev,
                offset: debug_abbrev_offset.0,
            })?;
        Abbreviations::parse(input)
    }
}

impl<R> Section<R> for DebugAbbrev<R> {
    fn id() -> SectionId {
        SectionId::DebugAbbrev
    }

    fn reader(&self) -> &R {
        &self.debug_abbrev_section
    }
}

impl<R> From<R> for DebugAbbrev<R> {
    fn from(debug_abbrev_section: R) -> Self {
        DebugAbbrev {
            debug_abbrev_section,
        }
    }
}

/// A cache of previously parsed abbreviation tables, keyed by their offset in
/// `.debug_abbrev`.
///
/// Type units frequently share one table, so each table is parsed at most
/// once and handed out as a shared, immutable `Arc`.
#[derive(Debug, Default)]
pub struct AbbreviationsCache {
    tables: HashMap<DebugAbbrevOffset, Arc<Abbreviations>>,
}

impl AbbreviationsCache {
    /// Create an empty abbreviations cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the abbreviation table at `offset`, parsing it on first use.
    pub fn get<R: Reader>(
        &mut self,
        debug_abbrev: &DebugAbbrev<R>,
        offset: DebugAbbrevOffset,
    ) -> Result<Arc<Abbreviations>> {
        match self.tables.entry(offset) {
            hash_map::Entry::Occupied(entry) => Ok(entry.get().clone()),
            hash_map::Entry::Vacant(entry) => {
                let abbrevs = Arc::new(debug_abbrev.abbreviations(offset)?);
                tracing::trace!(
                    offset = offset.0,
                    count = abbrevs.len(),
                    "parsed abbreviation table"
                );
                Ok(entry.insert(abbrevs).clone())
            }
        }
    }

    /// The number of tables parsed so far.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether no table has been parsed yet.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// A set of type abbreviations.
///
/// Construct an `Abbreviations` instance with the
/// [`abbreviations()`](struct.DebugAbbrev.html#method.abbreviations)
/// method.
#[derive(Debug, Default, Clone)]
pub struct Abbreviations {
    vec: Vec<Abbreviation>,
    map: HashMap<u64, Abbreviation>,
}

impl Abbreviations {
    /// Construct a new, empty set of abbreviations.
    fn empty() -> Abbreviations {
        Abbreviations {
            vec: Vec::new(),
            map: HashMap::new(),
        }
    }

    /// Insert an abbreviation into the set.
    ///
    /// Returns `Ok` if it is the first abbreviation in the set with its code,
    /// `Err` if the code is a duplicate and there already exists an
    /// abbreviation in the set with the given abbreviation's code.
    fn insert(&mut self, abbrev: Abbreviation) -> ::core::result::Result<(), ()> {
        let code_usize = abbrev.code as usize;
        if code_usize as u64 == abbrev.code {
            // Optimize for sequential abbreviation codes by storing them
            // in a Vec, as long as the map doesn't already contain them.
            // A potential further optimization would be to allow some
            // holes in the Vec, but there's no need for that yet.
            if code_usize - 1 < self.vec.len() {
                return Err(());
            } else if code_usize - 1 == self.vec.len() {
                if !self.map.is_empty() && self.map.contains_key(&abbrev.code) {
                    return Err(());
                } else {
                    self.vec.push(abbrev);
                    return Ok(());
                }
            }
        }
        match self.map.entry(abbrev.code) {
            hash_map::Entry::Occupied(_) => Err(()),
            hash_map::Entry::Vacant(entry) => {
                entry.insert(abbrev);
                Ok(())
            }
        }
    }

    /// Get the abbreviation associated with the given code.
    #[inline]
    pub fn get(&self, code: u64) -> Option<&Abbreviation> {
        if let Ok(code) = usize::try_from(code) {
            let index = code.checked_sub(1)?;
            if index < self.vec.len() {
                return Some(&self.vec[index]);
            }
        }

        self.map.get(&code)
    }

    /// The number of abbreviations in the table.
    pub fn len(&self) -> usize {
        self.vec.len() + self.map.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse a series of abbreviations.
    ///
    /// The table ends at a null abbreviation, at the end of the section, or
    /// at a code that was already seen, which means the parser has run into
    /// the table of some other unit.
    fn parse<R: Reader>(input: &mut R) -> Result<Abbreviations> {
        let mut abbrevs = Abbreviations::empty();

        while !input.is_empty() {
            let code = input.read_uleb128()?;
            if code == 0 {
                break;
            }
            let abbrev = Abbreviation::parse(code, input)?;
            if abbrevs.insert(abbrev).is_err() {
                tracing::debug!(code, "abbreviation code repeats, ending table");
                break;
            }
        }

        Ok(abbrevs)
    }
}

/// An abbreviation describes the shape of a `DebuggingInformationEntry`'s type:
/// its code, tag type, whether it has children, and its set of attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abbreviation {
    code: u64,
    tag: constants::DwTag,
    has_children: constants::DwChildren,
    attributes: Attributes,
}

impl Abbreviation {
    /// Construct a new `Abbreviation`.
    ///
    /// ### Panics
    ///
    /// Panics if `code` is `0`.
    pub fn new(
        code: u64,
        tag: constants::DwTag,
        has_children: constants::DwChildren,
        attributes: Vec<AttributeSpecification>,
    ) -> Abbreviation {
        assert_ne!(code, 0);
        Abbreviation {
            code,
            tag,
            has_children,
            attributes: attributes.into(),
        }
    }

    /// Get this abbreviation's code.
    #[inline]
    pub fn code(&self) -> u64 {
        self.code
    }

    /// Get this abbreviation's tag.
    #[inline]
    pub fn tag(&self) -> constants::DwTag {
        self.tag
    }

    /// Return true if this abbreviation's type has children, false otherwise.
    #[inline]
    pub fn has_children(&self) -> bool {
        self.has_children == constants::DW_CHILDREN_yes
    }

    /// Get this abbreviation's attributes.
    #[inline]
    pub fn attributes(&self) -> &[AttributeSpecification] {
        &self.attributes[..]
    }

    /// The attribute specification for `name`, if the abbreviation has one.
    pub fn attribute(&self, name: constants::DwAt) -> Option<&AttributeSpecification> {
        self.attributes().iter().find(|spec| spec.name == name)
    }

    /// Parse an abbreviation's tag.
    fn parse_tag<R: Reader>(input: &mut R) -> Result<constants::DwTag> {
        let val = input.read_uleb128()?;
        if val == 0 {
            Err(Error::AbbreviationTagZero)
        } else {
            Ok(constants::DwTag(val))
        }
    }

    /// Parse an abbreviation's "does the type have children?" byte.
    fn parse_has_children<R: Reader>(input: &mut R) -> Result<constants::DwChildren> {
        let val = input.read_u8()?;
        let val = constants::DwChildren(val);
        if val == constants::DW_CHILDREN_no || val == constants::DW_CHILDREN_yes {
            Ok(val)
        } else {
            Err(Error::InvalidAbbreviationChildren(val))
        }
    }

    /// Parse a series of attribute specifications, terminated by a null attribute
    /// specification.
    fn parse_attributes<R: Reader>(input: &mut R) -> Result<Attributes> {
        let mut attrs = Attributes::new();

        while let Some(attr) = AttributeSpecification::parse(input)? {
            attrs.push(attr);
        }

        Ok(attrs)
    }

    /// Parse the remainder of a non-null abbreviation whose code was
    /// already read.
    fn parse<R: Reader>(code: u64, input: &mut R) -> Result<Abbreviation> {
        let tag = Self::parse_tag(input)?;
        let has_children = Self::parse_has_children(input)?;
        let attributes = Self::parse_attributes(input)?;
        Ok(Abbreviation {
            code,
            tag,
            has_children,
            attributes,
        })
    }
}

const MAX_ATTRIBUTES_INLINE: usize = 5;

/// A list of attributes found in an `Abbreviation`.
///
/// Most abbreviations have only a handful of attributes, so small lists are
/// stored inline.
#[derive(Clone)]
enum Attributes {
    Inline(ArrayVec<AttributeSpecification, MAX_ATTRIBUTES_INLINE>),
    Heap(Vec<AttributeSpecification>),
}

impl Attributes {
    fn new() -> Attributes {
        Attributes::Inline(ArrayVec::new())
    }

    fn push(&mut self, attr: AttributeSpecification) {
        match self {
            Attributes::Heap(list) => list.push(attr),
            Attributes::Inline(buf) => {
                if let Err(err) = buf.try_push(attr) {
                    let mut list = Vec::with_capacity(MAX_ATTRIBUTES_INLINE * 2);
                    list.extend(buf.drain(..));
                    list.push(err.element());
                    *self = Attributes::Heap(list);
                }
            }
        }
    }
}

impl std::fmt::Debug for Attributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        (**self).fmt(f)
    }
}

impl PartialEq for Attributes {
    fn eq(&self, other: &Attributes) -> bool {
        **self == **other
    }
}

impl Eq for Attributes {}

impl Deref for Attributes {
    type Target = [AttributeSpecification];
    fn deref(&self) -> &[AttributeSpecification] {
        match self {
            Attributes::Inline(buf) => &buf[..],
            Attributes::Heap(list) => &list[..],
        }
    }
}

impl From<Vec<AttributeSpecification>> for Attributes {
    fn from(list: Vec<AttributeSpecification>) -> Attributes {
        let mut attrs = Attributes::new();
        for attr in list {
            attrs.push(attr);
        }
        attrs
    }
}

/// The description of an attribute in an abbreviated type. It is a pair of name
/// and form, plus the constant value for `DW_FORM_implicit_const`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeSpecification {
    name: constants::DwAt,
    form: constants::DwForm,
    implicit_const_value: i64,
}

impl AttributeSpecification {
    /// Construct a new `AttributeSpecification` from the given name and form
    /// and implicit const value.
    #[inline]
    pub fn new(
        name: constants::DwAt,
        form: constants::DwForm,
        implicit_const_value: Option<i64>,
    ) -> AttributeSpecification {
        debug_assert!(
            (form == constants::DW_FORM_implicit_const && implicit_const_value.is_some())
                || (form != constants::DW_FORM_implicit_const && implicit_const_value.is_none())
        );
        AttributeSpecification {
            name,
            form,
            implicit_const_value: implicit_const_value.unwrap_or(0),
        }
    }

    /// Get the attribute's name.
    #[inline]
    pub fn name(&self) -> constants::DwAt {
        self.name
    }

    /// Get the attribute's form.
    #[inline]
    pub fn form(&self) -> constants::DwForm {
        self.form
    }

    /// Get the attribute's implicit const value.
    #[inline]
    pub fn implicit_const_value(&self) -> Option<i64> {
        if self.form == constants::DW_FORM_implicit_const {
            Some(self.implicit_const_value)
        } else {
            None
        }
    }

    /// Return the size of the attribute, in bytes.
    ///
    /// Note that because some attributes are variably sized, the size cannot
    /// always be known without parsing, in which case we return `None`.
    pub fn size(&self, encoding: Encoding) -> Option<usize> {
        get_attribute_size(self.form, encoding).map(usize::from)
    }

    /// Parse an attribute specification. Returns `None` for the null attribute
    /// specification, `Some` for an actual attribute specification.
    fn parse<R: Reader>(input: &mut R) -> Result<Option<AttributeSpecification>> {
        let name = input.read_uleb128()?;
        let form = input.read_uleb128_u16()?;
        if name == 0 && form == 0 {
            return Ok(None);
        }
        if form == 0 {
            return Err(Error::AttributeFormZero);
        }
        let name = constants::DwAt(name);
        let form = constants::DwForm(form);
        let implicit_const_value = if form == constants::DW_FORM_implicit_const {
            Some(input.read_sleb128()?)
        } else {
            None
        };
        Ok(Some(AttributeSpecification::new(
            name,
            form,
            implicit_const_value,
        )))
    }
}

/// The fixed number of bytes an attribute of `form` occupies in a unit with
/// the given encoding, or `None` if its size has to be read from the data.
pub(crate) fn get_attribute_size(form: constants::DwForm, encoding: Encoding) -> Option<u8> {
    match form {
        constants::DW_FORM_addr => Some(encoding.address_size),

        constants::DW_FORM_implicit_const | constants::DW_FORM_flag_present => Some(0),

        constants::DW_FORM_data1
        | constants::DW_FORM_flag
        | constants::DW_FORM_strx1
        | constants::DW_FORM_ref1
        | constants::DW_FORM_addrx1 => Some(1),

        constants::DW_FORM_data2
        | constants::DW_FORM_ref2
        | constants::DW_FORM_addrx2
        | constants::DW_FORM_strx2 => Some(2),

        constants::DW_FORM_addrx3 | constants::DW_FORM_strx3 => Some(3),

        constants::DW_FORM_data4
        | constants::DW_FORM_ref_sup4
        | constants::DW_FORM_ref4
        | constants::DW_FORM_strx4
        | constants::DW_FORM_addrx4 => Some(4),

        constants::DW_FORM_data8
        | constants::DW_FORM_ref8
        | constants::DW_FORM_ref_sig8
        | constants::DW_FORM_ref_sup8 => Some(8),

        constants::DW_FORM_data16 => Some(16),

        constants::DW_FORM_sec_offset
        | constants::DW_FORM_GNU_ref_alt
        | constants::DW_FORM_strp
        | constants::DW_FORM_strp_sup
        | constants::DW_FORM_GNU_strp_alt
        | constants::DW_FORM_line_strp => Some(encoding.format.word_size()),

        constants::DW_FORM_ref_addr => {
            // This is an offset, but DWARF version 2 specifies that DW_FORM_ref_addr
            // has the same size as an address on the target system.  This was changed
            // in DWARF version 3.
            Some(if encoding.version == 2 {
                encoding.address_size
            } else {
                encoding.format.word_size()
            })
        }

        // Variably sized forms.
        constants::DW_FORM_block
        | constants::DW_FORM_block1
        | constants::DW_FORM_block2
        | constants::DW_FORM_block4
        | constants::DW_FORM_exprloc
        | constants::DW_FORM_ref_udata
        | constants::DW_FORM_string
        | constants::DW_FORM_sdata
        | constants::DW_FORM_udata
        | constants::DW_FORM_indirect
        | constants::DW_FORM_strx
        | constants::DW_FORM_addrx
        | constants::DW_FORM_loclistx
        | constants::DW_FORM_rnglistx
        | constants::DW_FORM_GNU_addr_index
        | constants::DW_FORM_GNU_str_index => None,

        // We don't know the size of unknown forms.
        _ => None,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::constants;
    use crate::endianity::LittleEndian;
    use crate::test_util::GimliSectionMethods;
    use test_assembler::Section;

    pub trait AbbrevSectionMethods {
        fn abbrev(self, code: u64, tag: constants::DwTag, children: constants::DwChildren) -> Self;
        fn abbrev_null(self) -> Self;
        fn abbrev_attr(self, name: constants::DwAt, form: constants::DwForm) -> Self;
        fn abbrev_attr_implicit_const(self, name: constants::DwAt, value: i64) -> Self;
        fn abbrev_attr_null(self) -> Self;
    }

    impl AbbrevSectionMethods for Section {
        fn abbrev(self, code: u64, tag: constants::DwTag, children: constants::DwChildren) -> Self {
            self.uleb(code).uleb(tag.0).D8(children.0)
        }

        fn abbrev_null(self) -> Self {
            self.D8(0)
        }

        fn abbrev_attr(self, name: constants::DwAt, form: constants::DwForm) -> Self {
            self.uleb(name.0).uleb(form.0.into())
        }

        fn abbrev_attr_implicit_const(self, name: constants::DwAt, value: i64) -> Self {
            self.uleb(name.0)
                .uleb(constants::DW_FORM_implicit_const.0.into())
                .sleb(value)
        }

        fn abbrev_attr_null(self) -> Self {
            self.D8(0).D8(0)
        }
    }

    fn three_abbrevs() -> Vec<u8> {
        Section::new()
            .abbrev(1, constants::DW_TAG_compile_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_producer, constants::DW_FORM_strp)
            .abbrev_attr(constants::DW_AT_language, constants::DW_FORM_data2)
            .abbrev_attr_null()
            .abbrev(2, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr(constants::DW_AT_high_pc, constants::DW_FORM_data4)
            .abbrev_attr_null()
            .abbrev(3, constants::DW_TAG_base_type, constants::DW_CHILDREN_no)
            .abbrev_attr_implicit_const(constants::DW_AT_byte_size, 4)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap()
    }

    #[test]
    fn test_lookup_by_code() {
        let buf = three_abbrevs();
        let debug_abbrev = DebugAbbrev::new(&buf, LittleEndian);
        let abbrevs = debug_abbrev
            .abbreviations(DebugAbbrevOffset(0))
            .expect("Should parse abbreviations");
        assert_eq!(abbrevs.len(), 3);

        let second = abbrevs.get(2).expect("Should find abbreviation 2");
        assert_eq!(second.code(), 2);
        assert_eq!(second.tag(), constants::DW_TAG_subprogram);
        assert!(!second.has_children());
        assert_eq!(
            second.attributes(),
            &[
                AttributeSpecification::new(constants::DW_AT_name, constants::DW_FORM_string, None),
                AttributeSpecification::new(constants::DW_AT_low_pc, constants::DW_FORM_addr, None),
                AttributeSpecification::new(
                    constants::DW_AT_high_pc,
                    constants::DW_FORM_data4,
                    None
                ),
            ][..]
        );

        let third = abbrevs.get(3).unwrap();
        assert_eq!(
            third.attributes()[0].implicit_const_value(),
            Some(4)
        );
        assert!(abbrevs.get(99).is_none());
        assert!(abbrevs.get(0).is_none());
    }

    #[test]
    fn test_table_ends_at_section_end() {
        let buf = Section::new()
            .abbrev(1, constants::DW_TAG_variable, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            .get_contents()
            .unwrap();
        let abbrevs = DebugAbbrev::new(&buf, LittleEndian)
            .abbreviations(DebugAbbrevOffset(0))
            .unwrap();
        assert_eq!(abbrevs.len(), 1);
    }

    #[test]
    fn test_table_ends_at_repeated_code() {
        // Two tables run together without the terminating null entry.
        let buf = Section::new()
            .abbrev(1, constants::DW_TAG_variable, constants::DW_CHILDREN_no)
            .abbrev_attr_null()
            .abbrev(2, constants::DW_TAG_member, constants::DW_CHILDREN_no)
            .abbrev_attr_null()
            .abbrev(1, constants::DW_TAG_type_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr_null()
            .get_contents()
            .unwrap();
        let abbrevs = DebugAbbrev::new(&buf, LittleEndian)
            .abbreviations(DebugAbbrevOffset(0))
            .unwrap();
        assert_eq!(abbrevs.len(), 2);
        assert_eq!(abbrevs.get(1).unwrap().tag(), constants::DW_TAG_variable);
    }

    #[test]
    fn test_sparse_codes() {
        let buf = Section::new()
            .abbrev(7, constants::DW_TAG_variable, constants::DW_CHILDREN_no)
            .abbrev_attr_null()
            .abbrev(1, constants::DW_TAG_member, constants::DW_CHILDREN_no)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap();
        let abbrevs = DebugAbbrev::new(&buf, LittleEndian)
            .abbreviations(DebugAbbrevOffset(0))
            .unwrap();
        assert_eq!(abbrevs.get(7).unwrap().tag(), constants::DW_TAG_variable);
        assert_eq!(abbrevs.get(1).unwrap().tag(), constants::DW_TAG_member);
    }

    #[test]
    fn test_many_attributes_spill_to_heap() {
        let mut section = Section::new().abbrev(1, constants::DW_TAG_structure_type, constants::DW_CHILDREN_yes);
        for i in 0..8 {
            section = section.abbrev_attr(constants::DwAt(0x2000 + i), constants::DW_FORM_udata);
        }
        let buf = section.abbrev_attr_null().abbrev_null().get_contents().unwrap();
        let abbrevs = DebugAbbrev::new(&buf, LittleEndian)
            .abbreviations(DebugAbbrevOffset(0))
            .unwrap();
        let abbrev = abbrevs.get(1).unwrap();
        assert_eq!(abbrev.attributes().len(), 8);
        assert_eq!(abbrev.attributes()[7].name(), constants::DwAt(0x2007));
    }

    #[test]
    fn test_invalid_children() {
        let buf = Section::new()
            .uleb(1)
            .uleb(constants::DW_TAG_variable.0)
            .D8(2)
            .get_contents()
            .unwrap();
        assert_eq!(
            DebugAbbrev::new(&buf, LittleEndian)
                .abbreviations(DebugAbbrevOffset(0))
                .unwrap_err(),
            Error::InvalidAbbreviationChildren(constants::DwChildren(2))
        );
    }

    #[test]
    fn test_tag_zero() {
        let buf = Section::new().uleb(1).uleb(0).D8(0).get_contents().unwrap();
        assert_eq!(
            DebugAbbrev::new(&buf, LittleEndian)
                .abbreviations(DebugAbbrevOffset(0))
                .unwrap_err(),
            Error::AbbreviationTagZero
        );
    }

    #[test]
    fn test_cache_parses_once() {
        let buf = three_abbrevs();
        let debug_abbrev = DebugAbbrev::new(&buf, LittleEndian);
        let mut cache = AbbreviationsCache::new();
        let a = cache.get(&debug_abbrev, DebugAbbrevOffset(0)).unwrap();
        let b = cache.get(&debug_abbrev, DebugAbbrevOffset(0)).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
        assert!(cache
            .get(&debug_abbrev, DebugAbbrevOffset(buf.len() + 1))
            .is_err());
    }

    #[test]
    fn test_attribute_size() {
        let encoding = Encoding {
            format: crate::common::Format::Dwarf64,
            version: 2,
            address_size: 4,
        };
        let spec = AttributeSpecification::new(constants::DW_AT_sibling, constants::DW_FORM_ref_addr, None);
        assert_eq!(spec.size(encoding), Some(4));
        let encoding = Encoding { version: 4, ..encoding };
        assert_eq!(spec.size(encoding), Some(8));
        let spec = AttributeSpecification::new(constants::DW_AT_name, constants::DW_FORM_string, None);
        assert_eq!(spec.size(encoding), None);
    }
}
