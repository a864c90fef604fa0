use arrayvec::ArrayVec;

use crate::common::{DebugTypeSignature, SectionId};
use crate::constants;
use crate::endianity::Endianity;
use crate::read::{EndianSlice, Error, Reader, Result, Section};

/// The data in the `.debug_cu_index` section of a `.dwp` file.
///
/// This section contains the compilation units index.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugCuIndex<R> {
    section: R,
}

impl<'input, Endian> DebugCuIndex<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugCuIndex` instance from the data in the `.debug_cu_index`
    /// section.
    pub fn new(section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(section, endian))
    }
}

impl<R> Section<R> for DebugCuIndex<R> {
    fn id() -> SectionId {
        SectionId::DebugCuIndex
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for DebugCuIndex<R> {
    fn from(section: R) -> Self {
        DebugCuIndex { section }
    }
}

impl<R: Reader> DebugCuIndex<R> {
    /// Parse the index header.
    pub fn index(self) -> Result<UnitIndex<R>> {
        UnitIndex::parse(self.section)
    }

    /// Whether the section is absent.
    pub fn is_empty(&self) -> bool {
        self.section.is_empty()
    }
}

/// The data in the `.debug_tu_index` section of a `.dwp` file.
///
/// This section contains the type units index.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugTuIndex<R> {
    section: R,
}

impl<'input, Endian> DebugTuIndex<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugTuIndex` instance from the data in the `.debug_tu_index`
    /// section.
    pub fn new(section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(section, endian))
    }
}

impl<R> Section<R> for DebugTuIndex<R> {
    fn id() -> SectionId {
        SectionId::DebugTuIndex
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for DebugTuIndex<R> {
    fn from(section: R) -> Self {
        DebugTuIndex { section }
    }
}

impl<R: Reader> DebugTuIndex<R> {
    /// Parse the index header.
    pub fn index(self) -> Result<UnitIndex<R>> {
        UnitIndex::parse(self.section)
    }

    /// Whether the section is absent.
    pub fn is_empty(&self) -> bool {
        self.section.is_empty()
    }
}

const SECTION_COUNT_MAX: usize = 8;

/// The partially parsed index from a `DebugCuIndex` or `DebugTuIndex`.
#[derive(Debug, Clone)]
pub struct UnitIndex<R: Reader> {
    version: u32,
    section_count: u32,
    unit_count: u32,
    slot_count: u32,
    hash_ids: R,
    hash_rows: R,
    // Version 1 only: zero-terminated lists of section numbers.
    pool: R,
    // Versions 2 and 5.
    sections: ArrayVec<IndexSectionId, SECTION_COUNT_MAX>,
    offsets: R,
    sizes: R,
}

impl<R: Reader> UnitIndex<R> {
    fn parse(mut input: R) -> Result<UnitIndex<R>> {
        if input.is_empty() {
            return Ok(UnitIndex {
                version: 0,
                section_count: 0,
                unit_count: 0,
                slot_count: 0,
                hash_ids: input.clone(),
                hash_rows: input.clone(),
                pool: input.clone(),
                sections: ArrayVec::new(),
                offsets: input.clone(),
                sizes: input,
            });
        }

        // GNU split-dwarf extension uses a 32-bit version; DWARF 5 uses a
        // 16-bit version followed by 16 bits of padding.
        let mut original_input = input.clone();
        let version = match input.read_u32()? {
            v @ (1 | 2) => v,
            _ => {
                let v = original_input.read_u16()?;
                if v != 5 {
                    return Err(Error::UnknownIndexVersion(u32::from(v)));
                }
                5
            }
        };

        let section_count = input.read_u32()?;
        let unit_count = input.read_u32()?;
        let slot_count = input.read_u32()?;
        if slot_count == 0 || slot_count & (slot_count - 1) != 0 || slot_count <= unit_count {
            return Err(Error::InvalidIndexSlotCount(slot_count));
        }

        let hash_ids = input.split(slot_count as usize * 8)?;
        let hash_rows = input.split(slot_count as usize * 4)?;

        if version == 1 {
            // The pool runs to the end of the section.
            return Ok(UnitIndex {
                version,
                section_count: 0,
                unit_count,
                slot_count,
                hash_ids,
                hash_rows,
                pool: input.clone(),
                sections: ArrayVec::new(),
                offsets: input.clone(),
                sizes: input,
            });
        }

        if section_count as usize > SECTION_COUNT_MAX {
            return Err(Error::UnsupportedIndexSectionCount(section_count));
        }
        let mut sections = ArrayVec::new();
        for _ in 0..section_count {
            let raw = input.read_u32()?;
            let section = if version == 2 {
                IndexSectionId::from_v2(constants::DwSectV2(raw))
            } else {
                IndexSectionId::from_v5(constants::DwSect(raw))
            };
            sections.push(section.ok_or(Error::UnknownIndexSection(raw))?);
        }

        let offsets = input.split(unit_count as usize * section_count as usize * 4)?;
        let sizes = input.split(unit_count as usize * section_count as usize * 4)?;

        Ok(UnitIndex {
            version,
            section_count,
            unit_count,
            slot_count,
            hash_ids,
            hash_rows,
            pool: input.clone(),
            sections,
            offsets,
            sizes,
        })
    }

    /// Find `id` in the index hash table, and return the row index.
    ///
    /// `id` may be a compilation unit ID if this index is from `.debug_cu_index`,
    /// or a type signature if this index is from `.debug_tu_index`.
    ///
    /// Probing stops at an empty slot or after `slot_count` probes, so a
    /// corrupt table cannot loop forever.
    pub fn find(&self, id: u64) -> Option<u32> {
        if self.slot_count == 0 {
            return None;
        }
        let mask = u64::from(self.slot_count - 1);
        let mut hash1 = id & mask;
        let hash2 = ((id >> 32) & mask) | 1;
        for _ in 0..self.slot_count {
            let mut hash_ids = self.hash_ids.clone();
            hash_ids.skip(hash1 as usize * 8).ok()?;
            let hash_id = hash_ids.read_u64().ok()?;
            if hash_id == id {
                let mut hash_rows = self.hash_rows.clone();
                hash_rows.skip(hash1 as usize * 4).ok()?;
                let row = hash_rows.read_u32().ok()?;
                return Some(row);
            }
            if hash_id == 0 {
                return None;
            }
            hash1 = (hash1 + hash2) & mask;
        }
        None
    }

    /// Find a type unit by signature.
    pub fn find_signature(&self, signature: DebugTypeSignature) -> Option<u32> {
        self.find(signature.0)
    }

    /// Return the section contents of the unit at the given row.
    ///
    /// For version 1 the row is an index into the section number pool. For
    /// later versions rows are numbered from 1.
    pub fn row(&self, row: u32) -> Result<UnitIndexRow> {
        if self.version == 1 {
            let mut pool = self.pool.clone();
            pool.skip(row as usize * 4)
                .map_err(|_| Error::InvalidIndexRow(row))?;
            let mut numbers = Vec::new();
            loop {
                let number = pool.read_u32()?;
                if number == 0 {
                    break;
                }
                numbers.push(number);
            }
            return Ok(UnitIndexRow::SectionNumbers(numbers));
        }

        if row == 0 || row - 1 >= self.unit_count {
            return Err(Error::InvalidIndexRow(row));
        }
        let row = row - 1;
        let mut offsets = self.offsets.clone();
        offsets.skip(row as usize * self.section_count as usize * 4)?;
        let mut sizes = self.sizes.clone();
        sizes.skip(row as usize * self.section_count as usize * 4)?;
        let mut contributions = Vec::with_capacity(self.sections.len());
        for &section in &self.sections {
            contributions.push(UnitIndexSection {
                section,
                offset: offsets.read_u32()?,
                size: sizes.read_u32()?,
            });
        }
        Ok(UnitIndexRow::Contributions(contributions))
    }

    /// Return the version.
    ///
    /// Zero means the section was absent.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Return the number of sections.
    pub fn section_count(&self) -> u32 {
        self.section_count
    }

    /// Return the number of units.
    pub fn unit_count(&self) -> u32 {
        self.unit_count
    }

    /// Return the number of slots.
    pub fn slot_count(&self) -> u32 {
        self.slot_count
    }

    /// Every populated slot as `(id, row)`, in slot order.
    pub fn entries(&self) -> Result<Vec<(u64, u32)>> {
        let mut hash_ids = self.hash_ids.clone();
        let mut hash_rows = self.hash_rows.clone();
        let mut entries = Vec::with_capacity(self.unit_count as usize);
        for _ in 0..self.slot_count {
            let id = hash_ids.read_u64()?;
            let row = hash_rows.read_u32()?;
            if id != 0 || (self.version != 1 && row != 0) {
                entries.push((id, row));
            }
        }
        Ok(entries)
    }
}

/// The contents of one row of a package index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitIndexRow {
    /// Version 1: the object file section numbers of each section the unit
    /// uses.
    SectionNumbers(Vec<u32>),
    /// Versions 2 and 5: the unit's contribution to each indexed section.
    Contributions(Vec<UnitIndexSection>),
}

/// Information about a unit's contribution to a section in a `.dwp` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitIndexSection {
    /// The section kind.
    pub section: IndexSectionId,
    /// The base offset of the unit's contribution to the section.
    pub offset: u32,
    /// The size of the unit's contribution to the section.
    pub size: u32,
}

/// Section kinds which may be used in a `.dwp` index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSectionId {
    /// The `.debug_abbrev.dwo` section.
    DebugAbbrev,
    /// The `.debug_info.dwo` section.
    DebugInfo,
    /// The `.debug_line.dwo` section.
    DebugLine,
    /// The `.debug_loc.dwo` section.
    DebugLoc,
    /// The `.debug_loclists.dwo` section.
    DebugLocLists,
    /// The `.debug_macinfo.dwo` section.
    DebugMacinfo,
    /// The `.debug_macro.dwo` section.
    DebugMacro,
    /// The `.debug_rnglists.dwo` section.
    DebugRngLists,
    /// The `.debug_str_offsets.dwo` section.
    DebugStrOffsets,
    /// The `.debug_types.dwo` section.
    DebugTypes,
}

impl IndexSectionId {
    fn from_v2(value: constants::DwSectV2) -> Option<Self> {
        Some(match value {
            constants::DW_SECT_V2_INFO => IndexSectionId::DebugInfo,
            constants::DW_SECT_V2_TYPES => IndexSectionId::DebugTypes,
            constants::DW_SECT_V2_ABBREV => IndexSectionId::DebugAbbrev,
            constants::DW_SECT_V2_LINE => IndexSectionId::DebugLine,
            constants::DW_SECT_V2_LOC => IndexSectionId::DebugLoc,
            constants::DW_SECT_V2_STR_OFFSETS => IndexSectionId::DebugStrOffsets,
            constants::DW_SECT_V2_MACINFO => IndexSectionId::DebugMacinfo,
            constants::DW_SECT_V2_MACRO => IndexSectionId::DebugMacro,
            _ => return None,
        })
    }

    fn from_v5(value: constants::DwSect) -> Option<Self> {
        Some(match value {
            constants::DW_SECT_INFO => IndexSectionId::DebugInfo,
            constants::DW_SECT_ABBREV => IndexSectionId::DebugAbbrev,
            constants::DW_SECT_LINE => IndexSectionId::DebugLine,
            constants::DW_SECT_LOCLISTS => IndexSectionId::DebugLocLists,
            constants::DW_SECT_STR_OFFSETS => IndexSectionId::DebugStrOffsets,
            constants::DW_SECT_MACRO => IndexSectionId::DebugMacro,
            constants::DW_SECT_RNGLISTS => IndexSectionId::DebugRngLists,
            _ => return None,
        })
    }

    /// Returns the corresponding `SectionId`.
    pub fn section_id(self) -> SectionId {
        match self {
            IndexSectionId::DebugAbbrev => SectionId::DebugAbbrev,
            IndexSectionId::DebugInfo => SectionId::DebugInfo,
            IndexSectionId::DebugLine => SectionId::DebugLine,
            IndexSectionId::DebugLoc => SectionId::DebugLoc,
            IndexSectionId::DebugLocLists => SectionId::DebugLocLists,
            IndexSectionId::DebugMacro => SectionId::DebugMacro,
            IndexSectionId::DebugMacinfo => SectionId::DebugMacinfo,
            IndexSectionId::DebugRngLists => SectionId::DebugRngLists,
            IndexSectionId::DebugStrOffsets => SectionId::DebugStrOffsets,
            IndexSectionId::DebugTypes => SectionId::DebugTypes,
        }
    }

    /// Returns the kind for a `.dwo` section name, as used to classify the
    /// section numbers of a version 1 index.
    pub fn from_dwo_name(name: &str) -> Option<Self> {
        Some(match name {
            ".debug_abbrev.dwo" => IndexSectionId::DebugAbbrev,
            ".debug_info.dwo" => IndexSectionId::DebugInfo,
            ".debug_line.dwo" => IndexSectionId::DebugLine,
            ".debug_loc.dwo" => IndexSectionId::DebugLoc,
            ".debug_loclists.dwo" => IndexSectionId::DebugLocLists,
            ".debug_macinfo.dwo" => IndexSectionId::DebugMacinfo,
            ".debug_macro.dwo" => IndexSectionId::DebugMacro,
            ".debug_rnglists.dwo" => IndexSectionId::DebugRngLists,
            ".debug_str_offsets.dwo" => IndexSectionId::DebugStrOffsets,
            ".debug_types.dwo" => IndexSectionId::DebugTypes,
            _ => return None,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::endianity::BigEndian;
    use crate::LittleEndian;
    use test_assembler::{Endian, Section};

    /// Lay out `(signature, row)` pairs in a hash table of `slots` slots
    /// the way a package producer does.
    pub(crate) fn hash_table(slots: u32, entries: &[(u64, u32)]) -> (Vec<u64>, Vec<u32>) {
        let mask = u64::from(slots - 1);
        let mut ids = vec![0u64; slots as usize];
        let mut rows = vec![0u32; slots as usize];
        for &(id, row) in entries {
            let mut h = id & mask;
            let hp = ((id >> 32) & mask) | 1;
            while ids[h as usize] != 0 {
                h = (h + hp) & mask;
            }
            ids[h as usize] = id;
            rows[h as usize] = row;
        }
        (ids, rows)
    }

    #[test]
    fn test_empty() {
        let buf = EndianSlice::new(&[], BigEndian);
        let index = UnitIndex::parse(buf).unwrap();
        assert_eq!(index.version(), 0);
        assert_eq!(index.find(0), None);
        assert!(index.entries().unwrap().is_empty());
    }

    #[test]
    fn test_version_2() {
        #[rustfmt::skip]
        let section = Section::with_endian(Endian::Big)
            // Header.
            .D32(2).D32(0).D32(0).D32(1)
            // Slots.
            .D64(0).D32(0);
        let buf = section.get_contents().unwrap();
        let buf = EndianSlice::new(&buf, BigEndian);
        let index = UnitIndex::parse(buf).unwrap();
        assert_eq!(index.version, 2);
    }

    #[test]
    fn test_version_5() {
        #[rustfmt::skip]
        let section = Section::with_endian(Endian::Big)
            // Header.
            .D16(5).D16(0).D32(0).D32(0).D32(1)
            // Slots.
            .D64(0).D32(0);
        let buf = section.get_contents().unwrap();
        let buf = EndianSlice::new(&buf, BigEndian);
        let index = UnitIndex::parse(buf).unwrap();
        assert_eq!(index.version, 5);
    }

    #[test]
    fn test_version_5_invalid() {
        #[rustfmt::skip]
        let section = Section::with_endian(Endian::Big)
            // Header.
            .D32(5).D32(0).D32(0).D32(1)
            // Slots.
            .D64(0).D32(0);
        let buf = section.get_contents().unwrap();
        let buf = EndianSlice::new(&buf, BigEndian);
        assert!(UnitIndex::parse(buf).is_err());
    }

    #[test]
    fn test_bad_slot_count() {
        #[rustfmt::skip]
        let section = Section::with_endian(Endian::Little)
            .L32(2).L32(0).L32(3).L32(3);
        let buf = section.get_contents().unwrap();
        let buf = EndianSlice::new(&buf, LittleEndian);
        assert_eq!(
            UnitIndex::parse(buf).unwrap_err(),
            Error::InvalidIndexSlotCount(3)
        );
    }

    #[test]
    fn test_lookup_terminates() {
        let signatures = [
            (0x0123_4567_89ab_cdef, 1),
            (0x1111_0000_2222_0001, 2),
            (0x0000_0005_0000_0009, 3),
        ];
        let (ids, rows) = hash_table(8, &signatures);
        let mut section = Section::with_endian(Endian::Little)
            .L32(2)
            .L32(1)
            .L32(3)
            .L32(8);
        for id in &ids {
            section = section.L64(*id);
        }
        for row in &rows {
            section = section.L32(*row);
        }
        #[rustfmt::skip]
        let section = section
            .L32(constants::DW_SECT_V2_INFO.0)
            .L32(0x00).L32(0x40).L32(0x80)
            .L32(0x40).L32(0x40).L32(0x20);
        let buf = section.get_contents().unwrap();
        let index = DebugTuIndex::new(&buf, LittleEndian).index().unwrap();

        for &(signature, row) in &signatures {
            assert_eq!(index.find(signature), Some(row));
        }
        assert_eq!(index.find(0xdead_beef), None);
        // Same low bits as a present signature, so the probe sequence
        // walks occupied slots before finding an empty one.
        assert_eq!(index.find(0x0000_0005_0000_0001), None);
        assert_eq!(index.entries().unwrap().len(), 3);

        assert_eq!(
            index.row(3).unwrap(),
            UnitIndexRow::Contributions(vec![UnitIndexSection {
                section: IndexSectionId::DebugInfo,
                offset: 0x80,
                size: 0x20,
            }])
        );
        assert_eq!(index.row(0), Err(Error::InvalidIndexRow(0)));
        assert_eq!(index.row(4), Err(Error::InvalidIndexRow(4)));
    }

    #[test]
    fn test_lookup_full_table() {
        // A corrupt table with every slot occupied and no match.
        let mut section = Section::with_endian(Endian::Little)
            .L32(2)
            .L32(0)
            .L32(1)
            .L32(2)
            .L64(1)
            .L64(2)
            .L32(1)
            .L32(1);
        section = section.L32(0);
        let buf = section.get_contents().unwrap();
        let index = DebugCuIndex::new(&buf, LittleEndian).index().unwrap();
        assert_eq!(index.find(3), None);
    }

    #[test]
    fn test_version_1_pool() {
        let (ids, rows) = hash_table(4, &[(0x10, 0), (0x20, 3)]);
        let mut section = Section::with_endian(Endian::Little)
            .L32(1)
            .L32(0)
            .L32(2)
            .L32(4);
        for id in &ids {
            section = section.L64(*id);
        }
        for row in &rows {
            section = section.L32(*row);
        }
        // Two zero-terminated lists of section numbers.
        let section = section.L32(5).L32(6).L32(0).L32(7).L32(8).L32(9).L32(0);
        let buf = section.get_contents().unwrap();
        let index = DebugCuIndex::new(&buf, LittleEndian).index().unwrap();
        assert_eq!(index.version(), 1);
        let row = index.find(0x20).unwrap();
        assert_eq!(
            index.row(row).unwrap(),
            UnitIndexRow::SectionNumbers(vec![7, 8, 9])
        );
        let row = index.find(0x10).unwrap();
        assert_eq!(
            index.row(row).unwrap(),
            UnitIndexRow::SectionNumbers(vec![5, 6])
        );
    }

    #[test]
    fn test_version_5_sections() {
        let (ids, rows) = hash_table(2, &[(0xabcd, 1)]);
        let mut section = Section::with_endian(Endian::Little)
            .L16(5)
            .L16(0)
            .L32(3)
            .L32(1)
            .L32(2);
        for id in &ids {
            section = section.L64(*id);
        }
        for row in &rows {
            section = section.L32(*row);
        }
        #[rustfmt::skip]
        let section = section
            .L32(constants::DW_SECT_INFO.0)
            .L32(constants::DW_SECT_ABBREV.0)
            .L32(constants::DW_SECT_STR_OFFSETS.0)
            .L32(0x10).L32(0x20).L32(0x30)
            .L32(0x11).L32(0x21).L32(0x31);
        let buf = section.get_contents().unwrap();
        let index = DebugCuIndex::new(&buf, LittleEndian).index().unwrap();
        let row = index.find(0xabcd).unwrap();
        let sections = match index.row(row).unwrap() {
            UnitIndexRow::Contributions(c) => c,
            other => panic!("unexpected row {:?}", other),
        };
        assert_eq!(sections.len(), 3);
        assert_eq!(sections[1].section, IndexSectionId::DebugAbbrev);
        assert_eq!(sections[1].section.section_id(), SectionId::DebugAbbrev);
        assert_eq!(sections[2].offset, 0x30);
        assert_eq!(sections[2].size, 0x31);
    }

    #[test]
    fn test_unknown_section() {
        #[rustfmt::skip]
        let section = Section::with_endian(Endian::Little)
            .L32(2).L32(1).L32(0).L32(1)
            .L64(0).L32(0)
            .L32(99);
        let buf = section.get_contents().unwrap();
        let buf = EndianSlice::new(&buf, LittleEndian);
        assert!(matches!(
            UnitIndex::parse(buf),
            Err(Error::UnknownIndexSection(_))
        ));
    }
}
