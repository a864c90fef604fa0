//! Reading a unit's dies into its state.
//!
//! A skeleton unit is completed from its split unit: the split unit's top
//! die inherits the skeleton's line table, address range and compilation
//! directory, and the rest of the split unit is read behind it.

use std::collections::HashSet;
use std::sync::Arc;

use crate::common::{DebugLineOffset, DwoId, UnitSectionOffset};
use crate::complaint::complain;
use crate::constants;
use crate::read::{
    Abbreviations, Attribute, AttributeValue, Die, DieReader, DieTree, Dwarf, Error,
    PartialDieReader, Reader, Result, UnitBases, UnitHeader, UnitType,
};
use crate::split::DwoFileId;
use crate::units::{
    DwarfContext, Producer, UnitFile, UnitId, UnitKind, UnitSource, UnitState,
};

/// How much of a unit to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Every die, into a [`DieTree`].
    Full,
    /// Only what the partial symbol table needs, into
    /// [`PartialDies`](crate::read::PartialDies).
    Partial,
}

/// A unit read on its own, without following a skeleton to its split
/// unit and without caching.
#[derive(Debug)]
pub struct UnitSnapshot<R: Reader> {
    /// The unit's header.
    pub header: UnitHeader<R>,
    /// The file the unit was read from.
    pub file: UnitFile,
    /// The unit die.
    pub top: Die<R>,
    /// The bases from the unit die.
    pub bases: UnitBases,
    /// Every die, if requested.
    pub dies: Option<DieTree<R>>,
}

/// The attributes a split unit's top die takes from its skeleton.
const INHERITED: [constants::DwAt; 5] = [
    constants::DW_AT_stmt_list,
    constants::DW_AT_low_pc,
    constants::DW_AT_high_pc,
    constants::DW_AT_ranges,
    constants::DW_AT_comp_dir,
];

fn read_header<R: Reader>(dwarf: &Dwarf<R>, offset: UnitSectionOffset) -> Result<UnitHeader<R>> {
    match offset {
        UnitSectionOffset::DebugInfoOffset(offset) => dwarf.debug_info.header_from_offset(offset),
        UnitSectionOffset::DebugTypesOffset(offset) => {
            dwarf.debug_types.header_from_offset(offset)
        }
    }
}

fn attr_str<R: Reader>(
    dwarf: &Dwarf<R>,
    bases: &UnitBases,
    die: &Die<R>,
    name: constants::DwAt,
) -> Result<Option<String>> {
    match die.attr(name) {
        Some(attr) => {
            let string = dwarf.attr_string(bases, attr)?;
            Ok(Some(string.to_string_lossy()?.into_owned()))
        }
        None => Ok(None),
    }
}

impl<'l, R: Reader> DwarfContext<'l, R> {
    /// The sections a unit's dies were read from.
    pub(crate) fn unit_dwarf(&self, file: UnitFile) -> &Dwarf<R> {
        match file {
            UnitFile::Main => &self.dwarf,
            UnitFile::Alt => self.dwarf.sup().unwrap_or(&self.dwarf),
            UnitFile::Dwo(id) => self.dwo_files.get(id).dwarf(),
        }
    }

    /// The sections that resolve a unit's string forms. Units of the
    /// alternate file read their strings as alternate forms, which the
    /// main file resolves.
    pub(crate) fn string_dwarf(&self, file: UnitFile) -> &Dwarf<R> {
        match file {
            UnitFile::Main | UnitFile::Alt => &self.dwarf,
            UnitFile::Dwo(id) => self.dwo_files.get(id).dwarf(),
        }
    }

    fn dwo_unit_header(
        &self,
        file: DwoFileId,
        signature: u64,
        is_type_unit: bool,
    ) -> Option<UnitHeader<R>> {
        let dwo = self.dwo_files.get(file);
        let unit = if is_type_unit {
            dwo.type_unit(crate::common::DebugTypeSignature(signature))
        } else {
            dwo.compile_unit(DwoId(signature))
        };
        unit.map(|unit| unit.header.clone())
    }

    /// Read the header of a unit, locating package type units on first
    /// use.
    pub(crate) fn unit_header(&mut self, id: UnitId) -> Result<(UnitHeader<R>, UnitFile)> {
        let (source, offset, signature) = {
            let unit = self.unit(id)?;
            (unit.source, unit.offset, unit.signature)
        };
        let unavailable = |reason: String| Error::UnitUnavailable {
            unit_offset: offset.raw(),
            reason,
        };
        let (header, file) = match source {
            UnitSource::Main => (read_header(&self.dwarf, offset)?, UnitFile::Main),
            UnitSource::Alt => {
                let sup = self
                    .dwarf
                    .sup()
                    .ok_or(Error::MissingAltFile(constants::DW_FORM_GNU_ref_alt))?;
                (read_header(sup, offset)?, UnitFile::Alt)
            }
            UnitSource::Dwo(_) | UnitSource::Dwp => {
                let signature = signature.ok_or(Error::InvalidUnitId(id.0))?;
                let file = match source {
                    UnitSource::Dwo(file) => Some(file),
                    _ => self.lookup_dwo_unit(None, None, signature.0, true)?,
                };
                let header = file.and_then(|file| self.dwo_unit_header(file, signature.0, true));
                match (file, header) {
                    (Some(file), Some(header)) => (header, UnitFile::Dwo(file)),
                    _ => {
                        return Err(unavailable(format!(
                            "type unit 0x{:016x} is not in any split file",
                            signature.0
                        )))
                    }
                }
            }
        };

        // Descriptors made from an index learn the rest of their header
        // here.
        let unit = &mut self.units[id.0];
        if let UnitFile::Dwo(file) = file {
            unit.source = UnitSource::Dwo(file);
            unit.offset = header.offset();
        }
        if unit.length == 0 {
            unit.length = header.length_including_self();
        }
        unit.version = header.version();
        if unit.kind == UnitKind::Compile && header.type_() == UnitType::Partial {
            unit.kind = UnitKind::Partial;
        }
        Ok((header, file))
    }

    /// Whether a unit has no dies at all. A unit whose header cannot be
    /// read is not counted as empty here; loading it reports the error.
    pub(crate) fn is_dummy_unit(&mut self, id: UnitId) -> bool {
        matches!(self.unit_header(id), Ok((header, _)) if header.is_dummy())
    }

    pub(crate) fn abbreviations(
        &mut self,
        file: UnitFile,
        header: &UnitHeader<R>,
    ) -> Result<Arc<Abbreviations>> {
        let offset = header.debug_abbrev_offset();
        match file {
            UnitFile::Main => {
                header.validate_abbrev_offset(&self.dwarf.debug_abbrev)?;
                self.abbrevs.get(&self.dwarf.debug_abbrev, offset)
            }
            UnitFile::Alt => {
                let sup = self
                    .dwarf
                    .sup()
                    .ok_or(Error::MissingAltFile(constants::DW_FORM_GNU_ref_alt))?;
                header.validate_abbrev_offset(&sup.debug_abbrev)?;
                self.alt_abbrevs.get(&sup.debug_abbrev, offset)
            }
            UnitFile::Dwo(id) => {
                let dwo = self.dwo_files.get_mut(id);
                let debug_abbrev = dwo.dwarf().debug_abbrev.clone();
                header.validate_abbrev_offset(&debug_abbrev)?;
                dwo.abbreviations_cache().get(&debug_abbrev, offset)
            }
        }
    }

    /// Load a unit's dies into its cached state.
    ///
    /// A skeleton unit is completed from its split unit, found in the
    /// package or in the split file it names. If neither is available a
    /// complaint is reported and the skeleton is used on its own.
    ///
    /// Returns false, without creating a state, for a unit with no dies.
    /// Loading a unit that is already loaded in the requested mode only
    /// marks it as recently used.
    pub fn load_unit(&mut self, id: UnitId, mode: ReadMode) -> Result<bool> {
        if let Some(state) = self.states.get_mut(&id) {
            let done = match mode {
                ReadMode::Full => state.dies.is_some(),
                ReadMode::Partial => state.partial.is_some(),
            };
            if done {
                state.last_used = 0;
                return Ok(true);
            }
        }

        let read = match self.read_unit(id, mode)? {
            Some(read) => read,
            None => {
                tracing::debug!(unit = id.0, "unit has no dies");
                self.free_unit(id);
                return Ok(false);
            }
        };
        match self.states.get_mut(&id) {
            Some(state) => {
                // Keep the dependencies already recorded.
                match mode {
                    ReadMode::Full => state.dies = read.dies,
                    ReadMode::Partial => state.partial = read.partial,
                }
                state.last_used = 0;
            }
            None => {
                self.states.insert(id, read);
                self.read_in.push(id);
            }
        }
        Ok(true)
    }

    fn read_unit(&mut self, id: UnitId, mode: ReadMode) -> Result<Option<UnitState<R>>> {
        let (mut header, mut file) = self.unit_header(id)?;
        if header.is_dummy() {
            return Ok(None);
        }
        let mut abbrevs = self.abbreviations(file, &header)?;
        let (mut top, mut rest) = {
            let reader = DieReader::new(&header, &abbrevs, &self.complaints)
                .alt(file == UnitFile::Alt)
                .dump(self.options.dump_dies);
            match reader.read_top_die()? {
                Some(read) => read,
                None => return Ok(None),
            }
        };
        if top.tag() == constants::DW_TAG_partial_unit {
            self.units[id.0].kind = UnitKind::Partial;
        }
        let mut bases = UnitBases::from_attrs(header.encoding(), top.attrs());

        let mut dwo_missing = false;
        let mut line_in_skeleton_file = false;
        if file == UnitFile::Main && self.units[id.0].kind != UnitKind::Type {
            if let Some((dwo_file, signature)) = self.find_split_unit(&header, &top, &bases)? {
                match dwo_file {
                    Some(dwo_file) => match self.read_split_top(dwo_file, signature)? {
                        Some((dwo_header, dwo_abbrevs, dwo_top, dwo_rest)) => {
                            let dwo_top = self.inherit_skeleton_attrs(&top, &bases, dwo_top)?;
                            let mut dwo_bases =
                                UnitBases::from_attrs(dwo_header.encoding(), dwo_top.attrs());
                            dwo_bases.addr_base = dwo_bases.addr_base.or(bases.addr_base);
                            dwo_bases.ranges_base = dwo_bases.ranges_base.or(bases.ranges_base);

                            line_in_skeleton_file = top.attr(constants::DW_AT_stmt_list).is_some();
                            header = dwo_header;
                            abbrevs = dwo_abbrevs;
                            top = dwo_top;
                            rest = dwo_rest;
                            bases = dwo_bases;
                            file = UnitFile::Dwo(dwo_file);
                        }
                        None => {
                            complain!(
                                self.complaints,
                                MissingDwo,
                                "split unit 0x{:016x} for CU at offset 0x{:x} is missing or empty",
                                signature,
                                header.offset().raw()
                            );
                            dwo_missing = true;
                        }
                    },
                    None => dwo_missing = true,
                }
            }
        }

        let strings = self.string_dwarf(file);
        let language = top
            .attr(constants::DW_AT_language)
            .and_then(Attribute::udata_value)
            .map_or(constants::DwLang(0), |lang| constants::DwLang(lang as u16));
        let producer = Producer::parse(
            attr_str(strings, &bases, &top, constants::DW_AT_producer)?.as_deref(),
        );
        let comp_dir = attr_str(strings, &bases, &top, constants::DW_AT_comp_dir)?;
        let mut name = attr_str(strings, &bases, &top, constants::DW_AT_name)?;
        if producer.is_gas_2_39() {
            if let (Some(dir), Some(file_name)) = (comp_dir.as_deref(), name.as_deref()) {
                if !file_name.starts_with('/') {
                    name = Some(format!("{}/{}", dir.trim_end_matches('/'), file_name));
                }
            }
        }

        let mut base_address = None;
        for at in [constants::DW_AT_low_pc, constants::DW_AT_entry_pc] {
            if let Some(attr) = top.attr(at) {
                base_address = strings.attr_address(&self.dwarf.debug_addr, &bases, attr)?;
                if base_address.is_some() {
                    break;
                }
            }
        }

        let stmt_list = top
            .attr(constants::DW_AT_stmt_list)
            .and_then(Attribute::offset_value)
            .map(DebugLineOffset);
        let line_header = match stmt_list {
            Some(offset) => {
                let line_dwarf = if line_in_skeleton_file {
                    &self.dwarf
                } else {
                    self.unit_dwarf(file)
                };
                match line_dwarf.debug_line.header(offset, header.address_size()) {
                    Ok(line) => {
                        if line.format() != header.format() {
                            complain!(
                                self.complaints,
                                MixedOffsetSize,
                                "line header at 0x{:x} and unit at 0x{:x} mix 32-bit and 64-bit DWARF",
                                offset.0,
                                header.offset().raw()
                            );
                        }
                        if self.options.trace_line_headers {
                            tracing::debug!(
                                offset = offset.0,
                                version = line.version(),
                                files = line.file_names().len(),
                                dirs = line.include_directories().len(),
                                "line header"
                            );
                        }
                        Some(line)
                    }
                    Err(err) => {
                        complain!(
                            self.complaints,
                            BadLineHeader,
                            "cannot read line header at 0x{:x}: {}",
                            offset.0,
                            err
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let reader = DieReader::new(&header, &abbrevs, &self.complaints)
            .alt(file == UnitFile::Alt)
            .dump(self.options.dump_dies);
        let (dies, partial) = match mode {
            ReadMode::Full => (Some(reader.read_tree(top.clone(), rest)?), None),
            ReadMode::Partial => {
                let scanner = PartialDieReader::new(
                    reader,
                    strings,
                    &self.dwarf.debug_addr,
                    &bases,
                    &self.complaints,
                    language,
                )
                .has_section_at_zero(self.has_section_at_zero);
                (None, Some(scanner.load(rest)?))
            }
        };
        tracing::debug!(
            unit = id.0,
            offset = header.offset().raw(),
            ?mode,
            ?file,
            "loaded unit"
        );

        Ok(Some(UnitState {
            header,
            file,
            bases,
            top,
            language,
            producer,
            name,
            comp_dir,
            base_address,
            stmt_list,
            line_header,
            dies,
            partial,
            dwo_missing,
            dependencies: HashSet::new(),
            last_used: 0,
            mark: false,
        }))
    }

    /// Read the top die of a split unit, or `None` if the split file has
    /// no such unit or the unit has no dies.
    #[allow(clippy::type_complexity)]
    fn read_split_top(
        &mut self,
        dwo_file: DwoFileId,
        signature: u64,
    ) -> Result<Option<(UnitHeader<R>, Arc<Abbreviations>, Die<R>, R)>> {
        let dwo_header = match self.dwo_unit_header(dwo_file, signature, false) {
            Some(header) => header,
            None => return Ok(None),
        };
        let dwo_abbrevs = self.abbreviations(UnitFile::Dwo(dwo_file), &dwo_header)?;
        let read = DieReader::new(&dwo_header, &dwo_abbrevs, &self.complaints)
            .dump(self.options.dump_dies)
            .read_top_die()?;
        Ok(read.map(|(top, rest)| (dwo_header, dwo_abbrevs, top, rest)))
    }

    /// Decide whether a unit is a skeleton and find its split unit.
    ///
    /// Returns `None` for an ordinary unit, and `Some((None, id))` for a
    /// skeleton whose split unit is missing.
    fn find_split_unit(
        &mut self,
        header: &UnitHeader<R>,
        top: &Die<R>,
        bases: &UnitBases,
    ) -> Result<Option<(Option<DwoFileId>, u64)>> {
        let dwo_name = match attr_str(&self.dwarf, bases, top, constants::DW_AT_dwo_name)? {
            Some(name) => Some(name),
            None => attr_str(&self.dwarf, bases, top, constants::DW_AT_GNU_dwo_name)?,
        };
        let is_skeleton = matches!(header.type_(), UnitType::Skeleton(_));
        if !is_skeleton && dwo_name.is_none() {
            return Ok(None);
        }
        let signature = header.dwo_id().map(|id| id.0).or_else(|| {
            top.attr(constants::DW_AT_GNU_dwo_id)
                .and_then(Attribute::udata_value)
        });
        let signature = match signature {
            Some(signature) => signature,
            None => {
                complain!(
                    self.complaints,
                    BadAttributeForm,
                    "skeleton unit at 0x{:x} has no dwo_id",
                    header.offset().raw()
                );
                return Ok(None);
            }
        };
        let comp_dir = attr_str(&self.dwarf, bases, top, constants::DW_AT_comp_dir)?;
        let found = self.lookup_dwo_unit(dwo_name.as_deref(), comp_dir.as_deref(), signature, false)?;
        if found.is_none() {
            complain!(
                self.complaints,
                MissingDwo,
                "could not find DWO CU {}(0x{:016x}) referenced by CU at offset 0x{:x}",
                dwo_name.as_deref().unwrap_or("<unknown>"),
                signature,
                header.offset().raw()
            );
        }
        Ok(Some((found, signature)))
    }

    /// Give the split unit's top die the skeleton attributes it lacks,
    /// resolved against the skeleton's file.
    fn inherit_skeleton_attrs(
        &self,
        skeleton: &Die<R>,
        bases: &UnitBases,
        mut top: Die<R>,
    ) -> Result<Die<R>> {
        for name in INHERITED {
            let attr = match skeleton.attr(name) {
                Some(attr) if top.attr(name).is_none() => attr,
                _ => continue,
            };
            let attr = match *attr.value() {
                AttributeValue::DebugAddrIndex(_) => {
                    match self.dwarf.attr_address(&self.dwarf.debug_addr, bases, attr)? {
                        Some(address) => Attribute::new(
                            name,
                            constants::DW_FORM_addr,
                            AttributeValue::Addr(address),
                        ),
                        None => continue,
                    }
                }
                _ if name == constants::DW_AT_comp_dir => Attribute::new(
                    name,
                    constants::DW_FORM_string,
                    AttributeValue::String(self.dwarf.attr_string(bases, attr)?),
                ),
                _ => attr.clone(),
            };
            top.push_attr(attr);
        }
        Ok(top)
    }

    /// Read a unit without following a skeleton and without touching the
    /// cache.
    pub fn read_unit_no_follow(
        &mut self,
        id: UnitId,
        with_dies: bool,
    ) -> Result<Option<UnitSnapshot<R>>> {
        let (header, file) = self.unit_header(id)?;
        if header.is_dummy() {
            return Ok(None);
        }
        let abbrevs = self.abbreviations(file, &header)?;
        let reader = DieReader::new(&header, &abbrevs, &self.complaints)
            .alt(file == UnitFile::Alt)
            .dump(self.options.dump_dies);
        let (top, rest) = match reader.read_top_die()? {
            Some(read) => read,
            None => return Ok(None),
        };
        let bases = UnitBases::from_attrs(header.encoding(), top.attrs());
        let dies = if with_dies {
            Some(reader.read_tree(top.clone(), rest)?)
        } else {
            None
        };
        Ok(Some(UnitSnapshot {
            header,
            file,
            top,
            bases,
            dies,
        }))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::complaint::ComplaintKind;
    use crate::endianity::LittleEndian;
    use crate::loader::tests::MemoryLoader;
    use crate::options::Options;
    use crate::read::{DebugAbbrev, DebugInfo, DebugStr};
    use crate::read::abbrev::tests::AbbrevSectionMethods;
    use crate::split::dwo::tests::{dwo_abbrevs, split_cu, split_tu};
    use crate::split::dwp::tests::v5_index;
    use crate::test_util::{unit, GimliSectionMethods, TestUnitKind};
    use crate::units::context::tests::{abbrevs, dwarf, simple_cu, tu, Slice};
    use std::path::Path;
    use test_assembler::{Endian, Section};

    #[test]
    fn test_load_full_and_partial() {
        let abbrev = abbrevs();
        let info = simple_cu("a.c", "main");
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();

        assert!(ctx.load_unit(UnitId(0), ReadMode::Partial).unwrap());
        let state = ctx.state(UnitId(0)).unwrap();
        assert_eq!(state.name(), Some("a.c"));
        assert_eq!(state.language(), constants::DW_LANG_C99);
        assert!(state.dies().is_none());
        assert_eq!(state.partial_dies().unwrap().len(), 1);

        assert!(ctx.load_unit(UnitId(0), ReadMode::Full).unwrap());
        let state = ctx.state(UnitId(0)).unwrap();
        assert_eq!(state.dies().unwrap().len(), 2);
        assert!(state.partial_dies().is_some());
        assert_eq!(ctx.loaded_units(), &[UnitId(0)]);
    }

    #[test]
    fn test_dummy_unit_has_no_state() {
        let abbrev = abbrevs();
        let info = [unit(4, TestUnitKind::Compile, 0, &[]), simple_cu("b.c", "f")].concat();
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();
        assert_eq!(ctx.comp_units().count(), 2);
        assert!(!ctx.load_unit(UnitId(0), ReadMode::Full).unwrap());
        assert!(!ctx.is_loaded(UnitId(0)));
        assert!(ctx.load_unit(UnitId(1), ReadMode::Full).unwrap());
    }

    #[test]
    fn test_abbrev_offset_out_of_range() {
        let abbrev = abbrevs();
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("a.c")
            .D8(0x0c)
            .D8(0)
            .get_contents()
            .unwrap();
        let first = unit(4, TestUnitKind::Compile, abbrev.len() as u32, &entries);
        let info = [first.clone(), unit(4, TestUnitKind::Compile, 0x1000, &entries)].concat();
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();

        assert_eq!(
            ctx.load_unit(UnitId(0), ReadMode::Full),
            Err(Error::BadAbbrevOffset {
                section: crate::common::SectionId::DebugInfo,
                unit_offset: 0,
                abbrev_offset: abbrev.len(),
            })
        );
        assert_eq!(
            ctx.load_unit(UnitId(1), ReadMode::Partial),
            Err(Error::BadAbbrevOffset {
                section: crate::common::SectionId::DebugInfo,
                unit_offset: first.len(),
                abbrev_offset: 0x1000,
            })
        );
        assert!(!ctx.is_loaded(UnitId(0)));
    }

    #[test]
    fn test_type_unit_from_debug_types() {
        let abbrev = abbrevs();
        let types = tu(0xfeed, "S");
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &[], &types), Options::default()).unwrap();
        let id = ctx.signatured_type(crate::common::DebugTypeSignature(0xfeed)).unwrap();
        assert!(ctx.load_unit(id, ReadMode::Full).unwrap());
        let state = ctx.state(id).unwrap();
        let type_offset = ctx.unit(id).unwrap().type_offset().unwrap();
        let die = state.dies().unwrap().find(type_offset).unwrap();
        assert_eq!(state.dies().unwrap().get(die).tag(), constants::DW_TAG_structure_type);
    }

    /// A DWARF 5 skeleton naming `a.dwo` with a `DW_AT_comp_dir` in
    /// `.debug_str`, and the string section.
    pub(crate) fn skeleton(dwo_id: u64) -> (Vec<u8>, Vec<u8>, Vec<u8>) {
        let abbrev = Section::with_endian(Endian::Little)
            .abbrev(1, constants::DW_TAG_skeleton_unit, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_dwo_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_comp_dir, constants::DW_FORM_strp)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap();
        let strings = b"\0/build\0".to_vec();
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("a.dwo")
            .D32(1)
            .D64(0x1000)
            .get_contents()
            .unwrap();
        (abbrev, unit(5, TestUnitKind::Skeleton(dwo_id), 0, &entries), strings)
    }

    #[test]
    fn test_follow_skeleton_to_dwo() {
        let (abbrev, info, strings) = skeleton(0x77);
        let dwo_abbrev = dwo_abbrevs();
        let dwo_info = [split_cu(0x77), split_tu(0x99, "T")].concat();
        let mut loader = MemoryLoader::default();
        loader.add(
            "/build/a.dwo",
            &[
                (".debug_abbrev.dwo", &dwo_abbrev[..]),
                (".debug_info.dwo", &dwo_info[..]),
            ],
        );
        let main = Dwarf {
            debug_abbrev: DebugAbbrev::new(&abbrev, LittleEndian),
            debug_info: DebugInfo::new(&info, LittleEndian),
            debug_str: DebugStr::new(&strings, LittleEndian),
            ..Dwarf::default()
        };
        let mut ctx = DwarfContext::new(main, Options::default())
            .unwrap()
            .with_loader(&loader);
        assert!(ctx.load_unit(UnitId(0), ReadMode::Full).unwrap());

        let state = ctx.state(UnitId(0)).unwrap();
        assert!(matches!(state.file(), UnitFile::Dwo(_)));
        assert_eq!(state.name(), Some("a.c"));
        assert_eq!(state.comp_dir(), Some("/build"));
        assert_eq!(state.base_address(), Some(0x1000));
        assert_eq!(state.header().type_(), UnitType::SplitCompilation(DwoId(0x77)));
        let dies = state.dies().unwrap();
        assert_eq!(dies.len(), 2);
        assert_eq!(loader.opened.borrow().as_slice(), &[Path::new("/build/a.dwo").to_path_buf()]);

        // The split file's type unit became known when it was opened.
        let tu = ctx.signatured_type(crate::common::DebugTypeSignature(0x99)).unwrap();
        assert_eq!(ctx.unit(tu).unwrap().source(), UnitSource::Dwo(crate::split::DwoFileId(0)));
        assert!(ctx.load_unit(tu, ReadMode::Full).unwrap());
    }

    #[test]
    fn test_missing_dwo_keeps_skeleton() {
        let (abbrev, info, strings) = skeleton(0x77);
        let loader = MemoryLoader::default();
        let main: Dwarf<Slice<'_>> = Dwarf {
            debug_abbrev: DebugAbbrev::new(&abbrev, LittleEndian),
            debug_info: DebugInfo::new(&info, LittleEndian),
            debug_str: DebugStr::new(&strings, LittleEndian),
            ..Dwarf::default()
        };
        let mut ctx = DwarfContext::new(main, Options::default())
            .unwrap()
            .with_loader(&loader);
        assert!(ctx.load_unit(UnitId(0), ReadMode::Full).unwrap());
        let state = ctx.state(UnitId(0)).unwrap();
        assert!(state.is_dwo_missing());
        assert_eq!(state.file(), UnitFile::Main);
        assert_eq!(state.comp_dir(), Some("/build"));
        assert_eq!(ctx.complaints().count(ComplaintKind::MissingDwo), 1);
    }

    #[test]
    fn test_package_without_split_unit_keeps_skeleton() {
        let (abbrev, info, strings) = skeleton(0x77);
        let dwo_abbrev = dwo_abbrevs();
        // The package row for 0x77 holds a unit with another id.
        let dwo_info = split_cu(0x1234);
        let cu_index = v5_index(&[(0x77, 0, dwo_info.len() as u32)], dwo_abbrev.len() as u32);
        let mut loader = MemoryLoader::default();
        loader.add(
            "/bin/a.out.dwp",
            &[
                (".debug_abbrev.dwo", &dwo_abbrev[..]),
                (".debug_info.dwo", &dwo_info[..]),
                (".debug_cu_index", &cu_index[..]),
            ],
        );
        let main = Dwarf {
            debug_abbrev: DebugAbbrev::new(&abbrev, LittleEndian),
            debug_info: DebugInfo::new(&info, LittleEndian),
            debug_str: DebugStr::new(&strings, LittleEndian),
            ..Dwarf::default()
        };
        let options = Options::default().binary_path("/bin/a.out");
        let mut ctx = DwarfContext::new(main, options).unwrap().with_loader(&loader);
        assert!(ctx.load_unit(UnitId(0), ReadMode::Full).unwrap());

        let state = ctx.state(UnitId(0)).unwrap();
        assert!(state.is_dwo_missing());
        assert_eq!(state.file(), UnitFile::Main);
        assert_eq!(state.header().type_(), UnitType::Skeleton(DwoId(0x77)));
        assert_eq!(ctx.complaints().count(ComplaintKind::MissingDwo), 1);
    }

    #[test]
    fn test_no_follow() {
        let (abbrev, info, strings) = skeleton(0x77);
        let main: Dwarf<Slice<'_>> = Dwarf {
            debug_abbrev: DebugAbbrev::new(&abbrev, LittleEndian),
            debug_info: DebugInfo::new(&info, LittleEndian),
            debug_str: DebugStr::new(&strings, LittleEndian),
            ..Dwarf::default()
        };
        let mut ctx = DwarfContext::new(main, Options::default()).unwrap();
        let snapshot = ctx.read_unit_no_follow(UnitId(0), true).unwrap().unwrap();
        assert_eq!(snapshot.top.tag(), constants::DW_TAG_skeleton_unit);
        assert_eq!(snapshot.dies.unwrap().len(), 1);
        assert!(!ctx.is_loaded(UnitId(0)));
        assert_eq!(ctx.complaints().total(), 0);
    }
}
