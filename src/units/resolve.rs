//! Following references between dies.
//!
//! A reference may lead into another unit, which is then loaded and
//! recorded as a dependency of the referring unit so the cache keeps it
//! alive as long as the referrer. References by type signature are looked
//! up in the context's signature table, or, for a unit completed from a
//! split file under an old index, in that split file.

use crate::common::DebugTypeSignature;
use crate::complaint::complain;
use crate::constants;
use crate::read::{Die, DieId, DieReference, Error, Reader, Result, UnitOffset};
use crate::split::DwoFileId;
use crate::units::{DwarfContext, ReadMode, UnitDescriptor, UnitId, UnitSource};

/// A die of a loaded unit.
///
/// A `DieRef` stays meaningful across calls that load and free units, but
/// the die it names can only be read while its unit is loaded in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DieRef {
    /// The unit holding the die.
    pub unit: UnitId,
    /// The die within the unit's tree.
    pub die: DieId,
}

impl<'l, R: Reader> DwarfContext<'l, R> {
    /// The die named by `die`, if its unit is loaded in full.
    pub fn die(&self, die: DieRef) -> Option<&Die<R>> {
        let dies = self.states.get(&die.unit)?.dies.as_ref()?;
        if die.die.0 < dies.len() {
            Some(dies.get(die.die))
        } else {
            None
        }
    }

    /// The die at `offset` in a unit, loading the unit in full if needed.
    pub fn die_at(&mut self, unit: UnitId, offset: UnitOffset) -> Result<Option<DieRef>> {
        if !self.load_full(unit)? {
            return Ok(None);
        }
        Ok(self
            .states
            .get(&unit)
            .and_then(|state| state.dies.as_ref())
            .and_then(|dies| dies.find(offset))
            .map(|die| DieRef { unit, die }))
    }

    /// `DW_AT_name` of a die.
    pub fn die_name(&self, die: DieRef) -> Result<Option<String>> {
        let (state, attr) = match self.states.get(&die.unit).zip(self.die(die)) {
            Some((state, d)) => match d.attr(constants::DW_AT_name) {
                Some(attr) => (state, attr),
                None => return Ok(None),
            },
            None => return Ok(None),
        };
        let name = self.string_dwarf(state.file).attr_string(&state.bases, attr)?;
        Ok(Some(name.to_string_lossy()?.into_owned()))
    }

    fn load_full(&mut self, id: UnitId) -> Result<bool> {
        match self.states.get(&id) {
            Some(state) if state.dies.is_some() => Ok(true),
            _ => self.load_unit(id, ReadMode::Full),
        }
    }

    fn section_offset(&self, die: DieRef) -> usize {
        match (self.states.get(&die.unit), self.die(die)) {
            (Some(state), Some(d)) => state.header.offset().raw() + d.offset().0,
            _ => self.units.get(die.unit.0).map_or(0, |unit| unit.offset.raw()),
        }
    }

    fn dangling(&self, from: DieRef, target: String) -> Error {
        complain!(
            self.complaints,
            DanglingReference,
            "DIE at 0x{:x} refers to {}, which does not exist",
            self.section_offset(from),
            target
        );
        Error::ReferenceUnresolved {
            from: self.section_offset(from),
            target,
        }
    }

    /// Follow the reference held by attribute `attr` of a die.
    pub fn follow_die_ref(&mut self, from: DieRef, attr: constants::DwAt) -> Result<DieRef> {
        let reference = self
            .die(from)
            .and_then(|die| die.attr_value(attr))
            .and_then(DieReference::from_value);
        match reference {
            Some(DieReference::Signature(signature)) => self.follow_die_sig(from, signature),
            Some(reference) => self.follow_die_offset(from, reference),
            None => Err(Error::ReferenceUnresolved {
                from: self.section_offset(from),
                target: format!("{} is not a reference", attr),
            }),
        }
    }

    /// Follow a reference by offset, within the unit or across the
    /// section.
    ///
    /// A unit reached this way is queued for expansion and recorded as a
    /// dependency of the referring unit.
    pub fn follow_die_offset(&mut self, from: DieRef, reference: DieReference) -> Result<DieRef> {
        let (target, offset, description) = match reference {
            DieReference::Unit(offset) => (from.unit, offset, format!("unit offset 0x{:x}", offset.0)),
            DieReference::Section { offset, alt } => {
                let description = format!(
                    "{}offset 0x{:x}",
                    if alt { "alternate file " } else { "" },
                    offset.0
                );
                if self.states.get(&from.unit).and_then(|s| s.dwo_file()).is_some() {
                    return Err(self.dangling(from, format!("{} from a split unit", description)));
                }
                let target = match self.find_containing_unit(offset, alt) {
                    Ok(target) => target,
                    Err(_) => return Err(self.dangling(from, description)),
                };
                let start = self.units[target.0].offset.raw();
                (target, UnitOffset(offset.0 - start), description)
            }
            DieReference::Signature(signature) => return self.follow_die_sig(from, signature),
        };

        if target != from.unit {
            let language = self
                .states
                .get(&from.unit)
                .map_or(constants::DwLang(0), |state| state.language);
            if self.maybe_queue_comp_unit(Some(from.unit), target, language)? {
                self.load_unit(target, ReadMode::Full)?;
            } else {
                self.load_full(target)?;
            }
        } else {
            self.load_full(target)?;
        }

        let die = self
            .states
            .get(&target)
            .and_then(|state| state.dies.as_ref())
            .and_then(|dies| dies.find(offset));
        match die {
            Some(die) => Ok(DieRef { unit: target, die }),
            None => Err(self.dangling(from, description)),
        }
    }

    /// Follow a `DW_FORM_ref_sig8` reference to the type die of its type
    /// unit.
    ///
    /// If no type unit has the signature, a complaint is reported and the
    /// recoverable error names a placeholder type for the caller to use.
    pub fn follow_die_sig(&mut self, from: DieRef, signature: DebugTypeSignature) -> Result<DieRef> {
        let unit = match self.lookup_signatured_type(from.unit, signature)? {
            Some(unit) => unit,
            None => {
                complain!(
                    self.complaints,
                    UnresolvedSignature,
                    "cannot find signatured DIE 0x{:016x} referenced from DIE at 0x{:x}",
                    signature.0,
                    self.section_offset(from)
                );
                return Err(self.unknown_type(from));
            }
        };
        let language = self
            .states
            .get(&from.unit)
            .map_or(constants::DwLang(0), |state| state.language);
        if self.maybe_queue_comp_unit(Some(from.unit), unit, language)? {
            self.load_unit(unit, ReadMode::Full)?;
        } else {
            self.load_full(unit)?;
        }

        let type_offset = self.units[unit.0].type_offset.unwrap_or_default();
        let die = self
            .states
            .get(&unit)
            .and_then(|state| state.dies.as_ref())
            .and_then(|dies| dies.find(type_offset));
        match die {
            Some(die) => Ok(DieRef { unit, die }),
            None => {
                complain!(
                    self.complaints,
                    UnresolvedSignature,
                    "signatured type 0x{:016x} has no DIE at offset 0x{:x}",
                    signature.0,
                    type_offset.0
                );
                Err(self.unknown_type(from))
            }
        }
    }

    fn unknown_type(&self, from: DieRef) -> Error {
        let binary = self
            .options
            .binary_path
            .as_ref()
            .map_or_else(|| "<unknown>".to_string(), |path| path.display().to_string());
        let unit_offset = self.units.get(from.unit.0).map_or(0, |unit| unit.offset.raw());
        Error::ReferenceUnresolved {
            from: self.section_offset(from),
            target: format!(
                "<unknown type in {}, CU 0x{:x}, DIE 0x{:x}>",
                binary,
                unit_offset,
                self.section_offset(from)
            ),
        }
    }

    /// Whether a loaded unit reads its type units from its own split file
    /// rather than through the signature table.
    ///
    /// This is the case for a unit completed from a split file when the
    /// context is driven by a `.gdb_index` of version 7 or older and no
    /// package is in use: such indexes do not list the split files' type
    /// units.
    pub fn stays_in_dwo(&self, id: UnitId) -> bool {
        let in_dwo = self
            .states
            .get(&id)
            .map_or(false, |state| state.dwo_file().is_some());
        in_dwo
            && self.dwp.is_none()
            && self.index_version().map_or(false, |version| version <= 7)
            && self.units.get(id.0).map_or(false, |unit| !unit.is_type_unit())
    }

    /// Find the type unit with `signature`, as seen from unit `from`.
    pub fn lookup_signatured_type(
        &mut self,
        from: UnitId,
        signature: DebugTypeSignature,
    ) -> Result<Option<UnitId>> {
        let dwo = self.states.get(&from).and_then(|state| state.dwo_file());
        if let Some(file) = dwo {
            if self.index_version().map_or(false, |version| version <= 7) {
                self.ensure_dwp()?;
                return if self.dwp.is_none() {
                    Ok(self.lookup_dwo_signatured_type(file, signature))
                } else {
                    self.lookup_dwp_signatured_type(signature)
                };
            }
        }
        Ok(self.signatures.get(&signature).copied())
    }

    /// Find a type unit in a split file, registering it on first use. A
    /// signature already registered from elsewhere is taken over by the
    /// split file's unit.
    fn lookup_dwo_signatured_type(
        &mut self,
        file: DwoFileId,
        signature: DebugTypeSignature,
    ) -> Option<UnitId> {
        let existing = self.signatures.get(&signature).copied();
        if let Some(id) = existing {
            if matches!(self.units[id.0].source, UnitSource::Dwo(_)) {
                return Some(id);
            }
        }
        let (offset, length, version, type_offset) = {
            let unit = self.dwo_files.get(file).type_unit(signature)?;
            (
                unit.header.offset(),
                unit.header.length_including_self(),
                unit.header.version(),
                unit.type_offset.unwrap_or_default(),
            )
        };
        match existing {
            Some(id) => {
                if self.states.contains_key(&id) {
                    self.free_unit(id);
                }
                let unit = &mut self.units[id.0];
                unit.source = UnitSource::Dwo(file);
                unit.offset = offset;
                unit.length = length;
                unit.version = version;
                unit.type_offset = Some(type_offset);
                Some(id)
            }
            None => {
                let mut unit =
                    UnitDescriptor::type_unit(offset, length, UnitSource::Dwo(file), signature, type_offset);
                unit.version = version;
                self.push_type_unit(unit)
            }
        }
    }

    fn lookup_dwp_signatured_type(&mut self, signature: DebugTypeSignature) -> Result<Option<UnitId>> {
        if let Some(&id) = self.signatures.get(&signature) {
            return Ok(Some(id));
        }
        let file = match self.dwp.as_mut() {
            Some(dwp) => dwp.lookup_unit(&mut self.dwo_files, signature.0, true, &self.complaints)?,
            None => None,
        };
        let file = match file {
            Some(file) => file,
            None => return Ok(None),
        };
        Ok(self.lookup_dwo_signatured_type(file, signature))
    }

    /// Queue and load every type unit of a unit's split file, making the
    /// unit depend on them.
    pub(crate) fn queue_and_load_dwo_type_units(&mut self, id: UnitId) -> Result<()> {
        let (file, language) = match self.states.get(&id) {
            Some(state) => match state.dwo_file() {
                Some(file) => (file, state.language),
                None => return Ok(()),
            },
            None => return Ok(()),
        };
        let signatures: Vec<u64> = self
            .dwo_files
            .get(file)
            .type_units()
            .map(|unit| unit.signature)
            .collect();
        tracing::debug!(unit = id.0, type_units = signatures.len(), "loading split type units");
        for signature in signatures {
            let tu = match self.lookup_dwo_signatured_type(file, DebugTypeSignature(signature)) {
                Some(tu) => tu,
                None => continue,
            };
            if self.maybe_queue_comp_unit(Some(id), tu, language)? {
                self.load_unit(tu, ReadMode::Full)?;
            }
        }
        Ok(())
    }

    /// Whether a base type die is the sizeless `void` some ICC versions
    /// emit instead of omitting the type.
    pub fn is_void_base_type(&self, die: DieRef) -> Result<bool> {
        let (state, d) = match self.states.get(&die.unit).zip(self.die(die)) {
            Some(found) => found,
            None => return Ok(false),
        };
        if d.tag() != constants::DW_TAG_base_type || !state.producer.has_integer_void() {
            return Ok(false);
        }
        let sized = d
            .attr(constants::DW_AT_byte_size)
            .and_then(|attr| attr.udata_value())
            .map_or(false, |size| size != 0);
        if sized || self.die_name(die)?.as_deref() != Some("void") {
            return Ok(false);
        }
        complain!(
            self.complaints,
            ProducerQuirk,
            "treating sizeless base type at 0x{:x} as void",
            self.section_offset(die)
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::complaint::ComplaintKind;
    use crate::endianity::LittleEndian;
    use crate::loader::tests::MemoryLoader;
    use crate::options::Options;
    use crate::read::abbrev::tests::AbbrevSectionMethods;
    use crate::read::gdb_index::tests::build_gdb_index;
    use crate::read::{DebugAbbrev, DebugInfo, DebugStr, Dwarf, GdbIndex};
    use crate::split::dwo::tests::{dwo_abbrevs, split_cu, split_tu};
    use crate::test_util::{unit, GimliSectionMethods, TestUnitKind};
    use crate::units::context::tests::{abbrevs, cu, dwarf, simple_cu, tu, Slice};
    use crate::units::cutu::tests::skeleton;
    use crate::units::ExpandedUnits;
    use test_assembler::{Endian, Section};

    fn first_child<R: Reader>(ctx: &DwarfContext<'_, R>, unit: UnitId) -> DieRef {
        let dies = ctx.state(unit).unwrap().dies().unwrap();
        let (die, _) = dies.children(dies.root().unwrap()).next().unwrap();
        DieRef { unit, die }
    }

    fn var_ref_addr(target: u32) -> Vec<u8> {
        cu("a.c", Section::with_endian(Endian::Little).uleb(5).cstr("v").D32(target))
    }

    #[test]
    fn test_ref_addr_across_units() {
        let abbrev = abbrevs();
        let a_len = var_ref_addr(0).len();
        // Header, then the unit die: code, "b.c", language.
        let target = a_len + 11 + 6;
        let info = [var_ref_addr(target as u32), simple_cu("b.c", "f")].concat();
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();
        let (a, b) = (UnitId(0), UnitId(1));
        ctx.load_unit(a, ReadMode::Full).unwrap();
        let var = first_child(&ctx, a);

        let found = ctx.follow_die_ref(var, constants::DW_AT_type).unwrap();
        assert_eq!(found.unit, b);
        assert_eq!(ctx.die(found).unwrap().tag(), constants::DW_TAG_subprogram);
        assert_eq!(ctx.die_name(found).unwrap().as_deref(), Some("f"));
        assert!(ctx.state(a).unwrap().dependencies().contains(&b));
        assert!(ctx.unit(b).unwrap().is_queued());
    }

    #[test]
    fn test_dangling_ref_addr() {
        let abbrev = abbrevs();
        let info = var_ref_addr(0x1000);
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();
        ctx.load_unit(UnitId(0), ReadMode::Full).unwrap();
        let var = first_child(&ctx, UnitId(0));

        let err = ctx.follow_die_ref(var, constants::DW_AT_type).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(ctx.complaints().count(ComplaintKind::DanglingReference), 1);
        // Not a reference at all.
        assert!(ctx.follow_die_ref(var, constants::DW_AT_name).is_err());
    }

    #[test]
    fn test_ref_sig8() {
        let abbrev = abbrevs();
        let info = [
            cu("a.c", Section::with_endian(Endian::Little).uleb(6).cstr("s").D64(0xfeed)),
            cu("b.c", Section::with_endian(Endian::Little).uleb(6).cstr("t").D64(0xdead)),
        ]
        .concat();
        let types = tu(0xfeed, "S");
        let mut options = Options::default();
        options.binary_path = Some("/bin/prog".into());
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &types), options).unwrap();

        ctx.load_unit(UnitId(0), ReadMode::Full).unwrap();
        let var = first_child(&ctx, UnitId(0));
        let found = ctx.follow_die_ref(var, constants::DW_AT_type).unwrap();
        let tu = ctx.signatured_type(DebugTypeSignature(0xfeed)).unwrap();
        assert_eq!(found.unit, tu);
        assert_eq!(ctx.die(found).unwrap().tag(), constants::DW_TAG_structure_type);
        assert_eq!(ctx.die_name(found).unwrap().as_deref(), Some("S"));

        ctx.load_unit(UnitId(1), ReadMode::Full).unwrap();
        let var = first_child(&ctx, UnitId(1));
        match ctx.follow_die_ref(var, constants::DW_AT_type) {
            Err(Error::ReferenceUnresolved { target, .. }) => {
                assert!(target.starts_with("<unknown type in /bin/prog, CU 0x"), "{}", target);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(ctx.complaints().count(ComplaintKind::UnresolvedSignature), 1);
    }

    fn split_context<'a>(
        loader: &'a MemoryLoader<'a>,
        abbrev: &'a [u8],
        info: &'a [u8],
        strings: &'a [u8],
        index: &'a [u8],
    ) -> DwarfContext<'a, Slice<'a>> {
        let main = Dwarf {
            debug_abbrev: DebugAbbrev::new(abbrev, LittleEndian),
            debug_info: DebugInfo::new(info, LittleEndian),
            debug_str: DebugStr::new(strings, LittleEndian),
            ..Dwarf::default()
        };
        let index = GdbIndex::parse(Slice::new(index, LittleEndian), false)
            .unwrap()
            .unwrap();
        DwarfContext::from_gdb_index(main, index, Options::default())
            .unwrap()
            .with_loader(loader)
    }

    fn split_loader<'a>(dwo_abbrev: &'a [u8], dwo_info: &'a [u8]) -> MemoryLoader<'a> {
        let mut loader = MemoryLoader::default();
        loader.add(
            "/build/a.dwo",
            &[
                (".debug_abbrev.dwo", dwo_abbrev),
                (".debug_info.dwo", dwo_info),
            ],
        );
        loader
    }

    #[test]
    fn test_old_index_reads_types_from_dwo() {
        let (abbrev, info, strings) = skeleton(0x77);
        let dwo_abbrev = dwo_abbrevs();
        let dwo_info = [split_cu(0x77), split_tu(0x99, "T")].concat();
        let loader = split_loader(&dwo_abbrev, &dwo_info);
        let index = build_gdb_index(7, &[(0, info.len() as u64)], &[], &[]);
        let mut ctx = split_context(&loader, &abbrev, &info, &strings, &index);

        let mut expanded = ExpandedUnits::default();
        ctx.expand_unit(UnitId(0), &mut expanded).unwrap();
        assert!(ctx.stays_in_dwo(UnitId(0)));
        let tu = ctx.signatured_type(DebugTypeSignature(0x99)).unwrap();
        assert_eq!(expanded.units, vec![UnitId(0), tu]);
        assert!(matches!(ctx.unit(tu).unwrap().source(), UnitSource::Dwo(_)));
        assert!(ctx.state(UnitId(0)).unwrap().dependencies().contains(&tu));
        assert_eq!(
            ctx.lookup_signatured_type(UnitId(0), DebugTypeSignature(0x99)).unwrap(),
            Some(tu)
        );
        assert_eq!(
            ctx.lookup_signatured_type(UnitId(0), DebugTypeSignature(0x42)).unwrap(),
            None
        );
    }

    #[test]
    fn test_new_index_uses_signature_table() {
        let (abbrev, info, strings) = skeleton(0x77);
        let dwo_abbrev = dwo_abbrevs();
        let dwo_info = [split_cu(0x77), split_tu(0x99, "T")].concat();
        let loader = split_loader(&dwo_abbrev, &dwo_info);
        let index = build_gdb_index(8, &[(0, info.len() as u64)], &[], &[]);
        let mut ctx = split_context(&loader, &abbrev, &info, &strings, &index);

        ctx.load_unit(UnitId(0), ReadMode::Full).unwrap();
        assert!(!ctx.stays_in_dwo(UnitId(0)));
        assert_eq!(
            ctx.lookup_signatured_type(UnitId(0), DebugTypeSignature(0x99)).unwrap(),
            None
        );
    }

    #[test]
    fn test_icc_void() {
        let abbrev = Section::with_endian(Endian::Little)
            .abbrev(1, constants::DW_TAG_compile_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_producer, constants::DW_FORM_string)
            .abbrev_attr_null()
            .abbrev(2, constants::DW_TAG_base_type, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap();
        let entries = |producer: &str| {
            Section::with_endian(Endian::Little)
                .uleb(1)
                .cstr(producer)
                .uleb(2)
                .cstr("void")
                .D8(0)
                .get_contents()
                .unwrap()
        };
        let info = [
            unit(4, TestUnitKind::Compile, 0, &entries("Intel(R) C Intel(R) 64 Compiler XE for applications running on Intel(R) 64, Version 13.0")),
            unit(4, TestUnitKind::Compile, 0, &entries("GNU C17 11.2.0")),
        ]
        .concat();
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();
        ctx.load_unit(UnitId(0), ReadMode::Full).unwrap();
        ctx.load_unit(UnitId(1), ReadMode::Full).unwrap();
        assert!(ctx.is_void_base_type(first_child(&ctx, UnitId(0))).unwrap());
        assert!(!ctx.is_void_base_type(first_child(&ctx, UnitId(1))).unwrap());
        assert_eq!(ctx.complaints().count(ComplaintKind::ProducerQuirk), 1);
    }
}
