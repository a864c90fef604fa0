use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use crate::common::{DebugInfoOffset, DebugTypeSignature, DebugTypesOffset, SectionId};
use crate::complaint::{complain, Complaints};
use crate::loader::{FileLoader, ObjectSections};
use crate::options::Options;
use crate::read::{AbbreviationsCache, Dwarf, Error, GdbIndex, Reader, Result, UnitHeader, UnitType};
use crate::split::{dwp_candidates, DwoFileId, DwoFiles, DwpFile, DwzFile, GnuDebugAltLink};
use crate::units::{
    QueueItem, TypeUnitGroups, UnitDescriptor, UnitId, UnitKind, UnitSource, UnitState,
};

/// The unit manager for one object file.
///
/// The context owns the sections of the object file and of every file
/// reached from it, a descriptor for each unit, and the cache of decoded
/// unit states.
///
/// A context is used from one thread at a time. Loading a unit may free
/// others, so dies borrowed from a context cannot be held across calls
/// that take it mutably; keep [`DieRef`](crate::units::DieRef)s instead.
pub struct DwarfContext<'l, R: Reader> {
    pub(crate) options: Options,
    pub(crate) complaints: Complaints,
    pub(crate) dwarf: Dwarf<R>,
    pub(crate) dwz_path: Option<PathBuf>,
    pub(crate) abbrevs: AbbreviationsCache,
    pub(crate) alt_abbrevs: AbbreviationsCache,
    pub(crate) units: Vec<UnitDescriptor>,
    pub(crate) n_comp_units: usize,
    pub(crate) signatures: HashMap<DebugTypeSignature, UnitId>,
    pub(crate) states: HashMap<UnitId, UnitState<R>>,
    pub(crate) read_in: Vec<UnitId>,
    pub(crate) queue: VecDeque<QueueItem>,
    pub(crate) dwo_files: DwoFiles<R>,
    pub(crate) registered_dwo: HashSet<DwoFileId>,
    pub(crate) dwp: Option<DwpFile<R>>,
    pub(crate) dwp_searched: bool,
    pub(crate) loader: Option<&'l dyn FileLoader<R>>,
    pub(crate) type_unit_groups: TypeUnitGroups,
    pub(crate) gdb_index: Option<GdbIndex<R>>,
    pub(crate) index_units: Vec<UnitId>,
    pub(crate) has_section_at_zero: bool,
}

impl<'l, R: Reader> core::fmt::Debug for DwarfContext<'l, R> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DwarfContext")
            .field("units", &self.units.len())
            .field("comp_units", &self.n_comp_units)
            .field("loaded", &self.states.len())
            .field("dwo_files", &self.dwo_files.len())
            .field("index_version", &self.index_version())
            .finish_non_exhaustive()
    }
}

fn descriptor_for<R: Reader>(header: &UnitHeader<R>, source: UnitSource) -> UnitDescriptor {
    let mut unit = match header.type_() {
        UnitType::Type {
            type_signature,
            type_offset,
        }
        | UnitType::SplitType {
            type_signature,
            type_offset,
        } => UnitDescriptor::type_unit(
            header.offset(),
            header.length_including_self(),
            source,
            type_signature,
            type_offset,
        ),
        UnitType::Partial => UnitDescriptor {
            kind: UnitKind::Partial,
            ..UnitDescriptor::new(header.offset(), header.length_including_self(), source)
        },
        _ => UnitDescriptor::new(header.offset(), header.length_including_self(), source),
    };
    unit.version = header.version();
    unit
}

impl<'l, R: Reader> DwarfContext<'l, R> {
    fn empty(dwarf: Dwarf<R>, options: Options) -> Self {
        DwarfContext {
            complaints: Complaints::new(options.complaint_limit),
            options,
            dwarf,
            dwz_path: None,
            abbrevs: AbbreviationsCache::new(),
            alt_abbrevs: AbbreviationsCache::new(),
            units: Vec::new(),
            n_comp_units: 0,
            signatures: HashMap::new(),
            states: HashMap::new(),
            read_in: Vec::new(),
            queue: VecDeque::new(),
            dwo_files: DwoFiles::default(),
            registered_dwo: HashSet::new(),
            dwp: None,
            dwp_searched: false,
            loader: None,
            type_unit_groups: TypeUnitGroups::default(),
            gdb_index: None,
            index_units: Vec::new(),
            has_section_at_zero: false,
        }
    }

    /// Create a context by reading every unit header in the sections.
    ///
    /// Units of the alternate file set with [`Dwarf::set_sup`] are
    /// included.
    pub fn new(dwarf: Dwarf<R>, options: Options) -> Result<Self> {
        let mut ctx = DwarfContext::empty(dwarf, options);
        let mut comps = Vec::new();
        let mut types = Vec::new();
        {
            let mut add = |unit: UnitDescriptor| {
                if unit.is_type_unit() {
                    types.push(unit);
                } else {
                    comps.push(unit);
                }
            };
            let mut headers = ctx.dwarf.units();
            while let Some(header) = headers.next()? {
                add(descriptor_for(&header, UnitSource::Main));
            }
            if let Some(sup) = ctx.dwarf.sup() {
                let mut headers = sup.units();
                while let Some(header) = headers.next()? {
                    add(descriptor_for(&header, UnitSource::Alt));
                }
            }
            let mut headers = ctx.dwarf.type_units();
            while let Some(header) = headers.next()? {
                add(descriptor_for(&header, UnitSource::Main));
            }
        }
        ctx.install(comps, types);
        tracing::debug!(
            comp_units = ctx.n_comp_units,
            type_units = ctx.units.len() - ctx.n_comp_units,
            "read unit headers"
        );
        Ok(ctx)
    }

    /// Create a context from the unit lists of a `.gdb_index`.
    ///
    /// Unit headers are not read until the units are. The alternate
    /// file's units are read from its headers and numbered after the
    /// index's compilation units.
    pub fn from_gdb_index(dwarf: Dwarf<R>, index: GdbIndex<R>, options: Options) -> Result<Self> {
        let mut ctx = DwarfContext::empty(dwarf, options);
        let mut comps: Vec<UnitDescriptor> = index
            .units()
            .iter()
            .map(|unit| UnitDescriptor::new(unit.offset.into(), unit.length, UnitSource::Main))
            .collect();
        if let Some(sup) = ctx.dwarf.sup() {
            let mut headers = sup.units();
            while let Some(header) = headers.next()? {
                comps.push(descriptor_for(&header, UnitSource::Alt));
            }
        }
        let types = index
            .type_units()
            .iter()
            .map(|unit| {
                UnitDescriptor::type_unit(
                    unit.offset.into(),
                    0,
                    UnitSource::Main,
                    unit.signature,
                    unit.type_offset,
                )
            })
            .collect::<Vec<_>>();

        // Index order is not necessarily section order.
        let n_comps = comps.len();
        let mut order: Vec<usize> = (0..n_comps).collect();
        order.sort_by_key(|&i| (comps[i].is_dwz(), comps[i].offset.raw()));
        let mut index_units = vec![UnitId(0); n_comps];
        let mut sorted = Vec::with_capacity(n_comps);
        for (new, &old) in order.iter().enumerate() {
            index_units[old] = UnitId(new);
            sorted.push(comps[old].clone());
        }
        ctx.install(sorted, types);
        // A duplicated signature maps to the unit that kept it.
        for unit in index.type_units() {
            if let Some(&id) = ctx.signatures.get(&unit.signature) {
                index_units.push(id);
            }
        }
        ctx.index_units = index_units;
        tracing::debug!(
            version = index.version(),
            comp_units = ctx.n_comp_units,
            type_units = ctx.units.len() - ctx.n_comp_units,
            "using .gdb_index"
        );
        ctx.gdb_index = Some(index);
        Ok(ctx)
    }

    /// Open the debug info of an object file.
    ///
    /// The alternate file named by `.gnu_debugaltlink` is found and
    /// attached first; failing to find it is an error. Unless
    /// [`Options::read_now`] is set, a usable `.gdb_index` drives unit
    /// enumeration. Split files and packages are opened through `loader`
    /// when first needed.
    pub fn open(
        loader: &'l dyn FileLoader<R>,
        sections: &ObjectSections<R>,
        mut options: Options,
    ) -> Result<Self> {
        if options.binary_path.is_none() {
            options.binary_path = Some(sections.path.clone());
        }
        let mut dwarf = sections.dwarf();
        let mut dwz_path = None;
        if let Some(link) = sections.section(SectionId::GnuDebugAltLink.name()) {
            let link = GnuDebugAltLink::from(link.clone());
            let dwz = DwzFile::open(
                loader,
                &link,
                options.binary_path.as_deref(),
                &options.debug_file_directories,
            )?;
            dwz_path = Some(dwz.path().to_path_buf());
            dwarf.set_sup(dwz.into_dwarf());
        }

        let index = match dwarf.gdb_index.clone() {
            Some(section) if !options.read_now => {
                GdbIndex::parse(section, options.use_deprecated_index_sections)?
            }
            _ => None,
        };
        let mut ctx = match index {
            Some(index) => DwarfContext::from_gdb_index(dwarf, index, options)?,
            None => DwarfContext::new(dwarf, options)?,
        };
        ctx.loader = Some(loader);
        ctx.dwz_path = dwz_path;
        ctx.has_section_at_zero = sections.has_section_at_zero;
        Ok(ctx)
    }

    /// Use `loader` to open split files and packages.
    pub fn with_loader(mut self, loader: &'l dyn FileLoader<R>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Whether the object file has a section at address zero, which makes
    /// a zero `DW_AT_low_pc` valid.
    pub fn with_section_at_zero(mut self, value: bool) -> Self {
        self.has_section_at_zero = value;
        self
    }

    fn install(&mut self, comps: Vec<UnitDescriptor>, types: Vec<UnitDescriptor>) {
        self.n_comp_units = comps.len();
        self.units = comps;
        for unit in types {
            self.push_type_unit(unit);
        }
    }

    /// Add a type unit, unless another one already has its signature.
    pub(crate) fn push_type_unit(&mut self, unit: UnitDescriptor) -> Option<UnitId> {
        let signature = unit.signature?;
        if let Some(&existing) = self.signatures.get(&signature) {
            complain!(
                self.complaints,
                DuplicateSignature,
                "debug type entry at offset 0x{:x} is duplicate to the entry at offset 0x{:x}, signature 0x{:016x}",
                unit.offset.raw(),
                self.units[existing.0].offset.raw(),
                signature.0
            );
            return None;
        }
        let id = UnitId(self.units.len());
        self.units.push(unit);
        self.signatures.insert(signature, id);
        Some(id)
    }

    /// The options the context was created with.
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The complaints reported so far.
    pub fn complaints(&self) -> &Complaints {
        &self.complaints
    }

    /// The sections of the main object file.
    pub fn dwarf(&self) -> &Dwarf<R> {
        &self.dwarf
    }

    /// Where the alternate file was found, if one was attached by
    /// [`open`](Self::open).
    pub fn dwz_path(&self) -> Option<&Path> {
        self.dwz_path.as_deref()
    }

    /// The `.gdb_index` driving the context, if any.
    pub fn gdb_index(&self) -> Option<&GdbIndex<R>> {
        self.gdb_index.as_ref()
    }

    /// The version of the `.gdb_index` in use.
    pub fn index_version(&self) -> Option<u32> {
        self.gdb_index.as_ref().map(GdbIndex::version)
    }

    /// The unit numbered `index` in the `.gdb_index`.
    pub fn unit_for_index(&self, index: u32) -> Option<UnitId> {
        self.index_units.get(index as usize).copied()
    }

    /// The descriptor of a unit.
    pub fn unit(&self, id: UnitId) -> Result<&UnitDescriptor> {
        self.units.get(id.0).ok_or(Error::InvalidUnitId(id.0))
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> Result<&mut UnitDescriptor> {
        self.units.get_mut(id.0).ok_or(Error::InvalidUnitId(id.0))
    }

    /// The number of units, including type units found so far.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// The compilation and partial units, in `(is_dwz, offset)` order.
    pub fn comp_units(&self) -> impl Iterator<Item = UnitId> + '_ {
        (0..self.n_comp_units).map(UnitId)
    }

    /// The type units found so far.
    pub fn type_units(&self) -> impl Iterator<Item = UnitId> + '_ {
        (self.n_comp_units..self.units.len()).map(UnitId)
    }

    /// The type unit registered for a signature.
    pub fn signatured_type(&self, signature: DebugTypeSignature) -> Option<UnitId> {
        self.signatures.get(&signature).copied()
    }

    /// The decoded state of a loaded unit.
    pub fn state(&self, id: UnitId) -> Option<&UnitState<R>> {
        self.states.get(&id)
    }

    /// Whether a unit is loaded.
    pub fn is_loaded(&self, id: UnitId) -> bool {
        self.states.contains_key(&id)
    }

    /// The loaded units, in the order they were loaded.
    pub fn loaded_units(&self) -> &[UnitId] {
        &self.read_in
    }

    /// The split files opened so far.
    pub fn dwo_files(&self) -> &DwoFiles<R> {
        &self.dwo_files
    }

    /// The package, if one was found.
    pub fn dwp(&self) -> Option<&DwpFile<R>> {
        self.dwp.as_ref()
    }

    /// Find the compilation unit containing a `.debug_info` offset of the
    /// main or alternate file.
    pub fn find_containing_unit(&self, offset: DebugInfoOffset, is_dwz: bool) -> Result<UnitId> {
        let comps = &self.units[..self.n_comp_units];
        let key = (is_dwz, offset.0);
        let pos = comps.partition_point(|unit| (unit.is_dwz(), unit.offset.raw()) <= key);
        let candidate = pos.checked_sub(1).map(|i| (i, &comps[i]));
        match candidate {
            Some((i, unit))
                if unit.is_dwz() == is_dwz
                    && !unit.offset.is_types()
                    && unit.contains(offset.0) =>
            {
                Ok(UnitId(i))
            }
            _ => Err(Error::OffsetOutOfBounds {
                section: SectionId::DebugInfo,
                offset: offset.0,
            }),
        }
    }

    /// Open the package beside the binary, the first time it is needed.
    pub(crate) fn ensure_dwp(&mut self) -> Result<()> {
        if self.dwp_searched {
            return Ok(());
        }
        self.dwp_searched = true;
        let (loader, binary) = match (self.loader, self.options.binary_path.as_deref()) {
            (Some(loader), Some(binary)) => (loader, binary),
            _ => return Ok(()),
        };
        let candidates = dwp_candidates(binary, self.options.original_binary_path.as_deref());
        self.dwp = DwpFile::open(loader, &candidates)?;
        if self.dwp.is_some() && self.gdb_index.is_none() {
            self.register_dwp_type_units()?;
        }
        Ok(())
    }

    /// Without an index, every type unit of the package is known up front,
    /// to be located when first read.
    fn register_dwp_type_units(&mut self) -> Result<()> {
        let entries = match self.dwp.as_ref() {
            Some(dwp) => dwp.tu_index().entries()?,
            None => return Ok(()),
        };
        for (signature, _) in entries {
            let signature = DebugTypeSignature(signature);
            if self.signatures.contains_key(&signature) {
                continue;
            }
            self.push_type_unit(UnitDescriptor::type_unit(
                DebugTypesOffset(0).into(),
                0,
                UnitSource::Dwp,
                signature,
                Default::default(),
            ));
        }
        Ok(())
    }

    /// Without an index, the type units of a split file are registered when
    /// the file is opened.
    fn register_dwo_type_units(&mut self, file: DwoFileId) {
        if self.gdb_index.is_some() || !self.registered_dwo.insert(file) {
            return;
        }
        let units: Vec<UnitDescriptor> = self
            .dwo_files
            .get(file)
            .type_units()
            .map(|unit| {
                let mut descriptor = UnitDescriptor::type_unit(
                    unit.header.offset(),
                    unit.header.length_including_self(),
                    UnitSource::Dwo(file),
                    DebugTypeSignature(unit.signature),
                    unit.type_offset.unwrap_or_default(),
                );
                descriptor.version = unit.header.version();
                descriptor
            })
            .collect();
        for unit in units {
            // A type in several split files is normal.
            if unit
                .signature
                .map_or(false, |s| self.signatures.contains_key(&s))
            {
                continue;
            }
            self.push_type_unit(unit);
        }
    }

    /// Find the split unit with the given `dwo_id` or signature, in the
    /// package if there is one, otherwise in the split file `name`.
    pub(crate) fn lookup_dwo_unit(
        &mut self,
        name: Option<&str>,
        comp_dir: Option<&str>,
        signature: u64,
        is_type_unit: bool,
    ) -> Result<Option<DwoFileId>> {
        self.ensure_dwp()?;
        if let Some(dwp) = self.dwp.as_mut() {
            return dwp.lookup_unit(&mut self.dwo_files, signature, is_type_unit, &self.complaints);
        }
        let (loader, name) = match (self.loader, name) {
            (Some(loader), Some(name)) => (loader, name),
            _ => return Ok(None),
        };
        let file = match self.dwo_files.open(
            loader,
            name,
            comp_dir,
            &self.options.dwo_search_path,
            &self.complaints,
        )? {
            Some(file) => file,
            None => return Ok(None),
        };
        self.register_dwo_type_units(file);
        let dwo = self.dwo_files.get(file);
        let found = if is_type_unit {
            dwo.type_unit(DebugTypeSignature(signature)).is_some()
        } else {
            dwo.compile_unit(crate::common::DwoId(signature)).is_some()
        };
        Ok(found.then_some(file))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::common::UnitSectionOffset;
    use crate::complaint::ComplaintKind;
    use crate::constants;
    use crate::endianity::LittleEndian;
    use crate::read::abbrev::tests::AbbrevSectionMethods;
    use crate::read::{DebugAbbrev, DebugInfo, DebugTypes, EndianSlice};
    use crate::test_util::{unit, GimliSectionMethods, TestUnitKind};
    use test_assembler::{Endian, Section};

    pub(crate) type Slice<'a> = EndianSlice<'a, LittleEndian>;

    /// Abbreviations used by the unit tests of this module:
    /// 1 compile unit (name, language, children), 2 subprogram (name),
    /// 3 type unit (children), 4 structure (name), 5 variable with a
    /// `DW_FORM_ref_addr` type, 6 variable with a `DW_FORM_ref_sig8` type,
    /// 7 base type (name, byte size).
    pub(crate) fn abbrevs() -> Vec<u8> {
        Section::with_endian(Endian::Little)
            .abbrev(1, constants::DW_TAG_compile_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_language, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev(2, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            .abbrev(3, constants::DW_TAG_type_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr_null()
            .abbrev(4, constants::DW_TAG_structure_type, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            .abbrev(5, constants::DW_TAG_variable, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_type, constants::DW_FORM_ref_addr)
            .abbrev_attr_null()
            .abbrev(6, constants::DW_TAG_variable, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_type, constants::DW_FORM_ref_sig8)
            .abbrev_attr_null()
            .abbrev(7, constants::DW_TAG_base_type, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_byte_size, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap()
    }

    /// A DWARF 4 compile unit named `name` whose children are `children`.
    pub(crate) fn cu(name: &str, children: Section) -> Vec<u8> {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr(name)
            .D8(constants::DW_LANG_C99.0 as u8)
            .append_section(children)
            .D8(0)
            .get_contents()
            .unwrap();
        unit(4, TestUnitKind::Compile, 0, &entries)
    }

    /// A compile unit holding one subprogram.
    pub(crate) fn simple_cu(name: &str, function: &str) -> Vec<u8> {
        cu(
            name,
            Section::with_endian(Endian::Little).uleb(2).cstr(function),
        )
    }

    /// A DWARF 4 `.debug_types` unit defining struct `name`.
    pub(crate) fn tu(signature: u64, name: &str) -> Vec<u8> {
        let entries = Section::with_endian(Endian::Little)
            .uleb(3)
            .uleb(4)
            .cstr(name)
            .D8(0)
            .get_contents()
            .unwrap();
        unit(
            4,
            TestUnitKind::Type {
                signature,
                type_die: 1,
            },
            0,
            &entries,
        )
    }

    pub(crate) fn dwarf<'a>(abbrev: &'a [u8], info: &'a [u8], types: &'a [u8]) -> Dwarf<Slice<'a>> {
        Dwarf {
            debug_abbrev: DebugAbbrev::new(abbrev, LittleEndian),
            debug_info: DebugInfo::new(info, LittleEndian),
            debug_types: DebugTypes::new(types, LittleEndian),
            ..Dwarf::default()
        }
    }

    #[test]
    fn test_enumerate_and_find() {
        let abbrev = abbrevs();
        let a = simple_cu("a.c", "main");
        let b = simple_cu("b.c", "helper");
        let info = [a.clone(), b].concat();
        let types = [tu(0x1234, "S"), tu(0x1234, "T")].concat();
        let ctx = DwarfContext::new(dwarf(&abbrev, &info, &types), Options::default()).unwrap();

        assert_eq!(ctx.comp_units().count(), 2);
        assert_eq!(ctx.type_units().count(), 1);
        assert_eq!(ctx.complaints().count(ComplaintKind::DuplicateSignature), 1);
        let tu = ctx.signatured_type(DebugTypeSignature(0x1234)).unwrap();
        assert_eq!(
            ctx.unit(tu).unwrap().offset(),
            UnitSectionOffset::from(DebugTypesOffset(0))
        );

        assert_eq!(ctx.find_containing_unit(DebugInfoOffset(0), false), Ok(UnitId(0)));
        assert_eq!(
            ctx.find_containing_unit(DebugInfoOffset(a.len() - 1), false),
            Ok(UnitId(0))
        );
        assert_eq!(
            ctx.find_containing_unit(DebugInfoOffset(a.len()), false),
            Ok(UnitId(1))
        );
        assert_eq!(
            ctx.find_containing_unit(DebugInfoOffset(info.len()), false),
            Err(Error::OffsetOutOfBounds {
                section: SectionId::DebugInfo,
                offset: info.len()
            })
        );
        assert!(ctx.find_containing_unit(DebugInfoOffset(0), true).is_err());
        assert_eq!(ctx.unit(UnitId(7)).err(), Some(Error::InvalidUnitId(7)));
    }

    #[test]
    fn test_dwz_units_sort_after_main() {
        let abbrev = abbrevs();
        let main = simple_cu("a.c", "main");
        let alt = simple_cu("common.h", "shared");
        let mut main_dwarf = dwarf(&abbrev, &main, &[]);
        main_dwarf.set_sup(dwarf(&abbrev, &alt, &[]));
        let ctx = DwarfContext::new(main_dwarf, Options::default()).unwrap();

        assert_eq!(ctx.comp_units().count(), 2);
        assert!(!ctx.unit(UnitId(0)).unwrap().is_dwz());
        assert!(ctx.unit(UnitId(1)).unwrap().is_dwz());
        assert_eq!(ctx.find_containing_unit(DebugInfoOffset(4), true), Ok(UnitId(1)));
        assert_eq!(ctx.find_containing_unit(DebugInfoOffset(4), false), Ok(UnitId(0)));
    }

    #[test]
    fn test_index_order() {
        use crate::read::gdb_index::tests::build_gdb_index;

        let abbrev = abbrevs();
        let a = simple_cu("a.c", "main");
        let b = simple_cu("b.c", "helper");
        let info = [a.clone(), b.clone()].concat();
        // The index lists the second unit first.
        let index = build_gdb_index(
            7,
            &[(a.len() as u64, b.len() as u64), (0, a.len() as u64)],
            &[],
            &[],
        );
        let index = GdbIndex::parse(Slice::new(&index, LittleEndian), false)
            .unwrap()
            .unwrap();
        let ctx =
            DwarfContext::from_gdb_index(dwarf(&abbrev, &info, &[]), index, Options::default())
                .unwrap();
        assert_eq!(ctx.index_version(), Some(7));
        assert_eq!(ctx.unit_for_index(0), Some(UnitId(1)));
        assert_eq!(ctx.unit_for_index(1), Some(UnitId(0)));
        assert_eq!(ctx.unit(UnitId(0)).unwrap().offset().raw(), 0);
        assert_eq!(ctx.unit(UnitId(0)).unwrap().version(), 0);
    }
}
