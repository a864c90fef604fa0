//! Partial symbol tables.
//!
//! A partial symbol table lists the names a unit defines at file or
//! namespace scope, and the addresses its code covers, without expanding
//! the unit. It is built from the unit's partial dies.

use core::ops::Range;

use crate::complaint::complain;
use crate::constants;
use crate::read::{
    AttributeValue, DieReference, PartialDie, PartialDieId, PartialDies, Reader, Result,
    SpecificationInfo, UnitOffset,
};
use crate::units::{DwarfContext, ReadMode, UnitFile, UnitId};

/// The namespace a symbol is looked up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolDomain {
    /// Variables, functions, typedefs and enumerators.
    Var,
    /// Structure, union, class and enumeration tags.
    Struct,
    /// Fortran modules.
    Module,
}

/// A name defined by a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSymbol {
    /// The name, qualified with its enclosing namespaces.
    pub name: String,
    /// The tag of the die that defines it.
    pub tag: constants::DwTag,
    /// The domain it is looked up in.
    pub domain: SymbolDomain,
    /// The entry address of a function.
    pub address: Option<u64>,
}

/// The partial symbol table of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSymtab {
    /// The unit the table was built from.
    pub unit: UnitId,
    /// `DW_AT_name` of the unit die.
    pub filename: Option<String>,
    /// The addresses covered by the unit's code.
    pub pc_range: Option<Range<u64>>,
    /// Symbols visible outside the unit.
    pub global_symbols: Vec<PartialSymbol>,
    /// Symbols local to the unit.
    pub static_symbols: Vec<PartialSymbol>,
    /// The units named by `DW_TAG_imported_unit`.
    pub imported_units: Vec<UnitId>,
}

impl PartialSymtab {
    fn new(unit: UnitId, filename: Option<String>) -> Self {
        PartialSymtab {
            unit,
            filename,
            pc_range: None,
            global_symbols: Vec::new(),
            static_symbols: Vec::new(),
            imported_units: Vec::new(),
        }
    }

    /// Iterate over every symbol, global ones first.
    pub fn symbols(&self) -> impl Iterator<Item = &PartialSymbol> + '_ {
        self.global_symbols.iter().chain(self.static_symbols.iter())
    }

    /// Whether the table defines `name` in `domain`, or in any domain.
    pub fn defines(&self, name: &str, domain: Option<SymbolDomain>) -> bool {
        self.symbols()
            .any(|sym| sym.name == name && domain.map_or(true, |domain| sym.domain == domain))
    }

    fn add(&mut self, symbol: PartialSymbol, global: bool) {
        if global {
            self.global_symbols.push(symbol);
        } else {
            self.static_symbols.push(symbol);
        }
    }

    fn extend_pc_range(&mut self, low: u64, high: u64) {
        if low >= high {
            return;
        }
        self.pc_range = Some(match self.pc_range.take() {
            Some(range) => range.start.min(low)..range.end.max(high),
            None => low..high,
        });
    }
}

fn qualify(scope: Option<&str>, name: &str) -> String {
    match scope {
        Some(scope) if !name.contains("::") => format!("{}::{}", scope, name),
        _ => name.to_string(),
    }
}

struct Scan {
    symtab: PartialSymtab,
    language: constants::DwLang,
    imports: Vec<DieReference>,
    function_range: Option<Range<u64>>,
}

impl Scan {
    fn add_symbol(&mut self, die: &PartialDie, scope: Option<&str>) {
        let name = match die.name.as_deref() {
            Some(name) => qualify(scope, name),
            None => return,
        };
        let cplus = self.language.is_cplus();
        let symbol = |domain, address| PartialSymbol {
            name,
            tag: die.tag,
            domain,
            address,
        };
        match die.tag {
            constants::DW_TAG_subprogram => {
                if !die.has_pc_info && (die.is_external || !die.may_be_inlined) {
                    return;
                }
                let address = die.has_pc_info.then_some(die.low_pc);
                if die.has_pc_info && die.low_pc < die.high_pc {
                    self.function_range = Some(match self.function_range.take() {
                        Some(range) => range.start.min(die.low_pc)..range.end.max(die.high_pc),
                        None => die.low_pc..die.high_pc,
                    });
                }
                self.symtab
                    .add(symbol(SymbolDomain::Var, address), die.is_external);
            }
            constants::DW_TAG_variable | constants::DW_TAG_constant => {
                if die.is_external {
                    if die.has_location || die.has_type {
                        self.symtab.add(symbol(SymbolDomain::Var, None), true);
                    }
                } else if die.has_location || die.has_const_value {
                    self.symtab.add(symbol(SymbolDomain::Var, None), false);
                }
            }
            constants::DW_TAG_typedef
            | constants::DW_TAG_base_type
            | constants::DW_TAG_subrange_type => {
                self.symtab.add(symbol(SymbolDomain::Var, None), false);
            }
            constants::DW_TAG_namespace | constants::DW_TAG_imported_declaration => {
                self.symtab.add(symbol(SymbolDomain::Var, None), true);
            }
            constants::DW_TAG_module => {
                self.symtab.add(symbol(SymbolDomain::Module, None), true);
            }
            constants::DW_TAG_class_type
            | constants::DW_TAG_interface_type
            | constants::DW_TAG_structure_type
            | constants::DW_TAG_union_type
            | constants::DW_TAG_enumeration_type => {
                // An incomplete type has no size and is a declaration.
                if !die.has_byte_size && die.is_declaration {
                    return;
                }
                self.symtab.add(symbol(SymbolDomain::Struct, None), cplus);
            }
            constants::DW_TAG_enumerator => {
                self.symtab.add(symbol(SymbolDomain::Var, None), cplus);
            }
            _ => {}
        }
    }
}

impl<'l, R: Reader> DwarfContext<'l, R> {
    /// Build the partial symbol table of a unit, if it has not been built.
    ///
    /// Returns false for a unit with no dies, which gets an empty table.
    pub fn build_psymtab(&mut self, id: UnitId) -> Result<bool> {
        if self.unit(id)?.psymtab.is_some() {
            return Ok(true);
        }
        if !self.load_unit(id, ReadMode::Partial)? {
            self.units[id.0].psymtab = Some(PartialSymtab::new(id, None));
            return Ok(false);
        }
        let (mut dies, language, filename, file, unit_range) = {
            let state = match self.states.get_mut(&id) {
                Some(state) => state,
                None => return Ok(false),
            };
            let start = state.header.offset().raw();
            (
                state.partial.take().unwrap_or_default(),
                state.language,
                state.name.clone(),
                state.file,
                start..start + state.header.length_including_self(),
            )
        };
        let unit_start = unit_range.start;
        if !matches!(file, UnitFile::Dwo(_)) {
            dies.localize_references(unit_range, file == UnitFile::Alt);
        }

        let mut scan = Scan {
            symtab: PartialSymtab::new(id, filename),
            language,
            imports: Vec::new(),
            function_range: None,
        };
        let top: Vec<PartialDieId> = dies.top_level().map(|(pid, _)| pid).collect();
        self.scan_partial_symbols(id, &mut dies, &top, None, &mut scan);
        for symbol in dies.immediate_symbols() {
            scan.symtab.add(
                PartialSymbol {
                    name: symbol.name.clone(),
                    tag: symbol.tag,
                    domain: SymbolDomain::Var,
                    address: None,
                },
                symbol.is_global,
            );
        }
        if let Some(state) = self.states.get_mut(&id) {
            state.partial = Some(dies);
        }
        let top_range = self.top_pc_range(id)?;

        for reference in core::mem::take(&mut scan.imports) {
            match reference {
                DieReference::Section { offset, alt } => match self.find_containing_unit(offset, alt) {
                    Ok(unit) => scan.symtab.imported_units.push(unit),
                    Err(_) => complain!(
                        self.complaints,
                        DanglingReference,
                        "DW_TAG_imported_unit in unit at 0x{:x} names 0x{:x}, which is not a unit",
                        unit_start,
                        offset.0
                    ),
                },
                _ => complain!(
                    self.complaints,
                    BadAttributeForm,
                    "DW_AT_import in unit at 0x{:x} is not a section reference",
                    unit_start
                ),
            }
        }

        match (top_range, scan.function_range.take()) {
            (Some(range), _) | (None, Some(range)) => scan.symtab.extend_pc_range(range.start, range.end),
            (None, None) => {}
        }
        tracing::trace!(
            unit = id.0,
            globals = scan.symtab.global_symbols.len(),
            statics = scan.symtab.static_symbols.len(),
            "built partial symtab"
        );
        self.units[id.0].psymtab = Some(scan.symtab);
        Ok(true)
    }

    /// Build the partial symbol table of every unit.
    ///
    /// A unit that cannot be read is reported and skipped; the cache is
    /// aged after each unit.
    pub fn build_all_psymtabs(&mut self) -> Result<()> {
        for index in 0..self.units.len() {
            let id = UnitId(index);
            match self.build_psymtab(id) {
                Ok(_) => {}
                Err(err) if err.is_recoverable() => {
                    tracing::warn!(unit = id.0, "skipping unit: {}", err);
                    self.units[id.0].psymtab = Some(PartialSymtab::new(id, None));
                }
                Err(err) => return Err(err),
            }
            self.age_comp_units();
        }
        Ok(())
    }

    /// The unit die's `DW_AT_low_pc` and `DW_AT_high_pc`, as a range.
    fn top_pc_range(&self, id: UnitId) -> Result<Option<Range<u64>>> {
        let state = match self.states.get(&id) {
            Some(state) => state,
            None => return Ok(None),
        };
        let dwarf = self.string_dwarf(state.file);
        let low = match state.top.attr(constants::DW_AT_low_pc) {
            Some(attr) => dwarf.attr_address(&self.dwarf.debug_addr, &state.bases, attr)?,
            None => None,
        };
        let low = match low {
            Some(low) if low != 0 || self.has_section_at_zero => low,
            _ => return Ok(None),
        };
        let high = match state.top.attr(constants::DW_AT_high_pc) {
            Some(attr) => match *attr.value() {
                AttributeValue::Addr(_) | AttributeValue::DebugAddrIndex(_) => {
                    dwarf.attr_address(&self.dwarf.debug_addr, &state.bases, attr)?
                }
                _ => attr.udata_value().map(|size| low.wrapping_add(size)),
            },
            None => None,
        };
        Ok(high.filter(|&high| high > low).map(|high| low..high))
    }

    fn scan_partial_symbols(
        &mut self,
        unit: UnitId,
        dies: &mut PartialDies,
        ids: &[PartialDieId],
        scope: Option<&str>,
        scan: &mut Scan,
    ) {
        let language = scan.language;
        for &pid in ids {
            dies.fixup(pid, language, &mut |reference| {
                self.lookup_specification(unit, reference)
            });
            let die = dies.get(pid).clone();
            match die.tag {
                constants::DW_TAG_imported_unit => {
                    if let Some(import) = die.import {
                        scan.imports.push(import);
                    }
                }
                constants::DW_TAG_namespace | constants::DW_TAG_module => {
                    scan.add_symbol(&die, scope);
                    let inner = die.name.as_deref().map(|name| qualify(scope, name));
                    let children: Vec<PartialDieId> = dies.children(pid).map(|(c, _)| c).collect();
                    self.scan_partial_symbols(unit, dies, &children, inner.as_deref(), scan);
                }
                constants::DW_TAG_enumeration_type => {
                    scan.add_symbol(&die, scope);
                    if !die.is_declaration {
                        let children: Vec<PartialDieId> = dies.children(pid).map(|(c, _)| c).collect();
                        for child in children {
                            let child = dies.get(child).clone();
                            if child.tag == constants::DW_TAG_enumerator {
                                // Enumerators of an unscoped enum live in the enclosing scope.
                                let enum_scope = match (die.is_enum_class, die.name.as_deref()) {
                                    (true, Some(name)) => Some(qualify(scope, name)),
                                    _ => scope.map(str::to_string),
                                };
                                scan.add_symbol(&child, enum_scope.as_deref());
                            }
                        }
                    }
                }
                _ => scan.add_symbol(&die, scope),
            }
        }
    }

    /// Fix up a die in another unit that a specification leads to, and
    /// return its name.
    fn lookup_specification(&mut self, from: UnitId, reference: DieReference) -> Option<SpecificationInfo> {
        let (offset, alt) = match reference {
            DieReference::Section { offset, alt } => (offset, alt),
            _ => return None,
        };
        let target = self.find_containing_unit(offset, alt).ok()?;
        if target == from {
            return None;
        }
        if !self.load_unit(target, ReadMode::Partial).ok()? {
            return None;
        }
        let start = self.units[target.0].offset.raw();
        let state = self.states.get_mut(&target)?;
        let language = state.language;
        let partial = state.partial.as_mut()?;
        let pid = partial.find(UnitOffset(offset.0 - start))?;
        partial.fixup(pid, language, &mut |_| None);
        let die = partial.get(pid);
        Some(SpecificationInfo {
            name: die.name.clone(),
            is_external: die.is_external,
        })
    }

    /// The partial symbol tables built so far.
    pub fn psymtabs(&self) -> impl Iterator<Item = &PartialSymtab> + '_ {
        self.units.iter().filter_map(|unit| unit.psymtab.as_ref())
    }

    /// The compilation units whose partial symbol tables import `id`.
    pub fn importers_of(&self, id: UnitId) -> Vec<UnitId> {
        self.psymtabs()
            .filter(|symtab| symtab.imported_units.contains(&id))
            .map(|symtab| symtab.unit)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::read::abbrev::tests::AbbrevSectionMethods;
    use crate::test_util::{unit, GimliSectionMethods, TestUnitKind};
    use crate::units::context::tests::dwarf;
    use test_assembler::{Endian, Section};

    fn abbrevs() -> Vec<u8> {
        Section::with_endian(Endian::Little)
            .abbrev(1, constants::DW_TAG_compile_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_language, constants::DW_FORM_data1)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr(constants::DW_AT_high_pc, constants::DW_FORM_data4)
            .abbrev_attr_null()
            .abbrev(2, constants::DW_TAG_namespace, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            .abbrev(3, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_external, constants::DW_FORM_flag_present)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr(constants::DW_AT_high_pc, constants::DW_FORM_data4)
            .abbrev_attr_null()
            .abbrev(4, constants::DW_TAG_structure_type, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_byte_size, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev(5, constants::DW_TAG_variable, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_location, constants::DW_FORM_exprloc)
            .abbrev_attr_null()
            .abbrev(6, constants::DW_TAG_enumeration_type, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_byte_size, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev(7, constants::DW_TAG_enumerator, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_const_value, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev(8, constants::DW_TAG_imported_unit, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_import, constants::DW_FORM_ref_addr)
            .abbrev_attr_null()
            .abbrev(9, constants::DW_TAG_partial_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_language, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev(10, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_external, constants::DW_FORM_flag_present)
            .abbrev_attr(constants::DW_AT_declaration, constants::DW_FORM_flag_present)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap()
    }

    fn main_unit(import: u32) -> Vec<u8> {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("a.cc")
            .D8(constants::DW_LANG_C_plus_plus.0 as u8)
            .D64(0x1000)
            .D32(0x100)
            // namespace ns
            .uleb(2)
            .cstr("ns")
            .uleb(3)
            .cstr("f")
            .D64(0x1000)
            .D32(0x10)
            .uleb(4)
            .cstr("S")
            .D8(4)
            .D8(0)
            // static int v
            .uleb(5)
            .cstr("v")
            .uleb(1)
            .D8(0x9c)
            .uleb(6)
            .cstr("E")
            .D8(4)
            .uleb(7)
            .cstr("A")
            .D8(0)
            .D8(0)
            // a declaration has no code
            .uleb(10)
            .cstr("decl")
            .uleb(8)
            .D32(import)
            .D8(0)
            .get_contents()
            .unwrap();
        unit(4, TestUnitKind::Compile, 0, &entries)
    }

    fn partial_unit() -> Vec<u8> {
        let entries = Section::with_endian(Endian::Little)
            .uleb(9)
            .D8(constants::DW_LANG_C_plus_plus.0 as u8)
            .uleb(3)
            .cstr("g")
            .D64(0x2000)
            .D32(0x10)
            .D8(0)
            .get_contents()
            .unwrap();
        unit(4, TestUnitKind::Compile, 0, &entries)
    }

    fn names(symbols: &[PartialSymbol]) -> Vec<&str> {
        symbols.iter().map(|sym| sym.name.as_str()).collect()
    }

    #[test]
    fn test_build_psymtab() {
        let abbrev = abbrevs();
        let main_len = main_unit(0).len();
        let info = [main_unit(main_len as u32 + 11), partial_unit()].concat();
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();

        assert!(ctx.build_psymtab(UnitId(0)).unwrap());
        let symtab = ctx.unit(UnitId(0)).unwrap().psymtab().unwrap();
        assert_eq!(symtab.filename.as_deref(), Some("a.cc"));
        assert_eq!(names(&symtab.global_symbols), vec!["ns", "ns::f", "ns::S", "E", "A"]);
        assert_eq!(names(&symtab.static_symbols), vec!["v"]);
        assert_eq!(symtab.global_symbols[1].address, Some(0x1000));
        assert_eq!(symtab.global_symbols[2].domain, SymbolDomain::Struct);
        assert_eq!(symtab.pc_range, Some(0x1000..0x1100));
        assert_eq!(symtab.imported_units, vec![UnitId(1)]);
        assert!(symtab.defines("ns::f", Some(SymbolDomain::Var)));
        assert!(!symtab.defines("decl", None));

        assert!(ctx.build_psymtab(UnitId(1)).unwrap());
        let symtab = ctx.unit(UnitId(1)).unwrap().psymtab().unwrap();
        assert_eq!(names(&symtab.global_symbols), vec!["g"]);
        // No range on the unit die: the functions give it.
        assert_eq!(symtab.pc_range, Some(0x2000..0x2010));
        assert_eq!(ctx.importers_of(UnitId(1)), vec![UnitId(0)]);
    }

    #[test]
    fn test_build_all_psymtabs() {
        let abbrev = abbrevs();
        let main_len = main_unit(0).len();
        let info = [main_unit(main_len as u32 + 11), partial_unit()].concat();
        let options = Options::default().max_cache_age(0);
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), options).unwrap();
        ctx.build_all_psymtabs().unwrap();
        assert_eq!(ctx.psymtabs().count(), 2);
        assert!(ctx.loaded_units().is_empty());
    }
}
