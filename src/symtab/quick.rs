//! Finding the units to expand for a lookup.
//!
//! Two implementations answer the same questions: [`IndexFunctions`] reads
//! a `.gdb_index`, and [`PartialSymbolFunctions`] searches the partial
//! symbol tables built when the object file was opened. Which one a
//! context uses is decided by [`select_quick_symbols`].

use core::fmt;

use crate::complaint::complain;
use crate::read::{GdbIndexEntry, GdbIndexSymbolKind, Reader, Result};
use crate::symtab::{NameComponents, SymbolDomain};
use crate::units::{DwarfContext, UnitId, UnitKind, UnitProcessor};

/// Lookups that find and expand the units a query needs.
pub trait QuickSymbols<R: Reader>: fmt::Debug {
    /// A short description of where the answers come from.
    fn describe(&self) -> &'static str;

    /// Whether there is any unit to look in.
    fn has_symbols(&self, ctx: &DwarfContext<'_, R>) -> bool {
        ctx.unit_count() != 0
    }

    /// Expand the units that may define `name` in `domain`, returning the
    /// first one that does.
    fn lookup_symbol(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        name: &str,
        domain: SymbolDomain,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Option<UnitId>>;

    /// Expand every unit with a symbol matching `lookup`, by `::`
    /// component. With `completion`, `lookup` only needs to be a prefix.
    ///
    /// Returns the units expanded, in unit order.
    fn expand_symtabs_matching(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        lookup: &str,
        completion: bool,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Vec<UnitId>>;

    /// Expand the unit whose code covers `pc`.
    fn find_pc_compunit(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        pc: u64,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Option<UnitId>>;

    /// Expand every unit.
    fn expand_all(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<()> {
        let units: Vec<UnitId> = ctx.comp_units().chain(ctx.type_units()).collect();
        for unit in units {
            expand(ctx, unit, processor)?;
        }
        Ok(())
    }
}

/// Expand a unit, skipping it if it cannot be read.
fn expand<R: Reader>(
    ctx: &mut DwarfContext<'_, R>,
    unit: UnitId,
    processor: &mut dyn UnitProcessor<R>,
) -> Result<bool> {
    match ctx.expand_unit(unit, processor) {
        Ok(()) => Ok(true),
        Err(err) if err.is_recoverable() => {
            tracing::warn!(unit = unit.0, "cannot expand unit: {}", err);
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

fn sorted_unique(mut units: Vec<UnitId>) -> Vec<UnitId> {
    units.sort_unstable();
    units.dedup();
    units
}

/// Pick the lookups for a context: the `.gdb_index` if the context was
/// built from one, otherwise partial symbol tables, built here.
///
/// With [`Options::read_now`](crate::Options::read_now) every unit is
/// expanded before returning.
pub fn select_quick_symbols<R: Reader>(
    ctx: &mut DwarfContext<'_, R>,
    processor: &mut dyn UnitProcessor<R>,
) -> Result<Box<dyn QuickSymbols<R>>> {
    let mut quick: Box<dyn QuickSymbols<R>> = if ctx.gdb_index().is_some() {
        Box::new(IndexFunctions::new(ctx)?)
    } else {
        ctx.build_all_psymtabs()?;
        Box::new(PartialSymbolFunctions::default())
    };
    tracing::debug!(using = quick.describe(), "selected symbol lookups");
    if ctx.options().read_now {
        quick.expand_all(ctx, processor)?;
    }
    Ok(quick)
}

/// Lookups answered by a `.gdb_index`.
#[derive(Debug)]
pub struct IndexFunctions {
    names: NameComponents,
    entries: Vec<Vec<GdbIndexEntry>>,
    addresses: Vec<(core::ops::Range<u64>, u32)>,
}

impl IndexFunctions {
    /// Read the symbol table and address area of the context's index.
    pub fn new<R: Reader>(ctx: &DwarfContext<'_, R>) -> Result<Self> {
        let index = match ctx.gdb_index() {
            Some(index) => index,
            None => {
                return Ok(IndexFunctions {
                    names: NameComponents::default(),
                    entries: Vec::new(),
                    addresses: Vec::new(),
                })
            }
        };
        let (names, entries) = index
            .symbols()?
            .into_iter()
            .map(|symbol| (symbol.name, symbol.entries))
            .unzip();
        let mut addresses = index.address_map(ctx.complaints())?;
        addresses.sort_by_key(|(range, _)| range.start);
        Ok(IndexFunctions {
            names: NameComponents::new(names),
            entries,
            addresses,
        })
    }

    fn units_for<R: Reader>(
        ctx: &DwarfContext<'_, R>,
        entries: &[GdbIndexEntry],
        domain: Option<SymbolDomain>,
    ) -> Vec<UnitId> {
        let mut units = Vec::new();
        for entry in entries {
            if let Some(domain) = domain {
                if entry.attrs_valid() && !kind_matches(entry.kind, domain) {
                    continue;
                }
            }
            match ctx.unit_for_index(entry.unit_index) {
                Some(unit) => {
                    if !units.contains(&unit) {
                        units.push(unit);
                    }
                }
                None => complain!(
                    ctx.complaints(),
                    BadIndexUnit,
                    ".gdb_index entry has bad CU index {}",
                    entry.unit_index
                ),
            }
        }
        units
    }
}

fn kind_matches(kind: GdbIndexSymbolKind, domain: SymbolDomain) -> bool {
    match domain {
        SymbolDomain::Var => matches!(
            kind,
            GdbIndexSymbolKind::Variable | GdbIndexSymbolKind::Function | GdbIndexSymbolKind::Other
        ),
        SymbolDomain::Struct => kind == GdbIndexSymbolKind::Type,
        SymbolDomain::Module => kind == GdbIndexSymbolKind::Other,
    }
}

impl<R: Reader> QuickSymbols<R> for IndexFunctions {
    fn describe(&self) -> &'static str {
        ".gdb_index"
    }

    fn lookup_symbol(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        name: &str,
        domain: SymbolDomain,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Option<UnitId>> {
        let entries = match ctx.gdb_index() {
            Some(index) => index.find_symbol(name)?,
            None => None,
        };
        let units = match entries {
            Some(entries) => IndexFunctions::units_for(ctx, &entries, Some(domain)),
            None => return Ok(None),
        };
        for unit in units {
            if expand(ctx, unit, processor)? {
                return Ok(Some(unit));
            }
        }
        Ok(None)
    }

    fn expand_symtabs_matching(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        lookup: &str,
        completion: bool,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Vec<UnitId>> {
        let mut units = Vec::new();
        let entries = &self.entries;
        self.names
            .expand_symtabs_matching_symbol(lookup, completion, |idx| {
                if let Some(entries) = entries.get(idx as usize) {
                    units.extend(IndexFunctions::units_for(ctx, entries, None));
                }
                true
            });
        let mut expanded = Vec::new();
        for unit in sorted_unique(units) {
            if expand(ctx, unit, processor)? {
                expanded.push(unit);
            }
        }
        Ok(expanded)
    }

    fn find_pc_compunit(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        pc: u64,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Option<UnitId>> {
        let end = self.addresses.partition_point(|(range, _)| range.start <= pc);
        let found = self.addresses[..end]
            .iter()
            .rev()
            .find(|(range, _)| range.contains(&pc))
            .and_then(|&(_, index)| ctx.unit_for_index(index));
        match found {
            Some(unit) if expand(ctx, unit, processor)? => Ok(Some(unit)),
            _ => Ok(None),
        }
    }
}

/// Lookups answered by partial symbol tables.
#[derive(Debug, Default)]
pub struct PartialSymbolFunctions {
    names: Option<(NameComponents, Vec<UnitId>)>,
}

impl PartialSymbolFunctions {
    /// The units to expand for a match in `unit`. A partial unit is
    /// expanded through the units that import it.
    fn expansion_targets<R: Reader>(ctx: &DwarfContext<'_, R>, unit: UnitId) -> Vec<UnitId> {
        let mut targets = Vec::new();
        let mut seen = vec![unit];
        let mut work = vec![unit];
        while let Some(unit) = work.pop() {
            let is_partial = ctx.unit(unit).map_or(false, |d| d.kind() == UnitKind::Partial);
            if !is_partial {
                targets.push(unit);
                continue;
            }
            for importer in ctx.importers_of(unit) {
                if !seen.contains(&importer) {
                    seen.push(importer);
                    work.push(importer);
                }
            }
        }
        sorted_unique(targets)
    }

    fn names<R: Reader>(&mut self, ctx: &DwarfContext<'_, R>) -> &(NameComponents, Vec<UnitId>) {
        self.names.get_or_insert_with(|| {
            let mut names = Vec::new();
            let mut owners = Vec::new();
            for symtab in ctx.psymtabs() {
                for symbol in symtab.symbols() {
                    names.push(symbol.name.clone());
                    owners.push(symtab.unit);
                }
            }
            (NameComponents::new(names), owners)
        })
    }
}

impl<R: Reader> QuickSymbols<R> for PartialSymbolFunctions {
    fn describe(&self) -> &'static str {
        "partial symbols"
    }

    fn lookup_symbol(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        name: &str,
        domain: SymbolDomain,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Option<UnitId>> {
        let matches: Vec<UnitId> = ctx
            .psymtabs()
            .filter(|symtab| symtab.defines(name, Some(domain)))
            .map(|symtab| symtab.unit)
            .collect();
        for unit in matches {
            for target in PartialSymbolFunctions::expansion_targets(ctx, unit) {
                if expand(ctx, target, processor)? {
                    return Ok(Some(target));
                }
            }
        }
        Ok(None)
    }

    fn expand_symtabs_matching(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        lookup: &str,
        completion: bool,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Vec<UnitId>> {
        let mut units = Vec::new();
        {
            let (names, owners) = self.names(ctx);
            names.expand_symtabs_matching_symbol(lookup, completion, |idx| {
                if let Some(&unit) = owners.get(idx as usize) {
                    units.push(unit);
                }
                true
            });
        }
        let targets: Vec<UnitId> = sorted_unique(units)
            .into_iter()
            .flat_map(|unit| PartialSymbolFunctions::expansion_targets(ctx, unit))
            .collect();
        let mut expanded = Vec::new();
        for unit in sorted_unique(targets) {
            if expand(ctx, unit, processor)? {
                expanded.push(unit);
            }
        }
        Ok(expanded)
    }

    fn find_pc_compunit(
        &mut self,
        ctx: &mut DwarfContext<'_, R>,
        pc: u64,
        processor: &mut dyn UnitProcessor<R>,
    ) -> Result<Option<UnitId>> {
        // The narrowest range wins.
        let best = ctx
            .psymtabs()
            .filter_map(|symtab| {
                let range = symtab.pc_range.as_ref()?;
                range.contains(&pc).then(|| (range.end - range.start, symtab.unit))
            })
            .min()
            .map(|(_, unit)| unit);
        let unit = match best {
            Some(unit) => unit,
            None => return Ok(None),
        };
        for target in PartialSymbolFunctions::expansion_targets(ctx, unit) {
            if expand(ctx, target, processor)? {
                return Ok(Some(target));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants;
    use crate::endianity::LittleEndian;
    use crate::options::Options;
    use crate::read::abbrev::tests::AbbrevSectionMethods;
    use crate::read::gdb_index::tests::build_gdb_index;
    use crate::read::GdbIndex;
    use crate::test_util::{unit, GimliSectionMethods, TestUnitKind};
    use crate::units::context::tests::{dwarf, Slice};
    use crate::units::ExpandedUnits;
    use test_assembler::{Endian, Section};

    fn abbrevs() -> Vec<u8> {
        Section::with_endian(Endian::Little)
            .abbrev(1, constants::DW_TAG_compile_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_language, constants::DW_FORM_data1)
            .abbrev_attr_null()
            .abbrev(2, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_external, constants::DW_FORM_flag_present)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr(constants::DW_AT_high_pc, constants::DW_FORM_data4)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap()
    }

    fn function_cu(file: &str, function: &str, low_pc: u64) -> Vec<u8> {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr(file)
            .D8(constants::DW_LANG_C_plus_plus.0 as u8)
            .uleb(2)
            .cstr(function)
            .D64(low_pc)
            .D32(0x100)
            .D8(0)
            .get_contents()
            .unwrap();
        unit(4, TestUnitKind::Compile, 0, &entries)
    }

    const FUNCTION: u32 = 3 << 28;

    #[test]
    fn test_index_functions() {
        let abbrev = abbrevs();
        let a = function_cu("a.cc", "main", 0x1000);
        let b = function_cu("b.cc", "ns::helper", 0x2000);
        let info = [a.clone(), b.clone()].concat();
        let index = build_gdb_index(
            7,
            &[(0, a.len() as u64), (a.len() as u64, b.len() as u64)],
            &[(0x1000, 0x1100, 0), (0x2000, 0x2100, 1)],
            &[("main", &[FUNCTION]), ("ns::helper", &[FUNCTION | 1])],
        );
        let index = GdbIndex::parse(Slice::new(&index, LittleEndian), false)
            .unwrap()
            .unwrap();
        let mut ctx =
            DwarfContext::from_gdb_index(dwarf(&abbrev, &info, &[]), index, Options::default())
                .unwrap();
        let mut expanded = ExpandedUnits::default();
        let mut quick = select_quick_symbols(&mut ctx, &mut expanded).unwrap();
        assert_eq!(quick.describe(), ".gdb_index");
        assert!(quick.has_symbols(&ctx));

        let found = quick
            .lookup_symbol(&mut ctx, "ns::helper", SymbolDomain::Var, &mut expanded)
            .unwrap();
        assert_eq!(found, Some(UnitId(1)));
        assert_eq!(expanded.units, vec![UnitId(1)]);
        assert_eq!(
            quick
                .lookup_symbol(&mut ctx, "ns::helper", SymbolDomain::Struct, &mut expanded)
                .unwrap(),
            None
        );
        assert_eq!(
            quick
                .lookup_symbol(&mut ctx, "missing", SymbolDomain::Var, &mut expanded)
                .unwrap(),
            None
        );

        assert_eq!(
            quick.find_pc_compunit(&mut ctx, 0x1050, &mut expanded).unwrap(),
            Some(UnitId(0))
        );
        assert_eq!(quick.find_pc_compunit(&mut ctx, 0x5000, &mut expanded).unwrap(), None);
        assert_eq!(expanded.units, vec![UnitId(1), UnitId(0)]);

        let matched = quick
            .expand_symtabs_matching(&mut ctx, "helper", false, &mut expanded)
            .unwrap();
        assert_eq!(matched, vec![UnitId(1)]);
    }

    #[test]
    fn test_partial_symbol_functions() {
        let abbrev = abbrevs();
        let info = [
            function_cu("a.cc", "main", 0x1000),
            function_cu("b.cc", "helper", 0x2000),
            function_cu("c.cc", "helper2", 0x3000),
        ]
        .concat();
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), Options::default()).unwrap();
        let mut expanded = ExpandedUnits::default();
        let mut quick = select_quick_symbols(&mut ctx, &mut expanded).unwrap();
        assert_eq!(quick.describe(), "partial symbols");
        assert!(expanded.units.is_empty());

        assert_eq!(
            quick
                .lookup_symbol(&mut ctx, "helper", SymbolDomain::Var, &mut expanded)
                .unwrap(),
            Some(UnitId(1))
        );
        assert_eq!(
            quick.find_pc_compunit(&mut ctx, 0x30ff, &mut expanded).unwrap(),
            Some(UnitId(2))
        );
        let matched = quick
            .expand_symtabs_matching(&mut ctx, "help", true, &mut expanded)
            .unwrap();
        assert_eq!(matched, vec![UnitId(1), UnitId(2)]);
        assert_eq!(expanded.units, vec![UnitId(1), UnitId(2)]);

        quick.expand_all(&mut ctx, &mut expanded).unwrap();
        assert_eq!(expanded.units, vec![UnitId(1), UnitId(2), UnitId(0)]);
    }

    #[test]
    fn test_read_now_expands_everything() {
        let abbrev = abbrevs();
        let info = [
            function_cu("a.cc", "main", 0x1000),
            function_cu("b.cc", "helper", 0x2000),
        ]
        .concat();
        let options = Options {
            read_now: true,
            ..Options::default()
        };
        let mut ctx = DwarfContext::new(dwarf(&abbrev, &info, &[]), options).unwrap();
        let mut expanded = ExpandedUnits::default();
        select_quick_symbols(&mut ctx, &mut expanded).unwrap();
        assert_eq!(expanded.units, vec![UnitId(0), UnitId(1)]);
    }
}
