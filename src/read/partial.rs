//! The partial die scanner.
//!
//! Scanning a unit for the partial symbol table only materializes the dies
//! that can name something a user might look up, and only descends into the
//! children that can hold more of them. Everything else is skipped, using
//! `DW_AT_sibling` where the producer emitted it.

use std::collections::HashMap;

use crate::complaint::{complain, Complaints};
use crate::constants;
use crate::read::{
    DebugAddr, Die, DieReader, DieReference, Dwarf, Reader, Result, UnitBases, UnitOffset,
};
use crate::symtab::names;

/// The name given to an unnamed namespace.
pub const ANONYMOUS_NAMESPACE: &str = "(anonymous namespace)";

/// The handle of a partial die within its [`PartialDies`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PartialDieId(pub usize);

/// The summary of a die kept by the partial scanner.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDie {
    /// The offset of the die within its unit.
    pub offset: UnitOffset,
    /// The die's tag.
    pub tag: constants::DwTag,
    /// Whether the abbreviation says the die has children.
    pub has_children: bool,
    /// `DW_AT_name`, or a name derived by [`PartialDies::fixup`].
    pub name: Option<String>,
    /// `DW_AT_linkage_name` or `DW_AT_MIPS_linkage_name`.
    pub linkage_name: Option<String>,
    /// `DW_AT_external`.
    pub is_external: bool,
    /// `DW_AT_declaration`.
    pub is_declaration: bool,
    /// Whether the die has a `DW_AT_type`.
    pub has_type: bool,
    /// Whether the die has a `DW_AT_byte_size`.
    pub has_byte_size: bool,
    /// Whether the die has a `DW_AT_const_value`.
    pub has_const_value: bool,
    /// Whether the die has a `DW_AT_location` expression.
    pub has_location: bool,
    /// Whether `low_pc` and `high_pc` form a valid range.
    pub has_pc_info: bool,
    /// Whether the die has `DW_AT_ranges`.
    pub has_ranges: bool,
    /// `DW_AT_main_subprogram`, or the Fortran `DW_CC_program` convention.
    pub main_subprogram: bool,
    /// `DW_AT_inline` says the subprogram was inlined.
    pub may_be_inlined: bool,
    /// `DW_AT_enum_class`.
    pub is_enum_class: bool,
    /// The die has template parameter children.
    pub has_template_arguments: bool,
    /// The start of the die's address range.
    pub low_pc: u64,
    /// The end of the die's address range.
    pub high_pc: u64,
    /// `DW_AT_specification`, `DW_AT_abstract_origin` or `DW_AT_extension`.
    pub specification: Option<DieReference>,
    /// `DW_AT_import` of an imported unit.
    pub import: Option<DieReference>,
    /// `DW_AT_sibling`, if it points forward.
    pub sibling: Option<UnitOffset>,
    /// The enclosing partial die.
    pub parent: Option<PartialDieId>,
    /// The first retained child.
    pub first_child: Option<PartialDieId>,
    /// The next retained sibling.
    pub next_sibling: Option<PartialDieId>,
    fixup_called: bool,
}

impl PartialDie {
    /// Whether the die defines a struct, class, union or interface type.
    pub fn is_aggregate(&self) -> bool {
        matches!(
            self.tag,
            constants::DW_TAG_class_type
                | constants::DW_TAG_interface_type
                | constants::DW_TAG_structure_type
                | constants::DW_TAG_union_type
        )
    }

    /// Whether [`PartialDies::fixup`] has run on this die.
    pub fn is_fixed_up(&self) -> bool {
        self.fixup_called
    }
}

/// A symbol the scanner emitted without keeping a partial die for it.
///
/// Top-level simple types and the enumerators of top-level enumerations
/// take this path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImmediateSymbol {
    /// The offset of the die within its unit.
    pub offset: UnitOffset,
    /// The die's tag.
    pub tag: constants::DwTag,
    /// The symbol name.
    pub name: String,
    /// Whether the symbol is visible outside its unit.
    pub is_global: bool,
}

/// What a specification lookup in another unit found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecificationInfo {
    /// The name of the referenced die, after its own fixup.
    pub name: Option<String>,
    /// Whether the referenced die is external.
    pub is_external: bool,
}

/// The partial dies of one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialDies {
    dies: Vec<PartialDie>,
    by_offset: HashMap<UnitOffset, PartialDieId>,
    first: Option<PartialDieId>,
    immediate: Vec<ImmediateSymbol>,
}

impl PartialDies {
    fn push(&mut self, die: PartialDie, hashed: bool) -> PartialDieId {
        let id = PartialDieId(self.dies.len());
        if hashed {
            self.by_offset.insert(die.offset, id);
        }
        self.dies.push(die);
        id
    }

    /// The first retained die below the unit die.
    pub fn first(&self) -> Option<PartialDieId> {
        self.first
    }

    /// Get a partial die by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is from another unit.
    pub fn get(&self, id: PartialDieId) -> &PartialDie {
        &self.dies[id.0]
    }

    /// Find a partial die that may be the target of a reference.
    ///
    /// Only dies that can be the target of a specification are indexed
    /// unless every die was loaded.
    pub fn find(&self, offset: UnitOffset) -> Option<PartialDieId> {
        self.by_offset.get(&offset).copied()
    }

    /// Iterate over the top-level dies and their siblings.
    pub fn top_level(&self) -> PartialSiblings<'_> {
        PartialSiblings {
            dies: self,
            next: self.first,
        }
    }

    /// Iterate over the retained children of a die.
    pub fn children(&self, id: PartialDieId) -> PartialSiblings<'_> {
        PartialSiblings {
            dies: self,
            next: self.get(id).first_child,
        }
    }

    /// The symbols emitted without a partial die.
    pub fn immediate_symbols(&self) -> &[ImmediateSymbol] {
        &self.immediate
    }

    /// The number of retained dies.
    pub fn len(&self) -> usize {
        self.dies.len()
    }

    /// Whether no die was retained.
    pub fn is_empty(&self) -> bool {
        self.dies.is_empty()
    }

    /// Turn section references that land inside this unit into unit
    /// references, so fixup can follow them without a lookup.
    pub(crate) fn localize_references(&mut self, unit: core::ops::Range<usize>, is_alt: bool) {
        for die in &mut self.dies {
            if let Some(DieReference::Section { offset, alt }) = die.specification {
                if alt == is_alt && unit.contains(&offset.0) {
                    die.specification = Some(DieReference::Unit(UnitOffset(offset.0 - unit.start)));
                }
            }
        }
    }

    /// Derive the names that the die's own attributes do not give it.
    ///
    /// An unnamed die with a specification borrows the name and external
    /// flag of the die it refers to. Specifications in this unit are fixed
    /// up first and read directly; others are looked up with `lookup`.
    /// Unnamed namespaces become [`ANONYMOUS_NAMESPACE`]. In C++, a
    /// top-level aggregate with children takes its qualified name from the
    /// linkage name of one of its member functions, for producers that omit
    /// the enclosing namespaces; an unnamed aggregate with a linkage name
    /// takes its name from the demangled linkage name.
    ///
    /// Running fixup again on the same die has no effect.
    pub fn fixup<F>(&mut self, id: PartialDieId, language: constants::DwLang, lookup: &mut F)
    where
        F: FnMut(DieReference) -> Option<SpecificationInfo>,
    {
        // Chains of specifications are short; guard against cycles anyway.
        self.fixup_depth(id, language, lookup, 0);
    }

    fn fixup_depth<F>(
        &mut self,
        id: PartialDieId,
        language: constants::DwLang,
        lookup: &mut F,
        depth: usize,
    ) where
        F: FnMut(DieReference) -> Option<SpecificationInfo>,
    {
        if self.dies[id.0].fixup_called {
            return;
        }
        // Marking first stops a die that is its own specification.
        self.dies[id.0].fixup_called = true;

        if self.dies[id.0].name.is_none() {
            if let Some(spec) = self.dies[id.0].specification {
                let info = match spec {
                    DieReference::Unit(offset) => match self.find(offset) {
                        Some(target) if depth < 32 => {
                            self.fixup_depth(target, language, lookup, depth + 1);
                            let target = self.get(target);
                            Some(SpecificationInfo {
                                name: target.name.clone(),
                                is_external: target.is_external,
                            })
                        }
                        Some(_) => None,
                        None => lookup(spec),
                    },
                    _ => lookup(spec),
                };
                if let Some(SpecificationInfo {
                    name: Some(name),
                    is_external,
                }) = info
                {
                    let die = &mut self.dies[id.0];
                    die.name = Some(name);
                    if is_external {
                        die.is_external = true;
                    }
                }
            }
        }

        let die = &self.dies[id.0];
        if die.name.is_none() && die.tag == constants::DW_TAG_namespace {
            self.dies[id.0].name = Some(ANONYMOUS_NAMESPACE.to_string());
        }

        let die = &self.dies[id.0];
        if language.is_cplus()
            && die.name.is_none()
            && die.parent.is_none()
            && die.specification.is_none()
            && die.has_children
            && matches!(
                die.tag,
                constants::DW_TAG_class_type
                    | constants::DW_TAG_structure_type
                    | constants::DW_TAG_union_type
            )
        {
            if let Some(name) = self.guess_structure_name(id) {
                self.dies[id.0].name = Some(name);
            }
        }

        let die = &self.dies[id.0];
        if die.name.is_none() && die.is_aggregate() {
            if let Some(name) = die.linkage_name.as_deref().and_then(demangle_type_name) {
                self.dies[id.0].name = Some(name);
            }
        }
    }

    fn guess_structure_name(&self, id: PartialDieId) -> Option<String> {
        let child = self
            .children(id)
            .map(|(_, child)| child)
            .find(|child| child.tag == constants::DW_TAG_subprogram && child.linkage_name.is_some())?;
        child
            .linkage_name
            .as_deref()
            .and_then(class_name_from_physname)
    }
}

/// An iterator over a run of sibling partial dies.
#[derive(Debug)]
pub struct PartialSiblings<'a> {
    dies: &'a PartialDies,
    next: Option<PartialDieId>,
}

impl<'a> Iterator for PartialSiblings<'a> {
    type Item = (PartialDieId, &'a PartialDie);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let die = self.dies.get(id);
        self.next = die.next_sibling;
        Some((id, die))
    }
}

fn demangle(mangled: &str) -> Option<String> {
    let symbol = cpp_demangle::Symbol::new(mangled).ok()?;
    symbol.demangle(&cpp_demangle::DemangleOptions::default()).ok()
}

/// The qualified class name of a mangled member function, such as
/// `ns::Foo` for `_ZN2ns3Foo3barEv`.
pub fn class_name_from_physname(physname: &str) -> Option<String> {
    let demangled = demangle(physname)?;
    let function = names::strip_parameters(&demangled);
    let start = names::last_component_start(function)?;
    // `start` is just past the `::` separator.
    Some(function[..start - 2].to_string())
}

/// The unqualified name of a mangled type name.
fn demangle_type_name(linkage_name: &str) -> Option<String> {
    let demangled = demangle(linkage_name).or_else(|| demangle(&format!("_Z{}", linkage_name)))?;
    let base = match names::last_component_start(&demangled) {
        Some(start) => &demangled[start..],
        None => &demangled[..],
    };
    Some(base.to_string())
}

/// Whether dies with this tag define types that are indexed by name.
pub fn is_type_tag_for_partial(tag: constants::DwTag) -> bool {
    matches!(
        tag,
        constants::DW_TAG_base_type
            | constants::DW_TAG_class_type
            | constants::DW_TAG_enumeration_type
            | constants::DW_TAG_interface_type
            | constants::DW_TAG_structure_type
            | constants::DW_TAG_subrange_type
            | constants::DW_TAG_typedef
            | constants::DW_TAG_union_type
            | constants::DW_TAG_array_type
            | constants::DW_TAG_pointer_type
            | constants::DW_TAG_ptr_to_member_type
            | constants::DW_TAG_reference_type
            | constants::DW_TAG_rvalue_reference_type
            | constants::DW_TAG_set_type
            | constants::DW_TAG_string_type
            | constants::DW_TAG_subroutine_type
            | constants::DW_TAG_file_type
            | constants::DW_TAG_packed_type
            | constants::DW_TAG_unspecified_type
            | constants::DW_TAG_generic_subrange
    )
}

fn is_interesting_tag(tag: constants::DwTag) -> bool {
    is_type_tag_for_partial(tag)
        || matches!(
            tag,
            constants::DW_TAG_constant
                | constants::DW_TAG_enumerator
                | constants::DW_TAG_subprogram
                | constants::DW_TAG_inlined_subroutine
                | constants::DW_TAG_lexical_block
                | constants::DW_TAG_variable
                | constants::DW_TAG_namespace
                | constants::DW_TAG_module
                | constants::DW_TAG_member
                | constants::DW_TAG_imported_unit
                | constants::DW_TAG_imported_declaration
        )
}

/// Scans the dies of one unit into [`PartialDies`].
#[derive(Debug, Clone, Copy)]
pub struct PartialDieReader<'a, R: Reader> {
    dies: DieReader<'a, R>,
    dwarf: &'a Dwarf<R>,
    addr: &'a DebugAddr<R>,
    bases: &'a UnitBases,
    complaints: &'a Complaints,
    language: constants::DwLang,
    load_all: bool,
    has_section_at_zero: bool,
}

impl<'a, R: Reader> PartialDieReader<'a, R> {
    /// Create a scanner.
    ///
    /// `dwarf` is the file holding the unit; `addr` is the `.debug_addr`
    /// of the file holding its skeleton, if it is a split unit.
    pub fn new(
        dies: DieReader<'a, R>,
        dwarf: &'a Dwarf<R>,
        addr: &'a DebugAddr<R>,
        bases: &'a UnitBases,
        complaints: &'a Complaints,
        language: constants::DwLang,
    ) -> Self {
        PartialDieReader {
            dies,
            dwarf,
            addr,
            bases,
            complaints,
            language,
            load_all: false,
            has_section_at_zero: false,
        }
    }

    /// Keep every die and index all of them by offset.
    ///
    /// Used to reread a unit whose specifications point at dies the normal
    /// filtering dropped.
    pub fn load_all(mut self, load_all: bool) -> Self {
        self.load_all = load_all;
        self
    }

    /// Whether the object file has a section at address zero, which makes
    /// a zero `DW_AT_low_pc` valid.
    pub fn has_section_at_zero(mut self, value: bool) -> Self {
        self.has_section_at_zero = value;
        self
    }

    fn string(&self, attr: &crate::read::Attribute<R>) -> Result<String> {
        let string = self.dwarf.attr_string(self.bases, attr)?;
        let string = string.to_string_lossy()?.into_owned();
        Ok(string)
    }

    /// Summarize a decoded die.
    pub fn partial_die(&self, die: &Die<R>) -> Result<PartialDie> {
        let mut pdi = PartialDie {
            offset: die.offset(),
            tag: die.tag(),
            has_children: die.has_children(),
            ..PartialDie::default()
        };
        let mut has_low_pc = false;
        let mut has_high_pc = false;
        let mut high_pc_relative = false;
        for attr in die.attrs() {
            match attr.name() {
                constants::DW_AT_name => match die.tag() {
                    // Unit names are file names, not identifiers.
                    constants::DW_TAG_compile_unit
                    | constants::DW_TAG_partial_unit
                    | constants::DW_TAG_type_unit => {}
                    _ => pdi.name = Some(self.string(attr)?),
                },
                constants::DW_AT_linkage_name | constants::DW_AT_MIPS_linkage_name => {
                    pdi.linkage_name = Some(self.string(attr)?);
                }
                constants::DW_AT_low_pc => {
                    if let Some(address) = self.dwarf.attr_address(self.addr, self.bases, attr)? {
                        has_low_pc = true;
                        pdi.low_pc = address;
                    }
                }
                constants::DW_AT_high_pc => {
                    match self.dwarf.attr_address(self.addr, self.bases, attr)? {
                        Some(address) => {
                            has_high_pc = true;
                            pdi.high_pc = address;
                        }
                        None => {
                            if let Some(size) = attr.udata_value() {
                                has_high_pc = true;
                                high_pc_relative = true;
                                pdi.high_pc = size;
                            }
                        }
                    }
                }
                constants::DW_AT_location => pdi.has_location = attr.exprloc_value().is_some(),
                constants::DW_AT_external => pdi.is_external = attr.flag_value(),
                constants::DW_AT_declaration => pdi.is_declaration = attr.flag_value(),
                constants::DW_AT_type => pdi.has_type = true,
                constants::DW_AT_abstract_origin
                | constants::DW_AT_specification
                | constants::DW_AT_extension => {
                    pdi.specification = DieReference::from_value(attr.value());
                }
                constants::DW_AT_sibling => {
                    if let Some(DieReference::Unit(target)) = DieReference::from_value(attr.value())
                    {
                        if target <= die.offset() {
                            complain!(
                                self.complaints,
                                DanglingReference,
                                "ignoring DW_AT_sibling 0x{:x} that points backwards from die at 0x{:x}",
                                target.0,
                                die.offset().0
                            );
                        } else {
                            pdi.sibling = Some(target);
                        }
                    }
                }
                constants::DW_AT_byte_size => pdi.has_byte_size = true,
                constants::DW_AT_const_value => pdi.has_const_value = true,
                constants::DW_AT_calling_convention => {
                    if attr.u8_value() == Some(constants::DW_CC_program.0) {
                        pdi.main_subprogram = true;
                    }
                }
                constants::DW_AT_inline => {
                    let inline = attr.u8_value().map(constants::DwInl);
                    if inline == Some(constants::DW_INL_inlined)
                        || inline == Some(constants::DW_INL_declared_inlined)
                    {
                        pdi.may_be_inlined = true;
                    }
                }
                constants::DW_AT_import => {
                    if die.tag() == constants::DW_TAG_imported_unit {
                        pdi.import = DieReference::from_value(attr.value());
                    }
                }
                constants::DW_AT_main_subprogram => {
                    if attr.flag_value() {
                        pdi.main_subprogram = true;
                    }
                }
                constants::DW_AT_enum_class => pdi.is_enum_class = attr.flag_value(),
                constants::DW_AT_ranges => pdi.has_ranges = true,
                _ => {}
            }
        }

        if high_pc_relative {
            pdi.high_pc = pdi.high_pc.wrapping_add(pdi.low_pc);
        }
        if has_low_pc && has_high_pc {
            if pdi.low_pc == 0 && !self.has_section_at_zero {
                complain!(
                    self.complaints,
                    InvalidRange,
                    "DW_AT_low_pc is zero for die at 0x{:x}",
                    die.offset().0
                );
            } else if pdi.low_pc >= pdi.high_pc {
                complain!(
                    self.complaints,
                    InvalidRange,
                    "DW_AT_low_pc 0x{:x} is not below DW_AT_high_pc 0x{:x} for die at 0x{:x}",
                    pdi.low_pc,
                    pdi.high_pc,
                    die.offset().0
                );
            } else {
                pdi.has_pc_info = true;
            }
        }
        Ok(pdi)
    }

    /// Move `input` past the children of `pdi`.
    fn locate_sibling(&self, pdi: &PartialDie, input: &mut R) -> Result<()> {
        if let Some(sibling) = pdi.sibling {
            if self.dies.header().is_valid_offset(sibling) {
                *input = self.dies.header().range_from(sibling..)?;
                return Ok(());
            }
        }
        if pdi.has_children {
            self.dies.skip_children(input)?;
        }
        Ok(())
    }

    /// Skip a die that was not decoded, along with its children.
    fn skip_one(&self, input: &mut R) -> Result<()> {
        if self.dies.skip_die(input)? == Some(true) {
            self.dies.skip_children(input)?;
        }
        Ok(())
    }

    /// Scan the children of a unit die.
    ///
    /// `input` starts just after the unit die's attributes. Nesting is
    /// tracked with an explicit parent cursor, so deeply nested dies do not
    /// recurse.
    pub fn load(&self, mut input: R) -> Result<PartialDies> {
        let mut out = PartialDies::default();
        let mut parent: Option<PartialDieId> = None;
        let mut last: Option<PartialDieId> = None;
        let mut nesting = 1usize;
        let language = self.language;

        loop {
            if input.is_empty() {
                break;
            }
            let start = input.clone();
            let code = input.read_uleb128()?;
            if code == 0 {
                nesting -= 1;
                if nesting == 0 {
                    break;
                }
                last = parent;
                parent = parent.and_then(|p| out.get(p).parent);
                continue;
            }
            input = start;
            let tag = self.peek_tag(&input)?;

            if !self.load_all
                && matches!(
                    tag,
                    constants::DW_TAG_template_type_parameter
                        | constants::DW_TAG_template_value_parameter
                )
            {
                if let Some(p) = parent {
                    if language.is_cplus() {
                        out.dies[p.0].has_template_arguments = true;
                    }
                }
                self.skip_one(&mut input)?;
                continue;
            }

            // C++ subprograms are only entered to find template arguments.
            if !self.load_all
                && language.is_cplus()
                && parent.map_or(false, |p| out.get(p).tag == constants::DW_TAG_subprogram)
                && tag != constants::DW_TAG_inlined_subroutine
            {
                self.skip_one(&mut input)?;
                continue;
            }

            if !self.load_all && !is_interesting_tag(tag) {
                self.skip_one(&mut input)?;
                continue;
            }

            let die = match self.dies.read_die(&mut input)? {
                Some(die) => die,
                None => continue,
            };
            let mut pdi = self.partial_die(&die)?;

            if !self.load_all
                && parent.is_none()
                && pdi.specification.is_none()
                && !pdi.is_declaration
                && ((pdi.tag == constants::DW_TAG_typedef && !pdi.has_children)
                    || pdi.tag == constants::DW_TAG_base_type
                    || pdi.tag == constants::DW_TAG_subrange_type)
            {
                if let Some(name) = pdi.name.take() {
                    out.immediate.push(ImmediateSymbol {
                        offset: pdi.offset,
                        tag: pdi.tag,
                        name,
                        is_global: false,
                    });
                }
                self.locate_sibling(&pdi, &mut input)?;
                continue;
            }

            if pdi.tag == constants::DW_TAG_typedef && pdi.has_children {
                complain!(
                    self.complaints,
                    ProducerQuirk,
                    "DW_TAG_typedef at 0x{:x} has children (GCC PR debug/47510)",
                    pdi.offset.0
                );
            }

            if pdi.tag == constants::DW_TAG_enumerator {
                if let Some(p) = parent {
                    let enclosing = out.get(p);
                    if enclosing.parent.is_none()
                        && enclosing.tag == constants::DW_TAG_enumeration_type
                        && enclosing.specification.is_none()
                    {
                        match pdi.name.take() {
                            None => complain!(
                                self.complaints,
                                MissingName,
                                "malformed enumerator die at 0x{:x} ignored",
                                pdi.offset.0
                            ),
                            Some(name) => out.immediate.push(ImmediateSymbol {
                                offset: pdi.offset,
                                tag: pdi.tag,
                                name,
                                is_global: language.is_cplus(),
                            }),
                        }
                        self.locate_sibling(&pdi, &mut input)?;
                        continue;
                    }
                }
            }

            let hashed = self.load_all
                || matches!(
                    pdi.tag,
                    constants::DW_TAG_constant
                        | constants::DW_TAG_subprogram
                        | constants::DW_TAG_variable
                        | constants::DW_TAG_namespace
                )
                || pdi.is_declaration;
            pdi.parent = parent;
            let id = out.push(pdi, hashed);
            match last {
                Some(prev) if Some(prev) == parent => out.dies[prev.0].first_child = Some(id),
                Some(prev) => out.dies[prev.0].next_sibling = Some(id),
                None => {}
            }
            last = Some(id);
            if out.first.is_none() {
                out.first = Some(id);
            }

            let pdi = out.get(id);
            if pdi.has_children && self.should_descend(pdi) {
                nesting += 1;
                parent = Some(id);
                continue;
            }
            let pdi = pdi.clone();
            self.locate_sibling(&pdi, &mut input)?;
        }

        tracing::trace!(
            unit = self.dies.header().offset().raw(),
            retained = out.len(),
            immediate = out.immediate.len(),
            "scanned partial dies"
        );
        Ok(out)
    }

    fn peek_tag(&self, input: &R) -> Result<constants::DwTag> {
        let mut peek = input.clone();
        let offset = self.dies.offset_of(&peek);
        let code = peek.read_uleb128()?;
        Ok(self.dies.abbreviation(code, offset)?.tag())
    }

    fn should_descend(&self, pdi: &PartialDie) -> bool {
        let language = self.language;
        self.load_all
            || matches!(
                pdi.tag,
                constants::DW_TAG_namespace
                    | constants::DW_TAG_module
                    | constants::DW_TAG_enumeration_type
            )
            || (language.is_cplus()
                && pdi.tag == constants::DW_TAG_subprogram
                && pdi.name.as_deref().map_or(true, |name| !name.contains('<')))
            || (!language.is_c() && pdi.is_aggregate())
            || ((language.is_ada() || language.is_fortran())
                && matches!(
                    pdi.tag,
                    constants::DW_TAG_subprogram | constants::DW_TAG_lexical_block
                ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DebugAbbrevOffset;
    use crate::complaint::ComplaintKind;
    use crate::endianity::LittleEndian;
    use crate::read::abbrev::tests::AbbrevSectionMethods;
    use crate::read::die::tests::v4_unit;
    use crate::read::{DebugAbbrev, DebugInfo, EndianSlice};
    use crate::test_util::GimliSectionMethods;
    use test_assembler::{Endian, Section};

    type Slice<'a> = EndianSlice<'a, LittleEndian>;

    fn abbrevs() -> Vec<u8> {
        Section::with_endian(Endian::Little)
            // 1: compile unit
            .abbrev(1, constants::DW_TAG_compile_unit, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            // 2: base type
            .abbrev(2, constants::DW_TAG_base_type, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            // 3: enumeration with children
            .abbrev(3, constants::DW_TAG_enumeration_type, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            // 4: enumerator
            .abbrev(4, constants::DW_TAG_enumerator, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            // 5: namespace, no name
            .abbrev(5, constants::DW_TAG_namespace, constants::DW_CHILDREN_yes)
            .abbrev_attr_null()
            // 6: subprogram with pc range
            .abbrev(6, constants::DW_TAG_subprogram, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_external, constants::DW_FORM_flag_present)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr(constants::DW_AT_high_pc, constants::DW_FORM_data4)
            .abbrev_attr_null()
            // 7: formal parameter, not interesting
            .abbrev(7, constants::DW_TAG_formal_parameter, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            // 8: template parameter
            .abbrev(8, constants::DW_TAG_template_type_parameter, constants::DW_CHILDREN_no)
            .abbrev_attr_null()
            // 9: unnamed subprogram with specification
            .abbrev(9, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_specification, constants::DW_FORM_ref4)
            .abbrev_attr(constants::DW_AT_low_pc, constants::DW_FORM_addr)
            .abbrev_attr(constants::DW_AT_high_pc, constants::DW_FORM_addr)
            .abbrev_attr_null()
            // 10: declaration subprogram
            .abbrev(10, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_declaration, constants::DW_FORM_flag_present)
            .abbrev_attr(constants::DW_AT_external, constants::DW_FORM_flag_present)
            .abbrev_attr_null()
            // 11: unnamed struct with children
            .abbrev(11, constants::DW_TAG_structure_type, constants::DW_CHILDREN_yes)
            .abbrev_attr_null()
            // 12: member function with linkage name
            .abbrev(12, constants::DW_TAG_subprogram, constants::DW_CHILDREN_no)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_linkage_name, constants::DW_FORM_string)
            .abbrev_attr(constants::DW_AT_declaration, constants::DW_FORM_flag_present)
            .abbrev_attr_null()
            // 13: named struct with children
            .abbrev(13, constants::DW_TAG_structure_type, constants::DW_CHILDREN_yes)
            .abbrev_attr(constants::DW_AT_name, constants::DW_FORM_string)
            .abbrev_attr_null()
            .abbrev_null()
            .get_contents()
            .unwrap()
    }

    struct Unit {
        info: Vec<u8>,
        abbrev: Vec<u8>,
    }

    impl Unit {
        fn new(entries: Section) -> Self {
            Unit {
                info: v4_unit(&entries.get_contents().unwrap()),
                abbrev: abbrevs(),
            }
        }

        fn scan(&self, language: constants::DwLang, complaints: &Complaints) -> PartialDies {
            let debug_info = DebugInfo::new(&self.info, LittleEndian);
            let debug_abbrev = DebugAbbrev::new(&self.abbrev, LittleEndian);
            let header = debug_info.units().next().unwrap().unwrap();
            let abbrevs = debug_abbrev.abbreviations(DebugAbbrevOffset(0)).unwrap();
            let dwarf = Dwarf::<Slice<'_>>::default();
            let bases = UnitBases::new(header.encoding());
            let dies = DieReader::new(&header, &abbrevs, complaints);
            let (_, rest) = dies.read_top_die().unwrap().unwrap();
            PartialDieReader::new(dies, &dwarf, &dwarf.debug_addr, &bases, complaints, language)
                .load(rest)
                .unwrap()
        }
    }

    #[test]
    fn test_immediate_symbols() {
        // 0x0b cu; 0x0f int; 0x14 enum E { A, B }; 0x22 null
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            .uleb(2)
            .cstr("int")
            .uleb(3)
            .cstr("E")
            .uleb(4)
            .cstr("A")
            .uleb(4)
            .cstr("B")
            .D8(0)
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let dies = unit.scan(constants::DW_LANG_C_plus_plus, &complaints);

        let names: Vec<_> = dies
            .immediate_symbols()
            .iter()
            .map(|sym| (sym.name.as_str(), sym.is_global))
            .collect();
        assert_eq!(names, vec![("int", false), ("A", true), ("B", true)]);
        // Only the enumeration itself is retained.
        assert_eq!(dies.len(), 1);
        let (_, e) = dies.top_level().next().unwrap();
        assert_eq!(e.tag, constants::DW_TAG_enumeration_type);
        assert_eq!(e.first_child, None);
    }

    #[test]
    fn test_skips_and_template_arguments() {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            // subprogram f with a parameter and a template argument
            .uleb(6)
            .cstr("f")
            .L64(0x1000)
            .L32(0x10)
            .uleb(7)
            .cstr("p")
            .uleb(8)
            .D8(0)
            // namespace with a declaration inside
            .uleb(5)
            .uleb(10)
            .cstr("g")
            .D8(0)
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let mut dies = unit.scan(constants::DW_LANG_C_plus_plus, &complaints);

        let top: Vec<_> = dies.top_level().map(|(id, die)| (id, die.tag)).collect();
        assert_eq!(top.len(), 2);
        let f = dies.get(top[0].0);
        assert_eq!(f.name.as_deref(), Some("f"));
        assert!(f.has_pc_info);
        assert_eq!((f.low_pc, f.high_pc), (0x1000, 0x1010));
        assert!(f.is_external);
        assert!(f.has_template_arguments);
        assert_eq!(f.first_child, None);

        let ns = top[1].0;
        assert_eq!(dies.children(ns).count(), 1);
        dies.fixup(ns, constants::DW_LANG_C_plus_plus, &mut |_| None);
        assert_eq!(dies.get(ns).name.as_deref(), Some(ANONYMOUS_NAMESPACE));
        assert!(dies.get(ns).is_fixed_up());
        // The declaration is indexed for specification lookups.
        let (g, _) = dies.children(ns).next().unwrap();
        assert_eq!(dies.find(dies.get(g).offset), Some(g));
    }

    #[test]
    fn test_fixup_specification() {
        // 0x0b cu
        // 0x0f decl "method" (declaration, external)
        // 0x17 definition -> 0x0f
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            .uleb(10)
            .cstr("method")
            .uleb(9)
            .L32(0x0f)
            .L64(0x2000)
            .L64(0x2040)
            .uleb(9)
            .L32(0x10_0000)
            .L64(0x3000)
            .L64(0x3010)
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let mut dies = unit.scan(constants::DW_LANG_C_plus_plus, &complaints);
        let ids: Vec<_> = dies.top_level().map(|(id, _)| id).collect();
        assert_eq!(ids.len(), 3);

        dies.fixup(ids[1], constants::DW_LANG_C_plus_plus, &mut |_| None);
        let def = dies.get(ids[1]);
        assert_eq!(def.name.as_deref(), Some("method"));
        assert!(def.is_external);
        assert!(dies.get(ids[0]).is_fixed_up());

        // A target outside this unit goes through the lookup.
        let mut asked = Vec::new();
        dies.fixup(ids[2], constants::DW_LANG_C_plus_plus, &mut |target| {
            asked.push(target);
            Some(SpecificationInfo {
                name: Some("other".to_string()),
                is_external: false,
            })
        });
        assert_eq!(asked, vec![DieReference::Unit(UnitOffset(0x10_0000))]);
        assert_eq!(dies.get(ids[2]).name.as_deref(), Some("other"));

        // Idempotent.
        dies.fixup(ids[2], constants::DW_LANG_C_plus_plus, &mut |_| unreachable!());
    }

    #[test]
    fn test_guess_structure_name() {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            .uleb(11)
            .uleb(12)
            .cstr("bar")
            .cstr("_ZN2ns3Foo3barEv")
            .D8(0)
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let mut dies = unit.scan(constants::DW_LANG_C_plus_plus, &complaints);
        let (id, _) = dies.top_level().next().unwrap();
        assert_eq!(dies.children(id).count(), 1);
        dies.fixup(id, constants::DW_LANG_C_plus_plus, &mut |_| None);
        assert_eq!(dies.get(id).name.as_deref(), Some("ns::Foo"));
    }

    #[test]
    fn test_named_structure_keeps_name() {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            .uleb(13)
            .cstr("Bar")
            .uleb(12)
            .cstr("baz")
            .cstr("_ZN2ns3Foo3bazEv")
            .D8(0)
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let mut dies = unit.scan(constants::DW_LANG_C_plus_plus, &complaints);
        let (id, _) = dies.top_level().next().unwrap();
        assert_eq!(dies.children(id).count(), 1);
        dies.fixup(id, constants::DW_LANG_C_plus_plus, &mut |_| None);
        assert_eq!(dies.get(id).name.as_deref(), Some("Bar"));
    }

    #[test]
    fn test_c_does_not_descend_into_structs() {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            .uleb(11)
            .uleb(12)
            .cstr("bar")
            .cstr("_ZN2ns3Foo3barEv")
            .D8(0)
            .uleb(2)
            .cstr("char")
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let dies = unit.scan(constants::DW_LANG_C99, &complaints);
        let (id, _) = dies.top_level().next().unwrap();
        assert_eq!(dies.children(id).count(), 0);
        assert_eq!(dies.immediate_symbols()[0].name, "char");
    }

    #[test]
    fn test_invalid_pc_range() {
        let entries = Section::with_endian(Endian::Little)
            .uleb(1)
            .cstr("cu")
            .uleb(9)
            .L32(0x0f)
            .L64(0x2000)
            .L64(0x1000)
            .D8(0);
        let unit = Unit::new(entries);
        let complaints = Complaints::default();
        let dies = unit.scan(constants::DW_LANG_C, &complaints);
        let (_, die) = dies.top_level().next().unwrap();
        assert!(!die.has_pc_info);
        assert_eq!(complaints.count(ComplaintKind::InvalidRange), 1);
    }

    #[test]
    fn test_class_name_from_physname() {
        assert_eq!(
            class_name_from_physname("_ZN2ns3Foo3barEv").as_deref(),
            Some("ns::Foo")
        );
        assert_eq!(
            class_name_from_physname("_ZN3FooIiE3getEv").as_deref(),
            Some("Foo<int>")
        );
        assert_eq!(class_name_from_physname("_Z4freev"), None);
        assert_eq!(class_name_from_physname("not mangled"), None);
    }
}
