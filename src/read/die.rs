//! The full die reader.
//!
//! A unit's dies are decoded into a [`DieTree`]: an arena of [`Die`]s linked
//! by parent, first-child and next-sibling handles, with an offset index for
//! reference lookups. The top die can be read on its own first so that the
//! unit manager can inspect it, substitute the top die of a split unit, and
//! then read the rest of the tree behind it.

use std::collections::HashMap;

use crate::common::{DebugInfoOffset, DebugTypeSignature};
use crate::complaint::{complain, Complaints};
use crate::constants;
use crate::read::unit::{parse_attribute, skip_attributes};
use crate::read::{Abbreviation, Abbreviations, Attribute, AttributeValue, Error, Reader, Result};
use crate::read::{UnitHeader, UnitOffset};

/// The handle of a die within its [`DieTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DieId(pub usize);

/// A decoded debugging information entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Die<R: Reader> {
    offset: UnitOffset,
    tag: constants::DwTag,
    abbrev_code: u64,
    has_children: bool,
    attrs: Vec<Attribute<R>>,
    pub(crate) parent: Option<DieId>,
    pub(crate) first_child: Option<DieId>,
    pub(crate) next_sibling: Option<DieId>,
}

impl<R: Reader> Die<R> {
    /// Construct a die from its parts, unlinked.
    pub fn new(
        offset: UnitOffset,
        tag: constants::DwTag,
        abbrev_code: u64,
        has_children: bool,
        attrs: Vec<Attribute<R>>,
    ) -> Self {
        Die {
            offset,
            tag,
            abbrev_code,
            has_children,
            attrs,
            parent: None,
            first_child: None,
            next_sibling: None,
        }
    }

    /// The offset of the die within its unit.
    pub fn offset(&self) -> UnitOffset {
        self.offset
    }

    /// The die's tag.
    pub fn tag(&self) -> constants::DwTag {
        self.tag
    }

    /// The abbreviation code the die was encoded with.
    pub fn code(&self) -> u64 {
        self.abbrev_code
    }

    /// Whether the abbreviation says the die has children.
    pub fn has_children(&self) -> bool {
        self.has_children
    }

    /// The die's attributes, in encoded order followed by any attributes
    /// copied from a skeleton.
    pub fn attrs(&self) -> &[Attribute<R>] {
        &self.attrs
    }

    /// Find the first attribute with the given name.
    pub fn attr(&self, name: constants::DwAt) -> Option<&Attribute<R>> {
        self.attrs.iter().find(|attr| attr.name() == name)
    }

    /// Find the value of the first attribute with the given name.
    pub fn attr_value(&self, name: constants::DwAt) -> Option<&AttributeValue<R>> {
        self.attr(name).map(Attribute::value)
    }

    /// Append an attribute.
    pub fn push_attr(&mut self, attr: Attribute<R>) {
        self.attrs.push(attr);
    }

    /// The parent die, if this is not the root.
    pub fn parent(&self) -> Option<DieId> {
        self.parent
    }

    /// The first child die.
    pub fn first_child(&self) -> Option<DieId> {
        self.first_child
    }

    /// The next die with the same parent.
    pub fn next_sibling(&self) -> Option<DieId> {
        self.next_sibling
    }

    /// The `DW_AT_sibling` offset, if present.
    pub fn sibling_offset(&self) -> Option<UnitOffset> {
        match self.attr_value(constants::DW_AT_sibling) {
            Some(AttributeValue::UnitRef(offset)) => Some(*offset),
            _ => None,
        }
    }
}

/// The target of a reference attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DieReference {
    /// A die in the same unit.
    Unit(UnitOffset),
    /// A die anywhere in `.debug_info`, or in the alternate file's
    /// `.debug_info` when `alt` is set.
    Section {
        /// The section offset of the die.
        offset: DebugInfoOffset,
        /// Whether the offset is into the alternate (`.dwz`) file.
        alt: bool,
    },
    /// The type defined by the type unit with this signature.
    Signature(DebugTypeSignature),
}

impl DieReference {
    /// Classify an attribute value, returning `None` if it is not a
    /// reference.
    pub fn from_value<R: Reader>(value: &AttributeValue<R>) -> Option<Self> {
        match *value {
            AttributeValue::UnitRef(offset) => Some(DieReference::Unit(offset)),
            AttributeValue::DebugInfoRef(offset) => Some(DieReference::Section { offset, alt: false }),
            AttributeValue::DebugInfoRefSup(offset) => Some(DieReference::Section { offset, alt: true }),
            AttributeValue::DebugTypesRef(signature) => Some(DieReference::Signature(signature)),
            _ => None,
        }
    }
}

/// The dies of one unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DieTree<R: Reader> {
    dies: Vec<Die<R>>,
    by_offset: HashMap<UnitOffset, DieId>,
}

impl<R: Reader> Default for DieTree<R> {
    fn default() -> Self {
        DieTree {
            dies: Vec::new(),
            by_offset: HashMap::new(),
        }
    }
}

impl<R: Reader> DieTree<R> {
    fn push(&mut self, die: Die<R>) -> DieId {
        let id = DieId(self.dies.len());
        self.by_offset.insert(die.offset, id);
        self.dies.push(die);
        id
    }

    /// The top die of the unit.
    pub fn root(&self) -> Option<DieId> {
        if self.dies.is_empty() {
            None
        } else {
            Some(DieId(0))
        }
    }

    /// The top die of the unit.
    pub fn root_die(&self) -> Option<&Die<R>> {
        self.dies.first()
    }

    /// Get a die by handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle is from another tree.
    pub fn get(&self, id: DieId) -> &Die<R> {
        &self.dies[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: DieId) -> &mut Die<R> {
        &mut self.dies[id.0]
    }

    /// Find the die at the given offset in the unit.
    pub fn find(&self, offset: UnitOffset) -> Option<DieId> {
        self.by_offset.get(&offset).copied()
    }

    /// Iterate over the children of a die.
    pub fn children(&self, id: DieId) -> DieChildren<'_, R> {
        DieChildren {
            tree: self,
            next: self.get(id).first_child,
        }
    }

    /// Iterate over all dies in depth-first order.
    pub fn iter(&self) -> impl Iterator<Item = (DieId, &Die<R>)> + '_ {
        self.dies.iter().enumerate().map(|(i, die)| (DieId(i), die))
    }

    /// The number of dies.
    pub fn len(&self) -> usize {
        self.dies.len()
    }

    /// Whether there are no dies.
    pub fn is_empty(&self) -> bool {
        self.dies.is_empty()
    }
}

/// An iterator over the children of a die.
#[derive(Debug)]
pub struct DieChildren<'a, R: Reader> {
    tree: &'a DieTree<R>,
    next: Option<DieId>,
}

impl<'a, R: Reader> Iterator for DieChildren<'a, R> {
    type Item = (DieId, &'a Die<R>);

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.next?;
        let die = self.tree.get(id);
        self.next = die.next_sibling;
        Some((id, die))
    }
}

/// Decodes the dies of one unit.
#[derive(Debug, Clone, Copy)]
pub struct DieReader<'a, R: Reader> {
    header: &'a UnitHeader<R>,
    abbrevs: &'a Abbreviations,
    complaints: &'a Complaints,
    is_alt: bool,
    dump: bool,
}

impl<'a, R: Reader> DieReader<'a, R> {
    /// Create a reader for the unit with the given header and abbreviations.
    pub fn new(
        header: &'a UnitHeader<R>,
        abbrevs: &'a Abbreviations,
        complaints: &'a Complaints,
    ) -> Self {
        DieReader {
            header,
            abbrevs,
            complaints,
            is_alt: false,
            dump: false,
        }
    }

    /// Mark the unit as belonging to the alternate (`.dwz`) file.
    pub fn alt(mut self, is_alt: bool) -> Self {
        self.is_alt = is_alt;
        self
    }

    /// Log every decoded die.
    pub fn dump(mut self, dump: bool) -> Self {
        self.dump = dump;
        self
    }

    /// The header of the unit being read.
    pub fn header(&self) -> &'a UnitHeader<R> {
        self.header
    }

    /// The unit-relative offset of the current position of `input`.
    pub fn offset_of(&self, input: &R) -> UnitOffset {
        UnitOffset(self.header.header_size() + input.offset_from(self.header.entries_buf()))
    }

    pub(crate) fn abbreviation(&self, code: u64, offset: UnitOffset) -> Result<&'a Abbreviation> {
        self.abbrevs.get(code).ok_or(Error::InvalidAbbreviationCode {
            code,
            offset: self.header.offset().raw() + offset.0,
        })
    }

    /// Read the die at the front of `input`.
    ///
    /// Returns `None` for a null entry, which ends a list of siblings.
    pub fn read_die(&self, input: &mut R) -> Result<Option<Die<R>>> {
        let offset = self.offset_of(input);
        let code = input.read_uleb128()?;
        if code == 0 {
            return Ok(None);
        }
        let abbrev = self.abbreviation(code, offset)?;
        let mut attrs = Vec::with_capacity(abbrev.attributes().len());
        for spec in abbrev.attributes() {
            let attr = parse_attribute(input, self.header.encoding(), *spec)?;
            attrs.push(self.fix_attribute(attr, offset));
        }
        let die = Die::new(offset, abbrev.tag(), code, abbrev.has_children(), attrs);
        if self.dump {
            self.dump_die(&die);
        }
        Ok(Some(die))
    }

    fn fix_attribute(&self, attr: Attribute<R>, offset: UnitOffset) -> Attribute<R> {
        let mut attr = if self.is_alt { attr.into_alt() } else { attr };
        if attr.name() == constants::DW_AT_byte_size {
            if attr.form() == constants::DW_FORM_data4 {
                if let Some(size @ 0xffff_ffff) = attr.udata_value() {
                    complain!(
                        self.complaints,
                        ByteSizeClamped,
                        "suspicious DW_AT_byte_size value 0x{:x} treated as zero in die at 0x{:x}",
                        size,
                        self.header.offset().raw() + offset.0
                    );
                    attr.set_value(AttributeValue::Udata(0));
                }
            }
        }
        attr
    }

    fn dump_die(&self, die: &Die<R>) {
        tracing::info!(
            target: "dwarf_dies::die",
            offset = self.header.offset().raw() + die.offset.0,
            tag = %die.tag,
            code = die.abbrev_code,
            has_children = die.has_children,
            "die"
        );
        for attr in &die.attrs {
            tracing::info!(
                target: "dwarf_dies::die",
                name = %attr.name(),
                form = %attr.form(),
                value = ?attr.value(),
                "  attribute"
            );
        }
    }

    /// Read the top die of the unit, returning it and the input that
    /// follows it.
    pub fn read_top_die(&self) -> Result<Option<(Die<R>, R)>> {
        let mut input = self.header.entries_buf().clone();
        if input.is_empty() {
            return Ok(None);
        }
        Ok(self.read_die(&mut input)?.map(|die| (die, input)))
    }

    /// Read the dies that follow `top` into a tree rooted at it.
    ///
    /// `top` may have been read by another reader: the top die of a split
    /// unit is combined with attributes of its skeleton before the rest of
    /// the split unit is read behind it.
    pub fn read_tree(&self, top: Die<R>, mut input: R) -> Result<DieTree<R>> {
        let mut tree = DieTree::default();
        let root = tree.push(top);
        if !tree.get(root).has_children {
            return Ok(tree);
        }

        // (parent, last child read so far)
        let mut stack: Vec<(DieId, Option<DieId>)> = vec![(root, None)];
        while let Some(&(parent, last)) = stack.last() {
            if input.is_empty() {
                // Truncated child lists end at the end of the unit.
                break;
            }
            let mut die = match self.read_die(&mut input)? {
                Some(die) => die,
                None => {
                    stack.pop();
                    continue;
                }
            };
            die.parent = Some(parent);
            let has_children = die.has_children;
            let id = tree.push(die);
            match last {
                Some(prev) => tree.get_mut(prev).next_sibling = Some(id),
                None => tree.get_mut(parent).first_child = Some(id),
            }
            if let Some(top) = stack.last_mut() {
                top.1 = Some(id);
            }
            if has_children {
                stack.push((id, None));
            }
        }
        Ok(tree)
    }

    /// Read the whole unit into a tree.
    pub fn read_unit(&self) -> Result<DieTree<R>> {
        match self.read_top_die()? {
            Some((top, rest)) => self.read_tree(top, rest),
            None => Ok(DieTree::default()),
        }
    }

    /// Skip the die at the front of `input`.
    ///
    /// Returns `None` for a null entry, otherwise whether the die's children
    /// still follow in `input`. Children are jumped over with
    /// `DW_AT_sibling` when it points forward within the unit.
    pub fn skip_die(&self, input: &mut R) -> Result<Option<bool>> {
        let offset = self.offset_of(input);
        let code = input.read_uleb128()?;
        if code == 0 {
            return Ok(None);
        }
        let abbrev = self.abbreviation(code, offset)?;
        if !abbrev.has_children() || abbrev.attribute(constants::DW_AT_sibling).is_none() {
            skip_attributes(input, self.header.encoding(), abbrev.attributes())?;
            return Ok(Some(abbrev.has_children()));
        }

        let mut sibling = None;
        for spec in abbrev.attributes() {
            let attr = parse_attribute(input, self.header.encoding(), *spec)?;
            if attr.name() == constants::DW_AT_sibling {
                if let AttributeValue::UnitRef(target) = *attr.value() {
                    sibling = Some(target);
                }
            }
        }
        match sibling {
            Some(target) if target > offset && self.header.is_valid_offset(target) => {
                *input = self.header.range_from(target..)?;
                Ok(Some(false))
            }
            Some(target) => {
                complain!(
                    self.complaints,
                    DanglingReference,
                    "ignoring DW_AT_sibling 0x{:x} of die at 0x{:x}",
                    target.0,
                    self.header.offset().raw() + offset.0
                );
                Ok(Some(true))
            }
            None => Ok(Some(true)),
        }
    }

    /// Skip the children of a die whose attributes have been read.
    pub fn skip_children(&self, input: &mut R) -> Result<()> {
        let mut depth = 1usize;
        while depth > 0 && !input.is_empty() {
            match self.skip_die(input)? {
                None => depth -= 1,
                Some(true) => depth += 1,
                Some(false) => {}
            }
        }
        Ok(())
    }
}
