use crate::common::{DebugTypeSignature, UnitSectionOffset};
use crate::read::UnitOffset;
use crate::split::DwoFileId;
use crate::symtab::PartialSymtab;
use crate::units::TypeUnitGroupId;

/// The handle of a unit known to a [`DwarfContext`](crate::units::DwarfContext).
///
/// Compilation units come first, ordered by `(is_dwz, offset)`, and type
/// units follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(pub usize);

/// The file a unit's header lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitSource {
    /// The main object file.
    Main,
    /// The alternate (`dwz`) file.
    Alt,
    /// A split DWARF file, or a virtual one inside a package.
    Dwo(DwoFileId),
    /// A DWARF package type unit that has not been located yet.
    Dwp,
}

/// What kind of unit a descriptor stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    /// A compilation unit, or a skeleton for one.
    Compile,
    /// A partial unit, imported by others.
    Partial,
    /// A type unit.
    Type,
}

/// The lightweight, always-present record of a unit.
///
/// The decoded contents live in a [`UnitState`](crate::units::UnitState)
/// that comes and goes with the cache; the descriptor outlives it.
#[derive(Debug, Clone)]
pub struct UnitDescriptor {
    pub(crate) offset: UnitSectionOffset,
    pub(crate) length: usize,
    pub(crate) version: u16,
    pub(crate) source: UnitSource,
    pub(crate) kind: UnitKind,
    pub(crate) signature: Option<DebugTypeSignature>,
    pub(crate) type_offset: Option<UnitOffset>,
    pub(crate) queued: bool,
    pub(crate) expanded: bool,
    pub(crate) type_unit_group: Option<TypeUnitGroupId>,
    pub(crate) psymtab: Option<PartialSymtab>,
}

impl UnitDescriptor {
    pub(crate) fn new(offset: UnitSectionOffset, length: usize, source: UnitSource) -> Self {
        UnitDescriptor {
            offset,
            length,
            version: 0,
            source,
            kind: UnitKind::Compile,
            signature: None,
            type_offset: None,
            queued: false,
            expanded: false,
            type_unit_group: None,
            psymtab: None,
        }
    }

    pub(crate) fn type_unit(
        offset: UnitSectionOffset,
        length: usize,
        source: UnitSource,
        signature: DebugTypeSignature,
        type_offset: UnitOffset,
    ) -> Self {
        UnitDescriptor {
            kind: UnitKind::Type,
            signature: Some(signature),
            type_offset: Some(type_offset),
            ..UnitDescriptor::new(offset, length, source)
        }
    }

    /// The offset of the unit header in its section.
    pub fn offset(&self) -> UnitSectionOffset {
        self.offset
    }

    /// The length of the unit including its initial length field, or 0 if
    /// it is not known until the unit is read.
    pub fn length(&self) -> usize {
        self.length
    }

    /// The DWARF version, or 0 if the header has not been read.
    pub fn version(&self) -> u16 {
        self.version
    }

    /// Where the unit's header lives.
    pub fn source(&self) -> UnitSource {
        self.source
    }

    /// The kind of unit.
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Whether the unit lives in the alternate file.
    pub fn is_dwz(&self) -> bool {
        self.source == UnitSource::Alt
    }

    /// Whether this is a type unit.
    pub fn is_type_unit(&self) -> bool {
        self.kind == UnitKind::Type
    }

    /// The type signature of a type unit.
    pub fn signature(&self) -> Option<DebugTypeSignature> {
        self.signature
    }

    /// The offset of the die defining a type unit's type.
    pub fn type_offset(&self) -> Option<UnitOffset> {
        self.type_offset
    }

    /// Whether the unit is waiting in the expansion queue.
    pub fn is_queued(&self) -> bool {
        self.queued
    }

    /// Whether the unit has been expanded.
    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    /// The group a type unit was placed in.
    pub fn type_unit_group(&self) -> Option<TypeUnitGroupId> {
        self.type_unit_group
    }

    /// The partial symbol table, once built.
    pub fn psymtab(&self) -> Option<&PartialSymtab> {
        self.psymtab.as_ref()
    }

    /// The section offset just past the unit, if its length is known.
    pub(crate) fn end(&self) -> usize {
        self.offset.raw() + self.length
    }

    pub(crate) fn contains(&self, offset: usize) -> bool {
        offset >= self.offset.raw() && (self.length == 0 || offset < self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::DebugInfoOffset;

    #[test]
    fn test_contains() {
        let unit = UnitDescriptor::new(DebugInfoOffset(0x20).into(), 0x10, UnitSource::Main);
        assert!(unit.contains(0x20));
        assert!(unit.contains(0x2f));
        assert!(!unit.contains(0x30));
        assert!(!unit.contains(0x1f));
        assert!(!unit.is_dwz());
        assert_eq!(unit.kind(), UnitKind::Compile);
    }
}
