use std::collections::HashSet;

use crate::common::DebugLineOffset;
use crate::constants;
use crate::read::{Die, DieTree, LineProgramHeader, PartialDies, Reader, UnitBases, UnitHeader};
use crate::split::DwoFileId;
use crate::units::{Producer, UnitId};

/// Which file a unit's dies were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitFile {
    /// The main object file.
    Main,
    /// The alternate (`dwz`) file.
    Alt,
    /// A split DWARF file, or a virtual one inside a package.
    Dwo(DwoFileId),
}

/// The decoded contents of a loaded unit.
///
/// A state is created when a unit is first loaded and freed when the
/// cache ages it out. Dies handed out by the context are only valid while
/// the state is alive.
#[derive(Debug)]
pub struct UnitState<R: Reader> {
    pub(crate) header: UnitHeader<R>,
    pub(crate) file: UnitFile,
    pub(crate) bases: UnitBases,
    pub(crate) top: Die<R>,
    pub(crate) language: constants::DwLang,
    pub(crate) producer: Producer,
    pub(crate) name: Option<String>,
    pub(crate) comp_dir: Option<String>,
    pub(crate) base_address: Option<u64>,
    pub(crate) stmt_list: Option<DebugLineOffset>,
    pub(crate) line_header: Option<LineProgramHeader<R>>,
    pub(crate) dies: Option<DieTree<R>>,
    pub(crate) partial: Option<PartialDies>,
    pub(crate) dwo_missing: bool,
    pub(crate) dependencies: HashSet<UnitId>,
    pub(crate) last_used: u32,
    pub(crate) mark: bool,
}

impl<R: Reader> UnitState<R> {
    /// The header of the unit the dies were read from. For a unit
    /// completed from a split file this is the split unit's header.
    pub fn header(&self) -> &UnitHeader<R> {
        &self.header
    }

    /// The file the dies were read from.
    pub fn file(&self) -> UnitFile {
        self.file
    }

    /// The split file the unit was completed from, if any.
    pub fn dwo_file(&self) -> Option<DwoFileId> {
        match self.file {
            UnitFile::Dwo(id) => Some(id),
            _ => None,
        }
    }

    /// Whether the unit is a skeleton whose split file was not found.
    pub fn is_dwo_missing(&self) -> bool {
        self.dwo_missing
    }

    /// The bases for indexed forms in the unit.
    pub fn bases(&self) -> &UnitBases {
        &self.bases
    }

    /// The unit die. For a split unit it carries the attributes inherited
    /// from its skeleton.
    pub fn top_die(&self) -> &Die<R> {
        &self.top
    }

    /// `DW_AT_language`, or 0 if absent.
    pub fn language(&self) -> constants::DwLang {
        self.language
    }

    /// The parsed `DW_AT_producer`.
    pub fn producer(&self) -> &Producer {
        &self.producer
    }

    /// `DW_AT_name` of the unit die.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// `DW_AT_comp_dir` of the unit die.
    pub fn comp_dir(&self) -> Option<&str> {
        self.comp_dir.as_deref()
    }

    /// The base address for location and range lists.
    pub fn base_address(&self) -> Option<u64> {
        self.base_address
    }

    /// `DW_AT_stmt_list`.
    pub fn stmt_list(&self) -> Option<DebugLineOffset> {
        self.stmt_list
    }

    /// The line program header named by `DW_AT_stmt_list`.
    pub fn line_header(&self) -> Option<&LineProgramHeader<R>> {
        self.line_header.as_ref()
    }

    /// The full die tree, if the unit was loaded in full.
    pub fn dies(&self) -> Option<&DieTree<R>> {
        self.dies.as_ref()
    }

    /// The partial dies, if the unit was scanned for partial symbols.
    pub fn partial_dies(&self) -> Option<&PartialDies> {
        self.partial.as_ref()
    }

    /// The units whose dies this unit's dies refer to.
    pub fn dependencies(&self) -> &HashSet<UnitId> {
        &self.dependencies
    }

    /// The number of cache sweeps since the unit was last used.
    pub fn last_used(&self) -> u32 {
        self.last_used
    }
}
