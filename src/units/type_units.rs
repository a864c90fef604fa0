//! Grouping of type units that share a line table.
//!
//! Type units from the same file that name the same `DW_AT_stmt_list`
//! share one set of source file names. The first type unit of a group
//! resolves them; the others reuse that list.

use std::collections::HashMap;
use std::sync::Arc;

use crate::common::DebugLineOffset;
use crate::read::{Reader, Result};
use crate::split::DwoFileId;
use crate::units::{DwarfContext, ReadMode, UnitId};

/// The handle of a [`TypeUnitGroup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeUnitGroupId(pub usize);

/// What makes type units share a group: the split file they were read
/// from, if any, and their line table.
pub type TypeUnitGroupKey = (Option<DwoFileId>, Option<DebugLineOffset>);

/// Type units sharing a line table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeUnitGroup {
    key: TypeUnitGroupKey,
    units: Vec<UnitId>,
    file_names: Option<Arc<Vec<String>>>,
    created_by: UnitId,
}

impl TypeUnitGroup {
    /// The split file and line table the group is keyed on.
    pub fn key(&self) -> TypeUnitGroupKey {
        self.key
    }

    /// The type units in the group, in the order they joined it.
    pub fn units(&self) -> &[UnitId] {
        &self.units
    }

    /// The unit whose line header the file names came from.
    pub fn created_by(&self) -> UnitId {
        self.created_by
    }

    /// The source file names of the shared line table, once resolved.
    pub fn file_names(&self) -> Option<&Arc<Vec<String>>> {
        self.file_names.as_ref()
    }
}

/// Every type unit group of a context.
#[derive(Debug, Default)]
pub struct TypeUnitGroups {
    groups: Vec<TypeUnitGroup>,
    by_key: HashMap<TypeUnitGroupKey, TypeUnitGroupId>,
}

impl TypeUnitGroups {
    /// A group by handle.
    pub fn get(&self, id: TypeUnitGroupId) -> Option<&TypeUnitGroup> {
        self.groups.get(id.0)
    }

    /// The number of groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl<'l, R: Reader> DwarfContext<'l, R> {
    /// The groups formed so far.
    pub fn type_unit_groups(&self) -> &TypeUnitGroups {
        &self.type_unit_groups
    }

    /// Place a type unit in its group, loading it if needed.
    ///
    /// Returns `None` for a unit that is not a type unit or has no dies.
    pub fn type_unit_group(&mut self, tu: UnitId) -> Result<Option<TypeUnitGroupId>> {
        let unit = self.unit(tu)?;
        if !unit.is_type_unit() {
            return Ok(None);
        }
        if let Some(group) = unit.type_unit_group {
            return Ok(Some(group));
        }
        let loaded = match self.states.get(&tu) {
            Some(_) => true,
            None => self.load_unit(tu, ReadMode::Partial)?,
        };
        if !loaded {
            return Ok(None);
        }
        let key = match self.states.get(&tu) {
            Some(state) => (state.dwo_file(), state.stmt_list),
            None => return Ok(None),
        };

        let id = match self.type_unit_groups.by_key.get(&key) {
            Some(&id) => {
                self.type_unit_groups.groups[id.0].units.push(tu);
                id
            }
            None => {
                let file_names = self.line_file_names(tu)?;
                let id = TypeUnitGroupId(self.type_unit_groups.groups.len());
                self.type_unit_groups.groups.push(TypeUnitGroup {
                    key,
                    units: vec![tu],
                    file_names,
                    created_by: tu,
                });
                self.type_unit_groups.by_key.insert(key, id);
                tracing::trace!(group = id.0, unit = tu.0, "new type unit group");
                id
            }
        };
        self.units[tu.0].type_unit_group = Some(id);
        Ok(Some(id))
    }

    /// The source file names of a type unit's line table, shared with the
    /// rest of its group.
    pub fn type_unit_file_names(&mut self, tu: UnitId) -> Result<Option<Arc<Vec<String>>>> {
        Ok(self
            .type_unit_group(tu)?
            .and_then(|id| self.type_unit_groups.get(id))
            .and_then(|group| group.file_names.clone()))
    }

    fn line_file_names(&self, id: UnitId) -> Result<Option<Arc<Vec<String>>>> {
        let state = match self.states.get(&id) {
            Some(state) => state,
            None => return Ok(None),
        };
        let line = match state.line_header.as_ref() {
            Some(line) => line,
            None => return Ok(None),
        };
        let strings = self.string_dwarf(state.file);
        let names = line
            .file_names()
            .iter()
            .map(|entry| line.file_path(strings, &state.bases, entry))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Arc::new(names)))
    }
}
