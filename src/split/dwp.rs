//! DWARF package (`.dwp`) files.
//!
//! A package holds the split units of many compilation units. Its
//! `.debug_cu_index` and `.debug_tu_index` map a `dwo_id` or type
//! signature to the unit's share of each section. Units whose shares of
//! the abbreviation, line, location and string offset sections coincide
//! are grouped into one virtual [`DwoFile`], so the rest of the reader can
//! treat them like units of an ordinary DWO file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::common::{DebugInfoOffset, DebugTypesOffset, UnitSectionOffset};
use crate::complaint::{complain, Complaints};
use crate::loader::{FileLoader, ObjectSections};
use crate::read::unit::parse_unit_header;
use crate::read::{
    Dwarf, Error, IndexSectionId, Reader, Result, Section, UnitIndex, UnitIndexRow,
    UnitIndexSection,
};
use crate::split::dwo::{DwoFile, DwoFileId, DwoFiles};

/// The paths to try, in order, for the package of `binary`.
///
/// The package sits beside the binary with a `.dwp` suffix. Both the path
/// as given and its canonical form are tried, and if the binary is itself a
/// separate debug file, so is the path of the binary it was split from.
pub fn dwp_candidates(binary: &Path, original_binary: Option<&Path>) -> Vec<PathBuf> {
    let with_suffix = |path: &Path| {
        let mut name = path.as_os_str().to_os_string();
        name.push(".dwp");
        PathBuf::from(name)
    };
    let mut candidates = vec![with_suffix(binary)];
    if let Ok(canonical) = std::fs::canonicalize(binary) {
        let candidate = with_suffix(&canonical);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    if let Some(original) = original_binary {
        let candidate = with_suffix(original);
        if !candidates.contains(&candidate) {
            candidates.push(candidate);
        }
    }
    candidates
}

/// An open DWARF package.
#[derive(Debug)]
pub struct DwpFile<R: Reader> {
    path: PathBuf,
    sections: ObjectSections<R>,
    dwarf: Dwarf<R>,
    cu_index: UnitIndex<R>,
    tu_index: UnitIndex<R>,
    // (is_type_unit, signature) -> the virtual file holding the unit.
    units: HashMap<(bool, u64), Option<DwoFileId>>,
}

impl<R: Reader> DwpFile<R> {
    /// Parse the indexes of a package.
    ///
    /// Fails if the CU and TU indexes are both present but disagree on
    /// their version.
    pub fn new(sections: ObjectSections<R>) -> Result<Self> {
        let dwarf = sections.dwo_dwarf();
        let cu_index = dwarf.debug_cu_index.clone().index()?;
        let tu_index = dwarf.debug_tu_index.clone().index()?;
        let (cu, tu) = (cu_index.version(), tu_index.version());
        if cu != 0 && tu != 0 && cu != tu {
            return Err(Error::IndexVersionMismatch { cu, tu });
        }
        tracing::debug!(
            path = %sections.path.display(),
            version = cu.max(tu),
            cus = cu_index.unit_count(),
            tus = tu_index.unit_count(),
            "opened DWARF package"
        );
        Ok(DwpFile {
            path: sections.path.clone(),
            sections,
            dwarf,
            cu_index,
            tu_index,
            units: HashMap::new(),
        })
    }

    /// Open the first of `candidates` that exists.
    pub fn open(loader: &dyn FileLoader<R>, candidates: &[PathBuf]) -> Result<Option<Self>> {
        for candidate in candidates {
            if let Some(sections) = loader.open(candidate)? {
                return DwpFile::new(sections).map(Some);
            }
        }
        tracing::trace!(?candidates, "no DWARF package");
        Ok(None)
    }

    /// Where the package was found.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The index format version, or zero if the package has no index.
    pub fn version(&self) -> u32 {
        self.cu_index.version().max(self.tu_index.version())
    }

    /// The compilation unit index.
    pub fn cu_index(&self) -> &UnitIndex<R> {
        &self.cu_index
    }

    /// The type unit index.
    pub fn tu_index(&self) -> &UnitIndex<R> {
        &self.tu_index
    }

    /// Find the unit with the given `dwo_id` or type signature and return
    /// the virtual DWO file it was added to.
    ///
    /// Lookups are cached, including misses.
    pub fn lookup_unit(
        &mut self,
        files: &mut DwoFiles<R>,
        signature: u64,
        is_type_unit: bool,
        complaints: &Complaints,
    ) -> Result<Option<DwoFileId>> {
        let key = (is_type_unit, signature);
        if let Some(known) = self.units.get(&key) {
            return Ok(*known);
        }
        let index = if is_type_unit {
            &self.tu_index
        } else {
            &self.cu_index
        };
        let found = match index.find(signature) {
            Some(row) => match index.row(row)? {
                UnitIndexRow::SectionNumbers(numbers) => {
                    self.load_v1(files, &numbers, complaints)?
                }
                UnitIndexRow::Contributions(contributions) => {
                    self.load_v2(files, &contributions, is_type_unit, complaints)?
                }
            },
            None => None,
        };
        tracing::trace!(
            signature = format_args!("0x{:016x}", signature),
            is_type_unit,
            found = found.is_some(),
            "DWP lookup"
        );
        self.units.insert(key, found);
        Ok(found)
    }

    /// Version 1 rows name whole sections of the package. Every unit in
    /// them is indexed the first time the section set is seen.
    fn load_v1(
        &self,
        files: &mut DwoFiles<R>,
        numbers: &[u32],
        complaints: &Complaints,
    ) -> Result<Option<DwoFileId>> {
        let mut dwarf = self.dwarf.clone();
        let mut seen = Vec::new();
        // abbrev, line, loc, str_offsets
        let mut key = [0u32; 4];
        for &number in numbers {
            let section = self
                .sections
                .section_by_number(number)
                .ok_or(Error::MissingIndexSection(number))?;
            let id = match IndexSectionId::from_dwo_name(&section.name) {
                Some(id) => id,
                None => {
                    complain!(
                        complaints,
                        BadIndexUnit,
                        "DWP section {} ({}) is not a split DWARF section",
                        number,
                        section.name
                    );
                    continue;
                }
            };
            if seen.contains(&id) {
                return Err(Error::DuplicateIndexSection(id.section_id()));
            }
            seen.push(id);
            let data = section.data.clone();
            match id {
                IndexSectionId::DebugAbbrev => {
                    dwarf.debug_abbrev = data.into();
                    key[0] = number;
                }
                IndexSectionId::DebugLine => {
                    dwarf.debug_line = data.into();
                    key[1] = number;
                }
                IndexSectionId::DebugLoc | IndexSectionId::DebugLocLists => key[2] = number,
                IndexSectionId::DebugStrOffsets => {
                    dwarf.debug_str_offsets = data.into();
                    key[3] = number;
                }
                IndexSectionId::DebugInfo => dwarf.debug_info = data.into(),
                IndexSectionId::DebugTypes => dwarf.debug_types = data.into(),
                _ => {}
            }
        }

        let name = virtual_name(key);
        if let Some(known) = files.lookup(&name, None) {
            return Ok(known);
        }
        let id = files.insert_virtual(DwoFile::new(name, None, dwarf));
        let file = files.get_mut(id);
        let mut headers = file.dwarf().units();
        while let Some(header) = headers.next()? {
            file.add_unit(id, header, complaints)?;
        }
        let mut headers = file.dwarf().type_units();
        while let Some(header) = headers.next()? {
            file.add_unit(id, header, complaints)?;
        }
        Ok(Some(id))
    }

    /// Version 2 and 5 rows give each unit's share of each section.
    fn load_v2(
        &self,
        files: &mut DwoFiles<R>,
        contributions: &[UnitIndexSection],
        is_type_unit: bool,
        complaints: &Complaints,
    ) -> Result<Option<DwoFileId>> {
        let mut dwarf = self.dwarf.clone();
        let mut key = [0u32; 4];
        let mut unit: Option<(R, UnitSectionOffset)> = None;
        for contribution in contributions {
            let (offset, size) = (contribution.offset, contribution.size);
            match contribution.section {
                IndexSectionId::DebugAbbrev => {
                    dwarf.debug_abbrev = self.dwarf.debug_abbrev.dwp_range(offset, size)?;
                    key[0] = offset;
                }
                IndexSectionId::DebugLine => {
                    dwarf.debug_line = self.dwarf.debug_line.dwp_range(offset, size)?;
                    key[1] = offset;
                }
                IndexSectionId::DebugLoc | IndexSectionId::DebugLocLists => key[2] = offset,
                IndexSectionId::DebugStrOffsets => {
                    dwarf.debug_str_offsets =
                        self.dwarf.debug_str_offsets.dwp_range(offset, size)?;
                    key[3] = offset;
                }
                IndexSectionId::DebugInfo => {
                    let data = self.dwarf.debug_info.dwp_range(offset, size)?;
                    let at = UnitSectionOffset::from(DebugInfoOffset(offset as usize));
                    unit.get_or_insert((data.reader().clone(), at));
                }
                IndexSectionId::DebugTypes => {
                    let data = self.dwarf.debug_types.dwp_range(offset, size)?;
                    let at = UnitSectionOffset::from(DebugTypesOffset(offset as usize));
                    unit = Some((data.reader().clone(), at));
                }
                _ => {}
            }
        }
        let (mut input, at) = match unit {
            Some(unit) => unit,
            None => {
                complain!(
                    complaints,
                    BadIndexUnit,
                    "DWP {} row has no unit contribution",
                    if is_type_unit { "TU" } else { "CU" }
                );
                return Ok(None);
            }
        };

        let name = virtual_name(key);
        let id = match files.lookup(&name, None) {
            Some(Some(id)) => id,
            _ => files.insert_virtual(DwoFile::new(name, None, dwarf)),
        };
        let header = parse_unit_header(&mut input, at)?;
        files.get_mut(id).add_unit(id, header, complaints)?;
        Ok(Some(id))
    }
}

fn virtual_name(key: [u32; 4]) -> String {
    format!("virtual-dwo/{}-{}-{}-{}", key[0], key[1], key[2], key[3])
}
