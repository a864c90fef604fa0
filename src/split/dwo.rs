//! Split DWARF (`.dwo`) files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::common::{DebugTypeSignature, DwoId};
use crate::complaint::{complain, Complaints};
use crate::constants;
use crate::loader::FileLoader;
use crate::read::{
    AbbreviationsCache, DieReader, Dwarf, Reader, Result, UnitHeader, UnitOffset, UnitType,
};

/// The handle of an open DWO file, real or virtual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DwoFileId(pub usize);

/// One unit of a DWO file.
#[derive(Debug, Clone)]
pub struct DwoUnit<R: Reader> {
    /// The file holding the unit.
    pub file: DwoFileId,
    /// The parsed header, which also delimits the unit's dies.
    pub header: UnitHeader<R>,
    /// The `dwo_id` of a compilation unit, or the signature of a type unit.
    pub signature: u64,
    /// For type units, the offset of the die defining the type.
    pub type_offset: Option<UnitOffset>,
}

/// An open DWO file, or a virtual one made of a DWARF package's
/// contributions.
#[derive(Debug)]
pub struct DwoFile<R: Reader> {
    name: String,
    comp_dir: Option<String>,
    path: Option<PathBuf>,
    dwarf: Dwarf<R>,
    abbrevs: AbbreviationsCache,
    cus: HashMap<DwoId, DwoUnit<R>>,
    tus: HashMap<DebugTypeSignature, DwoUnit<R>>,
}

impl<R: Reader> DwoFile<R> {
    /// Wrap the sections of a DWO file without looking at its units.
    pub fn new(name: String, comp_dir: Option<String>, dwarf: Dwarf<R>) -> Self {
        DwoFile {
            name,
            comp_dir,
            path: None,
            dwarf,
            abbrevs: AbbreviationsCache::new(),
            cus: HashMap::new(),
            tus: HashMap::new(),
        }
    }

    /// Wrap the sections of a standalone DWO file and index every unit in
    /// it by `dwo_id` or type signature.
    pub fn open(
        id: DwoFileId,
        name: String,
        comp_dir: Option<String>,
        path: PathBuf,
        dwarf: Dwarf<R>,
        complaints: &Complaints,
    ) -> Result<Self> {
        let mut file = DwoFile::new(name, comp_dir, dwarf);
        file.path = Some(path);

        let mut headers = file.dwarf.units();
        while let Some(header) = headers.next()? {
            file.add_unit(id, header, complaints)?;
        }
        let mut headers = file.dwarf.type_units();
        while let Some(header) = headers.next()? {
            file.add_unit(id, header, complaints)?;
        }
        tracing::debug!(
            name = %file.name,
            cus = file.cus.len(),
            tus = file.tus.len(),
            "indexed DWO file"
        );
        Ok(file)
    }

    /// Index one unit, whose header was read from this file's sections or
    /// from a package contribution.
    ///
    /// Returns the unit's `(is_type_unit, signature)` if it had one.
    pub fn add_unit(
        &mut self,
        id: DwoFileId,
        header: UnitHeader<R>,
        complaints: &Complaints,
    ) -> Result<Option<(bool, u64)>> {
        if header.is_dummy() {
            return Ok(None);
        }
        match header.type_() {
            UnitType::Type {
                type_signature,
                type_offset,
            }
            | UnitType::SplitType {
                type_signature,
                type_offset,
            } => {
                if self.tus.contains_key(&type_signature) {
                    complain!(
                        complaints,
                        DuplicateSignature,
                        "debug type entry at offset 0x{:x} is duplicate of signature 0x{:016x} in {}",
                        header.offset().raw(),
                        type_signature.0,
                        self.name
                    );
                    return Ok(None);
                }
                self.tus.insert(
                    type_signature,
                    DwoUnit {
                        file: id,
                        header,
                        signature: type_signature.0,
                        type_offset: Some(type_offset),
                    },
                );
                Ok(Some((true, type_signature.0)))
            }
            _ => {
                let dwo_id = match header.dwo_id() {
                    Some(dwo_id) => Some(dwo_id),
                    None => self.gnu_dwo_id(&header, complaints)?,
                };
                let dwo_id = match dwo_id {
                    Some(dwo_id) => dwo_id,
                    None => {
                        tracing::debug!(
                            offset = header.offset().raw(),
                            name = %self.name,
                            "DWO unit without dwo_id"
                        );
                        return Ok(None);
                    }
                };
                self.cus.insert(
                    dwo_id,
                    DwoUnit {
                        file: id,
                        header,
                        signature: dwo_id.0,
                        type_offset: None,
                    },
                );
                Ok(Some((false, dwo_id.0)))
            }
        }
    }

    fn gnu_dwo_id(&mut self, header: &UnitHeader<R>, complaints: &Complaints) -> Result<Option<DwoId>> {
        let abbrevs = self
            .abbrevs
            .get(&self.dwarf.debug_abbrev, header.debug_abbrev_offset())?;
        let reader = DieReader::new(header, &abbrevs, complaints);
        let top = match reader.read_top_die()? {
            Some((die, _)) => die,
            None => return Ok(None),
        };
        Ok(top
            .attr(constants::DW_AT_GNU_dwo_id)
            .and_then(|attr| attr.udata_value())
            .map(DwoId))
    }

    /// The name the file was looked up by.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The compilation directory the file was looked up relative to.
    pub fn comp_dir(&self) -> Option<&str> {
        self.comp_dir.as_deref()
    }

    /// Where the file was found, if it is not virtual.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The file's sections.
    pub fn dwarf(&self) -> &Dwarf<R> {
        &self.dwarf
    }

    /// The file's abbreviation tables.
    pub fn abbreviations_cache(&mut self) -> &mut AbbreviationsCache {
        &mut self.abbrevs
    }

    /// Find a compilation unit by `dwo_id`.
    pub fn compile_unit(&self, dwo_id: DwoId) -> Option<&DwoUnit<R>> {
        self.cus.get(&dwo_id)
    }

    /// Find a type unit by signature.
    pub fn type_unit(&self, signature: DebugTypeSignature) -> Option<&DwoUnit<R>> {
        self.tus.get(&signature)
    }

    /// The file's type units.
    pub fn type_units(&self) -> impl Iterator<Item = &DwoUnit<R>> + '_ {
        self.tus.values()
    }

    /// The number of compilation units found.
    pub fn compile_unit_count(&self) -> usize {
        self.cus.len()
    }
}

/// The paths to try, in order, for a DWO file named `name` by a unit
/// compiled in `comp_dir`.
pub fn dwo_candidates(name: &str, comp_dir: Option<&str>, search_path: &[PathBuf]) -> Vec<PathBuf> {
    let path = Path::new(name);
    if path.is_absolute() {
        return vec![path.to_path_buf()];
    }
    let mut candidates = Vec::new();
    match comp_dir {
        Some(dir) => candidates.push(Path::new(dir).join(path)),
        None => candidates.push(path.to_path_buf()),
    }
    for dir in search_path {
        candidates.push(dir.join(path));
    }
    if let Some(file_name) = path.file_name() {
        if Path::new(file_name) != path {
            for dir in search_path {
                candidates.push(dir.join(file_name));
            }
        }
    }
    candidates
}

/// Every DWO file opened for one object file, real or virtual.
///
/// Failed lookups are remembered, so each missing file is only searched
/// for and reported once.
#[derive(Debug)]
pub struct DwoFiles<R: Reader> {
    files: Vec<DwoFile<R>>,
    by_name: HashMap<(String, Option<String>), Option<DwoFileId>>,
}

impl<R: Reader> Default for DwoFiles<R> {
    fn default() -> Self {
        DwoFiles {
            files: Vec::new(),
            by_name: HashMap::new(),
        }
    }
}

impl<R: Reader> DwoFiles<R> {
    /// Get an open file.
    ///
    /// # Panics
    ///
    /// Panics if the handle did not come from this table.
    pub fn get(&self, id: DwoFileId) -> &DwoFile<R> {
        &self.files[id.0]
    }

    /// Get an open file mutably.
    pub fn get_mut(&mut self, id: DwoFileId) -> &mut DwoFile<R> {
        &mut self.files[id.0]
    }

    /// The number of files opened.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether no file was opened.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Look up a file already opened or known to be missing.
    pub fn lookup(&self, name: &str, comp_dir: Option<&str>) -> Option<Option<DwoFileId>> {
        self.by_name
            .get(&(name.to_string(), comp_dir.map(str::to_string)))
            .copied()
    }

    /// Add a virtual file under `name`.
    pub fn insert_virtual(&mut self, file: DwoFile<R>) -> DwoFileId {
        let id = DwoFileId(self.files.len());
        self.by_name
            .insert((file.name.clone(), file.comp_dir.clone()), Some(id));
        self.files.push(file);
        id
    }

    /// Find and open the DWO file `name` referenced from a unit compiled in
    /// `comp_dir`.
    ///
    /// Candidates are tried in the order of [`dwo_candidates`]. Returns
    /// `None` if no candidate is an object file.
    pub fn open(
        &mut self,
        loader: &dyn FileLoader<R>,
        name: &str,
        comp_dir: Option<&str>,
        search_path: &[PathBuf],
        complaints: &Complaints,
    ) -> Result<Option<DwoFileId>> {
        if let Some(known) = self.lookup(name, comp_dir) {
            return Ok(known);
        }
        let key = (name.to_string(), comp_dir.map(str::to_string));
        for candidate in dwo_candidates(name, comp_dir, search_path) {
            let sections = match loader.open(&candidate)? {
                Some(sections) => sections,
                None => continue,
            };
            let id = DwoFileId(self.files.len());
            let file = DwoFile::open(
                id,
                name.to_string(),
                comp_dir.map(str::to_string),
                candidate.clone(),
                sections.dwo_dwarf(),
                complaints,
            )?;
            tracing::debug!(name, path = %candidate.display(), "opened DWO file");
            self.files.push(file);
            self.by_name.insert(key, Some(id));
            return Ok(Some(id));
        }
        tracing::debug!(name, comp_dir, "DWO file not found");
        self.by_name.insert(key, None);
        Ok(None)
    }
}
