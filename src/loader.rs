//! Opening object files and handing their sections to the reader.
//!
//! The unit manager never touches the filesystem itself. When it needs a
//! split DWARF file, a DWARF package or an alternate debug file it asks a
//! [`FileLoader`]. [`ObjectSession`] is the implementation backed by
//! memory-mapped object files.

use std::borrow::Cow;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use object::{Object, ObjectSection, SectionKind};
use typed_arena::Arena;

use crate::common::SectionId;
use crate::endianity::RunTimeEndian;
use crate::read::{Dwarf, EndianSlice, Reader, Result};

/// One section of a loaded object file.
#[derive(Debug, Clone)]
pub struct LoadedSection<R> {
    /// The section's index in the object file's section table.
    pub index: u32,
    /// The section name, with a `.zdebug_` prefix rewritten to `.debug_`.
    pub name: String,
    /// The section contents, decompressed.
    pub data: R,
}

/// The sections of one object file.
#[derive(Debug, Clone)]
pub struct ObjectSections<R> {
    /// The path the file was opened from.
    pub path: PathBuf,
    /// Every section with readable contents.
    pub sections: Vec<LoadedSection<R>>,
    /// The contents of the GNU build-id note, if present.
    pub build_id: Option<Vec<u8>>,
    /// Whether an allocated section starts at address zero.
    pub has_section_at_zero: bool,
    /// An empty reader, returned for missing sections.
    pub empty: R,
}

impl<R: Reader> ObjectSections<R> {
    /// Find a section by name.
    pub fn section(&self, name: &str) -> Option<&R> {
        self.sections
            .iter()
            .find(|section| section.name == name)
            .map(|section| &section.data)
    }

    /// Find a section by its index in the section table.
    pub fn section_by_number(&self, index: u32) -> Option<&LoadedSection<R>> {
        self.sections.iter().find(|section| section.index == index)
    }

    fn section_for(&self, id: SectionId, dwo: bool) -> R {
        let name = if dwo { id.dwo_name() } else { Some(id.name()) };
        name.and_then(|name| self.section(name))
            .cloned()
            .unwrap_or_else(|| self.empty.clone())
    }

    /// The DWARF sections of an ordinary object file.
    pub fn dwarf(&self) -> Dwarf<R> {
        let loaded: core::result::Result<_, core::convert::Infallible> =
            Dwarf::load(|id| Ok(self.section_for(id, false)));
        match loaded {
            Ok(dwarf) => dwarf,
            Err(never) => match never {},
        }
    }

    /// The DWARF sections of a split DWARF file or package, found under
    /// their `.dwo` names.
    pub fn dwo_dwarf(&self) -> Dwarf<R> {
        let loaded: core::result::Result<_, core::convert::Infallible> =
            Dwarf::load_dwo(|id| Ok(self.section_for(id, true)));
        match loaded {
            Ok(dwarf) => dwarf,
            Err(never) => match never {},
        }
    }
}

/// Opens object files on behalf of the unit manager.
pub trait FileLoader<R> {
    /// Open the object file at `path`.
    ///
    /// Returns `None` if there is no file there, or if it is not an object
    /// file; callers try the next candidate path in that case.
    fn open(&self, path: &Path) -> Result<Option<ObjectSections<R>>>;
}

/// Storage for the mappings and decompressed sections of every file an
/// [`ObjectSession`] opens. Sections borrow from it, so it must outlive
/// the session.
#[derive(Default)]
pub struct SessionArenas {
    mmaps: Arena<memmap2::Mmap>,
    buffers: Arena<Vec<u8>>,
}

impl core::fmt::Debug for SessionArenas {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SessionArenas").finish_non_exhaustive()
    }
}

impl SessionArenas {
    /// Create empty arenas.
    pub fn new() -> Self {
        Self::default()
    }
}

/// A [`FileLoader`] for memory-mapped object files.
#[derive(Debug, Clone, Copy)]
pub struct ObjectSession<'a> {
    arenas: &'a SessionArenas,
}

impl<'a> ObjectSession<'a> {
    /// Create a session that keeps its files in `arenas`.
    pub fn new(arenas: &'a SessionArenas) -> Self {
        ObjectSession { arenas }
    }

    /// Map and parse the object file at `path`.
    pub fn open_file(
        &self,
        path: &Path,
    ) -> Result<Option<ObjectSections<EndianSlice<'a, RunTimeEndian>>>> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::trace!(path = %path.display(), "no file");
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        let mmap: &'a memmap2::Mmap = self.arenas.mmaps.alloc(mmap);
        let object = match object::File::parse(&**mmap) {
            Ok(object) => object,
            Err(err) => {
                tracing::debug!(path = %path.display(), %err, "not an object file");
                return Ok(None);
            }
        };
        let endian = if object.is_little_endian() {
            RunTimeEndian::Little
        } else {
            RunTimeEndian::Big
        };

        let mut sections = Vec::new();
        let mut has_section_at_zero = false;
        for section in object.sections() {
            if section.address() == 0
                && section.size() != 0
                && matches!(
                    section.kind(),
                    SectionKind::Text
                        | SectionKind::Data
                        | SectionKind::ReadOnlyData
                        | SectionKind::UninitializedData
                )
            {
                has_section_at_zero = true;
            }
            let name = match section.name() {
                Ok(name) => name,
                Err(_) => continue,
            };
            let data: &'a [u8] = match section.uncompressed_data() {
                Ok(Cow::Borrowed(data)) => data,
                Ok(Cow::Owned(data)) => self.arenas.buffers.alloc(data),
                Err(err) => {
                    tracing::warn!(path = %path.display(), section = name, %err, "cannot decompress section");
                    continue;
                }
            };
            let name = match name.strip_prefix(".zdebug_") {
                Some(rest) => format!(".debug_{}", rest),
                None => name.to_string(),
            };
            sections.push(LoadedSection {
                index: section.index().0 as u32,
                name,
                data: EndianSlice::new(data, endian),
            });
        }

        let build_id = object.build_id().ok().flatten().map(<[u8]>::to_vec);
        tracing::debug!(
            path = %path.display(),
            sections = sections.len(),
            "opened object file"
        );
        Ok(Some(ObjectSections {
            path: path.to_path_buf(),
            sections,
            build_id,
            has_section_at_zero,
            empty: EndianSlice::new(&[], endian),
        }))
    }
}

impl<'a> FileLoader<EndianSlice<'a, RunTimeEndian>> for ObjectSession<'a> {
    fn open(&self, path: &Path) -> Result<Option<ObjectSections<EndianSlice<'a, RunTimeEndian>>>> {
        self.open_file(path)
    }
}
