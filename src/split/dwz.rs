//! Alternate debug files produced by `dwz`.
//!
//! `dwz` moves debug information shared by several binaries into one
//! alternate file. Each binary names it in `.gnu_debugaltlink` together
//! with the alternate file's build-id, and refers into it with
//! `DW_FORM_GNU_ref_alt` and `DW_FORM_GNU_strp_alt`.

use std::path::{Path, PathBuf};

use crate::common::SectionId;
use crate::endianity::Endianity;
use crate::loader::FileLoader;
use crate::read::{Dwarf, EndianSlice, Error, Reader, Result, Section};

/// The `.gnu_debugaltlink` section: a NUL-terminated file name followed
/// by the build-id of the file.
#[derive(Debug, Clone, Copy)]
pub struct GnuDebugAltLink<R> {
    section: R,
}

impl<'input, Endian> GnuDebugAltLink<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct from the raw section contents.
    ///
    /// ```
    /// use dwarf_dies::split::GnuDebugAltLink;
    /// use dwarf_dies::LittleEndian;
    ///
    /// let link = GnuDebugAltLink::new(b"common.debug\0\x12\x34", LittleEndian);
    /// assert_eq!(link.filename().unwrap(), "common.debug");
    /// ```
    pub fn new(section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(section, endian))
    }
}

impl<R: Reader> GnuDebugAltLink<R> {
    /// The name of the alternate file.
    pub fn filename(&self) -> Result<String> {
        let name = self.section.clone().read_null_terminated_slice()?;
        if name.is_empty() {
            return Err(Error::InvalidAltLink);
        }
        Ok(name.to_string_lossy()?.into_owned())
    }

    /// The build-id the alternate file must have.
    pub fn build_id(&self) -> Result<Vec<u8>> {
        let mut section = self.section.clone();
        section.read_null_terminated_slice()?;
        if section.is_empty() {
            return Err(Error::InvalidAltLink);
        }
        Ok(section.to_slice()?.into_owned())
    }
}

impl<R> Section<R> for GnuDebugAltLink<R> {
    fn id() -> SectionId {
        SectionId::GnuDebugAltLink
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for GnuDebugAltLink<R> {
    fn from(section: R) -> Self {
        GnuDebugAltLink { section }
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// The paths to try, in order, for the alternate file `filename` with the
/// given build-id, linked from `binary`.
///
/// The build-id tree under each debug file directory comes first. Then the
/// file name itself, resolved against the binary's directory when it is
/// relative.
pub fn alt_file_candidates(
    filename: &str,
    build_id: &[u8],
    binary: Option<&Path>,
    debug_file_directories: &[PathBuf],
) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if build_id.len() >= 2 {
        let id = hex(build_id);
        for dir in debug_file_directories {
            candidates.push(
                dir.join(".build-id")
                    .join(&id[..2])
                    .join(format!("{}.debug", &id[2..])),
            );
        }
    }
    let path = Path::new(filename);
    if path.is_absolute() {
        candidates.push(path.to_path_buf());
    } else {
        match binary.and_then(Path::parent) {
            Some(dir) => candidates.push(dir.join(path)),
            None => candidates.push(path.to_path_buf()),
        }
    }
    candidates
}

/// An open alternate debug file.
#[derive(Debug, Clone)]
pub struct DwzFile<R> {
    path: PathBuf,
    build_id: Vec<u8>,
    dwarf: Dwarf<R>,
}

impl<R: Reader> DwzFile<R> {
    /// Find the alternate file named by `link` and check its build-id.
    ///
    /// Fails if no candidate exists, or if every candidate that exists has
    /// the wrong build-id: references into the file cannot be satisfied
    /// without it.
    pub fn open(
        loader: &dyn FileLoader<R>,
        link: &GnuDebugAltLink<R>,
        binary: Option<&Path>,
        debug_file_directories: &[PathBuf],
    ) -> Result<Self> {
        let filename = link.filename()?;
        let build_id = link.build_id()?;
        let mut mismatch = None;
        for candidate in alt_file_candidates(&filename, &build_id, binary, debug_file_directories)
        {
            let sections = match loader.open(&candidate)? {
                Some(sections) => sections,
                None => continue,
            };
            if sections.build_id.as_deref() != Some(&build_id[..]) {
                tracing::warn!(
                    path = %candidate.display(),
                    expected = %hex(&build_id),
                    "alternate debug file has a different build-id"
                );
                mismatch.get_or_insert(candidate);
                continue;
            }
            tracing::debug!(path = %candidate.display(), "opened alternate debug file");
            return Ok(DwzFile {
                dwarf: sections.dwarf(),
                path: candidate,
                build_id,
            });
        }
        Err(match mismatch {
            Some(path) => Error::AltFileBuildIdMismatch(path.display().to_string()),
            None => Error::AltFileNotFound(filename),
        })
    }

    /// Where the file was found.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file's build-id.
    pub fn build_id(&self) -> &[u8] {
        &self.build_id
    }

    /// The file's sections.
    pub fn dwarf(&self) -> &Dwarf<R> {
        &self.dwarf
    }

    /// Take the file's sections.
    pub fn into_dwarf(self) -> Dwarf<R> {
        self.dwarf
    }
}
