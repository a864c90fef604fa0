//! Settings that control how debug info is read.

use std::path::PathBuf;

/// Maintenance settings for reading one object file's debug info.
///
/// ```
/// use dwarf_dies::Options;
///
/// let options = Options::default().max_cache_age(0).dump_dies(true);
/// assert_eq!(options.max_cache_age, 0);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// How many unit loads a cached unit survives without being used.
    /// Zero disables caching.
    pub max_cache_age: u32,
    /// Expand every unit at open time instead of building partial symbols.
    pub read_now: bool,
    /// Accept `.gdb_index` versions older than 6.
    pub use_deprecated_index_sections: bool,
    /// Cross-check computed physical names against linkage names.
    pub check_physname: bool,
    /// Log every decoded die.
    pub dump_dies: bool,
    /// Log line program headers as they are read.
    pub trace_line_headers: bool,
    /// How many times each complaint kind is logged.
    pub complaint_limit: usize,
    /// Directories searched for build-id and alternate debug files.
    pub debug_file_directories: Vec<PathBuf>,
    /// Directories searched for DWO files.
    pub dwo_search_path: Vec<PathBuf>,
    /// The path of the object file, used to find its `.dwp`.
    pub binary_path: Option<PathBuf>,
    /// When the object file is a separate debug file, the path of the
    /// binary it belongs to.
    pub original_binary_path: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            max_cache_age: 5,
            read_now: false,
            use_deprecated_index_sections: false,
            check_physname: false,
            dump_dies: false,
            trace_line_headers: false,
            complaint_limit: 10,
            debug_file_directories: vec![PathBuf::from("/usr/lib/debug")],
            dwo_search_path: Vec::new(),
            binary_path: None,
            original_binary_path: None,
        }
    }
}

impl Options {
    /// Set the cache age bound.
    pub fn max_cache_age(mut self, age: u32) -> Self {
        self.max_cache_age = age;
        self
    }

    /// Set read-now mode.
    pub fn read_now(mut self, read_now: bool) -> Self {
        self.read_now = read_now;
        self
    }

    /// Accept deprecated `.gdb_index` versions.
    pub fn use_deprecated_index_sections(mut self, value: bool) -> Self {
        self.use_deprecated_index_sections = value;
        self
    }

    /// Enable physname cross-checks.
    pub fn check_physname(mut self, value: bool) -> Self {
        self.check_physname = value;
        self
    }

    /// Log decoded dies.
    pub fn dump_dies(mut self, value: bool) -> Self {
        self.dump_dies = value;
        self
    }

    /// Log line program headers.
    pub fn trace_line_headers(mut self, value: bool) -> Self {
        self.trace_line_headers = value;
        self
    }

    /// Set how many times each complaint kind is logged.
    pub fn complaint_limit(mut self, limit: usize) -> Self {
        self.complaint_limit = limit;
        self
    }

    /// Add a directory to search for debug files.
    pub fn debug_file_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.debug_file_directories.push(dir.into());
        self
    }

    /// Add a directory to search for DWO files.
    pub fn dwo_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dwo_search_path.push(dir.into());
        self
    }

    /// Set the path of the object file.
    pub fn binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.binary_path = Some(path.into());
        self
    }

    /// Set the path of the binary that a separate debug file belongs to.
    pub fn original_binary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.original_binary_path = Some(path.into());
        self
    }
}
