//! Bounded reporting of recoverable problems in the debug info.
//!
//! A complaint describes malformed input that the reader worked around.
//! Each kind is logged at most `limit` times; further occurrences are
//! only counted.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;

/// The kinds of recoverable problems the reader reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComplaintKind {
    /// A `DW_AT_byte_size` of `0xffffffff` was read as zero.
    ByteSizeClamped,
    /// A die that needs a name had none.
    MissingName,
    /// A `.gdb_index` entry named a unit that does not exist.
    BadIndexUnit,
    /// An address range was empty or inverted.
    InvalidRange,
    /// The split file for a skeleton unit could not be found.
    MissingDwo,
    /// A type signature did not match any type unit.
    UnresolvedSignature,
    /// Two type units had the same signature.
    DuplicateSignature,
    /// A unit and its line header disagree on the offset size.
    MixedOffsetSize,
    /// An attribute was not in the form its use requires.
    BadAttributeForm,
    /// A reference pointed outside any unit.
    DanglingReference,
    /// A die used an abbreviation code its table does not define.
    UnknownAbbreviation,
    /// A line header had an unexpected layout.
    BadLineHeader,
    /// A producer-specific workaround was applied.
    ProducerQuirk,
}

impl fmt::Display for ComplaintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ComplaintKind::ByteSizeClamped => "suspicious DW_AT_byte_size",
            ComplaintKind::MissingName => "missing name",
            ComplaintKind::BadIndexUnit => "bad unit index in .gdb_index",
            ComplaintKind::InvalidRange => "invalid address range",
            ComplaintKind::MissingDwo => "missing split DWARF file",
            ComplaintKind::UnresolvedSignature => "unresolved type signature",
            ComplaintKind::DuplicateSignature => "duplicate type signature",
            ComplaintKind::MixedOffsetSize => "mixed 32/64-bit DWARF",
            ComplaintKind::BadAttributeForm => "unexpected attribute form",
            ComplaintKind::DanglingReference => "dangling reference",
            ComplaintKind::UnknownAbbreviation => "unknown abbreviation",
            ComplaintKind::BadLineHeader => "bad line header",
            ComplaintKind::ProducerQuirk => "producer workaround",
        };
        f.write_str(s)
    }
}

/// A counter of complaints, shared by everything reading one object file.
#[derive(Debug)]
pub struct Complaints {
    limit: usize,
    counts: RefCell<HashMap<ComplaintKind, usize>>,
}

impl Default for Complaints {
    fn default() -> Self {
        Complaints::new(10)
    }
}

impl Complaints {
    /// Create a counter that logs each kind at most `limit` times.
    pub fn new(limit: usize) -> Self {
        Complaints {
            limit,
            counts: RefCell::new(HashMap::new()),
        }
    }

    /// Record a complaint.
    pub fn complain(&self, kind: ComplaintKind, args: fmt::Arguments<'_>) {
        let mut counts = self.counts.borrow_mut();
        let count = counts.entry(kind).or_insert(0);
        *count += 1;
        if *count <= self.limit {
            tracing::warn!(target: "dwarf_dies::complaint", kind = %kind, "{}", args);
        }
    }

    /// The number of times `kind` was reported, including suppressed ones.
    pub fn count(&self, kind: ComplaintKind) -> usize {
        self.counts.borrow().get(&kind).copied().unwrap_or(0)
    }

    /// The total number of complaints.
    pub fn total(&self) -> usize {
        self.counts.borrow().values().sum()
    }
}

/// Report a complaint with `format!` style arguments.
macro_rules! complain {
    ($complaints:expr, $kind:ident, $($arg:tt)+) => {
        $complaints.complain($crate::complaint::ComplaintKind::$kind, format_args!($($arg)+))
    };
}
pub(crate) use complain;
