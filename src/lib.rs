//! A demand-driven reader for DWARF debugging information entries.
//!
//! * **Lazy:** every compilation and type unit of an object file is known
//!   up front from its header, but a unit's entries are decoded only when a
//!   lookup needs them, and freed again when they go unused.
//!
//! * **Split-aware:** units whose entries live in `.dwo` files, DWARF
//!   packages, or a `dwz` alternate file are stitched back to their
//!   skeletons transparently.
//!
//! * **Forgiving:** malformed input that can be worked around is reported
//!   as a [`complaint`](complaint::Complaints) and papered over instead of
//!   failing the whole read.
//!
//! DWARF versions 2 to 5 are supported.
//!
//! ## Example Usage
//!
//! Open an object file and find the unit that defines `main`:
//!
//! ```rust,no_run
//! use dwarf_dies::loader::{ObjectSession, SessionArenas};
//! use dwarf_dies::symtab::{select_quick_symbols, SymbolDomain};
//! use dwarf_dies::units::{DwarfContext, ExpandedUnits};
//! use dwarf_dies::Options;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let arenas = SessionArenas::new();
//! let session = ObjectSession::new(&arenas);
//! let sections = match session.open_file("a.out".as_ref())? {
//!     Some(sections) => sections,
//!     None => return Ok(()),
//! };
//! let mut ctx = DwarfContext::open(&session, &sections, Options::default())?;
//!
//! let mut expanded = ExpandedUnits::default();
//! let mut quick = select_quick_symbols(&mut ctx, &mut expanded)?;
//! if let Some(unit) = quick.lookup_symbol(&mut ctx, "main", SymbolDomain::Var, &mut expanded)? {
//!     println!("main is defined in {:?}", ctx.state(unit).and_then(|s| s.name()));
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API Structure
//!
//! * [`read`] holds the section readers: abbreviations, unit headers,
//!   attribute values, line program headers, and the full and partial die
//!   readers.
//!
//! * [`units`] owns the unit descriptors and the cache of decoded units, and
//!   resolves references between dies.
//!
//! * [`split`] finds and opens `.dwo` files, DWARF packages and `dwz`
//!   alternate files.
//!
//! * [`symtab`] decides which units to expand for a lookup.
//!
//! ## Using with `FallibleIterator`
//!
//! Reading a unit header can fail, so the unit header iterators cannot
//! implement `std::iter::Iterator`. They have an inherent `next` returning
//! `Result<Option<_>>`, and also implement
//! [`fallible_iterator::FallibleIterator`](https://docs.rs/fallible-iterator),
//! which provides the usual adapters.
#![deny(missing_docs)]
#![deny(missing_debug_implementations)]
// Selectively enable rust 2018 warnings
#![warn(bare_trait_objects)]
#![warn(unused_extern_crates)]
#![warn(ellipsis_inclusive_range_patterns)]
#![warn(elided_lifetimes_in_paths)]
#![warn(explicit_outlives_requirements)]
// False positives with `fallible_iterator`.
#![allow(clippy::should_implement_trait)]

mod common;
pub use crate::common::*;

pub mod complaint;

pub mod constants;
// For backwards compat.
pub use crate::constants::*;

mod endianity;
pub use crate::endianity::*;

pub mod leb128;

pub mod loader;

mod options;
pub use crate::options::Options;

pub mod read;
// For backwards compat.
pub use crate::read::*;

pub mod split;

pub mod symtab;

#[cfg(test)]
mod test_util;

pub mod units;
