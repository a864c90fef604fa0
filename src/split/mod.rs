//! Split DWARF: `.dwo` files, DWARF packages and `dwz` alternate files.
//!
//! These are the places debug information can live outside the binary
//! being read. All of them are opened through a
//! [`FileLoader`](crate::loader::FileLoader) and cached for the lifetime
//! of the unit manager that opened them.

pub(crate) mod dwo;
pub use self::dwo::*;

pub(crate) mod dwp;
pub use self::dwp::*;

mod dwz;
pub use self::dwz::*;
