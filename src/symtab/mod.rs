//! Symbol lookup without full expansion.
//!
//! Before any unit is expanded, a lookup has to decide which units might
//! define a name. The answer comes either from a `.gdb_index` or from
//! partial symbol tables; both search qualified names by `::` component.

pub(crate) mod names;
pub use self::names::*;

mod psymtab;
pub use self::psymtab::*;

mod quick;
pub use self::quick::*;
