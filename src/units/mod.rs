//! Demand-driven management of compilation and type units.
//!
//! A [`DwarfContext`] knows every unit of an object file from the start,
//! as a [`UnitDescriptor`], but decodes a unit's dies only when asked. The
//! decoded [`UnitState`] is cached and aged: a state not used within the
//! configured number of sweeps is freed, unless a unit still in use refers
//! into it.
//!
//! ## Example Usage
//!
//! Expand every compilation unit and print the names of their unit dies:
//!
//! ```rust,no_run
//! use dwarf_dies::units::{DwarfContext, ExpandedUnits, ReadMode};
//! use dwarf_dies::{Dwarf, EndianSlice, LittleEndian, Options};
//!
//! # fn example(dwarf: Dwarf<EndianSlice<'static, LittleEndian>>) -> dwarf_dies::Result<()> {
//! let mut ctx = DwarfContext::new(dwarf, Options::default())?;
//! let units: Vec<_> = ctx.comp_units().collect();
//! for id in units {
//!     if ctx.load_unit(id, ReadMode::Full)? {
//!         println!("{:?}", ctx.state(id).and_then(|state| state.name()));
//!     }
//!     ctx.expand_unit(id, &mut ExpandedUnits::default())?;
//! }
//! # Ok(())
//! # }
//! ```

mod cache;

pub(crate) mod context;
pub use self::context::*;

pub(crate) mod cutu;
pub use self::cutu::*;

mod descriptor;
pub use self::descriptor::*;

mod producer;
pub use self::producer::*;

mod queue;
pub use self::queue::*;

mod resolve;
pub use self::resolve::*;

mod state;
pub use self::state::*;

mod type_units;
pub use self::type_units::*;
