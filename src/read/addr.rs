use crate::common::{DebugAddrBase, DebugAddrIndex, SectionId};
use crate::read::{Error, Reader, Result, Section};

/// The raw contents of the `.debug_addr` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugAddr<R> {
    section: R,
}

impl<R: Reader> DebugAddr<R> {
    /// Returns the address at the given `base` and `index`.
    ///
    /// A set of addresses in the `.debug_addr` section consists of a header
    /// followed by a series of addresses.
    ///
    /// The `base` must be the `DW_AT_addr_base` (or `DW_AT_GNU_addr_base`)
    /// value from the skeleton or compilation unit die. This is an offset that
    /// points to the first address following the header.
    ///
    /// The `index` is the value of a `DW_FORM_addrx` attribute.
    ///
    /// The `address_size` must be the size of the address for the compilation unit.
    /// The header is not parsed to validate this, since locating the header is
    /// unreliable and the GNU extensions do not emit it.
    pub fn get_address(
        &self,
        address_size: u8,
        base: DebugAddrBase,
        index: DebugAddrIndex,
    ) -> Result<u64> {
        let entry = index
            .0
            .checked_mul(usize::from(address_size))
            .and_then(|o| o.checked_add(base.0))
            .ok_or(Error::UnsupportedOffset)?;
        let mut input = self.section.clone();
        input.skip(entry).map_err(|_| Error::OffsetOutOfBounds {
            section: SectionId::DebugAddr,
            offset: entry,
        })?;
        input.read_address(address_size)
    }
}

impl<R> Section<R> for DebugAddr<R> {
    fn id() -> SectionId {
        SectionId::DebugAddr
    }

    fn reader(&self) -> &R {
        &self.section
    }
}

impl<R> From<R> for DebugAddr<R> {
    fn from(section: R) -> Self {
        DebugAddr { section }
    }
}
