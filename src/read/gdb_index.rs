//! The `.gdb_index` fast-lookup section.
//!
//! The section is always little-endian, whatever the byte order of the
//! object file, so every field is read byte by byte here.

use core::ops::Range;

use crate::common::{DebugInfoOffset, DebugTypeSignature, DebugTypesOffset};
use crate::complaint::{complain, Complaints};
use crate::read::{u64_to_offset, Error, Reader, Result, UnitOffset};

/// The oldest `.gdb_index` version that can be read at all.
pub const GDB_INDEX_MIN_VERSION: u32 = 4;

/// The oldest version that is read without opting in.
pub const GDB_INDEX_MIN_TRUSTED_VERSION: u32 = 6;

/// The newest version that is understood.
pub const GDB_INDEX_MAX_VERSION: u32 = 8;

fn read_u32_le<R: Reader>(input: &mut R) -> Result<u32> {
    Ok(u32::from_le_bytes(input.read_u8_array::<[u8; 4]>()?))
}

fn read_u64_le<R: Reader>(input: &mut R) -> Result<u64> {
    Ok(u64::from_le_bytes(input.read_u8_array::<[u8; 8]>()?))
}

/// Hash a symbol name the way `.gdb_index` producers do.
///
/// Version 4 hashes are case sensitive; later versions fold ASCII case.
pub fn gdb_index_hash(version: u32, name: &[u8]) -> u32 {
    let mut r: u32 = 0;
    for &c in name {
        let c = if version >= 5 { c.to_ascii_lowercase() } else { c };
        r = r.wrapping_mul(67).wrapping_add(u32::from(c)).wrapping_sub(113);
    }
    r
}

/// The kind of symbol recorded in a version 7 or later entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GdbIndexSymbolKind {
    /// No kind recorded.
    None,
    /// A type.
    Type,
    /// A variable or enumerator.
    Variable,
    /// A function.
    Function,
    /// Anything else.
    Other,
}

impl GdbIndexSymbolKind {
    fn from_bits(bits: u32) -> Self {
        match bits {
            0 => GdbIndexSymbolKind::None,
            1 => GdbIndexSymbolKind::Type,
            2 => GdbIndexSymbolKind::Variable,
            3 => GdbIndexSymbolKind::Function,
            _ => GdbIndexSymbolKind::Other,
        }
    }
}

/// One unit recorded for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GdbIndexEntry {
    /// The unit index; type units follow the compilation units.
    pub unit_index: u32,
    /// The symbol kind, for version 7 and later.
    pub kind: GdbIndexSymbolKind,
    /// Whether the symbol is file-local, for version 7 and later.
    pub is_static: bool,
}

impl GdbIndexEntry {
    fn from_raw(version: u32, raw: u32) -> Self {
        if version >= 7 {
            GdbIndexEntry {
                unit_index: raw & 0x00ff_ffff,
                kind: GdbIndexSymbolKind::from_bits((raw >> 28) & 0x7),
                is_static: raw & 0x8000_0000 != 0,
            }
        } else {
            GdbIndexEntry {
                unit_index: raw,
                kind: GdbIndexSymbolKind::None,
                is_static: false,
            }
        }
    }

    /// Whether `kind` and `is_static` carry information.
    pub fn attrs_valid(&self) -> bool {
        self.kind != GdbIndexSymbolKind::None
    }
}

/// A compilation unit listed in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdbIndexUnit {
    /// The offset of the unit in `.debug_info`.
    pub offset: DebugInfoOffset,
    /// The length of the unit, including its initial length field.
    pub length: usize,
}

/// A type unit listed in the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GdbIndexTypeUnit {
    /// The offset of the unit in `.debug_types`.
    pub offset: DebugTypesOffset,
    /// The offset of the type die within the unit.
    pub type_offset: UnitOffset,
    /// The type signature.
    pub signature: DebugTypeSignature,
}

/// A parsed `.gdb_index` section.
#[derive(Debug, Clone)]
pub struct GdbIndex<R: Reader> {
    version: u32,
    cus: Vec<GdbIndexUnit>,
    tus: Vec<GdbIndexTypeUnit>,
    address_area: R,
    symbol_table: R,
    constant_pool: R,
}

impl<R: Reader> GdbIndex<R> {
    /// Parse the section.
    ///
    /// Returns `None`, after logging a warning, for versions that must not
    /// be used: obsolete ones, deprecated ones unless `use_deprecated`
    /// is set, and ones newer than this reader understands.
    pub fn parse(section: R, use_deprecated: bool) -> Result<Option<Self>> {
        let mut input = section.clone();
        let version = read_u32_le(&mut input)?;
        if version < GDB_INDEX_MIN_VERSION {
            tracing::warn!(version, "skipping obsolete .gdb_index section");
            return Ok(None);
        }
        if version < GDB_INDEX_MIN_TRUSTED_VERSION && !use_deprecated {
            tracing::warn!(
                version,
                "skipping deprecated .gdb_index section; enable use_deprecated_index_sections to use it anyway"
            );
            return Ok(None);
        }
        if version > GDB_INDEX_MAX_VERSION {
            tracing::debug!(version, "ignoring .gdb_index with unknown version");
            return Ok(None);
        }

        let cu_list_offset = read_u32_le(&mut input)? as usize;
        let types_list_offset = read_u32_le(&mut input)? as usize;
        let address_area_offset = read_u32_le(&mut input)? as usize;
        let symbol_table_offset = read_u32_le(&mut input)? as usize;
        let constant_pool_offset = read_u32_le(&mut input)? as usize;
        let offsets = [
            cu_list_offset,
            types_list_offset,
            address_area_offset,
            symbol_table_offset,
            constant_pool_offset,
        ];
        if offsets.windows(2).any(|w| w[0] > w[1]) || constant_pool_offset > section.len() {
            return Err(Error::InvalidGdbIndex("section offsets are out of order"));
        }
        let area = |start: usize, end: usize| -> Result<R> {
            let mut r = section.clone();
            r.skip(start)?;
            r.truncate(end - start)?;
            Ok(r)
        };

        let mut cu_list = area(cu_list_offset, types_list_offset)?;
        if cu_list.len() % 16 != 0 {
            return Err(Error::InvalidGdbIndex("CU list has a partial entry"));
        }
        let mut cus = Vec::with_capacity(cu_list.len() / 16);
        while !cu_list.is_empty() {
            let offset = u64_to_offset(read_u64_le(&mut cu_list)?)?;
            let length = u64_to_offset(read_u64_le(&mut cu_list)?)?;
            cus.push(GdbIndexUnit {
                offset: DebugInfoOffset(offset),
                length,
            });
        }

        let mut types_list = area(types_list_offset, address_area_offset)?;
        if types_list.len() % 24 != 0 {
            return Err(Error::InvalidGdbIndex("TU list has a partial entry"));
        }
        let mut tus = Vec::with_capacity(types_list.len() / 24);
        while !types_list.is_empty() {
            let offset = u64_to_offset(read_u64_le(&mut types_list)?)?;
            let type_offset = u64_to_offset(read_u64_le(&mut types_list)?)?;
            let signature = read_u64_le(&mut types_list)?;
            tus.push(GdbIndexTypeUnit {
                offset: DebugTypesOffset(offset),
                type_offset: UnitOffset(type_offset),
                signature: DebugTypeSignature(signature),
            });
        }

        let address_area = area(address_area_offset, symbol_table_offset)?;
        let symbol_table = area(symbol_table_offset, constant_pool_offset)?;
        let slots = symbol_table.len() / 8;
        if symbol_table.len() % 8 != 0 || (slots != 0 && !slots.is_power_of_two()) {
            return Err(Error::InvalidGdbIndex("symbol table size is not a power of 2"));
        }
        let mut constant_pool = section;
        constant_pool.skip(constant_pool_offset)?;

        tracing::debug!(
            version,
            cus = cus.len(),
            tus = tus.len(),
            slots,
            "read .gdb_index"
        );
        Ok(Some(GdbIndex {
            version,
            cus,
            tus,
            address_area,
            symbol_table,
            constant_pool,
        }))
    }

    /// The index version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The compilation units, in index order.
    pub fn units(&self) -> &[GdbIndexUnit] {
        &self.cus
    }

    /// The type units, in index order after the compilation units.
    pub fn type_units(&self) -> &[GdbIndexTypeUnit] {
        &self.tus
    }

    /// The total number of units an entry may refer to.
    pub fn unit_count(&self) -> usize {
        self.cus.len() + self.tus.len()
    }

    /// Read the address area.
    ///
    /// Entries naming a unit that does not exist, and empty or inverted
    /// ranges, are reported and dropped.
    pub fn address_map(&self, complaints: &Complaints) -> Result<Vec<(Range<u64>, u32)>> {
        let mut input = self.address_area.clone();
        let mut map = Vec::with_capacity(input.len() / 20);
        while !input.is_empty() {
            let low = read_u64_le(&mut input)?;
            let high = read_u64_le(&mut input)?;
            let unit = read_u32_le(&mut input)?;
            if low > high {
                complain!(
                    complaints,
                    InvalidRange,
                    ".gdb_index address table has invalid range (0x{:x} - 0x{:x})",
                    low,
                    high
                );
                continue;
            }
            if low == high {
                // Empty ranges are normal for discarded code.
                continue;
            }
            if unit as usize >= self.cus.len() {
                complain!(
                    complaints,
                    BadIndexUnit,
                    ".gdb_index address table has invalid CU number {}",
                    unit
                );
                continue;
            }
            map.push((low..high, unit));
        }
        Ok(map)
    }

    fn slot_count(&self) -> usize {
        self.symbol_table.len() / 8
    }

    fn slot(&self, index: usize) -> Result<(u32, u32)> {
        let mut input = self.symbol_table.clone();
        input.skip(index * 8)?;
        Ok((read_u32_le(&mut input)?, read_u32_le(&mut input)?))
    }

    fn pool_string(&self, offset: u32) -> Result<R> {
        let mut input = self.constant_pool.clone();
        input
            .skip(offset as usize)
            .map_err(|_| Error::InvalidGdbIndex("name offset is out of range"))?;
        input.read_null_terminated_slice()
    }

    fn pool_vector(&self, offset: u32) -> Result<Vec<GdbIndexEntry>> {
        let mut input = self.constant_pool.clone();
        input
            .skip(offset as usize)
            .map_err(|_| Error::InvalidGdbIndex("CU vector offset is out of range"))?;
        let count = read_u32_le(&mut input)?;
        if count as usize > input.len() / 4 {
            return Err(Error::InvalidGdbIndex("CU vector is truncated"));
        }
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            entries.push(GdbIndexEntry::from_raw(self.version, read_u32_le(&mut input)?));
        }
        Ok(entries)
    }

    /// Look up a symbol by name.
    ///
    /// Probing stops at an empty slot or after visiting every slot once.
    pub fn find_symbol(&self, name: &str) -> Result<Option<Vec<GdbIndexEntry>>> {
        let slots = self.slot_count();
        if slots == 0 {
            return Ok(None);
        }
        let mask = slots - 1;
        let hash = gdb_index_hash(self.version, name.as_bytes()) as usize;
        let mut index = hash & mask;
        let step = (hash.wrapping_mul(17) & mask) | 1;
        for _ in 0..slots {
            let (name_offset, vec_offset) = self.slot(index)?;
            if name_offset == 0 && vec_offset == 0 {
                return Ok(None);
            }
            let candidate = self.pool_string(name_offset)?;
            if candidate.to_slice()?.as_ref() == name.as_bytes() {
                return self.pool_vector(vec_offset).map(Some);
            }
            index = (index + step) & mask;
        }
        Ok(None)
    }

    /// Every symbol in the index, in slot order.
    pub fn symbols(&self) -> Result<Vec<GdbIndexSymbol>> {
        let mut symbols = Vec::new();
        for index in 0..self.slot_count() {
            let (name_offset, vec_offset) = self.slot(index)?;
            if name_offset == 0 && vec_offset == 0 {
                continue;
            }
            let name = self.pool_string(name_offset)?.to_string_lossy()?.into_owned();
            symbols.push(GdbIndexSymbol {
                name,
                entries: self.pool_vector(vec_offset)?,
            });
        }
        Ok(symbols)
    }
}

/// A named symbol and the units that define it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GdbIndexSymbol {
    /// The symbol name.
    pub name: String,
    /// The units that define it.
    pub entries: Vec<GdbIndexEntry>,
}
