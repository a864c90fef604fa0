#![allow(missing_docs)]

use test_assembler::{Label, Section};

use crate::common::Format;
use crate::leb128;

pub trait GimliSectionMethods {
    fn sleb(self, val: i64) -> Self;
    fn uleb(self, val: u64) -> Self;
    fn initial_length(self, format: Format, length: &Label, start: &Label) -> Self;
    fn word(self, size: u8, val: u64) -> Self;
    fn word_label(self, size: u8, val: &Label) -> Self;
    fn cstr(self, s: &str) -> Self;
}

impl GimliSectionMethods for Section {
    fn sleb(self, val: i64) -> Self {
        let mut buf = Vec::new();
        let written = leb128::write::signed(&mut buf, val).unwrap();
        self.append_bytes(&buf[0..written])
    }

    fn uleb(self, val: u64) -> Self {
        let mut buf = Vec::new();
        let written = leb128::write::unsigned(&mut buf, val).unwrap();
        self.append_bytes(&buf[0..written])
    }

    fn initial_length(self, format: Format, length: &Label, start: &Label) -> Self {
        match format {
            Format::Dwarf32 => self.D32(length).mark(start),
            Format::Dwarf64 => self.D32(0xffff_ffff).D64(length).mark(start),
        }
    }

    fn word(self, size: u8, val: u64) -> Self {
        match size {
            4 => self.D32(val as u32),
            8 => self.D64(val),
            _ => panic!("unsupported word size"),
        }
    }

    fn word_label(self, size: u8, val: &Label) -> Self {
        match size {
            4 => self.D32(val),
            8 => self.D64(val),
            _ => panic!("unsupported word size"),
        }
    }

    fn cstr(self, s: &str) -> Self {
        self.append_bytes(s.as_bytes()).D8(0)
    }
}

/// The unit type written by [`unit`].
#[derive(Debug, Clone, Copy)]
pub enum TestUnitKind {
    Compile,
    Partial,
    /// `type_die` is the offset of the type's die within the entries.
    Type { signature: u64, type_die: u32 },
    Skeleton(u64),
    SplitCompile(u64),
    SplitType { signature: u64, type_die: u32 },
}

/// Build a 32-bit unit with 8-byte addresses around `entries`.
///
/// Versions before 5 write a `.debug_types` header for `Type`.
pub fn unit(version: u16, kind: TestUnitKind, abbrev_offset: u32, entries: &[u8]) -> Vec<u8> {
    let mut header = Vec::new();
    header.extend_from_slice(&version.to_le_bytes());
    let type_fields = |header: &mut Vec<u8>, signature: u64, type_die: u32, size: u32| {
        header.extend_from_slice(&signature.to_le_bytes());
        header.extend_from_slice(&(size + type_die).to_le_bytes());
    };
    if version >= 5 {
        let ut = match kind {
            TestUnitKind::Compile => 0x01,
            TestUnitKind::Type { .. } => 0x02,
            TestUnitKind::Partial => 0x03,
            TestUnitKind::Skeleton(_) => 0x04,
            TestUnitKind::SplitCompile(_) => 0x05,
            TestUnitKind::SplitType { .. } => 0x06,
        };
        header.push(ut);
        header.push(8);
        header.extend_from_slice(&abbrev_offset.to_le_bytes());
        match kind {
            TestUnitKind::Skeleton(id) | TestUnitKind::SplitCompile(id) => {
                header.extend_from_slice(&id.to_le_bytes());
            }
            TestUnitKind::Type {
                signature,
                type_die,
            }
            | TestUnitKind::SplitType {
                signature,
                type_die,
            } => type_fields(&mut header, signature, type_die, 24),
            _ => {}
        }
    } else {
        header.extend_from_slice(&abbrev_offset.to_le_bytes());
        header.push(8);
        if let TestUnitKind::Type {
            signature,
            type_die,
        } = kind
        {
            type_fields(&mut header, signature, type_die, 23);
        }
    }
    let length = (header.len() + entries.len()) as u32;
    let mut unit = length.to_le_bytes().to_vec();
    unit.extend_from_slice(&header);
    unit.extend_from_slice(entries);
    unit
}
