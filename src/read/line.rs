use crate::common::{DebugLineOffset, Encoding, Format, SectionId};
use crate::constants;
use crate::endianity::Endianity;
use crate::read::unit::parse_attribute;
use crate::read::{
    Attribute, AttributeSpecification, AttributeValue, Dwarf, EndianSlice, Error, Reader, Result,
    Section, UnitBases,
};

/// The `DebugLine` struct contains the source location to instruction mapping
/// found in the `.debug_line` section.
#[derive(Debug, Default, Clone, Copy)]
pub struct DebugLine<R> {
    debug_line_section: R,
}

impl<'input, Endian> DebugLine<EndianSlice<'input, Endian>>
where
    Endian: Endianity,
{
    /// Construct a new `DebugLine` instance from the data in the `.debug_line`
    /// section.
    ///
    /// ```
    /// use dwarf_dies::{DebugLine, LittleEndian};
    ///
    /// # let buf = [0x00, 0x01, 0x02, 0x03];
    /// # let read_debug_line_section_somehow = || &buf;
    /// let debug_line = DebugLine::new(read_debug_line_section_somehow(), LittleEndian);
    /// ```
    pub fn new(debug_line_section: &'input [u8], endian: Endian) -> Self {
        Self::from(EndianSlice::new(debug_line_section, endian))
    }
}

impl<R: Reader> DebugLine<R> {
    /// Parse the line number program header at the given offset.
    ///
    /// The `address_size` is taken from the unit that refers to the program;
    /// DWARF 5 headers carry their own and it must agree.
    pub fn header(&self, offset: DebugLineOffset, address_size: u8) -> Result<LineProgramHeader<R>> {
        let input = &mut self.debug_line_section.clone();
        input.skip(offset.0).map_err(|_| Error::OffsetOutOfBounds {
            section: SectionId::DebugLine,
            offset: offset.0,
        })?;
        LineProgramHeader::parse(input, offset, address_size)
    }
}

impl<R> Section<R> for DebugLine<R> {
    fn id() -> SectionId {
        SectionId::DebugLine
    }

    fn reader(&self) -> &R {
        &self.debug_line_section
    }
}

impl<R> From<R> for DebugLine<R> {
    fn from(debug_line_section: R) -> Self {
        DebugLine { debug_line_section }
    }
}

/// A header for a line number program in the `.debug_line` section.
///
/// Only the header is decoded; the opcodes that follow it are kept as raw
/// bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineProgramHeader<R: Reader> {
    encoding: Encoding,
    offset: DebugLineOffset,
    unit_length: usize,
    header_length: usize,
    minimum_instruction_length: u8,
    maximum_operations_per_instruction: u8,
    default_is_stmt: bool,
    line_base: i8,
    line_range: u8,
    opcode_base: u8,
    standard_opcode_lengths: R,
    include_directories: Vec<AttributeValue<R>>,
    directory_form: constants::DwForm,
    file_names: Vec<FileEntry<R>>,
    program_buf: R,
}

impl<R: Reader> LineProgramHeader<R> {
    /// Return the offset of the line number program header in the `.debug_line` section.
    pub fn offset(&self) -> DebugLineOffset {
        self.offset
    }

    /// Return the length of the line number program and header, not including
    /// the length of the encoded length itself.
    pub fn unit_length(&self) -> usize {
        self.unit_length
    }

    /// Return the encoding parameters for this header's line program.
    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Get the version of this header's line program.
    pub fn version(&self) -> u16 {
        self.encoding.version
    }

    /// Get the length of the encoded line number program header, not including
    /// the length of the encoded length itself.
    pub fn header_length(&self) -> usize {
        self.header_length
    }

    /// Whether this line program is encoded in 64- or 32-bit DWARF.
    pub fn format(&self) -> Format {
        self.encoding.format
    }

    /// Get the minimum instruction length any instruction in this header's line
    /// program may have.
    pub fn minimum_instruction_length(&self) -> u8 {
        self.minimum_instruction_length
    }

    /// Get the maximum number of operations each instruction in this header's
    /// line program may have.
    pub fn maximum_operations_per_instruction(&self) -> u8 {
        self.maximum_operations_per_instruction
    }

    /// Get the default value of the `is_stmt` register for this header's line
    /// program.
    pub fn default_is_stmt(&self) -> bool {
        self.default_is_stmt
    }

    /// Get the line base for this header's line program.
    pub fn line_base(&self) -> i8 {
        self.line_base
    }

    /// Get the line range for this header's line program.
    pub fn line_range(&self) -> u8 {
        self.line_range
    }

    /// Get opcode base for this header's line program.
    pub fn opcode_base(&self) -> u8 {
        self.opcode_base
    }

    /// An array of `u8` that specifies the number of LEB128 operands for
    /// each of the standard opcodes.
    pub fn standard_opcode_lengths(&self) -> &R {
        &self.standard_opcode_lengths
    }

    /// Get the set of include directories for this header's line program.
    ///
    /// For DWARF version <= 4, the compilation's current directory is not included
    /// in the return value, but is implicitly considered to be in the set per spec.
    pub fn include_directories(&self) -> &[AttributeValue<R>] {
        &self.include_directories[..]
    }

    /// The include directory with the given directory index.
    ///
    /// A directory index of 0 corresponds to the compilation unit directory.
    pub fn directory(&self, directory: u64) -> Option<AttributeValue<R>> {
        if self.encoding.version <= 4 {
            if directory == 0 {
                None
            } else {
                let directory = directory as usize - 1;
                self.include_directories.get(directory).cloned()
            }
        } else {
            self.include_directories.get(directory as usize).cloned()
        }
    }

    /// Get the list of source files that appear in this header's line program.
    pub fn file_names(&self) -> &[FileEntry<R>] {
        &self.file_names[..]
    }

    /// The source file with the given source file index.
    ///
    /// A source file index of 0 corresponds to the compilation unit file in
    /// DWARF 5, and is invalid before that.
    pub fn file(&self, file: u64) -> Option<&FileEntry<R>> {
        if self.encoding.version <= 4 {
            if file == 0 {
                None
            } else {
                let file = file as usize - 1;
                self.file_names.get(file)
            }
        } else {
            self.file_names.get(file as usize)
        }
    }

    /// The raw bytes of the line number program that follow the header.
    pub fn raw_program_buf(&self) -> R {
        self.program_buf.clone()
    }

    /// Build the name of a file entry, joined with its include directory
    /// unless it is already absolute.
    pub fn file_path(
        &self,
        dwarf: &Dwarf<R>,
        bases: &UnitBases,
        entry: &FileEntry<R>,
    ) -> Result<String> {
        let name = self.value_string(dwarf, bases, entry.path_form, &entry.path_name)?;
        if name.starts_with('/') {
            return Ok(name);
        }
        match self.directory(entry.directory_index) {
            Some(dir) => {
                let dir = self.value_string(dwarf, bases, self.directory_form, &dir)?;
                if dir.is_empty() {
                    Ok(name)
                } else if dir.ends_with('/') {
                    Ok(format!("{}{}", dir, name))
                } else {
                    Ok(format!("{}/{}", dir, name))
                }
            }
            None => Ok(name),
        }
    }

    fn value_string(
        &self,
        dwarf: &Dwarf<R>,
        bases: &UnitBases,
        form: constants::DwForm,
        value: &AttributeValue<R>,
    ) -> Result<String> {
        let attr = Attribute::new(constants::DW_AT_name, form, value.clone());
        let s = dwarf.attr_string(bases, &attr)?;
        Ok(s.to_string_lossy()?.into_owned())
    }

    fn parse(
        input: &mut R,
        offset: DebugLineOffset,
        mut address_size: u8,
    ) -> Result<LineProgramHeader<R>> {
        let (unit_length, format) = input.read_initial_length()?;
        let rest = &mut input.split(unit_length)?;

        let version = rest.read_u16()?;
        if !(2..=5).contains(&version) {
            return Err(Error::UnknownVersion(u64::from(version)));
        }

        if version >= 5 {
            address_size = rest.read_u8()?;
            let segment_selector_size = rest.read_u8()?;
            if segment_selector_size != 0 {
                return Err(Error::UnsupportedSegmentSize(segment_selector_size));
            }
        }

        let encoding = Encoding {
            format,
            version,
            address_size,
        };

        let header_length = rest.read_offset(format)?;

        let mut program_buf = rest.clone();
        program_buf.skip(header_length)?;
        rest.truncate(header_length)?;

        let minimum_instruction_length = rest.read_u8()?;
        if minimum_instruction_length == 0 {
            return Err(Error::MinimumInstructionLengthZero);
        }

        // This field did not exist before DWARF 4, but is specified to be 1 for
        // non-VLIW architectures, which makes it a no-op.
        let maximum_operations_per_instruction = if version >= 4 { rest.read_u8()? } else { 1 };
        if maximum_operations_per_instruction == 0 {
            return Err(Error::MaximumOperationsPerInstructionZero);
        }

        let default_is_stmt = rest.read_u8()? != 0;
        let line_base = rest.read_i8()?;
        let line_range = rest.read_u8()?;
        if line_range == 0 {
            return Err(Error::LineRangeZero);
        }

        let opcode_base = rest.read_u8()?;
        if opcode_base == 0 {
            return Err(Error::OpcodeBaseZero);
        }

        let standard_opcode_count = usize::from(opcode_base - 1);
        let standard_opcode_lengths = rest.split(standard_opcode_count)?;

        let mut include_directories = Vec::new();
        let mut directory_form = constants::DW_FORM_string;
        let mut file_names = Vec::new();
        if version <= 4 {
            loop {
                let directory = rest.read_null_terminated_slice()?;
                if directory.is_empty() {
                    break;
                }
                include_directories.push(AttributeValue::String(directory));
            }

            loop {
                let path_name = rest.read_null_terminated_slice()?;
                if path_name.is_empty() {
                    break;
                }
                file_names.push(FileEntry::parse_v4(rest, path_name)?);
            }
        } else {
            let directory_entry_format = FileEntryFormat::parse(rest)?;
            if let Some(path) = directory_entry_format
                .iter()
                .find(|format| format.content_type == constants::DW_LNCT_path)
            {
                directory_form = path.form;
            }
            let count = rest.read_uleb128()?;
            for _ in 0..count {
                let entry = FileEntry::parse_v5(rest, encoding, &directory_entry_format)?;
                include_directories.push(entry.path_name);
            }

            let file_name_entry_format = FileEntryFormat::parse(rest)?;
            let count = rest.read_uleb128()?;
            for _ in 0..count {
                file_names.push(FileEntry::parse_v5(rest, encoding, &file_name_entry_format)?);
            }
        }

        Ok(LineProgramHeader {
            encoding,
            offset,
            unit_length,
            header_length,
            minimum_instruction_length,
            maximum_operations_per_instruction,
            default_is_stmt,
            line_base,
            line_range,
            opcode_base,
            standard_opcode_lengths,
            include_directories,
            directory_form,
            file_names,
            program_buf,
        })
    }
}

/// The format of a component of an include directory or file name entry.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FileEntryFormat {
    /// The type of information that is represented by the component.
    pub content_type: constants::DwLnct,

    /// The encoding form of the component value.
    pub form: constants::DwForm,
}

impl FileEntryFormat {
    fn parse<R: Reader>(input: &mut R) -> Result<Vec<FileEntryFormat>> {
        let format_count = input.read_u8()? as usize;
        let mut format = Vec::with_capacity(format_count);
        let mut path_count = 0;
        for _ in 0..format_count {
            let content_type = input.read_uleb128()?;
            let content_type = if content_type > u64::from(u16::MAX) {
                constants::DwLnct(u16::MAX)
            } else {
                constants::DwLnct(content_type as u16)
            };
            if content_type == constants::DW_LNCT_path {
                path_count += 1;
            }

            let form = constants::DwForm(input.read_uleb128_u16()?);

            format.push(FileEntryFormat { content_type, form });
        }
        if path_count != 1 {
            return Err(Error::MissingFileEntryFormatPath);
        }
        Ok(format)
    }
}

/// An entry in the `LineProgramHeader`'s `file_names` set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry<R: Reader> {
    path_name: AttributeValue<R>,
    path_form: constants::DwForm,
    directory_index: u64,
    timestamp: u64,
    size: u64,
    md5: [u8; 16],
}

impl<R: Reader> FileEntry<R> {
    fn parse_v4(input: &mut R, path_name: R) -> Result<FileEntry<R>> {
        let directory_index = input.read_uleb128()?;
        let timestamp = input.read_uleb128()?;
        let size = input.read_uleb128()?;

        Ok(FileEntry {
            path_name: AttributeValue::String(path_name),
            path_form: constants::DW_FORM_string,
            directory_index,
            timestamp,
            size,
            md5: [0; 16],
        })
    }

    fn parse_v5(
        input: &mut R,
        encoding: Encoding,
        formats: &[FileEntryFormat],
    ) -> Result<FileEntry<R>> {
        let mut path = None;
        let mut directory_index = 0;
        let mut timestamp = 0;
        let mut size = 0;
        let mut md5 = [0; 16];

        for format in formats {
            let spec = AttributeSpecification::new(constants::DW_AT_name, format.form, None);
            let attr = parse_attribute(input, encoding, spec)?;
            match format.content_type {
                constants::DW_LNCT_path => path = Some((attr.form(), attr.value().clone())),
                constants::DW_LNCT_directory_index => {
                    if let Some(value) = attr.udata_value() {
                        directory_index = value;
                    }
                }
                constants::DW_LNCT_timestamp => {
                    if let Some(value) = attr.udata_value() {
                        timestamp = value;
                    }
                }
                constants::DW_LNCT_size => {
                    if let Some(value) = attr.udata_value() {
                        size = value;
                    }
                }
                constants::DW_LNCT_MD5 => {
                    if let AttributeValue::Block(mut block) = attr.value().clone() {
                        if block.len() == 16 {
                            block.read_slice(&mut md5)?;
                        }
                    }
                }
                // Unknown content types are skipped.
                _ => {}
            }
        }

        let (path_form, path_name) = path.ok_or(Error::MissingFileEntryFormatPath)?;
        Ok(FileEntry {
            path_name,
            path_form,
            directory_index,
            timestamp,
            size,
            md5,
        })
    }

    /// The path name of the file, in whatever form it was encoded.
    pub fn path_name(&self) -> AttributeValue<R> {
        self.path_name.clone()
    }

    /// The index of the include directory holding the file.
    pub fn directory_index(&self) -> u64 {
        self.directory_index
    }

    /// The modification time of the file, or 0 if not available.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// The size of the file in bytes, or 0 if not available.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// The MD5 digest of the file, or zeros if not available.
    pub fn md5(&self) -> &[u8; 16] {
        &self.md5
    }
}
