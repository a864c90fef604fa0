//! Recognizing the compiler that produced a unit, for the workarounds
//! that depend on it.

/// The family of a producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProducerKind {
    /// GCC, any front end.
    Gcc,
    /// Clang, including vendor builds of it.
    Clang,
    /// The Intel C/C++ or Fortran compiler.
    Icc,
    /// The GNU assembler.
    Gas,
    /// A producer not recognized.
    Other,
    /// No `DW_AT_producer`.
    #[default]
    Unknown,
}

/// A parsed `DW_AT_producer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Producer {
    kind: ProducerKind,
    major: u32,
    minor: u32,
}

/// Parse a leading `major.minor` from `s`.
fn parse_version(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.splitn(3, '.');
    let major = parts.next()?;
    let minor = parts.next()?;
    let digits = |s: &str| -> Option<u32> {
        let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
        s[..end].parse().ok()
    };
    Some((digits(major)?, digits(minor)?))
}

impl Producer {
    /// Parse a producer string.
    ///
    /// ```
    /// use dwarf_dies::units::{Producer, ProducerKind};
    ///
    /// let p = Producer::parse(Some("GNU C17 11.2.0 -mtune=generic -O2"));
    /// assert_eq!(p.kind(), ProducerKind::Gcc);
    /// assert_eq!(p.version(), Some((11, 2)));
    /// ```
    pub fn parse(producer: Option<&str>) -> Self {
        let producer = match producer {
            Some(producer) => producer,
            None => return Producer::default(),
        };
        let other = Producer {
            kind: ProducerKind::Other,
            ..Producer::default()
        };

        if let Some(rest) = producer.strip_prefix("GNU AS ") {
            return match parse_version(rest) {
                Some((major, minor)) => Producer {
                    kind: ProducerKind::Gas,
                    major,
                    minor,
                },
                None => other,
            };
        }
        if let Some(rest) = producer.strip_prefix("GNU ") {
            // Skip the front end name, such as "C17", "C++" or "Fortran".
            let rest = match rest.find(char::is_whitespace) {
                Some(space) => rest[space..].trim_start(),
                None => "",
            };
            return match parse_version(rest) {
                Some((major, minor)) => Producer {
                    kind: ProducerKind::Gcc,
                    major,
                    minor,
                },
                None => other,
            };
        }
        if producer.starts_with("Intel(R)") {
            let (major, minor) = producer
                .find(" Version ")
                .and_then(|i| parse_version(&producer[i + " Version ".len()..]))
                .unwrap_or((0, 0));
            return Producer {
                kind: ProducerKind::Icc,
                major,
                minor,
            };
        }
        if producer.starts_with("clang ") || producer.contains(" clang ") {
            let (major, minor) = producer
                .find("version ")
                .and_then(|i| parse_version(&producer[i + "version ".len()..]))
                .unwrap_or((0, 0));
            return Producer {
                kind: ProducerKind::Clang,
                major,
                minor,
            };
        }
        other
    }

    /// The producer family.
    pub fn kind(&self) -> ProducerKind {
        self.kind
    }

    /// The `(major, minor)` version, if one was found.
    pub fn version(&self) -> Option<(u32, u32)> {
        match self.kind {
            ProducerKind::Other | ProducerKind::Unknown => None,
            _ if self.major == 0 && self.minor == 0 => None,
            _ => Some((self.major, self.minor)),
        }
    }

    fn older_than(&self, kind: ProducerKind, major: u32, minor: u32) -> bool {
        self.kind == kind
            && self
                .version()
                .map_or(false, |version| version < (major, minor))
    }

    /// Whether the producer is GCC.
    pub fn is_gcc(&self) -> bool {
        self.kind == ProducerKind::Gcc
    }

    /// GCC before 4.3 emitted no `DW_TAG_namespace`.
    pub fn is_gcc_lt_4_3(&self) -> bool {
        self.older_than(ProducerKind::Gcc, 4, 3)
    }

    /// Whether the producer is Clang.
    pub fn is_clang(&self) -> bool {
        self.kind == ProducerKind::Clang
    }

    /// Whether the producer is the Intel compiler.
    pub fn is_icc(&self) -> bool {
        self.kind == ProducerKind::Icc
    }

    /// ICC before 14 omitted `DW_AT_declaration` on incomplete types.
    pub fn is_icc_lt_14(&self) -> bool {
        self.older_than(ProducerKind::Icc, 14, 0)
    }

    /// GAS 2.39 wrote `DW_AT_name` of assembler units without the
    /// directory it put in `DW_AT_comp_dir`.
    pub fn is_gas_2_39(&self) -> bool {
        self.kind == ProducerKind::Gas && self.version() == Some((2, 39))
    }

    /// Whether the producer names `void` as a zero-sized integer base type
    /// instead of using `DW_TAG_unspecified_type`.
    pub fn has_integer_void(&self) -> bool {
        self.is_icc()
    }
}
