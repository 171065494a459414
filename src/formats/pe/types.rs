//! Core PE data types and structures

use std::fmt;

// PE constants
pub const DOS_SIGNATURE: u16 = 0x5A4D; // MZ
pub const PE_SIGNATURE: [u8; 4] = *b"PE\0\0";
pub const PE32_MAGIC: u16 = 0x10B;
pub const PE32PLUS_MAGIC: u16 = 0x20B;

/// Size of the DOS stub header.
pub const DOS_HEADER_SIZE: usize = 64;
/// Offset of `e_lfanew` inside the DOS header.
pub const E_LFANEW_OFFSET: usize = 60;
/// PE signature (4) + COFF file header (20).
pub const NT_PREAMBLE_SIZE: usize = 24;

// Offsets inside the optional header, per variant
pub const PE32_RVA_COUNT_OFFSET: usize = 92;
pub const PE32_DATA_DIRECTORY_OFFSET: usize = 96;
pub const PE32PLUS_RVA_COUNT_OFFSET: usize = 108;
pub const PE32PLUS_DATA_DIRECTORY_OFFSET: usize = 112;

/// Conventional number of data directory entries.
pub const MAX_DATA_DIRECTORIES: usize = 16;
/// Size of one data directory entry on disk.
pub const DATA_DIRECTORY_ENTRY_SIZE: usize = 8;

/// Data directory index of the certificate table.
pub const IMAGE_DIRECTORY_ENTRY_SECURITY: usize = 4;

/// PE parsing error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeError {
    InvalidDosSignature,
    InvalidPeSignature,
    InvalidMagic(u16),
    TruncatedHeader { expected: usize, actual: usize },
    MalformedCertificateTable { offset: usize, reason: &'static str },
}

impl fmt::Display for PeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDosSignature => write!(f, "Invalid DOS signature"),
            Self::InvalidPeSignature => write!(f, "Invalid PE signature"),
            Self::InvalidMagic(m) => write!(f, "Invalid optional header magic: 0x{:04x}", m),
            Self::TruncatedHeader { expected, actual } => {
                write!(
                    f,
                    "Truncated header: expected {} bytes, got {}",
                    expected, actual
                )
            }
            Self::MalformedCertificateTable { offset, reason } => {
                write!(
                    f,
                    "Malformed certificate table at offset 0x{:x}: {}",
                    offset, reason
                )
            }
        }
    }
}

impl std::error::Error for PeError {}

pub type Result<T> = std::result::Result<T, PeError>;

/// Machine types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Machine {
    Unknown,
    I386,   // 0x014c
    X86_64, // 0x8664
    Arm,    // 0x01c0
    Arm64,  // 0xaa64
    ArmNT,  // 0x01c4
    IA64,   // 0x0200
    EBC,    // 0x0ebc
    Other(u16),
}

impl From<u16> for Machine {
    fn from(value: u16) -> Self {
        match value {
            0x014c => Self::I386,
            0x8664 => Self::X86_64,
            0x01c0 => Self::Arm,
            0xaa64 => Self::Arm64,
            0x01c4 => Self::ArmNT,
            0x0200 => Self::IA64,
            0x0ebc => Self::EBC,
            0 => Self::Unknown,
            other => Self::Other(other),
        }
    }
}

/// Optional header flavour, chosen by the magic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalHeaderKind {
    Pe32,
    Pe32Plus,
}

impl OptionalHeaderKind {
    pub fn from_magic(magic: u16) -> Result<Self> {
        match magic {
            PE32_MAGIC => Ok(Self::Pe32),
            PE32PLUS_MAGIC => Ok(Self::Pe32Plus),
            other => Err(PeError::InvalidMagic(other)),
        }
    }

    /// Offset of `NumberOfRvaAndSizes` from the start of the optional header.
    pub fn rva_count_offset(self) -> usize {
        match self {
            Self::Pe32 => PE32_RVA_COUNT_OFFSET,
            Self::Pe32Plus => PE32PLUS_RVA_COUNT_OFFSET,
        }
    }

    /// Offset of the data directory table from the start of the optional header.
    pub fn data_directory_offset(self) -> usize {
        match self {
            Self::Pe32 => PE32_DATA_DIRECTORY_OFFSET,
            Self::Pe32Plus => PE32PLUS_DATA_DIRECTORY_OFFSET,
        }
    }
}

/// Data directory entry.
///
/// `virtual_address` is an RVA for every directory except
/// [`IMAGE_DIRECTORY_ENTRY_SECURITY`], where it holds a raw file offset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataDirectoryEntry {
    pub virtual_address: u32,
    pub size: u32,
}

impl DataDirectoryEntry {
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Parsed executable header: the parts of the DOS, COFF and optional headers
/// needed to reach the data directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageHeader {
    /// File offset of the `PE\0\0` signature (`e_lfanew`).
    pub nt_offset: usize,
    pub machine: Machine,
    pub number_of_sections: u16,
    pub size_of_optional_header: u16,
    pub characteristics: u16,
    pub kind: OptionalHeaderKind,
    /// `NumberOfRvaAndSizes` as written in the file, before clamping.
    pub declared_directory_count: u32,
    /// File offset of the first data directory entry.
    pub data_directory_offset: usize,
    pub data_directories: Vec<DataDirectoryEntry>,
}

impl ImageHeader {
    pub fn is_64bit(&self) -> bool {
        self.kind == OptionalHeaderKind::Pe32Plus
    }

    /// Get data directory by index, `None` if the file declares fewer entries.
    pub fn directory(&self, index: usize) -> Option<DataDirectoryEntry> {
        self.data_directories.get(index).copied()
    }

    /// The certificate (Authenticode) table entry, if declared.
    pub fn security_directory(&self) -> Option<DataDirectoryEntry> {
        self.directory(IMAGE_DIRECTORY_ENTRY_SECURITY)
    }
}
