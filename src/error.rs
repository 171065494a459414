//! Error types for signer extraction.
//!
//! Every native or parse failure is translated into [`ExtractError`] at the
//! point where it happens; callers never see raw OS status codes except as
//! diagnostic detail.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::formats::pe::PeError;

/// Main error type for extraction operations.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Open, size query or map failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Zero-length files cannot be mapped or parsed
    #[error("File is empty: {}", .path.display())]
    EmptyFile { path: PathBuf },

    /// Missing or invalid DOS/PE signature
    #[error("Not a PE file: {0}")]
    NotAPEFile(String),

    /// A header-declared offset or size exceeds the mapped bounds
    #[error("Truncated header: expected {expected} bytes, got {actual}")]
    TruncatedHeader { expected: usize, actual: usize },

    /// Optional header magic is neither PE32 nor PE32+
    #[error("Unsupported optional header magic: 0x{magic:04x}")]
    UnsupportedMachine { magic: u16 },

    /// Inconsistent record lengths in the certificate table
    #[error("Malformed certificate table at offset 0x{offset:x}: {reason}")]
    MalformedCertificateTable { offset: usize, reason: &'static str },

    /// The trust-provider lookup failed for a reason other than "no provider"
    #[error("Trust provider resolution failed{}", format_os_code(.os_code))]
    TrustResolution { os_code: Option<i32> },
}

fn format_os_code(code: &Option<i32>) -> String {
    code.map(|c| format!(" (0x{:08X})", c as u32))
        .unwrap_or_default()
}

/// Discriminant of [`ExtractError`], cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Io,
    EmptyFile,
    NotAPEFile,
    TruncatedHeader,
    UnsupportedMachine,
    MalformedCertificateTable,
    TrustResolution,
}

impl ExtractError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io { .. } => ErrorKind::Io,
            Self::EmptyFile { .. } => ErrorKind::EmptyFile,
            Self::NotAPEFile(_) => ErrorKind::NotAPEFile,
            Self::TruncatedHeader { .. } => ErrorKind::TruncatedHeader,
            Self::UnsupportedMachine { .. } => ErrorKind::UnsupportedMachine,
            Self::MalformedCertificateTable { .. } => ErrorKind::MalformedCertificateTable,
            Self::TrustResolution { .. } => ErrorKind::TrustResolution,
        }
    }

    /// Underlying OS error code, when the failure came from the platform.
    pub fn os_code(&self) -> Option<i32> {
        match self {
            Self::Io { source, .. } => source.raw_os_error(),
            Self::TrustResolution { os_code } => *os_code,
            _ => None,
        }
    }
}

impl From<PeError> for ExtractError {
    fn from(err: PeError) -> Self {
        match err {
            PeError::InvalidDosSignature | PeError::InvalidPeSignature => {
                Self::NotAPEFile(err.to_string())
            }
            PeError::TruncatedHeader { expected, actual } => {
                Self::TruncatedHeader { expected, actual }
            }
            PeError::InvalidMagic(magic) => Self::UnsupportedMachine { magic },
            PeError::MalformedCertificateTable { offset, reason } => {
                Self::MalformedCertificateTable { offset, reason }
            }
        }
    }
}

/// Result type alias for extraction operations
pub type Result<T> = std::result::Result<T, ExtractError>;
