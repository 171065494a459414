//! Attribute certificate (Authenticode) table parsing
//!
//! Unlike every other data directory, the security entry's address field is a
//! raw file offset. It is never passed through RVA translation.
//!
//! Layout of one `WIN_CERTIFICATE` record:
//!
//! ```text
//! +0  u32 dwLength          (header + payload, excluding padding)
//! +4  u16 wRevision
//! +6  u16 wCertificateType
//! +8  u8  bCertificate[dwLength - 8]
//! ```
//!
//! Records are padded to 8-byte boundaries.

use std::ops::Range;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::trace;

use crate::formats::pe::types::*;
use crate::formats::pe::utils::{align_up, ReadExt};

/// Size of the fixed `WIN_CERTIFICATE` header.
pub const CERTIFICATE_HEADER_SIZE: usize = 8;
/// Records start on this boundary.
pub const CERTIFICATE_ALIGNMENT: usize = 8;

/// `wRevision` of a certificate record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateRevision {
    /// WIN_CERT_REVISION_1_0
    Revision1_0,
    /// WIN_CERT_REVISION_2_0
    Revision2_0,
    Other(u16),
}

impl From<u16> for CertificateRevision {
    fn from(value: u16) -> Self {
        match value {
            0x0100 => Self::Revision1_0,
            0x0200 => Self::Revision2_0,
            other => Self::Other(other),
        }
    }
}

impl From<CertificateRevision> for u16 {
    fn from(value: CertificateRevision) -> Self {
        match value {
            CertificateRevision::Revision1_0 => 0x0100,
            CertificateRevision::Revision2_0 => 0x0200,
            CertificateRevision::Other(v) => v,
        }
    }
}

/// `wCertificateType` of a certificate record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertificateType {
    /// WIN_CERT_TYPE_X509
    X509,
    /// WIN_CERT_TYPE_PKCS_SIGNED_DATA
    PkcsSignedData,
    /// WIN_CERT_TYPE_RESERVED_1
    Reserved1,
    /// WIN_CERT_TYPE_TS_STACK_SIGNED
    TsStackSigned,
    Other(u16),
}

impl From<u16> for CertificateType {
    fn from(value: u16) -> Self {
        match value {
            0x0001 => Self::X509,
            0x0002 => Self::PkcsSignedData,
            0x0003 => Self::Reserved1,
            0x0004 => Self::TsStackSigned,
            other => Self::Other(other),
        }
    }
}

impl From<CertificateType> for u16 {
    fn from(value: CertificateType) -> Self {
        match value {
            CertificateType::X509 => 0x0001,
            CertificateType::PkcsSignedData => 0x0002,
            CertificateType::Reserved1 => 0x0003,
            CertificateType::TsStackSigned => 0x0004,
            CertificateType::Other(v) => v,
        }
    }
}

/// One certificate record borrowed from the mapped image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRecord<'a> {
    /// File offset of the record header.
    pub offset: usize,
    pub length: u32,
    pub revision: CertificateRevision,
    pub certificate_type: CertificateType,
    pub payload: &'a [u8],
}

impl CertificateRecord<'_> {
    /// Byte range of the whole record (header + payload) within the image.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.length as usize
    }

    /// Copy the record out of the mapping so it can outlive it.
    pub fn to_blob(&self) -> CertificateBlob {
        CertificateBlob {
            length: self.length,
            revision: self.revision,
            certificate_type: self.certificate_type,
            range: self.range(),
            payload: Bytes::copy_from_slice(self.payload),
        }
    }
}

/// Owned certificate record, detached from the mapping it was read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateBlob {
    /// `dwLength`: header plus payload.
    pub length: u32,
    pub revision: CertificateRevision,
    pub certificate_type: CertificateType,
    /// Where the record sat in the source file.
    pub range: Range<usize>,
    pub payload: Bytes,
}

impl CertificateBlob {
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    /// SHA-256 of the payload, lowercase hex
    pub fn sha256_hex(&self) -> String {
        hex::encode(Sha256::digest(&self.payload))
    }
}

/// Iterator over the records of a certificate table.
///
/// Yields `Err` once on the first inconsistency and then stops.
#[derive(Debug, Clone)]
pub struct CertificateRecords<'a> {
    data: &'a [u8],
    pos: usize,
    end: usize,
    failed: bool,
}

impl<'a> CertificateRecords<'a> {
    /// Prepare a walk over the table described by `entry`.
    ///
    /// Fails if the table itself does not fit in `data`.
    pub fn new(data: &'a [u8], entry: DataDirectoryEntry) -> Result<Self> {
        if entry.is_empty() {
            return Ok(Self {
                data,
                pos: 0,
                end: 0,
                failed: false,
            });
        }

        let start = entry.virtual_address as usize;
        if start == 0 {
            return Err(PeError::MalformedCertificateTable {
                offset: 0,
                reason: "table located at file offset zero",
            });
        }

        let end = match start.checked_add(entry.size as usize) {
            Some(end) if end <= data.len() => end,
            _ => {
                return Err(PeError::MalformedCertificateTable {
                    offset: start,
                    reason: "table extends past end of file",
                })
            }
        };

        Ok(Self {
            data,
            pos: start,
            end,
            failed: false,
        })
    }

    fn fail(&mut self, reason: &'static str) -> Option<Result<CertificateRecord<'a>>> {
        self.failed = true;
        Some(Err(PeError::MalformedCertificateTable {
            offset: self.pos,
            reason,
        }))
    }
}

impl<'a> Iterator for CertificateRecords<'a> {
    type Item = Result<CertificateRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.end {
            return None;
        }

        let remaining = self.end - self.pos;
        if remaining < CERTIFICATE_HEADER_SIZE {
            return self.fail("record header runs past end of table");
        }

        let (Some(length), Some(revision), Some(certificate_type)) = (
            self.data.read_u32_le_at(self.pos),
            self.data.read_u16_le_at(self.pos + 4),
            self.data.read_u16_le_at(self.pos + 6),
        ) else {
            return self.fail("record header runs past end of file");
        };

        if length as usize <= CERTIFICATE_HEADER_SIZE {
            return self.fail("record length too small");
        }
        if length as usize > remaining {
            return self.fail("record runs past end of table");
        }

        let Some(payload) = self.data.read_slice_at(
            self.pos + CERTIFICATE_HEADER_SIZE,
            length as usize - CERTIFICATE_HEADER_SIZE,
        ) else {
            return self.fail("record payload runs past end of file");
        };

        let record = CertificateRecord {
            offset: self.pos,
            length,
            revision: CertificateRevision::from(revision),
            certificate_type: CertificateType::from(certificate_type),
            payload,
        };

        let next = align_up(length as usize, CERTIFICATE_ALIGNMENT)
            .and_then(|advance| self.pos.checked_add(advance));
        match next {
            Some(next) if next <= self.end => self.pos = next,
            _ => return self.fail("record padding overshoots end of table"),
        }

        trace!(
            offset = record.offset,
            length,
            revision = ?record.revision,
            certificate_type = ?record.certificate_type,
            "Read certificate record"
        );

        Some(Ok(record))
    }
}

/// Resolve the certificate table of a located image into owned blobs.
///
/// A missing or zero-sized security directory yields an empty vector.
pub fn resolve_certificates(data: &[u8], header: &ImageHeader) -> Result<Vec<CertificateBlob>> {
    let entry = match header.security_directory() {
        Some(entry) if !entry.is_empty() => entry,
        _ => return Ok(Vec::new()),
    };

    CertificateRecords::new(data, entry)?
        .map(|record| record.map(|r| r.to_blob()))
        .collect()
}
