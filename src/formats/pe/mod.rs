//! PE image parser for signer extraction

pub mod directories;
pub mod headers;
pub mod types;
pub mod utils;

pub use directories::*;
pub use headers::locate;
pub use types::*;

/// A located PE image over borrowed bytes.
///
/// Borrows the mapped view, so it can never outlive the mapping.
pub struct PeImage<'data> {
    data: &'data [u8],
    header: ImageHeader,
}

impl<'data> PeImage<'data> {
    /// Validate headers and locate the data directory table.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let header = locate(data)?;
        Ok(Self { data, header })
    }

    pub fn header(&self) -> &ImageHeader {
        &self.header
    }

    /// Check if the image declares a non-empty certificate table
    pub fn has_certificate_table(&self) -> bool {
        self.header
            .security_directory()
            .map(|d| !d.is_empty())
            .unwrap_or(false)
    }

    /// Walk the certificate table without copying payloads.
    pub fn certificate_records(&self) -> Result<CertificateRecords<'data>> {
        let entry = self.header.security_directory().unwrap_or_default();
        CertificateRecords::new(self.data, entry)
    }

    /// Resolve the certificate table into owned blobs.
    pub fn certificates(&self) -> Result<Vec<CertificateBlob>> {
        resolve_certificates(self.data, &self.header)
    }
}
