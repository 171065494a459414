//! Data directory parsers

pub mod security;

pub use security::{
    resolve_certificates, CertificateBlob, CertificateRecord, CertificateRecords,
    CertificateRevision, CertificateType,
};
