//! Code-signing identity extraction for Windows PE images.
//!
//! Maps a file read-only, validates its DOS/NT/optional headers, walks the
//! Authenticode certificate table and asks the OS which trust provider
//! governs the file. The result is a [`SignerDescriptor`] for the
//! policy-authoring layer.
//!
//! ```no_run
//! use signer_extract::{DescriptorBuilder, SigningState};
//!
//! let descriptor = DescriptorBuilder::new().build("C:/Windows/notepad.exe")?;
//! if descriptor.signing_state() == SigningState::Embedded {
//!     for cert in &descriptor.certificates {
//!         println!("{:?} {}", cert.certificate_type, cert.sha256_hex());
//!     }
//! }
//! # Ok::<(), signer_extract::ExtractError>(())
//! ```

/// Extraction settings
pub mod config;
/// Error taxonomy
pub mod error;
/// Descriptor builder and batch extraction
pub mod extract;
/// Binary format parsers
pub mod formats;
/// Scoped file mapping
pub mod io;
/// Tracing subscriber setup
pub mod logging;
/// OS capability interface
pub mod platform;
/// Trust-provider identifiers
pub mod trust;

pub use config::{BatchConfig, ExtractConfig};
pub use error::{ErrorKind, ExtractError, Result};
pub use extract::{BatchEntry, DescriptorBuilder, SignerDescriptor, SigningState};
pub use formats::pe::{CertificateBlob, CertificateRevision, CertificateType};
pub use io::MappedImage;
pub use platform::{MemoryPlatform, NativePlatform, Platform};
pub use trust::{KnownSubject, TrustProviderGuid};

/// Extract the signer descriptor for `path` on the host OS with default settings.
pub fn extract_signer(path: impl AsRef<std::path::Path>) -> Result<SignerDescriptor> {
    DescriptorBuilder::new().build(path)
}
