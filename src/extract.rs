//! Signer descriptor construction.
//!
//! [`DescriptorBuilder`] sequences one extraction: map the file, locate the
//! PE headers, walk the certificate table, then ask the platform for the
//! subject's trust provider. The mapping is released before the trust lookup
//! runs and before any error is returned.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ExtractConfig;
use crate::error::{ExtractError, Result};
use crate::formats::pe::{CertificateBlob, PeImage};
use crate::io::MappedImage;
use crate::platform::{NativePlatform, Platform};
use crate::{log_error, span_trace};
use crate::trust::{self, TrustProviderGuid};

/// How a file is signed, as far as the descriptor can tell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SigningState {
    /// At least one certificate is embedded in the image
    Embedded,
    /// No embedded certificate, but the OS claims the subject through a trust provider
    Catalog,
    Unsigned,
}

/// Normalized signing identity of one file, handed to the policy layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerDescriptor {
    pub path: PathBuf,
    /// Certificate table records in file order
    pub certificates: Vec<CertificateBlob>,
    pub trust_provider: Option<TrustProviderGuid>,
}

impl SignerDescriptor {
    pub fn signing_state(&self) -> SigningState {
        if !self.certificates.is_empty() {
            SigningState::Embedded
        } else if self.trust_provider.is_some() {
            SigningState::Catalog
        } else {
            SigningState::Unsigned
        }
    }

    pub fn is_signed(&self) -> bool {
        self.signing_state() != SigningState::Unsigned
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Outcome for one path of a batch.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub result: Result<SignerDescriptor>,
}

impl BatchEntry {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn descriptor(&self) -> Option<&SignerDescriptor> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&ExtractError> {
        self.result.as_ref().err()
    }
}

/// Builds [`SignerDescriptor`]s through a [`Platform`].
///
/// Holds no mutable state, so one builder can serve many threads at once.
#[derive(Debug, Clone, Default)]
pub struct DescriptorBuilder<P: Platform = NativePlatform> {
    platform: P,
    config: ExtractConfig,
}

impl DescriptorBuilder<NativePlatform> {
    /// Builder over the host operating system.
    pub fn new() -> Self {
        Self::with_platform(NativePlatform)
    }
}

impl<P: Platform> DescriptorBuilder<P> {
    pub fn with_platform(platform: P) -> Self {
        Self {
            platform,
            config: ExtractConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExtractConfig) -> Self {
        self.config = config;
        self
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn config(&self) -> &ExtractConfig {
        &self.config
    }

    /// Extract the signer descriptor for one file.
    pub fn build(&self, path: impl AsRef<Path>) -> Result<SignerDescriptor> {
        let path = path.as_ref();
        let span = span_trace!("build_descriptor", path = %path.display());
        let _guard = span.enter();

        let certificates = self.embedded_certificates(path)?;
        let trust_provider = self.trust_provider(path, !certificates.is_empty())?;

        let descriptor = SignerDescriptor {
            path: path.to_path_buf(),
            certificates,
            trust_provider,
        };
        debug!(
            certificates = descriptor.certificates.len(),
            state = ?descriptor.signing_state(),
            "Built signer descriptor"
        );
        Ok(descriptor)
    }

    /// Extract descriptors for many files.
    ///
    /// Entries come back in input order. A failing file is recorded in its
    /// entry and never stops the rest of the batch.
    pub fn build_batch<I, Q>(&self, paths: I) -> Vec<BatchEntry>
    where
        I: IntoIterator<Item = Q>,
        Q: Into<PathBuf>,
    {
        let paths: Vec<PathBuf> = paths.into_iter().map(Into::into).collect();
        let batch = &self.config.batch;

        if !batch.parallel {
            return paths.into_iter().map(|path| self.build_entry(path)).collect();
        }

        let run = || -> Vec<BatchEntry> {
            paths
                .into_par_iter()
                .map(|path| self.build_entry(path))
                .collect()
        };

        match batch.max_threads {
            Some(threads) => match ThreadPoolBuilder::new().num_threads(threads).build() {
                Ok(pool) => pool.install(run),
                Err(e) => {
                    warn!(threads, error = %e, "Could not build thread pool, using global pool");
                    run()
                }
            },
            None => run(),
        }
    }

    fn build_entry(&self, path: PathBuf) -> BatchEntry {
        let result = self
            .build(&path)
            .map_err(|e| log_error!(e, path.display()));
        BatchEntry { path, result }
    }

    /// Map, parse and walk the certificate table. The mapping is dropped on return.
    fn embedded_certificates(&self, path: &Path) -> Result<Vec<CertificateBlob>> {
        let image = MappedImage::open(&self.platform, path)?;
        let pe = PeImage::parse(image.bytes())?;
        Ok(pe.certificates()?)
    }

    fn trust_provider(&self, path: &Path, embedded: bool) -> Result<Option<TrustProviderGuid>> {
        if !self.config.resolve_trust_provider {
            return Ok(None);
        }

        match trust::resolve_trust_provider(&self.platform, path) {
            Err(e) if embedded && !self.config.require_trust_provider => {
                warn!(error = %e, "Ignoring trust provider failure for embedded-signed file");
                Ok(None)
            }
            other => other,
        }
    }
}
