//! Subject trust-provider resolution.
//!
//! The trust provider is the subject interface package (SIP) the OS would use
//! to interpret a file's signature. Its GUID tells the policy layer whether a
//! file is a PE image, a catalog, a script, and so on.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::platform::Platform;

/// Opaque 128-bit trust-provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrustProviderGuid(Uuid);

impl TrustProviderGuid {
    /// CRYPT_SUBJTYPE_PE_IMAGE
    pub const PE_IMAGE: Self = Self(Uuid::from_u128(0xC689AAB8_8E78_11D0_8C47_00C04FC295EE));
    /// CRYPT_SUBJTYPE_JAVACLASS_IMAGE
    pub const JAVA_CLASS: Self = Self(Uuid::from_u128(0xC689AAB9_8E78_11D0_8C47_00C04FC295EE));
    /// CRYPT_SUBJTYPE_CABINET_IMAGE
    pub const CABINET: Self = Self(Uuid::from_u128(0xC689AABA_8E78_11D0_8C47_00C04FC295EE));
    /// CRYPT_SUBJTYPE_FLAT_IMAGE
    pub const FLAT: Self = Self(Uuid::from_u128(0xDE351A42_8E59_11D0_8C47_00C04FC295EE));
    /// CRYPT_SUBJTYPE_CATALOG_IMAGE
    pub const CATALOG: Self = Self(Uuid::from_u128(0xDE351A43_8E59_11D0_8C47_00C04FC295EE));
    /// CRYPT_SUBJTYPE_CTL_IMAGE
    pub const CTL: Self = Self(Uuid::from_u128(0x9BA61D3F_E73A_11D0_8CD2_00C04FC295EE));
    /// PowerShell script SIP
    pub const POWERSHELL: Self = Self(Uuid::from_u128(0x603BCC1F_4B59_4E08_B724_D2C6297EF351));
    /// Windows Installer SIP
    pub const MSI: Self = Self(Uuid::from_u128(0x000C10F1_0000_0000_C000_000000000046));

    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Build from the four fields of a Win32 `GUID`.
    pub fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self(Uuid::from_fields(data1, data2, data3, &data4))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Classify well-known subject interface packages.
    pub fn known_subject(&self) -> Option<KnownSubject> {
        KNOWN_SUBJECTS
            .iter()
            .find(|(guid, _)| guid == self)
            .map(|(_, subject)| *subject)
    }
}

const KNOWN_SUBJECTS: [(TrustProviderGuid, KnownSubject); 8] = [
    (TrustProviderGuid::PE_IMAGE, KnownSubject::PortableExecutable),
    (TrustProviderGuid::JAVA_CLASS, KnownSubject::JavaClass),
    (TrustProviderGuid::CABINET, KnownSubject::Cabinet),
    (TrustProviderGuid::FLAT, KnownSubject::Flat),
    (TrustProviderGuid::CATALOG, KnownSubject::Catalog),
    (TrustProviderGuid::CTL, KnownSubject::CertificateTrustList),
    (TrustProviderGuid::POWERSHELL, KnownSubject::PowerShell),
    (TrustProviderGuid::MSI, KnownSubject::WindowsInstaller),
];

/// Registry form: `{C689AAB8-8E78-11D0-8C47-00C04FC295EE}`.
impl fmt::Display for TrustProviderGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{:X}}}", self.0.hyphenated())
    }
}

/// Accepts braced, hyphenated and simple forms.
impl FromStr for TrustProviderGuid {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Subject interface packages shipped with Windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KnownSubject {
    PortableExecutable,
    JavaClass,
    Cabinet,
    Flat,
    Catalog,
    CertificateTrustList,
    PowerShell,
    WindowsInstaller,
}

impl KnownSubject {
    pub fn name(&self) -> &'static str {
        match self {
            Self::PortableExecutable => "PE image",
            Self::JavaClass => "Java class",
            Self::Cabinet => "cabinet",
            Self::Flat => "flat file",
            Self::Catalog => "catalog",
            Self::CertificateTrustList => "certificate trust list",
            Self::PowerShell => "PowerShell script",
            Self::WindowsInstaller => "Windows Installer package",
        }
    }
}

/// Resolve the trust provider for `path` through `platform`.
///
/// `Ok(None)` when no provider applies (unsigned or catalog-only subjects
/// the OS does not claim); `Err(TrustResolution)` on genuine lookup failure.
pub fn resolve_trust_provider<P: Platform + ?Sized>(
    platform: &P,
    path: &Path,
) -> Result<Option<TrustProviderGuid>> {
    match platform.resolve_trust_provider(path) {
        Ok(Some(guid)) => {
            debug!(
                path = %path.display(),
                provider = %guid,
                subject = guid.known_subject().map(|s| s.name()).unwrap_or("unknown"),
                "Resolved trust provider"
            );
            Ok(Some(guid))
        }
        Ok(None) => {
            debug!(path = %path.display(), "No trust provider applies");
            Ok(None)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Trust provider lookup failed");
            Err(e)
        }
    }
}
