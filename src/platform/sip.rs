//! Subject interface package (SIP) lookup.
//!
//! Thin adapter over `CryptSIPRetrieveSubjectGuid`. Holds no state; each call
//! converts the path, asks crypt32 which SIP owns the file and translates the
//! outcome into the crate's error taxonomy.

use std::path::Path;

use crate::error::Result;
use crate::trust::TrustProviderGuid;

/// HRESULT reported when no installed SIP recognises the subject.
pub const TRUST_E_SUBJECT_FORM_UNKNOWN: i32 = 0x800B_0003_u32 as i32;

/// Ask the OS which subject interface package governs `path`.
pub fn retrieve_subject_guid(path: &Path) -> Result<Option<TrustProviderGuid>> {
    imp::retrieve_subject_guid(path)
}

#[cfg(windows)]
mod imp {
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;

    use tracing::debug;
    use windows::core::{GUID, PCWSTR};
    use windows::Win32::Foundation::HANDLE;
    use windows::Win32::Security::Cryptography::Sip::CryptSIPRetrieveSubjectGuid;

    use super::TRUST_E_SUBJECT_FORM_UNKNOWN;
    use crate::error::{ExtractError, Result};
    use crate::trust::TrustProviderGuid;

    /// Null-terminated UTF-16 copy of a path for Win32 calls.
    fn to_wide_null_terminated(path: &Path) -> Vec<u16> {
        path.as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect()
    }

    pub fn retrieve_subject_guid(path: &Path) -> Result<Option<TrustProviderGuid>> {
        let wide_path = to_wide_null_terminated(path);
        let mut subject = GUID::zeroed();

        // Safety: `wide_path` is null-terminated and outlives the call; no file
        // handle is passed, so crypt32 opens and closes the file itself.
        let result = unsafe {
            CryptSIPRetrieveSubjectGuid(
                PCWSTR::from_raw(wide_path.as_ptr()),
                HANDLE::default(),
                &mut subject,
            )
        };

        match result {
            Ok(()) => Ok(Some(TrustProviderGuid::from_fields(
                subject.data1,
                subject.data2,
                subject.data3,
                subject.data4,
            ))),
            Err(e) if e.code().0 == TRUST_E_SUBJECT_FORM_UNKNOWN => {
                debug!(path = %path.display(), "No subject interface package applies");
                Ok(None)
            }
            Err(e) => Err(ExtractError::TrustResolution {
                os_code: Some(e.code().0),
            }),
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use std::path::Path;

    use tracing::trace;

    use crate::error::Result;
    use crate::trust::TrustProviderGuid;

    /// No SIP layer exists off Windows, so no provider ever applies.
    pub fn retrieve_subject_guid(path: &Path) -> Result<Option<TrustProviderGuid>> {
        trace!(path = %path.display(), "Trust provider lookup unavailable on this host");
        Ok(None)
    }
}
