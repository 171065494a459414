//! Platform capabilities the extraction engine depends on.
//!
//! The engine only talks to the operating system through [`Platform`]:
//! opening a file, querying its size, mapping it read-only and asking the
//! trust subsystem which subject interface package owns it. Unmapping and
//! closing are expressed as `Drop` on the associated handle types, so release
//! happens exactly once on every exit path.

pub mod memory;
pub mod sip;

use std::fs::{File, OpenOptions};
use std::io;
use std::path::Path;

use memmap2::{Mmap, MmapOptions};
use tracing::trace;

use crate::error::Result;
use crate::trust::TrustProviderGuid;

pub use memory::{HandleStats, MemoryPlatform, ReleaseEvent};

/// OS primitives used by extraction.
///
/// Implementations must be stateless with respect to individual calls: the
/// same instance is shared by concurrent extractions.
pub trait Platform: Send + Sync {
    /// Open file handle; closed when dropped.
    type File: Send;
    /// Read-only view of a whole file; unmapped when dropped.
    type View: AsRef<[u8]> + Send;

    /// Open `path` for shared read access. Never requests write access.
    fn open_file(&self, path: &Path) -> io::Result<Self::File>;

    /// Size of the opened file in bytes.
    fn file_len(&self, file: &Self::File) -> io::Result<u64>;

    /// Map `len` bytes of `file` read-only into one contiguous view.
    fn map_file(&self, file: &Self::File, len: u64) -> io::Result<Self::View>;

    /// Look up the trust provider (subject interface package) for `path`.
    ///
    /// `Ok(None)` means no provider applies to the file.
    fn resolve_trust_provider(&self, path: &Path) -> Result<Option<TrustProviderGuid>>;
}

/// The host operating system: `std::fs` + `memmap2`, and the Windows SIP
/// layer where available.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativePlatform;

impl Platform for NativePlatform {
    type File = File;
    type View = Mmap;

    fn open_file(&self, path: &Path) -> io::Result<File> {
        // On Windows std shares read, write and delete by default, so
        // concurrent readers (and writers) of the same file are not excluded.
        OpenOptions::new().read(true).open(path)
    }

    fn file_len(&self, file: &File) -> io::Result<u64> {
        Ok(file.metadata()?.len())
    }

    fn map_file(&self, file: &File, len: u64) -> io::Result<Mmap> {
        let len = usize::try_from(len).map_err(|_| {
            io::Error::new(io::ErrorKind::InvalidInput, "file too large to map")
        })?;
        trace!(len, "Mapping file read-only");
        // Safety: The file is backed by a real file on disk and we only request a read-only map.
        unsafe { MmapOptions::new().len(len).map(file) }
    }

    fn resolve_trust_provider(&self, path: &Path) -> Result<Option<TrustProviderGuid>> {
        sip::retrieve_subject_guid(path)
    }
}
