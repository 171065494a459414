//! In-memory platform.
//!
//! Serves file contents and trust lookups from tables filled in ahead of
//! time, and counts every handle it hands out. Useful for scanning buffers
//! that are already in memory and for checking that extraction releases
//! everything it acquires.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{ExtractError, Result};
use crate::platform::Platform;
use crate::trust::TrustProviderGuid;

/// Which kind of handle was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseEvent {
    View,
    File,
}

/// Live and cumulative handle counters, shared by all handles of one platform.
#[derive(Debug, Default)]
pub struct HandleStats {
    open_files: AtomicUsize,
    open_views: AtomicUsize,
    files_opened: AtomicUsize,
    views_mapped: AtomicUsize,
    releases: Mutex<Vec<ReleaseEvent>>,
}

impl HandleStats {
    /// Files and views currently alive.
    pub fn open_handles(&self) -> usize {
        self.open_files.load(Ordering::SeqCst) + self.open_views.load(Ordering::SeqCst)
    }

    pub fn files_opened(&self) -> usize {
        self.files_opened.load(Ordering::SeqCst)
    }

    pub fn views_mapped(&self) -> usize {
        self.views_mapped.load(Ordering::SeqCst)
    }

    /// Release events in the order they happened.
    pub fn releases(&self) -> Vec<ReleaseEvent> {
        self.releases
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn release(&self, counter: &AtomicUsize, event: ReleaseEvent) {
        counter.fetch_sub(1, Ordering::SeqCst);
        if let Ok(mut log) = self.releases.lock() {
            log.push(event);
        }
    }
}

/// File handle served by [`MemoryPlatform`].
#[derive(Debug)]
pub struct MemoryFile {
    data: Arc<[u8]>,
    fail_map: bool,
    stats: Arc<HandleStats>,
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        self.stats.release(&self.stats.open_files, ReleaseEvent::File);
    }
}

/// Mapped view served by [`MemoryPlatform`].
#[derive(Debug)]
pub struct MemoryView {
    data: Arc<[u8]>,
    stats: Arc<HandleStats>,
}

impl AsRef<[u8]> for MemoryView {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for MemoryView {
    fn drop(&mut self) {
        self.stats.release(&self.stats.open_views, ReleaseEvent::View);
    }
}

#[derive(Debug, Clone)]
enum TrustEntry {
    Provider(TrustProviderGuid),
    Failure(i32),
}

/// Platform backed by in-memory tables.
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    files: HashMap<PathBuf, Arc<[u8]>>,
    map_failures: HashSet<PathBuf>,
    trust: HashMap<PathBuf, TrustEntry>,
    stats: Arc<HandleStats>,
}

impl MemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register file contents under `path`.
    pub fn with_file(mut self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) -> Self {
        let data: Vec<u8> = data.into();
        self.files.insert(path.into(), Arc::from(data));
        self
    }

    /// Make mapping `path` fail after it has been opened.
    pub fn with_map_failure(mut self, path: impl Into<PathBuf>) -> Self {
        self.map_failures.insert(path.into());
        self
    }

    /// Report `guid` as the trust provider for `path`.
    pub fn with_trust_provider(mut self, path: impl Into<PathBuf>, guid: TrustProviderGuid) -> Self {
        self.trust.insert(path.into(), TrustEntry::Provider(guid));
        self
    }

    /// Make the trust lookup for `path` fail with `os_code`.
    pub fn with_trust_failure(mut self, path: impl Into<PathBuf>, os_code: i32) -> Self {
        self.trust.insert(path.into(), TrustEntry::Failure(os_code));
        self
    }

    pub fn stats(&self) -> &HandleStats {
        &self.stats
    }
}

impl Platform for MemoryPlatform {
    type File = MemoryFile;
    type View = MemoryView;

    fn open_file(&self, path: &Path) -> io::Result<MemoryFile> {
        let data = self
            .files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))?;

        self.stats.open_files.fetch_add(1, Ordering::SeqCst);
        self.stats.files_opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryFile {
            data,
            fail_map: self.map_failures.contains(path),
            stats: Arc::clone(&self.stats),
        })
    }

    fn file_len(&self, file: &MemoryFile) -> io::Result<u64> {
        Ok(file.data.len() as u64)
    }

    fn map_file(&self, file: &MemoryFile, len: u64) -> io::Result<MemoryView> {
        if file.fail_map {
            return Err(io::Error::other("mapping failed"));
        }
        if len != file.data.len() as u64 {
            return Err(io::Error::from(io::ErrorKind::InvalidInput));
        }

        self.stats.open_views.fetch_add(1, Ordering::SeqCst);
        self.stats.views_mapped.fetch_add(1, Ordering::SeqCst);
        Ok(MemoryView {
            data: Arc::clone(&file.data),
            stats: Arc::clone(&self.stats),
        })
    }

    fn resolve_trust_provider(&self, path: &Path) -> Result<Option<TrustProviderGuid>> {
        match self.trust.get(path) {
            Some(TrustEntry::Provider(guid)) => Ok(Some(*guid)),
            Some(TrustEntry::Failure(code)) => Err(ExtractError::TrustResolution {
                os_code: Some(*code),
            }),
            None => Ok(None),
        }
    }
}
