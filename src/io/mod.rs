//! Scoped read-only file views.
//!
//! [`MappedImage`] owns both the open file and its mapped view. Dropping it
//! unmaps the view first and closes the file second, on every exit path:
//! normal return, `?` propagation from a parse failure, or unwinding.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{ExtractError, Result};
use crate::platform::Platform;

/// A whole file mapped read-only, exclusively owned by one extraction call.
pub struct MappedImage<P: Platform + ?Sized> {
    // Field order is drop order: view, then file.
    view: P::View,
    file: P::File,
    path: PathBuf,
    len: usize,
}

impl<P: Platform + ?Sized> MappedImage<P> {
    /// Open `path` for shared read access and map all of it.
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be opened, sized or mapped; `EmptyFile` for a
    /// zero-length file. Handles acquired before the failure are released.
    pub fn open(platform: &P, path: &Path) -> Result<Self> {
        let file = platform
            .open_file(path)
            .map_err(|e| ExtractError::io(path, e))?;
        let file_len = platform
            .file_len(&file)
            .map_err(|e| ExtractError::io(path, e))?;

        debug!(path = %path.display(), size = file_len, "Opening file for mapping");

        if file_len == 0 {
            return Err(ExtractError::EmptyFile {
                path: path.to_path_buf(),
            });
        }

        let view = platform
            .map_file(&file, file_len)
            .map_err(|e| ExtractError::io(path, e))?;
        let len = view.as_ref().len();

        Ok(Self {
            view,
            file,
            path: path.to_path_buf(),
            len,
        })
    }

    /// The mapped bytes. Borrows `self`, so derived views cannot outlive the mapping.
    pub fn bytes(&self) -> &[u8] {
        self.view.as_ref()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The underlying file handle, still open while the image lives.
    pub fn file(&self) -> &P::File {
        &self.file
    }
}

impl<P: Platform + ?Sized> Drop for MappedImage<P> {
    fn drop(&mut self) {
        trace!(path = %self.path.display(), len = self.len, "Releasing mapped image");
    }
}
