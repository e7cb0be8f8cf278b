//! Result handoff from an engine subprocess to its parent.
//!
//! The child receives the absolute path of a fresh temporary file through an
//! environment variable, opens it itself, and writes one JSON document. No
//! file handle is inherited across the process boundary, so the same
//! mechanism works under Windows' process model and under fork/exec.
//!
//! The backing file is owned by a [`tempfile::TempPath`]: it is removed by
//! [`ResultChannel::close`] or, on any other exit path, when the channel is
//! dropped.

use crate::AnalysisError;
use serde::de::DeserializeOwned;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempPath;

/// Environment variable carrying the result location into the engine.
pub const RESULT_PATH_ENV: &str = "XGID_ANALYSIS_RESULT_PATH";

/// A uniquely named, single-use result location.
#[derive(Debug)]
pub struct ResultChannel {
    path: TempPath,
}

impl ResultChannel {
    /// Opens a channel in the system temporary directory.
    pub fn open() -> io::Result<Self> {
        Self::open_in(std::env::temp_dir())
    }

    /// Opens a channel in `dir`.
    ///
    /// The file name carries this process' id plus a random token and is
    /// created exclusively, so concurrently open channels never share a file,
    /// whether they live in one process or in several.
    pub fn open_in(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref();
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            std::env::current_dir()?.join(dir)
        };

        let prefix = format!("gnubg_result_{}_", std::process::id());
        let file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".json")
            .tempfile_in(&dir)?;

        // Only the path is kept; the child opens the file on its own.
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    /// Returns the absolute path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the `(variable, value)` pair to place in the child's environment.
    pub fn export(&self) -> (&'static str, OsString) {
        (RESULT_PATH_ENV, self.path.as_os_str().to_os_string())
    }

    /// Reads and parses the document the child wrote.
    ///
    /// Must only be called once the child has exited.
    ///
    /// # Errors
    ///
    /// - [`AnalysisError::ChannelEmpty`] if nothing was written (or the file
    ///   was removed)
    /// - [`AnalysisError::ChannelCorrupt`] if the content does not parse as `T`
    pub fn read<T: DeserializeOwned>(&self) -> Result<T, AnalysisError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AnalysisError::ChannelEmpty(self.path_buf()));
            }
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(AnalysisError::ChannelCorrupt(format!(
                    "{} is not valid UTF-8",
                    self.path.display()
                )));
            }
            Err(e) => return Err(AnalysisError::Io(e)),
        };

        if content.trim().is_empty() {
            return Err(AnalysisError::ChannelEmpty(self.path_buf()));
        }

        serde_json::from_str(&content).map_err(|e| {
            AnalysisError::ChannelCorrupt(format!("{}: {}", self.path.display(), e))
        })
    }

    /// Removes the backing file.
    ///
    /// A file the child already removed counts as closed.
    pub fn close(self) -> io::Result<()> {
        match self.path.close() {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn path_buf(&self) -> PathBuf {
        self.path.to_path_buf()
    }
}
