//! Resolution of the GNU Backgammon console executable.
//!
//! GNU Backgammon ships a GUI and a console build. On Windows they are
//! separate executables (`gnubg.exe` is the GUI, `gnubg-cli.exe` the console
//! build); elsewhere a single `gnubg` binary runs headless with `-t`. All
//! platform branching for the executable name lives here.

use crate::AnalysisError;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Host platform families with distinct engine naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    /// Returns the platform this binary was compiled for.
    pub fn host() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    /// Returns the executable name of the console build.
    pub fn console_executable(self) -> &'static str {
        match self {
            Platform::Windows => "gnubg-cli",
            Platform::Unix => "gnubg",
        }
    }

    /// Returns true if `path` names the GUI-only build on this platform.
    pub fn is_gui_build(self, path: &Path) -> bool {
        match self {
            Platform::Windows => path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .is_some_and(|stem| stem.eq_ignore_ascii_case("gnubg")),
            Platform::Unix => false,
        }
    }
}

/// Finds the engine executable for a platform.
///
/// # Example
///
/// ```no_run
/// use gnubg_analysis::EngineLocator;
///
/// let executable = EngineLocator::new().locate()?;
/// println!("using {}", executable.display());
/// # Ok::<(), gnubg_analysis::AnalysisError>(())
/// ```
#[derive(Debug, Clone)]
pub struct EngineLocator {
    platform: Platform,
    search_path: Option<OsString>,
    override_path: Option<PathBuf>,
}

impl Default for EngineLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineLocator {
    /// Creates a locator for the host platform searching `PATH`.
    pub fn new() -> Self {
        Self::for_platform(Platform::host())
    }

    /// Creates a locator for an explicit platform.
    pub fn for_platform(platform: Platform) -> Self {
        Self {
            platform,
            search_path: None,
            override_path: None,
        }
    }

    /// Searches `paths` (in `PATH` syntax) instead of the process `PATH`.
    pub fn with_search_path(mut self, paths: impl Into<OsString>) -> Self {
        self.search_path = Some(paths.into());
        self
    }

    /// Uses an explicitly configured executable instead of the default name.
    ///
    /// A bare name is still resolved on the search path; anything with a
    /// directory component must exist as given.
    pub fn with_override(mut self, path: Option<PathBuf>) -> Self {
        self.override_path = path;
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Resolves the console executable.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EngineNotFound`] if nothing suitable is found
    /// or if the override points at the GUI build.
    pub fn locate(&self) -> Result<PathBuf, AnalysisError> {
        let console = self.platform.console_executable();

        let Some(path) = &self.override_path else {
            return self.resolve(OsStr::new(console));
        };

        if self.platform.is_gui_build(path) {
            return Err(AnalysisError::EngineNotFound(format!(
                "{} is the GUI build of GNU Backgammon; configure the console build `{}` instead",
                path.display(),
                console
            )));
        }

        if path.is_absolute() || path.components().count() > 1 {
            if path.is_file() {
                Ok(path.clone())
            } else {
                Err(AnalysisError::EngineNotFound(format!(
                    "configured engine {} does not exist",
                    path.display()
                )))
            }
        } else {
            self.resolve(path.as_os_str())
        }
    }

    fn resolve(&self, name: &OsStr) -> Result<PathBuf, AnalysisError> {
        let found = match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(name, Some(paths), cwd)
            }
            None => which::which(name),
        };

        let path = found.map_err(|_| {
            AnalysisError::EngineNotFound(format!(
                "`{}` was not found on the search path; install the console build of \
                 GNU Backgammon or set engine.path in analysis.toml",
                name.to_string_lossy()
            ))
        })?;

        tracing::debug!("Resolved analysis engine: {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_executable_names() {
        assert_eq!(Platform::Unix.console_executable(), "gnubg");
        assert_eq!(Platform::Windows.console_executable(), "gnubg-cli");
    }

    #[test]
    fn test_gui_build_detection() {
        assert!(Platform::Windows.is_gui_build(Path::new("C:/Program Files/gnubg/gnubg.exe")));
        assert!(Platform::Windows.is_gui_build(Path::new("GNUBG.EXE")));
        assert!(!Platform::Windows.is_gui_build(Path::new("C:/Program Files/gnubg/gnubg-cli.exe")));
        assert!(!Platform::Unix.is_gui_build(Path::new("/usr/games/gnubg")));
    }

    #[test]
    fn test_windows_gui_override_is_rejected() {
        let locator = EngineLocator::for_platform(Platform::Windows)
            .with_override(Some(PathBuf::from("C:/gnubg/gnubg.exe")));
        match locator.locate() {
            Err(AnalysisError::EngineNotFound(msg)) => {
                assert!(msg.contains("GUI build"));
                assert!(msg.contains("gnubg-cli"));
            }
            other => panic!("Expected EngineNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_engine_on_empty_search_path() {
        let dir = tempfile::tempdir().unwrap();
        let locator = EngineLocator::new().with_search_path(dir.path().as_os_str());
        match locator.locate() {
            Err(AnalysisError::EngineNotFound(msg)) => {
                assert!(msg.contains(Platform::host().console_executable()));
                assert!(msg.contains("engine.path"));
            }
            other => panic!("Expected EngineNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_override_with_existing_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let locator =
            EngineLocator::for_platform(Platform::Unix).with_override(Some(file.path().to_path_buf()));
        assert_eq!(locator.locate().unwrap(), file.path());
    }

    #[test]
    fn test_override_with_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gnubg");
        let locator = EngineLocator::for_platform(Platform::Unix).with_override(Some(missing));
        assert!(matches!(
            locator.locate(),
            Err(AnalysisError::EngineNotFound(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_finds_executable_on_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("gnubg");
        std::fs::write(&exe, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let locator = EngineLocator::for_platform(Platform::Unix)
            .with_search_path(dir.path().as_os_str());
        assert_eq!(locator.locate().unwrap(), exe);
    }

    #[cfg(unix)]
    #[test]
    fn test_bare_override_name_uses_search_path() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("gnubg-nightly");
        std::fs::write(&exe, "#!/bin/sh\nexit 0\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let locator = EngineLocator::for_platform(Platform::Unix)
            .with_search_path(dir.path().as_os_str())
            .with_override(Some(PathBuf::from("gnubg-nightly")));
        assert_eq!(locator.locate().unwrap(), exe);
    }
}
