//! GNU Backgammon subprocess invocation.
//!
//! One call to [`AnalysisEngine::analyze_batch`] runs one engine process:
//! the session script goes in on stdin, the results come back through a
//! [`ResultChannel`], and the process is bounded by a timeout. Every exit
//! path closes the channel and leaves no child running.

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::task::JoinHandle;
use xgid_core::PositionRequest;

use crate::channel::ResultChannel;
use crate::locator::EngineLocator;
use crate::result::{AnalysisResult, RawPositionReport};
use crate::script::EngineScript;
use crate::AnalysisError;

/// Arguments that run gnubg headless and quiet.
pub const DEFAULT_ENGINE_ARGS: [&str; 2] = ["-t", "-q"];

/// Default time bound for analysing one position.
pub const DEFAULT_TIMEOUT_PER_POSITION: Duration = Duration::from_secs(300);

/// Number of output lines kept for crash diagnostics.
pub const DIAGNOSTIC_TAIL_LINES: usize = 40;

/// How long to wait for output pipes to drain after the engine exits.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// A configured engine executable.
///
/// The engine is cheap to clone and holds no process; each analysis call
/// spawns and reaps its own.
///
/// # Example
///
/// ```no_run
/// use gnubg_analysis::{AnalysisEngine, EngineLocator};
/// use xgid_core::{PositionRequest, Xgid};
///
/// # async fn run() -> Result<(), gnubg_analysis::AnalysisError> {
/// let engine = AnalysisEngine::locate(&EngineLocator::new())?;
/// let xgid = Xgid::parse("XGID=-b----E-C---eE---c-e----B-:0:0:1:63:0:0:0:0:10").unwrap();
/// let result = engine.analyze(&PositionRequest::new(xgid)).await?;
/// if let Some(best) = result.best_move() {
///     println!("best play: {}", best.play);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AnalysisEngine {
    executable: PathBuf,
    args: Vec<String>,
    timeout_per_position: Duration,
    temp_dir: Option<PathBuf>,
}

impl AnalysisEngine {
    /// Creates an engine for an already resolved executable.
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            args: DEFAULT_ENGINE_ARGS.iter().map(|a| a.to_string()).collect(),
            timeout_per_position: DEFAULT_TIMEOUT_PER_POSITION,
            temp_dir: None,
        }
    }

    /// Resolves the executable with `locator` and creates an engine for it.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EngineNotFound`] if resolution fails.
    pub fn locate(locator: &EngineLocator) -> Result<Self, AnalysisError> {
        Ok(Self::new(locator.locate()?))
    }

    /// Replaces the command-line arguments.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the time bound per analysed position.
    pub fn with_timeout(mut self, per_position: Duration) -> Self {
        self.timeout_per_position = per_position;
        self
    }

    /// Places result channels in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Checks that the executable exists before any work is scheduled.
    ///
    /// A bare command name is resolved on `PATH`; anything else must name
    /// an existing file.
    ///
    /// # Errors
    ///
    /// Returns [`AnalysisError::EngineNotFound`] if neither holds.
    pub fn ensure_available(&self) -> Result<(), AnalysisError> {
        if self.executable.is_file() {
            return Ok(());
        }
        let bare = !self.executable.is_absolute() && self.executable.components().count() == 1;
        if bare && which::which(&self.executable).is_ok() {
            return Ok(());
        }
        Err(AnalysisError::EngineNotFound(format!(
            "{} is not an executable file",
            self.executable.display()
        )))
    }

    /// Returns the time bound for one invocation covering `positions` requests.
    pub fn timeout_for(&self, positions: usize) -> Duration {
        let positions = u32::try_from(positions.max(1)).unwrap_or(u32::MAX);
        self.timeout_per_position.saturating_mul(positions)
    }

    /// Analyses a single position.
    pub async fn analyze(&self, request: &PositionRequest) -> Result<AnalysisResult, AnalysisError> {
        let mut results = self.analyze_batch(std::slice::from_ref(request)).await?;
        results
            .pop()
            .ok_or_else(|| AnalysisError::Internal("engine returned no result".to_string()))
    }

    /// Analyses `requests` in one engine process.
    ///
    /// Results are returned in request order, one per request.
    ///
    /// # Errors
    ///
    /// Any failure applies to the whole slice:
    /// - [`AnalysisError::Io`] if the channel cannot be allocated or the
    ///   process cannot be started, including an executable that vanished
    ///   after [`AnalysisEngine::ensure_available`]
    /// - [`AnalysisError::EngineTimeout`] if the engine outlives its bound
    /// - [`AnalysisError::EngineCrashed`] on a non-zero or signalled exit
    /// - [`AnalysisError::ChannelEmpty`] / [`AnalysisError::ChannelCorrupt`]
    ///   if the engine exited cleanly without a usable result
    pub async fn analyze_batch(
        &self,
        requests: &[PositionRequest],
    ) -> Result<Vec<AnalysisResult>, AnalysisError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }

        let channel = match &self.temp_dir {
            Some(dir) => ResultChannel::open_in(dir)?,
            None => ResultChannel::open()?,
        };

        let outcome = self.run(requests, &channel).await;

        if let Err(e) = channel.close() {
            tracing::warn!("Failed to remove result file: {}", e);
        }
        outcome
    }

    async fn run(
        &self,
        requests: &[PositionRequest],
        channel: &ResultChannel,
    ) -> Result<Vec<AnalysisResult>, AnalysisError> {
        let script = EngineScript::build(requests);
        let (env_name, env_value) = channel.export();

        let mut command = Command::new(&self.executable);
        command
            .args(&self.args)
            .env(env_name, env_value)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(windows)]
        command.creation_flags(CREATE_NO_WINDOW);

        let mut child = command.spawn()?;
        tracing::debug!(
            "Spawned engine {} (pid {:?}) for {} position(s)",
            self.executable.display(),
            child.id(),
            requests.len()
        );

        let stdin = child.stdin.take();
        let writer = tokio::spawn(async move {
            let Some(mut stdin) = stdin else { return };
            if let Err(e) = stdin.write_all(script.as_str().as_bytes()).await {
                // The engine may exit before reading everything.
                if e.kind() != std::io::ErrorKind::BrokenPipe {
                    tracing::debug!("Failed to write engine script: {}", e);
                }
            }
        });
        let stdout = child.stdout.take().map(tail_lines);
        let stderr = child.stderr.take().map(tail_lines);

        let bound = self.timeout_for(requests.len());
        let waited = tokio::time::timeout(bound, child.wait()).await;
        let status = match waited {
            Ok(status) => status?,
            Err(_) => {
                tracing::warn!("Engine exceeded {:?}, terminating", bound);
                if let Err(e) = child.kill().await {
                    tracing::warn!("Failed to kill engine: {}", e);
                }
                writer.abort();
                for reader in [stdout, stderr].into_iter().flatten() {
                    reader.abort();
                }
                return Err(AnalysisError::EngineTimeout(bound));
            }
        };
        writer.abort();
        tracing::debug!("Engine exited with {}", status);

        let mut diagnostics = Vec::new();
        for reader in [stdout, stderr].into_iter().flatten() {
            diagnostics.extend(drain(reader).await);
        }

        if !status.success() {
            return Err(crashed(status, &diagnostics));
        }

        let reports: Vec<RawPositionReport> = channel.read()?;
        match_reports(requests, reports)
    }
}

/// Pairs engine reports with the requests they were produced for.
fn match_reports(
    requests: &[PositionRequest],
    reports: Vec<RawPositionReport>,
) -> Result<Vec<AnalysisResult>, AnalysisError> {
    if reports.len() != requests.len() {
        return Err(AnalysisError::ChannelCorrupt(format!(
            "expected {} result(s), engine wrote {}",
            requests.len(),
            reports.len()
        )));
    }

    requests
        .iter()
        .zip(reports)
        .map(|(request, report)| {
            if report.xgid != request.xgid().as_str() {
                return Err(AnalysisError::ChannelCorrupt(format!(
                    "result for {} was reported as {}",
                    request.xgid(),
                    report.xgid
                )));
            }
            Ok(AnalysisResult::from_transcript(
                request.xgid().clone(),
                report.hint,
                report.eval,
            ))
        })
        .collect()
}

fn crashed(status: ExitStatus, diagnostics: &[String]) -> AnalysisError {
    let skip = diagnostics.len().saturating_sub(DIAGNOSTIC_TAIL_LINES);
    AnalysisError::EngineCrashed {
        status: status.to_string(),
        diagnostics: diagnostics[skip..].join("\n"),
    }
}

/// Reads a pipe to the end, keeping only the last lines.
fn tail_lines<R>(pipe: R) -> JoinHandle<Vec<String>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut reader = BufReader::new(pipe);
        let mut tail = std::collections::VecDeque::with_capacity(DIAGNOSTIC_TAIL_LINES);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                    if tail.len() == DIAGNOSTIC_TAIL_LINES {
                        tail.pop_front();
                    }
                    tail.push_back(line);
                }
            }
        }
        tail.into_iter().collect()
    })
}

/// Collects a reader's lines, giving up if the pipe stays open after exit.
async fn drain(mut reader: JoinHandle<Vec<String>>) -> Vec<String> {
    match tokio::time::timeout(PIPE_DRAIN_GRACE, &mut reader).await {
        Ok(Ok(lines)) => lines,
        Ok(Err(_)) => Vec::new(),
        Err(_) => {
            reader.abort();
            Vec::new()
        }
    }
}
