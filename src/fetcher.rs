#![forbid(unsafe_code)]

//! Video retrieval is delegated to an external downloader. The orchestrator
//! only sees the [`MediaFetcher`] trait so tests can swap in a recorder.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{Result, bail};
use tracing::debug;

use crate::error::MediaFetchError;

/// One video to retrieve. `output_template` uses yt-dlp's `%(ext)s`
/// placeholder for the container extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source_url: String,
    pub output_template: String,
}

impl FetchRequest {
    pub fn new(source_url: &str, dir: &Path, file_name: &str) -> Self {
        Self {
            source_url: source_url.to_string(),
            output_template: dir
                .join(format!("{file_name}.%(ext)s"))
                .to_string_lossy()
                .into_owned(),
        }
    }
}

pub trait MediaFetcher: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> Result<(), MediaFetchError>;
}

/// Runs `yt-dlp` once per video.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    program: PathBuf,
    quiet: bool,
}

impl YtDlpFetcher {
    pub fn new(program: impl Into<PathBuf>, quiet: bool) -> Self {
        Self {
            program: program.into(),
            quiet,
        }
    }

    /// Runs `<program> --version` to fail loudly when yt-dlp is missing.
    pub fn ensure_available(&self) -> Result<()> {
        let name = self.program.display();
        let status = Command::new(&self.program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(_) => bail!("{} is installed but returned a failure status", name),
            Err(err) => bail!("{} is not installed or not in PATH: {}", name, err),
        }
    }

    fn command(&self, request: &FetchRequest) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg("--output")
            .arg(&request.output_template)
            .arg("--no-progress");
        if self.quiet {
            // yt-dlp still prints errors on stderr in quiet mode.
            command
                .arg("--quiet")
                .arg("--no-warnings")
                .stdout(Stdio::null());
        }
        command.arg(&request.source_url);
        command
    }
}

impl MediaFetcher for YtDlpFetcher {
    fn fetch(&self, request: &FetchRequest) -> Result<(), MediaFetchError> {
        let program = self.program.to_string_lossy().into_owned();
        debug!(%program, url = %request.source_url, "starting video download");
        let status = self
            .command(request)
            .status()
            .map_err(|source| MediaFetchError::Spawn {
                program: program.clone(),
                source,
            })?;
        if !status.success() {
            return Err(MediaFetchError::Exit {
                program,
                status: status.to_string(),
                url: request.source_url.clone(),
            });
        }
        Ok(())
    }
}
