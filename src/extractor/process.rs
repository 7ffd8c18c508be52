// External extractor invoked as a child process

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, warn};

use super::output::parse_output;
use super::{Extractor, ExtractorFailure, ExtractorOutcome};
use crate::config::Config;

/// Exit status meaning "a function was printed"
pub const STATUS_FOUND: i32 = 0;
/// Exit status meaning "no function at this index"
pub const STATUS_EXHAUSTED: i32 = 2;

/// Runs `<program> <file> <index>` and classifies the result
#[derive(Debug, Clone)]
pub struct ProcessExtractor {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl ProcessExtractor {
    pub fn new(program: impl Into<PathBuf>, timeout: Option<Duration>) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.funccopy, config.timeout())
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Extractor for ProcessExtractor {
    async fn invoke(&self, path: &Path, index: u32) -> ExtractorOutcome {
        debug!("Running {} {} {}", self.program.display(), path.display(), index);

        let child = Command::new(&self.program)
            .arg(path)
            .arg(index.to_string())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(e) => return ExtractorOutcome::Error(ExtractorFailure::Launch(e.to_string())),
        };

        // Dropping the wait future on timeout drops the child, which kills it
        let output = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
                Ok(output) => output,
                Err(_) => return ExtractorOutcome::Error(ExtractorFailure::TimedOut(limit)),
            },
            None => child.wait_with_output().await,
        };

        match output {
            Ok(output) => classify(path, index, output.status.code(), &output.stdout),
            Err(e) => ExtractorOutcome::Error(ExtractorFailure::Launch(e.to_string())),
        }
    }
}

/// Map an exit status and captured stdout to an outcome
fn classify(path: &Path, index: u32, code: Option<i32>, stdout: &[u8]) -> ExtractorOutcome {
    match code {
        Some(STATUS_FOUND) => {
            let stdout = match String::from_utf8(stdout.to_vec()) {
                Ok(text) => text,
                Err(e) => {
                    warn!(
                        "{} function {}: output is not valid UTF-8 (first bad byte at {}); \
                         invalid bytes stored as U+FFFD",
                        path.display(),
                        index,
                        e.utf8_error().valid_up_to()
                    );
                    String::from_utf8_lossy(stdout).into_owned()
                }
            };
            let (span, src) = parse_output(&stdout);
            let span = match span {
                Ok(span) => Some(span),
                Err(e) => {
                    warn!("{} function {}: {}; storing without offsets", path.display(), index, e);
                    None
                }
            };
            ExtractorOutcome::Success { span, src }
        }
        Some(STATUS_EXHAUSTED) => ExtractorOutcome::Exhausted,
        Some(code) => ExtractorOutcome::Error(ExtractorFailure::Status(code)),
        None => ExtractorOutcome::Error(ExtractorFailure::Signal),
    }
}
