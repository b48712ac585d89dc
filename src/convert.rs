use std::fs;
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::LrtError;

#[derive(Debug, Clone)]
pub struct ConvertOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

pub struct Converter {
    tool: String,
}

impl Converter {
    pub fn new(tool: impl Into<String>) -> Self {
        Self { tool: tool.into() }
    }

    // Direct argv invocation; a filename is never reinterpreted by a shell.
    pub fn convert(&self, file: &Utf8Path) -> Result<ConvertOutcome, LrtError> {
        let output = Command::new(&self.tool)
            .arg(file.as_str())
            .output()
            .map_err(|err| LrtError::Subprocess {
                tool: self.tool.clone(),
                message: err.to_string(),
            })?;
        Ok(ConvertOutcome {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    // One bad archive must not block the rest of the batch; failures are
    // reported and the file is skipped.
    pub fn convert_all(
        &self,
        files: &[Utf8PathBuf],
        sink: &dyn ProgressSink,
    ) -> Vec<(Utf8PathBuf, ConvertOutcome)> {
        let mut results = Vec::new();
        for file in files {
            sink.event(ProgressEvent {
                message: format!("phase=Convert; formatting {file}"),
                elapsed: None,
            });
            let outcome = match self.convert(file) {
                Ok(outcome) => outcome,
                Err(err) => ConvertOutcome {
                    success: false,
                    stdout: String::new(),
                    stderr: err.to_string(),
                },
            };
            if outcome.success {
                info!(file = %file, "formatted");
            } else {
                warn!(
                    file = %file,
                    stderr = outcome.stderr.trim(),
                    "conversion failed, skipping"
                );
                sink.event(ProgressEvent {
                    message: format!("phase=Convert; {file} failed, skipping"),
                    elapsed: None,
                });
            }
            results.push((file.clone(), outcome));
        }
        results
    }
}

pub fn discover_archives(
    base: &Utf8Path,
    suffixes: &[&str],
) -> Result<Vec<Utf8PathBuf>, LrtError> {
    let mut found = Vec::new();
    let mut stack = vec![base.to_path_buf()];
    while let Some(dir) = stack.pop() {
        if dir.file_name() == Some(".metadata") {
            continue;
        }
        let entries = match fs::read_dir(dir.as_std_path()) {
            Ok(entries) => entries,
            Err(_) if dir == *base => return Ok(Vec::new()),
            Err(err) => return Err(LrtError::Filesystem(format!("read {dir}: {err}"))),
        };
        for entry in entries {
            let entry = entry.map_err(|err| LrtError::Filesystem(err.to_string()))?;
            let path = Utf8PathBuf::from_path_buf(entry.path())
                .map_err(|_| LrtError::Filesystem("non-utf8 path in data directory".to_string()))?;
            if path.is_dir() {
                stack.push(path);
            } else if suffixes.iter().any(|suffix| path.as_str().ends_with(suffix)) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}
