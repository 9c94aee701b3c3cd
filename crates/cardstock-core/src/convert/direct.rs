//! Primary conversion strategy: one-shot headless conversion.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

use super::collect_converted;
use super::traits::ConvertStrategy;
use crate::config::ConverterConfig;
use crate::error::{Error, Result};

/// Runs the office binary in one-shot batch mode:
/// `soffice --headless --convert-to pdf --outdir <dir> <input>`.
pub struct DirectConverter {
    binary: std::path::PathBuf,
    timeout_secs: u64,
}

impl DirectConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

#[async_trait]
impl ConvertStrategy for DirectConverter {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let outdir = output.parent().unwrap_or_else(|| Path::new("."));

        let mut command = Command::new(&self.binary);
        command
            .arg("--headless")
            .arg("--norestore")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(outdir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Direct conversion of {}", input.display());

        // kill_on_drop tears the process down when the timeout drops the future
        let process_output = match timeout(
            Duration::from_secs(self.timeout_secs),
            command.output(),
        )
        .await
        {
            Err(_) => {
                return Err(Error::ConversionTimeout {
                    secs: self.timeout_secs,
                });
            }
            Ok(Err(e)) => {
                return Err(Error::ConverterUnavailable(format!(
                    "failed to launch {}: {}",
                    self.binary.display(),
                    e
                )));
            }
            Ok(Ok(process_output)) => process_output,
        };

        if !process_output.status.success() {
            let stderr = String::from_utf8_lossy(&process_output.stderr);
            return Err(Error::ConversionFailed(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                process_output.status,
                stderr.trim()
            )));
        }

        collect_converted(input, outdir, output)
    }
}
