//! Fallback conversion strategy: dedicated editor session.
//!
//! The batch-mode converter occasionally refuses to run when another office
//! instance owns the shared user profile. This strategy opens its own editor
//! process against a private, throwaway profile, exports through it, and
//! tears the whole session down afterwards. Teardown happens on every exit
//! path: the session guard kills the process and deletes the profile on drop,
//! and an export failure is re-raised after that teardown.
//!
//! The session is single-owner and scoped to one page's conversion; it is
//! never shared or cached across pages.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::collect_converted;
use super::traits::ConvertStrategy;
use crate::config::ConverterConfig;
use crate::error::{Error, Result};

/// Drives a dedicated office process with a private user profile.
pub struct SessionConverter {
    binary: PathBuf,
    timeout_secs: u64,
}

impl SessionConverter {
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            timeout_secs: config.timeout_secs,
        }
    }
}

/// One editor process plus its throwaway profile directory.
///
/// `kill_on_drop` on the child and `TempDir`'s drop give RAII teardown; no
/// exit path can leak the process or the profile.
struct EditorSession {
    child: Child,
    _profile: TempDir,
}

impl EditorSession {
    /// Wait for the export to finish, killing the process on timeout.
    async fn wait_for_export(mut self, timeout_secs: u64) -> Result<()> {
        match timeout(Duration::from_secs(timeout_secs), self.child.wait()).await {
            Err(_) => {
                self.child.start_kill().ok();
                Err(Error::ConversionTimeout { secs: timeout_secs })
            }
            Ok(Err(e)) => Err(Error::ConversionFailed(format!(
                "editor session failed: {e}"
            ))),
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(Error::ConversionFailed(format!(
                "editor session exited with {status}"
            ))),
        }
    }
}

#[async_trait]
impl ConvertStrategy for SessionConverter {
    fn name(&self) -> &'static str {
        "session"
    }

    async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        let outdir = output.parent().unwrap_or_else(|| Path::new("."));

        let profile = TempDir::new()?;
        let profile_uri = format!("file://{}", profile.path().display());

        let child = Command::new(&self.binary)
            .arg(format!("-env:UserInstallation={profile_uri}"))
            .arg("--headless")
            .arg("--norestore")
            .arg("--nolockcheck")
            .arg("--nodefault")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(outdir)
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::ConverterUnavailable(format!(
                    "failed to launch {}: {}",
                    self.binary.display(),
                    e
                ))
            })?;

        tracing::debug!(
            "Opened editor session for {} (profile {})",
            input.display(),
            profile.path().display()
        );

        let session = EditorSession {
            child,
            _profile: profile,
        };

        // Export error propagates only after the session guard has dropped
        session.wait_for_export(self.timeout_secs).await?;

        collect_converted(input, outdir, output)
    }
}
