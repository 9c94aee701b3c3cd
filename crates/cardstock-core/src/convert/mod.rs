//! Document-to-PDF conversion with a two-tier fallback.
//!
//! The service tries the primary strategy, and on any failure tries the
//! secondary exactly once. A secondary failure propagates the secondary's
//! error. There are no further retries.

mod direct;
mod session;
mod traits;

pub use direct::DirectConverter;
pub use session::SessionConverter;
pub use traits::ConvertStrategy;

use std::path::Path;
use std::sync::Arc;

use crate::config::ConverterConfig;
use crate::error::{Error, Result};

/// Two-tier conversion service.
pub struct ConversionService {
    primary: Arc<dyn ConvertStrategy>,
    secondary: Arc<dyn ConvertStrategy>,
}

impl ConversionService {
    /// Build the default service from configuration: one-shot batch
    /// conversion first, dedicated editor session as the fallback.
    pub fn new(config: &ConverterConfig) -> Self {
        Self {
            primary: Arc::new(DirectConverter::new(config)),
            secondary: Arc::new(SessionConverter::new(config)),
        }
    }

    /// Build a service from explicit strategies (used by tests).
    pub fn with_strategies(
        primary: Arc<dyn ConvertStrategy>,
        secondary: Arc<dyn ConvertStrategy>,
    ) -> Self {
        Self { primary, secondary }
    }

    /// Convert `input` to a PDF at `output`, falling back once on failure.
    pub async fn convert(&self, input: &Path, output: &Path) -> Result<()> {
        match self.primary.convert(input, output).await {
            Ok(()) => Ok(()),
            Err(primary_err) => {
                tracing::warn!(
                    "Conversion strategy '{}' failed ({}), falling back to '{}'",
                    self.primary.name(),
                    primary_err,
                    self.secondary.name()
                );
                self.secondary.convert(input, output).await
            }
        }
    }
}

/// Move the converter's own output file onto the requested path.
///
/// Batch conversion always writes `<input stem>.pdf` into the out-directory;
/// the pipeline may want the artifact under a different name.
fn collect_converted(input: &Path, outdir: &Path, output: &Path) -> Result<()> {
    let stem = input
        .file_stem()
        .ok_or_else(|| Error::ConversionFailed(format!("input has no stem: {}", input.display())))?;
    let produced = outdir.join(Path::new(stem)).with_extension("pdf");

    if !produced.exists() {
        return Err(Error::ConversionFailed(format!(
            "converter produced no output for {}",
            input.display()
        )));
    }

    if produced != output {
        std::fs::rename(&produced, output)?;
    }
    Ok(())
}
