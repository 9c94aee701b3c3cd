use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Trait for document-to-PDF conversion strategies
#[async_trait]
pub trait ConvertStrategy: Send + Sync {
    /// Strategy name, for logging and error reporting
    fn name(&self) -> &'static str;

    /// Convert the document at `input` into a PDF at `output`.
    ///
    /// `output` must be created on success; any external resource the
    /// strategy acquires must be released on every exit path.
    async fn convert(&self, input: &Path, output: &Path) -> Result<()>;
}
