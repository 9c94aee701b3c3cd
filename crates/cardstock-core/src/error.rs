use thiserror::Error;

/// Unified error type for cardstock-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Template operations (opening, parsing, rendering, saving)
/// - Tabular source operations (delimiter detection, header parsing)
/// - Conversion operations (primary and fallback strategies, timeouts)
/// - PDF merge and assembly operations
/// - Configuration operations (loading, validation)
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Template Errors
    // ==========================================================================
    /// Template artifact cannot be opened or parsed
    #[error("invalid template: {0}")]
    TemplateInvalid(String),

    /// Failed to write a filled template clone
    #[error("failed to save filled template: {0}")]
    TemplateSave(String),

    // ==========================================================================
    // Tabular Source Errors
    // ==========================================================================
    /// Tabular data cannot be parsed (ambiguous delimiter, missing header)
    #[error("invalid tabular source: {0}")]
    SourceFormat(String),

    // ==========================================================================
    // Conversion Errors
    // ==========================================================================
    /// Converter binary could not be launched
    #[error("converter unavailable: {0}")]
    ConverterUnavailable(String),

    /// Conversion process exceeded the configured timeout
    #[error("conversion timed out after {secs} seconds")]
    ConversionTimeout { secs: u64 },

    /// A single conversion strategy failed (exit status, missing output)
    #[error("conversion failed: {0}")]
    ConversionFailed(String),

    /// Both conversion strategies failed for a page
    #[error("failed to convert page {page}: {reason}")]
    Conversion { page: usize, reason: String },

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Portable-document merge failed (corrupt part)
    #[error("failed to merge PDF: {0}")]
    Merge(String),

    /// Failed to save an assembled PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
