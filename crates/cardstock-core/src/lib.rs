//! Cardstock Core Library
//!
//! This library provides the core functionality for generating print-ready
//! scorecard PDFs from a DOCX template and a tabular data source:
//! - Placeholder substitution with run normalization
//! - Tabular source reading with delimiter sniffing
//! - Pagination into fixed-size card groups
//! - DOCX-to-PDF conversion with a two-tier fallback
//! - Back-page composition and final page assembly

pub mod config;
pub mod convert;
pub mod docx;
pub mod error;
pub mod pdf;
pub mod slots;
pub mod source;
pub mod util;

pub use config::{AppConfig, ConverterConfig, DEFAULT_CARDS_PER_PAGE, MappingConfig};
pub use convert::{ConversionService, ConvertStrategy, DirectConverter, SessionConverter};
pub use docx::DocxTemplate;
pub use error::{Error, Result};
pub use source::{Record, TabularSource};

use std::path::{Path, PathBuf};

use tracing::{debug, info};

/// Name of the assembled output artifact inside the scratch directory.
pub const OUTPUT_FILE_NAME: &str = "final_scorecards.pdf";

/// Progress callback: (pages done, total pages).
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send>;

/// One generation run's inputs.
///
/// The template, data, and back-page artifacts are owned by the caller and
/// only read; the scratch directory is the pipeline's to create and delete
/// files within, and the returned output lives inside it until the caller
/// relocates it.
pub struct GenerateJob {
    /// DOCX template containing the slots
    pub template: PathBuf,
    /// Delimited data source
    pub data: PathBuf,
    /// Column-to-slot mapping plus cards per page
    pub mapping: MappingConfig,
    /// Optional static back page merged behind every front page
    pub back_page: Option<PathBuf>,
    /// Directory for intermediates and the final artifact
    pub scratch_dir: PathBuf,
}

/// High-level scorecard generator that combines all pipeline stages.
///
/// Pages are processed strictly one at a time, in ascending page-index
/// order: the fallback conversion strategy drives an external process that
/// is not safe for concurrent use, and per-page intermediates are deleted
/// before the next page begins, so the scratch footprint stays at one page.
pub struct ScorecardGenerator {
    converter: ConversionService,
}

impl ScorecardGenerator {
    /// Create a generator with the configured conversion backend.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            converter: ConversionService::new(&config.converter),
        }
    }

    /// Create a generator with a custom conversion service.
    pub const fn with_converter(converter: ConversionService) -> Self {
        Self { converter }
    }

    /// Run the full pipeline: fill, paginate, convert, compose, assemble.
    ///
    /// Returns the path of the assembled PDF inside the scratch directory.
    /// Either a complete, correctly ordered artifact is produced or an error
    /// is returned with no partial output. A failed page removes everything
    /// it created itself; composed pages from earlier iterations stay behind
    /// in the scratch directory, whose disposal is the caller's.
    pub async fn generate(
        &self,
        job: &GenerateJob,
        progress: Option<ProgressCallback>,
    ) -> Result<PathBuf> {
        let cards_per_page = job.mapping.cards_per_page;
        if cards_per_page == 0 {
            return Err(Error::ConfigInvalid {
                field: "cards_per_page".to_string(),
                reason: "must be a positive integer".to_string(),
            });
        }

        let template = DocxTemplate::from_file(&job.template)?;

        let source = TabularSource::from_file(&job.data)?;
        let headers: Vec<String> = source.headers().to_vec();
        let records = source.collect_records()?;
        let mapping = job.mapping.resolved_for_headers(&headers);

        let back_page = job
            .back_page
            .as_deref()
            .filter(|path| path.exists());

        let total_pages = records.len().div_ceil(cards_per_page);
        info!(
            "Generating {} pages from {} records ({} cards per page{})",
            total_pages,
            records.len(),
            cards_per_page,
            if back_page.is_some() { ", with back page" } else { "" }
        );

        let mut page_paths = Vec::with_capacity(total_pages);

        for (index, group) in slots::paginate(&records, cards_per_page).enumerate() {
            let placeholders = slots::resolve_slots(&mapping, group, cards_per_page);

            let front_docx = job.scratch_dir.join(format!("front_{index}.docx"));
            let front_pdf = job.scratch_dir.join(format!("front_{index}.pdf"));
            let page_pdf = job.scratch_dir.join(format!("page_{index}.pdf"));

            let result = self
                .render_page(
                    &template,
                    &placeholders,
                    back_page,
                    &front_docx,
                    &front_pdf,
                    &page_pdf,
                    index,
                )
                .await;

            // This page's intermediates never outlive its iteration; a
            // failed page also takes its composed artifact with it
            util::remove_quietly(&front_docx);
            util::remove_quietly(&front_pdf);
            if result.is_err() {
                util::remove_quietly(&page_pdf);
            }
            result?;

            page_paths.push(page_pdf);
            if let Some(ref callback) = progress {
                callback(index + 1, total_pages);
            }
        }

        // Strictly numeric page order, independent of creation order
        page_paths.sort_by_key(|path| pdf::page_index_from_name(path).unwrap_or(usize::MAX));

        let output = job.scratch_dir.join(OUTPUT_FILE_NAME);
        let assembled = pdf::merge_files(&page_paths, &output);

        for page_path in &page_paths {
            util::remove_quietly(page_path);
        }
        assembled?;

        debug!("Assembled {} pages into {}", page_paths.len(), output.display());
        Ok(output)
    }

    /// Fill, convert, and compose one page.
    #[allow(clippy::too_many_arguments)]
    async fn render_page(
        &self,
        template: &DocxTemplate,
        placeholders: &[(String, String)],
        back_page: Option<&Path>,
        front_docx: &Path,
        front_pdf: &Path,
        page_pdf: &Path,
        index: usize,
    ) -> Result<()> {
        template.render_to_file(placeholders, front_docx)?;

        self.converter
            .convert(front_docx, front_pdf)
            .await
            .map_err(|e| Error::Conversion {
                page: index,
                reason: e.to_string(),
            })?;

        match back_page {
            Some(back) => pdf::merge_files(&[front_pdf, back], page_pdf)?,
            None => {
                std::fs::copy(front_pdf, page_pdf)?;
            }
        }
        Ok(())
    }

    /// Convert the unfilled template alone, composing the back page if one
    /// exists. Returns the path of the preview PDF inside the scratch
    /// directory.
    pub async fn preview(
        &self,
        template_path: &Path,
        back_page: Option<&Path>,
        scratch_dir: &Path,
    ) -> Result<PathBuf> {
        // Validate up front so a corrupt template fails like a generate run
        let _ = DocxTemplate::from_file(template_path)?;

        let front_pdf = scratch_dir.join("preview_front.pdf");
        let preview_pdf = scratch_dir.join("preview.pdf");

        let converted = self
            .converter
            .convert(template_path, &front_pdf)
            .await
            .map_err(|e| Error::Conversion {
                page: 0,
                reason: e.to_string(),
            });

        let result = match (converted, back_page.filter(|b| b.exists())) {
            (Err(e), _) => Err(e),
            (Ok(()), Some(back)) => pdf::merge_files(&[front_pdf.as_path(), back], &preview_pdf),
            (Ok(()), None) => std::fs::copy(&front_pdf, &preview_pdf)
                .map(|_| ())
                .map_err(Error::from),
        };

        util::remove_quietly(&front_pdf);
        result?;
        Ok(preview_pdf)
    }
}
