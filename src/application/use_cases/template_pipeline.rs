// ============================================================
// TEMPLATE PIPELINE USE CASE
// ============================================================
// mapping -> salutation -> DOM edits -> tracking tag -> output file

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::html_transformer::HtmlTransformer;
use super::salutation::replace_salutation;
use crate::domain::error::{AppError, Result};
use crate::domain::template::{
    PipelineOutput, TransformParams, TransformReport, SALUTATION_UNCHANGED,
};
use crate::infrastructure::config::{AppConfig, SpreadsheetConfig};
use crate::infrastructure::spreadsheet::load_image_mapping;
use crate::infrastructure::storage::{ensure_upload_dir, output_file_name};

const SNIPPET_CHARS: usize = 500;

pub struct TemplatePipelineUseCase {
    output_dir: PathBuf,
    output_prefix: String,
    spreadsheet: SpreadsheetConfig,
    transformer: HtmlTransformer,
}

impl TemplatePipelineUseCase {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            output_dir: config.storage.upload_dir(),
            output_prefix: config.storage.output_prefix.clone(),
            spreadsheet: config.spreadsheet.clone(),
            transformer: HtmlTransformer::new(config.transform.clone()),
        }
    }

    /// Runs the whole transform. Any failing step aborts the run; nothing is
    /// retried and no partial output is written.
    pub fn execute(
        &self,
        html_path: &Path,
        spreadsheet_path: &Path,
        params: &TransformParams,
    ) -> Result<PipelineOutput> {
        let mapping = load_image_mapping(spreadsheet_path, &self.spreadsheet)?;

        let mut content = read_html(html_path)?;
        tracing::debug!(snippet = %snippet(&content), "Original HTML");

        let salutation_status = match params.salutation_from() {
            Some(from) => {
                let (updated, status) = replace_salutation(&content, from, &params.to_text);
                content = updated;
                status
            }
            None => SALUTATION_UNCHANGED.to_string(),
        };

        let transformed = self
            .transformer
            .transform(&content, &mapping, params.remove_preheader)?;
        tracing::debug!(snippet = %snippet(&transformed.html), "Final HTML");

        let output_file_name = output_file_name(&self.output_prefix, html_path).ok_or_else(|| {
            AppError::ValidationError(format!(
                "Cannot derive an output name from {}",
                html_path.display()
            ))
        })?;
        ensure_upload_dir(&self.output_dir)?;
        let output_path = self.output_dir.join(&output_file_name);
        fs::write(&output_path, &transformed.html).map_err(|e| {
            AppError::IoError(format!(
                "Failed to write {}: {}",
                output_path.display(),
                e
            ))
        })?;
        tracing::info!(output = %output_path.display(), "Modified HTML written");

        Ok(PipelineOutput {
            output_path,
            output_file_name,
            report: TransformReport {
                unmatched_images: transformed.unmatched_images,
                salutation_status,
                preheader_status: transformed.preheader_status,
                images_rewritten: transformed.images_rewritten,
                rows_removed: transformed.rows_removed,
            },
        })
    }
}

fn read_html(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => {
            AppError::NotFound(format!("HTML file not found: {}", path.display()))
        }
        _ => AppError::IoError(format!("Failed to read {}: {}", path.display(), e)),
    })
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}
