// ============================================================
// IMAGE MAPPING SPREADSHEET
// ============================================================
// Reads the "Local Image Name" -> "Live SFMC URL" sheet exported by the content team

use std::path::Path;

use calamine::{open_workbook, Data, DataType, Range, Reader, Xlsx};

use crate::domain::error::{AppError, Result};
use crate::domain::image_mapping::ImageMapping;
use crate::infrastructure::config::SpreadsheetConfig;

/// Loads the image mapping from an `.xlsx` workbook.
pub fn load_image_mapping(path: &Path, config: &SpreadsheetConfig) -> Result<ImageMapping> {
    if !path.is_file() {
        return Err(AppError::NotFound(format!(
            "Excel file not found: {}",
            path.display()
        )));
    }

    let mut workbook: Xlsx<_> = open_workbook(path).map_err(|e| {
        AppError::ParseError(format!(
            "Failed to open Excel file {}: {}",
            path.display(),
            e
        ))
    })?;

    let sheet_names = workbook.sheet_names();
    let sheet = if sheet_names.iter().any(|s| s == &config.sheet_name) {
        config.sheet_name.clone()
    } else {
        let first = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| AppError::ParseError("No worksheet found".to_string()))?;
        tracing::warn!(
            wanted = %config.sheet_name,
            using = %first,
            "Configured sheet not found, falling back to first worksheet"
        );
        first
    };

    let range = workbook.worksheet_range(&sheet).map_err(|e| {
        AppError::ParseError(format!("Failed to read Excel sheet {}: {}", sheet, e))
    })?;

    let mapping = mapping_from_rows(range_to_rows(&range), config)?;
    tracing::info!(
        path = %path.display(),
        sheet = %sheet,
        entries = mapping.len(),
        "Image mapping loaded"
    );
    Ok(mapping)
}

/// Every cell as a string, the way the content team sees it.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<String>> {
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| {
                    cell.as_string()
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| format!("{}", cell))
                })
                .collect()
        })
        .collect()
}

/// Builds the mapping from a header row plus data rows.
///
/// Columns are located by substring so headers like `"Local Image Name (png)"`
/// still match. Rows with a blank local name are skipped.
pub fn mapping_from_rows(rows: Vec<Vec<String>>, config: &SpreadsheetConfig) -> Result<ImageMapping> {
    let mut rows = rows.into_iter();
    let headers = rows.next().unwrap_or_default();
    tracing::info!(columns = ?headers, "Columns found in the Excel file");

    let find_column = |needle: &str| headers.iter().position(|h| h.trim().contains(needle));
    let local_col = find_column(&config.local_name_column);
    let url_col = find_column(&config.url_column);

    let (local_col, url_col) = match (local_col, url_col) {
        (Some(local), Some(url)) => (local, url),
        (local, url) => {
            let missing: Vec<&str> = [
                (local, config.local_name_column.as_str()),
                (url, config.url_column.as_str()),
            ]
            .into_iter()
            .filter(|(found, _)| found.is_none())
            .map(|(_, name)| name)
            .collect();
            return Err(AppError::MissingColumn(format!(
                "Required columns not found in Excel file: {} (found: {})",
                missing.join(", "),
                headers.join(", ")
            )));
        }
    };

    let mut mapping = ImageMapping::new();
    for row in rows {
        let local = row.get(local_col).map(|s| s.trim()).unwrap_or_default();
        if local.is_empty() {
            continue;
        }
        let url = row.get(url_col).map(|s| s.trim()).unwrap_or_default();
        mapping.insert(local, url);
    }
    Ok(mapping)
}
