use serde::Serialize;
use std::path::PathBuf;

pub const SALUTATION_UNCHANGED: &str = "No change";
pub const PREHEADER_REMOVED: &str = "Preheader removed successfully";

/// Per-request options coming from the upload form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformParams {
    pub from_text: Option<String>,
    pub to_text: String,
    pub remove_preheader: bool,
}

impl TransformParams {
    /// The salutation phrase to look for, if one was actually supplied.
    pub fn salutation_from(&self) -> Option<&str> {
        self.from_text.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransformReport {
    pub unmatched_images: Vec<String>,
    pub salutation_status: String,
    pub preheader_status: String,
    pub images_rewritten: usize,
    pub rows_removed: usize,
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub output_path: PathBuf,
    pub output_file_name: String,
    pub report: TransformReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_from_text_is_not_a_salutation() {
        let params = TransformParams {
            from_text: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(params.salutation_from(), None);

        let params = TransformParams {
            from_text: Some("Dear Customer".to_string()),
            ..Default::default()
        };
        assert_eq!(params.salutation_from(), Some("Dear Customer"));
    }
}
