use tera::{Context, Tera};

use crate::domain::error::{AppError, Result};
use crate::domain::template::PipelineOutput;

const TEMPLATES: [(&str, &str); 3] = [
    ("base.html", include_str!("../../../templates/base.html")),
    ("index.html", include_str!("../../../templates/index.html")),
    ("result.html", include_str!("../../../templates/result.html")),
];

/// Page templates compiled into the binary. `.html` names get tera's autoescaping.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES.to_vec())
            .map_err(|e| AppError::Internal(format!("Failed to load page templates: {}", e)))?;
        Ok(Self { tera })
    }

    pub fn index_page(&self, notice: Option<&str>) -> Result<String> {
        let mut context = Context::new();
        context.insert("title", "Email template preparation");
        context.insert("notice", &notice);
        self.render("index.html", &context)
    }

    pub fn result_page(&self, output: &PipelineOutput) -> Result<String> {
        let mut context = Context::new();
        context.insert("title", "Template processed");
        context.insert(
            "download_href",
            &urlencoding::encode(&output.output_file_name),
        );
        context.insert("output_file_name", &output.output_file_name);
        context.insert("report", &output.report);
        self.render("result.html", &context)
    }

    fn render(&self, name: &str, context: &Context) -> Result<String> {
        self.tera
            .render(name, context)
            .map_err(|e| AppError::Internal(format!("Failed to render {}: {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::template::TransformReport;
    use std::path::PathBuf;

    fn output(unmatched: Vec<String>) -> PipelineOutput {
        PipelineOutput {
            output_path: PathBuf::from("uploads/modified_promo mail.html"),
            output_file_name: "modified_promo mail.html".to_string(),
            report: TransformReport {
                unmatched_images: unmatched,
                salutation_status: "Replaced 'Dear' with 'Hi <b>'".to_string(),
                preheader_status: "Preheader removed successfully".to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_result_page_lists_unmatched_and_escapes() {
        let views = Views::new().unwrap();
        let html = views
            .result_page(&output(vec!["<x>.png".to_string()]))
            .unwrap();
        assert!(html.contains(r#"href="/download/modified_promo%20mail.html""#));
        assert!(html.contains("<code>&lt;x&gt;.png</code>"));
        assert!(html.contains("Replaced &#x27;Dear&#x27; with &#x27;Hi &lt;b&gt;&#x27;"));
        assert!(html.contains("Preheader removed successfully"));
        assert!(html.contains("<title>Template processed</title>"));
    }

    #[test]
    fn test_result_page_all_matched() {
        let html = Views::new().unwrap().result_page(&output(Vec::new())).unwrap();
        assert!(html.contains("All images were matched."));
        assert!(!html.contains("<h2>"));
    }

    #[test]
    fn test_result_page_without_preheader_status() {
        let mut out = output(Vec::new());
        out.report.preheader_status.clear();
        let html = Views::new().unwrap().result_page(&out).unwrap();
        assert_eq!(html.matches(r#"<p class="status">"#).count(), 1);
    }

    #[test]
    fn test_download_href_encodes_non_ascii() {
        let mut out = output(Vec::new());
        out.output_file_name = "modified_é.html".to_string();
        let html = Views::new().unwrap().result_page(&out).unwrap();
        assert!(html.contains(r#"href="/download/modified_%C3%A9.html""#));
    }

    #[test]
    fn test_index_page_notice() {
        let views = Views::new().unwrap();
        assert!(!views.index_page(None).unwrap().contains("class=\"notice\""));
        let html = views.index_page(Some("Only .html & .xlsx")).unwrap();
        assert!(html.contains(r#"<p class="notice">Only .html &amp; .xlsx</p>"#));
        assert!(html.contains(r#"enctype="multipart/form-data""#));
    }
}
