pub mod views;

use std::error::Error as StdError;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use actix_multipart::Multipart;
use actix_web::dev::Server;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{get, post, web, App, HttpResponse, HttpServer, Responder};
use futures_util::StreamExt;

use crate::application::TemplatePipelineUseCase;
use crate::domain::error::{AppError, Result};
use crate::domain::template::{PipelineOutput, TransformParams};
use crate::infrastructure::config::{AppConfig, StorageConfig};
use crate::infrastructure::storage::{
    ensure_upload_dir, is_allowed_extension, resolve_download, sanitize_filename,
};
use views::Views;

pub struct HttpState {
    pub config: AppConfig,
    pub pipeline: Arc<TemplatePipelineUseCase>,
    pub views: Views,
}

impl HttpState {
    pub fn new(config: AppConfig) -> Result<Self> {
        let pipeline = Arc::new(TemplatePipelineUseCase::new(&config));
        Ok(Self {
            config,
            pipeline,
            views: Views::new()?,
        })
    }
}

#[derive(Debug)]
struct UploadedFile {
    filename: String,
    bytes: Vec<u8>,
}

#[derive(Debug, Default)]
struct UploadForm {
    html_file: Option<UploadedFile>,
    excel_file: Option<UploadedFile>,
    from_text: String,
    to_text: String,
    remove_preheader: bool,
}

/// Both uploads checked and saved, ready for the pipeline.
struct SavedUpload {
    html_path: PathBuf,
    excel_path: PathBuf,
    params: TransformParams,
}

#[get("/")]
async fn index(data: web::Data<HttpState>) -> impl Responder {
    match data.views.index_page(None) {
        Ok(body) => html_page(HttpResponse::Ok(), body),
        Err(e) => failure(&e),
    }
}

#[post("/")]
async fn upload(data: web::Data<HttpState>, payload: Multipart) -> impl Responder {
    let form = match read_upload_form(payload, data.config.server.max_upload_bytes).await {
        Ok(form) => form,
        Err(e) => return rejected_upload(&data, e),
    };

    let saved = match save_upload(&data.config.storage, form).await {
        Ok(saved) => saved,
        Err(e) => return rejected_upload(&data, e),
    };

    tracing::info!(
        html = %saved.html_path.display(),
        excel = %saved.excel_path.display(),
        salutation = saved.params.salutation_from().is_some(),
        remove_preheader = saved.params.remove_preheader,
        "Processing upload"
    );

    let page = run_pipeline(data.pipeline.clone(), saved)
        .await
        .and_then(|output| {
            tracing::info!(
                output = %output.output_file_name,
                unmatched = output.report.unmatched_images.len(),
                "Upload processed"
            );
            data.views.result_page(&output)
        });
    match page {
        Ok(body) => html_page(HttpResponse::Ok(), body),
        Err(e) => failure(&e),
    }
}

#[get("/download/{filename}")]
async fn download(data: web::Data<HttpState>, filename: web::Path<String>) -> impl Responder {
    let filename = filename.into_inner();
    let upload_dir = data.config.storage.upload_dir();

    let Some(path) = resolve_download(&upload_dir, &filename) else {
        tracing::warn!(filename = %filename, "Download not found");
        return HttpResponse::NotFound().body("File not found");
    };

    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            tracing::info!(path = %path.display(), "Serving download");
            HttpResponse::Ok()
                .content_type("text/html; charset=utf-8")
                .insert_header(ContentDisposition {
                    disposition: DispositionType::Attachment,
                    parameters: vec![DispositionParam::Filename(filename)],
                })
                .body(bytes)
        }
        Err(e) => failure(&AppError::IoError(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

fn html_page(mut builder: actix_web::HttpResponseBuilder, body: String) -> HttpResponse {
    builder.content_type("text/html; charset=utf-8").body(body)
}

/// Plain-text 500 carrying the error and every cause behind it.
fn failure(err: &(dyn StdError + 'static)) -> HttpResponse {
    let detail = failure_detail(err);
    tracing::error!("{}", detail);
    HttpResponse::InternalServerError()
        .content_type("text/plain; charset=utf-8")
        .body(detail)
}

fn failure_detail(err: &(dyn StdError + 'static)) -> String {
    let mut detail = format!("An error occurred: {}", err);
    let mut cause = err.source();
    while let Some(inner) = cause {
        let _ = write!(detail, "\ncaused by: {}", inner);
        cause = inner.source();
    }
    detail
}

fn rejected_upload(data: &HttpState, err: AppError) -> HttpResponse {
    tracing::warn!("Upload rejected: {}", err);
    let notice = match &err {
        AppError::ValidationError(msg) => msg.clone(),
        other => other.to_string(),
    };
    match data.views.index_page(Some(&notice)) {
        Ok(body) => html_page(HttpResponse::BadRequest(), body),
        Err(e) => failure(&e),
    }
}

async fn read_upload_form(mut payload: Multipart, max_bytes: usize) -> Result<UploadForm> {
    let mut form = UploadForm::default();
    let mut total = 0usize;

    while let Some(field) = payload.next().await {
        let mut field = field
            .map_err(|e| AppError::ValidationError(format!("Invalid multipart payload: {}", e)))?;
        let name = field.name().unwrap_or_default().to_string();
        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename())
            .map(|f| f.to_string());

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk.map_err(|e| {
                AppError::ValidationError(format!("Failed to read upload field {}: {}", name, e))
            })?;
            total += chunk.len();
            if total > max_bytes {
                return Err(AppError::ValidationError(format!(
                    "Upload exceeds the {} byte limit",
                    max_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        match name.as_str() {
            "html_file" => form.html_file = uploaded(filename, bytes),
            "excel_file" => form.excel_file = uploaded(filename, bytes),
            "from_text" => form.from_text = field_text(&bytes),
            "to_text" => form.to_text = field_text(&bytes),
            "remove_preheader" => form.remove_preheader = true,
            _ => {}
        }
    }

    Ok(form)
}

fn field_text(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

/// A file input left empty still arrives as a part, just without a name.
fn uploaded(filename: Option<String>, bytes: Vec<u8>) -> Option<UploadedFile> {
    filename
        .filter(|f| !f.trim().is_empty())
        .map(|filename| UploadedFile { filename, bytes })
}

async fn save_upload(storage: &StorageConfig, form: UploadForm) -> Result<SavedUpload> {
    let (Some(html), Some(excel)) = (form.html_file, form.excel_file) else {
        return Err(AppError::ValidationError(
            "Please choose both an HTML template and an Excel mapping file.".to_string(),
        ));
    };

    let html_name = checked_name(&html.filename, storage)?;
    let excel_name = checked_name(&excel.filename, storage)?;

    let upload_dir = ensure_upload_dir(&storage.upload_dir())?;
    let html_path = upload_dir.join(&html_name);
    let excel_path = upload_dir.join(&excel_name);
    tracing::info!(path = %html_path.display(), "Saving HTML file");
    tokio::fs::write(&html_path, &html.bytes).await?;
    tracing::info!(path = %excel_path.display(), "Saving Excel file");
    tokio::fs::write(&excel_path, &excel.bytes).await?;

    let from_text = Some(form.from_text).filter(|s| !s.is_empty());
    Ok(SavedUpload {
        html_path,
        excel_path,
        params: TransformParams {
            from_text,
            to_text: form.to_text,
            remove_preheader: form.remove_preheader,
        },
    })
}

fn checked_name(filename: &str, storage: &StorageConfig) -> Result<String> {
    let name = sanitize_filename(filename)
        .ok_or_else(|| AppError::ValidationError(format!("Invalid file name: {}", filename)))?;
    if !is_allowed_extension(&name, &storage.allowed_extensions) {
        return Err(AppError::ValidationError(format!(
            "{} is not an allowed file type (allowed: {})",
            name,
            storage.allowed_extensions.join(", ")
        )));
    }
    Ok(name)
}

/// The pipeline is blocking file and DOM work, so it runs off the async workers.
async fn run_pipeline(
    pipeline: Arc<TemplatePipelineUseCase>,
    saved: SavedUpload,
) -> Result<PipelineOutput> {
    web::block(move || pipeline.execute(&saved.html_path, &saved.excel_path, &saved.params))
        .await
        .map_err(|e| AppError::Internal(format!("Pipeline task failed: {}", e)))?
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(upload).service(download);
}

pub fn start_server(config: AppConfig) -> std::io::Result<Server> {
    let bind = (config.server.host.clone(), config.server.port);
    let state = HttpState::new(config)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let state = web::Data::new(state);

    let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(configure))
        .bind(bind)?
        .run();

    Ok(server)
}
