use axum::{
    extract::{
        multipart::{Multipart, MultipartError, MultipartRejection},
        rejection::JsonRejection,
        Path, State,
    },
    http::{header, StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use catalog_core::{naming, ManifestDocument, ScanReport};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::pages;
use crate::state::AppState;

/// Routes listed by the 404 fallback.
pub const ROUTES: [&str; 8] = [
    "GET /",
    "GET /api/scan",
    "POST /api/upload",
    "POST /api/replace",
    "POST /api/delete",
    "GET /api/generate-json",
    "GET /api/health",
    "GET /uploads/{collection}/{filename}",
];

/// Admin landing page
pub async fn index(State(state): State<AppState>) -> Html<String> {
    Html(pages::index_html(state.catalog.collections(), state.catalog.policy()))
}

pub async fn scan(State(state): State<AppState>) -> Result<Json<ScanReport>, ApiError> {
    let report = state.catalog.scan().await?;
    tracing::debug!("Scan: {} images", report.stats.total_images);
    Ok(Json(report))
}

/// Fields of the upload and replace forms.
#[derive(Default)]
struct ImageForm {
    file: Option<Vec<u8>>,
    file_name: Option<String>,
    collection: Option<String>,
    filename: Option<String>,
}

async fn read_form(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImageForm, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::bad_request(format!("Invalid form data: {e}")))?;
    let max_bytes = state.catalog.policy().max_bytes();
    let form_error = |e: MultipartError| {
        if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::bad_request(format!("File too large (max {max_bytes} bytes)"))
        } else {
            ApiError::bad_request(format!("Invalid form data: {e}"))
        }
    };

    let mut form = ImageForm::default();
    while let Some(field) = multipart.next_field().await.map_err(form_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file_name = field.file_name().map(str::to_string);
                form.file = Some(field.bytes().await.map_err(form_error)?.to_vec());
            }
            "collection" => form.collection = Some(field.text().await.map_err(form_error)?),
            "filename" => form.filename = Some(field.text().await.map_err(form_error)?),
            _ => {}
        }
    }
    Ok(form)
}

fn required(value: Option<String>, name: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::bad_request(format!("Missing field: {name}")))
}

pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(&state, multipart).await?;
    let collection = required(form.collection, "collection")?;
    let data = form.file.unwrap_or_default();
    let file_name = form.file_name.unwrap_or_default();

    let image = state.catalog.upload(&collection, &file_name, data).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Image uploaded to {} as {}", collection, image.filename),
        "image": image,
    })))
}

pub async fn replace(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Value>, ApiError> {
    let form = read_form(&state, multipart).await?;
    let collection = required(form.collection, "collection")?;
    let filename = required(form.filename, "filename")?;
    let data = form.file.unwrap_or_default();

    let image = state
        .catalog
        .replace(&collection, &filename, data, form.file_name.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Image {}/{} replaced", collection, filename),
        "image": image,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub collection: String,
    #[serde(default)]
    pub filename: String,
}

pub async fn delete(
    State(state): State<AppState>,
    body: Result<Json<DeleteRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?;

    let outcome = state
        .catalog
        .delete(&request.collection, &request.filename)
        .await?;

    let message = if outcome.found {
        format!("Image {}/{} deleted", request.collection, request.filename)
    } else {
        format!("Image {}/{} was already absent", request.collection, request.filename)
    };
    Ok(Json(json!({
        "success": true,
        "message": message,
        "found": outcome.found,
        "renamed": outcome.renamed,
    })))
}

/// Manifest for the static site, served as a download
pub async fn generate_json(State(state): State<AppState>) -> Result<Response, ApiError> {
    let manifest: ManifestDocument = state.catalog.generate_manifest().await?;
    tracing::info!("Manifest generated: {} collections", manifest.collections.len());

    Ok((
        [(
            header::CONTENT_DISPOSITION,
            "attachment; filename=\"collections.json\"",
        )],
        Json(manifest),
    )
        .into_response())
}

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "storage": state.catalog.storage_kind(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// Stored image bytes, from whichever backend is configured
pub async fn get_image(
    State(state): State<AppState>,
    Path((collection, filename)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    tracing::debug!("Image request: collection={}, filename={}", collection, filename);

    let data = match state.catalog.read_image(&collection, &filename).await {
        Ok(Some(data)) => data,
        Ok(None) => return Ok(not_found(&format!("Image not found: {collection}/{filename}"))),
        Err(e) if e.is_client_error() => return Ok(not_found(&e.to_string())),
        Err(e) => return Err(e.into()),
    };

    Ok(([(header::CONTENT_TYPE, naming::content_type(&filename))], data).into_response())
}

pub async fn fallback(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": format!("Route not found: {}", uri.path()),
            "routes": ROUTES,
        })),
    )
        .into_response()
}

fn not_found(message: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
}
