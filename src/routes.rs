use axum::{
    extract::{
        rejection::JsonRejection, DefaultBodyLimit, FromRequest, Multipart, Request, State,
    },
    http::{header, HeaderMap},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::models::{BinaryPayload, UploadInput, UploadRecord, DEFAULT_CONTENT_TYPE};
use crate::storage::PUBLIC_PREFIX;
use crate::user_models::{CredentialsRequest, LoginResponse, SuccessResponse};
use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let upload_limit = DefaultBodyLimit::max(state.config.max_upload_bytes);
    let serve_uploads = ServeDir::new(state.uploads.upload_dir());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/register", post(register))
        .route("/api/login", post(login))
        .route("/api/upload", post(upload).layer(upload_limit))
        .route("/api/uploads", get(list_uploads))
        .nest_service(PUBLIC_PREFIX, serve_uploads)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn register(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    state.users.register(&body.username, &body.password).await?;

    Ok(Json(SuccessResponse::ok()))
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, AppError> {
    let Json(body) = payload.map_err(|e| AppError::MalformedPayload(e.body_text()))?;

    let user = state.users.authenticate(&body.username, &body.password).await?;

    Ok(Json(LoginResponse {
        success: true,
        username: user.username,
    }))
}

/// JSON form of a text-only upload.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TextUploadRequest {
    text: Option<String>,
    uploaded_by: Option<String>,
}

async fn upload(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let input = if is_multipart(request.headers()) {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
        read_multipart(multipart).await?
    } else if is_json(request.headers()) {
        let Json(body) = Json::<TextUploadRequest>::from_request(request, &())
            .await
            .map_err(|e| AppError::MalformedPayload(e.body_text()))?;
        UploadInput {
            file: None,
            text: body.text,
            uploaded_by: body.uploaded_by,
        }
    } else {
        UploadInput::default()
    };

    state.uploads.submit(input).await?;

    Ok(Json(SuccessResponse::ok()))
}

async fn list_uploads(State(state): State<Arc<AppState>>) -> Json<Vec<UploadRecord>> {
    Json(state.uploads.list_all().await)
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadInput, AppError> {
    let mut input = UploadInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::MalformedPayload(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                // Browsers send an empty, unnamed part for an untouched file input.
                let Some(original_name) = field
                    .file_name()
                    .filter(|n| !n.is_empty())
                    .map(str::to_string)
                else {
                    continue;
                };
                let content_type = field
                    .content_type()
                    .unwrap_or(DEFAULT_CONTENT_TYPE)
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::MalformedPayload(e.body_text()))?;

                tracing::debug!(
                    file_name = %original_name,
                    content_type = %content_type,
                    bytes = data.len(),
                    "Received file part"
                );

                input.file = Some(BinaryPayload {
                    original_name,
                    content_type,
                    data: data.to_vec(),
                });
            }
            "text" => {
                input.text = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::MalformedPayload(e.body_text()))?,
                );
            }
            "uploadedBy" => {
                input.uploaded_by = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| AppError::MalformedPayload(e.body_text()))?,
                );
            }
            other => tracing::debug!(field = other, "Ignoring multipart field"),
        }
    }

    Ok(input)
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("multipart/form-data"))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("application/json"))
}
