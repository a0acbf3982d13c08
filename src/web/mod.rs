// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! JSON API over the analysis workflow, for a browser front-end

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::classify::ClassifiedFailure;
use crate::collection::{accept_images, ImageFile, ImageId};
use crate::config::AppConfig;
use crate::proxy::ProxyClient;
use crate::response::AnalysisResult;
use crate::workflow::WorkflowController;
use crate::LensError;

/// Shared application state
pub struct AppState {
    pub controller: Mutex<WorkflowController>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(controller: WorkflowController, config: AppConfig) -> Self {
        Self {
            controller: Mutex::new(controller),
            config,
        }
    }
}

/// Create the web application router
pub fn create_router(state: Arc<AppState>) -> Router {
    let upload_limit = state.config.web.max_upload_bytes;

    Router::new()
        .route("/api/state", get(api_get_state))
        .route("/api/images", post(api_add_images))
        .route("/api/images/:id", delete(api_remove_image))
        .route("/api/images/:id/annotation", put(api_set_annotation))
        .route("/api/images/:id/preview", get(api_get_preview))
        .route("/api/analyze", post(api_analyze))
        .route("/api/retry-edit", post(api_retry_edit))
        .route("/api/reset", post(api_reset))
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// === Responses ===

#[derive(Debug, Serialize, Deserialize)]
pub struct ImageView {
    pub id: ImageId,
    pub name: String,
    pub mime_type: String,
    pub annotation: String,
    pub preview_url: String,
}

#[derive(Debug, Serialize)]
pub struct StateSnapshot {
    pub state: &'static str,
    pub images: Vec<ImageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<AnalysisResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<ClassifiedFailure>,
}

impl StateSnapshot {
    fn of(controller: &WorkflowController) -> Self {
        let images = controller
            .images()
            .iter()
            .map(|img| ImageView {
                id: img.id(),
                name: img.name().to_string(),
                mime_type: img.mime_type().to_string(),
                annotation: img.annotation().to_string(),
                preview_url: img.preview().url(),
            })
            .collect();

        Self {
            state: controller.state().name(),
            images,
            result: controller.result().cloned(),
            failure: controller.failure().cloned(),
        }
    }
}

/// Error body returned by every handler
pub enum ApiError {
    Lens(LensError),
    BadRequest(String),
    NotFound,
}

impl From<LensError> for ApiError {
    fn from(e: LensError) -> Self {
        ApiError::Lens(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Lens(e @ LensError::InvalidTransition { .. }) => {
                (StatusCode::CONFLICT, e.to_string())
            }
            ApiError::Lens(e @ LensError::UnsupportedFileType(_)) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
            }
            ApiError::Lens(e) => {
                error!("Request failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Image not found".to_string()),
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

// === Handlers ===

async fn api_get_state(State(state): State<Arc<AppState>>) -> Json<StateSnapshot> {
    let controller = state.controller.lock().await;
    Json(StateSnapshot::of(&controller))
}

async fn api_add_images(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> ApiResult<Json<StateSnapshot>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        let name = field.file_name().unwrap_or("upload").to_string();
        let mime_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let content = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        files.push(ImageFile::new(name, content.to_vec(), mime_type));
    }

    let mut controller = state.controller.lock().await;
    controller.add(accept_images(files))?;
    Ok(Json(StateSnapshot::of(&controller)))
}

async fn api_remove_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<StateSnapshot>> {
    let mut controller = state.controller.lock().await;
    controller.remove(ImageId::from(id))?;
    Ok(Json(StateSnapshot::of(&controller)))
}

#[derive(Deserialize)]
struct AnnotationBody {
    text: String,
}

async fn api_set_annotation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(body): Json<AnnotationBody>,
) -> ApiResult<Json<StateSnapshot>> {
    let mut controller = state.controller.lock().await;
    if !controller.set_annotation(ImageId::from(id), body.text)? {
        return Err(ApiError::NotFound);
    }
    Ok(Json(StateSnapshot::of(&controller)))
}

async fn api_get_preview(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Response> {
    let controller = state.controller.lock().await;
    let image = controller
        .images()
        .get(ImageId::from(id))
        .ok_or(ApiError::NotFound)?;

    Ok((
        [(header::CONTENT_TYPE, image.mime_type().to_string())],
        image.content().to_vec(),
    )
        .into_response())
}

/// Start an analysis. The proxy call runs in the background so the
/// controller stays readable; clients poll `/api/state`.
async fn api_analyze(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<StateSnapshot>)> {
    let (request, transport, snapshot) = {
        let mut controller = state.controller.lock().await;
        let request = controller.begin_submit().await?;
        (request, controller.transport(), StateSnapshot::of(&controller))
    };

    let background = Arc::clone(&state);
    tokio::spawn(async move {
        let outcome = transport.send(&request).await;
        let mut controller = background.controller.lock().await;
        if let Err(e) = controller.finish_submit(outcome) {
            error!("Could not record analysis outcome: {}", e);
        }
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

async fn api_retry_edit(State(state): State<Arc<AppState>>) -> ApiResult<Json<StateSnapshot>> {
    let mut controller = state.controller.lock().await;
    controller.retry_edit()?;
    Ok(Json(StateSnapshot::of(&controller)))
}

async fn api_reset(State(state): State<Arc<AppState>>) -> ApiResult<Json<StateSnapshot>> {
    let mut controller = state.controller.lock().await;
    controller.reset()?;
    Ok(Json(StateSnapshot::of(&controller)))
}

/// Start the web server
pub async fn start_server(config: AppConfig) -> crate::Result<()> {
    let transport = Arc::new(ProxyClient::new(&config.proxy)?);
    info!("Inference proxy: {}", transport.url());

    let controller = WorkflowController::new(transport).with_prompt_override(
        config.analysis.effective_prompt_override().map(str::to_string),
    );
    let state = Arc::new(AppState::new(controller, config.clone()));

    let addr = format!("{}:{}", config.web.host, config.web.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("Web API available at http://{}", addr);

    let router = create_router(state);
    axum::serve(listener, router).await
        .map_err(|e| LensError::Config(format!("Server error: {}", e)))?;

    Ok(())
}
