//! FlashRead HTTP server.
//!
//! Stateless per call: credentials arrive as request headers on every call
//! and nothing is stored server-side.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/summarize` | Summarize a URL or raw text |
//! | `POST` | `/api/chat` | One assistant reply about a document |
//! | `POST` | `/api/enhance-summary` | Restructure a summary into cleaner markdown |
//! | `POST` | `/api/process-document` | Multipart upload (`file`) → extracted text |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Every error response has the shape
//!
//! ```json
//! { "error": "Missing URL" }
//! ```
//!
//! optionally with a `details` string. The status comes from
//! [`FlashError::status_code`]; malformed request bodies are `400`.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser front end
//! served from another origin can call the API.

use axum::{
    extract::{rejection::JsonRejection, multipart::MultipartError, DefaultBodyLimit, Multipart, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::chat::ChatGateway;
use crate::client::{GROQ_KEY_HEADER, RAPIDAPI_KEY_HEADER};
use crate::config::{Config, RapidApiConfig};
use crate::enhance::EnhanceGateway;
use crate::error::FlashError;
use crate::extract::{extract, mime_from_file_name, FILE_TOO_LARGE_MESSAGE, MAX_FILE_SIZE};
use crate::llm::{GroqProvider, LlmProvider};
use crate::models::{
    ChatRequest, ChatResponse, Credentials, EnhanceRequest, EnhanceResponse, ErrorResponse,
    ProcessedDocument, SummarizeRequest, SummarizeResponse,
};
use crate::summarize::SummarizeGateway;

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    summarize: Arc<SummarizeGateway>,
    chat: Arc<ChatGateway>,
    enhance: Arc<EnhanceGateway>,
}

impl AppState {
    /// Wire the gateways to Groq and RapidAPI as configured.
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("flashread/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let llm: Arc<dyn LlmProvider> = Arc::new(GroqProvider::new(http.clone(), &config.groq));
        Ok(Self::with_llm(http, llm, config.rapidapi.clone()))
    }

    /// Wire the gateways to an arbitrary LLM provider.
    pub fn with_llm(http: reqwest::Client, llm: Arc<dyn LlmProvider>, rapidapi: RapidApiConfig) -> Self {
        Self {
            summarize: Arc::new(SummarizeGateway::new(http, llm.clone(), rapidapi)),
            chat: Arc::new(ChatGateway::new(llm.clone())),
            enhance: Arc::new(EnhanceGateway::new(llm)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/summarize", post(handle_summarize))
        .route("/api/chat", post(handle_chat))
        .route("/api/enhance-summary", post(handle_enhance))
        .route(
            "/api/process-document",
            post(handle_process_document)
                .layer(DefaultBodyLimit::max(MAX_FILE_SIZE + MULTIPART_OVERHEAD)),
        )
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until the process is
/// terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let state = AppState::new(config)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    info!("FlashRead server listening on http://{}", config.server.bind);
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
    details: Option<String>,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
            details: None,
        }
    }
}

impl From<FlashError> for AppError {
    fn from(err: FlashError) -> Self {
        Self {
            status: err.status_code(),
            message: err.to_string(),
            details: None,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        // Bodies past the route limit never reach `extract`, so report them
        // with the same validation error it would have produced.
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            return FlashError::validation(FILE_TOO_LARGE_MESSAGE).into();
        }
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "Failed to process document".to_string(),
            details: Some(err.body_text()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!("{} {}", self.status, self.message);
        }
        let body = ErrorResponse {
            error: self.message,
            details: self.details,
        };
        (self.status, Json(body)).into_response()
    }
}

fn credentials_from(headers: &HeaderMap) -> Credentials {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string()
    };
    Credentials::new(header(RAPIDAPI_KEY_HEADER), header(GROQ_KEY_HEADER))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/summarize ============

async fn handle_summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Json<SummarizeResponse>, AppError> {
    let Json(req) = payload?;
    let creds = credentials_from(&headers);
    let resp = state.summarize.summarize(&req, &creds).await?;
    Ok(Json(resp))
}

// ============ POST /api/chat ============

async fn handle_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(req) = payload?;
    let creds = credentials_from(&headers);
    let resp = state.chat.chat(&req, creds.groq()).await?;
    Ok(Json(resp))
}

// ============ POST /api/enhance-summary ============

async fn handle_enhance(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<EnhanceRequest>, JsonRejection>,
) -> Result<Json<EnhanceResponse>, AppError> {
    let Json(req) = payload?;
    let creds = credentials_from(&headers);
    let resp = state.enhance.enhance(&req, creds.groq()).await?;
    Ok(Json(resp))
}

// ============ POST /api/process-document ============

/// Accepts the multipart field `file`. Other fields are ignored.
async fn handle_process_document(
    mut multipart: Multipart,
) -> Result<Json<ProcessedDocument>, AppError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        upload = Some((file_name, declared, bytes));
        break;
    }
    let (file_name, declared, bytes) =
        upload.ok_or_else(|| AppError::bad_request("No file provided"))?;

    let file_type = resolve_content_type(declared.as_deref(), &file_name);
    info!("processing {} ({}, {} bytes)", file_name, file_type, bytes.len());

    let extracted = extract(&bytes, &file_type)?;
    info!(
        "extracted {} chars from {}",
        extracted.char_count, file_name
    );

    Ok(Json(ProcessedDocument {
        success: true,
        file_name,
        file_type,
        extracted_text: extracted.text,
        word_count: extracted.word_count,
        char_count: extracted.char_count,
    }))
}

/// The part's declared MIME type, or the one implied by the file extension
/// when the declaration is missing or generic.
fn resolve_content_type(declared: Option<&str>, file_name: &str) -> String {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");
    match declared {
        Some(ct) => ct,
        None => mime_from_file_name(file_name)
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}
