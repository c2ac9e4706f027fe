//! Typed HTTP client for the FlashRead server endpoints.
//!
//! Every request attaches the caller's stored credentials as headers
//! (`x-rapidapi-key`, `x-groq-key`) when they are non-empty. Error bodies of
//! the form `{ "error": ..., "details"?: ... }` are decoded back into a
//! [`FlashError::Provider`] carrying the server's status and message.

use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{FlashError, Result};
use crate::models::{
    ChatRequest, ChatResponse, Credentials, EnhanceRequest, EnhanceResponse, ErrorResponse,
    ProcessedDocument, SummarizeRequest, SummarizeResponse,
};

pub const RAPIDAPI_KEY_HEADER: &str = "x-rapidapi-key";
pub const GROQ_KEY_HEADER: &str = "x-groq-key";

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn summarize(
        &self,
        req: &SummarizeRequest,
        credentials: &Credentials,
    ) -> Result<SummarizeResponse> {
        self.post_json("/api/summarize", req, credentials).await
    }

    pub async fn chat(&self, req: &ChatRequest, credentials: &Credentials) -> Result<ChatResponse> {
        self.post_json("/api/chat", req, credentials).await
    }

    pub async fn enhance(
        &self,
        req: &EnhanceRequest,
        credentials: &Credentials,
    ) -> Result<EnhanceResponse> {
        self.post_json("/api/enhance-summary", req, credentials)
            .await
    }

    /// Upload one file as the multipart field `file`.
    pub async fn process_document(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<ProcessedDocument> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)?;
        let form = Form::new().part("file", part);
        let builder = self
            .http
            .post(format!("{}/api/process-document", self.base_url))
            .multipart(form);
        send(builder).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, credentials: &Credentials) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let builder = with_credentials(self.http.post(url).json(body), credentials);
        send(builder).await
    }
}

fn with_credentials(mut builder: RequestBuilder, credentials: &Credentials) -> RequestBuilder {
    if let Some(key) = credentials.rapidapi() {
        builder = builder.header(RAPIDAPI_KEY_HEADER, key);
    }
    if let Some(key) = credentials.groq() {
        builder = builder.header(GROQ_KEY_HEADER, key);
    }
    builder
}

async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
    let resp = builder.send().await?;
    let status = resp.status();
    let body = resp.text().await?;

    if !status.is_success() {
        let message = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(ErrorResponse {
                error,
                details: Some(details),
            }) => format!("{}: {}", error, details),
            Ok(ErrorResponse { error, .. }) => error,
            Err(_) => format!("Request failed with status {}", status.as_u16()),
        };
        return Err(FlashError::provider_status(status.as_u16(), message));
    }

    serde_json::from_str(&body)
        .map_err(|e| FlashError::provider(format!("Invalid response from server: {}", e)))
}
