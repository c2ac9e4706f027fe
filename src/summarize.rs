//! Summarization gateway.
//!
//! Turns a [`SummarizeRequest`] plus the caller's credentials into one
//! markdown summary by delegating to one of two external providers:
//!
//! | Mode | Provider | Path |
//! |------|----------|------|
//! | `url` | `groq` | fetch page → strip HTML → LLM completion |
//! | `url` | `rapidapi` | article-summarizer API; on a non-success status, the Groq URL path when a Groq key is present |
//! | `text` | either | LLM completion (rapidapi is not used for raw text) |
//!
//! Validation and credential checks happen before any network call. There
//! are no retries and no caching; the rapidapi→groq fallback is the only
//! recovery path and it is deliberately one-directional.

use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, warn};

use crate::config::RapidApiConfig;
use crate::error::{FlashError, Result};
use crate::html::{html_to_text, truncate_chars};
use crate::llm::{Completion, LlmProvider, ModelTier};
use crate::models::{Credentials, Length, Mode, Provider, SummarizeRequest, SummarizeResponse};

/// Characters of page text forwarded to the LLM.
pub const MAX_PAGE_CHARS: usize = 28_000;
pub const URL_MAX_TOKENS: u32 = 1200;
pub const TEXT_MAX_TOKENS: u32 = 900;
const SUMMARY_TEMPERATURE: f32 = 0.2;

pub const SUMMARY_PERSONA: &str = "You are FlashRead, an expert summarizer. Produce concise, \
well-structured Markdown with headings and bullet points. Avoid fluff.";

const RAPIDAPI_TEXT_GUARD: &str =
    "RapidAPI may not support raw text; provide Groq key or switch to Groq provider.";

/// Build the user prompt for a summary completion.
pub fn build_prompt(mode: Mode, length: Length, text: &str, url: Option<&str>) -> String {
    let source = match (mode, url) {
        (Mode::Url, Some(url)) => format!("Source URL: {}\n", url),
        _ => String::new(),
    };
    [
        format!(
            "Summarize the following content in {} sentences.",
            length.sentence_range()
        ),
        "Output Markdown with:".to_string(),
        "- A short title".to_string(),
        "- Key bullets".to_string(),
        "- A brief takeaway".to_string(),
        String::new(),
        source,
        "Content:".to_string(),
        text.to_string(),
    ]
    .join("\n")
}

/// Fields the article-summarizer API may answer with.
#[derive(Debug, Default, Deserialize)]
struct RapidApiBody {
    summary: Option<String>,
    summary_text: Option<String>,
    result: Option<String>,
    message: Option<String>,
}

impl RapidApiBody {
    fn summary(self) -> Option<String> {
        [self.summary, self.summary_text, self.result]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
    }
}

pub struct SummarizeGateway {
    http: reqwest::Client,
    llm: Arc<dyn LlmProvider>,
    rapidapi: RapidApiConfig,
}

impl SummarizeGateway {
    pub fn new(http: reqwest::Client, llm: Arc<dyn LlmProvider>, rapidapi: RapidApiConfig) -> Self {
        Self {
            http,
            llm,
            rapidapi,
        }
    }

    pub async fn summarize(
        &self,
        req: &SummarizeRequest,
        creds: &Credentials,
    ) -> Result<SummarizeResponse> {
        match req.mode {
            Mode::Url => {
                let url = required(req.url.as_deref(), "Missing URL")?;
                self.summarize_url(url, req.provider, req.length, creds).await
            }
            Mode::Text => {
                let text = required(req.text.as_deref(), "Missing text")?;
                self.summarize_text(text, req.provider, req.length, creds)
                    .await
            }
        }
    }

    async fn summarize_url(
        &self,
        url: &str,
        provider: Provider,
        length: Length,
        creds: &Credentials,
    ) -> Result<SummarizeResponse> {
        match provider {
            Provider::Groq => {
                let key = creds
                    .groq()
                    .ok_or_else(|| FlashError::credential("Missing Groq key"))?;
                self.groq_url(url, length, key).await
            }
            Provider::Rapidapi => {
                let key = creds
                    .rapidapi()
                    .ok_or_else(|| FlashError::credential("Missing RapidAPI key"))?;
                match self.rapidapi_url(url, length, key).await {
                    Err(RapidApiFailure::Status(status, message)) => match creds.groq() {
                        Some(groq_key) => {
                            warn!(
                                "RapidAPI returned {} for {}, falling back to Groq",
                                status, url
                            );
                            self.groq_url(url, length, groq_key).await
                        }
                        None => Err(FlashError::provider_status(status, message)),
                    },
                    Err(RapidApiFailure::Other(err)) => Err(err),
                    Ok(summary) => {
                        info!("summarized {} via rapidapi", url);
                        Ok(SummarizeResponse {
                            summary,
                            provider: Provider::Rapidapi,
                        })
                    }
                }
            }
        }
    }

    async fn summarize_text(
        &self,
        text: &str,
        provider: Provider,
        length: Length,
        creds: &Credentials,
    ) -> Result<SummarizeResponse> {
        let key = match (provider, creds.groq()) {
            (_, Some(key)) => key,
            (Provider::Rapidapi, None) => return Err(FlashError::credential(RAPIDAPI_TEXT_GUARD)),
            (Provider::Groq, None) => return Err(FlashError::credential("Missing Groq key")),
        };

        let completion = Completion {
            model: ModelTier::Summary,
            system: SUMMARY_PERSONA.to_string(),
            prompt: build_prompt(Mode::Text, length, text, None),
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: Some(TEXT_MAX_TOKENS),
        };
        let summary = self.llm.complete(key, completion).await?;
        info!("summarized {} chars of text via groq", text.chars().count());
        Ok(SummarizeResponse {
            summary,
            provider: Provider::Groq,
        })
    }

    async fn groq_url(&self, url: &str, length: Length, key: &str) -> Result<SummarizeResponse> {
        let html = self.fetch_page(url).await?;
        let page_text = html_to_text(&html);
        let page_text = truncate_chars(&page_text, MAX_PAGE_CHARS);

        let completion = Completion {
            model: ModelTier::Summary,
            system: SUMMARY_PERSONA.to_string(),
            prompt: build_prompt(Mode::Url, length, page_text, Some(url)),
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: Some(URL_MAX_TOKENS),
        };
        let summary = self.llm.complete(key, completion).await?;
        info!("summarized {} via groq", url);
        Ok(SummarizeResponse {
            summary,
            provider: Provider::Groq,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FlashError::provider_status(
                status.as_u16(),
                format!("Failed to fetch URL: {}", status.as_u16()),
            ));
        }
        Ok(response.text().await?)
    }

    async fn rapidapi_url(
        &self,
        url: &str,
        length: Length,
        key: &str,
    ) -> std::result::Result<String, RapidApiFailure> {
        let endpoint = format!("{}/summarize", self.rapidapi.base_url.trim_end_matches('/'));
        let sentences = length.rapidapi_sentences().to_string();
        let response = self
            .http
            .get(&endpoint)
            .query(&[
                ("autoparse", "true"),
                ("url", url),
                ("length", sentences.as_str()),
            ])
            .header("X-RapidAPI-Key", key)
            .header("X-RapidAPI-Host", &self.rapidapi.host)
            .send()
            .await
            .map_err(|e| RapidApiFailure::Other(e.into()))?;

        let status = response.status();
        let body: RapidApiBody = response.json().await.unwrap_or_default();

        if !status.is_success() {
            let message = body
                .message
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| "RapidAPI summarization failed".to_string());
            return Err(RapidApiFailure::Status(status.as_u16(), message));
        }

        body.summary().ok_or_else(|| {
            RapidApiFailure::Other(FlashError::provider_status(502, "No summary returned"))
        })
    }
}

/// Distinguishes the one failure that may fall back from everything else.
enum RapidApiFailure {
    /// Non-success HTTP status with the provider's message.
    Status(u16, String),
    Other(FlashError),
}

fn required<'a>(value: Option<&'a str>, message: &str) -> Result<&'a str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FlashError::validation(message))
}
