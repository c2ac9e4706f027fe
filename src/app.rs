//! Client-side controller: the user actions of FlashRead.
//!
//! [`FlashRead`] owns a [`StateManager`] and an [`ApiClient`] and turns each
//! user action into gateway calls plus state mutations. Failures leave
//! history and documents as they were, except that a failed upload marks its
//! own document as errored and a failed chat turn appends an apology.
//! Uploads are checked for size and type locally before any request is made.

use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::client::ApiClient;
use crate::error::{FlashError, Result};
use crate::extract::{
    mime_from_file_name, FILE_TOO_LARGE_MESSAGE, MAX_FILE_SIZE, UNSUPPORTED_MESSAGE,
};
use crate::models::{
    ChatMessage, Credentials, Document, DocumentStatus, EnhanceRequest, HistoryItem, HistoryMode,
    Length, Provider, SummarizeRequest, SummarizeResponse,
};
use crate::state::{DocumentOutcome, StateManager};

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Files accepted by a single [`FlashRead::upload`] call.
pub const MAX_UPLOAD_FILES: usize = 5;

/// A file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct FlashRead {
    state: StateManager,
    client: ApiClient,
    credential_override: Credentials,
}

impl FlashRead {
    pub fn new(state: StateManager, client: ApiClient) -> Self {
        Self {
            state,
            client,
            credential_override: Credentials::default(),
        }
    }

    /// Use `overrides` in place of the stored credentials for every non-empty
    /// key. Nothing is persisted.
    pub fn with_credential_override(mut self, overrides: Credentials) -> Self {
        self.credential_override = overrides;
        self
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut StateManager {
        &mut self.state
    }

    /// Stored credentials with any per-invocation overrides applied.
    pub fn credentials(&self) -> Credentials {
        let stored = self.state.credentials();
        Credentials::new(
            self.credential_override
                .rapidapi()
                .or(stored.rapidapi())
                .unwrap_or_default(),
            self.credential_override
                .groq()
                .or(stored.groq())
                .unwrap_or_default(),
        )
    }

    /// Summarize a URL or raw text and record it in history.
    pub async fn summarize(&mut self, req: SummarizeRequest) -> Result<SummarizeResponse> {
        let resp = self.client.summarize(&req, &self.credentials()).await?;
        let source = req
            .url
            .as_deref()
            .or(req.text.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string();
        self.state.record_summary(HistoryItem::new(
            req.mode.into(),
            source,
            resp.provider,
            req.length,
            resp.summary.clone(),
        ))?;
        info!("summary ready via {}", resp.provider);
        Ok(resp)
    }

    /// Upload `files` concurrently. Each file gets its own document record,
    /// created as `processing` and completed or failed as its own extraction
    /// returns; completions arrive in no particular order.
    ///
    /// Files over [`MAX_FILE_SIZE`] or of an unsupported type are recorded as
    /// errored without a request. More than [`MAX_UPLOAD_FILES`] files is
    /// rejected before anything is recorded.
    pub async fn upload(&mut self, files: Vec<UploadFile>) -> Result<Vec<String>> {
        if files.len() > MAX_UPLOAD_FILES {
            return Err(FlashError::validation(format!(
                "Maximum {} files allowed",
                MAX_UPLOAD_FILES
            )));
        }

        // Every record is written before the first request goes out.
        let mut ids = Vec::with_capacity(files.len());
        let mut pending = Vec::new();
        for file in files {
            match validate_upload(&file) {
                Ok(content_type) => {
                    let doc =
                        Document::processing(&file.file_name, content_type, file.bytes.len() as u64);
                    ids.push(doc.id.clone());
                    pending.push((doc.id.clone(), content_type, file));
                    self.state.add_document(doc)?;
                }
                Err(e) => {
                    warn!("not uploading {}: {}", file.file_name, e);
                    let mut doc = Document::processing(
                        &file.file_name,
                        FALLBACK_CONTENT_TYPE,
                        file.bytes.len() as u64,
                    );
                    doc.status = DocumentStatus::Error;
                    doc.error = Some(e.to_string());
                    ids.push(doc.id.clone());
                    self.state.add_document(doc)?;
                }
            }
        }

        let mut tasks = JoinSet::new();
        for (id, content_type, file) in pending {
            let client = self.client.clone();
            tasks.spawn(async move {
                let outcome = match client
                    .process_document(&file.file_name, content_type, file.bytes)
                    .await
                {
                    Ok(processed) => DocumentOutcome::Completed(processed),
                    Err(e) => DocumentOutcome::Failed(e.to_string()),
                };
                (id, outcome)
            });
        }

        // Drain every task; the first storage error is returned afterwards.
        let mut first_err = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((id, outcome)) => {
                    if let Err(e) = self.state.update_document_status(&id, outcome) {
                        warn!("could not record upload result for {}: {}", id, e);
                        first_err.get_or_insert(e);
                    }
                }
                Err(e) => warn!("upload task failed: {}", e),
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(ids),
        }
    }

    /// Summarize a processed document through the text path with Groq.
    pub async fn summarize_document(&mut self, id: &str, length: Length) -> Result<String> {
        let doc = self.completed_document(id)?;
        let file_name = doc.file_name.clone();
        let req = SummarizeRequest::text(doc.extracted_text.clone(), Provider::Groq, length);

        let resp = self.client.summarize(&req, &self.credentials()).await?;
        self.state.set_document_summary(id, resp.summary.clone())?;
        self.state.record_summary(HistoryItem::new(
            HistoryMode::Document,
            file_name,
            Provider::Groq,
            length,
            resp.summary.clone(),
        ))?;
        Ok(resp.summary)
    }

    /// Start (or continue) chatting about a processed document.
    pub fn chat_with_document(&mut self, id: &str) -> Result<bool> {
        let doc = self.completed_document(id)?;
        let (content, name) = (doc.extracted_text.clone(), doc.file_name.clone());
        Ok(self.state.set_active_chat_context(content, name))
    }

    /// Start (or continue) chatting about a summary from history.
    pub fn chat_with_summary(&mut self, history_id: &str) -> Result<bool> {
        let item = self
            .state
            .history_item(history_id)
            .ok_or_else(|| FlashError::validation(format!("No history item {}", history_id)))?;
        let (content, name) = (item.summary.clone(), item.source.clone());
        Ok(self.state.set_active_chat_context(content, name))
    }

    /// Send one chat message and wait for the reply.
    pub async fn send_chat(&mut self, message: &str) -> Result<ChatMessage> {
        let turn = self.state.begin_chat_turn(message)?;
        let reply = self
            .client
            .chat(&turn.request, &self.credentials())
            .await
            .map(|r| r.response);
        self.state
            .finish_chat_turn(turn, reply)?
            .ok_or_else(|| FlashError::validation("Chat session changed before the reply arrived"))
    }

    pub async fn enhance(&self, content: &str, document_name: Option<&str>) -> Result<String> {
        let req = EnhanceRequest {
            content: content.to_string(),
            document_name: document_name.map(str::to_string),
        };
        let resp = self.client.enhance(&req, &self.credentials()).await?;
        Ok(resp.enhanced)
    }

    fn completed_document(&self, id: &str) -> Result<&Document> {
        let doc = self
            .state
            .document(id)
            .ok_or_else(|| FlashError::validation(format!("No document {}", id)))?;
        if doc.status != DocumentStatus::Completed {
            return Err(FlashError::validation(format!(
                "Document {} is not ready",
                doc.file_name
            )));
        }
        Ok(doc)
    }
}

/// The MIME type to upload `file` as, or the reason it is refused locally.
fn validate_upload(file: &UploadFile) -> Result<&'static str> {
    if file.bytes.len() > MAX_FILE_SIZE {
        return Err(FlashError::validation(FILE_TOO_LARGE_MESSAGE));
    }
    mime_from_file_name(&file.file_name)
        .ok_or_else(|| FlashError::UnsupportedFormat(UNSUPPORTED_MESSAGE.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChatRole;
    use crate::state::CHAT_APOLOGY;
    use crate::storage::{MemoryStorage, Storage};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(server: &MockServer) -> FlashRead {
        let state = StateManager::load(Arc::new(MemoryStorage::new())).unwrap();
        FlashRead::new(state, ApiClient::new(&server.uri()))
    }

    async fn mount_extraction(server: &MockServer, status: u16, body: serde_json::Value) {
        Mock::given(method("POST"))
            .and(path("/api/process-document"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn summarize_records_history_with_serving_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarize"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"summary": "# S", "provider": "groq"})),
            )
            .mount(&server)
            .await;

        let mut app = app(&server);
        app.summarize(SummarizeRequest::url(
            " https://example.com ",
            Provider::Rapidapi,
            Length::Medium,
        ))
        .await
        .unwrap();

        let item = &app.state().history()[0];
        assert_eq!(item.mode, HistoryMode::Url);
        assert_eq!(item.source, "https://example.com");
        assert_eq!(item.provider, Provider::Groq);
    }

    #[tokio::test]
    async fn failed_summarize_leaves_history_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/summarize"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({"error": "Missing URL"})))
            .mount(&server)
            .await;

        let mut app = app(&server);
        let err = app
            .summarize(SummarizeRequest::url("", Provider::Groq, Length::Short))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing URL");
        assert!(app.state().history().is_empty());
    }

    #[tokio::test]
    async fn upload_completes_document() {
        let server = MockServer::start().await;
        mount_extraction(
            &server,
            200,
            json!({
                "success": true,
                "fileName": "notes.txt",
                "fileType": "text/plain",
                "extractedText": "Hello\nWorld",
                "wordCount": 2,
                "charCount": 11
            }),
        )
        .await;

        let mut app = app(&server);
        let ids = app
            .upload(vec![UploadFile {
                file_name: "notes.txt".into(),
                bytes: b"Hello\r\nWorld".to_vec(),
            }])
            .await
            .unwrap();

        let doc = app.state().document(&ids[0]).unwrap();
        assert_eq!(doc.status, DocumentStatus::Completed);
        assert_eq!(doc.file_type, "text/plain");
        assert_eq!(doc.extracted_text, "Hello\nWorld");
    }

    #[tokio::test]
    async fn failed_upload_marks_only_its_document() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-document"))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                json!({"error": "Failed to process document", "details": "No text content found in document"}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app(&server);
        let ids = app
            .upload(vec![
                UploadFile {
                    file_name: "a.txt".into(),
                    bytes: b"   ".to_vec(),
                },
                UploadFile {
                    file_name: "b.png".into(),
                    bytes: vec![0; 4],
                },
            ])
            .await
            .unwrap();

        assert_eq!(ids.len(), 2);
        let txt = app.state().document(&ids[0]).unwrap();
        assert_eq!(txt.status, DocumentStatus::Error);
        assert_eq!(txt.file_type, "text/plain");
        assert_eq!(
            txt.error.as_deref(),
            Some("Failed to process document: No text content found in document")
        );

        let png = app.state().document(&ids[1]).unwrap();
        assert_eq!(png.status, DocumentStatus::Error);
        assert_eq!(png.file_type, FALLBACK_CONTENT_TYPE);
        assert_eq!(png.error.as_deref(), Some(UNSUPPORTED_MESSAGE));
    }

    #[tokio::test]
    async fn oversized_file_is_rejected_without_a_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-document"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut app = app(&server);
        let ids = app
            .upload(vec![UploadFile {
                file_name: "big.txt".into(),
                bytes: vec![b'a'; MAX_FILE_SIZE + 1],
            }])
            .await
            .unwrap();

        let doc = app.state().document(&ids[0]).unwrap();
        assert_eq!(doc.status, DocumentStatus::Error);
        assert_eq!(doc.error.as_deref(), Some("File size must be less than 10MB"));
        assert_eq!(doc.file_size, (MAX_FILE_SIZE + 1) as u64);
    }

    #[tokio::test]
    async fn too_many_files_are_rejected_before_recording() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-document"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let files = (0..=MAX_UPLOAD_FILES)
            .map(|i| UploadFile {
                file_name: format!("{}.txt", i),
                bytes: b"text".to_vec(),
            })
            .collect();

        let mut app = app(&server);
        let err = app.upload(files).await.unwrap_err();
        assert!(matches!(err, FlashError::Validation(_)));
        assert_eq!(err.to_string(), "Maximum 5 files allowed");
        assert!(app.state().documents().is_empty());
    }

    /// Accepts a fixed number of writes, then fails every later one.
    struct WriteBudgetStorage {
        inner: MemoryStorage,
        writes_left: AtomicUsize,
    }

    impl Storage for WriteBudgetStorage {
        fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.writes_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .map_err(|_| FlashError::Storage("disk full".into()))?;
            self.inner.set(key, value)
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.inner.remove(key)
        }
    }

    #[tokio::test]
    async fn storage_failure_still_settles_every_upload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/process-document"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "fileName": "n.txt",
                "fileType": "text/plain",
                "extractedText": "Body",
                "wordCount": 1,
                "charCount": 4
            })))
            .expect(2)
            .mount(&server)
            .await;

        let storage = Arc::new(WriteBudgetStorage {
            inner: MemoryStorage::new(),
            writes_left: AtomicUsize::new(usize::MAX),
        });
        let state = StateManager::load(storage.clone()).unwrap();
        let mut app = FlashRead::new(state, ApiClient::new(&server.uri()));
        // Both processing records persist; every status update fails to.
        storage.writes_left.store(2, Ordering::SeqCst);

        let files = ["a.txt", "b.txt"]
            .into_iter()
            .map(|name| UploadFile {
                file_name: name.into(),
                bytes: b"Body".to_vec(),
            })
            .collect();
        let err = app.upload(files).await.unwrap_err();
        assert!(matches!(err, FlashError::Storage(_)));

        let docs = app.state().documents();
        assert_eq!(docs.len(), 2);
        assert!(docs.iter().all(|d| d.status == DocumentStatus::Completed));
    }

    #[tokio::test]
    async fn summarize_document_uses_groq_text_path() {
        let server = MockServer::start().await;
        mount_extraction(
            &server,
            200,
            json!({
                "success": true,
                "fileName": "a.md",
                "fileType": "text/markdown",
                "extractedText": "Body text",
                "wordCount": 2,
                "charCount": 9
            }),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/api/summarize"))
            .and(body_partial_json(
                json!({"mode": "text", "text": "Body text", "provider": "groq"}),
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"summary": "## Doc", "provider": "groq"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut app = app(&server);
        let ids = app
            .upload(vec![UploadFile {
                file_name: "a.md".into(),
                bytes: b"Body text".to_vec(),
            }])
            .await
            .unwrap();
        let summary = app.summarize_document(&ids[0], Length::Short).await.unwrap();

        assert_eq!(summary, "## Doc");
        assert_eq!(app.state().document(&ids[0]).unwrap().summary.as_deref(), Some("## Doc"));
        let item = &app.state().history()[0];
        assert_eq!(item.mode, HistoryMode::Document);
        assert_eq!(item.source, "a.md");
    }

    #[tokio::test]
    async fn chat_failure_appends_apology() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "boom"})))
            .mount(&server)
            .await;

        let mut app = app(&server);
        app.state_mut().set_active_chat_context("body", "a.txt");
        let err = app.send_chat("hello").await.unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let messages = app.state().chat_messages();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, ChatRole::User);
        assert_eq!(messages[2].content, CHAT_APOLOGY);
    }

    #[tokio::test]
    async fn credential_override_wins_over_stored() {
        let server = MockServer::start().await;
        let mut app = app(&server);
        app.state_mut()
            .set_credentials(Credentials::new("stored-r", "stored-g"))
            .unwrap();
        let app = app.with_credential_override(Credentials::new("", "env-g"));
        let creds = app.credentials();
        assert_eq!(creds.rapidapi(), Some("stored-r"));
        assert_eq!(creds.groq(), Some("env-g"));
    }

    #[tokio::test]
    async fn chat_requires_completed_document() {
        let server = MockServer::start().await;
        let mut app = app(&server);
        let doc = Document::processing("a.txt", "text/plain", 1);
        let id = doc.id.clone();
        app.state_mut().add_document(doc).unwrap();
        assert!(matches!(
            app.chat_with_document(&id),
            Err(FlashError::Validation(_))
        ));
    }
}
