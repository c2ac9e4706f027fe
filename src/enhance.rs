//! Enhancement gateway: asks the LLM to restructure an existing summary into
//! cleaner markdown without changing its meaning.

use std::sync::Arc;

use tracing::info;

use crate::error::{FlashError, Result};
use crate::llm::{Completion, LlmProvider, ModelTier};
use crate::models::{EnhanceRequest, EnhanceResponse};

const ENHANCE_TEMPERATURE: f32 = 0.2;

pub const ENHANCE_PERSONA: &str = "You are FlashRead AI, an expert content enhancer. Your task is to improve summaries by:

1. Making them more readable and well-structured
2. Adding better markdown formatting (headers, bullets, emphasis)
3. Improving clarity and flow
4. Ensuring key points are highlighted
5. Adding logical organization and sections
6. Maintaining the original meaning and key information

Guidelines:
- Use proper markdown formatting (##, **, -, etc.)
- Create clear sections with descriptive headers
- Use bullet points for lists and key points
- Emphasize important terms with **bold** or *italic*
- Ensure smooth transitions between sections
- Keep the same level of detail but improve presentation
- Make it scannable and easy to read";

pub fn build_prompt(content: &str, document_name: Option<&str>) -> String {
    let target = document_name
        .filter(|n| !n.is_empty())
        .map(|n| format!(" for \"{}\"", n))
        .unwrap_or_default();
    format!(
        "Please enhance this summary{}:\n\n{}\n\nMake it more readable, well-structured, and visually appealing while preserving all the key information.",
        target, content
    )
}

pub struct EnhanceGateway {
    llm: Arc<dyn LlmProvider>,
}

impl EnhanceGateway {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    pub async fn enhance(
        &self,
        req: &EnhanceRequest,
        groq_key: Option<&str>,
    ) -> Result<EnhanceResponse> {
        let key = groq_key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| FlashError::credential("Missing Groq API key"))?;

        if req.content.trim().is_empty() {
            return Err(FlashError::validation("Content is required"));
        }

        let completion = Completion {
            model: ModelTier::Chat,
            system: ENHANCE_PERSONA.to_string(),
            prompt: build_prompt(&req.content, req.document_name.as_deref()),
            temperature: ENHANCE_TEMPERATURE,
            max_tokens: None,
        };
        let enhanced = self.llm.complete(key, completion).await?;
        info!("enhanced {} chars of summary", req.content.chars().count());
        Ok(EnhanceResponse { enhanced })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingLlm {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for FailingLlm {
        async fn complete(&self, _api_key: &str, _completion: Completion) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(FlashError::provider_status(503, "model overloaded"))
        }
    }

    #[test]
    fn prompt_names_the_document_when_given() {
        assert!(build_prompt("body", Some("a.md")).starts_with("Please enhance this summary for \"a.md\":\n\nbody"));
        assert!(build_prompt("body", None).starts_with("Please enhance this summary:\n\nbody"));
    }

    #[tokio::test]
    async fn blank_content_is_rejected_before_calling() {
        let llm = Arc::new(FailingLlm {
            calls: AtomicUsize::new(0),
        });
        let gw = EnhanceGateway::new(llm.clone());
        let err = gw
            .enhance(&EnhanceRequest::default(), Some("gk"))
            .await
            .unwrap_err();
        assert_eq!(err, FlashError::validation("Content is required"));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn provider_errors_are_surfaced_verbatim() {
        let llm = Arc::new(FailingLlm {
            calls: AtomicUsize::new(0),
        });
        let gw = EnhanceGateway::new(llm.clone());
        let req = EnhanceRequest {
            content: "# Title\nsome text".into(),
            document_name: None,
        };
        let err = gw.enhance(&req, Some("gk")).await.unwrap_err();
        assert_eq!(err.to_string(), "model overloaded");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);
    }
}
