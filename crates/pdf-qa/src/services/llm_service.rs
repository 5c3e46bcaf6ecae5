use crate::config::LlmConfig;
use crate::utils::error::PipelineError;
use crate::utils::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Output contract sent as the system message of every completion call.
const OUTPUT_CONTRACT_PROMPT: &str = "You answer questions strictly from the provided context. \
Think step by step before answering. Respond with a single JSON object and nothing else, \
with exactly two string fields: \"rationale\" (your step-by-step reasoning) and \
\"answer\" (the final answer).";

/// One question (or instruction) against one piece of context.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub instruction: String,
    pub context: String,
    /// Free-text length guidance for the answer; not enforced.
    pub answer_length_hint: Option<String>,
}

/// Parsed `{rationale, answer}` pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub rationale: String,
    pub answer: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, PipelineError>;
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_tokens: usize,
    temperature: f32,
    stream: bool,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawCompletion {
    rationale: Option<String>,
    reasoning: Option<String>,
    answer: Option<String>,
}

/// Client for an OpenAI-compatible `/v1/chat/completions` endpoint.
#[derive(Clone)]
pub struct LlmService {
    client: Client,
    config: LlmConfig,
    retry: RetryPolicy,
}

impl LlmService {
    pub fn new(config: LlmConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let retry = RetryPolicy::new(config.max_retries, config.retry_base_delay_ms);

        Ok(Self {
            client,
            config,
            retry,
        })
    }

    fn build_messages(request: &CompletionRequest) -> Vec<ChatMessage> {
        let mut user = format!(
            "Question: {}\n\nContext:\n{}",
            request.instruction, request.context
        );
        if let Some(hint) = &request.answer_length_hint {
            user.push_str(&format!("\n\nAnswer length: {}", hint));
        }

        vec![
            ChatMessage {
                role: "system".to_string(),
                content: OUTPUT_CONTRACT_PROMPT.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user,
            },
        ]
    }

    /// Single HTTP round trip, returning the raw message content
    async fn generate_chat(&self, messages: Vec<ChatMessage>) -> Result<String, PipelineError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            stream: false,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let mut builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.config.base_url.trim_end_matches('/')))
            .json(&request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Service { status, body });
        }

        let chat_response: ChatCompletionResponse = response.json().await.map_err(|e| {
            PipelineError::AnswerGeneration(format!("Failed to parse LLM response: {}", e))
        })?;

        chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PipelineError::AnswerGeneration("No choices returned from LLM".to_string()))
    }
}

#[async_trait]
impl CompletionProvider for LlmService {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, PipelineError> {
        debug!(
            "Requesting completion: {} chars of context",
            request.context.chars().count()
        );

        let messages = Self::build_messages(&request);
        let content = self
            .retry
            .execute("chat completion", || self.generate_chat(messages.clone()))
            .await
            .map_err(|e| match e {
                PipelineError::AnswerGeneration(_) => e,
                other => PipelineError::AnswerGeneration(format!("LLM call failed: {}", other)),
            })?;

        parse_completion(&content)
    }
}

/// Parse model output into a completion.
///
/// Accepts the first JSON object in the text, or a `Reasoning:` / `Answer:`
/// labelled reply. Both fields must be present and the answer non-blank.
pub fn parse_completion(content: &str) -> Result<Completion, PipelineError> {
    if let Some(json) = extract_first_json_object(content) {
        if let Ok(raw) = serde_json::from_str::<RawCompletion>(json) {
            return finish(raw.rationale.or(raw.reasoning), raw.answer, content);
        }
    }

    let (rationale, answer) = parse_labelled(content);
    finish(rationale, answer, content)
}

fn finish(
    rationale: Option<String>,
    answer: Option<String>,
    content: &str,
) -> Result<Completion, PipelineError> {
    let answer = answer
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .ok_or_else(|| {
            PipelineError::AnswerGeneration(format!(
                "Missing 'answer' field in model output: {}",
                preview(content)
            ))
        })?;
    let rationale = rationale.map(|r| r.trim().to_string()).ok_or_else(|| {
        PipelineError::AnswerGeneration(format!(
            "Missing 'rationale' field in model output: {}",
            preview(content)
        ))
    })?;

    Ok(Completion { rationale, answer })
}

/// `Reasoning: ...` followed by `Answer: ...`, each possibly multi-line.
fn parse_labelled(content: &str) -> (Option<String>, Option<String>) {
    // ASCII lowering keeps byte offsets valid for slicing `content`
    let lower = content.to_ascii_lowercase();
    let answer_at = lower.find("answer:");
    let reasoning_at = lower.find("reasoning:").or_else(|| lower.find("rationale:"));

    let answer = answer_at.map(|i| content[i + "answer:".len()..].to_string());
    let rationale = match (reasoning_at, answer_at) {
        (Some(r), Some(a)) if r < a => {
            // "reasoning:" and "rationale:" have the same length
            Some(content[r + "reasoning:".len()..a].to_string())
        }
        (Some(r), None) => Some(content[r + "reasoning:".len()..].to_string()),
        _ => None,
    };

    (rationale, answer)
}

fn preview(content: &str) -> String {
    content.chars().take(200).collect()
}

/// Extract first JSON object substring from a possibly noisy LLM output.
/// Handles nested braces and braces inside JSON strings (with escapes).
fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start: Option<usize> = None;
    let mut depth: i32 = 0;

    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if start.is_none() {
            if ch == '{' {
                start = Some(i);
                depth = 1;
                in_string = false;
                escaped = false;
            }
            continue;
        }

        if in_string {
            if escaped {
                escaped = false;
                continue;
            }
            match ch {
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    let st = start?;
                    return Some(&s[st..=i]);
                }
            }
            _ => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: String) -> LlmConfig {
        LlmConfig {
            base_url,
            api_key: Some("test-key".to_string()),
            max_retries: 1,
            retry_base_delay_ms: 1,
            ..LlmConfig::default()
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            instruction: "How does the NGO address climate?".to_string(),
            context: "Climate-resilience projects in Kenya.".to_string(),
            answer_length_hint: None,
        }
    }

    fn chat_reply(content: &str) -> serde_json::Value {
        json!({ "choices": [ { "message": { "role": "assistant", "content": content } } ] })
    }

    #[test]
    fn parses_plain_json_object() {
        let c = parse_completion(r#"{"rationale": "Kenya is named", "answer": "Kenya projects"}"#).unwrap();
        assert_eq!(c.rationale, "Kenya is named");
        assert_eq!(c.answer, "Kenya projects");
    }

    #[test]
    fn parses_json_wrapped_in_prose_and_fences() {
        let content = "Sure!\n```json\n{\"rationale\": \"uses {braces}\", \"answer\": \"ok\"}\n```";
        let c = parse_completion(content).unwrap();
        assert_eq!(c.rationale, "uses {braces}");
        assert_eq!(c.answer, "ok");
    }

    #[test]
    fn parses_labelled_reply() {
        let c = parse_completion("Reasoning: the page lists projects.\nAnswer: Kenya resilience work").unwrap();
        assert_eq!(c.rationale, "the page lists projects.");
        assert_eq!(c.answer, "Kenya resilience work");
    }

    #[test]
    fn missing_answer_is_an_error() {
        let err = parse_completion(r#"{"rationale": "nothing here"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::AnswerGeneration(_)));

        let err = parse_completion(r#"{"rationale": "r", "answer": "   "}"#).unwrap_err();
        assert!(matches!(err, PipelineError::AnswerGeneration(_)));
    }

    #[test]
    fn missing_rationale_is_an_error() {
        let err = parse_completion(r#"{"answer": "only the answer"}"#).unwrap_err();
        assert!(matches!(err, PipelineError::AnswerGeneration(_)));
    }

    #[test]
    fn length_hint_is_added_to_the_prompt() {
        let mut req = request();
        req.answer_length_hint = Some("about 500 words".to_string());

        let messages = LlmService::build_messages(&req);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.contains("Question: How does the NGO address climate?"));
        assert!(messages[1].content.ends_with("Answer length: about 500 words"));
    }

    #[tokio::test]
    async fn completes_against_chat_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({ "model": "gpt-4o-mini", "stream": false })))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_reply(
                r#"{"rationale": "context names Kenya", "answer": "Kenya climate-resilience project"}"#,
            )))
            .expect(1)
            .mount(&server)
            .await;

        let service = LlmService::new(config(server.uri())).unwrap();
        let completion = service.complete(request()).await.unwrap();

        assert_eq!(completion.answer, "Kenya climate-resilience project");
        assert_eq!(completion.rationale, "context names Kenya");
    }

    #[tokio::test]
    async fn retries_rate_limited_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(chat_reply(r#"{"rationale": "r", "answer": "a"}"#)),
            )
            .mount(&server)
            .await;

        let service = LlmService::new(config(server.uri())).unwrap();
        let completion = service.complete(request()).await.unwrap();
        assert_eq!(completion.answer, "a");
    }

    #[tokio::test]
    async fn auth_failure_surfaces_as_answer_generation_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .expect(1)
            .mount(&server)
            .await;

        let service = LlmService::new(config(server.uri())).unwrap();
        let err = service.complete(request()).await.unwrap_err();

        match err {
            PipelineError::AnswerGeneration(msg) => assert!(msg.contains("401")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let service = LlmService::new(config(server.uri())).unwrap();
        assert!(matches!(
            service.complete(request()).await,
            Err(PipelineError::AnswerGeneration(_))
        ));
    }
}
