//! OpenAI-backed structured extraction over reqwest.
//!
//! Talks the Files + Responses protocol: upload the chunk PDF, issue one
//! schema-constrained completion referencing the uploaded file id, then
//! delete the upload. The delete is best-effort and always attempted, so
//! a failed extraction does not strand files on the service side.
//!
//! The endpoint is `RunConfig::base_url`, so any OpenAI-compatible gateway
//! works. The credential is passed in at construction; there is no
//! process-global client state.

use crate::config::RunConfig;
use crate::error::{ChunkError, RecipeExtractError};
use crate::pipeline::extract::{Extraction, StructuredExtractor};
use crate::pipeline::window::ChunkArtifact;
use crate::prompts::{DEFAULT_EXTRACTION_PROMPT, SYSTEM_PROMPT};
use crate::recipe::{recipe_card_schema, SCHEMA_NAME};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable holding the service credential.
pub const API_KEY_VAR: &str = "OPENAI_API_KEY";

/// Production [`StructuredExtractor`] backed by the OpenAI API.
#[derive(Debug)]
pub struct OpenAiExtractor {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    prompt: Option<String>,
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct FileUploadResponse {
    id: String,
}

#[derive(Deserialize)]
struct ResponsesEnvelope {
    #[serde(default)]
    output: Vec<OutputItem>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize)]
struct OutputItem {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<Value>,
}

impl OpenAiExtractor {
    /// Build a client from an explicit credential and the run configuration.
    ///
    /// No request timeout is set unless `RunConfig::api_timeout_secs` asks
    /// for one; vision extractions on dense pages can legitimately run for
    /// minutes.
    pub fn new(
        api_key: impl Into<String>,
        config: &RunConfig,
    ) -> Result<Self, RecipeExtractError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.api_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| RecipeExtractError::Internal(format!("HTTP client: {e}")))?;

        info!(
            "Extraction service: {} at {}",
            config.model, config.base_url
        );

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            prompt: config.prompt.clone(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    /// Build a client with the credential from `OPENAI_API_KEY`.
    pub fn from_env(config: &RunConfig) -> Result<Self, RecipeExtractError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| RecipeExtractError::CredentialMissing {
                var: API_KEY_VAR.to_string(),
            })?;
        Self::new(api_key, config)
    }

    async fn upload_chunk(&self, artifact: &ChunkArtifact) -> Result<String, ChunkError> {
        let (start, end) = (artifact.start_page(), artifact.end_page());
        let upload_err = |detail: String| ChunkError::UploadFailed { start, end, detail };

        let bytes = tokio::fs::read(artifact.path())
            .await
            .map_err(|e| upload_err(format!("read chunk file: {e}")))?;
        let file_name = artifact
            .path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("chunk_{start}_{end}.pdf"));

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| upload_err(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("purpose", "assistants")
            .part("file", part);

        let response = self
            .client
            .post(format!("{}/files", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| upload_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upload_err(format!(
                "HTTP {status}: {}",
                api_error_message(&body)
            )));
        }

        let upload: FileUploadResponse = response
            .json()
            .await
            .map_err(|e| upload_err(format!("unexpected upload response: {e}")))?;
        Ok(upload.id)
    }

    async fn request_extraction(
        &self,
        file_id: &str,
        start: usize,
        end: usize,
    ) -> Result<Extraction, ChunkError> {
        let api_err = |detail: String| ChunkError::ApiError { start, end, detail };

        let body = responses_body(
            &self.model,
            self.prompt.as_deref(),
            file_id,
            self.max_output_tokens,
        );

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| api_err(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(api_err(format!(
                "HTTP {status}: {}",
                api_error_message(&text)
            )));
        }

        let envelope: ResponsesEnvelope =
            response
                .json()
                .await
                .map_err(|e| ChunkError::InvalidResponse {
                    start,
                    end,
                    detail: e.to_string(),
                })?;

        if let Some(error) = envelope.error {
            return Err(api_err(error_value_message(&error)));
        }

        let raw = collect_output_text(&envelope);
        let (input_tokens, output_tokens) = envelope
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((None, None));

        Ok(Extraction {
            raw,
            input_tokens,
            output_tokens,
        })
    }

    async fn delete_uploaded(&self, file_id: &str, start: usize, end: usize) {
        let result = self
            .client
            .delete(format!("{}/files/{file_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                debug!("Pages {}-{}: deleted uploaded file {}", start, end, file_id);
            }
            Ok(response) => {
                warn!(
                    "Pages {}-{}: delete of {} returned HTTP {}",
                    start,
                    end,
                    file_id,
                    response.status()
                );
            }
            Err(e) => {
                warn!(
                    "Pages {}-{}: delete of {} failed — {}",
                    start, end, file_id, e
                );
            }
        }
    }
}

#[async_trait]
impl StructuredExtractor for OpenAiExtractor {
    async fn extract(&self, artifact: &ChunkArtifact) -> Result<Extraction, ChunkError> {
        let (start, end) = (artifact.start_page(), artifact.end_page());

        let file_id = self.upload_chunk(artifact).await?;
        debug!("Pages {}-{}: uploaded as {}", start, end, file_id);

        let result = self.request_extraction(&file_id, start, end).await;
        self.delete_uploaded(&file_id, start, end).await;
        result
    }
}

/// Request body for the structured-completion call.
fn responses_body(
    model: &str,
    prompt: Option<&str>,
    file_id: &str,
    max_output_tokens: Option<u32>,
) -> Value {
    let prompt = prompt.unwrap_or(DEFAULT_EXTRACTION_PROMPT);
    let mut body = serde_json::json!({
        "model": model,
        "input": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "input_text", "text": prompt },
                    { "type": "input_file", "file_id": file_id },
                ],
            },
        ],
        "text": {
            "format": {
                "type": "json_schema",
                "name": SCHEMA_NAME,
                "strict": true,
                "schema": recipe_card_schema(),
            }
        },
    });
    if let Some(max) = max_output_tokens {
        body["max_output_tokens"] = serde_json::json!(max);
    }
    body
}

/// Concatenate every `output_text` part of the response, in order.
///
/// An empty result is not an error: a chunk with no recognisable recipe
/// legitimately extracts to nothing.
fn collect_output_text(envelope: &ResponsesEnvelope) -> String {
    envelope
        .output
        .iter()
        .filter(|item| item.kind == "message")
        .flat_map(|item| item.content.iter())
        .filter(|part| part.kind == "output_text")
        .map(|part| part.text.as_str())
        .collect()
}

fn error_value_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| error.to_string())
}

/// Best-effort extraction of a human-readable message from an error body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| error_value_message(&e))
        .unwrap_or_else(|| body.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn responses_body_requests_a_strict_schema() {
        let body = responses_body("gpt-4.1-mini", None, "file-abc", None);
        let format = &body["text"]["format"];
        assert_eq!(format["type"], "json_schema");
        assert_eq!(format["name"], "recipe_card");
        assert_eq!(format["strict"], true);
        assert_eq!(format["schema"]["additionalProperties"], false);
        assert_eq!(format["schema"]["required"].as_array().unwrap().len(), 9);
    }

    #[test]
    fn responses_body_references_the_uploaded_file() {
        let body = responses_body("gpt-4.1-mini", None, "file-abc", None);
        let user_content = &body["input"][1]["content"];
        assert_eq!(user_content[0]["type"], "input_text");
        assert_eq!(
            user_content[0]["text"].as_str().unwrap(),
            DEFAULT_EXTRACTION_PROMPT
        );
        assert_eq!(user_content[1]["type"], "input_file");
        assert_eq!(user_content[1]["file_id"], "file-abc");
    }

    #[test]
    fn responses_body_honours_overrides() {
        let body = responses_body("gpt-4o", Some("find desserts only"), "file-x", Some(2048));
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["input"][1]["content"][0]["text"], "find desserts only");
        assert_eq!(body["max_output_tokens"], 2048);

        let without = responses_body("gpt-4o", None, "file-x", None);
        assert!(without.get("max_output_tokens").is_none());
    }

    #[test]
    fn output_text_parts_are_concatenated_in_order() {
        let envelope: ResponsesEnvelope = serde_json::from_value(serde_json::json!({
            "output": [
                { "type": "reasoning", "content": [] },
                {
                    "type": "message",
                    "content": [
                        { "type": "output_text", "text": "{\"title\":" },
                        { "type": "output_text", "text": "\"Tarte Tatin\"}" },
                    ],
                },
            ],
            "usage": { "input_tokens": 900, "output_tokens": 120 },
        }))
        .unwrap();

        assert_eq!(collect_output_text(&envelope), "{\"title\":\"Tarte Tatin\"}");
        let usage = envelope.usage.unwrap();
        assert_eq!(usage.input_tokens, Some(900));
        assert_eq!(usage.output_tokens, Some(120));
    }

    #[test]
    fn empty_output_is_not_an_error() {
        let envelope: ResponsesEnvelope =
            serde_json::from_value(serde_json::json!({ "output": [] })).unwrap();
        assert_eq!(collect_output_text(&envelope), "");
    }

    #[test]
    fn error_bodies_reduce_to_their_message() {
        let body = r#"{"error":{"message":"No such file: file-abc","type":"invalid_request_error"}}"#;
        assert_eq!(api_error_message(body), "No such file: file-abc");

        assert_eq!(api_error_message("plain text failure"), "plain text failure");
    }

    #[test]
    fn missing_credential_is_reported_by_name() {
        let config = RunConfig::default();
        std::env::remove_var(API_KEY_VAR);
        let err = OpenAiExtractor::from_env(&config).unwrap_err();
        assert!(err.to_string().contains(API_KEY_VAR));
    }
}
