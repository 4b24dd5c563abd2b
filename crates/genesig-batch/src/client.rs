//! OpenAI API client for batch execution.
//!
//! Two execution paths:
//!   - `submit_batch` uploads the input file and creates a batch job with a
//!     24h completion window. Fire-and-forget: the batch lifecycle is not
//!     polled here, the output file is retrieved out of band.
//!   - `execute_synchronous` runs every request as an individual chat
//!     completion, strictly in input order, fully blocking between
//!     requests, and writes output records in the batch envelope format so
//!     every downstream step works off the same file shape.

use std::io::{BufWriter, Write};
use std::path::Path;

use genesig_common::config::LlmConfig;

use crate::request::{read_batch_input, RequestBody, COMPLETIONS_URL};
use crate::response::{BatchResponse, CompletionBody};
use crate::BatchError;

#[derive(Debug)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_base: String,
    api_key: String,
    completion_window: String,
}

impl OpenAiClient {
    /// Build from config; the API key comes from the configured env var.
    pub fn from_config(llm: &LlmConfig) -> Result<Self, BatchError> {
        let api_key = std::env::var(&llm.api_key_env)
            .map_err(|_| BatchError::MissingApiKey(llm.api_key_env.clone()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_base: llm.api_base.trim_end_matches('/').to_string(),
            api_key,
            completion_window: llm.completion_window.clone(),
        })
    }

    /// Upload a batch input file; returns the file id.
    pub async fn upload_batch_file(&self, path: &Path) -> Result<String, BatchError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "batch.jsonl".to_string());
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new()
            .text("purpose", "batch")
            .part("file", part);

        let resp = self
            .http
            .post(format!("{}/files", self.api_base))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        id_field(&json)
    }

    /// Create a batch job from an uploaded file; returns the batch id.
    pub async fn create_batch(&self, input_file_id: &str) -> Result<String, BatchError> {
        let body = serde_json::json!({
            "input_file_id": input_file_id,
            "endpoint": COMPLETIONS_URL,
            "completion_window": self.completion_window,
        });
        let resp = self
            .http
            .post(format!("{}/batches", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        id_field(&json)
    }

    /// Upload the input file and create the batch job.
    pub async fn submit_batch(&self, input_path: &Path) -> Result<String, BatchError> {
        let file_id = self.upload_batch_file(input_path).await?;
        let batch_id = self.create_batch(&file_id).await?;
        tracing::info!(%batch_id, %file_id, "batch submitted");
        Ok(batch_id)
    }

    /// Execute one chat completion.
    pub async fn chat_completion(&self, body: &RequestBody) -> Result<CompletionBody, BatchError> {
        let resp = self
            .http
            .post(format!("{}{}", self.api_base, "/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;
        Ok(serde_json::from_value(json)?)
    }

    /// Execute all requests in a batch input file one at a time, in order,
    /// writing the output file in the batch envelope format. Returns the
    /// number of completed requests.
    pub async fn execute_synchronous(
        &self,
        input_path: &Path,
        output_path: &Path,
    ) -> Result<usize, BatchError> {
        let requests = read_batch_input(input_path)?;
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut writer = BufWriter::new(std::fs::File::create(output_path)?);

        let mut completed = 0usize;
        for request in &requests {
            let body = self.chat_completion(&request.body).await?;
            let line = BatchResponse::encode_envelope(&request.custom_id, &body)?;
            writer.write_all(line.as_bytes())?;
            writer.write_all(b"\n")?;
            completed += 1;
            tracing::debug!(custom_id = %request.custom_id, completed, "completion written");
        }
        writer.flush()?;
        tracing::info!(completed, path = %output_path.display(), "synchronous execution complete");
        Ok(completed)
    }
}

/// The id of a created file or batch. An accepted response without one is
/// malformed; an empty id must never reach the operator.
fn id_field(json: &serde_json::Value) -> Result<String, BatchError> {
    json["id"]
        .as_str()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(BatchError::MalformedResponse("id"))
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, BatchError> {
    let status = resp.status().as_u16();
    let body: serde_json::Value = resp.json().await?;
    if status >= 400 {
        let message = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .unwrap_or("unknown API error")
            .to_string();
        return Err(BatchError::Api { status, message });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_id_in_accepted_response_is_an_error() {
        let json = serde_json::json!({"id": "file-abc123"});
        assert_eq!(id_field(&json).unwrap(), "file-abc123");

        for json in [
            serde_json::json!({"object": "batch"}),
            serde_json::json!({"id": ""}),
            serde_json::json!({"id": 42}),
        ] {
            match id_field(&json) {
                Err(BatchError::MalformedResponse(field)) => assert_eq!(field, "id"),
                other => panic!("expected MalformedResponse, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_missing_api_key_is_reported_with_var_name() {
        let llm = LlmConfig {
            api_key_env: "GENESIG_TEST_KEY_THAT_IS_UNSET".to_string(),
            ..LlmConfig::default()
        };
        match OpenAiClient::from_config(&llm) {
            Err(BatchError::MissingApiKey(var)) => {
                assert_eq!(var, "GENESIG_TEST_KEY_THAT_IS_UNSET");
            }
            other => panic!("expected MissingApiKey, got {other:?}"),
        }
    }
}
