//! Batch request records.
//!
//! One request per article, written as one line of a JSONL batch input
//! file. Requests fix the endpoint, a temperature of 0 for reproducible
//! decoding, and a forced JSON-object response format; once written, a
//! batch file is never mutated — downstream steps re-read it as-is.

use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use genesig_common::config::LlmConfig;

use crate::BatchError;

/// Chat completions endpoint path, as referenced inside batch records.
pub const COMPLETIONS_URL: &str = "/v1/chat/completions";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseFormat {
    #[serde(rename = "type")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBody {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub max_completion_tokens: u32,
    pub response_format: ResponseFormat,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub custom_id: String,
    pub method: String,
    pub url: String,
    pub body: RequestBody,
}

impl BatchRequest {
    /// Build a request for one article: the prompt as the developer message,
    /// the article's relevant lines as the user message.
    pub fn new(pmcid: impl Into<String>, prompt: &str, content: &str, llm: &LlmConfig) -> Self {
        Self {
            custom_id: pmcid.into(),
            method: "POST".to_string(),
            url: COMPLETIONS_URL.to_string(),
            body: RequestBody {
                model: llm.model.clone(),
                messages: vec![
                    ChatMessage { role: "developer".to_string(), content: prompt.to_string() },
                    ChatMessage { role: "user".to_string(), content: content.to_string() },
                ],
                max_completion_tokens: llm.max_completion_tokens,
                response_format: ResponseFormat { format: "json_object".to_string() },
                temperature: 0.0,
            },
        }
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn encode(&self) -> Result<String, BatchError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(line: &str) -> Result<Self, BatchError> {
        Ok(serde_json::from_str(line)?)
    }
}

/// Write a batch input file, one request per line, in the given order.
pub fn write_batch_input(path: &Path, requests: &[BatchRequest]) -> Result<(), BatchError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(std::fs::File::create(path)?);
    for request in requests {
        writer.write_all(request.encode()?.as_bytes())?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    tracing::info!(n_requests = requests.len(), path = %path.display(), "wrote batch input");
    Ok(())
}

pub fn read_batch_input(path: &Path) -> Result<Vec<BatchRequest>, BatchError> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut requests = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        requests.push(BatchRequest::decode(&line)?);
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn llm() -> LlmConfig {
        LlmConfig::default()
    }

    #[test]
    fn test_request_fixes_endpoint_and_decoding_controls() {
        let request = BatchRequest::new("PMC123", "find genes", "TP53 BRCA1", &llm());
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "/v1/chat/completions");
        assert_eq!(request.body.temperature, 0.0);
        assert_eq!(request.body.response_format.format, "json_object");
        assert_eq!(request.body.messages[0].role, "developer");
        assert_eq!(request.body.messages[1].content, "TP53 BRCA1");
    }

    #[test]
    fn test_encode_is_single_line() {
        let request = BatchRequest::new("PMC123", "prompt\nwith newline", "body", &llm());
        let line = request.encode().unwrap();
        assert!(!line.contains('\n'));
        let decoded = BatchRequest::decode(&line).unwrap();
        assert_eq!(decoded.custom_id, "PMC123");
        assert_eq!(decoded.body.messages[0].content, "prompt\nwith newline");
    }

    #[test]
    fn test_write_then_read_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input_test_01.jsonl");
        let requests: Vec<BatchRequest> = ["PMC1", "PMC2", "PMC3"]
            .iter()
            .map(|pmcid| BatchRequest::new(*pmcid, "prompt", "content", &llm()))
            .collect();

        write_batch_input(&path, &requests).unwrap();
        let read_back = read_batch_input(&path).unwrap();
        let ids: Vec<&str> = read_back.iter().map(|r| r.custom_id.as_str()).collect();
        assert_eq!(ids, ["PMC1", "PMC2", "PMC3"]);
    }
}
