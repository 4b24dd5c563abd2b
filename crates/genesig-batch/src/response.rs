//! Batch response records.
//!
//! One record per completed request, keyed by the same `custom_id`. The
//! model occasionally emits content that is not valid JSON despite the
//! forced response format; that is recovered locally as a tagged
//! `Prediction::Malformed` value carrying the raw content — scoring counts
//! it as incorrect and database insertion skips it. A record whose outer
//! envelope fails to parse is a hard error: the batch file itself is broken.

use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::BatchError;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChoiceMessage {
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// The chat completion body as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionBody {
    pub choices: Vec<Choice>,
    pub usage: Usage,
    pub model: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EnvelopeResponse {
    body: CompletionBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    custom_id: String,
    response: EnvelopeResponse,
}

/// Outcome of parsing the model's structured output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prediction {
    Genes(Vec<String>),
    Malformed { error: String },
}

impl Prediction {
    pub fn genes(&self) -> Option<&[String]> {
        match self {
            Prediction::Genes(genes) => Some(genes),
            Prediction::Malformed { .. } => None,
        }
    }
}

/// Expected shape of the model's content field.
#[derive(Debug, Deserialize)]
struct GenePayload {
    genes: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct BatchResponse {
    pub custom_id: String,
    /// Model actually used, as billed.
    pub model: String,
    pub usage: Usage,
    pub raw_content: String,
    pub prediction: Prediction,
}

impl BatchResponse {
    pub fn decode(line: &str) -> Result<Self, BatchError> {
        let envelope: Envelope = serde_json::from_str(line)?;
        let body = envelope.response.body;
        let raw_content = body
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .unwrap_or_default();

        let prediction = match serde_json::from_str::<GenePayload>(&raw_content) {
            Ok(payload) => Prediction::Genes(payload.genes),
            Err(error) => {
                tracing::warn!(
                    custom_id = %envelope.custom_id,
                    %error,
                    "model content is not valid JSON, counting as no prediction"
                );
                Prediction::Malformed { error: error.to_string() }
            }
        };

        Ok(Self {
            custom_id: envelope.custom_id,
            model: body.model,
            usage: body.usage,
            raw_content,
            prediction,
        })
    }

    /// Re-wrap a synchronously executed completion in the batch envelope,
    /// serialized as one JSONL line.
    pub fn encode_envelope(custom_id: &str, body: &CompletionBody) -> Result<String, BatchError> {
        let envelope = Envelope {
            custom_id: custom_id.to_string(),
            response: EnvelopeResponse { body: body.clone() },
        };
        Ok(serde_json::to_string(&envelope)?)
    }
}

pub fn read_batch_output(path: &Path) -> Result<Vec<BatchResponse>, BatchError> {
    let reader = BufReader::new(std::fs::File::open(path)?);
    let mut responses = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        responses.push(BatchResponse::decode(&line)?);
    }
    Ok(responses)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(custom_id: &str, content: &str) -> String {
        serde_json::json!({
            "custom_id": custom_id,
            "response": {
                "body": {
                    "choices": [{"message": {"content": content}}],
                    "usage": {"prompt_tokens": 120, "completion_tokens": 15},
                    "model": "gpt-4.1-nano-2025-04-14"
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_decode_well_formed_prediction() {
        let line = record("PMC1", r#"{"genes": ["TP53", "BRCA1"]}"#);
        let response = BatchResponse::decode(&line).unwrap();
        assert_eq!(response.custom_id, "PMC1");
        assert_eq!(response.model, "gpt-4.1-nano-2025-04-14");
        assert_eq!(response.usage.prompt_tokens, 120);
        assert_eq!(
            response.prediction,
            Prediction::Genes(vec!["TP53".to_string(), "BRCA1".to_string()])
        );
    }

    #[test]
    fn test_malformed_content_is_tagged_not_fatal() {
        let line = record("PMC2", "the genes are TP53 and BRCA1");
        let response = BatchResponse::decode(&line).unwrap();
        assert!(matches!(response.prediction, Prediction::Malformed { .. }));
        assert_eq!(response.raw_content, "the genes are TP53 and BRCA1");
        assert!(response.prediction.genes().is_none());
    }

    #[test]
    fn test_missing_choices_is_no_prediction() {
        let line = serde_json::json!({
            "custom_id": "PMC3",
            "response": {
                "body": {
                    "choices": [],
                    "usage": {"prompt_tokens": 0, "completion_tokens": 0},
                    "model": "gpt-4.1-nano"
                }
            }
        })
        .to_string();
        let response = BatchResponse::decode(&line).unwrap();
        assert!(matches!(response.prediction, Prediction::Malformed { .. }));
    }

    #[test]
    fn test_broken_envelope_is_an_error() {
        assert!(BatchResponse::decode("not json at all").is_err());
    }

    #[test]
    fn test_envelope_roundtrip() {
        let body = CompletionBody {
            choices: vec![Choice {
                message: ChoiceMessage { content: r#"{"genes": []}"#.to_string() },
            }],
            usage: Usage { prompt_tokens: 10, completion_tokens: 2 },
            model: "gpt-4.1-nano".to_string(),
        };
        let line = BatchResponse::encode_envelope("PMC4", &body).unwrap();
        let decoded = BatchResponse::decode(&line).unwrap();
        assert_eq!(decoded.custom_id, "PMC4");
        assert_eq!(decoded.prediction, Prediction::Genes(vec![]));
    }
}
