//! genesig-batch — Line-delimited JSON batch records for the chat
//! completions API, and the client that submits them (whole-batch
//! asynchronous, or one blocking request at a time).

pub mod client;
pub mod request;
pub mod response;

use thiserror::Error;

pub use client::OpenAiClient;
pub use request::{read_batch_input, write_batch_input, BatchRequest, ChatMessage, RequestBody};
pub use response::{read_batch_output, BatchResponse, Prediction, Usage};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("API error [{status}]: {message}")]
    Api { status: u16, message: String },

    #[error("API response is missing field `{0}`")]
    MalformedResponse(&'static str),

    #[error("no API key in environment variable {0}")]
    MissingApiKey(String),
}
