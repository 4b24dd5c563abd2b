//! Token and cost accounting.
//!
//! Rates are USD per one million tokens under batch pricing and must be
//! extended whenever a new model is used for requests; an unknown model is
//! a hard error rather than a silent zero. Pre-flight estimates tokenize
//! the request text locally (falling back to the cl100k_base encoding when
//! the model is unmapped) and are approximate; authoritative costs come
//! only from the usage counters returned with each response.

use tiktoken_rs::{cl100k_base, get_bpe_from_model};

use genesig_batch::request::BatchRequest;
use genesig_batch::response::BatchResponse;

use crate::MetricsError;

const BATCH_INPUT_PER_MTOK: &[(&str, f64)] = &[
    ("gpt-4.1-nano", 0.05),
    ("gpt-4.1-nano-2025-04-14", 0.05),
];

const BATCH_OUTPUT_PER_MTOK: &[(&str, f64)] = &[
    ("gpt-4.1-nano", 0.2),
    ("gpt-4.1-nano-2025-04-14", 0.2),
];

fn rate(table: &[(&str, f64)], model: &str) -> Result<f64, MetricsError> {
    table
        .iter()
        .find(|(name, _)| *name == model)
        .map(|(_, rate)| *rate)
        .ok_or_else(|| MetricsError::UnknownModel(model.to_string()))
}

/// Cost of `tokens` input tokens under batch pricing.
pub fn batch_input_cost(tokens: u64, model: &str) -> Result<f64, MetricsError> {
    Ok(tokens as f64 * rate(BATCH_INPUT_PER_MTOK, model)? / 1e6)
}

/// Cost of `tokens` output tokens under batch pricing.
pub fn batch_output_cost(tokens: u64, model: &str) -> Result<f64, MetricsError> {
    Ok(tokens as f64 * rate(BATCH_OUTPUT_PER_MTOK, model)? / 1e6)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostTotal {
    pub input: f64,
    pub output: f64,
}

/// Authoritative batch cost, folded over the usage counters and billed
/// model of every response.
pub fn actual_costs(responses: &[BatchResponse]) -> Result<CostTotal, MetricsError> {
    let mut total = CostTotal::default();
    for response in responses {
        total.input += batch_input_cost(response.usage.prompt_tokens, &response.model)?;
        total.output += batch_output_cost(response.usage.completion_tokens, &response.model)?;
    }
    Ok(total)
}

/// Pre-flight estimate for a batch input file.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostEstimate {
    /// Estimated input tokens across all requests.
    pub tokens: usize,
    /// Estimated input cost.
    pub input: f64,
    /// Worst-case output cost, every request exhausting its token budget.
    pub max_output: f64,
}

/// Count the input tokens of one request, per the OpenAI message-counting
/// procedure: 3 tokens of reply priming, 3 per message, plus the encoded
/// length of every message field.
pub fn count_request_tokens(request: &BatchRequest) -> Result<usize, MetricsError> {
    let bpe = match get_bpe_from_model(&request.body.model) {
        Ok(bpe) => bpe,
        Err(error) => {
            tracing::warn!(model = %request.body.model, %error,
                "model unknown to tokenizer, falling back to cl100k_base");
            cl100k_base()?
        }
    };

    let mut tokens = 3usize;
    for message in &request.body.messages {
        tokens += 3;
        tokens += bpe.encode_with_special_tokens(&message.role).len();
        tokens += bpe.encode_with_special_tokens(&message.content).len();
    }
    Ok(tokens)
}

/// Estimate tokens and costs for an assembled batch before execution.
pub fn estimate_costs(requests: &[BatchRequest]) -> Result<CostEstimate, MetricsError> {
    let mut estimate = CostEstimate::default();
    for request in requests {
        let tokens = count_request_tokens(request)?;
        estimate.tokens += tokens;
        estimate.input += batch_input_cost(tokens as u64, &request.body.model)?;
        estimate.max_output +=
            batch_output_cost(request.body.max_completion_tokens as u64, &request.body.model)?;
    }
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use genesig_batch::response::{Prediction, Usage};
    use genesig_common::config::LlmConfig;

    #[test]
    fn test_cost_is_linear_in_tokens() {
        for tokens in [1u64, 100, 12_345] {
            let single = batch_input_cost(tokens, "gpt-4.1-nano").unwrap();
            let double = batch_input_cost(2 * tokens, "gpt-4.1-nano").unwrap();
            assert!((double - 2.0 * single).abs() < 1e-12);
        }
    }

    #[test]
    fn test_known_rates() {
        assert!((batch_input_cost(1_000_000, "gpt-4.1-nano").unwrap() - 0.05).abs() < 1e-12);
        assert!((batch_output_cost(1_000_000, "gpt-4.1-nano-2025-04-14").unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_model_is_fatal() {
        match batch_input_cost(10, "gpt-unpriced") {
            Err(MetricsError::UnknownModel(model)) => assert_eq!(model, "gpt-unpriced"),
            other => panic!("expected UnknownModel, got {other:?}"),
        }
    }

    #[test]
    fn test_actual_costs_fold_usage() {
        let response = |prompt, completion| BatchResponse {
            custom_id: "PMC1".to_string(),
            model: "gpt-4.1-nano".to_string(),
            usage: Usage { prompt_tokens: prompt, completion_tokens: completion },
            raw_content: String::new(),
            prediction: Prediction::Genes(vec![]),
        };
        let total = actual_costs(&[response(1_000_000, 0), response(0, 1_000_000)]).unwrap();
        assert!((total.input - 0.05).abs() < 1e-12);
        assert!((total.output - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_counts_message_overhead() {
        let request = BatchRequest::new("PMC1", "find genes", "TP53 BRCA1", &LlmConfig::default());
        let tokens = count_request_tokens(&request).unwrap();
        // 3 priming + 2 * (3 + role + content): strictly more than the overhead alone
        assert!(tokens > 9);

        let estimate = estimate_costs(std::slice::from_ref(&request)).unwrap();
        assert_eq!(estimate.tokens, tokens);
        let budget = request.body.max_completion_tokens as u64;
        let expected_max = batch_output_cost(budget, "gpt-4.1-nano").unwrap();
        assert!((estimate.max_output - expected_max).abs() < 1e-12);
    }

    #[test]
    fn test_estimate_of_empty_batch_is_zero() {
        assert_eq!(estimate_costs(&[]).unwrap(), CostEstimate::default());
    }
}
