//! Token usage accounting.

use serde::{Deserialize, Serialize};

/// Token usage statistics for a single completion.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, derive_getters::Getters,
)]
pub struct TokenUsage {
    /// Tokens in the prompt/input.
    input_tokens: u64,
    /// Tokens in the response/output.
    output_tokens: u64,
}

impl TokenUsage {
    /// Create a new token usage record.
    pub const fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Total tokens (input + output).
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }

    /// Rough token estimate for providers that do not report usage.
    ///
    /// Uses the common four-characters-per-token approximation, never zero
    /// for non-empty text.
    pub fn estimate(text: &str) -> u64 {
        if text.is_empty() {
            0
        } else {
            (text.chars().count() / 4).max(1) as u64
        }
    }

    /// Calculate cost in USD based on pricing per million tokens.
    pub fn calculate_cost(&self, input_price_per_million: f64, output_price_per_million: f64) -> f64 {
        let input_cost = (self.input_tokens as f64 / 1_000_000.0) * input_price_per_million;
        let output_cost = (self.output_tokens as f64 / 1_000_000.0) * output_price_per_million;
        input_cost + output_cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage::new(100, 50);
        assert_eq!(*usage.input_tokens(), 100);
        assert_eq!(*usage.output_tokens(), 50);
        assert_eq!(usage.total(), 150);
    }

    #[test]
    fn test_token_usage_calculate_cost() {
        let usage = TokenUsage::new(1_000_000, 500_000);
        let cost = usage.calculate_cost(1.0, 2.0);
        assert!((cost - 2.0).abs() < 0.001);
    }

    #[test]
    fn test_estimate() {
        assert_eq!(TokenUsage::estimate(""), 0);
        assert_eq!(TokenUsage::estimate("abc"), 1);
        assert_eq!(TokenUsage::estimate("abcdefgh"), 2);
    }
}
