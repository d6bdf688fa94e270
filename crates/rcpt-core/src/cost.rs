//! Flat-rate cost estimate for processed files.
//!
//! Every file counts as one image-equivalent unit priced from fixed token
//! assumptions. The token counts recorded in the usage summary do not enter
//! the calculation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::usage::UsageSummary;

/// Prompt tokens assumed for every request.
pub const ASSUMED_PROMPT_TOKENS: u64 = 1_000;

/// Tokens billed per image-equivalent unit.
pub const IMAGE_TOKENS_PER_UNIT: u64 = 258;

/// Response tokens assumed for every request.
pub const ASSUMED_OUTPUT_TOKENS: u64 = 500;

/// US cents per million input tokens (text and image).
pub const INPUT_CENTS_PER_MILLION: i64 = 10;

/// US cents per million output tokens.
pub const OUTPUT_CENTS_PER_MILLION: i64 = 40;

const TOKENS_PER_PRICE_UNIT: u64 = 1_000_000;

/// Estimated cost of a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCost {
    pub filename: String,
    pub input_text_cost: Decimal,
    pub image_cost: Decimal,
    pub output_cost: Decimal,
    pub total_cost: Decimal,
}

/// Estimated cost of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostSummary {
    pub file_count: u64,
    pub total_cost: Decimal,
    pub average_cost_per_file: Decimal,
    pub files: Vec<FileCost>,
}

/// USD cost of `tokens` at `cents_per_million`.
fn tokens_cost(tokens: u64, cents_per_million: i64) -> Decimal {
    Decimal::from(tokens) * Decimal::new(cents_per_million, 2) / Decimal::from(TOKENS_PER_PRICE_UNIT)
}

/// Input text, image and output cost of one file under the flat model.
pub fn cost_per_file() -> (Decimal, Decimal, Decimal) {
    (
        tokens_cost(ASSUMED_PROMPT_TOKENS, INPUT_CENTS_PER_MILLION),
        tokens_cost(IMAGE_TOKENS_PER_UNIT, INPUT_CENTS_PER_MILLION),
        tokens_cost(ASSUMED_OUTPUT_TOKENS, OUTPUT_CENTS_PER_MILLION),
    )
}

/// Estimate the cost of every file in `usage` and the batch total.
pub fn estimate_cost(usage: &UsageSummary) -> CostSummary {
    let (input_text_cost, image_cost, output_cost) = cost_per_file();
    let per_file = input_text_cost + image_cost + output_cost;

    let files: Vec<FileCost> = usage
        .files
        .iter()
        .map(|file| FileCost {
            filename: file.filename.clone(),
            input_text_cost,
            image_cost,
            output_cost,
            total_cost: per_file,
        })
        .collect();

    let total_cost: Decimal = files.iter().map(|f| f.total_cost).sum();
    let file_count = files.len() as u64;
    let average_cost_per_file = if file_count == 0 {
        Decimal::ZERO
    } else {
        total_cost / Decimal::from(file_count)
    };

    CostSummary {
        file_count,
        total_cost,
        average_cost_per_file,
        files,
    }
}
