use std::fmt;

use serde::Serialize;

/// Fatal errors from configuration and record loading.
#[derive(Debug)]
pub enum CostError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (empty file name, bad tolerance, etc.).
    ConfigValidation(String),
    /// Missing required column in input data.
    MissingColumn { document: String, column: String },
    /// A required cell is empty.
    MissingValue { document: String, line: usize, column: String },
    /// Number parse error.
    NumberParse { document: String, line: usize, column: String, value: String },
    /// Malformed CSV.
    Csv(String),
}

impl fmt::Display for CostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { document, column } => {
                write!(f, "{document}: missing column '{column}'")
            }
            Self::MissingValue { document, line, column } => {
                write!(f, "{document}, line {line}: empty value in column '{column}'")
            }
            Self::NumberParse { document, line, column, value } => {
                write!(f, "{document}, line {line}: cannot parse {column} '{value}'")
            }
            Self::Csv(msg) => write!(f, "CSV error: {msg}"),
        }
    }
}

impl std::error::Error for CostError {}

impl From<csv::Error> for CostError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err.to_string())
    }
}

/// Why a single requisition line could not be allocated. Never fatal to the batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineError {
    NonPositiveProductQuantity { value: f64 },
    NegativeMaterialQuantity { value: f64 },
    NonFiniteQuantity { field: &'static str },
    /// The consumption totals handed to the allocator do not cover this material.
    MissingConsumptionTotal { material_code: String },
    /// The consumption total is smaller than this line's own quantity.
    ConsumptionBelowLine { material_code: String, total: f64, line_quantity: f64 },
}

impl fmt::Display for LineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveProductQuantity { value } => {
                write!(f, "product quantity must be positive, got {value}")
            }
            Self::NegativeMaterialQuantity { value } => {
                write!(f, "material quantity must not be negative, got {value}")
            }
            Self::NonFiniteQuantity { field } => write!(f, "{field} is not a finite number"),
            Self::MissingConsumptionTotal { material_code } => {
                write!(f, "no consumption total for material '{material_code}'")
            }
            Self::ConsumptionBelowLine { material_code, total, line_quantity } => write!(
                f,
                "consumption total {total} for material '{material_code}' is below line quantity {line_quantity}"
            ),
        }
    }
}

impl std::error::Error for LineError {}
