//! Error types for customer scoring

use thiserror::Error;

/// Profile field names, used to report which input was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileField {
    Age,
    Income,
    Spending,
    Recency,
}

impl std::fmt::Display for ProfileField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProfileField::Age => "age",
            ProfileField::Income => "income",
            ProfileField::Spending => "spending",
            ProfileField::Recency => "recency",
        };
        f.write_str(name)
    }
}

/// Scoring error kinds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScoreError {
    /// A profile field was absent or not a number
    #[error("Insufficient input: {0} is missing")]
    MissingInput(ProfileField),

    /// Reference data was empty or never loaded
    #[error("Reference data not loaded: {0}")]
    EmptyConfigurationData(&'static str),
}
