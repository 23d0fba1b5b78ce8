//! segscore: customer segment scoring over precomputed marketing clusters
//!
//! Derives cluster centroids and response rates from clustering output and
//! campaign data, then scores individual customers by nearest centroid.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod model;
pub mod report;

// Re-export public items for easier access
pub use cli::Args;
pub use config::{AppConfig, ScoringParams};
pub use data::{load_reference_data, ReferenceData};
pub use error::{ProfileField, ScoreError};
pub use model::{
    score, score_input, ClusterCentroid, ClusterResponseStat, CustomerProfile, Normalization,
    ProfileInput, ReferenceTables, ScoreResult, Scoring, Strategy,
};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
