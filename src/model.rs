//! Nearest-centroid customer scoring
//!
//! Assigns a customer profile to the closest cluster centroid, derives a
//! response probability from that cluster's historical response rate, and
//! maps the probability onto a marketing strategy.

use crate::config::ScoringParams;
use crate::error::{ProfileField, ScoreError};
use ndarray::{arr1, Array1, Array2};
use serde::Serialize;

/// Mean feature values of one cluster, computed from historical records
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterCentroid {
    pub cluster_id: i64,
    pub mean_income: f64,
    pub mean_wine_spend: f64,
    pub mean_meat_spend: f64,
    pub mean_recency: f64,
}

impl ClusterCentroid {
    /// Combined wine + meat spending, the spending axis used for matching
    pub fn mean_spending(&self) -> f64 {
        self.mean_wine_spend + self.mean_meat_spend
    }
}

/// Historical response rate of one cluster. A non-finite rate means no
/// customers of that cluster were observed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterResponseStat {
    pub cluster_id: i64,
    pub mean_response_rate: f64,
}

/// Population maxima used to put income, spending and recency on a
/// comparable scale
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalization {
    income_max: f64,
    spend_max: f64,
    recency_max: f64,
}

impl Normalization {
    /// A zero or undefined maximum is replaced by 1
    pub fn new(income_max: f64, spend_max: f64, recency_max: f64) -> Self {
        fn guard(max: f64) -> f64 {
            if max == 0.0 || !max.is_finite() {
                1.0
            } else {
                max
            }
        }

        Self {
            income_max: guard(income_max),
            spend_max: guard(spend_max),
            recency_max: guard(recency_max),
        }
    }

    pub fn income_max(&self) -> f64 {
        self.income_max
    }

    pub fn spend_max(&self) -> f64 {
        self.spend_max
    }

    pub fn recency_max(&self) -> f64 {
        self.recency_max
    }

    fn as_array(&self) -> Array1<f64> {
        arr1(&[self.income_max, self.spend_max, self.recency_max])
    }
}

/// Read-only reference data the scorer works against
#[derive(Debug, Clone)]
pub struct ReferenceTables {
    centroids: Vec<ClusterCentroid>,
    response_stats: Vec<ClusterResponseStat>,
    normalization: Normalization,
    population_response_rate: f64,
    population_mean_income: f64,
}

impl ReferenceTables {
    /// Bundle the reference tables. Centroids are ordered by ascending
    /// cluster id so that distance ties resolve to the lowest id.
    pub fn new(
        mut centroids: Vec<ClusterCentroid>,
        response_stats: Vec<ClusterResponseStat>,
        normalization: Normalization,
        population_response_rate: f64,
        population_mean_income: f64,
    ) -> Result<Self, ScoreError> {
        if centroids.is_empty() {
            return Err(ScoreError::EmptyConfigurationData("cluster centroids"));
        }
        if response_stats.is_empty() {
            return Err(ScoreError::EmptyConfigurationData("cluster response rates"));
        }
        if !population_response_rate.is_finite() {
            return Err(ScoreError::EmptyConfigurationData("population response rate"));
        }

        centroids.sort_by_key(|c| c.cluster_id);

        Ok(Self {
            centroids,
            response_stats,
            normalization,
            population_response_rate,
            population_mean_income,
        })
    }

    pub fn centroids(&self) -> &[ClusterCentroid] {
        &self.centroids
    }

    pub fn response_stats(&self) -> &[ClusterResponseStat] {
        &self.response_stats
    }

    pub fn normalization(&self) -> Normalization {
        self.normalization
    }

    pub fn population_response_rate(&self) -> f64 {
        self.population_response_rate
    }

    pub fn population_mean_income(&self) -> f64 {
        self.population_mean_income
    }

    pub fn centroid(&self, cluster_id: i64) -> Option<&ClusterCentroid> {
        self.centroids.iter().find(|c| c.cluster_id == cluster_id)
    }
}

/// A validated customer profile
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CustomerProfile {
    pub age: i64,
    pub income: f64,
    /// Combined wine + meat spending
    pub spending: f64,
    /// Days since last purchase
    pub recency: i64,
}

/// Raw profile as collected from the caller; any field may be absent
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProfileInput {
    pub age: Option<i64>,
    pub income: Option<f64>,
    pub spending: Option<f64>,
    pub recency: Option<i64>,
}

impl ProfileInput {
    /// Check every field is present. Non-finite numbers count as missing.
    pub fn validate(&self) -> Result<CustomerProfile, ScoreError> {
        let finite = |v: Option<f64>| v.filter(|x| x.is_finite());

        let age = self.age.ok_or(ScoreError::MissingInput(ProfileField::Age))?;
        let income =
            finite(self.income).ok_or(ScoreError::MissingInput(ProfileField::Income))?;
        let spending =
            finite(self.spending).ok_or(ScoreError::MissingInput(ProfileField::Spending))?;
        let recency = self
            .recency
            .ok_or(ScoreError::MissingInput(ProfileField::Recency))?;

        Ok(CustomerProfile {
            age,
            income,
            spending,
            recency,
        })
    }
}

impl From<CustomerProfile> for ProfileInput {
    fn from(profile: CustomerProfile) -> Self {
        Self {
            age: Some(profile.age),
            income: Some(profile.income),
            spending: Some(profile.spending),
            recency: Some(profile.recency),
        }
    }
}

/// Marketing strategy recommended for a scored customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Strategy {
    HighValue,
    MediumPriority,
    LowInvestment,
}

/// Output of a successful scoring call
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScoreResult {
    pub cluster_id: i64,
    pub response_probability: f64,
    pub strategy: Strategy,
}

/// Scoring outcome for raw input: either a score or the placeholder for
/// incomplete input
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Scoring {
    Scored(ScoreResult),
    InsufficientInput { missing: ProfileField },
}

/// Find the centroid closest to the profile in normalized
/// (income, spending, recency) space. The first minimum wins.
pub fn nearest_cluster(
    profile: &CustomerProfile,
    centroids: &[ClusterCentroid],
    normalization: &Normalization,
) -> Result<i64, ScoreError> {
    if centroids.is_empty() {
        return Err(ScoreError::EmptyConfigurationData("cluster centroids"));
    }

    let point = arr1(&[profile.income, profile.spending, profile.recency as f64]);
    let scale = normalization.as_array();
    let matrix = centroid_matrix(centroids);

    let mut min_distance = f64::INFINITY;
    let mut closest = centroids[0].cluster_id;

    for (centroid, row) in centroids.iter().zip(matrix.outer_iter()) {
        let distance = ((&point - &row) / &scale)
            .mapv(|d| d * d)
            .sum()
            .sqrt();

        if distance < min_distance {
            min_distance = distance;
            closest = centroid.cluster_id;
        }
    }

    Ok(closest)
}

/// Centroids as an (n_clusters, 3) matrix of income, spending, recency
pub fn centroid_matrix(centroids: &[ClusterCentroid]) -> Array2<f64> {
    let mut matrix = Array2::zeros((centroids.len(), 3));
    for (mut row, centroid) in matrix.outer_iter_mut().zip(centroids) {
        row[0] = centroid.mean_income;
        row[1] = centroid.mean_spending();
        row[2] = centroid.mean_recency;
    }
    matrix
}

/// Historical response rate of the cluster, or the population rate when the
/// cluster has none
pub fn base_probability(cluster_id: i64, tables: &ReferenceTables) -> f64 {
    tables
        .response_stats()
        .iter()
        .find(|s| s.cluster_id == cluster_id)
        .map(|s| s.mean_response_rate)
        .filter(|rate| rate.is_finite())
        .unwrap_or(tables.population_response_rate())
}

/// Scale the base probability by how the profile's income and recency
/// compare to its cluster, then clamp
pub fn adjust_probability(
    base: f64,
    profile: &CustomerProfile,
    centroid: &ClusterCentroid,
    params: &ScoringParams,
) -> f64 {
    let income_factor = if centroid.mean_income > 0.0 {
        1.0 + params.income_weight * (profile.income - centroid.mean_income) / centroid.mean_income
    } else {
        1.0
    };

    let recency_factor = if centroid.mean_recency > 0.0 {
        1.0 + params.recency_weight * (centroid.mean_recency - profile.recency as f64)
            / centroid.mean_recency
    } else {
        1.0
    };

    let probability = base * income_factor * recency_factor;
    // inf * 0 yields NaN; it saturates to the upper bound
    if probability.is_nan() {
        params.max_probability
    } else {
        probability.clamp(params.min_probability, params.max_probability)
    }
}

/// Both thresholds are inclusive
pub fn classify_strategy(
    probability: f64,
    income: f64,
    population_mean_income: f64,
    params: &ScoringParams,
) -> Strategy {
    if probability >= params.high_value_threshold && income >= population_mean_income {
        Strategy::HighValue
    } else if probability >= params.medium_threshold {
        Strategy::MediumPriority
    } else {
        Strategy::LowInvestment
    }
}

/// Score a validated profile against the reference tables
pub fn score(
    profile: &CustomerProfile,
    tables: &ReferenceTables,
    params: &ScoringParams,
) -> Result<ScoreResult, ScoreError> {
    let cluster_id = nearest_cluster(profile, tables.centroids(), &tables.normalization())?;
    let centroid = tables
        .centroid(cluster_id)
        .ok_or(ScoreError::EmptyConfigurationData("cluster centroids"))?;

    let base = base_probability(cluster_id, tables);
    let response_probability = adjust_probability(base, profile, centroid, params);
    let strategy = classify_strategy(
        response_probability,
        profile.income,
        tables.population_mean_income(),
        params,
    );

    Ok(ScoreResult {
        cluster_id,
        response_probability,
        strategy,
    })
}

/// Score raw input. Missing fields produce [`Scoring::InsufficientInput`]
/// instead of an error; only missing reference data fails.
pub fn score_input(
    input: &ProfileInput,
    tables: &ReferenceTables,
    params: &ScoringParams,
) -> Result<Scoring, ScoreError> {
    match input.validate() {
        Ok(profile) => score(&profile, tables, params).map(Scoring::Scored),
        Err(ScoreError::MissingInput(missing)) => Ok(Scoring::InsufficientInput { missing }),
        Err(e) => Err(e),
    }
}
