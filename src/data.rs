//! Reference data loading using Polars
//!
//! Derives the scorer's reference tables from the clustering output
//! (`clustering_results.csv`) and the retail campaign dataset
//! (`marketing_campaign.csv`).

use crate::error::ScoreError;
use crate::model::{ClusterCentroid, ClusterResponseStat, Normalization, ReferenceTables};
use polars::prelude::*;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Spending categories summed into a customer's total spending
const SPENDING_COLUMNS: [&str; 6] = [
    "MntWines",
    "MntFruits",
    "MntMeatProducts",
    "MntFishProducts",
    "MntSweetProducts",
    "MntGoldProds",
];

/// Per-cluster figures shown in the segment summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterSummary {
    pub cluster_id: i64,
    pub size: usize,
    pub mean_income: f64,
    pub mean_kids: f64,
    /// Mean wine + meat spending
    pub total_spending: f64,
    pub mean_recency: f64,
}

/// Population-wide averages from the campaign dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationAverages {
    pub customers: usize,
    pub mean_income: f64,
    /// Mean spending over all six product categories
    pub mean_spending: f64,
    pub mean_recency: f64,
    pub response_rate: f64,
}

/// Everything derived from the CSVs at startup
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub tables: ReferenceTables,
    pub summaries: Vec<ClusterSummary>,
    pub population: PopulationAverages,
}

/// Load both datasets and derive the reference data
///
/// # Arguments
/// * `clustering_path` - CSV with `ID`, `Income`, `MntWines`, `MntMeatProducts`,
///   `Recency`, `Kidhome` and `cluster` columns
/// * `campaign_path` - campaign CSV with `ID`, `Income`, `Response`, `Recency`
///   and the `Mnt*` spending columns
/// * `campaign_separator` - field separator of the campaign CSV
pub fn load_reference_data(
    clustering_path: impl AsRef<Path>,
    campaign_path: impl AsRef<Path>,
    campaign_separator: u8,
) -> crate::Result<ReferenceData> {
    let clustering_path = clustering_path.as_ref();
    let campaign_path = campaign_path.as_ref();

    for path in [clustering_path, campaign_path] {
        if !path.exists() {
            anyhow::bail!("Input file not found: {}", path.display());
        }
    }

    info!("Loading clustering results from {}", clustering_path.display());
    let all_rows = scan_csv(clustering_path, b',')?;
    let clustering = all_rows.clone().filter(col("cluster").is_not_null());

    info!("Loading campaign data from {}", campaign_path.display());
    let campaign = scan_csv(campaign_path, campaign_separator)?;

    let (centroids, summaries) = compute_centroids(clustering.clone())?;
    // Maxima cover unassigned rows too
    let normalization = compute_normalization(all_rows)?;
    let response_stats = compute_response_stats(campaign.clone(), clustering)?;
    let population = compute_population(campaign)?;

    for centroid in &centroids {
        if !response_stats
            .iter()
            .any(|s| s.cluster_id == centroid.cluster_id && s.mean_response_rate.is_finite())
        {
            warn!(
                "Cluster {} has no observed responses, falling back to population rate {:.3}",
                centroid.cluster_id, population.response_rate
            );
        }
    }

    let tables = ReferenceTables::new(
        centroids,
        response_stats,
        normalization,
        population.response_rate,
        population.mean_income,
    )?;

    info!(
        "Reference data ready: {} clusters, {} campaign customers",
        tables.centroids().len(),
        population.customers
    );

    Ok(ReferenceData {
        tables,
        summaries,
        population,
    })
}

fn scan_csv(path: &Path, separator: u8) -> crate::Result<LazyFrame> {
    let frame = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_separator(separator)
        .finish()?;
    Ok(frame)
}

/// Numeric view of a column; unparseable values become null
fn num(name: &str) -> Expr {
    col(name).cast(DataType::Float64)
}

/// Group clustering results by cluster and average the matching features
fn compute_centroids(
    clustering: LazyFrame,
) -> crate::Result<(Vec<ClusterCentroid>, Vec<ClusterSummary>)> {
    let df = clustering
        .group_by([col("cluster")])
        .agg([
            num("Income").mean().alias("mean_income"),
            num("MntWines").mean().alias("mean_wine_spend"),
            num("MntMeatProducts").mean().alias("mean_meat_spend"),
            num("Recency").mean().alias("mean_recency"),
            num("Kidhome").mean().alias("mean_kids"),
            col("ID").count().alias("size"),
        ])
        .collect()?;

    if df.height() == 0 {
        return Err(ScoreError::EmptyConfigurationData("cluster centroids").into());
    }

    let ids = i64_values(&df, "cluster")?;
    let incomes = f64_values(&df, "mean_income")?;
    let wines = f64_values(&df, "mean_wine_spend")?;
    let meats = f64_values(&df, "mean_meat_spend")?;
    let recencies = f64_values(&df, "mean_recency")?;
    let kids = f64_values(&df, "mean_kids")?;
    let sizes = i64_values(&df, "size")?;

    let mut centroids = Vec::with_capacity(df.height());
    let mut summaries = Vec::with_capacity(df.height());

    for i in 0..df.height() {
        let Some(cluster_id) = ids[i] else {
            continue;
        };

        let centroid = ClusterCentroid {
            cluster_id,
            mean_income: incomes[i].unwrap_or(f64::NAN),
            mean_wine_spend: wines[i].unwrap_or(0.0),
            mean_meat_spend: meats[i].unwrap_or(0.0),
            mean_recency: recencies[i].unwrap_or(f64::NAN),
        };
        debug!(?centroid, "Computed centroid");

        summaries.push(ClusterSummary {
            cluster_id,
            size: sizes[i].unwrap_or(0).max(0) as usize,
            mean_income: centroid.mean_income,
            mean_kids: kids[i].unwrap_or(0.0),
            total_spending: centroid.mean_spending(),
            mean_recency: centroid.mean_recency,
        });
        centroids.push(centroid);
    }

    centroids.sort_by_key(|c| c.cluster_id);
    summaries.sort_by_key(|s| s.cluster_id);

    Ok((centroids, summaries))
}

/// Population maxima over the clustering results
fn compute_normalization(clustering: LazyFrame) -> crate::Result<Normalization> {
    let df = clustering
        .select([
            num("Income").max().alias("income_max"),
            (num("MntWines") + num("MntMeatProducts"))
                .max()
                .alias("spend_max"),
            num("Recency").max().alias("recency_max"),
        ])
        .collect()?;

    let income_max = scalar(&df, "income_max")?.unwrap_or(0.0);
    let spend_max = scalar(&df, "spend_max")?.unwrap_or(0.0);
    let recency_max = scalar(&df, "recency_max")?.unwrap_or(0.0);
    debug!(income_max, spend_max, recency_max, "Normalization maxima");

    Ok(Normalization::new(income_max, spend_max, recency_max))
}

/// Mean campaign response per cluster, joining campaign rows to their
/// cluster assignment by customer ID
fn compute_response_stats(
    campaign: LazyFrame,
    clustering: LazyFrame,
) -> crate::Result<Vec<ClusterResponseStat>> {
    let assignments = clustering.select([col("ID"), col("cluster")]);

    let df = campaign
        .select([col("ID"), num("Response").alias("Response")])
        .inner_join(assignments, col("ID"), col("ID"))
        .group_by([col("cluster")])
        .agg([col("Response").mean().alias("mean_response_rate")])
        .collect()?;

    let ids = i64_values(&df, "cluster")?;
    let rates = f64_values(&df, "mean_response_rate")?;

    let mut stats: Vec<ClusterResponseStat> = ids
        .into_iter()
        .zip(rates)
        .filter_map(|(id, rate)| {
            id.map(|cluster_id| ClusterResponseStat {
                cluster_id,
                mean_response_rate: rate.unwrap_or(f64::NAN),
            })
        })
        .collect();
    stats.sort_by_key(|s| s.cluster_id);

    debug!(clusters = stats.len(), "Computed response rates");
    Ok(stats)
}

/// Population averages. Missing incomes are filled with the median income
/// before averaging.
fn compute_population(campaign: LazyFrame) -> crate::Result<PopulationAverages> {
    let total_spending = SPENDING_COLUMNS
        .iter()
        .skip(1)
        .fold(num(SPENDING_COLUMNS[0]), |acc, name| acc + num(name));

    let df = campaign
        .select([
            col("ID").count().alias("customers"),
            num("Income")
                .fill_null(num("Income").median())
                .mean()
                .alias("mean_income"),
            total_spending.mean().alias("mean_spending"),
            num("Recency").mean().alias("mean_recency"),
            num("Response").mean().alias("response_rate"),
        ])
        .collect()?;

    let customers = i64_values(&df, "customers")?
        .first()
        .copied()
        .flatten()
        .unwrap_or(0);
    if customers == 0 {
        anyhow::bail!("No customers found in campaign data");
    }

    Ok(PopulationAverages {
        customers: customers as usize,
        mean_income: scalar(&df, "mean_income")?.unwrap_or(0.0),
        mean_spending: scalar(&df, "mean_spending")?.unwrap_or(0.0),
        mean_recency: scalar(&df, "mean_recency")?.unwrap_or(0.0),
        response_rate: scalar(&df, "response_rate")?.unwrap_or(f64::NAN),
    })
}

fn f64_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let series = df.column(name)?.cast(&DataType::Float64)?;
    let values = series.f64()?.into_iter().collect();
    Ok(values)
}

fn i64_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<i64>>> {
    let series = df.column(name)?.cast(&DataType::Int64)?;
    let values = series.i64()?.into_iter().collect();
    Ok(values)
}

fn scalar(df: &DataFrame, name: &str) -> crate::Result<Option<f64>> {
    Ok(f64_values(df, name)?.into_iter().next().flatten())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_clustering_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID,Income,MntWines,MntMeatProducts,Recency,Kidhome,cluster,pca1,pca2").unwrap();
        writeln!(file, "1,30000,200,100,40,1,0,-1.2,0.3").unwrap();
        writeln!(file, "2,40000,300,200,60,1,0,-0.9,0.1").unwrap();
        writeln!(file, "3,70000,600,250,10,0,1,1.1,-0.4").unwrap();
        writeln!(file, "4,74000,700,250,30,0,1,1.4,-0.2").unwrap();
        file
    }

    fn create_campaign_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ID;Year_Birth;Income;MntWines;MntFruits;MntMeatProducts;MntFishProducts;MntSweetProducts;MntGoldProds;Recency;Response").unwrap();
        writeln!(file, "1;1970;30000;200;10;100;10;10;10;40;0").unwrap();
        writeln!(file, "2;1980;40000;300;10;200;10;10;10;60;1").unwrap();
        writeln!(file, "3;1975;70000;600;20;250;20;20;20;10;1").unwrap();
        writeln!(file, "4;1985;;700;20;250;20;20;20;30;1").unwrap();
        writeln!(file, "5;1990;50000;100;0;50;0;0;0;80;0").unwrap();
        file
    }

    #[test]
    fn test_load_reference_data() {
        let clustering = create_clustering_csv();
        let campaign = create_campaign_csv();

        let data = load_reference_data(clustering.path(), campaign.path(), b';').unwrap();
        let centroids = data.tables.centroids();

        assert_eq!(centroids.len(), 2);
        assert_eq!(centroids[0].cluster_id, 0);
        assert!((centroids[0].mean_income - 35_000.0).abs() < 1e-9);
        assert!((centroids[0].mean_spending() - 400.0).abs() < 1e-9);
        assert!((centroids[1].mean_recency - 20.0).abs() < 1e-9);

        let norms = data.tables.normalization();
        assert_eq!(norms.income_max(), 74_000.0);
        assert_eq!(norms.spend_max(), 950.0);
        assert_eq!(norms.recency_max(), 60.0);
    }

    #[test]
    fn test_response_rates_and_population() {
        let clustering = create_clustering_csv();
        let campaign = create_campaign_csv();

        let data = load_reference_data(clustering.path(), campaign.path(), b';').unwrap();
        let stats = data.tables.response_stats();

        assert_eq!(stats.len(), 2);
        assert!((stats[0].mean_response_rate - 0.5).abs() < 1e-9);
        assert!((stats[1].mean_response_rate - 1.0).abs() < 1e-9);

        // Customer 5 has no cluster but counts towards the population
        assert_eq!(data.population.customers, 5);
        assert!((data.population.response_rate - 0.6).abs() < 1e-9);

        // Missing income filled with the median of 30k, 40k, 50k, 70k
        let expected_income = (30_000.0 + 40_000.0 + 70_000.0 + 45_000.0 + 50_000.0) / 5.0;
        assert!((data.tables.population_mean_income() - expected_income).abs() < 1e-6);
    }

    #[test]
    fn test_cluster_summaries() {
        let clustering = create_clustering_csv();
        let campaign = create_campaign_csv();

        let data = load_reference_data(clustering.path(), campaign.path(), b';').unwrap();

        assert_eq!(data.summaries.len(), 2);
        assert_eq!(data.summaries[0].size, 2);
        assert!((data.summaries[0].mean_kids - 1.0).abs() < 1e-9);
        assert!((data.summaries[1].total_spending - 900.0).abs() < 1e-9);
    }

    #[test]
    fn test_maxima_include_unassigned_rows() {
        let mut clustering = NamedTempFile::new().unwrap();
        writeln!(clustering, "ID,Income,MntWines,MntMeatProducts,Recency,Kidhome,cluster,pca1,pca2").unwrap();
        writeln!(clustering, "1,30000,200,100,40,1,0,-1.2,0.3").unwrap();
        writeln!(clustering, "2,70000,600,250,10,0,1,1.1,-0.4").unwrap();
        writeln!(clustering, "3,200000,2000,1000,99,0,,0.0,0.0").unwrap();
        let campaign = create_campaign_csv();

        let data = load_reference_data(clustering.path(), campaign.path(), b';').unwrap();

        let norms = data.tables.normalization();
        assert_eq!(norms.income_max(), 200_000.0);
        assert_eq!(norms.spend_max(), 3_000.0);
        assert_eq!(norms.recency_max(), 99.0);

        // The unassigned row stays out of the centroids
        assert_eq!(data.tables.centroids().len(), 2);
        assert_eq!(data.summaries.iter().map(|s| s.size).sum::<usize>(), 2);
    }

    #[test]
    fn test_missing_file() {
        let campaign = create_campaign_csv();
        let result = load_reference_data("does/not/exist.csv", campaign.path(), b';');
        assert!(result.is_err());
    }
}
