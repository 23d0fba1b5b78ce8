//! Command-line interface definitions and argument parsing

use crate::config::AppConfig;
use crate::model::ProfileInput;
use clap::Parser;

/// Score customers against precomputed marketing segments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Clustering results CSV (overrides the config file)
    #[arg(long)]
    pub clusters: Option<String>,

    /// Retail campaign CSV (overrides the config file)
    #[arg(long)]
    pub campaign: Option<String>,

    /// Field separator of the campaign CSV (overrides the config file)
    #[arg(long)]
    pub separator: Option<char>,

    /// Optional TOML config file
    #[arg(short, long, default_value = "segscore.toml")]
    pub config: String,

    /// Prediction mode: provide age,income,spending,recency as comma-separated string
    /// Example: --predict "45,70000,850,25". Leave a value empty to mark it missing.
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Print results as JSON
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the profile from the predict string
    /// Expected format: "age,income,spending,recency"; empty fields are missing
    pub fn parse_profile_values(&self) -> crate::Result<Option<ProfileInput>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').map(str::trim).collect();
        if parts.len() != 4 {
            anyhow::bail!("Predict values must be in format 'age,income,spending,recency'");
        }

        Ok(Some(ProfileInput {
            age: parse_field(parts[0], "age")?,
            income: parse_field(parts[1], "income")?,
            spending: parse_field(parts[2], "spending")?,
            recency: parse_field(parts[3], "recency")?,
        }))
    }

    /// Apply command-line overrides on top of the loaded config
    pub fn apply_overrides(&self, config: &mut AppConfig) -> crate::Result<()> {
        if let Some(ref path) = self.clusters {
            config.data.clustering_csv = path.clone();
        }
        if let Some(ref path) = self.campaign {
            config.data.campaign_csv = path.clone();
        }
        if let Some(separator) = self.separator {
            config.data.campaign_separator = separator;
        }
        if !config.data.campaign_separator.is_ascii() {
            anyhow::bail!(
                "Separator must be a single ASCII character, got '{}'",
                config.data.campaign_separator
            );
        }
        Ok(())
    }
}

fn parse_field<T>(raw: &str, name: &str) -> crate::Result<Option<T>>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    if raw.is_empty() {
        return Ok(None);
    }

    let value: T = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", name, raw))?;
    if value < T::default() {
        anyhow::bail!("{} must not be negative: {}", name, raw);
    }
    Ok(Some(value))
}
