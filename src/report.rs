//! Text and JSON rendering of scoring outcomes and segment summaries

use crate::config::AppConfig;
use crate::data::{ClusterSummary, PopulationAverages, ReferenceData};
use crate::model::{CustomerProfile, ScoreResult, Scoring, Strategy};
use serde::Serialize;
use std::fmt::Write;

/// Placeholder shown for any value that cannot be computed
pub const PLACEHOLDER: &str = "--";

impl Strategy {
    /// Display name
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::HighValue => "High Value",
            Strategy::MediumPriority => "Medium Priority",
            Strategy::LowInvestment => "Low Investment",
        }
    }

    /// Why the strategy was chosen, quoting the values that triggered it
    pub fn rationale(&self, probability: f64, income: f64, population_mean_income: f64) -> String {
        match self {
            Strategy::HighValue => format!(
                "High probability ({}) + Above avg income ({} > {})",
                format_percent(probability),
                format_amount(income),
                format_currency(population_mean_income)
            ),
            Strategy::MediumPriority => format!(
                "Medium probability ({}). Standard campaign recommended.",
                format_percent(probability)
            ),
            Strategy::LowInvestment => format!(
                "Low probability ({}). Minimal marketing spend suggested.",
                format_percent(probability)
            ),
        }
    }
}

/// Probability as a whole percentage, e.g. `29%`
pub fn format_percent(probability: f64) -> String {
    format!("{:.0}%", probability * 100.0)
}

/// Whole-dollar amount with thousands separators, e.g. `$72,000`
pub fn format_currency(amount: f64) -> String {
    let rounded = amount.round();
    with_sign(rounded < 0.0, group_thousands(&format!("{:.0}", rounded.abs())))
}

/// Dollar amount as entered, cents kept, e.g. `$70,000.5`
pub fn format_amount(amount: f64) -> String {
    let raw = format!("{}", amount.abs());
    let grouped = match raw.split_once('.') {
        Some((whole, fraction)) => format!("{}.{}", group_thousands(whole), fraction),
        None => group_thousands(&raw),
    };
    with_sign(amount < 0.0, grouped)
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

fn with_sign(negative: bool, grouped: String) -> String {
    if negative {
        format!("-${}", grouped)
    } else {
        format!("${}", grouped)
    }
}

/// Age band used across the campaign reports
pub fn age_band(age: i64) -> &'static str {
    match age {
        a if a < 30 => "18-29",
        a if a < 40 => "30-39",
        a if a < 50 => "40-49",
        a if a < 60 => "50-59",
        _ => "60+",
    }
}

/// `Cluster <id>: Avg Income $<income>`, or just `Cluster <id>` when the
/// cluster has no summary
pub fn segment_description(cluster_id: i64, summaries: &[ClusterSummary]) -> String {
    match summaries.iter().find(|s| s.cluster_id == cluster_id) {
        Some(summary) => format!(
            "Cluster {}: Avg Income {}",
            cluster_id,
            format_currency(summary.mean_income)
        ),
        None => format!("Cluster {}", cluster_id),
    }
}

/// Render a scoring outcome for the terminal
pub fn render_scoring(
    outcome: &Scoring,
    profile: Option<&CustomerProfile>,
    data: &ReferenceData,
    config: &AppConfig,
) -> String {
    let mut out = String::new();

    match (outcome, profile) {
        (Scoring::Scored(result), Some(profile)) => {
            render_score(&mut out, result, profile, data, config);
        }
        (Scoring::InsufficientInput { missing }, _) => {
            let _ = writeln!(out, "Response probability: {}", PLACEHOLDER);
            let _ = writeln!(out, "Segment:              {}", PLACEHOLDER);
            let _ = writeln!(out, "                      Enter values ({} is missing)", missing);
            let _ = writeln!(out, "Strategy:             {}", PLACEHOLDER);
        }
        (Scoring::Scored(_), None) => {
            let _ = writeln!(out, "{}", PLACEHOLDER);
        }
    }

    out
}

fn render_score(
    out: &mut String,
    result: &ScoreResult,
    profile: &CustomerProfile,
    data: &ReferenceData,
    config: &AppConfig,
) {
    let p = result.response_probability;
    let population_income = data.tables.population_mean_income();

    let _ = writeln!(out, "Response probability: {}", format_percent(p));
    let _ = writeln!(
        out,
        "Segment:              {}",
        config.segment_label(result.cluster_id)
    );
    let _ = writeln!(
        out,
        "                      {}",
        segment_description(result.cluster_id, &data.summaries)
    );
    let _ = writeln!(out, "Strategy:             {}", result.strategy.label());
    let _ = writeln!(
        out,
        "                      {}",
        result.strategy.rationale(p, profile.income, population_income)
    );

    let _ = writeln!(out);
    let _ = writeln!(out, "{}", render_comparison(profile, &data.population));
}

/// This customer against the campaign population
pub fn render_comparison(profile: &CustomerProfile, population: &PopulationAverages) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<15} | {:>13} | {:>18}",
        "Metric",
        "This Customer",
        format!("Population (n={})", population.customers)
    );
    let _ = writeln!(out, "  {}", "-".repeat(52));
    let _ = writeln!(
        out,
        "  {:<15} | {:>13} | {:>18}",
        "Income (K$)",
        format!("{:.1}K", profile.income / 1000.0),
        format!("{:.1}K", population.mean_income / 1000.0)
    );
    let _ = writeln!(
        out,
        "  {:<15} | {:>13} | {:>18}",
        "Spending ($)",
        format_currency(profile.spending),
        format_currency(population.mean_spending)
    );
    let _ = writeln!(
        out,
        "  {:<15} | {:>13} | {:>18}",
        "Recency (days)",
        format!("{}d", profile.recency),
        format!("{:.0}d", population.mean_recency)
    );
    let _ = write!(out, "  Age band: {}", age_band(profile.age));
    out
}

/// Segment table plus headline figures
pub fn render_segment_summary(data: &ReferenceData, config: &AppConfig) -> String {
    let summaries = &data.summaries;
    let mut out = String::new();

    let largest = summaries.iter().map(|s| s.size).max().unwrap_or(0);
    let n = summaries.len().max(1) as f64;
    let avg_income = summaries.iter().map(|s| s.mean_income).sum::<f64>() / n;
    let avg_spending = summaries.iter().map(|s| s.total_spending).sum::<f64>() / n;

    let _ = writeln!(out, "=== Customer Segments ===");
    let _ = writeln!(out, "Segments:         {}", summaries.len());
    let _ = writeln!(out, "Largest segment:  {}", largest);
    let _ = writeln!(out, "Avg income:       {}", format_currency(avg_income));
    let _ = writeln!(out, "Avg spending:     {}", format_currency(avg_spending));
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "  {:>3} | {:<20} | {:>6} | {:>10} | {:>12} | {:>7}",
        "ID", "Segment Type", "Size", "Avg Income", "Avg Spending", "Recency"
    );
    let _ = writeln!(out, "  {}", "-".repeat(73));
    for s in summaries {
        let _ = writeln!(
            out,
            "  {:>3} | {:<20} | {:>6} | {:>10} | {:>12} | {:>7.0}",
            s.cluster_id,
            config.segment_label(s.cluster_id),
            s.size,
            format_currency(s.mean_income),
            format_currency(s.total_spending),
            s.mean_recency
        );
    }

    out
}

#[derive(Serialize)]
struct ScoringReport<'a> {
    #[serde(flatten)]
    outcome: &'a Scoring,
    #[serde(skip_serializing_if = "Option::is_none")]
    segment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    probability_display: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rationale: Option<String>,
}

/// JSON form of a scoring outcome with its display strings
pub fn scoring_json(
    outcome: &Scoring,
    profile: Option<&CustomerProfile>,
    data: &ReferenceData,
    config: &AppConfig,
) -> crate::Result<String> {
    let (segment, probability_display, rationale) = match (outcome, profile) {
        (Scoring::Scored(result), Some(profile)) => (
            Some(config.segment_label(result.cluster_id)),
            Some(format_percent(result.response_probability)),
            Some(result.strategy.rationale(
                result.response_probability,
                profile.income,
                data.tables.population_mean_income(),
            )),
        ),
        _ => (None, None, None),
    };

    let report = ScoringReport {
        outcome,
        segment,
        probability_display,
        rationale,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProfileField;
    use crate::model::{ClusterCentroid, ClusterResponseStat, Normalization, ReferenceTables};

    fn create_test_data() -> ReferenceData {
        let tables = ReferenceTables::new(
            vec![ClusterCentroid {
                cluster_id: 1,
                mean_income: 72_000.0,
                mean_wine_spend: 600.0,
                mean_meat_spend: 300.0,
                mean_recency: 20.0,
            }],
            vec![ClusterResponseStat {
                cluster_id: 1,
                mean_response_rate: 0.3,
            }],
            Normalization::new(100_000.0, 1_000.0, 100.0),
            0.15,
            50_000.0,
        )
        .unwrap();

        ReferenceData {
            tables,
            summaries: vec![ClusterSummary {
                cluster_id: 1,
                size: 12,
                mean_income: 72_000.0,
                mean_kids: 0.0,
                total_spending: 900.0,
                mean_recency: 20.0,
            }],
            population: PopulationAverages {
                customers: 40,
                mean_income: 50_000.0,
                mean_spending: 605.0,
                mean_recency: 49.0,
                response_rate: 0.15,
            },
        }
    }

    fn profile() -> CustomerProfile {
        CustomerProfile {
            age: 45,
            income: 70_000.0,
            spending: 850.0,
            recency: 25,
        }
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(0.0), "$0");
        assert_eq!(format_currency(999.4), "$999");
        assert_eq!(format_currency(72_000.0), "$72,000");
        assert_eq!(format_currency(1_234_567.8), "$1,234,568");
        assert_eq!(format_currency(-4_500.0), "-$4,500");
    }

    #[test]
    fn test_format_amount_keeps_cents() {
        assert_eq!(format_amount(70_000.0), "$70,000");
        assert_eq!(format_amount(70_000.5), "$70,000.5");
        assert_eq!(format_amount(999.25), "$999.25");
        assert_eq!(format_amount(-1_500.75), "-$1,500.75");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.290875), "29%");
        assert_eq!(format_percent(0.95), "95%");
    }

    #[test]
    fn test_rationale_strings() {
        assert_eq!(
            Strategy::HighValue.rationale(0.62, 70_000.0, 52_247.3),
            "High probability (62%) + Above avg income ($70,000 > $52,247)"
        );
        assert_eq!(
            Strategy::HighValue.rationale(0.62, 70_000.5, 52_247.3),
            "High probability (62%) + Above avg income ($70,000.5 > $52,247)"
        );
        assert_eq!(
            Strategy::MediumPriority.rationale(0.3, 1.0, 1.0),
            "Medium probability (30%). Standard campaign recommended."
        );
        assert_eq!(
            Strategy::LowInvestment.rationale(0.05, 1.0, 1.0),
            "Low probability (5%). Minimal marketing spend suggested."
        );
    }

    #[test]
    fn test_age_band() {
        assert_eq!(age_band(18), "18-29");
        assert_eq!(age_band(30), "30-39");
        assert_eq!(age_band(59), "50-59");
        assert_eq!(age_band(60), "60+");
    }

    #[test]
    fn test_segment_description() {
        let data = create_test_data();
        assert_eq!(
            segment_description(1, &data.summaries),
            "Cluster 1: Avg Income $72,000"
        );
        assert_eq!(segment_description(9, &data.summaries), "Cluster 9");
    }

    #[test]
    fn test_render_scoring() {
        let data = create_test_data();
        let config = AppConfig::default();
        let outcome = Scoring::Scored(ScoreResult {
            cluster_id: 1,
            response_probability: 0.290875,
            strategy: Strategy::LowInvestment,
        });

        let text = render_scoring(&outcome, Some(&profile()), &data, &config);
        assert!(text.contains("Response probability: 29%"));
        assert!(text.contains("High-Spending Elite"));
        assert!(text.contains("Low Investment"));
        assert!(text.contains("Population (n=40)"));
        assert!(text.contains("Age band: 40-49"));
    }

    #[test]
    fn test_render_placeholder() {
        let data = create_test_data();
        let config = AppConfig::default();
        let outcome = Scoring::InsufficientInput {
            missing: ProfileField::Recency,
        };

        let text = render_scoring(&outcome, None, &data, &config);
        assert!(text.contains("Response probability: --"));
        assert!(text.contains("Enter values (recency is missing)"));
    }

    #[test]
    fn test_segment_summary() {
        let data = create_test_data();
        let text = render_segment_summary(&data, &AppConfig::default());
        assert!(text.contains("Segments:         1"));
        assert!(text.contains("Largest segment:  12"));
        assert!(text.contains("High-Spending Elite"));
        assert!(text.contains("$900"));
    }

    #[test]
    fn test_scoring_json() {
        let data = create_test_data();
        let config = AppConfig::default();
        let outcome = Scoring::Scored(ScoreResult {
            cluster_id: 1,
            response_probability: 0.290875,
            strategy: Strategy::LowInvestment,
        });

        let json = scoring_json(&outcome, Some(&profile()), &data, &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "scored");
        assert_eq!(value["cluster_id"], 1);
        assert_eq!(value["strategy"], "LowInvestment");
        assert_eq!(value["probability_display"], "29%");

        let missing = Scoring::InsufficientInput {
            missing: ProfileField::Age,
        };
        let json = scoring_json(&missing, None, &data, &config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "insufficient_input");
        assert_eq!(value["missing"], "age");
        assert!(value.get("segment").is_none());
    }
}
