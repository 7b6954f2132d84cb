//! Dataset catalogue and schema resolution.
//!
//! Each of the eleven datasets declares its canonical column names along
//! with the alternate spellings seen in exported CSVs. Aliases are renamed
//! once, when a table is loaded, so the rest of the crate only ever sees
//! canonical names.

use super::table::Table;
use crate::utils::error::SourceError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A canonical column and the alternate headers that map onto it
#[derive(Debug, Clone, Copy)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
}

const fn col(name: &'static str, aliases: &'static [&'static str]) -> ColumnSpec {
    ColumnSpec { name, aliases }
}

const CAMPAIGN_PERFORMANCE_COLUMNS: &[ColumnSpec] = &[
    col("date", &["day", "report_date"]),
    col("channel", &["marketing_channel"]),
    col("region", &[]),
    col("campaign_type", &["campaign"]),
    col("impressions", &[]),
    col("clicks", &[]),
    col("conversions", &[]),
    col("spend", &["cost"]),
    col("revenue", &[]),
    col("ctr", &["click_through_rate"]),
    col("cpa", &["cost_per_acquisition"]),
    col("roas", &["return_on_ad_spend"]),
];

const CUSTOMER_DATA_COLUMNS: &[ColumnSpec] = &[
    col("customer_id", &["id"]),
    col("age", &[]),
    col("income", &["annual_income"]),
    col("lifetime_value", &["ltv", "clv"]),
    col("satisfaction_score", &["satisfaction"]),
    col("customer_segment", &["segment"]),
    col("acquisition_channel", &[]),
    col("nps_category", &["nps_group"]),
    col("churn", &["churned"]),
    col("number_of_purchases", &["purchases", "total_purchases"]),
    col("engagement_score", &["engagement"]),
];

const PRODUCT_SALES_COLUMNS: &[ColumnSpec] = &[
    col("product_name", &["product"]),
    col("category", &[]),
    col("subcategory", &["sub_category"]),
    col("region", &[]),
    col("quarter", &[]),
    col("year", &[]),
    col("sales", &["revenue"]),
    col("units_sold", &["units"]),
    col("profit", &[]),
    col("profit_margin", &["margin"]),
    col("avg_rating", &["rating"]),
    col("review_count", &["reviews"]),
    col("return_rate", &[]),
];

const LEAD_SCORING_RESULTS_COLUMNS: &[ColumnSpec] = &[
    col("lead_id", &["id"]),
    col("actual_converted", &["actual", "converted"]),
    col("predicted_class", &["predicted", "prediction"]),
    col("predicted_probability", &["probability", "score"]),
];

const FEATURE_IMPORTANCE_COLUMNS: &[ColumnSpec] = &[
    col("feature", &["feature_name"]),
    col("importance", &["importance_score", "score"]),
    col("std", &["importance_std", "std_dev"]),
];

const LEARNING_CURVE_COLUMNS: &[ColumnSpec] = &[
    col("training_size", &["training_set_size", "train_size", "set_size"]),
    col("train_score", &["training_score", "train_mean"]),
    col("validation_score", &["val_score", "cv_score", "validation_mean"]),
];

const GEOGRAPHIC_DATA_COLUMNS: &[ColumnSpec] = &[
    col("state", &["region_name"]),
    col("region", &[]),
    col("revenue", &[]),
    col("customers", &["customer_count"]),
    col("market_penetration", &["penetration"]),
    col("yoy_growth", &["growth"]),
    col("satisfaction", &["satisfaction_score"]),
];

const CHANNEL_ATTRIBUTION_COLUMNS: &[ColumnSpec] = &[
    col("channel", &[]),
    col("first_touch", &[]),
    col("last_touch", &[]),
    col("linear", &[]),
    col("time_decay", &[]),
    col("position_based", &[]),
];

const FUNNEL_DATA_COLUMNS: &[ColumnSpec] = &[
    col("stage", &["funnel_stage"]),
    col("visitors", &["count", "users"]),
];

const CUSTOMER_JOURNEY_COLUMNS: &[ColumnSpec] = &[
    col("customer_id", &["id"]),
    col("touchpoint", &["touchpoint_channel"]),
    col("step", &["touchpoint_order", "step_number"]),
    col("converted", &[]),
];

const CORRELATION_MATRIX_COLUMNS: &[ColumnSpec] = &[col("variable", &["", "Unnamed: 0", "index"])];

/// The fixed set of datasets the dashboard reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dataset {
    CampaignPerformance,
    CustomerData,
    ProductSales,
    LeadScoringResults,
    FeatureImportance,
    LearningCurve,
    GeographicData,
    ChannelAttribution,
    FunnelData,
    CustomerJourney,
    CorrelationMatrix,
}

impl Dataset {
    pub const COUNT: usize = 11;

    pub const ALL: [Dataset; Dataset::COUNT] = [
        Dataset::CampaignPerformance,
        Dataset::CustomerData,
        Dataset::ProductSales,
        Dataset::LeadScoringResults,
        Dataset::FeatureImportance,
        Dataset::LearningCurve,
        Dataset::GeographicData,
        Dataset::ChannelAttribution,
        Dataset::FunnelData,
        Dataset::CustomerJourney,
        Dataset::CorrelationMatrix,
    ];

    /// Slot index used by the table cache
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Dataset::CampaignPerformance => "campaign_performance",
            Dataset::CustomerData => "customer_data",
            Dataset::ProductSales => "product_sales",
            Dataset::LeadScoringResults => "lead_scoring_results",
            Dataset::FeatureImportance => "feature_importance",
            Dataset::LearningCurve => "learning_curve",
            Dataset::GeographicData => "geographic_data",
            Dataset::ChannelAttribution => "channel_attribution",
            Dataset::FunnelData => "funnel_data",
            Dataset::CustomerJourney => "customer_journey",
            Dataset::CorrelationMatrix => "correlation_matrix",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.name())
    }

    /// Canonical columns and their aliases
    pub fn columns(self) -> &'static [ColumnSpec] {
        match self {
            Dataset::CampaignPerformance => CAMPAIGN_PERFORMANCE_COLUMNS,
            Dataset::CustomerData => CUSTOMER_DATA_COLUMNS,
            Dataset::ProductSales => PRODUCT_SALES_COLUMNS,
            Dataset::LeadScoringResults => LEAD_SCORING_RESULTS_COLUMNS,
            Dataset::FeatureImportance => FEATURE_IMPORTANCE_COLUMNS,
            Dataset::LearningCurve => LEARNING_CURVE_COLUMNS,
            Dataset::GeographicData => GEOGRAPHIC_DATA_COLUMNS,
            Dataset::ChannelAttribution => CHANNEL_ATTRIBUTION_COLUMNS,
            Dataset::FunnelData => FUNNEL_DATA_COLUMNS,
            Dataset::CustomerJourney => CUSTOMER_JOURNEY_COLUMNS,
            Dataset::CorrelationMatrix => CORRELATION_MATRIX_COLUMNS,
        }
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_end_matches(".csv");
        Dataset::ALL
            .iter()
            .copied()
            .find(|d| d.name() == wanted)
            .ok_or_else(|| SourceError::DatasetNotFound(s.to_string()))
    }
}

/// Rename alias headers to their canonical names
///
/// A canonical column already present wins; the alias is then left alone.
/// Columns the dataset does not declare pass through unchanged.
pub fn resolve_schema(dataset: Dataset, table: Table) -> Result<Table, SourceError> {
    let mut table = table;
    for spec in dataset.columns() {
        if table.has_column(spec.name) {
            continue;
        }
        let Some(alias) = spec.aliases.iter().find(|a| table.has_column(a)) else {
            continue;
        };
        debug!("{}: resolving column '{}' -> '{}'", dataset, alias, spec.name);
        table = table
            .rename(alias, spec.name)
            .map_err(|e| SourceError::DatasetUnreadable {
                dataset: dataset.to_string(),
                reason: e.to_string(),
            })?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::table::Value;

    #[test]
    fn test_dataset_from_str() {
        assert_eq!("funnel_data".parse::<Dataset>().unwrap(), Dataset::FunnelData);
        assert_eq!("funnel_data.csv".parse::<Dataset>().unwrap(), Dataset::FunnelData);
        assert!(matches!(
            "weather".parse::<Dataset>(),
            Err(SourceError::DatasetNotFound(_))
        ));
    }

    #[test]
    fn test_all_indices_are_slots() {
        for (i, d) in Dataset::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
        }
    }

    #[test]
    fn test_column_lists_are_static_and_unique() {
        for dataset in Dataset::ALL {
            let columns: &'static [ColumnSpec] = dataset.columns();
            assert!(!columns.is_empty(), "{} declares no columns", dataset);

            let mut names: Vec<&str> = columns.iter().map(|c| c.name).collect();
            names.sort_unstable();
            names.dedup();
            assert_eq!(names.len(), columns.len(), "{} repeats a canonical name", dataset);
        }
        assert_eq!(Dataset::CustomerData.columns()[3].aliases, &["ltv", "clv"]);
    }

    #[test]
    fn test_resolve_learning_curve_aliases() {
        let table = Table::infer(
            &["train_size", "training_score", "val_score"],
            vec![vec![100.0.into(), 0.9.into(), 0.8.into()]],
        )
        .unwrap();
        let resolved = resolve_schema(Dataset::LearningCurve, table).unwrap();
        assert_eq!(
            resolved.column_names(),
            vec!["training_size", "train_score", "validation_score"]
        );
    }

    #[test]
    fn test_canonical_name_wins_over_alias() {
        let table = Table::infer(
            &["customer_segment", "segment"],
            vec![vec![Value::text("Premium"), Value::text("A")]],
        )
        .unwrap();
        let resolved = resolve_schema(Dataset::CustomerData, table).unwrap();
        assert_eq!(resolved.column_names(), vec!["customer_segment", "segment"]);
    }

    #[test]
    fn test_correlation_index_column_named() {
        let table = Table::infer(&["", "age"], vec![vec![Value::text("age"), 1.0.into()]]).unwrap();
        let resolved = resolve_schema(Dataset::CorrelationMatrix, table).unwrap();
        assert_eq!(resolved.column_names(), vec!["variable", "age"]);
    }
}
