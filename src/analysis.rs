//! Group aggregations and distribution estimates over the cleaned dataset

use std::collections::BTreeMap;
use std::f64::consts::PI;

use ndarray::Array1;
use polars::prelude::*;
use tracing::{debug, warn};

use crate::data::{has_column, require_column, ColumnMap};
use crate::error::AnalysisError;

const LABEL: &str = "label";
const VALUE: &str = "value";
const COUNT: &str = "count";

/// Number of evaluation points for each density curve
const KDE_POINTS: usize = 200;

/// One row of a grouped aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStat {
    pub label: String,
    pub value: f64,
    pub count: usize,
}

/// Histogram and density curve for a single churn value
#[derive(Debug, Clone, PartialEq)]
pub struct ChurnSeries {
    pub churn: i64,
    pub counts: Vec<usize>,
    /// (age, expected count) points, scaled to the histogram
    pub kde: Vec<(f64, f64)>,
}

/// Age histogram split by churn status, sharing one set of bin edges
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgeHistogram {
    pub edges: Vec<f64>,
    pub series: Vec<ChurnSeries>,
}

impl AgeHistogram {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn bin_width(&self) -> f64 {
        match (self.edges.first(), self.edges.last()) {
            (Some(lo), Some(hi)) if self.edges.len() > 1 => (hi - lo) / (self.edges.len() - 1) as f64,
            _ => 0.0,
        }
    }

    /// Total observations across all series
    pub fn total(&self) -> usize {
        self.series.iter().flat_map(|s| s.counts.iter()).sum()
    }

    /// Height of the tallest stacked bar
    pub fn max_stacked_count(&self) -> usize {
        let bins = self.edges.len().saturating_sub(1);
        (0..bins)
            .map(|i| self.series.iter().map(|s| s.counts[i]).sum::<usize>())
            .max()
            .unwrap_or(0)
    }
}

/// Every aggregation the report renders
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub churn_by_gender: Vec<GroupStat>,
    pub age_distribution: AgeHistogram,
    pub avg_purchase_by_category: Vec<GroupStat>,
    /// `None` when the dataset has no payment method column
    pub payment_preference: Option<Vec<GroupStat>>,
}

impl AnalysisReport {
    pub fn build(df: &DataFrame, columns: &ColumnMap, bins: usize) -> crate::Result<Self> {
        let churn_by_gender = churn_rate_by_gender(df, columns)?;
        let age_distribution = age_distribution_by_churn(df, columns, bins)?;
        let avg_purchase_by_category = avg_purchase_by_category(df, columns)?;

        let payment_preference = if has_column(df, &columns.payment_method) {
            Some(payment_method_preference(df, columns)?)
        } else {
            warn!(
                column = %columns.payment_method,
                "Payment method column not found, skipping payment analysis"
            );
            None
        };

        Ok(Self {
            churn_by_gender,
            age_distribution,
            avg_purchase_by_category,
            payment_preference,
        })
    }
}

/// Churn rate in percent per gender, ordered by gender label
///
/// # Arguments
/// * `df` - Cleaned dataset
/// * `columns` - Column names for gender and churn
///
/// # Returns
/// * One `GroupStat` per gender; `value` is the mean churn flag times 100
pub fn churn_rate_by_gender(df: &DataFrame, columns: &ColumnMap) -> crate::Result<Vec<GroupStat>> {
    let gender = columns.gender.as_str();
    let churn = columns.churn.as_str();
    require_column(df, gender)?;
    require_column(df, churn)?;

    let out = df
        .clone()
        .lazy()
        .filter(col(gender).is_not_null().and(col(churn).is_not_null()))
        .group_by([col(gender).cast(DataType::String).alias(LABEL)])
        .agg([
            (col(churn).cast(DataType::Float64).mean() * lit(100.0)).alias(VALUE),
            col(churn).count().alias(COUNT),
        ])
        .sort([LABEL], SortMultipleOptions::default())
        .collect()?;

    let stats = collect_group_stats(&out)?;
    debug!(groups = stats.len(), "Computed churn rate by gender");
    Ok(stats)
}

/// Mean purchase amount per product category, highest first
pub fn avg_purchase_by_category(df: &DataFrame, columns: &ColumnMap) -> crate::Result<Vec<GroupStat>> {
    let category = columns.product_category.as_str();
    let purchase = columns.purchase_amount.as_str();
    require_column(df, category)?;
    require_column(df, purchase)?;

    let out = df
        .clone()
        .lazy()
        .filter(col(category).is_not_null().and(col(purchase).is_not_null()))
        .group_by([col(category).cast(DataType::String).alias(LABEL)])
        .agg([
            col(purchase).cast(DataType::Float64).mean().alias(VALUE),
            col(purchase).count().alias(COUNT),
        ])
        .sort(
            [VALUE, LABEL],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    let stats = collect_group_stats(&out)?;
    debug!(groups = stats.len(), "Computed average purchase by category");
    Ok(stats)
}

/// Share of transactions per payment method in percent, most used first
pub fn payment_method_preference(
    df: &DataFrame,
    columns: &ColumnMap,
) -> crate::Result<Vec<GroupStat>> {
    let payment = columns.payment_method.as_str();
    require_column(df, payment)?;

    let column = df.column(payment)?;
    let total = column.len() - column.null_count();
    if total == 0 {
        return Ok(Vec::new());
    }

    let out = df
        .clone()
        .lazy()
        .filter(col(payment).is_not_null())
        .group_by([col(payment).cast(DataType::String).alias(LABEL)])
        .agg([col(payment).count().alias(COUNT)])
        .with_column(
            (col(COUNT).cast(DataType::Float64) / lit(total as f64) * lit(100.0)).alias(VALUE),
        )
        .sort(
            [COUNT, LABEL],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    collect_group_stats(&out)
}

/// Turn a `label`/`value`/`count` frame into plain rows
fn collect_group_stats(out: &DataFrame) -> crate::Result<Vec<GroupStat>> {
    let labels = out.column(LABEL)?;
    let labels = labels.as_materialized_series().str()?;
    let values = out.column(VALUE)?.cast(&DataType::Float64)?;
    let values = values.as_materialized_series().f64()?;
    let counts = out.column(COUNT)?.cast(&DataType::UInt64)?;
    let counts = counts.as_materialized_series().u64()?;

    let stats = labels
        .into_iter()
        .zip(values.into_iter())
        .zip(counts.into_iter())
        .filter_map(|((label, value), count)| {
            Some(GroupStat {
                label: label?.to_string(),
                value: value?,
                count: count.unwrap_or(0) as usize,
            })
        })
        .collect();

    Ok(stats)
}

/// Stacked age histogram per churn value with density curves
///
/// Bins span `[min age, max age]` with equal width; the last bin is closed.
/// Rows missing either age or churn are ignored.
pub fn age_distribution_by_churn(
    df: &DataFrame,
    columns: &ColumnMap,
    bins: usize,
) -> crate::Result<AgeHistogram> {
    if bins == 0 {
        return Err(AnalysisError::InvalidBins(bins).into());
    }
    require_column(df, &columns.age)?;
    require_column(df, &columns.churn)?;

    let ages = float_values(df, &columns.age)?;
    let churn = float_values(df, &columns.churn)?;

    let mut groups: BTreeMap<i64, Vec<f64>> = BTreeMap::new();
    for (age, flag) in ages.into_iter().zip(churn) {
        if let (Some(age), Some(flag)) = (age, flag) {
            if age.is_finite() && flag.is_finite() {
                groups.entry(flag.round() as i64).or_default().push(age);
            }
        }
    }

    let all_ages = groups.values().flatten();
    let lo = all_ages.clone().fold(f64::INFINITY, |a, &b| a.min(b));
    let hi = all_ages.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    if !lo.is_finite() || !hi.is_finite() {
        return Ok(AgeHistogram::default());
    }

    let (lo, hi) = if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) };
    let edges = Array1::linspace(lo, hi, bins + 1).to_vec();
    let bin_width = (hi - lo) / bins as f64;
    let grid = Array1::linspace(lo, hi, KDE_POINTS);

    let series = groups
        .into_iter()
        .map(|(churn, ages)| ChurnSeries {
            churn,
            counts: bin_counts(&ages, lo, hi, bins),
            kde: gaussian_kde(&ages, &grid, ages.len() as f64 * bin_width),
        })
        .collect();

    Ok(AgeHistogram { edges, series })
}

fn float_values(df: &DataFrame, name: &str) -> crate::Result<Vec<Option<f64>>> {
    let column = df.column(name)?.cast(&DataType::Float64)?;
    let values = column.as_materialized_series().f64()?.into_iter().collect();
    Ok(values)
}

fn bin_counts(samples: &[f64], lo: f64, hi: f64, bins: usize) -> Vec<usize> {
    let mut counts = vec![0; bins];
    let span = hi - lo;
    for &x in samples {
        let index = (((x - lo) / span) * bins as f64).floor() as usize;
        counts[index.min(bins - 1)] += 1;
    }
    counts
}

/// Gaussian kernel density with Scott's bandwidth, multiplied by `scale`
///
/// Returns an empty curve for fewer than two samples or zero variance.
pub fn gaussian_kde(samples: &[f64], grid: &Array1<f64>, scale: f64) -> Vec<(f64, f64)> {
    let n = samples.len();
    if n < 2 {
        return Vec::new();
    }

    let data = Array1::from(samples.to_vec());
    let std = data.std(1.0);
    if std.is_nan() || std <= 0.0 {
        return Vec::new();
    }

    let bandwidth = std * (n as f64).powf(-0.2);
    let norm = 1.0 / (n as f64 * bandwidth * (2.0 * PI).sqrt());

    grid.iter()
        .map(|&x| {
            let density: f64 = data
                .iter()
                .map(|&s| {
                    let z = (x - s) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (x, density * scale)
        })
        .collect()
}
