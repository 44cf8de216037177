//! churnlens: customer churn and purchase analysis over e-commerce transaction data
//!
//! This library loads a transaction CSV, cleans it, aggregates churn and
//! purchase statistics with Polars and renders the results with Plotters.

pub mod analysis;
pub mod cli;
pub mod data;
pub mod error;
pub mod viz;

// Re-export public items for easier access
pub use analysis::{
    age_distribution_by_churn, avg_purchase_by_category, churn_rate_by_gender,
    payment_method_preference, AgeHistogram, AnalysisReport, ChurnSeries, GroupStat,
};
pub use cli::Args;
pub use data::{clean_dataset, load_dataset, summarize, ColumnMap};
pub use error::AnalysisError;
pub use viz::generate_visualization_report;

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
