//! Command-line interface definitions and argument parsing

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::data::ColumnMap;
use crate::error::AnalysisError;

/// Customer churn and purchase analysis over an e-commerce transaction CSV
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input CSV file (ISO-8859-1 encoded)
    #[arg(short, long, default_value = "ecommerce_customer_data_large.csv")]
    pub input: String,

    /// Directory the PNG charts are written to
    #[arg(short, long, default_value = "plots")]
    pub output_dir: String,

    /// Number of bins for the age histogram
    #[arg(short, long, default_value = "30")]
    pub bins: usize,

    /// Number of rows shown in the dataset preview
    #[arg(long, default_value = "5")]
    pub head: usize,

    /// Column holding the total purchase amount
    #[arg(long, default_value = "Total Purchase Amount")]
    pub purchase_column: String,

    /// Column holding the 0/1 churn flag
    #[arg(long, default_value = "Churn")]
    pub churn_column: String,

    /// Column holding the customer gender
    #[arg(long, default_value = "Gender")]
    pub gender_column: String,

    /// Column holding the customer age
    #[arg(long, default_value = "Age")]
    pub age_column: String,

    /// Column holding the product category
    #[arg(long, default_value = "Product Category")]
    pub category_column: String,

    /// Column holding the payment method
    #[arg(long, default_value = "Payment Method")]
    pub payment_column: String,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Build the column mapping used by cleaning and analysis
    pub fn column_map(&self) -> ColumnMap {
        ColumnMap {
            purchase_amount: self.purchase_column.clone(),
            churn: self.churn_column.clone(),
            gender: self.gender_column.clone(),
            age: self.age_column.clone(),
            product_category: self.category_column.clone(),
            payment_method: self.payment_column.clone(),
            ..ColumnMap::default()
        }
    }

    /// Validate numeric arguments before any work starts
    pub fn validate(&self) -> crate::Result<()> {
        if self.bins == 0 {
            return Err(AnalysisError::InvalidBins(self.bins).into());
        }
        Ok(())
    }

    pub fn input_path(&self) -> &Path {
        Path::new(&self.input)
    }

    pub fn chart_dir(&self) -> PathBuf {
        PathBuf::from(&self.output_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_dataset_layout() {
        let args = Args::parse_from(["churnlens"]);

        assert_eq!(args.input, "ecommerce_customer_data_large.csv");
        assert_eq!(args.bins, 30);
        assert_eq!(args.head, 5);
        assert!(!args.verbose);

        let columns = args.column_map();
        assert_eq!(columns, ColumnMap::default());
    }

    #[test]
    fn test_column_overrides() {
        let args = Args::parse_from([
            "churnlens",
            "--gender-column",
            "Sex",
            "--category-column",
            "Product C",
        ]);

        let columns = args.column_map();
        assert_eq!(columns.gender, "Sex");
        assert_eq!(columns.product_category, "Product C");
        assert_eq!(columns.churn, "Churn");
    }

    #[test]
    fn test_zero_bins_rejected() {
        let args = Args::parse_from(["churnlens", "--bins", "0"]);
        let err = args.validate().unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::InvalidBins(0))
        ));
    }
}
