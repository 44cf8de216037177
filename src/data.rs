//! Data loading, type inference and cleaning using Polars

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::AnalysisError;

/// Names of the columns the cleaning and analysis steps read
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    pub purchase_amount: String,
    pub churn: String,
    pub gender: String,
    pub age: String,
    pub product_category: String,
    pub payment_method: String,
    /// Date column candidates to drop, first match wins
    pub dropped_date: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            purchase_amount: "Total Purchase Amount".to_string(),
            churn: "Churn".to_string(),
            gender: "Gender".to_string(),
            age: "Age".to_string(),
            product_category: "Product Category".to_string(),
            payment_method: "Payment Method".to_string(),
            dropped_date: vec!["Purchase Date".to_string(), "Purchase".to_string()],
        }
    }
}

/// Cell values read as missing, matched after trimming
pub const MISSING_TOKENS: [&str; 19] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null", "",
];

/// Per-column summary shown after loading
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub non_null: usize,
    pub dtype: DataType,
}

/// Load a delimited file into a DataFrame
///
/// The file is decoded as ISO-8859-1, header names are stripped of
/// surrounding whitespace and records with more fields than the header are
/// skipped. Short records are padded with nulls.
///
/// # Arguments
/// * `file_path` - Path to the CSV file
///
/// # Returns
/// * `DataFrame` with inferred `Int64`, `Float64` or `String` columns
pub fn load_dataset(file_path: impl AsRef<Path>) -> crate::Result<DataFrame> {
    let file_path = file_path.as_ref();
    let bytes = match fs::read(file_path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(AnalysisError::InputNotFound(file_path.to_path_buf()).into());
        }
        Err(err) => {
            return Err(anyhow::Error::new(err)
                .context(format!("Failed to read '{}'", file_path.display())));
        }
    };

    let text = decode_latin1(&bytes);
    let df = parse_records(&text)?;

    info!(
        file = %file_path.display(),
        rows = df.height(),
        columns = df.width(),
        "Dataset loaded successfully"
    );

    Ok(df)
}

/// Map every byte to the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Parse CSV text into a typed DataFrame
pub fn parse_records(text: &str) -> crate::Result<DataFrame> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = dedupe_headers(reader.headers()?.iter());
    let width = headers.len();

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    let mut skipped = 0usize;

    for (index, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) => {
                debug!(record = index + 1, error = %err, "Skipping unreadable record");
                skipped += 1;
                continue;
            }
        };

        if record.len() > width {
            debug!(
                record = index + 1,
                fields = record.len(),
                expected = width,
                "Skipping record with too many fields"
            );
            skipped += 1;
            continue;
        }

        for (i, column) in values.iter_mut().enumerate() {
            let value = record
                .get(i)
                .filter(|v| !is_missing(v))
                .map(str::to_owned);
            column.push(value);
        }
    }

    if skipped > 0 {
        warn!(skipped, "Skipped malformed records while loading");
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(values)
        .map(|(name, column)| infer_column(name, column))
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// Strip whitespace from every column name
///
/// Duplicate names get a numeric suffix so the frame stays valid.
fn dedupe_headers<'a>(raw: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.map(|name| {
        let name = name.trim().to_string();
        let count = seen.entry(name.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            name
        } else {
            format!("{}.{}", name, *count - 1)
        }
    })
    .collect()
}

/// Pick the narrowest type that every non-null value parses as
fn infer_column(name: &str, values: Vec<Option<String>>) -> Column {
    if values.iter().all(Option::is_none) {
        return Series::new(name.into(), values).into();
    }

    if values
        .iter()
        .flatten()
        .all(|v| v.trim().parse::<i64>().is_ok())
    {
        let parsed: Vec<Option<i64>> = values
            .iter()
            .map(|v| v.as_deref().and_then(|s| s.trim().parse().ok()))
            .collect();
        return Series::new(name.into(), parsed).into();
    }

    if values.iter().flatten().all(|v| parse_number(v).is_some()) {
        let parsed: Vec<Option<f64>> = values
            .iter()
            .map(|v| v.as_deref().and_then(parse_number))
            .collect();
        return Series::new(name.into(), parsed).into();
    }

    Series::new(name.into(), values).into()
}

pub fn is_missing(raw: &str) -> bool {
    MISSING_TOKENS.contains(&raw.trim())
}

/// Lenient numeric parse: surrounding whitespace allowed, non-finite results are `None`
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

pub fn require_column(df: &DataFrame, name: &str) -> crate::Result<()> {
    if has_column(df, name) {
        Ok(())
    } else {
        Err(AnalysisError::MissingColumn(name.to_string()).into())
    }
}

/// Collect name, non-null count and dtype for every column
pub fn column_info(df: &DataFrame) -> Vec<ColumnInfo> {
    df.get_columns()
        .iter()
        .map(|column| ColumnInfo {
            name: column.name().to_string(),
            non_null: column.len() - column.null_count(),
            dtype: column.dtype().clone(),
        })
        .collect()
}

/// Print a preview of the first rows and a per-column overview
pub fn summarize(df: &DataFrame, rows: usize) {
    println!("\n--- Initial Dataset Info ---");
    println!("{}", df.head(Some(rows)));

    println!("\nRangeIndex: {} entries", df.height());
    println!("Data columns (total {} columns):", df.width());
    println!("  #  | {:<28} | {:>14} | Dtype", "Column", "Non-Null Count");
    println!("  ---|-{:-<28}-|-{:->14}-|------", "", "");
    for (i, info) in column_info(df).iter().enumerate() {
        println!(
            "  {:<2} | {:<28} | {:>14} | {}",
            i, info.name, info.non_null, info.dtype
        );
    }
}

/// Coerce the purchase amount to numbers, drop unparseable rows and the date column
///
/// # Arguments
/// * `df` - Freshly loaded dataset
/// * `columns` - Column names to operate on
///
/// # Returns
/// * Cleaned `DataFrame` whose purchase amount is a null-free `Float64`
pub fn clean_dataset(df: DataFrame, columns: &ColumnMap) -> crate::Result<DataFrame> {
    let purchase = columns.purchase_amount.as_str();
    require_column(&df, purchase)?;

    let before = df.height();
    let mut df = coerce_numeric(df, purchase)?
        .lazy()
        .filter(col(purchase).is_not_null())
        .collect()?;

    let dropped = before - df.height();
    if dropped > 0 {
        info!(dropped, column = purchase, "Dropped rows with non-numeric values");
    }

    if let Some(date) = columns
        .dropped_date
        .iter()
        .find(|name| has_column(&df, name.as_str()))
    {
        df = df.drop(date.as_str())?;
        debug!(column = %date, "Dropped date column");
    }

    if df.height() == 0 {
        warn!("No rows left after cleaning");
    }

    Ok(df)
}

/// Replace a column with its `Float64` coercion, invalid values become null
pub fn coerce_numeric(mut df: DataFrame, name: &str) -> crate::Result<DataFrame> {
    let column = df.column(name)?;
    let coerced: Column = match column.dtype() {
        DataType::String => {
            let values: Vec<Option<f64>> = column
                .as_materialized_series()
                .str()?
                .into_iter()
                .map(|v| v.and_then(parse_number))
                .collect();
            Series::new(name.into(), values).into()
        }
        _ => column.cast(&DataType::Float64)?,
    };

    df.with_column(coerced)?;
    Ok(df)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, " Customer ID , Purchase Date,Product Category ,Total Purchase Amount,Payment Method,Age,Gender,Churn").unwrap();
        writeln!(file, "44605,2023-05-03,Home,2740,PayPal,31,Male,0").unwrap();
        writeln!(file, "44605,2021-05-16,Electronics,3338,Credit Card,31,Male,1").unwrap();
        writeln!(file, "13738,2020-11-30,Books,abc,Cash,27,Female,0").unwrap();
        writeln!(file, "13738,2022-01-11,Clothing,1245.5,Cash,27,Female,1").unwrap();
        file
    }

    #[test]
    fn test_load_dataset_strips_column_names() {
        let test_file = create_test_csv();
        let df = load_dataset(test_file.path()).unwrap();

        let names: Vec<String> = df
            .get_column_names()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert!(names.iter().all(|n| n.trim() == n));
        assert!(names.contains(&"Customer ID".to_string()));
        assert!(names.contains(&"Product Category".to_string()));
        assert_eq!(df.height(), 4);
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let err = load_dataset("definitely_missing_input.csv").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::InputNotFound(_))
        ));
    }

    #[test]
    fn test_type_inference() {
        let df = parse_records("a,b,c,d\n1,1.5,x,\n2,3,y,\n").unwrap();

        assert_eq!(df.column("a").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Float64);
        assert_eq!(df.column("c").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("d").unwrap().null_count(), 2);
    }

    #[test]
    fn test_overlong_records_skipped_short_records_padded() {
        let df = parse_records("a,b,c\n1,2,3\n4,5,6,7\n8,9\n").unwrap();

        assert_eq!(df.height(), 2);
        let c = df.column("c").unwrap();
        assert_eq!(c.null_count(), 1);
    }

    #[test]
    fn test_latin1_decoding() {
        let bytes = b"Name,Age\nJos\xe9,40\n";
        let text = decode_latin1(bytes);
        assert_eq!(text, "Name,Age\nJos\u{e9},40\n");

        let df = parse_records(&text).unwrap();
        let name = df.column("Name").unwrap();
        let value = name.as_materialized_series().str().unwrap().get(0);
        assert_eq!(value, Some("Jos\u{e9}"));
    }

    #[test]
    fn test_duplicate_headers_get_suffix() {
        let df = parse_records("x, x ,y\n1,2,3\n").unwrap();
        assert!(has_column(&df, "x"));
        assert!(has_column(&df, "x.1"));
    }

    #[test]
    fn test_clean_dataset_drops_non_numeric_purchases() {
        let test_file = create_test_csv();
        let df = load_dataset(test_file.path()).unwrap();
        let cleaned = clean_dataset(df, &ColumnMap::default()).unwrap();

        assert_eq!(cleaned.height(), 3);
        let purchase = cleaned.column("Total Purchase Amount").unwrap();
        assert_eq!(purchase.dtype(), &DataType::Float64);
        assert_eq!(purchase.null_count(), 0);
        assert!(!has_column(&cleaned, "Purchase Date"));
    }

    #[test]
    fn test_clean_dataset_drops_fallback_date_column() {
        let df = parse_records("Purchase,Total Purchase Amount\n2023,10\n").unwrap();
        let cleaned = clean_dataset(df, &ColumnMap::default()).unwrap();

        assert!(!has_column(&cleaned, "Purchase"));
        assert_eq!(cleaned.width(), 1);
    }

    #[test]
    fn test_clean_dataset_requires_purchase_column() {
        let df = parse_records("Gender,Churn\nMale,0\n").unwrap();
        let err = clean_dataset(df, &ColumnMap::default()).unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AnalysisError>(),
            Some(AnalysisError::MissingColumn(name)) if name == "Total Purchase Amount"
        ));
    }

    #[test]
    fn test_missing_tokens_become_null() {
        let df = parse_records(
            "Product Category,Total Purchase Amount,Gender,Churn\n\
             Home,100,Female,0\n\
             Books,NaN,Male,1\n\
             Toys,200,NA,nan\n\
             Garden,nan,Female,1\n\
             Tools,300,Male,N/A\n",
        )
        .unwrap();

        assert_eq!(df.column("Total Purchase Amount").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Total Purchase Amount").unwrap().null_count(), 2);
        assert_eq!(df.column("Gender").unwrap().null_count(), 1);
        assert_eq!(df.column("Churn").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("Churn").unwrap().null_count(), 2);

        let cleaned = clean_dataset(df, &ColumnMap::default()).unwrap();
        assert_eq!(cleaned.height(), 3);
        let purchase = cleaned.column("Total Purchase Amount").unwrap();
        assert_eq!(purchase.null_count(), 0);
        let values = purchase.as_materialized_series().f64().unwrap();
        assert!(values.into_iter().flatten().all(f64::is_finite));
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert_eq!(parse_number(" 12.5 "), Some(12.5));
        assert_eq!(parse_number("inf"), None);
        assert_eq!(parse_number("NaN"), None);
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn test_column_info_counts_non_null() {
        let df = parse_records("a,b\n1,\n2,x\n").unwrap();
        let info = column_info(&df);

        assert_eq!(info.len(), 2);
        assert_eq!(info[0].non_null, 2);
        assert_eq!(info[1].non_null, 1);
    }
}
