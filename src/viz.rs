//! Chart rendering with Plotters and console statistics

use std::fs;
use std::path::{Path, PathBuf};

use plotters::prelude::*;
use tracing::{info, warn};

use crate::analysis::{AgeHistogram, AnalysisReport, GroupStat};
use crate::error::AnalysisError;

/// Pastel palette for the gender bars
const PASTEL_COLORS: [RGBColor; 6] = [
    RGBColor(161, 201, 244),
    RGBColor(255, 180, 130),
    RGBColor(141, 229, 161),
    RGBColor(255, 159, 155),
    RGBColor(208, 187, 255),
    RGBColor(222, 187, 155),
];

/// Samples of the viridis colormap, dark to light
const VIRIDIS_COLORS: [RGBColor; 8] = [
    RGBColor(68, 1, 84),
    RGBColor(70, 50, 126),
    RGBColor(54, 92, 141),
    RGBColor(39, 127, 142),
    RGBColor(31, 161, 135),
    RGBColor(74, 193, 109),
    RGBColor(160, 218, 57),
    RGBColor(253, 231, 37),
];

const SKY_BLUE: RGBColor = RGBColor(135, 206, 235);
const SALMON: RGBColor = RGBColor(250, 128, 114);

pub const CHURN_BY_GENDER_FILE: &str = "churn_by_gender.png";
pub const AGE_DISTRIBUTION_FILE: &str = "age_distribution_by_churn.png";
pub const CATEGORY_FILE: &str = "avg_purchase_by_category.png";
pub const PAYMENT_FILE: &str = "payment_method_preference.png";

fn churn_color(churn: i64) -> RGBColor {
    match churn {
        0 => SKY_BLUE,
        1 => SALMON,
        other => PASTEL_COLORS[other.unsigned_abs() as usize % PASTEL_COLORS.len()],
    }
}

fn churn_label(churn: i64) -> String {
    match churn {
        0 => "No Churn (0)".to_string(),
        1 => "Churn (1)".to_string(),
        other => format!("Churn ({})", other),
    }
}

/// Spread `n` picks evenly over the viridis samples
fn viridis(index: usize, n: usize) -> RGBColor {
    let last = VIRIDIS_COLORS.len() - 1;
    let position = if n > 1 { index * last / (n - 1) } else { last / 2 };
    VIRIDIS_COLORS[position.min(last)]
}

/// Layout of a categorical bar chart
struct BarChartStyle<'a> {
    title: &'a str,
    x_desc: &'a str,
    y_desc: &'a str,
    size: (u32, u32),
    y_max: f64,
    vertical_labels: bool,
}

/// Render one bar per group, in the given order
fn draw_bar_chart(
    stats: &[GroupStat],
    output_path: &Path,
    style: &BarChartStyle<'_>,
    color_for: impl Fn(usize) -> RGBColor,
) -> crate::Result<()> {
    let labels: Vec<String> = stats.iter().map(|s| s.label.clone()).collect();

    let root = BitMapBackend::new(output_path, style.size).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(style.title, ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(if style.vertical_labels { 130 } else { 45 })
        .y_label_area_size(70)
        .build_cartesian_2d((0..stats.len()).into_segmented(), 0f64..style.y_max)?;

    let label_style = if style.vertical_labels {
        ("sans-serif", 13).into_font().transform(FontTransform::Rotate90)
    } else {
        ("sans-serif", 13).into_font()
    };

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(stats.len())
        .x_label_style(label_style)
        .x_label_formatter(&|value| match value {
            SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
            _ => String::new(),
        })
        .x_desc(style.x_desc)
        .y_desc(style.y_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for (i, stat) in stats.iter().enumerate() {
        let color = color_for(i);
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), stat.value)],
            color.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        chart.draw_series(std::iter::once(bar))?;
    }

    root.present()?;
    Ok(())
}

/// Bar chart of churn rate per gender
///
/// The y axis runs from 0 to 1.2 times the highest rate.
pub fn create_churn_by_gender_chart(stats: &[GroupStat], output_path: &Path) -> crate::Result<()> {
    if stats.is_empty() {
        return Err(AnalysisError::EmptyGroup("churn rate by gender").into());
    }

    let max_rate = stats.iter().map(|s| s.value).fold(0.0, f64::max);
    let y_max = if max_rate > 0.0 { max_rate * 1.2 } else { 1.0 };

    draw_bar_chart(
        stats,
        output_path,
        &BarChartStyle {
            title: "Churn Rate by Gender",
            x_desc: "Gender",
            y_desc: "Churn Rate (%)",
            size: (600, 500),
            y_max,
            vertical_labels: false,
        },
        |i| PASTEL_COLORS[i % PASTEL_COLORS.len()],
    )?;

    info!(path = %output_path.display(), "Churn rate chart saved");
    Ok(())
}

/// Stacked age histogram by churn status with density overlays
pub fn create_age_distribution_chart(
    histogram: &AgeHistogram,
    output_path: &Path,
) -> crate::Result<()> {
    let (lo, hi) = match (histogram.edges.first(), histogram.edges.last()) {
        (Some(&lo), Some(&hi)) if !histogram.is_empty() => (lo, hi),
        _ => return Err(AnalysisError::EmptyGroup("age distribution").into()),
    };
    let bins = histogram.edges.len() - 1;

    // Stack the density curves the same way as the bars
    let grid_len = histogram.series.iter().map(|s| s.kde.len()).max().unwrap_or(0);
    let mut kde_base = vec![0.0; grid_len];
    let mut stacked_kde: Vec<Vec<(f64, f64)>> = Vec::with_capacity(histogram.series.len());
    for series in &histogram.series {
        let curve: Vec<(f64, f64)> = series
            .kde
            .iter()
            .enumerate()
            .map(|(i, &(x, y))| {
                kde_base[i] += y;
                (x, kde_base[i])
            })
            .collect();
        stacked_kde.push(curve);
    }

    let kde_max = kde_base.iter().copied().fold(0.0, f64::max);
    let y_max = (histogram.max_stacked_count() as f64).max(kde_max).max(1.0) * 1.1;

    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Age Distribution of Customers by Churn Status", ("sans-serif", 26))
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0f64..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Age")
        .y_desc("Count")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let mut bar_base = vec![0usize; bins];
    for series in &histogram.series {
        let color = churn_color(series.churn);
        let bars: Vec<Rectangle<(f64, f64)>> = series
            .counts
            .iter()
            .enumerate()
            .filter(|&(_, &count)| count > 0)
            .map(|(i, &count)| {
                let bottom = bar_base[i] as f64;
                let top = (bar_base[i] + count) as f64;
                bar_base[i] += count;
                Rectangle::new(
                    [(histogram.edges[i], bottom), (histogram.edges[i + 1], top)],
                    color.mix(0.8).filled(),
                )
            })
            .collect();

        chart
            .draw_series(bars)?
            .label(churn_label(series.churn))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
    }

    for (series, curve) in histogram.series.iter().zip(stacked_kde) {
        if curve.is_empty() {
            continue;
        }
        let color = churn_color(series.churn);
        chart.draw_series(LineSeries::new(curve, color.stroke_width(2)))?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    info!(path = %output_path.display(), "Age distribution chart saved");

    Ok(())
}

/// Bar chart of average purchase per category in the given order
pub fn create_category_chart(stats: &[GroupStat], output_path: &Path) -> crate::Result<()> {
    if stats.is_empty() {
        return Err(AnalysisError::EmptyGroup("average purchase by category").into());
    }

    let max_value = stats.iter().map(|s| s.value).fold(0.0, f64::max);
    let n = stats.len();

    draw_bar_chart(
        stats,
        output_path,
        &BarChartStyle {
            title: "Average Purchase Value by Product Category",
            x_desc: "Product Category",
            y_desc: "Average Total Purchase Amount",
            size: (1000, 500),
            y_max: if max_value > 0.0 { max_value * 1.1 } else { 1.0 },
            vertical_labels: true,
        },
        |i| viridis(i, n),
    )?;

    info!(path = %output_path.display(), "Category chart saved");
    Ok(())
}

/// Bar chart of transaction share per payment method
pub fn create_payment_method_chart(stats: &[GroupStat], output_path: &Path) -> crate::Result<()> {
    if stats.is_empty() {
        return Err(AnalysisError::EmptyGroup("payment method preference").into());
    }

    let max_share = stats.iter().map(|s| s.value).fold(0.0, f64::max);

    draw_bar_chart(
        stats,
        output_path,
        &BarChartStyle {
            title: "Payment Method Preference",
            x_desc: "Payment Method",
            y_desc: "Share of Transactions (%)",
            size: (800, 500),
            y_max: (max_share * 1.2).clamp(1.0, 100.0),
            vertical_labels: false,
        },
        |i| PASTEL_COLORS[i % PASTEL_COLORS.len()],
    )?;

    info!(path = %output_path.display(), "Payment method chart saved");
    Ok(())
}

fn print_group_table(title: &str, label_header: &str, value_header: &str, stats: &[GroupStat]) {
    println!("\n--- {} ---", title);
    println!("  {:<24} | {:>14} | {:>8}", label_header, value_header, "Rows");
    println!("  {:-<24}-|-{:->14}-|-{:->8}", "", "", "");
    for stat in stats {
        println!("  {:<24} | {:>14.2} | {:>8}", stat.label, stat.value, stat.count);
    }
}

/// Print every aggregation of the report to the console
pub fn print_report_statistics(report: &AnalysisReport) {
    print_group_table(
        "Churn Rate by Gender",
        "Gender",
        "Churn Rate %",
        &report.churn_by_gender,
    );

    let histogram = &report.age_distribution;
    println!("\n--- Age Distribution by Churn Status ---");
    if histogram.is_empty() {
        println!("  No rows with both age and churn values");
    } else {
        println!(
            "  {} bins of width {:.2} from {:.1} to {:.1}",
            histogram.edges.len() - 1,
            histogram.bin_width(),
            histogram.edges[0],
            histogram.edges[histogram.edges.len() - 1]
        );
        for series in &histogram.series {
            println!(
                "  {:<14} {} customers",
                churn_label(series.churn),
                series.counts.iter().sum::<usize>()
            );
        }
    }

    print_group_table(
        "Average Purchase Value by Product Category",
        "Product Category",
        "Avg Purchase",
        &report.avg_purchase_by_category,
    );

    if let Some(payment) = &report.payment_preference {
        print_group_table(
            "Payment Method Preference",
            "Payment Method",
            "Share %",
            payment,
        );
    }
}

/// Write every chart of the report into `output_dir`
///
/// Charts without data are skipped with a warning.
///
/// # Returns
/// * Paths of the files that were written
pub fn generate_visualization_report(
    report: &AnalysisReport,
    output_dir: &Path,
) -> crate::Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    if report.churn_by_gender.is_empty() {
        warn!("No gender groups to plot");
    } else {
        let path = output_dir.join(CHURN_BY_GENDER_FILE);
        create_churn_by_gender_chart(&report.churn_by_gender, &path)?;
        written.push(path);
    }

    if report.age_distribution.is_empty() {
        warn!("No ages to plot");
    } else {
        let path = output_dir.join(AGE_DISTRIBUTION_FILE);
        create_age_distribution_chart(&report.age_distribution, &path)?;
        written.push(path);
    }

    if report.avg_purchase_by_category.is_empty() {
        warn!("No product categories to plot");
    } else {
        let path = output_dir.join(CATEGORY_FILE);
        create_category_chart(&report.avg_purchase_by_category, &path)?;
        written.push(path);
    }

    match &report.payment_preference {
        Some(stats) if !stats.is_empty() => {
            let path = output_dir.join(PAYMENT_FILE);
            create_payment_method_chart(stats, &path)?;
            written.push(path);
        }
        Some(_) => warn!("No payment methods to plot"),
        None => {}
    }

    print_report_statistics(report);

    Ok(written)
}
