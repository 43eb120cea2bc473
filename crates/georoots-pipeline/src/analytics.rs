//! Dataset analytics for the insights and visual-report views.
//!
//! [`summarize_csv`] reads a CSV with a header row and produces:
//!
//! - row and column counts and the first [`HEAD_ROWS`] rows,
//! - a per-column summary: count, mean, sample std, min, quartiles and
//!   max for numeric columns; unique / top / freq for text columns,
//! - a pairwise Pearson correlation matrix over the numeric columns
//!   (when there are at least two),
//! - a [`HISTOGRAM_BINS`]-bin histogram of `risk_score`,
//! - the `rainfall_mm_day` / `risk_score` / `slope_angle_deg` points for
//!   the rainfall scatter plot.
//!
//! A column is numeric when every non-empty cell parses as a number;
//! empty cells and `NaN` are missing values and are skipped pairwise.

use std::collections::HashMap;
use std::fmt::Write;

use serde::Serialize;

/// Rows kept for the preview table.
pub const HEAD_ROWS: usize = 5;
/// Bins in the risk score histogram.
pub const HISTOGRAM_BINS: usize = 20;
/// Column the histogram and scatter plot are drawn from.
pub const RISK_SCORE_COLUMN: &str = "risk_score";
const RAINFALL_COLUMN: &str = "rainfall_mm_day";
const SLOPE_COLUMN: &str = "slope_angle_deg";

/// Errors reading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    /// Malformed CSV, including rows of differing length.
    #[error("failed to read CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The input has no header row.
    #[error("CSV has no columns")]
    NoColumns,
}

/// Statistics of a numeric column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumericStats {
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// 25th percentile (linear interpolation).
    pub q1: f64,
    /// Median.
    pub median: f64,
    /// 75th percentile.
    pub q3: f64,
    /// Largest value.
    pub max: f64,
}

impl NumericStats {
    /// `sorted` must be non-empty and ascending.
    #[allow(clippy::cast_precision_loss)]
    fn from_sorted(sorted: &[f64]) -> Self {
        let n = sorted.len() as f64;
        let mean = sorted.iter().sum::<f64>() / n;
        let std = (sorted.len() > 1).then(|| {
            let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
            (ss / (n - 1.0)).sqrt()
        });
        Self {
            mean,
            std,
            min: sorted[0],
            q1: quantile(sorted, 0.25),
            median: quantile(sorted, 0.5),
            q3: quantile(sorted, 0.75),
            max: sorted[sorted.len() - 1],
        }
    }
}

#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn quantile(sorted: &[f64], p: f64) -> f64 {
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    (sorted[hi] - sorted[lo]).mul_add(pos - lo as f64, sorted[lo])
}

/// Statistics of a text column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextStats {
    /// Distinct values.
    pub unique: usize,
    /// Most frequent value (first seen wins a tie).
    pub top: String,
    /// Occurrences of `top`.
    pub freq: usize,
}

/// Per-kind column statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    /// Numeric column.
    Numeric(NumericStats),
    /// Text column.
    Text(TextStats),
    /// Every cell is empty.
    Empty,
}

/// One row of the column summary table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    /// Header name.
    pub name: String,
    /// Non-missing cells.
    pub count: usize,
    /// Kind-specific statistics.
    pub stats: ColumnStats,
}

/// Pearson correlation between every pair of numeric columns.
///
/// An entry is `None` when fewer than two rows have both values or
/// either side has zero variance, so a constant column has `None` even
/// on the diagonal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Numeric column names, in file order.
    pub columns: Vec<String>,
    /// `values[i][j]` correlates `columns[i]` with `columns[j]`.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Correlation of two columns by name.
    #[must_use]
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.columns.iter().position(|c| c == a)?;
        let j = self.columns.iter().position(|c| c == b)?;
        self.values[i][j]
    }
}

/// Equal-width histogram over `[min, max]`; the last bin is closed.
///
/// When every value is the same the range is widened by 0.5 on each
/// side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    /// Lower edge of the first bin.
    pub min: f64,
    /// Upper edge of the last bin.
    pub max: f64,
    /// Values per bin.
    pub counts: Vec<u64>,
}

impl Histogram {
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn new(values: &[f64], bins: usize) -> Option<Self> {
        let lo = values.iter().copied().reduce(f64::min)?;
        let hi = values.iter().copied().reduce(f64::max)?;
        let (min, max) = if hi > lo { (lo, hi) } else { (lo - 0.5, hi + 0.5) };
        let width = (max - min) / bins as f64;
        let mut counts = vec![0; bins];
        for v in values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        Some(Self { min, max, counts })
    }

    /// Bin edges, `counts.len() + 1` of them.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn edges(&self) -> Vec<f64> {
        let bins = self.counts.len();
        let width = (self.max - self.min) / bins as f64;
        (0..=bins)
            .map(|i| width.mul_add(i as f64, self.min))
            .collect()
    }
}

/// One point of the rainfall vs risk scatter, coloured by slope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScatterPoint {
    /// x axis.
    pub rainfall_mm_day: f64,
    /// y axis.
    pub risk_score: f64,
    /// Colour scale.
    pub slope_angle_deg: f64,
}

/// Everything the dataset views show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    /// Data rows (header excluded).
    pub rows: usize,
    /// Header names in file order.
    pub column_names: Vec<String>,
    /// First rows, cells as written.
    pub head: Vec<Vec<String>>,
    /// One entry per column.
    pub columns: Vec<ColumnSummary>,
    /// `None` with fewer than two numeric columns.
    pub correlation: Option<CorrelationMatrix>,
    /// `None` unless `risk_score` is a numeric column.
    pub risk_score_histogram: Option<Histogram>,
    /// Empty unless all three scatter columns are numeric.
    pub rainfall_vs_risk: Vec<ScatterPoint>,
}

enum Values {
    Numeric(Vec<Option<f64>>),
    Text(Vec<String>),
}

struct Column {
    name: String,
    values: Values,
}

impl Column {
    fn new(name: String, cells: Vec<String>) -> Self {
        let values = parse_numeric(&cells).map_or(Values::Text(cells), Values::Numeric);
        Self { name, values }
    }

    fn numeric(&self) -> Option<&[Option<f64>]> {
        match &self.values {
            Values::Numeric(v) => Some(v),
            Values::Text(_) => None,
        }
    }

    fn summary(&self) -> ColumnSummary {
        let (count, stats) = match &self.values {
            Values::Numeric(values) => {
                let mut present: Vec<f64> = values.iter().flatten().copied().collect();
                present.sort_by(f64::total_cmp);
                (present.len(), ColumnStats::Numeric(NumericStats::from_sorted(&present)))
            }
            Values::Text(cells) => {
                let present: Vec<&str> = cells
                    .iter()
                    .map(String::as_str)
                    .filter(|c| !c.is_empty())
                    .collect();
                (present.len(), text_stats(&present))
            }
        };
        ColumnSummary {
            name: self.name.clone(),
            count,
            stats,
        }
    }
}

/// `None` unless every non-empty cell is a number and at least one is.
fn parse_numeric(cells: &[String]) -> Option<Vec<Option<f64>>> {
    let mut seen = false;
    let mut out = Vec::with_capacity(cells.len());
    for cell in cells {
        if cell.is_empty() {
            out.push(None);
            continue;
        }
        let v: f64 = cell.parse().ok()?;
        if v.is_nan() {
            out.push(None);
        } else if v.is_finite() {
            seen = true;
            out.push(Some(v));
        } else {
            return None;
        }
    }
    seen.then_some(out)
}

fn text_stats(present: &[&str]) -> ColumnStats {
    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for &cell in present {
        let n = counts.entry(cell).or_insert(0);
        if *n == 0 {
            order.push(cell);
        }
        *n += 1;
    }
    let mut top: Option<(&str, usize)> = None;
    for cell in order {
        let n = counts[cell];
        if top.is_none_or(|(_, best)| n > best) {
            top = Some((cell, n));
        }
    }
    top.map_or(ColumnStats::Empty, |(top, freq)| {
        ColumnStats::Text(TextStats {
            unique: counts.len(),
            top: top.to_owned(),
            freq,
        })
    })
}

#[allow(clippy::cast_precision_loss)]
fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy = dx.mul_add(dy, sxy);
        sxx = dx.mul_add(dx, sxx);
        syy = dy.mul_add(dy, syy);
    }
    if sxx <= 0.0 || syy <= 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

fn correlation(columns: &[Column]) -> Option<CorrelationMatrix> {
    let numeric: Vec<(&str, &[Option<f64>])> = columns
        .iter()
        .filter_map(|c| Some((c.name.as_str(), c.numeric()?)))
        .collect();
    if numeric.len() < 2 {
        return None;
    }
    let values = numeric
        .iter()
        .map(|(_, a)| numeric.iter().map(|(_, b)| pearson(a, b)).collect())
        .collect();
    Some(CorrelationMatrix {
        columns: numeric.iter().map(|(name, _)| (*name).to_owned()).collect(),
        values,
    })
}

fn scatter(columns: &[Column]) -> Vec<ScatterPoint> {
    let find = |name: &str| {
        columns
            .iter()
            .find(|c| c.name == name)
            .and_then(Column::numeric)
    };
    let (Some(rain), Some(risk), Some(slope)) =
        (find(RAINFALL_COLUMN), find(RISK_SCORE_COLUMN), find(SLOPE_COLUMN))
    else {
        return Vec::new();
    };
    rain.iter()
        .zip(risk)
        .zip(slope)
        .filter_map(|((r, s), a)| {
            Some(ScatterPoint {
                rainfall_mm_day: (*r)?,
                risk_score: (*s)?,
                slope_angle_deg: (*a)?,
            })
        })
        .collect()
}

/// Summarize CSV text.
///
/// # Errors
///
/// [`AnalyticsError::NoColumns`] for input without a header row,
/// [`AnalyticsError::Csv`] for malformed CSV.
pub fn summarize_csv(bytes: &[u8]) -> Result<DatasetSummary, AnalyticsError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let column_names: Vec<String> = reader.headers()?.iter().map(str::to_owned).collect();
    if column_names.is_empty() {
        return Err(AnalyticsError::NoColumns);
    }

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); column_names.len()];
    let mut head = Vec::new();
    let mut rows = 0;
    for record in reader.records() {
        let record = record?;
        if head.len() < HEAD_ROWS {
            head.push(record.iter().map(str::to_owned).collect());
        }
        for (column, cell) in cells.iter_mut().zip(record.iter()) {
            column.push(cell.to_owned());
        }
        rows += 1;
    }
    log::debug!("dataset: {rows} rows, {} columns", column_names.len());

    let columns: Vec<Column> = column_names
        .iter()
        .cloned()
        .zip(cells)
        .map(|(name, cells)| Column::new(name, cells))
        .collect();

    let risk_score_histogram = columns
        .iter()
        .find(|c| c.name == RISK_SCORE_COLUMN)
        .and_then(Column::numeric)
        .and_then(|values| {
            let present: Vec<f64> = values.iter().flatten().copied().collect();
            Histogram::new(&present, HISTOGRAM_BINS)
        });

    Ok(DatasetSummary {
        rows,
        head,
        columns: columns.iter().map(Column::summary).collect(),
        correlation: correlation(&columns),
        risk_score_histogram,
        rainfall_vs_risk: scatter(&columns),
        column_names,
    })
}

fn opt(v: Option<f64>) -> String {
    v.map_or_else(|| "-".to_owned(), |v| format!("{v:.3}"))
}

impl DatasetSummary {
    /// Column count.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.column_names.len()
    }

    /// Format as a plain-text report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Dataset: {} rows, {} columns\n{}",
            self.rows,
            self.column_count(),
            "=".repeat(60)
        );

        let _ = writeln!(out, "\nFirst {} rows", self.head.len());
        let _ = writeln!(out, "{}", self.column_names.join(", "));
        for row in &self.head {
            let _ = writeln!(out, "{}", row.join(", "));
        }

        let _ = writeln!(out, "\nColumn summary\n{}", "-".repeat(60));
        for col in &self.columns {
            let detail = match &col.stats {
                ColumnStats::Numeric(s) => format!(
                    "mean {:.3}  std {}  min {:.3}  25% {:.3}  50% {:.3}  75% {:.3}  max {:.3}",
                    s.mean,
                    opt(s.std),
                    s.min,
                    s.q1,
                    s.median,
                    s.q3,
                    s.max
                ),
                ColumnStats::Text(s) => {
                    format!("unique {}  top {}  freq {}", s.unique, s.top, s.freq)
                }
                ColumnStats::Empty => String::new(),
            };
            let _ = writeln!(out, "{:<20} {:>6}  {detail}", col.name, col.count);
        }

        if let Some(corr) = &self.correlation {
            let _ = writeln!(out, "\nCorrelation\n{}", "-".repeat(60));
            for (name, row) in corr.columns.iter().zip(&corr.values) {
                let cells: Vec<String> = row.iter().map(|v| format!("{:>7}", opt(*v))).collect();
                let _ = writeln!(out, "{name:<20} {}", cells.join(" "));
            }
        }

        if let Some(hist) = &self.risk_score_histogram {
            let _ = writeln!(out, "\n{RISK_SCORE_COLUMN} histogram\n{}", "-".repeat(60));
            for (edge, count) in hist.edges().windows(2).zip(&hist.counts) {
                let _ = writeln!(out, "[{:.3}, {:.3}) {count:>6}", edge[0], edge[1]);
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SITES: &str = "\
location_id,region,slope_angle_deg,rainfall_mm_day,risk_score,station
L1,North,30,10,0.10,7
L2,North,40,20,0.20,7
L3,South,50,,0.30,7
L4,East,60,40,0.40,7
";

    fn column<'a>(summary: &'a DatasetSummary, name: &str) -> &'a ColumnSummary {
        summary.columns.iter().find(|c| c.name == name).unwrap()
    }

    fn numeric(summary: &DatasetSummary, name: &str) -> NumericStats {
        match column(summary, name).stats {
            ColumnStats::Numeric(s) => s,
            ref other => unreachable!("{name} is {other:?}"),
        }
    }

    #[test]
    fn counts_and_head() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        assert_eq!(s.rows, 4);
        assert_eq!(s.column_count(), 6);
        assert_eq!(s.head.len(), 4);
        assert_eq!(s.head[2][0], "L3");
        assert!(s.report().starts_with("Dataset: 4 rows, 6 columns"));
    }

    #[test]
    fn numeric_column_describe() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        let slope = numeric(&s, "slope_angle_deg");
        assert!((slope.mean - 45.0).abs() < 1e-12);
        // Sample std of 30, 40, 50, 60.
        assert!((slope.std.unwrap() - (500.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert!((slope.min - 30.0).abs() < 1e-12);
        assert!((slope.q1 - 37.5).abs() < 1e-12);
        assert!((slope.median - 45.0).abs() < 1e-12);
        assert!((slope.q3 - 52.5).abs() < 1e-12);
        assert!((slope.max - 60.0).abs() < 1e-12);
    }

    #[test]
    fn missing_cells_are_not_counted() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        assert_eq!(column(&s, "rainfall_mm_day").count, 3);
        let rain = numeric(&s, "rainfall_mm_day");
        assert!((rain.mean - 70.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn text_column_describe() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        assert_eq!(
            column(&s, "region").stats,
            ColumnStats::Text(TextStats {
                unique: 3,
                top: "North".to_owned(),
                freq: 2,
            })
        );
        assert!(matches!(
            column(&s, "location_id").stats,
            ColumnStats::Text(TextStats { unique: 4, freq: 1, .. })
        ));
    }

    #[test]
    fn constant_column_has_zero_spread_and_no_correlation() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        let station = numeric(&s, "station");
        assert!(station.std.unwrap().abs() < f64::EPSILON);
        assert!((station.min - station.max).abs() < f64::EPSILON);

        let corr = s.correlation.unwrap();
        assert_eq!(corr.get("station", "station"), None);
        assert_eq!(corr.get("station", "risk_score"), None);
        assert_eq!(corr.get("risk_score", "station"), None);
    }

    #[test]
    fn correlation_over_numeric_columns() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        let corr = s.correlation.unwrap();
        assert_eq!(
            corr.columns,
            ["slope_angle_deg", "rainfall_mm_day", "risk_score", "station"]
        );
        assert!((corr.get("slope_angle_deg", "risk_score").unwrap() - 1.0).abs() < 1e-12);
        assert!((corr.get("risk_score", "risk_score").unwrap() - 1.0).abs() < 1e-12);
        // Pairwise: the row without rainfall is skipped, the rest are linear.
        assert!((corr.get("rainfall_mm_day", "risk_score").unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(corr.values.len(), 4);
    }

    #[test]
    fn anticorrelated_columns() {
        let csv = "a,b\n1,10\n2,8\n3,6\n";
        let corr = summarize_csv(csv.as_bytes()).unwrap().correlation.unwrap();
        assert!((corr.get("a", "b").unwrap() + 1.0).abs() < 1e-12);
    }

    #[test]
    fn single_numeric_column_has_no_matrix() {
        let csv = "region,risk_score\nN,0.1\nS,0.2\n";
        assert!(summarize_csv(csv.as_bytes()).unwrap().correlation.is_none());
    }

    #[test]
    fn risk_histogram_has_twenty_bins() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        let hist = s.risk_score_histogram.unwrap();
        assert_eq!(hist.counts.len(), HISTOGRAM_BINS);
        assert_eq!(hist.counts.iter().sum::<u64>(), 4);
        assert_eq!(hist.counts[0], 1);
        assert_eq!(hist.counts[HISTOGRAM_BINS - 1], 1);
        let edges = hist.edges();
        assert_eq!(edges.len(), HISTOGRAM_BINS + 1);
        assert!((edges[0] - 0.10).abs() < 1e-12);
        assert!((edges[HISTOGRAM_BINS] - 0.40).abs() < 1e-12);
    }

    #[test]
    fn constant_risk_scores_share_one_bin() {
        let csv = "risk_score\n0.3\n0.3\n0.3\n";
        let hist = summarize_csv(csv.as_bytes())
            .unwrap()
            .risk_score_histogram
            .unwrap();
        assert!((hist.min + 0.2).abs() < 1e-12);
        assert!((hist.max - 0.8).abs() < 1e-12);
        assert_eq!(hist.counts.iter().filter(|&&c| c > 0).count(), 1);
        assert_eq!(hist.counts.iter().sum::<u64>(), 3);
    }

    #[test]
    fn no_risk_score_column() {
        let csv = "location_id,slope_angle_deg,rainfall_mm_day\nL1,30,10\nL2,35,12\n";
        let s = summarize_csv(csv.as_bytes()).unwrap();
        assert!(s.risk_score_histogram.is_none());
        assert!(s.rainfall_vs_risk.is_empty());
        assert!(!s.report().contains("histogram"));
    }

    #[test]
    fn text_risk_score_is_not_binned() {
        let csv = "risk_score\nhigh\nlow\n";
        assert!(summarize_csv(csv.as_bytes())
            .unwrap()
            .risk_score_histogram
            .is_none());
    }

    #[test]
    fn scatter_skips_incomplete_rows() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        assert_eq!(s.rainfall_vs_risk.len(), 3);
        assert_eq!(
            s.rainfall_vs_risk[2],
            ScatterPoint {
                rainfall_mm_day: 40.0,
                risk_score: 0.40,
                slope_angle_deg: 60.0,
            }
        );
    }

    #[test]
    fn header_only_and_empty_input() {
        let s = summarize_csv(b"a,b\n").unwrap();
        assert_eq!(s.rows, 0);
        assert!(s.columns.iter().all(|c| c.stats == ColumnStats::Empty));
        assert!(summarize_csv(b"").is_err());
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let csv = "a,b\n1,2\n3\n";
        assert!(matches!(
            summarize_csv(csv.as_bytes()),
            Err(AnalyticsError::Csv(_))
        ));
    }

    #[test]
    fn summary_serializes_with_column_kinds() {
        let s = summarize_csv(SITES.as_bytes()).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["rows"], 4);
        assert_eq!(json["columns"][1]["stats"]["kind"], "text");
        assert_eq!(json["columns"][2]["stats"]["kind"], "numeric");
        assert_eq!(json["risk_score_histogram"]["counts"].as_array().unwrap().len(), 20);
    }
}
