//! Site dataset loading and stratified sampling.
//!
//! The dataset is a CSV file with a header row. Only four columns are
//! read (`alert_level`, `region`, `location_id`, `factor_of_safety`);
//! any others are ignored. Rows whose alert level is not Low, Medium or
//! High are skipped.

use std::io;
use std::path::Path;

use log::{debug, info};
use rand::Rng;
use serde::Deserialize;

use georoots_pipeline::AlertLevel;

/// How many rows of each level the scene samples, in spawn order.
pub const SAMPLE_QUOTAS: [(AlertLevel, usize); 3] = [
    (AlertLevel::Low, 40),
    (AlertLevel::Medium, 30),
    (AlertLevel::High, 20),
];

/// One monitored location.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteRecord {
    /// Recorded alert level.
    pub alert_level: AlertLevel,
    /// Region name.
    pub region: String,
    /// Location identifier as written in the file.
    pub location_id: String,
    /// Factor of safety at the location.
    pub factor_of_safety: f64,
}

impl SiteRecord {
    /// Report line shown when a rock from this site lands.
    #[must_use]
    pub fn rockfall_report(&self) -> String {
        format!(
            "Rockfall at Location {} | Region: {} | FoS: {:.2}",
            self.location_id, self.region, self.factor_of_safety
        )
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    alert_level: String,
    region: String,
    location_id: String,
    factor_of_safety: f64,
}

/// Errors reading the dataset.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    /// The CSV could not be read or a row could not be parsed.
    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),

    /// No row carried a usable alert level.
    #[error("dataset has no rows with alert level Low, Medium or High")]
    NoUsableRows,
}

/// Read site records from CSV text.
///
/// # Errors
///
/// [`DatasetError::Csv`] for malformed CSV, missing columns or a
/// non-numeric factor of safety; [`DatasetError::NoUsableRows`] when
/// nothing is left after skipping unknown alert levels.
pub fn read_dataset<R: io::Read>(reader: R) -> Result<Vec<SiteRecord>, DatasetError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut records = Vec::new();
    for row in csv_reader.deserialize::<CsvRow>() {
        let row = row?;
        match row.alert_level.parse::<AlertLevel>() {
            Ok(alert_level) => records.push(SiteRecord {
                alert_level,
                region: row.region,
                location_id: row.location_id,
                factor_of_safety: row.factor_of_safety,
            }),
            Err(e) => debug!("skipping row: {e}"),
        }
    }
    if records.is_empty() {
        return Err(DatasetError::NoUsableRows);
    }
    info!("loaded {} site records", records.len());
    Ok(records)
}

/// Read site records from a CSV file.
///
/// # Errors
///
/// Same as [`read_dataset`], plus I/O failures opening the file
/// (reported through [`DatasetError::Csv`]).
pub fn load_dataset(path: &Path) -> Result<Vec<SiteRecord>, DatasetError> {
    let file = std::fs::File::open(path).map_err(csv::Error::from)?;
    read_dataset(io::BufReader::new(file))
}

/// Draw up to each level's quota from `records`, with replacement.
///
/// For every level in [`SAMPLE_QUOTAS`] the sample holds
/// `min(quota, rows_of_that_level)` rows, grouped Low, then Medium,
/// then High. Levels with no rows contribute nothing.
pub fn stratified_sample<R: Rng + ?Sized>(records: &[SiteRecord], rng: &mut R) -> Vec<SiteRecord> {
    let mut sample = Vec::new();
    for (level, quota) in SAMPLE_QUOTAS {
        let pool: Vec<&SiteRecord> = records.iter().filter(|r| r.alert_level == level).collect();
        let take = quota.min(pool.len());
        debug!("sampling {take} of {} {level} rows", pool.len());
        for _ in 0..take {
            sample.push(pool[rng.gen_range(0..pool.len())].clone());
        }
    }
    sample
}
