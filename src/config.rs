// Engine configuration with documented defaults.
// Binning rules and the subject rate are configuration, not magic numbers.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Subject property's advertised rate, the baseline for comparisons.
    pub subject_rate: f64,
    /// Bucket count for a single rendered histogram.
    pub histogram_bins: usize,
    /// Bucket count for histogram panels inside the multi-panel report.
    pub report_histogram_bins: usize,
    /// Bucket count for the budget/rent distribution inside summaries.
    pub summary_buckets: usize,
    /// Pie slices below this share of the total collapse into "Other".
    pub pie_other_min_share: f64,
    /// Query Gateway result row cap.
    pub max_result_rows: usize,
    /// Query Gateway wall-clock timeout, in milliseconds.
    pub query_timeout_ms: u64,
    /// Directory chart artifacts are written to; created if absent.
    pub charts_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            subject_rate: 2400.0,
            histogram_bins: 12,
            report_histogram_bins: 10,
            summary_buckets: 5,
            pie_other_min_share: 0.05,
            max_result_rows: 10_000,
            query_timeout_ms: 5_000,
            charts_dir: PathBuf::from("charts"),
        }
    }
}

impl Config {
    /// Load configuration overrides from a JSON file.
    /// Missing fields fall back to the defaults above.
    pub fn from_file(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalyticsError::DataLoad(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Config = serde_json::from_str(&text).map_err(|e| {
            AnalyticsError::DataLoad(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.subject_rate <= 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "subject_rate must be positive, got {}",
                self.subject_rate
            )));
        }
        if self.histogram_bins == 0 || self.report_histogram_bins == 0 || self.summary_buckets == 0
        {
            return Err(AnalyticsError::InvalidParameter(
                "bucket counts must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pie_other_min_share) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "pie_other_min_share must be within 0.0..=1.0, got {}",
                self.pie_other_min_share
            )));
        }
        Ok(())
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
