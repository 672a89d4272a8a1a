// Error taxonomy for the leasing analytics engine.
// Every failure is terminal for the invoking operation; the dispatch layer
// decides whether to retry.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("failed to load dataset: {0}")]
    DataLoad(String),

    #[error("unknown table '{0}' (available: guest_cards, nearby_units)")]
    UnknownTable(String),

    #[error("store not loaded yet")]
    NotReady,

    #[error("unsafe query rejected: {0}")]
    UnsafeQuery(String),

    #[error("query syntax error: {0}")]
    QuerySyntax(String),

    #[error("result exceeds row cap: {rows} rows, cap {cap}")]
    ResultTooLarge { rows: usize, cap: usize },

    #[error("query timed out after {0:?}")]
    QueryTimeout(Duration),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("unknown chart type '{0}'")]
    UnknownChartType(String),

    #[error("failed to write artifact {path}: {detail}")]
    ArtifactWrite { path: PathBuf, detail: String },
}

impl AnalyticsError {
    /// Stable machine-readable kind, for the dispatch layer's error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyticsError::DataLoad(_) => "data_load",
            AnalyticsError::UnknownTable(_) => "unknown_table",
            AnalyticsError::NotReady => "not_ready",
            AnalyticsError::UnsafeQuery(_) => "unsafe_query",
            AnalyticsError::QuerySyntax(_) => "query_syntax",
            AnalyticsError::ResultTooLarge { .. } => "result_too_large",
            AnalyticsError::QueryTimeout(_) => "query_timeout",
            AnalyticsError::InvalidParameter(_) => "invalid_parameter",
            AnalyticsError::InsufficientData(_) => "insufficient_data",
            AnalyticsError::UnknownChartType(_) => "unknown_chart_type",
            AnalyticsError::ArtifactWrite { .. } => "artifact_write",
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_stable() {
        assert_eq!(AnalyticsError::NotReady.kind(), "not_ready");
        assert_eq!(
            AnalyticsError::UnsafeQuery("drop".into()).kind(),
            "unsafe_query"
        );
        assert_eq!(
            AnalyticsError::ResultTooLarge { rows: 11, cap: 10 }.kind(),
            "result_too_large"
        );
    }

    #[test]
    fn test_display_carries_detail() {
        let err = AnalyticsError::UnknownChartType("sparkline".into());
        assert!(err.to_string().contains("sparkline"));

        let err = AnalyticsError::ResultTooLarge { rows: 20000, cap: 10000 };
        assert!(err.to_string().contains("20000"));
        assert!(err.to_string().contains("10000"));
    }
}
