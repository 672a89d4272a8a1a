// Leasing Analytics Engine - Core Library
// Exposes all modules for use in the CLI, the tool-dispatch layer, and tests

pub mod analytics;
pub mod charts;
pub mod config;
pub mod email;
pub mod error;
pub mod query;
pub mod schema;
pub mod service;
pub mod store;

// Re-export commonly used types
pub use analytics::{
    guest_card_summary, histogram, market_rent_analysis, qualified_prospects, Bucket,
    GuestCardSummary, MarketPosition, MarketRentAnalysis, QualifiedProspects,
};
pub use charts::{ChartRenderer, ChartType};
pub use config::Config;
pub use email::{EmailContext, EmailInput};
pub use error::{AnalyticsError, Result};
pub use query::{ColumnMeta, QueryResult};
pub use schema::{ColumnSpec, SemanticType, TableSchema, TABLES};
pub use service::{LeasingEmail, LeasingService};
pub use store::{
    ApplicationStatus, DataSources, GuestCard, NearbyUnit, TableRef, TabularStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
