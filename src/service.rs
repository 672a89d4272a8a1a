// LeasingService - the operation facade an external tool-dispatch layer
// invokes. Holds the single explicitly constructed store instance; every
// operation before `load` completes fails with NotReady instead of racing.

use std::path::PathBuf;

use tracing::info;

use crate::analytics::{
    self, GuestCardSummary, MarketRentAnalysis, QualifiedProspects,
};
use crate::charts::{ChartRenderer, ChartType};
use crate::config::Config;
use crate::email::{self, EmailContext, EmailInput};
use crate::error::{AnalyticsError, Result};
use crate::query::{self, QueryResult};
use crate::schema::{TableSchema, TABLES};
use crate::store::{DataSources, TabularStore};

/// A rendered email plus the context it was built from, so the dispatch
/// layer can expose both.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LeasingEmail {
    pub body: String,
    pub context: EmailContext,
}

pub struct LeasingService {
    config: Config,
    store: Option<TabularStore>,
}

impl LeasingService {
    pub fn new(config: Config) -> Result<LeasingService> {
        config.validate()?;
        Ok(LeasingService {
            config,
            store: None,
        })
    }

    /// Load both datasets. Completes or fails atomically: on failure the
    /// service stays unloaded and keeps answering NotReady.
    pub fn load(&mut self, sources: &DataSources) -> Result<()> {
        let store = TabularStore::load(sources)?;
        self.store = Some(store);
        Ok(())
    }

    /// Load from pre-built readers (tests, embedded data).
    pub fn load_from_readers(
        &mut self,
        guest_cards: impl std::io::Read,
        nearby_units: impl std::io::Read,
    ) -> Result<()> {
        let store = TabularStore::load_from_readers(guest_cards, nearby_units)?;
        self.store = Some(store);
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_some()
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn store(&self) -> Result<&TabularStore> {
        self.store.as_ref().ok_or(AnalyticsError::NotReady)
    }

    /// Declared schema for both tables.
    pub fn get_schema(&self) -> Result<&'static [TableSchema]> {
        self.store()?;
        Ok(&TABLES)
    }

    /// Execute a read-only ad-hoc query.
    pub fn query_database(&self, sql: &str) -> Result<QueryResult> {
        query::execute(self.store()?, &self.config, sql)
    }

    pub fn guest_card_summary(&self) -> Result<GuestCardSummary> {
        analytics::guest_card_summary(self.store()?.guest_cards(), self.config.summary_buckets)
    }

    /// Thresholds default to zero when the caller omits them.
    pub fn qualified_prospects(
        &self,
        min_income: Option<f64>,
        min_credit: Option<f64>,
    ) -> Result<QualifiedProspects> {
        analytics::qualified_prospects(
            self.store()?.guest_cards(),
            min_income.unwrap_or(0.0),
            min_credit.unwrap_or(0.0),
        )
    }

    /// Compare the market against a caller-supplied rate, or the configured
    /// subject rate when omitted.
    pub fn market_rent_analysis(&self, comparison_rate: Option<f64>) -> Result<MarketRentAnalysis> {
        analytics::market_rent_analysis(
            self.store()?.nearby_units(),
            comparison_rate.unwrap_or(self.config.subject_rate),
            self.config.summary_buckets,
        )
    }

    /// Render the six-panel market report; returns the artifact path.
    pub fn create_market_report(&self) -> Result<PathBuf> {
        let renderer = ChartRenderer::new(self.store()?, &self.config);
        renderer.render_report()
    }

    /// Render one named chart; returns the artifact path.
    pub fn create_individual_chart(&self, chart_type: &str) -> Result<PathBuf> {
        let chart: ChartType = chart_type.parse()?;
        let renderer = ChartRenderer::new(self.store()?, &self.config);
        renderer.render_one(chart)
    }

    /// Compose a leasing-update email from caller fields and derived stats.
    pub fn leasing_email(&self, input: EmailInput) -> Result<LeasingEmail> {
        let store = self.store()?;
        let context = email::build_context(store.guest_cards(), store.nearby_units(), input)?;
        let body = email::compose(&context);
        info!(total_inquiries = context.total_inquiries, "email composed");
        Ok(LeasingEmail { body, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_fixtures::{guest_csv, unit_csv};

    fn loaded_service() -> LeasingService {
        let mut service = LeasingService::new(Config::default()).unwrap();
        let guests = guest_csv(&[
            r#""Martinez, Sofia",01/05/2025,01/12/2025,Email Received,Active,ASAP,"$2,600",2/1.00,Dogs,"$8,400",720 to 799"#,
            r#""Chen, Wei",01/06/2025,01/10/2025,Email Sent,Active,Feb 2025,"$2,300",2/1.00,,"$6,100",660 to 719"#,
        ]);
        let units = unit_csv(&[
            r#"96%,2,1,905,near,01/10/2025,"$2,200",Zumper"#,
            r#"91%,2,1,920,near,01/12/2025,"$2,600",Zillow"#,
        ]);
        service
            .load_from_readers(guests.as_bytes(), units.as_bytes())
            .unwrap();
        service
    }

    #[test]
    fn test_operations_before_load_fail_not_ready() {
        let service = LeasingService::new(Config::default()).unwrap();
        assert!(!service.is_ready());
        assert!(matches!(
            service.get_schema(),
            Err(AnalyticsError::NotReady)
        ));
        assert!(matches!(
            service.query_database("SELECT 1"),
            Err(AnalyticsError::NotReady)
        ));
        assert!(matches!(
            service.guest_card_summary(),
            Err(AnalyticsError::NotReady)
        ));
        assert!(matches!(
            service.market_rent_analysis(None),
            Err(AnalyticsError::NotReady)
        ));
        assert!(matches!(
            service.create_individual_chart("pet_bar"),
            Err(AnalyticsError::NotReady)
        ));
    }

    #[test]
    fn test_failed_load_leaves_service_unloaded() {
        let mut service = LeasingService::new(Config::default()).unwrap();
        let err = service
            .load(&DataSources {
                guest_cards: "/nonexistent/a.csv".into(),
                nearby_units: "/nonexistent/b.csv".into(),
            })
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::DataLoad(_)));
        assert!(!service.is_ready());
        assert!(matches!(
            service.guest_card_summary(),
            Err(AnalyticsError::NotReady)
        ));
    }

    #[test]
    fn test_schema_after_load() {
        let service = loaded_service();
        let schema = service.get_schema().unwrap();
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[0].table, "guest_cards");
    }

    #[test]
    fn test_defaults_flow_through() {
        let service = loaded_service();

        // Omitted thresholds default to zero: full population
        let prospects = service.qualified_prospects(None, None).unwrap();
        assert_eq!(prospects.qualified, 2);
        assert_eq!(prospects.min_income, 0.0);

        // Omitted rate falls back to the configured subject rate
        let market = service.market_rent_analysis(None).unwrap();
        assert_eq!(market.comparison_rate, 2400.0);
        assert_eq!(market.mean_rent, 2400.0);
        assert_eq!(market.rate_vs_market_pct, 0.0);
    }

    #[test]
    fn test_query_and_analysis_agree() {
        let service = loaded_service();
        let result = service
            .query_database("SELECT AVG(advertised_rent) AS avg_rent FROM nearby_units")
            .unwrap();
        let market = service.market_rent_analysis(None).unwrap();
        assert_eq!(result.rows[0]["avg_rent"], market.mean_rent);
    }

    #[test]
    fn test_unknown_chart_type_via_service() {
        let service = loaded_service();
        assert!(matches!(
            service.create_individual_chart("sparkline"),
            Err(AnalyticsError::UnknownChartType(_))
        ));
    }

    #[test]
    fn test_email_via_service() {
        let service = loaded_service();
        let email = service.leasing_email(EmailInput::default()).unwrap();
        assert_eq!(email.context.total_inquiries, 2);
        assert!(email.body.contains("2 inquiries to date"));
    }
}
