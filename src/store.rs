// Tabular Store - CSV -> typed rows -> in-memory SQLite
// Loads the two datasets once at startup; immutable for the process lifetime.

use std::collections::HashMap;
use std::io::Read;
use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AnalyticsError, Result};
use crate::schema::{self, TableSchema};

/// Application status for a guest card. Fixed enumerated set; a row with any
/// other status is treated as malformed and skipped at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Active,
    Pending,
    Withdrawn,
    Confirmed,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Active => "active",
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Withdrawn => "withdrawn",
            ApplicationStatus::Confirmed => "confirmed",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(ApplicationStatus::Active),
            "pending" => Ok(ApplicationStatus::Pending),
            "withdrawn" => Ok(ApplicationStatus::Withdrawn),
            "confirmed" => Ok(ApplicationStatus::Confirmed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// One prospective-tenant inquiry, coerced to the declared schema.
#[derive(Debug, Clone, Serialize)]
pub struct GuestCard {
    pub name: String,
    pub interest_received: Option<NaiveDate>,
    pub last_activity_date: Option<NaiveDate>,
    pub last_activity_type: String,
    pub status: ApplicationStatus,
    pub move_in_preference: String,
    pub max_rent: Option<f64>,
    pub bed_bath: String,
    /// None means no pets.
    pub pet_preference: Option<String>,
    pub monthly_income: Option<f64>,
    pub credit_score: Option<f64>,
}

/// One comparable market listing, coerced to the declared schema.
#[derive(Debug, Clone, Serialize)]
pub struct NearbyUnit {
    pub similarity_pct: Option<f64>,
    pub beds: Option<f64>,
    pub baths: Option<f64>,
    pub sqft: Option<f64>,
    pub location: String,
    pub last_advertised: Option<NaiveDate>,
    pub advertised_rent: f64,
    pub source: String,
}

// Raw CSV shapes, before coercion. Header names follow the upstream exports.
#[derive(Debug, Deserialize)]
struct RawGuestCard {
    #[serde(rename = "Name", default)]
    name: String,

    #[serde(rename = "Interest Received", default)]
    interest_received: String,

    #[serde(rename = "Last Activity Date", default)]
    last_activity_date: String,

    #[serde(rename = "Last Activity Type", default)]
    last_activity_type: String,

    #[serde(rename = "Status", default)]
    status: String,

    #[serde(rename = "Move In Preference", default)]
    move_in_preference: String,

    #[serde(rename = "Max Rent", default)]
    max_rent: String,

    #[serde(rename = "Bed/Bath Preference", default)]
    bed_bath: String,

    #[serde(rename = "Pet Preference", default)]
    pet_preference: String,

    #[serde(rename = "Monthly Income", default)]
    monthly_income: String,

    #[serde(rename = "Credit Score", default)]
    credit_score: String,
}

#[derive(Debug, Deserialize)]
struct RawNearbyUnit {
    #[serde(rename = "Similarity", default)]
    similarity: String,

    #[serde(rename = "Beds", default)]
    beds: String,

    #[serde(rename = "Baths", default)]
    baths: String,

    #[serde(rename = "Sqft", default)]
    sqft: String,

    #[serde(rename = "Location", default)]
    location: String,

    #[serde(rename = "Last Advertised Date", default)]
    last_advertised: String,

    #[serde(rename = "Advertised Rent", default)]
    advertised_rent: String,

    #[serde(rename = "Source", default)]
    source: String,
}

// ============================================================================
// COERCION HELPERS
// ============================================================================

/// Parse a finite f64; the stdlib parser also accepts "NaN"/"inf", which are
/// never valid values for these columns.
fn parse_finite(cleaned: &str) -> Option<f64> {
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse a currency string like "$2,650" or "2650.00". Empty -> None.
fn parse_currency(raw: &str) -> std::result::Result<Option<f64>, String> {
    let cleaned = raw.trim().replace(['$', ','], "");
    if cleaned.is_empty() {
        return Ok(None);
    }
    parse_finite(&cleaned)
        .map(Some)
        .ok_or_else(|| format!("not a currency amount: '{}'", raw))
}

/// Parse a percentage string like "96%" or "96". Empty -> None.
fn parse_percent(raw: &str) -> std::result::Result<Option<f64>, String> {
    let cleaned = raw.trim().trim_end_matches('%').trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    parse_finite(cleaned)
        .map(Some)
        .ok_or_else(|| format!("not a percentage: '{}'", raw))
}

/// Parse a plain number. Empty -> None.
fn parse_number(raw: &str) -> std::result::Result<Option<f64>, String> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    parse_finite(cleaned)
        .map(Some)
        .ok_or_else(|| format!("not a number: '{}'", raw))
}

/// Parse a credit score: either a plain number ("800") or a range
/// ("720 to 799"), coerced to the range midpoint. Empty -> None.
fn parse_credit_score(raw: &str) -> std::result::Result<Option<f64>, String> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    if let Some((lo, hi)) = cleaned.split_once(" to ") {
        let lo =
            parse_finite(lo.trim()).ok_or_else(|| format!("bad credit range: '{}'", raw))?;
        let hi =
            parse_finite(hi.trim()).ok_or_else(|| format!("bad credit range: '{}'", raw))?;
        return Ok(Some((lo + hi) / 2.0));
    }
    parse_finite(cleaned)
        .map(Some)
        .ok_or_else(|| format!("not a credit score: '{}'", raw))
}

/// Parse a date in either US export form (12/31/2024) or ISO form. Empty -> None.
fn parse_date(raw: &str) -> std::result::Result<Option<NaiveDate>, String> {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(cleaned, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(cleaned, "%Y-%m-%d"))
        .map(Some)
        .map_err(|_| format!("not a date: '{}'", raw))
}

impl GuestCard {
    fn from_raw(raw: RawGuestCard) -> std::result::Result<GuestCard, String> {
        let status: ApplicationStatus = raw.status.parse()?;

        let monthly_income = parse_currency(&raw.monthly_income)?;
        if let Some(income) = monthly_income {
            if income < 0.0 {
                return Err(format!("negative income: {}", income));
            }
        }

        let credit_score = parse_credit_score(&raw.credit_score)?;
        if let Some(score) = credit_score {
            if score < 0.0 {
                return Err(format!("negative credit score: {}", score));
            }
        }

        let pet = raw.pet_preference.trim();

        Ok(GuestCard {
            name: raw.name.trim().to_string(),
            interest_received: parse_date(&raw.interest_received)?,
            last_activity_date: parse_date(&raw.last_activity_date)?,
            last_activity_type: raw.last_activity_type.trim().to_string(),
            status,
            move_in_preference: raw.move_in_preference.trim().to_string(),
            max_rent: parse_currency(&raw.max_rent)?,
            bed_bath: raw.bed_bath.trim().to_string(),
            pet_preference: if pet.is_empty() {
                None
            } else {
                Some(pet.to_string())
            },
            monthly_income,
            credit_score,
        })
    }
}

impl NearbyUnit {
    fn from_raw(raw: RawNearbyUnit) -> std::result::Result<NearbyUnit, String> {
        let rent = parse_currency(&raw.advertised_rent)?
            .ok_or_else(|| "missing advertised rent".to_string())?;
        if rent <= 0.0 {
            return Err(format!("non-positive rent: {}", rent));
        }

        Ok(NearbyUnit {
            similarity_pct: parse_percent(&raw.similarity)?,
            beds: parse_number(&raw.beds)?,
            baths: parse_number(&raw.baths)?,
            sqft: parse_number(&raw.sqft)?,
            location: raw.location.trim().to_string(),
            last_advertised: parse_date(&raw.last_advertised)?,
            advertised_rent: rent,
            source: raw.source.trim().to_string(),
        })
    }
}

// ============================================================================
// STORE
// ============================================================================

/// Locations of the two CSV sources.
#[derive(Debug, Clone)]
pub struct DataSources {
    pub guest_cards: std::path::PathBuf,
    pub nearby_units: std::path::PathBuf,
}

/// Read-only handle to one of the two tables.
#[derive(Debug, Clone, Copy)]
pub struct TableRef {
    pub name: &'static str,
    pub row_count: usize,
    pub schema: TableSchema,
}

/// In-memory store for the two datasets. Built once by `load`, read-only
/// thereafter; the SQLite mirror backs the Query Gateway while the typed row
/// vectors back the Analytics Aggregator and the Chart Renderer.
#[derive(Debug)]
pub struct TabularStore {
    conn: Connection,
    guest_cards: Vec<GuestCard>,
    nearby_units: Vec<NearbyUnit>,
    skipped: HashMap<&'static str, usize>,
}

impl TabularStore {
    /// Load both datasets from disk. Fails if either file is missing or ends
    /// up with zero usable rows after coercion.
    pub fn load(sources: &DataSources) -> Result<TabularStore> {
        let guest_file = std::fs::File::open(&sources.guest_cards).map_err(|e| {
            AnalyticsError::DataLoad(format!(
                "cannot open {}: {}",
                sources.guest_cards.display(),
                e
            ))
        })?;
        let unit_file = std::fs::File::open(&sources.nearby_units).map_err(|e| {
            AnalyticsError::DataLoad(format!(
                "cannot open {}: {}",
                sources.nearby_units.display(),
                e
            ))
        })?;
        Self::load_from_readers(guest_file, unit_file)
    }

    /// Load both datasets from arbitrary readers (used by tests with inline CSV).
    pub fn load_from_readers(guest_cards: impl Read, nearby_units: impl Read) -> Result<TabularStore> {
        let (guest_cards, skipped_guests) = read_guest_cards(guest_cards)?;
        let (nearby_units, skipped_units) = read_nearby_units(nearby_units)?;

        if guest_cards.is_empty() {
            return Err(AnalyticsError::DataLoad(
                "guest_cards has zero usable rows after coercion".into(),
            ));
        }
        if nearby_units.is_empty() {
            return Err(AnalyticsError::DataLoad(
                "nearby_units has zero usable rows after coercion".into(),
            ));
        }

        let conn = Connection::open_in_memory()
            .map_err(|e| AnalyticsError::DataLoad(format!("cannot open sqlite: {}", e)))?;
        mirror_to_sqlite(&conn, &guest_cards, &nearby_units)
            .map_err(|e| AnalyticsError::DataLoad(format!("cannot mirror to sqlite: {}", e)))?;

        info!(
            guest_cards = guest_cards.len(),
            nearby_units = nearby_units.len(),
            "datasets loaded"
        );
        if skipped_guests > 0 || skipped_units > 0 {
            warn!(
                skipped_guest_rows = skipped_guests,
                skipped_unit_rows = skipped_units,
                "malformed rows skipped during load"
            );
        }

        let mut skipped = HashMap::new();
        skipped.insert("guest_cards", skipped_guests);
        skipped.insert("nearby_units", skipped_units);

        Ok(TabularStore {
            conn,
            guest_cards,
            nearby_units,
            skipped,
        })
    }

    /// Read-only handle to one of the two fixed tables.
    pub fn table(&self, name: &str) -> Result<TableRef> {
        let schema = schema::table_schema(name)
            .ok_or_else(|| AnalyticsError::UnknownTable(name.to_string()))?;
        let row_count = match name {
            "guest_cards" => self.guest_cards.len(),
            _ => self.nearby_units.len(),
        };
        Ok(TableRef {
            name: schema.table,
            row_count,
            schema,
        })
    }

    pub fn guest_cards(&self) -> &[GuestCard] {
        &self.guest_cards
    }

    pub fn nearby_units(&self) -> &[NearbyUnit] {
        &self.nearby_units
    }

    /// Rows dropped during load because they could not be coerced.
    pub fn skipped_rows(&self, table: &str) -> Result<usize> {
        self.skipped
            .get(table)
            .copied()
            .ok_or_else(|| AnalyticsError::UnknownTable(table.to_string()))
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn read_guest_cards(reader: impl Read) -> Result<(Vec<GuestCard>, usize)> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (idx, record) in rdr.deserialize::<RawGuestCard>().enumerate() {
        match record {
            Ok(raw) => match GuestCard::from_raw(raw) {
                Ok(card) => rows.push(card),
                Err(reason) => {
                    warn!(table = "guest_cards", row = idx + 1, %reason, "row skipped");
                    skipped += 1;
                }
            },
            Err(e) => {
                warn!(table = "guest_cards", row = idx + 1, reason = %e, "row skipped");
                skipped += 1;
            }
        }
    }

    Ok((rows, skipped))
}

fn read_nearby_units(reader: impl Read) -> Result<(Vec<NearbyUnit>, usize)> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for (idx, record) in rdr.deserialize::<RawNearbyUnit>().enumerate() {
        match record {
            Ok(raw) => match NearbyUnit::from_raw(raw) {
                Ok(unit) => rows.push(unit),
                Err(reason) => {
                    warn!(table = "nearby_units", row = idx + 1, %reason, "row skipped");
                    skipped += 1;
                }
            },
            Err(e) => {
                warn!(table = "nearby_units", row = idx + 1, reason = %e, "row skipped");
                skipped += 1;
            }
        }
    }

    Ok((rows, skipped))
}

fn mirror_to_sqlite(
    conn: &Connection,
    guest_cards: &[GuestCard],
    nearby_units: &[NearbyUnit],
) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE guest_cards (
            name TEXT NOT NULL,
            interest_received TEXT,
            last_activity_date TEXT,
            last_activity_type TEXT NOT NULL,
            status TEXT NOT NULL,
            move_in_preference TEXT,
            max_rent REAL,
            bed_bath TEXT,
            pet_preference TEXT,
            monthly_income REAL,
            credit_score REAL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE nearby_units (
            similarity REAL,
            beds REAL,
            baths REAL,
            sqft REAL,
            location TEXT,
            last_advertised TEXT,
            advertised_rent REAL NOT NULL,
            source TEXT
        )",
        [],
    )?;

    {
        let mut stmt = conn.prepare(
            "INSERT INTO guest_cards (
                name, interest_received, last_activity_date, last_activity_type,
                status, move_in_preference, max_rent, bed_bath, pet_preference,
                monthly_income, credit_score
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )?;
        for card in guest_cards {
            stmt.execute(params![
                card.name,
                card.interest_received.map(|d| d.to_string()),
                card.last_activity_date.map(|d| d.to_string()),
                card.last_activity_type,
                card.status.as_str(),
                card.move_in_preference,
                card.max_rent,
                card.bed_bath,
                card.pet_preference,
                card.monthly_income,
                card.credit_score,
            ])?;
        }
    }

    {
        let mut stmt = conn.prepare(
            "INSERT INTO nearby_units (
                similarity, beds, baths, sqft, location, last_advertised,
                advertised_rent, source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )?;
        for unit in nearby_units {
            stmt.execute(params![
                unit.similarity_pct,
                unit.beds,
                unit.baths,
                unit.sqft,
                unit.location,
                unit.last_advertised.map(|d| d.to_string()),
                unit.advertised_rent,
                unit.source,
            ])?;
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod test_fixtures {
    use super::*;

    pub const GUEST_HEADER: &str = "Name,Interest Received,Last Activity Date,Last Activity Type,Status,Move In Preference,Max Rent,Bed/Bath Preference,Pet Preference,Monthly Income,Credit Score";
    pub const UNIT_HEADER: &str = "Similarity,Beds,Baths,Sqft,Location,Last Advertised Date,Advertised Rent,Source";

    pub fn guest_csv(rows: &[&str]) -> String {
        let mut csv = String::from(GUEST_HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        csv
    }

    pub fn unit_csv(rows: &[&str]) -> String {
        let mut csv = String::from(UNIT_HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        csv
    }

    pub fn small_store() -> TabularStore {
        let guests = guest_csv(&[
            r#""Martinez, Sofia",01/05/2025,01/12/2025,Email Received,Active,ASAP,"$2,600",2/1.00,Dogs,"$8,400",720 to 799"#,
            r#""Chen, Wei",01/06/2025,01/10/2025,Email Sent,Active,Feb 2025,"$2,300",2/1.00,,"$6,100",660 to 719"#,
            r#""Okafor, Ada",01/08/2025,01/15/2025,Pre-qualification Form Submitted,Pending,Mar 2025,"$2,800",2/2.00,Cats,"$9,500",800"#,
            r#""Reed, James",01/09/2025,01/09/2025,Email Sent,Withdrawn,ASAP,"$2,100",1/1.00,,"$5,000",580 to 619"#,
        ]);
        let units = unit_csv(&[
            r#"96%,2,1,905,about 1 mile away,01/10/2025,"$2,000",Zumper"#,
            r#"94%,2,1,910,about 1 mile away,01/11/2025,"$2,200",Zillow"#,
            r#"91%,2,1,920,about 2 miles away,01/12/2025,"$2,400",Zillow"#,
            r#"89%,2,2,950,about 2 miles away,01/13/2025,"$2,600",Apartments.com"#,
            r#"85%,3,2,1050,about 3 miles away,01/14/2025,"$2,800",Zumper"#,
        ]);
        TabularStore::load_from_readers(guests.as_bytes(), units.as_bytes()).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::test_fixtures::*;
    use super::*;

    #[test]
    fn test_load_small_fixture() {
        let store = small_store();
        assert_eq!(store.guest_cards().len(), 4);
        assert_eq!(store.nearby_units().len(), 5);
        assert_eq!(store.skipped_rows("guest_cards").unwrap(), 0);
        assert_eq!(store.skipped_rows("nearby_units").unwrap(), 0);
    }

    #[test]
    fn test_currency_and_percent_coercion() {
        let store = small_store();
        let sofia = &store.guest_cards()[0];
        assert_eq!(sofia.max_rent, Some(2600.0));
        assert_eq!(sofia.monthly_income, Some(8400.0));
        // Range "720 to 799" coerces to its midpoint
        assert_eq!(sofia.credit_score, Some(759.5));
        assert_eq!(sofia.pet_preference.as_deref(), Some("Dogs"));

        let wei = &store.guest_cards()[1];
        assert_eq!(wei.pet_preference, None);

        let unit = &store.nearby_units()[0];
        assert_eq!(unit.similarity_pct, Some(96.0));
        assert_eq!(unit.advertised_rent, 2000.0);
    }

    #[test]
    fn test_malformed_rows_skipped_and_counted() {
        let guests = guest_csv(&[
            r#""Ok, Row",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,$8000,700"#,
            // unknown status
            r#""Bad Status",01/05/2025,01/12/2025,Email Sent,Ghosted,ASAP,$2600,2/1.00,,$8000,700"#,
            // negative income violates the invariant
            r#""Bad Income",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,-100,700"#,
            // unparsable rent budget
            r#""Bad Rent",01/05/2025,01/12/2025,Email Sent,Active,ASAP,lots,2/1.00,,$8000,700"#,
        ]);
        let units = unit_csv(&[
            r#"96%,2,1,905,near,01/10/2025,$2000,Zumper"#,
            // rent is required and must be positive
            r#"90%,2,1,905,near,01/10/2025,,Zumper"#,
            r#"90%,2,1,905,near,01/10/2025,$0,Zumper"#,
        ]);

        let store = TabularStore::load_from_readers(guests.as_bytes(), units.as_bytes()).unwrap();
        assert_eq!(store.guest_cards().len(), 1);
        assert_eq!(store.skipped_rows("guest_cards").unwrap(), 3);
        assert_eq!(store.nearby_units().len(), 1);
        assert_eq!(store.skipped_rows("nearby_units").unwrap(), 2);
    }

    #[test]
    fn test_zero_usable_rows_fails_load() {
        let guests = guest_csv(&[]);
        let units = unit_csv(&[r#"96%,2,1,905,near,01/10/2025,$2000,Zumper"#]);
        let err =
            TabularStore::load_from_readers(guests.as_bytes(), units.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalyticsError::DataLoad(_)));

        let guests = guest_csv(&[
            r#""Ok, Row",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,$8000,700"#,
        ]);
        let units = unit_csv(&[]);
        let err =
            TabularStore::load_from_readers(guests.as_bytes(), units.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalyticsError::DataLoad(_)));
    }

    #[test]
    fn test_missing_source_fails_load() {
        let sources = DataSources {
            guest_cards: "/nonexistent/guest_cards.csv".into(),
            nearby_units: "/nonexistent/nearby_units.csv".into(),
        };
        assert!(matches!(
            TabularStore::load(&sources),
            Err(AnalyticsError::DataLoad(_))
        ));
    }

    #[test]
    fn test_table_handles() {
        let store = small_store();
        let guests = store.table("guest_cards").unwrap();
        assert_eq!(guests.row_count, 4);
        assert_eq!(guests.schema.columns.len(), 11);

        let units = store.table("nearby_units").unwrap();
        assert_eq!(units.row_count, 5);

        assert!(matches!(
            store.table("transactions"),
            Err(AnalyticsError::UnknownTable(_))
        ));
    }

    #[test]
    fn test_non_finite_values_rejected() {
        // The stdlib f64 parser accepts these spellings; the loader must not.
        assert!(parse_currency("NaN").is_err());
        assert!(parse_currency("inf").is_err());
        assert!(parse_number("-inf").is_err());
        assert!(parse_percent("NaN%").is_err());
        assert!(parse_credit_score("NaN").is_err());
        assert!(parse_credit_score("600 to inf").is_err());
    }

    #[test]
    fn test_non_finite_rows_skipped_and_summary_stays_total() {
        let guests = guest_csv(&[
            r#""Ok, Row",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,$8000,700"#,
            r#""NaN Income",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,NaN,700"#,
            r#""Inf Budget",01/05/2025,01/12/2025,Email Sent,Active,ASAP,inf,2/1.00,,$8000,700"#,
            r#""NaN Credit",01/05/2025,01/12/2025,Email Sent,Active,ASAP,$2600,2/1.00,,$8000,NaN"#,
        ]);
        let units = unit_csv(&[r#"96%,2,1,905,near,01/10/2025,$2000,Zumper"#]);

        let store = TabularStore::load_from_readers(guests.as_bytes(), units.as_bytes()).unwrap();
        assert_eq!(store.guest_cards().len(), 1);
        assert_eq!(store.skipped_rows("guest_cards").unwrap(), 3);

        // Nothing non-finite reaches the aggregator, so summarizing never panics
        let summary = crate::analytics::guest_card_summary(store.guest_cards(), 5).unwrap();
        assert_eq!(summary.total_inquiries, 1);
        assert!(summary.avg_income.is_finite());
    }

    #[test]
    fn test_date_formats() {
        assert_eq!(
            parse_date("01/05/2025").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(
            parse_date("2025-01-05").unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 5)
        );
        assert_eq!(parse_date("  ").unwrap(), None);
        assert!(parse_date("yesterday").is_err());
    }

    #[test]
    fn test_sqlite_mirror_queryable() {
        let store = small_store();
        let count: i64 = store
            .connection()
            .query_row("SELECT COUNT(*) FROM guest_cards", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 4);

        let avg_rent: f64 = store
            .connection()
            .query_row("SELECT AVG(advertised_rent) FROM nearby_units", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(avg_rent, 2400.0);
    }
}
