// Analytics Aggregator - fixed-shape analyses over the loaded datasets.
// All functions are pure over row slices; absence of sufficient data is an
// explicit error, never a NaN-filled summary.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{AnalyticsError, Result};
use crate::store::{GuestCard, NearbyUnit};

// ============================================================================
// NUMERIC HELPERS
// ============================================================================

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Linear-interpolation quantile over an already sorted slice.
pub(crate) fn quantile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        return Some(sorted[lo]);
    }
    let frac = pos - lo as f64;
    Some(sorted[lo] * (1.0 - frac) + sorted[hi] * frac)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.partial_cmp(b).expect("non-NaN inputs"));
    v
}

/// One fixed-width histogram bucket, inclusive of `lo`; the last bucket is
/// also inclusive of `hi` so the maximum value is never dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub lo: f64,
    pub hi: f64,
    pub count: usize,
}

/// Fixed-width binning spanning observed min..max. Bucket counts always sum
/// to `values.len()`. A degenerate input (all values equal) collapses to a
/// single bucket.
pub fn histogram(values: &[f64], buckets: usize) -> Vec<Bucket> {
    if values.is_empty() || buckets == 0 {
        return Vec::new();
    }
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    if min == max {
        return vec![Bucket {
            lo: min,
            hi: max,
            count: values.len(),
        }];
    }

    let width = (max - min) / buckets as f64;
    let mut out: Vec<Bucket> = (0..buckets)
        .map(|i| Bucket {
            lo: min + width * i as f64,
            hi: if i + 1 == buckets {
                max
            } else {
                min + width * (i + 1) as f64
            },
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = (((v - min) / width) as usize).min(buckets - 1);
        out[idx].count += 1;
    }
    out
}

// ============================================================================
// GUEST CARD SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GuestCardSummary {
    pub total_inquiries: usize,
    pub by_activity_type: BTreeMap<String, usize>,
    pub by_status: BTreeMap<String, usize>,
    pub avg_credit_score: f64,
    pub median_credit_score: f64,
    pub avg_income: f64,
    pub median_income: f64,
    /// Share of prospects with any pet preference set.
    pub pet_owner_share: f64,
    pub pets_by_type: BTreeMap<String, usize>,
    /// Max-rent budget distribution over fixed-width buckets.
    pub budget_buckets: Vec<Bucket>,
}

pub fn guest_card_summary(cards: &[GuestCard], budget_buckets: usize) -> Result<GuestCardSummary> {
    if cards.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "no guest cards loaded".into(),
        ));
    }

    let mut by_activity_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    let mut pets_by_type: BTreeMap<String, usize> = BTreeMap::new();
    let mut pet_owners = 0usize;

    for card in cards {
        *by_activity_type
            .entry(card.last_activity_type.clone())
            .or_default() += 1;
        *by_status.entry(card.status.as_str().to_string()).or_default() += 1;
        match &card.pet_preference {
            Some(pet) => {
                pet_owners += 1;
                *pets_by_type.entry(pet.clone()).or_default() += 1;
            }
            None => *pets_by_type.entry("No Pets".to_string()).or_default() += 1,
        }
    }

    let credits = sorted(
        &cards
            .iter()
            .filter_map(|c| c.credit_score)
            .collect::<Vec<_>>(),
    );
    let incomes = sorted(
        &cards
            .iter()
            .filter_map(|c| c.monthly_income)
            .collect::<Vec<_>>(),
    );
    let budgets: Vec<f64> = cards.iter().filter_map(|c| c.max_rent).collect();

    let avg_credit_score = mean(&credits)
        .ok_or_else(|| AnalyticsError::InsufficientData("no credit scores present".into()))?;
    let avg_income = mean(&incomes)
        .ok_or_else(|| AnalyticsError::InsufficientData("no income values present".into()))?;
    if budgets.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "no max-rent budgets present".into(),
        ));
    }

    Ok(GuestCardSummary {
        total_inquiries: cards.len(),
        by_activity_type,
        by_status,
        avg_credit_score,
        median_credit_score: quantile(&credits, 0.5).expect("non-empty"),
        avg_income,
        median_income: quantile(&incomes, 0.5).expect("non-empty"),
        pet_owner_share: pet_owners as f64 / cards.len() as f64,
        pets_by_type,
        budget_buckets: histogram(&budgets, budget_buckets),
    })
}

// ============================================================================
// QUALIFIED PROSPECTS
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct QualifiedProspects {
    pub min_income: f64,
    pub min_credit: f64,
    pub prospects: Vec<GuestCard>,
    pub qualified: usize,
    pub total: usize,
    pub proportion: f64,
}

/// Threshold filter over the guest-card population. A card with no stated
/// income or credit counts as zero, so `(0, 0)` returns everyone.
pub fn qualified_prospects(
    cards: &[GuestCard],
    min_income: f64,
    min_credit: f64,
) -> Result<QualifiedProspects> {
    if min_income < 0.0 || min_credit < 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "thresholds must be non-negative, got min_income={}, min_credit={}",
            min_income, min_credit
        )));
    }

    let prospects: Vec<GuestCard> = cards
        .iter()
        .filter(|c| {
            c.monthly_income.unwrap_or(0.0) >= min_income
                && c.credit_score.unwrap_or(0.0) >= min_credit
        })
        .cloned()
        .collect();

    let total = cards.len();
    let qualified = prospects.len();
    Ok(QualifiedProspects {
        min_income,
        min_credit,
        prospects,
        qualified,
        total,
        proportion: if total == 0 {
            0.0
        } else {
            qualified as f64 / total as f64
        },
    })
}

// ============================================================================
// MARKET RENT ANALYSIS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketPosition {
    Below,
    At,
    Above,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketRentAnalysis {
    pub listings: usize,
    pub min_rent: f64,
    pub max_rent: f64,
    pub mean_rent: f64,
    pub median_rent: f64,
    pub q1_rent: f64,
    pub q3_rent: f64,
    pub mean_sqft: Option<f64>,
    pub mean_similarity_pct: Option<f64>,
    pub rent_buckets: Vec<Bucket>,
    /// The rate the market is compared against (caller-supplied or configured).
    pub comparison_rate: f64,
    /// Signed percent difference of the comparison rate vs the market mean.
    pub rate_vs_market_pct: f64,
    pub market_position: MarketPosition,
}

pub fn market_rent_analysis(
    units: &[NearbyUnit],
    comparison_rate: f64,
    rent_buckets: usize,
) -> Result<MarketRentAnalysis> {
    if comparison_rate <= 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "comparison rate must be positive, got {}",
            comparison_rate
        )));
    }

    let rents = sorted(&units.iter().map(|u| u.advertised_rent).collect::<Vec<_>>());
    if rents.is_empty() {
        return Err(AnalyticsError::InsufficientData(
            "no nearby-unit rents available".into(),
        ));
    }

    let mean_rent = mean(&rents).expect("non-empty");
    let rate_vs_market_pct = (comparison_rate - mean_rent) / mean_rent * 100.0;
    let market_position = if rate_vs_market_pct < 0.0 {
        MarketPosition::Below
    } else if rate_vs_market_pct > 0.0 {
        MarketPosition::Above
    } else {
        MarketPosition::At
    };

    let sqfts: Vec<f64> = units.iter().filter_map(|u| u.sqft).collect();
    let similarities: Vec<f64> = units.iter().filter_map(|u| u.similarity_pct).collect();

    Ok(MarketRentAnalysis {
        listings: units.len(),
        min_rent: rents[0],
        max_rent: *rents.last().expect("non-empty"),
        mean_rent,
        median_rent: quantile(&rents, 0.5).expect("non-empty"),
        q1_rent: quantile(&rents, 0.25).expect("non-empty"),
        q3_rent: quantile(&rents, 0.75).expect("non-empty"),
        mean_sqft: mean(&sqfts),
        mean_similarity_pct: mean(&similarities),
        rent_buckets: histogram(&rents, rent_buckets),
        comparison_rate,
        rate_vs_market_pct,
        market_position,
    })
}
