// Leasing-update email: derived stats gathered from the store, substituted
// into a fixed narrative template. The template itself is pure formatting;
// all analytics happen in `build_context`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::analytics::{mean, MarketPosition};
use crate::error::{AnalyticsError, Result};
use crate::store::{ApplicationStatus, GuestCard, NearbyUnit};

/// Fields supplied by the caller; showing activity is not tracked in the
/// datasets, so it always comes from outside.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailInput {
    pub recipient_name: String,
    pub sender_name: String,
    pub current_rate: f64,
    pub previous_rate: f64,
    pub showings_confirmed: u32,
    pub showings_attended: u32,
    pub interested_parties: u32,
    pub pending_applications: u32,
    pub withdrawn_applications: u32,
    pub upcoming_showings: u32,
}

impl Default for EmailInput {
    fn default() -> Self {
        EmailInput {
            recipient_name: "Chi".to_string(),
            sender_name: "Shanna".to_string(),
            current_rate: 2400.0,
            previous_rate: 2500.0,
            showings_confirmed: 4,
            showings_attended: 3,
            interested_parties: 2,
            pending_applications: 0,
            withdrawn_applications: 2,
            upcoming_showings: 2,
        }
    }
}

/// Everything the template needs: caller-supplied fields plus the metrics
/// derived from the loaded datasets.
#[derive(Debug, Clone, Serialize)]
pub struct EmailContext {
    pub input: EmailInput,
    pub total_inquiries: usize,
    /// Inquiries received within 7 days of the newest inquiry on file.
    pub recent_inquiries: usize,
    pub active_prospects: usize,
    /// Prospects whose last activity was a received email.
    pub engaged_prospects: usize,
    pub prequal_submitted: usize,
    /// Prospects whose stated budget covers the current rate.
    pub can_afford: usize,
    /// Prospects whose income clears the 3x-rent rule.
    pub income_qualified: usize,
    pub min_qualifying_income: f64,
    pub dogs: usize,
    pub cats: usize,
    pub market_avg_rent: f64,
    pub market_position: MarketPosition,
    pub market_diff: f64,
}

pub fn build_context(
    cards: &[GuestCard],
    units: &[NearbyUnit],
    input: EmailInput,
) -> Result<EmailContext> {
    if input.current_rate <= 0.0 || input.previous_rate <= 0.0 {
        return Err(AnalyticsError::InvalidParameter(format!(
            "rates must be positive, got current={}, previous={}",
            input.current_rate, input.previous_rate
        )));
    }

    let rents: Vec<f64> = units.iter().map(|u| u.advertised_rent).collect();
    let market_avg_rent = mean(&rents).ok_or_else(|| {
        AnalyticsError::InsufficientData("no nearby-unit rents for market positioning".into())
    })?;

    let newest = cards.iter().filter_map(|c| c.interest_received).max();
    let recent_inquiries = match newest {
        Some(newest) => cards
            .iter()
            .filter_map(|c| c.interest_received)
            .filter(|d| newest - *d <= Duration::days(7))
            .count(),
        None => 0,
    };

    let min_qualifying_income = input.current_rate * 3.0;
    let diff = input.current_rate - market_avg_rent;
    let market_position = if diff < 0.0 {
        MarketPosition::Below
    } else if diff > 0.0 {
        MarketPosition::Above
    } else {
        MarketPosition::At
    };

    Ok(EmailContext {
        total_inquiries: cards.len(),
        recent_inquiries,
        active_prospects: cards
            .iter()
            .filter(|c| c.status == ApplicationStatus::Active)
            .count(),
        engaged_prospects: cards
            .iter()
            .filter(|c| c.last_activity_type == "Email Received")
            .count(),
        prequal_submitted: cards
            .iter()
            .filter(|c| c.last_activity_type == "Pre-qualification Form Submitted")
            .count(),
        can_afford: cards
            .iter()
            .filter(|c| c.max_rent.unwrap_or(0.0) >= input.current_rate)
            .count(),
        income_qualified: cards
            .iter()
            .filter(|c| c.monthly_income.unwrap_or(0.0) >= min_qualifying_income)
            .count(),
        min_qualifying_income,
        dogs: cards
            .iter()
            .filter(|c| c.pet_preference.as_deref() == Some("Dogs"))
            .count(),
        cats: cards
            .iter()
            .filter(|c| c.pet_preference.as_deref() == Some("Cats"))
            .count(),
        market_avg_rent,
        market_position,
        market_diff: diff.abs(),
        input,
    })
}

/// Substitute the context into the fixed narrative template.
pub fn compose(ctx: &EmailContext) -> String {
    let input = &ctx.input;
    let rate_line = if input.previous_rate > input.current_rate {
        format!(
            "Since dropping the rate from ${:.0} to ${:.0} we have seen steady interest.",
            input.previous_rate, input.current_rate
        )
    } else {
        format!("The rate is holding at ${:.0}.", input.current_rate)
    };
    let position = match ctx.market_position {
        MarketPosition::Below => format!("${:.0} below", ctx.market_diff),
        MarketPosition::Above => format!("${:.0} above", ctx.market_diff),
        MarketPosition::At => "right at".to_string(),
    };

    format!(
        "Hi {recipient},\n\n\
         Quick update on the leasing pipeline. We have logged {total} inquiries to date, \
         {recent} of them within the last week, and {active} prospects are currently active. \
         {engaged} have responded to our emails and {prequal} have submitted the \
         pre-qualification form.\n\n\
         {rate_line} Our rate sits {position} the market average of ${market_avg:.0}. \
         {can_afford} prospects have a stated budget that covers our rate, and {qualified} \
         clear the 3x income requirement (${min_income:.0}/month). Pet mix so far: {dogs} \
         with dogs, {cats} with cats.\n\n\
         On showings: {confirmed} confirmed, {attended} attended, {interested} seemed \
         genuinely interested, and {upcoming} more are scheduled. Applications stand at \
         {pending} pending and {withdrawn} withdrawn.\n\n\
         I'll keep you posted as the upcoming showings land.\n\n\
         Best,\n{sender}",
        recipient = input.recipient_name,
        total = ctx.total_inquiries,
        recent = ctx.recent_inquiries,
        active = ctx.active_prospects,
        engaged = ctx.engaged_prospects,
        prequal = ctx.prequal_submitted,
        rate_line = rate_line,
        position = position,
        market_avg = ctx.market_avg_rent,
        can_afford = ctx.can_afford,
        qualified = ctx.income_qualified,
        min_income = ctx.min_qualifying_income,
        dogs = ctx.dogs,
        cats = ctx.cats,
        confirmed = input.showings_confirmed,
        attended = input.showings_attended,
        interested = input.interested_parties,
        upcoming = input.upcoming_showings,
        pending = input.pending_applications,
        withdrawn = input.withdrawn_applications,
        sender = input.sender_name,
    )
}
