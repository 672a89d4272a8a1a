// Chart Renderer - maps named chart types to PNG artifacts.
// Artifacts are written via a temp path and an atomic rename, so a failed
// render never leaves a partial file and concurrent writers of the same
// chart name cannot interleave.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use tracing::info;

use crate::analytics::{histogram, mean};
use crate::config::Config;
use crate::error::{AnalyticsError, Result};
use crate::store::TabularStore;

/// Panel palette, shared across all chart types.
const PALETTE: [RGBColor; 6] = [
    RGBColor(0x2e, 0x86, 0xab),
    RGBColor(0xa2, 0x3b, 0x72),
    RGBColor(0xf1, 0x8f, 0x01),
    RGBColor(0xc7, 0x3e, 0x1d),
    RGBColor(0x3b, 0x1f, 0x2b),
    RGBColor(0x95, 0xc6, 0x23),
];

const SINGLE_CHART_SIZE: (u32, u32) = (1000, 600);
const REPORT_SIZE: (u32, u32) = (1800, 1200);

// Sequence for temp-file names; combined with the pid it keeps concurrent
// writers of the same chart on distinct temp files until the final rename.
static TMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// The closed set of renderable chart types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartType {
    RentHistogram,
    CreditPie,
    PetBar,
    BudgetHistogram,
    PriceComparison,
    ActivityPie,
    IncomeVsRent,
    SimilarityRent,
}

impl ChartType {
    pub const ALL: [ChartType; 8] = [
        ChartType::RentHistogram,
        ChartType::CreditPie,
        ChartType::PetBar,
        ChartType::BudgetHistogram,
        ChartType::PriceComparison,
        ChartType::ActivityPie,
        ChartType::IncomeVsRent,
        ChartType::SimilarityRent,
    ];

    /// The six panels of the full market report (scatters excluded).
    pub const REPORT_PANELS: [ChartType; 6] = [
        ChartType::RentHistogram,
        ChartType::CreditPie,
        ChartType::PetBar,
        ChartType::BudgetHistogram,
        ChartType::PriceComparison,
        ChartType::ActivityPie,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartType::RentHistogram => "rent_histogram",
            ChartType::CreditPie => "credit_pie",
            ChartType::PetBar => "pet_bar",
            ChartType::BudgetHistogram => "budget_histogram",
            ChartType::PriceComparison => "price_comparison",
            ChartType::ActivityPie => "activity_pie",
            ChartType::IncomeVsRent => "income_vs_rent",
            ChartType::SimilarityRent => "similarity_rent",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self> {
        ChartType::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| AnalyticsError::UnknownChartType(s.to_string()))
    }
}

/// Fixed tier grouping for the credit pie.
fn credit_tier(score: f64) -> &'static str {
    if score >= 800.0 {
        "Excellent (800+)"
    } else if score >= 740.0 {
        "Very Good (740-799)"
    } else if score >= 720.0 {
        "Good (720-739)"
    } else if score >= 660.0 {
        "Fair (660-719)"
    } else {
        "Below 660"
    }
}

const PRICE_COMPARISON_LABELS: [&str; 5] = [
    "Much Lower",
    "Slightly Lower",
    "Same",
    "Slightly Higher",
    "Much Higher",
];

/// Ordered five-way grouping of listing rent vs the subject rate.
fn price_comparison_counts(rents: &[f64], subject_rate: f64) -> Vec<(String, usize)> {
    let mut counts = [0usize; 5];
    for &rent in rents {
        let diff = rent - subject_rate;
        let idx = if diff < -100.0 {
            0
        } else if diff < 0.0 {
            1
        } else if diff == 0.0 {
            2
        } else if diff <= 200.0 {
            3
        } else {
            4
        };
        counts[idx] += 1;
    }
    PRICE_COMPARISON_LABELS
        .iter()
        .zip(counts)
        .map(|(label, count)| (label.to_string(), count))
        .collect()
}

/// Collapse slices below `min_share` of the total into a single "Other"
/// slice, so small categories never fragment the pie. Slices are ordered by
/// descending count, then name, for deterministic output.
fn collapse_small_slices(
    counts: &BTreeMap<String, usize>,
    min_share: f64,
) -> Vec<(String, usize)> {
    let total: usize = counts.values().sum();
    if total == 0 {
        return Vec::new();
    }

    let mut kept: Vec<(String, usize)> = Vec::new();
    let mut other = 0usize;
    for (label, &count) in counts {
        if (count as f64 / total as f64) < min_share {
            other += count;
        } else {
            kept.push((label.clone(), count));
        }
    }
    kept.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    if other > 0 {
        kept.push(("Other".to_string(), other));
    }
    kept
}

type DrawResult = std::result::Result<(), Box<dyn std::error::Error + Send + Sync>>;

enum RenderJob {
    Single(ChartType),
    Report,
}

/// Renders chart artifacts from the loaded store into the configured
/// output directory.
pub struct ChartRenderer<'a> {
    store: &'a TabularStore,
    config: &'a Config,
}

impl<'a> ChartRenderer<'a> {
    pub fn new(store: &'a TabularStore, config: &'a Config) -> Self {
        ChartRenderer { store, config }
    }

    /// Render one named chart to `<charts_dir>/<chart_type>.png`,
    /// overwriting any prior artifact of the same type.
    pub fn render_one(&self, chart: ChartType) -> Result<PathBuf> {
        self.render_to(
            &format!("{}.png", chart.as_str()),
            SINGLE_CHART_SIZE,
            RenderJob::Single(chart),
        )
    }

    /// Render the six-panel market report to `<charts_dir>/market_report.png`.
    pub fn render_report(&self) -> Result<PathBuf> {
        self.render_to("market_report.png", REPORT_SIZE, RenderJob::Report)
    }

    fn render_to(&self, file_name: &str, size: (u32, u32), job: RenderJob) -> Result<PathBuf> {
        let dir = &self.config.charts_dir;
        let final_path = dir.join(file_name);
        std::fs::create_dir_all(dir).map_err(|e| AnalyticsError::ArtifactWrite {
            path: final_path.clone(),
            detail: format!("cannot create {}: {}", dir.display(), e),
        })?;

        // The backend picks the image encoder from the path extension, so the
        // temp name must still end in `.png`.
        let seq = TMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let tmp_path = dir.join(format!(
            ".{}.{}-{}.tmp.png",
            file_name,
            std::process::id(),
            seq
        ));
        if let Err(e) = self.draw_to_file(&tmp_path, size, &job) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(match e.downcast::<AnalyticsError>() {
                Ok(analytics_err) => *analytics_err,
                Err(other) => AnalyticsError::ArtifactWrite {
                    path: final_path,
                    detail: other.to_string(),
                },
            });
        }

        std::fs::rename(&tmp_path, &final_path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            AnalyticsError::ArtifactWrite {
                path: final_path.clone(),
                detail: format!("rename failed: {}", e),
            }
        })?;

        info!(artifact = %final_path.display(), "chart rendered");
        Ok(final_path)
    }

    fn draw_to_file(&self, path: &Path, size: (u32, u32), job: &RenderJob) -> DrawResult {
        let root = BitMapBackend::new(path, size).into_drawing_area();
        root.fill(&WHITE)?;

        match job {
            RenderJob::Single(chart) => {
                self.draw_chart(*chart, &root, self.config.histogram_bins)?;
            }
            RenderJob::Report => {
                let titled = root.titled("Tenant Leasing Market Report", ("sans-serif", 30))?;
                let panels = titled.split_evenly((2, 3));
                for (chart, panel) in ChartType::REPORT_PANELS.iter().zip(panels.iter()) {
                    self.draw_chart(*chart, panel, self.config.report_histogram_bins)?;
                }
            }
        }

        root.present()?;
        Ok(())
    }

    fn draw_chart<DB>(
        &self,
        chart: ChartType,
        area: &DrawingArea<DB, Shift>,
        bins: usize,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let cards = self.store.guest_cards();
        let units = self.store.nearby_units();
        let rate = self.config.subject_rate;

        match chart {
            ChartType::RentHistogram => {
                let rents: Vec<f64> = units.iter().map(|u| u.advertised_rent).collect();
                let market_avg = mean(&rents).ok_or_else(|| {
                    AnalyticsError::InsufficientData("no nearby-unit rents to chart".into())
                })?;
                self.draw_histogram_panel(
                    area,
                    "Nearby Rental Price Distribution",
                    "Monthly Rent ($)",
                    "Listings",
                    &rents,
                    bins,
                    0,
                    &[(rate, "Our rate", 3), (market_avg, "Market avg", 1)],
                )
            }
            ChartType::CreditPie => {
                let mut tiers: BTreeMap<String, usize> = BTreeMap::new();
                for score in cards.iter().filter_map(|c| c.credit_score) {
                    *tiers.entry(credit_tier(score).to_string()).or_default() += 1;
                }
                self.draw_pie_panel(area, "Prospect Credit Score Distribution", &tiers)
            }
            ChartType::PetBar => {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for card in cards {
                    let label = card.pet_preference.as_deref().unwrap_or("No Pets");
                    *counts.entry(label.to_string()).or_default() += 1;
                }
                let mut items: Vec<(String, usize)> =
                    counts.into_iter().collect();
                items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
                self.draw_bar_panel(area, "Pet Preferences", "Prospects", &items)
            }
            ChartType::BudgetHistogram => {
                let budgets: Vec<f64> = cards.iter().filter_map(|c| c.max_rent).collect();
                if budgets.is_empty() {
                    return Err(Box::new(AnalyticsError::InsufficientData(
                        "no max-rent budgets to chart".into(),
                    )));
                }
                let avg = mean(&budgets).expect("non-empty");
                self.draw_histogram_panel(
                    area,
                    "Prospect Budget Distribution",
                    "Max Rent Budget ($)",
                    "Prospects",
                    &budgets,
                    bins,
                    1,
                    &[(rate, "Our rate", 3), (avg, "Avg budget", 0)],
                )
            }
            ChartType::PriceComparison => {
                let rents: Vec<f64> = units.iter().map(|u| u.advertised_rent).collect();
                if rents.is_empty() {
                    return Err(Box::new(AnalyticsError::InsufficientData(
                        "no nearby-unit rents to chart".into(),
                    )));
                }
                let items = price_comparison_counts(&rents, rate);
                self.draw_bar_panel(area, "Market Price Comparison", "Listings", &items)
            }
            ChartType::ActivityPie => {
                let mut counts: BTreeMap<String, usize> = BTreeMap::new();
                for card in cards {
                    *counts.entry(card.last_activity_type.clone()).or_default() += 1;
                }
                self.draw_pie_panel(area, "Prospect Activity Types", &counts)
            }
            ChartType::IncomeVsRent => {
                let points: Vec<(f64, f64)> = cards
                    .iter()
                    .filter_map(|c| Some((c.monthly_income?, c.max_rent?)))
                    .collect();
                self.draw_scatter_panel(
                    area,
                    "Income vs Rent Budget",
                    "Monthly Income ($)",
                    "Max Rent Budget ($)",
                    &points,
                    0,
                    Some((rate, "Our rate")),
                )
            }
            ChartType::SimilarityRent => {
                let points: Vec<(f64, f64)> = units
                    .iter()
                    .filter_map(|u| Some((u.similarity_pct?, u.advertised_rent)))
                    .collect();
                self.draw_scatter_panel(
                    area,
                    "Property Similarity vs Rent",
                    "Similarity to Our Property (%)",
                    "Advertised Rent ($)",
                    &points,
                    1,
                    Some((rate, "Our rate")),
                )
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_histogram_panel<DB>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        x_desc: &str,
        y_desc: &str,
        values: &[f64],
        bins: usize,
        color: usize,
        reference_lines: &[(f64, &str, usize)],
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let buckets = histogram(values, bins);
        if buckets.is_empty() {
            return Err(Box::new(AnalyticsError::InsufficientData(format!(
                "no values for '{}'",
                title
            ))));
        }

        let x_min = buckets[0].lo;
        let x_max = buckets.last().expect("non-empty").hi;
        let span = (x_max - x_min).max(1.0);
        let y_max = buckets.iter().map(|b| b.count).max().unwrap_or(0) as u32 + 1;

        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(36)
            .y_label_area_size(44)
            .build_cartesian_2d(x_min - span * 0.02..x_max + span * 0.02, 0u32..y_max)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(buckets.iter().map(|b| {
            Rectangle::new(
                [(b.lo, 0u32), (b.hi, b.count as u32)],
                PALETTE[color % PALETTE.len()].mix(0.8).filled(),
            )
        }))?;

        for &(x, label, line_color) in reference_lines {
            let style = PALETTE[line_color % PALETTE.len()].stroke_width(2);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x, 0u32), (x, y_max)],
                    style,
                )))?
                .label(label)
                .legend(move |(lx, ly)| {
                    PathElement::new(vec![(lx, ly), (lx + 16, ly)], style)
                });
        }
        if !reference_lines.is_empty() {
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        Ok(())
    }

    fn draw_bar_panel<DB>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        y_desc: &str,
        items: &[(String, usize)],
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        if items.is_empty() {
            return Err(Box::new(AnalyticsError::InsufficientData(format!(
                "no categories for '{}'",
                title
            ))));
        }

        let n = items.len();
        let y_max = items.iter().map(|(_, c)| *c).max().unwrap_or(0) as u32 + 1;

        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(36)
            .y_label_area_size(44)
            .build_cartesian_2d(0f64..n as f64, 0u32..y_max)?;

        let labels: Vec<String> = items.iter().map(|(l, _)| l.clone()).collect();
        let label_for = |x: &f64| -> String {
            labels.get(x.floor() as usize).cloned().unwrap_or_default()
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(n)
            .x_label_formatter(&label_for)
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(items.iter().enumerate().map(|(i, (_, count))| {
            Rectangle::new(
                [(i as f64 + 0.15, 0u32), (i as f64 + 0.85, *count as u32)],
                PALETTE[i % PALETTE.len()].filled(),
            )
        }))?;

        Ok(())
    }

    fn draw_pie_panel<DB>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        counts: &BTreeMap<String, usize>,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        let slices = collapse_small_slices(counts, self.config.pie_other_min_share);
        if slices.is_empty() {
            return Err(Box::new(AnalyticsError::InsufficientData(format!(
                "no categories for '{}'",
                title
            ))));
        }

        let area = area.titled(title, ("sans-serif", 18))?;
        let (w, h) = area.dim_in_pixel();
        let center = (w as i32 / 2, h as i32 / 2);
        let radius = f64::from(w.min(h)) * 0.32;

        let sizes: Vec<f64> = slices.iter().map(|(_, c)| *c as f64).collect();
        let labels: Vec<String> = slices.iter().map(|(l, _)| l.clone()).collect();
        let colors: Vec<RGBColor> = (0..slices.len())
            .map(|i| PALETTE[i % PALETTE.len()])
            .collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(-90.0);
        pie.label_style(("sans-serif", 14).into_font());
        pie.percentages(("sans-serif", 12).into_font());
        area.draw(&pie)?;

        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_scatter_panel<DB>(
        &self,
        area: &DrawingArea<DB, Shift>,
        title: &str,
        x_desc: &str,
        y_desc: &str,
        points: &[(f64, f64)],
        color: usize,
        h_reference: Option<(f64, &str)>,
    ) -> DrawResult
    where
        DB: DrawingBackend,
        DB::ErrorType: 'static,
    {
        if points.is_empty() {
            return Err(Box::new(AnalyticsError::InsufficientData(format!(
                "no points for '{}'",
                title
            ))));
        }

        let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let mut y_min = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let mut y_max = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        if let Some((y, _)) = h_reference {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        let x_pad = (x_max - x_min).max(1.0) * 0.05;
        let y_pad = (y_max - y_min).max(1.0) * 0.05;

        let mut chart = ChartBuilder::on(area)
            .caption(title, ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(36)
            .y_label_area_size(44)
            .build_cartesian_2d(x_min - x_pad..x_max + x_pad, y_min - y_pad..y_max + y_pad)?;

        chart
            .configure_mesh()
            .x_desc(x_desc)
            .y_desc(y_desc)
            .draw()?;

        chart.draw_series(points.iter().map(|&(x, y)| {
            Circle::new((x, y), 4, PALETTE[color % PALETTE.len()].mix(0.7).filled())
        }))?;

        if let Some((y, label)) = h_reference {
            let style = PALETTE[3].stroke_width(2);
            chart
                .draw_series(std::iter::once(PathElement::new(
                    vec![(x_min - x_pad, y), (x_max + x_pad, y)],
                    style,
                )))?
                .label(label)
                .legend(move |(lx, ly)| {
                    PathElement::new(vec![(lx, ly), (lx + 16, ly)], style)
                });
            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()?;
        }

        Ok(())
    }
}
