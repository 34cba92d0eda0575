use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::HashMap;

use crate::api::authenticate;
use crate::db::Database;
use crate::error::ServiceError;
use crate::models::Role;
use crate::report::{
    compute_category_counts, compute_daily_counts, compute_resolution_durations, CategoryCount,
    DailyCount, DateRange, ResolutionSample, TimestampAxis, RESOLUTION_FILTER_AXIS,
};

/// Number of resolutions listed under "Recent resolutions".
pub const RECENT_RESOLUTIONS: usize = 10;

/// Shortcut ranges for the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// First to last day of the current month
    Month,
    Today,
}

impl Preset {
    pub fn range(self, today: NaiveDate) -> DateRange {
        let (first, last) = match self {
            Preset::Month => {
                let first = today.with_day(1).unwrap_or(today);
                let last = first
                    .checked_add_months(chrono::Months::new(1))
                    .and_then(|next| next.pred_opt())
                    .unwrap_or(today);
                (first, last)
            }
            Preset::Today => (today, today),
        };
        // first <= last always holds, so the range is valid
        DateRange::from_days(Some(first), Some(last)).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryResolution {
    pub category: String,
    pub samples: usize,
    pub average_hours: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: u64,
    pub categories_with_tickets: usize,
    pub average_resolution_hours: f64,
    pub daily: Vec<DailyCount>,
    pub by_category: Vec<CategoryShare>,
    pub resolution_by_category: Vec<CategoryResolution>,
    /// Latest resolutions, most recently finished first.
    pub recent: Vec<ResolutionSample>,
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        round_to(sum / n as f64, 2)
    }
}

/// Folds the three report series into the dashboard figures.
pub fn summarize(
    daily: Vec<DailyCount>,
    categories: Vec<CategoryCount>,
    resolutions: &[ResolutionSample],
) -> Summary {
    let total: u64 = categories.iter().map(|c| c.count).sum();

    let by_category = categories
        .into_iter()
        .map(|c| CategoryShare {
            percent: if total == 0 {
                0.0
            } else {
                round_to(c.count as f64 * 100.0 / total as f64, 1)
            },
            category: c.category,
            count: c.count,
        })
        .collect::<Vec<_>>();

    let mut order: Vec<&str> = Vec::new();
    let mut grouped: HashMap<&str, Vec<f64>> = HashMap::new();
    for sample in resolutions {
        let entry = grouped.entry(sample.category.as_str()).or_default();
        if entry.is_empty() {
            order.push(sample.category.as_str());
        }
        entry.push(sample.duration);
    }
    let resolution_by_category = order
        .into_iter()
        .map(|category| {
            let durations = &grouped[category];
            CategoryResolution {
                category: category.to_string(),
                samples: durations.len(),
                average_hours: mean(durations.iter().copied()),
            }
        })
        .collect();

    let mut recent = resolutions.to_vec();
    recent.sort_by(|a, b| b.finished_at.cmp(&a.finished_at));
    recent.truncate(RECENT_RESOLUTIONS);

    Summary {
        total,
        categories_with_tickets: by_category.len(),
        average_resolution_hours: mean(resolutions.iter().map(|s| s.duration)),
        daily,
        by_category,
        resolution_by_category,
        recent,
    }
}

pub fn run(
    db: &Database,
    caller: Option<&str>,
    start: Option<&str>,
    end: Option<&str>,
    preset: Option<Preset>,
) -> Result<()> {
    let user = authenticate(db, caller)?;
    if user.role != Role::Admin {
        return Err(anyhow!(ServiceError::AuthorizationDenied(
            "the dashboard is restricted to administrators".to_string()
        )));
    }
    let range = match preset {
        Some(preset) => preset.range(Utc::now().date_naive()),
        None => DateRange::parse(start, end)?,
    };

    let created = db.fetch_report_rows(Some(&range), TimestampAxis::Created)?;
    let completed = db.fetch_report_rows(Some(&range), RESOLUTION_FILTER_AXIS)?;
    let summary = summarize(
        compute_daily_counts(&created, Some(&range)),
        compute_category_counts(&created, Some(&range)),
        &compute_resolution_durations(&completed, Some(&range)),
    );

    if let (Some(from), Some(to)) = (range.start(), range.end()) {
        println!("Period:              {} to {}", from.format("%Y-%m-%d"), to.format("%Y-%m-%d"));
    }
    println!("Total tickets:       {}", summary.total);
    println!("Categories in use:   {}", summary.categories_with_tickets);
    println!("Average resolution:  {:.2} h", summary.average_resolution_hours);

    if !summary.daily.is_empty() {
        println!("\nDaily trend:");
        for day in &summary.daily {
            println!("  {}  {:>4}", day.date.format("%Y-%m-%d"), day.count);
        }
    }

    if !summary.by_category.is_empty() {
        println!("\nBy category:");
        for share in &summary.by_category {
            println!("  {:<30} {:>4}  {:>5.1}%", share.category, share.count, share.percent);
        }
    }

    if !summary.resolution_by_category.is_empty() {
        println!("\nResolution by category:");
        for row in &summary.resolution_by_category {
            println!(
                "  {:<30} {:>8.2} h  ({} resolved)",
                row.category, row.average_hours, row.samples
            );
        }
    }

    if !summary.recent.is_empty() {
        println!("\nRecent resolutions:");
        for sample in &summary.recent {
            println!(
                "  {:<30} {:>8.2} h  {} -> {}",
                sample.category,
                sample.duration,
                sample.created_at.format("%d/%m/%Y"),
                sample.finished_at.format("%d/%m/%Y")
            );
        }
    }

    Ok(())
}
