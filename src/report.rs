//! Report aggregation over ticket rows.
//!
//! Every function here is pure: it takes rows already fetched from the store
//! plus an optional [`DateRange`] and derives one of the three dashboard views.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

/// Label used for tickets whose category no longer resolves.
pub const UNKNOWN_CATEGORY: &str = "Category not found";

/// Smallest duration reported for a resolved ticket, in hours.
pub const MIN_RESOLUTION_HOURS: f64 = 0.01;

/// Axis used to place resolved tickets inside a range.
pub const RESOLUTION_FILTER_AXIS: TimestampAxis = TimestampAxis::Completed;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RangeError {
    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Start date {start} is after end date {end}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

/// Inclusive range of whole UTC days. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn from_days(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Result<Self, RangeError> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(RangeError::Inverted { start: s, end: e });
            }
        }
        Ok(DateRange {
            start: start.map(start_of_day),
            end: end.map(end_of_day),
        })
    }

    /// Widens arbitrary instants to the whole days containing them.
    pub fn from_instants(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Self, RangeError> {
        Self::from_days(start.map(|t| t.date_naive()), end.map(|t| t.date_naive()))
    }

    /// Parses date-only strings. RFC 3339 instants are truncated to their UTC day.
    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, RangeError> {
        let start = start.filter(|s| !s.trim().is_empty()).map(parse_day).transpose()?;
        let end = end.filter(|s| !s.trim().is_empty()).map(parse_day).transpose()?;
        Self::from_days(start, end)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| instant >= s) && self.end.map_or(true, |e| instant <= e)
    }
}

fn parse_day(s: &str) -> Result<NaiveDate, RangeError> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|dt| dt.with_timezone(&Utc).date_naive()))
        .map_err(|_| RangeError::InvalidDate(s.to_string()))
}

fn start_of_day(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(NaiveTime::MIN).and_utc()
}

fn end_of_day(day: NaiveDate) -> DateTime<Utc> {
    let last_milli = NaiveTime::MIN + Duration::milliseconds(86_399_999);
    day.and_time(last_milli).and_utc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampAxis {
    Created,
    Completed,
}

/// A ticket as seen by the aggregator.
///
/// `created_at` is optional because rows come straight from storage; a row
/// without a readable creation time is skipped, never fatal.
#[derive(Debug, Clone, PartialEq)]
pub struct TicketRow {
    pub id: String,
    pub category: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl TicketRow {
    fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionSample {
    pub id: String,
    pub category: String,
    /// Hours between creation and completion.
    pub duration: f64,
    pub created_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Rows with a valid creation time, paired with it.
fn dated_rows<'a>(
    tickets: &'a [TicketRow],
) -> impl Iterator<Item = (&'a TicketRow, DateTime<Utc>)> + 'a {
    tickets.iter().filter_map(|t| match t.created_at {
        Some(created) => Some((t, created)),
        None => {
            warn!(ticket_id = %t.id, "skipping ticket without creation timestamp");
            None
        }
    })
}

pub fn compute_daily_counts(tickets: &[TicketRow], range: Option<&DateRange>) -> Vec<DailyCount> {
    let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for (_, created) in dated_rows(tickets) {
        if range.map_or(true, |r| r.contains(created)) {
            *by_day.entry(created.date_naive()).or_insert(0) += 1;
        }
    }

    by_day
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

/// Counts per category in order of first appearance.
pub fn compute_category_counts(
    tickets: &[TicketRow],
    range: Option<&DateRange>,
) -> Vec<CategoryCount> {
    let mut counts: Vec<CategoryCount> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (ticket, created) in dated_rows(tickets) {
        if !range.map_or(true, |r| r.contains(created)) {
            continue;
        }
        let label = ticket.category_label();
        match index.get(label) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(label.to_string(), counts.len());
                counts.push(CategoryCount {
                    category: label.to_string(),
                    count: 1,
                });
            }
        }
    }

    counts
}

pub fn compute_resolution_durations(
    tickets: &[TicketRow],
    range: Option<&DateRange>,
) -> Vec<ResolutionSample> {
    compute_resolution_durations_on(tickets, range, RESOLUTION_FILTER_AXIS)
}

pub fn compute_resolution_durations_on(
    tickets: &[TicketRow],
    range: Option<&DateRange>,
    axis: TimestampAxis,
) -> Vec<ResolutionSample> {
    dated_rows(tickets)
        .filter_map(|(ticket, created)| {
            let finished = ticket.finished_at?;
            let pivot = match axis {
                TimestampAxis::Created => created,
                TimestampAxis::Completed => finished,
            };
            if !range.map_or(true, |r| r.contains(pivot)) {
                return None;
            }
            Some(ResolutionSample {
                id: ticket.id.clone(),
                category: ticket.category_label().to_string(),
                duration: resolution_hours(created, finished),
                created_at: created,
                finished_at: finished,
            })
        })
        .collect()
}

/// Elapsed hours rounded to two decimals, never below [`MIN_RESOLUTION_HOURS`].
pub fn resolution_hours(created: DateTime<Utc>, finished: DateTime<Utc>) -> f64 {
    let millis = finished.signed_duration_since(created).num_milliseconds();
    let hours = millis as f64 / 3_600_000.0;
    let rounded = (hours * 100.0).round() / 100.0;
    if rounded <= 0.0 {
        MIN_RESOLUTION_HOURS
    } else {
        rounded
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown report type '{0}'. Must be one of: quantity, byCategory, resolutionDuration")]
pub struct UnknownReportType(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReportType {
    Quantity,
    ByCategory,
    ResolutionDuration,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Quantity => "quantity",
            ReportType::ByCategory => "byCategory",
            ReportType::ResolutionDuration => "resolutionDuration",
        }
    }

    /// Timestamp the store should filter on when fetching rows for this report.
    pub fn filter_axis(&self) -> TimestampAxis {
        match self {
            ReportType::Quantity | ReportType::ByCategory => TimestampAxis::Created,
            ReportType::ResolutionDuration => RESOLUTION_FILTER_AXIS,
        }
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportType {
    type Err = UnknownReportType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "quantity" => Ok(ReportType::Quantity),
            "byCategory" => Ok(ReportType::ByCategory),
            "resolutionDuration" => Ok(ReportType::ResolutionDuration),
            other => Err(UnknownReportType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportData {
    Quantity(Vec<DailyCount>),
    ByCategory(Vec<CategoryCount>),
    ResolutionDuration(Vec<ResolutionSample>),
}

impl ReportData {
    pub fn len(&self) -> usize {
        match self {
            ReportData::Quantity(v) => v.len(),
            ReportData::ByCategory(v) => v.len(),
            ReportData::ResolutionDuration(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn build_report(kind: ReportType, tickets: &[TicketRow], range: Option<&DateRange>) -> ReportData {
    match kind {
        ReportType::Quantity => ReportData::Quantity(compute_daily_counts(tickets, range)),
        ReportType::ByCategory => ReportData::ByCategory(compute_category_counts(tickets, range)),
        ReportType::ResolutionDuration => {
            ReportData::ResolutionDuration(compute_resolution_durations(tickets, range))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    fn row(id: &str, cat: Option<&str>, created: DateTime<Utc>, done: Option<DateTime<Utc>>) -> TicketRow {
        TicketRow {
            id: id.to_string(),
            category: cat.map(String::from),
            created_at: Some(created),
            finished_at: done,
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // ==================== DateRange ====================

    #[test]
    fn test_range_normalizes_to_whole_days() {
        let range = DateRange::parse(Some("2024-01-05"), Some("2024-01-06")).unwrap();
        assert_eq!(range.start().unwrap(), at(2024, 1, 5, 0, 0));
        let end = range.end().unwrap();
        assert_eq!(end.date_naive(), day("2024-01-06"));
        assert_eq!(end.format("%H:%M:%S%.3f").to_string(), "23:59:59.999");
    }

    #[test]
    fn test_range_from_instants_widens() {
        let range =
            DateRange::from_instants(Some(at(2024, 3, 1, 15, 30)), Some(at(2024, 3, 1, 8, 0))).unwrap();
        assert!(range.contains(at(2024, 3, 1, 0, 0)));
        assert!(range.contains(at(2024, 3, 1, 23, 59)));
        assert!(!range.contains(at(2024, 3, 2, 0, 0)));
    }

    #[test]
    fn test_range_accepts_rfc3339() {
        let range = DateRange::parse(Some("2024-01-05T18:00:00Z"), None).unwrap();
        assert_eq!(range.start().unwrap(), at(2024, 1, 5, 0, 0));
        assert!(range.end().is_none());
    }

    #[test]
    fn test_range_open_bounds() {
        let range = DateRange::parse(None, Some("2024-01-05")).unwrap();
        assert!(range.contains(at(1999, 1, 1, 0, 0)));
        assert!(!range.contains(at(2024, 1, 6, 0, 0)));
        assert!(DateRange::parse(None, None).unwrap().is_unbounded());
        assert!(DateRange::parse(Some(""), Some("  ")).unwrap().is_unbounded());
    }

    #[test]
    fn test_range_rejects_garbage() {
        let err = DateRange::parse(Some("05/01/2024"), None).unwrap_err();
        assert_eq!(err, RangeError::InvalidDate("05/01/2024".to_string()));
    }

    #[test]
    fn test_range_rejects_inverted() {
        let err = DateRange::parse(Some("2024-02-01"), Some("2024-01-01")).unwrap_err();
        assert!(matches!(err, RangeError::Inverted { .. }));
    }

    // ==================== Daily counts ====================

    #[test]
    fn test_daily_counts_empty() {
        assert!(compute_daily_counts(&[], None).is_empty());
    }

    #[test]
    fn test_daily_bucket_ignores_time_of_day() {
        let rows = vec![
            row("1", Some("A"), at(2024, 1, 5, 23, 50), None),
            row("2", Some("A"), at(2024, 1, 5, 0, 10), None),
        ];
        let counts = compute_daily_counts(&rows, None);
        assert_eq!(
            counts,
            vec![DailyCount {
                date: day("2024-01-05"),
                count: 2
            }]
        );
    }

    #[test]
    fn test_daily_counts_sorted_and_sparse() {
        let rows = vec![
            row("1", Some("A"), at(2024, 1, 9, 12, 0), None),
            row("2", Some("A"), at(2024, 1, 2, 12, 0), None),
            row("3", Some("B"), at(2024, 1, 9, 1, 0), None),
        ];
        let counts = compute_daily_counts(&rows, None);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts[0].date, day("2024-01-02"));
        assert_eq!(counts[1].date, day("2024-01-09"));
        assert_eq!(counts[1].count, 2);
    }

    #[test]
    fn test_daily_counts_respect_range() {
        let rows = vec![
            row("1", Some("A"), at(2024, 1, 4, 23, 59), None),
            row("2", Some("A"), at(2024, 1, 5, 0, 0), None),
            row("3", Some("A"), at(2024, 1, 6, 23, 59), None),
            row("4", Some("A"), at(2024, 1, 7, 0, 0), None),
        ];
        let range = DateRange::parse(Some("2024-01-05"), Some("2024-01-06")).unwrap();
        let counts = compute_daily_counts(&rows, Some(&range));
        let total: u64 = counts.iter().map(|c| c.count).sum();
        assert_eq!(total, 2);
    }

    #[test]
    fn test_rows_without_creation_are_skipped() {
        let mut rows = vec![row("1", Some("A"), at(2024, 1, 5, 10, 0), None)];
        rows.push(TicketRow {
            id: "broken".to_string(),
            category: Some("A".to_string()),
            created_at: None,
            finished_at: Some(at(2024, 1, 6, 0, 0)),
        });
        assert_eq!(compute_daily_counts(&rows, None)[0].count, 1);
        assert_eq!(compute_category_counts(&rows, None)[0].count, 1);
        assert!(compute_resolution_durations(&rows, None).is_empty());
    }

    // ==================== Category counts ====================

    #[test]
    fn test_scenario_categories_and_durations() {
        let d0 = at(2024, 5, 1, 9, 0);
        let rows = vec![
            row("a1", Some("A"), d0, Some(d0 + Duration::hours(2))),
            row("a2", Some("A"), d0, None),
            row("b1", Some("B"), d0, Some(d0 + Duration::hours(5))),
        ];

        let counts = compute_category_counts(&rows, None);
        assert_eq!(
            counts,
            vec![
                CategoryCount {
                    category: "A".to_string(),
                    count: 2
                },
                CategoryCount {
                    category: "B".to_string(),
                    count: 1
                },
            ]
        );

        let durations = compute_resolution_durations(&rows, None);
        assert_eq!(durations.len(), 2);
        assert_eq!(durations[0].category, "A");
        assert_eq!(durations[0].duration, 2.0);
        assert_eq!(durations[1].category, "B");
        assert_eq!(durations[1].duration, 5.0);
    }

    #[test]
    fn test_missing_category_uses_sentinel() {
        let rows = vec![
            row("1", None, at(2024, 1, 5, 10, 0), None),
            row("2", None, at(2024, 1, 5, 11, 0), None),
            row("3", Some("A"), at(2024, 1, 5, 12, 0), None),
        ];
        let counts = compute_category_counts(&rows, None);
        assert_eq!(counts[0].category, UNKNOWN_CATEGORY);
        assert_eq!(counts[0].count, 2);
        assert_eq!(counts[1].category, "A");
    }

    #[test]
    fn test_category_match_is_exact() {
        let rows = vec![
            row("1", Some("Sugestão"), at(2024, 1, 5, 10, 0), None),
            row("2", Some("sugestão"), at(2024, 1, 5, 11, 0), None),
        ];
        assert_eq!(compute_category_counts(&rows, None).len(), 2);
    }

    // ==================== Resolution durations ====================

    #[test]
    fn test_duration_clamped_when_instant() {
        let t = at(2024, 1, 5, 10, 0);
        let rows = vec![row("1", Some("A"), t, Some(t))];
        let samples = compute_resolution_durations(&rows, None);
        assert_eq!(samples[0].duration, MIN_RESOLUTION_HOURS);
    }

    #[test]
    fn test_duration_clamped_when_negative() {
        let t = at(2024, 1, 5, 10, 0);
        assert_eq!(resolution_hours(t, t - Duration::hours(3)), MIN_RESOLUTION_HOURS);
    }

    #[test]
    fn test_duration_clamped_when_rounding_to_zero() {
        let t = at(2024, 1, 5, 10, 0);
        assert_eq!(resolution_hours(t, t + Duration::seconds(10)), MIN_RESOLUTION_HOURS);
    }

    #[test]
    fn test_duration_rounds_to_two_decimals() {
        let t = at(2024, 1, 5, 10, 0);
        assert_eq!(resolution_hours(t, t + Duration::minutes(90)), 1.5);
        assert_eq!(resolution_hours(t, t + Duration::minutes(20)), 0.33);
    }

    #[test]
    fn test_resolution_filters_on_completion_by_default() {
        let opened = at(2024, 1, 1, 10, 0);
        let rows = vec![row("1", Some("A"), opened, Some(at(2024, 2, 10, 10, 0)))];
        let feb = DateRange::parse(Some("2024-02-01"), Some("2024-02-29")).unwrap();

        assert_eq!(compute_resolution_durations(&rows, Some(&feb)).len(), 1);
        assert!(compute_resolution_durations_on(&rows, Some(&feb), TimestampAxis::Created).is_empty());
    }

    // ==================== Report type ====================

    #[test]
    fn test_report_type_parse() {
        assert_eq!("quantity".parse::<ReportType>().unwrap(), ReportType::Quantity);
        assert_eq!("byCategory".parse::<ReportType>().unwrap(), ReportType::ByCategory);
        assert_eq!(
            "resolutionDuration".parse::<ReportType>().unwrap(),
            ReportType::ResolutionDuration
        );
    }

    #[test]
    fn test_report_type_unknown() {
        let err = "pie".parse::<ReportType>().unwrap_err();
        assert_eq!(err, UnknownReportType("pie".to_string()));
        assert!(err.to_string().contains("Unknown report type"));
    }

    #[test]
    fn test_report_data_len() {
        let empty = build_report(ReportType::ByCategory, &[], None);
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
    }

    #[test]
    fn test_report_data_serializes_as_plain_array() {
        let rows = vec![row("1", Some("A"), at(2024, 1, 5, 10, 0), None)];
        let data = build_report(ReportType::Quantity, &rows, None);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json, serde_json::json!([{"date": "2024-01-05", "count": 1}]));
    }

    // ==================== Property-Based Tests ====================

    fn arb_rows() -> impl Strategy<Value = Vec<TicketRow>> {
        let base = at(2024, 1, 1, 0, 0);
        prop::collection::vec(
            (0i64..60 * 24 * 60, prop::option::of(0i64..20 * 24 * 60), prop::option::of(0usize..4)),
            0..60,
        )
        .prop_map(move |items| {
            items
                .into_iter()
                .enumerate()
                .map(|(i, (created_min, done_after, cat))| {
                    let created = base + Duration::minutes(created_min);
                    TicketRow {
                        id: i.to_string(),
                        category: cat.map(|c| ["A", "B", "C", "D"][c].to_string()),
                        created_at: Some(created),
                        finished_at: done_after.map(|m| created + Duration::minutes(m)),
                    }
                })
                .collect()
        })
    }

    fn arb_range() -> impl Strategy<Value = Option<DateRange>> {
        prop::option::of((0i64..60, 0i64..30)).prop_map(|r| {
            r.map(|(offset, len)| {
                let start = day("2024-01-01") + Duration::days(offset);
                DateRange::from_days(Some(start), Some(start + Duration::days(len))).unwrap()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_daily_sum_matches_filtered(rows in arb_rows(), range in arb_range()) {
            let expected = rows
                .iter()
                .filter(|r| range.as_ref().map_or(true, |rg| rg.contains(r.created_at.unwrap())))
                .count() as u64;
            let total: u64 = compute_daily_counts(&rows, range.as_ref()).iter().map(|c| c.count).sum();
            prop_assert_eq!(total, expected);
        }

        #[test]
        fn prop_category_sum_matches_filtered(rows in arb_rows(), range in arb_range()) {
            let expected = rows
                .iter()
                .filter(|r| range.as_ref().map_or(true, |rg| rg.contains(r.created_at.unwrap())))
                .count() as u64;
            let total: u64 = compute_category_counts(&rows, range.as_ref()).iter().map(|c| c.count).sum();
            prop_assert_eq!(total, expected);
        }

        #[test]
        fn prop_daily_counts_idempotent(rows in arb_rows(), range in arb_range()) {
            let first = compute_daily_counts(&rows, range.as_ref());
            let second = compute_daily_counts(&rows, range.as_ref());
            prop_assert_eq!(first, second);
        }

        #[test]
        fn prop_durations_positive_and_only_completed(rows in arb_rows()) {
            let samples = compute_resolution_durations(&rows, None);
            let completed = rows.iter().filter(|r| r.finished_at.is_some()).count();
            prop_assert_eq!(samples.len(), completed);
            for s in samples {
                prop_assert!(s.duration >= MIN_RESOLUTION_HOURS);
            }
        }
    }
}
