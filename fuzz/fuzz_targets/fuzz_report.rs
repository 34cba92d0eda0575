#![no_main]

//! Fuzz target for the report aggregator.
//!
//! Builds arbitrary ticket rows (missing timestamps, completion before
//! creation, absent categories) and arbitrary range strings, then checks the
//! counting invariants hold and nothing panics.

use arbitrary::Arbitrary;
use chrono::{DateTime, Duration, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use ouvidoria::report::{
    build_report, compute_category_counts, compute_daily_counts, compute_resolution_durations,
    DateRange, ReportType, TicketRow, MIN_RESOLUTION_HOURS,
};

#[derive(Arbitrary, Debug)]
struct FuzzRow {
    category: Option<u8>,
    created_offset: Option<u32>,
    finished_delta: Option<i32>,
}

#[derive(Arbitrary, Debug)]
struct ReportInput {
    rows: Vec<FuzzRow>,
    start: Option<String>,
    end: Option<String>,
    report_type: String,
}

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fuzz_target!(|input: ReportInput| {
    let rows: Vec<TicketRow> = input
        .rows
        .iter()
        .take(200)
        .enumerate()
        .map(|(i, r)| {
            let created = r
                .created_offset
                .map(|o| base() + Duration::seconds(i64::from(o % (400 * 86_400))));
            TicketRow {
                id: i.to_string(),
                category: r.category.map(|c| format!("C{}", c % 8)),
                created_at: created,
                finished_at: r.finished_delta.and_then(|d| {
                    created.map(|c| c + Duration::seconds(i64::from(d)))
                }),
            }
        })
        .collect();

    let range = match DateRange::parse(input.start.as_deref(), input.end.as_deref()) {
        Ok(range) => range,
        Err(_) => return,
    };

    let in_range = rows
        .iter()
        .filter(|r| r.created_at.map_or(false, |c| range.contains(c)))
        .count() as u64;

    let daily = compute_daily_counts(&rows, Some(&range));
    assert_eq!(daily.iter().map(|d| d.count).sum::<u64>(), in_range);
    assert!(daily.windows(2).all(|w| w[0].date < w[1].date));

    let categories = compute_category_counts(&rows, Some(&range));
    assert_eq!(categories.iter().map(|c| c.count).sum::<u64>(), in_range);

    for sample in compute_resolution_durations(&rows, Some(&range)) {
        assert!(sample.duration >= MIN_RESOLUTION_HOURS);
    }

    if let Ok(kind) = input.report_type.parse::<ReportType>() {
        let data = build_report(kind, &rows, Some(&range));
        let _ = serde_json::to_string(&data);
    }
});
