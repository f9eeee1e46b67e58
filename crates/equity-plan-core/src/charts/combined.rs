use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calendar::format_iso_date;
use crate::charts::schedule::{CompanySchedules, EmployeeSchedule, ScheduleEntry};
use crate::charts::series::{accumulate, build_cumulative_series, SeriesInput, SkippedEntry, VestingSeries};
use crate::types::{with_metadata, BucketAmounts, CalendarDate, ComputationOutput, EquityBucket, Shares, VestingFrequency};
use crate::EquityPlanResult;

/// Per-grant line in the company-wide view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeVestingSummary {
    pub unique_id: String,
    pub name: String,
    pub grant_id: u64,
    pub total_vested: Shares,
    pub first_vest: Option<CalendarDate>,
    pub last_vest: Option<CalendarDate>,
    pub events: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyVestingChart {
    pub series: VestingSeries,
    pub employees: Vec<EmployeeVestingSummary>,
}

/// Re-express one grant's schedule as dated per-period deltas.
///
/// Going through the running total first means server `cumulative_vested`
/// values from different grants are never summed as if they were deltas.
fn grant_deltas(schedule: &EmployeeSchedule) -> (Vec<ScheduleEntry>, EmployeeVestingSummary) {
    let (running, skipped, breakdown) = accumulate(&schedule.schedule);

    let mut deltas = Vec::with_capacity(running.len());
    let mut prev_total: Shares = 0;
    let mut prev_buckets = BucketAmounts::default();
    for point in &running {
        let mut entry = ScheduleEntry::new(format_iso_date(point.date), point.cumulative - prev_total);
        if breakdown {
            for b in EquityBucket::ALL {
                let delta = point.buckets.get(b).saturating_sub(prev_buckets.get(b));
                match b {
                    EquityBucket::Iso => entry.iso = Some(delta),
                    EquityBucket::Nqo => entry.nqo = Some(delta),
                    EquityBucket::Rsu => entry.rsu = Some(delta),
                    EquityBucket::Common => entry.common = Some(delta),
                    EquityBucket::Preferred => entry.preferred = Some(delta),
                }
            }
        }
        prev_total = point.cumulative;
        prev_buckets = point.buckets;
        deltas.push(entry);
    }

    let summary = EmployeeVestingSummary {
        unique_id: schedule.unique_id.clone(),
        name: schedule.name.clone(),
        grant_id: schedule.grant_id,
        total_vested: prev_total,
        first_vest: running.first().map(|p| p.date),
        last_vest: running.last().map(|p| p.date),
        events: running.len(),
        skipped,
    };
    (deltas, summary)
}

/// Merge every grant into one company-wide cumulative series.
pub fn build_company_series(
    all: &CompanySchedules,
    frequency: VestingFrequency,
) -> CompanyVestingChart {
    let mut events = Vec::new();
    let mut employees = Vec::with_capacity(all.schedules.len());
    for schedule in &all.schedules {
        let (deltas, summary) = grant_deltas(schedule);
        debug!(grant_id = summary.grant_id, events = deltas.len(), "merged grant schedule");
        events.extend(deltas);
        employees.push(summary);
    }

    // Per-grant skips are reported on the employee rows; the merged input is clean.
    let series = build_cumulative_series(&SeriesInput {
        events,
        frequency,
        vesting_start: None,
        vesting_end: None,
    });

    CompanyVestingChart { series, employees }
}

/// Company-wide chart, enveloped.
pub fn chart_company_schedules(
    all: &CompanySchedules,
    frequency: VestingFrequency,
) -> EquityPlanResult<ComputationOutput<CompanyVestingChart>> {
    let start = Instant::now();
    let chart = build_company_series(all, frequency);

    let mut warnings = Vec::new();
    for emp in &chart.employees {
        for s in &emp.skipped {
            warnings.push(format!(
                "grant {} ({}): entry {} skipped: {} ({:?})",
                emp.grant_id, emp.unique_id, s.index, s.reason, s.date
            ));
        }
    }
    if chart.series.is_empty() {
        warnings.push("no vesting events across any grant".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Company-wide cumulative vesting, grants merged as per-period deltas",
        &serde_json::json!({
            "frequency": frequency,
            "grants": all.schedules.len(),
        }),
        warnings,
        elapsed,
        chart,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn company() -> CompanySchedules {
        serde_json::from_value(json!({
            "schedules": [
                {"unique_id": "EMP-1", "name": "Ada", "grant_id": 1, "schedule": [
                    {"date": "2024-01-01", "cumulative_vested": 100},
                    {"date": "2024-02-01", "cumulative_vested": 200}
                ]},
                {"unique_id": "EMP-2", "name": "Lin", "grant_id": 2, "schedule": [
                    {"date": "2024-01-15", "total_vested": 10},
                    {"date": "2024-03-15", "total_vested": 10},
                    {"date": "bad", "total_vested": 999}
                ]}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_company_series_merges_grants() {
        let chart = build_company_series(&company(), VestingFrequency::Monthly);
        let points: Vec<(String, Shares)> = chart
            .series
            .points
            .iter()
            .map(|p| (p.key.clone(), p.cumulative))
            .collect();
        assert_eq!(
            points,
            vec![
                ("2024-01".to_string(), 110),
                ("2024-02".to_string(), 210),
                ("2024-03".to_string(), 220),
            ]
        );
    }

    #[test]
    fn test_employee_summaries() {
        let chart = build_company_series(&company(), VestingFrequency::Monthly);
        assert_eq!(chart.employees.len(), 2);
        assert_eq!(chart.employees[0].total_vested, 200);
        assert_eq!(chart.employees[1].total_vested, 20);
        assert_eq!(chart.employees[1].events, 2);
        assert_eq!(chart.employees[1].skipped.len(), 1);
    }

    #[test]
    fn test_chart_company_reports_skips() {
        let out = chart_company_schedules(&company(), VestingFrequency::Monthly).unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("EMP-2"));
        assert_eq!(out.result.series.final_cumulative(), 220);
    }

    #[test]
    fn test_empty_company() {
        let out = chart_company_schedules(&CompanySchedules::default(), VestingFrequency::Yearly).unwrap();
        assert!(out.result.series.is_empty());
        assert!(out.result.employees.is_empty());
    }

    #[test]
    fn test_grant_without_detail_drops_company_breakdown() {
        let all: CompanySchedules = serde_json::from_value(json!({
            "schedules": [
                {"unique_id": "A", "name": "A", "grant_id": 1, "schedule": [
                    {"date": "2024-01-01", "total_vested": 100}
                ]},
                {"unique_id": "B", "name": "B", "grant_id": 2, "schedule": [
                    {"date": "2024-01-02", "rsu": 5, "total_vested": 5}
                ]}
            ]
        }))
        .unwrap();
        let chart = build_company_series(&all, VestingFrequency::Yearly);
        assert_eq!(chart.series.final_cumulative(), 105);
        for p in &chart.series.points {
            assert!(p.by_bucket.map_or(true, |b| b.total() == p.cumulative), "{}", p.key);
        }
        assert_eq!(chart.series.points[0].by_bucket, None);
    }

    #[test]
    fn test_bucket_detail_survives_merge() {
        let all: CompanySchedules = serde_json::from_value(json!({
            "schedules": [
                {"unique_id": "A", "name": "A", "grant_id": 1, "schedule": [
                    {"date": "2024-01-01", "iso": 10, "total_vested": 10}
                ]},
                {"unique_id": "B", "name": "B", "grant_id": 2, "schedule": [
                    {"date": "2024-01-02", "rsu": 5, "total_vested": 5}
                ]}
            ]
        }))
        .unwrap();
        let chart = build_company_series(&all, VestingFrequency::Yearly);
        let last = chart.series.points.last().unwrap();
        let buckets = last.by_bucket.unwrap();
        assert_eq!(buckets.iso, 10);
        assert_eq!(buckets.rsu, 5);
        assert_eq!(last.cumulative, 15);
    }
}
