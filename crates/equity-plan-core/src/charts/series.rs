use std::time::Instant;

use chrono::Datelike;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::calendar::{format_iso_date, year_end};
use crate::charts::schedule::{GrantScheduleResponse, ScheduleEntry};
use crate::error::EquityPlanError;
use crate::types::{with_metadata, BucketAmounts, CalendarDate, ComputationOutput, Shares, VestingFrequency};
use crate::EquityPlanResult;

// ---------------------------------------------------------------------------
// Input / output types
// ---------------------------------------------------------------------------

/// Everything needed to chart one grant's schedule.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeriesInput {
    #[serde(default)]
    pub events: Vec<ScheduleEntry>,
    #[serde(default)]
    pub frequency: VestingFrequency,
    /// Bounds the yearly gap-fill; defaults to the first event's year.
    #[serde(default)]
    pub vesting_start: Option<CalendarDate>,
    /// Bounds the yearly gap-fill; defaults to the last event's year.
    #[serde(default)]
    pub vesting_end: Option<CalendarDate>,
}

impl SeriesInput {
    /// Chart input for a schedule response, taking frequency and window from
    /// the grant when present. `frequency` overrides the grant's own.
    pub fn from_response(resp: &GrantScheduleResponse, frequency: Option<VestingFrequency>) -> Self {
        let grant = resp.grant.as_ref();
        SeriesInput {
            events: resp.schedule.clone(),
            frequency: frequency
                .or_else(|| grant.map(|g| g.frequency()))
                .unwrap_or_default(),
            vesting_start: grant.and_then(|g| g.start()),
            vesting_end: grant.and_then(|g| g.end()),
        }
    }
}

/// One point on the cumulative vesting chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeVestingPoint {
    /// x-axis category: `YYYY-MM-DD`, `YYYY-MM` or `YYYY` by frequency.
    pub key: String,
    pub date: CalendarDate,
    pub cumulative: Shares,
    /// Cumulative shares per equity type, when the schedule carried them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub by_bucket: Option<BucketAmounts>,
    /// Synthesized by yearly gap-fill rather than observed.
    #[serde(default, skip_serializing_if = "is_false")]
    pub carried: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// A schedule entry left out of the series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedEntry {
    pub index: usize,
    pub date: String,
    pub reason: String,
}

/// Chart-ready series: ordered by date, keys unique, cumulative non-decreasing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingSeries {
    pub frequency: VestingFrequency,
    pub points: Vec<CumulativeVestingPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedEntry>,
}

impl VestingSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Cumulative total at the last point, zero when empty.
    pub fn final_cumulative(&self) -> Shares {
        self.points.last().map(|p| p.cumulative).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Chart key for `date` at `frequency`.
pub fn period_key(date: CalendarDate, frequency: VestingFrequency) -> String {
    match frequency {
        VestingFrequency::Daily | VestingFrequency::Weekly | VestingFrequency::Biweekly => {
            format_iso_date(date)
        }
        VestingFrequency::Monthly => format!("{:04}-{:02}", date.year(), date.month()),
        VestingFrequency::Yearly => format!("{:04}", date.year()),
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// A dated running total, before grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RunningPoint {
    pub date: CalendarDate,
    pub cumulative: Shares,
    pub buckets: BucketAmounts,
}

/// Parse, order and accumulate entries.
///
/// Entries whose date does not parse are reported and left out. Ordering is
/// a stable sort on date, so same-day entries keep their payload order. A
/// server-side `cumulative_vested` replaces the running total; otherwise the
/// period delta is added. The total never decreases: a server value below the
/// running total is held at the running total.
///
/// The returned flag says whether per-bucket totals can be charted: every
/// entry carries bucket counts and the bucket totals add up to the running
/// total at every point. A breakdown that would not stack to the cumulative
/// line is dropped for the whole schedule.
pub(crate) fn accumulate(entries: &[ScheduleEntry]) -> (Vec<RunningPoint>, Vec<SkippedEntry>, bool) {
    let mut skipped = Vec::new();
    let mut dated: Vec<(CalendarDate, &ScheduleEntry)> = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match entry.parsed_date() {
            Some(date) => dated.push((date, entry)),
            None => {
                warn!(index, date = %entry.date, "skipping schedule entry with malformed date");
                skipped.push(SkippedEntry {
                    index,
                    date: entry.date.clone(),
                    reason: "date is not YYYY-MM-DD".into(),
                });
            }
        }
    }
    dated.sort_by_key(|(date, _)| *date);

    let any_detail = dated.iter().any(|(_, e)| e.has_bucket_detail());
    let mut breakdown = !dated.is_empty() && dated.iter().all(|(_, e)| e.has_bucket_detail());
    let mut running: Shares = 0;
    let mut buckets = BucketAmounts::default();
    let mut points = Vec::with_capacity(dated.len());

    for (date, entry) in dated {
        running = match entry.cumulative_vested {
            Some(server) if server < running => {
                warn!(%date, server, running, "server cumulative below running total, holding");
                running
            }
            Some(server) => server,
            None => running.saturating_add(entry.period_delta()),
        };
        buckets = buckets.saturating_add(&entry.buckets());
        if breakdown && buckets.total() != running {
            breakdown = false;
        }
        points.push(RunningPoint {
            date,
            cumulative: running,
            buckets,
        });
    }
    if any_detail && !breakdown {
        warn!("bucket counts do not add up to the vested totals, omitting breakdown");
    }
    (points, skipped, breakdown)
}

/// Build the cumulative chart series for one schedule.
///
/// DAILY, WEEKLY and BIWEEKLY keep one point per event date; MONTHLY keeps
/// the last point of each month; YEARLY keeps the last point of each year and
/// then fills every missing year between the vesting window bounds (widened
/// to cover the events) with the previous total, dated December 31st.
/// Empty input gives an empty series.
pub fn build_cumulative_series(input: &SeriesInput) -> VestingSeries {
    let (running, skipped, has_detail) = accumulate(&input.events);
    let mut points = group_last_per_key(&running, input.frequency, has_detail);

    if input.frequency == VestingFrequency::Yearly && !points.is_empty() {
        points = fill_years(points, input.vesting_start, input.vesting_end, has_detail);
    }

    VestingSeries {
        frequency: input.frequency,
        points,
        skipped,
    }
}

/// Collapse consecutive points sharing a key, keeping the last of each run.
/// Input is date-ordered, so equal keys are always adjacent.
fn group_last_per_key(
    running: &[RunningPoint],
    frequency: VestingFrequency,
    has_detail: bool,
) -> Vec<CumulativeVestingPoint> {
    let mut out: Vec<CumulativeVestingPoint> = Vec::new();
    for p in running {
        let point = CumulativeVestingPoint {
            key: period_key(p.date, frequency),
            date: p.date,
            cumulative: p.cumulative,
            by_bucket: has_detail.then_some(p.buckets),
            carried: false,
        };
        match out.last_mut() {
            Some(last) if last.key == point.key => *last = point,
            _ => out.push(point),
        }
    }
    out
}

fn fill_years(
    observed: Vec<CumulativeVestingPoint>,
    vesting_start: Option<CalendarDate>,
    vesting_end: Option<CalendarDate>,
    has_detail: bool,
) -> Vec<CumulativeVestingPoint> {
    let (Some(first), Some(last)) = (observed.first(), observed.last()) else {
        return observed;
    };
    let first_year = vesting_start
        .map(|d| d.year())
        .map_or(first.date.year(), |y| y.min(first.date.year()));
    let last_year = vesting_end
        .map(|d| d.year())
        .map_or(last.date.year(), |y| y.max(last.date.year()));

    let mut filled = Vec::with_capacity(observed.len());
    let mut observed = observed.into_iter().peekable();
    let mut carried_total: Shares = 0;
    let mut carried_buckets = BucketAmounts::default();

    for year in first_year..=last_year {
        match observed.next_if(|p| p.date.year() == year) {
            Some(point) => {
                carried_total = point.cumulative;
                carried_buckets = point.by_bucket.unwrap_or_default();
                filled.push(point);
            }
            None => {
                let Some(date) = year_end(year) else { continue };
                filled.push(CumulativeVestingPoint {
                    key: format!("{year:04}"),
                    date,
                    cumulative: carried_total,
                    by_bucket: has_detail.then_some(carried_buckets),
                    carried: true,
                });
            }
        }
    }
    filled
}

/// Validated, enveloped series for one grant.
pub fn chart_schedule(input: &SeriesInput) -> EquityPlanResult<ComputationOutput<VestingSeries>> {
    let start = Instant::now();

    if let (Some(vs), Some(ve)) = (input.vesting_start, input.vesting_end) {
        if ve < vs {
            return Err(EquityPlanError::InvalidInput {
                field: "vesting_end".into(),
                reason: "vesting_end must not precede vesting_start".into(),
            });
        }
    }

    let series = build_cumulative_series(input);
    let mut warnings: Vec<String> = series
        .skipped
        .iter()
        .map(|s| format!("entry {} skipped: {} ({:?})", s.index, s.reason, s.date))
        .collect();
    if series.is_empty() {
        warnings.push("no vesting events; nothing to chart".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Cumulative vesting series, last value per period",
        &serde_json::json!({
            "frequency": input.frequency,
            "vesting_start": input.vesting_start,
            "vesting_end": input.vesting_end,
            "events": input.events.len(),
            "server_cumulative_preferred": true,
            "yearly_gap_fill": "last observation carried forward to Dec 31",
        }),
        warnings,
        elapsed,
        series,
    ))
}
