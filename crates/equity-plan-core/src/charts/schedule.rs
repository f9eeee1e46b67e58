//! Vesting-schedule payloads as the backend returns them.
//!
//! Entries arrive either as a bare array or wrapped with the grant they
//! belong to. Every numeric field is optional and read leniently: numbers,
//! numeric strings and nulls are all accepted, fractions are truncated and
//! negatives floor at zero.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::calendar::parse_iso_date;
use crate::types::{BucketAmounts, CalendarDate, EquityBucket, Shares, VestingFrequency};

/// One vesting period from the schedule endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// `YYYY-MM-DD`; kept raw so malformed dates can be reported.
    #[serde(default)]
    pub date: String,
    /// Shares vesting in this period.
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub total_vested: Option<Shares>,
    /// Running total as of this period, when the server computed it.
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub cumulative_vested: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub iso: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub nqo: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub rsu: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub common: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares", skip_serializing_if = "Option::is_none")]
    pub preferred: Option<Shares>,
}

impl ScheduleEntry {
    pub fn new(date: impl Into<String>, total_vested: Shares) -> Self {
        ScheduleEntry {
            date: date.into(),
            total_vested: Some(total_vested),
            ..Default::default()
        }
    }

    pub fn cumulative(date: impl Into<String>, cumulative_vested: Shares) -> Self {
        ScheduleEntry {
            date: date.into(),
            cumulative_vested: Some(cumulative_vested),
            ..Default::default()
        }
    }

    pub fn parsed_date(&self) -> Option<CalendarDate> {
        parse_iso_date(&self.date)
    }

    pub fn has_bucket_detail(&self) -> bool {
        EquityBucket::ALL.iter().any(|b| self.bucket(*b).is_some())
    }

    pub fn bucket(&self, bucket: EquityBucket) -> Option<Shares> {
        match bucket {
            EquityBucket::Iso => self.iso,
            EquityBucket::Nqo => self.nqo,
            EquityBucket::Rsu => self.rsu,
            EquityBucket::Common => self.common,
            EquityBucket::Preferred => self.preferred,
        }
    }

    /// Per-type shares vesting in this period, zero where absent.
    pub fn buckets(&self) -> BucketAmounts {
        let mut out = BucketAmounts::default();
        for b in EquityBucket::ALL {
            out.set(b, self.bucket(b).unwrap_or(0));
        }
        out
    }

    /// Shares vesting in this period: `total_vested`, else the per-type sum.
    pub fn period_delta(&self) -> Shares {
        self.total_vested.unwrap_or_else(|| self.buckets().total())
    }
}

/// The grant fields the chart needs, out of the grant detail payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummary {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub unique_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub stock_class_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_shares")]
    pub num_shares: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares")]
    pub iso_shares: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares")]
    pub nqo_shares: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares")]
    pub rsu_shares: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares")]
    pub common_shares: Option<Shares>,
    #[serde(default, deserialize_with = "lenient_shares")]
    pub preferred_shares: Option<Shares>,
    #[serde(default)]
    pub vesting_start: Option<String>,
    #[serde(default)]
    pub vesting_end: Option<String>,
    #[serde(default)]
    pub vesting_frequency: Option<String>,
}

impl GrantSummary {
    /// Declared frequency; missing or unknown codes fall back to monthly,
    /// the backend default.
    pub fn frequency(&self) -> VestingFrequency {
        self.vesting_frequency
            .as_deref()
            .and_then(|f| f.parse().ok())
            .unwrap_or_default()
    }

    pub fn start(&self) -> Option<CalendarDate> {
        self.vesting_start.as_deref().and_then(parse_iso_date)
    }

    pub fn end(&self) -> Option<CalendarDate> {
        self.vesting_end.as_deref().and_then(parse_iso_date)
    }

    /// Preferred stock vests on grant and has no schedule.
    pub fn vests_immediately(&self) -> bool {
        self.preferred_shares.unwrap_or(0) > 0
    }
}

/// Body of the per-grant schedule endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantScheduleResponse {
    #[serde(default)]
    pub grant: Option<GrantSummary>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub schedule: Vec<ScheduleEntry>,
}

/// A schedule as received: wrapped with its grant, or a bare entry array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SchedulePayload {
    Bare(Vec<ScheduleEntry>),
    Wrapped(GrantScheduleResponse),
}

impl SchedulePayload {
    pub fn into_response(self) -> GrantScheduleResponse {
        match self {
            SchedulePayload::Bare(schedule) => GrantScheduleResponse {
                grant: None,
                schedule,
            },
            SchedulePayload::Wrapped(resp) => resp,
        }
    }
}

/// One grant's schedule in the company-wide listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSchedule {
    #[serde(default)]
    pub unique_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub grant_id: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub schedule: Vec<ScheduleEntry>,
}

/// Body of the company-wide schedule endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySchedules {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub schedules: Vec<EmployeeSchedule>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_shares<'de, D>(deserializer: D) -> Result<Option<Shares>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(shares_from_value))
}

/// Share count from a JSON scalar; `None` for anything non-numeric.
pub fn shares_from_value(value: &serde_json::Value) -> Option<Shares> {
    let amount = match value {
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                return Some(u);
            }
            if let Some(i) = n.as_i64() {
                return Some(u64::try_from(i).unwrap_or(0));
            }
            Decimal::from_f64_retain(n.as_f64()?)?
        }
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok()?,
        _ => return None,
    };
    if amount.is_sign_negative() {
        return Some(0);
    }
    Some(amount.trunc().to_u64().unwrap_or(Shares::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_entry_reads_backend_shape() {
        let entry: ScheduleEntry = serde_json::from_value(json!({
            "date": "2024-02-01",
            "iso": 100, "nqo": 0, "rsu": 0, "common": 0, "preferred": 0,
            "total_vested": 100
        }))
        .unwrap();
        assert_eq!(entry.parsed_date(), parse_iso_date("2024-02-01"));
        assert_eq!(entry.period_delta(), 100);
        assert_eq!(entry.buckets().iso, 100);
        assert!(entry.has_bucket_detail());
    }

    #[test]
    fn test_lenient_numbers() {
        assert_eq!(shares_from_value(&json!(12)), Some(12));
        assert_eq!(shares_from_value(&json!(12.9)), Some(12));
        assert_eq!(shares_from_value(&json!("40")), Some(40));
        assert_eq!(shares_from_value(&json!(-5)), Some(0));
        assert_eq!(shares_from_value(&json!("-5.5")), Some(0));
        assert_eq!(shares_from_value(&json!("n/a")), None);
        assert_eq!(shares_from_value(&json!(true)), None);
    }

    #[test]
    fn test_delta_falls_back_to_bucket_sum() {
        let entry: ScheduleEntry =
            serde_json::from_value(json!({"date": "2024-01-01", "rsu": "25", "common": 5})).unwrap();
        assert_eq!(entry.total_vested, None);
        assert_eq!(entry.period_delta(), 30);
    }

    #[test]
    fn test_payload_accepts_bare_array() {
        let payload: SchedulePayload =
            serde_json::from_value(json!([{"date": "2024-01-01", "total_vested": 1}])).unwrap();
        let resp = payload.into_response();
        assert_eq!(resp.grant, None);
        assert_eq!(resp.schedule, vec![ScheduleEntry::new("2024-01-01", 1)]);
    }

    #[test]
    fn test_payload_accepts_wrapped_with_null_schedule() {
        let payload: SchedulePayload = serde_json::from_value(json!({
            "grant": {"id": 7, "preferred_shares": 500, "vesting_frequency": "MONTHLY"},
            "schedule": null
        }))
        .unwrap();
        let resp = payload.into_response();
        assert!(resp.schedule.is_empty());
        let grant = resp.grant.unwrap();
        assert_eq!(grant.id, Some(7));
        assert!(grant.vests_immediately());
    }

    #[test]
    fn test_missing_schedule_key_is_empty() {
        let resp: GrantScheduleResponse = serde_json::from_value(json!({})).unwrap();
        assert!(resp.schedule.is_empty());
    }

    #[test]
    fn test_grant_summary_frequency_fallback() {
        let mut grant = GrantSummary::default();
        assert_eq!(grant.frequency(), VestingFrequency::Monthly);
        grant.vesting_frequency = Some("weekly".into());
        assert_eq!(grant.frequency(), VestingFrequency::Weekly);
        grant.vesting_frequency = Some("fortnightly".into());
        assert_eq!(grant.frequency(), VestingFrequency::Monthly);
    }

    #[test]
    fn test_company_schedules_shape() {
        let all: CompanySchedules = serde_json::from_value(json!({
            "schedules": [
                {"unique_id": "EMP-1", "name": "Ada", "grant_id": 3,
                 "schedule": [{"date": "2024-01-01", "total_vested": 10}]}
            ]
        }))
        .unwrap();
        assert_eq!(all.schedules.len(), 1);
        assert_eq!(all.schedules[0].schedule[0].period_delta(), 10);
    }
}
