use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Per-share prices (strike, purchase, FMV). Decimal, never f64.
pub type Money = Decimal;

/// Whole share counts.
pub type Shares = u64;

/// A Gregorian calendar date, serialized as `YYYY-MM-DD`.
pub type CalendarDate = NaiveDate;

/// The mutually exclusive equity types a single grant can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquityBucket {
    /// Incentive stock options
    Iso,
    /// Non-qualified stock options
    Nqo,
    /// Restricted stock units
    Rsu,
    /// Common stock purchased outright
    Common,
    /// Preferred stock, vests immediately
    Preferred,
}

impl EquityBucket {
    pub const ALL: [EquityBucket; 5] = [
        EquityBucket::Iso,
        EquityBucket::Nqo,
        EquityBucket::Rsu,
        EquityBucket::Common,
        EquityBucket::Preferred,
    ];

    /// Backend field carrying this bucket's share count.
    pub fn field_name(self) -> &'static str {
        match self {
            EquityBucket::Iso => "iso_shares",
            EquityBucket::Nqo => "nqo_shares",
            EquityBucket::Rsu => "rsu_shares",
            EquityBucket::Common => "common_shares",
            EquityBucket::Preferred => "preferred_shares",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EquityBucket::Iso => "ISO",
            EquityBucket::Nqo => "NQO",
            EquityBucket::Rsu => "RSU",
            EquityBucket::Common => "Common",
            EquityBucket::Preferred => "Preferred",
        }
    }

    /// Options are priced by strike.
    pub fn is_option(self) -> bool {
        matches!(self, EquityBucket::Iso | EquityBucket::Nqo)
    }

    /// Stock bought outright is priced by purchase price.
    pub fn is_purchased(self) -> bool {
        matches!(self, EquityBucket::Common | EquityBucket::Preferred)
    }
}

impl fmt::Display for EquityBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One share count per equity bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketAmounts {
    pub iso: Shares,
    pub nqo: Shares,
    pub rsu: Shares,
    pub common: Shares,
    pub preferred: Shares,
}

impl BucketAmounts {
    pub fn get(&self, bucket: EquityBucket) -> Shares {
        match bucket {
            EquityBucket::Iso => self.iso,
            EquityBucket::Nqo => self.nqo,
            EquityBucket::Rsu => self.rsu,
            EquityBucket::Common => self.common,
            EquityBucket::Preferred => self.preferred,
        }
    }

    pub fn set(&mut self, bucket: EquityBucket, shares: Shares) {
        match bucket {
            EquityBucket::Iso => self.iso = shares,
            EquityBucket::Nqo => self.nqo = shares,
            EquityBucket::Rsu => self.rsu = shares,
            EquityBucket::Common => self.common = shares,
            EquityBucket::Preferred => self.preferred = shares,
        }
    }

    pub fn total(&self) -> Shares {
        EquityBucket::ALL
            .iter()
            .fold(0, |acc: Shares, b| acc.saturating_add(self.get(*b)))
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Buckets holding a positive count, in declaration order.
    pub fn positive(&self) -> Vec<EquityBucket> {
        EquityBucket::ALL
            .into_iter()
            .filter(|b| self.get(*b) > 0)
            .collect()
    }

    /// Element-wise saturating sum.
    pub fn saturating_add(&self, other: &BucketAmounts) -> BucketAmounts {
        let mut out = BucketAmounts::default();
        for b in EquityBucket::ALL {
            out.set(b, self.get(b).saturating_add(other.get(b)));
        }
        out
    }
}

/// Cadence at which unvested shares convert to vested shares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VestingFrequency {
    Daily,
    Weekly,
    Biweekly,
    #[default]
    Monthly,
    Yearly,
}

impl VestingFrequency {
    pub fn as_str(self) -> &'static str {
        match self {
            VestingFrequency::Daily => "DAILY",
            VestingFrequency::Weekly => "WEEKLY",
            VestingFrequency::Biweekly => "BIWEEKLY",
            VestingFrequency::Monthly => "MONTHLY",
            VestingFrequency::Yearly => "YEARLY",
        }
    }
}

impl fmt::Display for VestingFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VestingFrequency {
    type Err = String;

    /// Case-insensitive, as the backend upper-cases whatever it receives.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DAILY" => Ok(VestingFrequency::Daily),
            "WEEKLY" => Ok(VestingFrequency::Weekly),
            "BIWEEKLY" => Ok(VestingFrequency::Biweekly),
            "MONTHLY" => Ok(VestingFrequency::Monthly),
            "YEARLY" => Ok(VestingFrequency::Yearly),
            other => Err(format!("unknown vesting frequency '{other}'")),
        }
    }
}

impl<'de> Deserialize<'de> for VestingFrequency {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frequency_parses_case_insensitively() {
        assert_eq!("monthly".parse::<VestingFrequency>(), Ok(VestingFrequency::Monthly));
        assert_eq!(" BiWeekly ".parse::<VestingFrequency>(), Ok(VestingFrequency::Biweekly));
        assert!("quarterly".parse::<VestingFrequency>().is_err());
    }

    #[test]
    fn test_frequency_serde_uses_backend_codes() {
        let f: VestingFrequency = serde_json::from_str("\"yearly\"").unwrap();
        assert_eq!(f, VestingFrequency::Yearly);
        assert_eq!(serde_json::to_string(&f).unwrap(), "\"YEARLY\"");
    }

    #[test]
    fn test_bucket_amounts_positive_and_total() {
        let amounts = BucketAmounts {
            iso: 100,
            common: 50,
            ..Default::default()
        };
        assert_eq!(amounts.total(), 150);
        assert_eq!(amounts.positive(), vec![EquityBucket::Iso, EquityBucket::Common]);
        assert!(BucketAmounts::default().is_empty());
    }

    #[test]
    fn test_bucket_price_kinds() {
        assert!(EquityBucket::Nqo.is_option());
        assert!(!EquityBucket::Rsu.is_option());
        assert!(!EquityBucket::Rsu.is_purchased());
        assert!(EquityBucket::Preferred.is_purchased());
        assert_eq!(EquityBucket::Common.field_name(), "common_shares");
    }
}
