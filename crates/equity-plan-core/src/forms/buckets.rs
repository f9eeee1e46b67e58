use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::forms::fields::{DateInput, Digits, MoneyInput};
use crate::types::{BucketAmounts, EquityBucket, Shares};

// ---------------------------------------------------------------------------
// Bucket set
// ---------------------------------------------------------------------------

/// The five share-count inputs of a grant form, coerced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareBucketSet {
    pub amounts: BucketAmounts,
}

/// Which bucket the form currently represents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "buckets", rename_all = "snake_case")]
pub enum ActiveBucket {
    /// Every bucket is zero.
    None,
    Single(EquityBucket),
    /// More than one bucket is positive.
    Ambiguous(Vec<EquityBucket>),
}

impl ActiveBucket {
    pub fn single(&self) -> Option<EquityBucket> {
        match self {
            ActiveBucket::Single(b) => Some(*b),
            _ => None,
        }
    }
}

/// Field requirements derived from the active bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketRequirements {
    pub active: ActiveBucket,
    /// ISO or NQO.
    pub needs_strike_price: bool,
    /// Common or Preferred.
    pub needs_purchase_price: bool,
    /// Preferred vests on grant; every other type follows a schedule.
    pub immediate_vesting: bool,
}

impl ShareBucketSet {
    pub fn from_amounts(amounts: BucketAmounts) -> Self {
        ShareBucketSet { amounts }
    }

    /// Coerce raw inputs in ISO, NQO, RSU, Common, Preferred order.
    pub fn from_inputs(inputs: [&Digits; 5]) -> Self {
        let mut amounts = BucketAmounts::default();
        for (bucket, input) in EquityBucket::ALL.into_iter().zip(inputs) {
            amounts.set(bucket, input.value());
        }
        ShareBucketSet { amounts }
    }

    pub fn total(&self) -> Shares {
        self.amounts.total()
    }

    pub fn active(&self) -> ActiveBucket {
        let positive = self.amounts.positive();
        match positive.as_slice() {
            [] => ActiveBucket::None,
            [only] => ActiveBucket::Single(*only),
            _ => ActiveBucket::Ambiguous(positive),
        }
    }

    pub fn requirements(&self) -> BucketRequirements {
        let active = self.active();
        let single = active.single();
        BucketRequirements {
            needs_strike_price: single.is_some_and(EquityBucket::is_option),
            needs_purchase_price: single.is_some_and(EquityBucket::is_purchased),
            immediate_vesting: single == Some(EquityBucket::Preferred),
            active,
        }
    }
}

// ---------------------------------------------------------------------------
// Price fields and bucket switches
// ---------------------------------------------------------------------------

/// Strike and purchase price inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFields {
    pub strike_price: MoneyInput,
    pub purchase_price: MoneyInput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceField {
    StrikePrice,
    PurchasePrice,
}

/// Clear whichever price field the new active bucket no longer uses, so a
/// stale value is never submitted. Only a switch between single buckets
/// counts: passing through an empty or ambiguous set keeps both prices.
/// Returns the cleared fields.
pub fn clear_irrelevant_prices(
    previous: Option<EquityBucket>,
    next: &ActiveBucket,
    prices: &mut PriceFields,
) -> Vec<PriceField> {
    let (Some(prev), Some(next)) = (previous, next.single()) else {
        return Vec::new();
    };
    let mut cleared = Vec::new();
    if prev.is_option() && !next.is_option() && !prices.strike_price.is_empty() {
        prices.strike_price = MoneyInput::default();
        cleared.push(PriceField::StrikePrice);
    }
    if prev.is_purchased() && !next.is_purchased() && !prices.purchase_price.is_empty() {
        prices.purchase_price = MoneyInput::default();
        cleared.push(PriceField::PurchasePrice);
    }
    if !cleared.is_empty() {
        debug!(?cleared, from = %prev, to = %next, "active bucket switched");
    }
    cleared
}

// ---------------------------------------------------------------------------
// Submittability
// ---------------------------------------------------------------------------

/// Reasons a grant form cannot be submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitBlocker {
    NoActiveBucket,
    AmbiguousBuckets,
    ZeroShares,
    MissingStrikePrice,
    MissingPurchasePrice,
    /// End date present but unparseable, or start date unparseable with an end date.
    InvalidVestingDates,
    EndBeforeStart,
}

/// Everything standing between the form and a submit. Empty means submittable.
pub fn submit_blockers(
    buckets: &ShareBucketSet,
    prices: &PriceFields,
    vesting_start: &DateInput,
    vesting_end: &DateInput,
) -> Vec<SubmitBlocker> {
    let req = buckets.requirements();
    let mut blockers = Vec::new();

    match req.active {
        ActiveBucket::None => blockers.push(SubmitBlocker::NoActiveBucket),
        ActiveBucket::Ambiguous(_) => blockers.push(SubmitBlocker::AmbiguousBuckets),
        ActiveBucket::Single(_) => {}
    }
    if buckets.total() == 0 {
        blockers.push(SubmitBlocker::ZeroShares);
    }
    if req.needs_strike_price && !prices.strike_price.is_positive() {
        blockers.push(SubmitBlocker::MissingStrikePrice);
    }
    if req.needs_purchase_price && !prices.purchase_price.is_positive() {
        blockers.push(SubmitBlocker::MissingPurchasePrice);
    }
    if !req.immediate_vesting && !vesting_end.is_empty() {
        match (vesting_start.date(), vesting_end.date()) {
            (Some(start), Some(end)) if end < start => blockers.push(SubmitBlocker::EndBeforeStart),
            (Some(_), Some(_)) => {}
            _ => blockers.push(SubmitBlocker::InvalidVestingDates),
        }
    }
    blockers
}

pub fn is_submittable(
    buckets: &ShareBucketSet,
    prices: &PriceFields,
    vesting_start: &DateInput,
    vesting_end: &DateInput,
) -> bool {
    submit_blockers(buckets, prices, vesting_start, vesting_end).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn set(raw: [&str; 5]) -> ShareBucketSet {
        let inputs = raw.map(Digits::new);
        ShareBucketSet::from_inputs([&inputs[0], &inputs[1], &inputs[2], &inputs[3], &inputs[4]])
    }

    fn prices(strike: &str, purchase: &str) -> PriceFields {
        PriceFields {
            strike_price: MoneyInput::new(strike),
            purchase_price: MoneyInput::new(purchase),
        }
    }

    #[test]
    fn test_iso_only_needs_strike() {
        let req = set(["100", "0", "0", "0", "0"]).requirements();
        assert_eq!(req.active, ActiveBucket::Single(EquityBucket::Iso));
        assert!(req.needs_strike_price);
        assert!(!req.needs_purchase_price);
        assert!(!req.immediate_vesting);
    }

    #[test]
    fn test_iso_and_common_is_ambiguous() {
        let buckets = set(["100", "", "", "50", ""]);
        let req = buckets.requirements();
        assert_eq!(
            req.active,
            ActiveBucket::Ambiguous(vec![EquityBucket::Iso, EquityBucket::Common])
        );
        assert!(!req.needs_strike_price);
        assert!(!req.needs_purchase_price);
        let blockers = submit_blockers(
            &buckets,
            &prices("1.00", "1.00"),
            &DateInput::new("2024-01-01"),
            &DateInput::new(""),
        );
        assert_eq!(blockers, vec![SubmitBlocker::AmbiguousBuckets]);
    }

    #[test]
    fn test_all_empty_is_none() {
        let buckets = set(["", "0", "abc", "", "0"]);
        assert_eq!(buckets.active(), ActiveBucket::None);
        let blockers = submit_blockers(
            &buckets,
            &PriceFields::default(),
            &DateInput::default(),
            &DateInput::default(),
        );
        assert_eq!(blockers, vec![SubmitBlocker::NoActiveBucket, SubmitBlocker::ZeroShares]);
    }

    #[test]
    fn test_preferred_is_immediate_and_needs_purchase() {
        let req = set(["", "", "", "", "1,000"]).requirements();
        assert_eq!(req.active, ActiveBucket::Single(EquityBucket::Preferred));
        assert!(req.needs_purchase_price);
        assert!(req.immediate_vesting);
    }

    #[test]
    fn test_rsu_needs_no_price() {
        let buckets = set(["", "", "500", "", ""]);
        let req = buckets.requirements();
        assert!(!req.needs_strike_price && !req.needs_purchase_price);
        assert!(is_submittable(
            &buckets,
            &PriceFields::default(),
            &DateInput::new("2024-01-01"),
            &DateInput::new("2028-01-01"),
        ));
    }

    #[test]
    fn test_missing_strike_blocks_options() {
        let buckets = set(["", "250", "", "", ""]);
        let blockers = submit_blockers(
            &buckets,
            &prices("0", ""),
            &DateInput::new("2024-01-01"),
            &DateInput::new(""),
        );
        assert_eq!(blockers, vec![SubmitBlocker::MissingStrikePrice]);
        assert!(is_submittable(
            &buckets,
            &prices("0.25", ""),
            &DateInput::new("2024-01-01"),
            &DateInput::new(""),
        ));
    }

    #[test]
    fn test_end_before_start_blocks_scheduled_grants() {
        let buckets = set(["", "", "", "100", ""]);
        let blockers = submit_blockers(
            &buckets,
            &prices("", "2.00"),
            &DateInput::new("2025-01-01"),
            &DateInput::new("2024-12-31"),
        );
        assert_eq!(blockers, vec![SubmitBlocker::EndBeforeStart]);
    }

    #[test]
    fn test_end_equal_start_is_allowed() {
        let buckets = set(["", "", "100", "", ""]);
        assert!(is_submittable(
            &buckets,
            &PriceFields::default(),
            &DateInput::new("2025-01-01"),
            &DateInput::new("2025-01-01"),
        ));
    }

    #[test]
    fn test_preferred_ignores_vesting_dates() {
        let buckets = set(["", "", "", "", "100"]);
        assert!(is_submittable(
            &buckets,
            &prices("", "3.10"),
            &DateInput::new("2025-01-01"),
            &DateInput::new("2020-01-01"),
        ));
    }

    #[test]
    fn test_unparseable_end_blocks() {
        let buckets = set(["", "", "100", "", ""]);
        let blockers = submit_blockers(
            &buckets,
            &PriceFields::default(),
            &DateInput::new("2025-01-01"),
            &DateInput::new("2025-13-01"),
        );
        assert_eq!(blockers, vec![SubmitBlocker::InvalidVestingDates]);
    }

    #[test]
    fn test_switch_from_iso_to_common_clears_strike() {
        let after = set(["", "", "", "100", ""]).active();
        let mut fields = prices("1.50", "");
        let cleared = clear_irrelevant_prices(Some(EquityBucket::Iso), &after, &mut fields);
        assert_eq!(cleared, vec![PriceField::StrikePrice]);
        assert!(fields.strike_price.is_empty());
    }

    #[test]
    fn test_switch_from_preferred_to_rsu_clears_purchase() {
        let after = set(["", "", "10", "", ""]).active();
        let mut fields = prices("", "4.00");
        let cleared = clear_irrelevant_prices(Some(EquityBucket::Preferred), &after, &mut fields);
        assert_eq!(cleared, vec![PriceField::PurchasePrice]);
        assert_eq!(fields, PriceFields::default());
    }

    #[test]
    fn test_switch_within_options_keeps_strike() {
        let after = set(["", "100", "", "", ""]).active();
        let mut fields = prices("1.50", "");
        assert!(clear_irrelevant_prices(Some(EquityBucket::Iso), &after, &mut fields).is_empty());
        assert_eq!(fields.strike_price.raw(), "1.50");
    }

    #[test]
    fn test_ambiguous_or_empty_set_keeps_prices() {
        let mut fields = prices("1.50", "2.00");
        let ambiguous = set(["100", "", "", "100", ""]).active();
        assert!(clear_irrelevant_prices(Some(EquityBucket::Iso), &ambiguous, &mut fields).is_empty());
        let empty = set(["", "", "", "", ""]).active();
        assert!(clear_irrelevant_prices(Some(EquityBucket::Common), &empty, &mut fields).is_empty());
        assert!(clear_irrelevant_prices(None, &set(["", "", "5", "", ""]).active(), &mut fields).is_empty());
        assert_eq!(fields, prices("1.50", "2.00"));
    }
}
