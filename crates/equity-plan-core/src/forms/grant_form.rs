use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::calendar::format_iso_date;
use crate::error::EquityPlanError;
use crate::forms::buckets::{
    clear_irrelevant_prices, submit_blockers, BucketRequirements, PriceField, PriceFields,
    ShareBucketSet, SubmitBlocker,
};
use crate::forms::cliff::{settle, CliffEvent, CliffState, DerivedField};
use crate::forms::fields::{DateInput, Digits, FormValue, MoneyInput};
use crate::types::{CalendarDate, EquityBucket, Money, Shares, VestingFrequency};
use crate::EquityPlanResult;

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// Every input on the grant-creation form, named as the backend names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantField {
    /// Employee unique id.
    User,
    /// Stock class name.
    StockClass,
    IsoShares,
    NqoShares,
    RsuShares,
    CommonShares,
    PreferredShares,
    StrikePrice,
    PurchasePrice,
    CliffMonths,
    VestingStart,
    VestingEnd,
    VestingFrequency,
}

impl GrantField {
    pub const ALL: [GrantField; 13] = [
        GrantField::User,
        GrantField::StockClass,
        GrantField::IsoShares,
        GrantField::NqoShares,
        GrantField::RsuShares,
        GrantField::CommonShares,
        GrantField::PreferredShares,
        GrantField::StrikePrice,
        GrantField::PurchasePrice,
        GrantField::CliffMonths,
        GrantField::VestingStart,
        GrantField::VestingEnd,
        GrantField::VestingFrequency,
    ];

    pub fn name(self) -> &'static str {
        match self {
            GrantField::User => "user",
            GrantField::StockClass => "stock_class",
            GrantField::IsoShares => EquityBucket::Iso.field_name(),
            GrantField::NqoShares => EquityBucket::Nqo.field_name(),
            GrantField::RsuShares => EquityBucket::Rsu.field_name(),
            GrantField::CommonShares => EquityBucket::Common.field_name(),
            GrantField::PreferredShares => EquityBucket::Preferred.field_name(),
            GrantField::StrikePrice => "strike_price",
            GrantField::PurchasePrice => "purchase_price",
            GrantField::CliffMonths => "cliff_months",
            GrantField::VestingStart => "vesting_start",
            GrantField::VestingEnd => "vesting_end",
            GrantField::VestingFrequency => "vesting_frequency",
        }
    }

    fn bucket(self) -> Option<EquityBucket> {
        match self {
            GrantField::IsoShares => Some(EquityBucket::Iso),
            GrantField::NqoShares => Some(EquityBucket::Nqo),
            GrantField::RsuShares => Some(EquityBucket::Rsu),
            GrantField::CommonShares => Some(EquityBucket::Common),
            GrantField::PreferredShares => Some(EquityBucket::Preferred),
            _ => None,
        }
    }
}

impl fmt::Display for GrantField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GrantField {
    type Err = EquityPlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GrantField::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| EquityPlanError::InvalidInput {
                field: "field".into(),
                reason: format!("unknown grant form field '{s}'"),
            })
    }
}

impl From<PriceField> for GrantField {
    fn from(p: PriceField) -> Self {
        match p {
            PriceField::StrikePrice => GrantField::StrikePrice,
            PriceField::PurchasePrice => GrantField::PurchasePrice,
        }
    }
}

// ---------------------------------------------------------------------------
// Form state
// ---------------------------------------------------------------------------

/// Raw share-count inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInputs {
    pub iso_shares: Digits,
    pub nqo_shares: Digits,
    pub rsu_shares: Digits,
    pub common_shares: Digits,
    pub preferred_shares: Digits,
}

impl BucketInputs {
    fn slot(&mut self, bucket: EquityBucket) -> &mut Digits {
        match bucket {
            EquityBucket::Iso => &mut self.iso_shares,
            EquityBucket::Nqo => &mut self.nqo_shares,
            EquityBucket::Rsu => &mut self.rsu_shares,
            EquityBucket::Common => &mut self.common_shares,
            EquityBucket::Preferred => &mut self.preferred_shares,
        }
    }

    fn get(&self, bucket: EquityBucket) -> &Digits {
        match bucket {
            EquityBucket::Iso => &self.iso_shares,
            EquityBucket::Nqo => &self.nqo_shares,
            EquityBucket::Rsu => &self.rsu_shares,
            EquityBucket::Common => &self.common_shares,
            EquityBucket::Preferred => &self.preferred_shares,
        }
    }

    pub fn coerced(&self) -> ShareBucketSet {
        ShareBucketSet::from_inputs([
            &self.iso_shares,
            &self.nqo_shares,
            &self.rsu_shares,
            &self.common_shares,
            &self.preferred_shares,
        ])
    }
}

/// In-memory state of one grant-creation form session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantForm {
    pub user: String,
    pub stock_class: String,
    pub buckets: BucketInputs,
    pub prices: PriceFields,
    pub cliff: CliffState,
    pub cliff_input: Digits,
    pub vesting_start: DateInput,
    pub vesting_end: DateInput,
    pub vesting_frequency: String,
    /// Last bucket that was the single active one, for price clearing.
    #[serde(default)]
    pub last_active: Option<EquityBucket>,
}

/// Side effects of one [`GrantForm::set`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormUpdate {
    /// Fields rewritten by reconciliation.
    pub derived: Vec<GrantField>,
    /// Price fields cleared by a bucket switch.
    pub cleared: Vec<GrantField>,
}

impl GrantForm {
    /// Empty form whose issue date (and default vesting start) is `issue_date`.
    pub fn new(issue_date: CalendarDate) -> Self {
        let cliff = CliffState::new(issue_date);
        GrantForm {
            user: String::new(),
            stock_class: String::new(),
            buckets: BucketInputs::default(),
            prices: PriceFields::default(),
            cliff,
            cliff_input: Digits::from_count(u64::from(cliff.cliff_months)),
            vesting_start: DateInput::from_date(cliff.start_date),
            vesting_end: DateInput::default(),
            vesting_frequency: VestingFrequency::default().to_string(),
            last_active: None,
        }
    }

    pub fn issue_date(&self) -> CalendarDate {
        self.cliff.issue_date
    }

    pub fn requirements(&self) -> BucketRequirements {
        self.buckets.coerced().requirements()
    }

    /// Store a raw input value and run whatever reconciliation it triggers.
    pub fn set(&mut self, field: GrantField, raw: &str) -> FormUpdate {
        let mut update = FormUpdate::default();

        if let Some(bucket) = field.bucket() {
            *self.buckets.slot(bucket) = Digits::new(raw);
            let active = self.buckets.coerced().active();
            update.cleared = clear_irrelevant_prices(self.last_active, &active, &mut self.prices)
                .into_iter()
                .map(GrantField::from)
                .collect();
            if let Some(single) = active.single() {
                self.last_active = Some(single);
            }
            return update;
        }

        match field {
            GrantField::User => self.user = raw.to_string(),
            GrantField::StockClass => self.stock_class = raw.to_string(),
            GrantField::StrikePrice => self.prices.strike_price = MoneyInput::new(raw),
            GrantField::PurchasePrice => self.prices.purchase_price = MoneyInput::new(raw),
            GrantField::VestingEnd => self.vesting_end = DateInput::new(raw),
            GrantField::VestingFrequency => self.vesting_frequency = raw.to_string(),
            GrantField::CliffMonths => {
                self.cliff_input = Digits::new(raw);
                let out = self.cliff.apply(CliffEvent::from_cliff_input(&self.cliff_input));
                self.cliff = out.state;
                if out.derived == Some(DerivedField::StartDate) {
                    self.vesting_start = DateInput::from_date(self.cliff.start_date);
                    update.derived.push(GrantField::VestingStart);
                }
            }
            GrantField::VestingStart => {
                self.vesting_start = DateInput::new(raw);
                if let Some(event) = CliffEvent::from_start_input(&self.vesting_start) {
                    let before = self.cliff;
                    let (settled, _) = settle(&before, event);
                    self.cliff = settled;
                    if settled.cliff_months != before.cliff_months {
                        self.cliff_input = Digits::from_count(u64::from(settled.cliff_months));
                        update.derived.push(GrantField::CliffMonths);
                    }
                    if self.vesting_start.date() != Some(settled.start_date) {
                        self.vesting_start = DateInput::from_date(settled.start_date);
                        update.derived.push(GrantField::VestingStart);
                    }
                }
            }
            GrantField::IsoShares
            | GrantField::NqoShares
            | GrantField::RsuShares
            | GrantField::CommonShares
            | GrantField::PreferredShares => {}
        }
        update
    }

    /// Typed view of a coercible field; `None` for free-text fields.
    pub fn value(&self, field: GrantField) -> Option<FormValue> {
        if let Some(bucket) = field.bucket() {
            return Some(FormValue::Digits(self.buckets.get(bucket).clone()));
        }
        match field {
            GrantField::StrikePrice => Some(FormValue::Money(self.prices.strike_price.clone())),
            GrantField::PurchasePrice => Some(FormValue::Money(self.prices.purchase_price.clone())),
            GrantField::CliffMonths => Some(FormValue::Digits(self.cliff_input.clone())),
            GrantField::VestingStart => Some(FormValue::Date(self.vesting_start.clone())),
            GrantField::VestingEnd => Some(FormValue::Date(self.vesting_end.clone())),
            _ => None,
        }
    }

    /// The string the input element should show.
    pub fn get(&self, field: GrantField) -> String {
        if let Some(value) = self.value(field) {
            return value.text().to_string();
        }
        match field {
            GrantField::User => self.user.clone(),
            GrantField::StockClass => self.stock_class.clone(),
            GrantField::VestingFrequency => self.vesting_frequency.clone(),
            _ => String::new(),
        }
    }

    pub fn evaluate(&self) -> GrantFormEvaluation {
        evaluate_grant_form(self)
    }

    /// Backend payload, or the first field error when not submittable.
    pub fn submission(&self) -> EquityPlanResult<GrantSubmission> {
        build_submission(self)
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// A message attached to one backend field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Everything the form view needs to decide what to show and enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantFormEvaluation {
    pub requirements: BucketRequirements,
    pub total_shares: Shares,
    pub cliff_months: u32,
    pub vesting_start: String,
    pub blockers: Vec<SubmitBlocker>,
    pub field_errors: Vec<FieldError>,
    pub submittable: bool,
}

/// Check the form against the bucket rules and the field rules the grant
/// endpoint enforces, so they surface before a round trip.
pub fn evaluate_grant_form(form: &GrantForm) -> GrantFormEvaluation {
    let buckets = form.buckets.coerced();
    let requirements = buckets.requirements();
    let blockers = submit_blockers(&buckets, &form.prices, &form.vesting_start, &form.vesting_end);
    let mut errors = Vec::new();

    if form.user.trim().is_empty() {
        errors.push(FieldError::new("user", "This field is required."));
    }
    if form.stock_class.trim().is_empty() {
        errors.push(FieldError::new("stock_class", "This field is required."));
    }

    let amounts = buckets.amounts;
    let positive = amounts.positive();
    if amounts.iso > 0 && amounts.nqo > 0 {
        errors.push(FieldError::new(
            "nqo_shares",
            "ISO and NQO cannot be combined in the same grant. Create separate grants.",
        ));
    } else if positive.len() > 1 {
        errors.push(FieldError::new(
            "num_shares",
            "Grant must represent one exclusive share type.",
        ));
    } else if positive.is_empty() {
        errors.push(FieldError::new(
            "num_shares",
            "Enter a share count for one equity type.",
        ));
    }

    if let Some(bucket) = requirements.active.single() {
        let strike = form.prices.strike_price.is_positive();
        let purchase = form.prices.purchase_price.is_positive();
        if requirements.needs_strike_price && !strike {
            errors.push(FieldError::new("strike_price", "ISO/NQO require a positive strike price."));
        }
        if requirements.needs_purchase_price && !purchase {
            errors.push(FieldError::new(
                "purchase_price",
                format!("{bucket} shares require a purchase price."),
            ));
        }
        if !requirements.needs_strike_price && strike {
            errors.push(FieldError::new(
                "strike_price",
                format!("{bucket} grants cannot have a strike price."),
            ));
        }
        if !requirements.needs_purchase_price && purchase {
            errors.push(FieldError::new(
                "purchase_price",
                format!("{bucket} grants cannot have a purchase price."),
            ));
        }
    }

    if !form.prices.strike_price.is_empty() && form.prices.strike_price.parsed().is_none() {
        errors.push(FieldError::new("strike_price", "Enter a valid non-negative amount."));
    }
    if !form.prices.purchase_price.is_empty() && form.prices.purchase_price.parsed().is_none() {
        errors.push(FieldError::new("purchase_price", "Enter a valid non-negative amount."));
    }

    if !requirements.immediate_vesting {
        let start = form.vesting_start.date();
        let end = form.vesting_end.date();
        if !form.vesting_start.is_empty() && start.is_none() {
            errors.push(FieldError::new("vesting_start", "Enter a date as YYYY-MM-DD."));
        }
        if !form.vesting_end.is_empty() && end.is_none() {
            errors.push(FieldError::new("vesting_end", "Enter a date as YYYY-MM-DD."));
        }
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                errors.push(FieldError::new(
                    "vesting_end",
                    "vesting_end must be after vesting_start.",
                ));
            }
        }
    }

    if form.vesting_frequency.parse::<VestingFrequency>().is_err() {
        errors.push(FieldError::new(
            "vesting_frequency",
            format!("\"{}\" is not a valid choice.", form.vesting_frequency),
        ));
    }

    let submittable = blockers.is_empty() && errors.is_empty();
    GrantFormEvaluation {
        total_shares: buckets.total(),
        cliff_months: form.cliff.cliff_months,
        vesting_start: form.vesting_start.raw().to_string(),
        requirements,
        blockers,
        field_errors: errors,
        submittable,
    }
}

// ---------------------------------------------------------------------------
// Submission payload
// ---------------------------------------------------------------------------

/// Body for the grant-creation endpoint.
///
/// `num_shares` is the bucket total. Preferred grants vest on issue, so they
/// carry no vesting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSubmission {
    pub user: String,
    pub stock_class: String,
    pub num_shares: Shares,
    pub iso_shares: Shares,
    pub nqo_shares: Shares,
    pub rsu_shares: Shares,
    pub common_shares: Shares,
    pub preferred_shares: Shares,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike_price: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_price: Option<Money>,
    pub grant_date: CalendarDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vesting_start: Option<CalendarDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vesting_end: Option<CalendarDate>,
    pub vesting_frequency: VestingFrequency,
}

fn build_submission(form: &GrantForm) -> EquityPlanResult<GrantSubmission> {
    let evaluation = evaluate_grant_form(form);
    if let Some(err) = evaluation.field_errors.first() {
        return Err(EquityPlanError::InvalidInput {
            field: err.field.clone(),
            reason: err.message.clone(),
        });
    }
    if let Some(blocker) = evaluation.blockers.first() {
        return Err(EquityPlanError::InvalidInput {
            field: "num_shares".into(),
            reason: format!("form not submittable: {blocker:?}"),
        });
    }

    let req = &evaluation.requirements;
    let amounts = form.buckets.coerced().amounts;
    let vesting_frequency = form
        .vesting_frequency
        .parse::<VestingFrequency>()
        .map_err(|reason| EquityPlanError::InvalidInput {
            field: "vesting_frequency".into(),
            reason,
        })?;
    let (vesting_start, vesting_end) = if req.immediate_vesting {
        (None, None)
    } else {
        (form.vesting_start.date(), form.vesting_end.date())
    };

    Ok(GrantSubmission {
        user: form.user.trim().to_string(),
        stock_class: form.stock_class.trim().to_string(),
        num_shares: amounts.total(),
        iso_shares: amounts.iso,
        nqo_shares: amounts.nqo,
        rsu_shares: amounts.rsu,
        common_shares: amounts.common,
        preferred_shares: amounts.preferred,
        strike_price: req.needs_strike_price.then(|| form.prices.strike_price.amount()),
        purchase_price: req.needs_purchase_price.then(|| form.prices.purchase_price.amount()),
        grant_date: form.issue_date(),
        vesting_start,
        vesting_end,
        vesting_frequency,
    })
}

impl GrantSubmission {
    /// `YYYY-MM-DD` of the grant date, as sent on the wire.
    pub fn grant_date_text(&self) -> String {
        format_iso_date(self.grant_date)
    }
}
