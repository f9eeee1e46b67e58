use std::collections::{BTreeMap, HashMap};

use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::{json, Value};

use equity_plan_core::calendar::parse_iso_date;
use equity_plan_core::forms::buckets::{submit_blockers, PriceFields, ShareBucketSet};
use equity_plan_core::forms::cliff::{settle, CliffEvent, CliffState};
use equity_plan_core::forms::fields::{DateInput, Digits, MoneyInput};
use equity_plan_core::forms::grant_form::{GrantField, GrantForm};
use equity_plan_core::CalendarDate;

use super::parse_date;
use crate::config::CliConfig;
use crate::input;

// ---------------------------------------------------------------------------
// cliff
// ---------------------------------------------------------------------------

/// Arguments for cliff/start-date reconciliation
#[derive(Args)]
pub struct CliffArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Grant issue date; defaults to the config file's, then today
    #[arg(long, value_parser = parse_date)]
    pub issue_date: Option<CalendarDate>,

    /// Cliff length in months
    #[arg(long, conflicts_with = "start_date")]
    pub cliff_months: Option<String>,

    /// Vesting start date (YYYY-MM-DD)
    #[arg(long)]
    pub start_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CliffRequest {
    #[serde(default)]
    issue_date: Option<CalendarDate>,
    #[serde(default)]
    cliff_months: Option<String>,
    #[serde(default)]
    start_date: Option<String>,
}

pub fn run_cliff(args: CliffArgs, config: &CliConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let req: CliffRequest = match input::read_input(args.input.as_deref())? {
        Some(req) => req,
        None => CliffRequest {
            issue_date: args.issue_date,
            cliff_months: args.cliff_months,
            start_date: args.start_date,
        },
    };

    let state = CliffState::new(config.issue_date(req.issue_date));
    let event = match (req.cliff_months, req.start_date) {
        (Some(months), _) => CliffEvent::from_cliff_input(&Digits::new(months)),
        (None, Some(start)) => CliffEvent::from_start_input(&DateInput::new(start.as_str()))
            .ok_or_else(|| format!("start date '{start}' is not YYYY-MM-DD"))?,
        (None, None) => return Err("--cliff-months or --start-date is required (or provide --input)".into()),
    };

    let (settled, steps) = settle(&state, event);
    Ok(json!({
        "issue_date": settled.issue_date_text(),
        "cliff_months": settled.cliff_months,
        "start_date": settled.start_date_text(),
        "steps": steps,
    }))
}

// ---------------------------------------------------------------------------
// buckets
// ---------------------------------------------------------------------------

/// Arguments for share-bucket validation
#[derive(Args)]
pub struct BucketsArgs {
    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Incentive stock options
    #[arg(long)]
    pub iso: Option<String>,

    /// Non-qualified stock options
    #[arg(long)]
    pub nqo: Option<String>,

    /// Restricted stock units
    #[arg(long)]
    pub rsu: Option<String>,

    /// Common shares
    #[arg(long)]
    pub common: Option<String>,

    /// Preferred shares
    #[arg(long)]
    pub preferred: Option<String>,

    /// Strike price (options)
    #[arg(long)]
    pub strike_price: Option<Decimal>,

    /// Purchase price (common/preferred)
    #[arg(long)]
    pub purchase_price: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct BucketsRequest {
    #[serde(default)]
    iso: Digits,
    #[serde(default)]
    nqo: Digits,
    #[serde(default)]
    rsu: Digits,
    #[serde(default)]
    common: Digits,
    #[serde(default)]
    preferred: Digits,
    #[serde(default)]
    strike_price: MoneyInput,
    #[serde(default)]
    purchase_price: MoneyInput,
}

pub fn run_buckets(args: BucketsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let req: BucketsRequest = match input::read_input(args.input.as_deref())? {
        Some(req) => req,
        None => {
            let digits = |v: Option<String>| v.map(Digits::new).unwrap_or_default();
            let money = |v: Option<Decimal>| v.map(MoneyInput::from_amount).unwrap_or_default();
            BucketsRequest {
                iso: digits(args.iso),
                nqo: digits(args.nqo),
                rsu: digits(args.rsu),
                common: digits(args.common),
                preferred: digits(args.preferred),
                strike_price: money(args.strike_price),
                purchase_price: money(args.purchase_price),
            }
        }
    };

    let set = ShareBucketSet::from_inputs([&req.iso, &req.nqo, &req.rsu, &req.common, &req.preferred]);
    let prices = PriceFields {
        strike_price: req.strike_price,
        purchase_price: req.purchase_price,
    };
    // Immediate-vesting and date checks need a form; only buckets and prices here.
    let blockers = submit_blockers(&set, &prices, &DateInput::default(), &DateInput::default());
    let requirements = set.requirements();

    Ok(json!({
        "amounts": set.amounts,
        "total": set.total(),
        "active": requirements.active,
        "needs_strike_price": requirements.needs_strike_price,
        "needs_purchase_price": requirements.needs_purchase_price,
        "immediate_vesting": requirements.immediate_vesting,
        "submittable": blockers.is_empty(),
        "blockers": blockers,
    }))
}

// ---------------------------------------------------------------------------
// grant-form
// ---------------------------------------------------------------------------

/// Arguments for full grant-form evaluation
#[derive(Args)]
pub struct GrantFormArgs {
    /// Path to JSON file of raw field values keyed by backend field name
    #[arg(long)]
    pub input: Option<String>,

    /// Grant issue date; defaults to the config file's, then today
    #[arg(long, value_parser = parse_date)]
    pub issue_date: Option<CalendarDate>,
}

#[derive(Debug, Deserialize)]
struct GrantFormRequest {
    #[serde(default)]
    issue_date: Option<String>,
    #[serde(flatten)]
    fields: BTreeMap<String, Value>,
}

pub fn run_grant_form(args: GrantFormArgs, config: &CliConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let req: GrantFormRequest = input::read_input(args.input.as_deref())?
        .ok_or("--input <form.json> or stdin required for grant-form")?;

    let file_issue = match req.issue_date.as_deref() {
        Some(raw) => Some(parse_iso_date(raw).ok_or_else(|| format!("issue_date '{raw}' is not YYYY-MM-DD"))?),
        None => None,
    };
    let mut form = GrantForm::new(config.issue_date(args.issue_date.or(file_issue)));

    let mut raw: HashMap<GrantField, String> = HashMap::new();
    for (name, value) in req.fields {
        let field: GrantField = name.parse()?;
        let text = match value {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        };
        raw.insert(field, text);
    }
    // Declaration order, so a vesting start given alongside a cliff wins.
    for field in GrantField::ALL {
        if let Some(text) = raw.get(&field) {
            form.set(field, text);
        }
    }

    let evaluation = form.evaluate();
    let submission = if evaluation.submittable {
        Some(form.submission()?)
    } else {
        None
    };

    let mut out = serde_json::to_value(&evaluation)?;
    if let Value::Object(map) = &mut out {
        map.insert("issue_date".into(), json!(form.issue_date()));
        map.insert("submission".into(), serde_json::to_value(submission)?);
    }
    Ok(out)
}
