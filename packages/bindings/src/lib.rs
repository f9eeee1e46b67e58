use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use equity_plan_core::calendar;
use equity_plan_core::charts::{combined, schedule, series};
use equity_plan_core::forms::buckets::ShareBucketSet;
use equity_plan_core::forms::cliff::{self, CliffEvent, CliffState};
use equity_plan_core::forms::grant_form::{BucketInputs, GrantField, GrantForm};
use equity_plan_core::loader::config::ClientConfig;
use equity_plan_core::loader::sequence::{GrantKey, RequestTicket};
use equity_plan_core::loader::view::GrantScheduleView;
use equity_plan_core::{CalendarDate, VestingFrequency};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn date_arg(raw: &str) -> NapiResult<CalendarDate> {
    calendar::parse_iso_date(raw).ok_or_else(|| to_napi_error(format!("'{raw}' is not a YYYY-MM-DD date")))
}

fn issue_date_arg(raw: Option<String>) -> NapiResult<CalendarDate> {
    match raw {
        Some(raw) => date_arg(&raw),
        None => Ok(calendar::today()),
    }
}

fn frequency_arg(raw: Option<String>) -> NapiResult<Option<VestingFrequency>> {
    raw.map(|f| f.parse::<VestingFrequency>().map_err(to_napi_error))
        .transpose()
}

// ---------------------------------------------------------------------------
// Dates
// ---------------------------------------------------------------------------

/// Normalized `YYYY-MM-DD`, or `null` when the text is not a valid date.
#[napi]
pub fn parse_iso_date(raw: String) -> Option<String> {
    calendar::parse_iso_date(&raw).map(calendar::format_iso_date)
}

#[napi]
pub fn add_months_clamped(date: String, months: u32) -> NapiResult<String> {
    let base = date_arg(&date)?;
    calendar::add_months_clamped(base, months)
        .map(calendar::format_iso_date)
        .ok_or_else(|| to_napi_error("date out of range"))
}

#[napi]
pub fn whole_months_between(from: String, to: String) -> NapiResult<u32> {
    Ok(calendar::whole_months_between(date_arg(&from)?, date_arg(&to)?))
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

#[napi]
pub fn new_cliff_state(issue_date: Option<String>) -> NapiResult<String> {
    let state = CliffState::new(issue_date_arg(issue_date)?);
    serde_json::to_string(&state).map_err(to_napi_error)
}

/// One reconcile step; returns `{state, derived}`.
#[napi]
pub fn reconcile_cliff(state_json: String, event_json: String) -> NapiResult<String> {
    let state: CliffState = serde_json::from_str(&state_json).map_err(to_napi_error)?;
    let event: CliffEvent = serde_json::from_str(&event_json).map_err(to_napi_error)?;
    let output = cliff::reconcile(&state, event);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn bucket_requirements(input_json: String) -> NapiResult<String> {
    let inputs: BucketInputs = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let set: ShareBucketSet = inputs.coerced();
    serde_json::to_string(&serde_json::json!({
        "total": set.total(),
        "requirements": set.requirements(),
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn new_grant_form(issue_date: Option<String>) -> NapiResult<String> {
    let form = GrantForm::new(issue_date_arg(issue_date)?);
    serde_json::to_string(&form).map_err(to_napi_error)
}

/// Apply one field edit; returns `{form, update, evaluation}`.
#[napi]
pub fn set_grant_field(form_json: String, field: String, raw: String) -> NapiResult<String> {
    let mut form: GrantForm = serde_json::from_str(&form_json).map_err(to_napi_error)?;
    let field: GrantField = field.parse().map_err(to_napi_error)?;
    let update = form.set(field, &raw);
    let evaluation = form.evaluate();
    serde_json::to_string(&serde_json::json!({
        "form": form,
        "update": update,
        "evaluation": evaluation,
    }))
    .map_err(to_napi_error)
}

#[napi]
pub fn evaluate_grant_form(form_json: String) -> NapiResult<String> {
    let form: GrantForm = serde_json::from_str(&form_json).map_err(to_napi_error)?;
    serde_json::to_string(&form.evaluate()).map_err(to_napi_error)
}

#[napi]
pub fn grant_submission(form_json: String) -> NapiResult<String> {
    let form: GrantForm = serde_json::from_str(&form_json).map_err(to_napi_error)?;
    let submission = form.submission().map_err(to_napi_error)?;
    serde_json::to_string(&submission).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

#[napi]
pub fn build_vesting_series(input_json: String) -> NapiResult<String> {
    let input: series::SeriesInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = series::chart_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Chart a raw schedule response body as the grant endpoint returns it.
#[napi]
pub fn chart_schedule_response(body: String, frequency: Option<String>) -> NapiResult<String> {
    let payload: schedule::SchedulePayload = serde_json::from_str(&body).map_err(to_napi_error)?;
    let response = payload.into_response();
    let input = series::SeriesInput::from_response(&response, frequency_arg(frequency)?);
    let output = series::chart_schedule(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn chart_company_schedules(body: String, frequency: Option<String>) -> NapiResult<String> {
    let all: schedule::CompanySchedules = serde_json::from_str(&body).map_err(to_napi_error)?;
    let frequency = frequency_arg(frequency)?.unwrap_or_default();
    let output = combined::chart_company_schedules(&all, frequency).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

#[napi]
pub fn client_endpoints(config_json: String, unique_id: String, grant_id: u32) -> NapiResult<String> {
    let config: ClientConfig = serde_json::from_str(&config_json).map_err(to_napi_error)?;
    let grant_id = u64::from(grant_id);
    serde_json::to_string(&serde_json::json!({
        "grant_schedule_url": config.grant_schedule_url(&unique_id, grant_id).map_err(to_napi_error)?.as_str(),
        "grant_detail_url": config.grant_detail_url(&unique_id, grant_id).map_err(to_napi_error)?.as_str(),
        "company_schedule_url": config.company_schedule_url().map_err(to_napi_error)?.as_str(),
        "authorization": config.authorization_header(),
    }))
    .map_err(to_napi_error)
}

#[derive(Deserialize)]
struct Outcome {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Grant-detail chart state with last-request-wins fetch handling.
#[napi]
pub struct ScheduleView {
    inner: GrantScheduleView,
}

#[napi]
impl ScheduleView {
    #[napi(constructor)]
    pub fn new(frequency: Option<String>) -> napi::Result<Self> {
        let inner = match frequency_arg(frequency)? {
            Some(f) => GrantScheduleView::with_frequency(f),
            None => GrantScheduleView::new(),
        };
        Ok(ScheduleView { inner })
    }

    /// Start a fetch; returns the ticket JSON to hand back with its response.
    #[napi]
    pub fn load(&mut self, unique_id: String, grant_id: u32) -> NapiResult<String> {
        let ticket = self.inner.load(GrantKey::new(unique_id, u64::from(grant_id)));
        serde_json::to_string(&ticket).map_err(to_napi_error)
    }

    /// Apply `{body}` or `{error}` for a ticket. Returns the new state, or
    /// `null` when the ticket is stale and the response was dropped.
    #[napi]
    pub fn resolve(&mut self, ticket_json: String, outcome_json: String) -> NapiResult<Option<String>> {
        let ticket: RequestTicket = serde_json::from_str(&ticket_json).map_err(to_napi_error)?;
        let outcome: Outcome = serde_json::from_str(&outcome_json).map_err(to_napi_error)?;
        let outcome = match (outcome.error, outcome.body) {
            (Some(error), _) => Err(error),
            (None, Some(body)) => Ok(body),
            (None, None) => Err("empty response".to_string()),
        };
        match self.inner.resolve_json(&ticket, outcome.as_deref().map_err(Clone::clone)) {
            Ok(state) => serde_json::to_string(state).map(Some).map_err(to_napi_error),
            Err(_) => Ok(None),
        }
    }

    #[napi]
    pub fn state(&self) -> NapiResult<String> {
        serde_json::to_string(self.inner.state()).map_err(to_napi_error)
    }

    #[napi]
    pub fn reset(&mut self) {
        self.inner.reset();
    }
}
