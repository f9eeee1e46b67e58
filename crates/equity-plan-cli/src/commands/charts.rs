use clap::Args;
use serde_json::Value;

use equity_plan_core::charts::combined::chart_company_schedules;
use equity_plan_core::charts::schedule::{CompanySchedules, SchedulePayload};
use equity_plan_core::charts::series::{chart_schedule, SeriesInput};
use equity_plan_core::{CalendarDate, VestingFrequency};

use super::parse_date;
use crate::input;

/// Arguments for a single grant's cumulative vesting chart
#[derive(Args)]
pub struct ChartArgs {
    /// Schedule JSON: `{grant, schedule}` or a bare entry array
    #[arg(long)]
    pub input: Option<String>,

    /// Group by this frequency instead of the grant's own
    #[arg(long)]
    pub frequency: Option<VestingFrequency>,

    /// Override the grant's vesting start (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub vesting_start: Option<CalendarDate>,

    /// Override the grant's vesting end (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub vesting_end: Option<CalendarDate>,
}

pub fn run_chart(args: ChartArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: SchedulePayload = input::read_input(args.input.as_deref())?
        .ok_or("--input <schedule.json> or stdin required for chart")?;
    let response = payload.into_response();

    let mut series_input = SeriesInput::from_response(&response, args.frequency);
    if args.vesting_start.is_some() {
        series_input.vesting_start = args.vesting_start;
    }
    if args.vesting_end.is_some() {
        series_input.vesting_end = args.vesting_end;
    }

    let result = chart_schedule(&series_input)?;
    Ok(serde_json::to_value(result)?)
}

/// Arguments for the company-wide vesting chart
#[derive(Args)]
pub struct ChartAllArgs {
    /// Company schedule JSON: `{schedules: [...]}`
    #[arg(long)]
    pub input: Option<String>,

    /// Grouping frequency
    #[arg(long, default_value = "MONTHLY")]
    pub frequency: VestingFrequency,
}

pub fn run_chart_all(args: ChartAllArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let all: CompanySchedules = input::read_input(args.input.as_deref())?
        .ok_or("--input <schedules.json> or stdin required for chart-all")?;
    let result = chart_company_schedules(&all, args.frequency)?;
    Ok(serde_json::to_value(result)?)
}
