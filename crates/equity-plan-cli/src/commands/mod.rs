pub mod charts;
pub mod dates;
pub mod endpoints;
pub mod forms;

use equity_plan_core::calendar::parse_iso_date;
use equity_plan_core::CalendarDate;

/// Strict `YYYY-MM-DD` for clap.
pub fn parse_date(s: &str) -> Result<CalendarDate, String> {
    parse_iso_date(s).ok_or_else(|| format!("'{s}' is not a YYYY-MM-DD date"))
}
