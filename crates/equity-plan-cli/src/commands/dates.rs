use clap::Args;
use serde_json::{json, Value};

use equity_plan_core::calendar::{add_months_clamped, format_iso_date, whole_months_between};
use equity_plan_core::CalendarDate;

use super::parse_date;

/// Arguments for month addition
#[derive(Args)]
pub struct AddMonthsArgs {
    /// Base date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub date: CalendarDate,

    /// Whole months to add
    #[arg(long)]
    pub months: u32,
}

pub fn run_add_months(args: AddMonthsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let result = add_months_clamped(args.date, args.months)
        .ok_or_else(|| format!("{} + {} months is out of range", format_iso_date(args.date), args.months))?;
    Ok(json!({
        "base": format_iso_date(args.date),
        "months": args.months,
        "date": format_iso_date(result),
        "clamped": result.format("%d").to_string() != args.date.format("%d").to_string(),
    }))
}

/// Arguments for whole-month difference
#[derive(Args)]
pub struct MonthsBetweenArgs {
    /// Earlier date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub from: CalendarDate,

    /// Later date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    pub to: CalendarDate,
}

pub fn run_months_between(args: MonthsBetweenArgs) -> Result<Value, Box<dyn std::error::Error>> {
    Ok(json!({
        "from": format_iso_date(args.from),
        "to": format_iso_date(args.to),
        "months": whole_months_between(args.from, args.to),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_months_reports_clamping() {
        let out = run_add_months(AddMonthsArgs {
            date: parse_date("2024-01-31").unwrap(),
            months: 1,
        })
        .unwrap();
        assert_eq!(out["date"], "2024-02-29");
        assert_eq!(out["clamped"], true);
    }

    #[test]
    fn test_months_between() {
        let out = run_months_between(MonthsBetweenArgs {
            from: parse_date("2024-01-31").unwrap(),
            to: parse_date("2024-03-01").unwrap(),
        })
        .unwrap();
        assert_eq!(out["months"], 1);
    }

    #[test]
    fn test_parse_date_rejects_loose_input() {
        assert!(parse_date("2024-1-31").is_err());
    }
}
