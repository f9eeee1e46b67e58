use chrono::{Datelike, NaiveDate};

use crate::types::CalendarDate;

/// Parse a strict `YYYY-MM-DD` date.
///
/// Returns `None` for anything else: wrong length or separators, non-digit
/// characters, a zero year/month/day, or a day that does not exist in that
/// month. Never panics; the form layer treats `None` as "nothing to derive".
pub fn parse_iso_date(s: &str) -> Option<CalendarDate> {
    let bytes = s.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let year: i32 = digits(&s[0..4])?.try_into().ok()?;
    let month = digits(&s[5..7])?;
    let day = digits(&s[8..10])?;
    if year == 0 || month == 0 || day == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

fn digits(part: &str) -> Option<u32> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

/// Format as `YYYY-MM-DD`, zero-padding month and day.
pub fn format_iso_date(date: CalendarDate) -> String {
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Add calendar months, clamping the day to the target month's length.
///
/// `2024-01-31 + 1` is `2024-02-29`, never `2024-03-02`. Returns `None` only
/// when the result falls outside the representable date range.
pub fn add_months_clamped(base: CalendarDate, months: u32) -> Option<CalendarDate> {
    let total_months = i64::from(base.year()) * 12 + i64::from(base.month0()) + i64::from(months);
    let new_year = i32::try_from(total_months.div_euclid(12)).ok()?;
    let new_month = (total_months.rem_euclid(12) + 1) as u32;
    let day = base.day().min(days_in_month(new_year, new_month));
    NaiveDate::from_ymd_opt(new_year, new_month, day)
}

/// Count complete months elapsed from `from` to `to`.
///
/// A month is complete once `to` reaches the same day-of-month as `from`,
/// with that anniversary clamped to month end (Jan 31 -> Feb 29 counts as one
/// month). The partial trailing month is dropped. Zero when `to <= from`.
pub fn whole_months_between(from: CalendarDate, to: CalendarDate) -> u32 {
    if to <= from {
        return 0;
    }
    let raw = (i64::from(to.year()) - i64::from(from.year())) * 12
        + i64::from(to.month()) - i64::from(from.month());
    let Ok(mut months) = u32::try_from(raw) else {
        return 0;
    };
    match add_months_clamped(from, months) {
        Some(anniversary) if anniversary > to => months = months.saturating_sub(1),
        None => months = months.saturating_sub(1),
        _ => {}
    }
    months
}

/// Number of days in a given month/year.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

pub fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// December 31st of `year`, the anchor for yearly chart points.
pub fn year_end(year: i32) -> Option<CalendarDate> {
    NaiveDate::from_ymd_opt(year, 12, 31)
}

/// The local calendar date, used as a form's default issue date.
pub fn today() -> CalendarDate {
    chrono::Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(s: &str) -> CalendarDate {
        parse_iso_date(s).unwrap()
    }

    #[test]
    fn test_parse_accepts_strict_iso() {
        assert_eq!(parse_iso_date("2024-02-29"), NaiveDate::from_ymd_opt(2024, 2, 29));
        assert_eq!(parse_iso_date("0001-01-01"), NaiveDate::from_ymd_opt(1, 1, 1));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "2024",
            "2024-1-05",
            "2024-01-5",
            "2024/01/05",
            "2024-00-10",
            "2024-01-00",
            "0000-01-01",
            "2023-02-29",
            "2024-13-01",
            "2024-01-32",
            "+024-01-01",
            " 2024-01-01",
            "2024-01-01T00:00",
            "abcd-ef-gh",
        ] {
            assert_eq!(parse_iso_date(bad), None, "expected None for {bad:?}");
        }
    }

    #[test]
    fn test_format_zero_pads() {
        assert_eq!(format_iso_date(d("2024-03-07")), "2024-03-07");
        assert_eq!(format_iso_date(NaiveDate::from_ymd_opt(987, 1, 2).unwrap()), "0987-01-02");
    }

    #[test]
    fn test_round_trip_every_day_of_two_years() {
        let mut date = d("2023-01-01");
        let end = d("2024-12-31");
        while date <= end {
            assert_eq!(parse_iso_date(&format_iso_date(date)), Some(date));
            date = date.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months_clamped(d("2024-01-31"), 1), Some(d("2024-02-29")));
        assert_eq!(add_months_clamped(d("2023-01-31"), 1), Some(d("2023-02-28")));
        assert_eq!(add_months_clamped(d("2024-03-31"), 1), Some(d("2024-04-30")));
    }

    #[test]
    fn test_add_months_crosses_years() {
        assert_eq!(add_months_clamped(d("2024-11-15"), 3), Some(d("2025-02-15")));
        assert_eq!(add_months_clamped(d("2024-01-15"), 48), Some(d("2028-01-15")));
        assert_eq!(add_months_clamped(d("2024-05-20"), 0), Some(d("2024-05-20")));
    }

    #[test]
    fn test_add_months_out_of_range_is_none() {
        assert_eq!(add_months_clamped(d("2024-01-01"), u32::MAX), None);
    }

    #[test]
    fn test_whole_months_floor() {
        assert_eq!(whole_months_between(d("2024-01-31"), d("2024-02-15")), 0);
        assert_eq!(whole_months_between(d("2024-01-31"), d("2024-03-01")), 1);
        assert_eq!(whole_months_between(d("2024-01-15"), d("2024-02-15")), 1);
        assert_eq!(whole_months_between(d("2024-01-15"), d("2024-02-14")), 0);
        assert_eq!(whole_months_between(d("2024-01-15"), d("2026-01-15")), 24);
    }

    #[test]
    fn test_whole_months_counts_clamped_anniversary() {
        assert_eq!(whole_months_between(d("2024-01-31"), d("2024-02-29")), 1);
        assert_eq!(whole_months_between(d("2023-01-31"), d("2023-02-28")), 1);
    }

    #[test]
    fn test_whole_months_zero_when_not_after() {
        assert_eq!(whole_months_between(d("2024-05-01"), d("2024-05-01")), 0);
        assert_eq!(whole_months_between(d("2024-05-01"), d("2023-05-01")), 0);
    }

    #[test]
    fn test_whole_months_inverts_add_months() {
        let issue = d("2024-01-31");
        for months in 0..60 {
            let start = add_months_clamped(issue, months).unwrap();
            assert_eq!(whole_months_between(issue, start), months, "months={months}");
        }
    }

    #[test]
    fn test_days_in_month_leap_rules() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2023, 4), 30);
    }

    #[test]
    fn test_year_end_anchor() {
        assert_eq!(year_end(2025), Some(d("2025-12-31")));
    }
}
