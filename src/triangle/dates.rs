// src/triangle/dates.rs
//
// Date-encoding detection for period and vintage labels. Each source file is
// internally consistent, so one representative sample per column is enough to
// pick the parsing strategy for the whole column.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

static QUARTER_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)\d{4}\s*Q[1-4]$").expect("quarter-code regex is valid"));
static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]{3}-\d{2}$").expect("month-year regex is valid"));

/// Calendar formats tried, in order, when a column matches neither of the
/// two agency conventions.
const GENERIC_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d %B %Y"];

/// Series-code prefixes whose vintage column uses the `%b-%y` convention
/// regardless of what the generic detector would say. A known special case,
/// kept as an explicit table so it stays auditable.
const MONTH_YEAR_CODE_PREFIXES: &[&str] = &["abjr", "npqt", "ihyq", "exp", "imp"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodFormat {
    /// `YYYY QN` / `YYYYqN`: resolved to the last calendar day of the
    /// quarter's ending month.
    QuarterCode,
    /// `MMM-YY`, e.g. `Jan-23`: resolved to the first of the month.
    MonthYear,
    /// Anything else: a short list of ordinary calendar formats.
    Generic,
}

/// Look up the per-code vintage-format override. Consulted before the
/// generic detector, for the vintage column only.
pub fn vintage_format_override(code: &str) -> Option<PeriodFormat> {
    MONTH_YEAR_CODE_PREFIXES
        .iter()
        .any(|p| code.starts_with(p))
        .then_some(PeriodFormat::MonthYear)
}

/// Classify a single sample label.
pub fn detect_format(sample: &str) -> PeriodFormat {
    let s = sample.trim();
    if QUARTER_CODE.is_match(s) {
        PeriodFormat::QuarterCode
    } else if MONTH_YEAR.is_match(s) {
        PeriodFormat::MonthYear
    } else {
        PeriodFormat::Generic
    }
}

/// Classify a column by its first non-empty label.
pub fn detect_from_labels<'a, I>(labels: I) -> PeriodFormat
where
    I: IntoIterator<Item = &'a str>,
{
    labels
        .into_iter()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(detect_format)
        .unwrap_or(PeriodFormat::Generic)
}

/// Parse one label under the column's detected format. Total: unparseable
/// labels map to `None` and are dropped downstream, never raised.
pub fn parse_period(label: &str, format: PeriodFormat) -> Option<NaiveDate> {
    let s = label.trim();
    if s.is_empty() {
        return None;
    }
    match format {
        PeriodFormat::QuarterCode => parse_quarter_code(s),
        PeriodFormat::MonthYear => {
            NaiveDate::parse_from_str(&format!("01-{s}"), "%d-%b-%y").ok()
        }
        PeriodFormat::Generic => GENERIC_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(s, f).ok()),
    }
}

/// `"2023 Q1"` → 2023-03-31: year from the first four characters, quarter
/// digit × 3 = ending month, resolved to that month's last day.
fn parse_quarter_code(s: &str) -> Option<NaiveDate> {
    if !QUARTER_CODE.is_match(s) {
        return None;
    }
    let year: i32 = s[..4].parse().ok()?;
    let quarter = s.chars().last()?.to_digit(10)?;
    last_day_of_month(year, quarter * 3)
}

pub fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?.pred_opt()
}

fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |next| next.month() != date.month())
}

/// Month arithmetic with the period-end convention: a date on the last day
/// of its month lands on the last day of the target month (2022-09-30 + 3
/// months = 2022-12-31), otherwise the day-of-month carries over, clamped.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    let total = date.year() * 12 + date.month0() as i32 + months as i32;
    let (year, month) = (total.div_euclid(12), total.rem_euclid(12) as u32 + 1);
    let last = last_day_of_month(year, month)?;
    if is_last_day_of_month(date) {
        Some(last)
    } else {
        NaiveDate::from_ymd_opt(year, month, date.day().min(last.day()))
    }
}
