//! Timestamp parsing and row cleaning.

use chrono::NaiveDate;
use serde::Serialize;

use super::provider::RawObservation;
use crate::core::{PriceSeries, TimePoint};
use crate::error::Result;

/// What cleaning did to a batch of raw rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub raw_rows: usize,
    pub unparseable_timestamps: usize,
    /// Rows with no value, or a negative or non-finite one.
    pub missing_values: usize,
    pub before_start: usize,
    /// Rows replaced by a later row with the same date.
    pub duplicates: usize,
    pub kept: usize,
}

/// Parse `YYYY-MM-DD`, `YYYYMMDD` or `YYYY MMDD`, optionally followed by a
/// frequency token such as `D`.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    parse_date(trimmed).or_else(|| {
        let (head, _frequency) = trimmed.rsplit_once(char::is_whitespace)?;
        parse_date(head.trim_end())
    })
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }
    let digits: String = match s.split_once(' ') {
        Some((year, month_day)) if year.len() == 4 && month_day.len() == 4 => {
            format!("{}{}", year, month_day)
        }
        Some(_) => return None,
        None => s.to_string(),
    };
    if digits.len() != 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = digits[0..4].parse().ok()?;
    let month = digits[4..6].parse().ok()?;
    let day = digits[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Drop unusable rows, restrict to `start`, sort, and collapse duplicate
/// dates keeping the last row in provider order.
pub fn clean(rows: &[RawObservation], start: NaiveDate) -> Result<(PriceSeries, CleaningReport)> {
    let mut report = CleaningReport {
        raw_rows: rows.len(),
        ..Default::default()
    };

    let mut points = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(timestamp) = parse_timestamp(&row.timestamp) else {
            report.unparseable_timestamps += 1;
            continue;
        };
        let price = match row.value {
            Some(v) if v.is_finite() && v >= 0.0 => v,
            _ => {
                report.missing_values += 1;
                continue;
            }
        };
        if timestamp < start {
            report.before_start += 1;
            continue;
        }
        points.push(TimePoint::new(timestamp, price));
    }

    // Stable, so equal dates stay in provider order and the last one wins.
    points.sort_by_key(|p| p.timestamp);
    let mut deduped: Vec<TimePoint> = Vec::with_capacity(points.len());
    for point in points {
        match deduped.last_mut() {
            Some(last) if last.timestamp == point.timestamp => {
                *last = point;
                report.duplicates += 1;
            }
            _ => deduped.push(point),
        }
    }

    report.kept = deduped.len();
    Ok((PriceSeries::new(deduped)?, report))
}
