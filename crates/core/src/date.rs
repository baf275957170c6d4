use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};

use crate::ParseError;

/// The human-readable date format names carried in mapping configurations,
/// resolved to chrono patterns at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateFormat {
    /// `MM/DD/YYYY`
    MdySlash,
    /// `MM/DD/YY`; two-digit years resolve to the 2000s
    MdySlashShort,
    /// `YYYY-MM-DD`
    IsoDash,
    /// `MM-DD-YYYY`
    MdyDash,
    /// `DD/MM/YYYY`
    DmySlash,
}

impl DateFormat {
    pub fn name(self) -> &'static str {
        match self {
            DateFormat::MdySlash => "MM/DD/YYYY",
            DateFormat::MdySlashShort => "MM/DD/YY",
            DateFormat::IsoDash => "YYYY-MM-DD",
            DateFormat::MdyDash => "MM-DD-YYYY",
            DateFormat::DmySlash => "DD/MM/YYYY",
        }
    }

    fn chrono_pattern(self) -> &'static str {
        match self {
            DateFormat::MdySlash => "%m/%d/%Y",
            DateFormat::MdySlashShort => "%m/%d/%y",
            DateFormat::IsoDash => "%Y-%m-%d",
            DateFormat::MdyDash => "%m-%d-%Y",
            DateFormat::DmySlash => "%d/%m/%Y",
        }
    }

    fn has_two_digit_year(self) -> bool {
        matches!(self, DateFormat::MdySlashShort)
    }
}

impl FromStr for DateFormat {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "MM/DD/YYYY" => Ok(DateFormat::MdySlash),
            "MM/DD/YY" => Ok(DateFormat::MdySlashShort),
            "YYYY-MM-DD" => Ok(DateFormat::IsoDash),
            "MM-DD-YYYY" => Ok(DateFormat::MdyDash),
            "DD/MM/YYYY" => Ok(DateFormat::DmySlash),
            other => Err(ParseError::UnknownDateFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DateFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parse a date field under the given format.
pub fn parse_date(s: &str, format: DateFormat) -> Result<NaiveDate, ParseError> {
    let trimmed = s.trim();
    let date = NaiveDate::parse_from_str(trimmed, format.chrono_pattern()).map_err(|_| {
        ParseError::InvalidDate {
            value: trimmed.to_string(),
            format: format.name().to_string(),
        }
    })?;

    // chrono's %y pivots 69-99 into the 1900s; statement data is 2000s.
    if format.has_two_digit_year() && date.year() < 2000 {
        return date
            .with_year(date.year() + 100)
            .ok_or_else(|| ParseError::InvalidDate {
                value: trimmed.to_string(),
                format: format.name().to_string(),
            });
    }
    Ok(date)
}

/// Sanity window for Level-3 validation: parseable but wildly out-of-range
/// dates (year 0209, year 9999) are data-quality failures, not transactions.
pub fn is_plausible(date: NaiveDate) -> bool {
    (1970..=2100).contains(&date.year())
}
