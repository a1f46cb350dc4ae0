use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{EtlError, EtlResult};

/// Calendar month a sales/inventory extract reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReportMonth {
    pub year: i32,
    pub month: u32,
}

impl ReportMonth {
    pub fn new(year: i32, month: u32) -> EtlResult<Self> {
        if !(1..=12).contains(&month) || !(1000..=9999).contains(&year) {
            return Err(EtlError::InvalidPeriod(format!("{:04}-{:02}", year, month)));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

}

impl fmt::Display for ReportMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for ReportMonth {
    type Err = EtlError;

    /// Accepts `YYYY-MM` or `YYYY_MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || EtlError::InvalidPeriod(s.to_string());
        let trimmed = s.trim();
        let (year, month) = trimmed
            .split_once(|c: char| c == '-' || c == '_')
            .ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::new(year, month).map_err(|_| invalid())
    }
}

/// Best-effort period from a file name, falling back to the current month.
pub fn infer_report_month(name_or_path: &str) -> ReportMonth {
    infer_report_month_at(name_or_path, Local::now().date_naive())
}

pub fn infer_report_month_at(name_or_path: &str, today: NaiveDate) -> ReportMonth {
    let name = Path::new(name_or_path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(name_or_path);

    numeric_token(name)
        .or_else(|| month_name_token(name))
        .unwrap_or_else(|| ReportMonth::from_date(today))
}

fn numeric_token(name: &str) -> Option<ReportMonth> {
    let re = Regex::new(r"(20\d{2})[-_](0[1-9]|1[0-2])").ok()?;
    let caps = re.captures(name)?;
    let year = caps.get(1)?.as_str().parse().ok()?;
    let month = caps.get(2)?.as_str().parse().ok()?;
    ReportMonth::new(year, month).ok()
}

fn month_name_token(name: &str) -> Option<ReportMonth> {
    let re = Regex::new(r"(?i)(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*[ _-]?(20\d{2})").ok()?;
    let caps = re.captures(name)?;
    let month = match caps.get(1)?.as_str().to_ascii_lowercase().as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    let year = caps.get(2)?.as_str().parse().ok()?;
    ReportMonth::new(year, month).ok()
}
