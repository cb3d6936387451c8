use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::NaiveDate;
use mongodb::bson::Bson;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The year-month period a poll runs for, written `YYYY-MM`.
///
/// Serialised as its canonical string in both the database and the API, so
/// lexical ordering of stored periods matches chronological ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Period {
    year: u16,
    month: u8,
}

/// Reasons a string is not a valid [`Period`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("Period '{0}' is not of the form YYYY-MM")]
    Malformed(String),
    #[error("Month {0} is out of range")]
    MonthOutOfRange(u8),
}

impl Period {
    /// Create a period, checking the month is in `1..=12`.
    pub fn new(year: u16, month: u8) -> Result<Self, PeriodError> {
        if !(1..=12).contains(&month) {
            return Err(PeriodError::MonthOutOfRange(month));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    /// Human-readable form, e.g. "January 2024".
    pub fn label(&self) -> String {
        NaiveDate::from_ymd_opt(self.year.into(), self.month.into(), 1)
            .map(|date| date.format("%B %Y").to_string())
            .unwrap_or_else(|| self.to_string())
    }
}

impl Display for Period {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || PeriodError::Malformed(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(malformed)?;
        let all_digits = |part: &str, len: usize| {
            part.len() == len && part.bytes().all(|b| b.is_ascii_digit())
        };
        if !all_digits(year, 4) || !all_digits(month, 2) {
            return Err(malformed());
        }
        // Both parts are short runs of ASCII digits, so parsing cannot overflow.
        let year = year.parse().map_err(|_| malformed())?;
        let month = month.parse().map_err(|_| malformed())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for Period {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Period> for String {
    fn from(period: Period) -> Self {
        period.to_string()
    }
}

impl From<Period> for Bson {
    fn from(period: Period) -> Self {
        Bson::String(period.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_canonical() {
        let period: Period = "2024-01".parse().unwrap();
        assert_eq!(period.year(), 2024);
        assert_eq!(period.month(), 1);
        assert_eq!(period.to_string(), "2024-01");
        assert_eq!(period, Period::example());
    }

    #[test]
    fn reject_other_encodings() {
        for bad in ["202401", "012024", "01-2024", "2024-1", "24-01", "2024-01-01", "", "abcd-ef"] {
            assert_eq!(
                bad.parse::<Period>(),
                Err(PeriodError::Malformed(bad.to_string())),
                "{bad} should be rejected"
            );
        }
        assert_eq!(
            "2024-13".parse::<Period>(),
            Err(PeriodError::MonthOutOfRange(13))
        );
        assert_eq!(
            "2024-00".parse::<Period>(),
            Err(PeriodError::MonthOutOfRange(0))
        );
    }

    #[test]
    fn label_and_ordering() {
        assert_eq!(Period::example().label(), "January 2024");
        assert_eq!(Period::new(1999, 12).unwrap().label(), "December 1999");
        assert!(Period::example() < Period::example2());
        assert!(Period::new(2023, 12).unwrap() < Period::example());
    }

    #[test]
    fn serde_as_string() {
        let bson = mongodb::bson::to_bson(&Period::example()).unwrap();
        assert_eq!(bson, Bson::String("2024-01".to_string()));
        let period: Period = mongodb::bson::from_bson(bson).unwrap();
        assert_eq!(period, Period::example());
    }
}
