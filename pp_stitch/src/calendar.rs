//! Calendar and time-coordinate conversions.
//!
//! On-disk time coordinates are numeric day offsets from a per-file origin
//! declared in a `"days since YYYY-MM-DD HH:MM:SS"` units string. Conversions
//! between offsets and absolute instants always follow the real (proleptic
//! Gregorian) calendar; the [`Calendar`] mode only changes how many extra days
//! the merger inserts when shifting a cycle forward by whole years.

use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::StitchError;

/// Nominal year length used for all whole-year shift arithmetic.
pub const DAYS_PER_YEAR: f64 = 365.0;

const MS_PER_DAY: f64 = 86_400_000.0;

/// Shift-arithmetic mode derived from the NetCDF `calendar` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Calendar {
    /// 365-day years for shifting, plus one whole day per 4 shifted years.
    Leap,
    /// Flat 365-day years, no leap adjustment.
    NoLeap,
}

impl Calendar {
    pub fn from_attr(attr: &str) -> Result<Self, StitchError> {
        match attr.trim().to_ascii_lowercase().as_str() {
            "noleap" | "365_day" => Ok(Calendar::NoLeap),
            "julian" | "gregorian" | "standard" | "proleptic_gregorian" | "leap" => {
                Ok(Calendar::Leap)
            }
            other => Err(StitchError::UnsupportedCalendar(other.to_string())),
        }
    }

    /// Extra whole days accumulated when shifting by `years` whole years.
    ///
    /// The divmod-4 rule is a coarse approximation of real leap-day
    /// accumulation (century rules and non-multiple-of-4 boundaries are
    /// ignored); it is kept verbatim for compatibility with existing records.
    pub fn leap_days(self, years: i64) -> i64 {
        match self {
            Calendar::Leap => years / 4,
            Calendar::NoLeap => 0,
        }
    }
}

/// Parsed `"days since ORIGIN"` units string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeUnits {
    pub origin: NaiveDateTime,
}

impl TimeUnits {
    /// Parse a units attribute of the form `days since YYYY-MM-DD[ HH:MM:SS]`.
    pub fn parse(units: &str) -> Result<Self, StitchError> {
        let rest = units
            .trim()
            .strip_prefix("days since ")
            .ok_or_else(|| StitchError::BadUnits(units.to_string()))?
            .trim();
        let origin = NaiveDateTime::parse_from_str(rest, "%Y-%m-%d %H:%M:%S")
            .or_else(|_| {
                NaiveDate::parse_from_str(rest, "%Y-%m-%d").map(|d| d.and_time(NaiveTime::MIN))
            })
            .map_err(|_| StitchError::BadUnits(units.to_string()))?;
        Ok(Self { origin })
    }

    /// Units anchored at Jan 1 00:00:00 of `year`.
    pub fn from_origin_year(year: i64) -> Result<Self, StitchError> {
        let year = i32::try_from(year).map_err(|_| StitchError::OriginOutOfRange(year))?;
        let date = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or(StitchError::OriginOutOfRange(year as i64))?;
        Ok(Self {
            origin: date.and_time(NaiveTime::MIN),
        })
    }

    /// Decode a day offset into an absolute instant (millisecond precision).
    pub fn to_absolute(&self, offset_days: f64) -> NaiveDateTime {
        self.origin + Duration::milliseconds((offset_days * MS_PER_DAY).round() as i64)
    }

    /// Encode an absolute instant as a day offset from this origin.
    ///
    /// Round-trips exactly with [`TimeUnits::to_absolute`] for any offset that
    /// was itself produced by this function.
    pub fn from_absolute(&self, instant: NaiveDateTime) -> f64 {
        (instant - self.origin).num_milliseconds() as f64 / MS_PER_DAY
    }
}

impl fmt::Display for TimeUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "days since {}", self.origin.format("%Y-%m-%d %H:%M:%S"))
    }
}
