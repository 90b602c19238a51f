//! Post-processing tree layout: frequency resolution, directory templates and
//! output filenames.
//!
//! Layout convention:
//! `<root>/<stream>/ts/<frequency>/<N>yr/<stream>.<start>-<end>.<variable>.nc`.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::StitchError;

/// Output aggregation frequency, normally inferred from the stream name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Frequency {
    Annual,
    Monthly,
    Daily,
}

impl Frequency {
    pub fn parse(value: &str) -> Result<Self, StitchError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "annual" => Ok(Frequency::Annual),
            "monthly" => Ok(Frequency::Monthly),
            "daily" => Ok(Frequency::Daily),
            other => Err(StitchError::UnsupportedFrequency(other.to_string())),
        }
    }

    /// Substring inference from the stream name; monthly is the default.
    pub fn infer(stream: &str) -> Self {
        if stream.contains("annual") {
            Frequency::Annual
        } else if stream.contains("daily") {
            Frequency::Daily
        } else {
            Frequency::Monthly
        }
    }

    /// Resolve the effective frequency once, at pipeline start: an explicit
    /// override wins, otherwise infer from the stream name.
    pub fn resolve(stream: &str, override_value: Option<&str>) -> Result<Self, StitchError> {
        match override_value {
            Some(value) => Self::parse(value),
            None => Ok(Self::infer(stream)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Annual => "annual",
            Frequency::Monthly => "monthly",
            Frequency::Daily => "daily",
        }
    }

    /// Filename date token for one instant at this frequency's granularity.
    pub fn date_token(self, instant: NaiveDateTime) -> String {
        let fmt = match self {
            Frequency::Annual => "%Y",
            Frequency::Monthly => "%Y%m",
            Frequency::Daily => "%Y%m%d",
        };
        instant.format(fmt).to_string()
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory where input slices live: `<root>/<stream>/ts/<frequency>`.
pub fn input_timeseries_dir(root: &Path, stream: &str, frequency: Frequency) -> PathBuf {
    root.join(stream).join("ts").join(frequency.as_str())
}

/// Directory where output segments go: `<root>/<stream>/ts/<frequency>/<N>yr`.
pub fn output_segment_dir(
    root: &Path,
    stream: &str,
    frequency: Frequency,
    window_years: u32,
) -> PathBuf {
    input_timeseries_dir(root, stream, frequency).join(format!("{}yr", window_years))
}

/// Output segment filename from the first and last instants actually present.
pub fn segment_filename(
    stream: &str,
    variable: &str,
    frequency: Frequency,
    first: NaiveDateTime,
    last: NaiveDateTime,
) -> String {
    format!(
        "{}.{}-{}.{}.nc",
        stream,
        frequency.date_token(first),
        frequency.date_token(last),
        variable
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instant(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn frequency_inference_from_stream_name() {
        assert_eq!(Frequency::infer("ocean_annual"), Frequency::Annual);
        assert_eq!(Frequency::infer("atmos_daily"), Frequency::Daily);
        assert_eq!(Frequency::infer("ocean_month"), Frequency::Monthly);
    }

    #[test]
    fn override_beats_inference() {
        assert_eq!(
            Frequency::resolve("ocean_annual", Some("monthly")).unwrap(),
            Frequency::Monthly
        );
        assert_eq!(
            Frequency::resolve("ocean_month", None).unwrap(),
            Frequency::Monthly
        );
    }

    #[test]
    fn unknown_override_is_a_config_error() {
        assert!(matches!(
            Frequency::resolve("ocean_month", Some("hourly")),
            Err(StitchError::UnsupportedFrequency(_))
        ));
    }

    #[test]
    fn directory_templates() {
        let dir = input_timeseries_dir(Path::new("/archive/pp"), "ocean_annual", Frequency::Annual);
        assert_eq!(dir, PathBuf::from("/archive/pp/ocean_annual/ts/annual"));
        let out = output_segment_dir(Path::new("/out"), "ocean_annual", Frequency::Annual, 20);
        assert_eq!(out, PathBuf::from("/out/ocean_annual/ts/annual/20yr"));
    }

    #[test]
    fn filename_tokens_match_frequency() {
        let first = instant(1958, 1, 16);
        let last = instant(1977, 12, 16);
        assert_eq!(
            segment_filename("ocean_annual", "thetao", Frequency::Annual, first, last),
            "ocean_annual.1958-1977.thetao.nc"
        );
        assert_eq!(
            segment_filename("ocean_month", "thetao", Frequency::Monthly, first, last),
            "ocean_month.195801-197712.thetao.nc"
        );
        assert_eq!(
            segment_filename("atmos_daily", "tas", Frequency::Daily, first, last),
            "atmos_daily.19580116-19771216.tas.nc"
        );
    }
}
