//! Core volume bar types and allow-lists

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Futures instruments accepted for ingestion
pub const VALID_SYMBOLS: [&str; 8] = ["MNQ", "NQ", "ES", "MES", "YM", "MYM", "RTY", "M2K"];

/// Feeds allowed to submit bars
pub const VALID_SOURCES: [&str; 4] = ["NinjaTrader", "Rithmic", "CQG", "Manual"];

/// Correlated instrument recorded when the submitter omits one
pub const DEFAULT_RELATED_SYMBOL: &str = "QQQ";

/// Clock-skew tolerance on `bar_time`, in minutes
pub const MAX_FUTURE_SKEW_MINUTES: i64 = 5;

/// Allowed difference between the transmitted delta and `open - close`
pub const DELTA_TOLERANCE: f64 = 0.01;

/// Largest batch accepted in one submission
pub const MAX_BATCH_SIZE: usize = 100;

/// Bar granularity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// 1 minute bars
    #[serde(rename = "1m")]
    M1,
    /// 5 minute bars
    #[serde(rename = "5m")]
    M5,
    /// 15 minute bars
    #[serde(rename = "15m")]
    M15,
    /// 30 minute bars
    #[serde(rename = "30m")]
    M30,
    /// 1 hour bars
    #[serde(rename = "1h")]
    H1,
    /// 4 hour bars
    #[serde(rename = "4h")]
    H4,
    /// Daily bars
    #[serde(rename = "1d")]
    D1,
}

impl Timeframe {
    /// Parse a case-insensitive timeframe code
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "1m" => Some(Self::M1),
            "5m" => Some(Self::M5),
            "15m" => Some(Self::M15),
            "30m" => Some(Self::M30),
            "1h" => Some(Self::H1),
            "4h" => Some(Self::H4),
            "1d" => Some(Self::D1),
            _ => None,
        }
    }

    /// Lowercase storage form
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "1m",
            Self::M5 => "5m",
            Self::M15 => "15m",
            Self::M30 => "30m",
            Self::H1 => "1h",
            Self::H4 => "4h",
            Self::D1 => "1d",
        }
    }

    /// Bar duration in seconds
    #[must_use]
    pub const fn duration_seconds(&self) -> i64 {
        match self {
            Self::M1 => 60,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H4 => 14400,
            Self::D1 => 86400,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selectable display window for the read path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    /// Last hour
    #[serde(rename = "1h")]
    OneHour,
    /// Last 24 hours
    #[serde(rename = "24h")]
    TwentyFourHours,
    /// Everything since the epoch
    #[serde(rename = "all")]
    All,
}

impl TimeRange {
    /// Parse a range code as it appears in query strings
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1h" => Some(Self::OneHour),
            "24h" => Some(Self::TwentyFourHours),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Query code
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::TwentyFourHours => "24h",
            Self::All => "all",
        }
    }

    /// Inclusive lower bound on `bar_time` for this window
    #[must_use]
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::OneHour => now - Duration::hours(1),
            Self::TwentyFourHours => now - Duration::hours(24),
            Self::All => DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated, normalized volume bar ready for persistence
///
/// Symbols are uppercased, the timeframe is lowercased and the related
/// symbol defaults to [`DEFAULT_RELATED_SYMBOL`]; `source` is verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBar {
    pub symbol: String,
    pub related_symbol: String,
    pub bar_time: DateTime<Utc>,
    pub open_volume: f64,
    pub close_volume: f64,
    pub delta_volume: f64,
    pub timeframe: Timeframe,
    pub source: String,
}

/// Persisted row shape, as returned by storage after insertion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredBar {
    /// Storage-assigned row id
    pub id: i64,
    pub symbol: String,
    pub related_symbol: String,
    pub bar_time: DateTime<Utc>,
    pub open_volume: f64,
    pub close_volume: f64,
    pub delta_volume: f64,
    pub timeframe: String,
    pub source: String,
    /// Storage-assigned insertion timestamp
    pub created_at: DateTime<Utc>,
}

/// Read-path projection consumed by the stats engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarSample {
    pub bar_time: DateTime<Utc>,
    pub open_volume: f64,
    pub close_volume: f64,
    pub delta_volume: f64,
    pub source: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1m", Some(Timeframe::M1))]
    #[case("1M", Some(Timeframe::M1))]
    #[case("4H", Some(Timeframe::H4))]
    #[case("1d", Some(Timeframe::D1))]
    #[case("2m", None)]
    #[case("", None)]
    fn timeframe_parse_is_case_insensitive(
        #[case] input: &str,
        #[case] expected: Option<Timeframe>,
    ) {
        assert_eq!(Timeframe::parse(input), expected);
    }

    #[test]
    fn timeframe_serde_uses_lowercase_codes() {
        assert_eq!(serde_json::to_string(&Timeframe::H1).unwrap(), "\"1h\"");
        let tf: Timeframe = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(tf, Timeframe::M15);
    }

    #[test]
    fn time_range_cutoffs() {
        let now = Utc::now();
        assert_eq!(TimeRange::OneHour.cutoff(now), now - Duration::hours(1));
        assert_eq!(
            TimeRange::TwentyFourHours.cutoff(now),
            now - Duration::hours(24)
        );
        assert_eq!(TimeRange::All.cutoff(now), DateTime::<Utc>::UNIX_EPOCH);
    }
}
