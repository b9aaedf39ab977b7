//! Volume-delta statistics and live/playback classification
//!
//! Operates on bars ordered by time descending, exactly as the read path
//! returns them. The futures trading week is approximated as Sunday 18:00
//! through Friday 17:00 at a fixed UTC-5 offset with no DST adjustment.

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::types::BarSample;

/// Number of most-recent bars projected into the sparkline series
pub const SPARKLINE_BARS: usize = 20;
/// Sparkline viewport width
pub const SPARKLINE_WIDTH: f64 = 100.0;
/// Sparkline viewport height
pub const SPARKLINE_HEIGHT: f64 = 30.0;
/// Sparkline viewport padding on every edge
pub const SPARKLINE_PADDING: f64 = 2.0;

/// Bars older than this are no longer considered a live feed
const RECENT_WINDOW_MINUTES: i64 = 5;
/// Fixed offset applied when approximating exchange-local hours
const MARKET_UTC_OFFSET_HOURS: i64 = -5;

/// Aggregate view over one display window of bars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeStats {
    /// Sum of `delta_volume` over the window
    pub total_delta: f64,
    /// `total_delta / bar_count`
    pub avg_delta: f64,
    /// Number of bars in the window
    pub bar_count: usize,
    /// Observation time of the most recent bar
    pub last_update: Option<DateTime<Utc>>,
    /// Chronological `delta_volume` series of the most recent bars
    pub sparkline: Vec<f64>,
    /// Whether the feed is classified as live
    pub is_live: bool,
    /// Source tag backing the classification
    pub data_source: String,
}

impl VolumeStats {
    /// Zero-value stats for an empty window
    #[must_use]
    pub fn empty() -> Self {
        Self {
            total_delta: 0.0,
            avg_delta: 0.0,
            bar_count: 0,
            last_update: None,
            sparkline: Vec::new(),
            is_live: false,
            data_source: "no-data".to_string(),
        }
    }
}

/// Classify the feed behind `bars` as live or playback.
///
/// The most recent bar's source field wins when it is tagged; otherwise a
/// timestamp-recency check combined with the market-hours approximation
/// decides, with a `live-detected` / `playback-detected` tag.
#[must_use]
pub fn detect_data_mode(bars: &[BarSample], now: DateTime<Utc>) -> (bool, String) {
    let Some(latest) = bars.first() else {
        return (false, "no-data".to_string());
    };

    let source = latest.source.to_lowercase();
    if source.contains("playback") || source.contains("historical") {
        return (false, source);
    }
    if source.contains("live") || source.contains("realtime") {
        return (true, source);
    }

    let is_recent = now - latest.bar_time < Duration::minutes(RECENT_WINDOW_MINUTES);
    let is_live = is_recent && is_market_hours(now);
    let tag = if is_live {
        "live-detected"
    } else {
        "playback-detected"
    };
    (is_live, tag.to_string())
}

/// Weekly trading-calendar approximation: Sunday 18:00 through Friday
/// 17:00 at a fixed UTC-5 offset. No daylight-saving handling, matching
/// the known approximation this display ships with.
#[must_use]
pub fn is_market_hours(now: DateTime<Utc>) -> bool {
    let day = now.weekday().num_days_from_sunday();
    let hour_local = i64::from(now.hour()) + MARKET_UTC_OFFSET_HOURS;

    (day == 0 && hour_local >= 18) // Sunday evening open
        || (1..=4).contains(&day) // Monday through Thursday
        || (day == 5 && hour_local < 17) // Friday before the close
}

/// Compute display statistics over bars ordered by time descending.
#[must_use]
pub fn compute_stats(bars: &[BarSample], now: DateTime<Utc>) -> VolumeStats {
    if bars.is_empty() {
        return VolumeStats::empty();
    }

    let (is_live, data_source) = detect_data_mode(bars, now);

    let total_delta: f64 = bars.iter().map(|bar| bar.delta_volume).sum();
    let bar_count = bars.len();

    // The display series is the 20 most recent bars in chronological
    // order, independent of the aggregation window.
    let mut sparkline: Vec<f64> = bars
        .iter()
        .take(SPARKLINE_BARS)
        .map(|bar| bar.delta_volume)
        .collect();
    sparkline.reverse();

    VolumeStats {
        total_delta,
        avg_delta: total_delta / bar_count as f64,
        bar_count,
        last_update: Some(bars[0].bar_time),
        sparkline,
        is_live,
        data_source,
    }
}

/// Map a sparkline series onto viewport coordinates.
///
/// X is linear over the padded width; Y maps `[min(values, 0),
/// max(values, 0)]` onto the padded height, inverted so larger values sit
/// higher. A flat series substitutes range 1 to avoid dividing by zero,
/// and a single-point series renders at the left edge.
#[must_use]
pub fn sparkline_points(values: &[f64]) -> Vec<(f64, f64)> {
    let max = values.iter().copied().fold(0.0_f64, f64::max);
    let min = values.iter().copied().fold(0.0_f64, f64::min);
    let range = match max - min {
        r if r == 0.0 => 1.0,
        r => r,
    };
    let span = values.len().saturating_sub(1).max(1) as f64;

    values
        .iter()
        .enumerate()
        .map(|(i, value)| {
            let x = (i as f64 / span) * (SPARKLINE_WIDTH - 2.0 * SPARKLINE_PADDING)
                + SPARKLINE_PADDING;
            let y = SPARKLINE_HEIGHT
                - ((value - min) / range) * (SPARKLINE_HEIGHT - 2.0 * SPARKLINE_PADDING)
                - SPARKLINE_PADDING;
            (x, y)
        })
        .collect()
}

/// Render the series as an SVG path, empty string for an empty series.
#[must_use]
pub fn sparkline_path(values: &[f64]) -> String {
    let points = sparkline_points(values);
    if points.is_empty() {
        return String::new();
    }

    let joined = points
        .iter()
        .map(|(x, y)| format!("{x},{y}"))
        .collect::<Vec<_>>()
        .join(" L ");
    format!("M {joined}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(rfc3339: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc)
    }

    fn bar(bar_time: DateTime<Utc>, delta: f64, source: &str) -> BarSample {
        BarSample {
            bar_time,
            open_volume: delta.max(0.0) + 1000.0,
            close_volume: (delta.max(0.0) + 1000.0) - delta,
            delta_volume: delta,
            source: source.to_string(),
        }
    }

    #[test]
    fn empty_window_yields_zero_stats() {
        let stats = compute_stats(&[], at("2025-01-15T15:00:00Z"));
        assert_eq!(stats.total_delta, 0.0);
        assert_eq!(stats.avg_delta, 0.0);
        assert_eq!(stats.bar_count, 0);
        assert_eq!(stats.last_update, None);
        assert!(stats.sparkline.is_empty());
        assert!(!stats.is_live);
        assert_eq!(stats.data_source, "no-data");
    }

    #[test]
    fn aggregates_total_and_average() {
        // Wednesday 15:00 UTC, inside market hours.
        let now = at("2025-01-15T15:00:00Z");
        let bars = vec![
            bar(at("2025-01-15T14:59:00Z"), 10.0, "NinjaTrader"),
            bar(at("2025-01-15T14:58:00Z"), -4.0, "NinjaTrader"),
        ];
        let stats = compute_stats(&bars, now);
        assert_eq!(stats.total_delta, 6.0);
        assert_eq!(stats.avg_delta, 3.0);
        assert_eq!(stats.bar_count, 2);
        assert_eq!(stats.last_update, Some(at("2025-01-15T14:59:00Z")));
        assert_eq!(stats.sparkline, vec![-4.0, 10.0]);
    }

    #[test]
    fn source_tag_live_wins_over_everything() {
        let now = at("2025-01-15T15:00:00Z");
        // Hours old, but the source says live.
        let bars = vec![bar(at("2025-01-15T03:00:00Z"), 1.0, "NinjaTrader-live")];
        let (is_live, source) = detect_data_mode(&bars, now);
        assert!(is_live);
        assert_eq!(source, "ninjatrader-live");
    }

    #[test]
    fn source_tag_playback_wins_over_recency() {
        let now = at("2025-01-15T15:00:00Z");
        // Seconds old, but the source says playback.
        let bars = vec![bar(
            at("2025-01-15T14:59:50Z"),
            1.0,
            "historical-playback",
        )];
        let (is_live, source) = detect_data_mode(&bars, now);
        assert!(!is_live);
        assert_eq!(source, "historical-playback");
    }

    #[test]
    fn untagged_recent_bar_during_market_hours_is_live() {
        // Wednesday 15:00 UTC = 10:00 at the fixed offset.
        let now = at("2025-01-15T15:00:00Z");
        let bars = vec![bar(at("2025-01-15T14:58:00Z"), 1.0, "NinjaTrader")];
        let (is_live, tag) = detect_data_mode(&bars, now);
        assert!(is_live);
        assert_eq!(tag, "live-detected");
    }

    #[test]
    fn untagged_stale_bar_is_playback() {
        let now = at("2025-01-15T15:00:00Z");
        let bars = vec![bar(at("2025-01-15T13:00:00Z"), 1.0, "NinjaTrader")];
        let (is_live, tag) = detect_data_mode(&bars, now);
        assert!(!is_live);
        assert_eq!(tag, "playback-detected");
    }

    #[test]
    fn market_hours_calendar() {
        // Saturday is always closed.
        assert!(!is_market_hours(at("2025-01-18T15:00:00Z")));
        // Sunday 22:00 UTC is 17:00 local, before the 18:00 open.
        assert!(!is_market_hours(at("2025-01-19T22:00:00Z")));
        // Sunday 23:30 UTC is 18:30 local, after the open.
        assert!(is_market_hours(at("2025-01-19T23:30:00Z")));
        // Wednesday mid-session.
        assert!(is_market_hours(at("2025-01-15T15:00:00Z")));
        // Friday 21:00 UTC is 16:00 local, before the 17:00 close.
        assert!(is_market_hours(at("2025-01-17T21:00:00Z")));
        // Friday 23:00 UTC is 18:00 local, after the close.
        assert!(!is_market_hours(at("2025-01-17T23:00:00Z")));
    }

    #[test]
    fn sparkline_takes_twenty_most_recent_in_chronological_order() {
        let now = at("2025-01-15T15:00:00Z");
        let bars: Vec<BarSample> = (0..30)
            .map(|i| {
                bar(
                    now - Duration::minutes(i64::from(i) + 1),
                    f64::from(i),
                    "NinjaTrader",
                )
            })
            .collect();
        let stats = compute_stats(&bars, now);
        assert_eq!(stats.sparkline.len(), SPARKLINE_BARS);
        // Oldest of the 20 first, newest last.
        assert_eq!(stats.sparkline.first(), Some(&19.0));
        assert_eq!(stats.sparkline.last(), Some(&0.0));
        assert_eq!(stats.bar_count, 30);
    }

    #[test]
    fn sparkline_mapping_spans_the_padded_viewport() {
        let points = sparkline_points(&[5.0, -5.0]);
        assert_eq!(points.len(), 2);
        // min=-5, max=5, range=10: the high value sits at the top padding,
        // the low value at the bottom padding.
        assert_eq!(points[0], (SPARKLINE_PADDING, SPARKLINE_PADDING));
        assert_eq!(
            points[1],
            (
                SPARKLINE_WIDTH - SPARKLINE_PADDING,
                SPARKLINE_HEIGHT - SPARKLINE_PADDING
            )
        );
    }

    #[test]
    fn sparkline_zero_always_included_in_range() {
        // All-positive values still anchor the range at zero.
        let points = sparkline_points(&[26.0, 13.0]);
        // value 26 with min 0, range 26 maps to the top padding.
        assert_eq!(points[0].1, SPARKLINE_PADDING);
        // value 13 maps to the middle of the padded height.
        assert_eq!(points[1].1, SPARKLINE_HEIGHT / 2.0);
    }

    #[test]
    fn sparkline_flat_series_does_not_divide_by_zero() {
        let points = sparkline_points(&[0.0, 0.0, 0.0]);
        assert!(points.iter().all(|(_, y)| y.is_finite()));
        assert_eq!(points[0].1, SPARKLINE_HEIGHT - SPARKLINE_PADDING);
    }

    #[test]
    fn sparkline_single_point_renders_at_left_edge() {
        let points = sparkline_points(&[7.0]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].0, SPARKLINE_PADDING);
        assert!(points[0].1.is_finite());
    }

    #[test]
    fn sparkline_path_shape() {
        assert_eq!(sparkline_path(&[]), "");
        let path = sparkline_path(&[5.0, -5.0]);
        assert_eq!(path, "M 2,2 L 98,28");
    }
}
