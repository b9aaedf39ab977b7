//! Field-level validation of incoming volume bars
//!
//! Incoming payloads are duck-typed JSON from the charting platform, so
//! validation works over [`serde_json::Value`] and reports every violated
//! rule for a record instead of stopping at the first. The result is
//! tagged: normalized data on success, a list of typed field errors
//! otherwise. Pure over the input and the supplied clock.

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::types::{
    NormalizedBar, Timeframe, DEFAULT_RELATED_SYMBOL, DELTA_TOLERANCE, MAX_BATCH_SIZE,
    MAX_FUTURE_SKEW_MINUTES, VALID_SOURCES, VALID_SYMBOLS,
};

/// A single violated validation rule
///
/// Display strings are the human-readable messages surfaced over HTTP.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldError {
    #[error("Request body must be a valid object")]
    NotAnObject,
    #[error("Request body must be an array of volume bars")]
    NotAnArray,
    #[error("Array cannot be empty")]
    EmptyBatch,
    #[error("Batch size cannot exceed {MAX_BATCH_SIZE} bars")]
    BatchTooLarge,
    #[error("symbol is required and must be a string")]
    SymbolMissing,
    #[error("symbol must be one of: {}", VALID_SYMBOLS.join(", "))]
    SymbolUnknown,
    #[error("bar_time is required and must be an ISO 8601 timestamp string")]
    BarTimeMissing,
    #[error("bar_time must be a valid ISO 8601 timestamp (e.g., 2025-01-15T14:30:00Z)")]
    BarTimeInvalid,
    #[error("bar_time cannot be more than {MAX_FUTURE_SKEW_MINUTES} minutes in the future")]
    BarTimeInFuture,
    #[error("open_volume is required and must be a number")]
    OpenVolumeMissing,
    #[error("open_volume must be >= 0")]
    OpenVolumeNegative,
    #[error("close_volume is required and must be a number")]
    CloseVolumeMissing,
    #[error("close_volume must be >= 0")]
    CloseVolumeNegative,
    #[error("delta_volume is required and must be a number")]
    DeltaVolumeMissing,
    #[error("delta_volume ({delta}) does not match open_volume - close_volume ({expected})")]
    DeltaMismatch {
        /// Transmitted delta
        delta: f64,
        /// Delta recomputed from the volume counters
        expected: f64,
    },
    #[error("timeframe is required and must be a string")]
    TimeframeMissing,
    #[error("timeframe must be one of: 1m, 5m, 15m, 30m, 1h, 4h, 1d")]
    TimeframeUnknown,
    #[error("source is required and must be a string")]
    SourceMissing,
    #[error("source must be one of: {}", VALID_SOURCES.join(", "))]
    SourceUnknown,
    #[error("related_symbol must be a string if provided")]
    RelatedSymbolNotString,
    /// A failure of one element inside a batch
    #[error("Bar {index}: {error}")]
    Indexed {
        /// Position of the failing record in the submitted array
        index: usize,
        /// The underlying field error
        error: Box<FieldError>,
    },
}

/// Validate and normalize one incoming volume bar.
///
/// All violated rules are collected; the record is accepted only when the
/// error list stays empty. `now` anchors the future-timestamp check.
pub fn validate_bar(value: &Value, now: DateTime<Utc>) -> Result<NormalizedBar, Vec<FieldError>> {
    let Some(record) = value.as_object() else {
        return Err(vec![FieldError::NotAnObject]);
    };

    let mut errors = Vec::new();

    let symbol = match record.get("symbol").and_then(Value::as_str) {
        None => {
            errors.push(FieldError::SymbolMissing);
            None
        }
        Some(s) => {
            let upper = s.to_uppercase();
            if VALID_SYMBOLS.contains(&upper.as_str()) {
                Some(upper)
            } else {
                errors.push(FieldError::SymbolUnknown);
                None
            }
        }
    };

    let bar_time = match record.get("bar_time").and_then(Value::as_str) {
        None => {
            errors.push(FieldError::BarTimeMissing);
            None
        }
        Some(s) => match DateTime::parse_from_rfc3339(s) {
            Err(_) => {
                errors.push(FieldError::BarTimeInvalid);
                None
            }
            Ok(ts) => {
                let ts = ts.with_timezone(&Utc);
                if ts > now + Duration::minutes(MAX_FUTURE_SKEW_MINUTES) {
                    errors.push(FieldError::BarTimeInFuture);
                    None
                } else {
                    Some(ts)
                }
            }
        },
    };

    let open_volume = match record.get("open_volume").and_then(Value::as_f64) {
        None => {
            errors.push(FieldError::OpenVolumeMissing);
            None
        }
        Some(v) if v < 0.0 => {
            errors.push(FieldError::OpenVolumeNegative);
            None
        }
        Some(v) => Some(v),
    };

    let close_volume = match record.get("close_volume").and_then(Value::as_f64) {
        None => {
            errors.push(FieldError::CloseVolumeMissing);
            None
        }
        Some(v) if v < 0.0 => {
            errors.push(FieldError::CloseVolumeNegative);
            None
        }
        Some(v) => Some(v),
    };

    let delta_volume = match record.get("delta_volume").and_then(Value::as_f64) {
        None => {
            errors.push(FieldError::DeltaVolumeMissing);
            None
        }
        Some(delta) => {
            // Cross-check against the counters rather than recompute and
            // trust; a mismatch is a rejection, not a silent correction.
            if let (Some(open), Some(close)) = (open_volume, close_volume) {
                let expected = open - close;
                if (delta - expected).abs() > DELTA_TOLERANCE {
                    errors.push(FieldError::DeltaMismatch { delta, expected });
                }
            }
            Some(delta)
        }
    };

    let timeframe = match record.get("timeframe").and_then(Value::as_str) {
        None => {
            errors.push(FieldError::TimeframeMissing);
            None
        }
        Some(s) => match Timeframe::parse(s) {
            None => {
                errors.push(FieldError::TimeframeUnknown);
                None
            }
            Some(tf) => Some(tf),
        },
    };

    let source = match record.get("source").and_then(Value::as_str) {
        None => {
            errors.push(FieldError::SourceMissing);
            None
        }
        Some(s) => {
            if VALID_SOURCES.contains(&s) {
                Some(s.to_string())
            } else {
                errors.push(FieldError::SourceUnknown);
                None
            }
        }
    };

    let related_symbol = match record.get("related_symbol") {
        None => Some(DEFAULT_RELATED_SYMBOL.to_string()),
        Some(v) => match v.as_str() {
            Some(s) => Some(s.to_uppercase()),
            None => {
                errors.push(FieldError::RelatedSymbolNotString);
                None
            }
        },
    };

    if !errors.is_empty() {
        return Err(errors);
    }

    // All fields are present once the error list is empty.
    match (
        symbol,
        related_symbol,
        bar_time,
        open_volume,
        close_volume,
        delta_volume,
        timeframe,
        source,
    ) {
        (
            Some(symbol),
            Some(related_symbol),
            Some(bar_time),
            Some(open_volume),
            Some(close_volume),
            Some(delta_volume),
            Some(timeframe),
            Some(source),
        ) => Ok(NormalizedBar {
            symbol,
            related_symbol,
            bar_time,
            open_volume,
            close_volume,
            delta_volume,
            timeframe,
            source,
        }),
        // Every None above pushed an error, so this arm cannot be reached
        // once the error list is empty; fail typed rather than panic.
        _ => Err(vec![FieldError::NotAnObject]),
    }
}

/// Validate a batch submission.
///
/// The input must be an array of 1 to [`MAX_BATCH_SIZE`] records. Every
/// element is validated independently and failures carry the element
/// index; one bad element rejects the whole batch.
pub fn validate_batch(
    value: &Value,
    now: DateTime<Utc>,
) -> Result<Vec<NormalizedBar>, Vec<FieldError>> {
    let Some(items) = value.as_array() else {
        return Err(vec![FieldError::NotAnArray]);
    };
    if items.is_empty() {
        return Err(vec![FieldError::EmptyBatch]);
    }
    if items.len() > MAX_BATCH_SIZE {
        return Err(vec![FieldError::BatchTooLarge]);
    }

    let mut errors = Vec::new();
    let mut bars = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match validate_bar(item, now) {
            Ok(bar) => bars.push(bar),
            Err(item_errors) => {
                errors.extend(item_errors.into_iter().map(|error| FieldError::Indexed {
                    index,
                    error: Box::new(error),
                }));
            }
        }
    }

    if errors.is_empty() {
        Ok(bars)
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn fixed_now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-01-15T15:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn valid_bar() -> Value {
        json!({
            "symbol": "MNQ",
            "bar_time": "2025-01-15T14:30:00Z",
            "open_volume": 12000.0,
            "close_volume": 11500.0,
            "delta_volume": 500.0,
            "timeframe": "1m",
            "source": "NinjaTrader"
        })
    }

    #[test]
    fn accepts_and_normalizes_a_valid_bar() {
        let bar = validate_bar(&valid_bar(), fixed_now()).unwrap();
        assert_eq!(bar.symbol, "MNQ");
        assert_eq!(bar.related_symbol, DEFAULT_RELATED_SYMBOL);
        assert_eq!(bar.timeframe, Timeframe::M1);
        assert_eq!(bar.delta_volume, 500.0);
        assert_eq!(bar.source, "NinjaTrader");
    }

    #[test]
    fn normalizes_symbol_and_timeframe_case() {
        let mut raw = valid_bar();
        raw["symbol"] = json!("mnq");
        raw["timeframe"] = json!("1M");
        raw["related_symbol"] = json!("qqq");
        let bar = validate_bar(&raw, fixed_now()).unwrap();
        assert_eq!(bar.symbol, "MNQ");
        assert_eq!(bar.timeframe, Timeframe::M1);
        assert_eq!(bar.related_symbol, "QQQ");
    }

    #[test]
    fn validation_is_idempotent_over_its_own_output() {
        let bar = validate_bar(&valid_bar(), fixed_now()).unwrap();
        let reencoded = serde_json::to_value(&bar).unwrap();
        let revalidated = validate_bar(&reencoded, fixed_now()).unwrap();
        assert_eq!(bar, revalidated);
    }

    #[test]
    fn rejects_delta_mismatch_beyond_tolerance() {
        let mut raw = valid_bar();
        raw["delta_volume"] = json!(400.0);
        let errors = validate_bar(&raw, fixed_now()).unwrap_err();
        assert_eq!(
            errors,
            vec![FieldError::DeltaMismatch {
                delta: 400.0,
                expected: 500.0
            }]
        );
        assert!(errors[0].to_string().contains("does not match"));
    }

    #[test]
    fn tolerates_small_delta_rounding() {
        let mut raw = valid_bar();
        raw["delta_volume"] = json!(500.005);
        assert!(validate_bar(&raw, fixed_now()).is_ok());
    }

    #[test]
    fn rejects_future_bar_time_beyond_skew() {
        let mut raw = valid_bar();
        raw["bar_time"] = json!("2025-01-15T15:06:00Z");
        let errors = validate_bar(&raw, fixed_now()).unwrap_err();
        assert_eq!(errors, vec![FieldError::BarTimeInFuture]);

        // Inside the five-minute tolerance is fine.
        let mut raw = valid_bar();
        raw["bar_time"] = json!("2025-01-15T15:04:00Z");
        assert!(validate_bar(&raw, fixed_now()).is_ok());
    }

    #[test]
    fn collects_all_violations_instead_of_short_circuiting() {
        let raw = json!({
            "symbol": "BTC",
            "bar_time": "not-a-timestamp",
            "open_volume": -1.0,
            "timeframe": "2m",
            "source": "Sierra"
        });
        let errors = validate_bar(&raw, fixed_now()).unwrap_err();
        assert!(errors.contains(&FieldError::SymbolUnknown));
        assert!(errors.contains(&FieldError::BarTimeInvalid));
        assert!(errors.contains(&FieldError::OpenVolumeNegative));
        assert!(errors.contains(&FieldError::CloseVolumeMissing));
        assert!(errors.contains(&FieldError::DeltaVolumeMissing));
        assert!(errors.contains(&FieldError::TimeframeUnknown));
        assert!(errors.contains(&FieldError::SourceUnknown));
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn rejects_non_object_input() {
        let errors = validate_bar(&json!("bar"), fixed_now()).unwrap_err();
        assert_eq!(errors, vec![FieldError::NotAnObject]);
    }

    #[test]
    fn related_symbol_must_be_a_string_when_present() {
        let mut raw = valid_bar();
        raw["related_symbol"] = json!(42);
        let errors = validate_bar(&raw, fixed_now()).unwrap_err();
        assert_eq!(errors, vec![FieldError::RelatedSymbolNotString]);
    }

    #[test]
    fn source_match_is_case_sensitive() {
        let mut raw = valid_bar();
        raw["source"] = json!("ninjatrader");
        let errors = validate_bar(&raw, fixed_now()).unwrap_err();
        assert_eq!(errors, vec![FieldError::SourceUnknown]);
    }

    #[test]
    fn batch_rejects_non_array_and_empty_input() {
        assert_eq!(
            validate_batch(&valid_bar(), fixed_now()).unwrap_err(),
            vec![FieldError::NotAnArray]
        );
        assert_eq!(
            validate_batch(&json!([]), fixed_now()).unwrap_err(),
            vec![FieldError::EmptyBatch]
        );
    }

    #[test]
    fn batch_size_boundaries() {
        let oversized: Vec<Value> = (0..101).map(|_| valid_bar()).collect();
        assert_eq!(
            validate_batch(&Value::Array(oversized), fixed_now()).unwrap_err(),
            vec![FieldError::BatchTooLarge]
        );

        let full: Vec<Value> = (0..100).map(|_| valid_bar()).collect();
        let bars = validate_batch(&Value::Array(full), fixed_now()).unwrap();
        assert_eq!(bars.len(), 100);
    }

    #[test]
    fn batch_is_all_or_nothing_and_references_the_bad_index() {
        let mut bad = valid_bar();
        bad["delta_volume"] = json!(0.0);
        let errors =
            validate_batch(&json!([valid_bar(), bad, valid_bar()]), fixed_now()).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().starts_with("Bar 1:"));
        match &errors[0] {
            FieldError::Indexed { index, error } => {
                assert_eq!(*index, 1);
                assert!(matches!(**error, FieldError::DeltaMismatch { .. }));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
