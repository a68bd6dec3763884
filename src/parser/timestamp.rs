//! Leading-timestamp extraction.
//!
//! SHDR frames may open with a `YYYY-MM-DDTHH:MM:SS[.ffffff]Z` token,
//! optionally suffixed with `@<seconds>` to carry an observation duration.
//! Frames without one get the ingest wall clock instead.

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};

use crate::error::{AdapterError, Result};
use crate::types::TimestampedTokens;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Peel an optional leading timestamp off `tokens`.
///
/// A first token shaped like a date (`dddd-`) must parse as a strict UTC
/// ISO-8601 instant or the whole frame is rejected with `BadTimestamp`. Any
/// other first token is left in place and the frame is stamped with `now`.
/// Timestamps are truncated to microsecond resolution.
pub fn extract_timestamp(tokens: Vec<String>, now: DateTime<Utc>) -> Result<TimestampedTokens> {
    let Some(first) = tokens.first() else {
        return Ok(TimestampedTokens { timestamp: now, duration: None, tokens });
    };

    if !looks_like_timestamp(first) {
        return Ok(TimestampedTokens { timestamp: now, duration: None, tokens });
    }

    let (stamp, duration) = split_duration(first);
    let parsed = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)
        .map_err(|_| AdapterError::bad_timestamp(first.clone()))?;

    Ok(TimestampedTokens {
        timestamp: parsed.and_utc().trunc_subsecs(6),
        duration,
        tokens: tokens[1..].to_vec(),
    })
}

/// Cheap shape check: four digits then `-`. Everything else is payload.
fn looks_like_timestamp(token: &str) -> bool {
    let bytes = token.as_bytes();
    bytes.len() > 4 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'-'
}

/// Strip a trailing `@<double>` off the timestamp token. The suffix is
/// removed whether or not it parses; only a finite positive value survives
/// as the duration.
fn split_duration(token: &str) -> (&str, Option<f64>) {
    match token.find('@') {
        Some(at) => {
            let duration = token[at + 1..]
                .parse::<f64>()
                .ok()
                .filter(|seconds| seconds.is_finite() && *seconds > 0.0);
            (&token[..at], duration)
        }
        None => (token, None),
    }
}
