//! Tokenized frame types.

use chrono::{DateTime, Utc};

/// One tokenized SHDR frame with its resolved timestamp.
///
/// This is the unit that flows from the connector's read loop into the token
/// mapper: the leading timestamp token (if any) has already been consumed by
/// the extractor, and `tokens` holds the remaining payload tokens in wire
/// order.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampedTokens {
    /// Frame timestamp, UTC with microsecond resolution.
    pub timestamp: DateTime<Utc>,
    /// Optional duration in seconds from the timestamp's `@` suffix.
    pub duration: Option<f64>,
    /// Payload tokens, empty tokens preserved.
    pub tokens: Vec<String>,
}
