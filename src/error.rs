//! Error types for the SHDR adapter pipeline.
//!
//! All errors implement the `std::error::Error` trait and carry structured
//! context. The taxonomy separates three dispositions:
//!
//! - **Session errors** (`Connect`, `Io`, `ReceiveTimeout`, `LineTooLong`):
//!   the session is closed and reconnected after the configured interval.
//!   `is_recoverable()` returns `true` exactly for this class.
//! - **Frame errors** (`BadTimestamp`, `UnknownDataItem`,
//!   `UnresolvedRequirements`, `UnknownAssetCommand`): the offending frame or
//!   entity is dropped with a log message; the session keeps running.
//! - **Property errors** (`PropertyConversion`): only the offending property
//!   is dropped; the rest of the frame is still mapped.
//!
//! The only error a caller of [`connect`](crate::ShdrConnection::connect)
//! ever sees is `Resolve`; everything after start-up is retried or logged.

use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T, E = AdapterError> = std::result::Result<T, E>;

/// Main error type for the SHDR adapter.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum AdapterError {
    #[error("cannot resolve {server}:{port}")]
    Resolve {
        server: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot connect to {server}:{port}")]
    Connect {
        server: String,
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O failure during {context}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("no data received for over {limit_ms} ms")]
    ReceiveTimeout { limit_ms: u64 },

    #[error("incoming line exceeded {max} bytes")]
    LineTooLong { max: usize },

    #[error("malformed timestamp token: {token:?}")]
    BadTimestamp { token: String },

    #[error("unknown data item: {key}")]
    UnknownDataItem { device: Option<String>, key: String },

    #[error("unresolved requirements for {data_item}: missing {field}")]
    UnresolvedRequirements { data_item: String, field: &'static str },

    #[error("cannot convert {token:?} to {expected}")]
    PropertyConversion { expected: &'static str, token: String },

    #[error("unknown asset command: {command}")]
    UnknownAssetCommand { command: String },

    #[error("bad heartbeat: {arg:?}")]
    BadHeartbeat { arg: String },

    #[error("entity channel closed by receiver")]
    ChannelClosed,
}

impl AdapterError {
    /// Whether the session should close and reconnect after this error.
    ///
    /// Frame- and property-level errors are not recoverable in this sense:
    /// they never tear the session down in the first place.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AdapterError::Connect { .. }
                | AdapterError::Io { .. }
                | AdapterError::ReceiveTimeout { .. }
                | AdapterError::LineTooLong { .. }
        )
    }

    /// Helper constructor for I/O errors with operation context.
    pub fn io(context: &'static str, source: std::io::Error) -> Self {
        AdapterError::Io { context, source }
    }

    /// Helper constructor for timestamp parse failures.
    pub fn bad_timestamp(token: impl Into<String>) -> Self {
        AdapterError::BadTimestamp { token: token.into() }
    }

    /// Helper constructor for property type-conversion failures.
    pub fn conversion(expected: &'static str, token: impl Into<String>) -> Self {
        AdapterError::PropertyConversion { expected, token: token.into() }
    }

    /// Helper constructor for unknown data-item keys.
    pub fn unknown_data_item(device: Option<&str>, key: impl Into<String>) -> Self {
        AdapterError::UnknownDataItem { device: device.map(str::to_string), key: key.into() }
    }
}

impl From<tokio_util::codec::LinesCodecError> for AdapterError {
    fn from(err: tokio_util::codec::LinesCodecError) -> Self {
        match err {
            tokio_util::codec::LinesCodecError::MaxLineLengthExceeded => {
                AdapterError::LineTooLong { max: crate::connection::MAX_LINE_BYTES }
            }
            tokio_util::codec::LinesCodecError::Io(source) => {
                AdapterError::Io { context: "line framing", source }
            }
        }
    }
}
