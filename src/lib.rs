//! Async SHDR adapter client for MTConnect data sources.
//!
//! shdrlink maintains a long-lived TCP session to a shop-floor data source
//! speaking the SHDR line protocol, parses incoming frames into structured
//! observations and asset commands, and keeps the link alive with the
//! PING/PONG heartbeat mechanism.
//!
//! # Features
//!
//! - **Resilient sessions**: fixed-interval reconnect, receive watchdog,
//!   peer-negotiated heartbeats
//! - **Faithful parsing**: the pipe/quote/escape token grammar, leading
//!   ISO-8601 timestamps with `@duration`, DATA_SET and TABLE values
//! - **Typed output**: observations classified against a data-item
//!   dictionary, delivered as a `futures::Stream`
//! - **Partial-failure isolation**: a malformed token drops one property,
//!   never the session
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use shdrlink::{ConnectorConfig, DataItem, Shdr, StaticDictionary};
//!
//! #[tokio::main]
//! async fn main() -> shdrlink::Result<()> {
//!     let dictionary = StaticDictionary::builder()
//!         .item(DataItem::sample("Xact"))
//!         .item(DataItem::event("mode"))
//!         .build();
//!
//!     let connection =
//!         Shdr::connect(ConnectorConfig::new("10.0.20.5", 7878), Arc::new(dictionary)).await?;
//!
//!     let mut observations = connection.observations();
//!     while let Some(entity) = observations.next().await {
//!         println!("{entity:?}");
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod config;
mod dictionary;
mod error;
pub mod types;

// Pipeline layers
pub mod connection;
pub mod mapper;
pub mod parser;

// Core exports
pub use config::ConnectorConfig;
pub use dictionary::{
    AssetXmlParser, DataItemDictionary, RawAssetXml, StaticDictionary, StaticDictionaryBuilder,
};
pub use error::{AdapterError, Result};
pub use types::*;

// Connection exports
pub use connection::{
    CommandSender, ConnectorBuilder, IgnoreProtocolCommands, ObservationStream,
    ProtocolCommandHandler, SessionState, ShdrConnection, MAX_LINE_BYTES,
};

// Mapper export
pub use mapper::TokenMapper;

/// Unified entry point for SHDR connections.
///
/// Thin facade over [`ShdrConnection`]; use [`ShdrConnection::builder`] when
/// a custom asset parser or protocol-command handler is needed.
pub struct Shdr;

impl Shdr {
    /// Connect to an upstream SHDR data source.
    ///
    /// Resolves the configured server, spawns the connector task, and
    /// returns the connection handle. After this returns `Ok`, the session
    /// recovers from every network-level failure by itself.
    ///
    /// # Errors
    ///
    /// Returns an error only when the server name does not resolve.
    pub async fn connect(
        config: ConnectorConfig,
        dictionary: std::sync::Arc<dyn DataItemDictionary>,
    ) -> Result<ShdrConnection> {
        ShdrConnection::connect(config, dictionary).await
    }
}
