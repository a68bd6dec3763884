//! Public connection surface: start a connector, stream its entities.
//!
//! [`ShdrConnection::connect`] resolves the upstream address (the only
//! failure a caller sees), spawns the session task, and hands back stream
//! handles. The task keeps reconnecting forever; dropping the
//! [`ObservationStream`] (or the connection itself) cancels it.

mod connector;

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use pin_project_lite::pin_project;
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, info};

use crate::config::ConnectorConfig;
use crate::dictionary::{AssetXmlParser, DataItemDictionary, RawAssetXml};
use crate::error::{AdapterError, Result};
use crate::mapper::TokenMapper;
use crate::types::Entity;

use connector::SessionTask;

/// Upper bound for one SHDR line; longer frames end the session.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

const ENTITY_CHANNEL_CAPACITY: usize = 256;
const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Where the session currently is in its lifecycle.
///
/// Published on a watch channel: intermediate states can be skipped by slow
/// observers, the latest one is always current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Disconnected,
    Connecting,
    /// Socket open. `heartbeat` carries the negotiated frequency once a
    /// valid PONG arrived.
    Connected { heartbeat: Option<Duration> },
    Closing,
}

/// Receiver for `* …` protocol lines that are not part of the PING/PONG
/// exchange. Implementations run on the session task; keep them brief.
pub trait ProtocolCommandHandler: Send + Sync {
    fn on_protocol_command(&mut self, line: &str);
}

/// Default handler: logs extension commands and moves on.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreProtocolCommands;

impl ProtocolCommandHandler for IgnoreProtocolCommands {
    fn on_protocol_command(&mut self, line: &str) {
        debug!(line, "ignoring protocol command");
    }
}

/// Builder for a connector with non-default collaborators.
pub struct ConnectorBuilder {
    config: ConnectorConfig,
    dictionary: Arc<dyn DataItemDictionary>,
    asset_parser: Arc<dyn AssetXmlParser>,
    handler: Box<dyn ProtocolCommandHandler>,
}

impl ConnectorBuilder {
    pub fn new(config: ConnectorConfig, dictionary: Arc<dyn DataItemDictionary>) -> Self {
        Self {
            config,
            dictionary,
            asset_parser: Arc::new(RawAssetXml),
            handler: Box::new(IgnoreProtocolCommands),
        }
    }

    /// Replace the asset XML parser collaborator.
    pub fn asset_parser(mut self, parser: Arc<dyn AssetXmlParser>) -> Self {
        self.asset_parser = parser;
        self
    }

    /// Replace the protocol-command handler.
    pub fn protocol_handler(mut self, handler: Box<dyn ProtocolCommandHandler>) -> Self {
        self.handler = handler;
        self
    }

    /// Resolve the upstream address and spawn the session task.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Resolve`] when the configured server does not
    /// resolve. Connection failures after this point are retried forever and
    /// surface only through [`SessionState`].
    pub async fn connect(self) -> Result<ShdrConnection> {
        let server = self.config.server.clone();
        let port = self.config.port;

        let addrs: Vec<SocketAddr> =
            tokio::net::lookup_host((server.as_str(), port))
                .await
                .map_err(|source| AdapterError::Resolve {
                    server: server.clone(),
                    port,
                    source,
                })?
                .collect();
        if addrs.is_empty() {
            return Err(AdapterError::Resolve {
                server,
                port,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
            });
        }

        info!(
            server = %self.config.server,
            port,
            real_time = self.config.real_time,
            "starting connector"
        );

        let (entity_tx, entity_rx) = mpsc::channel(ENTITY_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (state_tx, state_rx) = watch::channel(SessionState::Disconnected);
        let cancel = CancellationToken::new();

        let task = SessionTask {
            receive_limit: self.config.legacy_timeout(),
            config: self.config,
            addrs,
            mapper: TokenMapper::new(self.dictionary, self.asset_parser),
            handler: self.handler,
            entities: entity_tx,
            state: state_tx,
            commands: command_rx,
            commands_open: true,
            cancel: cancel.clone(),
            heartbeats: false,
        };
        tokio::spawn(task.run());

        Ok(ShdrConnection {
            entities: entity_rx,
            state: state_rx,
            commands: command_tx,
            cancel: cancel.clone(),
            guard: cancel.drop_guard(),
        })
    }
}

/// A running SHDR connector.
///
/// The session task lives until this connection (or the stream taken from
/// it) is dropped, reconnecting to the upstream source at a fixed interval
/// whenever the link dies.
pub struct ShdrConnection {
    entities: mpsc::Receiver<Entity>,
    state: watch::Receiver<SessionState>,
    commands: mpsc::Sender<String>,
    cancel: CancellationToken,
    guard: DropGuard,
}

impl ShdrConnection {
    /// Connect with default collaborators.
    pub async fn connect(
        config: ConnectorConfig,
        dictionary: Arc<dyn DataItemDictionary>,
    ) -> Result<Self> {
        ConnectorBuilder::new(config, dictionary).connect().await
    }

    /// Builder for custom collaborators.
    pub fn builder(
        config: ConnectorConfig,
        dictionary: Arc<dyn DataItemDictionary>,
    ) -> ConnectorBuilder {
        ConnectorBuilder::new(config, dictionary)
    }

    /// Latest session state.
    pub fn current_state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Stream of session-state changes, starting from the current state.
    pub fn state_changes(&self) -> impl Stream<Item = SessionState> + Send + 'static {
        WatchStream::new(self.state.clone())
    }

    /// Handle for sending `* <command>` protocol lines.
    ///
    /// Commands queue while connected and are dropped while the session is
    /// down.
    pub fn commands(&self) -> CommandSender {
        CommandSender { inner: self.commands.clone() }
    }

    /// Stop the session task explicitly. Equivalent to dropping the
    /// connection and every stream taken from it.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Consume the connection into the stream of produced entities.
    ///
    /// Dropping the stream cancels the session task.
    pub fn observations(self) -> ObservationStream {
        ObservationStream { inner: ReceiverStream::new(self.entities), guard: self.guard }
    }
}

/// Clonable sender for egress protocol commands.
#[derive(Clone)]
pub struct CommandSender {
    inner: mpsc::Sender<String>,
}

impl CommandSender {
    /// Queue a command; it is written as `* <command>` on the live session.
    pub async fn send(&self, command: impl Into<String>) -> Result<()> {
        self.inner.send(command.into()).await.map_err(|_| AdapterError::ChannelClosed)
    }
}

pin_project! {
    /// Stream of [`Entity`] values produced by the session task.
    ///
    /// Ends when the connector shuts down; dropping it cancels the
    /// connector.
    pub struct ObservationStream {
        #[pin]
        inner: ReceiverStream<Entity>,
        guard: DropGuard,
    }
}

impl Stream for ObservationStream {
    type Item = Entity;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Entity>> {
        self.project().inner.poll_next(cx)
    }
}
