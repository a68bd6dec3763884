//! Session task: the TCP state machine behind a connection.
//!
//! One task owns the socket, the line framing, the three timers (reconnect,
//! heartbeat, receive watchdog) and the mapper. Everything is serialized on
//! this task, so there is at most one outstanding read and no shared mutable
//! state. The reconnect loop runs forever at a fixed interval; nothing that
//! happens after start-up is fatal.

use std::net::SocketAddr;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{self, Duration, Instant, Interval, MissedTickBehavior};
use tokio_util::codec::{Framed, LinesCodec};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::{ProtocolCommandHandler, SessionState, MAX_LINE_BYTES};
use crate::config::ConnectorConfig;
use crate::error::{AdapterError, Result};
use crate::mapper::TokenMapper;
use crate::parser;
use crate::types::Entity;

/// Heartbeat frequencies at or above 30 minutes are rejected.
const MAX_HEARTBEAT_MS: u64 = 30 * 60 * 1000;

/// Why a session ended.
#[derive(Debug)]
pub(crate) enum SessionEnd {
    Cancelled,
    PeerClosed,
    ReceiveTimeout,
    ChannelClosed,
    Failed(AdapterError),
}

/// State owned by the connector's session task.
pub(crate) struct SessionTask {
    pub(crate) config: ConnectorConfig,
    pub(crate) addrs: Vec<SocketAddr>,
    pub(crate) mapper: TokenMapper,
    pub(crate) handler: Box<dyn ProtocolCommandHandler>,
    pub(crate) entities: mpsc::Sender<Entity>,
    pub(crate) state: watch::Sender<SessionState>,
    pub(crate) commands: mpsc::Receiver<String>,
    pub(crate) commands_open: bool,
    pub(crate) cancel: CancellationToken,
    /// Current receive watchdog; `legacy_timeout` until a PONG negotiates.
    pub(crate) receive_limit: Duration,
    /// Set once the first valid PONG arrives; later PONGs are liveness only.
    pub(crate) heartbeats: bool,
}

impl SessionTask {
    /// Connect/reconnect loop. Runs until cancelled or the entity receiver
    /// goes away.
    pub(crate) async fn run(mut self) {
        loop {
            self.set_state(SessionState::Connecting);
            match self.connect().await {
                Ok(stream) => {
                    match self.run_stream(stream).await {
                        SessionEnd::Cancelled => break,
                        SessionEnd::ChannelClosed => {
                            debug!("entity receiver dropped, shutting down");
                            break;
                        }
                        SessionEnd::PeerClosed => info!("peer closed the connection"),
                        SessionEnd::ReceiveTimeout => {}
                        SessionEnd::Failed(error) => error!(%error, "session error"),
                    }
                    self.set_state(SessionState::Closing);
                }
                Err(error) => warn!(%error, "connection attempt failed"),
            }

            self.set_state(SessionState::Disconnected);
            if self.cancel.is_cancelled() {
                break;
            }
            debug!(
                interval_ms = self.config.reconnect_interval().as_millis() as u64,
                "retrying connection after interval"
            );
            if !self.reconnect_wait().await {
                break;
            }
        }

        self.set_state(SessionState::Disconnected);
    }

    /// Try each resolved address in order.
    async fn connect(&self) -> Result<TcpStream> {
        debug!(server = %self.config.server, port = self.config.port, "connecting to data source");

        let mut last = None;
        for addr in &self.addrs {
            let attempt = TcpStream::connect(addr);
            let result = tokio::select! {
                _ = self.cancel.cancelled() => {
                    Err(std::io::Error::new(std::io::ErrorKind::Interrupted, "cancelled"))
                }
                result = attempt => result,
            };
            match result.and_then(|stream| {
                configure_socket(&stream)?;
                Ok(stream)
            }) {
                Ok(stream) => {
                    info!(peer = %addr, "connected to data source");
                    return Ok(stream);
                }
                Err(source) => last = Some(source),
            }
        }

        Err(AdapterError::Connect {
            server: self.config.server.clone(),
            port: self.config.port,
            source: last.unwrap_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::AddrNotAvailable, "no addresses resolved")
            }),
        })
    }

    /// Drive one connected session until it ends.
    ///
    /// Generic over the transport so the state machine can be exercised
    /// against in-memory streams.
    pub(crate) async fn run_stream<S>(&mut self, io: S) -> SessionEnd
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut framed = Framed::new(io, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let mut heartbeat: Option<Interval> = None;
        self.heartbeats = false;
        self.receive_limit = self.config.legacy_timeout();
        self.set_state(SessionState::Connected { heartbeat: None });

        if let Err(error) = framed.send("* PING").await {
            return SessionEnd::Failed(error.into());
        }

        let mut deadline = Instant::now() + self.receive_limit;
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return SessionEnd::Cancelled,

                _ = time::sleep_until(deadline) => {
                    let error = AdapterError::ReceiveTimeout {
                        limit_ms: self.receive_limit.as_millis() as u64,
                    };
                    warn!(%error, "closing session");
                    return SessionEnd::ReceiveTimeout;
                }

                _ = tick_or_never(&mut heartbeat) => {
                    debug!("sending heartbeat");
                    if let Err(error) = framed.send("* PING").await {
                        return SessionEnd::Failed(error.into());
                    }
                }

                command = self.commands.recv(), if self.commands_open => {
                    match command {
                        Some(command) => {
                            debug!(command, "sending protocol command");
                            if let Err(error) = framed.send(format!("* {command}")).await {
                                return SessionEnd::Failed(error.into());
                            }
                        }
                        None => self.commands_open = false,
                    }
                }

                line = framed.next() => {
                    match line {
                        None => return SessionEnd::PeerClosed,
                        Some(Err(error)) => return SessionEnd::Failed(error.into()),
                        Some(Ok(line)) => {
                            // any received line is a sign of life
                            deadline = Instant::now() + self.receive_limit;
                            if let Err(end) =
                                self.process_line(&line, &mut heartbeat, &mut deadline).await
                            {
                                return end;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Handle one received line: protocol command, or data for the mapper.
    async fn process_line(
        &mut self,
        line: &str,
        heartbeat: &mut Option<Interval>,
        deadline: &mut Instant,
    ) -> std::result::Result<(), SessionEnd> {
        let line = line.trim_end_matches([' ', '\t', '\n', '\r']);
        if line.is_empty() {
            return Ok(());
        }
        trace!(line, "received");

        if line.starts_with('*') {
            if line.starts_with("* PONG") {
                if self.heartbeats {
                    debug!("received pong");
                } else {
                    self.start_heartbeats(line, heartbeat, deadline);
                }
            } else {
                self.handler.on_protocol_command(line);
            }
            return Ok(());
        }

        let tokens = parser::tokenize(line);
        let frame = match parser::extract_timestamp(tokens, Utc::now()) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "dropping frame");
                return Ok(());
            }
        };

        for entity in self.mapper.map_frame(&frame) {
            if self.entities.send(entity).await.is_err() {
                return Err(SessionEnd::ChannelClosed);
            }
        }
        Ok(())
    }

    /// Arm the heartbeat timer from a first `* PONG <ms>` reply.
    fn start_heartbeats(
        &mut self,
        line: &str,
        heartbeat: &mut Option<Interval>,
        deadline: &mut Instant,
    ) {
        match parse_pong_frequency(line) {
            Ok(frequency) => {
                debug!(
                    frequency_ms = frequency.as_millis() as u64,
                    "received pong, starting heartbeats"
                );
                self.heartbeats = true;
                self.receive_limit = frequency * 2;
                *deadline = Instant::now() + self.receive_limit;

                let mut interval = time::interval_at(Instant::now() + frequency, frequency);
                interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
                *heartbeat = Some(interval);

                self.set_state(SessionState::Connected { heartbeat: Some(frequency) });
            }
            Err(error) => error!(%error, "ignoring bad heartbeat"),
        }
    }

    /// Fixed-interval wait between connection attempts. Commands arriving
    /// while disconnected are dropped, matching the wire contract that
    /// egress only happens on a live session. Returns `false` on cancel.
    async fn reconnect_wait(&mut self) -> bool {
        let wait = time::sleep(self.config.reconnect_interval());
        tokio::pin!(wait);
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return false,
                _ = &mut wait => return true,
                command = self.commands.recv(), if self.commands_open => {
                    match command {
                        Some(command) => debug!(command, "not connected, dropping command"),
                        None => self.commands_open = false,
                    }
                }
            }
        }
    }

    fn set_state(&self, state: SessionState) {
        self.state.send_replace(state);
    }
}

/// Await the next heartbeat tick, or forever when heartbeats are off.
async fn tick_or_never(heartbeat: &mut Option<Interval>) {
    match heartbeat {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Parse `* PONG <ms>`: the frequency starts at the first digit after the
/// space and runs while digits last. Accepted window is 1 ms to 30 minutes.
fn parse_pong_frequency(line: &str) -> Result<Duration> {
    let bad = || AdapterError::BadHeartbeat { arg: line.to_string() };

    let rest = line.strip_prefix("* PONG ").ok_or_else(bad)?;
    let first_digit = rest.find(|c: char| c.is_ascii_digit()).ok_or_else(bad)?;
    let digits: String =
        rest[first_digit..].chars().take_while(|c| c.is_ascii_digit()).collect();
    let ms: u64 = digits.parse().map_err(|_| bad())?;

    if (1..MAX_HEARTBEAT_MS).contains(&ms) {
        Ok(Duration::from_millis(ms))
    } else {
        Err(bad())
    }
}

/// Socket options for a freshly connected session: no Nagle delay, no
/// linger, OS keepalive on.
fn configure_socket(stream: &TcpStream) -> std::io::Result<()> {
    stream.set_nodelay(true)?;
    stream.set_linger(None)?;
    socket2::SockRef::from(stream).set_keepalive(true)?;
    Ok(())
}
