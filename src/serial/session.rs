//! # Receiver Session
//!
//! Owns the receiver connection and drives frames from the port into the
//! [`SensorStore`].
//!
//! ```text
//! Disconnected ──> Connecting ──> Connected ──stop()──> Stopped
//!                      ▲               │
//!                      │        transport failure
//!                      │               ▼
//!                      └──delay── ReconnectWait ──budget spent──> Failed
//! ```
//!
//! Transport failures are counted for the lifetime of the session; a
//! successful connection does not reset the count. Once the count exceeds
//! `max_attempts` the session fails with `PermanentFailure`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::port_trait::{BoxedPort, PortConnector};
use crate::config::SerialConfig;
use crate::error::{ReceiverError, Result};
use crate::frame::decoder::decode_packet;
use crate::frame::protocol::Frame;
use crate::frame::sync::FrameSynchronizer;
use crate::telemetry::store::SensorStore;

/// Connection lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    /// Waiting before reconnect attempt `attempt` (1-based)
    ReconnectWait { attempt: u32 },
    /// Reconnect budget spent
    Failed,
    /// Stopped on request
    Stopped,
}

impl SessionState {
    /// True once the session will not do anything further
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Failed | Self::Stopped)
    }
}

/// Notable things that happened on the link, for observers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Receiver comment line
    Comment(String),
    /// Packet decoded, logged and buffered
    PacketStored { sensor_id: u32, packet_id: u32 },
    /// Frame could not be decoded; reading continues
    MalformedPacket(String),
    /// Packet decoded but dropped because the CSV write failed
    LogWriteFailed(String),
}

/// Fixed-delay reconnect budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

impl From<&SerialConfig> for ReconnectPolicy {
    fn from(config: &SerialConfig) -> Self {
        Self {
            delay: config.reconnect_delay(),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

/// Receive loop bound to one connector and one store
pub struct Session<C> {
    connector: C,
    store: Arc<SensorStore>,
    policy: ReconnectPolicy,
    state: watch::Sender<SessionState>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
    cancel: CancellationToken,
    failures: u32,
}

impl<C: PortConnector> Session<C> {
    /// Create a disconnected session
    pub fn new(connector: C, store: Arc<SensorStore>, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(SessionState::Disconnected);
        Self {
            connector,
            store,
            policy,
            state,
            events: None,
            cancel: CancellationToken::new(),
            failures: 0,
        }
    }

    /// Report link events to `events`
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Token that stops this session when cancelled
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run until stopped or the reconnect budget is spent
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Stopped on request
    ///
    /// # Errors
    ///
    /// Returns `PermanentFailure` once transport failures exceed the budget
    pub async fn run(mut self) -> Result<()> {
        let result = self.drive().await;
        match &result {
            Ok(()) => self.set_state(SessionState::Stopped),
            Err(e) => {
                error!("Receiver session on {} gave up: {}", self.connector.describe(), e);
                self.set_state(SessionState::Failed);
            }
        }
        result
    }

    async fn drive(&mut self) -> Result<()> {
        loop {
            self.set_state(SessionState::Connecting);

            let connected = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                port = self.connector.connect() => port,
            };

            let failure = match connected {
                Ok(port) => {
                    info!("Connected to receiver on {}", self.connector.describe());
                    self.set_state(SessionState::Connected);
                    match self.receive(port).await {
                        Ok(()) => return Ok(()),
                        Err(e) => e,
                    }
                }
                Err(e) => e,
            };

            self.failures += 1;
            if self.failures > self.policy.max_attempts {
                return Err(ReceiverError::PermanentFailure {
                    attempts: self.failures,
                });
            }

            warn!(
                "Transport failure on {}: {} (reconnect {}/{} in {:?})",
                self.connector.describe(),
                failure,
                self.failures,
                self.policy.max_attempts,
                self.policy.delay
            );
            self.set_state(SessionState::ReconnectWait {
                attempt: self.failures,
            });

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.policy.delay) => {}
            }
        }
    }

    /// Read frames until the port fails (`Err`) or a stop is requested (`Ok`)
    ///
    /// The port is dropped, and so released, when this returns.
    async fn receive(&self, port: BoxedPort) -> Result<()> {
        let mut frames = FrameSynchronizer::new(port);
        let result = self.pump(&mut frames).await;
        debug!(
            "Discarded {} bytes outside frames on {}",
            frames.discarded_bytes(),
            self.connector.describe()
        );
        result
    }

    async fn pump(&self, frames: &mut FrameSynchronizer<BoxedPort>) -> Result<()> {
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!("Stop requested, releasing {}", self.connector.describe());
                    return Ok(());
                }
                frame = frames.next_frame() => frame,
            };

            match frame {
                Ok(Frame::Comment(text)) => {
                    info!("Receiver: {}", text);
                    self.emit(SessionEvent::Comment(text));
                }
                Ok(Frame::Packet(payload)) => self.handle_payload(&payload),
                Err(e) if e.is_transport() => return Err(e),
                Err(e) => {
                    warn!("Dropping frame: {}", e);
                    self.emit(SessionEvent::MalformedPacket(e.to_string()));
                }
            }
        }
    }

    fn handle_payload(&self, payload: &[u8]) {
        let packet = match decode_packet(payload) {
            Ok(packet) => packet,
            Err(e) => {
                warn!("Dropping malformed packet: {}", e);
                self.emit(SessionEvent::MalformedPacket(e.to_string()));
                return;
            }
        };

        let (sensor_id, packet_id) = (packet.sensor_id, packet.packet_id);
        match self.store.append(packet) {
            Ok(()) => {
                debug!("Stored packet {} from sensor {:x}", packet_id, sensor_id);
                self.emit(SessionEvent::PacketStored { sensor_id, packet_id });
            }
            Err(e) => {
                warn!("Dropping packet {} from sensor {:x}: {}", packet_id, sensor_id, e);
                self.emit(SessionEvent::LogWriteFailed(e.to_string()));
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            // Observer may have gone away; the session keeps running
            let _ = events.send(event);
        }
    }

    fn set_state(&self, state: SessionState) {
        debug!("Session state -> {:?}", state);
        self.state.send_replace(state);
    }
}

impl<C: PortConnector + 'static> Session<C> {
    /// Run the session on its own task
    pub fn spawn(self) -> SessionHandle {
        let cancel = self.stop_token();
        let state = self.subscribe();
        let task = tokio::spawn(self.run());
        SessionHandle { cancel, state, task }
    }
}

/// Control handle for a spawned session
#[derive(Debug)]
pub struct SessionHandle {
    cancel: CancellationToken,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<Result<()>>,
}

impl SessionHandle {
    /// Request a stop; any pending connect, read or backoff wait is interrupted
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Receiver for awaiting state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    /// Wait for the session to end
    ///
    /// # Errors
    ///
    /// Returns `PermanentFailure` if the session gave up, or `Io` if the
    /// worker task panicked
    pub async fn join(self) -> Result<()> {
        self.task
            .await
            .map_err(|e| ReceiverError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
    }
}
