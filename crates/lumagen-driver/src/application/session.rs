//! Session: one processor's connection lifecycle and operations.
//!
//! # Structure
//!
//! ```text
//!  Session (handle) ──► Shared ─┬─ Mutex<Inner>   connection, SessionState, epoch
//!                               ├─ watch::Sender  connection-state broadcast
//!                               ├─ CommandTranslator
//!                               ├─ EventNormalizer
//!                               └─ Arc<dyn Transport> / Arc<dyn AttributeSink>
//!
//!  Transport ──TransportEvent──► event pump task ──► normalizer ──► sink
//! ```
//!
//! # Concurrency rules
//!
//! - The state lock is never held across a transport call.
//! - Every transition into `Connected` or out of it bumps `epoch`.  A send
//!   that started in one epoch and finished in another is reported as
//!   [`SessionError::NotConnected`], whatever the transport said.
//! - A second `connect()` while one is in flight waits for it instead of
//!   opening the transport again.
//! - The event pump holds only a `Weak` reference, so dropping the last
//!   [`Session`] stops it.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use lumagen_core::{
    AttributeDelta, CommandError, CommandRegistry, ConnectionState, DeviceInfo, LinkState,
    Operation, PowerState, StatusCode, TransportEvent,
};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::application::normalizer::{EventNormalizer, SessionState};
use crate::application::translator::{CommandRequest, CommandTranslator};
use crate::infrastructure::publish::AttributeSink;
use crate::infrastructure::storage::config::DriverSettings;
use crate::infrastructure::transport::{EventReceiver, Transport, TransportError};

/// Timing knobs for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Upper bound on opening the transport.
    pub connect_timeout: Duration,
    /// Pause between connecting and the initial label refresh.
    pub settle_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_secs(1),
        }
    }
}

impl From<&DriverSettings> for SessionSettings {
    fn from(settings: &DriverSettings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout(),
            settle_delay: settings.settle_delay(),
        }
    }
}

/// Errors returned by session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The operation needs a live connection.
    #[error("not connected")]
    NotConnected,

    /// Opening the transport took longer than the connect timeout.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// Opening the transport failed or was aborted.
    #[error("connect failed: {reason}")]
    ConnectFailed {
        reason: String,
        #[source]
        source: Option<TransportError>,
    },

    /// The command could not be translated.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// The transport refused or failed to deliver the operation.
    #[error("sending {operation} failed: {source}")]
    Send {
        operation: String,
        #[source]
        source: TransportError,
    },
}

impl SessionError {
    fn connect_failed(reason: impl Into<String>) -> Self {
        SessionError::ConnectFailed {
            reason: reason.into(),
            source: None,
        }
    }

    /// Status reported back to whoever asked for the operation.
    pub fn status_code(&self) -> StatusCode {
        match self {
            SessionError::NotConnected | SessionError::ConnectTimeout(_) | SessionError::ConnectFailed { .. } => {
                StatusCode::ServiceUnavailable
            }
            SessionError::Command(CommandError::NotFound(_)) => StatusCode::NotFound,
            SessionError::Command(CommandError::InvalidArgument { .. }) => StatusCode::BadRequest,
            SessionError::Command(CommandError::Unsupported(_)) => StatusCode::NotImplemented,
            SessionError::Send { .. } => StatusCode::BadRequest,
        }
    }
}

/// Point-in-time copy of a session's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub connection: ConnectionState,
    pub state: SessionState,
}

struct Inner {
    connection: ConnectionState,
    state: SessionState,
    /// Bumped on every transition into or out of `Connected`.
    epoch: u64,
    /// Bumped on every connect attempt.
    attempt: u64,
    /// Link-up events still owed by successful or in-flight opens.  While
    /// non-zero, queued link events belong to an earlier link.
    pending_link_ups: u32,
    link_lost_while_connecting: bool,
}

struct Shared {
    info: DeviceInfo,
    transport: Arc<dyn Transport>,
    sink: Arc<dyn AttributeSink>,
    translator: CommandTranslator,
    normalizer: EventNormalizer,
    settings: SessionSettings,
    inner: Mutex<Inner>,
    connection_tx: watch::Sender<ConnectionState>,
    pump: StdMutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Control session for one processor.
pub struct Session {
    shared: Arc<Shared>,
}

impl Session {
    pub fn new(
        info: &DeviceInfo,
        transport: Arc<dyn Transport>,
        registry: Arc<CommandRegistry>,
        sink: Arc<dyn AttributeSink>,
        settings: SessionSettings,
    ) -> Self {
        let translator = CommandTranslator::new(registry, &transport.capabilities(), &info.id);
        let (connection_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                info: info.clone(),
                transport,
                sink,
                translator,
                normalizer: EventNormalizer::new(info.id.clone()),
                settings,
                inner: Mutex::new(Inner {
                    connection: ConnectionState::Disconnected,
                    state: SessionState::default(),
                    epoch: 0,
                    attempt: 0,
                    pending_link_ups: 0,
                    link_lost_while_connecting: false,
                }),
                connection_tx,
                pump: StdMutex::new(None),
            }),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.shared.info.id
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.shared.info
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.shared.connection_tx.borrow()
    }

    /// Receiver that observes every connection-state change.
    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.shared.connection_tx.subscribe()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let inner = self.shared.inner.lock().await;
        SessionSnapshot {
            connection: inner.connection,
            state: inner.state.clone(),
        }
    }

    pub async fn is_alive(&self) -> bool {
        self.shared.inner.lock().await.state.alive
    }

    pub async fn power_state(&self) -> PowerState {
        self.shared.inner.lock().await.state.power
    }

    pub async fn source_list(&self) -> Vec<String> {
        self.shared.inner.lock().await.state.source_list.clone()
    }

    pub async fn active_source(&self) -> Option<String> {
        self.shared.inner.lock().await.state.active_source.clone()
    }

    /// Display names of every catalog command, for remote UIs.
    pub fn simple_commands(&self) -> Vec<String> {
        self.shared.translator.registry().display_names()
    }

    /// Returns `true` if `id` names a catalog command.
    pub fn knows_command(&self, id: &str) -> bool {
        self.shared.translator.registry().resolve(id).is_ok()
    }

    /// Full attribute set for entities registered after the fact.
    pub async fn initial_attributes(&self) -> AttributeDelta {
        let inner = self.shared.inner.lock().await;
        self.shared
            .normalizer
            .initial_attributes(&inner.state, inner.connection.is_connected())
    }

    /// Publishes [`Session::initial_attributes`] to the sink.
    pub async fn publish_initial_attributes(&self) {
        let delta = self.initial_attributes().await;
        self.shared.sink.publish(&delta);
    }

    // ── Connection lifecycle ──────────────────────────────────────────────────

    /// Opens the transport.
    ///
    /// Returns immediately when already connected.  While another connect
    /// is in flight this waits for its outcome instead of opening again.
    ///
    /// # Errors
    ///
    /// - [`SessionError::ConnectTimeout`] if the open exceeds the timeout.
    /// - [`SessionError::ConnectFailed`] if the open failed, the link
    ///   dropped while connecting, a disconnect aborted the attempt, or a
    ///   disconnect is in progress.
    pub async fn connect(&self) -> Result<(), SessionError> {
        self.ensure_event_pump();
        let shared = &self.shared;

        let attempt = {
            let mut inner = shared.inner.lock().await;
            match inner.connection {
                ConnectionState::Connected => {
                    debug!(device = %shared.info.id, "already connected");
                    return Ok(());
                }
                ConnectionState::Disconnecting => {
                    return Err(SessionError::connect_failed("disconnect in progress"));
                }
                ConnectionState::Connecting => None,
                ConnectionState::Disconnected => {
                    inner.attempt += 1;
                    inner.pending_link_ups += 1;
                    inner.link_lost_while_connecting = false;
                    shared.set_connection(&mut inner, ConnectionState::Connecting);
                    Some(inner.attempt)
                }
            }
        };
        let Some(attempt) = attempt else {
            return self.wait_for_pending_connect().await;
        };

        let (host, port) = (shared.info.address.as_str(), shared.info.port);
        info!(device = %shared.info.id, "connecting to {host}:{port}");
        let timeout = shared.settings.connect_timeout;
        let opened = tokio::time::timeout(timeout, shared.transport.open(host, port)).await;

        let mut inner = shared.inner.lock().await;
        if !matches!(opened, Ok(Ok(()))) {
            inner.pending_link_ups = inner.pending_link_ups.saturating_sub(1);
        }
        if inner.connection != ConnectionState::Connecting || inner.attempt != attempt {
            warn!(device = %shared.info.id, "connect to {host}:{port} aborted by disconnect");
            if matches!(opened, Ok(Ok(()))) {
                shared.close_aborted_link(inner).await;
            }
            return Err(SessionError::connect_failed("aborted by disconnect"));
        }

        let result = match opened {
            Ok(Ok(())) if inner.link_lost_while_connecting => {
                Err(SessionError::connect_failed("link dropped while connecting"))
            }
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(SessionError::ConnectFailed {
                reason: format!("cannot open {host}:{port}"),
                source: Some(e),
            }),
            Err(_) => Err(SessionError::ConnectTimeout(timeout)),
        };

        match &result {
            Ok(()) => {
                shared.set_connection(&mut inner, ConnectionState::Connected);
                inner.epoch += 1;
                let epoch = inner.epoch;
                drop(inner);
                info!(device = %shared.info.id, "connected to {host}:{port}");
                self.schedule_label_refresh(epoch);
            }
            Err(e) => {
                // Connecting until closed: a concurrent connect must not
                // open a link this close would tear down.
                drop(inner);
                error!(device = %shared.info.id, "failed to connect: {e}");
                shared.close_quietly().await;
                let mut inner = shared.inner.lock().await;
                if inner.connection == ConnectionState::Connecting && inner.attempt == attempt {
                    shared.set_connection(&mut inner, ConnectionState::Disconnected);
                }
            }
        }
        result
    }

    async fn wait_for_pending_connect(&self) -> Result<(), SessionError> {
        let timeout = self.shared.settings.connect_timeout;
        let mut rx = self.shared.connection_tx.subscribe();
        debug!(device = %self.shared.info.id, "connect already in progress; waiting");

        let outcome = tokio::time::timeout(timeout, rx.wait_for(|s| *s != ConnectionState::Connecting)).await;
        match outcome {
            Ok(Ok(state)) if state.is_connected() => Ok(()),
            Ok(_) => Err(SessionError::connect_failed("concurrent connect did not succeed")),
            Err(_) => Err(SessionError::ConnectTimeout(timeout)),
        }
    }

    /// Closes the transport.  A no-op when already disconnected or
    /// disconnecting.
    pub async fn disconnect(&self) {
        let shared = &self.shared;
        {
            let mut inner = shared.inner.lock().await;
            match inner.connection {
                ConnectionState::Disconnected | ConnectionState::Disconnecting => {
                    debug!(device = %shared.info.id, "disconnect ignored: already {}", inner.connection);
                    return;
                }
                ConnectionState::Connected | ConnectionState::Connecting => {
                    shared.set_connection(&mut inner, ConnectionState::Disconnecting);
                    inner.epoch += 1;
                }
            }
        }

        info!(device = %shared.info.id, "disconnecting from {}:{}", shared.info.address, shared.info.port);
        shared.close_quietly().await;

        let delta = {
            let mut inner = shared.inner.lock().await;
            shared.set_connection(&mut inner, ConnectionState::Disconnected);
            shared.normalizer.link_lost(&mut inner.state)
        };
        shared.sink.publish(&delta);
    }

    /// Waits up to `timeout` for the session to be connected.
    pub async fn wait_until_connected(&self, timeout: Duration) -> bool {
        let mut rx = self.subscribe_connection();
        let reached = matches!(
            tokio::time::timeout(timeout, rx.wait_for(|s| s.is_connected())).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Connects, waits `wait` for the device to report liveness, and
    /// disconnects again.
    ///
    /// # Errors
    ///
    /// Propagates the connect error.
    pub async fn probe_alive(&self, wait: Duration) -> Result<bool, SessionError> {
        self.connect().await?;
        tokio::time::sleep(wait).await;
        let alive = self.is_alive().await;
        self.disconnect().await;
        Ok(alive)
    }

    /// Asks the connected device for its identity.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotConnected`] when not connected, or
    /// [`SessionError::Send`] if the query fails.
    pub async fn query_info(&self) -> Result<DeviceInfo, SessionError> {
        self.shared.require_connected().await?;
        let identity = self
            .shared
            .transport
            .query_identity()
            .await
            .map_err(|source| SessionError::Send {
                operation: "query_identity".to_string(),
                source,
            })?;
        Ok(DeviceInfo::from_identity(&identity, self.shared.info.address.clone(), self.shared.info.port))
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Powers the device on unless it already reports Active.
    pub async fn power_on(&self) -> Result<(), SessionError> {
        let power = self.shared.require_connected().await?;
        if power == PowerState::Active {
            debug!(device = %self.shared.info.id, "power on skipped: device is {power}");
            return Ok(());
        }
        self.shared.run(CommandRequest::PowerOn).await
    }

    /// Puts the device in standby unless it already reports Standby.
    pub async fn power_off(&self) -> Result<(), SessionError> {
        let power = self.shared.require_connected().await?;
        if power == PowerState::Standby {
            debug!(device = %self.shared.info.id, "power off skipped: device is {power}");
            return Ok(());
        }
        self.shared.run(CommandRequest::Standby).await
    }

    /// Standby when Active, power on otherwise.
    pub async fn power_toggle(&self) -> Result<(), SessionError> {
        let power = self.shared.require_connected().await?;
        let request = if power == PowerState::Active {
            CommandRequest::Standby
        } else {
            CommandRequest::PowerOn
        };
        self.shared.run(request).await
    }

    /// Selects an input by label.  `None` re-selects the active source.
    ///
    /// The active source itself changes only when the device confirms with
    /// a `physical_input_selected` notification.
    pub async fn select_source(&self, source: Option<&str>) -> Result<(), SessionError> {
        self.shared
            .run(CommandRequest::SelectSource(source.map(str::to_string)))
            .await
    }

    /// Sends a catalog command by token, enumerated name, or display name.
    pub async fn send_command(&self, id: &str, param: Option<String>) -> Result<(), SessionError> {
        self.shared
            .run(CommandRequest::Simple {
                id: id.to_string(),
                param,
            })
            .await
    }

    /// Asks the device to re-send its input labels.
    pub async fn refresh_labels(&self) -> Result<(), SessionError> {
        self.shared.run(CommandRequest::RefreshLabels).await
    }

    // ── Background tasks ──────────────────────────────────────────────────────

    fn ensure_event_pump(&self) {
        let mut pump = lock(&self.shared.pump);
        if pump.is_some() {
            return;
        }
        let Some(rx) = self.shared.transport.take_events() else {
            warn!(device = %self.shared.info.id, "transport notifications unavailable");
            return;
        };
        *pump = Some(tokio::spawn(run_event_pump(Arc::downgrade(&self.shared), rx)));
    }

    fn schedule_label_refresh(&self, epoch: u64) {
        let shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            tokio::time::sleep(shared.settings.settle_delay).await;
            if shared.inner.lock().await.epoch != epoch {
                debug!(device = %shared.info.id, "label refresh skipped: connection changed");
                return;
            }
            debug!(device = %shared.info.id, "fetching input labels");
            if let Err(e) = shared.run(CommandRequest::RefreshLabels).await {
                warn!(device = %shared.info.id, "initial label refresh failed: {e}");
            }
        });
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Some(pump) = lock(&self.shared.pump).take() {
            pump.abort();
        }
    }
}

impl Shared {
    fn set_connection(&self, inner: &mut Inner, next: ConnectionState) {
        let current = inner.connection;
        if current == next {
            return;
        }
        if !current.can_transition_to(next) {
            warn!(device = %self.info.id, "ignoring invalid transition {current} -> {next}");
            return;
        }
        debug!(device = %self.info.id, "connection {current} -> {next}");
        inner.connection = next;
        self.connection_tx.send_replace(next);
    }

    /// Current power state, or `NotConnected`.
    async fn require_connected(&self) -> Result<PowerState, SessionError> {
        let inner = self.inner.lock().await;
        if !inner.connection.is_connected() {
            error!(device = %self.info.id, "connection not established");
            return Err(SessionError::NotConnected);
        }
        Ok(inner.state.power)
    }

    /// Closes a link whose connect was aborted by `disconnect()`.
    ///
    /// A newer attempt that is Connecting or Connected owns the transport
    /// and is left alone.  When the session is already Disconnected the
    /// close runs under a fresh Connecting attempt, so a concurrent
    /// `connect()` waits for it rather than racing it.
    async fn close_aborted_link(&self, mut inner: tokio::sync::MutexGuard<'_, Inner>) {
        match inner.connection {
            ConnectionState::Connecting | ConnectionState::Connected => {
                debug!(device = %self.info.id, "newer connect owns the transport; not closing");
            }
            ConnectionState::Disconnecting => {
                drop(inner);
                self.close_quietly().await;
            }
            ConnectionState::Disconnected => {
                inner.attempt += 1;
                let cleanup = inner.attempt;
                self.set_connection(&mut inner, ConnectionState::Connecting);
                drop(inner);
                self.close_quietly().await;
                let mut inner = self.inner.lock().await;
                if inner.connection == ConnectionState::Connecting && inner.attempt == cleanup {
                    self.set_connection(&mut inner, ConnectionState::Disconnected);
                }
            }
        }
    }

    async fn close_quietly(&self) {
        if let Err(e) = self.transport.close().await {
            warn!(device = %self.info.id, "closing transport failed: {e}");
        }
    }

    async fn run(&self, request: CommandRequest) -> Result<(), SessionError> {
        let op = {
            let inner = self.inner.lock().await;
            self.translator.translate(&request, &inner.state)?
        };
        self.execute(op).await
    }

    async fn execute(&self, op: Operation) -> Result<(), SessionError> {
        let epoch = {
            let inner = self.inner.lock().await;
            if !inner.connection.is_connected() {
                error!(device = %self.info.id, "cannot send {op}: connection not established");
                return Err(SessionError::NotConnected);
            }
            inner.epoch
        };

        let sent = self.transport.send(&op).await;

        {
            let inner = self.inner.lock().await;
            if inner.epoch != epoch || !inner.connection.is_connected() {
                debug!(device = %self.info.id, "discarding result of {op}: disconnected while sending");
                return Err(SessionError::NotConnected);
            }
        }
        match sent {
            Ok(()) => {
                debug!(device = %self.info.id, "sent {op}");
                Ok(())
            }
            Err(source) => {
                error!(device = %self.info.id, "error executing {op}: {source}");
                Err(SessionError::Send {
                    operation: op.to_string(),
                    source,
                })
            }
        }
    }

    async fn handle_event(&self, event: TransportEvent) {
        let delta = {
            let mut inner = self.inner.lock().await;
            match event {
                TransportEvent::Link(LinkState::Connected) => {
                    debug!(device = %self.info.id, "transport reports link up");
                    inner.pending_link_ups = inner.pending_link_ups.saturating_sub(1);
                    None
                }
                TransportEvent::Link(LinkState::Disconnected) => self.link_down(&mut inner),
                TransportEvent::Field { name, value } => {
                    let accepting = inner.pending_link_ups == 0
                        && matches!(inner.connection, ConnectionState::Connected | ConnectionState::Connecting);
                    if !accepting {
                        debug!(device = %self.info.id, "dropping {name} notification while {}", inner.connection);
                        return;
                    }
                    self.normalizer.apply(&mut inner.state, &name, &value)
                }
            }
        };
        if let Some(delta) = delta.filter(|d| !d.is_empty()) {
            self.sink.publish(&delta);
        }
    }

    fn link_down(&self, inner: &mut Inner) -> Option<AttributeDelta> {
        if inner.pending_link_ups > 0 {
            debug!(device = %self.info.id, "ignoring link-down from previous link");
            return None;
        }
        match inner.connection {
            ConnectionState::Connected => {
                warn!(device = %self.info.id, "link to {}:{} dropped", self.info.address, self.info.port);
                self.set_connection(inner, ConnectionState::Disconnected);
                inner.epoch += 1;
                Some(self.normalizer.link_lost(&mut inner.state))
            }
            ConnectionState::Connecting => {
                inner.link_lost_while_connecting = true;
                None
            }
            ConnectionState::Disconnected | ConnectionState::Disconnecting => None,
        }
    }
}

async fn run_event_pump(shared: Weak<Shared>, mut rx: EventReceiver) {
    while let Some(event) = rx.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.handle_event(event).await;
    }
    debug!("event pump stopped");
}

// ── Tests ─────────────────────────────────────────────────────────────────────
