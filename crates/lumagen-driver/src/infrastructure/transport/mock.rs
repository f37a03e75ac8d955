//! In-tree transport for tests and for running the driver without hardware.
//!
//! [`MockTransport`] records every call and lets tests inject notifications,
//! make `open` fail or hang, fail or delay sends, delay closes, and restrict
//! the declared capability set.  Built with [`MockTransport::simulated`] it also behaves
//! like a processor: it answers power, input-select and label requests with
//! the notifications a real device would push back.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use lumagen_core::{
    CommandRegistry, DeviceIdentity, LinkState, Operation, OperationArgs, Param, PowerState,
    RawValue, TransportEvent,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{EventReceiver, Transport, TransportError};

/// What [`MockTransport::open`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenBehavior {
    #[default]
    Succeed,
    /// Fails immediately with a refused connection.
    Fail,
    /// Never completes; the caller's timeout decides.
    Hang,
    /// Succeeds after the given delay.
    Slow(Duration),
}

#[derive(Debug, Clone)]
struct SimulatedDevice {
    power: PowerState,
    labels: Vec<String>,
}

/// Recording transport with an optional simulated processor behind it.
pub struct MockTransport {
    identity: DeviceIdentity,
    events_tx: mpsc::UnboundedSender<TransportEvent>,
    events_rx: Mutex<Option<EventReceiver>>,
    open_behavior: Mutex<OpenBehavior>,
    capabilities: Mutex<Vec<String>>,
    sent: Mutex<Vec<Operation>>,
    send_delay: Mutex<Duration>,
    close_delay: Mutex<Duration>,
    open_calls: AtomicUsize,
    close_calls: AtomicUsize,
    send_calls: AtomicUsize,
    is_open: AtomicBool,
    fail_sends: AtomicBool,
    device: Option<Mutex<SimulatedDevice>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Identity reported by default: a RadiancePro, serial 9022.
pub fn default_identity() -> DeviceIdentity {
    DeviceIdentity {
        model_name: "RadiancePro".to_string(),
        model_number: "1018".to_string(),
        serial_number: 9022,
        software_revision: "090524".to_string(),
    }
}

impl MockTransport {
    /// A responsive transport that opens successfully and declares every
    /// operation of the standard registry.  It does not answer commands.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let capabilities = CommandRegistry::standard()
            .operation_names()
            .map(str::to_string)
            .collect();
        Self {
            identity: default_identity(),
            events_tx: tx,
            events_rx: Mutex::new(Some(rx)),
            open_behavior: Mutex::new(OpenBehavior::Succeed),
            capabilities: Mutex::new(capabilities),
            sent: Mutex::new(Vec::new()),
            send_delay: Mutex::new(Duration::ZERO),
            close_delay: Mutex::new(Duration::ZERO),
            open_calls: AtomicUsize::new(0),
            close_calls: AtomicUsize::new(0),
            send_calls: AtomicUsize::new(0),
            is_open: AtomicBool::new(false),
            fail_sends: AtomicBool::new(false),
            device: None,
        }
    }

    /// A transport backed by a simulated processor that starts in standby
    /// with the given input labels.
    pub fn simulated(labels: Vec<String>) -> Self {
        Self {
            device: Some(Mutex::new(SimulatedDevice {
                power: PowerState::Standby,
                labels,
            })),
            ..Self::new()
        }
    }

    /// Replaces the identity answered by [`Transport::query_identity`].
    pub fn with_identity(mut self, identity: DeviceIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn set_open_behavior(&self, behavior: OpenBehavior) {
        *lock(&self.open_behavior) = behavior;
    }

    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    /// Delays every send by `delay` after the link check.
    pub fn set_send_delay(&self, delay: Duration) {
        *lock(&self.send_delay) = delay;
    }

    /// Delays every close by `delay` before the link goes down.
    pub fn set_close_delay(&self, delay: Duration) {
        *lock(&self.close_delay) = delay;
    }

    pub fn set_capabilities(&self, capabilities: Vec<String>) {
        *lock(&self.capabilities) = capabilities;
    }

    /// Pushes a notification as if the device had raised it.
    pub fn inject(&self, event: TransportEvent) {
        self.emit(event);
    }

    /// Simulates the remote end dropping the link.
    pub fn drop_link(&self) {
        self.is_open.store(false, Ordering::SeqCst);
        self.emit(TransportEvent::Link(LinkState::Disconnected));
    }

    /// Operations delivered successfully, in order.
    pub fn sent(&self) -> Vec<Operation> {
        lock(&self.sent).clone()
    }

    /// Number of `send` calls, including failed ones.
    pub fn send_calls(&self) -> usize {
        self.send_calls.load(Ordering::SeqCst)
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }

    pub fn is_open(&self) -> bool {
        self.is_open.load(Ordering::SeqCst)
    }

    fn emit(&self, event: TransportEvent) {
        if self.events_tx.send(event).is_err() {
            debug!("notification dropped: no consumer");
        }
    }

    /// Pushes the notifications a processor would answer `op` with.
    fn answer(&self, op: &Operation) {
        let Some(device) = &self.device else {
            return;
        };
        let mut device = lock(device);
        match op.name.as_str() {
            "power_on" => device.power = PowerState::Active,
            "standby" | "power_off" => device.power = PowerState::Standby,
            "toggle" => {
                device.power = if device.power.is_on() {
                    PowerState::Standby
                } else {
                    PowerState::Active
                }
            }
            "select_input" => {
                if let OperationArgs::Single(Param::Int(index)) = op.args {
                    if (0..device.labels.len() as i64).contains(&index) {
                        self.emit(TransportEvent::field("physical_input_selected", index + 1));
                    }
                }
                return;
            }
            "get_labels" => {
                self.emit(TransportEvent::field("input_labels", device.labels.clone()));
                return;
            }
            _ => return,
        }
        self.emit(TransportEvent::field("device_status", device.power.as_str()));
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self, host: &str, port: u16) -> Result<(), TransportError> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *lock(&self.open_behavior);
        match behavior {
            OpenBehavior::Succeed => {}
            OpenBehavior::Fail => {
                return Err(TransportError::Io {
                    addr: format!("{host}:{port}"),
                    source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
                })
            }
            OpenBehavior::Hang => std::future::pending::<()>().await,
            OpenBehavior::Slow(delay) => tokio::time::sleep(delay).await,
        }

        self.is_open.store(true, Ordering::SeqCst);
        self.emit(TransportEvent::Link(LinkState::Connected));
        if let Some(device) = &self.device {
            let power = lock(device).power;
            self.emit(TransportEvent::field("is_alive", RawValue::Integer(1)));
            self.emit(TransportEvent::field("device_status", power.as_str()));
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *lock(&self.close_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.is_open.swap(false, Ordering::SeqCst) {
            self.emit(TransportEvent::Link(LinkState::Disconnected));
        }
        Ok(())
    }

    async fn send(&self, operation: &Operation) -> Result<(), TransportError> {
        self.send_calls.fetch_add(1, Ordering::SeqCst);
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        let delay = *lock(&self.send_delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(TransportError::Rejected(operation.to_string()));
        }
        if !lock(&self.capabilities).iter().any(|c| *c == operation.name) {
            return Err(TransportError::Rejected(operation.to_string()));
        }

        lock(&self.sent).push(operation.clone());
        self.answer(operation);
        Ok(())
    }

    async fn query_identity(&self) -> Result<DeviceIdentity, TransportError> {
        if !self.is_open() {
            return Err(TransportError::Closed);
        }
        Ok(self.identity.clone())
    }

    fn capabilities(&self) -> Vec<String> {
        lock(&self.capabilities).clone()
    }

    fn take_events(&self) -> Option<EventReceiver> {
        let rx = lock(&self.events_rx).take();
        if rx.is_none() {
            warn!("notification receiver already taken");
        }
        rx
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
