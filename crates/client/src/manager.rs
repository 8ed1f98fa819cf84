use crate::backoff::ReconnectPolicy;
use crate::config::ClientConfig;
use crate::errors::{ClientError, ErrorCategory};
use crate::metrics::ClientMetrics;
use crate::observer::{ConnectionObserver, DisconnectReason};
use crate::pending::PendingSlot;
use crate::state::{ConnectionState, ConnectionStatus};
use crate::transport::{Connector, WsConnector};
use parking_lot::Mutex;
use schema::{DetectionConfig, DetectionRequest, DetectionResponse, ImageData, RequestMode};
use serde_json::Value;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

/// One logical connection to the detection service.
///
/// Cloning yields another handle to the same connection. At most one
/// request is in flight at a time; a second [`send_image`](Self::send_image)
/// while one is outstanding fails with [`ClientError::Busy`].
pub struct ConnectionManager<C: Connector = WsConnector> {
    inner: Arc<Inner<C>>,
}

impl<C: Connector> Clone for ConnectionManager<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<C> {
    config: ClientConfig,
    policy: ReconnectPolicy,
    connector: C,
    observer: Arc<dyn ConnectionObserver>,
    status_tx: watch::Sender<ConnectionStatus>,
    shared: Mutex<Shared>,
    metrics: ClientMetrics,
}

struct Session {
    id: u64,
    outbound: mpsc::Sender<String>,
    reader: JoinHandle<()>,
}

#[derive(Default)]
struct Shared {
    state: ConnectionState,
    session: Option<Session>,
    /// Bumped by `connect()` and `disconnect()` so timers and opens started
    /// before them become no-ops.
    generation: u64,
    next_session_id: u64,
    attempt_in_flight: bool,
    reconnect_attempts: u32,
    reconnect_task: Option<JoinHandle<()>>,
    pending: PendingSlot,
}

/// Observer calls collected under the lock and delivered after it.
enum Event {
    Status(ConnectionStatus),
    Connected,
    Disconnected(DisconnectReason),
    Error(ClientError, ErrorCategory),
    Message(Value),
    Reconnecting(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Explicit,
    Reconnect,
}

impl ConnectionManager<WsConnector> {
    /// Manager over a real WebSocket.
    ///
    /// With `auto_connect` set, a connect is spawned on the current Tokio
    /// runtime right away.
    pub fn init(config: ClientConfig, observer: Arc<dyn ConnectionObserver>) -> Self {
        Self::with_connector(config, WsConnector, observer)
    }
}

impl<C: Connector> ConnectionManager<C> {
    pub fn with_connector(
        config: ClientConfig,
        connector: C,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::new(
            ConnectionState::Disconnected,
            "Not connected",
        ));

        let manager = Self {
            inner: Arc::new(Inner {
                policy: config.reconnect_policy(),
                config,
                connector,
                observer,
                status_tx,
                shared: Mutex::new(Shared::default()),
                metrics: ClientMetrics::new(),
            }),
        };

        if manager.inner.config.auto_connect {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let auto = manager.clone();
                    handle.spawn(async move {
                        if let Err(e) = auto.connect().await {
                            warn!(error = %e, "Automatic connect failed");
                        }
                    });
                }
                Err(_) => warn!("auto_connect requested outside a Tokio runtime, skipping"),
            }
        }

        manager
    }

    /// Open the connection.
    ///
    /// Returns immediately when already connected. Fails with
    /// [`ClientError::ConnectInProgress`] while another attempt is running.
    /// A failed explicit connect is not retried automatically.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let mut events = Vec::new();
        let generation = {
            let mut shared = self.inner.shared.lock();
            if shared.session.is_some() && shared.state == ConnectionState::Connected {
                return Ok(());
            }
            if shared.attempt_in_flight {
                return Err(ClientError::ConnectInProgress);
            }

            if let Some(task) = shared.reconnect_task.take() {
                task.abort();
            }
            shared.generation += 1;
            shared.reconnect_attempts = 0;
            shared.attempt_in_flight = true;

            let detail = format!("Connecting to {}", self.inner.config.server_url);
            events.push(
                self.inner
                    .set_state(&mut shared, ConnectionState::Connecting, detail),
            );
            shared.generation
        };
        self.inner.dispatch(events);

        self.inner.open(generation, Origin::Explicit).await
    }

    /// Close the connection and cancel any scheduled reconnect. Idempotent.
    pub fn disconnect(&self) {
        let mut events = Vec::new();
        {
            let mut shared = self.inner.shared.lock();
            if let Some(task) = shared.reconnect_task.take() {
                task.abort();
            }
            shared.generation += 1;
            shared.attempt_in_flight = false;
            shared.reconnect_attempts = 0;

            if let Some(session) = shared.session.take() {
                session.reader.abort();
            }
            shared.pending.resolve(Err(ClientError::ConnectionClosed));

            if shared.state != ConnectionState::Disconnected {
                info!(url = %self.inner.config.server_url, "Disconnected");
                events.push(self.inner.set_state(
                    &mut shared,
                    ConnectionState::Disconnected,
                    "Disconnected",
                ));
                events.push(Event::Disconnected(DisconnectReason::Requested));
            }
        }
        self.inner.dispatch(events);
    }

    /// Submit one image and wait for the next inbound frame as its response.
    pub async fn send_image(
        &self,
        image: impl Into<ImageData>,
        mode: RequestMode,
        config: &DetectionConfig,
    ) -> Result<DetectionResponse, ClientError> {
        let payload = DetectionRequest::new(mode, image.into(), config.clone())?.to_json()?;

        let (id, reply_rx, outbound) = {
            let mut shared = self.inner.shared.lock();
            let outbound = match (&shared.session, shared.state) {
                (Some(session), ConnectionState::Connected) => session.outbound.clone(),
                _ => return Err(ClientError::NotConnected),
            };
            let Some((id, reply_rx)) = shared.pending.claim() else {
                return Err(ClientError::Busy);
            };
            (id, reply_rx, outbound)
        };
        let _guard = PendingGuard {
            inner: &self.inner,
            id,
        };

        let started = Instant::now();
        if outbound.send(payload).await.is_err() {
            let err = ClientError::Send("connection writer closed".to_string());
            warn!(error = %err, "Failed to send request");
            self.inner.observer.on_error(&err, ErrorCategory::SendFailure);
            return Err(err);
        }
        self.inner.metrics.request_sent(mode);
        debug!(request_id = id, mode = %mode, "Request sent");

        let response_timeout = self.inner.config.response_timeout;
        let outcome = match timeout(response_timeout, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ClientError::ConnectionClosed),
            Err(_) => {
                self.inner.metrics.request_timed_out();
                warn!(
                    request_id = id,
                    timeout_ms = response_timeout.as_millis() as u64,
                    "No response from detection service"
                );
                self.inner.observer.on_error(
                    &ClientError::Timeout(response_timeout),
                    ErrorCategory::ResponseTimeout,
                );
                Err(ClientError::Timeout(response_timeout))
            }
        };

        self.inner
            .metrics
            .request_finished(mode, started.elapsed().as_secs_f64());
        outcome
    }

    pub fn is_connected(&self) -> bool {
        let shared = self.inner.shared.lock();
        shared.state == ConnectionState::Connected && shared.session.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.shared.lock().state
    }

    /// Receiver that always holds the latest status.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.inner.status_tx.subscribe()
    }

    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.shared.lock().reconnect_attempts
    }

    pub fn is_busy(&self) -> bool {
        self.inner.shared.lock().pending.is_occupied()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[cfg(test)]
    fn has_reconnect_timer(&self) -> bool {
        self.inner
            .shared
            .lock()
            .reconnect_task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }
}

/// Frees the pending slot if the caller stops waiting early.
struct PendingGuard<'a, C> {
    inner: &'a Inner<C>,
    id: u64,
}

impl<C> Drop for PendingGuard<'_, C> {
    fn drop(&mut self) {
        self.inner.shared.lock().pending.release(self.id);
    }
}

impl<C> Inner<C> {
    fn set_state(
        &self,
        shared: &mut Shared,
        state: ConnectionState,
        detail: impl Into<String>,
    ) -> Event {
        if !shared.state.can_transition_to(state) {
            warn!(from = %shared.state, to = %state, "Unexpected connection state transition");
        }
        shared.state = state;

        let status = ConnectionStatus::new(state, detail);
        self.status_tx.send_replace(status.clone());
        Event::Status(status)
    }

    fn dispatch(&self, events: Vec<Event>) {
        let observer = self.observer.as_ref();
        for event in events {
            match event {
                Event::Status(status) => observer.on_status(&status),
                Event::Connected => observer.on_connect(),
                Event::Disconnected(reason) => observer.on_disconnect(reason),
                Event::Error(err, category) => observer.on_error(&err, category),
                Event::Message(value) => observer.on_message(&value),
                Event::Reconnecting(attempt) => observer.on_reconnect(attempt),
            }
        }
    }
}

impl<C: Connector> Inner<C> {
    async fn open(self: &Arc<Self>, generation: u64, origin: Origin) -> Result<(), ClientError> {
        let url = &self.config.server_url;
        let connection = match timeout(self.config.connect_timeout, self.connector.connect(url))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(ClientError::Connection(format!(
                "timed out after {:?}",
                self.config.connect_timeout
            ))),
        };

        let mut events = Vec::new();
        let result = {
            let mut shared = self.shared.lock();
            if shared.generation != generation {
                debug!(url = %url, "Discarding superseded connection attempt");
                return Err(ClientError::ConnectionClosed);
            }
            shared.attempt_in_flight = false;

            match connection {
                Ok(connection) => {
                    shared.next_session_id += 1;
                    let id = shared.next_session_id;
                    let reader =
                        tokio::spawn(read_loop(Arc::downgrade(self), id, connection.inbound));
                    shared.session = Some(Session {
                        id,
                        outbound: connection.outbound,
                        reader,
                    });
                    shared.reconnect_attempts = 0;

                    info!(url = %url, "Connected to detection service");
                    events.push(self.set_state(&mut shared, ConnectionState::Connected, "Connected"));
                    events.push(Event::Connected);
                    Ok(())
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Connection attempt failed");
                    let detail = match &e {
                        ClientError::Connection(msg) => msg.clone(),
                        other => other.to_string(),
                    };
                    events.push(Event::Error(
                        ClientError::Connection(detail.clone()),
                        ErrorCategory::ConnectionEstablishment,
                    ));
                    match origin {
                        Origin::Explicit => events.push(self.set_state(
                            &mut shared,
                            ConnectionState::Disconnected,
                            format!("Connection failed: {detail}"),
                        )),
                        Origin::Reconnect => self.schedule_reconnect(&mut shared, &mut events),
                    }
                    Err(e)
                }
            }
        };
        self.dispatch(events);
        result
    }

    fn schedule_reconnect(self: &Arc<Self>, shared: &mut Shared, events: &mut Vec<Event>) {
        if !self.policy.is_enabled() {
            events.push(self.set_state(shared, ConnectionState::Disconnected, "Disconnected"));
            return;
        }
        if self.policy.is_exhausted(shared.reconnect_attempts) {
            error!(
                attempts = shared.reconnect_attempts,
                "Reconnect attempts exhausted"
            );
            let detail = format!(
                "Connection failed after {} attempts",
                shared.reconnect_attempts
            );
            events.push(self.set_state(shared, ConnectionState::Failed, detail));
            return;
        }

        shared.reconnect_attempts += 1;
        let attempt = shared.reconnect_attempts;
        let delay = self.policy.delay_for_attempt(attempt);
        let generation = shared.generation;

        info!(
            attempt,
            max_attempts = self.policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );
        self.metrics.reconnect_scheduled();

        let detail = format!("Reconnecting ({}/{})", attempt, self.policy.max_attempts);
        events.push(self.set_state(shared, ConnectionState::Reconnecting, detail));
        events.push(Event::Reconnecting(attempt));

        let weak = Arc::downgrade(self);
        shared.reconnect_task = Some(tokio::spawn(async move {
            sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.reconnect_attempt(generation).await;
            }
        }));
    }

    async fn reconnect_attempt(self: Arc<Self>, generation: u64) {
        {
            let mut shared = self.shared.lock();
            if shared.generation != generation
                || shared.session.is_some()
                || shared.attempt_in_flight
            {
                return;
            }
            shared.attempt_in_flight = true;
        }
        let _ = self.open(generation, Origin::Reconnect).await;
    }

    fn handle_frame(&self, session_id: u64, text: &str) {
        let mut events = Vec::new();
        {
            let mut shared = self.shared.lock();
            if shared.session.as_ref().map(|s| s.id) != Some(session_id) {
                return;
            }

            match serde_json::from_str::<Value>(text) {
                Ok(value) => {
                    if shared.pending.is_occupied() {
                        let reply = DetectionResponse::from_value(value.clone()).map_err(|e| {
                            self.metrics.malformed_message();
                            warn!(error = %e, "Response does not match the detection schema");
                            events.push(Event::Error(
                                ClientError::MalformedMessage(e.to_string()),
                                ErrorCategory::MessageParsing,
                            ));
                            ClientError::MalformedMessage(e.to_string())
                        });
                        shared.pending.resolve(reply);
                    } else {
                        debug!("Unsolicited message received");
                    }
                    events.insert(0, Event::Message(value));
                }
                Err(e) => {
                    self.metrics.malformed_message();
                    warn!(error = %e, "Inbound frame is not JSON");
                    shared
                        .pending
                        .resolve(Err(ClientError::MalformedMessage(e.to_string())));
                    events.push(Event::Error(
                        ClientError::MalformedMessage(e.to_string()),
                        ErrorCategory::MessageParsing,
                    ));
                }
            }
        }
        self.dispatch(events);
    }

    fn handle_close(self: &Arc<Self>, session_id: u64) {
        let mut events = Vec::new();
        {
            let mut shared = self.shared.lock();
            if shared.session.as_ref().map(|s| s.id) != Some(session_id) {
                return;
            }
            shared.session = None;
            shared.pending.resolve(Err(ClientError::ConnectionClosed));

            warn!(url = %self.config.server_url, "Connection closed unexpectedly");
            events.push(Event::Disconnected(DisconnectReason::Unexpected));
            self.schedule_reconnect(&mut shared, &mut events);
        }
        self.dispatch(events);
    }
}

impl<C> Drop for Inner<C> {
    fn drop(&mut self) {
        let shared = self.shared.get_mut();
        if let Some(task) = shared.reconnect_task.take() {
            task.abort();
        }
        if let Some(session) = shared.session.take() {
            session.reader.abort();
        }
    }
}

async fn read_loop<C: Connector>(
    inner: Weak<Inner<C>>,
    session_id: u64,
    mut inbound: mpsc::Receiver<String>,
) {
    while let Some(text) = inbound.recv().await {
        let Some(inner) = inner.upgrade() else {
            return;
        };
        inner.handle_frame(session_id, &text);
    }
    if let Some(inner) = inner.upgrade() {
        inner.handle_close(session_id);
    }
}
