//! WebSocket client for the unconfirmed-transaction feed.
//!
//! The client owns one background task per `connect()`. That task runs the
//! connect → subscribe → read loop, and on close or error sleeps according
//! to [`ReconnectPolicy`] before trying again. The sleep lives inside the
//! task, so `disconnect()` cancels a pending reconnect along with the live
//! socket.

use crate::backoff::{ReconnectPolicy, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS};
use crate::error::{Error, Result};
use crate::message::{self, OutboundMessage};
use crate::types::Transaction;
use futures::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// Public blockchain.info feed.
pub const DEFAULT_STREAM_URL: &str = "wss://ws.blockchain.info/inv";

/// Callback invoked once per decoded transaction.
pub type EventHandler = Box<dyn FnMut(Transaction) + Send + 'static>;

/// Stream client configuration.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// WebSocket endpoint
    pub url: String,
    /// Backoff unit
    pub base_delay: Duration,
    /// Reconnect budget
    pub max_attempts: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_STREAM_URL.to_string(),
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Observable connection lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionState {
    /// Never connected, or explicitly disconnected
    Idle,
    /// Handshake in progress
    Connecting,
    /// Subscribed and reading
    Connected,
    /// Waiting out a backoff delay
    Reconnecting { attempt: u32, delay_ms: u64 },
    /// Reconnect budget spent; only `connect()` revives the client
    PermanentlyStopped,
}

impl ConnectionState {
    /// Whether a background task is (or should be) running.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ConnectionState::Connecting
                | ConnectionState::Connected
                | ConnectionState::Reconnecting { .. }
        )
    }
}

struct Worker {
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    /// Set once the worker is detached; checked under the handler and
    /// state locks before every callback and state change
    cancelled: Arc<AtomicBool>,
}

/// Single-subscriber client for the transaction feed.
pub struct StreamClient {
    config: StreamConfig,
    handler: Arc<Mutex<Option<EventHandler>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    worker: Option<Worker>,
}

impl Default for StreamClient {
    fn default() -> Self {
        Self::new(StreamConfig::default())
    }
}

impl StreamClient {
    /// Create an idle client. Nothing happens until [`connect`](Self::connect).
    pub fn new(config: StreamConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Idle);
        Self {
            config,
            handler: Arc::new(Mutex::new(None)),
            state: Arc::new(state),
            worker: None,
        }
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Register the transaction callback, replacing any previous one.
    pub fn on_event<F>(&self, callback: F)
    where
        F: FnMut(Transaction) + Send + 'static,
    {
        let mut slot = self.handler.lock().unwrap_or_else(|p| p.into_inner());
        *slot = Some(Box::new(callback));
        debug!("Transaction callback registered");
    }

    /// Start the connection task.
    ///
    /// A live connection is torn down first. The attempt counter starts
    /// from zero. Must be called from within a tokio runtime; outside one
    /// the client logs an error and moves to `PermanentlyStopped`.
    pub fn connect(&mut self) {
        self.stop_worker();

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                error!("Cannot connect without a tokio runtime: {}", e);
                self.state.send_replace(ConnectionState::PermanentlyStopped);
                return;
            }
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        self.state.send_replace(ConnectionState::Connecting);

        let handle = runtime.spawn(run(
            self.config.clone(),
            self.handler.clone(),
            self.state.clone(),
            cancelled.clone(),
            shutdown_rx,
        ));

        self.worker = Some(Worker {
            shutdown: shutdown_tx,
            handle,
            cancelled,
        });
    }

    /// Close the connection and cancel any pending reconnect.
    ///
    /// Once this returns the callback is not invoked again until the next
    /// `connect()`, even if the worker is mid-frame on another thread.
    /// No-op when already idle. The registered callback is kept.
    pub fn disconnect(&mut self) {
        if self.stop_worker() {
            info!("Disconnected from {}", self.config.url);
        }
        self.state.send_replace(ConnectionState::Idle);
    }

    fn stop_worker(&mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return false;
        };
        {
            // Waits out any callback or state change in flight
            let _slot = self.handler.lock().unwrap_or_else(|p| p.into_inner());
            self.state.send_if_modified(|_| {
                worker.cancelled.store(true, Ordering::SeqCst);
                false
            });
        }
        let _ = worker.shutdown.send(());
        worker.handle.abort();
        true
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Watch lifecycle changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }
}

impl Drop for StreamClient {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

/// Connection task: session, backoff, repeat until stopped.
async fn run(
    config: StreamConfig,
    handler: Arc<Mutex<Option<EventHandler>>>,
    state: Arc<watch::Sender<ConnectionState>>,
    cancelled: Arc<AtomicBool>,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut policy = ReconnectPolicy::new(config.base_delay, config.max_attempts);
    let mut rng = StdRng::from_entropy();

    loop {
        if !publish(&state, &cancelled, ConnectionState::Connecting) {
            return;
        }
        info!("Connecting to {}", config.url);

        let link = Link {
            handler: &handler,
            state: &state,
            cancelled: &cancelled,
        };
        let outcome = tokio::select! {
            outcome = session(&config, link, &mut policy, &mut rng) => outcome,
            _ = &mut shutdown => return,
        };
        if cancelled.load(Ordering::SeqCst) {
            return;
        }

        match outcome {
            Ok(()) => info!("Connection to {} closed", config.url),
            Err(e) => warn!("Connection to {} failed: {}", config.url, e),
        }

        let Some(delay) = policy.next_delay() else {
            error!(
                "Max reconnection attempts ({}) reached, giving up",
                policy.max_attempts()
            );
            publish(&state, &cancelled, ConnectionState::PermanentlyStopped);
            return;
        };

        info!(
            "Reconnecting in {:?} (attempt {}/{})",
            delay,
            policy.attempts(),
            policy.max_attempts()
        );
        let waiting = ConnectionState::Reconnecting {
            attempt: policy.attempts(),
            delay_ms: delay.as_millis() as u64,
        };
        if !publish(&state, &cancelled, waiting) {
            return;
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = &mut shutdown => return,
        }
    }
}

/// What a worker shares with its owning client.
#[derive(Clone, Copy)]
struct Link<'a> {
    handler: &'a Mutex<Option<EventHandler>>,
    state: &'a watch::Sender<ConnectionState>,
    cancelled: &'a AtomicBool,
}

/// One connected session. `Ok` means the remote closed cleanly or the
/// worker was detached.
async fn session(
    config: &StreamConfig,
    link: Link<'_>,
    policy: &mut ReconnectPolicy,
    rng: &mut StdRng,
) -> Result<()> {
    let (ws_stream, _) = connect_async(config.url.as_str()).await?;
    let (mut write, mut read) = ws_stream.split();

    policy.reset();
    if !publish(link.state, link.cancelled, ConnectionState::Connected) {
        return Ok(());
    }
    info!("Connected to {}", config.url);

    write
        .send(Message::Text(OutboundMessage::UnconfirmedSub.to_json()))
        .await?;
    debug!("Subscription request sent");

    while let Some(frame) = read.next().await {
        match frame? {
            Message::Text(text) => {
                if let Some(tx) = message::decode(&text, rng) {
                    debug!("Transaction {} ({} sat)", tx.hash, tx.value);
                    if !dispatch(link.handler, link.cancelled, tx) {
                        return Ok(());
                    }
                }
            }
            Message::Close(frame) => {
                debug!("Close frame: {:?}", frame);
                return Ok(());
            }
            _ => {}
        }
    }

    Err(Error::Closed)
}

/// Hand a transaction to the callback. Returns `false` once detached.
fn dispatch(handler: &Mutex<Option<EventHandler>>, cancelled: &AtomicBool, tx: Transaction) -> bool {
    let mut slot = handler.lock().unwrap_or_else(|p| p.into_inner());
    if cancelled.load(Ordering::SeqCst) {
        return false;
    }
    match slot.as_mut() {
        Some(callback) => callback(tx),
        None => debug!("No callback registered, dropping {}", tx.hash),
    }
    true
}

/// Publish a state change. Returns `false` once detached.
fn publish(
    state: &watch::Sender<ConnectionState>,
    cancelled: &AtomicBool,
    next: ConnectionState,
) -> bool {
    let mut live = false;
    state.send_if_modified(|current| {
        live = !cancelled.load(Ordering::SeqCst);
        if live {
            *current = next;
        }
        live
    });
    live
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;
    use std::time::SystemTime;
    use tokio::net::TcpListener;
    use tokio::sync::mpsc;
    use tokio_tungstenite::accept_async;

    fn sample_tx(hash: &str) -> Transaction {
        Transaction {
            hash: hash.into(),
            value: 1,
            received_at: SystemTime::now(),
            origin: GeoPoint::new(0.0, 0.0),
            destination: GeoPoint::new(0.0, 0.0),
        }
    }

    fn test_config(url: String, base_delay: Duration) -> StreamConfig {
        StreamConfig {
            url,
            base_delay,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// An address that refuses connections.
    async fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("ws://{}", addr)
    }

    #[test]
    fn latest_callback_wins() {
        let client = StreamClient::default();
        let (first_tx, mut first_rx) = mpsc::unbounded_channel();
        let (second_tx, mut second_rx) = mpsc::unbounded_channel();

        client.on_event(move |tx| {
            let _ = first_tx.send(tx);
        });
        client.on_event(move |tx| {
            let _ = second_tx.send(tx);
        });

        assert!(dispatch(&client.handler, &AtomicBool::new(false), sample_tx("a")));

        assert!(first_rx.try_recv().is_err());
        assert_eq!(second_rx.try_recv().unwrap().hash, "a");
    }

    #[test]
    fn dispatch_without_callback_is_silent() {
        let client = StreamClient::default();
        assert!(dispatch(&client.handler, &AtomicBool::new(false), sample_tx("a")));
    }

    #[test]
    fn detached_worker_neither_dispatches_nor_publishes() {
        let client = StreamClient::default();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        client.on_event(move |tx| {
            let _ = event_tx.send(tx);
        });

        let cancelled = AtomicBool::new(true);
        assert!(!dispatch(&client.handler, &cancelled, sample_tx("late")));
        assert!(event_rx.try_recv().is_err());

        assert!(!publish(&client.state, &cancelled, ConnectionState::Connected));
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[test]
    fn new_client_is_idle() {
        let mut client = StreamClient::default();
        assert_eq!(client.state(), ConnectionState::Idle);
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    #[test]
    fn connect_outside_runtime_stops() {
        let mut client = StreamClient::default();
        client.connect();
        assert_eq!(client.state(), ConnectionState::PermanentlyStopped);
    }

    #[tokio::test]
    async fn subscribes_and_emits_only_utx() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        let (sub_tx, sub_rx) = oneshot::channel();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();

            if let Some(Ok(Message::Text(text))) = ws.next().await {
                let _ = sub_tx.send(text);
            }

            ws.send(Message::Text(r#"{"op":"ping"}"#.into())).await.unwrap();
            ws.send(Message::Text("{not json".into())).await.unwrap();
            ws.send(Message::Text(
                r#"{"op":"utx","x":{"hash":"abc","out":[{"value":500},{"value":1500}]}}"#.into(),
            ))
            .await
            .unwrap();

            // Hold the socket open until the client goes away
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut client = StreamClient::new(test_config(url, Duration::from_secs(60)));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        client.on_event(move |tx| {
            let _ = event_tx.send(tx);
        });
        client.connect();

        let sub = tokio::time::timeout(Duration::from_secs(5), sub_rx)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub, r#"{"op":"unconfirmed_sub"}"#);

        let tx = tokio::time::timeout(Duration::from_secs(5), event_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(tx.hash, "abc");
        assert_eq!(tx.value, 2000);
        assert!(tx.received_at_ms() > 0);

        // Nothing else was emitted
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(event_rx.try_recv().is_err());
        assert_eq!(client.state(), ConnectionState::Connected);

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);
    }

    /// Serve every connection with an endless stream of `utx` frames.
    async fn flooding_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let Ok(mut ws) = accept_async(stream).await else {
                        return;
                    };
                    let frame = r#"{"op":"utx","x":{"hash":"f","out":[{"value":1}]}}"#;
                    while ws.send(Message::Text(frame.into())).await.is_ok() {}
                });
            }
        });
        url
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn no_callbacks_after_disconnect_returns() {
        use std::sync::atomic::AtomicUsize;

        let url = flooding_server().await;
        let mut client = StreamClient::new(test_config(url, Duration::from_secs(60)));
        let count = Arc::new(AtomicUsize::new(0));
        let seen = count.clone();
        client.on_event(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..10 {
            let start = count.load(Ordering::SeqCst);
            client.connect();

            let flowing = tokio::time::timeout(Duration::from_secs(5), async {
                while count.load(Ordering::SeqCst) < start + 50 {
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            })
            .await;
            assert!(flowing.is_ok());

            client.disconnect();
            let at_disconnect = count.load(Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;

            assert_eq!(count.load(Ordering::SeqCst), at_disconnect);
            assert_eq!(client.state(), ConnectionState::Idle);
        }
    }

    #[tokio::test]
    async fn successful_connect_resets_attempts() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("ws://{}", listener.local_addr().unwrap());

        // Two sessions closed by the server, then one held open
        tokio::spawn(async move {
            for _ in 0..2 {
                let (stream, _) = listener.accept().await.unwrap();
                let mut ws = accept_async(stream).await.unwrap();
                let _ = ws.next().await;
                let _ = ws.close(None).await;
            }
            let (stream, _) = listener.accept().await.unwrap();
            let mut ws = accept_async(stream).await.unwrap();
            while let Some(Ok(_)) = ws.next().await {}
        });

        let mut client = StreamClient::new(test_config(url, Duration::from_millis(200)));
        let mut states = client.subscribe_state();
        client.connect();

        let mut attempts = Vec::new();
        let observed = tokio::time::timeout(Duration::from_secs(10), async {
            while attempts.len() < 2 {
                if states.changed().await.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                if let ConnectionState::Reconnecting { attempt, .. } = state {
                    attempts.push(attempt);
                }
            }
        })
        .await;

        assert!(observed.is_ok());
        assert_eq!(attempts, vec![1, 1]);

        let connected = tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| *s == ConnectionState::Connected),
        )
        .await
        .map(|r| r.is_ok());
        assert_eq!(connected, Ok(true));

        client.disconnect();
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let url = dead_url().await;
        let mut client = StreamClient::new(test_config(url, Duration::from_millis(1)));
        let mut states = client.subscribe_state();
        client.connect();

        let stopped = tokio::time::timeout(
            Duration::from_secs(10),
            states.wait_for(|s| *s == ConnectionState::PermanentlyStopped),
        )
        .await
        .map(|r| r.is_ok());
        assert_eq!(stopped, Ok(true));
        assert!(!client.state().is_active());
    }

    #[tokio::test]
    async fn disconnect_cancels_pending_reconnect() {
        let url = dead_url().await;
        let mut client = StreamClient::new(test_config(url, Duration::from_secs(30)));
        let mut states = client.subscribe_state();
        client.connect();

        let waiting = tokio::time::timeout(
            Duration::from_secs(5),
            states.wait_for(|s| {
                matches!(s, ConnectionState::Reconnecting { attempt: 1, delay_ms: 30_000 })
            }),
        )
        .await
        .map(|r| r.is_ok());
        assert_eq!(waiting, Ok(true));

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.state(), ConnectionState::Idle);
    }
}
