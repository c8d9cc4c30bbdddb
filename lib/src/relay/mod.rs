// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Relay session manager
//!
//! Maintains a WebSocket connection to a relay service so applications can deliver
//! (sealed) signing requests to this wallet via its [RelayLinkIdentity].
//!
//! Status moves `Disconnected -> Connecting -> Connected`, any failure or close
//! returns to `Disconnected` and is visible via [RelayManager::subscribe_status].
//! Received requests are delivered as [RelayEvent]s on the channel returned by
//! [RelayManager::new], reconnecting is left to the caller.

use std::{sync::Arc, time::Duration};

use futures::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use log::{debug, info, warn};
use tokio::{
    net::TcpStream,
    sync::{mpsc, watch, Mutex},
    task::JoinHandle,
    time::timeout,
};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

use esr_abi::PublicKey;
use esr_core::{CallbackPayload, ChainId, PrivateKey, SigningRequest};

use crate::{
    link::RelayLinkIdentity,
    session::{Session, SessionStore},
    store::StateStore,
    Error,
};

pub mod message;
use message::{decode_binary, decode_text, CallbackMessage, Identify, Inbound, RelayMessage};

/// Default relay service
pub const DEFAULT_RELAY_URL: &str = "wss://cb.anchor.link";

/// Relay connection configuration
#[derive(Clone, PartialEq, Debug)]
pub struct RelayConfig {
    /// Relay base URL, the link id is appended as a path segment
    pub url: String,
    /// Wallet display name
    pub name: String,
    pub device_id: String,
    /// Chains advertised to the relay
    pub chains: Vec<ChainId>,
    pub heartbeat: Duration,
    pub connect_timeout: Duration,
    /// Wait for a graceful close on disconnect
    pub close_timeout: Duration,
    /// Wait for background tasks to exit on disconnect
    pub shutdown_grace: Duration,
    /// Event channel depth
    pub channel_depth: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RELAY_URL.to_string(),
            name: "esr-wallet".to_string(),
            device_id: "esr-wallet".to_string(),
            chains: vec![],
            heartbeat: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            close_timeout: Duration::from_secs(2),
            shutdown_grace: Duration::from_secs(3),
            channel_depth: 16,
        }
    }
}

/// Relay connection status
#[derive(Copy, Clone, PartialEq, Eq, Debug, strum::Display)]
pub enum RelayStatus {
    Disconnected,
    Connecting,
    Connected,
}

/// Events raised by the relay session
#[derive(Clone, PartialEq, Debug)]
pub enum RelayEvent {
    /// Signing or identity request received
    Request {
        request: Box<SigningRequest>,
        /// Callback supplied with the relay envelope
        callback: Option<String>,
        /// Sender key for sealed requests
        sender: Option<PublicKey>,
        /// Matching session, by sender key then by chain
        session: Option<Session>,
    },
    /// Failure handling a received message
    Error(String),
}

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = Arc<Mutex<SplitSink<WsStream, Message>>>;

/// Relay session manager, see the [module docs][self]
pub struct RelayManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: RelayConfig,
    store: Arc<dyn StateStore>,
    sessions: Arc<SessionStore>,
    identity: Mutex<Option<RelayLinkIdentity>>,
    status: watch::Sender<RelayStatus>,
    events: mpsc::Sender<RelayEvent>,
    /// Connection lock, held for the duration of connect and disconnect
    conn: Mutex<Option<Connection>>,
}

struct Connection {
    sink: WsSink,
    shutdown: Arc<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
}

impl RelayManager {
    /// Create a relay manager, returning the event channel for received requests
    pub fn new(
        config: RelayConfig,
        store: Arc<dyn StateStore>,
        sessions: Arc<SessionStore>,
    ) -> (Self, mpsc::Receiver<RelayEvent>) {
        let (events, rx) = mpsc::channel(config.channel_depth.max(1));
        let (status, _) = watch::channel(RelayStatus::Disconnected);

        let inner = Arc::new(Inner {
            config,
            store,
            sessions,
            identity: Mutex::new(None),
            status,
            events,
            conn: Mutex::new(None),
        });

        (Self { inner }, rx)
    }

    pub fn status(&self) -> RelayStatus {
        *self.inner.status.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<RelayStatus> {
        self.inner.status.subscribe()
    }

    pub fn config(&self) -> &RelayConfig {
        &self.inner.config
    }

    /// Fetch the link identity, loading or generating it on first use
    pub async fn identity(&self) -> Result<RelayLinkIdentity, Error> {
        self.inner.identity().await
    }

    /// Connect to the relay, a no-op while connecting or connected
    pub async fn connect(&self) -> Result<(), Error> {
        let mut conn = self.inner.conn.lock().await;

        let status = self.status();
        if status != RelayStatus::Disconnected {
            debug!("Relay connect ignored ({})", status);
            return Ok(());
        }

        // Clean up after a dropped connection
        if let Some(c) = conn.take() {
            c.stop(&self.inner.config).await;
        }

        self.inner.set_status(RelayStatus::Connecting);

        match self.inner.open().await {
            Ok(c) => {
                *conn = Some(c);
                Ok(())
            }
            Err(e) => {
                warn!("Relay connection failed: {}", e);
                self.inner.set_status(RelayStatus::Disconnected);
                Err(e)
            }
        }
    }

    /// Disconnect from the relay, always leaves the manager disconnected
    pub async fn disconnect(&self) {
        let mut conn = self.inner.conn.lock().await;

        if let Some(c) = conn.take() {
            c.stop(&self.inner.config).await;
        }

        self.inner.set_status(RelayStatus::Disconnected);
    }

    /// Return a signed request result via the relay
    pub async fn send_callback(&self, payload: &CallbackPayload) -> Result<(), Error> {
        let m = RelayMessage::Callback(CallbackMessage {
            payload: payload.clone(),
        });

        self.send(&m).await
    }

    /// Send a message to the relay
    pub async fn send(&self, m: &RelayMessage) -> Result<(), Error> {
        let sink = {
            let conn = self.inner.conn.lock().await;
            match (conn.as_ref(), self.status()) {
                (Some(c), RelayStatus::Connected) => c.sink.clone(),
                _ => return Err(Error::NotConnected),
            }
        };

        timeout(self.inner.config.connect_timeout, send(&sink, m)).await?
    }
}

impl Drop for RelayManager {
    fn drop(&mut self) {
        if let Ok(mut conn) = self.inner.conn.try_lock() {
            if let Some(c) = conn.take() {
                c.shutdown.send_replace(true);
            }
        }
    }
}

impl Inner {
    fn set_status(&self, s: RelayStatus) {
        let prev = self.status.send_replace(s);
        if prev != s {
            info!("Relay status: {} -> {}", prev, s);
        }
    }

    async fn identity(&self) -> Result<RelayLinkIdentity, Error> {
        let mut identity = self.identity.lock().await;

        if let Some(i) = identity.as_ref() {
            return Ok(i.clone());
        }

        let i = RelayLinkIdentity::load_or_generate(self.store.as_ref()).await?;
        *identity = Some(i.clone());

        Ok(i)
    }

    /// Open the socket, identify, then start the receive and heartbeat loops
    async fn open(self: &Arc<Self>) -> Result<Connection, Error> {
        let identity = self.identity().await?;

        let url = format!(
            "{}/{}",
            self.config.url.trim_end_matches('/'),
            identity.link_id()
        );
        debug!("Connecting to relay: {}", url);

        let (ws, _) = timeout(self.config.connect_timeout, connect_async(url.as_str())).await??;
        let (sink, stream) = ws.split();
        let sink = Arc::new(Mutex::new(sink));

        let identify = RelayMessage::Identify(Identify {
            link_id: identity.link_id().to_string(),
            name: self.config.name.clone(),
            request_key: *identity.request_public_key(),
            device_id: self.config.device_id.clone(),
            chains: self.config.chains.iter().map(|c| (*c).into()).collect(),
        });
        timeout(self.config.connect_timeout, send(&sink, &identify)).await??;

        self.set_status(RelayStatus::Connected);

        let (shutdown, _) = watch::channel(false);
        let shutdown = Arc::new(shutdown);
        let key = Arc::new(identity.request_key().clone());

        let tasks = vec![
            tokio::spawn(self.clone().receive_loop(
                stream,
                sink.clone(),
                key,
                shutdown.clone(),
                shutdown.subscribe(),
            )),
            tokio::spawn(self.clone().heartbeat_loop(
                sink.clone(),
                shutdown.clone(),
                shutdown.subscribe(),
            )),
        ];

        Ok(Connection {
            sink,
            shutdown,
            tasks,
        })
    }

    /// Connection lost, stop both loops
    fn lost(&self, shutdown: &watch::Sender<bool>) {
        shutdown.send_replace(true);
        self.set_status(RelayStatus::Disconnected);
    }

    async fn emit(&self, e: RelayEvent) {
        if self.events.send(e).await.is_err() {
            debug!("Relay event dropped, no receiver");
        }
    }

    async fn receive_loop(
        self: Arc<Self>,
        mut stream: SplitStream<WsStream>,
        sink: WsSink,
        key: Arc<PrivateKey>,
        shutdown: Arc<watch::Sender<bool>>,
        mut exit: watch::Receiver<bool>,
    ) {
        loop {
            // Fragmented frames are reassembled by the socket
            let m = tokio::select! {
                _ = exit.changed() => break,
                m = stream.next() => m,
            };

            match m {
                Some(Ok(m @ Message::Text(_))) | Some(Ok(m @ Message::Binary(_))) => {
                    self.dispatch(m, key.clone(), sink.clone())
                }
                Some(Ok(Message::Close(f))) => {
                    info!("Relay closed connection: {:?}", f);
                    self.lost(&shutdown);
                    break;
                }
                Some(Ok(_)) => (),
                Some(Err(e)) => {
                    warn!("Relay receive failed: {}", e);
                    self.emit(RelayEvent::Error(format!("relay receive: {e}"))).await;
                    self.lost(&shutdown);
                    break;
                }
                None => {
                    info!("Relay connection ended");
                    self.lost(&shutdown);
                    break;
                }
            }
        }

        debug!("Relay receive loop exited");
    }

    async fn heartbeat_loop(
        self: Arc<Self>,
        sink: WsSink,
        shutdown: Arc<watch::Sender<bool>>,
        mut exit: watch::Receiver<bool>,
    ) {
        loop {
            tokio::select! {
                _ = exit.changed() => break,
                _ = tokio::time::sleep(self.config.heartbeat) => (),
            }

            if let Err(e) = send(&sink, &RelayMessage::Ping).await {
                warn!("Relay heartbeat failed: {}", e);
                self.lost(&shutdown);
                break;
            }
        }

        debug!("Relay heartbeat loop exited");
    }

    /// Handle each frame on its own task, failures are raised as events
    fn dispatch(self: &Arc<Self>, m: Message, key: Arc<PrivateKey>, sink: WsSink) {
        let inner = self.clone();

        tokio::spawn(async move {
            if let Err(e) = inner.handle(m, &key, &sink).await {
                warn!("Failed to handle relay message: {}", e);
                inner.emit(RelayEvent::Error(e.to_string())).await;
            }
        });
    }

    async fn handle(&self, m: Message, key: &PrivateKey, sink: &WsSink) -> Result<(), Error> {
        let inbound = match m {
            Message::Text(t) => decode_text(&t, key)?,
            Message::Binary(b) => decode_binary(&b, key)?,
            _ => Inbound::Ignored,
        };

        match inbound {
            Inbound::Request {
                request,
                callback,
                sender,
            } => {
                let chain_id = request.chain_id();

                let by_key = match &sender {
                    Some(k) => self.sessions.find_by_key(&chain_id, k).await,
                    None => None,
                };
                let session = match by_key {
                    Some(s) => Some(s),
                    None => self.sessions.find_by_chain(&chain_id).await.into_iter().next(),
                };

                info!(
                    "Received {} request for chain {} (session: {})",
                    if request.is_identity() { "identity" } else { "signing" },
                    chain_id,
                    session.as_ref().map(|s| s.name.as_str()).unwrap_or("none"),
                );

                self.emit(RelayEvent::Request {
                    request,
                    callback,
                    sender,
                    session,
                })
                .await;
            }
            Inbound::Ping => send(sink, &RelayMessage::Pong).await?,
            Inbound::Ignored => (),
        }

        Ok(())
    }
}

impl Connection {
    /// Stop both loops and close the socket
    async fn stop(mut self, config: &RelayConfig) {
        self.shutdown.send_replace(true);

        match timeout(config.close_timeout, async { self.sink.lock().await.close().await }).await {
            Ok(Ok(())) => debug!("Relay connection closed"),
            Ok(Err(e)) => debug!("Relay close failed: {}", e),
            Err(_) => warn!("Relay close timed out after {:?}", config.close_timeout),
        }

        for t in self.tasks.iter_mut() {
            if timeout(config.shutdown_grace, &mut *t).await.is_err() {
                warn!(
                    "Relay task did not exit within {:?}, aborting",
                    config.shutdown_grace
                );
                t.abort();
            }
        }
    }
}

async fn send(sink: &WsSink, m: &RelayMessage) -> Result<(), Error> {
    let text = m.to_json()?;
    sink.lock().await.send(Message::Text(text)).await?;
    Ok(())
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use esr_tests::chain::EOS_CHAIN_ID;

    use super::*;
    use crate::store::MemoryStore;

    async fn manager(config: RelayConfig) -> (RelayManager, mpsc::Receiver<RelayEvent>) {
        let store = Arc::new(MemoryStore::new());
        let sessions = Arc::new(SessionStore::load(store.clone()).await.unwrap());
        RelayManager::new(config, store, sessions)
    }

    #[tokio::test]
    async fn identity_is_stable() {
        let (m, _rx) = manager(RelayConfig::default()).await;

        let a = m.identity().await.unwrap();
        let b = m.identity().await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn connect_failure_disconnects() {
        let port = portpicker::pick_unused_port().unwrap();
        let (m, _rx) = manager(RelayConfig {
            url: format!("ws://127.0.0.1:{port}"),
            chains: vec![ChainId::from_str(EOS_CHAIN_ID).unwrap()],
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        })
        .await;

        let status = m.subscribe_status();

        assert!(m.connect().await.is_err());
        assert_eq!(m.status(), RelayStatus::Disconnected);
        assert!(status.has_changed().unwrap());

        let p = CallbackPayload {
            sig: String::new(),
            tx: String::new(),
            sa: String::new(),
            sp: String::new(),
            rbn: String::new(),
            rid: String::new(),
            ex: String::new(),
            req: String::new(),
            cid: String::new(),
            bn: None,
        };
        assert!(matches!(m.send_callback(&p).await, Err(Error::NotConnected)));

        // Disconnect is always safe
        m.disconnect().await;
        assert_eq!(m.status(), RelayStatus::Disconnected);
    }
}
