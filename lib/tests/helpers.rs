#![allow(unused)]

use std::{
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, LevelFilter};
use portpicker::pick_unused_port;
use simplelog::SimpleLogger;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::{mpsc, oneshot},
};
use tokio_tungstenite::{
    tungstenite::{
        handshake::server::{ErrorResponse, Request, Response},
        Message,
    },
    WebSocketStream,
};

use esr_wallet::{
    engine::{
        abi::{Abi, Name},
        transaction::AbiMap,
        ChainId, ChainInfo, Checksum256,
    },
    provider::{BroadcastResult, PushTransaction},
    AbiProvider, Broadcaster, ChainInfoProvider, Error,
};
use esr_tests::{
    abis::TOKEN_ABI,
    chain::{FIXTURE, WAX_CHAIN_ID},
};

/// Setup logging, `LOG_LEVEL` overrides the default debug level
pub fn setup() {
    let log_level = match std::env::var("LOG_LEVEL").map(|v| LevelFilter::from_str(&v)) {
        Ok(Ok(l)) => l,
        _ => LevelFilter::Debug,
    };

    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_ignore_str("tungstenite")
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("hyper")
        .build();

    let _ = SimpleLogger::init(log_level, log_cfg);
}

/// Chain state for the shared signing fixture
pub fn chain_info() -> ChainInfo {
    ChainInfo {
        chain_id: ChainId::from_str(FIXTURE.chain_id).unwrap(),
        head_block_num: FIXTURE.head_block_num,
        last_irreversible_block_num: FIXTURE.last_irreversible_block_num,
        last_irreversible_block_id: Checksum256::from_str(FIXTURE.last_irreversible_block_id)
            .unwrap(),
        head_block_id: None,
        head_block_time: None,
        server_version: None,
    }
}

/// Fixture chain state moved to WAX
pub fn wax_info() -> ChainInfo {
    ChainInfo {
        chain_id: ChainId::from_str(WAX_CHAIN_ID).unwrap(),
        ..chain_info()
    }
}

/// Block number reported for broadcast transactions
pub const BLOCK_NUM: u32 = 1234;

/// In-memory chain, counts ABI fetches and records pushed transactions
pub struct MockChain {
    pub info: ChainInfo,
    pub abis: AbiMap,
    pub abi_fetches: AtomicUsize,
    pub pushed: Mutex<Vec<PushTransaction>>,
    /// Reject pushed transactions with this chain error code
    pub reject: Option<i64>,
}

impl MockChain {
    pub fn new(info: ChainInfo) -> Self {
        let mut abis = AbiMap::new();
        abis.insert(Name::new("eosio.token"), Abi::from_json(TOKEN_ABI).unwrap());

        Self {
            info,
            abis,
            abi_fetches: AtomicUsize::new(0),
            pushed: Mutex::new(vec![]),
            reject: None,
        }
    }

    pub fn pushed(&self) -> Vec<PushTransaction> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainInfoProvider for MockChain {
    async fn chain_info(&self, _chain_id: &ChainId) -> Result<ChainInfo, Error> {
        Ok(self.info.clone())
    }
}

#[async_trait]
impl AbiProvider for MockChain {
    async fn abi(&self, _chain_id: &ChainId, account: Name) -> Result<Abi, Error> {
        self.abi_fetches.fetch_add(1, Ordering::SeqCst);

        self.abis
            .get(&account)
            .cloned()
            .ok_or_else(|| Error::Transport(format!("no abi for {account}")))
    }
}

#[async_trait]
impl Broadcaster for MockChain {
    async fn broadcast(
        &self,
        _chain_id: &ChainId,
        tx: &PushTransaction,
    ) -> Result<BroadcastResult, Error> {
        if let Some(code) = self.reject {
            return Err(Error::RemoteRejection {
                code,
                message: "assertion failure with message: overdrawn balance".to_string(),
            });
        }

        self.pushed.lock().unwrap().push(tx.clone());

        let packed = hex::decode(&tx.packed_trx).unwrap();

        Ok(BroadcastResult {
            transaction_id: Checksum256::hash(&[packed.as_slice()]),
            block_num: BLOCK_NUM,
        })
    }
}

/// Minimal HTTP server answering every request with `status`, yields (path, body)
pub async fn http_server(status: u16) -> (String, mpsc::Receiver<(String, String)>) {
    let port = pick_unused_port().unwrap();
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        while let Ok((s, _)) = listener.accept().await {
            tokio::spawn(http_respond(s, status, tx.clone()));
        }
    });

    (format!("http://127.0.0.1:{port}"), rx)
}

async fn http_respond(mut s: TcpStream, status: u16, tx: mpsc::Sender<(String, String)>) {
    let mut buff = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let n = s.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buff.extend_from_slice(&chunk[..n]);

        let header_end = match buff.windows(4).position(|w| w == b"\r\n\r\n") {
            Some(i) => i,
            None => continue,
        };

        let head = String::from_utf8_lossy(&buff[..header_end]).to_string();
        let len = head
            .lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = header_end + 4;
        if buff.len() < body_start + len {
            continue;
        }

        let path = head.split_whitespace().nth(1).unwrap_or_default().to_string();
        let body = String::from_utf8_lossy(&buff[body_start..body_start + len]).to_string();
        let _ = tx.send((path, body)).await;
        break;
    }

    let resp = format!("HTTP/1.1 {status} Status\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
    let _ = s.write_all(resp.as_bytes()).await;
    let _ = s.shutdown().await;
}

/// Local relay, yields the request path and socket for each connection
pub async fn relay_server() -> (String, mpsc::Receiver<(String, WebSocketStream<TcpStream>)>) {
    let port = pick_unused_port().unwrap();
    let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
    let (tx, rx) = mpsc::channel(4);

    tokio::spawn(async move {
        while let Ok((s, _)) = listener.accept().await {
            let (path_tx, path_rx) = oneshot::channel();

            let cb = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
                let _ = path_tx.send(req.uri().path().to_string());
                Ok(resp)
            };

            let ws = match tokio_tungstenite::accept_hdr_async(s, cb).await {
                Ok(ws) => ws,
                Err(e) => {
                    debug!("relay handshake failed: {}", e);
                    continue;
                }
            };

            let path = path_rx.await.unwrap_or_default();
            if tx.send((path, ws)).await.is_err() {
                break;
            }
        }
    });

    (format!("ws://127.0.0.1:{port}"), rx)
}

/// Read the next text or binary message, skipping control frames
pub async fn next_message(ws: &mut WebSocketStream<TcpStream>) -> Option<Message> {
    let f = async {
        while let Some(m) = ws.next().await {
            match m {
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => continue,
                Ok(m) => return Some(m),
                Err(_) => return None,
            }
        }
        None
    };

    tokio::time::timeout(Duration::from_secs(5), f)
        .await
        .unwrap_or(None)
}

/// Read the next text message
pub async fn next_text(ws: &mut WebSocketStream<TcpStream>) -> String {
    match next_message(ws).await {
        Some(Message::Text(t)) => t,
        m => panic!("expected text message, got {m:?}"),
    }
}
