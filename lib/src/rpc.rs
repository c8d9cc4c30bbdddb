// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Chain API client
//!
//! [HttpChain] implements [ChainInfoProvider], [AbiProvider] and [Broadcaster]
//! for a single nodeos HTTP endpoint.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use esr_abi::{Abi, AbiDef, Name};
use esr_core::{ChainId, ChainInfo, Checksum256};

use crate::{
    provider::{AbiProvider, BroadcastResult, Broadcaster, ChainInfoProvider, PushTransaction},
    Error,
};

/// HTTP chain API client
#[derive(Clone, Debug)]
pub struct HttpChain {
    client: Client,
    url: String,
}

/// `get_abi` response
#[derive(Clone, Debug, Deserialize)]
struct GetAbiResponse {
    account_name: Name,
    #[serde(default)]
    abi: Option<AbiDef>,
}

/// `push_transaction` response
#[derive(Clone, Debug, Deserialize)]
struct PushResponse {
    transaction_id: Checksum256,
    processed: Processed,
}

#[derive(Clone, Debug, Deserialize)]
struct Processed {
    block_num: u32,
}

/// Error body returned by the chain API
#[derive(Clone, Debug, Deserialize)]
struct ErrorResponse {
    code: i64,
    message: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Clone, Debug, Deserialize)]
struct ErrorDetail {
    code: i64,
    #[serde(default)]
    what: String,
    #[serde(default)]
    details: Vec<ErrorMessage>,
}

#[derive(Clone, Debug, Deserialize)]
struct ErrorMessage {
    message: String,
}

impl ErrorResponse {
    fn into_error(self) -> Error {
        match self.error {
            Some(e) => {
                let message = match e.details.into_iter().next() {
                    Some(d) => d.message,
                    None if !e.what.is_empty() => e.what,
                    None => self.message,
                };
                Error::RemoteRejection {
                    code: e.code,
                    message,
                }
            }
            None => Error::RemoteRejection {
                code: self.code,
                message: self.message,
            },
        }
    }
}

impl HttpChain {
    /// Create a client for the API at `url`, `timeout` applies to each request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, Error> {
        let url = format!("{}{}", self.url, path);
        debug!("POST {}", url);

        let resp = self.client.post(&url).json(body).send().await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<ErrorResponse>(&text) {
                Ok(e) => e.into_error(),
                Err(_) => Error::Transport(format!("{url}: HTTP {status}")),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl ChainInfoProvider for HttpChain {
    async fn chain_info(&self, chain_id: &ChainId) -> Result<ChainInfo, Error> {
        let info: ChainInfo = self
            .post("/v1/chain/get_info", &serde_json::json!({}))
            .await?;

        if &info.chain_id != chain_id {
            warn!(
                "Endpoint {} serves chain {}, expected {}",
                self.url, info.chain_id, chain_id
            );
        }

        Ok(info)
    }
}

#[async_trait]
impl AbiProvider for HttpChain {
    async fn abi(&self, _chain_id: &ChainId, account: Name) -> Result<Abi, Error> {
        let r: GetAbiResponse = self
            .post(
                "/v1/chain/get_abi",
                &serde_json::json!({ "account_name": account }),
            )
            .await?;

        match r.abi {
            Some(def) => Ok(Abi::new(def)),
            None => Err(Error::unsupported(format!(
                "no contract deployed to {}",
                r.account_name
            ))),
        }
    }
}

#[async_trait]
impl Broadcaster for HttpChain {
    async fn broadcast(
        &self,
        _chain_id: &ChainId,
        tx: &PushTransaction,
    ) -> Result<BroadcastResult, Error> {
        let r: PushResponse = self.post("/v1/chain/push_transaction", tx).await?;

        debug!(
            "Transaction {} included in block {}",
            r.transaction_id, r.processed.block_num
        );

        Ok(BroadcastResult {
            transaction_id: r.transaction_id,
            block_num: r.processed.block_num,
        })
    }
}
