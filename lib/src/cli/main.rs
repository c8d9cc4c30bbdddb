// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Command line utility for decoding, signing and receiving signing requests

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use log::{debug, error, info, warn, LevelFilter};

use esr_wallet::{
    engine::{abi::KeyType, transaction::AbiMap, PermissionLevel, PrivateKey},
    relay::DEFAULT_RELAY_URL,
    FileStore, HttpChain, RelayConfig, RelayEvent, RelayLinkIdentity, RelayManager, RelayStatus,
    SessionStore, StateStore, StaticKeys, WalletConfig, WalletHandle,
};

mod helpers;
use helpers::*;

/// Signing request wallet command line utility
#[derive(Clone, PartialEq, Debug, Parser)]
struct Options {
    /// Subcommand to execute
    #[clap(subcommand)]
    cmd: Actions,

    /// Enable verbose logging
    #[clap(long, default_value = "info")]
    log_level: LevelFilter,
}

#[derive(Clone, PartialEq, Debug, Parser)]
#[non_exhaustive]
enum Actions {
    /// Decode a signing request URI
    Decode {
        /// Request URI (`esr:...`)
        uri: String,

        /// Chain API for fetching contract ABIs to decode action data
        #[clap(long)]
        node: Option<String>,
    },

    /// Sign a signing request
    Sign {
        /// Request URI (`esr:...`)
        uri: String,

        /// Signing key (WIF or PVT_K1_)
        #[clap(long, env = "ESR_KEY", hide_env_values = true)]
        key: String,

        /// Signer permission (`actor@permission`)
        #[clap(long)]
        signer: PermissionLevel,

        /// Chain API URL
        #[clap(long)]
        node: String,

        /// Broadcast the transaction regardless of request flags
        #[clap(long)]
        broadcast: bool,

        /// Deliver the callback where the request has one
        #[clap(long)]
        callback: bool,
    },

    /// Generate a new K1 key
    Keygen,

    /// Show (or create) the relay link identity
    Link {
        /// Wallet state file
        #[clap(long, default_value = "esr-wallet.json")]
        state: PathBuf,
    },

    /// Connect to the relay and print received requests
    Listen {
        /// Wallet state file
        #[clap(long, default_value = "esr-wallet.json")]
        state: PathBuf,

        /// Relay URL
        #[clap(long, default_value = DEFAULT_RELAY_URL)]
        relay: String,

        /// Wallet name advertised to the relay
        #[clap(long, default_value = "esr-wallet")]
        name: String,

        /// Supported chains (alias or chain id)
        #[clap(long = "chain", default_value = "EOS")]
        chains: Vec<ChainArg>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Options::parse();

    // Setup logging
    let log_cfg = simplelog::ConfigBuilder::new()
        .add_filter_ignore_str("reqwest")
        .add_filter_ignore_str("tungstenite")
        .add_filter_ignore_str("rustls")
        .build();
    let _ = simplelog::SimpleLogger::init(args.log_level, log_cfg);

    debug!("Executing command: {:?}", args.cmd);

    match args.cmd {
        Actions::Decode { uri, node } => {
            let r = esr_wallet::engine::SigningRequest::from_uri(&uri)?;

            let mut abis = AbiMap::new();
            if let Some(node) = node {
                let chain = HttpChain::new(node, Duration::from_secs(10))?;
                for account in r.contracts() {
                    use esr_wallet::AbiProvider;

                    match chain.abi(&r.chain_id(), account).await {
                        Ok(a) => {
                            abis.insert(account, a);
                        }
                        Err(e) => warn!("No ABI for {}: {}", account, e),
                    }
                }
            }

            let actions = r.decode_actions(&abis)?;

            print_json(&serde_json::json!({
                "chain_id": r.chain_id(),
                "request": r,
                "actions": actions,
            }))?;
        }
        Actions::Sign {
            uri,
            key,
            signer,
            node,
            broadcast,
            callback,
        } => {
            let key: PrivateKey = key.parse()?;

            let chain = Arc::new(HttpChain::new(node, Duration::from_secs(10))?);
            let keys = Arc::new(StaticKeys::new().with_key(signer, key));

            let w = WalletHandle::new(chain.clone(), chain.clone(), keys, WalletConfig::default())
                .with_broadcaster(chain);

            let r = w.parse(&uri)?;
            let resp = w.sign(&r, &signer, broadcast).await?;

            print_json(&resp)?;

            if callback {
                match w.send_callback(&r, &resp).await? {
                    true => info!("Callback delivered"),
                    false => error!("Callback delivery failed"),
                }
            } else {
                print_json(&w.callback_payload(&resp)?)?;
            }
        }
        Actions::Keygen => {
            let k = PrivateKey::generate();
            let p = k.public_key()?;

            info!("Generated {} key", KeyType::K1);

            print_json(&serde_json::json!({
                "private_key": k.to_string(),
                "wif": k.to_wif()?,
                "public_key": p.to_string(),
                "public_key_legacy": p.to_legacy_string()?,
            }))?;
        }
        Actions::Link { state } => {
            let store = FileStore::open(&state).await?;
            let i = RelayLinkIdentity::load_or_generate(&store).await?;

            print_json(&serde_json::json!({
                "link_id": i.link_id(),
                "request_key": i.request_public_key(),
            }))?;
        }
        Actions::Listen {
            state,
            relay,
            name,
            chains,
        } => {
            let store: Arc<dyn StateStore> = Arc::new(FileStore::open(&state).await?);
            let sessions = Arc::new(SessionStore::load(store.clone()).await?);

            let config = RelayConfig {
                url: relay,
                name,
                chains: chains.iter().map(|c| c.0).collect(),
                ..Default::default()
            };

            let (m, mut events) = RelayManager::new(config, store, sessions);
            let mut status = m.subscribe_status();

            m.connect().await?;

            info!(
                "Listening on link {} (ctrl+c to exit)",
                m.identity().await?.link_id()
            );

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    e = events.recv() => match e {
                        Some(RelayEvent::Request { request, callback, sender, session }) => {
                            info!(
                                "Request from {} (session: {})",
                                sender.map(|s| s.to_string()).unwrap_or_else(|| "relay".to_string()),
                                session.map(|s| s.name).unwrap_or_else(|| "none".to_string()),
                            );
                            print_json(&serde_json::json!({
                                "request": request,
                                "callback": callback,
                            }))?;
                        }
                        Some(RelayEvent::Error(e)) => warn!("Relay error: {}", e),
                        None => break,
                    },
                    r = status.changed() => {
                        if r.is_err() || *status.borrow() == RelayStatus::Disconnected {
                            error!("Relay disconnected");
                            break;
                        }
                    }
                }
            }

            m.disconnect().await;
        }
    }

    Ok(())
}
