// Copyright (c) 2022-2023 The MobileCoin Foundation

//! Transaction signing pipeline
//!
//! 1. Build a [TransactionHeader] from fresh [ChainInfo] (TAPOS values embedded in
//!    requests are never used)
//! 2. Resolve placeholder authorizations and serialize typed action data
//! 3. Compute the signing digest over chain id, packed transaction and an empty
//!    context free data digest
//! 4. Sign with a canonical recoverable signature

use log::{debug, info};
use serde::{Deserialize, Serialize};

use esr_abi::{Name, Signature, TimePointSec};

use crate::{
    chain::{ChainId, ChainInfo, Checksum256},
    crypto::PrivateKey,
    transaction::{AbiMap, Action, ActionData, PermissionLevel, Transaction, TransactionHeader},
    Error,
};

/// Default transaction lead time in seconds
pub const DEFAULT_EXPIRE_SECONDS: u32 = 300;

/// Signing policy
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignerConfig {
    /// Seconds from signing until transaction expiry
    pub expire_seconds: u32,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            expire_seconds: DEFAULT_EXPIRE_SECONDS,
        }
    }
}

/// Signed transaction with derived values
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signatures: Vec<Signature>,
    /// Serialized transaction
    #[serde(with = "crate::helpers::hex_bytes")]
    pub packed: Vec<u8>,
    /// Transaction id
    pub id: Checksum256,
    /// Digest the signatures were produced over
    pub digest: Checksum256,
}

impl SignedTransaction {
    pub fn packed_hex(&self) -> String {
        hex::encode(&self.packed)
    }
}

/// Assemble and sign a transaction for `actions` against fresh chain state
///
/// `now` is the current unix time in seconds, placeholders are resolved to `signer`.
pub fn sign_transaction(
    key: &PrivateKey,
    chain: &ChainInfo,
    now: u32,
    signer: &PermissionLevel,
    actions: &[Action],
    abis: &AbiMap,
    config: &SignerConfig,
) -> Result<SignedTransaction, Error> {
    let header = TransactionHeader::from_chain(chain, now, config.expire_seconds);

    let actions = actions
        .iter()
        .map(|a| a.resolve(signer, abis))
        .collect::<Result<Vec<_>, _>>()?;

    let transaction = Transaction {
        header,
        actions,
        ..Default::default()
    };

    sign_prepared(key, &chain.chain_id, transaction)
}

/// Sign a fully resolved transaction
pub fn sign_prepared(
    key: &PrivateKey,
    chain_id: &ChainId,
    transaction: Transaction,
) -> Result<SignedTransaction, Error> {
    let placeholder = transaction
        .context_free_actions
        .iter()
        .chain(transaction.actions.iter())
        .flat_map(|a| a.authorization.iter())
        .any(|p| p.is_placeholder());
    if placeholder {
        return Err(Error::unsupported(
            "transaction contains unresolved placeholder authorizations",
        ));
    }

    let packed = transaction.packed()?;
    let id = Checksum256::hash(&[packed.as_slice()]);
    let digest = crate::transaction::signing_digest(chain_id, &packed);

    let signature = key.sign_digest(&digest)?;

    info!(
        "signed transaction {} ({} actions, expires {})",
        id,
        transaction.actions.len(),
        transaction.header.expiration
    );

    Ok(SignedTransaction {
        transaction,
        signatures: vec![signature],
        packed,
        id,
        digest,
    })
}

/// Build the identity proof transaction
///
/// A single `identity` action with no account, authorization or data and
/// zeroed TAPOS fields, proving key control without touching chain resources.
pub fn identity_transaction(expiration: TimePointSec) -> Transaction {
    Transaction {
        header: TransactionHeader {
            expiration,
            ..Default::default()
        },
        actions: vec![Action {
            account: Name::default(),
            name: Name::new("identity"),
            authorization: vec![],
            data: ActionData::Raw(vec![]),
        }],
        ..Default::default()
    }
}

/// Compute the identity proof digest
pub fn identity_digest(chain_id: &ChainId, expiration: TimePointSec) -> Result<Checksum256, Error> {
    identity_transaction(expiration).signing_digest(chain_id)
}

/// Sign an identity proof
pub fn sign_identity(
    key: &PrivateKey,
    chain_id: &ChainId,
    expiration: TimePointSec,
) -> Result<SignedTransaction, Error> {
    let transaction = identity_transaction(expiration);

    let packed = transaction.packed()?;
    let id = Checksum256::hash(&[packed.as_slice()]);
    let digest = crate::transaction::signing_digest(chain_id, &packed);

    let signature = key.sign_digest(&digest)?;

    debug!("signed identity proof for chain {}", chain_id);

    Ok(SignedTransaction {
        transaction,
        signatures: vec![signature],
        packed,
        id,
        digest,
    })
}

#[cfg(test)]
mod test {
    use core::str::FromStr;

    use esr_tests::{
        abis::TOKEN_ABI,
        chain::{transfer, FIXTURE, IDENTITY_DIGEST, WAX_CHAIN_ID},
        keys::DEV_KEY,
        requests::TRANSFER_DATA,
    };

    use esr_abi::Abi;

    use super::*;
    use crate::{crypto::SignatureExt, test::fixture};

    fn transfer_action() -> Action {
        Action {
            account: Name::new("eosio.token"),
            name: Name::new("transfer"),
            authorization: vec![PermissionLevel::placeholder()],
            data: ActionData::Raw(hex::decode(TRANSFER_DATA).unwrap()),
        }
    }

    fn abis() -> AbiMap {
        let mut m = AbiMap::new();
        m.insert(Name::new("eosio.token"), Abi::from_json(TOKEN_ABI).unwrap());
        m
    }

    #[test]
    fn sign_transfer() {
        let key = PrivateKey::from_str(DEV_KEY.private_k1).unwrap();
        let signer = PermissionLevel::new("eosio", "active");

        let s = sign_transaction(
            &key,
            &fixture(),
            FIXTURE.now,
            &signer,
            &[transfer_action()],
            &abis(),
            &SignerConfig::default(),
        )
        .unwrap();

        assert_eq!(s.packed_hex(), transfer::PACKED);
        assert_eq!(s.id.to_string(), transfer::ID);
        assert_eq!(s.digest.to_string(), transfer::DIGEST);

        assert_eq!(s.transaction.header.ref_block_num, FIXTURE.ref_block_num);
        assert_eq!(s.transaction.header.ref_block_prefix, FIXTURE.ref_block_prefix);

        assert_eq!(s.signatures.len(), 1);
        assert_eq!(
            s.signatures[0].recover(&s.digest).unwrap().to_string(),
            DEV_KEY.public_k1
        );
    }

    #[test]
    fn signing_is_recoverable_and_repeatable() {
        let key = PrivateKey::from_str(DEV_KEY.private_k1).unwrap();
        let signer = PermissionLevel::new("eosio", "active");

        let sign = || {
            sign_transaction(
                &key,
                &fixture(),
                FIXTURE.now,
                &signer,
                &[transfer_action()],
                &abis(),
                &SignerConfig::default(),
            )
            .unwrap()
        };

        let a = sign();
        let b = sign();

        assert_eq!(a.digest, b.digest);
        assert_eq!(
            a.signatures[0].recover(&a.digest).unwrap(),
            b.signatures[0].recover(&b.digest).unwrap()
        );
    }

    #[test]
    fn expiry_from_config() {
        let key = PrivateKey::from_str(DEV_KEY.private_k1).unwrap();
        let signer = PermissionLevel::new("eosio", "active");

        let s = sign_transaction(
            &key,
            &fixture(),
            FIXTURE.now,
            &signer,
            &[transfer_action()],
            &abis(),
            &SignerConfig { expire_seconds: 60 },
        )
        .unwrap();

        assert_eq!(s.transaction.header.expiration.unix(), FIXTURE.now + 60);
    }

    #[test]
    fn unresolved_placeholders_rejected() {
        let key = PrivateKey::from_str(DEV_KEY.private_k1).unwrap();

        let t = Transaction {
            actions: vec![transfer_action()],
            ..Default::default()
        };

        assert!(matches!(
            sign_prepared(&key, &fixture().chain_id, t),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn identity_proof() {
        let chain_id = ChainId::from_str(WAX_CHAIN_ID).unwrap();
        let expiration = TimePointSec::from_unix(FIXTURE.expiration);

        let d = identity_digest(&chain_id, expiration).unwrap();
        assert_eq!(d.to_string(), IDENTITY_DIGEST);

        let key = PrivateKey::from_str(DEV_KEY.private_k1).unwrap();
        let s = sign_identity(&key, &chain_id, expiration).unwrap();
        assert_eq!(s.digest, d);
        assert_eq!(
            s.signatures[0].recover(&d).unwrap(),
            key.public_key().unwrap()
        );
    }
}
