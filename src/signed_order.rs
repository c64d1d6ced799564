//! Off-chain-signed order messages and replay protection.
//!
//! A client signs the canonical byte encoding of a `SignedOrderMessage` with
//! its account authority key. The ledger never sees the key; verification is
//! an injected capability so the core runs in tests with a deterministic
//! keyed mock. A message's replay identity is the sha256 digest of its
//! signature.

use crate::account::Authority;
use crate::order::{MarketType, OrderParams, OrderType, PostOnlyParam, TriggerCondition};
use crate::types::{OrderId, PositionDirection, SubAccountId, Tick};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub const SIGNATURE_LEN: usize = 64;
pub const UUID_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; SIGNATURE_LEN]);

/// Trigger sub-order parameters embedded in a signed message.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriggerOrderParams {
    pub trigger_price: Decimal,
    pub base_asset_amount: Decimal,
}

/// The message a taker signs off-chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignedOrderMessage {
    pub sub_account_id: SubAccountId,
    pub order_params: OrderParams,
    /// Freshness marker: the logical clock tick the client observed. Becomes
    /// the placed order's tick.
    pub sequence_number: Tick,
    pub uuid: [u8; UUID_LEN],
    pub take_profit_params: Option<TriggerOrderParams>,
    pub stop_loss_params: Option<TriggerOrderParams>,
}

impl SignedOrderMessage {
    /// Canonical encoding the signature covers: fixed field order,
    /// little-endian integers, decimals as mantissa + scale. Stable across
    /// client and ledger by construction.
    pub fn to_signing_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(128);
        push_u16(&mut buf, self.sub_account_id.0);
        encode_order_params(&mut buf, &self.order_params);
        push_i64(&mut buf, self.sequence_number.0);
        buf.extend_from_slice(&self.uuid);
        push_option(&mut buf, &self.take_profit_params, encode_trigger_params);
        push_option(&mut buf, &self.stop_loss_params, encode_trigger_params);
        buf
    }
}

fn encode_order_params(buf: &mut Vec<u8>, params: &OrderParams) {
    push_u16(buf, params.market_index.0);
    buf.push(match params.market_type {
        MarketType::Spot => 0,
        MarketType::Perp => 1,
    });
    buf.push(match params.order_type {
        OrderType::Market => 0,
        OrderType::Limit => 1,
        OrderType::TriggerLimit => 2,
    });
    buf.push(match params.direction {
        PositionDirection::Long => 0,
        PositionDirection::Short => 1,
    });
    push_decimal(buf, params.base_asset_amount);
    push_decimal(buf, params.price);
    push_option(buf, &params.auction_start_price, |b, p| push_decimal(b, *p));
    push_option(buf, &params.auction_end_price, |b, p| push_decimal(b, *p));
    push_option(buf, &params.auction_duration, |b, d| {
        push_u16(b, *d);
    });
    buf.push(match params.post_only {
        PostOnlyParam::None => 0,
        PostOnlyParam::MustPostOnly => 1,
    });
    push_option(buf, &params.trigger_price, |b, p| push_decimal(b, *p));
    push_option(buf, &params.trigger_condition, |b, c| {
        b.push(match c {
            TriggerCondition::Above => 0,
            TriggerCondition::Below => 1,
        });
    });
}

fn encode_trigger_params(buf: &mut Vec<u8>, params: &TriggerOrderParams) {
    push_decimal(buf, params.trigger_price);
    push_decimal(buf, params.base_asset_amount);
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_i64(buf: &mut Vec<u8>, value: i64) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_decimal(buf: &mut Vec<u8>, value: Decimal) {
    buf.extend_from_slice(&value.mantissa().to_le_bytes());
    buf.extend_from_slice(&value.scale().to_le_bytes());
}

fn push_option<T>(buf: &mut Vec<u8>, value: &Option<T>, encode: impl Fn(&mut Vec<u8>, &T)) {
    match value {
        Some(inner) => {
            buf.push(1);
            encode(buf, inner);
        }
        None => buf.push(0),
    }
}

/// sha256 of arbitrary bytes. Replay identity of a message is
/// `digest(signature)`.
pub fn digest(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Injected verification capability. Production wires a real signature
/// scheme; tests use the deterministic keyed mock below.
pub trait SignatureVerifier {
    fn verify(&self, message: &[u8], signature: &Signature, authority: &Authority) -> bool;
}

/// Deterministic keyed mock: a "signature" is two chained sha256 digests of
/// the authority bytes and the message. Anyone holding the authority bytes
/// can sign, which is exactly what tests need and nothing more.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Verifier;

impl Sha256Verifier {
    fn expected(message: &[u8], authority: &Authority) -> Signature {
        let mut first = Sha256::new();
        first.update(authority.0);
        first.update(message);
        let first: [u8; 32] = first.finalize().into();

        let mut second = Sha256::new();
        second.update(first);
        second.update(authority.0);
        let second: [u8; 32] = second.finalize().into();

        let mut sig = [0u8; SIGNATURE_LEN];
        sig[..32].copy_from_slice(&first);
        sig[32..].copy_from_slice(&second);
        Signature(sig)
    }
}

impl SignatureVerifier for Sha256Verifier {
    fn verify(&self, message: &[u8], signature: &Signature, authority: &Authority) -> bool {
        Self::expected(message, authority) == *signature
    }
}

/// Signing half of the mock, held by test clients.
#[derive(Debug, Clone, Copy)]
pub struct Sha256Signer {
    pub authority: Authority,
}

impl Sha256Signer {
    pub fn new(authority: Authority) -> Self {
        Self { authority }
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        Sha256Verifier::expected(message, &self.authority)
    }
}

/// One accepted signed order, remembered for replay protection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignedOrderEntry {
    pub uuid: [u8; UUID_LEN],
    pub hash: [u8; 32],
    pub sequence_number: Tick,
    pub order_id: OrderId,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignedOrderStoreError {
    #[error("Signed-order store is full ({0} entries)")]
    Full(usize),

    #[error("Signed order with this uuid was already accepted")]
    Replay,
}

/// Fixed-capacity record of recently accepted signed-order identifiers,
/// one per account. Must be explicitly initialized before the account can
/// place signed taker orders, and may be torn down by the owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedOrderStore {
    entries: Vec<SignedOrderEntry>,
    capacity: usize,
}

impl SignedOrderStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_uuid(&self, uuid: &[u8; UUID_LEN]) -> bool {
        self.entries.iter().any(|e| &e.uuid == uuid)
    }

    pub fn find_by_uuid(&self, uuid: &[u8; UUID_LEN]) -> Option<&SignedOrderEntry> {
        self.entries.iter().find(|e| &e.uuid == uuid)
    }

    pub fn insert(&mut self, entry: SignedOrderEntry) -> Result<(), SignedOrderStoreError> {
        if self.contains_uuid(&entry.uuid) {
            return Err(SignedOrderStoreError::Replay);
        }
        if self.entries.len() >= self.capacity {
            return Err(SignedOrderStoreError::Full(self.capacity));
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[SignedOrderEntry] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MarketIndex;
    use rust_decimal_macros::dec;

    fn message() -> SignedOrderMessage {
        SignedOrderMessage {
            sub_account_id: SubAccountId(0),
            order_params: OrderParams::market(
                MarketIndex(0),
                PositionDirection::Long,
                dec!(1_000_000_000),
            )
            .with_auction(dec!(223), dec!(224), 10),
            sequence_number: Tick(100),
            uuid: *b"abcd1234",
            take_profit_params: None,
            stop_loss_params: None,
        }
    }

    #[test]
    fn signing_bytes_are_stable() {
        let msg = message();
        assert_eq!(msg.to_signing_bytes(), msg.to_signing_bytes());
    }

    #[test]
    fn signing_bytes_differ_per_field() {
        let msg = message();
        let mut other = message();
        other.uuid = *b"zzzz9999";
        assert_ne!(msg.to_signing_bytes(), other.to_signing_bytes());

        let mut other = message();
        other.sequence_number = Tick(101);
        assert_ne!(msg.to_signing_bytes(), other.to_signing_bytes());
    }

    #[test]
    fn mock_signature_roundtrip() {
        let authority = Authority([3u8; 32]);
        let signer = Sha256Signer::new(authority);
        let bytes = message().to_signing_bytes();
        let sig = signer.sign(&bytes);

        let verifier = Sha256Verifier;
        assert!(verifier.verify(&bytes, &sig, &authority));
        assert!(!verifier.verify(&bytes, &sig, &Authority([4u8; 32])));

        let mut tampered = bytes.clone();
        tampered[0] ^= 1;
        assert!(!verifier.verify(&tampered, &sig, &authority));
    }

    #[test]
    fn digest_is_deterministic() {
        let sig = Sha256Signer::new(Authority([1u8; 32])).sign(b"payload");
        assert_eq!(digest(&sig.0), digest(&sig.0));
        let other = Sha256Signer::new(Authority([2u8; 32])).sign(b"payload");
        assert_ne!(digest(&sig.0), digest(&other.0));
    }

    #[test]
    fn store_rejects_replay_and_overflow() {
        let mut store = SignedOrderStore::new(2);
        let entry = |uuid: [u8; 8], id: u32| SignedOrderEntry {
            uuid,
            hash: [0u8; 32],
            sequence_number: Tick(0),
            order_id: OrderId(id),
        };

        store.insert(entry(*b"aaaaaaaa", 1)).unwrap();
        assert_eq!(
            store.insert(entry(*b"aaaaaaaa", 2)),
            Err(SignedOrderStoreError::Replay)
        );
        store.insert(entry(*b"bbbbbbbb", 2)).unwrap();
        assert_eq!(
            store.insert(entry(*b"cccccccc", 3)),
            Err(SignedOrderStoreError::Full(2))
        );
    }
}
