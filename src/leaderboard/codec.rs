//! Byte encoding of ordering keys for stores that only sort opaque values.
//!
//! Layout: 8 bytes of score, 8 bytes of attainment, then the identifier.
//! Plain byte-wise comparison of two encodings agrees with [`OrderingKey`]'s
//! ordering, and decoding gives back the exact triple.
//!
//! Meant for a [`Ranking`](super::Ranking) implementation backed by an
//! external sorted-set store, which keeps `SortKey`s as members and ranks by
//! their byte order.

use std::sync::Arc;

use thiserror::Error;

use super::{clock::Attainment, key::OrderingKey};

const SCORE_LEN: usize = 8;
const ATTAINED_LEN: usize = 8;
const HEADER_LEN: usize = SCORE_LEN + ATTAINED_LEN;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("sort key is {0} bytes, expected at least 16")]
    TooShort(usize),
    #[error("sort key identifier is not UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct SortKey(Vec<u8>);

impl SortKey {
    pub fn encode(key: &OrderingKey) -> Self {
        let mut bytes = Vec::with_capacity(HEADER_LEN + key.id.len());
        bytes.extend_from_slice(&encode_score(key.score).to_be_bytes());
        bytes.extend_from_slice(&key.attained.ticks().to_be_bytes());
        bytes.extend_from_slice(key.id.as_bytes());
        SortKey(bytes)
    }

    pub fn decode(&self) -> Result<OrderingKey, DecodeError> {
        if self.0.len() < HEADER_LEN {
            return Err(DecodeError::TooShort(self.0.len()));
        }

        let (score, rest) = self.0.split_at(SCORE_LEN);
        let (attained, id) = rest.split_at(ATTAINED_LEN);

        let score = decode_score(u64::from_be_bytes(to_array(score)));
        let attained = Attainment::from_ticks(u64::from_be_bytes(to_array(attained)));
        let id = std::str::from_utf8(id)?;

        Ok(OrderingKey::new(score, attained, Arc::from(id)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for SortKey {
    fn from(bytes: Vec<u8>) -> Self {
        SortKey(bytes)
    }
}

impl From<&OrderingKey> for SortKey {
    fn from(key: &OrderingKey) -> Self {
        SortKey::encode(key)
    }
}

fn to_array(bytes: &[u8]) -> [u8; 8] {
    let mut array = [0; 8];
    array.copy_from_slice(bytes);
    array
}

// Flipping the sign bit sorts i64 as unsigned; inverting puts high scores first.
fn encode_score(score: i64) -> u64 {
    !((score as u64) ^ (1 << 63))
}

fn decode_score(encoded: u64) -> i64 {
    ((!encoded) ^ (1 << 63)) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(score: i64, attained: u64, id: &str) -> OrderingKey {
        OrderingKey::new(score, Attainment::from_ticks(attained), Arc::from(id))
    }

    #[test]
    fn byte_order_matches_key_order() {
        let mut keys = vec![
            key(i64::MAX, 0, "max"),
            key(i64::MIN, 0, "min"),
            key(0, 0, ""),
            key(-1, 7, "neg"),
            key(1, 7, "pos"),
            key(1, 3, "pos"),
            key(1, 3, "po"),
            key(1, 3, "pos2"),
            key(1, u64::MAX, "late"),
            key(1 << 40, 1 << 50, "large"),
        ];
        keys.sort();

        let mut encoded: Vec<_> = keys.iter().map(SortKey::encode).collect();
        encoded.sort();

        let decoded: Vec<_> = encoded.iter().map(|k| k.decode().unwrap()).collect();
        assert_eq!(decoded, keys);
    }

    #[test]
    fn exact_round_trip_at_extremes() {
        for score in [i64::MIN, -1, 0, 1, i64::MAX, (1 << 53) + 1] {
            let original = key(score, u64::MAX - 1, "名前");
            assert_eq!(SortKey::encode(&original).decode(), Ok(original));
        }
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(
            SortKey::from(vec![0; 5]).decode(),
            Err(DecodeError::TooShort(5))
        );

        let mut bytes = SortKey::encode(&key(1, 1, "")).as_bytes().to_vec();
        bytes.push(0xff);
        assert!(matches!(
            SortKey::from(bytes).decode(),
            Err(DecodeError::Utf8(_))
        ));
    }
}
