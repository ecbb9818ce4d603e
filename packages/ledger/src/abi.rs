//! Solidity ABI encoding for the handful of types the registry contract uses.

use sha3::{Digest, Keccak256};

use crate::error::LedgerError;

const WORD: usize = 32;

pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// First four bytes of the Keccak hash of a function signature.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Call argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Uint(u128),
    Str(&'a str),
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

fn padded_len(len: usize) -> usize {
    len.div_ceil(WORD) * WORD
}

/// Encode `selector ++ args` for a contract call.
pub fn encode_call(signature: &str, args: &[Token<'_>]) -> Vec<u8> {
    let head_len = args.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for arg in args {
        match arg {
            Token::Uint(value) => head.extend_from_slice(&uint_word(*value)),
            Token::Str(s) => {
                head.extend_from_slice(&uint_word((head_len + tail.len()) as u128));
                tail.extend_from_slice(&uint_word(s.len() as u128));
                tail.extend_from_slice(s.as_bytes());
                tail.resize(tail.len() + padded_len(s.len()) - s.len(), 0);
            }
        }
    }

    let mut out = Vec::with_capacity(4 + head.len() + tail.len());
    out.extend_from_slice(&selector(signature));
    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
    out
}

/// Byte position `words` words past `base`, failing instead of overflowing.
pub fn offset(base: usize, words: usize) -> Result<usize, LedgerError> {
    words
        .checked_mul(WORD)
        .and_then(|bytes| base.checked_add(bytes))
        .ok_or_else(|| LedgerError::Decode(format!("offset {base} + {words} words overflows")))
}

/// Bounds-checked reader over ABI-encoded return data.
///
/// All offsets are byte positions in `data`.
pub struct Decoder<'a> {
    data: &'a [u8],
}

impl<'a> Decoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn slice(&self, at: usize, len: usize) -> Result<&'a [u8], LedgerError> {
        at.checked_add(len)
            .and_then(|end| self.data.get(at..end))
            .ok_or_else(|| {
                LedgerError::Decode(format!(
                    "return data too short: need {len} bytes at {at}, have {}",
                    self.data.len()
                ))
            })
    }

    pub fn uint(&self, at: usize) -> Result<u128, LedgerError> {
        let word = self.slice(at, WORD)?;
        if word[..16].iter().any(|&b| b != 0) {
            return Err(LedgerError::Decode(format!(
                "integer at {at} does not fit in 128 bits"
            )));
        }
        let mut low = [0u8; 16];
        low.copy_from_slice(&word[16..]);
        Ok(u128::from_be_bytes(low))
    }

    pub fn u64(&self, at: usize) -> Result<u64, LedgerError> {
        u64::try_from(self.uint(at)?)
            .map_err(|_| LedgerError::Decode(format!("integer at {at} does not fit in 64 bits")))
    }

    /// Read a word that holds an offset or length.
    pub fn usize(&self, at: usize) -> Result<usize, LedgerError> {
        usize::try_from(self.u64(at)?)
            .map_err(|_| LedgerError::Decode(format!("offset at {at} out of range")))
    }

    /// Read a dynamic string whose offset (relative to `base`) sits at `head`.
    pub fn string(&self, base: usize, head: usize) -> Result<String, LedgerError> {
        let start = base
            .checked_add(self.usize(head)?)
            .ok_or_else(|| LedgerError::Decode("string offset overflow".into()))?;
        let len = self.usize(start)?;
        let bytes = self.slice(offset(start, 1)?, len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| LedgerError::Decode(format!("string at {start} is not UTF-8: {e}")))
    }
}
