use std::fmt;
use std::str::FromStr;

use crate::abi::keccak256;
use crate::error::LedgerError;
use crate::rlp;
use crate::rpc::decode_hex;

/// 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Address([u8; 20]);

impl Address {
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_hex(s.trim())?;
        let bytes: [u8; 20] = bytes.try_into().map_err(|v: Vec<u8>| {
            LedgerError::Config(format!("address must be 20 bytes, got {}", v.len()))
        })?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Pre-EIP-1559 transaction, signed with EIP-155 replay protection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    fn fields(&self) -> Vec<Vec<u8>> {
        vec![
            rlp::encode_u64(self.nonce),
            rlp::encode_u128(self.gas_price),
            rlp::encode_u64(self.gas_limit),
            rlp::encode_bytes(self.to.as_bytes()),
            rlp::encode_u128(self.value),
            rlp::encode_bytes(&self.data),
        ]
    }

    /// Hash to sign: `keccak(rlp([nonce, gasPrice, gas, to, value, data, chainId, 0, 0]))`.
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let mut fields = self.fields();
        fields.push(rlp::encode_u64(chain_id));
        fields.push(rlp::encode_bytes(&[]));
        fields.push(rlp::encode_bytes(&[]));
        keccak256(&rlp::encode_list(&fields))
    }

    /// Raw transaction bytes for `eth_sendRawTransaction`.
    pub fn encode_signed(&self, v: u64, r: &[u8], s: &[u8]) -> Vec<u8> {
        let mut fields = self.fields();
        fields.push(rlp::encode_u64(v));
        fields.push(rlp::encode_uint_bytes(r));
        fields.push(rlp::encode_uint_bytes(s));
        rlp::encode_list(&fields)
    }
}
