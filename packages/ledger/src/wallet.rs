use std::fmt;

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::abi::keccak256;
use crate::error::LedgerError;
use crate::rpc::decode_hex;
use crate::tx::{Address, LegacyTransaction};

/// Local secp256k1 signer.
pub struct Wallet {
    key: SigningKey,
    address: Address,
}

impl Wallet {
    /// Load from a hex-encoded 32-byte private key, with or without `0x`.
    pub fn from_hex(secret: &str) -> Result<Self, LedgerError> {
        let bytes = decode_hex(secret.trim())
            .map_err(|_| LedgerError::Config("private key is not valid hex".into()))?;
        let key = SigningKey::from_slice(&bytes)
            .map_err(|_| LedgerError::Config("private key is not a valid secp256k1 scalar".into()))?;
        let address = derive_address(&key);
        Ok(Self { key, address })
    }

    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign and encode a legacy transaction for `chain_id`.
    pub fn sign(&self, tx: &LegacyTransaction, chain_id: u64) -> Result<Vec<u8>, LedgerError> {
        let hash = tx.signing_hash(chain_id);
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&hash)
            .map_err(|e| LedgerError::Signing(e.to_string()))?;

        let bytes = signature.to_bytes();
        let (r, s) = bytes.split_at(32);
        let v = chain_id * 2 + 35 + u64::from(recovery_id.to_byte());
        Ok(tx.encode_signed(v, r, s))
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

fn derive_address(key: &SigningKey) -> Address {
    let point = key.verifying_key().to_encoded_point(false);
    let hash = keccak256(&point.as_bytes()[1..]);
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&hash[12..]);
    Address::from_bytes(bytes)
}
