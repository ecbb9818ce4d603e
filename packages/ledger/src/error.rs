use common::retry::Transient;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger RPC unreachable: {0}")]
    Transport(String),

    #[error("ledger RPC returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("ledger RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("contract call reverted: {0}")]
    Reverted(String),

    #[error("transaction {tx_hash} failed on chain")]
    TransactionFailed { tx_hash: String },

    #[error("transaction {tx_hash} not confirmed within {waited_secs}s")]
    ConfirmationTimeout { tx_hash: String, waited_secs: u64 },

    #[error("malformed ledger data: {0}")]
    Decode(String),

    #[error("signing failed: {0}")]
    Signing(String),

    #[error("invalid ledger configuration: {0}")]
    Config(String),
}

impl Transient for LedgerError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            // -32005: request limit exceeded on hosted providers
            Self::Rpc { code, .. } => *code == -32005,
            _ => false,
        }
    }
}
