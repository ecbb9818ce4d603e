//! Client for the on-chain record registry.
//!
//! [`LedgerClient`] is the seam the server depends on; [`EvmLedgerClient`]
//! talks to the deployed contract over Ethereum JSON-RPC and signs its own
//! transactions.

pub mod abi;
pub mod client;
pub mod error;
pub mod evm;
mod rlp;
pub mod rpc;
pub mod tx;
pub mod wallet;

pub use client::{CommitReceipt, LedgerClient, NewLedgerRecord};
pub use error::LedgerError;
pub use evm::{EvmLedgerClient, EvmSettings};
