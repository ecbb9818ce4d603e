use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::retry::{RetryPolicy, retry};
use common::{LedgerEntry, RecordId};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::abi::{Decoder, Token, encode_call, offset};
use crate::client::{CommitReceipt, LedgerClient, NewLedgerRecord};
use crate::error::LedgerError;
use crate::rpc::{RpcClient, decode_hex, encode_hex, parse_quantity, quantity};
use crate::tx::{Address, LegacyTransaction};
use crate::wallet::Wallet;

const CREATE_RECORD: &str = "createFIR(string,string,uint256,string)";
const GET_ALL_RECORDS: &str = "getAllFIRs()";
const GET_RECORD: &str = "getFIR(uint256)";

const WORD: usize = 32;

#[derive(Debug, Clone)]
pub struct EvmSettings {
    pub rpc_url: String,
    pub contract_address: String,
    /// Hex-encoded secp256k1 private key of the submitting account.
    pub private_key: String,
    /// Skip the `eth_chainId` lookup when set.
    pub chain_id: Option<u64>,
    pub rpc_timeout: Duration,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
    /// Gas limit = estimate * percent / 100.
    pub gas_limit_percent: u64,
    pub retry: RetryPolicy,
}

/// Ledger client for the registry contract on an EVM chain.
pub struct EvmLedgerClient {
    rpc: RpcClient,
    wallet: Wallet,
    contract: Address,
    chain_id: u64,
    confirmation_timeout: Duration,
    poll_interval: Duration,
    gas_limit_percent: u64,
    retry: RetryPolicy,
    /// Held from nonce lookup until broadcast so concurrent submits get distinct nonces.
    submit_lock: Mutex<()>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionReceipt {
    status: Option<String>,
    block_number: Option<String>,
}

impl EvmLedgerClient {
    /// Build the client, resolving the chain id from the node if not configured.
    pub async fn connect(settings: EvmSettings) -> Result<Self, LedgerError> {
        let rpc = RpcClient::new(&settings.rpc_url, settings.rpc_timeout)?;
        let wallet = Wallet::from_hex(&settings.private_key)?;
        let contract: Address = settings
            .contract_address
            .parse()
            .map_err(|e| LedgerError::Config(format!("contract address: {e}")))?;

        let chain_id = match settings.chain_id {
            Some(id) => id,
            None => {
                let raw: String = retry(&settings.retry, "eth_chainId", || {
                    rpc.call("eth_chainId", json!([]))
                })
                .await?;
                u64::try_from(parse_quantity(&raw)?)
                    .map_err(|_| LedgerError::Decode(format!("chain id {raw} out of range")))?
            }
        };

        info!(
            chain_id,
            contract = %contract,
            account = %wallet.address(),
            "Ledger client ready"
        );

        Ok(Self {
            rpc,
            wallet,
            contract,
            chain_id,
            confirmation_timeout: settings.confirmation_timeout,
            poll_interval: settings.poll_interval,
            gas_limit_percent: settings.gas_limit_percent.max(100),
            retry: settings.retry,
            submit_lock: Mutex::new(()),
        })
    }

    /// Read-only call against the contract. Retried.
    async fn eth_call(&self, data: Vec<u8>) -> Result<Vec<u8>, LedgerError> {
        let params = json!([{ "to": self.contract.to_string(), "data": encode_hex(&data) }, "latest"]);
        let raw: String = retry(&self.retry, "eth_call", || {
            self.rpc.call("eth_call", params.clone())
        })
        .await?;
        decode_hex(&raw)
    }

    async fn quantity_call(&self, method: &str, params: Value) -> Result<u128, LedgerError> {
        let raw: String = retry(&self.retry, method, || self.rpc.call(method, params.clone())).await?;
        parse_quantity(&raw)
    }

    /// Sign and broadcast a contract call; returns the transaction hash.
    ///
    /// Broadcasting is never retried: a lost response could still have been mined.
    async fn send_transaction(&self, data: Vec<u8>) -> Result<String, LedgerError> {
        let _guard = self.submit_lock.lock().await;
        let from = self.wallet.address().to_string();
        let to = self.contract.to_string();

        let nonce = self
            .quantity_call("eth_getTransactionCount", json!([from, "pending"]))
            .await?;
        let gas_price = self.quantity_call("eth_gasPrice", json!([])).await?;
        let estimate = self
            .quantity_call(
                "eth_estimateGas",
                json!([{ "from": from, "to": to, "data": encode_hex(&data) }]),
            )
            .await?;

        let tx = LegacyTransaction {
            nonce: u64::try_from(nonce)
                .map_err(|_| LedgerError::Decode(format!("nonce {nonce} out of range")))?,
            gas_price,
            gas_limit: u64::try_from(estimate * u128::from(self.gas_limit_percent) / 100)
                .map_err(|_| LedgerError::Decode(format!("gas estimate {estimate} out of range")))?,
            to: self.contract,
            value: 0,
            data,
        };
        debug!(
            nonce = tx.nonce,
            gas_price = %quantity(tx.gas_price),
            gas_limit = tx.gas_limit,
            "Broadcasting transaction"
        );

        let raw = self.wallet.sign(&tx, self.chain_id)?;
        self.rpc
            .call("eth_sendRawTransaction", json!([encode_hex(&raw)]))
            .await
    }

    /// Poll for the receipt until it appears or the confirmation window closes.
    async fn wait_for_receipt(&self, tx_hash: &str) -> Result<CommitReceipt, LedgerError> {
        let deadline = Instant::now() + self.confirmation_timeout;

        loop {
            let receipt: Option<TransactionReceipt> = retry(
                &self.retry,
                "eth_getTransactionReceipt",
                || self.rpc.call("eth_getTransactionReceipt", json!([tx_hash])),
            )
            .await?;

            if let Some(receipt) = receipt {
                let succeeded = receipt
                    .status
                    .as_deref()
                    .map(parse_quantity)
                    .transpose()?
                    .is_some_and(|status| status == 1);
                if !succeeded {
                    return Err(LedgerError::TransactionFailed {
                        tx_hash: tx_hash.to_string(),
                    });
                }
                let block_number = receipt
                    .block_number
                    .as_deref()
                    .map(parse_quantity)
                    .transpose()?
                    .and_then(|n| u64::try_from(n).ok());
                return Ok(CommitReceipt {
                    tx_hash: tx_hash.to_string(),
                    block_number,
                });
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(LedgerError::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    waited_secs: self.confirmation_timeout.as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn block_time(seconds: u64) -> Option<DateTime<Utc>> {
    if seconds == 0 {
        return None;
    }
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, 0)
}

/// Decode `getAllFIRs()`: a dynamic array of
/// `(uint256 id, string title, string description, uint256 severity, string ipfsHash, uint256 timestamp)`.
fn decode_all_records(data: &[u8]) -> Result<Vec<LedgerEntry>, LedgerError> {
    let d = Decoder::new(data);
    if d.is_empty() {
        return Ok(Vec::new());
    }
    let array = d.usize(0)?;
    let count = d.usize(array)?;
    let elements = offset(array, 1)?;

    (0..count)
        .map(|i| {
            let relative = d.usize(offset(elements, i)?)?;
            let t = elements
                .checked_add(relative)
                .ok_or_else(|| LedgerError::Decode(format!("element {i} offset overflows")))?;
            Ok(LedgerEntry {
                id: d.u64(t)?,
                title: d.string(t, offset(t, 1)?)?,
                description: d.string(t, offset(t, 2)?)?,
                severity: d.u64(offset(t, 3)?)?,
                blob_hash: d.string(t, offset(t, 4)?)?,
                created_at: block_time(d.u64(offset(t, 5)?)?),
            })
        })
        .collect()
}

/// Decode `getFIR(id)`: `(string title, string description, uint256 severity, string ipfsHash[, uint256 timestamp])`.
///
/// The head size is implied by the first string offset, which tells us whether
/// the deployed contract returns the trailing timestamp.
fn decode_single_record(id: RecordId, data: &[u8]) -> Result<Option<LedgerEntry>, LedgerError> {
    let d = Decoder::new(data);
    if d.is_empty() {
        return Ok(None);
    }
    let head_len = d.usize(0)?;
    let created_at = if head_len >= 5 * WORD {
        block_time(d.u64(4 * WORD)?)
    } else {
        None
    };

    let entry = LedgerEntry {
        id,
        title: d.string(0, 0)?,
        description: d.string(0, WORD)?,
        severity: d.u64(2 * WORD)?,
        blob_hash: d.string(0, 3 * WORD)?,
        created_at,
    };

    // Solidity returns a zeroed struct for ids that were never written.
    if entry.blob_hash.is_empty() {
        return Ok(None);
    }
    Ok(Some(entry))
}

#[async_trait]
impl LedgerClient for EvmLedgerClient {
    #[instrument(skip(self, record), fields(severity = %record.severity, blob = %record.blob_hash))]
    async fn create_record(&self, record: &NewLedgerRecord) -> Result<CommitReceipt, LedgerError> {
        let data = encode_call(
            CREATE_RECORD,
            &[
                Token::Str(&record.title),
                Token::Str(&record.description),
                Token::Uint(record.severity.level().into()),
                Token::Str(&record.blob_hash),
            ],
        );

        let tx_hash = self.send_transaction(data).await?;
        info!(tx_hash = %tx_hash, "Transaction submitted, awaiting confirmation");

        let receipt = self.wait_for_receipt(&tx_hash).await?;
        info!(tx_hash = %receipt.tx_hash, block = ?receipt.block_number, "Transaction confirmed");
        Ok(receipt)
    }

    async fn get_all_records(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let data = self.eth_call(encode_call(GET_ALL_RECORDS, &[])).await?;
        let entries = decode_all_records(&data)?;
        debug!(count = entries.len(), "Fetched ledger records");
        Ok(entries)
    }

    async fn get_record(&self, id: RecordId) -> Result<Option<LedgerEntry>, LedgerError> {
        match self
            .eth_call(encode_call(GET_RECORD, &[Token::Uint(id.into())]))
            .await
        {
            Ok(data) => decode_single_record(id, &data),
            Err(LedgerError::Reverted(reason)) => {
                debug!(id, reason = %reason, "getFIR reverted, treating as missing");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
