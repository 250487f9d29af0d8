//! Esplora-style chain data access.
//!
//! Endpoints used:
//! - `GET  /address/{address}/utxo` → `[{txid, vout, value}]`
//! - `GET  /tx/{txid}`              → `{txid, vout: [{scriptpubkey, value}]}`
//! - `GET  /fee-estimates`          → `{"1": f64, "2": f64, ...}`
//! - `POST /tx` (text/plain hex)    → txid

use std::collections::HashMap;
use std::thread;
use std::time::Duration;

use bitcoin::script::ScriptBuf;
use bitcoin::{OutPoint, Txid};
use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::BtcError;
use crate::network::BtcNetwork;
use crate::utxo::Utxo;

/// Confirmation target whose estimate is used as the fee rate.
pub const FEE_TARGET_BLOCKS: &str = "1";

/// Read access to chain state plus transaction submission.
pub trait ChainDataClient {
    /// All UTXOs of `address`, each with its locking script resolved.
    /// Fails as a whole if any script lookup fails.
    fn list_utxos(&self, address: &str) -> Result<Vec<Utxo>, BtcError>;

    /// Locking script of output `vout` of transaction `txid`.
    fn script_pubkey(&self, txid: &Txid, vout: u32) -> Result<ScriptBuf, BtcError>;

    /// Fee rate in sat/vbyte for confirmation within one block.
    fn fee_rate(&self) -> Result<f64, BtcError>;

    /// Submit a serialized transaction. Returns the provider's acknowledgement.
    fn broadcast(&self, raw_tx: &[u8]) -> Result<String, BtcError>;

    /// Sum of all UTXO values for `address`.
    fn balance(&self, address: &str) -> Result<u64, BtcError> {
        Ok(self
            .list_utxos(address)?
            .iter()
            .map(|u| u.amount_sat)
            .sum())
    }
}

/// Connection settings for [`EsploraClient`].
#[derive(Debug, Clone)]
pub struct EsploraConfig {
    /// API root without trailing slash, e.g. `https://blockstream.info/testnet/api`.
    pub base_url: String,
    /// Per-request timeout; expiry surfaces as [`BtcError::Network`].
    pub timeout: Duration,
    /// Extra attempts for GET requests that fail transiently.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on every further retry.
    pub initial_backoff: Duration,
    /// Honour `HTTP(S)_PROXY` environment variables.
    pub use_system_proxy: bool,
}

impl EsploraConfig {
    pub fn for_network(network: BtcNetwork) -> Self {
        Self {
            base_url: network.default_api_url().to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            use_system_proxy: true,
        }
    }
}

impl Default for EsploraConfig {
    fn default() -> Self {
        Self::for_network(BtcNetwork::Testnet)
    }
}

/// Blocking HTTP client for an Esplora API.
pub struct EsploraClient {
    http: Client,
    config: EsploraConfig,
}

impl EsploraClient {
    pub fn new(config: EsploraConfig) -> Result<Self, BtcError> {
        let mut builder = Client::builder().timeout(config.timeout);
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|e| BtcError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &EsploraConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.config
            .initial_backoff
            .saturating_mul(1u32 << attempt.min(16))
    }

    /// GET `path`, retrying transient failures with exponential backoff.
    fn get_text(&self, path: &str) -> Result<String, BtcError> {
        let url = self.url(path);
        let mut attempt = 0;
        loop {
            debug!(%url, attempt, "GET");
            match self.get_once(&url) {
                Ok(body) => return Ok(body),
                Err(e) if e.is_transient() && attempt < self.config.max_retries => {
                    let delay = self.backoff(attempt);
                    warn!(%url, attempt, error = %e, ?delay, "transient failure, retrying");
                    thread::sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn get_once(&self, url: &str) -> Result<String, BtcError> {
        let response = self.http.get(url).send().map_err(transport_error)?;
        let (status, body) = read_body(response)?;
        if status.is_success() {
            Ok(body)
        } else if status == StatusCode::NOT_FOUND {
            Err(BtcError::NotFound(format!("{url}: {}", body.trim())))
        } else {
            Err(BtcError::HttpStatus {
                status: status.as_u16(),
                body,
            })
        }
    }
}

impl ChainDataClient for EsploraClient {
    fn list_utxos(&self, address: &str) -> Result<Vec<Utxo>, BtcError> {
        let body = self.get_text(&format!("/address/{address}/utxo"))?;
        let entries = parse_utxo_list(&body)?;

        let mut utxos = Vec::with_capacity(entries.len());
        for entry in entries {
            let txid: Txid = entry
                .txid
                .parse()
                .map_err(|e| BtcError::Decode(format!("invalid txid {}: {e}", entry.txid)))?;
            let script_pubkey = self.script_pubkey(&txid, entry.vout)?;
            utxos.push(Utxo {
                outpoint: OutPoint::new(txid, entry.vout),
                amount_sat: entry.value,
                script_pubkey,
            });
        }

        info!(address, count = utxos.len(), "fetched UTXOs");
        Ok(utxos)
    }

    fn script_pubkey(&self, txid: &Txid, vout: u32) -> Result<ScriptBuf, BtcError> {
        let body = self.get_text(&format!("/tx/{txid}"))?;
        parse_script_pubkey(&body, vout)
    }

    fn fee_rate(&self) -> Result<f64, BtcError> {
        let body = self.get_text("/fee-estimates")?;
        let rate = parse_fee_rate(&body)?;
        info!(fee_rate = rate, target_blocks = FEE_TARGET_BLOCKS, "fetched fee rate");
        Ok(rate)
    }

    /// Not retried: the outcome of a failed submission is reported as-is.
    fn broadcast(&self, raw_tx: &[u8]) -> Result<String, BtcError> {
        let url = self.url("/tx");
        debug!(%url, bytes = raw_tx.len(), "POST");
        let response = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, "text/plain")
            .body(hex::encode(raw_tx))
            .send()
            .map_err(transport_error)?;

        let (status, body) = read_body(response)?;
        if !status.is_success() {
            return Err(BtcError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body.trim().to_string())
    }
}

fn transport_error(e: reqwest::Error) -> BtcError {
    if e.is_timeout() {
        BtcError::Network(format!("request timed out: {e}"))
    } else {
        BtcError::Network(e.to_string())
    }
}

fn read_body(response: Response) -> Result<(StatusCode, String), BtcError> {
    let status = response.status();
    let body = response.text().map_err(transport_error)?;
    Ok((status, body))
}

#[derive(Debug, Deserialize)]
struct UtxoEntry {
    txid: String,
    vout: u32,
    value: u64,
}

#[derive(Debug, Deserialize)]
struct TxEntry {
    vout: Vec<TxOutEntry>,
}

#[derive(Debug, Deserialize)]
struct TxOutEntry {
    scriptpubkey: String,
}

fn parse_utxo_list(body: &str) -> Result<Vec<UtxoEntry>, BtcError> {
    serde_json::from_str(body).map_err(|e| BtcError::Decode(format!("failed to decode UTXOs: {e}")))
}

fn parse_script_pubkey(body: &str, vout: u32) -> Result<ScriptBuf, BtcError> {
    let tx: TxEntry = serde_json::from_str(body)
        .map_err(|e| BtcError::Decode(format!("failed to decode transaction: {e}")))?;
    let output = tx.vout.get(vout as usize).ok_or_else(|| {
        BtcError::NotFound(format!(
            "output index {vout} out of range ({} outputs)",
            tx.vout.len()
        ))
    })?;
    let bytes = hex::decode(&output.scriptpubkey)
        .map_err(|e| BtcError::Decode(format!("failed to decode script pub key hex: {e}")))?;
    Ok(ScriptBuf::from_bytes(bytes))
}

fn parse_fee_rate(body: &str) -> Result<f64, BtcError> {
    let estimates: HashMap<String, f64> = serde_json::from_str(body)
        .map_err(|e| BtcError::Decode(format!("failed to decode fee estimates: {e}")))?;
    let rate = *estimates.get(FEE_TARGET_BLOCKS).ok_or_else(|| {
        BtcError::NotFound(format!("fee estimate for key '{FEE_TARGET_BLOCKS}'"))
    })?;
    if !rate.is_finite() || rate < 0.0 {
        return Err(BtcError::Decode(format!("unusable fee rate {rate}")));
    }
    Ok(rate)
}
