//! Command-line arguments for `btc-send`.
//!
//! Secrets are plain `String`s only until `main` moves them into
//! `SecretString`. `Cli` has no `Debug` impl.

use chain_btc::network::BtcNetwork;
use clap::Parser;
use wallet_core::DerivationPolicy;

/// Send a single payment from a BIP-39 wallet via an Esplora HTTP API.
#[derive(Parser)]
#[command(name = "btc-send", version, about)]
pub struct Cli {
    /// BIP-39 mnemonic of the sending wallet.
    #[arg(long, env = "BTC_SEND_MNEMONIC", hide_env_values = true)]
    pub mnemonic: String,

    /// Optional BIP-39 passphrase.
    #[arg(long, env = "BTC_SEND_PASSPHRASE", hide_env_values = true, default_value = "")]
    pub passphrase: String,

    /// Recipient address.
    #[arg(long, env = "BTC_SEND_TO")]
    pub to: String,

    /// Amount to pay, in satoshis.
    #[arg(long, env = "BTC_SEND_AMOUNT_SAT", value_parser = clap::value_parser!(u64).range(1..))]
    pub amount_sat: u64,

    /// mainnet, testnet or signet.
    #[arg(long, env = "BTC_SEND_NETWORK", default_value = "testnet")]
    pub network: BtcNetwork,

    /// Esplora API root. Defaults to the public endpoint for the network.
    #[arg(long, env = "BTC_SEND_API_URL")]
    pub api_url: Option<String>,

    /// BIP-43 purpose: 84 for P2WPKH, 44 for P2PKH.
    #[arg(long, default_value_t = 84)]
    pub purpose: u32,

    #[arg(long, default_value_t = 0)]
    pub coin_type: u32,

    #[arg(long, default_value_t = 0)]
    pub account: u32,

    #[arg(long, default_value_t = 0)]
    pub index: u32,

    /// Per-request HTTP timeout in seconds.
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Retries for transient GET failures. Broadcast is never retried.
    #[arg(long, default_value_t = 3)]
    pub max_retries: u32,

    /// Build and sign, print the transaction, do not broadcast.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    pub fn policy(&self) -> DerivationPolicy {
        DerivationPolicy {
            purpose: self.purpose,
            coin_type: self.coin_type,
            account: self.account,
            change: 0,
            index: self.index,
        }
    }
}
