//! # btc-send
//!
//! Derives a single-key wallet from a mnemonic, builds and signs one payment
//! with change back to the wallet, and broadcasts it through Esplora. The
//! result is printed to stdout as JSON; logs go to stderr.

mod cli;
mod logging;

use std::time::Duration;

use anyhow::{Context, Result};
use chain_btc::client::{EsploraClient, EsploraConfig};
use clap::Parser;
use secrecy::{ExposeSecret, SecretString};
use wallet_core::Wallet;

use cli::Cli;
use logging::LogFormat;

fn main() -> Result<()> {
    let mut cli = Cli::parse();

    let format = if cli.log_json {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    logging::init_logging("info", format);

    let mnemonic = SecretString::from(std::mem::take(&mut cli.mnemonic));
    let passphrase = SecretString::from(std::mem::take(&mut cli.passphrase));

    let wallet = Wallet::from_mnemonic(
        mnemonic.expose_secret(),
        passphrase.expose_secret(),
        cli.policy(),
        cli.network,
    )
    .context("failed to derive wallet")?;
    drop(mnemonic);
    drop(passphrase);

    let mut config = EsploraConfig::for_network(cli.network);
    if let Some(url) = cli.api_url.take() {
        config.base_url = url;
    }
    config.timeout = Duration::from_secs(cli.timeout_secs);
    config.max_retries = cli.max_retries;

    tracing::info!(
        address = wallet.address(),
        network = %cli.network,
        api = %config.base_url,
        to = %cli.to,
        amount_sat = cli.amount_sat,
        "preparing payment"
    );

    let client = EsploraClient::new(config).context("failed to build HTTP client")?;

    let built = wallet
        .create_transaction(&client, &cli.to, cli.amount_sat)
        .context("failed to build transaction")?;
    tracing::info!(
        txid = %built.txid,
        fee_sat = built.fee_sat,
        change_sat = built.change_sat,
        vsize = built.vsize,
        "transaction signed"
    );

    if cli.dry_run {
        println!("{}", serde_json::to_string_pretty(&built)?);
        return Ok(());
    }

    let receipt = wallet
        .broadcast(&client, &built)
        .context("failed to broadcast transaction")?;
    if receipt.response != receipt.txid {
        tracing::warn!(
            local = %receipt.txid,
            remote = %receipt.response,
            "provider acknowledged a different txid"
        );
    }
    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}
