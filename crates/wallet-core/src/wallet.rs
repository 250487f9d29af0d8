//! Single-key Bitcoin wallet: derive once, then list, select, assemble, sign,
//! serialize and broadcast through a [`ChainDataClient`].

use bitcoin::Transaction;
use chain_btc::address::{address_to_script_pubkey, parse_address};
use chain_btc::client::ChainDataClient;
use chain_btc::error::BtcError;
use chain_btc::network::BtcNetwork;
use chain_btc::serialize::serialize_signed;
use chain_btc::signer::{sign_transaction, LocalKeySigner, SignatureProvider};
use chain_btc::transaction::assemble_transaction;
use chain_btc::utxo::select_utxos_for_payment;
use serde::Serialize;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::error::{Stage, WalletError};
use crate::hd_derivation::derive;
use crate::types::{AddressType, DerivationPolicy};

/// A signed, serialized transaction that has not been broadcast yet.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltTransaction {
    #[serde(skip)]
    pub tx: Transaction,
    #[serde(skip)]
    pub raw: Vec<u8>,
    pub raw_hex: String,
    pub txid: String,
    pub amount_sat: u64,
    pub fee_sat: u64,
    pub change_sat: u64,
    pub input_count: usize,
    pub vsize: usize,
}

/// Outcome of a successful broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendReceipt {
    /// Locally computed transaction id.
    pub txid: String,
    /// What the provider answered, normally the same txid.
    pub response: String,
}

pub struct Wallet {
    private_key: Zeroizing<[u8; 32]>,
    public_key: [u8; 33],
    address: String,
    address_type: AddressType,
    network: BtcNetwork,
    policy: DerivationPolicy,
}

impl Wallet {
    /// Derive the wallet key along `policy`. Runs BIP-39/BIP-32 exactly once.
    pub fn from_mnemonic(
        mnemonic: &str,
        passphrase: &str,
        policy: DerivationPolicy,
        network: BtcNetwork,
    ) -> Result<Self, WalletError> {
        let account = derive(mnemonic, passphrase, &policy, network)?;
        Ok(Self {
            private_key: Zeroizing::new(account.key.private_key),
            public_key: account.key.public_key_compressed,
            address: account.address.clone(),
            address_type: account.address_type,
            network,
            policy,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn address_type(&self) -> AddressType {
        self.address_type
    }

    pub fn network(&self) -> BtcNetwork {
        self.network
    }

    pub fn policy(&self) -> &DerivationPolicy {
        &self.policy
    }

    pub fn public_key(&self) -> &[u8; 33] {
        &self.public_key
    }

    /// Signer over the wallet's own key.
    pub fn signer(&self) -> Result<LocalKeySigner, WalletError> {
        LocalKeySigner::from_bytes(&self.private_key)
            .map_err(|e| WalletError::InvalidPrivateKey(e.to_string()))
    }

    /// Confirmed plus unconfirmed value held by the wallet address.
    pub fn balance(&self, client: &dyn ChainDataClient) -> Result<u64, WalletError> {
        client
            .balance(&self.address)
            .map_err(Stage::ListUtxos.wrap())
    }

    /// Build and sign a payment of `amount_sat` to `payee`, change back to self.
    pub fn create_transaction(
        &self,
        client: &dyn ChainDataClient,
        payee: &str,
        amount_sat: u64,
    ) -> Result<BuiltTransaction, WalletError> {
        let signer = self.signer()?;
        self.create_transaction_with(client, &signer, payee, amount_sat)
    }

    /// Same as [`Wallet::create_transaction`] with an external signature
    /// provider. The provider must hold the wallet's key.
    pub fn create_transaction_with(
        &self,
        client: &dyn ChainDataClient,
        signer: &dyn SignatureProvider,
        payee: &str,
        amount_sat: u64,
    ) -> Result<BuiltTransaction, WalletError> {
        let payee_script = parse_address(payee, self.network)
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))?
            .script_pubkey();
        let change_script = address_to_script_pubkey(&self.address, self.network)
            .map_err(|e| WalletError::InvalidAddress(e.to_string()))?;

        let utxos = client
            .list_utxos(&self.address)
            .map_err(Stage::ListUtxos.wrap())?;
        debug!(address = %self.address, count = utxos.len(), "listed wallet UTXOs");

        let fee_rate = client.fee_rate().map_err(Stage::FeeRate.wrap())?;
        debug!(fee_rate, "fetched fee rate");

        let (selection, fee_sat) =
            select_utxos_for_payment(&utxos, amount_sat, fee_rate, &[payee_script, change_script]);
        if selection.is_empty() {
            return Err(Stage::Select.wrap()(BtcError::InsufficientFunds {
                available_sat: 0,
                required_sat: amount_sat.saturating_add(fee_sat),
            }));
        }
        info!(
            inputs = selection.selected.len(),
            total_sat = selection.total_sat,
            fee_sat,
            "selected UTXOs"
        );

        let unsigned = assemble_transaction(
            payee,
            amount_sat,
            &selection,
            fee_sat,
            &self.address,
            self.network,
        )
        .map_err(Stage::Assemble.wrap())?;
        let change_sat = unsigned.change_sat();

        let tx = sign_transaction(&unsigned, signer).map_err(Stage::Sign.wrap())?;
        let raw = serialize_signed(&tx).map_err(Stage::Serialize.wrap())?;
        let txid = tx.compute_txid().to_string();
        debug!(%txid, bytes = raw.len(), "signed transaction");

        Ok(BuiltTransaction {
            raw_hex: hex::encode(&raw),
            vsize: tx.vsize(),
            input_count: tx.input.len(),
            tx,
            raw,
            txid,
            amount_sat,
            fee_sat,
            change_sat,
        })
    }

    /// Submit a previously built transaction.
    pub fn broadcast(
        &self,
        client: &dyn ChainDataClient,
        built: &BuiltTransaction,
    ) -> Result<SendReceipt, WalletError> {
        let response = client
            .broadcast(&built.raw)
            .map_err(Stage::Broadcast.wrap())?;
        info!(txid = %built.txid, "broadcast accepted");
        Ok(SendReceipt {
            txid: built.txid.clone(),
            response,
        })
    }

    /// Build, sign and broadcast in one go.
    pub fn send(
        &self,
        client: &dyn ChainDataClient,
        payee: &str,
        amount_sat: u64,
    ) -> Result<SendReceipt, WalletError> {
        let built = self.create_transaction(client, payee, amount_sat)?;
        self.broadcast(client, &built)
    }
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("network", &self.network)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
