#![allow(dead_code)]

use anchor_settlement::application::service::SettlementService;
use anchor_settlement::config::{AnchorConfig, HotWalletSecret, TESTNET_PASSPHRASE};
use anchor_settlement::domain::ledger::{
    LedgerAsset, LedgerOperation, LedgerTransaction, OperationAsset,
};
use anchor_settlement::infrastructure::in_memory::{InMemoryLedger, InMemoryTransactionStore};
use assert_cmd::cargo_bin;
use ed25519_dalek::SigningKey;
use rust_decimal::Decimal;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

/// A deterministic strkey-encoded keypair: (secret seed, account id).
pub fn keypair(seed: u8) -> (String, String) {
    let signing = SigningKey::from_bytes(&[seed; 32]);
    let secret = stellar_strkey::ed25519::PrivateKey([seed; 32]).to_string();
    let account =
        stellar_strkey::ed25519::PublicKey(signing.verifying_key().to_bytes()).to_string();
    (secret, account)
}

pub fn hot_wallet() -> String {
    keypair(1).1
}

pub fn issuer() -> String {
    keypair(2).1
}

pub fn receiving_account() -> String {
    keypair(3).1
}

pub fn user_account() -> String {
    keypair(4).1
}

pub fn usdc() -> LedgerAsset {
    LedgerAsset::new("USDC", issuer())
}

pub fn config(horizon_url: &str) -> AnchorConfig {
    let (secret, hot) = keypair(1);
    AnchorConfig {
        horizon_url: horizon_url.to_string(),
        network_passphrase: TESTNET_PASSPHRASE.to_string(),
        hot_wallet_secret: Some(HotWalletSecret::new(secret)),
        hot_wallet_account: hot,
        asset: usdc(),
        receiving_account: receiving_account(),
        submission_timeout: Duration::from_secs(5),
    }
}

pub struct Harness {
    pub store: InMemoryTransactionStore,
    pub ledger: InMemoryLedger,
    pub service: SettlementService,
}

/// A settlement service wired to in-memory storage and ledger.
pub fn harness() -> Harness {
    let store = InMemoryTransactionStore::new();
    let ledger = InMemoryLedger::new(hot_wallet());
    let service = SettlementService::new(
        &config("http://localhost"),
        Arc::new(store.clone()),
        Arc::new(ledger.clone()),
    );
    Harness {
        store,
        ledger,
        service,
    }
}

/// Records a ledger transaction in which `from` pays `amount` of `asset` to the receiving account.
pub async fn record_user_payment(
    ledger: &InMemoryLedger,
    hash: &str,
    from: &str,
    asset: &LedgerAsset,
    amount: Decimal,
) {
    ledger
        .record_transaction(
            LedgerTransaction {
                hash: hash.to_string(),
                successful: true,
                source_account: from.to_string(),
                memo: None,
            },
            vec![LedgerOperation::Payment {
                id: format!("{hash}-1"),
                from: from.to_string(),
                to: receiving_account(),
                asset: OperationAsset::Credit {
                    code: asset.code.clone(),
                    issuer: asset.issuer.clone(),
                },
                amount,
            }],
        )
        .await;
}

/// The `anchorctl` binary with a complete environment pointing at `horizon_url`.
pub fn anchorctl(horizon_url: &str) -> Command {
    let (secret, hot) = keypair(1);
    let mut cmd = Command::new(cargo_bin!("anchorctl"));
    cmd.env("HORIZON_URL", horizon_url)
        .env("NETWORK_PASSPHRASE", TESTNET_PASSPHRASE)
        .env("HOT_WALLET_SECRET", secret)
        .env("HOT_WALLET_ACCOUNT", hot)
        .env("ASSET_CODE", "USDC")
        .env("ASSET_ISSUER", issuer())
        .env("RECEIVING_ACCOUNT", receiving_account())
        .env("RUST_LOG", "warn");
    cmd
}
