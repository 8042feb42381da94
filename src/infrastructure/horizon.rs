//! Stellar Horizon implementation of [`LedgerClient`].
//!
//! Reads go straight to the Horizon REST endpoints. Payments are assembled as
//! XDR envelopes locally, signed with the hot wallet key and posted to
//! `/transactions`; the signing key never leaves this module.

use crate::config::AnchorConfig;
use crate::domain::ledger::{
    LedgerAsset, LedgerOperation, LedgerTransaction, OperationAsset, PaymentRequest,
};
use crate::domain::ports::LedgerClient;
use crate::error::LedgerError;
use async_trait::async_trait;
use base64::Engine;
use ed25519_dalek::{Signer, SigningKey};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use stellar_xdr::curr::{self as xdr, Limits, WriteXdr};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Fee per operation used when `/fee_stats` cannot be read, in stroops.
pub const FALLBACK_BASE_FEE: u32 = 100;
/// Stellar amounts carry seven decimal places.
const STROOPS_PER_UNIT: i64 = 10_000_000;
/// Horizon pages operations; a payment transaction has at most 100.
const OPERATIONS_PAGE_LIMIT: u32 = 200;

#[derive(Debug, Deserialize)]
struct AccountResponse {
    sequence: String,
    balances: Vec<BalanceLine>,
}

#[derive(Debug, Deserialize)]
struct BalanceLine {
    balance: String,
    asset_type: String,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TransactionResponse {
    hash: String,
    successful: bool,
    source_account: String,
    memo: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OperationsPage {
    #[serde(rename = "_embedded")]
    embedded: Embedded,
}

#[derive(Debug, Deserialize)]
struct Embedded {
    records: Vec<OperationRecord>,
}

#[derive(Debug, Deserialize)]
struct OperationRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    from: Option<String>,
    to: Option<String>,
    asset_type: Option<String>,
    asset_code: Option<String>,
    asset_issuer: Option<String>,
    amount: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeeStats {
    last_ledger_base_fee: String,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    hash: String,
}

#[derive(Debug, Default, Deserialize)]
struct SubmitProblem {
    title: Option<String>,
    extras: Option<ProblemExtras>,
}

#[derive(Debug, Deserialize)]
struct ProblemExtras {
    result_codes: Option<ResultCodes>,
}

#[derive(Debug, Deserialize)]
struct ResultCodes {
    transaction: Option<String>,
    operations: Option<Vec<String>>,
}

impl SubmitProblem {
    fn describe(&self) -> String {
        let codes = self.extras.as_ref().and_then(|e| e.result_codes.as_ref());
        match codes {
            Some(codes) => {
                let mut parts = Vec::new();
                if let Some(tx) = &codes.transaction {
                    parts.push(tx.clone());
                }
                if let Some(ops) = &codes.operations {
                    parts.extend(ops.iter().cloned());
                }
                parts.join(", ")
            }
            None => self
                .title
                .clone()
                .unwrap_or_else(|| "unknown rejection".to_string()),
        }
    }
}

impl OperationRecord {
    fn into_operation(self) -> Result<LedgerOperation, LedgerError> {
        if self.kind != "payment" {
            return Ok(LedgerOperation::Other {
                id: self.id,
                kind: self.kind,
            });
        }
        let asset = match self.asset_type.as_deref() {
            Some("native") => OperationAsset::Native,
            _ => OperationAsset::Credit {
                code: self.asset_code.unwrap_or_default(),
                issuer: self.asset_issuer.unwrap_or_default(),
            },
        };
        let amount = self
            .amount
            .as_deref()
            .unwrap_or("0")
            .parse::<Decimal>()
            .map_err(|e| LedgerError::Encoding(format!("operation {} amount: {e}", self.id)))?;
        Ok(LedgerOperation::Payment {
            id: self.id,
            from: self.from.unwrap_or_default(),
            to: self.to.unwrap_or_default(),
            asset,
            amount,
        })
    }
}

/// HTTP client for the Stellar Horizon API holding the hot wallet key.
pub struct HorizonLedger {
    client: Client,
    base_url: String,
    network_passphrase: String,
    hot_wallet_account: String,
    signing_key: SigningKey,
    public_key: [u8; 32],
    submission_timeout: Duration,
    // Submissions share one account sequence number.
    submit_lock: Mutex<()>,
}

impl HorizonLedger {
    pub fn new(config: &AnchorConfig) -> Result<Self, LedgerError> {
        let secret = config
            .hot_wallet_secret
            .as_ref()
            .ok_or_else(|| LedgerError::InvalidKey("HOT_WALLET_SECRET is not set".to_string()))?;
        let seed = stellar_strkey::ed25519::PrivateKey::from_string(secret.expose())
            .map_err(|_| LedgerError::InvalidKey("hot wallet secret is not a valid secret seed".to_string()))?;
        let signing_key = SigningKey::from_bytes(&seed.0);
        let public_key = signing_key.verifying_key().to_bytes();

        if decode_account(&config.hot_wallet_account)? != public_key {
            return Err(LedgerError::InvalidKey(format!(
                "hot wallet secret does not belong to {}",
                config.hot_wallet_account
            )));
        }

        let client = Client::builder()
            .timeout(config.submission_timeout)
            .build()
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.horizon_url.trim_end_matches('/').to_string(),
            network_passphrase: config.network_passphrase.clone(),
            hot_wallet_account: config.hot_wallet_account.clone(),
            signing_key,
            public_key,
            submission_timeout: config.submission_timeout,
            submit_lock: Mutex::new(()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// GETs a Horizon resource, mapping 404 to `Ok(None)`.
    async fn fetch<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, LedgerError> {
        let response = self
            .client
            .get(self.url(path))
            .send()
            .await
            .map_err(|e| LedgerError::Unavailable(e.to_string()))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(LedgerError::Unavailable(format!(
                "horizon returned {} for {path}",
                response.status()
            )));
        }
        response
            .json::<T>()
            .await
            .map(Some)
            .map_err(|e| LedgerError::Unavailable(format!("invalid horizon response: {e}")))
    }

    async fn base_fee(&self) -> u32 {
        match self.fetch::<FeeStats>("fee_stats").await {
            Ok(Some(stats)) => stats
                .last_ledger_base_fee
                .parse()
                .unwrap_or(FALLBACK_BASE_FEE),
            Ok(None) | Err(_) => {
                debug!("fee stats unavailable, using fallback base fee");
                FALLBACK_BASE_FEE
            }
        }
    }

    /// Builds and signs the payment envelope, returning it with its hash.
    fn sign_payment(
        &self,
        request: &PaymentRequest,
        sequence: i64,
        fee: u32,
    ) -> Result<(xdr::TransactionEnvelope, [u8; 32]), LedgerError> {
        let destination = decode_account(&request.destination)?;
        let operation = xdr::Operation {
            source_account: None,
            body: xdr::OperationBody::Payment(xdr::PaymentOp {
                destination: xdr::MuxedAccount::Ed25519(xdr::Uint256(destination)),
                asset: credit_asset(&request.asset)?,
                amount: to_stroops(request.amount)?,
            }),
        };

        let memo: xdr::StringM<28> = request
            .memo
            .as_bytes()
            .to_vec()
            .try_into()
            .map_err(|_| LedgerError::Encoding(format!("memo {:?} exceeds 28 bytes", request.memo)))?;

        let max_time = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| LedgerError::Encoding(e.to_string()))?
            .as_secs()
            + self.submission_timeout.as_secs();

        let tx = xdr::Transaction {
            source_account: xdr::MuxedAccount::Ed25519(xdr::Uint256(self.public_key)),
            fee,
            seq_num: xdr::SequenceNumber(sequence),
            cond: xdr::Preconditions::Time(xdr::TimeBounds {
                min_time: xdr::TimePoint(0),
                max_time: xdr::TimePoint(max_time),
            }),
            memo: xdr::Memo::Text(memo),
            operations: vec![operation]
                .try_into()
                .map_err(|_| LedgerError::Encoding("operation list".to_string()))?,
            ext: xdr::TransactionExt::V0,
        };

        let payload = xdr::TransactionSignaturePayload {
            network_id: xdr::Hash(Sha256::digest(self.network_passphrase.as_bytes()).into()),
            tagged_transaction: xdr::TransactionSignaturePayloadTaggedTransaction::Tx(tx.clone()),
        };
        let payload_bytes = payload
            .to_xdr(Limits::none())
            .map_err(|e| LedgerError::Encoding(e.to_string()))?;
        let hash: [u8; 32] = Sha256::digest(&payload_bytes).into();
        let signature = self.signing_key.sign(&hash);

        let mut hint = [0u8; 4];
        hint.copy_from_slice(&self.public_key[28..]);
        let decorated = xdr::DecoratedSignature {
            hint: xdr::SignatureHint(hint),
            signature: xdr::Signature(
                signature
                    .to_bytes()
                    .to_vec()
                    .try_into()
                    .map_err(|_| LedgerError::Encoding("signature".to_string()))?,
            ),
        };

        let envelope = xdr::TransactionEnvelope::Tx(xdr::TransactionV1Envelope {
            tx,
            signatures: vec![decorated]
                .try_into()
                .map_err(|_| LedgerError::Encoding("signature list".to_string()))?,
        });
        Ok((envelope, hash))
    }
}

fn decode_account(account: &str) -> Result<[u8; 32], LedgerError> {
    stellar_strkey::ed25519::PublicKey::from_string(account)
        .map(|key| key.0)
        .map_err(|_| LedgerError::InvalidKey(format!("{account} is not a valid account id")))
}

fn credit_asset(asset: &LedgerAsset) -> Result<xdr::Asset, LedgerError> {
    let issuer = xdr::AccountId(xdr::PublicKey::PublicKeyTypeEd25519(xdr::Uint256(
        decode_account(&asset.issuer)?,
    )));
    let code = asset.code.as_bytes();
    match code.len() {
        1..=4 => {
            let mut padded = [0u8; 4];
            padded[..code.len()].copy_from_slice(code);
            Ok(xdr::Asset::CreditAlphanum4(xdr::AlphaNum4 {
                asset_code: xdr::AssetCode4(padded),
                issuer,
            }))
        }
        5..=12 => {
            let mut padded = [0u8; 12];
            padded[..code.len()].copy_from_slice(code);
            Ok(xdr::Asset::CreditAlphanum12(xdr::AlphaNum12 {
                asset_code: xdr::AssetCode12(padded),
                issuer,
            }))
        }
        _ => Err(LedgerError::Encoding(format!(
            "asset code {:?} must be 1 to 12 characters",
            asset.code
        ))),
    }
}

/// Converts a token amount to stroops, refusing precision the ledger cannot carry.
fn to_stroops(amount: Decimal) -> Result<i64, LedgerError> {
    let scaled = amount * Decimal::from(STROOPS_PER_UNIT);
    if scaled.fract() != Decimal::ZERO || scaled <= Decimal::ZERO {
        return Err(LedgerError::Encoding(format!(
            "amount {amount} is not a positive multiple of 0.0000001"
        )));
    }
    scaled
        .to_i64()
        .ok_or_else(|| LedgerError::Encoding(format!("amount {amount} out of range")))
}

/// Ledger hashes are 32 bytes, hex encoded. Anything else never reaches a URL.
fn validate_hash(hash: &str) -> Result<(), LedgerError> {
    if hash.len() == 64 && hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        Ok(())
    } else {
        Err(LedgerError::InvalidHash(hash.to_string()))
    }
}

#[async_trait]
impl LedgerClient for HorizonLedger {
    async fn account_balance(
        &self,
        account: &str,
        asset: &LedgerAsset,
    ) -> Result<Decimal, LedgerError> {
        let response: AccountResponse = self
            .fetch(&format!("accounts/{account}"))
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account.to_string()))?;

        let line = response.balances.iter().find(|line| {
            line.asset_type != "native"
                && line.asset_code.as_deref() == Some(asset.code.as_str())
                && line.asset_issuer.as_deref() == Some(asset.issuer.as_str())
        });
        match line {
            Some(line) => line
                .balance
                .parse::<Decimal>()
                .map_err(|e| LedgerError::Encoding(format!("balance {:?}: {e}", line.balance))),
            None => Ok(Decimal::ZERO),
        }
    }

    async fn transaction(&self, hash: &str) -> Result<LedgerTransaction, LedgerError> {
        validate_hash(hash)?;
        let response: TransactionResponse = self
            .fetch(&format!("transactions/{hash}"))
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))?;
        Ok(LedgerTransaction {
            hash: response.hash,
            successful: response.successful,
            source_account: response.source_account,
            memo: response.memo,
        })
    }

    async fn transaction_operations(
        &self,
        hash: &str,
    ) -> Result<Vec<LedgerOperation>, LedgerError> {
        validate_hash(hash)?;
        let page: OperationsPage = self
            .fetch(&format!(
                "transactions/{hash}/operations?limit={OPERATIONS_PAGE_LIMIT}"
            ))
            .await?
            .ok_or_else(|| LedgerError::NotFound(hash.to_string()))?;
        page.embedded
            .records
            .into_iter()
            .map(OperationRecord::into_operation)
            .collect()
    }

    async fn submit_payment(&self, request: &PaymentRequest) -> Result<String, LedgerError> {
        let _guard = self.submit_lock.lock().await;

        let account: AccountResponse = self
            .fetch(&format!("accounts/{}", self.hot_wallet_account))
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(self.hot_wallet_account.clone()))?;
        let sequence = account
            .sequence
            .parse::<i64>()
            .map_err(|e| LedgerError::Encoding(format!("sequence {:?}: {e}", account.sequence)))?
            + 1;
        let fee = self.base_fee().await;

        let (envelope, hash) = self.sign_payment(request, sequence, fee)?;
        let hash = hex::encode(hash);
        let envelope_xdr = base64::engine::general_purpose::STANDARD.encode(
            envelope
                .to_xdr(Limits::none())
                .map_err(|e| LedgerError::Encoding(e.to_string()))?,
        );

        info!(ledger_tx = %hash, destination = %request.destination, amount = %request.amount, "submitting payment");
        let response = match self
            .client
            .post(self.url("transactions"))
            .form(&[("tx", envelope_xdr)])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) if e.is_connect() || e.is_builder() => {
                return Err(LedgerError::Unavailable(e.to_string()));
            }
            Err(e) => {
                warn!(ledger_tx = %hash, error = %e, "payment submission did not complete");
                return Err(LedgerError::SubmissionUnconfirmed(format!(
                    "ledger transaction {hash}: {e}"
                )));
            }
        };

        let status = response.status();
        if status.is_success() {
            let body: SubmitResponse = response.json().await.map_err(|e| {
                LedgerError::SubmissionUnconfirmed(format!("ledger transaction {hash}: {e}"))
            })?;
            return Ok(body.hash);
        }

        let problem: SubmitProblem = response.json().await.unwrap_or_default();
        match status {
            StatusCode::BAD_REQUEST => Err(LedgerError::Rejected(problem.describe())),
            StatusCode::SERVICE_UNAVAILABLE | StatusCode::TOO_MANY_REQUESTS => Err(
                LedgerError::Unavailable(format!("horizon returned {status}")),
            ),
            _ => Err(LedgerError::SubmissionUnconfirmed(format!(
                "ledger transaction {hash}: horizon returned {status}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HotWalletSecret;
    use rust_decimal_macros::dec;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const HASH: &str = "3389e9f0f1a65f19736cacf544c2e825313e8447f569233bb8db39aa607c8889";

    fn account_for(seed: u8) -> (String, String) {
        let signing = SigningKey::from_bytes(&[seed; 32]);
        let secret = stellar_strkey::ed25519::PrivateKey([seed; 32]).to_string();
        let public =
            stellar_strkey::ed25519::PublicKey(signing.verifying_key().to_bytes()).to_string();
        (secret, public)
    }

    fn config(horizon_url: String) -> AnchorConfig {
        let (secret, hot) = account_for(1);
        let (_, issuer) = account_for(2);
        let (_, receiving) = account_for(3);
        AnchorConfig {
            horizon_url,
            network_passphrase: crate::config::TESTNET_PASSPHRASE.to_string(),
            hot_wallet_secret: Some(HotWalletSecret::new(secret)),
            hot_wallet_account: hot,
            asset: LedgerAsset::new("USDC", issuer),
            receiving_account: receiving,
            submission_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_rejects_secret_for_other_account() {
        let mut config = config("http://localhost".to_string());
        config.hot_wallet_account = account_for(9).1;
        assert!(matches!(
            HorizonLedger::new(&config),
            Err(LedgerError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_to_stroops() {
        assert_eq!(to_stroops(dec!(50)).unwrap(), 500_000_000);
        assert_eq!(to_stroops(dec!(0.0000001)).unwrap(), 1);
        assert!(to_stroops(dec!(0.00000001)).is_err());
        assert!(to_stroops(dec!(0)).is_err());
    }

    #[test]
    fn test_credit_asset_width() {
        let (_, issuer) = account_for(2);
        assert!(matches!(
            credit_asset(&LedgerAsset::new("USDC", issuer.clone())).unwrap(),
            xdr::Asset::CreditAlphanum4(_)
        ));
        assert!(matches!(
            credit_asset(&LedgerAsset::new("USDCLONG", issuer.clone())).unwrap(),
            xdr::Asset::CreditAlphanum12(_)
        ));
        assert!(credit_asset(&LedgerAsset::new("", issuer)).is_err());
    }

    #[tokio::test]
    async fn test_account_balance_reads_matching_line() {
        let mut server = mockito::Server::new_async().await;
        let config = config(server.url());
        let issuer = config.asset.issuer.clone();
        let body = format!(
            r#"{{
                "sequence": "42",
                "balances": [
                    {{"balance": "7.5000000", "asset_type": "native"}},
                    {{"balance": "100.0000000", "asset_type": "credit_alphanum4",
                      "asset_code": "USDC", "asset_issuer": "{issuer}"}}
                ]
            }}"#
        );
        let _mock = server
            .mock("GET", format!("/accounts/{}", config.hot_wallet_account).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config).unwrap();
        let balance = ledger
            .account_balance(&config.hot_wallet_account, &config.asset)
            .await
            .unwrap();
        assert_eq!(balance, dec!(100));

        let other = LedgerAsset::new("EURC", issuer);
        let none = ledger
            .account_balance(&config.hot_wallet_account, &other)
            .await
            .unwrap();
        assert_eq!(none, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_account_not_found() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/accounts/.*".into()))
            .with_status(404)
            .create_async()
            .await;

        let config = config(server.url());
        let ledger = HorizonLedger::new(&config).unwrap();
        let result = ledger.account_balance("GMISSING", &config.asset).await;
        assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));
    }

    #[tokio::test]
    async fn test_transaction_operations_parsed() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "_embedded": {"records": [
                {"id": "1", "type": "create_account"},
                {"id": "2", "type": "payment", "from": "GA", "to": "GB",
                 "asset_type": "native", "amount": "5.0000000"},
                {"id": "3", "type": "payment", "from": "GA", "to": "GB",
                 "asset_type": "credit_alphanum4", "asset_code": "USDC",
                 "asset_issuer": "GI", "amount": "199.9950000"}
            ]}
        }"#;
        let _mock = server
            .mock("GET", format!("/transactions/{HASH}/operations").as_str())
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config(server.url())).unwrap();
        let ops = ledger.transaction_operations(HASH).await.unwrap();

        assert_eq!(ops.len(), 3);
        assert!(matches!(&ops[0], LedgerOperation::Other { kind, .. } if kind == "create_account"));
        assert!(matches!(
            &ops[1],
            LedgerOperation::Payment {
                asset: OperationAsset::Native,
                ..
            }
        ));
        assert!(matches!(
            &ops[2],
            LedgerOperation::Payment { amount, .. } if *amount == dec!(199.995)
        ));
    }

    #[tokio::test]
    async fn test_submit_payment_rejected_with_result_codes() {
        let mut server = mockito::Server::new_async().await;
        let config = config(server.url());
        let _account = server
            .mock("GET", format!("/accounts/{}", config.hot_wallet_account).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sequence": "100", "balances": []}"#)
            .create_async()
            .await;
        let _fees = server
            .mock("GET", "/fee_stats")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"last_ledger_base_fee": "100"}"#)
            .create_async()
            .await;
        let _submit = server
            .mock("POST", "/transactions")
            .with_status(400)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"title": "Transaction Failed",
                    "extras": {"result_codes": {"transaction": "tx_failed",
                                                "operations": ["op_underfunded"]}}}"#,
            )
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config).unwrap();
        let request = PaymentRequest {
            destination: config.receiving_account.clone(),
            asset: config.asset.clone(),
            amount: dec!(50),
            memo: "Deposit 123".to_string(),
        };
        let err = ledger.submit_payment(&request).await.unwrap_err();
        assert_eq!(
            err,
            LedgerError::Rejected("tx_failed, op_underfunded".to_string())
        );
    }

    #[tokio::test]
    async fn test_submit_payment_returns_hash() {
        let mut server = mockito::Server::new_async().await;
        let config = config(server.url());
        let _account = server
            .mock("GET", format!("/accounts/{}", config.hot_wallet_account).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sequence": "100", "balances": []}"#)
            .create_async()
            .await;
        let _fees = server
            .mock("GET", "/fee_stats")
            .with_status(500)
            .create_async()
            .await;
        let submit = server
            .mock("POST", "/transactions")
            .match_body(mockito::Matcher::Regex("^tx=".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"hash": "deadbeef"}"#)
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config).unwrap();
        let request = PaymentRequest {
            destination: config.receiving_account.clone(),
            asset: config.asset.clone(),
            amount: dec!(50),
            memo: "Deposit 123".to_string(),
        };
        let hash = ledger.submit_payment(&request).await.unwrap();

        assert_eq!(hash, "deadbeef");
        submit.assert_async().await;
    }

    #[tokio::test]
    async fn test_submit_payment_gateway_timeout_is_unconfirmed() {
        let mut server = mockito::Server::new_async().await;
        let config = config(server.url());
        let _account = server
            .mock("GET", format!("/accounts/{}", config.hot_wallet_account).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sequence": "100", "balances": []}"#)
            .create_async()
            .await;
        let _submit = server
            .mock("POST", "/transactions")
            .with_status(504)
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config).unwrap();
        let request = PaymentRequest {
            destination: config.receiving_account.clone(),
            asset: config.asset.clone(),
            amount: dec!(1),
            memo: "Deposit 123".to_string(),
        };
        let err = ledger.submit_payment(&request).await.unwrap_err();
        assert!(matches!(err, LedgerError::SubmissionUnconfirmed(_)));
    }

    fn payment_to(config: &AnchorConfig) -> PaymentRequest {
        PaymentRequest {
            destination: config.receiving_account.clone(),
            asset: config.asset.clone(),
            amount: dec!(1),
            memo: "Deposit 123".to_string(),
        }
    }

    async fn submit_with_status(status: usize) -> LedgerError {
        let mut server = mockito::Server::new_async().await;
        let config = config(server.url());
        let _account = server
            .mock("GET", format!("/accounts/{}", config.hot_wallet_account).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"sequence": "100", "balances": []}"#)
            .create_async()
            .await;
        let _submit = server
            .mock("POST", "/transactions")
            .with_status(status)
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config).unwrap();
        ledger.submit_payment(&payment_to(&config)).await.unwrap_err()
    }

    #[tokio::test]
    async fn test_submit_payment_overloaded_horizon_is_unavailable() {
        assert!(matches!(submit_with_status(503).await, LedgerError::Unavailable(_)));
        assert!(matches!(submit_with_status(429).await, LedgerError::Unavailable(_)));
    }

    /// Serves the hot wallet account, then accepts the submission and never answers it.
    async fn silent_horizon(account: String) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let account = account.clone();
                tokio::spawn(async move {
                    let mut head = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => head.extend_from_slice(&chunk[..n]),
                        }
                    }
                    let head = String::from_utf8_lossy(&head);
                    if head.starts_with("POST /transactions") {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        return;
                    }
                    let (status, body) = if head.starts_with(&format!("GET /accounts/{account}")) {
                        ("200 OK", r#"{"sequence": "100", "balances": []}"#)
                    } else {
                        ("500 Internal Server Error", "{}")
                    };
                    let response = format!(
                        "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_submit_payment_timeout_after_send_is_unconfirmed() {
        let mut config = config(String::new());
        config.horizon_url = silent_horizon(config.hot_wallet_account.clone()).await;
        config.submission_timeout = Duration::from_secs(1);

        let ledger = HorizonLedger::new(&config).unwrap();
        let err = ledger.submit_payment(&payment_to(&config)).await.unwrap_err();

        assert!(matches!(err, LedgerError::SubmissionUnconfirmed(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_account_balance_server_error_is_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", mockito::Matcher::Regex(r"^/accounts/.*".into()))
            .with_status(500)
            .create_async()
            .await;

        let config = config(server.url());
        let ledger = HorizonLedger::new(&config).unwrap();
        let result = ledger
            .account_balance(&config.hot_wallet_account, &config.asset)
            .await;
        assert!(matches!(result, Err(LedgerError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_malformed_hash_never_reaches_horizon() {
        let mut server = mockito::Server::new_async().await;
        let untouched = server
            .mock("GET", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let ledger = HorizonLedger::new(&config(server.url())).unwrap();
        let not_hex = HASH.replace('3', "z");
        for hash in ["../accounts/GABC", "abc", not_hex.as_str()] {
            assert!(matches!(
                ledger.transaction(hash).await,
                Err(LedgerError::InvalidHash(_))
            ));
            assert!(matches!(
                ledger.transaction_operations(hash).await,
                Err(LedgerError::InvalidHash(_))
            ));
        }
        untouched.assert_async().await;
    }

    #[test]
    fn test_requires_hot_wallet_secret() {
        let mut config = config("http://localhost".to_string());
        config.hot_wallet_secret = None;
        assert!(matches!(
            HorizonLedger::new(&config),
            Err(LedgerError::InvalidKey(_))
        ));
    }
}
