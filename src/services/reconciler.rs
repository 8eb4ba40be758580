use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use moka::future::Cache;

use crate::client::identity::IdentityService;
use crate::error::TonGuardError;
use crate::models::{PaymentClaim, VerifiedPayment, VerifiedPaymentSummary};
use crate::services::chain::VerificationSourceChain;
use crate::services::store::PaymentStore;

const MIN_TX_HASH_LEN: usize = 16;
const VERIFIED_CACHE_TTL_SECS: u64 = 600;

/// Turns a payment claim into an idempotent verified-payment record.
///
/// All collaborators are explicit constructor parameters; nothing here reads
/// the environment.
pub struct PaymentReconciler {
    chain: Arc<VerificationSourceChain>,
    store: Arc<dyn PaymentStore>,
    identity: Arc<dyn IdentityService>,
    /// Hashes already verified by this process; a hit skips the source chain
    /// but still re-upserts so later fields win.
    verified_recently: Cache<String, VerifiedPaymentSummary>,
}

impl PaymentReconciler {
    pub fn new(
        chain: Arc<VerificationSourceChain>,
        store: Arc<dyn PaymentStore>,
        identity: Arc<dyn IdentityService>,
    ) -> Self {
        Self {
            chain,
            store,
            identity,
            verified_recently: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(Duration::from_secs(VERIFIED_CACHE_TTL_SECS))
                .build(),
        }
    }

    pub async fn verify_and_record(
        &self,
        claim: &PaymentClaim,
    ) -> Result<VerifiedPaymentSummary, TonGuardError> {
        // 1. Normalize the claim.
        let tx_hash = claim.tx_hash.trim().to_lowercase();
        if tx_hash.is_empty() {
            return Err(TonGuardError::MissingTxHash);
        }
        if tx_hash.len() < MIN_TX_HASH_LEN {
            return Err(TonGuardError::InvalidTxHash(tx_hash));
        }

        let wallet = claim.wallet.trim().to_string();
        if wallet.is_empty() {
            return Err(TonGuardError::MissingWallet);
        }

        let amount_ton = claim.amount_ton.filter(|a| a.is_finite());

        // 2. Resolve or create the owning user. A payment can be verified
        // before a user record exists, so failure is logged and tolerated.
        let ecosystem_user_id = match self
            .identity
            .ensure_ecosystem_user(&wallet, None, None, claim.metadata.as_ref())
            .await
        {
            Ok(user) => Some(user.id),
            Err(e) => {
                tracing::warn!("ensure_ecosystem_user failed for {}: {}", wallet, e);
                None
            }
        };

        // 3. One verdict from the source chain, unless this hash already
        // passed this process recently.
        let pass = match self.verified_recently.get(&tx_hash).await {
            Some(previous) => {
                tracing::debug!("tx {} already verified this process", tx_hash);
                crate::services::chain::ChainPass {
                    source: previous.source,
                    amount_ton: amount_ton.or(previous.amount_ton),
                    metadata: None,
                }
            }
            None => self.chain.verify_payment(&tx_hash, &wallet, amount_ton).await?,
        };

        // 4. Idempotent upsert keyed by tx_hash; later calls update in place.
        let verified_at = Utc::now();
        let payment = VerifiedPayment {
            tx_hash: tx_hash.clone(),
            wallet: wallet.clone(),
            amount_ton: pass.amount_ton,
            verified: true,
            verified_at,
            verification_source: pass.source.clone(),
            verification_metadata: pass.metadata.clone(),
            ecosystem_user_id: ecosystem_user_id.clone(),
        };

        let persisted = self.store.upsert_verified(&payment).await;

        let summary = VerifiedPaymentSummary {
            tx_hash: tx_hash.clone(),
            wallet,
            amount_ton: pass.amount_ton,
            source: pass.source,
            verified_at,
            ecosystem_user_id,
        };

        // The verdict stands either way; a failed write is retryable because
        // the verdict is cached.
        self.verified_recently.insert(tx_hash, summary.clone()).await;

        if let Err(e) = persisted {
            tracing::error!("persisting verified payment {} failed: {}", summary.tx_hash, e);
            return Err(TonGuardError::PaymentPersistenceFailed(format!(
                "verified via {} but row not written: {}",
                summary.source, e
            )));
        }

        tracing::info!(
            "payment {} verified via {} for wallet {}",
            summary.tx_hash,
            summary.source,
            summary.wallet
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::identity::NoopIdentityService;
    use crate::services::chain::SourceChainConfig;
    use crate::services::classifier::IndicatorClassifier;
    use crate::services::probe::FetchProbe;
    use crate::services::store::MemoryPaymentStore;
    use serde_json::json;

    fn reconciler_against(
        server: &mockito::Server,
        store: Arc<MemoryPaymentStore>,
    ) -> PaymentReconciler {
        let chain = Arc::new(VerificationSourceChain::new(
            Arc::new(FetchProbe::new(6)),
            Arc::new(IndicatorClassifier::default()),
            SourceChainConfig {
                tonapi_base: server.url(),
                gateways: vec![server.url()],
                amount_tolerance_ton: 0.05,
                verifier_url: None,
                verifier_token: None,
            },
        ));
        PaymentReconciler::new(chain, store, Arc::new(NoopIdentityService))
    }

    fn claim(tx_hash: &str, wallet: &str, amount: Option<f64>) -> PaymentClaim {
        PaymentClaim {
            tx_hash: tx_hash.to_string(),
            wallet: wallet.to_string(),
            amount_ton: amount,
            ..Default::default()
        }
    }

    async fn mock_tx(server: &mut mockito::Server, wallet: &str, nano: i64) {
        server
            .mock("GET", mockito::Matcher::Regex("/v2/blockchain/transactions/.*".into()))
            .with_status(200)
            .with_body(
                json!({
                    "out_msgs": [{"destination": {"address": wallet}, "value": nano}]
                })
                .to_string(),
            )
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn missing_fields_fail_fast() {
        let server = mockito::Server::new_async().await;
        let reconciler = reconciler_against(&server, Arc::new(MemoryPaymentStore::new()));

        let err = reconciler.verify_and_record(&claim("", "EQAbcDef", None)).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_TX_HASH");

        let err = reconciler.verify_and_record(&claim("short", "EQAbcDef", None)).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_TX_HASH");

        let err = reconciler
            .verify_and_record(&claim("deadbeefdeadbeef", "  ", None))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MISSING_WALLET");
    }

    #[tokio::test]
    async fn verified_claim_is_persisted_once() {
        let mut server = mockito::Server::new_async().await;
        mock_tx(&mut server, "EQAbcDef", 10_000_000_000).await;

        let store = Arc::new(MemoryPaymentStore::new());
        let reconciler = reconciler_against(&server, store.clone());

        let summary = reconciler
            .verify_and_record(&claim("DEADBEEFdeadbeef", "EQAbcDef", Some(10.0)))
            .await
            .unwrap();

        assert_eq!(summary.source, "tonapi");
        assert_eq!(summary.amount_ton, Some(10.0));
        // Hash is stored lower-cased.
        let row = store.find_by_tx_hash("deadbeefdeadbeef").await.unwrap().unwrap();
        assert!(row.verified);
        assert_eq!(row.amount_ton, Some(10.0));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn second_verification_updates_never_duplicates() {
        let mut server = mockito::Server::new_async().await;
        mock_tx(&mut server, "EQAbcDef", 10_000_000_000).await;

        let store = Arc::new(MemoryPaymentStore::new());
        let reconciler = reconciler_against(&server, store.clone());

        reconciler
            .verify_and_record(&claim("deadbeefdeadbeef", "EQAbcDef", Some(10.0)))
            .await
            .unwrap();
        reconciler
            .verify_and_record(&claim("deadbeefdeadbeef", "EQAbcDef", Some(10.02)))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        // Fields from the later call win.
        let row = store.find_by_tx_hash("deadbeefdeadbeef").await.unwrap().unwrap();
        assert_eq!(row.amount_ton, Some(10.02));
    }

    #[tokio::test]
    async fn amount_out_of_tolerance_leaves_no_row() {
        let mut server = mockito::Server::new_async().await;
        mock_tx(&mut server, "EQAbcDef", 9_000_000_000).await;

        let store = Arc::new(MemoryPaymentStore::new());
        let reconciler = reconciler_against(&server, store.clone());

        let err = reconciler
            .verify_and_record(&claim("deadbeefdeadbeef", "EQAbcDef", Some(10.0)))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "AMOUNT_MISMATCH");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_the_verdict() {
        struct FailingStore;

        #[async_trait::async_trait]
        impl PaymentStore for FailingStore {
            async fn upsert_verified(&self, _p: &VerifiedPayment) -> anyhow::Result<()> {
                Err(anyhow::anyhow!("db unavailable"))
            }
            async fn find_by_tx_hash(&self, _t: &str) -> anyhow::Result<Option<VerifiedPayment>> {
                Ok(None)
            }
        }

        let mut server = mockito::Server::new_async().await;
        mock_tx(&mut server, "EQAbcDef", 10_000_000_000).await;

        let chain = Arc::new(VerificationSourceChain::new(
            Arc::new(FetchProbe::new(6)),
            Arc::new(IndicatorClassifier::default()),
            SourceChainConfig {
                tonapi_base: server.url(),
                gateways: vec![server.url()],
                amount_tolerance_ton: 0.05,
                verifier_url: None,
                verifier_token: None,
            },
        ));
        let reconciler =
            PaymentReconciler::new(chain, Arc::new(FailingStore), Arc::new(NoopIdentityService));

        let err = reconciler
            .verify_and_record(&claim("deadbeefdeadbeef", "EQAbcDef", Some(10.0)))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "PAYMENT_PERSISTENCE_FAILED");
        // The verdict was cached, so a retry skips the chain and only redoes
        // the write.
        assert!(reconciler.verified_recently.get("deadbeefdeadbeef").await.is_some());
    }
}
