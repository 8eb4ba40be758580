use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;

use crate::models::VerifiedPayment;

/// Persistence seam for verified payments. The backing store owns the
/// atomicity of the unique-key upsert; this layer never locks.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert or update the row for `payment.tx_hash`. Later fields win;
    /// a duplicate row for the same hash must never appear.
    async fn upsert_verified(&self, payment: &VerifiedPayment) -> Result<()>;

    async fn find_by_tx_hash(&self, tx_hash: &str) -> Result<Option<VerifiedPayment>>;
}

/// REST-backed store speaking the PostgREST dialect: POST with an
/// `on_conflict` target and merge-duplicates preference.
pub struct RestPaymentStore {
    client: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl RestPaymentStore {
    pub fn new(base_url: &str, service_key: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
        }
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/verified_payments", self.base_url)
    }
}

#[async_trait]
impl PaymentStore for RestPaymentStore {
    async fn upsert_verified(&self, payment: &VerifiedPayment) -> Result<()> {
        let response = self
            .client
            .post(format!("{}?on_conflict=tx_hash", self.table_url()))
            .timeout(Duration::from_secs(8))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("Prefer", "resolution=merge-duplicates")
            .json(payment)
            .send()
            .await
            .context("upserting verified payment")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("payment store returned {}: {}", status, body));
        }

        tracing::debug!("verified payment {} upserted", payment.tx_hash);
        Ok(())
    }

    async fn find_by_tx_hash(&self, tx_hash: &str) -> Result<Option<VerifiedPayment>> {
        let response = self
            .client
            .get(format!("{}?tx_hash=eq.{}", self.table_url(), tx_hash))
            .timeout(Duration::from_secs(8))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .send()
            .await
            .context("fetching verified payment")?;

        if !response.status().is_success() {
            return Err(anyhow!("payment store returned {}", response.status()));
        }

        let mut rows: Vec<VerifiedPayment> =
            response.json().await.context("decoding verified payment rows")?;
        Ok(rows.pop())
    }
}

/// In-process store used by tests and by runs with no store configured.
#[derive(Default)]
pub struct MemoryPaymentStore {
    rows: Mutex<HashMap<String, VerifiedPayment>>,
}

impl MemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().expect("store poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PaymentStore for MemoryPaymentStore {
    async fn upsert_verified(&self, payment: &VerifiedPayment) -> Result<()> {
        self.rows
            .lock()
            .expect("store poisoned")
            .insert(payment.tx_hash.clone(), payment.clone());
        Ok(())
    }

    async fn find_by_tx_hash(&self, tx_hash: &str) -> Result<Option<VerifiedPayment>> {
        Ok(self.rows.lock().expect("store poisoned").get(tx_hash).cloned())
    }
}
