use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Incoming payment claim, as reported by the caller. Untrusted until the
/// source chain has confirmed it against on-chain data.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaymentClaim {
    pub tx_hash: String,
    pub wallet: String,

    #[serde(default)]
    pub amount_ton: Option<f64>,

    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub auth_user_id: Option<String>,

    #[serde(default)]
    pub metadata: Option<Value>,
}

/// Persisted record of a verified payment; at most one row per `tx_hash`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub tx_hash: String,
    pub wallet: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount_ton: Option<f64>,

    pub verified: bool,
    pub verified_at: DateTime<Utc>,
    pub verification_source: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_metadata: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecosystem_user_id: Option<String>,
}

/// What `verify_and_record` hands back to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifiedPaymentSummary {
    pub tx_hash: String,
    pub wallet: String,
    pub amount_ton: Option<f64>,
    pub source: String,
    pub verified_at: DateTime<Utc>,
    pub ecosystem_user_id: Option<String>,
}

/// User record owned by the external identity service. The reconciler only
/// reads or creates it, never manages its lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemUser {
    pub id: String,
}
