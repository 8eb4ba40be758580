use std::sync::Arc;

use serde_json::Value;

use crate::codec::FriendlyAddress;
use crate::error::TonGuardError;
use crate::models::{Outcome, VerificationAttempt, VerifierVerdict};
use crate::services::classifier::Classifier;
use crate::services::probe::HttpProbe;

/// Everything the chain needs to know about its sources.
#[derive(Debug, Clone)]
pub struct SourceChainConfig {
    pub tonapi_base: String,
    pub gateways: Vec<String>,
    pub amount_tolerance_ton: f64,
    pub verifier_url: Option<String>,
    pub verifier_token: Option<String>,
}

impl From<&crate::config::Config> for SourceChainConfig {
    fn from(config: &crate::config::Config) -> Self {
        Self {
            tonapi_base: config.tonapi_base.clone(),
            gateways: config.gateways.clone(),
            amount_tolerance_ton: config.amount_tolerance_ton,
            verifier_url: config.verifier_url.clone(),
            verifier_token: config.verifier_token.clone(),
        }
    }
}

/// Outcome of probing one host across the gateway ladder.
#[derive(Debug)]
pub struct HostProbeResult {
    pub host: String,
    pub outcome: Outcome,
    pub winning_gateway: Option<String>,
    pub attempts: Vec<VerificationAttempt>,
}

/// Outcome of the on-chain DNS resolver comparison.
#[derive(Debug)]
pub struct DnsCheckResult {
    pub outcome: Outcome,
    pub resolved_address: Option<String>,
    pub attempt: VerificationAttempt,
}

/// A conclusive positive payment verdict and where it came from.
#[derive(Debug, Clone)]
pub struct ChainPass {
    pub source: String,
    pub amount_ton: Option<f64>,
    pub metadata: Option<Value>,
}

/// Tolerance-based amount comparison. Symmetric, and reflexive for any
/// non-negative tolerance.
pub fn amounts_close(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() <= tolerance
}

/// Ordered probes over untrusted sources, stopping at the first conclusive
/// signal. One terminal verdict per claim.
pub struct VerificationSourceChain {
    probe: Arc<dyn HttpProbe>,
    classifier: Arc<dyn Classifier>,
    config: SourceChainConfig,
}

impl VerificationSourceChain {
    pub fn new(
        probe: Arc<dyn HttpProbe>,
        classifier: Arc<dyn Classifier>,
        config: SourceChainConfig,
    ) -> Self {
        Self { probe, classifier, config }
    }

    /// Compare the locally declared resolver contract against what the public
    /// TON API says on-chain DNS resolves the domain to.
    pub async fn check_resolver_dns(
        &self,
        domain: &str,
        resolver: &FriendlyAddress,
    ) -> DnsCheckResult {
        let url = format!("{}/v2/dns/{}", self.config.tonapi_base, domain);

        let response = match self.probe.get(&url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("tonapi dns lookup failed for {}: {}", domain, e);
                return DnsCheckResult {
                    outcome: Outcome::Error,
                    resolved_address: None,
                    attempt: VerificationAttempt {
                        source: "tonapi_dns".to_string(),
                        url,
                        transport: None,
                        http_status: None,
                        body_preview: Some(e.to_string()),
                        outcome: Outcome::Error,
                    },
                };
            }
        };

        let json: Option<Value> = serde_json::from_str(&response.body).ok();
        let classified =
            self.classifier
                .classify_api_response(response.status, json.as_ref(), "item.address");

        let mut attempt = VerificationAttempt {
            source: "tonapi_dns".to_string(),
            url,
            transport: Some(response.transport),
            http_status: Some(response.status),
            body_preview: Some(preview(&response.body)),
            outcome: classified,
        };

        if classified != Outcome::Pass {
            return DnsCheckResult { outcome: classified, resolved_address: None, attempt };
        }

        let resolved = json
            .as_ref()
            .and_then(|j| j.pointer("/item/address"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let outcome = match parse_raw_address(&resolved) {
            Some((workchain, hash_hex)) if resolver.equals_raw(workchain, &hash_hex) => {
                Outcome::Pass
            }
            Some(_) => {
                tracing::warn!(
                    "resolver mismatch for {}: on-chain {}, declared {}:{}",
                    domain,
                    resolved,
                    resolver.workchain,
                    resolver.hash_hex()
                );
                Outcome::Fail
            }
            None => Outcome::Error,
        };

        attempt.outcome = outcome;
        DnsCheckResult { outcome, resolved_address: Some(resolved), attempt }
    }

    /// Walk the gateway ladder for one host. First gateway whose response is
    /// HTTP-successful and clears the classifier wins; otherwise the first
    /// status/body evidence seen is retained and the host fails. A host no
    /// gateway could even reach is an error, not a failure.
    pub async fn probe_host(&self, host: &str) -> HostProbeResult {
        let mut attempts = Vec::new();
        let mut saw_response = false;

        for gateway in &self.config.gateways {
            let url = format!("{}/{}", gateway.trim_end_matches('/'), host);

            match self.probe.get(&url).await {
                Ok(response) => {
                    saw_response = true;
                    let outcome = if response.ok {
                        self.classifier.classify_gateway_body(&response.body)
                    } else {
                        Outcome::Fail
                    };

                    attempts.push(VerificationAttempt {
                        source: "gateway".to_string(),
                        url,
                        transport: Some(response.transport),
                        http_status: Some(response.status),
                        body_preview: Some(preview(&response.body)),
                        outcome,
                    });

                    if outcome == Outcome::Pass {
                        tracing::info!("host {} reachable via {}", host, gateway);
                        return HostProbeResult {
                            host: host.to_string(),
                            outcome: Outcome::Pass,
                            winning_gateway: Some(gateway.clone()),
                            attempts,
                        };
                    }
                }
                Err(e) => {
                    attempts.push(VerificationAttempt {
                        source: "gateway".to_string(),
                        url,
                        transport: None,
                        http_status: None,
                        body_preview: Some(e.to_string()),
                        outcome: Outcome::Error,
                    });
                }
            }
        }

        let outcome = if saw_response { Outcome::Fail } else { Outcome::Error };
        tracing::warn!("host {} failed gateway ladder ({:?})", host, outcome);

        HostProbeResult { host: host.to_string(), outcome, winning_gateway: None, attempts }
    }

    /// Verify a payment claim: external verifier first (when configured),
    /// public API fallback when it abstains.
    pub async fn verify_payment(
        &self,
        tx_hash: &str,
        wallet: &str,
        amount_ton: Option<f64>,
    ) -> Result<ChainPass, TonGuardError> {
        if let Some(verifier_url) = &self.config.verifier_url {
            match self.ask_external_verifier(verifier_url, tx_hash, wallet, amount_ton).await {
                VerifierVerdict::Accepted { amount_ton: reported, metadata } => {
                    return Ok(ChainPass {
                        source: "external_verifier".to_string(),
                        amount_ton: reported.or(amount_ton),
                        metadata,
                    });
                }
                VerifierVerdict::Rejected { reason } => {
                    return Err(TonGuardError::ExternalVerifierError(reason));
                }
                VerifierVerdict::Abstained => {
                    tracing::debug!("external verifier abstained for {}", tx_hash);
                }
            }
        }

        self.verify_via_tonapi(tx_hash, wallet, amount_ton).await
    }

    async fn ask_external_verifier(
        &self,
        url: &str,
        tx_hash: &str,
        wallet: &str,
        amount_ton: Option<f64>,
    ) -> VerifierVerdict {
        let payload = serde_json::json!({
            "txHash": tx_hash,
            "wallet": wallet,
            "amountTon": amount_ton,
        });

        let response = match self
            .probe
            .post_json(url, &payload, self.config.verifier_token.as_deref())
            .await
        {
            Ok(response) if response.ok => response,
            Ok(response) => {
                tracing::warn!("external verifier returned HTTP {}", response.status);
                return VerifierVerdict::Abstained;
            }
            Err(e) => {
                tracing::warn!("external verifier unreachable: {}", e);
                return VerifierVerdict::Abstained;
            }
        };

        match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => VerifierVerdict::from_response(&body),
            Err(e) => {
                tracing::warn!("external verifier sent unparseable body: {}", e);
                VerifierVerdict::Abstained
            }
        }
    }

    async fn verify_via_tonapi(
        &self,
        tx_hash: &str,
        wallet: &str,
        amount_ton: Option<f64>,
    ) -> Result<ChainPass, TonGuardError> {
        let url = format!("{}/v2/blockchain/transactions/{}", self.config.tonapi_base, tx_hash);

        let response = self
            .probe
            .get(&url)
            .await
            .map_err(|e| TonGuardError::TonLookupFailed(e.to_string()))?;

        if !response.ok {
            return Err(TonGuardError::TonLookupFailed(format!(
                "tonapi returned HTTP {}",
                response.status
            )));
        }

        let tx: Value = serde_json::from_str(&response.body)
            .map_err(|e| TonGuardError::TonLookupParseError(e.to_string()))?;

        let addresses = extract_addresses(&tx);
        let values = extract_ton_values(&tx);

        if !addresses.is_empty()
            && !addresses.iter().any(|a| a.eq_ignore_ascii_case(wallet))
        {
            return Err(TonGuardError::WalletMismatch(format!(
                "{} not among {} on-chain addresses",
                wallet,
                addresses.len()
            )));
        }

        let matched_value = match amount_ton {
            Some(claimed) => {
                let best = values
                    .iter()
                    .copied()
                    .min_by(|a, b| {
                        (a - claimed)
                            .abs()
                            .partial_cmp(&(b - claimed).abs())
                            .unwrap_or(std::cmp::Ordering::Equal)
                    });

                match best {
                    Some(value) if amounts_close(value, claimed, self.config.amount_tolerance_ton) => {
                        Some(value)
                    }
                    observed => {
                        return Err(TonGuardError::AmountMismatch { claimed, observed });
                    }
                }
            }
            None => values.first().copied(),
        };

        tracing::info!(
            "tonapi confirmed {} for wallet {} (amount {:?})",
            tx_hash,
            wallet,
            matched_value
        );

        Ok(ChainPass {
            source: "tonapi".to_string(),
            amount_ton: amount_ton.or(matched_value),
            metadata: Some(serde_json::json!({
                "addresses_seen": addresses.len(),
                "values_seen": values.len(),
            })),
        })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(240).collect()
}

/// Parse a raw `workchain:hex` address string.
fn parse_raw_address(s: &str) -> Option<(i32, String)> {
    let (workchain, hash) = s.split_once(':')?;
    let workchain: i32 = workchain.parse().ok()?;
    if hash.len() != 64 || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some((workchain, hash.to_ascii_lowercase()))
}

/// Pull an address out of either a bare string or an `{ "address": ... }`
/// object; transaction shapes vary between API versions.
fn address_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(_) => value
            .get("address")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Every plausible source/destination address in a transaction, whatever
/// shape the API chose. Never throws on missing fields.
fn extract_addresses(tx: &Value) -> Vec<String> {
    let mut addresses = Vec::new();
    let mut push = |candidate: Option<String>| {
        if let Some(address) = candidate {
            if !addresses.iter().any(|a: &String| a.eq_ignore_ascii_case(&address)) {
                addresses.push(address);
            }
        }
    };

    push(tx.get("account").and_then(address_of));

    if let Some(in_msg) = tx.get("in_msg") {
        push(in_msg.get("destination").and_then(address_of));
        push(in_msg.get("source").and_then(address_of));
    }

    if let Some(out_msgs) = tx.get("out_msgs").and_then(Value::as_array) {
        for msg in out_msgs {
            push(msg.get("destination").and_then(address_of));
            push(msg.get("source").and_then(address_of));
        }
    }

    if let Some(actions) = tx.get("actions").and_then(Value::as_array) {
        for action in actions {
            for transfer in [action.get("TonTransfer"), action.get("ton_transfer"), Some(action)]
                .into_iter()
                .flatten()
            {
                push(transfer.get("recipient").and_then(address_of));
                push(transfer.get("sender").and_then(address_of));
            }
        }
    }

    addresses
}

/// A nanoTON field can be an integer or a stringified integer.
fn nano_to_ton(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().map(|nano| nano / 1e9),
        Value::String(s) => s.parse::<f64>().ok().map(|nano| nano / 1e9),
        _ => None,
    }
}

/// Every plausible transferred value in the transaction, in TON.
fn extract_ton_values(tx: &Value) -> Vec<f64> {
    let mut values = Vec::new();

    for key in ["amount", "value"] {
        if let Some(v) = tx.get(key).and_then(nano_to_ton) {
            values.push(v);
        }
    }

    if let Some(v) = tx.get("in_msg").and_then(|m| m.get("value")).and_then(nano_to_ton) {
        values.push(v);
    }

    if let Some(out_msgs) = tx.get("out_msgs").and_then(Value::as_array) {
        for msg in out_msgs {
            if let Some(v) = msg.get("value").and_then(nano_to_ton) {
                values.push(v);
            }
        }
    }

    values
}
