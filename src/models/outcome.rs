use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal verdict of a verification stage or of a whole chain evaluation.
///
/// `Error` is inconclusive (a lower-priority source may still decide);
/// `Fail` is definitive and stops the chain for that claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
    Error,
    Skipped,
}

impl Outcome {
    pub fn is_conclusive(self) -> bool {
        matches!(self, Outcome::Pass | Outcome::Fail)
    }
}

/// Status of one structural check in the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
    Warn,
    Error,
    Skipped,
}

impl CheckStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckStatus::Pass => "PASS",
            CheckStatus::Fail => "FAIL",
            CheckStatus::Warn => "WARN",
            CheckStatus::Error => "ERROR",
            CheckStatus::Skipped => "SKIPPED",
        }
    }
}

/// One named structural check with its independent verdict.
#[derive(Debug, Clone)]
pub struct NamedCheck {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: Option<String>,
}

impl NamedCheck {
    pub fn pass(name: &'static str) -> Self {
        Self { name, status: CheckStatus::Pass, detail: None }
    }

    pub fn fail(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Fail, detail: Some(detail.into()) }
    }

    pub fn warn(name: &'static str, detail: impl Into<String>) -> Self {
        Self { name, status: CheckStatus::Warn, detail: Some(detail.into()) }
    }
}

/// Which HTTP client actually served a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Fetch,
    Subprocess,
}

/// A single outbound probe and what came back. Never persisted; aggregated
/// into the report and then discarded.
#[derive(Debug, Clone)]
pub struct VerificationAttempt {
    pub source: String,
    pub url: String,
    pub transport: Option<Transport>,
    pub http_status: Option<u16>,
    pub body_preview: Option<String>,
    pub outcome: Outcome,
}

/// Explicit three-way contract of the external payment verifier.
///
/// Decoded in one place from the verifier's ad hoc response shapes so callers
/// only ever match on this union.
#[derive(Debug, Clone, PartialEq)]
pub enum VerifierVerdict {
    /// Authoritative accept; the verifier's amount/metadata win.
    Accepted { amount_ton: Option<f64>, metadata: Option<Value> },
    /// Authoritative reject with a concrete reason.
    Rejected { reason: String },
    /// The verifier could not decide; fall through to the next source.
    Abstained,
}

impl VerifierVerdict {
    /// Map a verifier response body onto the union.
    ///
    /// `verified: true` accepts, `verified: false` with a concrete error
    /// rejects, everything else (`verdict: "unknown"`, `verified: null`,
    /// unrecognized shapes) abstains.
    pub fn from_response(body: &Value) -> Self {
        if body.get("verdict").and_then(Value::as_str) == Some("unknown") {
            return VerifierVerdict::Abstained;
        }

        match body.get("verified") {
            Some(Value::Bool(true)) => VerifierVerdict::Accepted {
                amount_ton: body.get("amountTon").and_then(Value::as_f64),
                metadata: body.get("metadata").cloned(),
            },
            Some(Value::Bool(false)) => {
                match body.get("error").and_then(Value::as_str) {
                    Some(reason) if !reason.is_empty() => {
                        VerifierVerdict::Rejected { reason: reason.to_string() }
                    }
                    // A bare false with no stated error is an abstention,
                    // not an authoritative reject.
                    _ => VerifierVerdict::Abstained,
                }
            }
            _ => VerifierVerdict::Abstained,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn verdict_accepts_with_amount_and_metadata() {
        let v = VerifierVerdict::from_response(&json!({
            "verified": true,
            "amountTon": 10.0,
            "metadata": {"source": "indexer"}
        }));
        assert_eq!(
            v,
            VerifierVerdict::Accepted {
                amount_ton: Some(10.0),
                metadata: Some(json!({"source": "indexer"})),
            }
        );
    }

    #[test]
    fn verdict_rejects_on_explicit_error() {
        let v = VerifierVerdict::from_response(&json!({
            "verified": false,
            "error": "wallet mismatch"
        }));
        assert_eq!(v, VerifierVerdict::Rejected { reason: "wallet mismatch".into() });
    }

    #[test]
    fn verdict_abstains_on_unknown_null_or_bare_false() {
        for body in [
            json!({"verdict": "unknown"}),
            json!({"verified": null}),
            json!({"verified": false}),
            json!({"verified": false, "error": ""}),
            json!({}),
        ] {
            assert_eq!(VerifierVerdict::from_response(&body), VerifierVerdict::Abstained);
        }
    }

    #[test]
    fn error_outcome_is_not_conclusive() {
        assert!(Outcome::Pass.is_conclusive());
        assert!(Outcome::Fail.is_conclusive());
        assert!(!Outcome::Error.is_conclusive());
        assert!(!Outcome::Skipped.is_conclusive());
    }
}
