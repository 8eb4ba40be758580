use thiserror::Error;

#[derive(Error, Debug)]
pub enum TonGuardError {
    #[error("Missing transaction hash")]
    MissingTxHash,

    #[error("Transaction hash too short: {0}")]
    InvalidTxHash(String),

    #[error("Missing wallet address")]
    MissingWallet,

    #[error("Wallet mismatch: {0}")]
    WalletMismatch(String),

    #[error("Amount mismatch: claimed {claimed} TON, best on-chain match {observed:?}")]
    AmountMismatch { claimed: f64, observed: Option<f64> },

    #[error("TON lookup failed: {0}")]
    TonLookupFailed(String),

    #[error("TON lookup parse error: {0}")]
    TonLookupParseError(String),

    #[error("External verifier error: {0}")]
    ExternalVerifierError(String),

    #[error("Payment persistence failed: {0}")]
    PaymentPersistenceFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Address codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TonGuardError {
    /// Stable machine-readable code, matched on by callers and automation.
    pub fn error_code(&self) -> &'static str {
        match self {
            TonGuardError::MissingTxHash => "MISSING_TX_HASH",
            TonGuardError::InvalidTxHash(_) => "MISSING_TX_HASH",
            TonGuardError::MissingWallet => "MISSING_WALLET",
            TonGuardError::WalletMismatch(_) => "WALLET_MISMATCH",
            TonGuardError::AmountMismatch { .. } => "AMOUNT_MISMATCH",
            TonGuardError::TonLookupFailed(_) => "TON_LOOKUP_FAILED",
            TonGuardError::TonLookupParseError(_) => "TON_LOOKUP_PARSE_ERROR",
            TonGuardError::ExternalVerifierError(_) => "EXTERNAL_VERIFIER_ERROR",
            TonGuardError::PaymentPersistenceFailed(_) => "PAYMENT_PERSISTENCE_FAILED",
            TonGuardError::ConfigError(_) => "CONFIG_ERROR",
            TonGuardError::Codec(_) => "ADDRESS_FORMAT_ERROR",
            TonGuardError::Http(_) => "UPSTREAM_ERROR",
            TonGuardError::Io(_) => "IO_ERROR",
            TonGuardError::Json(_) => "JSON_ERROR",
        }
    }
}

/// Errors from the pure address decoding layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    #[error("Friendly address must decode to 36 bytes, got {0}")]
    ResolverFormat(usize),

    #[error("Invalid ADNL address: {0}")]
    InvalidAdnl(String),

    #[error("Public key must decode to 32 bytes, got {0}")]
    InvalidPublicKey(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(TonGuardError::MissingTxHash.error_code(), "MISSING_TX_HASH");
        assert_eq!(
            TonGuardError::WalletMismatch("w".into()).error_code(),
            "WALLET_MISMATCH"
        );
        assert_eq!(
            TonGuardError::AmountMismatch { claimed: 10.0, observed: Some(9.0) }.error_code(),
            "AMOUNT_MISMATCH"
        );
        assert_eq!(
            TonGuardError::PaymentPersistenceFailed("db down".into()).error_code(),
            "PAYMENT_PERSISTENCE_FAILED"
        );
    }
}
