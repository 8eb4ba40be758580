use anyhow::{bail, Context, Result};

/// Default public TON Site gateway ladder, probed in order.
pub const DEFAULT_GATEWAYS: [&str; 6] = [
    "https://tonsite.link",
    "https://tonsite.io",
    "https://ton.run",
    "https://tonp.io",
    "https://tongate.io",
    "https://ton.website",
];

pub const DEFAULT_TONAPI_BASE: &str = "https://tonapi.io";
pub const DEFAULT_AMOUNT_TOLERANCE_TON: f64 = 0.05;
pub const DEFAULT_KEYGEN_COMMAND: &str = "tonsite-keygen --adnl";

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the public TON API (dns + transaction lookups).
    pub tonapi_base: String,

    /// TON Site gateway base URLs, highest priority first.
    pub gateways: Vec<String>,

    /// Per-request timeout for every outbound probe, clamped to 6..=8.
    pub probe_timeout_secs: u64,

    /// Acceptable absolute difference when matching claimed vs observed TON.
    pub amount_tolerance_ton: f64,

    // External payment verifier webhook (optional)
    pub verifier_url: Option<String>,
    pub verifier_token: Option<String>,

    // Persistence endpoint for verified payments (optional)
    pub store_url: Option<String>,
    pub store_service_key: Option<String>,

    // Identity collaborator (optional)
    pub identity_url: Option<String>,
    pub identity_token: Option<String>,

    /// Command expected in the descriptor's `generated.command` field.
    pub expected_keygen_command: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            tonapi_base: std::env::var("TONAPI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_TONAPI_BASE.to_string()),

            gateways: std::env::var("TON_GATEWAYS")
                .map(|raw| {
                    raw.split(',')
                        .map(|g| g.trim().trim_end_matches('/').to_string())
                        .filter(|g| !g.is_empty())
                        .collect()
                })
                .unwrap_or_else(|_| DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect()),

            probe_timeout_secs: std::env::var("PROBE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "8".to_string())
                .parse::<u64>()
                .context("Invalid PROBE_TIMEOUT_SECS")?
                .clamp(6, 8),

            amount_tolerance_ton: std::env::var("AMOUNT_TOLERANCE_TON")
                .unwrap_or_else(|_| DEFAULT_AMOUNT_TOLERANCE_TON.to_string())
                .parse()
                .context("Invalid AMOUNT_TOLERANCE_TON")?,

            verifier_url: std::env::var("PAYMENT_VERIFIER_URL").ok(),
            verifier_token: std::env::var("PAYMENT_VERIFIER_TOKEN").ok(),

            store_url: std::env::var("PAYMENT_STORE_URL").ok(),
            store_service_key: std::env::var("PAYMENT_STORE_SERVICE_KEY").ok(),

            identity_url: std::env::var("IDENTITY_SERVICE_URL").ok(),
            identity_token: std::env::var("IDENTITY_SERVICE_TOKEN").ok(),

            expected_keygen_command: std::env::var("TON_SITE_KEYGEN_COMMAND")
                .unwrap_or_else(|_| DEFAULT_KEYGEN_COMMAND.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !self.tonapi_base.starts_with("http") {
            bail!("TONAPI_BASE_URL must be an HTTP(S) URL");
        }
        if self.gateways.is_empty() {
            bail!("TON_GATEWAYS must list at least one gateway");
        }
        for url in [&self.verifier_url, &self.store_url, &self.identity_url]
            .into_iter()
            .flatten()
        {
            if !url.starts_with("http") {
                bail!("Collaborator URL must be HTTP(S): {}", url);
            }
        }
        if !(self.amount_tolerance_ton >= 0.0 && self.amount_tolerance_ton.is_finite()) {
            bail!("AMOUNT_TOLERANCE_TON must be a finite non-negative number");
        }

        tracing::info!(
            "Configuration validated: {} gateways, tonapi={}, verifier={}",
            self.gateways.len(),
            self.tonapi_base,
            self.verifier_url.is_some()
        );

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tonapi_base: DEFAULT_TONAPI_BASE.to_string(),
            gateways: DEFAULT_GATEWAYS.iter().map(|g| g.to_string()).collect(),
            probe_timeout_secs: 8,
            amount_tolerance_ton: DEFAULT_AMOUNT_TOLERANCE_TON,
            verifier_url: None,
            verifier_token: None,
            store_url: None,
            store_service_key: None,
            identity_url: None,
            identity_token: None,
            expected_keygen_command: DEFAULT_KEYGEN_COMMAND.to_string(),
        }
    }
}
