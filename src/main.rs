use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ton_guard::{
    codec::FriendlyAddress,
    config::Config,
    models::{CheckStatus, Outcome},
    report::ReportEmitter,
    services::{
        DomainConfigLoader, FallbackProbe, IndicatorClassifier, SourceChainConfig,
        VerificationSourceChain,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting ton-guard v{}", env!("CARGO_PKG_VERSION"));

    let descriptor_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("DOMAIN_DESCRIPTOR_PATH").ok())
        .unwrap_or_else(|| "ton-site.json".to_string());

    let report = run_domain_verification(&config, PathBuf::from(descriptor_path)).await;

    let stdout = std::io::stdout();
    report.emit(&mut stdout.lock())?;

    std::process::exit(report.exit_code());
}

async fn run_domain_verification(config: &Config, path: PathBuf) -> ReportEmitter {
    let mut report = ReportEmitter::new();
    report.info("run_id", uuid::Uuid::new_v4().to_string());

    // An absent descriptor is a missing prerequisite; an unparseable one is
    // a substantive failure.
    if !path.exists() {
        report.prerequisite_missing("config_present", format!("{} not found", path.display()));
        return report;
    }

    let descriptor = match DomainConfigLoader::load(&path) {
        Ok(descriptor) => {
            report.required("config_present", CheckStatus::Pass);
            descriptor
        }
        Err(e) => {
            tracing::warn!("descriptor unusable: {:#}", e);
            report.required("config_present", CheckStatus::Fail);
            report.info("config_present_detail", e.to_string());
            return report;
        }
    };

    report.info("domain", descriptor.domain.clone());

    for check in
        DomainConfigLoader::validate_structure(&descriptor, &config.expected_keygen_command)
    {
        report.required_check(&check);
    }

    let probe = Arc::new(FallbackProbe::detect(config.probe_timeout_secs).await);
    let chain = VerificationSourceChain::new(
        probe,
        Arc::new(IndicatorClassifier::default()),
        SourceChainConfig::from(config),
    );

    // On-chain DNS must agree with the locally declared resolver contract.
    match descriptor
        .resolver_contract
        .as_deref()
        .map(FriendlyAddress::decode)
    {
        Some(Ok(resolver)) => {
            let result = chain.check_resolver_dns(&descriptor.domain, &resolver).await;
            if let Some(resolved) = &result.resolved_address {
                report.info("dns_resolved_address", resolved.clone());
            }
            report.required("resolver_matches_dns", outcome_status(result.outcome));
        }
        Some(Err(_)) => {
            // Already failed resolver_format above; nothing to compare.
            report.optional("resolver_matches_dns", CheckStatus::Skipped);
        }
        None => {
            report.optional("resolver_matches_dns", CheckStatus::Skipped);
        }
    }

    // The root domain plus every alias CNAME'd onto it must be reachable
    // through at least one gateway. Hosts are independent claims, so they
    // probe concurrently; the ladder within each host stays ordered.
    let mut hosts = vec![descriptor.domain.clone()];
    hosts.extend(DomainConfigLoader::derive_alias_hosts(&descriptor));
    hosts.retain(|h| !h.is_empty());

    let results =
        futures::future::join_all(hosts.iter().map(|host| chain.probe_host(host))).await;

    for result in results {
        if let Some(gateway) = &result.winning_gateway {
            report.info(&format!("gateway_for_{}", result.host), gateway.clone());
        } else if let Some(first) = result.attempts.first() {
            if let Some(status) = first.http_status {
                report.info(&format!("gateway_evidence_{}", result.host), status.to_string());
            }
        }
        report.required(
            &format!("site_reachable_{}", result.host),
            outcome_status(result.outcome),
        );
    }

    report
}

fn outcome_status(outcome: Outcome) -> CheckStatus {
    match outcome {
        Outcome::Pass => CheckStatus::Pass,
        Outcome::Fail => CheckStatus::Fail,
        Outcome::Error => CheckStatus::Error,
        Outcome::Skipped => CheckStatus::Skipped,
    }
}
