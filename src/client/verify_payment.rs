use std::sync::Arc;

use anyhow::{bail, Result};

use ton_guard::{
    client::{HttpIdentityService, IdentityService, NoopIdentityService},
    config::Config,
    models::PaymentClaim,
    services::{
        FallbackProbe, IndicatorClassifier, MemoryPaymentStore, PaymentReconciler, PaymentStore,
        RestPaymentStore, SourceChainConfig, VerificationSourceChain,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;

    let mut args = std::env::args().skip(1);
    let tx_hash = match args.next().or_else(|| std::env::var("TX_HASH").ok()) {
        Some(hash) => hash,
        None => bail!("usage: verify-payment <tx_hash> <wallet> [amount_ton]"),
    };
    let wallet = match args.next().or_else(|| std::env::var("WALLET").ok()) {
        Some(wallet) => wallet,
        None => bail!("usage: verify-payment <tx_hash> <wallet> [amount_ton]"),
    };
    let amount_ton = args
        .next()
        .or_else(|| std::env::var("AMOUNT_TON").ok())
        .map(|raw| raw.parse::<f64>())
        .transpose()?;

    println!("TON payment verification");
    println!("========================");
    println!("Tx hash: {}", tx_hash);
    println!("Wallet:  {}", wallet);
    if let Some(amount) = amount_ton {
        println!("Amount:  {} TON", amount);
    }
    println!();

    let probe = Arc::new(FallbackProbe::detect(config.probe_timeout_secs).await);
    let chain = Arc::new(VerificationSourceChain::new(
        probe,
        Arc::new(IndicatorClassifier::default()),
        SourceChainConfig::from(&config),
    ));

    let store: Arc<dyn PaymentStore> = match (&config.store_url, &config.store_service_key) {
        (Some(url), Some(key)) => Arc::new(RestPaymentStore::new(url, key)),
        _ => {
            println!("[WARN] No payment store configured, result will not persist");
            Arc::new(MemoryPaymentStore::new())
        }
    };

    let identity: Arc<dyn IdentityService> = match &config.identity_url {
        Some(url) => Arc::new(HttpIdentityService::new(url, config.identity_token.as_deref())),
        None => Arc::new(NoopIdentityService),
    };

    let reconciler = PaymentReconciler::new(chain, store, identity);

    let claim = PaymentClaim {
        tx_hash,
        wallet,
        amount_ton,
        ..Default::default()
    };

    match reconciler.verify_and_record(&claim).await {
        Ok(summary) => {
            println!("[SUCCESS] Payment verified via {}", summary.source);
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Err(e) => {
            println!("[FAILED] {} ({})", e, e.error_code());
            std::process::exit(1);
        }
    }
}
