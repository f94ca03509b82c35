/// Installs the global subscriber: compact lines stamped with the time since
/// startup. `RUST_LOG` wins over `default_level` when it is set.
///
/// ```bash
/// RUST_LOG=debug storefront checkout --payment upi --wait
/// RUST_LOG=storefront=debug,storefront::storage=warn storefront orders
/// ```
pub fn setup_tracing(default_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .compact()
        .init();
}
