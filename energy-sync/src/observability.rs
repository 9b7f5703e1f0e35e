use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "energy_sync=info,energy_client=info";

/// Install the global fmt subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
