use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Installs a global subscriber that prints tree events hierarchically.
///
/// Filtering follows `RUST_LOG`, falling back to `info`. Returns false if a
/// global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    Registry::default()
        .with(filter)
        .with(HierarchicalLayer::new(2).with_targets(true))
        .try_init()
        .is_ok()
}
