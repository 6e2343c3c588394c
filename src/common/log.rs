use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};
use tracing_tree::HierarchicalLayer;

/// Initializes the global subscriber. `RUST_LOG` controls filtering; the
/// default keeps the event loop quiet but surfaces warnings everywhere.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,strata_wm=info"));
    let tree = HierarchicalLayer::default()
        .with_indent_amount(2)
        .with_targets(true)
        .with_filter(filter);
    tracing_subscriber::registry().with(tree).init();
}
