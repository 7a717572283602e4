use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const LOG_ENV: &str = "RECALL_LOG";
const DEFAULT_FILTER: &str = "warn";

/// Install the global subscriber. Events go to stderr so they never interleave
/// with the study prompts on stdout.
pub fn init_tracing() {
    let env_filter = std::env::var(LOG_ENV)
        .ok()
        .and_then(|raw| EnvFilter::try_new(raw).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER));
    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .init();
}
