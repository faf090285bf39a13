use did_dashboard::{server, Config, Dashboard};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), did_dashboard::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    tracing::info!(
        data = %config.data_path.display(),
        significance = config.significance_level,
        boundary = config.policy_boundary,
        "Starting dashboard"
    );
    server::serve(Dashboard::new(config)).await
}
