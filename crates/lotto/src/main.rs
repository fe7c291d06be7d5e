use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use lotto_core::{
    config::Config,
    lotto::fetcher::LottoFetcher,
    messaging::{
        dispatch::Dispatcher,
        port::ChatPlatform,
        throttled::{ThrottleConfig, ThrottledPlatform},
    },
    registry::{JsonFileStore, RecipientRegistry},
};
use lotto_line::{router::AppState, LineClient};
use lotto_render::Composer;

#[tokio::main]
async fn main() -> Result<(), lotto_core::Error> {
    lotto_core::logging::init("lotto")?;

    let cfg = Arc::new(Config::load()?);
    if !cfg.has_https_base_url() {
        tracing::warn!(
            base_url = %cfg.base_url,
            "BASE_URL is missing or not https; result images cannot be sent"
        );
    }

    let http = lotto_sources::build_http_client(cfg.http_timeout)?;

    let fetcher = LottoFetcher::new(lotto_sources::default_sources(http.clone()))
        .with_ttl(cfg.cache_ttl)
        .with_failure_policy(cfg.cache_on_failure);

    let registry = Arc::new(RecipientRegistry::load(Arc::new(JsonFileStore::new(
        cfg.registry_file.clone(),
    ))));

    // Raw LINE client behind a throttle to stay under the platform rate limits.
    let raw_platform: Arc<dyn ChatPlatform> = Arc::new(LineClient::new(
        http,
        &cfg.line_api_base,
        &cfg.channel_access_token,
    ));
    let platform: Arc<dyn ChatPlatform> = Arc::new(ThrottledPlatform::new(
        raw_platform,
        ThrottleConfig::default(),
    ));

    let composer = Composer::from_font_dir(&cfg.font_dir);
    let state = AppState::new(
        cfg.clone(),
        Arc::new(fetcher),
        Arc::new(Dispatcher::new(platform, registry)),
        Arc::new(composer),
    );

    lotto_line::router::run_server(state, cfg.listen_addr, CancellationToken::new())
        .await
        .map_err(|e| lotto_core::Error::External(format!("server failed: {e}")))?;

    Ok(())
}
