//! HTTP surface: webhook intake, the result image endpoint and health.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use lotto_core::{
    config::Config, errors::Error, lotto::fetcher::LottoFetcher, messaging::dispatch::Dispatcher,
    registry::RecipientRegistry, Result,
};
use lotto_render::Composer;

use crate::{handlers, webhook};

pub const IMAGE_PATH: &str = "/lotto/latest_clean.png";
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, max-age=0";
const PLACEHOLDER_TEXT: &str = "ยังไม่มีผลหวย";

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub fetcher: Arc<LottoFetcher>,
    pub dispatcher: Arc<Dispatcher>,
    pub composer: Arc<Composer>,
    pub latest_image: Arc<RwLock<Option<Bytes>>>,
}

/// Outcome of producing a fresh result image.
#[derive(Debug)]
pub enum ImageRefresh {
    Ready,
    NoResult,
    RenderFailed(Error),
}

impl AppState {
    pub fn new(
        cfg: Arc<Config>,
        fetcher: Arc<LottoFetcher>,
        dispatcher: Arc<Dispatcher>,
        composer: Arc<Composer>,
    ) -> Self {
        Self {
            cfg,
            fetcher,
            dispatcher,
            composer,
            latest_image: Arc::new(RwLock::new(None)),
        }
    }

    pub fn registry(&self) -> &Arc<RecipientRegistry> {
        self.dispatcher.registry()
    }

    /// Public URL of the latest image, with a cache-busting timestamp.
    pub fn image_url(&self, unix: i64) -> String {
        format!("{}{IMAGE_PATH}?t={unix}", self.cfg.base_url)
    }

    /// Fetch the result, render it and store it as the latest image.
    pub async fn refresh_image(&self, force: bool) -> ImageRefresh {
        let Some(result) = self.fetcher.fetch(force).await else {
            return ImageRefresh::NoResult;
        };

        let composer = self.composer.clone();
        let rendered = tokio::task::spawn_blocking(move || composer.render(&result))
            .await
            .map_err(|e| Error::Render(format!("render task failed: {e}")))
            .and_then(|r| r);

        match rendered {
            Ok(png) => {
                *self.latest_image.write().await = Some(Bytes::from(png));
                ImageRefresh::Ready
            }
            Err(e) => {
                error!(error = %e, "failed to render result image");
                ImageRefresh::RenderFailed(e)
            }
        }
    }

    async fn placeholder_png(&self) -> Result<Vec<u8>> {
        let composer = self.composer.clone();
        tokio::task::spawn_blocking(move || composer.render_placeholder(PLACEHOLDER_TEXT))
            .await
            .map_err(|e| Error::Render(format!("render task failed: {e}")))?
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/callback", post(callback))
        .route(IMAGE_PATH, get(latest_image))
        .route("/health", get(health))
        .with_state(state)
}

/// `POST /callback`: verify, then handle text events one at a time.
async fn callback(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let signature = headers
        .get(webhook::SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !webhook::verify_signature(&state.cfg.channel_secret, &body, signature) {
        warn!("webhook signature mismatch");
        return (StatusCode::BAD_REQUEST, "invalid signature").into_response();
    }

    let events = match webhook::parse_events(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "unparseable webhook body");
            return (StatusCode::OK, "OK").into_response();
        }
    };
    debug!(count = events.len(), "webhook events");

    for event in events {
        handlers::handle_event(&state, event).await;
    }
    (StatusCode::OK, "OK").into_response()
}

/// `GET /lotto/latest_clean.png`: stored image, else render on demand,
/// else a placeholder.
async fn latest_image(State(state): State<AppState>) -> Response {
    let stored = state.latest_image.read().await.clone();
    let png = match stored {
        Some(png) => png,
        None => {
            let refreshed = match state.refresh_image(false).await {
                ImageRefresh::Ready => state.latest_image.read().await.clone(),
                ImageRefresh::NoResult | ImageRefresh::RenderFailed(_) => None,
            };
            match refreshed {
                Some(png) => png,
                None => match state.placeholder_png().await {
                    Ok(png) => Bytes::from(png),
                    Err(e) => {
                        error!(error = %e, "failed to render placeholder image");
                        return (StatusCode::INTERNAL_SERVER_ERROR, [(header::CACHE_CONTROL, NO_STORE)])
                            .into_response();
                    }
                },
            }
        }
    };

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "image/png"),
            (header::CACHE_CONTROL, NO_STORE),
        ],
        png,
    )
        .into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Serve until `cancel` fires or the process receives Ctrl-C / SIGTERM.
pub async fn run_server(
    state: AppState,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "server listening");

    tokio::spawn(shutdown_on_signal(cancel.clone()));

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_on_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
        _ = cancel.cancelled() => return,
    }
    cancel.cancel();
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;
    use tower::ServiceExt;

    use lotto_core::{
        domain::{LottoResult, RecipientId},
        lotto::{fetcher::FailurePolicy, source::LottoSource},
        messaging::{
            port::{ChatPlatform, PlatformResult},
            types::{OutboundMessage, PlatformError},
        },
        registry::{MemoryStore, RecipientRegistry},
    };
    use lotto_render::fonts::FontSet;

    #[derive(Debug, Clone, PartialEq)]
    pub enum Call {
        Reply(String, Vec<OutboundMessage>),
        Push(String, Vec<OutboundMessage>),
        Multicast(Vec<String>, Vec<OutboundMessage>),
    }

    #[derive(Default)]
    pub struct RecordingPlatform {
        pub calls: StdMutex<Vec<Call>>,
        pub group_names: StdMutex<Vec<(String, String)>>,
        pub reject_reply_token: bool,
    }

    impl RecordingPlatform {
        pub fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatPlatform for RecordingPlatform {
        async fn reply(&self, token: &str, messages: &[OutboundMessage]) -> PlatformResult<()> {
            if self.reject_reply_token {
                return Err(PlatformError::InvalidReplyToken);
            }
            self.calls
                .lock()
                .unwrap()
                .push(Call::Reply(token.to_string(), messages.to_vec()));
            Ok(())
        }

        async fn push(&self, to: &RecipientId, messages: &[OutboundMessage]) -> PlatformResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push(Call::Push(to.0.clone(), messages.to_vec()));
            Ok(())
        }

        async fn multicast(
            &self,
            to: &[RecipientId],
            messages: &[OutboundMessage],
        ) -> PlatformResult<()> {
            self.calls.lock().unwrap().push(Call::Multicast(
                to.iter().map(|r| r.0.clone()).collect(),
                messages.to_vec(),
            ));
            Ok(())
        }

        async fn group_name(&self, group_id: &str) -> PlatformResult<Option<String>> {
            Ok(self
                .group_names
                .lock()
                .unwrap()
                .iter()
                .find(|(id, _)| id == group_id)
                .map(|(_, n)| n.clone()))
        }
    }

    pub struct StubSource(pub Option<LottoResult>);

    #[async_trait]
    impl LottoSource for StubSource {
        fn name(&self) -> &str {
            "stub"
        }

        async fn fetch(&self) -> Result<LottoResult> {
            self.0
                .clone()
                .ok_or_else(|| Error::fetch("stub", "no result"))
        }
    }

    pub fn sample_result() -> LottoResult {
        LottoResult::new("2 มกราคม 2567", "123456", "99", ["333", "444"], ["111", "222"])
    }

    pub fn test_config(base_url: &str) -> Config {
        Config {
            channel_access_token: "token".to_string(),
            channel_secret: "secret".to_string(),
            line_api_base: "http://127.0.0.1:1".to_string(),
            base_url: base_url.to_string(),
            listen_addr: "127.0.0.1:0".parse().unwrap(),
            registry_file: "unused.json".into(),
            font_dir: "/nonexistent".into(),
            cache_ttl: Duration::from_secs(300),
            cache_on_failure: FailurePolicy::KeepLastGood,
            http_timeout: Duration::from_secs(1),
            close_image_url: "https://img.example/close.jpg".to_string(),
            transfer_image_url: "https://img.example/transfer.jpg".to_string(),
        }
    }

    pub fn test_state(
        base_url: &str,
        result: Option<LottoResult>,
        platform: Arc<RecordingPlatform>,
    ) -> AppState {
        let registry = Arc::new(RecipientRegistry::load(Arc::new(MemoryStore::default())));
        let fetcher = LottoFetcher::new(vec![Arc::new(StubSource(result)) as Arc<dyn LottoSource>]);
        AppState::new(
            Arc::new(test_config(base_url)),
            Arc::new(fetcher),
            Arc::new(Dispatcher::new(platform, registry)),
            Arc::new(Composer::new(FontSet::fallback())),
        )
    }

    fn signed_callback(body: &str) -> Request<Body> {
        Request::post("/callback")
            .header("content-type", "application/json")
            .header("x-line-signature", webhook::sign("secret", body.as_bytes()))
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = build_router(test_state("https://bot.example", None, Arc::default()));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn image_endpoint_serves_placeholder_when_all_sources_fail() {
        let app = build_router(test_state("https://bot.example", None, Arc::default()));
        let resp = app
            .oneshot(Request::get(IMAGE_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CACHE_CONTROL], NO_STORE);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let img = image::load_from_memory(&body).unwrap();
        assert_eq!((img.width(), img.height()), (1200, 720));
    }

    #[tokio::test]
    async fn image_endpoint_renders_on_demand_and_stores_result() {
        let state = test_state("https://bot.example", Some(sample_result()), Arc::default());
        let app = build_router(state.clone());
        let resp = app
            .oneshot(Request::get(IMAGE_PATH).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(state.latest_image.read().await.as_ref(), Some(&body));
    }

    #[tokio::test]
    async fn callback_rejects_bad_signature() {
        let platform = Arc::new(RecordingPlatform::default());
        let app = build_router(test_state("https://bot.example", None, platform.clone()));
        let req = Request::post("/callback")
            .header("x-line-signature", "AAAA")
            .body(Body::from(r#"{"events":[]}"#))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(platform.calls().is_empty());
    }

    #[tokio::test]
    async fn callback_handles_menu_command() {
        let platform = Arc::new(RecordingPlatform::default());
        let app = build_router(test_state("https://bot.example", None, platform.clone()));
        let body = r#"{"events":[{"type":"message","replyToken":"r1",
            "source":{"type":"user","userId":"U1"},
            "message":{"type":"text","id":"1","text":" /เมนู "}}]}"#;
        let resp = app.oneshot(signed_callback(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let calls = platform.calls();
        assert_eq!(calls.len(), 1);
        assert!(matches!(&calls[0], Call::Reply(token, _) if token == "r1"));
    }

    #[tokio::test]
    async fn callback_is_ok_even_when_nothing_can_be_fetched() {
        let platform = Arc::new(RecordingPlatform::default());
        let app = build_router(test_state("https://bot.example", None, platform.clone()));
        let body = r#"{"events":[{"type":"message","replyToken":"r1",
            "source":{"type":"group","groupId":"C1"},
            "message":{"type":"text","id":"1","text":"/ผลหวย"}}]}"#;
        let resp = app.oneshot(signed_callback(body)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(matches!(
            &platform.calls()[..],
            [Call::Reply(_, msgs)] if matches!(&msgs[0], OutboundMessage::Text { .. })
        ));
    }
}
