use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, lotto::fetcher::FailurePolicy, Result};

const DEFAULT_CLOSE_IMAGE_URL: &str = "https://i.postimg.cc/WtcRzDxG/close.jpg";
const DEFAULT_TRANSFER_IMAGE_URL: &str = "https://i.postimg.cc/d1QGM41P/transferv.jpg";

/// Typed process configuration, read from the environment (and `.env`).
#[derive(Clone, Debug)]
pub struct Config {
    // Chat platform
    pub channel_access_token: String,
    pub channel_secret: String,
    pub line_api_base: String,

    // HTTP surface
    pub base_url: String,
    pub listen_addr: SocketAddr,

    // State + assets
    pub registry_file: PathBuf,
    pub font_dir: PathBuf,

    // Fetching
    pub cache_ttl: Duration,
    pub cache_on_failure: FailurePolicy,
    pub http_timeout: Duration,

    // Fixed announcement images
    pub close_image_url: String,
    pub transfer_image_url: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let channel_access_token = env_str("CHANNEL_ACCESS_TOKEN")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("CHANNEL_ACCESS_TOKEN environment variable is required".to_string())
            })?;
        let channel_secret = env_str("CHANNEL_SECRET")
            .and_then(non_empty)
            .ok_or_else(|| {
                Error::Config("CHANNEL_SECRET environment variable is required".to_string())
            })?;

        let line_api_base = env_str("LINE_API_BASE")
            .and_then(non_empty)
            .unwrap_or_else(|| "https://api.line.me".to_string())
            .trim_end_matches('/')
            .to_string();

        let base_url = env_str("BASE_URL")
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/')
            .to_string();

        let listen_addr = parse_listen_addr(env_str("LISTEN_ADDR"), env_str("PORT"))?;

        let registry_file =
            env_path("REGISTRY_FILE").unwrap_or_else(|| PathBuf::from("data/recipients.json"));
        let font_dir = env_path("FONT_DIR").unwrap_or_else(|| PathBuf::from("fonts"));

        let cache_ttl = Duration::from_secs(env_u64("LOTTO_CACHE_TTL_SECS").unwrap_or(300));
        let cache_on_failure = match env_str("LOTTO_CACHE_ON_FAILURE") {
            Some(v) => v
                .parse::<FailurePolicy>()
                .map_err(|e| Error::Config(format!("LOTTO_CACHE_ON_FAILURE: {e}")))?,
            None => FailurePolicy::default(),
        };
        let http_timeout = Duration::from_secs(env_u64("HTTP_TIMEOUT_SECS").unwrap_or(10).max(1));

        let close_image_url = env_str("CLOSE_IMAGE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_CLOSE_IMAGE_URL.to_string());
        let transfer_image_url = env_str("TRANSFER_IMAGE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_TRANSFER_IMAGE_URL.to_string());

        Ok(Self {
            channel_access_token,
            channel_secret,
            line_api_base,
            base_url,
            listen_addr,
            registry_file,
            font_dir,
            cache_ttl,
            cache_on_failure,
            http_timeout,
            close_image_url,
            transfer_image_url,
        })
    }

    /// Image messages need a publicly reachable https URL.
    pub fn has_https_base_url(&self) -> bool {
        self.base_url.to_lowercase().starts_with("https://")
    }
}

fn parse_listen_addr(listen: Option<String>, port: Option<String>) -> Result<SocketAddr> {
    if let Some(addr) = listen.and_then(non_empty) {
        return addr
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("invalid LISTEN_ADDR {addr:?}: {e}")));
    }
    let port = match port.and_then(non_empty) {
        Some(p) => p
            .trim()
            .parse::<u16>()
            .map_err(|e| Error::Config(format!("invalid PORT {p:?}: {e}")))?,
        None => 5000,
    };
    Ok(SocketAddr::from(([0, 0, 0, 0], port)))
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.trim().to_string())
    }
}
