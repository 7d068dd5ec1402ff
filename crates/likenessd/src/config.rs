use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Unix socket the gateway bridge connects to.
    pub gateway_socket: PathBuf,
    /// Unix socket of the external embedding service.
    pub engine_socket: PathBuf,
    /// Directory for temporary photo storage.
    pub tmp_dir: PathBuf,
    /// Inactivity window after which a session is torn down.
    pub session_timeout: Duration,
    /// Bounded depth of each per-user event queue.
    pub session_queue_depth: usize,
}

impl Config {
    /// Load configuration from `LIKENESS_*` environment variables with defaults.
    pub fn from_env() -> Self {
        let gateway_socket = std::env::var("LIKENESS_GATEWAY_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/run/likeness/gateway.sock"));

        let engine_socket = std::env::var("LIKENESS_ENGINE_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/run/likeness/engine.sock"));

        let tmp_dir = std::env::var("LIKENESS_TMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| std::env::temp_dir().join("likeness"));

        Self {
            gateway_socket,
            engine_socket,
            tmp_dir,
            session_timeout: Duration::from_secs(env_u64(
                "LIKENESS_SESSION_TIMEOUT_SECS",
                300,
            )),
            session_queue_depth: env_usize("LIKENESS_SESSION_QUEUE_DEPTH", 32),
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
