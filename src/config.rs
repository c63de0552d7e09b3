use serde::Deserialize;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Result, StreamError};

pub const API_BASE_URL_ENV: &str = "NEXT_PUBLIC_API_BASE_URL";
pub const CONFIG_PATH_ENV: &str = "CONFIG_PATH";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub proxy: ProxyConfig,
    pub playback: PlaybackConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// 后端地址，例如 `http://127.0.0.1:9090`
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// 代理路由，重写后的 m3u8 指回这里
    pub route: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub downgrade_cooldown_ms: u64,
    pub recover_after_ms: u64,
    pub check_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub state_file: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        // 首先尝试从环境变量指定的文件加载
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };

        if let Ok(base_url) = std::env::var(API_BASE_URL_ENV) {
            if !base_url.trim().is_empty() {
                config.api.base_url = base_url.trim().to_string();
            }
        }

        Ok(config)
    }

    pub fn from_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| StreamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.playback.check_interval_ms == 0 {
            return Err(StreamError::Config(
                "playback.check_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| StreamError::Config(format!("invalid listen address: {}", e)))
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl PlaybackConfig {
    pub fn downgrade_cooldown(&self) -> Duration {
        Duration::from_millis(self.downgrade_cooldown_ms)
    }

    pub fn recover_after(&self) -> Duration {
        Duration::from_millis(self.recover_after_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            api: ApiConfig::default(),
            proxy: ProxyConfig::default(),
            playback: PlaybackConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9090".to_string(),
            timeout_secs: 20,
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            route: "/api/proxy".to_string(),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36"
                .to_string(),
            timeout_secs: 20,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            downgrade_cooldown_ms: 8_000,
            recover_after_ms: 30_000,
            check_interval_ms: 5_000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_file: "./state/client-state.json".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_player_timings() {
        let config = Config::default();
        assert_eq!(config.playback.downgrade_cooldown(), Duration::from_secs(8));
        assert_eq!(config.playback.recover_after(), Duration::from_secs(30));
        assert_eq!(config.playback.check_interval(), Duration::from_secs(5));
        assert_eq!(config.proxy.route, "/api/proxy");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            [server]
            port = 3000

            [api]
            base_url = "https://api.example.com"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.api.base_url, "https://api.example.com");
        assert_eq!(config.api.timeout_secs, 20);
        assert_eq!(config.playback.downgrade_cooldown_ms, 8_000);
    }

    #[test]
    fn invalid_toml_is_config_error() {
        let err = Config::from_toml("server = 1").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn zero_check_interval_is_rejected() {
        let err = Config::from_toml("[playback]\ncheck_interval_ms = 0").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn listen_addr_parses() {
        let addr = Config::default().listen_addr().unwrap();
        assert_eq!(addr.port(), 8080);
    }
}
