//! 服务端配置
//!
//! 可选的 JSON 配置文件（路径来自第一个命令行参数或 `ARENA_CONFIG`），
//! 之后用 `ARENA_HOST` / `ARENA_PORT` 覆盖监听地址。

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use protocol::{NetworkConfig, DEFAULT_TURN_SECONDS};

/// 配置文件路径环境变量
pub const CONFIG_ENV: &str = "ARENA_CONFIG";
pub const HOST_ENV: &str = "ARENA_HOST";
pub const PORT_ENV: &str = "ARENA_PORT";

/// 服务端配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub network: NetworkConfig,
    /// 创建房间时未指定步时所用的默认值（秒）
    pub default_turn_seconds: u32,
    /// 每个房间命令队列的容量
    pub room_command_buffer: usize,
    /// 房间计时周期（毫秒）
    pub tick_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            default_turn_seconds: DEFAULT_TURN_SECONDS,
            room_command_buffer: 64,
            tick_interval_ms: 1000,
        }
    }
}

impl ServerConfig {
    /// 从 JSON 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {:?}", path))?;
        serde_json::from_str(&content).with_context(|| format!("解析配置文件失败: {:?}", path))
    }

    /// 按命令行参数和环境变量组装配置
    pub fn from_env(arg: Option<String>) -> Result<Self> {
        let path = arg.or_else(|| std::env::var(CONFIG_ENV).ok());
        let config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.with_overrides(std::env::var(HOST_ENV).ok(), std::env::var(PORT_ENV).ok())
    }

    /// 应用监听地址覆盖
    pub fn with_overrides(mut self, host: Option<String>, port: Option<String>) -> Result<Self> {
        if let Some(host) = host {
            self.network.host = host;
        }
        if let Some(port) = port {
            self.network.port = port
                .parse()
                .with_context(|| format!("无效的端口: {}", port))?;
        }
        Ok(self)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.network.port, 3001);
        assert_eq!(config.default_turn_seconds, 60);
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "network": {{ "port": 4000 }}, "default_turn_seconds": 30 }}"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.network.port, 4000);
        assert_eq!(config.network.host, "127.0.0.1");
        assert_eq!(config.default_turn_seconds, 30);
        assert_eq!(config.room_command_buffer, 64);
    }

    #[test]
    fn test_load_errors() {
        assert!(ServerConfig::load("/nonexistent/arena.json").is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("解析配置文件失败"));
    }

    #[test]
    fn test_overrides() {
        let config = ServerConfig::default()
            .with_overrides(Some("0.0.0.0".to_string()), Some("9000".to_string()))
            .unwrap();
        assert_eq!(config.network.addr(), "0.0.0.0:9000");

        assert!(ServerConfig::default()
            .with_overrides(None, Some("http".to_string()))
            .is_err());
    }
}
