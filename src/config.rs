//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置，`PORT` 环境变量可覆盖监听端口

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

use log::LevelFilter;

use crate::services::valuation_service::FALLBACK_FCF;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// 行情数据源配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// 数据源根地址
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 请求头 User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// 估值配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationConfig {
    /// 取不到经营现金流时使用的兜底值
    #[serde(default = "default_fallback_fcf")]
    pub fallback_fcf: f64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 数据源配置
    #[serde(default)]
    pub provider: ProviderConfig,
    /// 估值配置
    #[serde(default)]
    pub valuation: ValuationConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_base_url() -> String { "https://query2.finance.yahoo.com".to_string() }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36".to_string()
}
fn default_fallback_fcf() -> f64 { FALLBACK_FCF }
fn default_log_level() -> String { "info".to_string() }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl Default for ValuationConfig {
    fn default() -> Self {
        Self {
            fallback_fcf: default_fallback_fcf(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl LogConfig {
    /// 解析日志级别，无法识别时返回 None
    pub fn level_filter(&self) -> Option<LevelFilter> {
        self.level.trim().parse().ok()
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值，最后应用环境变量覆盖
    pub fn load() -> Self {
        let mut config = Self::load_file_or_default();
        config.apply_port_override(env::var("PORT").ok().as_deref());
        config
    }

    fn load_file_or_default() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        log::info!("从 {} 加载配置成功", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        log::info!("使用默认配置");
        Self::default()
    }

    /// 用 `PORT` 的值覆盖监听端口，无法解析时保留原值
    pub fn apply_port_override(&mut self, port: Option<&str>) {
        let Some(raw) = port else { return };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(e) => log::warn!("PORT 环境变量无效 ({}): {}，使用端口 {}", raw, e, self.server.port),
        }
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
