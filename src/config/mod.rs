//! 统一配置系统
//!
//! 提供TOML/JSON配置文件、环境变量覆盖和校验

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 行为系统主配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorConfig {
    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,

    /// 注册表配置
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl BehaviorConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("BEHAVIOR_LOG_LEVEL") {
            if let Ok(level) = val.parse() {
                self.logging.level = level;
            }
        }
        if let Ok(val) = env::var("BEHAVIOR_LOG_FILTER") {
            self.logging.filter = Some(val);
        }
        if let Ok(val) = env::var("BEHAVIOR_REGISTRY_ALLOW_OVERWRITE") {
            self.registry.allow_overwrite = val.parse().unwrap_or(self.registry.allow_overwrite);
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.logging.validate()
    }

    /// 加载当前目录下的配置并应用环境变量覆盖
    pub fn load() -> Self {
        Self::load_from_dir(".")
    }

    /// 在指定目录中查找配置文件，然后应用环境变量覆盖
    ///
    /// 按以下顺序查找：
    /// 1. `<dir>/behavior.toml`
    /// 2. `<dir>/behavior.json`
    /// 3. ~/.config/game_engine/behavior.toml
    /// 4. 使用默认配置
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Self {
        let mut config = Self::load_or_default(dir.as_ref());
        config.apply_env_overrides();
        config
    }

    fn load_or_default(dir: &Path) -> Self {
        let toml_path = dir.join("behavior.toml");
        if let Ok(config) = Self::from_toml_file(&toml_path) {
            tracing::info!(target: "config", "Loaded config from {:?}", toml_path);
            return config;
        }

        let json_path = dir.join("behavior.json");
        if let Ok(config) = Self::from_json_file(&json_path) {
            tracing::info!(target: "config", "Loaded config from {:?}", json_path);
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("game_engine")
                .join("behavior.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                tracing::info!(target: "config", "Loaded config from {:?}", config_path);
                return config;
            }
        }

        tracing::info!(target: "config", "Using default configuration");
        Self::default()
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    pub level: LogLevel,

    /// 额外的过滤指令，例如 `behavior=trace,registry=debug`
    #[serde(default)]
    pub filter: Option<String>,

    /// 是否输出到控制台
    pub log_to_console: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            filter: None,
            log_to_console: true,
        }
    }
}

impl LoggingConfig {
    /// 组合成 `EnvFilter` 指令
    pub fn directive(&self) -> String {
        match &self.filter {
            Some(filter) if !filter.is_empty() => format!("{},{}", self.level.as_str(), filter),
            _ => self.level.as_str().to_string(),
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        tracing_subscriber::EnvFilter::try_new(self.directive())
            .map(|_| ())
            .map_err(|e| ConfigError::ValidationError(format!("invalid log filter: {e}")))
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(ConfigError::ParseError(format!("unknown log level: {other}"))),
        }
    }
}

/// 注册表配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// 允许同名行为覆盖已注册的描述符（热重载时使用）
    #[serde(default)]
    pub allow_overwrite: bool,
}
