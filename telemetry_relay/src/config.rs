use crate::error::AppError;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

/// WebSocket 服务的默认主机地址（监听所有网络接口）
pub const DEFAULT_WS_HOST: &str = "0.0.0.0";
/// WebSocket 服务的默认端口号
pub const DEFAULT_WS_PORT: u16 = 8080;
/// 控制接口 (HTTP) 的默认端口号
pub const DEFAULT_CONTROL_API_PORT: u16 = 3000;
/// 配置文件名
pub const CONFIG_FILE_NAME: &str = "app_settings.json";
/// 可用于显式指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG_PATH";

/// WebSocket 中继服务配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WebSocketConfig {
    /// WebSocket 服务绑定的主机地址
    pub host: String,
    /// WebSocket 服务监听的端口号
    pub port: u16,
    /// 心跳探测周期（单位：秒）。失联客户端会在 1~2 个周期内被移除。
    pub heartbeat_interval_seconds: u64,
    /// 每个连接的出站队列容量（帧数）。队列满时该连接丢弃新帧。
    pub outbound_queue_capacity: usize,
    /// 日志中打印入站文本帧的前多少个字符，0 表示不打印
    pub rx_log_preview_chars: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_WS_HOST.to_string(),
            port: DEFAULT_WS_PORT,
            heartbeat_interval_seconds: 15, // 每 15 秒探测一次
            outbound_queue_capacity: 64,
            rx_log_preview_chars: 200,
        }
    }
}

impl WebSocketConfig {
    /// 监听地址，形如 "0.0.0.0:8080"
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 心跳周期。配置为 0 时按 1 秒处理，避免空转。
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_seconds.max(1))
    }
}

/// 标定 / PID 控制接口配置
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ControlApiConfig {
    /// 是否启动控制接口
    pub enabled: bool,
    pub host: String,
    pub port: u16,
}

impl Default for ControlApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: DEFAULT_WS_HOST.to_string(),
            port: DEFAULT_CONTROL_API_PORT,
        }
    }
}

impl ControlApiConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 应用的主配置结构体
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// WebSocket 中继的相关配置
    pub websocket: WebSocketConfig,
    /// 控制接口的相关配置
    pub control_api: ControlApiConfig,
}

// 全局静态应用配置实例
static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// 从指定路径读取并解析配置文件
pub fn read_config_file(path: &Path) -> Result<AppConfig, AppError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str::<AppConfig>(&content)
        .map_err(|e| AppError::ConfigError(format!("解析配置文件 {:?} 失败: {}", path, e)))
}

/// 加载指定路径的配置文件；文件不存在或已损坏时使用默认配置并写回该路径。
pub fn load_or_create_config_at(path: &Path) -> AppConfig {
    match read_config_file(path) {
        Ok(config) => {
            info!("[配置模块] 已成功从配置文件 {:?} 加载应用配置。", path);
            config
        }
        Err(AppError::Io(e)) => {
            info!(
                "[配置模块] 未在 {:?} 找到配置文件或读取时发生错误 (错误: {}). 将使用默认配置并尝试创建新文件。",
                path, e
            );
            let default_config = AppConfig::default();
            save_config(&default_config, path);
            default_config
        }
        Err(e) => {
            warn!("[配置模块] 警告：{}。文件可能已损坏，将使用默认配置并尝试覆盖。", e);
            let default_config = AppConfig::default();
            save_config(&default_config, path);
            default_config
        }
    }
}

/// 获取配置文件路径
fn get_config_file_path() -> PathBuf {
    // 环境变量优先
    if let Ok(explicit) = env::var(CONFIG_PATH_ENV) {
        return PathBuf::from(explicit);
    }

    // 其次尝试当前目录
    let current_dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config_file_path = current_dir.join(CONFIG_FILE_NAME);
    let current_dir_writable = fs::metadata(&current_dir)
        .map(|m| !m.permissions().readonly())
        .unwrap_or(false);
    if config_file_path.exists() || current_dir_writable {
        return config_file_path;
    }

    // 当前目录不可写时使用用户主目录
    if let Ok(home) = env::var("HOME") {
        return PathBuf::from(home).join(".config").join("telemetry_relay").join(CONFIG_FILE_NAME);
    }

    config_file_path
}

/// 保存配置到文件
fn save_config(config: &AppConfig, path: &Path) {
    // 确保目录存在
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("[配置模块] 错误：创建配置目录 {:?} 失败: {}", parent, e);
                return;
            }
        }
    }

    match serde_json::to_string_pretty(config) {
        Ok(content) => {
            if let Err(e) = fs::write(path, content) {
                warn!("[配置模块] 错误：将配置写入文件 {:?} 时失败: {}", path, e);
            } else {
                info!("[配置模块] 已成功将当前配置保存到 {:?}.", path);
            }
        }
        Err(e) => {
            warn!("[配置模块] 错误：序列化配置信息以便保存时失败: {}", e);
        }
    }
}

/// 初始化全局应用配置，返回已安装的配置
pub fn init_config() -> &'static AppConfig {
    let config_file_path = get_config_file_path();
    let loaded_config = load_or_create_config_at(&config_file_path);
    if APP_CONFIG.set(loaded_config).is_err() {
        warn!("[配置模块] 全局应用配置 APP_CONFIG 已被初始化，本次 init_config 调用未覆盖已有配置。请检查初始化流程。");
    }
    info!("[配置模块] 应用配置已成功初始化完毕。");
    get_config()
}

/// 获取已加载的全局应用配置；尚未初始化时返回默认配置
pub fn get_config() -> &'static AppConfig {
    APP_CONFIG.get_or_init(AppConfig::default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_config_path() -> (TempDir, PathBuf) {
        let dir = TempDir::new().expect("创建临时目录失败");
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
        (dir, path)
    }

    #[test]
    fn missing_file_creates_defaults() {
        let (_dir, path) = temp_config_path();
        let config = load_or_create_config_at(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.websocket.port, 8080);
        assert_eq!(config.websocket.heartbeat_interval(), Duration::from_secs(15));
        assert!(path.exists(), "缺失的配置文件应被创建（包括父目录）");

        let reread = read_config_file(&path).expect("重新读取新建的配置文件失败");
        assert_eq!(reread, config);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = TempDir::new().expect("创建临时目录失败");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, r#"{"websocket":{"port":9001,"heartbeat_interval_seconds":5}}"#).unwrap();

        let config = load_or_create_config_at(&path);
        assert_eq!(config.websocket.port, 9001);
        assert_eq!(config.websocket.heartbeat_interval_seconds, 5);
        assert_eq!(config.websocket.host, DEFAULT_WS_HOST);
        assert_eq!(config.websocket.rx_log_preview_chars, 200);
        assert!(config.control_api.enabled);
    }

    #[test]
    fn corrupt_file_is_replaced_with_defaults() {
        let dir = TempDir::new().expect("创建临时目录失败");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let config = load_or_create_config_at(&path);
        assert_eq!(config, AppConfig::default());
        assert_eq!(read_config_file(&path).expect("损坏的文件应已被覆盖"), AppConfig::default());
    }

    #[test]
    fn zero_heartbeat_interval_is_clamped() {
        let config = WebSocketConfig { heartbeat_interval_seconds: 0, ..WebSocketConfig::default() };
        assert_eq!(config.heartbeat_interval(), Duration::from_secs(1));
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }
}
