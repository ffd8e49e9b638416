use thiserror::Error;

/// 应用的主要错误类型
///
/// 这个枚举定义了中继服务中可能出现的各种错误类型。
/// WebSocket 连接级别的失败不会出现在这里：它们只导致对应连接被移除。
#[derive(Error, Debug)]
pub enum AppError {
    #[error("WebSocket 服务错误: {0}")]
    WebSocketService(#[from] rust_websocket_utils::error::WsError),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("控制接口错误: {0}")]
    ControlApi(String),

    #[error("控制指令下发失败: {0}")]
    ControlSink(String),

    #[error("I/O错误: {0}")]
    Io(#[from] std::io::Error),
}
