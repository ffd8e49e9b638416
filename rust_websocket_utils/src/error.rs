// rust_websocket_utils/src/error.rs

//! 定义 WebSocket 工具库相关的错误类型。

use thiserror::Error; // 引入 thiserror 来简化错误类型的定义

/// WebSocket 工具库的统一错误类型。
#[derive(Error, Debug)]
pub enum WsError {
    /// 当 TCP 监听器无法绑定到指定地址时发生。
    #[error("TCP 监听器绑定错误 ({addr}): {source}")]
    TcpBindError {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// WebSocket 协议相关的错误。
    /// 例如，握手失败、连接被重置、帧格式不正确等。
    #[error("WebSocket协议错误: {0}")]
    WebSocketProtocolError(#[from] tokio_tungstenite::tungstenite::Error),

    /// 底层 I/O 错误。
    #[error("I/O错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 无效的 URL 格式。
    #[error("无效的URL: {0}")]
    InvalidUrl(String),
}
