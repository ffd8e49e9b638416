//! `rust_websocket_utils` 是一个提供 WebSocket 通信实用功能的 Rust Crate。
//! 它封装了 `tokio-tungstenite` 的细节，让遥测中继和它的客户端只需要处理
//! 文本 / 二进制两种业务帧。
//!
//! 主要模块包括：
//! - `message`: 定义业务帧 `RelayFrame` 及其与底层 WebSocket 消息的互相转换。
//! - `error`: 定义库中使用的统一错误类型 `WsError`。
//! - `server`: 提供 WebSocket 服务器端传输层（监听、握手、优雅停止）。
//! - `client`: 提供 WebSocket 客户端传输层（连接、收发帧）。

pub mod client;
pub mod error;
pub mod message;
pub mod server;
