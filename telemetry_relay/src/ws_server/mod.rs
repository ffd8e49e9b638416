//! WebSocket 中继服务端模块。
//!
//! 连接登记、心跳探测、入站帧规范化与广播都在这里实现，`service` 负责把它们串起来。

pub mod broadcaster;
pub mod client_session;
pub mod connection_manager;
pub mod heartbeat_monitor;
pub mod message_normalizer;
pub mod service;
