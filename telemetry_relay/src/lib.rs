//! `telemetry_relay` 遥测中继服务核心库。
//!
//! 传感器板通过 WebSocket 上报惯性测量数据，本服务把原始读数规范化后广播给所有已连接的仪表盘，
//! 并定期用协议层 Ping 清理失联的连接。
//!
//! 主要模块包括：
//! - `api`: 标定与 PID 调参的 HTTP 控制接口。
//! - `config`: 配置文件的加载与全局访问。
//! - `error`: 应用特定的错误类型。
//! - `ws_server`: WebSocket 服务端，处理连接登记、心跳、规范化与广播。

pub mod api;
pub mod config;
pub mod error;
pub mod ws_server;
