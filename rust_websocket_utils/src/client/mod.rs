// rust_websocket_utils/src/client/mod.rs

//! WebSocket 客户端模块。
//!
//! 供仪表盘、传感器模拟器以及集成测试连接中继服务：建立连接、发送 `RelayFrame`、
//! 逐帧接收广播。Ping 控制帧在接收时由底层库自动回复 Pong。

pub mod transport; // 客户端传输层：connect_client、ClientConnection、receive_frame
