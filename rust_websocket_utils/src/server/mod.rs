// rust_websocket_utils/src/server/mod.rs

//! WebSocket 服务端模块。
//!
//! 本模块负责服务器端的监听与握手：在指定地址上接受 TCP 连接、完成 WebSocket 升级握手，
//! 然后把建立好的流交给上层回调；收到停止信号后不再接受新连接。

pub mod transport; // 服务器端传输层：ServerTransport、WsStream
