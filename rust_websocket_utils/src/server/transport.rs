// rust_websocket_utils/src/server/transport.rs

//! 包含服务端 WebSocket 监听、接受连接和握手逻辑。

use crate::error::WsError; // 引入自定义错误类型
use log::{debug, error, info};
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio_tungstenite::{accept_async, WebSocketStream};

/// `WsStream` 是一个类型别名，代表经过 WebSocket 握手后的 TCP 流。
pub type WsStream = WebSocketStream<TcpStream>;

/// `ServerTransport` 结构体负责处理 WebSocket 服务端的监听和连接接受。
///
/// 绑定 (`bind`) 与服务 (`serve`) 分为两步，这样调用方可以先绑定到端口 0，
/// 通过 `local_addr` 拿到实际端口后再开始服务（测试中常用）。
pub struct ServerTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ServerTransport {
    /// 绑定 TCP 监听器到指定地址 (例如 "0.0.0.0:8080")。
    pub async fn bind(addr: &str) -> Result<Self, WsError> {
        let listener = TcpListener::bind(addr).await.map_err(|source| WsError::TcpBindError {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = listener.local_addr()?;
        info!("WebSocket 服务器正在监听地址: {}", local_addr);
        Ok(Self { listener, local_addr })
    }

    /// 实际监听的地址（绑定端口 0 时可据此得到系统分配的端口）。
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 开始接受连接，直到 `shutdown` 变为 `true`（或其发送端被丢弃）。
    ///
    /// 对于每一个成功完成握手的连接，都会在新的 Tokio 任务中调用 `on_connect`。
    /// 单个连接的握手失败或 `accept` 失败只会被记录，服务器继续运行。
    ///
    /// # Arguments
    /// * `on_connect`: 新 WebSocket 连接建立时调用的异步回调，参数为握手后的 `WsStream` 和对端地址。
    /// * `shutdown`: 停止信号。
    pub async fn serve<F, Fut>(self, on_connect: F, mut shutdown: watch::Receiver<bool>) -> Result<(), WsError>
    where
        F: Fn(WsStream, SocketAddr) -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((tcp_stream, peer_addr)) => {
                        debug!("从 {} 接受了新的 TCP 连接", peer_addr);
                        let on_connect_callback = on_connect.clone();

                        // 握手放在独立任务中，慢速客户端不会阻塞 accept 循环
                        tokio::spawn(async move {
                            match accept_async(tcp_stream).await {
                                Ok(ws_stream) => {
                                    debug!("与 {} 的 WebSocket 握手成功", peer_addr);
                                    on_connect_callback(ws_stream, peer_addr).await;
                                }
                                Err(e) => {
                                    error!("与 {} 的 WebSocket 握手失败: {}", peer_addr, e);
                                }
                            }
                        });
                    }
                    Err(e) => {
                        error!("接受 TCP 连接失败: {}。服务器将继续运行。", e);
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("WebSocket 服务器 {} 收到停止信号，不再接受新连接。", self.local_addr);
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}
