//! WebSocket 中继服务：监听、每连接读写任务、规范化与广播的串联。

use crate::config::WebSocketConfig;
use crate::ws_server::broadcaster;
use crate::ws_server::client_session::{ClientSession, Outbound};
use crate::ws_server::connection_manager::ConnectionManager;
use crate::ws_server::message_normalizer;
use crate::error::AppError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use rust_websocket_utils::message::RelayFrame;
use rust_websocket_utils::server::transport::{ServerTransport, WsStream};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;

/// 写任务退出前发送 / 刷出 Close 帧的最长等待时间。失联对端不会读取，不能无限等待。
const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

/// WebSocket 服务结构体，封装了配置、连接管理器和已绑定的监听器。
pub struct WsService {
    config: WebSocketConfig,
    connection_manager: Arc<ConnectionManager>,
    transport: ServerTransport,
}

impl WsService {
    /// 绑定监听地址并创建 WsService 实例。
    pub async fn bind(config: WebSocketConfig, connection_manager: Arc<ConnectionManager>) -> Result<Self, AppError> {
        let transport = ServerTransport::bind(&config.listen_addr()).await?;
        info!("[WsService] WS server on {}", transport.local_addr());
        Ok(Self {
            config,
            connection_manager,
            transport,
        })
    }

    /// 实际监听的地址。
    pub fn local_addr(&self) -> SocketAddr {
        self.transport.local_addr()
    }

    /// 运行服务直到 `shutdown` 变为 `true`。
    pub async fn start(self, shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
        let connection_manager = self.connection_manager;
        let config = Arc::new(self.config);

        let on_new_connection = move |ws_stream: WsStream, peer_addr: SocketAddr| {
            let connection_manager = Arc::clone(&connection_manager);
            let config = Arc::clone(&config);
            async move {
                handle_connection(ws_stream, peer_addr, connection_manager, config).await;
            }
        };

        self.transport.serve(on_new_connection, shutdown).await?;
        info!("[WsService] WebSocket 服务已停止接受新连接。");
        Ok(())
    }
}

/// 处理单个连接的完整生命周期：注册、读循环、写任务、注销。
async fn handle_connection(
    ws_stream: WsStream,
    peer_addr: SocketAddr,
    connection_manager: Arc<ConnectionManager>,
    config: Arc<WebSocketConfig>,
) {
    let (ws_sender, ws_receiver) = ws_stream.split();
    let (outbound_tx, outbound_rx) = mpsc::channel::<Outbound>(config.outbound_queue_capacity.max(1));

    let client_session = connection_manager.add_client(peer_addr, outbound_tx);
    let sender_task = tokio::spawn(run_sender(Arc::clone(&client_session), ws_sender, outbound_rx));

    run_receiver(&client_session, ws_receiver, &connection_manager, &config).await;

    // 读循环结束（对端关闭、协议错误或被驱逐）：注销并通知写任务退出
    connection_manager.remove_client(&client_session.client_id);
    if let Err(e) = sender_task.await {
        error!("[WsService] 客户端 {} 的写任务异常结束: {:?}", client_session.addr, e);
    }
    debug!("[WsService] 客户端 {} 的连接资源已全部释放。", client_session.addr);
}

/// 读循环：逐帧读取，业务帧经规范化后广播，Pong 恢复活跃标志。
async fn run_receiver(
    client_session: &Arc<ClientSession>,
    mut ws_receiver: SplitStream<WsStream>,
    connection_manager: &ConnectionManager,
    config: &WebSocketConfig,
) {
    let mut close_signal = client_session.close_signal();
    if client_session.is_closing() {
        return;
    }
    loop {
        let message = tokio::select! {
            next = ws_receiver.next() => next,
            _ = close_signal.changed() => {
                debug!("[WsService] 客户端 {} 收到关闭信号，读循环退出。", client_session.addr);
                break;
            }
        };

        match message {
            Some(Ok(Message::Pong(_))) => {
                connection_manager.mark_alive(&client_session.client_id);
            }
            Some(Ok(Message::Close(close_frame))) => {
                debug!("[WsService] 客户端 {} 发送了 Close 帧: {:?}", client_session.addr, close_frame);
                break;
            }
            Some(Ok(message)) => {
                // Ping 的 Pong 回复由底层库自动排队
                if let Some(frame) = RelayFrame::from_ws_message(message) {
                    relay_frame(frame, connection_manager, config);
                }
            }
            Some(Err(e)) => {
                warn!("[WsService] 客户端 {} 连接出错: {}。移除该连接。", client_session.addr, e);
                break;
            }
            None => break,
        }
    }
}

/// 规范化并广播一条入站业务帧。
fn relay_frame(frame: RelayFrame, connection_manager: &ConnectionManager, config: &WebSocketConfig) {
    if let Some(text) = frame.as_text().filter(|_| config.rx_log_preview_chars > 0) {
        let preview: String = text.chars().take(config.rx_log_preview_chars).collect();
        info!("RX: {}", preview);
    }
    let outgoing = message_normalizer::normalize(frame);
    broadcaster::broadcast(connection_manager, outgoing);
}

/// 写任务：独占 socket 的发送端，按 FIFO 顺序写出出站队列中的帧和 Ping。
async fn run_sender(
    client_session: Arc<ClientSession>,
    mut ws_sender: SplitSink<WsStream, Message>,
    mut outbound_rx: mpsc::Receiver<Outbound>,
) {
    let mut close_signal = client_session.close_signal();
    // 订阅之前可能已被要求关闭，每轮都检查一次；退出后仍要走下面的关闭握手
    while !client_session.is_closing() {
        let outbound = tokio::select! {
            next = outbound_rx.recv() => match next {
                Some(outbound) => outbound,
                None => break,
            },
            _ = close_signal.changed() => break,
        };

        let message = match outbound {
            // 最后一个持有者直接取走负载，其余连接各复制一份
            Outbound::Frame(frame) => Message::from(Arc::unwrap_or_clone(frame)),
            Outbound::Probe => Message::Ping(Vec::new()),
        };
        // 对端失联时 send 可能因写缓冲区满而挂起，驱逐信号必须能打断它
        let sent = tokio::select! {
            sent = ws_sender.send(message) => sent,
            _ = close_signal.changed() => break,
        };
        if let Err(e) = sent {
            warn!("[WsService] 向客户端 {} 写入失败: {}。移除该连接。", client_session.addr, e);
            // 让读循环也退出
            client_session.terminate();
            break;
        }
    }

    // 对端先发 Close 时底层库已排好回复，这里把它刷出去完成关闭握手；
    // 我们主动关闭（驱逐、停止）时则发出自己的 Close 帧
    match timeout(CLOSE_FLUSH_TIMEOUT, ws_sender.close()).await {
        Ok(Ok(())) => debug!("[WsService] 客户端 {} 的关闭握手已发出。", client_session.addr),
        Ok(Err(e)) => debug!("[WsService] 客户端 {} 关闭时写入失败: {}", client_session.addr, e),
        Err(_) => warn!("[WsService] 客户端 {} 的 Close 帧在 {:?} 内未能写出，直接断开。", client_session.addr, CLOSE_FLUSH_TIMEOUT),
    }
    debug!("[WsService] 客户端 {} 的写任务结束。", client_session.addr);
}
