// rust_websocket_utils/src/client/transport.rs

//! 客户端 WebSocket 传输层核心逻辑。
//!
//! 提供连接到中继服务器、发送业务帧、接收业务帧的最小封装。

use crate::error::WsError; // 引入本库定义的统一错误类型
use crate::message::RelayFrame; // 业务帧
use futures_util::{
    stream::{SplitSink, SplitStream}, // 用于将 WebSocket 流拆分为发送端和接收端
    SinkExt,
    StreamExt,
};
use log::{debug, error, info};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::Message,
    tungstenite::Error as TungsteniteError,
    WebSocketStream,
};
use url::Url;

/// `ClientWsStream` 类型别名，代表一个可能经过 TLS 加密的 TCP WebSocket 流。
pub type ClientWsStream = WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// `ClientConnection` 结构体代表一个活动的客户端 WebSocket 连接。
///
/// 发送端与接收端分开持有，调用方可以把接收端移入独立任务持续读取
/// （只有持续读取，底层库才会及时回复服务器的 Ping）。
pub struct ClientConnection {
    /// 用于向服务器发送消息的 `Sink`。
    pub ws_sender: SplitSink<ClientWsStream, Message>,
    /// 用于从服务器接收消息的 `Stream`。
    pub ws_receiver: SplitStream<ClientWsStream>,
}

impl ClientConnection {
    /// 向服务器发送一个业务帧，保留其文本 / 二进制类型。
    pub async fn send_frame(&mut self, frame: RelayFrame) -> Result<(), WsError> {
        debug!("客户端：准备发送帧 (二进制: {}, 长度: {} 字节)", frame.is_binary(), frame.len());
        self.ws_sender.send(frame.into()).await?;
        Ok(())
    }

    /// 发送一个 JSON 文本帧。
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<(), WsError> {
        self.send_frame(RelayFrame::Text(text.into())).await
    }

    /// 发送 Close 帧，主动结束连接。
    pub async fn close(&mut self) -> Result<(), WsError> {
        self.ws_sender.send(Message::Close(None)).await?;
        Ok(())
    }
}

/// 异步连接到指定的 WebSocket 服务器。
///
/// # Arguments
/// * `url_str` - 服务器 URL，例如 "ws://127.0.0.1:8080"。
///
/// # Returns
/// 握手成功后返回拆分好的 `ClientConnection`；URL 无效或连接失败时返回相应的 `WsError`。
pub async fn connect_client(url_str: &str) -> Result<ClientConnection, WsError> {
    info!("客户端：开始尝试连接到 WebSocket 服务器，URL: {}", url_str);
    let parsed_url = Url::parse(url_str)
        .map_err(|e| WsError::InvalidUrl(format!("无效的 WebSocket URL '{}': {}", url_str, e)))?;

    match connect_async(parsed_url.as_str()).await {
        Ok((ws_stream, response)) => {
            info!("客户端：已成功连接到 {} (HTTP 状态码: {})", url_str, response.status());
            let (ws_sender, ws_receiver) = ws_stream.split();
            Ok(ClientConnection { ws_sender, ws_receiver })
        }
        Err(e) => {
            error!("客户端：连接到 {} 失败，错误: {}", url_str, e);
            Err(WsError::WebSocketProtocolError(e))
        }
    }
}

/// 从接收流中读取下一条业务帧。
///
/// 控制帧 (Ping / Pong / 原始 Frame) 会被跳过；读取 Ping 的同时底层库会排队一个 Pong，
/// 并在下一次读写时发出。
///
/// # Returns
/// * `Some(Ok(frame))`：收到一条文本或二进制帧。
/// * `Some(Err(e))`：底层协议或 I/O 错误。
/// * `None`：连接已关闭（收到 Close 帧或流结束）。
pub async fn receive_frame(ws_receiver: &mut SplitStream<ClientWsStream>) -> Option<Result<RelayFrame, WsError>> {
    loop {
        match ws_receiver.next().await {
            Some(Ok(Message::Close(close_frame))) => {
                debug!("客户端：收到 Close 控制帧，详细信息: {:?}", close_frame);
                break None;
            }
            Some(Ok(message)) => {
                if let Some(frame) = RelayFrame::from_ws_message(message) {
                    break Some(Ok(frame));
                }
                // 其余控制帧无需应用层处理
            }
            Some(Err(TungsteniteError::ConnectionClosed | TungsteniteError::AlreadyClosed)) => {
                debug!("客户端：连接已关闭。");
                break None;
            }
            Some(Err(e)) => {
                error!("客户端：从 WebSocket 流接收消息时发生底层错误: {}", e);
                break Some(Err(WsError::WebSocketProtocolError(e)));
            }
            None => {
                debug!("客户端：WebSocket 接收流已结束。");
                break None;
            }
        }
    }
}
