// rust_websocket_utils/src/message.rs

//! 定义中继在 WebSocket 上交换的业务帧。
//!
//! 中继服务不关心消息的业务语义，只区分两类帧：
//! - 文本帧：通常是 UTF-8 JSON，可能被规范化后再广播；
//! - 二进制帧：不透明字节，原样转发。
//!
//! Ping / Pong / Close 等控制帧由传输层自行处理，不会以 `RelayFrame` 的形式出现在应用层。

use tokio_tungstenite::tungstenite::protocol::Message; // 底层 WebSocket 消息枚举

/// `RelayFrame` 代表一条可被广播的业务帧。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayFrame {
    /// 文本帧 (UTF-8)。
    Text(String),
    /// 二进制帧，内容不透明。
    Binary(Vec<u8>),
}

impl RelayFrame {
    /// 是否为二进制帧。广播时需要保留此标志。
    pub fn is_binary(&self) -> bool {
        matches!(self, RelayFrame::Binary(_))
    }

    /// 文本帧的内容；二进制帧返回 `None`。
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RelayFrame::Text(text) => Some(text),
            RelayFrame::Binary(_) => None,
        }
    }

    /// 帧负载的字节数。
    pub fn len(&self) -> usize {
        match self {
            RelayFrame::Text(text) => text.len(),
            RelayFrame::Binary(bytes) => bytes.len(),
        }
    }

    /// 负载是否为空。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从底层 WebSocket 消息中提取业务帧。
    ///
    /// 只有 `Text` 和 `Binary` 会被转换；控制帧 (Ping / Pong / Close / 原始 Frame) 返回 `None`，
    /// 由调用方决定如何处理。
    pub fn from_ws_message(message: Message) -> Option<RelayFrame> {
        match message {
            Message::Text(text) => Some(RelayFrame::Text(text)),
            Message::Binary(bytes) => Some(RelayFrame::Binary(bytes)),
            Message::Ping(_) | Message::Pong(_) | Message::Close(_) | Message::Frame(_) => None,
        }
    }
}

impl From<RelayFrame> for Message {
    fn from(frame: RelayFrame) -> Self {
        match frame {
            RelayFrame::Text(text) => Message::Text(text),
            RelayFrame::Binary(bytes) => Message::Binary(bytes),
        }
    }
}
