use chrono::{DateTime, Utc};
use rust_websocket_utils::message::RelayFrame;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

/// 发往某个客户端写任务的指令。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// 广播下来的业务帧，按原样（文本 / 二进制）写出。所有接收者共享同一份负载。
    Frame(Arc<RelayFrame>),
    /// 心跳探测：写出一个协议层 Ping 控制帧。
    Probe,
}

/// 向客户端出站队列投递指令的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// 已放入出站队列。
    Queued,
    /// 出站队列已满（客户端太慢），本条被丢弃。
    QueueFull,
    /// 写任务已结束或连接正在关闭，不可写。
    NotWritable,
}

/// 代表一个已连接到中继的 WebSocket 客户端的会话状态及相关句柄。
///
/// 每个成功建立的 WebSocket 连接都会在服务端对应一个 `ClientSession` 实例。
/// 活跃标志 `is_alive` 只通过 `ConnectionManager` 的方法读写：
/// 心跳监视器在探测前把它置为 `false`，连接收到 Pong 后把它恢复为 `true`。
#[derive(Debug)]
pub struct ClientSession {
    /// 由服务端在此会话创建时生成的唯一客户端标识符 (UUID v4)。
    pub client_id: Uuid,

    /// 客户端的 IP 地址和端口，仅用于日志诊断。
    pub addr: SocketAddr,

    /// 此客户端会话被创建的时间戳 (UTC)。
    pub creation_time: DateTime<Utc>,

    /// 出站队列发送端。写任务从对应的接收端取出指令并写入 socket。
    sender: mpsc::Sender<Outbound>,

    /// 活跃标志。
    is_alive: AtomicBool,

    /// 最近一次收到 Pong 的时间，用于移除时的诊断日志。
    last_pong: RwLock<Option<DateTime<Utc>>>,

    /// 关闭信号。置为 `true` 后，该连接的读循环和写任务都会立即退出并释放 socket。
    connection_should_close: watch::Sender<bool>,
}

impl ClientSession {
    /// 创建一个新的 `ClientSession` 实例，活跃标志初始为 `true`。
    ///
    /// # 参数
    /// * `addr`: 新连接客户端的网络源地址。
    /// * `sender`: 该客户端出站队列的发送端。
    pub fn new(addr: SocketAddr, sender: mpsc::Sender<Outbound>) -> Self {
        let (connection_should_close, _) = watch::channel(false);
        Self {
            client_id: Uuid::new_v4(),
            addr,
            creation_time: Utc::now(),
            sender,
            is_alive: AtomicBool::new(true),
            last_pong: RwLock::new(None),
            connection_should_close,
        }
    }

    /// 非阻塞地把一条指令放入出站队列。
    ///
    /// 永远不会等待：慢客户端的队列满了就丢弃，已关闭的连接直接跳过。
    pub fn try_deliver(&self, outbound: Outbound) -> DeliveryOutcome {
        if self.is_closing() {
            return DeliveryOutcome::NotWritable;
        }
        match self.sender.try_send(outbound) {
            Ok(()) => DeliveryOutcome::Queued,
            Err(mpsc::error::TrySendError::Full(_)) => DeliveryOutcome::QueueFull,
            Err(mpsc::error::TrySendError::Closed(_)) => DeliveryOutcome::NotWritable,
        }
    }

    /// 请求关闭此连接。返回 `false` 表示没有任务在监听关闭信号（连接任务已经退出）。
    pub fn terminate(&self) -> bool {
        self.connection_should_close.send_replace(true);
        self.connection_should_close.receiver_count() > 0
    }

    /// 是否已请求关闭。
    pub fn is_closing(&self) -> bool {
        *self.connection_should_close.borrow()
    }

    /// 订阅关闭信号，供读循环和写任务在 `select!` 中等待。
    pub fn close_signal(&self) -> watch::Receiver<bool> {
        self.connection_should_close.subscribe()
    }

    /// 最近一次收到 Pong 的时间。
    pub fn last_pong(&self) -> Option<DateTime<Utc>> {
        self.last_pong.read().map(|guard| *guard).unwrap_or(None)
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.is_alive.load(Ordering::SeqCst)
    }

    /// 原子地把活跃标志置为 `false`，返回之前的值。
    pub(crate) fn take_alive(&self) -> bool {
        self.is_alive.swap(false, Ordering::SeqCst)
    }

    pub(crate) fn set_alive(&self, alive: bool) {
        self.is_alive.store(alive, Ordering::SeqCst);
        if alive {
            if let Ok(mut guard) = self.last_pong.write() {
                *guard = Some(Utc::now());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    #[tokio::test]
    async fn full_queue_drops_instead_of_waiting() {
        let (tx, mut rx) = mpsc::channel(1);
        let session = ClientSession::new(test_addr(), tx);

        assert_eq!(session.try_deliver(Outbound::Probe), DeliveryOutcome::Queued);
        assert_eq!(
            session.try_deliver(Outbound::Frame(Arc::new(RelayFrame::Text("x".into())))),
            DeliveryOutcome::QueueFull
        );
        assert_eq!(rx.recv().await, Some(Outbound::Probe));
    }

    #[tokio::test]
    async fn closed_queue_or_terminated_session_is_not_writable() {
        let (tx, rx) = mpsc::channel(4);
        let session = ClientSession::new(test_addr(), tx);
        drop(rx);
        assert_eq!(session.try_deliver(Outbound::Probe), DeliveryOutcome::NotWritable);

        let (tx, _rx) = mpsc::channel(4);
        let session = ClientSession::new(test_addr(), tx);
        let mut signal = session.close_signal();
        assert!(session.terminate(), "有订阅者时 terminate 应返回 true");
        assert!(session.is_closing());
        signal.changed().await.expect("关闭信号应送达订阅者");
        assert!(*signal.borrow());
        assert_eq!(session.try_deliver(Outbound::Probe), DeliveryOutcome::NotWritable);
    }

    #[test]
    fn terminate_without_listeners_reports_false() {
        let (tx, _rx) = mpsc::channel(4);
        let session = ClientSession::new(test_addr(), tx);
        assert!(!session.terminate());
        assert!(session.is_closing());
    }

    #[test]
    fn pong_records_timestamp() {
        let (tx, _rx) = mpsc::channel(4);
        let session = ClientSession::new(test_addr(), tx);
        assert!(session.is_alive());
        assert_eq!(session.last_pong(), None);
        session.set_alive(false);
        assert!(!session.is_alive());
        session.set_alive(true);
        assert!(session.is_alive());
        assert!(session.last_pong().is_some());
    }
}
