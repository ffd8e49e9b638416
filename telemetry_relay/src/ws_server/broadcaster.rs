//! 广播：把一条（已规范化的）帧投递给登记表中的所有连接，包括发送者本身。
//!
//! 尽力而为、至多一次：只把帧放入各连接的出站队列，不等待、不重试。
//! 某个连接不可写或队列已满时跳过它，其余连接不受影响。

use log::debug;
use rust_websocket_utils::message::RelayFrame;
use std::sync::Arc;

use crate::ws_server::client_session::{DeliveryOutcome, Outbound};
use crate::ws_server::connection_manager::ConnectionManager;

/// 一次广播的投递统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// 成功放入出站队列的连接数。
    pub delivered: usize,
    /// 因不可写或队列已满而跳过的连接数。
    pub skipped: usize,
}

/// 把 `frame` 广播给当前登记的所有连接。负载只分配一次，各出站队列共享。
pub fn broadcast(connection_manager: &ConnectionManager, frame: RelayFrame) -> BroadcastReport {
    let mut report = BroadcastReport::default();
    let frame = Arc::new(frame);
    connection_manager.for_each(|session| {
        match session.try_deliver(Outbound::Frame(Arc::clone(&frame))) {
            DeliveryOutcome::Queued => report.delivered += 1,
            DeliveryOutcome::QueueFull => {
                debug!("[广播] 客户端 {} 出站队列已满，本帧对其丢弃", session.addr);
                report.skipped += 1;
            }
            DeliveryOutcome::NotWritable => report.skipped += 1,
        }
    });
    debug!(
        "[广播] 帧 (二进制: {}, {} 字节) 已投递 {} 个连接，跳过 {} 个",
        frame.is_binary(),
        frame.len(),
        report.delivered,
        report.skipped
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn register(manager: &ConnectionManager, capacity: usize) -> mpsc::Receiver<Outbound> {
        let (tx, rx) = mpsc::channel(capacity);
        manager.add_client(SocketAddr::from(([127, 0, 0, 1], 9000)), tx);
        rx
    }

    async fn assert_received(rx: &mut mpsc::Receiver<Outbound>, frame: &RelayFrame) {
        assert_eq!(rx.recv().await, Some(Outbound::Frame(Arc::new(frame.clone()))));
    }

    #[tokio::test]
    async fn reaches_every_registered_connection() {
        for n in [1usize, 2, 25] {
            let manager = ConnectionManager::new();
            let mut receivers: Vec<_> = (0..n).map(|_| register(&manager, 8)).collect();
            let frame = RelayFrame::Text(format!("hello {}", n));

            let report = broadcast(&manager, frame.clone());
            assert_eq!(report, BroadcastReport { delivered: n, skipped: 0 });
            for rx in receivers.iter_mut() {
                assert_received(rx, &frame).await;
            }
        }
    }

    #[tokio::test]
    async fn binary_flag_is_preserved() {
        let manager = ConnectionManager::new();
        let mut rx = register(&manager, 4);
        let frame = RelayFrame::Binary(vec![1, 2, 3]);
        broadcast(&manager, frame);
        match rx.recv().await {
            Some(Outbound::Frame(received)) => assert!(received.is_binary()),
            other => panic!("预期收到二进制帧，实际: {:?}", other),
        }
    }

    #[tokio::test]
    async fn unwritable_or_slow_connections_do_not_affect_others() {
        let manager = ConnectionManager::new();
        let mut healthy = register(&manager, 8);
        let closed = register(&manager, 8);
        drop(closed);
        let _slow = register(&manager, 1);

        let first = RelayFrame::Text("first".into());
        let second = RelayFrame::Text("second".into());
        assert_eq!(broadcast(&manager, first.clone()), BroadcastReport { delivered: 2, skipped: 1 });
        // 慢连接的队列已满，第二帧对它丢弃
        assert_eq!(broadcast(&manager, second.clone()), BroadcastReport { delivered: 1, skipped: 2 });

        assert_received(&mut healthy, &first).await;
        assert_received(&mut healthy, &second).await;
    }

    #[tokio::test]
    async fn recipients_share_one_payload() {
        let manager = ConnectionManager::new();
        let mut receivers: Vec<_> = (0..3).map(|_| register(&manager, 4)).collect();
        broadcast(&manager, RelayFrame::Binary(vec![0u8; 64 * 1024]));

        let mut payloads = Vec::new();
        for rx in receivers.iter_mut() {
            match rx.recv().await {
                Some(Outbound::Frame(frame)) => payloads.push(frame),
                other => panic!("预期收到业务帧，实际: {:?}", other),
            }
        }
        assert!(payloads.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(Arc::strong_count(&payloads[0]), 3);
    }

    #[tokio::test]
    async fn empty_registry_is_a_no_op() {
        let manager = ConnectionManager::new();
        assert_eq!(broadcast(&manager, RelayFrame::Text("x".into())), BroadcastReport::default());
    }
}
