//! 心跳监视器模块。
//!
//! 无线链路（例如手机热点）掉线时 socket 往往不会收到任何关闭通知，连接会一直“挂着”。
//! 心跳监视器按固定周期向每个连接发送协议层 Ping，并移除上一轮 Ping 之后一直没有回 Pong 的连接，
//! 以便及时回收资源。失联连接会在 1~2 个周期内被发现。

use crate::ws_server::client_session::{DeliveryOutcome, Outbound};
use crate::ws_server::connection_manager::ConnectionManager;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// 一轮心跳检查的结果统计。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatReport {
    /// 本轮成功发出探测的连接数。
    pub probed: usize,
    /// 本轮被移除的连接数。
    pub evicted: usize,
}

/// `HeartbeatMonitor` 结构体定义。
///
/// 持有对 `ConnectionManager` 的共享引用以及探测周期。
pub struct HeartbeatMonitor {
    /// 对 `ConnectionManager` 的共享引用，用于读取快照、翻转活跃标志和移除失联连接。
    connection_manager: Arc<ConnectionManager>,

    /// 探测周期。
    check_interval: Duration,
}

impl HeartbeatMonitor {
    /// 创建一个新的 `HeartbeatMonitor` 实例。
    pub fn new(connection_manager: Arc<ConnectionManager>, check_interval: Duration) -> Self {
        info!("[心跳监视器] 正在创建 HeartbeatMonitor 实例。探测周期: {:?}", check_interval);
        Self {
            connection_manager,
            check_interval,
        }
    }

    /// 启动心跳监视器的主运行循环，直到 `shutdown` 变为 `true`（或其发送端被丢弃）。
    ///
    /// 第一轮检查在启动后一个周期才执行，之后每个周期执行一次。
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("[心跳监视器] 后台运行循环已启动，每 {:?} 探测一次所有连接。", self.check_interval);
        let mut ticker = interval_at(Instant::now() + self.check_interval, self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.check_clients();
                    debug!("[心跳监视器] 本轮检查完成: {:?}", report);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[心跳监视器] 收到停止信号，心跳监视器退出。");
                        break;
                    }
                }
            }
        }
    }

    /// 执行一轮检查。
    ///
    /// 对快照中的每个连接：
    /// 1. 活跃标志仍为 `false`（上一轮的 Ping 没有等到 Pong）：关闭并移除，本轮不再探测；
    /// 2. 否则把标志置为 `false` 并发送 Ping。Pong 到达时由连接任务把标志恢复为 `true`。
    pub fn check_clients(&self) -> HeartbeatReport {
        let mut report = HeartbeatReport::default();
        let clients_snapshot = self.connection_manager.get_all_client_sessions();
        if clients_snapshot.is_empty() {
            debug!("[心跳监视器] 当前没有活动的客户端连接，无需探测。");
            return report;
        }

        for client_session in &clients_snapshot {
            let client_id = client_session.client_id;
            let was_alive = match self.connection_manager.take_alive(&client_id) {
                Some(was_alive) => was_alive,
                None => continue, // 快照之后已被移除
            };

            if !was_alive {
                warn!(
                    "⚠️  [心跳监视器] 终止失联客户端 {} (ID: {})，最近一次 Pong: {:?}",
                    client_session.addr,
                    client_id,
                    client_session.last_pong()
                );
                self.evict(&client_id, &mut report);
                continue;
            }

            match client_session.try_deliver(Outbound::Probe) {
                DeliveryOutcome::Queued => report.probed += 1,
                DeliveryOutcome::QueueFull => {
                    // 标志已是 false，下一轮若仍无 Pong 即被移除
                    debug!("[心跳监视器] 客户端 {} 出站队列已满，本轮 Ping 未能排队。", client_session.addr);
                }
                DeliveryOutcome::NotWritable => {
                    warn!("[心跳监视器] 客户端 {} (ID: {}) 已不可写，直接移除。", client_session.addr, client_id);
                    self.evict(&client_id, &mut report);
                }
            }
        }
        report
    }

    fn evict(&self, client_id: &uuid::Uuid, report: &mut HeartbeatReport) {
        if let Some(session) = self.connection_manager.remove_client(client_id) {
            report.evicted += 1;
            // remove_client 已发出关闭信号；没有任务在监听说明连接任务已先行退出
            if !session.terminate() {
                warn!("[心跳监视器] 关闭客户端 {} 失败：连接任务已不存在，仅从登记表移除。", session.addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::sync::mpsc;

    fn register(manager: &ConnectionManager) -> (uuid::Uuid, mpsc::Receiver<Outbound>) {
        let (tx, rx) = mpsc::channel(8);
        let session = manager.add_client(SocketAddr::from(([127, 0, 0, 1], 9100)), tx);
        (session.client_id, rx)
    }

    #[tokio::test]
    async fn silent_client_is_evicted_on_second_tick() {
        let manager = Arc::new(ConnectionManager::new());
        let (id, mut rx) = register(&manager);
        let monitor = HeartbeatMonitor::new(Arc::clone(&manager), Duration::from_secs(15));

        assert_eq!(monitor.check_clients(), HeartbeatReport { probed: 1, evicted: 0 });
        assert_eq!(rx.recv().await, Some(Outbound::Probe), "第一轮应发送 Ping");
        assert_eq!(manager.is_alive(&id), Some(false));

        // 没有 Pong
        assert_eq!(monitor.check_clients(), HeartbeatReport { probed: 0, evicted: 1 });
        assert!(manager.get_client(&id).is_none(), "失联客户端应被移除");
        assert!(rx.try_recv().is_err(), "移除时不应再发送 Ping");
    }

    #[tokio::test]
    async fn responsive_client_is_never_evicted() {
        let manager = Arc::new(ConnectionManager::new());
        let (id, mut rx) = register(&manager);
        let monitor = HeartbeatMonitor::new(Arc::clone(&manager), Duration::from_secs(15));

        for _ in 0..50 {
            assert_eq!(monitor.check_clients(), HeartbeatReport { probed: 1, evicted: 0 });
            assert_eq!(rx.recv().await, Some(Outbound::Probe));
            assert!(manager.mark_alive(&id)); // Pong
        }
        assert_eq!(manager.client_count(), 1);
    }

    #[tokio::test]
    async fn only_the_silent_client_is_evicted() {
        let manager = Arc::new(ConnectionManager::new());
        let (alive_id, mut alive_rx) = register(&manager);
        let (silent_id, _silent_rx) = register(&manager);
        let monitor = HeartbeatMonitor::new(Arc::clone(&manager), Duration::from_secs(15));

        assert_eq!(monitor.check_clients().probed, 2);
        assert_eq!(alive_rx.recv().await, Some(Outbound::Probe));
        manager.mark_alive(&alive_id);

        assert_eq!(monitor.check_clients(), HeartbeatReport { probed: 1, evicted: 1 });
        assert!(manager.get_client(&alive_id).is_some());
        assert!(manager.get_client(&silent_id).is_none());
    }

    #[tokio::test]
    async fn unwritable_client_is_evicted_immediately() {
        let manager = Arc::new(ConnectionManager::new());
        let (id, rx) = register(&manager);
        drop(rx); // 写任务已退出
        let monitor = HeartbeatMonitor::new(Arc::clone(&manager), Duration::from_secs(15));

        assert_eq!(monitor.check_clients(), HeartbeatReport { probed: 0, evicted: 1 });
        assert!(manager.get_client(&id).is_none());
    }

    const PERIOD: Duration = Duration::from_secs(15);

    /// 让时钟走到第 `ticks` 个周期之后一点点，期间到期的心跳都会执行。
    async fn advance_past(start: tokio::time::Instant, ticks: u32) {
        tokio::time::sleep_until(start + PERIOD * ticks + Duration::from_millis(10)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_evicts_silent_client_within_two_periods() {
        let manager = Arc::new(ConnectionManager::new());
        let (id, mut rx) = register(&manager);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let start = tokio::time::Instant::now();
        let handle = tokio::spawn(HeartbeatMonitor::new(Arc::clone(&manager), PERIOD).run(shutdown_rx));

        advance_past(start, 0).await;
        assert!(rx.try_recv().is_err(), "启动时不应立即探测");

        advance_past(start, 1).await;
        assert_eq!(rx.try_recv(), Ok(Outbound::Probe));
        assert!(manager.get_client(&id).is_some(), "一个周期后仍应保留");

        advance_past(start, 2).await;
        assert!(manager.get_client(&id).is_none(), "两个周期内没有 Pong 应被移除");

        advance_past(start, 3).await;
        assert!(rx.try_recv().is_err(), "移除之后不再探测");

        shutdown_tx.send(true).expect("发送停止信号失败");
        handle.await.expect("心跳监视器任务 panic");
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_keeps_client_that_answers_every_probe() {
        let manager = Arc::new(ConnectionManager::new());
        let (id, mut rx) = register(&manager);

        // 模拟连接任务：每收到一次 Ping 就回一次 Pong
        let pong_manager = Arc::clone(&manager);
        let pongs = tokio::spawn(async move {
            let mut answered = 0u32;
            while let Some(outbound) = rx.recv().await {
                if outbound == Outbound::Probe {
                    pong_manager.mark_alive(&id);
                    answered += 1;
                }
            }
            answered
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let start = tokio::time::Instant::now();
        let handle = tokio::spawn(HeartbeatMonitor::new(Arc::clone(&manager), PERIOD).run(shutdown_rx));

        advance_past(start, 20).await;
        assert!(manager.get_client(&id).is_some(), "按时回复 Pong 的连接不应被移除");

        shutdown_tx.send(true).expect("发送停止信号失败");
        handle.await.expect("心跳监视器任务 panic");
        manager.remove_client(&id);
        assert_eq!(pongs.await.expect("Pong 任务 panic"), 20);
    }

    #[tokio::test]
    async fn run_loop_stops_on_shutdown() {
        let manager = Arc::new(ConnectionManager::new());
        let monitor = HeartbeatMonitor::new(manager, Duration::from_millis(20));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(monitor.run(shutdown_rx));

        tokio::time::sleep(Duration::from_millis(60)).await;
        shutdown_tx.send(true).expect("发送停止信号失败");
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("心跳监视器未在停止信号后退出")
            .expect("心跳监视器任务 panic");
    }
}
