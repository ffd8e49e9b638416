//! WebSocket 连接登记表。

use chrono::Utc;
use dashmap::DashMap;
use log::{debug, info, warn};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::ws_server::client_session::{ClientSession, Outbound};

/// 管理所有活动的 WebSocket 客户端会话
///
/// 广播和心跳监视器都只遍历快照 (`get_all_client_sessions`)，
/// 因此遍历过程中的并发注册 / 注销不会影响正在进行的遍历。
#[derive(Debug, Clone, Default)]
pub struct ConnectionManager {
    /// 存储所有活动的 ClientSession，使用 DashMap 实现线程安全
    /// Key: client_id (Uuid)
    /// Value: Arc<ClientSession>
    clients: Arc<DashMap<Uuid, Arc<ClientSession>>>,
}

impl ConnectionManager {
    /// 创建一个新的 ConnectionManager 实例
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个新的客户端会话到管理器中，活跃标志为 `true`。
    ///
    /// # Arguments
    /// * `addr` - 新连接客户端的 SocketAddr。
    /// * `sender` - 该客户端出站队列的发送端。
    ///
    /// # Returns
    /// 返回新创建的 `Arc<ClientSession>`。
    pub fn add_client(&self, addr: SocketAddr, sender: mpsc::Sender<Outbound>) -> Arc<ClientSession> {
        let client_session = Arc::new(ClientSession::new(addr, sender));
        self.clients.insert(client_session.client_id, Arc::clone(&client_session));

        info!("🔌 客户端已连接: {} (id={})", client_session.addr, client_session.client_id);
        debug!("当前活动客户端总数: {}", self.clients.len());
        client_session
    }

    /// 根据 client_id 获取一个客户端会话的引用。
    pub fn get_client(&self, client_id: &Uuid) -> Option<Arc<ClientSession>> {
        self.clients.get(client_id).map(|entry| Arc::clone(entry.value()))
    }

    /// 从管理器中移除一个客户端会话，并通知其连接任务关闭 socket。
    ///
    /// 连接任务退出和心跳驱逐都会调用此方法，重复调用是安全的。
    ///
    /// # Returns
    /// 如果找到并移除了会话，则返回被移除的 `Arc<ClientSession>`，否则返回 `None`。
    pub fn remove_client(&self, client_id: &Uuid) -> Option<Arc<ClientSession>> {
        match self.clients.remove(client_id) {
            Some((_id, session)) => {
                session.terminate();
                let connected_for = Utc::now().signed_duration_since(session.creation_time);
                info!(
                    "🔌 客户端已断开: {} (id={})，连接时长 {} 秒",
                    session.addr,
                    session.client_id,
                    connected_for.num_seconds()
                );
                debug!("移除后当前活动客户端总数: {}", self.clients.len());
                Some(session)
            }
            None => {
                debug!("尝试移除不存在（或已被移除）的客户端: id={}", client_id);
                None
            }
        }
    }

    /// 当前所有活动客户端会话的快照。
    pub fn get_all_client_sessions(&self) -> Vec<Arc<ClientSession>> {
        self.clients.iter().map(|entry| Arc::clone(entry.value())).collect()
    }

    /// 对快照中的每一个会话调用 `visitor`。
    ///
    /// 先取快照再回调，回调中可以安全地调用 `add_client` / `remove_client`。
    pub fn for_each<F>(&self, mut visitor: F)
    where
        F: FnMut(&Arc<ClientSession>),
    {
        for session in self.get_all_client_sessions() {
            visitor(&session);
        }
    }

    /// 收到 Pong：把该客户端的活跃标志恢复为 `true`。
    ///
    /// 返回 `false` 表示该客户端已不在登记表中。
    pub fn mark_alive(&self, client_id: &Uuid) -> bool {
        match self.clients.get(client_id) {
            Some(entry) => {
                entry.value().set_alive(true);
                true
            }
            None => {
                warn!("收到已移除客户端的 Pong: id={}", client_id);
                false
            }
        }
    }

    /// 探测前把活跃标志置为 `false`，返回置位前的值。
    pub fn take_alive(&self, client_id: &Uuid) -> Option<bool> {
        self.clients.get(client_id).map(|entry| entry.value().take_alive())
    }

    /// 查询活跃标志；客户端不存在时返回 `None`。
    pub fn is_alive(&self, client_id: &Uuid) -> Option<bool> {
        self.clients.get(client_id).map(|entry| entry.value().is_alive())
    }

    /// 当前活动客户端数量。
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }
}
