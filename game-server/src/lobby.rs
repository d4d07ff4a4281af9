//! 大厅：房间注册表与通知分发

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;

use protocol::{CreateRoomRequest, RoomId, RoomSnapshot, RoomSummary, ServerMessage, UserId};

use crate::actor::{spawn_room, EventSender, RoomEvent, RoomHandle};
use crate::config::ServerConfig;
use crate::room::Room;
use crate::server::SharedState;

/// 已注册的房间
struct RoomEntry {
    handle: RoomHandle,
    summary: RoomSummary,
}

/// 房间管理器
///
/// 只保存房间句柄和最近一次摘要，房间状态本身由各自的 actor 持有。
pub struct RoomManager {
    rooms: HashMap<RoomId, RoomEntry>,
    next_id: AtomicU64,
    events: EventSender,
    default_turn_seconds: u32,
    command_buffer: usize,
    tick_period: Duration,
}

impl RoomManager {
    pub fn new(config: &ServerConfig, events: EventSender) -> Self {
        Self {
            rooms: HashMap::new(),
            next_id: AtomicU64::new(1),
            events,
            default_turn_seconds: config.default_turn_seconds,
            command_buffer: config.room_command_buffer,
            tick_period: config.tick_interval(),
        }
    }

    fn generate_id(&self) -> RoomId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 创建房间并启动其 actor
    pub fn create(&mut self, creator: UserId, request: &CreateRoomRequest) -> RoomSnapshot {
        let id = self.generate_id();
        let room = Room::new(id, creator, request, self.default_turn_seconds);
        let snapshot = room.snapshot();
        let summary = room.summary();

        let handle = spawn_room(room, self.command_buffer, self.tick_period, self.events.clone());
        self.rooms.insert(id, RoomEntry { handle, summary });
        tracing::info!(room_id = %id, creator = %snapshot.creator, "room created");
        snapshot
    }

    /// 获取房间句柄
    pub fn get(&self, room_id: RoomId) -> Option<RoomHandle> {
        self.rooms.get(&room_id).map(|entry| entry.handle.clone())
    }

    /// 更新摘要，房间已移除时忽略
    pub fn update_summary(&mut self, summary: RoomSummary) {
        if let Some(entry) = self.rooms.get_mut(&summary.id) {
            entry.summary = summary;
        }
    }

    /// 移除房间
    pub fn remove(&mut self, room_id: RoomId) -> bool {
        self.rooms.remove(&room_id).is_some()
    }

    /// 按 ID 排序的房间列表
    pub fn list(&self) -> Vec<RoomSummary> {
        let mut rooms: Vec<RoomSummary> = self.rooms.values().map(|e| e.summary.clone()).collect();
        rooms.sort_by_key(|r| r.id);
        rooms
    }

    pub fn count(&self) -> usize {
        self.rooms.len()
    }
}

/// 分发房间 actor 的通知，直到所有发送端关闭
pub async fn run_dispatcher(state: SharedState, mut events: mpsc::UnboundedReceiver<RoomEvent>) {
    while let Some(event) = events.recv().await {
        let mut state = state.lock().await;
        match event {
            RoomEvent::Direct { to, msg } => state.players.send_to_user(&to, msg),
            RoomEvent::Summary(summary) => {
                state.rooms.update_summary(summary);
                let rooms = state.rooms.list();
                state.players.broadcast(ServerMessage::RoomList { rooms });
            }
            // 房间列表由处理离开的一方在更新成员状态后广播
            RoomEvent::Removed(room_id) => {
                state.rooms.remove(room_id);
            }
        }
    }
    tracing::debug!("dispatcher stopped");
}
