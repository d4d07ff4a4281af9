//! 玩家管理

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;
use thiserror::Error;
use tokio::sync::mpsc;

use protocol::{ErrorCode, RoomId, ServerMessage, UserId, UserInfo, MAX_USER_ID_LEN};

/// 连接 ID，每条 TCP 连接一个
pub type ConnId = u64;

/// 登录失败原因
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    #[error("유효한 ID를 입력해주세요.")]
    Empty,

    #[error("ID는 {0}자를 넘을 수 없습니다.")]
    TooLong(usize),

    #[error("이미 접속 중인 ID입니다.")]
    Occupied,

    #[error("이미 로그인되어 있습니다.")]
    AlreadyLoggedIn,
}

impl LoginError {
    pub fn code(&self) -> ErrorCode {
        match self {
            LoginError::Occupied | LoginError::AlreadyLoggedIn => ErrorCode::UserIdOccupied,
            LoginError::Empty | LoginError::TooLong(_) => ErrorCode::InvalidUserId,
        }
    }
}

/// 玩家状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    /// 已连接，尚未登录
    Connected,
    /// 在大厅
    Lobby,
    /// 在房间中
    InRoom(RoomId),
}

/// 一条连接上的玩家
#[derive(Debug)]
pub struct Player {
    pub conn: ConnId,
    pub user: Option<UserInfo>,
    pub status: PlayerStatus,
    sender: mpsc::UnboundedSender<ServerMessage>,
}

impl Player {
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }

    fn send(&self, msg: ServerMessage) {
        let _ = self.sender.send(msg);
    }
}

/// 玩家管理器
pub struct PlayerManager {
    /// 连接 ID -> 玩家
    players: HashMap<ConnId, Player>,
    /// 用户 ID -> 连接 ID（用于重复登录检查）
    user_to_conn: HashMap<UserId, ConnId>,
    next_id: AtomicU64,
}

impl PlayerManager {
    pub fn new() -> Self {
        Self {
            players: HashMap::new(),
            user_to_conn: HashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    fn generate_id(&self) -> ConnId {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// 登记新连接
    pub fn register(&mut self, sender: mpsc::UnboundedSender<ServerMessage>) -> ConnId {
        let conn = self.generate_id();
        self.players.insert(
            conn,
            Player {
                conn,
                user: None,
                status: PlayerStatus::Connected,
                sender,
            },
        );
        conn
    }

    /// 验证用户 ID（去除首尾空白后）
    pub fn validate_user_id(raw: &str) -> Result<UserId, LoginError> {
        let user_id = raw.trim();
        if user_id.is_empty() {
            return Err(LoginError::Empty);
        }
        if user_id.chars().count() > MAX_USER_ID_LEN {
            return Err(LoginError::TooLong(MAX_USER_ID_LEN));
        }
        Ok(user_id.to_string())
    }

    /// 登录，胜率和排名随机生成
    pub fn login(&mut self, conn: ConnId, raw: &str) -> Result<UserInfo, LoginError> {
        let user_id = Self::validate_user_id(raw)?;

        if self.user_to_conn.contains_key(&user_id) {
            return Err(LoginError::Occupied);
        }
        let player = self.players.get_mut(&conn).ok_or(LoginError::Empty)?;
        if player.user.is_some() {
            return Err(LoginError::AlreadyLoggedIn);
        }

        let mut rng = rand::thread_rng();
        let info = UserInfo {
            id: user_id.clone(),
            win_rate: rng.gen_range(0..100),
            rank: rng.gen_range(1..=1000),
        };
        player.user = Some(info.clone());
        player.status = PlayerStatus::Lobby;
        self.user_to_conn.insert(user_id, conn);

        Ok(info)
    }

    /// 登出，连接保留
    pub fn logout(&mut self, conn: ConnId) -> Option<UserId> {
        let player = self.players.get_mut(&conn)?;
        let info = player.user.take()?;
        player.status = PlayerStatus::Connected;
        self.user_to_conn.remove(&info.id);
        Some(info.id)
    }

    /// 移除连接（断线）
    pub fn remove(&mut self, conn: ConnId) -> Option<Player> {
        let player = self.players.remove(&conn)?;
        if let Some(user_id) = player.user_id() {
            self.user_to_conn.remove(user_id);
        }
        Some(player)
    }

    pub fn get(&self, conn: ConnId) -> Option<&Player> {
        self.players.get(&conn)
    }

    /// 连接上已登录的用户 ID
    pub fn user_of(&self, conn: ConnId) -> Option<UserId> {
        self.players.get(&conn)?.user_id().map(str::to_string)
    }

    /// 用户当前所在房间
    pub fn room_of(&self, user_id: &str) -> Option<RoomId> {
        let conn = self.user_to_conn.get(user_id)?;
        match self.players.get(conn)?.status {
            PlayerStatus::InRoom(room_id) => Some(room_id),
            _ => None,
        }
    }

    /// 设置已登录用户的状态
    pub fn set_status(&mut self, user_id: &str, status: PlayerStatus) {
        if let Some(player) = self
            .user_to_conn
            .get(user_id)
            .and_then(|conn| self.players.get_mut(conn))
        {
            player.status = status;
        }
    }

    /// 发送消息给连接
    pub fn send(&self, conn: ConnId, msg: ServerMessage) {
        if let Some(player) = self.players.get(&conn) {
            player.send(msg);
        }
    }

    /// 发送消息给已登录用户
    pub fn send_to_user(&self, user_id: &str, msg: ServerMessage) {
        if let Some(conn) = self.user_to_conn.get(user_id) {
            self.send(*conn, msg);
        }
    }

    /// 广播给所有已登录用户
    pub fn broadcast(&self, msg: ServerMessage) {
        for conn in self.user_to_conn.values() {
            self.send(*conn, msg.clone());
        }
    }

    /// 在线（已登录）人数
    pub fn online_count(&self) -> usize {
        self.user_to_conn.len()
    }
}

impl Default for PlayerManager {
    fn default() -> Self {
        Self::new()
    }
}
