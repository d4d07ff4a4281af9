//! 消息类型定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::piece::{ChessPiece, Faction, Position, Side};
use crate::settings::{BoardMap, CreateRoomRequest, PieceColor, RoomRule, SettingUpdate};
use crate::setup::{GameSetup, SeatPair};

/// 用户 ID（登录时提交的字符串）
pub type UserId = String;

/// 房间 ID
pub type RoomId = u64;

/// 房间状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    /// 等待玩家加入或准备
    Waiting,
    /// 双方已准备，对局进行中（或刚结束）
    Playing,
}

/// 登录用户信息（胜率与排名仅供展示）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    pub id: UserId,
    pub win_rate: u8,
    pub rank: u16,
}

/// 房间完整状态，每次变更后广播给房间成员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub id: RoomId,
    pub title: String,
    pub creator: UserId,
    pub guest: Option<UserId>,
    pub status: RoomStatus,
    pub rule: RoomRule,
    pub map: BoardMap,
    pub turn_seconds: u32,
    pub factions: SeatPair<Faction>,
    pub colors: SeatPair<PieceColor>,
    pub ready: SeatPair<bool>,
    /// 各座位执哪一方
    pub sides: SeatPair<Side>,
    pub shuffle_tick: u64,
    pub created_at: DateTime<Utc>,
    pub game: GameSetup,
}

/// 大厅房间列表条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: RoomId,
    pub title: String,
    pub creator: UserId,
    pub guest: Option<UserId>,
    pub status: RoomStatus,
    pub rule: RoomRule,
    pub map: BoardMap,
    pub factions: SeatPair<Faction>,
}

impl RoomSummary {
    pub fn player_count(&self) -> usize {
        1 + usize::from(self.guest.is_some())
    }
}

impl From<&RoomSnapshot> for RoomSummary {
    fn from(room: &RoomSnapshot) -> Self {
        Self {
            id: room.id,
            title: room.title.clone(),
            creator: room.creator.clone(),
            guest: room.guest.clone(),
            status: room.status,
            rule: room.rule,
            map: room.map,
            factions: room.factions,
        }
    }
}

/// 客户端发送给服务端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    // === 身份 ===
    /// 登录
    Login { user_id: String },
    /// 登出
    Logout,

    // === 房间操作 ===
    /// 创建房间
    CreateRoom(CreateRoomRequest),
    /// 加入房间
    JoinRoom { room_id: RoomId },
    /// 修改房间设置（逐条校验，非法条目被丢弃）
    UpdateSettings {
        room_id: RoomId,
        updates: Vec<SettingUpdate>,
    },
    /// 离开房间
    LeaveRoom { room_id: RoomId },
    /// 获取房间列表
    ListRooms,

    // === 对局操作 ===
    /// 走棋
    MakeMove {
        room_id: RoomId,
        from: Position,
        to: Position,
        promotion: Option<ChessPiece>,
    },
    /// 五子棋落子
    PlaceStone { room_id: RoomId, at: Position },

    // === 心跳 ===
    /// 心跳请求
    Ping,
}

/// 服务端发送给客户端的消息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    // === 身份 ===
    /// 登录成功
    LoginSuccess { user: UserInfo },
    /// 在线人数
    UserCount { count: usize },

    // === 房间事件 ===
    /// 房间创建成功（发给房主）
    RoomCreated { room: RoomSnapshot },
    /// 加入房间成功（发给加入者）
    RoomJoined { room: RoomSnapshot },
    /// 房间状态更新（发给房间成员）
    RoomUpdated { room: RoomSnapshot },
    /// 有玩家加入
    PlayerJoined { room_id: RoomId, user_id: UserId },
    /// 有玩家离开
    PlayerLeft {
        room_id: RoomId,
        user_id: UserId,
        message: String,
    },
    /// 房间被关闭，成员回到大厅
    RoomClosed { room_id: RoomId, message: String },
    /// 房间列表
    RoomList { rooms: Vec<RoomSummary> },

    // === 心跳 ===
    /// 心跳响应
    Pong,

    // === 错误 ===
    /// 错误消息
    Error { code: ErrorCode, message: String },
}

/// 错误码定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u16)]
pub enum ErrorCode {
    // === 房间相关 (1xx) ===
    /// 房间不存在
    RoomNotFound = 100,
    /// 房间已满或已开局
    RoomFull = 101,
    /// 房间已关闭
    RoomClosed = 102,
    /// 不在房间中
    NotInRoom = 103,
    /// 已在房间中
    AlreadyInRoom = 104,

    // === 游戏相关 (2xx) ===
    /// 不是你的回合
    NotYourTurn = 200,
    /// 无效走法
    InvalidMove = 201,
    /// 游戏未开始
    GameNotStarted = 202,
    /// 游戏已结束
    GameAlreadyOver = 203,
    /// 当前棋盘不支持该操作
    WrongBoard = 204,

    // === 玩家相关 (3xx) ===
    /// 无效用户 ID
    InvalidUserId = 300,
    /// 尚未登录
    NotLoggedIn = 301,
    /// 用户 ID 已在线
    UserIdOccupied = 302,

    // === 系统相关 (5xx) ===
    /// 内部错误
    InternalError = 500,
    /// 超时
    Timeout = 501,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}({})", self, *self as u16)
    }
}
