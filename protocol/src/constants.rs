//! 协议常量定义

/// 协议版本号
pub const PROTOCOL_VERSION: u8 = 1;

/// 国际象棋/将棋对战棋盘边长（8x8）
pub const BATTLE_BOARD_SIZE: u8 = 8;

/// 五子棋棋盘边长（15x15）
pub const GOMOKU_BOARD_SIZE: u8 = 15;

/// 连成几子获胜
pub const CONNECT_TARGET: usize = 5;

/// 每方初始命数
pub const MAX_LIVES: u8 = 3;

/// 单步时限下限（秒）
pub const MIN_TURN_SECONDS: u32 = 1;

/// 单步时限上限（秒）
pub const MAX_TURN_SECONDS: u32 = 600;

/// 默认单步时限（秒）
pub const DEFAULT_TURN_SECONDS: u32 = 60;

/// 自定义布阵最多条目数
pub const MAX_CUSTOM_LAYOUT: usize = 32;

/// 房间标题最大长度
pub const MAX_TITLE_LEN: usize = 20;

/// 用户 ID 最大长度
pub const MAX_USER_ID_LEN: usize = 20;

/// 消息帧最大大小
pub const MAX_FRAME_SIZE: usize = 65536;

/// 连接超时（秒）
pub const CONNECT_TIMEOUT_SECS: u64 = 10;
