//! 错误类型定义

use thiserror::Error;

/// 对局规则错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GameError {
    /// 超出棋盘的坐标
    #[error("Invalid position: ({row}, {col})")]
    InvalidPosition { row: u8, col: u8 },

    /// 非法走法
    #[error("Illegal move: from ({from_row}, {from_col}) to ({to_row}, {to_col})")]
    IllegalMove {
        from_row: u8,
        from_col: u8,
        to_row: u8,
        to_col: u8,
    },

    /// 起点没有棋子
    #[error("No piece at ({row}, {col})")]
    NoPiece { row: u8, col: u8 },

    /// 落子位置已有棋子
    #[error("Cell ({row}, {col}) is occupied")]
    CellOccupied { row: u8, col: u8 },

    /// 不是你的回合
    #[error("Not your turn")]
    NotYourTurn,

    /// 对局尚未开始
    #[error("Game has not started")]
    NotStarted,

    /// 对局已结束
    #[error("Game is already over")]
    GameOver,

    /// 当前棋盘不支持该操作
    #[error("Operation not supported on this board")]
    WrongVariant,
}

/// 协议错误类型
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// IO 错误
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 序列化错误（bincode）
    #[error("Bincode serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// 协议版本不匹配
    #[error("Protocol version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: u8, actual: u8 },

    /// 帧大小超限
    #[error("Frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },

    /// 连接超时
    #[error("Connection timeout")]
    ConnectionTimeout,

    /// 连接已关闭
    #[error("Connection closed")]
    ConnectionClosed,
}

/// 协议操作结果类型
pub type Result<T> = std::result::Result<T, ProtocolError>;
