//! 国际象棋 vs 将棋 对战共享协议库
//!
//! 包含:
//! - 棋子、棋盘、位置等核心数据结构
//! - 三种棋的走法生成、将军/将死判定与五子连珠判定
//! - 布阵与对局状态 (GameSetup)
//! - 消息类型定义 (ClientMessage, ServerMessage)
//! - 传输层抽象 (Connector, Connection, Listener traits) 与帧编解码

mod board;
mod constants;
mod error;
mod gomoku;
mod message;
mod moves;
mod piece;
mod settings;
mod setup;
mod transport;

pub use board::Board;
pub use constants::*;
pub use error::{GameError, ProtocolError, Result};
pub use gomoku::{is_five, longest_line};
pub use message::{
    ClientMessage, ErrorCode, RoomId, RoomSnapshot, RoomStatus, RoomSummary, ServerMessage,
    UserId, UserInfo,
};
pub use moves::{LastMove, Move, MoveGenerator, MoveKind, Moves};
pub use piece::{ChessPiece, Faction, JanggiPiece, Piece, PieceId, PieceKind, Position, Side};
pub use settings::{BoardMap, CreateRoomRequest, PieceColor, RoomRule, SettingUpdate, SetupUpdate};
pub use setup::{
    default_placements, is_valid_custom_layout, piece_pool, random_faction, seat_sides,
    unplaced_pool, Captures, Formation, GameSetup, Placement, PlacementMode, Seat, SeatPair,
    SeatSetup, WinReason,
};
pub use transport::{
    encode_frame, Connection, Connector, FrameReader, FrameWriter, Listener, NetworkConfig,
    TcpConnection, TcpConnector, TcpListener,
};
