//! 对战服务端
//!
//! 包含:
//! - 房间状态机与房间 actor
//! - 单步计时与超时淘汰
//! - 玩家管理
//! - 大厅与通知分发

pub mod actor;
pub mod config;
pub mod game;
pub mod lobby;
pub mod player;
pub mod room;
pub mod server;

pub use actor::{spawn_room, RoomEvent, RoomHandle};
pub use config::ServerConfig;
pub use game::{resolve_timeout, TimeoutOutcome, TurnClock};
pub use lobby::RoomManager;
pub use player::{ConnId, LoginError, Player, PlayerManager, PlayerStatus};
pub use room::{Departure, Room, RoomError, Tick};
pub use server::{handle_connection, run, serve, MessageHandler, ServerState, SharedState};
