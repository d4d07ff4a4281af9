//! 服务器主逻辑

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use protocol::{
    ChessPiece, ClientMessage, Connection, CreateRoomRequest, ErrorCode, Listener, Position,
    ProtocolError, RoomId, ServerMessage, SettingUpdate, TcpConnection, TcpListener, UserId,
};

use crate::actor::RoomHandle;
use crate::config::ServerConfig;
use crate::lobby::{run_dispatcher, RoomManager};
use crate::player::{ConnId, PlayerManager, PlayerStatus};
use crate::room::{Departure, RoomError};

/// 服务器状态
pub struct ServerState {
    pub players: PlayerManager,
    pub rooms: RoomManager,
    pub config: ServerConfig,
}

/// 在连接任务之间共享的服务器状态
pub type SharedState = Arc<Mutex<ServerState>>;

impl ServerState {
    /// 创建共享状态并启动通知分发任务
    pub fn shared(config: ServerConfig) -> SharedState {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let state = Arc::new(Mutex::new(Self {
            players: PlayerManager::new(),
            rooms: RoomManager::new(&config, events_tx),
            config,
        }));
        tokio::spawn(run_dispatcher(state.clone(), events_rx));
        state
    }

    /// 广播在线人数
    fn broadcast_user_count(&self) {
        self.players.broadcast(ServerMessage::UserCount {
            count: self.players.online_count(),
        });
    }

    /// 加入成功后标记用户所在房间
    ///
    /// 等待 actor 回复期间房主可能已离开并销毁房间，此时用户留在大厅。
    fn enter_room(&mut self, user: &str, room_id: RoomId) -> Result<(), RoomError> {
        if self.rooms.get(room_id).is_none() {
            self.players.set_status(user, PlayerStatus::Lobby);
            return Err(RoomError::Closed(room_id));
        }
        self.players.set_status(user, PlayerStatus::InRoom(room_id));
        Ok(())
    }

    /// 广播房间列表
    fn broadcast_room_list(&self) {
        self.players.broadcast(ServerMessage::RoomList {
            rooms: self.rooms.list(),
        });
    }
}

fn error(code: ErrorCode, message: impl Into<String>) -> ServerMessage {
    ServerMessage::Error {
        code,
        message: message.into(),
    }
}

impl From<RoomError> for ServerMessage {
    fn from(e: RoomError) -> Self {
        error(e.code(), e.to_string())
    }
}

/// 消息处理器
pub struct MessageHandler;

impl MessageHandler {
    /// 处理客户端消息，返回给请求者的直接回复
    ///
    /// 调用房间 actor 前会释放全局锁。
    pub async fn handle(
        state: &SharedState,
        conn: ConnId,
        msg: ClientMessage,
    ) -> Option<ServerMessage> {
        let result = match msg {
            ClientMessage::Login { user_id } => Self::handle_login(state, conn, &user_id).await,
            ClientMessage::Logout => Self::handle_logout(state, conn).await,
            ClientMessage::CreateRoom(request) => {
                Self::handle_create_room(state, conn, request).await
            }
            ClientMessage::JoinRoom { room_id } => {
                Self::handle_join_room(state, conn, room_id).await
            }
            ClientMessage::UpdateSettings { room_id, updates } => {
                Self::handle_update_settings(state, conn, room_id, updates).await
            }
            ClientMessage::LeaveRoom { room_id } => {
                Self::handle_leave_room(state, conn, room_id).await
            }
            ClientMessage::ListRooms => Ok(Some(ServerMessage::RoomList {
                rooms: state.lock().await.rooms.list(),
            })),
            ClientMessage::MakeMove {
                room_id,
                from,
                to,
                promotion,
            } => Self::handle_make_move(state, conn, room_id, from, to, promotion).await,
            ClientMessage::PlaceStone { room_id, at } => {
                Self::handle_place_stone(state, conn, room_id, at).await
            }
            ClientMessage::Ping => Ok(Some(ServerMessage::Pong)),
        };

        result.unwrap_or_else(Some)
    }

    /// 已登录的用户 ID
    fn require_user(state: &ServerState, conn: ConnId) -> Result<UserId, ServerMessage> {
        state
            .players
            .user_of(conn)
            .ok_or_else(|| error(ErrorCode::NotLoggedIn, "로그인이 필요합니다."))
    }

    /// 检查用户在指定房间中，返回用户 ID 和房间句柄
    async fn require_member(
        state: &SharedState,
        conn: ConnId,
        room_id: RoomId,
    ) -> Result<(UserId, RoomHandle), ServerMessage> {
        let state = state.lock().await;
        let user = Self::require_user(&state, conn)?;
        if state.players.room_of(&user) != Some(room_id) {
            return Err(RoomError::NotInRoom.into());
        }
        let handle = state
            .rooms
            .get(room_id)
            .ok_or(RoomError::NotFound(room_id))?;
        Ok((user, handle))
    }

    /// 处理登录
    async fn handle_login(
        state: &SharedState,
        conn: ConnId,
        user_id: &str,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let mut state = state.lock().await;
        let user = state
            .players
            .login(conn, user_id)
            .map_err(|e| error(e.code(), e.to_string()))?;

        tracing::info!(conn, user = %user.id, "user logged in");
        state.players.send(conn, ServerMessage::LoginSuccess { user });
        state.broadcast_user_count();
        Ok(Some(ServerMessage::RoomList {
            rooms: state.rooms.list(),
        }))
    }

    /// 处理登出
    async fn handle_logout(
        state: &SharedState,
        conn: ConnId,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let user = Self::require_user(&*state.lock().await, conn)?;
        Self::leave_current_room(state, &user).await;

        let mut state = state.lock().await;
        state.players.logout(conn);
        state.broadcast_user_count();
        tracing::info!(conn, %user, "user logged out");
        Ok(None)
    }

    /// 处理创建房间
    async fn handle_create_room(
        state: &SharedState,
        conn: ConnId,
        request: CreateRoomRequest,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let mut state = state.lock().await;
        let user = Self::require_user(&state, conn)?;
        if state.players.room_of(&user).is_some() {
            return Err(RoomError::AlreadyInRoom.into());
        }

        let room = state.rooms.create(user.clone(), &request);
        state.players.set_status(&user, PlayerStatus::InRoom(room.id));
        state.broadcast_room_list();
        Ok(Some(ServerMessage::RoomCreated { room }))
    }

    /// 处理加入房间
    async fn handle_join_room(
        state: &SharedState,
        conn: ConnId,
        room_id: RoomId,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let (user, handle) = {
            let state = state.lock().await;
            let user = Self::require_user(&state, conn)?;
            if state.players.room_of(&user).is_some() {
                return Err(RoomError::AlreadyInRoom.into());
            }
            let handle = state
                .rooms
                .get(room_id)
                .ok_or(RoomError::NotFound(room_id))?;
            (user, handle)
        };

        let room = handle.join(user.clone()).await?;
        state.lock().await.enter_room(&user, room_id)?;
        tracing::info!(room_id = %room_id, %user, "user joined room");
        Ok(Some(ServerMessage::RoomJoined { room }))
    }

    /// 处理设置修改
    async fn handle_update_settings(
        state: &SharedState,
        conn: ConnId,
        room_id: RoomId,
        updates: Vec<SettingUpdate>,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let (user, handle) = Self::require_member(state, conn, room_id).await?;
        handle.update_settings(user, updates).await?;
        Ok(None)
    }

    /// 处理离开房间
    async fn handle_leave_room(
        state: &SharedState,
        conn: ConnId,
        room_id: RoomId,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let (user, _) = Self::require_member(state, conn, room_id).await?;
        Self::leave_current_room(state, &user).await;
        Ok(Some(ServerMessage::RoomList {
            rooms: state.lock().await.rooms.list(),
        }))
    }

    /// 处理走棋
    async fn handle_make_move(
        state: &SharedState,
        conn: ConnId,
        room_id: RoomId,
        from: Position,
        to: Position,
        promotion: Option<ChessPiece>,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let (user, handle) = Self::require_member(state, conn, room_id).await?;
        handle.make_move(user, from, to, promotion).await?;
        Ok(None)
    }

    /// 处理落子
    async fn handle_place_stone(
        state: &SharedState,
        conn: ConnId,
        room_id: RoomId,
        at: Position,
    ) -> Result<Option<ServerMessage>, ServerMessage> {
        let (user, handle) = Self::require_member(state, conn, room_id).await?;
        handle.place_stone(user, at).await?;
        Ok(None)
    }

    /// 让用户离开当前房间（若有）
    ///
    /// 房主离开时房间被销毁，其他成员一并回到大厅。
    async fn leave_current_room(state: &SharedState, user: &str) {
        let target = {
            let state = state.lock().await;
            state
                .players
                .room_of(user)
                .map(|room_id| (room_id, state.rooms.get(room_id)))
        };
        let Some((room_id, handle)) = target else {
            return;
        };

        let departure = match handle {
            Some(handle) => handle.leave(user.to_string()).await,
            None => Err(RoomError::NotFound(room_id)),
        };

        let mut state = state.lock().await;
        state.players.set_status(user, PlayerStatus::Lobby);
        match departure {
            Ok(Departure::Closed { evicted }) => {
                for member in &evicted {
                    state.players.set_status(member, PlayerStatus::Lobby);
                }
                state.rooms.remove(room_id);
                state.broadcast_room_list();
                tracing::info!(room_id = %room_id, %user, "room closed by creator");
            }
            Ok(Departure::GuestLeft) => {
                tracing::info!(room_id = %room_id, %user, "guest left room");
            }
            Err(e) => {
                tracing::warn!(room_id = %room_id, %user, error = %e, "leave failed");
            }
        }
    }

    /// 处理断线：视为离开房间并登出
    pub async fn handle_disconnect(state: &SharedState, conn: ConnId) {
        let user = state.lock().await.players.user_of(conn);
        if let Some(user) = &user {
            Self::leave_current_room(state, user).await;
        }

        let mut state = state.lock().await;
        state.players.remove(conn);
        if user.is_some() {
            state.broadcast_user_count();
        }
        tracing::info!(conn, user = ?user, "connection closed");
    }
}

/// 处理一条客户端连接直到断开
pub async fn handle_connection(conn: TcpConnection, state: SharedState) {
    let peer = conn.peer_addr().unwrap_or_default();
    let (mut reader, mut writer) = conn.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let conn_id = state.lock().await.players.register(tx.clone());
    tracing::debug!(conn = conn_id, %peer, "connection accepted");

    let writer_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = writer.write_frame(&msg).await {
                tracing::warn!(conn = conn_id, error = %e, "write failed");
                break;
            }
        }
    });

    loop {
        match reader.read_frame::<ClientMessage>().await {
            Ok(msg) => {
                if let Some(reply) = MessageHandler::handle(&state, conn_id, msg).await {
                    let _ = tx.send(reply);
                }
            }
            Err(ProtocolError::ConnectionClosed) => break,
            Err(e) => {
                tracing::warn!(conn = conn_id, error = %e, "read failed");
                break;
            }
        }
    }

    MessageHandler::handle_disconnect(&state, conn_id).await;
    drop(tx);
    writer_task.abort();
}

/// 接受连接的主循环
pub async fn serve(mut listener: TcpListener, state: SharedState) {
    loop {
        match listener.accept().await {
            Ok(conn) => {
                tokio::spawn(handle_connection(conn, state.clone()));
            }
            Err(e) => tracing::error!(error = %e, "accept failed"),
        }
    }
}

/// 按配置启动服务器
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.network.addr();
    let listener = TcpListener::bind(&addr).await?;

    let state = ServerState::shared(config);
    serve(listener, state).await;
    Ok(())
}
