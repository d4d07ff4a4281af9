//! 房间 actor
//!
//! 每个房间运行在独立的 tokio 任务中，独占自己的 [`Room`]。
//! 玩家操作和每秒计时走同一个 `select!` 循环，因此状态只有一个写入者。

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use protocol::{
    ChessPiece, Position, RoomId, RoomSnapshot, RoomSummary, ServerMessage, SettingUpdate, UserId,
};

use crate::room::{guest_left_message, Departure, Room, RoomError, Tick, CREATOR_LEFT_MESSAGE};

/// 房间 actor 发往分发器的通知
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// 发给指定用户的消息
    Direct { to: UserId, msg: ServerMessage },
    /// 房间摘要变化
    Summary(RoomSummary),
    /// 房间已销毁
    Removed(RoomId),
}

/// 通知发送端
pub type EventSender = mpsc::UnboundedSender<RoomEvent>;

type Reply<T> = oneshot::Sender<Result<T, RoomError>>;

/// 发给房间 actor 的命令
enum RoomCommand {
    Join {
        user: UserId,
        reply: Reply<RoomSnapshot>,
    },
    Leave {
        user: UserId,
        reply: Reply<Departure>,
    },
    UpdateSettings {
        user: UserId,
        updates: Vec<SettingUpdate>,
        reply: Reply<()>,
    },
    MakeMove {
        user: UserId,
        from: Position,
        to: Position,
        promotion: Option<ChessPiece>,
        reply: Reply<()>,
    },
    PlaceStone {
        user: UserId,
        at: Position,
        reply: Reply<()>,
    },
    Snapshot {
        reply: oneshot::Sender<RoomSnapshot>,
    },
}

/// 房间 actor 句柄，克隆开销很小
#[derive(Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    /// 发送命令并等待回复
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> RoomCommand,
    ) -> Result<T, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(make(reply_tx))
            .await
            .map_err(|_| RoomError::Closed(self.room_id))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Closed(self.room_id))?
    }

    /// 加入房间，成功后返回最新快照
    pub async fn join(&self, user: UserId) -> Result<RoomSnapshot, RoomError> {
        self.request(|reply| RoomCommand::Join { user, reply }).await
    }

    /// 离开房间
    pub async fn leave(&self, user: UserId) -> Result<Departure, RoomError> {
        self.request(|reply| RoomCommand::Leave { user, reply }).await
    }

    /// 修改设置
    pub async fn update_settings(
        &self,
        user: UserId,
        updates: Vec<SettingUpdate>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::UpdateSettings {
            user,
            updates,
            reply,
        })
        .await
    }

    /// 走棋
    pub async fn make_move(
        &self,
        user: UserId,
        from: Position,
        to: Position,
        promotion: Option<ChessPiece>,
    ) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::MakeMove {
            user,
            from,
            to,
            promotion,
            reply,
        })
        .await
    }

    /// 五子棋落子
    pub async fn place_stone(&self, user: UserId, at: Position) -> Result<(), RoomError> {
        self.request(|reply| RoomCommand::PlaceStone { user, at, reply })
            .await
    }

    /// 获取当前快照
    pub async fn snapshot(&self) -> Result<RoomSnapshot, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| RoomError::Closed(self.room_id))?;
        reply_rx.await.map_err(|_| RoomError::Closed(self.room_id))
    }
}

/// 在 tokio 任务中运行的房间
struct RoomActor {
    room: Room,
    receiver: mpsc::Receiver<RoomCommand>,
    events: EventSender,
    tick_period: Duration,
}

impl RoomActor {
    async fn run(mut self) {
        let room_id = self.room.id;
        tracing::info!(room_id = %room_id, "room actor started");

        let mut ticker = interval_at(Instant::now() + self.tick_period, self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                _ = ticker.tick() => self.handle_tick(),
            }
        }

        tracing::info!(room_id = %room_id, "room actor stopped");
    }

    /// 处理一条命令，返回 false 表示房间已关闭
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join { user, reply } => {
                let result = self.room.join(user.clone()).map(|()| {
                    self.notify(&self.room.creator, ServerMessage::PlayerJoined {
                        room_id: self.room.id,
                        user_id: user.clone(),
                    });
                    self.publish();
                    self.room.snapshot()
                });
                let _ = reply.send(result);
            }
            RoomCommand::Leave { user, reply } => {
                let result = self.room.leave(&user);
                let closed = matches!(result, Ok(Departure::Closed { .. }));
                match &result {
                    Ok(Departure::Closed { evicted }) => {
                        for member in evicted {
                            self.notify(member, ServerMessage::RoomClosed {
                                room_id: self.room.id,
                                message: CREATOR_LEFT_MESSAGE.to_string(),
                            });
                        }
                        let _ = self.events.send(RoomEvent::Removed(self.room.id));
                        tracing::info!(room_id = %self.room.id, %user, "creator left, room closed");
                    }
                    Ok(Departure::GuestLeft) => {
                        self.notify(&self.room.creator, ServerMessage::PlayerLeft {
                            room_id: self.room.id,
                            user_id: user.clone(),
                            message: guest_left_message(&user),
                        });
                        self.publish();
                    }
                    Err(_) => {}
                }
                let _ = reply.send(result);
                return !closed;
            }
            RoomCommand::UpdateSettings {
                user,
                updates,
                reply,
            } => {
                let result = self.room.apply_settings(&user, &updates).map(|_| ());
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            RoomCommand::MakeMove {
                user,
                from,
                to,
                promotion,
                reply,
            } => {
                let result = self.room.make_move(&user, from, to, promotion);
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            RoomCommand::PlaceStone { user, at, reply } => {
                let result = self.room.place_stone(&user, at);
                if result.is_ok() {
                    self.publish();
                }
                let _ = reply.send(result);
            }
            RoomCommand::Snapshot { reply } => {
                let _ = reply.send(self.room.snapshot());
            }
        }
        true
    }

    fn handle_tick(&mut self) {
        if let Tick::TimedOut(_) = self.room.tick() {
            self.publish();
        }
    }

    fn notify(&self, to: &str, msg: ServerMessage) {
        let _ = self.events.send(RoomEvent::Direct {
            to: to.to_string(),
            msg,
        });
    }

    /// 把最新状态发给所有成员，并更新大厅摘要
    fn publish(&self) {
        let snapshot = self.room.snapshot();
        for member in self.room.members() {
            self.notify(&member, ServerMessage::RoomUpdated {
                room: snapshot.clone(),
            });
        }
        let _ = self.events.send(RoomEvent::Summary(self.room.summary()));
    }
}

/// 启动房间 actor
pub fn spawn_room(room: Room, buffer: usize, tick_period: Duration, events: EventSender) -> RoomHandle {
    let (sender, receiver) = mpsc::channel(buffer.max(1));
    let room_id = room.id;
    let actor = RoomActor {
        room,
        receiver,
        events,
        tick_period,
    };
    tokio::spawn(actor.run());
    RoomHandle { room_id, sender }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::{CreateRoomRequest, RoomStatus, WinReason, MAX_LIVES};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn spawn(request: CreateRoomRequest) -> (RoomHandle, mpsc::UnboundedReceiver<RoomEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let room = Room::with_rng(1, "alice".to_string(), &request, 60, StdRng::seed_from_u64(7));
        (spawn_room(room, 16, Duration::from_secs(1), tx), rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<RoomEvent>) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_join_notifies_creator() {
        let (handle, mut rx) = spawn(CreateRoomRequest::default());

        let room = handle.join("bob".to_string()).await.unwrap();
        assert_eq!(room.guest.as_deref(), Some("bob"));

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            RoomEvent::Direct { to, msg: ServerMessage::PlayerJoined { user_id, .. } }
                if to == "alice" && user_id == "bob"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, RoomEvent::Summary(s) if s.player_count() == 2)));

        let err = handle.join("carol".to_string()).await.unwrap_err();
        assert_eq!(err, RoomError::Full);
    }

    #[tokio::test]
    async fn test_rejected_move_publishes_nothing() {
        let (handle, mut rx) = spawn(CreateRoomRequest::default());
        handle.join("bob".to_string()).await.unwrap();
        drain(&mut rx);

        let err = handle
            .make_move("bob".to_string(), Position::at(1, 0), Position::at(2, 0), None)
            .await
            .unwrap_err();
        assert_eq!(err, RoomError::Game(protocol::GameError::NotStarted));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_creator_leave_stops_actor() {
        let (handle, mut rx) = spawn(CreateRoomRequest::default());
        handle.join("bob".to_string()).await.unwrap();
        drain(&mut rx);

        let departure = handle.leave("alice".to_string()).await.unwrap();
        assert_eq!(
            departure,
            Departure::Closed {
                evicted: vec!["bob".to_string()]
            }
        );

        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            RoomEvent::Direct { to, msg: ServerMessage::RoomClosed { .. } } if to == "bob"
        )));
        assert!(events.iter().any(|e| matches!(e, RoomEvent::Removed(1))));

        assert_eq!(handle.snapshot().await.unwrap_err(), RoomError::Closed(1));
    }

    #[tokio::test]
    async fn test_guest_leave_notifies_creator() {
        let (handle, mut rx) = spawn(CreateRoomRequest::default());
        handle.join("bob".to_string()).await.unwrap();
        drain(&mut rx);

        assert_eq!(
            handle.leave("bob".to_string()).await.unwrap(),
            Departure::GuestLeft
        );
        let events = drain(&mut rx);
        assert!(events.iter().any(|e| matches!(
            e,
            RoomEvent::Direct { to, msg: ServerMessage::PlayerLeft { user_id, .. } }
                if to == "alice" && user_id == "bob"
        )));
        assert_eq!(handle.snapshot().await.unwrap().guest, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clock_ticks_inside_actor() {
        let (handle, mut rx) = spawn(CreateRoomRequest {
            turn_seconds: Some(1),
            ..CreateRoomRequest::default()
        });
        handle.join("bob".to_string()).await.unwrap();
        for user in ["alice", "bob"] {
            handle
                .update_settings(user.to_string(), vec![SettingUpdate::Ready(true)])
                .await
                .unwrap();
        }
        let started = handle.snapshot().await.unwrap();
        assert_eq!(started.status, RoomStatus::Playing);
        let first = started.game.turn_side;
        drain(&mut rx);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        let room = handle.snapshot().await.unwrap();
        assert_eq!(room.game.turn_side, first.opponent());
        let seat = room.sides.seat_of(first);
        assert_eq!(room.game.seats.get(seat).lives, MAX_LIVES - 1);
        assert!(drain(&mut rx)
            .iter()
            .any(|e| matches!(e, RoomEvent::Direct { msg: ServerMessage::RoomUpdated { .. }, .. })));

        // 再超时四次后先手方命数耗尽
        tokio::time::sleep(Duration::from_secs(5)).await;
        let room = handle.snapshot().await.unwrap();
        assert_eq!(room.game.winner, Some(first.opponent()));
        assert_eq!(room.game.winner_reason, Some(WinReason::Timeout));
    }
}
