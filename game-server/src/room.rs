//! 房间状态机
//!
//! `Room` 是单个房间的全部权威状态，只由所属的房间 actor 修改。
//! 所有方法都是同步的，便于直接测试。

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use protocol::{
    random_faction, seat_sides, Board, BoardMap, ChessPiece, CreateRoomRequest, ErrorCode,
    Faction, GameError, GameSetup, LastMove, MoveGenerator, PieceColor, Position, RoomId,
    RoomRule, RoomSnapshot, RoomStatus, RoomSummary, Seat, SeatPair, SettingUpdate, Side,
    UserId, WinReason, DEFAULT_TURN_SECONDS, MAX_TITLE_LEN, MAX_TURN_SECONDS, MIN_TURN_SECONDS,
};

use crate::game::{resolve_timeout, TimeoutOutcome, TurnClock};

/// 房间操作被拒绝的原因
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoomError {
    #[error("Room {0} not found")]
    NotFound(RoomId),

    #[error("Room is full or already playing")]
    Full,

    #[error("Not a participant of this room")]
    NotInRoom,

    #[error("Already in a room")]
    AlreadyInRoom,

    /// 房间 actor 已退出
    #[error("Room {0} is closed")]
    Closed(RoomId),

    #[error(transparent)]
    Game(#[from] GameError),
}

impl RoomError {
    /// 对应的错误码
    pub fn code(&self) -> ErrorCode {
        match self {
            RoomError::NotFound(_) => ErrorCode::RoomNotFound,
            RoomError::Full => ErrorCode::RoomFull,
            RoomError::NotInRoom => ErrorCode::NotInRoom,
            RoomError::AlreadyInRoom => ErrorCode::AlreadyInRoom,
            RoomError::Closed(_) => ErrorCode::RoomClosed,
            RoomError::Game(GameError::NotYourTurn) => ErrorCode::NotYourTurn,
            RoomError::Game(GameError::NotStarted) => ErrorCode::GameNotStarted,
            RoomError::Game(GameError::GameOver) => ErrorCode::GameAlreadyOver,
            RoomError::Game(GameError::WrongVariant) => ErrorCode::WrongBoard,
            RoomError::Game(_) => ErrorCode::InvalidMove,
        }
    }
}

/// 离开房间的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// 房主离开，房间销毁；`evicted` 为被请出的其他成员
    Closed { evicted: Vec<UserId> },
    /// 参与者离开，房间保留
    GuestLeft,
}

/// 每秒计时的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// 没有进行中的对局
    Idle,
    /// 仍在倒计时
    Counting,
    /// 发生超时并已结算
    TimedOut(TimeoutOutcome),
}

/// 房主离开时发给其他成员的提示
pub const CREATOR_LEFT_MESSAGE: &str = "방장이 방을 떠나 로비로 이동합니다.";

/// 参与者离开时发给房主的提示
pub fn guest_left_message(user: &str) -> String {
    format!("{}님이 방을 나갔습니다.", user)
}

/// 房间
pub struct Room {
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
    /// 每次随机分配阵营时递增
    pub shuffle_tick: u64,
    pub created_at: DateTime<Utc>,
    pub game: GameSetup,
    clock: TurnClock,
    rng: StdRng,
}

impl Room {
    /// 创建新房间，无法识别的设置取默认值
    pub fn new(id: RoomId, creator: UserId, request: &CreateRoomRequest, default_turn_seconds: u32) -> Self {
        Self::with_rng(id, creator, request, default_turn_seconds, StdRng::from_entropy())
    }

    /// 使用指定随机源创建房间
    pub fn with_rng(
        id: RoomId,
        creator: UserId,
        request: &CreateRoomRequest,
        default_turn_seconds: u32,
        rng: StdRng,
    ) -> Self {
        let title = request
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| t.chars().take(MAX_TITLE_LEN).collect())
            .unwrap_or_else(|| format!("{}님의 게임", creator));

        let parse_faction = |value: &Option<String>, default: Faction| {
            value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(default)
        };
        let parse_color = |value: &Option<String>, default: PieceColor| {
            value.as_deref().and_then(|v| v.parse().ok()).unwrap_or(default)
        };

        let turn_seconds = request
            .turn_seconds
            .and_then(valid_turn_seconds)
            .or_else(|| valid_turn_seconds(default_turn_seconds as i64))
            .unwrap_or(DEFAULT_TURN_SECONDS);

        Self {
            id,
            title,
            creator,
            guest: None,
            status: RoomStatus::Waiting,
            rule: RoomRule::parse_or_default(request.rule.as_deref()),
            map: request
                .map
                .as_deref()
                .and_then(|m| m.parse().ok())
                .unwrap_or(BoardMap::Chess),
            turn_seconds,
            factions: SeatPair::new(
                parse_faction(&request.creator_faction, Faction::Chess),
                parse_faction(&request.guest_faction, Faction::Janggi),
            ),
            colors: SeatPair::new(
                parse_color(&request.creator_color, PieceColor::White),
                parse_color(&request.guest_color, PieceColor::Black),
            ),
            ready: SeatPair::both(false),
            shuffle_tick: 0,
            created_at: Utc::now(),
            game: GameSetup::new(turn_seconds),
            clock: TurnClock::new(turn_seconds),
            rng,
        }
    }

    /// 用户所在座位
    pub fn seat_of(&self, user: &str) -> Option<Seat> {
        if self.creator == user {
            Some(Seat::Creator)
        } else if self.guest.as_deref() == Some(user) {
            Some(Seat::Guest)
        } else {
            None
        }
    }

    /// 房间内所有成员
    pub fn members(&self) -> Vec<UserId> {
        std::iter::once(self.creator.clone())
            .chain(self.guest.clone())
            .collect()
    }

    /// 各座位执哪一方
    pub fn sides(&self) -> SeatPair<Side> {
        seat_sides(self.map, self.factions.creator, self.factions.guest)
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.clock.remaining()
    }

    /// 完整快照
    pub fn snapshot(&self) -> RoomSnapshot {
        let mut game = self.game.clone();
        game.remaining_seconds = self.clock.remaining();
        RoomSnapshot {
            id: self.id,
            title: self.title.clone(),
            creator: self.creator.clone(),
            guest: self.guest.clone(),
            status: self.status,
            rule: self.rule,
            map: self.map,
            turn_seconds: self.turn_seconds,
            factions: self.factions,
            colors: self.colors,
            ready: self.ready,
            sides: self.sides(),
            shuffle_tick: self.shuffle_tick,
            created_at: self.created_at,
            game,
        }
    }

    /// 大厅列表条目
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            title: self.title.clone(),
            creator: self.creator.clone(),
            guest: self.guest.clone(),
            status: self.status,
            rule: self.rule,
            map: self.map,
            factions: self.factions,
        }
    }

    /// 加入空座位
    pub fn join(&mut self, user: UserId) -> Result<(), RoomError> {
        if self.seat_of(&user).is_some() {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.status != RoomStatus::Waiting || self.guest.is_some() {
            return Err(RoomError::Full);
        }

        self.guest = Some(user);
        self.reset_ready();
        if self.rule == RoomRule::Random {
            self.shuffle_factions();
        }
        Ok(())
    }

    /// 离开房间
    pub fn leave(&mut self, user: &str) -> Result<Departure, RoomError> {
        match self.seat_of(user) {
            None => Err(RoomError::NotInRoom),
            Some(Seat::Creator) => {
                self.clock.stop();
                Ok(Departure::Closed {
                    evicted: self.guest.take().into_iter().collect(),
                })
            }
            Some(Seat::Guest) => {
                self.guest = None;
                self.factions.guest = Faction::Janggi;
                self.colors.guest = PieceColor::Black;
                self.reset_ready();
                self.replace_game();
                self.status = RoomStatus::Waiting;
                Ok(Departure::GuestLeft)
            }
        }
    }

    /// 应用一批设置修改，返回是否有修改被接受
    ///
    /// 每条修改独立校验，非法的条目被丢弃。
    pub fn apply_settings(&mut self, user: &str, updates: &[SettingUpdate]) -> Result<bool, RoomError> {
        let seat = self.seat_of(user).ok_or(RoomError::NotInRoom)?;

        let mut changed = false;
        for update in updates {
            let accepted = self.apply_setting(seat, update);
            if !accepted {
                tracing::debug!(room_id = %self.id, ?seat, ?update, "setting update dropped");
            }
            changed |= accepted;
        }

        self.refresh_status();
        Ok(changed)
    }

    fn apply_setting(&mut self, seat: Seat, update: &SettingUpdate) -> bool {
        match update {
            SettingUpdate::Rule(value) => match value.parse::<RoomRule>() {
                Ok(rule) => {
                    self.rule = rule;
                    self.reset_ready();
                    self.replace_game();
                    true
                }
                Err(()) => false,
            },
            SettingUpdate::Map(value) => match value.parse::<BoardMap>() {
                Ok(map) => {
                    self.map = map;
                    self.reset_ready();
                    self.replace_game();
                    true
                }
                Err(()) => false,
            },
            SettingUpdate::Faction { seat: target, value } => {
                let target = target.unwrap_or(seat);
                let Ok(faction) = value.parse::<Faction>() else {
                    return false;
                };
                if !self.may_configure(seat, target) {
                    return false;
                }
                *self.factions.get_mut(target) = faction;
                self.reset_ready();
                self.replace_game();
                true
            }
            SettingUpdate::Color { seat: target, value } => {
                let target = target.unwrap_or(seat);
                let Ok(color) = value.parse::<PieceColor>() else {
                    return false;
                };
                if !self.may_configure(seat, target) {
                    return false;
                }
                *self.colors.get_mut(target) = color;
                self.reset_ready();
                true
            }
            SettingUpdate::TurnSeconds(value) => match valid_turn_seconds(*value) {
                Some(seconds) => {
                    self.turn_seconds = seconds;
                    self.clock.set_turn_seconds(seconds);
                    self.reset_ready();
                    true
                }
                None => false,
            },
            SettingUpdate::Ready(value) => {
                if *value && !self.game.can_ready(seat, *self.factions.get(seat)) {
                    return false;
                }
                *self.ready.get_mut(seat) = *value;
                true
            }
            SettingUpdate::Setup(update) => {
                let faction = *self.factions.get(seat);
                let side = *self.sides().get(seat);
                let size = self.map.size();
                if !self.game.apply_update(seat, update, faction, side, size) {
                    return false;
                }
                self.reset_ready();
                true
            }
        }
    }

    /// 阵营/颜色修改权限
    fn may_configure(&self, seat: Seat, target: Seat) -> bool {
        match self.rule {
            RoomRule::Free => seat == target,
            RoomRule::Host => seat == Seat::Creator,
            RoomRule::Random => false,
        }
    }

    fn reset_ready(&mut self) {
        self.ready = SeatPair::both(false);
    }

    fn replace_game(&mut self) {
        self.game = GameSetup::new(self.turn_seconds);
        self.clock.stop();
    }

    /// 随机分配双方阵营
    fn shuffle_factions(&mut self) {
        self.factions = SeatPair::new(
            random_faction(self.map, &mut self.rng),
            random_faction(self.map, &mut self.rng),
        );
        self.shuffle_tick += 1;
        self.replace_game();
        tracing::debug!(room_id = %self.id, factions = ?self.factions, "factions shuffled");
    }

    /// 重新计算房间状态，进入 PLAYING 时开局，离开时清除 started
    fn refresh_status(&mut self) {
        let can_play = self.guest.is_some() && self.ready.creator && self.ready.guest;
        let next = if can_play {
            RoomStatus::Playing
        } else {
            RoomStatus::Waiting
        };

        match (self.status, next) {
            (RoomStatus::Waiting, RoomStatus::Playing) => {
                self.status = next;
                self.start_match();
            }
            (RoomStatus::Playing, RoomStatus::Waiting) => {
                self.status = next;
                self.game.started = false;
                self.clock.stop();
            }
            _ => {}
        }
    }

    /// 开局：随机先手，按双方布阵摆棋
    fn start_match(&mut self) {
        let size = self.map.size();
        let sides = self.sides();

        let board = if self.map.is_gomoku() {
            Board::empty(size)
        } else {
            let creator = self.game.resolve_placements(
                Seat::Creator,
                self.factions.creator,
                sides.creator,
                size,
                &mut self.rng,
            );
            let guest = self.game.resolve_placements(
                Seat::Guest,
                self.factions.guest,
                sides.guest,
                size,
                &mut self.rng,
            );
            match sides.creator {
                Side::Top => Board::from_placements(&creator, &guest, size),
                Side::Bottom => Board::from_placements(&guest, &creator, size),
            }
        };

        let first_turn = if self.rng.gen_bool(0.5) {
            Side::Top
        } else {
            Side::Bottom
        };
        self.game.start(board, first_turn, self.turn_seconds);
        self.clock.start();
        tracing::info!(room_id = %self.id, ?first_turn, map = ?self.map, "match started");
    }

    /// 检查用户是否可以在当前回合行动，返回其执子方
    fn acting_side(&self, user: &str) -> Result<Side, RoomError> {
        let seat = self.seat_of(user).ok_or(RoomError::NotInRoom)?;
        if !self.game.started {
            return Err(GameError::NotStarted.into());
        }
        if self.game.is_over() {
            return Err(GameError::GameOver.into());
        }
        let side = *self.sides().get(seat);
        if side != self.game.turn_side {
            return Err(GameError::NotYourTurn.into());
        }
        Ok(side)
    }

    /// 走棋（国际象棋/将棋棋盘）
    pub fn make_move(
        &mut self,
        user: &str,
        from: Position,
        to: Position,
        promotion: Option<ChessPiece>,
    ) -> Result<(), RoomError> {
        if self.map.is_gomoku() {
            return Err(GameError::WrongVariant.into());
        }
        let side = self.acting_side(user)?;
        let board = self.game.board.as_ref().ok_or(GameError::NotStarted)?;

        let illegal = GameError::IllegalMove {
            from_row: from.row,
            from_col: from.col,
            to_row: to.row,
            to_col: to.col,
        };
        let piece = board.get(from).ok_or(GameError::NoPiece {
            row: from.row,
            col: from.col,
        })?;
        if piece.side != side {
            return Err(illegal.into());
        }

        let mut mv = MoveGenerator::find_move(board, from, to, self.game.last_move.as_ref())
            .ok_or_else(|| illegal.clone())?;
        if let Some(choice) = promotion {
            if !choice.is_promotion_target() {
                return Err(illegal.into());
            }
            mv.promotion = Some(choice);
        }

        let (next, captured) = board.with_move(&mv);
        let moved = next.get(to).ok_or_else(|| illegal.clone())?;
        let last_move = LastMove::from_move(&mv, moved);

        if let Some(captured) = captured {
            self.game.captured_by_side.push(side, captured);
            if captured.is_king() {
                self.game.finish(side, WinReason::Capture);
            }
        }
        if !self.game.is_over()
            && MoveGenerator::is_checkmate(&next, side.opponent(), Some(&last_move))
        {
            self.game.finish(side, WinReason::Checkmate);
        }

        self.game.board = Some(next);
        self.game.last_move = Some(last_move);
        self.pass_turn();

        tracing::debug!(room_id = %self.id, %user, %from, %to, "move accepted");
        Ok(())
    }

    /// 五子棋落子
    pub fn place_stone(&mut self, user: &str, at: Position) -> Result<(), RoomError> {
        if !self.map.is_gomoku() {
            return Err(GameError::WrongVariant.into());
        }
        let side = self.acting_side(user)?;
        let board = self.game.board.as_ref().ok_or(GameError::NotStarted)?;

        if !board.contains(at) {
            return Err(GameError::InvalidPosition {
                row: at.row,
                col: at.col,
            }
            .into());
        }
        if board.get(at).is_some() {
            return Err(GameError::CellOccupied {
                row: at.row,
                col: at.col,
            }
            .into());
        }

        let next = board.with_stone(at, side);
        if protocol::is_five(&next, at, side) {
            self.game.finish(side, WinReason::Connect5);
        }
        self.game.board = Some(next);
        self.pass_turn();

        tracing::debug!(room_id = %self.id, %user, %at, "stone placed");
        Ok(())
    }

    /// 交换走子方并重置倒计时；分出胜负后停止计时
    fn pass_turn(&mut self) {
        self.game.turn_side = self.game.turn_side.opponent();
        if self.game.is_over() {
            self.clock.stop();
            tracing::info!(
                room_id = %self.id,
                winner = ?self.game.winner,
                reason = ?self.game.winner_reason,
                "match finished"
            );
        } else {
            self.clock.reset();
        }
    }

    /// 每秒调用一次
    pub fn tick(&mut self) -> Tick {
        if !self.game.is_live() {
            return Tick::Idle;
        }
        if !self.clock.tick() {
            return Tick::Counting;
        }

        let sides = self.sides();
        match resolve_timeout(&mut self.game, &sides) {
            Some(outcome) => {
                match outcome {
                    TimeoutOutcome::Eliminated { .. } => self.clock.stop(),
                    TimeoutOutcome::TurnPassed { .. } => self.clock.reset(),
                }
                tracing::info!(room_id = %self.id, ?outcome, "turn timed out");
                Tick::TimedOut(outcome)
            }
            None => Tick::Idle,
        }
    }
}

fn valid_turn_seconds(value: i64) -> Option<u32> {
    (MIN_TURN_SECONDS as i64..=MAX_TURN_SECONDS as i64)
        .contains(&value)
        .then_some(value as u32)
}
