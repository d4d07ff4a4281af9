//! 对局控制
//!
//! 每个房间一个单步倒计时；超时由房间 actor 统一结算，保证每次超时只结算一次。

use protocol::{GameSetup, SeatPair, Side, WinReason};

/// 单步倒计时
///
/// 由房间 actor 每秒调用一次 [`TurnClock::tick`]，不依赖墙钟。
#[derive(Debug, Clone)]
pub struct TurnClock {
    /// 每步时限（秒）
    turn_seconds: u32,
    /// 当前回合剩余秒数
    remaining: u32,
    running: bool,
}

impl TurnClock {
    pub fn new(turn_seconds: u32) -> Self {
        Self {
            turn_seconds,
            remaining: turn_seconds,
            running: false,
        }
    }

    /// 修改时限，下次重置时生效
    pub fn set_turn_seconds(&mut self, turn_seconds: u32) {
        self.turn_seconds = turn_seconds;
        if !self.running {
            self.remaining = turn_seconds;
        }
    }

    pub fn turn_seconds(&self) -> u32 {
        self.turn_seconds
    }

    /// 重置为完整时限（走子方变化或开局时调用）
    pub fn reset(&mut self) {
        self.remaining = self.turn_seconds;
    }

    /// 开始计时
    pub fn start(&mut self) {
        self.reset();
        self.running = true;
    }

    /// 停止计时
    pub fn stop(&mut self) {
        self.running = false;
        self.remaining = self.turn_seconds;
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// 走过一秒，返回本回合是否超时
    pub fn tick(&mut self) -> bool {
        if !self.running {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining == 0
    }
}

/// 超时结算结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutOutcome {
    /// 扣一条命，回合交给对方
    TurnPassed { side: Side, lives_left: u8 },
    /// 命数耗尽，对方获胜
    Eliminated { winner: Side },
}

/// 结算走子方超时
///
/// 对局未在进行中时返回 `None`。
pub fn resolve_timeout(game: &mut GameSetup, sides: &SeatPair<Side>) -> Option<TimeoutOutcome> {
    if !game.is_live() {
        return None;
    }

    let side = game.turn_side;
    let seat = sides.seat_of(side);
    let lives = &mut game.seats.get_mut(seat).lives;
    *lives = lives.saturating_sub(1);
    let lives_left = *lives;

    if lives_left == 0 {
        let winner = side.opponent();
        game.finish(winner, WinReason::Timeout);
        Some(TimeoutOutcome::Eliminated { winner })
    } else {
        game.turn_side = side.opponent();
        Some(TimeoutOutcome::TurnPassed { side, lives_left })
    }
}
