//! 棋子定义
//!
//! 三种棋子体系共用一个封闭枚举：国际象棋、韩国将棋（janggi）以及五子棋的棋子。
//! 每种棋子的走法在 `moves` 模块中各有一个生成函数。

use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 阵营（使用哪一套棋子）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// 国际象棋
    Chess,
    /// 韩国将棋
    Janggi,
    /// 五子棋
    Omok,
}

impl Faction {
    /// 在 8x8 对战棋盘上实际使用的棋子体系（五子棋阵营按国际象棋处理）
    pub fn battle_family(self) -> Faction {
        match self {
            Faction::Janggi => Faction::Janggi,
            Faction::Chess | Faction::Omok => Faction::Chess,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Faction::Chess => "chess",
            Faction::Janggi => "janggi",
            Faction::Omok => "omok",
        }
    }
}

impl FromStr for Faction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chess" | "체스" => Ok(Faction::Chess),
            "janggi" | "장기" => Ok(Faction::Janggi),
            "omok" | "오목" | "gomoku" => Ok(Faction::Omok),
            _ => Err(()),
        }
    }
}

/// 国际象棋棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChessPiece {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
}

impl ChessPiece {
    /// 兵升变时允许选择的棋子
    pub fn is_promotion_target(self) -> bool {
        matches!(
            self,
            ChessPiece::Queen | ChessPiece::Rook | ChessPiece::Bishop | ChessPiece::Knight
        )
    }
}

/// 韩国将棋棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JanggiPiece {
    /// 將/漢
    King,
    /// 士
    Guard,
    /// 象
    Elephant,
    /// 馬
    Horse,
    /// 車
    Chariot,
    /// 包
    Cannon,
    /// 卒/兵
    Soldier,
}

/// 棋子种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    Chess(ChessPiece),
    Janggi(JanggiPiece),
    /// 五子棋棋子
    Stone,
}

impl PieceKind {
    /// 棋子所属阵营
    pub fn faction(&self) -> Faction {
        match self {
            PieceKind::Chess(_) => Faction::Chess,
            PieceKind::Janggi(_) => Faction::Janggi,
            PieceKind::Stone => Faction::Omok,
        }
    }

    /// 是否为王/將（被吃即终局）
    pub fn is_king(&self) -> bool {
        matches!(
            self,
            PieceKind::Chess(ChessPiece::King) | PieceKind::Janggi(JanggiPiece::King)
        )
    }

    /// 是否为包（包不能以包为炮架，也不能吃包）
    pub fn is_cannon(&self) -> bool {
        matches!(self, PieceKind::Janggi(JanggiPiece::Cannon))
    }
}

/// 棋盘上的一方
///
/// `Top` 从第 0 行开始向下推进，`Bottom` 从最后一行开始向上推进。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Top,
    Bottom,
}

impl Side {
    /// 获取对方
    pub fn opponent(&self) -> Side {
        match self {
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }

    /// 前进方向（行增量）
    pub fn forward(&self) -> i8 {
        match self {
            Side::Top => 1,
            Side::Bottom => -1,
        }
    }

    /// 底线（升变行）
    pub fn far_rank(&self, size: u8) -> u8 {
        match self {
            Side::Top => size - 1,
            Side::Bottom => 0,
        }
    }

    /// 靠近本方的三行（自定义布阵区域）
    pub fn home_rows(&self, size: u8) -> RangeInclusive<u8> {
        match self {
            Side::Top => 0..=2,
            Side::Bottom => size - 3..=size - 1,
        }
    }
}

/// 棋子唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PieceId(pub u32);

/// 棋子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub kind: PieceKind,
    pub side: Side,
    /// 是否移动过（王车易位、兵双步依赖）
    pub moved: bool,
}

impl Piece {
    /// 创建新棋子
    pub fn new(id: PieceId, kind: PieceKind, side: Side) -> Self {
        Self {
            id,
            kind,
            side,
            moved: false,
        }
    }

    pub fn faction(&self) -> Faction {
        self.kind.faction()
    }

    pub fn is_king(&self) -> bool {
        self.kind.is_king()
    }
}

/// 棋盘位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: u8,
    pub col: u8,
}

impl Position {
    /// 创建新位置（检查边界）
    pub fn new(row: u8, col: u8, size: u8) -> Option<Self> {
        if row < size && col < size {
            Some(Self { row, col })
        } else {
            None
        }
    }

    /// 创建新位置（不检查边界）
    pub const fn at(row: u8, col: u8) -> Self {
        Self { row, col }
    }

    /// 检查位置是否在指定尺寸的棋盘内
    pub fn is_within(&self, size: u8) -> bool {
        self.row < size && self.col < size
    }

    /// 检查位置是否在本方宫内（3 行 x 2 列）
    pub fn is_in_palace(&self, side: Side) -> bool {
        let rows = match side {
            Side::Top => 0..=2,
            Side::Bottom => 5..=7,
        };
        rows.contains(&self.row) && (3..=4).contains(&self.col)
    }

    /// 获取偏移后的位置
    pub fn offset(&self, dr: i8, dc: i8, size: u8) -> Option<Position> {
        let row = self.row as i16 + dr as i16;
        let col = self.col as i16 + dc as i16;
        if row >= 0 && row < size as i16 && col >= 0 && col < size as i16 {
            Some(Position {
                row: row as u8,
                col: col as u8,
            })
        } else {
            None
        }
    }

    /// 转换为数组索引
    pub fn to_index(&self, size: u8) -> usize {
        self.row as usize * size as usize + self.col as usize
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
