//! 棋盘快照
//!
//! 棋盘一旦发布（写入 `GameSetup` 并广播）就不再原地修改，
//! 走子通过 [`Board::with_move`] 产生新的快照。

use serde::{Deserialize, Serialize};

use crate::moves::{Move, MoveKind};
use crate::piece::{ChessPiece, Piece, PieceId, PieceKind, Position, Side};
use crate::setup::Placement;

/// 棋盘
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    /// 边长（8 或 15）
    size: u8,
    /// 索引为 row * size + col，使用 Vec 以支持 serde
    squares: Vec<Option<Piece>>,
}

impl Board {
    /// 创建空棋盘
    pub fn empty(size: u8) -> Self {
        Self {
            size,
            squares: vec![None; size as usize * size as usize],
        }
    }

    /// 按双方布阵创建棋盘，棋子 ID 依次分配；越界的布阵条目被忽略
    pub fn from_placements(top: &[Placement], bottom: &[Placement], size: u8) -> Self {
        let mut board = Self::empty(size);
        let mut next_id = 1u32;
        for (side, placements) in [(Side::Top, top), (Side::Bottom, bottom)] {
            for placement in placements {
                let pos = Position::at(placement.row, placement.col);
                if !pos.is_within(size) {
                    continue;
                }
                board.set(pos, Some(Piece::new(PieceId(next_id), placement.kind, side)));
                next_id += 1;
            }
        }
        board
    }

    /// 棋盘边长
    pub fn size(&self) -> u8 {
        self.size
    }

    /// 位置是否在棋盘内
    pub fn contains(&self, pos: Position) -> bool {
        pos.is_within(self.size)
    }

    /// 获取指定位置的棋子
    pub fn get(&self, pos: Position) -> Option<Piece> {
        if self.contains(pos) {
            self.squares[pos.to_index(self.size)]
        } else {
            None
        }
    }

    /// 设置指定位置的棋子（仅用于构造快照）
    pub fn set(&mut self, pos: Position, piece: Option<Piece>) {
        if self.contains(pos) {
            let index = pos.to_index(self.size);
            self.squares[index] = piece;
        }
    }

    /// 执行走法，返回新快照和被吃的棋子
    ///
    /// 处理吃过路兵、王车易位和兵的升变；移动过的棋子标记为 `moved`。
    pub fn with_move(&self, mv: &Move) -> (Board, Option<Piece>) {
        let Some(moving) = self.get(mv.from) else {
            return (self.clone(), None);
        };

        let mut next = self.clone();
        let mut captured = next.get(mv.to);

        match mv.kind {
            MoveKind::EnPassant { capture_at } => {
                captured = next.get(capture_at);
                next.set(capture_at, None);
            }
            MoveKind::Castle { rook_from, rook_to } => {
                if let Some(rook) = next.get(rook_from) {
                    next.set(rook_from, None);
                    next.set(rook_to, Some(Piece { moved: true, ..rook }));
                }
            }
            MoveKind::Normal | MoveKind::DoubleStep => {}
        }

        let mut moved = Piece {
            moved: true,
            ..moving
        };
        if moving.kind == PieceKind::Chess(ChessPiece::Pawn)
            && mv.to.row == moving.side.far_rank(self.size)
        {
            let target = mv.promotion.unwrap_or(ChessPiece::Queen);
            moved.kind = PieceKind::Chess(target);
        }

        next.set(mv.from, None);
        next.set(mv.to, Some(moved));
        (next, captured)
    }

    /// 在空位落下一颗五子棋子，返回新快照
    pub fn with_stone(&self, pos: Position, side: Side) -> Board {
        let mut next = self.clone();
        let id = PieceId(pos.to_index(self.size) as u32 + 1);
        next.set(pos, Some(Piece::new(id, PieceKind::Stone, side)));
        next
    }

    /// 查找指定一方的王/將
    pub fn find_king(&self, side: Side) -> Option<Position> {
        self.occupied()
            .find(|(_, piece)| piece.side == side && piece.is_king())
            .map(|(pos, _)| pos)
    }

    /// 获取指定一方的所有棋子位置
    pub fn pieces(&self, side: Side) -> Vec<(Position, Piece)> {
        self.occupied().filter(|(_, piece)| piece.side == side).collect()
    }

    /// 获取所有棋子
    pub fn all_pieces(&self) -> Vec<(Position, Piece)> {
        self.occupied().collect()
    }

    fn occupied(&self) -> impl Iterator<Item = (Position, Piece)> + '_ {
        let size = self.size as usize;
        self.squares.iter().enumerate().filter_map(move |(index, square)| {
            square.map(|piece| {
                (
                    Position::at((index / size) as u8, (index % size) as u8),
                    piece,
                )
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::JanggiPiece;

    fn chess(id: u32, kind: ChessPiece, side: Side) -> Piece {
        Piece::new(PieceId(id), PieceKind::Chess(kind), side)
    }

    #[test]
    fn test_empty_board() {
        let board = Board::empty(15);
        assert_eq!(board.size(), 15);
        assert!(board.all_pieces().is_empty());
        assert!(board.get(Position::at(14, 14)).is_none());
        assert!(!board.contains(Position::at(15, 0)));
    }

    #[test]
    fn test_from_placements() {
        let top = vec![Placement::new(PieceKind::Janggi(JanggiPiece::King), 1, 4)];
        let bottom = vec![
            Placement::new(PieceKind::Chess(ChessPiece::King), 7, 4),
            Placement::new(PieceKind::Chess(ChessPiece::Rook), 9, 9),
        ];
        let board = Board::from_placements(&top, &bottom, 8);

        assert_eq!(board.all_pieces().len(), 2);
        assert_eq!(board.find_king(Side::Top), Some(Position::at(1, 4)));
        assert_eq!(board.find_king(Side::Bottom), Some(Position::at(7, 4)));
        let top_king = board.get(Position::at(1, 4)).unwrap();
        let bottom_king = board.get(Position::at(7, 4)).unwrap();
        assert_ne!(top_king.id, bottom_king.id);
    }

    #[test]
    fn test_with_move_leaves_source_untouched() {
        let mut board = Board::empty(8);
        board.set(Position::at(6, 0), Some(chess(1, ChessPiece::Pawn, Side::Bottom)));
        let mv = Move::new(Position::at(6, 0), Position::at(5, 0));

        let (next, captured) = board.with_move(&mv);

        assert!(captured.is_none());
        assert!(board.get(Position::at(6, 0)).is_some());
        assert!(next.get(Position::at(6, 0)).is_none());
        assert!(next.get(Position::at(5, 0)).unwrap().moved);
    }

    #[test]
    fn test_with_move_capture() {
        let mut board = Board::empty(8);
        board.set(Position::at(4, 4), Some(chess(1, ChessPiece::Rook, Side::Bottom)));
        board.set(Position::at(1, 4), Some(chess(2, ChessPiece::Knight, Side::Top)));

        let (next, captured) = board.with_move(&Move::new(Position::at(4, 4), Position::at(1, 4)));

        assert_eq!(captured.map(|p| p.id), Some(PieceId(2)));
        assert_eq!(next.get(Position::at(1, 4)).map(|p| p.id), Some(PieceId(1)));
    }

    #[test]
    fn test_with_move_en_passant() {
        let mut board = Board::empty(8);
        board.set(Position::at(3, 4), Some(chess(1, ChessPiece::Pawn, Side::Bottom)));
        board.set(Position::at(3, 5), Some(chess(2, ChessPiece::Pawn, Side::Top)));
        let mv = Move {
            kind: MoveKind::EnPassant {
                capture_at: Position::at(3, 5),
            },
            ..Move::new(Position::at(3, 4), Position::at(2, 5))
        };

        let (next, captured) = board.with_move(&mv);

        assert_eq!(captured.map(|p| p.id), Some(PieceId(2)));
        assert!(next.get(Position::at(3, 5)).is_none());
        assert!(next.get(Position::at(2, 5)).is_some());
    }

    #[test]
    fn test_with_move_castle() {
        let mut board = Board::empty(8);
        board.set(Position::at(7, 4), Some(chess(1, ChessPiece::King, Side::Bottom)));
        board.set(Position::at(7, 7), Some(chess(2, ChessPiece::Rook, Side::Bottom)));
        let mv = Move {
            kind: MoveKind::Castle {
                rook_from: Position::at(7, 7),
                rook_to: Position::at(7, 5),
            },
            ..Move::new(Position::at(7, 4), Position::at(7, 6))
        };

        let (next, captured) = board.with_move(&mv);

        assert!(captured.is_none());
        assert_eq!(next.get(Position::at(7, 6)).map(|p| p.id), Some(PieceId(1)));
        let rook = next.get(Position::at(7, 5)).unwrap();
        assert_eq!(rook.id, PieceId(2));
        assert!(rook.moved);
        assert!(next.get(Position::at(7, 7)).is_none());
    }

    #[test]
    fn test_with_move_promotion() {
        let mut board = Board::empty(8);
        board.set(Position::at(6, 2), Some(chess(1, ChessPiece::Pawn, Side::Top)));

        let (next, _) = board.with_move(&Move::new(Position::at(6, 2), Position::at(7, 2)));
        assert_eq!(
            next.get(Position::at(7, 2)).unwrap().kind,
            PieceKind::Chess(ChessPiece::Queen)
        );

        let under = Move {
            promotion: Some(ChessPiece::Knight),
            ..Move::new(Position::at(6, 2), Position::at(7, 2))
        };
        let (next, _) = board.with_move(&under);
        assert_eq!(
            next.get(Position::at(7, 2)).unwrap().kind,
            PieceKind::Chess(ChessPiece::Knight)
        );
    }

    #[test]
    fn test_with_stone() {
        let board = Board::empty(15);
        let next = board.with_stone(Position::at(7, 7), Side::Top);
        let stone = next.get(Position::at(7, 7)).unwrap();
        assert_eq!(stone.kind, PieceKind::Stone);
        assert_eq!(stone.side, Side::Top);
        assert!(board.get(Position::at(7, 7)).is_none());
    }
}
