//! 走法生成和验证
//!
//! 生成的是"伪合法"走法：不过滤会让本方王被将军的走法，
//! 因为在本游戏中吃掉对方王/將直接结束对局。将死判定见 [`MoveGenerator::is_checkmate`]。

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{ChessPiece, JanggiPiece, Piece, PieceKind, Position, Side};

/// 走法附加信息
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// 普通走子或吃子
    Normal,
    /// 兵的首步双格
    DoubleStep,
    /// 吃过路兵，`capture_at` 为被吃兵所在格
    EnPassant { capture_at: Position },
    /// 王车易位，车同时从 `rook_from` 移到 `rook_to`
    Castle {
        rook_from: Position,
        rook_to: Position,
    },
}

/// 走法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    /// 起始位置
    pub from: Position,
    /// 目标位置
    pub to: Position,
    pub kind: MoveKind,
    /// 被吃的棋子（如果有）
    pub captured: Option<Piece>,
    /// 兵升变的目标，`None` 表示默认升后
    pub promotion: Option<ChessPiece>,
}

impl Move {
    /// 创建新走法
    pub fn new(from: Position, to: Position) -> Self {
        Self {
            from,
            to,
            kind: MoveKind::Normal,
            captured: None,
            promotion: None,
        }
    }

    /// 创建带吃子的走法
    pub fn with_capture(from: Position, to: Position, captured: Piece) -> Self {
        Self {
            captured: Some(captured),
            ..Self::new(from, to)
        }
    }

    /// 创建带附加信息的走法
    pub fn special(from: Position, to: Position, kind: MoveKind) -> Self {
        Self {
            kind,
            ..Self::new(from, to)
        }
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// 上一步走法（吃过路兵判定依赖）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMove {
    /// 走完后的棋子
    pub piece: Piece,
    pub from: Position,
    pub to: Position,
    pub was_double_step: bool,
}

impl LastMove {
    /// 由已执行的走法和走后的棋子构造
    pub fn from_move(mv: &Move, piece: Piece) -> Self {
        Self {
            piece,
            from: mv.from,
            to: mv.to,
            was_double_step: matches!(mv.kind, MoveKind::DoubleStep),
        }
    }
}

/// 某个棋子的走法集合，只能遍历一次
#[derive(Debug)]
pub struct Moves(std::vec::IntoIter<Move>);

impl Iterator for Moves {
    type Item = Move;

    fn next(&mut self) -> Option<Move> {
        self.0.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl ExactSizeIterator for Moves {}

const ORTHOGONAL: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const DIAGONAL: [(i8, i8); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const AROUND: [(i8, i8); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// 走法生成器
pub struct MoveGenerator;

impl MoveGenerator {
    /// 生成指定格子上棋子的所有走法
    ///
    /// 空格返回空集合；是否轮到该棋子一方由调用方判断。
    pub fn legal_moves(board: &Board, from: Position, last_move: Option<&LastMove>) -> Moves {
        let mut moves = Vec::new();
        if let Some(piece) = board.get(from) {
            Self::generate_piece_moves(board, from, piece, last_move, &mut moves);
        }
        Moves(moves.into_iter())
    }

    /// 将提交的 (from, to) 解析为生成器产生的唯一走法
    pub fn find_move(
        board: &Board,
        from: Position,
        to: Position,
        last_move: Option<&LastMove>,
    ) -> Option<Move> {
        Self::legal_moves(board, from, last_move).find(|mv| mv.to == to)
    }

    /// 一方全部棋子的走法，按棋子逐个惰性生成
    pub fn side_moves<'a>(
        board: &'a Board,
        side: Side,
        last_move: Option<&'a LastMove>,
    ) -> impl Iterator<Item = Move> + 'a {
        board
            .pieces(side)
            .into_iter()
            .flat_map(move |(pos, _)| Self::legal_moves(board, pos, last_move))
    }

    fn generate_piece_moves(
        board: &Board,
        pos: Position,
        piece: Piece,
        last_move: Option<&LastMove>,
        moves: &mut Vec<Move>,
    ) {
        match piece.kind {
            PieceKind::Chess(ChessPiece::Pawn) => {
                Self::generate_pawn_moves(board, pos, piece, last_move, moves)
            }
            PieceKind::Chess(ChessPiece::Rook) | PieceKind::Janggi(JanggiPiece::Chariot) => {
                Self::generate_sliding_moves(board, pos, piece.side, &ORTHOGONAL, moves)
            }
            PieceKind::Chess(ChessPiece::Bishop) => {
                Self::generate_sliding_moves(board, pos, piece.side, &DIAGONAL, moves)
            }
            PieceKind::Chess(ChessPiece::Queen) => {
                Self::generate_sliding_moves(board, pos, piece.side, &ORTHOGONAL, moves);
                Self::generate_sliding_moves(board, pos, piece.side, &DIAGONAL, moves);
            }
            PieceKind::Chess(ChessPiece::Knight) => {
                Self::generate_knight_moves(board, pos, piece.side, moves)
            }
            PieceKind::Chess(ChessPiece::King) => Self::generate_king_moves(board, pos, piece, moves),
            PieceKind::Janggi(JanggiPiece::Soldier) => {
                Self::generate_soldier_moves(board, pos, piece.side, moves)
            }
            PieceKind::Janggi(JanggiPiece::Cannon) => {
                Self::generate_cannon_moves(board, pos, piece.side, moves)
            }
            PieceKind::Janggi(JanggiPiece::Horse) => {
                Self::generate_horse_moves(board, pos, piece.side, moves)
            }
            PieceKind::Janggi(JanggiPiece::Elephant) => {
                Self::generate_elephant_moves(board, pos, piece.side, moves)
            }
            PieceKind::Janggi(JanggiPiece::King) | PieceKind::Janggi(JanggiPiece::Guard) => {
                Self::generate_palace_moves(board, pos, piece.side, moves)
            }
            PieceKind::Stone => {}
        }
    }

    /// 车/后/象/車：沿射线滑行，遇子即停
    fn generate_sliding_moves(
        board: &Board,
        pos: Position,
        side: Side,
        directions: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        let size = board.size();
        for &(dr, dc) in directions {
            let mut current = pos;
            while let Some(to) = current.offset(dr, dc, size) {
                if let Some(target) = board.get(to) {
                    if target.side != side {
                        moves.push(Move::with_capture(pos, to, target));
                    }
                    break;
                }
                moves.push(Move::new(pos, to));
                current = to;
            }
        }
    }

    /// 国际象棋马：日字跳，不受阻挡
    fn generate_knight_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        let jumps = [
            (-2, -1),
            (-2, 1),
            (-1, -2),
            (-1, 2),
            (1, -2),
            (1, 2),
            (2, -1),
            (2, 1),
        ];
        for (dr, dc) in jumps {
            if let Some(to) = pos.offset(dr, dc, board.size()) {
                Self::try_add_move(board, pos, to, side, moves);
            }
        }
    }

    /// 国际象棋兵：前进、首步双格、斜吃、吃过路兵
    fn generate_pawn_moves(
        board: &Board,
        pos: Position,
        piece: Piece,
        last_move: Option<&LastMove>,
        moves: &mut Vec<Move>,
    ) {
        let size = board.size();
        let dir = piece.side.forward();

        if let Some(one) = pos.offset(dir, 0, size) {
            if board.get(one).is_none() {
                moves.push(Move::new(pos, one));
                if !piece.moved {
                    if let Some(two) = pos.offset(dir * 2, 0, size) {
                        if board.get(two).is_none() {
                            moves.push(Move::special(pos, two, MoveKind::DoubleStep));
                        }
                    }
                }
            }
        }

        for dc in [-1i8, 1] {
            if let Some(to) = pos.offset(dir, dc, size) {
                if let Some(target) = board.get(to) {
                    if target.side != piece.side {
                        moves.push(Move::with_capture(pos, to, target));
                    }
                }
            }
        }

        // 吃过路兵：仅在对方兵刚刚双步走到相邻格的下一手有效
        let Some(last) = last_move else {
            return;
        };
        let passed = last.was_double_step
            && last.piece.kind == PieceKind::Chess(ChessPiece::Pawn)
            && last.piece.side != piece.side
            && last.to.row == pos.row
            && last.to.col.abs_diff(pos.col) == 1;
        if !passed || board.get(last.to).map(|p| p.id) != Some(last.piece.id) {
            return;
        }
        if let Some(to) = Position::new((pos.row as i8 + dir) as u8, last.to.col, size) {
            if board.get(to).is_none() {
                moves.push(Move {
                    captured: Some(last.piece),
                    ..Move::special(pos, to, MoveKind::EnPassant { capture_at: last.to })
                });
            }
        }
    }

    /// 国际象棋王：八方向一步，以及王车易位
    fn generate_king_moves(board: &Board, pos: Position, king: Piece, moves: &mut Vec<Move>) {
        let size = board.size();
        for (dr, dc) in AROUND {
            if let Some(to) = pos.offset(dr, dc, size) {
                Self::try_add_move(board, pos, to, king.side, moves);
            }
        }

        if king.moved {
            return;
        }

        let is_castling_rook = |col: u8| {
            board.get(Position::at(pos.row, col)).is_some_and(|rook| {
                rook.kind == PieceKind::Chess(ChessPiece::Rook)
                    && rook.side == king.side
                    && !rook.moved
            })
        };
        let clear_between = |a: u8, b: u8| {
            (a.min(b) + 1..a.max(b)).all(|col| board.get(Position::at(pos.row, col)).is_none())
        };

        // 后翼
        if pos.col >= 2 && is_castling_rook(0) && clear_between(0, pos.col) {
            moves.push(Move::special(
                pos,
                Position::at(pos.row, pos.col - 2),
                MoveKind::Castle {
                    rook_from: Position::at(pos.row, 0),
                    rook_to: Position::at(pos.row, pos.col - 1),
                },
            ));
        }

        // 王翼
        let last_col = size - 1;
        if pos.col + 2 <= last_col
            && is_castling_rook(last_col)
            && clear_between(pos.col, last_col)
        {
            moves.push(Move::special(
                pos,
                Position::at(pos.row, pos.col + 2),
                MoveKind::Castle {
                    rook_from: Position::at(pos.row, last_col),
                    rook_to: Position::at(pos.row, pos.col + 1),
                },
            ));
        }
    }

    /// 卒/兵：前进或左右一步
    fn generate_soldier_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        for (dr, dc) in [(side.forward(), 0), (0, -1), (0, 1)] {
            if let Some(to) = pos.offset(dr, dc, board.size()) {
                Self::try_add_move(board, pos, to, side, moves);
            }
        }
    }

    /// 包：必须隔一个非包的炮架，落点为炮架之后的空格或第一个敌方非包棋子
    fn generate_cannon_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        let size = board.size();
        for (dr, dc) in ORTHOGONAL {
            let mut current = pos;
            let mut screened = false;

            while let Some(to) = current.offset(dr, dc, size) {
                current = to;
                let target = board.get(to);

                if !screened {
                    match target {
                        None => continue,
                        Some(screen) if screen.kind.is_cannon() => break,
                        Some(_) => {
                            screened = true;
                            continue;
                        }
                    }
                }

                match target {
                    None => moves.push(Move::new(pos, to)),
                    Some(target) => {
                        if target.side != side && !target.kind.is_cannon() {
                            moves.push(Move::with_capture(pos, to, target));
                        }
                        break;
                    }
                }
            }
        }
    }

    /// 馬：先直走一格（不能被挡），再斜走一格
    fn generate_horse_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        let size = board.size();
        let patterns: [((i8, i8), [(i8, i8); 2]); 4] = [
            ((-1, 0), [(-2, -1), (-2, 1)]),
            ((1, 0), [(2, -1), (2, 1)]),
            ((0, -1), [(-1, -2), (1, -2)]),
            ((0, 1), [(-1, 2), (1, 2)]),
        ];

        for ((br, bc), targets) in patterns {
            match pos.offset(br, bc, size) {
                Some(leg) if board.get(leg).is_none() => {}
                _ => continue,
            }
            for (dr, dc) in targets {
                if let Some(to) = pos.offset(dr, dc, size) {
                    Self::try_add_move(board, pos, to, side, moves);
                }
            }
        }
    }

    /// 象：直走一格再斜走两格，途经两格都必须为空
    fn generate_elephant_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        let size = board.size();
        let patterns: [((i8, i8), (i8, i8), (i8, i8)); 8] = [
            ((-1, 0), (-2, -1), (-3, -2)),
            ((-1, 0), (-2, 1), (-3, 2)),
            ((1, 0), (2, -1), (3, -2)),
            ((1, 0), (2, 1), (3, 2)),
            ((0, -1), (-1, -2), (-2, -3)),
            ((0, -1), (1, -2), (2, -3)),
            ((0, 1), (-1, 2), (-2, 3)),
            ((0, 1), (1, 2), (2, 3)),
        ];

        for ((r1, c1), (r2, c2), (tr, tc)) in patterns {
            let (Some(first), Some(second), Some(to)) = (
                pos.offset(r1, c1, size),
                pos.offset(r2, c2, size),
                pos.offset(tr, tc, size),
            ) else {
                continue;
            };
            if board.get(first).is_some() || board.get(second).is_some() {
                continue;
            }
            Self::try_add_move(board, pos, to, side, moves);
        }
    }

    /// 將/士：八方向一步，不能出宫
    fn generate_palace_moves(board: &Board, pos: Position, side: Side, moves: &mut Vec<Move>) {
        for (dr, dc) in AROUND {
            if let Some(to) = pos.offset(dr, dc, board.size()) {
                if to.is_in_palace(side) {
                    Self::try_add_move(board, pos, to, side, moves);
                }
            }
        }
    }

    /// 尝试添加走法（目标为空或敌方棋子）
    fn try_add_move(board: &Board, from: Position, to: Position, side: Side, moves: &mut Vec<Move>) {
        match board.get(to) {
            Some(target) if target.side == side => {}
            Some(target) => moves.push(Move::with_capture(from, to, target)),
            None => moves.push(Move::new(from, to)),
        }
    }

    /// 检查指定一方是否被将军
    ///
    /// 对方所有棋子的走法中包含本方王所在格即为将军，与轮到谁走无关。
    pub fn is_in_check(board: &Board, side: Side, last_move: Option<&LastMove>) -> bool {
        let Some(king_pos) = board.find_king(side) else {
            return false;
        };

        Self::side_moves(board, side.opponent(), last_move).any(|mv| mv.to == king_pos)
    }

    /// 是否存在一步能解除将军的走法
    pub fn has_escape(board: &Board, side: Side, last_move: Option<&LastMove>) -> bool {
        Self::side_moves(board, side, last_move).any(|mv| {
            let (next, _) = board.with_move(&mv);
            !Self::is_in_check(&next, side, last_move)
        })
    }

    /// 检查是否被将死
    pub fn is_checkmate(board: &Board, side: Side, last_move: Option<&LastMove>) -> bool {
        Self::is_in_check(board, side, last_move) && !Self::has_escape(board, side, last_move)
    }
}
