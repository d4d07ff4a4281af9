//! 五子棋胜负判定

use crate::board::Board;
use crate::constants::CONNECT_TARGET;
use crate::piece::{PieceKind, Position, Side};

/// 四个方向：横、竖、两条斜线
const AXES: [(i8, i8); 4] = [(0, 1), (1, 0), (1, 1), (1, -1)];

/// 从 `pos` 沿 (dr, dc) 方向数连续同色棋子个数（不含起点）
fn count_direction(board: &Board, pos: Position, side: Side, dr: i8, dc: i8) -> usize {
    let mut count = 0;
    let mut current = pos;
    while let Some(next) = current.offset(dr, dc, board.size()) {
        match board.get(next) {
            Some(piece) if piece.kind == PieceKind::Stone && piece.side == side => {
                count += 1;
                current = next;
            }
            _ => break,
        }
    }
    count
}

/// 经过 `pos` 的最长同色连线长度（含 `pos` 本身）
pub fn longest_line(board: &Board, pos: Position, side: Side) -> usize {
    AXES.iter()
        .map(|&(dr, dc)| {
            1 + count_direction(board, pos, side, dr, dc)
                + count_direction(board, pos, side, -dr, -dc)
        })
        .max()
        .unwrap_or(1)
}

/// 在 `pos` 落子后是否连成五子（长连同样算胜）
pub fn is_five(board: &Board, pos: Position, side: Side) -> bool {
    longest_line(board, pos, side) >= CONNECT_TARGET
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(board: Board, cells: &[(u8, u8)], side: Side) -> Board {
        cells
            .iter()
            .fold(board, |b, &(r, c)| b.with_stone(Position::at(r, c), side))
    }

    #[test]
    fn test_horizontal_five() {
        let board = place(Board::empty(15), &[(7, 3), (7, 4), (7, 5), (7, 6)], Side::Top);
        let board = board.with_stone(Position::at(7, 7), Side::Top);
        assert!(is_five(&board, Position::at(7, 7), Side::Top));
    }

    #[test]
    fn test_four_is_not_enough() {
        let board = place(Board::empty(15), &[(7, 4), (7, 5), (7, 6)], Side::Top);
        let board = board.with_stone(Position::at(7, 7), Side::Top);
        assert_eq!(longest_line(&board, Position::at(7, 7), Side::Top), 4);
        assert!(!is_five(&board, Position::at(7, 7), Side::Top));
    }

    #[test]
    fn test_middle_stone_completes_line() {
        let board = place(
            Board::empty(15),
            &[(3, 3), (4, 4), (6, 6), (7, 7)],
            Side::Bottom,
        );
        let board = board.with_stone(Position::at(5, 5), Side::Bottom);
        assert!(is_five(&board, Position::at(5, 5), Side::Bottom));
    }

    #[test]
    fn test_anti_diagonal_and_edges() {
        let board = place(
            Board::empty(15),
            &[(0, 14), (1, 13), (2, 12), (3, 11)],
            Side::Top,
        );
        let board = board.with_stone(Position::at(4, 10), Side::Top);
        assert!(is_five(&board, Position::at(4, 10), Side::Top));
    }

    #[test]
    fn test_opponent_stone_breaks_line() {
        let board = place(Board::empty(15), &[(7, 3), (7, 4), (7, 6)], Side::Top);
        let board = board.with_stone(Position::at(7, 5), Side::Bottom);
        let board = board.with_stone(Position::at(7, 7), Side::Top);
        assert!(!is_five(&board, Position::at(7, 7), Side::Top));
    }

    #[test]
    fn test_overline_wins() {
        let board = place(
            Board::empty(15),
            &[(2, 0), (3, 0), (4, 0), (6, 0), (7, 0)],
            Side::Top,
        );
        let board = board.with_stone(Position::at(5, 0), Side::Top);
        assert_eq!(longest_line(&board, Position::at(5, 0), Side::Top), 6);
        assert!(is_five(&board, Position::at(5, 0), Side::Top));
    }
}
