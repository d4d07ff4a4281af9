//! 对局准备
//!
//! 座位、布阵、自定义布阵校验，以及一局对局的完整状态 [`GameSetup`]。

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::constants::{MAX_CUSTOM_LAYOUT, MAX_LIVES};
use crate::moves::LastMove;
use crate::piece::{ChessPiece, Faction, JanggiPiece, Piece, PieceKind, Position, Side};
use crate::settings::{BoardMap, SetupUpdate};

/// 房间座位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Seat {
    /// 房主
    Creator,
    /// 参与者
    Guest,
}

impl Seat {
    pub fn other(&self) -> Seat {
        match self {
            Seat::Creator => Seat::Guest,
            Seat::Guest => Seat::Creator,
        }
    }
}

/// 按座位存放的一对值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatPair<T> {
    pub creator: T,
    pub guest: T,
}

impl<T> SeatPair<T> {
    pub fn new(creator: T, guest: T) -> Self {
        Self { creator, guest }
    }

    pub fn get(&self, seat: Seat) -> &T {
        match seat {
            Seat::Creator => &self.creator,
            Seat::Guest => &self.guest,
        }
    }

    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        match seat {
            Seat::Creator => &mut self.creator,
            Seat::Guest => &mut self.guest,
        }
    }
}

impl<T: Clone> SeatPair<T> {
    pub fn both(value: T) -> Self {
        Self {
            creator: value.clone(),
            guest: value,
        }
    }
}

impl SeatPair<Side> {
    /// 执指定一方的座位
    pub fn seat_of(&self, side: Side) -> Seat {
        if self.creator == side {
            Seat::Creator
        } else {
            Seat::Guest
        }
    }
}

/// 计算双方座位执哪一方
///
/// 五子棋棋盘上房主执上方（黑）；否则国际象棋执下方、将棋执上方，
/// 同一体系时房主执下方。
pub fn seat_sides(map: BoardMap, creator: Faction, guest: Faction) -> SeatPair<Side> {
    if map.is_gomoku() {
        return SeatPair::new(Side::Top, Side::Bottom);
    }

    let natural = |faction: Faction| match faction.battle_family() {
        Faction::Janggi => Side::Top,
        _ => Side::Bottom,
    };
    let (creator_side, guest_side) = (natural(creator), natural(guest));
    if creator_side == guest_side {
        SeatPair::new(Side::Bottom, Side::Top)
    } else {
        SeatPair::new(creator_side, guest_side)
    }
}

/// 将棋布阵（马、象的排列）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Formation {
    /// 안상차림：马象象马
    AnSang,
    /// 안마차림：象马马象
    AnMa,
    /// 왼상차림：象马象马
    LeftSang,
    /// 오른상차림：马象马象
    RightSang,
}

impl Formation {
    pub const ALL: [Formation; 4] = [
        Formation::AnSang,
        Formation::AnMa,
        Formation::LeftSang,
        Formation::RightSang,
    ];

    /// 底线 1、2、5、6 列的棋子
    pub fn order(&self) -> [JanggiPiece; 4] {
        use JanggiPiece::{Elephant as E, Horse as H};
        match self {
            Formation::AnSang => [H, E, E, H],
            Formation::AnMa => [E, H, H, E],
            Formation::LeftSang => [E, H, E, H],
            Formation::RightSang => [H, E, H, E],
        }
    }

    /// 随机选择一种布阵
    pub fn random<R: Rng>(rng: &mut R) -> Formation {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Formation::AnSang => "an_sang",
            Formation::AnMa => "an_ma",
            Formation::LeftSang => "left_sang",
            Formation::RightSang => "right_sang",
        }
    }
}

impl FromStr for Formation {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "an_sang" | "안상차림" => Ok(Formation::AnSang),
            "an_ma" | "안마차림" => Ok(Formation::AnMa),
            "left_sang" | "왼상차림" => Ok(Formation::LeftSang),
            "right_sang" | "오른상차림" => Ok(Formation::RightSang),
            _ => Err(()),
        }
    }
}

/// 布阵方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementMode {
    /// 使用固定布阵
    #[default]
    Formation,
    /// 自行摆放（仅将棋）
    Custom,
}

impl FromStr for PlacementMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "formation" => Ok(PlacementMode::Formation),
            "custom" => Ok(PlacementMode::Custom),
            _ => Err(()),
        }
    }
}

/// 一个棋子的摆放位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Placement {
    pub kind: PieceKind,
    pub row: u8,
    pub col: u8,
}

impl Placement {
    pub fn new(kind: PieceKind, row: u8, col: u8) -> Self {
        Self { kind, row, col }
    }

    pub fn position(&self) -> Position {
        Position::at(self.row, self.col)
    }
}

fn back_and_front(faction: Faction, formation: Formation) -> ([PieceKind; 8], [PieceKind; 8]) {
    match faction.battle_family() {
        Faction::Janggi => {
            use JanggiPiece::*;
            let [f1, f2, f3, f4] = formation.order();
            let back = [Chariot, f1, f2, Guard, King, f3, f4, Chariot].map(PieceKind::Janggi);
            let front = [Cannon, Soldier, Soldier, Soldier, Soldier, Soldier, Soldier, Cannon]
                .map(PieceKind::Janggi);
            (back, front)
        }
        _ => {
            use ChessPiece::*;
            let back = [Rook, Knight, Bishop, Queen, King, Bishop, Knight, Rook].map(PieceKind::Chess);
            (back, [PieceKind::Chess(Pawn); 8])
        }
    }
}

/// 默认布阵：底线一行主力，前一行兵/卒（将棋两端为包）
pub fn default_placements(faction: Faction, side: Side, formation: Formation, size: u8) -> Vec<Placement> {
    let (back, front) = back_and_front(faction, formation);
    let (back_row, front_row) = match side {
        Side::Top => (0, 1),
        Side::Bottom => (size - 1, size - 2),
    };

    let mut placements = Vec::with_capacity(16);
    for (col, kind) in back.into_iter().enumerate() {
        placements.push(Placement::new(kind, back_row, col as u8));
    }
    for (col, kind) in front.into_iter().enumerate() {
        placements.push(Placement::new(kind, front_row, col as u8));
    }
    placements
}

/// 一方全部 16 个棋子
pub fn piece_pool(faction: Faction) -> Vec<PieceKind> {
    let (back, front) = back_and_front(faction, Formation::AnSang);
    back.into_iter().chain(front).collect()
}

/// 自定义布阵中尚未摆放的棋子
pub fn unplaced_pool(faction: Faction, layout: &[Placement]) -> Vec<PieceKind> {
    let mut placed: HashMap<PieceKind, usize> = HashMap::new();
    for placement in layout {
        *placed.entry(placement.kind).or_default() += 1;
    }

    piece_pool(faction)
        .into_iter()
        .filter(|kind| match placed.get_mut(kind) {
            Some(count) if *count > 0 => {
                *count -= 1;
                false
            }
            _ => true,
        })
        .collect()
}

/// 校验自定义布阵：只能放在己方最近三行、不能重叠、不能超出棋子池
pub fn is_valid_custom_layout(layout: &[Placement], faction: Faction, side: Side, size: u8) -> bool {
    if faction.battle_family() != Faction::Janggi || layout.len() > MAX_CUSTOM_LAYOUT {
        return false;
    }

    let home_rows = side.home_rows(size);
    let mut cells = HashSet::new();
    for placement in layout {
        if placement.kind.faction() != Faction::Janggi
            || !home_rows.contains(&placement.row)
            || placement.col >= size
            || !cells.insert((placement.row, placement.col))
        {
            return false;
        }
    }

    unplaced_pool(faction, layout).len() + layout.len() == piece_pool(faction).len()
}

/// 获胜原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WinReason {
    /// 吃掉对方王/將
    Capture,
    /// 将死
    Checkmate,
    /// 对方命数耗尽
    Timeout,
    /// 五子连珠
    Connect5,
}

/// 双方吃掉的棋子（按吃子方记录，只追加）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captures {
    pub top: Vec<Piece>,
    pub bottom: Vec<Piece>,
}

impl Captures {
    pub fn get(&self, side: Side) -> &[Piece] {
        match side {
            Side::Top => &self.top,
            Side::Bottom => &self.bottom,
        }
    }

    pub fn push(&mut self, side: Side, piece: Piece) {
        match side {
            Side::Top => self.top.push(piece),
            Side::Bottom => self.bottom.push(piece),
        }
    }
}

/// 单个座位的布阵状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatSetup {
    pub lives: u8,
    pub mode: PlacementMode,
    /// `None` 表示开局时随机选择
    pub formation: Option<Formation>,
    pub custom_layout: Vec<Placement>,
}

impl Default for SeatSetup {
    fn default() -> Self {
        Self {
            lives: MAX_LIVES,
            mode: PlacementMode::Formation,
            formation: None,
            custom_layout: Vec::new(),
        }
    }
}

/// 一局对局的完整状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSetup {
    pub started: bool,
    pub first_turn: Option<Side>,
    pub turn_side: Side,
    pub winner: Option<Side>,
    pub winner_reason: Option<WinReason>,
    pub board: Option<Board>,
    pub last_move: Option<LastMove>,
    pub captured_by_side: Captures,
    pub seats: SeatPair<SeatSetup>,
    /// 当前回合剩余秒数
    pub remaining_seconds: u32,
}

impl GameSetup {
    /// 创建默认状态
    pub fn new(turn_seconds: u32) -> Self {
        Self {
            started: false,
            first_turn: None,
            turn_side: Side::Bottom,
            winner: None,
            winner_reason: None,
            board: None,
            last_move: None,
            captured_by_side: Captures::default(),
            seats: SeatPair::default(),
            remaining_seconds: turn_seconds,
        }
    }

    /// 对局已开始且未分出胜负
    pub fn is_live(&self) -> bool {
        self.started && self.winner.is_none()
    }

    pub fn is_over(&self) -> bool {
        self.winner.is_some()
    }

    /// 实际生效的布阵方式（国际象棋阵营只能使用固定布阵）
    pub fn effective_mode(&self, seat: Seat, faction: Faction) -> PlacementMode {
        match faction.battle_family() {
            Faction::Janggi => self.seats.get(seat).mode,
            _ => PlacementMode::Formation,
        }
    }

    /// 应用一条布阵修改，返回是否被接受
    ///
    /// 对局进行中不接受修改。
    pub fn apply_update(
        &mut self,
        seat: Seat,
        update: &SetupUpdate,
        faction: Faction,
        side: Side,
        size: u8,
    ) -> bool {
        if self.is_live() {
            return false;
        }

        let janggi = faction.battle_family() == Faction::Janggi;
        let state = self.seats.get_mut(seat);
        match update {
            SetupUpdate::Mode(value) => match value.parse::<PlacementMode>() {
                Ok(PlacementMode::Custom) if !janggi => false,
                Ok(mode) => {
                    state.mode = mode;
                    true
                }
                Err(()) => false,
            },
            SetupUpdate::Formation(value) => match value.parse::<Formation>() {
                Ok(formation) => {
                    state.formation = Some(formation);
                    true
                }
                Err(()) => false,
            },
            SetupUpdate::CustomLayout(layout) => {
                if !is_valid_custom_layout(layout, faction, side, size) {
                    return false;
                }
                state.custom_layout = layout.clone();
                true
            }
        }
    }

    /// 是否允许切换准备状态：自定义布阵必须摆完所有棋子
    pub fn can_ready(&self, seat: Seat, faction: Faction) -> bool {
        match self.effective_mode(seat, faction) {
            PlacementMode::Formation => true,
            PlacementMode::Custom => unplaced_pool(faction, &self.seats.get(seat).custom_layout).is_empty(),
        }
    }

    /// 开局时某个座位的最终布阵
    pub fn resolve_placements<R: Rng>(
        &self,
        seat: Seat,
        faction: Faction,
        side: Side,
        size: u8,
        rng: &mut R,
    ) -> Vec<Placement> {
        let state = self.seats.get(seat);
        match self.effective_mode(seat, faction) {
            PlacementMode::Custom => state.custom_layout.clone(),
            PlacementMode::Formation => {
                let formation = state.formation.unwrap_or_else(|| Formation::random(rng));
                default_placements(faction, side, formation, size)
            }
        }
    }

    /// 开始一局：重置命数与吃子记录，放上新棋盘
    pub fn start(&mut self, board: Board, first_turn: Side, turn_seconds: u32) {
        self.started = true;
        self.first_turn = Some(first_turn);
        self.turn_side = first_turn;
        self.winner = None;
        self.winner_reason = None;
        self.board = Some(board);
        self.last_move = None;
        self.captured_by_side = Captures::default();
        self.seats.creator.lives = MAX_LIVES;
        self.seats.guest.lives = MAX_LIVES;
        self.remaining_seconds = turn_seconds;
    }

    /// 记录胜负
    pub fn finish(&mut self, winner: Side, reason: WinReason) {
        self.winner = Some(winner);
        self.winner_reason = Some(reason);
    }
}

/// 随机抽取一个阵营（随机分配规则）
pub fn random_faction<R: Rng>(map: BoardMap, rng: &mut R) -> Faction {
    if map.is_gomoku() {
        return Faction::Omok;
    }
    [Faction::Chess, Faction::Janggi]
        .choose(rng)
        .copied()
        .unwrap_or(Faction::Chess)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_seat_sides() {
        let sides = seat_sides(BoardMap::Chess, Faction::Chess, Faction::Janggi);
        assert_eq!(sides, SeatPair::new(Side::Bottom, Side::Top));

        let sides = seat_sides(BoardMap::Janggi, Faction::Janggi, Faction::Chess);
        assert_eq!(sides, SeatPair::new(Side::Top, Side::Bottom));

        let sides = seat_sides(BoardMap::Chess, Faction::Janggi, Faction::Janggi);
        assert_eq!(sides, SeatPair::new(Side::Bottom, Side::Top));

        let sides = seat_sides(BoardMap::Gomoku, Faction::Chess, Faction::Janggi);
        assert_eq!(sides.creator, Side::Top);
        assert_eq!(sides.seat_of(Side::Bottom), Seat::Guest);
    }

    #[test]
    fn test_formation_parse_and_order() {
        assert_eq!("an_ma".parse::<Formation>(), Ok(Formation::AnMa));
        assert_eq!("오른상차림".parse::<Formation>(), Ok(Formation::RightSang));
        assert!("left".parse::<Formation>().is_err());
        assert_eq!(
            Formation::LeftSang.order(),
            [
                JanggiPiece::Elephant,
                JanggiPiece::Horse,
                JanggiPiece::Elephant,
                JanggiPiece::Horse
            ]
        );
    }

    #[test]
    fn test_default_placements_chess() {
        let placements = default_placements(Faction::Chess, Side::Bottom, Formation::AnSang, 8);
        assert_eq!(placements.len(), 16);
        assert!(placements.contains(&Placement::new(PieceKind::Chess(ChessPiece::King), 7, 4)));
        assert!(placements.contains(&Placement::new(PieceKind::Chess(ChessPiece::Queen), 7, 3)));
        assert!(placements
            .iter()
            .filter(|p| p.row == 6)
            .all(|p| p.kind == PieceKind::Chess(ChessPiece::Pawn)));
    }

    #[test]
    fn test_default_placements_janggi() {
        let placements = default_placements(Faction::Janggi, Side::Top, Formation::AnMa, 8);
        let back: Vec<PieceKind> = placements.iter().filter(|p| p.row == 0).map(|p| p.kind).collect();
        use JanggiPiece::*;
        assert_eq!(
            back,
            [Chariot, Elephant, Horse, Guard, King, Horse, Elephant, Chariot].map(PieceKind::Janggi)
        );
        assert!(placements.contains(&Placement::new(PieceKind::Janggi(Cannon), 1, 0)));
        assert!(placements.contains(&Placement::new(PieceKind::Janggi(Cannon), 1, 7)));
    }

    #[test]
    fn test_unplaced_pool() {
        let layout = vec![
            Placement::new(PieceKind::Janggi(JanggiPiece::King), 0, 4),
            Placement::new(PieceKind::Janggi(JanggiPiece::Soldier), 1, 0),
        ];
        let pool = unplaced_pool(Faction::Janggi, &layout);
        assert_eq!(pool.len(), 14);
        assert!(!pool.contains(&PieceKind::Janggi(JanggiPiece::King)));
        assert_eq!(
            pool.iter()
                .filter(|k| **k == PieceKind::Janggi(JanggiPiece::Soldier))
                .count(),
            5
        );
    }

    #[test]
    fn test_custom_layout_validation() {
        let full = default_placements(Faction::Janggi, Side::Top, Formation::AnSang, 8);
        assert!(is_valid_custom_layout(&full, Faction::Janggi, Side::Top, 8));
        // 放到对方一侧
        assert!(!is_valid_custom_layout(&full, Faction::Janggi, Side::Bottom, 8));
        // 国际象棋阵营不能自定义
        assert!(!is_valid_custom_layout(&[], Faction::Chess, Side::Bottom, 8));

        let overlap = vec![
            Placement::new(PieceKind::Janggi(JanggiPiece::King), 0, 4),
            Placement::new(PieceKind::Janggi(JanggiPiece::Guard), 0, 4),
        ];
        assert!(!is_valid_custom_layout(&overlap, Faction::Janggi, Side::Top, 8));

        let two_kings = vec![
            Placement::new(PieceKind::Janggi(JanggiPiece::King), 0, 4),
            Placement::new(PieceKind::Janggi(JanggiPiece::King), 0, 3),
        ];
        assert!(!is_valid_custom_layout(&two_kings, Faction::Janggi, Side::Top, 8));

        let foreign = vec![Placement::new(PieceKind::Chess(ChessPiece::Queen), 0, 4)];
        assert!(!is_valid_custom_layout(&foreign, Faction::Janggi, Side::Top, 8));
    }

    #[test]
    fn test_custom_layout_third_row() {
        let soldier = |row| vec![Placement::new(PieceKind::Janggi(JanggiPiece::Soldier), row, 0)];
        assert!(is_valid_custom_layout(&soldier(2), Faction::Janggi, Side::Top, 8));
        assert!(!is_valid_custom_layout(&soldier(3), Faction::Janggi, Side::Top, 8));
        assert!(is_valid_custom_layout(&soldier(5), Faction::Janggi, Side::Bottom, 8));
        assert!(!is_valid_custom_layout(&soldier(4), Faction::Janggi, Side::Bottom, 8));

        // 兵卒全部放在第三行的完整布阵
        let mut full = default_placements(Faction::Janggi, Side::Top, Formation::AnSang, 8);
        for placement in full
            .iter_mut()
            .filter(|p| p.kind == PieceKind::Janggi(JanggiPiece::Soldier))
        {
            placement.row = 2;
        }
        assert!(is_valid_custom_layout(&full, Faction::Janggi, Side::Top, 8));
    }

    #[test]
    fn test_custom_mode_gates_ready() {
        let mut setup = GameSetup::new(60);
        let mode = SetupUpdate::Mode("custom".to_string());
        assert!(!setup.apply_update(Seat::Creator, &mode, Faction::Chess, Side::Bottom, 8));
        assert!(setup.apply_update(Seat::Guest, &mode, Faction::Janggi, Side::Top, 8));
        assert!(!setup.can_ready(Seat::Guest, Faction::Janggi));

        let partial = vec![Placement::new(PieceKind::Janggi(JanggiPiece::King), 0, 4)];
        let update = SetupUpdate::CustomLayout(partial);
        assert!(setup.apply_update(Seat::Guest, &update, Faction::Janggi, Side::Top, 8));
        assert!(!setup.can_ready(Seat::Guest, Faction::Janggi));

        let full = default_placements(Faction::Janggi, Side::Top, Formation::AnMa, 8);
        let update = SetupUpdate::CustomLayout(full.clone());
        assert!(setup.apply_update(Seat::Guest, &update, Faction::Janggi, Side::Top, 8));
        assert!(setup.can_ready(Seat::Guest, Faction::Janggi));

        let mut rng = StdRng::seed_from_u64(7);
        let resolved = setup.resolve_placements(Seat::Guest, Faction::Janggi, Side::Top, 8, &mut rng);
        assert_eq!(resolved, full);
    }

    #[test]
    fn test_invalid_setup_update_dropped() {
        let mut setup = GameSetup::new(60);
        let update = SetupUpdate::Formation("nonsense".to_string());
        assert!(!setup.apply_update(Seat::Creator, &update, Faction::Janggi, Side::Top, 8));
        assert_eq!(setup.seats.creator.formation, None);
    }

    #[test]
    fn test_unset_formation_resolves_randomly() {
        let setup = GameSetup::new(60);
        let mut rng = StdRng::seed_from_u64(42);
        let placements = setup.resolve_placements(Seat::Creator, Faction::Janggi, Side::Top, 8, &mut rng);
        assert_eq!(placements.len(), 16);
        let horses = placements
            .iter()
            .filter(|p| p.kind == PieceKind::Janggi(JanggiPiece::Horse))
            .count();
        assert_eq!(horses, 2);
    }

    #[test]
    fn test_start_resets_match_state() {
        let mut setup = GameSetup::new(30);
        setup.seats.creator.lives = 1;
        setup.captured_by_side.push(
            Side::Top,
            Piece::new(crate::piece::PieceId(1), PieceKind::Chess(ChessPiece::Pawn), Side::Bottom),
        );
        setup.finish(Side::Top, WinReason::Timeout);

        setup.start(Board::empty(8), Side::Top, 30);

        assert!(setup.is_live());
        assert_eq!(setup.turn_side, Side::Top);
        assert_eq!(setup.first_turn, Some(Side::Top));
        assert_eq!(setup.seats.creator.lives, MAX_LIVES);
        assert!(setup.captured_by_side.get(Side::Top).is_empty());
        assert_eq!(setup.winner_reason, None);
    }
}
