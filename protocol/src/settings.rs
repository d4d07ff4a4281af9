//! 房间设置
//!
//! 客户端提交的设置修改以字符串形式携带取值，由服务端逐条解析；
//! 无法识别的取值只丢弃该条修改，不影响同一批中的其他修改。

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{BATTLE_BOARD_SIZE, GOMOKU_BOARD_SIZE};
use crate::setup::{Placement, Seat};

/// 阵营分配规则
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomRule {
    /// 自由选择：双方各自选择阵营
    Free,
    /// 随机分配：对手加入时随机抽取双方阵营
    Random,
    /// 房主选择：只有房主可以修改双方阵营
    Host,
}

impl FromStr for RoomRule {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "free" | "FREE" | "auto" | "AUTO" | "자율선택" => Ok(RoomRule::Free),
            "random" | "RANDOM" | "랜덤배정" => Ok(RoomRule::Random),
            "host" | "HOST" | "방장선택" => Ok(RoomRule::Host),
            _ => Err(()),
        }
    }
}

impl RoomRule {
    /// 创建房间时的宽松解析：无法识别时按自由选择处理
    pub fn parse_or_default(s: Option<&str>) -> Self {
        s.and_then(|s| s.parse().ok()).unwrap_or(RoomRule::Free)
    }
}

/// 棋盘地图
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoardMap {
    /// 国际象棋棋盘
    Chess,
    /// 将棋棋盘
    Janggi,
    /// 五子棋棋盘（15x15）
    Gomoku,
}

impl BoardMap {
    /// 棋盘边长
    pub fn size(&self) -> u8 {
        match self {
            BoardMap::Chess | BoardMap::Janggi => BATTLE_BOARD_SIZE,
            BoardMap::Gomoku => GOMOKU_BOARD_SIZE,
        }
    }

    pub fn is_gomoku(&self) -> bool {
        matches!(self, BoardMap::Gomoku)
    }
}

impl FromStr for BoardMap {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "chessMap" | "chess" | "체스판" => Ok(BoardMap::Chess),
            "janggiMap" | "janggi" | "장기판" => Ok(BoardMap::Janggi),
            "gomokuMap" | "gomoku" | "omok" | "바둑판" => Ok(BoardMap::Gomoku),
            _ => Err(()),
        }
    }
}

/// 棋子颜色（七色调色板）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceColor {
    White,
    Black,
    Red,
    Blue,
    Green,
    Gold,
    Purple,
}

impl FromStr for PieceColor {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(PieceColor::White),
            "black" => Ok(PieceColor::Black),
            "red" => Ok(PieceColor::Red),
            "blue" => Ok(PieceColor::Blue),
            "green" => Ok(PieceColor::Green),
            "gold" => Ok(PieceColor::Gold),
            "purple" => Ok(PieceColor::Purple),
            _ => Err(()),
        }
    }
}

/// 布阵相关的修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetupUpdate {
    /// "formation" 或 "custom"
    Mode(String),
    /// 四种布阵之一
    Formation(String),
    /// 自定义布阵，整体替换
    CustomLayout(Vec<Placement>),
}

/// 单条设置修改
///
/// `seat` 为 `None` 时作用于发送者自己的座位；房主选择规则下房主可以指定对方座位。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingUpdate {
    Rule(String),
    Map(String),
    Faction {
        seat: Option<Seat>,
        value: String,
    },
    Color {
        seat: Option<Seat>,
        value: String,
    },
    TurnSeconds(i64),
    /// 只能修改自己的准备状态
    Ready(bool),
    Setup(SetupUpdate),
}

/// 创建房间请求
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRoomRequest {
    pub title: Option<String>,
    pub rule: Option<String>,
    pub map: Option<String>,
    pub creator_faction: Option<String>,
    pub guest_faction: Option<String>,
    pub creator_color: Option<String>,
    pub guest_color: Option<String>,
    pub turn_seconds: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_parse() {
        assert_eq!("auto".parse::<RoomRule>(), Ok(RoomRule::Free));
        assert_eq!("RANDOM".parse::<RoomRule>(), Ok(RoomRule::Random));
        assert_eq!("방장선택".parse::<RoomRule>(), Ok(RoomRule::Host));
        assert!("whatever".parse::<RoomRule>().is_err());
        assert_eq!(RoomRule::parse_or_default(Some("whatever")), RoomRule::Free);
        assert_eq!(RoomRule::parse_or_default(None), RoomRule::Free);
    }

    #[test]
    fn test_map_parse_and_size() {
        assert_eq!("체스판".parse::<BoardMap>(), Ok(BoardMap::Chess));
        assert_eq!("janggiMap".parse::<BoardMap>(), Ok(BoardMap::Janggi));
        let gomoku: BoardMap = "바둑판".parse().unwrap();
        assert_eq!(gomoku.size(), 15);
        assert_eq!(BoardMap::Janggi.size(), 8);
        assert!("go".parse::<BoardMap>().is_err());
    }

    #[test]
    fn test_color_parse() {
        assert_eq!("Gold".parse::<PieceColor>(), Ok(PieceColor::Gold));
        assert_eq!("PURPLE".parse::<PieceColor>(), Ok(PieceColor::Purple));
        assert!("pink".parse::<PieceColor>().is_err());
    }
}
