// ==========================================
// 蛋品库存系统 - 领域类型定义
// ==========================================
// 覆盖: 蛋壳颜色 / 蛋重规格 / 蛋盘状态 / 统计周期 / 日龄单位
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 蛋壳颜色 (Egg Color)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EggColor {
    Brown, // 褐壳
    White, // 白壳
}

impl EggColor {
    pub const ALL: [EggColor; 2] = [EggColor::Brown, EggColor::White];

    pub fn as_str(&self) -> &'static str {
        match self {
            EggColor::Brown => "BROWN",
            EggColor::White => "WHITE",
        }
    }
}

impl fmt::Display for EggColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EggColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BROWN" => Ok(EggColor::Brown),
            "WHITE" => Ok(EggColor::White),
            other => Err(format!("未知蛋壳颜色: {}", other)),
        }
    }
}

// ==========================================
// 蛋重规格 (Egg Size)
// ==========================================
// 顺序即规格由小到大
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EggSize {
    Small,
    Medium,
    Large,
    Jumbo,
}

impl EggSize {
    pub const ALL: [EggSize; 4] = [EggSize::Small, EggSize::Medium, EggSize::Large, EggSize::Jumbo];

    pub fn as_str(&self) -> &'static str {
        match self {
            EggSize::Small => "SMALL",
            EggSize::Medium => "MEDIUM",
            EggSize::Large => "LARGE",
            EggSize::Jumbo => "JUMBO",
        }
    }
}

impl fmt::Display for EggSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EggSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SMALL" => Ok(EggSize::Small),
            "MEDIUM" => Ok(EggSize::Medium),
            "LARGE" => Ok(EggSize::Large),
            "JUMBO" => Ok(EggSize::Jumbo),
            other => Err(format!("未知蛋重规格: {}", other)),
        }
    }
}

// ==========================================
// 蛋盘状态 (Tray Status)
// ==========================================
// 状态机:
//   AVAILABLE -> RESERVED / SOLD / RELEASED
//   RESERVED  -> SOLD / AVAILABLE (退单)
//   SOLD      -> AVAILABLE (退货)
//   RELEASED  终态, 承诺量已归还
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrayStatus {
    Available,
    Reserved,
    Sold,
    Released,
}

impl TrayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrayStatus::Available => "AVAILABLE",
            TrayStatus::Reserved => "RESERVED",
            TrayStatus::Sold => "SOLD",
            TrayStatus::Released => "RELEASED",
        }
    }

    /// 是否仍占用鸡蛋承诺量
    pub fn holds_commitment(&self) -> bool {
        !matches!(self, TrayStatus::Released)
    }

    /// 状态转换是否合法
    pub fn can_transition_to(&self, to: TrayStatus) -> bool {
        use TrayStatus::*;
        matches!(
            (self, to),
            (Available, Reserved)
                | (Available, Sold)
                | (Available, Released)
                | (Reserved, Sold)
                | (Reserved, Available)
                | (Sold, Available)
        )
    }
}

impl fmt::Display for TrayStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TrayStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AVAILABLE" => Ok(TrayStatus::Available),
            "RESERVED" => Ok(TrayStatus::Reserved),
            "SOLD" => Ok(TrayStatus::Sold),
            "RELEASED" => Ok(TrayStatus::Released),
            other => Err(format!("未知蛋盘状态: {}", other)),
        }
    }
}

// ==========================================
// 统计周期 (Period)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Period {
    Daily,   // 自然日
    Weekly,  // ISO 周 (周一开始)
    Monthly, // 自然月
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Daily => write!(f, "DAILY"),
            Period::Weekly => write!(f, "WEEKLY"),
            Period::Monthly => write!(f, "MONTHLY"),
        }
    }
}

// ==========================================
// 日龄单位 (Age Unit)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgeUnit {
    Day,
    Week,
    Month,
    Year,
}

impl AgeUnit {
    /// 各单位允许的闭区间 [min, max]
    pub fn bounds(&self) -> (u32, u32) {
        match self {
            AgeUnit::Day => (1, 365),
            AgeUnit::Week => (1, 52),
            AgeUnit::Month => (1, 60),
            AgeUnit::Year => (1, 5),
        }
    }

    /// 从西语单位词解析 (大小写不敏感, 单复数均可)
    pub fn from_word(word: &str) -> Option<AgeUnit> {
        match word.to_lowercase().as_str() {
            "día" | "días" => Some(AgeUnit::Day),
            "semana" | "semanas" => Some(AgeUnit::Week),
            "mes" | "meses" => Some(AgeUnit::Month),
            "año" | "años" => Some(AgeUnit::Year),
            _ => None,
        }
    }
}

impl fmt::Display for AgeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgeUnit::Day => write!(f, "DAY"),
            AgeUnit::Week => write!(f, "WEEK"),
            AgeUnit::Month => write!(f, "MONTH"),
            AgeUnit::Year => write!(f, "YEAR"),
        }
    }
}
