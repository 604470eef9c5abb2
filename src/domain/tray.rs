// ==========================================
// 蛋品库存系统 - 蛋盘领域模型
// ==========================================
// 蛋盘 = 可销售的、固定组成的同色同规格鸡蛋集合
// 红线: 任一 (记录, 颜色, 规格) 在所有未释放蛋盘中的承诺量之和
//       不得超过该记录对应计数器
// ==========================================

use crate::domain::types::{EggColor, EggSize, TrayStatus};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// TrayItem - 蛋盘组成项 (记录引用 + 取用数量)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrayItem {
    pub record_id: String,
    pub cage_id: i64,
    pub collection_date: NaiveDate,
    pub quantity_taken: i64,
}

// ==========================================
// Allocation - 分配方案 (尚未落库)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub egg_color: EggColor,
    pub egg_size: EggSize,
    pub requested_quantity: i64,
    pub items: Vec<TrayItem>, // 按 collection_date 升序 (先进先出)
}

impl Allocation {
    pub fn allocated_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity_taken).sum()
    }
}

// ==========================================
// Tray - 蛋盘
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tray {
    pub tray_id: String,
    pub egg_color: EggColor,
    pub egg_size: EggSize,
    pub committed_quantity: i64,
    pub status: TrayStatus,
    pub creation_date: NaiveDate,
    pub sale_id: Option<String>,
    pub items: Vec<TrayItem>,
    pub created_at: DateTime<Utc>,
    pub released_at: Option<DateTime<Utc>>,
}

impl Tray {
    /// 由分配方案构造新蛋盘 (状态 AVAILABLE)
    pub fn from_allocation(tray_id: String, allocation: &Allocation, creation_date: NaiveDate) -> Self {
        Self {
            tray_id,
            egg_color: allocation.egg_color,
            egg_size: allocation.egg_size,
            committed_quantity: allocation.allocated_quantity(),
            status: TrayStatus::Available,
            creation_date,
            sale_id: None,
            items: allocation.items.clone(),
            created_at: Utc::now(),
            released_at: None,
        }
    }

    /// 组成项之和与 committed_quantity 一致
    pub fn is_consistent(&self) -> bool {
        self.items.iter().map(|i| i.quantity_taken).sum::<i64>() == self.committed_quantity
    }

    pub fn is_released(&self) -> bool {
        self.status == TrayStatus::Released
    }
}
