// ==========================================
// 蛋品库存系统 - 集蛋记录领域模型
// ==========================================
// 一笼一日一条记录: (cage_id, collection_date) 唯一
// 数量: 颜色(2) x 规格(4) = 8 个非负计数器
// ==========================================

use crate::domain::types::{EggColor, EggSize};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ==========================================
// EggCounters - 颜色 x 规格 计数器
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EggCounters {
    pub brown_small: i64,
    pub brown_medium: i64,
    pub brown_large: i64,
    pub brown_jumbo: i64,
    pub white_small: i64,
    pub white_medium: i64,
    pub white_large: i64,
    pub white_jumbo: i64,
}

impl EggCounters {
    pub fn get(&self, color: EggColor, size: EggSize) -> i64 {
        match (color, size) {
            (EggColor::Brown, EggSize::Small) => self.brown_small,
            (EggColor::Brown, EggSize::Medium) => self.brown_medium,
            (EggColor::Brown, EggSize::Large) => self.brown_large,
            (EggColor::Brown, EggSize::Jumbo) => self.brown_jumbo,
            (EggColor::White, EggSize::Small) => self.white_small,
            (EggColor::White, EggSize::Medium) => self.white_medium,
            (EggColor::White, EggSize::Large) => self.white_large,
            (EggColor::White, EggSize::Jumbo) => self.white_jumbo,
        }
    }

    pub fn set(&mut self, color: EggColor, size: EggSize, value: i64) {
        let slot = match (color, size) {
            (EggColor::Brown, EggSize::Small) => &mut self.brown_small,
            (EggColor::Brown, EggSize::Medium) => &mut self.brown_medium,
            (EggColor::Brown, EggSize::Large) => &mut self.brown_large,
            (EggColor::Brown, EggSize::Jumbo) => &mut self.brown_jumbo,
            (EggColor::White, EggSize::Small) => &mut self.white_small,
            (EggColor::White, EggSize::Medium) => &mut self.white_medium,
            (EggColor::White, EggSize::Large) => &mut self.white_large,
            (EggColor::White, EggSize::Jumbo) => &mut self.white_jumbo,
        };
        *slot = value;
    }

    /// 构造仅含单个桶的计数器 (测试与导入常用)
    pub fn single(color: EggColor, size: EggSize, value: i64) -> Self {
        let mut counters = Self::default();
        counters.set(color, size, value);
        counters
    }

    /// 按 颜色→规格 固定顺序遍历 8 个桶
    pub fn iter(&self) -> impl Iterator<Item = (EggColor, EggSize, i64)> + '_ {
        EggColor::ALL.into_iter().flat_map(move |color| {
            EggSize::ALL
                .into_iter()
                .map(move |size| (color, size, self.get(color, size)))
        })
    }

    /// 8 个桶之和, 溢出时返回 None
    pub fn checked_sum(&self) -> Option<i64> {
        self.iter().try_fold(0i64, |acc, (_, _, v)| acc.checked_add(v))
    }

    /// 8 个桶之和 (饱和加法, 不会 panic)
    pub fn sum(&self) -> i64 {
        self.iter().fold(0i64, |acc, (_, _, v)| acc.saturating_add(v))
    }
}

// ==========================================
// EggCollectionRecord - 集蛋记录
// ==========================================
// 红线: total_quantity 为录入值, 写入前必须与 8 个计数器之和一致,
//       不允许静默重算
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EggCollectionRecord {
    // ===== 主键 =====
    pub record_id: String,
    pub cage_id: i64,
    pub collection_date: NaiveDate,

    // ===== 数量 =====
    pub counters: EggCounters,
    pub total_quantity: i64,

    // ===== 派生: 已承诺给蛋盘的数量 (不落 egg_collection 表) =====
    #[serde(default)]
    pub committed: EggCounters,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EggCollectionRecord {
    /// 新建集蛋记录 (总数取计数器之和)
    pub fn new(record_id: String, cage_id: i64, collection_date: NaiveDate, counters: EggCounters) -> Self {
        let now = Utc::now();
        Self {
            record_id,
            cage_id,
            collection_date,
            total_quantity: counters.sum(),
            counters,
            committed: EggCounters::default(),
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// 8 个计数器之和
    pub fn computed_total(&self) -> i64 {
        self.counters.sum()
    }

    /// 可分配数量 = 计数器 - 已承诺, 下限为 0
    pub fn available_quantity(&self, color: EggColor, size: EggSize) -> i64 {
        (self.counters.get(color, size) - self.committed.get(color, size)).max(0)
    }

    pub fn has_available(&self, color: EggColor, size: EggSize) -> bool {
        self.available_quantity(color, size) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_sum_and_get() {
        let mut c = EggCounters::default();
        c.set(EggColor::Brown, EggSize::Medium, 10);
        c.set(EggColor::White, EggSize::Jumbo, 3);
        assert_eq!(c.sum(), 13);
        assert_eq!(c.get(EggColor::White, EggSize::Jumbo), 3);
        assert_eq!(c.iter().count(), 8);
    }

    #[test]
    fn test_available_quantity_never_negative() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut r = EggCollectionRecord::new(
            "R1".to_string(),
            1,
            date,
            EggCounters::single(EggColor::Brown, EggSize::Large, 5),
        );
        r.committed.set(EggColor::Brown, EggSize::Large, 3);
        assert_eq!(r.available_quantity(EggColor::Brown, EggSize::Large), 2);

        r.committed.set(EggColor::Brown, EggSize::Large, 9);
        assert_eq!(r.available_quantity(EggColor::Brown, EggSize::Large), 0);
        assert!(!r.has_available(EggColor::Brown, EggSize::Large));
    }
}
