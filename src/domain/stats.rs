// ==========================================
// 蛋品库存系统 - 分级与统计视图
// ==========================================
// 只读派生视图, 不落库; 每次由集蛋记录按需重算
// ==========================================

use crate::domain::types::{EggColor, EggSize, Period};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// DateWindow - 闭区间日期窗口 [start, end]
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// start > end 时返回 None
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// 单日窗口
    pub fn single_day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// 窗口覆盖的自然日数 (含首尾)
    pub fn length_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

// ==========================================
// 按颜色 / 按规格 汇总
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeBreakdown {
    pub brown: i64,
    pub white: i64,
}

impl TypeBreakdown {
    pub fn add(&mut self, color: EggColor, qty: i64) {
        match color {
            EggColor::Brown => self.brown = self.brown.saturating_add(qty),
            EggColor::White => self.white = self.white.saturating_add(qty),
        }
    }

    pub fn total(&self) -> i64 {
        self.brown + self.white
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeBreakdown {
    pub small: i64,
    pub medium: i64,
    pub large: i64,
    pub jumbo: i64,
}

impl SizeBreakdown {
    pub fn add(&mut self, size: EggSize, qty: i64) {
        match size {
            EggSize::Small => self.small = self.small.saturating_add(qty),
            EggSize::Medium => self.medium = self.medium.saturating_add(qty),
            EggSize::Large => self.large = self.large.saturating_add(qty),
            EggSize::Jumbo => self.jumbo = self.jumbo.saturating_add(qty),
        }
    }

    pub fn total(&self) -> i64 {
        self.small + self.medium + self.large + self.jumbo
    }
}

/// 单条记录的分级投影
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub by_type: TypeBreakdown,
    pub by_size: SizeBreakdown,
}

// ==========================================
// CageProductionStat - 单笼产量统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CageProductionStat {
    pub cage_id: i64,
    pub total: i64,
    pub days_with_data: usize,
    pub average_per_day: f64,
    pub by_type: TypeBreakdown,
    pub by_size: SizeBreakdown,
}

impl CageProductionStat {
    pub fn empty(cage_id: i64) -> Self {
        Self {
            cage_id,
            total: 0,
            days_with_data: 0,
            average_per_day: 0.0,
            by_type: TypeBreakdown::default(),
            by_size: SizeBreakdown::default(),
        }
    }
}

// ==========================================
// ProductionStats - 窗口产量统计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionStats {
    pub window: DateWindow,
    pub total_in_window: i64,
    pub days_with_data: usize,
    pub average_per_day: f64, // total / 有数据的自然日数
    pub by_type: TypeBreakdown,
    pub by_size: SizeBreakdown,
    pub per_cage: Vec<CageProductionStat>, // 按 total 降序, 并列时 cage_id 升序
    pub best_cage: Option<i64>,
}

// ==========================================
// PeriodBucket - 日/周/月 汇总桶
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodBucket {
    pub period: Period,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub record_count: usize,
    pub total: i64,
    pub by_type: TypeBreakdown,
    pub by_size: SizeBreakdown,
}
