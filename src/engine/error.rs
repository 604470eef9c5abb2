// ==========================================
// 蛋品库存系统 - 引擎层错误类型
// ==========================================
// ValidationError: 调用方可修正, 原样返回, 不自动重试
// AllocationError: 库存不足等, 由调用方决定是否稍后重试
// 工具: thiserror 派生宏
// ==========================================

use crate::domain::types::{AgeUnit, EggColor, EggSize};
use chrono::NaiveDate;
use thiserror::Error;

/// 校验错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("总数不一致: 录入总数={declared}, 分项之和={computed}")]
    TotalMismatch { declared: i64, computed: i64 },

    #[error("分项之和溢出: 计数器合计超出 i64 范围")]
    QuantityOverflow,

    #[error("数量为负: {color}/{size}={value}")]
    NegativeQuantity {
        color: EggColor,
        size: EggSize,
        value: i64,
    },

    #[error("重复集蛋记录: cage_id={cage_id}, date={date}")]
    DuplicateRecord { cage_id: i64, date: NaiveDate },

    #[error("日龄格式错误: '{0}'")]
    MalformedAge(String),

    #[error("日龄超出范围: {amount} {unit} 不在 [{min}, {max}] 内")]
    OutOfRange {
        amount: u64,
        unit: AgeUnit,
        min: u32,
        max: u32,
    },

    #[error("修正后数量低于已承诺量: record_id={record_id}, {color}/{size}, 新值={value}, 已承诺={committed}")]
    BelowCommitted {
        record_id: String,
        color: EggColor,
        size: EggSize,
        value: i64,
        committed: i64,
    },

    #[error("日期窗口无效: start={start} > end={end}")]
    InvalidDateWindow { start: NaiveDate, end: NaiveDate },
}

/// 分配错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("库存不足: 需求={requested}, 可用={available}")]
    InsufficientStock { requested: i64, available: i64 },

    #[error("分配数量无效: {0}")]
    InvalidQuantity(i64),

    #[error("超出蛋盘容量: 需求={requested}, 容量={capacity}")]
    ExceedsTrayCapacity { requested: i64, capacity: i64 },
}

pub type ValidationResult<T> = Result<T, ValidationError>;
