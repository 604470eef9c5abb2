// ==========================================
// 蛋品库存系统 - 分级校验引擎
// ==========================================
// 职责: 集蛋记录写入前校验 + 颜色/规格分级投影
// 红线: 纯函数, 无副作用; 写入由调用方在校验通过后执行
// ==========================================

use crate::domain::egg_record::{EggCollectionRecord, EggCounters};
use crate::domain::stats::Classification;
use crate::engine::error::{ValidationError, ValidationResult};
use tracing::instrument;

// ==========================================
// ClassificationEngine - 分级校验引擎
// ==========================================
pub struct ClassificationEngine {
    // 无状态引擎
}

impl ClassificationEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 校验集蛋记录
    ///
    /// 顺序:
    /// 1) 任一计数器 < 0 → NegativeQuantity
    /// 2) 分项之和超出 i64 → QuantityOverflow
    /// 3) 录入总数 ≠ 分项之和 → TotalMismatch
    /// 4) 同笼同日已有其他记录 → DuplicateRecord
    ///
    /// # 参数
    /// - `record`: 待写入记录
    /// - `existing`: 存储中同 (cage_id, collection_date) 的记录;
    ///   record_id 相同视为修正自身, 不算重复
    #[instrument(skip(self, record, existing), fields(
        cage_id = record.cage_id,
        collection_date = %record.collection_date
    ))]
    pub fn validate_record(
        &self,
        record: &EggCollectionRecord,
        existing: Option<&EggCollectionRecord>,
    ) -> ValidationResult<()> {
        Self::check_counters(&record.counters, record.total_quantity)?;

        if let Some(other) = existing {
            if other.record_id != record.record_id {
                return Err(ValidationError::DuplicateRecord {
                    cage_id: record.cage_id,
                    date: record.collection_date,
                });
            }
        }

        Ok(())
    }

    /// 修正校验: 在 validate_record 基础上, 新计数器不得低于已承诺量
    ///
    /// `current.committed` 须为最新承诺量
    pub fn validate_correction(
        &self,
        current: &EggCollectionRecord,
        counters: &EggCounters,
        declared_total: i64,
    ) -> ValidationResult<()> {
        Self::check_counters(counters, declared_total)?;

        for (color, size, value) in counters.iter() {
            let committed = current.committed.get(color, size);
            if value < committed {
                return Err(ValidationError::BelowCommitted {
                    record_id: current.record_id.clone(),
                    color,
                    size,
                    value,
                    committed,
                });
            }
        }

        Ok(())
    }

    /// 分级投影: 8 个计数器 → 按颜色 / 按规格
    pub fn classify(&self, record: &EggCollectionRecord) -> Classification {
        let mut classification = Classification::default();
        for (color, size, qty) in record.counters.iter() {
            classification.by_type.add(color, qty);
            classification.by_size.add(size, qty);
        }
        classification
    }

    fn check_counters(counters: &EggCounters, declared_total: i64) -> ValidationResult<()> {
        if let Some((color, size, value)) = counters.iter().find(|(_, _, v)| *v < 0) {
            return Err(ValidationError::NegativeQuantity { color, size, value });
        }

        let computed = counters
            .checked_sum()
            .ok_or(ValidationError::QuantityOverflow)?;
        if computed != declared_total {
            return Err(ValidationError::TotalMismatch {
                declared: declared_total,
                computed,
            });
        }

        Ok(())
    }
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::new()
    }
}
