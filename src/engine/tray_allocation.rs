// ==========================================
// 蛋品库存系统 - 装盘分配引擎
// ==========================================
// 规则: 贪心首次适配 + 先进先出 (collection_date 升序)
// 红线: 全有或全无; 库存不足时不产生任何承诺
// ==========================================
// 输入: 请求 (颜色, 规格, 数量) + 候选集蛋记录 (含最新承诺量)
// 输出: Allocation (由仓储层原子落库)
// ==========================================

use crate::domain::egg_record::EggCollectionRecord;
use crate::domain::tray::{Allocation, TrayItem};
use crate::domain::types::{EggColor, EggSize};
use crate::engine::error::AllocationError;
use tracing::instrument;

// ==========================================
// TrayAllocator - 装盘分配引擎
// ==========================================
pub struct TrayAllocator {
    // 无状态引擎
}

impl TrayAllocator {
    pub fn new() -> Self {
        Self {}
    }

    /// 计算分配方案
    ///
    /// # 参数
    /// - `egg_color` / `egg_size`: 请求的分级
    /// - `requested_quantity`: 请求数量 (> 0)
    /// - `candidates`: 候选记录; 本方法自行过滤可用量 > 0 的记录并按
    ///   (collection_date, cage_id, record_id) 升序排列
    ///
    /// # 返回
    /// - Ok(Allocation): 组成项之和 == requested_quantity
    /// - Err(InsufficientStock): 候选耗尽仍有缺口
    #[instrument(skip(self, candidates), fields(
        color = %egg_color,
        size = %egg_size,
        requested = requested_quantity,
        candidates_count = candidates.len()
    ))]
    pub fn allocate(
        &self,
        egg_color: EggColor,
        egg_size: EggSize,
        requested_quantity: i64,
        candidates: &[EggCollectionRecord],
    ) -> Result<Allocation, AllocationError> {
        if requested_quantity <= 0 {
            return Err(AllocationError::InvalidQuantity(requested_quantity));
        }

        let mut available: Vec<&EggCollectionRecord> = candidates
            .iter()
            .filter(|r| r.has_available(egg_color, egg_size))
            .collect();
        available.sort_by(|a, b| {
            a.collection_date
                .cmp(&b.collection_date)
                .then(a.cage_id.cmp(&b.cage_id))
                .then(a.record_id.cmp(&b.record_id))
        });

        let mut remaining = requested_quantity;
        let mut items = Vec::new();

        for record in available {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(record.available_quantity(egg_color, egg_size));
            items.push(TrayItem {
                record_id: record.record_id.clone(),
                cage_id: record.cage_id,
                collection_date: record.collection_date,
                quantity_taken: take,
            });
            remaining -= take;
        }

        if remaining > 0 {
            let available_total = requested_quantity - remaining;
            tracing::info!(
                requested = requested_quantity,
                available = available_total,
                "库存不足, 不产生分配"
            );
            return Err(AllocationError::InsufficientStock {
                requested: requested_quantity,
                available: available_total,
            });
        }

        Ok(Allocation {
            egg_color,
            egg_size,
            requested_quantity,
            items,
        })
    }

    /// 候选记录的总可用量
    pub fn total_available(
        &self,
        egg_color: EggColor,
        egg_size: EggSize,
        candidates: &[EggCollectionRecord],
    ) -> i64 {
        candidates
            .iter()
            .map(|r| r.available_quantity(egg_color, egg_size))
            .fold(0i64, i64::saturating_add)
    }
}

impl Default for TrayAllocator {
    fn default() -> Self {
        Self::new()
    }
}
