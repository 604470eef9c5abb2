// ==========================================
// 蛋品库存系统 - 库存 API
// ==========================================
// 职责: 组合仓储与引擎, 对外提供集蛋录入、统计、装盘、销售状态操作
// 红线: 所有写操作记录 ActionLog
// 并发: 装盘承诺冲突 (StockConflict) 时基于最新数据重新规划, 有界重试
// ==========================================

use std::sync::Arc;

use chrono::{Duration, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::age::ParsedAge;
use crate::domain::egg_record::{EggCollectionRecord, EggCounters};
use crate::domain::stats::{
    CageProductionStat, Classification, DateWindow, PeriodBucket, ProductionStats,
};
use crate::domain::tray::Tray;
use crate::domain::types::{EggColor, EggSize, Period, TrayStatus};
use crate::engine::{
    parse_and_validate_age, AggregationEngine, AllocationError, ClassificationEngine,
    InventoryRepositories, TrayAllocator, ValidationError,
};
use crate::repository::error::RepositoryError;

// ==========================================
// 请求结构
// ==========================================

/// 新集蛋记录录入
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCollectionRecord {
    pub cage_id: i64,
    pub collection_date: NaiveDate,
    pub counters: EggCounters,
    /// 录入总数, 必须与分项之和一致
    pub total_quantity: i64,
    pub notes: Option<String>,
}

// ==========================================
// EggInventoryApi - 库存 API
// ==========================================

/// 库存API
///
/// 职责：
/// 1. 集蛋记录录入/修正/删除 (含分级校验)
/// 2. 产量统计 (窗口汇总、单笼统计、日周月汇总)
/// 3. 装盘分配与释放 (先进先出, 全有或全无)
/// 4. 蛋盘销售状态流转
/// 5. ActionLog记录
pub struct EggInventoryApi {
    repos: InventoryRepositories,
    config: Arc<ConfigManager>,
    classification: ClassificationEngine,
    aggregation: AggregationEngine,
    allocator: TrayAllocator,
}

impl EggInventoryApi {
    /// 创建新的EggInventoryApi实例
    pub fn new(repos: InventoryRepositories, config: Arc<ConfigManager>) -> Self {
        Self {
            repos,
            config,
            classification: ClassificationEngine::new(),
            aggregation: AggregationEngine::new(),
            allocator: TrayAllocator::new(),
        }
    }

    // ==========================================
    // 集蛋记录
    // ==========================================

    /// 录入集蛋记录
    ///
    /// # 返回
    /// - Ok(EggCollectionRecord): 已落库记录 (record_id 为新分配的 UUID)
    /// - Err(Validation): NegativeQuantity / TotalMismatch / DuplicateRecord
    pub fn record_collection(
        &self,
        input: NewCollectionRecord,
        operator: &str,
    ) -> ApiResult<EggCollectionRecord> {
        if input.cage_id <= 0 {
            return Err(ApiError::InvalidInput(format!(
                "cage_id 必须为正: {}",
                input.cage_id
            )));
        }

        let mut record = EggCollectionRecord::new(
            uuid::Uuid::new_v4().to_string(),
            input.cage_id,
            input.collection_date,
            input.counters,
        );
        record.total_quantity = input.total_quantity;
        record.notes = input.notes;

        let existing = self
            .repos
            .record_repo
            .find_by_cage_and_date(record.cage_id, record.collection_date)?;
        self.classification.validate_record(&record, existing.as_ref())?;

        // 并发录入同笼同日: 以唯一约束兜底
        match self.repos.record_repo.insert(&record) {
            Ok(()) => {}
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                return Err(ValidationError::DuplicateRecord {
                    cage_id: record.cage_id,
                    date: record.collection_date,
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        self.log_action(
            ActionType::RecordCollection,
            operator,
            &record.record_id,
            serde_json::json!({
                "cage_id": record.cage_id,
                "collection_date": record.collection_date.to_string(),
                "counters": record.counters,
                "total_quantity": record.total_quantity,
            }),
            format!(
                "录入集蛋: 笼{} {} 共{}枚",
                record.cage_id, record.collection_date, record.total_quantity
            ),
        )?;

        tracing::info!(
            record_id = %record.record_id,
            cage_id = record.cage_id,
            total = record.total_quantity,
            "集蛋记录已录入"
        );
        Ok(record)
    }

    /// 修正集蛋记录的计数器与总数
    ///
    /// 新计数器不得低于已承诺给蛋盘的数量 (BelowCommitted)
    pub fn correct_collection(
        &self,
        record_id: &str,
        counters: EggCounters,
        declared_total: i64,
        operator: &str,
    ) -> ApiResult<EggCollectionRecord> {
        let current = self.get_collection(record_id)?;
        self.classification
            .validate_correction(&current, &counters, declared_total)?;

        let mut updated = current.clone();
        updated.counters = counters;
        updated.total_quantity = declared_total;
        updated.updated_at = Utc::now();

        self.repos.record_repo.update(&updated)?;

        self.log_action(
            ActionType::CorrectCollection,
            operator,
            record_id,
            serde_json::json!({
                "before": current.counters,
                "after": updated.counters,
                "total_before": current.total_quantity,
                "total_after": updated.total_quantity,
            }),
            format!(
                "修正集蛋: 总数 {} -> {}",
                current.total_quantity, updated.total_quantity
            ),
        )?;

        // 重新读取以带出最新承诺量
        self.get_collection(record_id)
    }

    /// 删除集蛋记录 (仍被未释放蛋盘引用时拒绝)
    pub fn delete_collection(&self, record_id: &str, operator: &str) -> ApiResult<()> {
        let record = self.get_collection(record_id)?;
        self.repos.record_repo.delete(record_id)?;

        self.log_action(
            ActionType::DeleteCollection,
            operator,
            record_id,
            serde_json::json!({
                "cage_id": record.cage_id,
                "collection_date": record.collection_date.to_string(),
                "total_quantity": record.total_quantity,
            }),
            format!("删除集蛋: 笼{} {}", record.cage_id, record.collection_date),
        )?;
        Ok(())
    }

    /// 查询单条集蛋记录
    pub fn get_collection(&self, record_id: &str) -> ApiResult<EggCollectionRecord> {
        if record_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("记录ID不能为空".to_string()));
        }
        self.repos
            .record_repo
            .find_by_id(record_id)?
            .ok_or_else(|| ApiError::NotFound(format!("EggCollectionRecord(id={})不存在", record_id)))
    }

    /// 单条记录的分级投影
    pub fn classify_record(&self, record_id: &str) -> ApiResult<Classification> {
        let record = self.get_collection(record_id)?;
        Ok(self.classification.classify(&record))
    }

    /// 单笼窗口内记录
    pub fn load_records_for_cage(
        &self,
        cage_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ApiResult<Vec<EggCollectionRecord>> {
        let window = Self::window(start, end)?;
        Ok(self.repos.record_repo.find_by_cage_and_window(cage_id, window)?)
    }

    // ==========================================
    // 产量统计
    // ==========================================

    /// 全部笼窗口汇总
    pub fn production_stats(&self, start: NaiveDate, end: NaiveDate) -> ApiResult<ProductionStats> {
        let window = Self::window(start, end)?;
        let records = self.repos.record_repo.find_by_window(window)?;
        Ok(self.aggregation.aggregate(&records, window))
    }

    /// 单笼窗口统计 (无数据时为全 0)
    pub fn cage_statistics(
        &self,
        cage_id: i64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> ApiResult<CageProductionStat> {
        let window = Self::window(start, end)?;
        let records = self.repos.record_repo.find_by_cage_and_window(cage_id, window)?;
        Ok(self.aggregation.cage_stat(cage_id, &records, window))
    }

    /// 日 / 周 / 月 滚动汇总
    pub fn rollup(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        period: Period,
    ) -> ApiResult<Vec<PeriodBucket>> {
        let window = Self::window(start, end)?;
        let records = self.repos.record_repo.find_by_window(window)?;
        Ok(self.aggregation.rollup(&records, window, period))
    }

    /// 近期统计: [today - (N-1), today], N = stats_default_window_days
    pub fn recent_stats(&self, today: NaiveDate) -> ApiResult<ProductionStats> {
        let days = self
            .config
            .get_stats_default_window_days()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        let start = today
            .checked_sub_signed(Duration::days(days - 1))
            .ok_or(ValidationError::InvalidDateWindow { start: today, end: today })?;
        self.production_stats(start, today)
    }

    // ==========================================
    // 装盘分配
    // ==========================================

    /// 指定分级的总可用量
    pub fn available_stock(&self, color: EggColor, size: EggSize) -> ApiResult<i64> {
        let candidates = self.repos.record_repo.find_available(color, size)?;
        Ok(self.allocator.total_available(color, size, &candidates))
    }

    /// 分配并创建蛋盘
    ///
    /// # 流程
    /// 1. 校验数量 (> 0 且 ≤ tray_capacity)
    /// 2. 读取可用记录, 纯函数规划 (先进先出)
    /// 3. 原子落库; 若复核冲突则基于最新数据重新规划
    ///
    /// # 返回
    /// - Ok(Tray): 状态 AVAILABLE
    /// - Err(Allocation(InsufficientStock)): 库存不足, 无任何承诺
    /// - Err(AllocationConflict): 冲突重试耗尽
    pub fn allocate_tray(
        &self,
        color: EggColor,
        size: EggSize,
        quantity: i64,
        operator: &str,
    ) -> ApiResult<Tray> {
        if quantity <= 0 {
            return Err(AllocationError::InvalidQuantity(quantity).into());
        }

        let capacity = self
            .config
            .get_tray_capacity()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        if quantity > capacity {
            return Err(AllocationError::ExceedsTrayCapacity {
                requested: quantity,
                capacity,
            }
            .into());
        }

        let max_retries = self
            .config
            .get_allocation_max_retries()
            .map_err(|e| ApiError::InternalError(e.to_string()))?;

        let mut last_conflict = String::new();
        for attempt in 0..=max_retries {
            let candidates = self.repos.record_repo.find_available(color, size)?;
            let allocation = self.allocator.allocate(color, size, quantity, &candidates)?;

            let tray_id = uuid::Uuid::new_v4().to_string();
            let creation_date = Local::now().date_naive();

            match self
                .repos
                .tray_repo
                .commit_allocation(&tray_id, &allocation, creation_date)
            {
                Ok(tray) => {
                    self.log_action(
                        ActionType::AllocateTray,
                        operator,
                        &tray.tray_id,
                        serde_json::json!({
                            "egg_color": color,
                            "egg_size": size,
                            "quantity": quantity,
                            "items": tray.items,
                            "attempt": attempt + 1,
                        }),
                        format!(
                            "分配蛋盘: {}/{} {}枚, 来自{}条记录",
                            color,
                            size,
                            quantity,
                            tray.items.len()
                        ),
                    )?;
                    return Ok(tray);
                }
                Err(conflict @ RepositoryError::StockConflict { .. }) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries,
                        error = %conflict,
                        "蛋盘承诺冲突, 重新规划"
                    );
                    last_conflict = conflict.to_string();
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(ApiError::AllocationConflict {
            attempts: max_retries.saturating_add(1),
            last_conflict,
        })
    }

    /// 释放蛋盘 (幂等)
    ///
    /// # 返回
    /// - Ok(true): 本次完成释放
    /// - Ok(false): 已释放, 无变化
    pub fn release_tray(&self, tray_id: &str, operator: &str) -> ApiResult<bool> {
        if tray_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("蛋盘ID不能为空".to_string()));
        }

        let released = self.repos.tray_repo.release_tray(tray_id)?;
        if released {
            self.log_action(
                ActionType::ReleaseTray,
                operator,
                tray_id,
                serde_json::json!({ "tray_id": tray_id }),
                "释放蛋盘, 归还承诺量".to_string(),
            )?;
        } else {
            tracing::debug!(tray_id, "蛋盘已释放, 忽略重复释放");
        }
        Ok(released)
    }

    // ==========================================
    // 销售状态
    // ==========================================

    /// 关联销售单并预留
    pub fn reserve_tray(&self, tray_id: &str, sale_id: &str, operator: &str) -> ApiResult<Tray> {
        if sale_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("销售单ID不能为空".to_string()));
        }
        self.transition_tray(tray_id, TrayStatus::Reserved, Some(sale_id), ActionType::ReserveTray, operator)
    }

    /// 售出
    pub fn sell_tray(&self, tray_id: &str, sale_id: &str, operator: &str) -> ApiResult<Tray> {
        if sale_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("销售单ID不能为空".to_string()));
        }
        self.transition_tray(tray_id, TrayStatus::Sold, Some(sale_id), ActionType::SellTray, operator)
    }

    /// 退单/退货: 回到 AVAILABLE, 承诺关系保留
    pub fn return_tray(&self, tray_id: &str, operator: &str) -> ApiResult<Tray> {
        self.transition_tray(tray_id, TrayStatus::Available, None, ActionType::ReturnTray, operator)
    }

    pub fn get_tray(&self, tray_id: &str) -> ApiResult<Tray> {
        self.repos
            .tray_repo
            .find_by_id(tray_id)?
            .ok_or_else(|| ApiError::NotFound(format!("Tray(id={})不存在", tray_id)))
    }

    pub fn list_trays(&self, status: TrayStatus) -> ApiResult<Vec<Tray>> {
        Ok(self.repos.tray_repo.find_by_status(status)?)
    }

    // ==========================================
    // 日龄 / 审计
    // ==========================================

    /// 解析并校验禽只日龄 ("6 meses")
    pub fn validate_age(&self, text: &str) -> ApiResult<ParsedAge> {
        Ok(parse_and_validate_age(text)?)
    }

    /// 某目标的操作历史
    pub fn action_history(&self, target_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.repos.action_log_repo.find_by_target(target_id)?)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn window(start: NaiveDate, end: NaiveDate) -> ApiResult<DateWindow> {
        DateWindow::new(start, end)
            .ok_or_else(|| ValidationError::InvalidDateWindow { start, end }.into())
    }

    fn transition_tray(
        &self,
        tray_id: &str,
        to: TrayStatus,
        sale_id: Option<&str>,
        action: ActionType,
        operator: &str,
    ) -> ApiResult<Tray> {
        if tray_id.trim().is_empty() {
            return Err(ApiError::InvalidInput("蛋盘ID不能为空".to_string()));
        }

        let tray = self.repos.tray_repo.update_status(tray_id, to, sale_id)?;

        self.log_action(
            action,
            operator,
            tray_id,
            serde_json::json!({
                "status": tray.status,
                "sale_id": tray.sale_id,
            }),
            format!("蛋盘状态 -> {}", tray.status),
        )?;

        tracing::info!(tray_id, status = %tray.status, "蛋盘状态已变更");
        Ok(tray)
    }

    fn log_action(
        &self,
        action: ActionType,
        operator: &str,
        target_id: &str,
        payload: serde_json::Value,
        detail: String,
    ) -> ApiResult<()> {
        let log = ActionLog::new(action, operator, target_id, Some(payload), Some(detail));
        self.repos.action_log_repo.insert(&log)?;
        Ok(())
    }
}
