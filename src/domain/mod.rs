// ==========================================
// 蛋品库存系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、派生视图
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod age;
pub mod egg_record;
pub mod import;
pub mod stats;
pub mod tray;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use age::ParsedAge;
pub use egg_record::{EggCollectionRecord, EggCounters};
pub use import::{ImportRowError, ImportSummary};
pub use stats::{
    CageProductionStat, Classification, DateWindow, PeriodBucket, ProductionStats, SizeBreakdown,
    TypeBreakdown,
};
pub use tray::{Allocation, Tray, TrayItem};
pub use types::{AgeUnit, EggColor, EggSize, Period, TrayStatus};
