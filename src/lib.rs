// ==========================================
// 蛋品库存系统 - 核心库
// ==========================================
// 职责: 集蛋记录分级校验、产量统计、装盘分配 (先进先出)
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 导入层 - 外部数据
pub mod importer;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AgeUnit, EggColor, EggSize, Period, TrayStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Allocation, CageProductionStat, Classification, DateWindow,
    EggCollectionRecord, EggCounters, ImportSummary, ParsedAge, PeriodBucket, ProductionStats,
    Tray, TrayItem,
};

// 引擎
pub use engine::{
    parse_and_validate_age, AggregationEngine, AllocationError, ClassificationEngine,
    TrayAllocator, ValidationError,
};

// API
pub use api::{ApiError, ApiResult, EggInventoryApi, NewCollectionRecord};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "蛋品库存系统";
