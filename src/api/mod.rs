// ==========================================
// 蛋品库存系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 供 CLI / 批处理等宿主调用
// ==========================================

pub mod egg_inventory_api;
pub mod error;

// 重导出核心类型
pub use egg_inventory_api::{EggInventoryApi, NewCollectionRecord};
pub use error::{ApiError, ApiResult};
