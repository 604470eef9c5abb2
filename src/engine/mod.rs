// ==========================================
// 蛋品库存系统 - 引擎层
// ==========================================
// 职责: 实现业务规则引擎,不拼 SQL
// 红线: 引擎为纯函数 + 显式落库步骤; 不做 I/O, 不起后台任务
// ==========================================

pub mod age_validator;
pub mod aggregation;
pub mod classification;
pub mod error;
pub mod repositories;
pub mod tray_allocation;

// 重导出核心引擎
pub use age_validator::parse_and_validate_age;
pub use aggregation::AggregationEngine;
pub use classification::ClassificationEngine;
pub use error::{AllocationError, ValidationError, ValidationResult};
pub use repositories::InventoryRepositories;
pub use tray_allocation::TrayAllocator;
