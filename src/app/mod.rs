// ==========================================
// 蛋品库存系统 - 应用层
// ==========================================
// 职责: 装配应用状态 (依赖注入), 解析默认数据库路径
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
