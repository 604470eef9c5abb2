// ==========================================
// 蛋品库存系统 - 引擎层仓储聚合
// ==========================================
// 职责: 聚合库存服务所需的全部 Repository
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::repository::{
    ActionLogRepository, EggCollectionRecordRepository, EggCollectionRecordRepositoryImpl,
    TrayRepository, TrayRepositoryImpl,
};

/// 库存仓储集合
///
/// 仓储以 trait object 持有, 单元测试可替换为内存实现
#[derive(Clone)]
pub struct InventoryRepositories {
    /// 集蛋记录仓储
    pub record_repo: Arc<dyn EggCollectionRecordRepository>,
    /// 蛋盘仓储
    pub tray_repo: Arc<dyn TrayRepository>,
    /// 操作日志仓储
    pub action_log_repo: Arc<ActionLogRepository>,
}

impl InventoryRepositories {
    /// 创建新的仓储集合
    pub fn new(
        record_repo: Arc<dyn EggCollectionRecordRepository>,
        tray_repo: Arc<dyn TrayRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            record_repo,
            tray_repo,
            action_log_repo,
        }
    }

    /// 基于同一 SQLite 连接构造全部 SQLite 仓储
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            record_repo: Arc::new(EggCollectionRecordRepositoryImpl::new(conn.clone())),
            tray_repo: Arc::new(TrayRepositoryImpl::new(conn.clone())),
            action_log_repo: Arc::new(ActionLogRepository::new(conn)),
        }
    }
}
