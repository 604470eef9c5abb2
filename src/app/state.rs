// ==========================================
// 蛋品库存系统 - 应用状态
// ==========================================
// 职责: 启动时显式构造共享连接、仓储、引擎与 API
// 约束: 无模块级全局状态; 生命周期随宿主启动/退出
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::EggInventoryApi;
use crate::config::ConfigManager;
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::engine::InventoryRepositories;
use crate::importer::CollectionImporterImpl;

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 库存API
    pub inventory_api: Arc<EggInventoryApi>,

    /// 集蛋CSV导入器
    pub importer: Arc<CollectionImporterImpl>,

    /// 配置管理器
    pub config: Arc<ConfigManager>,

    /// 仓储集合 (批处理/工具直接使用)
    pub repos: InventoryRepositories,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开共享连接并幂等建表
    /// 2. 初始化所有Repository
    /// 3. 创建API与导入器
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        Ok(Self::from_connection(db_path, Arc::new(Mutex::new(conn))))
    }

    /// 基于已初始化的连接装配 (测试使用内存库)
    pub fn from_connection(db_path: String, conn: Arc<Mutex<Connection>>) -> Self {
        let repos = InventoryRepositories::from_connection(conn.clone());
        let config = Arc::new(ConfigManager::from_connection(conn));

        let inventory_api = Arc::new(EggInventoryApi::new(repos.clone(), config.clone()));
        let importer = Arc::new(CollectionImporterImpl::new(
            repos.record_repo.clone(),
            repos.action_log_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Self {
            db_path,
            inventory_api,
            importer,
            config,
            repos,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级:
/// 1. 环境变量 EGG_INVENTORY_DB_PATH
/// 2. 用户数据目录/egg-inventory/egg_inventory.db
/// 3. ./egg_inventory.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("EGG_INVENTORY_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./egg_inventory.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("egg-inventory");
        // 建目录失败时退回当前目录
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("egg_inventory.db");
        }
    }

    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_default_db_path() {
        let path = get_default_db_path();
        assert!(!path.is_empty());
        assert!(path.ends_with(".db"));
    }

    #[test]
    fn test_from_in_memory_connection() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        let state = AppState::from_connection(":memory:".to_string(), Arc::new(Mutex::new(conn)));

        assert_eq!(state.config.get_tray_capacity().unwrap(), 30);
        assert!(state
            .repos
            .tray_repo
            .find_by_status(crate::domain::types::TrayStatus::Available)
            .unwrap()
            .is_empty());
    }
}
