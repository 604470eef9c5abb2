// ==========================================
// 蛋品库存系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写
// 存储: config_kv 表 (key-value, scope_id='global')
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 蛋盘
    pub const TRAY_CAPACITY: &str = "tray_capacity";

    // 分配冲突重试
    pub const ALLOCATION_MAX_RETRIES: &str = "allocation_max_retries";

    // 统计
    pub const STATS_DEFAULT_WINDOW_DAYS: &str = "stats_default_window_days";
}

/// 默认值
pub mod config_defaults {
    pub const TRAY_CAPACITY: i64 = 30;
    pub const ALLOCATION_MAX_RETRIES: u32 = 3;
    pub const STATS_DEFAULT_WINDOW_DAYS: i64 = 30;
}

/// 取值上限 (超出时回落默认值)
pub mod config_limits {
    pub const ALLOCATION_MAX_RETRIES: u32 = 20;
    pub const STATS_WINDOW_DAYS: i64 = 3660;
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 读取 global scope 的配置值
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        Ok(value)
    }

    /// 写入 global scope 的配置值 (UPSERT)
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    /// 读取数值配置; 缺失或非法时回落默认值
    fn get_parsed_or_default<T>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>>
    where
        T: std::str::FromStr + Copy + std::fmt::Display,
    {
        match self.get_global_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(key, raw = %raw, default = %default, "配置值非法, 使用默认值");
                    Ok(default)
                }
            },
        }
    }

    /// 单盘容量 (枚)
    pub fn get_tray_capacity(&self) -> Result<i64, Box<dyn Error>> {
        let v = self.get_parsed_or_default(config_keys::TRAY_CAPACITY, config_defaults::TRAY_CAPACITY)?;
        if v <= 0 {
            tracing::warn!(value = v, "tray_capacity 必须为正, 使用默认值");
            return Ok(config_defaults::TRAY_CAPACITY);
        }
        Ok(v)
    }

    /// 分配冲突时的最大重试次数
    pub fn get_allocation_max_retries(&self) -> Result<u32, Box<dyn Error>> {
        let v = self.get_parsed_or_default(
            config_keys::ALLOCATION_MAX_RETRIES,
            config_defaults::ALLOCATION_MAX_RETRIES,
        )?;
        if v > config_limits::ALLOCATION_MAX_RETRIES {
            tracing::warn!(
                value = v,
                max = config_limits::ALLOCATION_MAX_RETRIES,
                "allocation_max_retries 超出上限, 使用默认值"
            );
            return Ok(config_defaults::ALLOCATION_MAX_RETRIES);
        }
        Ok(v)
    }

    /// “近期统计”默认窗口天数
    pub fn get_stats_default_window_days(&self) -> Result<i64, Box<dyn Error>> {
        let v = self.get_parsed_or_default(
            config_keys::STATS_DEFAULT_WINDOW_DAYS,
            config_defaults::STATS_DEFAULT_WINDOW_DAYS,
        )?;
        if !(1..=config_limits::STATS_WINDOW_DAYS).contains(&v) {
            tracing::warn!(
                value = v,
                max = config_limits::STATS_WINDOW_DAYS,
                "stats_default_window_days 超出范围, 使用默认值"
            );
            return Ok(config_defaults::STATS_DEFAULT_WINDOW_DAYS);
        }
        Ok(v)
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;

    fn manager() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[test]
    fn test_defaults() {
        let cm = manager();
        assert_eq!(cm.get_tray_capacity().unwrap(), 30);
        assert_eq!(cm.get_allocation_max_retries().unwrap(), 3);
        assert_eq!(cm.get_stats_default_window_days().unwrap(), 30);
    }

    #[test]
    fn test_override_and_invalid_fallback() {
        let cm = manager();
        cm.set_global_config_value(config_keys::TRAY_CAPACITY, "12").unwrap();
        assert_eq!(cm.get_tray_capacity().unwrap(), 12);

        cm.set_global_config_value(config_keys::TRAY_CAPACITY, "abc").unwrap();
        assert_eq!(cm.get_tray_capacity().unwrap(), 30);

        cm.set_global_config_value(config_keys::TRAY_CAPACITY, "-5").unwrap();
        assert_eq!(cm.get_tray_capacity().unwrap(), 30);
    }

    #[test]
    fn test_out_of_range_values_fall_back() {
        let cm = manager();
        cm.set_global_config_value(config_keys::STATS_DEFAULT_WINDOW_DAYS, "100000000000").unwrap();
        assert_eq!(cm.get_stats_default_window_days().unwrap(), 30);

        cm.set_global_config_value(config_keys::STATS_DEFAULT_WINDOW_DAYS, "0").unwrap();
        assert_eq!(cm.get_stats_default_window_days().unwrap(), 30);

        cm.set_global_config_value(config_keys::STATS_DEFAULT_WINDOW_DAYS, "7").unwrap();
        assert_eq!(cm.get_stats_default_window_days().unwrap(), 7);

        cm.set_global_config_value(config_keys::ALLOCATION_MAX_RETRIES, &u32::MAX.to_string()).unwrap();
        assert_eq!(cm.get_allocation_max_retries().unwrap(), 3);

        cm.set_global_config_value(config_keys::ALLOCATION_MAX_RETRIES, "0").unwrap();
        assert_eq!(cm.get_allocation_max_retries().unwrap(), 0);
    }

    #[test]
    fn test_snapshot() {
        let cm = manager();
        cm.set_global_config_value(config_keys::ALLOCATION_MAX_RETRIES, "5").unwrap();
        let snapshot: BTreeMap<String, String> =
            serde_json::from_str(&cm.get_config_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot.get("allocation_max_retries").map(String::as_str), Some("5"));
    }
}
