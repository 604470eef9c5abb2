// ==========================================
// 蛋品库存系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键 / busy_timeout）
// - 幂等建表, 记录 schema_version
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 幂等建表
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );

        CREATE TABLE IF NOT EXISTS egg_collection (
            record_id TEXT PRIMARY KEY,
            cage_id INTEGER NOT NULL,
            collection_date TEXT NOT NULL,
            brown_small INTEGER NOT NULL DEFAULT 0,
            brown_medium INTEGER NOT NULL DEFAULT 0,
            brown_large INTEGER NOT NULL DEFAULT 0,
            brown_jumbo INTEGER NOT NULL DEFAULT 0,
            white_small INTEGER NOT NULL DEFAULT 0,
            white_medium INTEGER NOT NULL DEFAULT 0,
            white_large INTEGER NOT NULL DEFAULT 0,
            white_jumbo INTEGER NOT NULL DEFAULT 0,
            total_quantity INTEGER NOT NULL,
            notes TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE (cage_id, collection_date)
        );

        CREATE INDEX IF NOT EXISTS idx_egg_collection_date
            ON egg_collection (collection_date);

        CREATE TABLE IF NOT EXISTS tray (
            tray_id TEXT PRIMARY KEY,
            egg_color TEXT NOT NULL,
            egg_size TEXT NOT NULL,
            committed_quantity INTEGER NOT NULL,
            status TEXT NOT NULL,
            creation_date TEXT NOT NULL,
            sale_id TEXT,
            created_at TEXT NOT NULL,
            released_at TEXT
        );

        CREATE TABLE IF NOT EXISTS tray_item (
            tray_id TEXT NOT NULL REFERENCES tray(tray_id) ON DELETE CASCADE,
            seq_no INTEGER NOT NULL,
            record_id TEXT NOT NULL REFERENCES egg_collection(record_id) ON DELETE RESTRICT,
            egg_color TEXT NOT NULL,
            egg_size TEXT NOT NULL,
            quantity_taken INTEGER NOT NULL CHECK (quantity_taken > 0),
            PRIMARY KEY (tray_id, seq_no)
        );

        CREATE INDEX IF NOT EXISTS idx_tray_item_record
            ON tray_item (record_id, egg_color, egg_size);

        CREATE TABLE IF NOT EXISTS action_log (
            action_id TEXT PRIMARY KEY,
            action_type TEXT NOT NULL,
            action_ts TEXT NOT NULL,
            actor TEXT NOT NULL,
            target_id TEXT NOT NULL,
            payload_json TEXT,
            detail TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_action_log_target
            ON action_log (target_id);
        "#,
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);

        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }
}
