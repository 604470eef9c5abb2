// ==========================================
// 蛋品库存系统 - 集蛋记录数据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 约束: 所有查询使用参数化; 颜色/规格列名由枚举映射, 不接受外部字符串
// ==========================================

use crate::domain::egg_record::{EggCollectionRecord, EggCounters};
use crate::domain::stats::DateWindow;
use crate::domain::types::{EggColor, EggSize};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SELECT_COLUMNS: &str = r#"
    record_id, cage_id, collection_date,
    brown_small, brown_medium, brown_large, brown_jumbo,
    white_small, white_medium, white_large, white_jumbo,
    total_quantity, notes, created_at, updated_at
"#;

/// (颜色, 规格) → egg_collection 计数列
pub(crate) fn counter_column(color: EggColor, size: EggSize) -> &'static str {
    match (color, size) {
        (EggColor::Brown, EggSize::Small) => "brown_small",
        (EggColor::Brown, EggSize::Medium) => "brown_medium",
        (EggColor::Brown, EggSize::Large) => "brown_large",
        (EggColor::Brown, EggSize::Jumbo) => "brown_jumbo",
        (EggColor::White, EggSize::Small) => "white_small",
        (EggColor::White, EggSize::Medium) => "white_medium",
        (EggColor::White, EggSize::Large) => "white_large",
        (EggColor::White, EggSize::Jumbo) => "white_jumbo",
    }
}

/// 查询某记录在未释放蛋盘中的承诺量
pub(crate) fn load_committed(conn: &Connection, record_id: &str) -> rusqlite::Result<EggCounters> {
    let mut stmt = conn.prepare_cached(
        r#"
        SELECT ti.egg_color, ti.egg_size, SUM(ti.quantity_taken)
        FROM tray_item ti
        JOIN tray t ON t.tray_id = ti.tray_id
        WHERE ti.record_id = ?1 AND t.status <> 'RELEASED'
        GROUP BY ti.egg_color, ti.egg_size
        "#,
    )?;

    let rows = stmt.query_map(params![record_id], |row| {
        let color: String = row.get(0)?;
        let size: String = row.get(1)?;
        let qty: i64 = row.get(2)?;
        Ok((parse_enum::<EggColor>(0, &color)?, parse_enum::<EggSize>(1, &size)?, qty))
    })?;

    let mut committed = EggCounters::default();
    for row in rows {
        let (color, size, qty) = row?;
        committed.set(color, size, qty);
    }
    Ok(committed)
}

pub(crate) fn parse_enum<T: std::str::FromStr<Err = String>>(idx: usize, raw: &str) -> rusqlite::Result<T> {
    raw.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, e.into())
    })
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<EggCollectionRecord> {
    Ok(EggCollectionRecord {
        record_id: row.get(0)?,
        cage_id: row.get(1)?,
        collection_date: row.get(2)?,
        counters: EggCounters {
            brown_small: row.get(3)?,
            brown_medium: row.get(4)?,
            brown_large: row.get(5)?,
            brown_jumbo: row.get(6)?,
            white_small: row.get(7)?,
            white_medium: row.get(8)?,
            white_large: row.get(9)?,
            white_jumbo: row.get(10)?,
        },
        total_quantity: row.get(11)?,
        committed: EggCounters::default(),
        notes: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

// ==========================================
// EggCollectionRecordRepository Trait
// ==========================================
// 用途: 集蛋记录的类型化访问接口
// 实现者: EggCollectionRecordRepositoryImpl（使用 rusqlite）
// 说明: 读出的记录均已填充 committed (未释放蛋盘承诺量)
pub trait EggCollectionRecordRepository: Send + Sync {
    /// 插入记录; (cage_id, collection_date) 冲突时返回 UniqueConstraintViolation
    fn insert(&self, record: &EggCollectionRecord) -> RepositoryResult<()>;

    /// 修正计数器与总数; 事务内复核新值不低于最新承诺量
    fn update(&self, record: &EggCollectionRecord) -> RepositoryResult<()>;

    /// 删除记录; 仍被未释放蛋盘引用时拒绝
    fn delete(&self, record_id: &str) -> RepositoryResult<()>;

    fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<EggCollectionRecord>>;

    fn find_by_cage_and_date(
        &self,
        cage_id: i64,
        collection_date: NaiveDate,
    ) -> RepositoryResult<Option<EggCollectionRecord>>;

    /// 单笼窗口内记录 (日期升序)
    fn find_by_cage_and_window(
        &self,
        cage_id: i64,
        window: DateWindow,
    ) -> RepositoryResult<Vec<EggCollectionRecord>>;

    /// 全部笼窗口内记录 (日期升序)
    fn find_by_window(&self, window: DateWindow) -> RepositoryResult<Vec<EggCollectionRecord>>;

    /// 指定分级仍有可用量的记录 (先进先出顺序)
    fn find_available(&self, color: EggColor, size: EggSize) -> RepositoryResult<Vec<EggCollectionRecord>>;
}

// ==========================================
// EggCollectionRecordRepositoryImpl
// ==========================================
pub struct EggCollectionRecordRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl EggCollectionRecordRepositoryImpl {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn query_records(
        conn: &Connection,
        where_clause: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> RepositoryResult<Vec<EggCollectionRecord>> {
        let sql = format!(
            "SELECT {} FROM egg_collection {} ORDER BY collection_date, cage_id, record_id",
            SELECT_COLUMNS, where_clause
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut records = stmt
            .query_map(params, map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for record in records.iter_mut() {
            record.committed = load_committed(conn, &record.record_id)?;
        }
        Ok(records)
    }
}

impl EggCollectionRecordRepository for EggCollectionRecordRepositoryImpl {
    fn insert(&self, record: &EggCollectionRecord) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let c = &record.counters;

        conn.execute(
            r#"
            INSERT INTO egg_collection (
                record_id, cage_id, collection_date,
                brown_small, brown_medium, brown_large, brown_jumbo,
                white_small, white_medium, white_large, white_jumbo,
                total_quantity, notes, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
            params![
                record.record_id,
                record.cage_id,
                record.collection_date,
                c.brown_small,
                c.brown_medium,
                c.brown_large,
                c.brown_jumbo,
                c.white_small,
                c.white_medium,
                c.white_large,
                c.white_jumbo,
                record.total_quantity,
                record.notes,
                record.created_at,
                record.updated_at,
            ],
        )?;

        tracing::debug!(record_id = %record.record_id, cage_id = record.cage_id, "集蛋记录已写入");
        Ok(())
    }

    fn update(&self, record: &EggCollectionRecord) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let committed = load_committed(&tx, &record.record_id)?;
        for (color, size, value) in record.counters.iter() {
            if value < committed.get(color, size) {
                return Err(RepositoryError::BusinessRuleViolation(format!(
                    "记录 {} 的 {}/{} 修正值 {} 低于已承诺量 {}",
                    record.record_id,
                    color,
                    size,
                    value,
                    committed.get(color, size)
                )));
            }
        }

        let c = &record.counters;
        let affected = tx.execute(
            r#"
            UPDATE egg_collection SET
                brown_small = ?2, brown_medium = ?3, brown_large = ?4, brown_jumbo = ?5,
                white_small = ?6, white_medium = ?7, white_large = ?8, white_jumbo = ?9,
                total_quantity = ?10, notes = ?11, updated_at = ?12
            WHERE record_id = ?1
            "#,
            params![
                record.record_id,
                c.brown_small,
                c.brown_medium,
                c.brown_large,
                c.brown_jumbo,
                c.white_small,
                c.white_medium,
                c.white_large,
                c.white_jumbo,
                record.total_quantity,
                record.notes,
                record.updated_at,
            ],
        )?;

        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "EggCollectionRecord".to_string(),
                id: record.record_id.clone(),
            });
        }

        tx.commit()?;
        Ok(())
    }

    fn delete(&self, record_id: &str) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        // 已释放蛋盘的组成项保留用于审计, 同样阻止删除
        let (total_refs, active_refs): (i64, i64) = tx.query_row(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(CASE WHEN t.status <> 'RELEASED' THEN 1 ELSE 0 END), 0)
            FROM tray_item ti
            JOIN tray t ON t.tray_id = ti.tray_id
            WHERE ti.record_id = ?1
            "#,
            params![record_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if active_refs > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "记录 {} 仍被 {} 个未释放蛋盘项引用, 不可删除",
                record_id, active_refs
            )));
        }
        if total_refs > 0 {
            return Err(RepositoryError::BusinessRuleViolation(format!(
                "记录 {} 被 {} 个已释放蛋盘项引用 (审计保留), 不可删除",
                record_id, total_refs
            )));
        }

        let affected = tx.execute(
            "DELETE FROM egg_collection WHERE record_id = ?1",
            params![record_id],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "EggCollectionRecord".to_string(),
                id: record_id.to_string(),
            });
        }

        tx.commit()?;
        Ok(())
    }

    fn find_by_id(&self, record_id: &str) -> RepositoryResult<Option<EggCollectionRecord>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM egg_collection WHERE record_id = ?1", SELECT_COLUMNS);

        let record = conn
            .query_row(&sql, params![record_id], map_row)
            .optional()?;

        match record {
            Some(mut r) => {
                r.committed = load_committed(&conn, &r.record_id)?;
                Ok(Some(r))
            }
            None => Ok(None),
        }
    }

    fn find_by_cage_and_date(
        &self,
        cage_id: i64,
        collection_date: NaiveDate,
    ) -> RepositoryResult<Option<EggCollectionRecord>> {
        let conn = self.get_conn()?;
        let records = Self::query_records(
            &conn,
            "WHERE cage_id = ?1 AND collection_date = ?2",
            params![cage_id, collection_date],
        )?;
        Ok(records.into_iter().next())
    }

    fn find_by_cage_and_window(
        &self,
        cage_id: i64,
        window: DateWindow,
    ) -> RepositoryResult<Vec<EggCollectionRecord>> {
        let conn = self.get_conn()?;
        Self::query_records(
            &conn,
            "WHERE cage_id = ?1 AND collection_date BETWEEN ?2 AND ?3",
            params![cage_id, window.start, window.end],
        )
    }

    fn find_by_window(&self, window: DateWindow) -> RepositoryResult<Vec<EggCollectionRecord>> {
        let conn = self.get_conn()?;
        Self::query_records(
            &conn,
            "WHERE collection_date BETWEEN ?1 AND ?2",
            params![window.start, window.end],
        )
    }

    fn find_available(&self, color: EggColor, size: EggSize) -> RepositoryResult<Vec<EggCollectionRecord>> {
        let conn = self.get_conn()?;
        let where_clause = format!(
            r#"
            WHERE {col} > COALESCE((
                SELECT SUM(ti.quantity_taken)
                FROM tray_item ti
                JOIN tray t ON t.tray_id = ti.tray_id
                WHERE ti.record_id = egg_collection.record_id
                  AND ti.egg_color = ?1 AND ti.egg_size = ?2
                  AND t.status <> 'RELEASED'
            ), 0)
            "#,
            col = counter_column(color, size)
        );
        Self::query_records(&conn, &where_clause, params![color.as_str(), size.as_str()])
    }
}
