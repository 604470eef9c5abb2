// ==========================================
// 蛋品库存系统 - 蛋盘数据仓储
// ==========================================
// 红线: 承诺落库必须原子; 任一组成项实时可用量不足则整单回滚
// 并发: IMMEDIATE 事务串行化写入, 事务内复核可用量 (条件式扣减)
// ==========================================

use crate::domain::tray::{Allocation, Tray, TrayItem};
use crate::domain::types::{EggColor, EggSize, TrayStatus};
use crate::repository::egg_record_repo::{counter_column, load_committed, parse_enum};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::{NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::{Arc, Mutex};

// ==========================================
// TrayRepository Trait
// ==========================================
// 用途: 蛋盘及其组成项的类型化访问接口
// 实现者: TrayRepositoryImpl（使用 rusqlite）
pub trait TrayRepository: Send + Sync {
    /// 原子提交分配方案并创建蛋盘 (状态 AVAILABLE)
    ///
    /// # 返回
    /// - Ok(Tray): 新蛋盘
    /// - Err(StockConflict): 复核时实时可用量不足, 无任何写入
    fn commit_allocation(
        &self,
        tray_id: &str,
        allocation: &Allocation,
        creation_date: NaiveDate,
    ) -> RepositoryResult<Tray>;

    /// 释放蛋盘, 归还承诺量 (幂等)
    ///
    /// # 返回
    /// - Ok(true): 本次完成释放
    /// - Ok(false): 已是 RELEASED, 无变化
    fn release_tray(&self, tray_id: &str) -> RepositoryResult<bool>;

    /// 销售相关状态变更 (不触碰组成项)
    fn update_status(
        &self,
        tray_id: &str,
        to: TrayStatus,
        sale_id: Option<&str>,
    ) -> RepositoryResult<Tray>;

    fn find_by_id(&self, tray_id: &str) -> RepositoryResult<Option<Tray>>;

    fn find_by_status(&self, status: TrayStatus) -> RepositoryResult<Vec<Tray>>;

    /// 引用某集蛋记录的全部蛋盘 (含已释放)
    fn find_by_record(&self, record_id: &str) -> RepositoryResult<Vec<Tray>>;
}

// ==========================================
// TrayRepositoryImpl
// ==========================================
pub struct TrayRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl TrayRepositoryImpl {
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

    /// 事务内复核单个组成项的实时可用量
    fn check_item_available(
        conn: &Connection,
        item: &TrayItem,
        color: EggColor,
        size: EggSize,
    ) -> RepositoryResult<()> {
        let sql = format!(
            "SELECT {} FROM egg_collection WHERE record_id = ?1",
            counter_column(color, size)
        );
        let counter: Option<i64> = conn
            .query_row(&sql, params![item.record_id], |row| row.get(0))
            .optional()?;

        let counter = counter.ok_or_else(|| RepositoryError::NotFound {
            entity: "EggCollectionRecord".to_string(),
            id: item.record_id.clone(),
        })?;

        let committed = load_committed(conn, &item.record_id)?.get(color, size);
        let available = (counter - committed).max(0);

        if item.quantity_taken > available {
            return Err(RepositoryError::StockConflict {
                record_id: item.record_id.clone(),
                color,
                size,
                requested: item.quantity_taken,
                available,
            });
        }
        Ok(())
    }

    fn load_tray(conn: &Connection, tray_id: &str) -> RepositoryResult<Option<Tray>> {
        let header = conn
            .query_row(
                r#"
                SELECT tray_id, egg_color, egg_size, committed_quantity, status,
                       creation_date, sale_id, created_at, released_at
                FROM tray
                WHERE tray_id = ?1
                "#,
                params![tray_id],
                |row| {
                    let color: String = row.get(1)?;
                    let size: String = row.get(2)?;
                    let status: String = row.get(4)?;
                    Ok(Tray {
                        tray_id: row.get(0)?,
                        egg_color: parse_enum(1, &color)?,
                        egg_size: parse_enum(2, &size)?,
                        committed_quantity: row.get(3)?,
                        status: parse_enum(4, &status)?,
                        creation_date: row.get(5)?,
                        sale_id: row.get(6)?,
                        items: Vec::new(),
                        created_at: row.get(7)?,
                        released_at: row.get(8)?,
                    })
                },
            )
            .optional()?;

        let mut tray = match header {
            Some(t) => t,
            None => return Ok(None),
        };

        let mut stmt = conn.prepare_cached(
            r#"
            SELECT ti.record_id, e.cage_id, e.collection_date, ti.quantity_taken
            FROM tray_item ti
            JOIN egg_collection e ON e.record_id = ti.record_id
            WHERE ti.tray_id = ?1
            ORDER BY ti.seq_no
            "#,
        )?;
        tray.items = stmt
            .query_map(params![tray_id], |row| {
                Ok(TrayItem {
                    record_id: row.get(0)?,
                    cage_id: row.get(1)?,
                    collection_date: row.get(2)?,
                    quantity_taken: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(tray))
    }

    fn load_trays(conn: &Connection, ids: Vec<String>) -> RepositoryResult<Vec<Tray>> {
        let mut trays = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tray) = Self::load_tray(conn, &id)? {
                trays.push(tray);
            }
        }
        Ok(trays)
    }
}

impl TrayRepository for TrayRepositoryImpl {
    fn commit_allocation(
        &self,
        tray_id: &str,
        allocation: &Allocation,
        creation_date: NaiveDate,
    ) -> RepositoryResult<Tray> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        for item in &allocation.items {
            Self::check_item_available(&tx, item, allocation.egg_color, allocation.egg_size)?;
        }

        let tray = Tray::from_allocation(tray_id.to_string(), allocation, creation_date);

        tx.execute(
            r#"
            INSERT INTO tray (
                tray_id, egg_color, egg_size, committed_quantity, status,
                creation_date, sale_id, created_at, released_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, ?7, NULL)
            "#,
            params![
                tray.tray_id,
                tray.egg_color.as_str(),
                tray.egg_size.as_str(),
                tray.committed_quantity,
                tray.status.as_str(),
                tray.creation_date,
                tray.created_at,
            ],
        )?;

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO tray_item (
                    tray_id, seq_no, record_id, egg_color, egg_size, quantity_taken
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )?;

            for (seq_no, item) in tray.items.iter().enumerate() {
                stmt.execute(params![
                    tray.tray_id,
                    seq_no as i64 + 1,
                    item.record_id,
                    tray.egg_color.as_str(),
                    tray.egg_size.as_str(),
                    item.quantity_taken,
                ])?;
            }
        }

        tx.commit()?;

        tracing::info!(
            tray_id = %tray.tray_id,
            color = %tray.egg_color,
            size = %tray.egg_size,
            committed = tray.committed_quantity,
            items = tray.items.len(),
            "蛋盘承诺已提交"
        );
        Ok(tray)
    }

    fn release_tray(&self, tray_id: &str) -> RepositoryResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let status: Option<String> = tx
            .query_row(
                "SELECT status FROM tray WHERE tray_id = ?1",
                params![tray_id],
                |row| row.get(0),
            )
            .optional()?;

        let status: TrayStatus = match status {
            Some(s) => parse_enum(0, &s)?,
            None => {
                return Err(RepositoryError::NotFound {
                    entity: "Tray".to_string(),
                    id: tray_id.to_string(),
                })
            }
        };

        if status == TrayStatus::Released {
            return Ok(false);
        }
        if !status.can_transition_to(TrayStatus::Released) {
            return Err(RepositoryError::InvalidStateTransition {
                from: status.to_string(),
                to: TrayStatus::Released.to_string(),
            });
        }

        // 组成项保留用于审计; 状态 RELEASED 即不再计入承诺量
        tx.execute(
            "UPDATE tray SET status = 'RELEASED', released_at = ?2 WHERE tray_id = ?1",
            params![tray_id, Utc::now()],
        )?;
        tx.commit()?;

        tracing::info!(tray_id = %tray_id, from = %status, "蛋盘已释放");
        Ok(true)
    }

    fn update_status(
        &self,
        tray_id: &str,
        to: TrayStatus,
        sale_id: Option<&str>,
    ) -> RepositoryResult<Tray> {
        if to == TrayStatus::Released {
            return Err(RepositoryError::BusinessRuleViolation(
                "释放蛋盘须走 release_tray".to_string(),
            ));
        }

        let mut conn = self.get_conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current = Self::load_tray(&tx, tray_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Tray".to_string(),
            id: tray_id.to_string(),
        })?;

        if !current.status.can_transition_to(to) {
            return Err(RepositoryError::InvalidStateTransition {
                from: current.status.to_string(),
                to: to.to_string(),
            });
        }

        // 回到 AVAILABLE 时解除销售关联
        let sale_id = match to {
            TrayStatus::Available => None,
            _ => sale_id.map(str::to_string).or(current.sale_id.clone()),
        };

        tx.execute(
            "UPDATE tray SET status = ?2, sale_id = ?3 WHERE tray_id = ?1",
            params![tray_id, to.as_str(), sale_id],
        )?;

        let updated = Self::load_tray(&tx, tray_id)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Tray".to_string(),
            id: tray_id.to_string(),
        })?;
        tx.commit()?;

        Ok(updated)
    }

    fn find_by_id(&self, tray_id: &str) -> RepositoryResult<Option<Tray>> {
        let conn = self.get_conn()?;
        Self::load_tray(&conn, tray_id)
    }

    fn find_by_status(&self, status: TrayStatus) -> RepositoryResult<Vec<Tray>> {
        let conn = self.get_conn()?;
        let ids = {
            let mut stmt = conn.prepare(
                "SELECT tray_id FROM tray WHERE status = ?1 ORDER BY created_at, tray_id",
            )?;
            let ids = stmt
                .query_map(params![status.as_str()], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        Self::load_trays(&conn, ids)
    }

    fn find_by_record(&self, record_id: &str) -> RepositoryResult<Vec<Tray>> {
        let conn = self.get_conn()?;
        let ids = {
            let mut stmt = conn.prepare(
                r#"
                SELECT DISTINCT t.tray_id, t.created_at
                FROM tray t
                JOIN tray_item ti ON ti.tray_id = t.tray_id
                WHERE ti.record_id = ?1
                ORDER BY t.created_at, t.tray_id
                "#,
            )?;
            let ids = stmt
                .query_map(params![record_id], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            ids
        };
        Self::load_trays(&conn, ids)
    }
}
