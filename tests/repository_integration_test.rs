// ==========================================
// Repository 集成测试
// ==========================================
// 职责: 验证集蛋记录/蛋盘/操作日志仓储在真实 SQLite 上的行为
// ==========================================


#[cfg(test)]
mod repository_integration_test {
    use egg_inventory::domain::action_log::{ActionLog, ActionType};
    use egg_inventory::domain::stats::DateWindow;
    use egg_inventory::domain::tray::{Allocation, TrayItem};
    use egg_inventory::domain::types::{EggColor, EggSize, TrayStatus};
    use egg_inventory::repository::{
        ActionLogRepository, EggCollectionRecordRepository, EggCollectionRecordRepositoryImpl,
        RepositoryError, TrayRepository, TrayRepositoryImpl,
    };

    use crate::test_helpers::{create_test_db, date, open_shared, single_grade_record};

    fn allocation_of(items: &[(&str, i64, chrono::NaiveDate, i64)]) -> Allocation {
        let items: Vec<TrayItem> = items
            .iter()
            .map(|(record_id, cage_id, d, qty)| TrayItem {
                record_id: record_id.to_string(),
                cage_id: *cage_id,
                collection_date: *d,
                quantity_taken: *qty,
            })
            .collect();
        Allocation {
            egg_color: EggColor::Brown,
            egg_size: EggSize::Large,
            requested_quantity: items.iter().map(|i| i.quantity_taken).sum(),
            items,
        }
    }

    #[test]
    fn test_record_insert_find_and_unique_constraint() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = EggCollectionRecordRepositoryImpl::new(open_shared(&db_path));

        let record = single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 12);
        repo.insert(&record).unwrap();

        let loaded = repo.find_by_id("R1").unwrap().unwrap();
        assert_eq!(loaded.counters, record.counters);
        assert_eq!(loaded.total_quantity, 12);
        assert_eq!(loaded.committed.sum(), 0);

        let same_slot = single_grade_record("R2", 1, date(2024, 1, 1), EggColor::White, EggSize::Small, 3);
        let err = repo.insert(&same_slot).unwrap_err();
        assert!(matches!(err, RepositoryError::UniqueConstraintViolation(_)));

        assert!(repo.find_by_cage_and_date(1, date(2024, 1, 1)).unwrap().is_some());
        assert!(repo.find_by_cage_and_date(1, date(2024, 1, 2)).unwrap().is_none());
    }

    #[test]
    fn test_window_queries_are_closed_and_ordered() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = EggCollectionRecordRepositoryImpl::new(open_shared(&db_path));

        for (id, cage, day) in [("A", 2, 3), ("B", 1, 3), ("C", 1, 1), ("D", 1, 5)] {
            repo.insert(&single_grade_record(id, cage, date(2024, 1, day), EggColor::Brown, EggSize::Small, 1))
                .unwrap();
        }

        let window = DateWindow::new(date(2024, 1, 1), date(2024, 1, 3)).unwrap();
        let ids: Vec<String> = repo
            .find_by_window(window)
            .unwrap()
            .into_iter()
            .map(|r| r.record_id)
            .collect();
        assert_eq!(ids, vec!["C", "B", "A"]);

        let cage1 = repo.find_by_cage_and_window(1, window).unwrap();
        assert_eq!(cage1.len(), 2);
    }

    #[test]
    fn test_commit_allocation_updates_availability() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);
        let records = EggCollectionRecordRepositoryImpl::new(conn.clone());
        let trays = TrayRepositoryImpl::new(conn);

        records
            .insert(&single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        records
            .insert(&single_grade_record("R2", 2, date(2024, 1, 2), EggColor::Brown, EggSize::Large, 10))
            .unwrap();

        let allocation = allocation_of(&[("R1", 1, date(2024, 1, 1), 5), ("R2", 2, date(2024, 1, 2), 3)]);
        let tray = trays.commit_allocation("T1", &allocation, date(2024, 1, 10)).unwrap();
        assert_eq!(tray.status, TrayStatus::Available);
        assert_eq!(tray.committed_quantity, 8);
        assert!(tray.is_consistent());

        // R1 已耗尽, 不再出现在可用列表
        let available = records.find_available(EggColor::Brown, EggSize::Large).unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].record_id, "R2");
        assert_eq!(available[0].available_quantity(EggColor::Brown, EggSize::Large), 7);

        let loaded = trays.find_by_id("T1").unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items[0].record_id, "R1");
        assert_eq!(trays.find_by_record("R2").unwrap().len(), 1);
    }

    #[test]
    fn test_commit_allocation_conflict_writes_nothing() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);
        let records = EggCollectionRecordRepositoryImpl::new(conn.clone());
        let trays = TrayRepositoryImpl::new(conn);

        records
            .insert(&single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        records
            .insert(&single_grade_record("R2", 2, date(2024, 1, 2), EggColor::Brown, EggSize::Large, 2))
            .unwrap();

        // 第二项超出 R2 的可用量
        let allocation = allocation_of(&[("R1", 1, date(2024, 1, 1), 5), ("R2", 2, date(2024, 1, 2), 3)]);
        let err = trays.commit_allocation("T1", &allocation, date(2024, 1, 10)).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::StockConflict { ref record_id, requested: 3, available: 2, .. } if record_id == "R2"
        ));

        assert!(trays.find_by_id("T1").unwrap().is_none());
        let r1 = records.find_by_id("R1").unwrap().unwrap();
        assert_eq!(r1.available_quantity(EggColor::Brown, EggSize::Large), 5);
    }

    #[test]
    fn test_release_is_idempotent_and_restores_stock() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);
        let records = EggCollectionRecordRepositoryImpl::new(conn.clone());
        let trays = TrayRepositoryImpl::new(conn);

        records
            .insert(&single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        trays
            .commit_allocation("T1", &allocation_of(&[("R1", 1, date(2024, 1, 1), 4)]), date(2024, 1, 2))
            .unwrap();

        assert!(trays.release_tray("T1").unwrap());
        let after_first = records.find_by_id("R1").unwrap().unwrap();
        assert!(!trays.release_tray("T1").unwrap());
        let after_second = records.find_by_id("R1").unwrap().unwrap();

        assert_eq!(after_first.committed, after_second.committed);
        assert_eq!(after_second.available_quantity(EggColor::Brown, EggSize::Large), 5);

        // 组成项保留用于审计
        let tray = trays.find_by_id("T1").unwrap().unwrap();
        assert!(tray.is_released());
        assert!(tray.released_at.is_some());
        assert_eq!(tray.items.len(), 1);

        assert!(matches!(
            trays.release_tray("missing").unwrap_err(),
            RepositoryError::NotFound { .. }
        ));
    }

    #[test]
    fn test_sale_transitions_keep_commitment() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);
        let records = EggCollectionRecordRepositoryImpl::new(conn.clone());
        let trays = TrayRepositoryImpl::new(conn);

        records
            .insert(&single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        trays
            .commit_allocation("T1", &allocation_of(&[("R1", 1, date(2024, 1, 1), 5)]), date(2024, 1, 2))
            .unwrap();

        let reserved = trays.update_status("T1", TrayStatus::Reserved, Some("S-1")).unwrap();
        assert_eq!(reserved.sale_id.as_deref(), Some("S-1"));

        let sold = trays.update_status("T1", TrayStatus::Sold, None).unwrap();
        assert_eq!(sold.status, TrayStatus::Sold);
        assert_eq!(sold.sale_id.as_deref(), Some("S-1"));

        // 已售蛋盘不可释放
        assert!(matches!(
            trays.release_tray("T1").unwrap_err(),
            RepositoryError::InvalidStateTransition { .. }
        ));

        let returned = trays.update_status("T1", TrayStatus::Available, None).unwrap();
        assert_eq!(returned.sale_id, None);
        assert_eq!(returned.items.len(), 1);

        // 退货后承诺关系仍在
        let r1 = records.find_by_id("R1").unwrap().unwrap();
        assert_eq!(r1.available_quantity(EggColor::Brown, EggSize::Large), 0);

        assert!(matches!(
            trays.update_status("T1", TrayStatus::Released, None).unwrap_err(),
            RepositoryError::BusinessRuleViolation(_)
        ));
        assert_eq!(trays.find_by_status(TrayStatus::Available).unwrap().len(), 1);
    }

    #[test]
    fn test_update_and_delete_guarded_by_commitment() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);
        let records = EggCollectionRecordRepositoryImpl::new(conn.clone());
        let trays = TrayRepositoryImpl::new(conn);

        records
            .insert(&single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        trays
            .commit_allocation("T1", &allocation_of(&[("R1", 1, date(2024, 1, 1), 4)]), date(2024, 1, 2))
            .unwrap();

        let mut lowered = records.find_by_id("R1").unwrap().unwrap();
        lowered.counters.set(EggColor::Brown, EggSize::Large, 3);
        lowered.total_quantity = 3;
        assert!(matches!(
            records.update(&lowered).unwrap_err(),
            RepositoryError::BusinessRuleViolation(_)
        ));

        assert!(matches!(
            records.delete("R1").unwrap_err(),
            RepositoryError::BusinessRuleViolation(_)
        ));

        trays.release_tray("T1").unwrap();
        records.update(&lowered).unwrap();

        // 释放后组成项仍引用该记录, 删除被拒且蛋盘保持一致
        assert!(matches!(
            records.delete("R1").unwrap_err(),
            RepositoryError::BusinessRuleViolation(_)
        ));
        assert!(records.find_by_id("R1").unwrap().is_some());
        let tray = trays.find_by_id("T1").unwrap().unwrap();
        assert_eq!(tray.items.len(), 1);
        assert_eq!(tray.committed_quantity, 4);
        assert!(tray.is_consistent());

        // 未被任何蛋盘引用的记录可删除
        records
            .insert(&single_grade_record("R2", 2, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        records.delete("R2").unwrap();
        assert!(records.find_by_id("R2").unwrap().is_none());
    }

    #[test]
    fn test_schema_restricts_deleting_referenced_record() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let conn = open_shared(&db_path);
        let records = EggCollectionRecordRepositoryImpl::new(conn.clone());
        let trays = TrayRepositoryImpl::new(conn.clone());

        records
            .insert(&single_grade_record("R1", 1, date(2024, 1, 1), EggColor::Brown, EggSize::Large, 5))
            .unwrap();
        trays
            .commit_allocation("T1", &allocation_of(&[("R1", 1, date(2024, 1, 1), 4)]), date(2024, 1, 2))
            .unwrap();
        trays.release_tray("T1").unwrap();

        // 绕过仓储直接删除, 外键同样拒绝
        let raw = conn
            .lock()
            .unwrap()
            .execute("DELETE FROM egg_collection WHERE record_id = 'R1'", [])
            .map_err(RepositoryError::from);
        assert!(matches!(raw, Err(RepositoryError::ForeignKeyViolation(_))));
        assert_eq!(trays.find_by_id("T1").unwrap().unwrap().items.len(), 1);
    }

    #[test]
    fn test_action_log_roundtrip() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let repo = ActionLogRepository::new(open_shared(&db_path));

        let first = ActionLog::new(
            ActionType::AllocateTray,
            "tester",
            "T1",
            Some(serde_json::json!({ "quantity": 8 })),
            Some("分配".to_string()),
        );
        let second = ActionLog::new(ActionType::ReleaseTray, "tester", "T1", None, None);
        repo.insert(&first).unwrap();
        repo.insert(&second).unwrap();

        let logs = repo.find_by_target("T1").unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].action_type, "ALLOCATE_TRAY");
        assert_eq!(logs[0].payload_json, Some(serde_json::json!({ "quantity": 8 })));
        assert_eq!(repo.find_recent(1).unwrap().len(), 1);
    }
}
