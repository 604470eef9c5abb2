// ==========================================
// 并发分配测试
// ==========================================
// 职责: 验证多个分配请求争用同一批存货时不会超额承诺
// ==========================================


#[cfg(test)]
mod concurrent_allocation_test {
    use egg_inventory::api::{ApiError, NewCollectionRecord};
    use egg_inventory::app::AppState;
    use egg_inventory::domain::egg_record::EggCounters;
    use egg_inventory::domain::types::{EggColor, EggSize, TrayStatus};
    use egg_inventory::engine::AllocationError;
    use std::sync::Arc;
    use std::thread;

    use crate::test_helpers::{create_test_db, date};

    fn seed(state: &AppState, cage_id: i64, day: u32, qty: i64) {
        state
            .inventory_api
            .record_collection(
                NewCollectionRecord {
                    cage_id,
                    collection_date: date(2024, 3, day),
                    counters: EggCounters::single(EggColor::Brown, EggSize::Large, qty),
                    total_quantity: qty,
                    notes: None,
                },
                "seed",
            )
            .unwrap();
    }

    /// 每个线程独立连接: IMMEDIATE 事务串行化 + 事务内复核
    #[test]
    fn test_racing_connections_never_overcommit() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let seed_state = AppState::new(db_path.clone()).unwrap();
        seed(&seed_state, 1, 1, 10);

        let states: Vec<AppState> = (0..5).map(|_| AppState::new(db_path.clone()).unwrap()).collect();

        let handles: Vec<_> = states
            .into_iter()
            .enumerate()
            .map(|(i, state)| {
                thread::spawn(move || {
                    state
                        .inventory_api
                        .allocate_tray(EggColor::Brown, EggSize::Large, 3, &format!("worker-{}", i))
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 3);
        for result in results.iter().filter(|r| r.is_err()) {
            assert!(matches!(
                result,
                Err(ApiError::Allocation(AllocationError::InsufficientStock { requested: 3, .. }))
            ));
        }

        let api = &seed_state.inventory_api;
        assert_eq!(api.available_stock(EggColor::Brown, EggSize::Large).unwrap(), 1);
        let committed: i64 = api
            .list_trays(TrayStatus::Available)
            .unwrap()
            .iter()
            .map(|t| t.committed_quantity)
            .sum();
        assert_eq!(committed, 9);
    }

    /// 共享连接的 API 实例跨线程使用
    #[test]
    fn test_shared_api_across_threads() {
        let (_tmp, db_path) = create_test_db().unwrap();
        let state = Arc::new(AppState::new(db_path).unwrap());
        seed(&state, 1, 1, 4);
        seed(&state, 2, 2, 4);

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let state = state.clone();
                thread::spawn(move || {
                    state
                        .inventory_api
                        .allocate_tray(EggColor::Brown, EggSize::Large, 2, "worker")
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let api = &state.inventory_api;
        assert_eq!(api.available_stock(EggColor::Brown, EggSize::Large).unwrap(), 0);
        assert!(matches!(
            api.allocate_tray(EggColor::Brown, EggSize::Large, 1, "late").unwrap_err(),
            ApiError::Allocation(AllocationError::InsufficientStock { available: 0, .. })
        ));

        // 每条记录的承诺量不超过其计数器
        let trays = api.list_trays(TrayStatus::Available).unwrap();
        assert_eq!(trays.len(), 4);
        for record_cage in [1, 2] {
            let records = api
                .load_records_for_cage(record_cage, date(2024, 3, 1), date(2024, 3, 31))
                .unwrap();
            let record = &records[0];
            assert_eq!(record.committed.get(EggColor::Brown, EggSize::Large), 4);
        }
    }
}
