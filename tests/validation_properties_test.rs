// ==========================================
// 校验与分配性质测试
// ==========================================
// 职责: 以随机输入验证分级校验、分配、日龄解析的不变量
// ==========================================

use chrono::NaiveDate;
use egg_inventory::domain::egg_record::{EggCollectionRecord, EggCounters};
use egg_inventory::domain::types::{AgeUnit, EggColor, EggSize};
use egg_inventory::engine::{
    parse_and_validate_age, AllocationError, ClassificationEngine, TrayAllocator, ValidationError,
};
use proptest::prelude::*;

fn counters_strategy() -> impl Strategy<Value = EggCounters> {
    proptest::collection::vec(0i64..500, 8).prop_map(|v| EggCounters {
        brown_small: v[0],
        brown_medium: v[1],
        brown_large: v[2],
        brown_jumbo: v[3],
        white_small: v[4],
        white_medium: v[5],
        white_large: v[6],
        white_jumbo: v[7],
    })
}

fn record(id: usize, day_offset: i64, qty: i64) -> EggCollectionRecord {
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    EggCollectionRecord::new(
        format!("R{:03}", id),
        (id % 5) as i64 + 1,
        base + chrono::Duration::days(day_offset),
        EggCounters::single(EggColor::White, EggSize::Medium, qty),
    )
}

proptest! {
    #[test]
    fn prop_validation_accepts_exactly_reconciled_totals(
        counters in counters_strategy(),
        delta in -20i64..20,
    ) {
        let engine = ClassificationEngine::new();
        let mut rec = EggCollectionRecord::new("R".to_string(), 1, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), counters);
        rec.total_quantity = counters.sum() + delta;

        let result = engine.validate_record(&rec, None);
        if delta == 0 {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(
                result,
                Err(ValidationError::TotalMismatch { declared: counters.sum() + delta, computed: counters.sum() })
            );
        }
    }

    #[test]
    fn prop_classification_preserves_total(counters in counters_strategy()) {
        let engine = ClassificationEngine::new();
        let rec = EggCollectionRecord::new("R".to_string(), 1, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), counters);
        let c = engine.classify(&rec);
        prop_assert_eq!(c.by_type.total(), rec.total_quantity);
        prop_assert_eq!(c.by_size.total(), rec.total_quantity);
    }

    #[test]
    fn prop_allocation_is_exact_fifo_or_nothing(
        stock in proptest::collection::vec((0i64..30, 0i64..40), 0..12),
        requested in 1i64..200,
    ) {
        let records: Vec<EggCollectionRecord> = stock
            .iter()
            .enumerate()
            .map(|(i, (day, qty))| record(i, *day, *qty))
            .collect();
        let allocator = TrayAllocator::new();
        let available = allocator.total_available(EggColor::White, EggSize::Medium, &records);

        match allocator.allocate(EggColor::White, EggSize::Medium, requested, &records) {
            Ok(allocation) => {
                prop_assert!(requested <= available);
                prop_assert_eq!(allocation.allocated_quantity(), requested);
                // 先进先出: 组成项日期非降序, 除最后一项外均取满
                for pair in allocation.items.windows(2) {
                    prop_assert!(pair[0].collection_date <= pair[1].collection_date);
                }
                for item in &allocation.items[..allocation.items.len() - 1] {
                    let source = records.iter().find(|r| r.record_id == item.record_id).unwrap();
                    prop_assert_eq!(item.quantity_taken, source.available_quantity(EggColor::White, EggSize::Medium));
                }
            }
            Err(err) => {
                prop_assert!(requested > available);
                prop_assert_eq!(err, AllocationError::InsufficientStock { requested, available });
            }
        }
    }

    #[test]
    fn prop_age_in_range_round_trips(amount in 1u32..=60) {
        let parsed = parse_and_validate_age(&format!("{} meses", amount)).unwrap();
        prop_assert_eq!(parsed.amount, amount);
        prop_assert_eq!(parsed.unit, AgeUnit::Month);
    }

    #[test]
    fn prop_age_out_of_range_rejected(amount in 6u64..10_000) {
        let result = parse_and_validate_age(&format!("{} AÑOS", amount));
        let is_out_of_range = matches!(result, Err(ValidationError::OutOfRange { unit: AgeUnit::Year, .. }));
        prop_assert!(is_out_of_range);
    }
}
