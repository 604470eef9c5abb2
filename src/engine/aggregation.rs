// ==========================================
// 蛋品库存系统 - 产量统计引擎
// ==========================================
// 职责: 窗口汇总 / 单笼统计 / 日周月滚动汇总
// 口径: 日均 = 窗口总数 / 窗口内有集蛋记录的自然日数
//       (不按窗口全长平均, 避免无集蛋日拉低产能)
// ==========================================

use crate::domain::egg_record::EggCollectionRecord;
use crate::domain::stats::{
    CageProductionStat, DateWindow, PeriodBucket, ProductionStats, SizeBreakdown, TypeBreakdown,
};
use crate::domain::types::Period;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::instrument;

// ==========================================
// AggregationEngine - 产量统计引擎
// ==========================================
pub struct AggregationEngine {
    // 无状态引擎
}

/// 单笼累加器
#[derive(Default)]
struct CageAccumulator {
    total: i64,
    days: BTreeSet<NaiveDate>,
    by_type: TypeBreakdown,
    by_size: SizeBreakdown,
}

impl AggregationEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 窗口汇总
    ///
    /// - 窗口外记录剔除
    /// - 空输入: 全 0, best_cage = None
    /// - per_cage 按 total 降序, 并列时 cage_id 小者在前
    #[instrument(skip(self, records), fields(
        start = %window.start,
        end = %window.end,
        records_count = records.len()
    ))]
    pub fn aggregate(&self, records: &[EggCollectionRecord], window: DateWindow) -> ProductionStats {
        let mut total_in_window = 0i64;
        let mut days: BTreeSet<NaiveDate> = BTreeSet::new();
        let mut by_type = TypeBreakdown::default();
        let mut by_size = SizeBreakdown::default();
        let mut cages: BTreeMap<i64, CageAccumulator> = BTreeMap::new();

        for record in records.iter().filter(|r| window.contains(r.collection_date)) {
            let acc = cages.entry(record.cage_id).or_default();
            for (color, size, qty) in record.counters.iter() {
                by_type.add(color, qty);
                by_size.add(size, qty);
                acc.by_type.add(color, qty);
                acc.by_size.add(size, qty);
            }
            total_in_window = total_in_window.saturating_add(record.total_quantity);
            acc.total = acc.total.saturating_add(record.total_quantity);
            acc.days.insert(record.collection_date);
            days.insert(record.collection_date);
        }

        let mut per_cage: Vec<CageProductionStat> = cages
            .into_iter()
            .map(|(cage_id, acc)| CageProductionStat {
                cage_id,
                total: acc.total,
                days_with_data: acc.days.len(),
                average_per_day: average(acc.total, acc.days.len()),
                by_type: acc.by_type,
                by_size: acc.by_size,
            })
            .collect();

        per_cage.sort_by(|a, b| b.total.cmp(&a.total).then(a.cage_id.cmp(&b.cage_id)));
        let best_cage = per_cage.first().map(|c| c.cage_id);

        tracing::debug!(
            total_in_window,
            days_with_data = days.len(),
            best_cage = ?best_cage,
            "窗口汇总完成"
        );

        ProductionStats {
            window,
            total_in_window,
            days_with_data: days.len(),
            average_per_day: average(total_in_window, days.len()),
            by_type,
            by_size,
            per_cage,
            best_cage,
        }
    }

    /// 单笼统计 (无数据时返回全 0)
    pub fn cage_stat(
        &self,
        cage_id: i64,
        records: &[EggCollectionRecord],
        window: DateWindow,
    ) -> CageProductionStat {
        let own: Vec<EggCollectionRecord> = records
            .iter()
            .filter(|r| r.cage_id == cage_id)
            .cloned()
            .collect();

        self.aggregate(&own, window)
            .per_cage
            .into_iter()
            .next()
            .unwrap_or_else(|| CageProductionStat::empty(cage_id))
    }

    /// 日 / 周 / 月 滚动汇总
    ///
    /// 只输出有记录的周期, 按周期起始日升序;
    /// 周以 ISO 周一为起点, 月为自然月; 周期边界不裁剪到窗口
    pub fn rollup(
        &self,
        records: &[EggCollectionRecord],
        window: DateWindow,
        period: Period,
    ) -> Vec<PeriodBucket> {
        let mut buckets: BTreeMap<NaiveDate, PeriodBucket> = BTreeMap::new();

        for record in records.iter().filter(|r| window.contains(r.collection_date)) {
            let (period_start, period_end) = period_bounds(record.collection_date, period);
            let bucket = buckets.entry(period_start).or_insert_with(|| PeriodBucket {
                period,
                period_start,
                period_end,
                record_count: 0,
                total: 0,
                by_type: TypeBreakdown::default(),
                by_size: SizeBreakdown::default(),
            });

            bucket.record_count += 1;
            bucket.total = bucket.total.saturating_add(record.total_quantity);
            for (color, size, qty) in record.counters.iter() {
                bucket.by_type.add(color, qty);
                bucket.by_size.add(size, qty);
            }
        }

        buckets.into_values().collect()
    }
}

impl Default for AggregationEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn average(total: i64, days: usize) -> f64 {
    if days == 0 {
        return 0.0;
    }
    total as f64 / days as f64
}

/// 日期所在周期的 [起, 止]
fn period_bounds(date: NaiveDate, period: Period) -> (NaiveDate, NaiveDate) {
    match period {
        Period::Daily => (date, date),
        Period::Weekly => {
            let start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
            (start, start + Duration::days(6))
        }
        Period::Monthly => {
            let start = date.with_day(1).unwrap_or(date);
            let next_month = if start.month() == 12 {
                NaiveDate::from_ymd_opt(start.year() + 1, 1, 1)
            } else {
                NaiveDate::from_ymd_opt(start.year(), start.month() + 1, 1)
            };
            let end = next_month
                .and_then(|d| d.pred_opt())
                .unwrap_or(start);
            (start, end)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::egg_record::EggCounters;
    use crate::domain::types::{EggColor, EggSize};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn rec(id: &str, cage_id: i64, date: NaiveDate, color: EggColor, size: EggSize, qty: i64) -> EggCollectionRecord {
        EggCollectionRecord::new(id.to_string(), cage_id, date, EggCounters::single(color, size, qty))
    }

    #[test]
    fn test_empty_window() {
        let engine = AggregationEngine::new();
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let stats = engine.aggregate(&[], window);

        assert_eq!(stats.total_in_window, 0);
        assert_eq!(stats.days_with_data, 0);
        assert_eq!(stats.average_per_day, 0.0);
        assert_eq!(stats.by_type, TypeBreakdown::default());
        assert_eq!(stats.by_size, SizeBreakdown::default());
        assert!(stats.per_cage.is_empty());
        assert_eq!(stats.best_cage, None);
    }

    #[test]
    fn test_average_over_days_with_data() {
        let engine = AggregationEngine::new();
        let records = vec![
            rec("A", 3, d(2024, 1, 1), EggColor::Brown, EggSize::Medium, 10),
            rec("B", 3, d(2024, 1, 3), EggColor::Brown, EggSize::Medium, 4),
        ];
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 3)).unwrap();
        let stats = engine.aggregate(&records, window);

        assert_eq!(stats.total_in_window, 14);
        assert_eq!(stats.days_with_data, 2);
        assert_eq!(stats.average_per_day, 7.0);
        assert_eq!(stats.by_type.brown, 14);
        assert_eq!(stats.by_size.medium, 14);
        assert_eq!(stats.best_cage, Some(3));
    }

    #[test]
    fn test_records_outside_window_excluded() {
        let engine = AggregationEngine::new();
        let records = vec![
            rec("A", 1, d(2023, 12, 31), EggColor::White, EggSize::Large, 100),
            rec("B", 1, d(2024, 1, 2), EggColor::White, EggSize::Large, 6),
            rec("C", 1, d(2024, 1, 4), EggColor::White, EggSize::Large, 50),
        ];
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 1, 3)).unwrap();
        let stats = engine.aggregate(&records, window);
        assert_eq!(stats.total_in_window, 6);
        assert_eq!(stats.days_with_data, 1);
    }

    #[test]
    fn test_best_cage_tie_break_lowest_id() {
        let engine = AggregationEngine::new();
        let day = d(2024, 2, 1);
        let records = vec![
            rec("A", 7, day, EggColor::Brown, EggSize::Large, 20),
            rec("B", 2, day, EggColor::White, EggSize::Small, 20),
            rec("C", 5, day, EggColor::White, EggSize::Small, 8),
        ];
        let stats = engine.aggregate(&records, DateWindow::single_day(day));

        assert_eq!(stats.best_cage, Some(2));
        let order: Vec<i64> = stats.per_cage.iter().map(|c| c.cage_id).collect();
        assert_eq!(order, vec![2, 7, 5]);
    }

    #[test]
    fn test_cage_stat_without_data() {
        let engine = AggregationEngine::new();
        let day = d(2024, 2, 1);
        let records = vec![rec("A", 7, day, EggColor::Brown, EggSize::Large, 20)];
        let stat = engine.cage_stat(9, &records, DateWindow::single_day(day));
        assert_eq!(stat, CageProductionStat::empty(9));
    }

    #[test]
    fn test_weekly_and_monthly_rollup() {
        let engine = AggregationEngine::new();
        // 2024-01-29 为周一
        let records = vec![
            rec("A", 1, d(2024, 1, 29), EggColor::Brown, EggSize::Large, 5),
            rec("B", 2, d(2024, 1, 31), EggColor::White, EggSize::Large, 7),
            rec("C", 1, d(2024, 2, 4), EggColor::Brown, EggSize::Small, 3),
            rec("D", 1, d(2024, 2, 5), EggColor::Brown, EggSize::Small, 1),
        ];
        let window = DateWindow::new(d(2024, 1, 1), d(2024, 2, 29)).unwrap();

        let weekly = engine.rollup(&records, window, Period::Weekly);
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].period_start, d(2024, 1, 29));
        assert_eq!(weekly[0].period_end, d(2024, 2, 4));
        assert_eq!(weekly[0].total, 15);
        assert_eq!(weekly[0].record_count, 3);
        assert_eq!(weekly[1].total, 1);

        let monthly = engine.rollup(&records, window, Period::Monthly);
        assert_eq!(monthly.len(), 2);
        assert_eq!(monthly[0].period_end, d(2024, 1, 31));
        assert_eq!(monthly[0].total, 12);
        assert_eq!(monthly[1].period_start, d(2024, 2, 1));
        assert_eq!(monthly[1].period_end, d(2024, 2, 29));
        assert_eq!(monthly[1].by_size.small, 4);

        let daily = engine.rollup(&records, window, Period::Daily);
        assert_eq!(daily.len(), 4);
    }

    #[test]
    fn test_window_totals_saturate() {
        let engine = AggregationEngine::new();
        let day = d(2024, 3, 1);
        let records = vec![
            rec("A", 1, day, EggColor::Brown, EggSize::Large, i64::MAX),
            rec("B", 2, day, EggColor::Brown, EggSize::Large, i64::MAX),
        ];
        let stats = engine.aggregate(&records, DateWindow::single_day(day));
        assert_eq!(stats.total_in_window, i64::MAX);
        assert_eq!(stats.by_type.brown, i64::MAX);

        let daily = engine.rollup(&records, DateWindow::single_day(day), Period::Daily);
        assert_eq!(daily[0].total, i64::MAX);
    }

    #[test]
    fn test_december_month_end() {
        let (start, end) = period_bounds(d(2023, 12, 15), Period::Monthly);
        assert_eq!(start, d(2023, 12, 1));
        assert_eq!(end, d(2023, 12, 31));
    }
}
