// Dev utility: populate a database with demo egg collection records.
//
// Usage:
//   cargo run --bin seed_demo_data -- [db_path] [days] [cages]
//
// Records are written through EggInventoryApi so validation and audit logging apply.
// Existing (cage, date) pairs are skipped.

use chrono::{Duration, Local};
use egg_inventory::api::{ApiError, NewCollectionRecord};
use egg_inventory::app::AppState;
use egg_inventory::{EggColor, EggCounters, EggSize, ValidationError};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    egg_inventory::logging::init();

    let mut args = std::env::args().skip(1);
    let db_path = args
        .next()
        .unwrap_or_else(|| "egg_inventory_demo.db".to_string());
    let days: i64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(14);
    let cages: i64 = args.next().map(|s| s.parse()).transpose()?.unwrap_or(4);

    let state = AppState::new(db_path.clone())?;
    let api = &state.inventory_api;
    let today = Local::now().date_naive();

    let mut inserted = 0usize;
    let mut skipped = 0usize;

    for day_offset in (0..days).rev() {
        let date = today - Duration::days(day_offset);
        for cage_id in 1..=cages {
            let counters = demo_counters(cage_id, day_offset);
            let input = NewCollectionRecord {
                cage_id,
                collection_date: date,
                counters,
                total_quantity: counters.sum(),
                notes: Some("demo".to_string()),
            };

            match api.record_collection(input, "seed_demo_data") {
                Ok(_) => inserted += 1,
                Err(ApiError::Validation(ValidationError::DuplicateRecord { .. })) => skipped += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    println!(
        "db={} inserted={} skipped={} (days={}, cages={})",
        db_path, inserted, skipped, days, cages
    );
    Ok(())
}

/// 确定性的演示数量: 不同笼、不同日有差异, 无随机数
fn demo_counters(cage_id: i64, day_offset: i64) -> EggCounters {
    let mut counters = EggCounters::default();
    let base = 3 + (cage_id * 7 + day_offset * 3) % 9;
    for (i, color) in EggColor::ALL.into_iter().enumerate() {
        for (j, size) in EggSize::ALL.into_iter().enumerate() {
            let value = (base + (i as i64) * 2 + (j as i64) * ((cage_id + day_offset) % 4)) % 15;
            counters.set(color, size, value);
        }
    }
    counters
}
