// ==========================================
// 蛋品库存系统 - 命令行主入口
// ==========================================
// 用法:
//   egg-inventory stats <start> <end> [cage_id]
//   egg-inventory stock <color> <size>
//   egg-inventory allocate <color> <size> <qty>
//   egg-inventory release <tray_id>
//   egg-inventory import <csv>...
//   egg-inventory age <text>
// 数据库: EGG_INVENTORY_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;

use egg_inventory::app::{get_default_db_path, AppState};
use egg_inventory::importer::CollectionImporter;
use egg_inventory::{logging, EggColor, EggSize};

const OPERATOR: &str = "cli";

const USAGE: &str = "用法:
  egg-inventory stats <start YYYY-MM-DD> <end YYYY-MM-DD> [cage_id]
  egg-inventory stock <color> <size>
  egg-inventory allocate <color> <size> <qty>
  egg-inventory release <tray_id>
  egg-inventory import <csv>...
  egg-inventory age <text>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        bail!("缺少子命令");
    };

    // age 不需要数据库
    if command == "age" {
        let text = args[1..].join(" ");
        let age = egg_inventory::parse_and_validate_age(&text)?;
        println!("{}", serde_json::to_string_pretty(&age)?);
        return Ok(());
    }

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path).map_err(|e| anyhow!(e))?;
    let api = &state.inventory_api;

    match (command, &args[1..]) {
        ("stats", [start, end]) => {
            let stats = api.production_stats(parse_date(start)?, parse_date(end)?)?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        ("stats", [start, end, cage_id]) => {
            let cage_id: i64 = cage_id.parse().with_context(|| format!("cage_id 非法: {}", cage_id))?;
            let stat = api.cage_statistics(cage_id, parse_date(start)?, parse_date(end)?)?;
            println!("{}", serde_json::to_string_pretty(&stat)?);
        }
        ("stock", [color, size]) => {
            let (color, size) = parse_grade(color, size)?;
            let available = api.available_stock(color, size)?;
            println!("{}/{} 可用: {}", color, size, available);
        }
        ("allocate", [color, size, qty]) => {
            let (color, size) = parse_grade(color, size)?;
            let qty: i64 = qty.parse().with_context(|| format!("数量非法: {}", qty))?;
            let tray = api.allocate_tray(color, size, qty, OPERATOR)?;
            println!("{}", serde_json::to_string_pretty(&tray)?);
        }
        ("release", [tray_id]) => {
            let released = api.release_tray(tray_id, OPERATOR)?;
            if released {
                println!("蛋盘 {} 已释放", tray_id);
            } else {
                println!("蛋盘 {} 此前已释放, 无变化", tray_id);
            }
        }
        ("import", files) if !files.is_empty() => {
            let results = state.importer.batch_import(files.to_vec(), OPERATOR).await?;
            for result in results {
                match result {
                    Ok(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
                    Err(e) => eprintln!("{}", e),
                }
            }
        }
        _ => {
            eprintln!("{}", USAGE);
            bail!("无法识别的命令: {}", args.join(" "));
        }
    }

    Ok(())
}

fn parse_date(raw: &str) -> anyhow::Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").with_context(|| format!("日期格式错误 (YYYY-MM-DD): {}", raw))
}

fn parse_grade(color: &str, size: &str) -> anyhow::Result<(EggColor, EggSize)> {
    let color: EggColor = color.parse().map_err(|e: String| anyhow!(e))?;
    let size: EggSize = size.parse().map_err(|e: String| anyhow!(e))?;
    Ok((color, size))
}
