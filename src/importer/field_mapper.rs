// ==========================================
// 蛋品库存系统 - 字段映射器实现
// ==========================================
// 职责: CSV 行 → 集蛋录入结构 + 类型转换
// 列: cage_id, collection_date (YYYY-MM-DD), brown_small..white_jumbo,
//     total_quantity, notes (可选)
// ==========================================

use crate::api::NewCollectionRecord;
use crate::domain::egg_record::EggCounters;
use crate::domain::types::{EggColor, EggSize};
use crate::importer::collection_importer_trait::FieldMapper as FieldMapperTrait;
use crate::importer::error::{ImportError, ImportResult};
use chrono::NaiveDate;
use std::collections::HashMap;

pub const COL_CAGE_ID: &str = "cage_id";
pub const COL_COLLECTION_DATE: &str = "collection_date";
pub const COL_TOTAL_QUANTITY: &str = "total_quantity";
pub const COL_NOTES: &str = "notes";

pub struct FieldMapper;

impl FieldMapperTrait for FieldMapper {
    fn map_to_collection(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<NewCollectionRecord> {
        let cage_id = self.parse_i64(row, COL_CAGE_ID, row_number)?;
        let collection_date = self.parse_date(row, COL_COLLECTION_DATE, row_number)?;

        let mut counters = EggCounters::default();
        for color in EggColor::ALL {
            for size in EggSize::ALL {
                let column = counter_header(color, size);
                // 空白计数列按 0 处理
                let value = match row.get(&column).map(|v| v.trim()) {
                    None | Some("") => 0,
                    Some(_) => self.parse_i64(row, &column, row_number)?,
                };
                counters.set(color, size, value);
            }
        }

        let total_quantity = self.parse_i64(row, COL_TOTAL_QUANTITY, row_number)?;
        let notes = row
            .get(COL_NOTES)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        Ok(NewCollectionRecord {
            cage_id,
            collection_date,
            counters,
            total_quantity,
            notes,
        })
    }
}

impl FieldMapper {
    fn get_required<'a>(
        &self,
        row: &'a HashMap<String, String>,
        field: &str,
        row_number: usize,
    ) -> ImportResult<&'a str> {
        match row.get(field).map(|v| v.trim()) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ImportError::TypeConversionError {
                row: row_number,
                field: field.to_string(),
                message: "值为空".to_string(),
            }),
        }
    }

    fn parse_i64(&self, row: &HashMap<String, String>, field: &str, row_number: usize) -> ImportResult<i64> {
        let raw = self.get_required(row, field, row_number)?;
        raw.parse::<i64>().map_err(|e| ImportError::TypeConversionError {
            row: row_number,
            field: field.to_string(),
            message: format!("'{}' 不是整数: {}", raw, e),
        })
    }

    fn parse_date(&self, row: &HashMap<String, String>, field: &str, row_number: usize) -> ImportResult<NaiveDate> {
        let raw = self.get_required(row, field, row_number)?;
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ImportError::DateFormatError {
            row: row_number,
            field: field.to_string(),
            value: raw.to_string(),
        })
    }
}

/// 计数列表头, 例如 brown_small
pub fn counter_header(color: EggColor, size: EggSize) -> String {
    format!(
        "{}_{}",
        color.as_str().to_lowercase(),
        size.as_str().to_lowercase()
    )
}

/// 必需表头 (notes 除外)
pub fn required_headers() -> Vec<String> {
    let mut headers = vec![COL_CAGE_ID.to_string(), COL_COLLECTION_DATE.to_string()];
    for color in EggColor::ALL {
        for size in EggSize::ALL {
            headers.push(counter_header(color, size));
        }
    }
    headers.push(COL_TOTAL_QUANTITY.to_string());
    headers
}
