// ==========================================
// 蛋品库存系统 - 禽只日龄校验
// ==========================================
// 格式: <整数><空白><单位词>, 单位词: día(s) / semana(s) / mes(es) / año(s)
// 单位大小写不敏感; 不校验单复数与数量是否一致 ("1 días" 可通过)
// ==========================================

use crate::domain::age::ParsedAge;
use crate::domain::types::AgeUnit;
use crate::engine::error::{ValidationError, ValidationResult};
use once_cell::sync::Lazy;
use regex::Regex;

static AGE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([0-9]+)\s+(días|día|semanas|semana|meses|mes|años|año)$")
        .expect("日龄正则必须可编译")
});

/// 解析并校验日龄文本
///
/// # 返回
/// - Ok(ParsedAge)
/// - Err(MalformedAge): 不符合格式
/// - Err(OutOfRange): 数值超出单位允许区间
pub fn parse_and_validate_age(text: &str) -> ValidationResult<ParsedAge> {
    let trimmed = text.trim();
    let caps = AGE_PATTERN
        .captures(trimmed)
        .ok_or_else(|| ValidationError::MalformedAge(text.to_string()))?;

    let unit = AgeUnit::from_word(&caps[2])
        .ok_or_else(|| ValidationError::MalformedAge(text.to_string()))?;
    let (min, max) = unit.bounds();

    // 数字过长无法解析时按超范围处理
    let amount: u64 = caps[1].parse().unwrap_or(u64::MAX);
    if amount < min as u64 || amount > max as u64 {
        return Err(ValidationError::OutOfRange {
            amount,
            unit,
            min,
            max,
        });
    }

    Ok(ParsedAge {
        amount: amount as u32,
        unit,
    })
}
