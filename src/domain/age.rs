// ==========================================
// 蛋品库存系统 - 禽只日龄
// ==========================================

use crate::domain::types::AgeUnit;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 已解析且通过范围校验的日龄
///
/// 不做跨单位换算: "2 años" 与 "24 meses" 各自独立校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedAge {
    pub amount: u32,
    pub unit: AgeUnit,
}

impl fmt::Display for ParsedAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}
