// ==========================================
// 蛋品库存系统 - 导入结果
// ==========================================

use serde::{Deserialize, Serialize};

/// 单行导入失败原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row_number: usize, // 数据行号 (表头之后从 1 开始)
    pub reason: String,
}

/// 单个文件的导入汇总
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub batch_id: String,
    pub file_name: String,
    pub total_rows: usize,
    pub imported: usize,
    pub row_errors: Vec<ImportRowError>,
    pub elapsed_ms: u64,
}

impl ImportSummary {
    pub fn failed(&self) -> usize {
        self.row_errors.len()
    }

    pub fn is_clean(&self) -> bool {
        self.row_errors.is_empty()
    }
}
