// ==========================================
// 蛋品库存系统 - 集蛋导入 Trait
// ==========================================
// 职责: 定义集蛋记录导入接口（不包含实现）
// ==========================================

use crate::api::NewCollectionRecord;
use crate::domain::import::ImportSummary;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// CollectionImporter Trait
// ==========================================
// 用途: 集蛋导入主接口
// 实现者: CollectionImporterImpl
#[async_trait]
pub trait CollectionImporter: Send + Sync {
    /// 从 CSV 文件导入集蛋记录
    ///
    /// # 返回
    /// - Ok(ImportSummary): 行级失败记入 row_errors, 不中止本文件
    /// - Err: 文件读取、表头缺失、数据库错误
    ///
    /// # 导入流程
    /// 1. 文件读取与解析
    /// 2. 字段映射与类型转换
    /// 3. 分级校验 (含同笼同日查重)
    /// 4. 逐行落库 + 批次 ActionLog
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        operator: &str,
    ) -> ImportResult<ImportSummary>;

    /// 批量导入多个文件（并发执行）
    ///
    /// # 说明
    /// - 每个文件的导入是独立的，互不影响
    /// - 某个文件失败时, 对应位置为 Err(原因)
    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
        operator: &str,
    ) -> ImportResult<Vec<Result<ImportSummary, String>>>;
}

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（阶段 0）
// 实现者: CsvParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行记录（HashMap<小写列名, 值>）
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// FieldMapper Trait
// ==========================================
// 用途: 字段映射接口（阶段 1）
// 实现者: FieldMapperImpl
pub trait FieldMapper: Send + Sync {
    /// 将原始行记录映射为集蛋录入结构
    ///
    /// # 参数
    /// - row_number: 数据行号（用于错误定位）
    fn map_to_collection(
        &self,
        row: &HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<NewCollectionRecord>;
}
