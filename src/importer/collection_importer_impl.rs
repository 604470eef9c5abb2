// ==========================================
// 蛋品库存系统 - 集蛋导入实现
// ==========================================
// 行级错误 (映射/校验/重复) 记入汇总, 其余行照常导入
// 基础设施错误 (读文件/数据库) 中止当前文件
// ==========================================

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::egg_record::EggCollectionRecord;
use crate::domain::import::{ImportRowError, ImportSummary};
use crate::engine::classification::ClassificationEngine;
use crate::engine::error::ValidationError;
use crate::importer::collection_importer_trait::{CollectionImporter, FieldMapper as _, FileParser as _};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::{required_headers, FieldMapper};
use crate::importer::file_parser::CsvParser;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::egg_record_repo::EggCollectionRecordRepository;
use crate::repository::error::RepositoryError;

// ==========================================
// CollectionImporterImpl
// ==========================================
pub struct CollectionImporterImpl {
    record_repo: Arc<dyn EggCollectionRecordRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    mapper: FieldMapper,
    classification: ClassificationEngine,
}

impl CollectionImporterImpl {
    pub fn new(
        record_repo: Arc<dyn EggCollectionRecordRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            record_repo,
            action_log_repo,
            mapper: FieldMapper,
            classification: ClassificationEngine::new(),
        }
    }

    /// 单行: 映射 → 校验 → 落库
    ///
    /// # 返回
    /// - Ok(Ok(record_id)): 已导入
    /// - Ok(Err(reason)): 行级失败
    /// - Err: 数据库错误, 中止文件
    fn import_row(
        &self,
        row: &std::collections::HashMap<String, String>,
        row_number: usize,
    ) -> ImportResult<Result<String, String>> {
        let input = match self.mapper.map_to_collection(row, row_number) {
            Ok(input) => input,
            Err(e) => return Ok(Err(e.to_string())),
        };

        let mut record = EggCollectionRecord::new(
            uuid::Uuid::new_v4().to_string(),
            input.cage_id,
            input.collection_date,
            input.counters,
        );
        record.total_quantity = input.total_quantity;
        record.notes = input.notes;

        let existing = self
            .record_repo
            .find_by_cage_and_date(record.cage_id, record.collection_date)?;
        if let Err(source) = self.classification.validate_record(&record, existing.as_ref()) {
            return Ok(Err(ImportError::Validation { row: row_number, source }.to_string()));
        }

        match self.record_repo.insert(&record) {
            Ok(()) => Ok(Ok(record.record_id)),
            Err(RepositoryError::UniqueConstraintViolation(_)) => {
                let source = ValidationError::DuplicateRecord {
                    cage_id: record.cage_id,
                    date: record.collection_date,
                };
                Ok(Err(ImportError::Validation { row: row_number, source }.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CollectionImporter for CollectionImporterImpl {
    async fn import_from_csv<P: AsRef<Path> + Send>(
        &self,
        file_path: P,
        operator: &str,
    ) -> ImportResult<ImportSummary> {
        let started = Instant::now();
        let path: PathBuf = file_path.as_ref().to_path_buf();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        // 阶段 0: 解析放到阻塞线程池
        let parse_path = path.clone();
        let rows = tokio::task::spawn_blocking(move || CsvParser.parse_to_raw_records(&parse_path))
            .await
            .map_err(|e| ImportError::Other(anyhow::anyhow!("解析任务异常: {}", e)))??;

        if let Some(first) = rows.first() {
            if let Some(missing) = required_headers().into_iter().find(|h| !first.contains_key(h)) {
                return Err(ImportError::MissingColumn(missing));
            }
        }

        let batch_id = uuid::Uuid::new_v4().to_string();
        let mut summary = ImportSummary {
            batch_id: batch_id.clone(),
            file_name: file_name.clone(),
            total_rows: rows.len(),
            ..Default::default()
        };
        let mut imported_ids = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            let row_number = idx + 1;
            match self.import_row(row, row_number)? {
                Ok(record_id) => imported_ids.push(record_id),
                Err(reason) => {
                    warn!(file = %file_name, row = row_number, reason = %reason, "行导入失败");
                    summary.row_errors.push(ImportRowError { row_number, reason });
                }
            }
        }

        summary.imported = imported_ids.len();
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        let log = ActionLog::new(
            ActionType::ImportCollection,
            operator,
            &batch_id,
            Some(serde_json::json!({
                "file_name": file_name,
                "total_rows": summary.total_rows,
                "imported": summary.imported,
                "failed": summary.failed(),
                "record_ids": imported_ids,
            })),
            Some(format!(
                "导入集蛋: {} 成功{}行, 失败{}行",
                file_name,
                summary.imported,
                summary.failed()
            )),
        );
        self.action_log_repo.insert(&log)?;

        info!(
            batch_id = %batch_id,
            file = %file_name,
            total = summary.total_rows,
            imported = summary.imported,
            failed = summary.failed(),
            elapsed_ms = summary.elapsed_ms,
            "集蛋文件导入完成"
        );
        Ok(summary)
    }

    async fn batch_import<P: AsRef<Path> + Send + Sync>(
        &self,
        file_paths: Vec<P>,
        operator: &str,
    ) -> ImportResult<Vec<Result<ImportSummary, String>>> {
        use futures::future::join_all;

        info!(count = file_paths.len(), "开始批量导入文件");

        let import_tasks = file_paths.into_iter().map(|path| {
            let path_str = path.as_ref().display().to_string();
            async move {
                match self.import_from_csv(path, operator).await {
                    Ok(summary) => Ok(summary),
                    Err(e) => {
                        error!(file = %path_str, error = %e, "文件导入失败");
                        Err(format!("文件 {} 导入失败: {}", path_str, e))
                    }
                }
            }
        });

        // 并发执行所有导入任务
        let results = join_all(import_tasks).await;

        info!(
            total = results.len(),
            success = results.iter().filter(|r| r.is_ok()).count(),
            failed = results.iter().filter(|r| r.is_err()).count(),
            "批量导入完成"
        );

        Ok(results)
    }
}
