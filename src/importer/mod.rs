// ==========================================
// 蛋品库存系统 - 导入层
// ==========================================
// 职责: 外部集蛋数据 (CSV) 批量导入
// ==========================================

pub mod collection_importer_impl;
pub mod collection_importer_trait;
pub mod error;
pub mod field_mapper;
pub mod file_parser;

// 重导出核心类型
pub use collection_importer_impl::CollectionImporterImpl;
pub use error::{ImportError, ImportResult};
pub use field_mapper::FieldMapper as FieldMapperImpl;
pub use file_parser::CsvParser;

// 重导出 Trait 接口
pub use collection_importer_trait::{CollectionImporter, FieldMapper, FileParser};
