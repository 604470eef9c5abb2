// ==========================================
// 蛋品库存系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型, 转换Repository错误为用户可读的错误消息
// 约定: 校验/分配错误原样透出; 基础设施错误不掩盖、不重试
// ==========================================

use crate::engine::error::{AllocationError, ValidationError};
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 调用方可修正错误 (原样透出)
    // ==========================================
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Allocation(#[from] AllocationError),

    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    #[error("无效的状态转换: from={from} to={to}")]
    InvalidStateTransition { from: String, to: String },

    // ==========================================
    // 并发控制错误
    // ==========================================
    /// 承诺冲突重试耗尽
    #[error("分配冲突, 重试{attempts}次后仍失败: {last_conflict}")]
    AllocationConflict { attempts: u32, last_conflict: String },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            // 单次冲突: 由 allocate_tray 的重试循环消化, 落到这里说明调用方未走重试路径
            conflict @ RepositoryError::StockConflict { .. } => ApiError::AllocationConflict {
                attempts: 1,
                last_conflict: conflict.to_string(),
            },

            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }

            RepositoryError::BusinessRuleViolation(msg) => ApiError::BusinessRuleViolation(msg),
            RepositoryError::InvalidStateTransition { from, to } => {
                ApiError::InvalidStateTransition { from, to }
            }
        }
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{EggColor, EggSize};

    #[test]
    fn test_validation_error_is_transparent() {
        let err: ApiError = ValidationError::TotalMismatch {
            declared: 10,
            computed: 9,
        }
        .into();
        assert_eq!(err.to_string(), "总数不一致: 录入总数=10, 分项之和=9");
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::TotalMismatch { .. })
        ));
    }

    #[test]
    fn test_repository_error_mapping() {
        let err: ApiError = RepositoryError::NotFound {
            entity: "Tray".to_string(),
            id: "T-1".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::NotFound(ref msg) if msg.contains("T-1")));

        let err: ApiError = RepositoryError::StockConflict {
            record_id: "R-1".to_string(),
            color: EggColor::Brown,
            size: EggSize::Large,
            requested: 5,
            available: 2,
        }
        .into();
        assert!(matches!(err, ApiError::AllocationConflict { attempts: 1, .. }));

        let err: ApiError = RepositoryError::InvalidStateTransition {
            from: "SOLD".to_string(),
            to: "RELEASED".to_string(),
        }
        .into();
        assert!(matches!(err, ApiError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_infrastructure_error_mapping() {
        let err: ApiError = RepositoryError::LockError("poisoned".to_string()).into();
        assert!(matches!(err, ApiError::DatabaseConnectionError(ref msg) if msg.contains("poisoned")));

        let err: ApiError = RepositoryError::DatabaseQueryError("no such table".to_string()).into();
        assert!(matches!(err, ApiError::DatabaseError(_)));

        let err: ApiError =
            RepositoryError::ForeignKeyViolation("FOREIGN KEY constraint failed".to_string()).into();
        assert!(matches!(err, ApiError::BusinessRuleViolation(ref msg) if msg.contains("外键")));
    }
}
