// ==========================================
// 蛋品库存系统 - 操作日志领域模型
// ==========================================
// 红线: 所有写入必须记录
// 用途: 审计追踪 (集蛋录入/修正/删除, 蛋盘分配/释放/销售)
// ==========================================

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    pub action_id: String,
    pub action_type: String,        // 存储为字符串, 见 ActionType
    pub action_ts: NaiveDateTime,
    pub actor: String,
    pub target_id: String,          // 记录ID 或 蛋盘ID
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

impl ActionLog {
    pub fn new(
        action_type: ActionType,
        actor: &str,
        target_id: &str,
        payload_json: Option<JsonValue>,
        detail: Option<String>,
    ) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.to_string(),
            action_ts: Utc::now().naive_utc(),
            actor: actor.to_string(),
            target_id: target_id.to_string(),
            payload_json,
            detail,
        }
    }
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    RecordCollection,  // 录入集蛋
    CorrectCollection, // 修正集蛋
    DeleteCollection,  // 删除集蛋
    ImportCollection,  // 批量导入
    AllocateTray,      // 分配蛋盘
    ReleaseTray,       // 释放蛋盘
    ReserveTray,       // 预留 (关联销售)
    SellTray,          // 售出
    ReturnTray,        // 退回
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionType::RecordCollection => "RECORD_COLLECTION",
            ActionType::CorrectCollection => "CORRECT_COLLECTION",
            ActionType::DeleteCollection => "DELETE_COLLECTION",
            ActionType::ImportCollection => "IMPORT_COLLECTION",
            ActionType::AllocateTray => "ALLOCATE_TRAY",
            ActionType::ReleaseTray => "RELEASE_TRAY",
            ActionType::ReserveTray => "RESERVE_TRAY",
            ActionType::SellTray => "SELL_TRAY",
            ActionType::ReturnTray => "RETURN_TRAY",
        };
        write!(f, "{}", s)
    }
}
